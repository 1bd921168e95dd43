//! Structural-selector matching over the element arena.
//!
//! Supports the subset chains actually use against an in-memory document:
//! tag names, `#id`, `.class`, `[attr]` / `[attr=value]`, compound simple
//! selectors, and descendant/child combinators. Anything outside the subset
//! fails deterministically with an `UnsupportedSelector` error instead of
//! silently matching nothing.

use crate::arena::{Arena, NodeId};
use crate::error::{Error, Result};

#[derive(Debug, Default, Clone)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    /// Anywhere below the left-hand context.
    Descendant,
    /// Directly below the left-hand context.
    Child,
}

/// A parsed selector: compounds joined left-to-right by combinators. The
/// first compound is implicitly a descendant of the scope it is resolved
/// against.
#[derive(Debug, Clone)]
pub(crate) struct Selector {
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self> {
        let spaced = input.replace('>', " > ");
        let mut parts = Vec::new();
        let mut pending = Combinator::Descendant;
        let mut expecting_compound = false;

        for token in spaced.split_whitespace() {
            if token == ">" {
                if parts.is_empty() || expecting_compound {
                    return Err(Error::UnsupportedSelector(
                        input.to_string(),
                        "misplaced `>` combinator".to_string(),
                    ));
                }
                pending = Combinator::Child;
                expecting_compound = true;
                continue;
            }
            parts.push((pending, parse_compound(input, token)?));
            pending = Combinator::Descendant;
            expecting_compound = false;
        }

        if parts.is_empty() {
            return Err(Error::EmptySelector);
        }
        if expecting_compound {
            return Err(Error::UnsupportedSelector(
                input.to_string(),
                "dangling `>` combinator".to_string(),
            ));
        }
        Ok(Selector { parts })
    }

    /// All nodes inside `scope` matching the selector, in document order.
    pub fn select(&self, arena: &Arena, scope: NodeId) -> Vec<NodeId> {
        arena
            .descendants(scope)
            .into_iter()
            .filter(|&node| arena.element(node).is_some() && self.matches(arena, scope, node))
            .collect()
    }

    fn matches(&self, arena: &Arena, scope: NodeId, node: NodeId) -> bool {
        matches_parts(arena, scope, node, &self.parts)
    }
}

fn matches_parts(
    arena: &Arena,
    scope: NodeId,
    node: NodeId,
    parts: &[(Combinator, Compound)],
) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return false;
    };
    if !compound_matches(arena, node, compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => {
            let Some(parent) = arena.node(node).parent else {
                return false;
            };
            arena.is_inside(parent, scope) && matches_parts(arena, scope, parent, rest)
        }
        Combinator::Descendant => {
            let mut current = arena.node(node).parent;
            while let Some(ancestor) = current {
                if !arena.is_inside(ancestor, scope) {
                    return false;
                }
                if matches_parts(arena, scope, ancestor, rest) {
                    return true;
                }
                current = arena.node(ancestor).parent;
            }
            false
        }
    }
}

fn compound_matches(arena: &Arena, node: NodeId, compound: &Compound) -> bool {
    let Some(el) = arena.element(node) else {
        return false;
    };
    if let Some(tag) = &compound.tag {
        if el.tag != *tag {
            return false;
        }
    }
    if let Some(id) = &compound.id {
        if el.attr("id") != Some(id.as_str()) {
            return false;
        }
    }
    for class in &compound.classes {
        let has = el
            .attr("class")
            .is_some_and(|list| list.split_whitespace().any(|c| c == class));
        if !has {
            return false;
        }
    }
    for (name, expected) in &compound.attrs {
        match (el.attr(name), expected) {
            (None, _) => return false,
            (Some(actual), Some(expected)) if actual != expected => return false,
            _ => {}
        }
    }
    true
}

fn parse_compound(input: &str, token: &str) -> Result<Compound> {
    let unsupported = |detail: String| Error::UnsupportedSelector(input.to_string(), detail);

    let mut compound = Compound::default();
    let mut rest = token;

    let tag_end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
    if tag_end > 0 {
        let tag = &rest[..tag_end];
        if tag != "*" {
            if !tag
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(unsupported(format!("unrecognized token `{tag}`")));
            }
            compound.tag = Some(tag.to_ascii_lowercase());
        }
        rest = &rest[tag_end..];
    }

    while !rest.is_empty() {
        let marker = &rest[..1];
        rest = &rest[1..];
        match marker {
            "#" | "." => {
                let end = rest.find(['#', '.', '[']).unwrap_or(rest.len());
                let name = &rest[..end];
                if name.is_empty() {
                    return Err(unsupported(format!("empty `{marker}` segment")));
                }
                if marker == "#" {
                    compound.id = Some(name.to_string());
                } else {
                    compound.classes.push(name.to_string());
                }
                rest = &rest[end..];
            }
            "[" => {
                let Some(close) = rest.find(']') else {
                    return Err(unsupported("unterminated attribute selector".to_string()));
                };
                let body = &rest[..close];
                rest = &rest[close + 1..];
                let (name, value) = match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value
                            .strip_prefix('"')
                            .and_then(|v| v.strip_suffix('"'))
                            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                            .unwrap_or(value);
                        (name, Some(value.to_string()))
                    }
                    None => (body, None),
                };
                if name.is_empty() {
                    return Err(unsupported("empty attribute name".to_string()));
                }
                compound
                    .attrs
                    .push((name.to_ascii_lowercase(), value));
            }
            other => {
                return Err(unsupported(format!("unrecognized token `{other}`")));
            }
        }
    }
    Ok(compound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, ROOT};

    const DOC: &str = r#"
        <main>
          <form id="signup" class="stack wide">
            <input type="text" name="email">
            <div><input type="checkbox" name="terms"></div>
          </form>
          <form id="login"><input type="password"></form>
        </main>
    "#;

    fn select(selector: &str) -> Vec<String> {
        let arena = Arena::parse(DOC);
        Selector::parse(selector)
            .unwrap()
            .select(&arena, ROOT)
            .into_iter()
            .map(|id| {
                let el = arena.element(id).unwrap();
                format!(
                    "{}{}",
                    el.tag,
                    el.attr("id").map(|i| format!("#{i}")).unwrap_or_default()
                )
            })
            .collect()
    }

    #[test]
    fn test_tag_id_and_class_selectors() {
        assert_eq!(select("form"), vec!["form#signup", "form#login"]);
        assert_eq!(select("#signup"), vec!["form#signup"]);
        assert_eq!(select("form.stack"), vec!["form#signup"]);
        assert_eq!(select(".wide.stack"), vec!["form#signup"]);
        assert!(select(".missing").is_empty());
    }

    #[test]
    fn test_attribute_selectors() {
        assert_eq!(select("input[type=checkbox]"), vec!["input"]);
        assert_eq!(select("input[type=\"password\"]"), vec!["input"]);
        assert_eq!(select("input[name]").len(), 2);
    }

    #[test]
    fn test_descendant_and_child_combinators() {
        assert_eq!(select("form input").len(), 3);
        assert_eq!(select("form > input").len(), 2);
        assert_eq!(select("#signup > div > input[type=checkbox]"), vec!["input"]);
        assert!(select("#login div").is_empty());
    }

    #[test]
    fn test_scoped_matching_stays_inside_scope() {
        let arena = Arena::parse(DOC);
        let signup = Selector::parse("#signup").unwrap().select(&arena, ROOT)[0];
        let selector = Selector::parse("main input").unwrap();
        // `main` lies outside the scope subtree, so nothing can satisfy the
        // left-hand compound from inside it.
        assert!(selector.select(&arena, signup).is_empty());
        assert_eq!(Selector::parse("input").unwrap().select(&arena, signup).len(), 2);
    }

    #[test]
    fn test_unsupported_syntax_is_a_deterministic_error() {
        assert!(matches!(Selector::parse(""), Err(Error::EmptySelector)));
        for bad in ["input:checked", "form > ", "a + b", "[=x]", "form["] {
            let first = Selector::parse(bad).unwrap_err().to_string();
            let second = Selector::parse(bad).unwrap_err().to_string();
            assert_eq!(first, second, "error for `{bad}` must be stable");
        }
    }
}
