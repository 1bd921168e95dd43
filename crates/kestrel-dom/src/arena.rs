use scraper::Html;
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

/// One parsed element with its live interaction state.
///
/// `value`, `checked` and `selected` start from the parsed attributes and
/// are mutated by form interactions; `attrs` keeps the parsed attributes
/// untouched for structural matching.
#[derive(Debug)]
pub(crate) struct ElementData {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub value: String,
    pub checked: bool,
    pub selected: bool,
    pub disabled: bool,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn input_type(&self) -> &str {
        self.attr("type").unwrap_or("text")
    }
}

#[derive(Debug)]
pub(crate) enum NodeData {
    Root,
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// Owned document arena built once from an HTML parse.
///
/// html5ever (via scraper) does the parsing; the scraper tree is copied
/// into this arena and dropped, because its tendril-backed strings are not
/// `Send` and the driver holding the arena must be.
pub(crate) struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut arena = Arena {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Root,
            }],
        };
        arena.copy_children(document.tree.root(), ROOT);
        arena
    }

    fn copy_children(&mut self, from: ego_tree::NodeRef<'_, scraper::Node>, parent: NodeId) {
        for child in from.children() {
            match child.value() {
                scraper::Node::Element(el) => {
                    let mut attrs = BTreeMap::new();
                    for (name, value) in el.attrs() {
                        attrs.insert(name.to_ascii_lowercase(), value.to_string());
                    }
                    let data = ElementData {
                        tag: el.name().to_ascii_lowercase(),
                        value: attrs.get("value").cloned().unwrap_or_default(),
                        checked: attrs.contains_key("checked"),
                        selected: attrs.contains_key("selected"),
                        disabled: attrs.contains_key("disabled"),
                        attrs,
                    };
                    let id = self.push(parent, NodeData::Element(data));
                    self.copy_children(child, id);
                }
                scraper::Node::Text(text) => {
                    self.push(parent, NodeData::Text((**text).to_string()));
                }
                _ => {}
            }
        }
    }

    fn push(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    /// All nodes strictly below `id`, in document (preorder) order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[id].children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// Whether `node` lies strictly inside the subtree rooted at `scope`.
    pub fn is_inside(&self, node: NodeId, scope: NodeId) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(id) = current {
            if id == scope {
                return true;
            }
            current = self.nodes[id].parent;
        }
        false
    }

    /// Nearest enclosing `<form>` of `id`, if any.
    pub fn ancestor_form(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.nodes[id].parent;
        while let Some(node) = current {
            if self.element(node).is_some_and(|el| el.tag == "form") {
                return Some(node);
            }
            current = self.nodes[node].parent;
        }
        None
    }

    /// Whitespace-normalized visible text of the subtree at `id`.
    ///
    /// Script and style subtrees contribute nothing.
    pub fn text_of(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        normalize_ws(&out)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].data {
            NodeData::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            NodeData::Element(el) if el.tag == "script" || el.tag == "style" => {}
            _ => {
                for &child in &self.nodes[id].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Resolve a form control through its label, within `scope`.
    ///
    /// A `for` attribute wins (resolved document-wide by id, as in HTML);
    /// otherwise the first control nested inside the label is used.
    pub fn control_for_label(&self, scope: NodeId, label: &str) -> Option<NodeId> {
        let wanted = normalize_ws(label);
        for id in self.descendants(scope) {
            let Some(el) = self.element(id) else { continue };
            if el.tag != "label" || self.text_of(id) != wanted {
                continue;
            }
            if let Some(target) = el.attr("for") {
                if let Some(control) = self.element_by_html_id(target) {
                    return Some(control);
                }
                continue;
            }
            if let Some(control) = self
                .descendants(id)
                .into_iter()
                .find(|&n| self.element(n).is_some_and(|el| is_control_tag(&el.tag)))
            {
                return Some(control);
            }
        }
        None
    }

    /// First input or textarea within `scope` whose placeholder equals
    /// `label`.
    pub fn placeholder_control(&self, scope: NodeId, label: &str) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|&id| {
            self.element(id).is_some_and(|el| {
                (el.tag == "input" || el.tag == "textarea") && el.attr("placeholder") == Some(label)
            })
        })
    }

    fn element_by_html_id(&self, html_id: &str) -> Option<NodeId> {
        self.descendants(ROOT)
            .into_iter()
            .find(|&id| self.element(id).is_some_and(|el| el.attr("id") == Some(html_id)))
    }

    /// Indented structural dump of the subtree at `id`, for diagnostics.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(id, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match &self.nodes[id].data {
            NodeData::Root => {
                for &child in &self.nodes[id].children {
                    self.dump_node(child, depth, out);
                }
                return;
            }
            NodeData::Text(text) => {
                let text = normalize_ws(text);
                if !text.is_empty() {
                    let _ = writeln!(out, "{indent}{text:?}");
                }
                return;
            }
            NodeData::Element(el) => {
                let _ = write!(out, "{indent}<{}", el.tag);
                for (name, value) in &el.attrs {
                    let _ = write!(out, " {name}={value:?}");
                }
                if el.checked {
                    out.push_str(" [checked]");
                }
                if !el.value.is_empty() && el.attr("value") != Some(el.value.as_str()) {
                    let _ = write!(out, " [value={:?}]", el.value);
                }
                out.push_str(">\n");
            }
        }
        for &child in &self.nodes[id].children {
            self.dump_node(child, depth + 1, out);
        }
    }
}

/// Collapse runs of whitespace and trim, the way rendered text reads.
pub(crate) fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_control_tag(tag: &str) -> bool {
    matches!(tag, "input" | "textarea" | "select")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM: &str = r#"
        <form id="signup">
          <label for="email">Email</label>
          <input id="email" type="text" value="seed@example.com">
          <label>Password <input type="password"></label>
          <input type="text" placeholder="Nickname">
          <button type="submit">Sign up</button>
        </form>
    "#;

    #[test]
    fn test_text_of_normalizes_whitespace() {
        let arena = Arena::parse("<p>  Hello,\n   Anonymous! </p><script>let x = 1;</script>");
        assert_eq!(arena.text_of(ROOT), "Hello, Anonymous!");
    }

    #[test]
    fn test_control_for_label_prefers_for_attribute() {
        let arena = Arena::parse(FORM);
        let control = arena.control_for_label(ROOT, "Email").unwrap();
        let el = arena.element(control).unwrap();
        assert_eq!(el.attr("id"), Some("email"));
        assert_eq!(el.value, "seed@example.com");
    }

    #[test]
    fn test_control_for_label_finds_nested_control() {
        let arena = Arena::parse(FORM);
        let control = arena.control_for_label(ROOT, "Password").unwrap();
        assert_eq!(arena.element(control).unwrap().input_type(), "password");
    }

    #[test]
    fn test_placeholder_control_matches_exact_placeholder() {
        let arena = Arena::parse(FORM);
        let control = arena.placeholder_control(ROOT, "Nickname").unwrap();
        assert_eq!(
            arena.element(control).unwrap().attr("placeholder"),
            Some("Nickname")
        );
        assert!(arena.placeholder_control(ROOT, "Nick").is_none());
    }

    #[test]
    fn test_ancestor_form_walks_up() {
        let arena = Arena::parse(FORM);
        let control = arena.control_for_label(ROOT, "Email").unwrap();
        let form = arena.ancestor_form(control).unwrap();
        assert_eq!(arena.element(form).unwrap().attr("id"), Some("signup"));
    }

    #[test]
    fn test_dump_renders_structure_and_live_state() {
        let arena = Arena::parse("<form><input type=\"checkbox\" checked></form>");
        let dump = arena.dump(ROOT);
        assert!(dump.contains("<form>"));
        assert!(dump.contains("[checked]"));
    }
}
