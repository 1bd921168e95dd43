use crate::arena::{self, Arena, NodeId, normalize_ws};
use crate::selector::Selector;
use async_trait::async_trait;
use kestrel_core::{Driver, DriverError, HasFilter, QueryMap, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

const NO_NAVIGATION: &str =
    "the in-memory DOM back end renders a fixed document and has no location to navigate or inspect";

/// How a simulated form submission completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitVia {
    /// An explicit submit-typed control inside the form was activated.
    SubmitControl,
    /// No submit control existed; the default completion gesture was used.
    DefaultGesture,
}

/// Ordered record of the interactions a chain performed against the
/// document. There is no application behind the in-memory DOM, so this
/// journal is the observable effect of clicks and submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Clicked { target: String },
    Filled { label: String, value: String },
    Selected { label: String, option: String },
    Toggled { label: String, checked: bool },
    Chose { name: String },
    Submitted { via: SubmitVia },
}

enum ClickKind {
    Any,
    Link,
    Button,
}

/// In-memory DOM back end.
///
/// Parses the document once and simulates interactions against an owned
/// element arena. Navigation and path assertions are deterministic
/// `Unsupported` failures; everything else behaves like the real-browser
/// back end minus an application to react to events.
///
/// Scoped drivers share the arena and the journal but get a fresh
/// last-touched-form slot; the slot is single-slot memory, overwritten by
/// every form interaction and never cleared.
pub struct DomDriver {
    arena: Arc<Mutex<Arena>>,
    journal: Arc<Mutex<Vec<Interaction>>>,
    last_form: Mutex<Option<NodeId>>,
    scope: NodeId,
}

impl DomDriver {
    /// Build a driver over a parsed HTML document.
    pub fn from_html(html: &str) -> Self {
        Self {
            arena: Arc::new(Mutex::new(Arena::parse(html))),
            journal: Arc::new(Mutex::new(Vec::new())),
            last_form: Mutex::new(None),
            scope: arena::ROOT,
        }
    }

    /// Snapshot of the interaction journal, in execution order.
    pub async fn journal(&self) -> Vec<Interaction> {
        self.journal.lock().await.clone()
    }

    fn parse_selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|e| DriverError::Invalid(e.to_string()))
    }

    /// Accessible name of a clickable element: the value of button-like
    /// inputs, otherwise the visible subtree text.
    fn accessible_name(arena: &Arena, id: NodeId) -> String {
        let Some(el) = arena.element(id) else {
            return String::new();
        };
        if el.tag == "input" {
            normalize_ws(&el.value)
        } else {
            arena.text_of(id)
        }
    }

    fn clickable_by_name(
        arena: &Arena,
        scope: NodeId,
        text: &str,
        kind: &ClickKind,
    ) -> Option<NodeId> {
        let wanted = normalize_ws(text);
        let mut matches: Vec<NodeId> = arena
            .descendants(scope)
            .into_iter()
            .filter(|&id| {
                let Some(el) = arena.element(id) else {
                    return false;
                };
                if el.disabled {
                    return false;
                }
                let eligible = match kind {
                    ClickKind::Link => el.tag == "a",
                    ClickKind::Button => {
                        el.tag == "button"
                            || (el.tag == "input"
                                && matches!(el.input_type(), "submit" | "button" | "reset"))
                    }
                    ClickKind::Any => true,
                };
                eligible && Self::accessible_name(arena, id) == wanted
            })
            .collect();
        // Prefer the innermost match: a <div> wrapping a link has the same
        // visible text as the link itself.
        matches = matches
            .iter()
            .copied()
            .filter(|&id| {
                !matches
                    .iter()
                    .any(|&other| other != id && arena.is_inside(other, id))
            })
            .collect();
        matches.first().copied()
    }

    async fn activate(&self, text: &str, kind: ClickKind, what: &str) -> Result<()> {
        let arena = self.arena.lock().await;
        let Some(target) = Self::clickable_by_name(&arena, self.scope, text, &kind) else {
            return Err(DriverError::NotFound(format!(
                "{what} {text:?} (zero elements)"
            )));
        };
        let descriptor = format!(
            "<{}> {:?}",
            arena.element(target).map(|el| el.tag.as_str()).unwrap_or(""),
            normalize_ws(text)
        );
        drop(arena);
        tracing::debug!(%descriptor, "click");
        self.journal.lock().await.push(Interaction::Clicked {
            target: descriptor,
        });
        Ok(())
    }

    /// Resolve a fillable/toggleable control by label first, placeholder
    /// second. Label precedence is unconditional.
    fn labeled_control(arena: &Arena, scope: NodeId, label: &str) -> Option<NodeId> {
        arena
            .control_for_label(scope, label)
            .or_else(|| arena.placeholder_control(scope, label))
    }

    async fn remember_form(&self, form: Option<NodeId>) {
        if let Some(form) = form {
            *self.last_form.lock().await = Some(form);
        }
    }

    async fn set_checked(&self, label: &str, target: bool) -> Result<()> {
        let mut arena = self.arena.lock().await;
        let Some(control) = Self::labeled_control(&arena, self.scope, label) else {
            return Err(DriverError::NotFound(format!(
                "checkbox labelled {label:?} (zero elements)"
            )));
        };
        let el = arena
            .element(control)
            .ok_or_else(|| DriverError::NotFound(format!("checkbox labelled {label:?}")))?;
        if el.tag != "input" || el.input_type() != "checkbox" {
            return Err(DriverError::Invalid(format!(
                "{label:?} resolves to <{}> with type {:?}, not a checkbox",
                el.tag,
                el.input_type()
            )));
        }
        if el.disabled {
            return Err(DriverError::Invalid(format!(
                "checkbox labelled {label:?} is disabled"
            )));
        }
        let form = arena.ancestor_form(control);
        let changed = el.checked != target;
        if changed {
            if let Some(el) = arena.element_mut(control) {
                el.checked = target;
            }
        }
        drop(arena);
        self.remember_form(form).await;
        if changed {
            self.journal.lock().await.push(Interaction::Toggled {
                label: label.to_string(),
                checked: target,
            });
        } else {
            tracing::debug!(label, target, "checkbox already in target state");
        }
        Ok(())
    }
}

#[async_trait]
impl Driver for DomDriver {
    async fn visit(&self, _path: &str) -> Result<()> {
        Err(DriverError::Unsupported {
            operation: "visit",
            reason: NO_NAVIGATION,
        })
    }

    async fn click(&self, text: &str) -> Result<()> {
        self.activate(text, ClickKind::Any, "visible text").await
    }

    async fn click_link(&self, text: &str) -> Result<()> {
        self.activate(text, ClickKind::Link, "link").await
    }

    async fn click_button(&self, text: &str) -> Result<()> {
        self.activate(text, ClickKind::Button, "button").await
    }

    async fn fill_in(&self, label: &str, value: &str) -> Result<()> {
        let mut arena = self.arena.lock().await;
        let Some(control) = Self::labeled_control(&arena, self.scope, label) else {
            return Err(DriverError::NotFound(format!(
                "field labelled or placeholder-matched {label:?} (zero elements)"
            )));
        };
        let el = arena
            .element(control)
            .ok_or_else(|| DriverError::NotFound(format!("field labelled {label:?}")))?;
        if el.tag == "select" {
            return Err(DriverError::Invalid(format!(
                "{label:?} resolves to a <select>; use select_option"
            )));
        }
        if el.disabled {
            return Err(DriverError::Invalid(format!(
                "field labelled {label:?} is disabled"
            )));
        }
        let form = arena.ancestor_form(control);
        if let Some(el) = arena.element_mut(control) {
            el.value = value.to_string();
        }
        drop(arena);
        self.remember_form(form).await;
        self.journal.lock().await.push(Interaction::Filled {
            label: label.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    async fn select_option(&self, label: &str, option: &str) -> Result<()> {
        let mut arena = self.arena.lock().await;
        let Some(control) = arena.control_for_label(self.scope, label) else {
            return Err(DriverError::NotFound(format!(
                "selection control labelled {label:?} (zero elements)"
            )));
        };
        if arena.element(control).map(|el| el.tag.as_str()) != Some("select") {
            return Err(DriverError::Invalid(format!(
                "{label:?} does not resolve to a <select>"
            )));
        }
        let wanted = normalize_ws(option);
        let options: Vec<NodeId> = arena
            .descendants(control)
            .into_iter()
            .filter(|&id| arena.element(id).is_some_and(|el| el.tag == "option"))
            .collect();
        let Some(&target) = options
            .iter()
            .find(|&&id| arena.text_of(id) == wanted)
        else {
            return Err(DriverError::NotFound(format!(
                "option {option:?} in selection control {label:?} (zero elements)"
            )));
        };
        let chosen_value = arena
            .element(target)
            .and_then(|el| el.attr("value").map(str::to_string))
            .unwrap_or_else(|| wanted.clone());
        for id in options {
            if let Some(el) = arena.element_mut(id) {
                el.selected = id == target;
            }
        }
        if let Some(el) = arena.element_mut(control) {
            el.value = chosen_value;
        }
        let form = arena.ancestor_form(control);
        drop(arena);
        self.remember_form(form).await;
        self.journal.lock().await.push(Interaction::Selected {
            label: label.to_string(),
            option: option.to_string(),
        });
        Ok(())
    }

    async fn check(&self, label: &str) -> Result<()> {
        self.set_checked(label, true).await
    }

    async fn uncheck(&self, label: &str) -> Result<()> {
        self.set_checked(label, false).await
    }

    async fn choose(&self, name: &str) -> Result<()> {
        let mut arena = self.arena.lock().await;
        let Some(control) = Self::labeled_control(&arena, self.scope, name) else {
            return Err(DriverError::NotFound(format!(
                "radio labelled {name:?} (zero elements)"
            )));
        };
        let el = arena
            .element(control)
            .ok_or_else(|| DriverError::NotFound(format!("radio labelled {name:?}")))?;
        if el.tag != "input" || el.input_type() != "radio" {
            return Err(DriverError::Invalid(format!(
                "{name:?} does not resolve to a radio control"
            )));
        }
        let group = el.attr("name").map(str::to_string);
        let form = arena.ancestor_form(control);
        // Selecting one radio deselects the rest of its named group.
        if let Some(group) = &group {
            let peers: Vec<NodeId> = arena
                .descendants(arena::ROOT)
                .into_iter()
                .filter(|&id| {
                    arena.element(id).is_some_and(|el| {
                        el.tag == "input"
                            && el.input_type() == "radio"
                            && el.attr("name") == Some(group.as_str())
                    })
                })
                .collect();
            for id in peers {
                if let Some(el) = arena.element_mut(id) {
                    el.checked = id == control;
                }
            }
        } else if let Some(el) = arena.element_mut(control) {
            el.checked = true;
        }
        drop(arena);
        self.remember_form(form).await;
        self.journal.lock().await.push(Interaction::Chose {
            name: name.to_string(),
        });
        Ok(())
    }

    async fn submit(&self) -> Result<()> {
        let Some(form) = *self.last_form.lock().await else {
            return Err(DriverError::NoFormTouched);
        };
        let arena = self.arena.lock().await;
        let submit_control = arena.descendants(form).into_iter().find(|&id| {
            arena.element(id).is_some_and(|el| {
                !el.disabled
                    && ((el.tag == "button" && matches!(el.attr("type"), None | Some("submit")))
                        || (el.tag == "input" && el.input_type() == "submit"))
            })
        });
        drop(arena);
        let via = if submit_control.is_some() {
            SubmitVia::SubmitControl
        } else {
            SubmitVia::DefaultGesture
        };
        tracing::debug!(?via, "submitting last touched form");
        self.journal
            .lock()
            .await
            .push(Interaction::Submitted { via });
        Ok(())
    }

    async fn assert_text(&self, text: &str, present: bool) -> Result<()> {
        let arena = self.arena.lock().await;
        let haystack = arena.text_of(self.scope);
        let found = haystack.contains(&normalize_ws(text));
        match (found, present) {
            (true, true) | (false, false) => Ok(()),
            (false, true) => Err(DriverError::Assertion(format!(
                "expected to find text {text:?}, but it was not visible"
            ))),
            (true, false) => Err(DriverError::Assertion(format!(
                "expected not to find text {text:?}, but it was visible"
            ))),
        }
    }

    async fn assert_selector(
        &self,
        selector: &str,
        filter: &HasFilter,
        present: bool,
    ) -> Result<()> {
        // The document never changes between steps, so the filter's timeout
        // hint has nothing to wait for and is ignored.
        let parsed = Self::parse_selector(selector)?;
        let arena = self.arena.lock().await;
        let mut matches = parsed.select(&arena, self.scope);
        if let Some(text) = &filter.text {
            let wanted = normalize_ws(text);
            matches.retain(|&id| {
                let actual = arena.text_of(id);
                if filter.exact {
                    actual == wanted
                } else {
                    actual.contains(&wanted)
                }
            });
        }
        let found = matches.len();
        let holds = match filter.count {
            Some(count) => found == count,
            None => found > 0,
        };
        if holds == present {
            return Ok(());
        }
        let expectation = format!("{selector:?}{}", filter.describe());
        if present {
            Err(DriverError::Assertion(format!(
                "expected elements matching {expectation}, found {found}"
            )))
        } else {
            Err(DriverError::Assertion(format!(
                "expected {expectation} not to match, but found {found} elements"
            )))
        }
    }

    async fn assert_path(&self, _path: &str, _query: Option<&QueryMap>, _present: bool) -> Result<()> {
        Err(DriverError::Unsupported {
            operation: "assert_path",
            reason: NO_NAVIGATION,
        })
    }

    async fn scoped(&self, selector: &str) -> Result<Box<dyn Driver>> {
        let parsed = Self::parse_selector(selector)?;
        let arena = self.arena.lock().await;
        let Some(&first) = parsed.select(&arena, self.scope).first() else {
            return Err(DriverError::NotFound(format!(
                "selector {selector:?} (zero elements)"
            )));
        };
        Ok(Box::new(DomDriver {
            arena: Arc::clone(&self.arena),
            journal: Arc::clone(&self.journal),
            last_form: Mutex::new(None),
            scope: first,
        }))
    }

    async fn debug_dump(&self) -> Result<()> {
        let arena = self.arena.lock().await;
        let dump = arena.dump(self.scope);
        tracing::info!("DOM snapshot:\n{dump}");
        Ok(())
    }
}
