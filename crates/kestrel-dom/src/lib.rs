mod arena;
mod driver;
mod error;
mod selector;

pub use driver::{DomDriver, Interaction, SubmitVia};
pub use error::{Error, Result};

use kestrel_core::Session;
use std::sync::Arc;

/// Bind a chain session to an in-memory render of `html`.
///
/// The resulting engine has a reduced effective capability set: navigation
/// and path assertions fail deterministically, everything else runs against
/// the parsed document.
pub fn session_from_html(html: &str) -> Session {
    Session::new(Arc::new(DomDriver::from_html(html)))
}
