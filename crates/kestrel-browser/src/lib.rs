//! Real-browser back end for kestrel chains, driving Chrome over the
//! DevTools Protocol via chromiumoxide.

pub mod chrome_finder;
mod driver;
mod error;
mod js;
mod launcher;
mod path_match;

pub use chrome_finder::find_chrome;
pub use driver::BrowserDriver;
pub use error::{Error, Result};
pub use launcher::{BrowserSession, LaunchOptions};
