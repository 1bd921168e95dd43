use thiserror::Error;

/// Browser-lifecycle failures: finding and launching Chrome, and the
/// DevTools Protocol connection around the page. Step-level interaction
/// failures are `kestrel_core::DriverError`, not this.
#[derive(Error, Debug)]
pub enum Error {
    #[error("could not launch browser: {0}")]
    Launch(String),

    #[error("devtools protocol failure: {0}")]
    Cdp(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
