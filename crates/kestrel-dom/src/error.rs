use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("empty selector")]
    EmptySelector,

    #[error("unsupported selector `{0}`: {1}")]
    UnsupportedSelector(String, String),
}

pub type Result<T> = std::result::Result<T, Error>;
