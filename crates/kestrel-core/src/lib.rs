pub mod driver;
pub mod error;
pub mod session;
pub mod trace;

pub use driver::{Driver, HasFilter, QueryMap};
pub use error::{DriverError, Result, StepFailure};
pub use session::Session;
pub use trace::StepStatus;
