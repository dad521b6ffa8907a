pub mod arch;
pub mod error;
pub mod matrix;

pub use error::{MlErr, Result};
