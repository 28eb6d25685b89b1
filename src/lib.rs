pub mod error;
pub mod memory;
pub mod processor;
pub mod report;

pub use error::{Result, VmError};
