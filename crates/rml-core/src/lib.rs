pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RunnerConfig;
pub use error::{Result, RmlError};
pub use types::*;
