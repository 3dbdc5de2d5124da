//! xcat-web - HTTP adapter that runs xCAT commands and returns their output as JSON

pub mod config;
pub mod error;
pub mod types;

pub mod dispatch;
pub mod flatten;
pub mod api;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
