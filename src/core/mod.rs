//! Errors, logging, camera snapshot and frame timing shared by every module

pub mod camera;
pub mod error;
pub mod logging;
pub mod time;
pub mod types;

pub use error::Error;
pub use types::*;
