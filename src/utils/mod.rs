//! Utility helpers - logging setup and terminal output

pub mod logging;
pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;
