//! CLI module - argument parsing and subcommand runners

pub mod args;
pub mod inspect;
pub mod predict;
pub mod train;

pub use args::{BatchArgs, Cli, Commands, InspectArgs, ModelKind, PredictArgs, TrainArgs};
pub use inspect::run_inspect;
pub use predict::{run_batch, run_predict};
pub use train::run_train;
