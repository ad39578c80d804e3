//! Seedsort: pumpkin seed classification library
//!
//! A deterministic preprocessing chain (outlier clamp, correlation filter,
//! feature scaler) in front of a pluggable classifier. Parameters are fitted
//! once on training data, frozen in a [`pipeline::ParameterBundle`], and
//! reused unchanged at serving time.

pub mod cli;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod service;
pub mod utils;
