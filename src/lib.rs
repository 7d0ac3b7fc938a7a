//! jupyter-energi - energy profiling for marked notebook code
//!
//! Runs a program (or a marked notebook block) under an external energy
//! profiler, loads the sampled measurements, and derives power-over-time
//! series for charts and summaries.

pub mod cli;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod extractor;
pub mod html_output;
pub mod json_output;
pub mod launcher;
pub mod measurement;
pub mod notebook;
pub mod orchestrator;
pub mod report;
pub mod series;
pub mod stats;
