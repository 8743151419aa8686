//! somqc library: application logic for the SOM sheet quality-control tool.

pub mod app;
pub mod config;
pub mod errors;
pub mod loader;
