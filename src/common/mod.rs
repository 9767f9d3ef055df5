//! Scene files and viewer configuration.

pub mod config;
pub mod scene;
