//! Small helpers shared across the CLI

pub mod spinner;
