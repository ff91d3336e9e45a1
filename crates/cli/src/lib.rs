//! Library half of the `pdfb` command-line driver.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod styles;
