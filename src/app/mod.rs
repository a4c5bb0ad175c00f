//! Application module

pub mod cli;
pub mod console_engine;
pub mod startup;
