pub mod cli;
pub mod config;
pub mod index;
pub mod monitor;
pub mod source;
