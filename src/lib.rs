//! CV screener core library

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod providers;
pub mod reference;
pub mod scoring;
pub mod screening;

pub use config::Config;
pub use error::{Result, ScreenerError};
