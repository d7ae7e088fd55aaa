pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod feedme;
pub mod psf;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::BatchConfig;

pub use core::{BatchRunner, BatchSummary, FeedmeBuilder, GalfitmInvoker};
pub use feedme::{parse, read_feedme, render, write_feedme, Model};
pub use utils::error::{GalfitError, Result};
