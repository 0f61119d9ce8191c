pub mod address;
pub mod cache;
pub mod cache_set;
pub mod callstack;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod error;
pub mod event;
pub mod report;
pub mod victim;

pub use config::Config;
pub use driver::Simulator;
pub use error::{ConfigError, SimError};
pub use event::{FetchEvent, FetchSource, TextTraceReader};
pub use report::Report;
