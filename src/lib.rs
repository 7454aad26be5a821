// Core library for the fancy log forwarding agent

pub mod admin;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod error;
pub mod event;
pub mod logging;
pub mod loki;
pub mod metrics;
pub mod parallel;
pub mod parsers;
pub mod runner;
pub mod stats;
pub mod transform;

pub use cli::Cli;
pub use config::{FancyConfig, ForwardConfig, MetricsConfig, OutputConfig};
pub use error::{ParseError, TransformError};
pub use event::LogLine;
pub use metrics::{PromCounters, ScanCounters};
pub use parallel::{BatcherSummary, InputEnd, ParallelConfig, ParallelProcessor, WorkerPool};
pub use parsers::{FancyParser, LineParser};
pub use runner::{run, RunOutcome, Sink};
pub use stats::{PipelineStats, StatsSnapshot};
pub use transform::{CommandTransform, MessageTransform};
