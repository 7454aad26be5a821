pub mod fancy;

pub use fancy::FancyParser;

use crate::error::ParseError;
use crate::event::LogLine;

/// Turns one raw input line into a structured record.
///
/// `metric_only` lets implementations skip work that only the forwarding path
/// needs.
pub trait LineParser: Send + Sync {
    fn parse(&self, raw: Vec<u8>, metric_only: bool) -> Result<LogLine, ParseError>;
}
