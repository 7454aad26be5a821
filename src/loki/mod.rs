//! Loki push exporter
//!
//! Forwarded lines are grouped by `{hostname, program, level}` and pushed
//! to `/loki/api/v1/push` from a single shipper thread that flushes on size
//! or age.

mod client;
mod payload;
mod shipper;

pub use client::{LokiClient, LokiConfig, LokiError};
pub use payload::{group_lines_for_push, LokiPushRequest, LokiStream};
pub use shipper::{Shipper, ShipperConfig, ShipperSummary};
