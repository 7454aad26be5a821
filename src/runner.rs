//! Pipeline execution module
//!
//! Builds the output side for the configured mode, then runs the batcher
//! and worker pool over the input.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

use crate::admin::{self, ScrapeHandle};
use crate::config::{FancyConfig, ForwardConfig, MetricsConfig, OutputConfig};
use crate::loki::{LokiClient, Shipper, ShipperSummary};
use crate::metrics::PromCounters;
use crate::parallel::{BatcherSummary, ParallelProcessor, Route, TagPolicy, WorkerContext, WorkerPool};
use crate::parsers::FancyParser;
use crate::stats::PipelineStats;
use crate::transform::MessageTransform;

/// The background half of a run.
pub enum Sink {
    Metrics {
        counters: Arc<PromCounters>,
        /// `None` when the scrape address could not be bound.
        scrape: Option<ScrapeHandle>,
    },
    Loki {
        shipper: JoinHandle<ShipperSummary>,
    },
}

/// Result of pipeline processing.
///
/// Workers and the sink may still be running; the binary exits without
/// waiting for them.
pub struct RunOutcome {
    pub summary: BatcherSummary,
    pub pool: WorkerPool,
    pub stats: Arc<PipelineStats>,
    pub sink: Sink,
}

/// Run the pipeline until `reader` is exhausted.
pub fn run<R: BufRead>(config: &FancyConfig, reader: R) -> Result<RunOutcome> {
    let stats = Arc::new(PipelineStats::new());

    let (route, sink) = match &config.output {
        OutputConfig::Metrics(metrics) => start_metrics(metrics)?,
        OutputConfig::Loki(forward) => {
            start_forwarding(forward, config.parallel.output_queue_capacity)?
        }
    };

    let ctx = WorkerContext {
        parser: Arc::new(FancyParser::new()),
        route,
        stats: Arc::clone(&stats),
    };

    let processor = ParallelProcessor::new(config.parallel.clone());
    let (summary, pool) = processor.run(reader, ctx)?;

    Ok(RunOutcome {
        summary,
        pool,
        stats,
        sink,
    })
}

fn start_metrics(config: &MetricsConfig) -> Result<(Route, Sink)> {
    let counters =
        Arc::new(PromCounters::new().context("Failed to register Prometheus counters")?);

    let scrape = match admin::start(config.address, Arc::clone(&counters)) {
        Ok(handle) => Some(handle),
        Err(e) => {
            // Counting goes on without an endpoint.
            error!("failed to serve metrics on {}: {}", config.address, e);
            None
        }
    };

    let route = Route::Metrics {
        counters: counters.clone(),
        tag: TagPolicy::new(config.tag.clone(), config.tag_filter.clone()),
    };
    Ok((route, Sink::Metrics { counters, scrape }))
}

fn start_forwarding(config: &ForwardConfig, queue_capacity: usize) -> Result<(Route, Sink)> {
    let client = LokiClient::new(config.client.clone()).context("Failed to build Loki client")?;
    let (output, receiver) = bounded(queue_capacity);

    let shipper = Shipper::new(config.shipper.clone(), client)
        .spawn(receiver)
        .context("Failed to spawn Loki shipper")?;

    let transform = config.command.clone().map(|command| {
        info!("rewriting messages with {:?}", command.program());
        Arc::new(command) as Arc<dyn MessageTransform>
    });

    Ok((Route::Forward { transform, output }, Sink::Loki { shipper }))
}
