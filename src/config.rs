use anyhow::{bail, Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tracing::warn;

use crate::cli::Cli;
use crate::loki::{LokiConfig, ShipperConfig};
use crate::parallel::ParallelConfig;
use crate::transform::CommandTransform;

/// Main configuration struct for fancy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FancyConfig {
    pub parallel: ParallelConfig,
    pub output: OutputConfig,
}

/// Where parsed records end up; the two modes are exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputConfig {
    Metrics(MetricsConfig),
    Loki(ForwardConfig),
}

/// Metric-only mode configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    pub address: SocketAddr,
    pub tag: String,
    pub tag_filter: String,
}

/// Forwarding mode configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardConfig {
    pub client: LokiConfig,
    pub shipper: ShipperConfig,
    pub command: Option<CommandTransform>,
}

impl FancyConfig {
    /// Validate the parsed command line.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.workers == 0 {
            bail!("--workers must be at least 1");
        }
        if cli.scan_queue == 0 {
            bail!("--scan-queue must be at least 1");
        }

        let parallel = ParallelConfig {
            num_workers: cli.workers,
            batch_queue_capacity: cli.scan_queue,
            output_queue_capacity: cli.chan_size,
        };

        let output = if cli.metric_only {
            if !cli.cmd.is_empty() {
                warn!("--cmd is ignored with --metric-only");
            }
            if cli.prom_tag.is_empty() && !cli.prom_tag_filter.is_empty() {
                warn!("--prom-tag-filter has no effect without --prom-tag");
            }
            OutputConfig::Metrics(MetricsConfig {
                address: parse_listen_addr(&cli.prom_addr)?,
                tag: cli.prom_tag.clone(),
                tag_filter: cli.prom_tag_filter.clone(),
            })
        } else {
            if cli.chan_size == 0 {
                bail!("--chan-size must be at least 1");
            }
            if cli.batch_size == 0 {
                bail!("--batch-size must be at least 1");
            }
            if cli.batch_wait == 0 {
                bail!("--batch-wait must be at least 1 second");
            }
            OutputConfig::Loki(ForwardConfig {
                client: LokiConfig {
                    url: validate_loki_url(&cli.loki_url)?,
                    tenant_id: cli.loki_tenant.clone().filter(|t| !t.is_empty()),
                    max_retries: cli.loki_retries,
                    ..LokiConfig::default()
                },
                shipper: ShipperConfig {
                    batch_bytes: cli.batch_size,
                    batch_wait: Duration::from_secs(cli.batch_wait),
                },
                command: CommandTransform::from_command_line(&cli.cmd),
            })
        };

        Ok(Self { parallel, output })
    }

    pub fn metric_only(&self) -> bool {
        matches!(self.output, OutputConfig::Metrics(_))
    }
}

/// Parse a listen address; a bare `:port` listens on all interfaces.
pub fn parse_listen_addr(addr: &str) -> Result<SocketAddr> {
    if let Some(port) = addr.strip_prefix(':') {
        let port: u16 = port
            .parse()
            .with_context(|| format!("Invalid --prom-addr {:?}: bad port", addr))?;
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }
    addr.parse()
        .with_context(|| format!("Invalid --prom-addr {:?}: expected host:port", addr))
}

fn validate_loki_url(raw: &str) -> Result<String> {
    let parsed =
        url::Url::parse(raw).with_context(|| format!("Invalid --loki-url {:?}", raw))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.to_string()),
        other => bail!("Invalid --loki-url {:?}: unsupported scheme {:?}", raw, other),
    }
}
