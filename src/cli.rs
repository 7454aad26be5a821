// CLI-specific types and structures
// This module contains the command-line interface definitions

use clap::Parser;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "fancy")]
#[command(about = "Forward rsyslog fancy-template lines to Loki or count them as Prometheus metrics")]
#[command(
    long_about = "Forward rsyslog fancy-template lines to Loki or count them as Prometheus metrics\n\nReads lines of the form\n  <rfc3339-timestamp> <hostname> <program> <severity> <message>\non stdin, as produced by the rsyslog template\n  \"%TIMESTAMP:::date-rfc3339% %HOSTNAME% %PROGRAMNAME% %syslogseverity-text% %msg%\\n\"\n\nMODES:\n  (default)      Ship every record to Loki\n  --metric-only  Count records per hostname/program/level and serve /metrics\n\nEXAMPLES:\n  fancy --loki-url http://loki:3100 --cmd 'sed -e s/password=[^ ]*/password=***/'\n  fancy --metric-only --prom-addr :9100 --prom-tag sshd --prom-tag-filter 'Failed password'"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// External command run per record; gets the message on stdin, its stdout replaces the message
    #[arg(long = "cmd", default_value = "", help_heading = "Forwarding Options")]
    pub cmd: String,

    /// Loki base URL
    #[arg(
        long = "loki-url",
        default_value = "http://localhost:3100",
        help_heading = "Forwarding Options"
    )]
    pub loki_url: String,

    /// Loki tenant, sent as X-Scope-OrgID
    #[arg(long = "loki-tenant", help_heading = "Forwarding Options")]
    pub loki_tenant: Option<String>,

    /// Retries for a failed Loki push
    #[arg(long = "loki-retries", default_value_t = 2, help_heading = "Forwarding Options")]
    pub loki_retries: u32,

    /// Output queue capacity; records beyond it are dropped
    #[arg(long = "chan-size", default_value_t = 10000, help_heading = "Forwarding Options")]
    pub chan_size: usize,

    /// Bytes to accumulate before pushing a batch to Loki
    #[arg(long = "batch-size", default_value_t = 102400, help_heading = "Forwarding Options")]
    pub batch_size: usize,

    /// Maximum seconds to wait before pushing a batch to Loki
    #[arg(long = "batch-wait", default_value_t = 4, help_heading = "Forwarding Options")]
    pub batch_wait: u64,

    /// Only count records and export them as Prometheus metrics
    #[arg(long = "metric-only", help_heading = "Metrics Options")]
    pub metric_only: bool,

    /// Address for the /metrics endpoint (":port" listens on all interfaces)
    #[arg(long = "prom-addr", default_value = ":9090", help_heading = "Metrics Options")]
    pub prom_addr: String,

    /// Static value for the "tag" label
    #[arg(long = "prom-tag", default_value = "", help_heading = "Metrics Options")]
    pub prom_tag: String,

    /// Only apply --prom-tag to messages containing this text
    #[arg(long = "prom-tag-filter", default_value = "", help_heading = "Metrics Options")]
    pub prom_tag_filter: String,

    /// Number of worker threads
    #[arg(long = "workers", default_value_t = 8, help_heading = "Performance Options")]
    pub workers: usize,

    /// Capacity of the batch queue between the reader and the workers
    #[arg(long = "scan-queue", default_value_t = 1000, help_heading = "Performance Options")]
    pub scan_queue: usize,

    /// Specify custom configuration file path
    #[arg(long = "config-file", help_heading = "Configuration Options")]
    pub config_file: Option<String>,

    /// Ignore configuration file
    #[arg(long = "ignore-config", help_heading = "Configuration Options")]
    pub ignore_config: bool,

    /// Use profile from configuration file (expanded before parsing)
    #[arg(short = 'p', long = "profile", help_heading = "Configuration Options")]
    pub profile: Vec<String>,
}
