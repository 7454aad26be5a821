use chrono::DateTime;
use regex::bytes::Regex;

use super::LineParser;
use crate::error::{excerpt, ParseError};
use crate::event::LogLine;

/// Severity names rsyslog emits for `%syslogseverity-text%`, plus the
/// deprecated aliases it still accepts.
const SEVERITIES: &[&str] = &[
    "emerg", "alert", "crit", "err", "warning", "notice", "info", "debug", "panic", "error",
    "warn",
];

/// Parser for lines written by the rsyslog template
/// `"%TIMESTAMP:::date-rfc3339% %HOSTNAME% %PROGRAMNAME% %syslogseverity-text% %msg%\n"`.
pub struct FancyParser {
    header_regex: Regex,
}

impl FancyParser {
    pub fn new() -> Self {
        let header_regex =
            Regex::new(r"^([^ \r\n]+) ([^ \r\n]+) ([^ \r\n]+) ([^ \r\n]+)(?: |\r?\n|$)")
                .expect("fancy header regex is valid");
        Self { header_regex }
    }

    fn parse_timestamp(value: &str) -> Result<i64, ParseError> {
        let ts = DateTime::parse_from_rfc3339(value).map_err(|source| {
            ParseError::InvalidTimestamp {
                value: value.to_string(),
                source,
            }
        })?;
        ts.timestamp_nanos_opt()
            .ok_or_else(|| ParseError::TimestampOutOfRange(value.to_string()))
    }
}

impl Default for FancyParser {
    fn default() -> Self {
        Self::new()
    }
}

fn field<'a>(captures: &regex::bytes::Captures<'a>, idx: usize) -> &'a str {
    // The character classes only match whole UTF-8 sequences.
    captures
        .get(idx)
        .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
        .unwrap_or_default()
}

impl LineParser for FancyParser {
    fn parse(&self, raw: Vec<u8>, metric_only: bool) -> Result<LogLine, ParseError> {
        let captures = self
            .header_regex
            .captures(&raw)
            .ok_or_else(|| ParseError::Malformed(excerpt(&raw)))?;

        let severity = field(&captures, 4);
        if !SEVERITIES.contains(&severity) {
            return Err(ParseError::UnknownSeverity(severity.to_string()));
        }

        // Metric-only mode never looks at the time, so skip the parse.
        let timestamp_ns = if metric_only {
            None
        } else {
            Some(Self::parse_timestamp(field(&captures, 1))?)
        };

        let hostname = field(&captures, 2).to_string();
        let program = field(&captures, 3).to_string();
        let severity = severity.to_string();
        let msg_pos = captures.get(0).map_or(raw.len(), |m| m.end());

        Ok(LogLine {
            raw,
            hostname,
            program,
            severity,
            msg_pos,
            timestamp_ns,
            msg: None,
        })
    }
}
