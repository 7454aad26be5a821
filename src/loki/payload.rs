use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::event::LogLine;

/// Loki Push API request format.
/// POST /loki/api/v1/push
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LokiPushRequest {
    pub streams: Vec<LokiStream>,
}

/// A stream of log entries sharing the same label set.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct LokiStream {
    pub stream: BTreeMap<&'static str, String>,
    pub values: Vec<[String; 2]>,
}

fn now_ns() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

/// Group lines by `{hostname, program, level}` for a push request.
///
/// Loki requires entries to be grouped by label set; entry order inside a
/// stream follows the input order.
pub fn group_lines_for_push(lines: &[LogLine]) -> LokiPushRequest {
    let mut streams: BTreeMap<(&str, &str, &str), Vec<[String; 2]>> = BTreeMap::new();

    for line in lines {
        let ts = line.timestamp_ns.unwrap_or_else(now_ns);
        streams
            .entry((
                line.hostname.as_str(),
                line.program.as_str(),
                line.severity.as_str(),
            ))
            .or_default()
            .push([ts.to_string(), line.shipped_line()]);
    }

    let streams = streams
        .into_iter()
        .map(|((hostname, program, level), values)| LokiStream {
            stream: BTreeMap::from([
                ("hostname", hostname.to_string()),
                ("program", program.to_string()),
                ("level", level.to_string()),
            ]),
            values,
        })
        .collect();

    LokiPushRequest { streams }
}
