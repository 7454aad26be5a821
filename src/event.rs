/// A line of the fancy template after parsing.
///
/// The raw bytes are kept as read (newline included) so byte accounting and
/// message slicing work on exactly what rsyslog sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub raw: Vec<u8>,
    pub hostname: String,
    pub program: String,
    pub severity: String,
    /// Offset of the message body within `raw`.
    pub msg_pos: usize,
    /// Unix nanoseconds; only resolved when the line is parsed for forwarding.
    pub timestamp_ns: Option<i64>,
    /// Replacement message produced by the transform command.
    pub msg: Option<String>,
}

impl LogLine {
    /// Message body as received, including the line terminator.
    pub fn message_bytes(&self) -> &[u8] {
        &self.raw[self.msg_pos.min(self.raw.len())..]
    }

    pub fn raw_len(&self) -> usize {
        self.raw.len()
    }

    /// Text sent to Loki: the rewritten message if any, otherwise the body,
    /// without the trailing line terminator.
    pub fn shipped_line(&self) -> String {
        let text = match &self.msg {
            Some(msg) => msg.clone(),
            None => String::from_utf8_lossy(self.message_bytes()).into_owned(),
        };
        trim_line_end(&text).to_string()
    }
}

fn trim_line_end(s: &str) -> &str {
    s.strip_suffix('\n')
        .map(|s| s.strip_suffix('\r').unwrap_or(s))
        .unwrap_or(s)
}
