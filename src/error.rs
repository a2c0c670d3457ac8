use thiserror::Error;

/// Errors arising from HID report parsing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty input report")]
    EmptyReport,

    #[error("report 0x{tag:02X} too short: need {need} bytes, got {got}{}", format_raw_suffix(raw))]
    ReportTooShort {
        tag: u8,
        need: usize,
        got: usize,
        /// Raw report bytes for debug context.
        raw: Vec<u8>,
    },

    #[error("field {field} out of bounds: need {need} bytes, got {got}")]
    FieldOutOfBounds {
        field: &'static str,
        need: usize,
        got: usize,
    },
}

impl ProtocolError {
    /// Create a `ReportTooShort` error (raw bytes filled in later via `with_raw`).
    pub(crate) fn report_too_short(tag: u8, need: usize, got: usize) -> Self {
        Self::ReportTooShort { tag, need, got, raw: Vec::new() }
    }

    /// Attach raw report bytes to decode-phase errors for diagnostics.
    pub fn with_raw(self, report: &[u8]) -> Self {
        match self {
            Self::ReportTooShort { tag, need, got, .. } => {
                Self::ReportTooShort { tag, need, got, raw: report.to_vec() }
            }
            other => other,
        }
    }
}

/// Format raw bytes as a suffix like " | 3F0008..." (empty if no bytes).
fn format_raw_suffix(raw: &[u8]) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let limit = 16;
    let hex: String = raw.iter().take(limit).map(|b| format!("{b:02X}")).collect();
    let ellipsis = if raw.len() > limit { "..." } else { "" };
    format!(" | {hex}{ellipsis}")
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
