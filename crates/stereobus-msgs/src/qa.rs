//! Quality-assurance findings.
//!
//! Each finding is a 320-byte record of NUL-terminated, fixed-width strings:
//! ```text
//! ┌─────────┬──────────┬──────────┬─────────┬───────┬──────────┬─────┐
//! │ Domain  │ Key      │ Message  │ Unit    │ Value │ Severity │ Pad │
//! │ (32B)   │ (128B)   │ (128B)   │ (16B)   │ (f64) │ (1B)     │ (7B)│
//! └─────────┴──────────┴──────────┴─────────┴───────┴──────────┴─────┘
//! ```
//! Strings longer than their field minus the terminator are cut at the last
//! UTF-8 character boundary that fits.

use std::fmt;

use tracing::warn;

use crate::config::CodecConfig;
use crate::error::Result;
use crate::header::MessageKind;
use crate::message::Message;
use crate::wire::{WireReader, WireWriter};

/// Size of the fixed region before the findings.
pub const QA_HEADER_SIZE: usize = 64;

/// Wire size of one [`Finding`].
pub const FINDING_SIZE: usize = 320;

pub const DOMAIN_WIDTH: usize = 32;
pub const KEY_WIDTH: usize = 128;
pub const MESSAGE_WIDTH: usize = 128;
pub const UNIT_WIDTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    #[default]
    Info = 0,
    Warning = 1,
    Error = 2,
}

impl Severity {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Severity::Info),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Error),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single QA check result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Finding {
    /// Subsystem that produced the finding, e.g. `"calibration"`.
    pub domain: String,
    pub key: String,
    pub message: String,
    pub unit: String,
    pub value: f64,
    pub severity: Severity,
}

impl Finding {
    pub fn new(
        domain: impl Into<String>,
        key: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            key: key.into(),
            message: message.into(),
            severity,
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: f64, unit: impl Into<String>) -> Self {
        self.value = value;
        self.unit = unit.into();
        self
    }

    fn write(&self, w: &mut WireWriter<'_>) {
        put_fixed_str(w, &self.domain, DOMAIN_WIDTH);
        put_fixed_str(w, &self.key, KEY_WIDTH);
        put_fixed_str(w, &self.message, MESSAGE_WIDTH);
        put_fixed_str(w, &self.unit, UNIT_WIDTH);
        w.f64(self.value);
        w.u8(self.severity as u8);
        w.zeros(7);
    }

    fn read(r: &mut WireReader) -> Result<Self> {
        let domain = get_fixed_str(r, DOMAIN_WIDTH)?;
        let key = get_fixed_str(r, KEY_WIDTH)?;
        let message = get_fixed_str(r, MESSAGE_WIDTH)?;
        let unit = get_fixed_str(r, UNIT_WIDTH)?;
        let value = r.f64()?;
        let raw = r.u8()?;
        r.skip(7)?;
        let severity = Severity::from_u8(raw).unwrap_or_else(|| {
            warn!(severity = raw, %key, "unknown QA severity, treating as INFO");
            Severity::Info
        });
        Ok(Self {
            domain,
            key,
            message,
            unit,
            value,
            severity,
        })
    }
}

/// The longest prefix of `s` that fits in `max` bytes without splitting a character.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn put_fixed_str(w: &mut WireWriter<'_>, s: &str, width: usize) {
    let text = truncate_utf8(s, width - 1);
    w.bytes(text.as_bytes());
    w.zeros(width - text.len());
}

fn get_fixed_str(r: &mut WireReader, width: usize) -> Result<String> {
    let field = r.bytes(width)?;
    let end = field.iter().position(|b| *b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

/// All findings for one frame, in producer order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QaFindings {
    pub time: u64,
    pub frame_id: u64,
    pub findings: Vec<Finding>,
}

impl QaFindings {
    pub fn new(time: u64, frame_id: u64, findings: Vec<Finding>) -> Self {
        Self {
            time,
            frame_id,
            findings,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// The most severe finding level, if any findings are present.
    pub fn worst(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }
}

impl Message for QaFindings {
    const KIND: MessageKind = MessageKind::QaFindings;

    fn required_size(&self) -> usize {
        QA_HEADER_SIZE + self.findings.len() * FINDING_SIZE
    }

    fn write_body(&self, w: &mut WireWriter<'_>) {
        w.array_header(self.time, self.frame_id, self.findings.len(), QA_HEADER_SIZE);
        for finding in &self.findings {
            finding.write(w);
        }
    }

    fn read_body(r: &mut WireReader, config: &CodecConfig) -> Result<Self> {
        let (time, frame_id, count) = r.array_header("findings", QA_HEADER_SIZE, config)?;
        r.ensure(count.saturating_mul(FINDING_SIZE))?;
        let findings = (0..count)
            .map(|_| Finding::read(r))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            time,
            frame_id,
            findings,
        })
    }
}
