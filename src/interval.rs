use crate::error::{FiscalLedgerError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stand-in for an unbounded upper bound in persisted records.
pub const PERSISTED_OPEN_UPPER: f64 = 999_999.0;

/// The three surface forms a bucket label may take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BucketLabel {
    /// `"A-B"`: both bounds inclusive.
    ClosedRange { lower: f64, upper: f64 },
    /// `"A+"`: `[A, +inf)`.
    OpenEnded { lower: f64 },
    /// `"A"`: the single point `[A, A]`.
    Point(f64),
}

impl BucketLabel {
    pub fn parse(label: &str) -> Result<Self> {
        let text = label.trim();
        if text.is_empty() {
            return Err(FiscalLedgerError::parse(label, "label is empty"));
        }

        if let Some(lower) = text.strip_suffix('+') {
            let lower = parse_bound(label, lower)?;
            return Ok(BucketLabel::OpenEnded { lower });
        }

        // Skip the first character so a leading minus sign stays with the
        // lower bound.
        if let Some(pos) = text.char_indices().skip(1).find(|&(_, c)| c == '-').map(|(i, _)| i) {
            let lower = parse_bound(label, &text[..pos])?;
            let upper = parse_bound(label, &text[pos + 1..])?;
            if lower > upper {
                return Err(FiscalLedgerError::parse(
                    label,
                    format!("lower bound {} exceeds upper bound {}", lower, upper),
                ));
            }
            return Ok(BucketLabel::ClosedRange { lower, upper });
        }

        Ok(BucketLabel::Point(parse_bound(label, text)?))
    }

    pub fn into_interval(self, label: impl Into<String>) -> NamedInterval {
        let label = label.into();
        match self {
            BucketLabel::ClosedRange { lower, upper } => NamedInterval {
                label,
                lower,
                upper,
                lower_closed: true,
                upper_closed: true,
            },
            BucketLabel::OpenEnded { lower } => NamedInterval {
                label,
                lower,
                upper: f64::INFINITY,
                lower_closed: true,
                upper_closed: false,
            },
            BucketLabel::Point(value) => NamedInterval {
                label,
                lower: value,
                upper: value,
                lower_closed: true,
                upper_closed: true,
            },
        }
    }
}

fn parse_bound(label: &str, text: &str) -> Result<f64> {
    let text = text.trim();
    let value: f64 = text
        .parse()
        .map_err(|_| FiscalLedgerError::parse(label, format!("'{}' is not a number", text)))?;
    if !value.is_finite() {
        return Err(FiscalLedgerError::parse(
            label,
            format!("bound '{}' must be finite", text),
        ));
    }
    Ok(value)
}

/// A labelled numeric interval. The upper bound may be `f64::INFINITY`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "PersistedInterval", try_from = "PersistedInterval")]
pub struct NamedInterval {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub lower_closed: bool,
    pub upper_closed: bool,
}

impl NamedInterval {
    pub fn new(
        label: impl Into<String>,
        lower: f64,
        upper: f64,
        lower_closed: bool,
        upper_closed: bool,
    ) -> Result<Self> {
        let label = label.into();
        if lower.is_nan() || upper.is_nan() || lower == f64::INFINITY {
            return Err(FiscalLedgerError::parse(&label, "bounds must be numbers"));
        }
        if lower > upper {
            return Err(FiscalLedgerError::parse(
                &label,
                format!("lower bound {} exceeds upper bound {}", lower, upper),
            ));
        }
        if lower == upper && !(lower_closed && upper_closed) {
            return Err(FiscalLedgerError::parse(
                &label,
                "a single-point interval must be closed on both sides",
            ));
        }
        Ok(Self {
            label,
            lower,
            upper,
            lower_closed,
            upper_closed,
        })
    }

    pub fn is_unbounded(&self) -> bool {
        self.upper == f64::INFINITY
    }

    pub fn contains(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let above_lower = if self.lower_closed {
            value >= self.lower
        } else {
            value > self.lower
        };
        let below_upper = if self.is_unbounded() {
            true
        } else if self.upper_closed {
            value <= self.upper
        } else {
            value < self.upper
        };
        above_lower && below_upper
    }

    /// Canonical label text: `"A - B"`, `"A+"` or `"A"`.
    pub fn to_label(&self) -> String {
        if self.is_unbounded() {
            format!("{}+", self.lower)
        } else if self.lower == self.upper {
            format!("{}", self.lower)
        } else {
            format!("{} - {}", self.lower, self.upper)
        }
    }

    pub fn to_persisted(&self) -> PersistedInterval {
        PersistedInterval::from(self.clone())
    }
}

impl fmt::Display for NamedInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.lower_closed { '[' } else { '(' };
        let close = if self.upper_closed && !self.is_unbounded() {
            ']'
        } else {
            ')'
        };
        if self.is_unbounded() {
            write!(f, "{}: {}{}, inf{}", self.label, open, self.lower, close)
        } else {
            write!(
                f,
                "{}: {}{}, {}{}",
                self.label, open, self.lower, self.upper, close
            )
        }
    }
}

/// Parses one bucket label into an interval named after the trimmed label.
pub fn parse_bucket_label(label: &str) -> Result<NamedInterval> {
    Ok(BucketLabel::parse(label)?.into_interval(label.trim()))
}

pub fn overlaps(a: &NamedInterval, b: &NamedInterval) -> bool {
    let (lower, lower_closed) = if a.lower > b.lower {
        (a.lower, a.lower_closed)
    } else if b.lower > a.lower {
        (b.lower, b.lower_closed)
    } else {
        (a.lower, a.lower_closed && b.lower_closed)
    };

    if a.is_unbounded() && b.is_unbounded() {
        return true;
    }

    let (upper, upper_closed) = if a.is_unbounded() {
        (b.upper, b.upper_closed)
    } else if b.is_unbounded() || a.upper < b.upper {
        (a.upper, a.upper_closed)
    } else if b.upper < a.upper {
        (b.upper, b.upper_closed)
    } else {
        (a.upper, a.upper_closed && b.upper_closed)
    };

    lower < upper || (lower == upper && lower_closed && upper_closed)
}

/// Wire form of [`NamedInterval`]: an unbounded upper bound is written as
/// [`PERSISTED_OPEN_UPPER`] and read back as infinity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PersistedInterval {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    #[serde(default = "default_closed")]
    pub lower_closed: bool,
    #[serde(default = "default_closed")]
    pub upper_closed: bool,
}

fn default_closed() -> bool {
    true
}

impl From<NamedInterval> for PersistedInterval {
    fn from(interval: NamedInterval) -> Self {
        let upper = if interval.is_unbounded() {
            PERSISTED_OPEN_UPPER
        } else {
            interval.upper
        };
        Self {
            label: interval.label,
            lower: interval.lower,
            upper,
            lower_closed: interval.lower_closed,
            upper_closed: interval.upper_closed,
        }
    }
}

impl TryFrom<PersistedInterval> for NamedInterval {
    type Error = FiscalLedgerError;

    fn try_from(persisted: PersistedInterval) -> Result<Self> {
        let upper = if persisted.upper == PERSISTED_OPEN_UPPER {
            f64::INFINITY
        } else {
            persisted.upper
        };
        let upper_closed = persisted.upper_closed && upper.is_finite();
        NamedInterval::new(
            persisted.label,
            persisted.lower,
            upper,
            persisted.lower_closed,
            upper_closed,
        )
    }
}
