use crate::error::{FiscalLedgerError, Result};
use crate::utils::parse_iso_date;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    /// Numbers pass through; text is trimmed and parsed. NaN and the
    /// infinities are not numbers here.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Date(_) => None,
        };
        value.filter(|n| n.is_finite())
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Text(s) => parse_iso_date(s),
            FieldValue::Number(_) => None,
        }
    }

    /// Infers the most specific value for a raw cell: number, then ISO date,
    /// then text.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return FieldValue::Number(n);
            }
        }
        if let Some(d) = parse_iso_date(trimmed) {
            return FieldValue::Date(d);
        }
        FieldValue::Text(raw.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Date(d) => write!(f, "{}", d),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

/// One row of a ledger or ageing extract, addressed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

pub type Table = Vec<Record>;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn require(&self, column: &str) -> Result<&FieldValue> {
        self.get(column)
            .ok_or_else(|| FiscalLedgerError::MissingColumn(column.to_string()))
    }

    pub fn number(&self, column: &str) -> Result<f64> {
        let value = self.require(column)?;
        value.as_number().ok_or_else(|| FiscalLedgerError::InvalidField {
            column: column.to_string(),
            value: value.to_string(),
            expected: "a number",
        })
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate> {
        let value = self.require(column)?;
        value.as_date().ok_or_else(|| FiscalLedgerError::InvalidField {
            column: column.to_string(),
            value: value.to_string(),
            expected: "a YYYY-MM-DD date",
        })
    }

    /// Display form of a column, used as a grouping key.
    pub fn text(&self, column: &str) -> Result<String> {
        Ok(self.require(column)?.to_string())
    }
}
