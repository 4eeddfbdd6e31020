use crate::buckets::{normalize, BucketMap};
use crate::calendar::{FiscalCalendar, DEFAULT_NUM_POST, DEFAULT_NUM_PRIOR};
use crate::error::{FiscalLedgerError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

fn default_num_prior() -> i64 {
    DEFAULT_NUM_PRIOR as i64
}

fn default_num_post() -> i64 {
    DEFAULT_NUM_POST as i64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalendarConfig {
    #[serde(default)]
    #[schemars(description = "First day of the baseline fiscal year (YYYY-MM-DD). Optional if fy_end_date is given.")]
    pub fy_start_date: Option<NaiveDate>,

    #[serde(default)]
    #[schemars(description = "Last day of the baseline fiscal year (YYYY-MM-DD). Optional if fy_start_date is given.")]
    pub fy_end_date: Option<NaiveDate>,

    #[serde(default = "default_num_prior")]
    #[schemars(description = "Number of fiscal years before the baseline to cover. Defaults to 3.")]
    pub num_prior: i64,

    #[serde(default = "default_num_post")]
    #[schemars(description = "Number of fiscal years after the baseline to cover. Defaults to 3.")]
    pub num_post: i64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            fy_start_date: None,
            fy_end_date: None,
            num_prior: default_num_prior(),
            num_post: default_num_post(),
        }
    }
}

impl CalendarConfig {
    pub fn build(&self) -> Result<FiscalCalendar> {
        let num_prior = window_count("num_prior", self.num_prior)?;
        let num_post = window_count("num_post", self.num_post)?;
        FiscalCalendar::new(self.fy_start_date, self.fy_end_date, num_prior, num_post)
    }
}

fn window_count(name: &str, value: i64) -> Result<i32> {
    i32::try_from(value)
        .ok()
        .filter(|v| *v >= 0)
        .ok_or_else(|| {
            FiscalLedgerError::Configuration(format!(
                "{} must be a non-negative integer (got {})",
                name, value
            ))
        })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BucketDefinition {
    #[schemars(description = "Name of the report variable or account grouping")]
    pub name: String,

    #[schemars(
        description = "Comma-separated code labels: ranges 'A-B', open-ended 'A+' or single codes 'A'. Example: '1000-1099, 1150, 9000+'"
    )]
    pub codes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroupDefinition {
    #[schemars(description = "Name of the custom range, e.g. '0-90' or '>90'")]
    pub name: String,

    #[schemars(description = "Bucket names collapsed into this group. Every bucket must appear in exactly one group.")]
    pub buckets: Vec<String>,
}

/// Everything a report run needs to annotate its records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EngineConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    #[schemars(description = "Ledger/sub-ledger code buckets, in classification order")]
    pub ledger_buckets: Vec<BucketDefinition>,

    #[serde(default)]
    #[schemars(description = "Ageing bucket labels such as '0 - 30' or '150+'")]
    pub ageing_buckets: Vec<String>,

    #[serde(default)]
    #[schemars(description = "Optional regrouping of the ledger buckets")]
    pub groups: Vec<GroupDefinition>,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn ledger_bucket_map(&self) -> Result<BucketMap> {
        BucketMap::from_code_definitions(
            self.ledger_buckets
                .iter()
                .map(|def| (def.name.clone(), def.codes.as_str())),
        )
    }

    pub fn ageing_bucket_map(&self) -> Result<BucketMap> {
        normalize(&self.ageing_buckets)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineConfig)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = Self::generate_json_schema();
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}
