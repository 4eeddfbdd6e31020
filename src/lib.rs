//! # Fiscal Ledger
//!
//! Fiscal-year calendars and interval-based code classification for
//! preparing regulatory filings from ledger and ageing extracts.
//!
//! ## Core Concepts
//!
//! - **Fiscal Calendar**: a window of fiscal years around a baseline year,
//!   anchored on an arbitrary year-end (leap days included)
//! - **Bucket Labels**: `"0 - 30"`, `"150+"` or `"4010"`, parsed into
//!   numeric intervals with per-bound closure
//! - **Bucket Map**: ordered named buckets, each the union of one or more
//!   intervals
//! - **Classification**: records partitioned into matched and unmatched sets
//!   per bucket, with regrouping into custom ranges and totals
//!
//! ## Example
//!
//! ```rust,ignore
//! use fiscal_ledger::*;
//! use chrono::NaiveDate;
//!
//! let calendar = FiscalCalendar::from_end(NaiveDate::from_ymd_opt(2023, 6, 30).unwrap())?;
//! let buckets = BucketMap::from_code_definitions(vec![
//!     ("cash", "1000-1099"),
//!     ("receivables", "1200-1299, 1350"),
//! ])?;
//!
//! let records = vec![Record::new()
//!     .with("date", "2023-06-30")
//!     .with("code", 1010.0)
//!     .with("amount", 250.0)];
//!
//! let annotated = Annotator::new(&calendar, &buckets, "date", "code").annotate_all(&records)?;
//! assert_eq!(annotated[0].fiscal_year, 2023);
//! assert!(annotated[0].is_member("cash"));
//! ```

pub mod buckets;
pub mod calendar;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod interval;
pub mod schema;
pub mod table;
pub mod utils;

pub use buckets::{classify_scalar, normalize, parse_code_list, Bucket, BucketMap};
pub use calendar::{Boundaries, Boundary, FiscalCalendar, FiscalYear};
pub use classifier::{
    assign_groups, classify_against_buckets, classify_selected, require_all_buckets_covered,
    resolve_bucket_intervals, total_by_group, BucketFlags, Classification, GroupAssignment,
    LedgerClassifier, PivotTable,
};
pub use engine::{
    age_records, ageing_bucket, days_overdue, Annotator, BucketMembership, ClassifiedRecord,
};
pub use error::{ErrorKind, FiscalLedgerError, Result};
pub use ingestion::{convert_tb_to_table, read_records_csv, TrialBalanceRow};
pub use interval::{
    overlaps, parse_bucket_label, BucketLabel, NamedInterval, PersistedInterval,
    PERSISTED_OPEN_UPPER,
};
pub use schema::*;
pub use table::{FieldValue, Record, Table};

use log::info;

/// Builds the calendar and bucket map described by `config` and annotates
/// `records` against every ledger bucket.
pub fn annotate_with_config(
    config: &EngineConfig,
    records: &[Record],
    date_column: &str,
    code_column: &str,
) -> Result<Vec<ClassifiedRecord>> {
    let calendar = config.calendar.build()?;
    let bucket_map = config.ledger_bucket_map()?;
    if !config.groups.is_empty() {
        require_all_buckets_covered(&config.groups, &bucket_map)?;
    }

    info!(
        "Annotating {} records against {} ledger buckets",
        records.len(),
        bucket_map.len()
    );
    Annotator::new(&calendar, &bucket_map, date_column, code_column).annotate_all(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_annotate_with_config() {
        let config = EngineConfig {
            calendar: CalendarConfig {
                fy_end_date: NaiveDate::from_ymd_opt(2023, 12, 31),
                ..CalendarConfig::default()
            },
            ledger_buckets: vec![BucketDefinition {
                name: "cash".to_string(),
                codes: "1000-1099".to_string(),
            }],
            ..EngineConfig::default()
        };
        let records = vec![Record::new()
            .with("date", "2023-12-31")
            .with("code", "1010")
            .with("amount", 10.0)];

        let annotated = annotate_with_config(&config, &records, "date", "code").unwrap();
        assert_eq!(annotated[0].fiscal_year, 2023);
        assert!(annotated[0].is_complete_period);
        assert!(annotated[0].is_member("cash"));
    }

    #[test]
    fn test_annotate_with_config_checks_groups() {
        let config = EngineConfig {
            calendar: CalendarConfig {
                fy_end_date: NaiveDate::from_ymd_opt(2023, 12, 31),
                ..CalendarConfig::default()
            },
            ledger_buckets: vec![
                BucketDefinition {
                    name: "cash".to_string(),
                    codes: "1000-1099".to_string(),
                },
                BucketDefinition {
                    name: "loans".to_string(),
                    codes: "2500-2599".to_string(),
                },
            ],
            groups: vec![GroupDefinition {
                name: "assets".to_string(),
                buckets: vec!["cash".to_string()],
            }],
            ..EngineConfig::default()
        };

        let err = annotate_with_config(&config, &[], "date", "code").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingAssignment);
    }
}
