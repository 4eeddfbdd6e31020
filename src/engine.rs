use crate::buckets::BucketMap;
use crate::calendar::FiscalCalendar;
use crate::classifier::GroupAssignment;
use crate::error::Result;
use crate::interval::NamedInterval;
use crate::table::{Record, Table};
use chrono::NaiveDate;
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketMembership {
    pub bucket: String,
    pub matched: bool,
    /// The interval that matched, if any.
    pub interval: Option<NamedInterval>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub record: Record,
    pub fiscal_year: i32,
    /// True only when the record is dated on its fiscal year's last day.
    pub is_complete_period: bool,
    pub memberships: Vec<BucketMembership>,
}

impl ClassifiedRecord {
    pub fn is_member(&self, bucket: &str) -> bool {
        self.memberships
            .iter()
            .any(|m| m.bucket == bucket && m.matched)
    }

    pub fn interval_for(&self, bucket: &str) -> Option<&NamedInterval> {
        self.memberships
            .iter()
            .find(|m| m.bucket == bucket)
            .and_then(|m| m.interval.as_ref())
    }

    pub fn matched_buckets(&self) -> impl Iterator<Item = &str> {
        self.memberships
            .iter()
            .filter(|m| m.matched)
            .map(|m| m.bucket.as_str())
    }
}

/// Attaches fiscal-year and bucket annotations to raw records.
pub struct Annotator<'a> {
    calendar: &'a FiscalCalendar,
    bucket_map: &'a BucketMap,
    date_column: String,
    code_column: String,
}

impl<'a> Annotator<'a> {
    pub fn new(
        calendar: &'a FiscalCalendar,
        bucket_map: &'a BucketMap,
        date_column: impl Into<String>,
        code_column: impl Into<String>,
    ) -> Self {
        Self {
            calendar,
            bucket_map,
            date_column: date_column.into(),
            code_column: code_column.into(),
        }
    }

    pub fn annotate_all(&self, records: &[Record]) -> Result<Vec<ClassifiedRecord>> {
        let names: Vec<&str> = self.bucket_map.names().collect();
        self.annotate(records, &names)
    }

    pub fn annotate<S: AsRef<str>>(
        &self,
        records: &[Record],
        bucket_names: &[S],
    ) -> Result<Vec<ClassifiedRecord>> {
        let buckets = bucket_names
            .iter()
            .map(|name| {
                self.bucket_map
                    .resolve(name.as_ref())
                    .map(|intervals| (name.as_ref(), intervals))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut annotated = Vec::with_capacity(records.len());
        for record in records {
            let date = record.date(&self.date_column)?;
            let code = record.number(&self.code_column)?;
            let fy = self.calendar.fiscal_year_for_date(date)?;

            let memberships: Vec<BucketMembership> = buckets
                .iter()
                .map(|(name, intervals)| {
                    let interval = intervals.iter().find(|i| i.contains(code)).cloned();
                    BucketMembership {
                        bucket: name.to_string(),
                        matched: interval.is_some(),
                        interval,
                    }
                })
                .collect();

            if !memberships.iter().any(|m| m.matched) {
                warn!("Record dated {} with code {} matches no bucket", date, code);
            }

            annotated.push(ClassifiedRecord {
                record: record.clone(),
                fiscal_year: fy.label,
                is_complete_period: fy.is_period_end(date),
                memberships,
            });
        }

        info!(
            "Annotated {} records against {} buckets",
            annotated.len(),
            buckets.len()
        );
        Ok(annotated)
    }

    /// Records dated inside fiscal year `label` whose code falls in any of
    /// `bucket_names`.
    pub fn filter_by_fiscal_year_and_buckets<S: AsRef<str>>(
        &self,
        records: &[Record],
        label: i32,
        bucket_names: &[S],
    ) -> Result<Table> {
        let offset = self.calendar.resolve_offset(Some(label), None)?;
        let fy = self.calendar.fiscal_year_for_offset(offset)?;
        let intervals = bucket_names
            .iter()
            .map(|name| self.bucket_map.resolve(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut selected = Vec::new();
        for record in records {
            if !fy.contains(record.date(&self.date_column)?) {
                continue;
            }
            let code = record.number(&self.code_column)?;
            if intervals.iter().flat_map(|set| set.iter()).any(|i| i.contains(code)) {
                selected.push(record.clone());
            }
        }
        Ok(selected)
    }
}

/// Days between `due` and `as_of`; negative when not yet due.
pub fn days_overdue(as_of: NaiveDate, due: NaiveDate) -> i64 {
    (as_of - due).num_days()
}

pub fn ageing_bucket(
    as_of: NaiveDate,
    due: NaiveDate,
    ageing_buckets: &BucketMap,
) -> Option<&str> {
    ageing_buckets.classify_scalar(days_overdue(as_of, due) as f64)
}

/// Writes each record's ageing bucket into `bucket_column`. Records that are
/// not yet due, or older than every bucket, land in `unmatched`.
pub fn age_records(
    records: &[Record],
    due_column: &str,
    as_of: NaiveDate,
    ageing_buckets: &BucketMap,
    bucket_column: &str,
) -> Result<GroupAssignment> {
    let mut result = GroupAssignment::default();
    for record in records {
        let due = record.date(due_column)?;
        let days = days_overdue(as_of, due);
        let hits = ageing_buckets.matching_buckets(days as f64);
        if hits.len() > 1 {
            warn!(
                "Item due {} is {} days overdue and matches buckets [{}]; using '{}'",
                due,
                days,
                hits.join(", "),
                hits[0]
            );
        }
        match hits.first().copied() {
            Some(bucket) => {
                let mut record = record.clone();
                record.set(bucket_column, bucket);
                result.assigned.push(record);
            }
            None => result.unmatched.push(record.clone()),
        }
    }
    Ok(result)
}
