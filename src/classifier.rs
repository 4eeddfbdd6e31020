//! Partitioning of ledger records by the numeric code column.
//!
//! Every check here fails closed: an unknown bucket, an unparsable code or an
//! incomplete grouping aborts the whole run rather than letting a bucket
//! silently contribute zero to downstream totals.

use crate::buckets::BucketMap;
use crate::error::{FiscalLedgerError, Result};
use crate::interval::NamedInterval;
use crate::schema::GroupDefinition;
use crate::table::{Record, Table};
use log::{debug, info, warn};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

pub const DEFAULT_GROUP_COLUMN: &str = "bucket_group";

/// Per-record membership flags, aligned with [`Classification::bucket_names`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketFlags {
    pub flags: Vec<bool>,
    pub any_match: bool,
    pub match_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classification {
    pub bucket_names: Vec<String>,
    /// One entry per input record, in input order.
    pub flags: Vec<BucketFlags>,
    pub matched: Table,
    pub unmatched: Table,
}

impl Classification {
    pub fn flag(&self, row: usize, bucket_name: &str) -> Option<bool> {
        let column = self.bucket_names.iter().position(|n| n == bucket_name)?;
        self.flags.get(row).map(|f| f.flags[column])
    }

    /// Rows hitting more than one bucket.
    pub fn overlapping_rows(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, f)| f.match_count > 1)
            .map(|(idx, _)| idx)
            .collect()
    }
}

pub fn resolve_bucket_intervals<'a>(
    bucket_name: &str,
    bucket_map: &'a BucketMap,
) -> Result<&'a [NamedInterval]> {
    bucket_map.resolve(bucket_name)
}

/// Classifies against every bucket in the map.
pub fn classify_against_buckets(
    records: &[Record],
    code_column: &str,
    bucket_map: &BucketMap,
) -> Result<Classification> {
    let names: Vec<&str> = bucket_map.names().collect();
    classify_selected(records, code_column, bucket_map, &names)
}

/// Classifies against the named buckets only. All names are resolved before
/// any record is examined.
pub fn classify_selected<S: AsRef<str>>(
    records: &[Record],
    code_column: &str,
    bucket_map: &BucketMap,
    bucket_names: &[S],
) -> Result<Classification> {
    let resolved = bucket_names
        .iter()
        .map(|name| resolve_bucket_intervals(name.as_ref(), bucket_map))
        .collect::<Result<Vec<_>>>()?;

    let mut flags = Vec::with_capacity(records.len());
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();

    for (row, record) in records.iter().enumerate() {
        let code = record.number(code_column)?;
        let row_flags: Vec<bool> = resolved
            .iter()
            .map(|intervals| intervals.iter().any(|i| i.contains(code)))
            .collect();
        let match_count = row_flags.iter().filter(|&&hit| hit).count();

        if match_count > 1 {
            warn!(
                "Record {} with code {} matches {} buckets",
                row, code, match_count
            );
        }

        if match_count > 0 {
            matched.push(record.clone());
        } else {
            unmatched.push(record.clone());
        }

        flags.push(BucketFlags {
            flags: row_flags,
            any_match: match_count > 0,
            match_count,
        });
    }

    debug!(
        "Classified {} records against {} buckets: {} matched, {} unmatched",
        records.len(),
        resolved.len(),
        matched.len(),
        unmatched.len()
    );

    Ok(Classification {
        bucket_names: bucket_names.iter().map(|n| n.as_ref().to_string()).collect(),
        flags,
        matched,
        unmatched,
    })
}

/// Checks that the groups partition the bucket map exactly and returns the
/// bucket-to-group assignment.
pub fn require_all_buckets_covered(
    groups: &[GroupDefinition],
    bucket_map: &BucketMap,
) -> Result<BTreeMap<String, String>> {
    let mut assignment: BTreeMap<String, String> = BTreeMap::new();

    for group in groups {
        for bucket in &group.buckets {
            if !bucket_map.contains_bucket(bucket) {
                return Err(FiscalLedgerError::UnknownBucket(bucket.clone()));
            }
            if let Some(first_group) = assignment.get(bucket) {
                return Err(FiscalLedgerError::DuplicateAssignment {
                    bucket: bucket.clone(),
                    first_group: first_group.clone(),
                    second_group: group.name.clone(),
                });
            }
            assignment.insert(bucket.clone(), group.name.clone());
        }
    }

    let missing: Vec<String> = bucket_map
        .names()
        .filter(|name| !assignment.contains_key(*name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(FiscalLedgerError::MissingAssignment(missing));
    }

    Ok(assignment)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAssignment {
    /// Records carrying their group name in the group column.
    pub assigned: Table,
    /// Records whose code falls in no bucket.
    pub unmatched: Table,
}

/// Writes each record's group name (via its first matching bucket) into
/// `group_column`.
pub fn assign_groups(
    records: &[Record],
    code_column: &str,
    bucket_map: &BucketMap,
    groups: &[GroupDefinition],
    group_column: &str,
) -> Result<GroupAssignment> {
    let assignment = require_all_buckets_covered(groups, bucket_map)?;
    let mut result = GroupAssignment::default();

    for record in records {
        let code = record.number(code_column)?;
        let hits = bucket_map.matching_buckets(code);
        if hits.len() > 1 {
            warn!(
                "Code {} matches buckets [{}]; assigning via '{}'",
                code,
                hits.join(", "),
                hits[0]
            );
        }
        match hits.first().copied() {
            Some(bucket) => {
                let group = assignment
                    .get(bucket)
                    .ok_or_else(|| FiscalLedgerError::UnknownBucket(bucket.to_string()))?;
                let mut record = record.clone();
                record.set(group_column, group.as_str());
                result.assigned.push(record);
            }
            None => result.unmatched.push(record.clone()),
        }
    }

    Ok(result)
}

/// Sums of a value column, indexed by one column and spread across another.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PivotTable {
    /// Group columns in first-seen order.
    pub groups: Vec<String>,
    pub rows: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PivotTable {
    pub fn get(&self, index: &str, group: &str) -> f64 {
        self.rows
            .get(index)
            .and_then(|row| row.get(group))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn row_total(&self, index: &str) -> f64 {
        self.rows
            .get(index)
            .map(|row| row.values().sum())
            .unwrap_or(0.0)
    }

    pub fn group_total(&self, group: &str) -> f64 {
        self.rows.values().filter_map(|row| row.get(group)).sum()
    }
}

pub fn total_by_group(
    records: &[Record],
    value_column: &str,
    group_column: &str,
    index_column: &str,
) -> Result<PivotTable> {
    let mut pivot = PivotTable::default();

    for record in records {
        let value = record.number(value_column)?;
        let group = record.text(group_column)?;
        let index = record.text(index_column)?;

        if !pivot.groups.contains(&group) {
            pivot.groups.push(group.clone());
        }
        *pivot
            .rows
            .entry(index)
            .or_default()
            .entry(group)
            .or_insert(0.0) += value;
    }

    Ok(pivot)
}

/// Classification over one fixed record set, memoized per requested bucket
/// tuple.
#[derive(Debug)]
pub struct LedgerClassifier {
    records: Table,
    code_column: String,
    bucket_map: BucketMap,
    cache: RefCell<HashMap<Vec<String>, Rc<Classification>>>,
}

impl LedgerClassifier {
    pub fn new(records: Table, code_column: impl Into<String>, bucket_map: BucketMap) -> Self {
        Self {
            records,
            code_column: code_column.into(),
            bucket_map,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn bucket_map(&self) -> &BucketMap {
        &self.bucket_map
    }

    pub fn classify<S: AsRef<str>>(&self, bucket_names: &[S]) -> Result<Rc<Classification>> {
        let key: Vec<String> = bucket_names.iter().map(|n| n.as_ref().to_string()).collect();
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(Rc::clone(hit));
        }

        let classification = Rc::new(classify_selected(
            &self.records,
            &self.code_column,
            &self.bucket_map,
            &key,
        )?);
        self.cache
            .borrow_mut()
            .insert(key, Rc::clone(&classification));
        Ok(classification)
    }

    pub fn classify_all(&self) -> Result<Rc<Classification>> {
        let names: Vec<String> = self.bucket_map.names().map(str::to_string).collect();
        self.classify(&names)
    }

    /// Records whose code falls in `bucket_name`.
    pub fn matching(&self, bucket_name: &str) -> Result<Table> {
        Ok(self.classify(&[bucket_name])?.matched.clone())
    }

    pub fn assign_groups(&self, groups: &[GroupDefinition]) -> Result<GroupAssignment> {
        assign_groups(
            &self.records,
            &self.code_column,
            &self.bucket_map,
            groups,
            DEFAULT_GROUP_COLUMN,
        )
    }

    /// Regroups the buckets and totals `value_column` per `index_column` and
    /// group. Records outside every bucket are left out of the totals.
    pub fn totals_by_group(
        &self,
        groups: &[GroupDefinition],
        value_column: &str,
        index_column: &str,
    ) -> Result<PivotTable> {
        let assignment = self.assign_groups(groups)?;
        if !assignment.unmatched.is_empty() {
            info!(
                "{} records fall outside every bucket and are excluded from group totals",
                assignment.unmatched.len()
            );
        }
        total_by_group(
            &assignment.assigned,
            value_column,
            DEFAULT_GROUP_COLUMN,
            index_column,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::normalize;
    use crate::error::ErrorKind;

    const AGEING: [&str; 6] = ["0 - 30", "31 - 60", "61 - 90", "91 - 120", "121 - 150", "150+"];

    fn group(name: &str, buckets: &[&str]) -> GroupDefinition {
        GroupDefinition {
            name: name.to_string(),
            buckets: buckets.iter().map(|b| b.to_string()).collect(),
        }
    }

    fn ledger() -> Table {
        vec![
            Record::new().with("code", 1010.0).with("amount", 500.0).with("entity", "A"),
            Record::new().with("code", "1210").with("amount", 250.0).with("entity", "A"),
            Record::new().with("code", 2100.0).with("amount", -300.0).with("entity", "B"),
            Record::new().with("code", 7000.0).with("amount", 40.0).with("entity", "B"),
        ]
    }

    fn ledger_buckets() -> BucketMap {
        BucketMap::from_code_definitions(vec![
            ("cash", "1000-1099"),
            ("receivables", "1200-1299, 1350"),
            ("payables", "2000-2199"),
        ])
        .unwrap()
    }

    #[test]
    fn test_classify_against_buckets() {
        let result = classify_against_buckets(&ledger(), "code", &ledger_buckets()).unwrap();
        assert_eq!(result.bucket_names, vec!["cash", "receivables", "payables"]);
        assert_eq!(result.flags[0].flags, vec![true, false, false]);
        assert_eq!(result.flag(1, "receivables"), Some(true));
        assert!(!result.flags[3].any_match);
        assert_eq!(result.matched.len(), 3);
        assert_eq!(result.unmatched.len(), 1);
        assert_eq!(result.unmatched[0].number("code").unwrap(), 7000.0);
    }

    #[test]
    fn test_unknown_bucket_fails() {
        let err = classify_selected(&ledger(), "code", &ledger_buckets(), &["inventory"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Key);
    }

    #[test]
    fn test_bad_code_aborts() {
        let mut records = ledger();
        records.push(Record::new().with("code", "n/a").with("amount", 1.0));
        let err = classify_against_buckets(&records, "code", &ledger_buckets()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_overlapping_rows_reported() {
        let map =
            BucketMap::from_code_definitions(vec![("wide", "0-100"), ("narrow", "10-20")]).unwrap();
        let records = vec![Record::new().with("code", 15.0), Record::new().with("code", 50.0)];
        let result = classify_against_buckets(&records, "code", &map).unwrap();
        assert_eq!(result.flags[0].match_count, 2);
        assert_eq!(result.overlapping_rows(), vec![0]);
    }

    #[test]
    fn test_require_all_buckets_covered() {
        let map = normalize(&AGEING).unwrap();
        let groups = vec![
            group("0-90", &["0 - 30", "31 - 60", "61 - 90"]),
            group(">90", &["91 - 120", "121 - 150", "150+"]),
        ];
        let assignment = require_all_buckets_covered(&groups, &map).unwrap();
        assert_eq!(assignment["150+"], ">90");
        assert_eq!(assignment["31 - 60"], "0-90");
    }

    #[test]
    fn test_duplicate_assignment() {
        let map = normalize(&AGEING).unwrap();
        let groups = vec![
            group("0-90", &["0 - 30", "31 - 60", "61 - 90"]),
            group(">60", &["61 - 90", "91 - 120", "121 - 150", "150+"]),
        ];
        match require_all_buckets_covered(&groups, &map).unwrap_err() {
            FiscalLedgerError::DuplicateAssignment {
                bucket,
                first_group,
                second_group,
            } => {
                assert_eq!(bucket, "61 - 90");
                assert_eq!(first_group, "0-90");
                assert_eq!(second_group, ">60");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_assignment() {
        let map = normalize(&AGEING).unwrap();
        let groups = vec![group("0-90", &["0 - 30", "31 - 60", "61 - 90"])];
        match require_all_buckets_covered(&groups, &map).unwrap_err() {
            FiscalLedgerError::MissingAssignment(missing) => {
                assert_eq!(missing, vec!["91 - 120", "121 - 150", "150+"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_total_by_group() {
        let records = vec![
            Record::new().with("entity", "A").with("group", "0-90").with("amount", 10.0),
            Record::new().with("entity", "A").with("group", "0-90").with("amount", 5.0),
            Record::new().with("entity", "A").with("group", ">90").with("amount", 7.0),
            Record::new().with("entity", "B").with("group", ">90").with("amount", 1.5),
        ];
        let pivot = total_by_group(&records, "amount", "group", "entity").unwrap();
        assert_eq!(pivot.groups, vec!["0-90", ">90"]);
        assert_eq!(pivot.get("A", "0-90"), 15.0);
        assert_eq!(pivot.get("B", "0-90"), 0.0);
        assert_eq!(pivot.row_total("A"), 22.0);
        assert_eq!(pivot.group_total(">90"), 8.5);
    }

    #[test]
    fn test_classifier_memoizes_per_bucket_tuple() {
        let classifier = LedgerClassifier::new(ledger(), "code", ledger_buckets());
        let first = classifier.classify(&["cash", "payables"]).unwrap();
        let second = classifier.classify(&["cash", "payables"]).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let reordered = classifier.classify(&["payables", "cash"]).unwrap();
        assert!(!Rc::ptr_eq(&first, &reordered));
        assert_eq!(reordered.matched.len(), 2);
    }

    #[test]
    fn test_classify_all_uses_map_order() {
        let classifier = LedgerClassifier::new(ledger(), "code", ledger_buckets());
        let all = classifier.classify_all().unwrap();
        assert_eq!(all.bucket_names, vec!["cash", "receivables", "payables"]);
        assert_eq!(all.matched.len(), 3);
        assert_eq!(all.unmatched.len(), 1);
        assert!(Rc::ptr_eq(&all, &classifier.classify_all().unwrap()));
    }

    #[test]
    fn test_assign_groups_overlap_goes_to_first_bucket() {
        let map = normalize(&AGEING).unwrap();
        let groups = vec![
            group("to 150", &["0 - 30", "31 - 60", "61 - 90", "91 - 120", "121 - 150"]),
            group("over 150", &["150+"]),
        ];
        let records = vec![
            Record::new().with("days", 150.0),
            Record::new().with("days", 151.0),
        ];
        let result = assign_groups(&records, "days", &map, &groups, "range").unwrap();
        assert_eq!(result.assigned[0].text("range").unwrap(), "to 150");
        assert_eq!(result.assigned[1].text("range").unwrap(), "over 150");
    }

    #[test]
    fn test_classifier_totals_by_group() {
        let classifier = LedgerClassifier::new(ledger(), "code", ledger_buckets());
        let groups = vec![
            group("current assets", &["cash", "receivables"]),
            group("current liabilities", &["payables"]),
        ];
        let pivot = classifier.totals_by_group(&groups, "amount", "entity").unwrap();
        assert_eq!(pivot.get("A", "current assets"), 750.0);
        assert_eq!(pivot.get("B", "current liabilities"), -300.0);
        assert_eq!(pivot.row_total("B"), -300.0);
    }

    #[test]
    fn test_classifier_matching() {
        let classifier = LedgerClassifier::new(ledger(), "code", ledger_buckets());
        let receivables = classifier.matching("receivables").unwrap();
        assert_eq!(receivables.len(), 1);
        assert!(classifier.matching("equity").is_err());
    }
}
