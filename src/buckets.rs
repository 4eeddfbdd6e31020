use crate::error::{FiscalLedgerError, Result};
use crate::interval::{overlaps, parse_bucket_label, NamedInterval};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A named bucket: the union of one or more intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub intervals: Vec<NamedInterval>,
}

impl Bucket {
    pub fn new(name: impl Into<String>, intervals: Vec<NamedInterval>) -> Self {
        Self {
            name: name.into(),
            intervals,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.matching_interval(value).is_some()
    }

    pub fn matching_interval(&self, value: f64) -> Option<&NamedInterval> {
        self.intervals.iter().find(|i| i.contains(value))
    }

    pub fn overlaps(&self, other: &Bucket) -> bool {
        self.intervals
            .iter()
            .any(|a| other.intervals.iter().any(|b| overlaps(a, b)))
    }

    /// Lowest lower bound across the bucket's intervals.
    pub fn lower_bound(&self) -> f64 {
        self.intervals
            .iter()
            .map(|i| i.lower)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Ordered mapping of bucket name to intervals. Iteration follows insertion
/// order unless the map was built by [`normalize`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketMap {
    buckets: Vec<Bucket>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a bucket, keeping the original position on
    /// replacement.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        intervals: Vec<NamedInterval>,
    ) -> Option<Vec<NamedInterval>> {
        let name = name.into();
        if let Some(existing) = self.buckets.iter_mut().find(|b| b.name == name) {
            return Some(std::mem::replace(&mut existing.intervals, intervals));
        }
        self.buckets.push(Bucket::new(name, intervals));
        None
    }

    /// Builds a map from `(name, "1000-1999, 2500, 9000+")` style definitions.
    pub fn from_code_definitions<I, N, S>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for (name, codes) in definitions {
            let intervals = parse_code_list(codes.as_ref())?;
            map.insert(name, intervals);
        }
        debug!("Built bucket map with {} code buckets", map.len());
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|b| b.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.name == name)
    }

    pub fn contains_bucket(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Intervals for `name`; an unknown name is an error, never an empty set.
    pub fn resolve(&self, name: &str) -> Result<&[NamedInterval]> {
        self.get(name)
            .map(|b| b.intervals.as_slice())
            .ok_or_else(|| FiscalLedgerError::UnknownBucket(name.to_string()))
    }

    /// Names of every bucket containing `value`, in map order.
    pub fn matching_buckets(&self, value: f64) -> Vec<&str> {
        self.buckets
            .iter()
            .filter(|b| b.contains(value))
            .map(|b| b.name.as_str())
            .collect()
    }

    pub fn classify_scalar(&self, value: f64) -> Option<&str> {
        self.buckets
            .iter()
            .find(|b| b.contains(value))
            .map(|b| b.name.as_str())
    }

    /// Every pair of buckets sharing at least one value, in map order.
    pub fn overlapping_buckets(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (idx, first) in self.buckets.iter().enumerate() {
            for second in &self.buckets[idx + 1..] {
                if first.overlaps(second) {
                    pairs.push((first.name.clone(), second.name.clone()));
                }
            }
        }
        pairs
    }

    pub fn require_disjoint(&self) -> Result<()> {
        match self.overlapping_buckets().into_iter().next() {
            Some((first, second)) => Err(FiscalLedgerError::OverlappingBuckets { first, second }),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a BucketMap {
    type Item = &'a Bucket;
    type IntoIter = std::slice::Iter<'a, Bucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}

/// Splits a comma-separated label list and parses every segment. Blank
/// segments are ignored; a list with no labels at all is rejected.
pub fn parse_code_list(codes: &str) -> Result<Vec<NamedInterval>> {
    let intervals = codes
        .split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse_bucket_label)
        .collect::<Result<Vec<_>>>()?;

    if intervals.is_empty() {
        return Err(FiscalLedgerError::parse(codes, "no bucket labels found"));
    }
    Ok(intervals)
}

/// Ageing-style bucket map: one bucket per distinct label, ordered by
/// ascending lower bound.
pub fn normalize<S: AsRef<str>>(labels: &[S]) -> Result<BucketMap> {
    let mut seen = HashSet::new();
    let mut buckets = Vec::new();

    for label in labels {
        let name = label.as_ref().trim();
        if !seen.insert(name.to_string()) {
            continue;
        }
        let interval = parse_bucket_label(name)?;
        buckets.push(Bucket::new(name, vec![interval]));
    }

    buckets.sort_by(|a, b| a.lower_bound().total_cmp(&b.lower_bound()));
    debug!(
        "Normalized {} labels into {} buckets",
        labels.len(),
        buckets.len()
    );
    Ok(BucketMap { buckets })
}

pub fn classify_scalar(value: f64, bucket_map: &BucketMap) -> Option<&str> {
    bucket_map.classify_scalar(value)
}
