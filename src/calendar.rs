//! Fiscal-year calendar anchored on one fiscal boundary date.
//!
//! A [`FiscalCalendar`] covers the offsets `-num_prior..=num_post` around a
//! baseline fiscal year (offset 0). Each year's end is derived by shifting the
//! baseline end by whole calendar years; its start is the day after the
//! previous year's end, so the years tile the timeline without gaps.
//!
//! Two leap-year corrections apply to shifted ends:
//!
//! - a shifted end on Feb 28 of a leap year moves to Feb 29, so a year that
//!   ends "at the end of February" keeps doing so;
//! - when the baseline starts on Feb 29, the end falling on Feb 27 just
//!   before a leap February (`offset % 4 == 3`) moves to Feb 28, so the next
//!   year can start on Feb 29 again.

use crate::error::{FiscalLedgerError, Result};
use crate::utils::{
    add_days, days_inclusive, is_feb_28_of_leap_year, is_feb_29, is_leap_year, shift_years,
    year_end_from_start, year_start_from_end,
};
use chrono::{Datelike, NaiveDate};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_NUM_PRIOR: i32 = 3;
pub const DEFAULT_NUM_POST: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FiscalYear {
    pub offset: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Calendar year of `end_date`.
    pub label: i32,
    pub day_count: i64,
}

impl FiscalYear {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// True only for the exact last day of the year.
    pub fn is_period_end(&self, date: NaiveDate) -> bool {
        date == self.end_date
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FY{} ({} to {})",
            self.label, self.start_date, self.end_date
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    #[default]
    Both,
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundaries {
    Start(NaiveDate),
    End(NaiveDate),
    Both(NaiveDate, NaiveDate),
}

#[derive(Debug, Clone)]
pub struct FiscalCalendar {
    anchor_end: NaiveDate,
    leap_anchor: bool,
    num_prior: i32,
    num_post: i32,
    cache: RefCell<BTreeMap<i32, FiscalYear>>,
}

impl FiscalCalendar {
    /// Builds a calendar from a baseline start date, end date, or both.
    ///
    /// When both are given the end must be one year less a day after the
    /// start, or the start must be the day after the end of the preceding
    /// year (the two differ only around Feb 29).
    pub fn new(
        fy_start_date: Option<NaiveDate>,
        fy_end_date: Option<NaiveDate>,
        num_prior: i32,
        num_post: i32,
    ) -> Result<Self> {
        if num_prior < 0 || num_post < 0 {
            return Err(FiscalLedgerError::Configuration(format!(
                "num_prior and num_post must be non-negative (got {} and {})",
                num_prior, num_post
            )));
        }

        let (anchor_end, leap_anchor) = match (fy_start_date, fy_end_date) {
            (None, None) => {
                return Err(FiscalLedgerError::Configuration(
                    "Either fy_start_date or fy_end_date must be provided".to_string(),
                ))
            }
            (Some(start), None) => (year_end_from_start(start)?, is_feb_29(start)),
            (None, Some(end)) => (end, false),
            (Some(start), Some(end)) => {
                let expected_end = year_end_from_start(start)?;
                if end != expected_end && start != year_start_from_end(end)? {
                    return Err(FiscalLedgerError::Inconsistency(format!(
                        "fy_start_date {} and fy_end_date {} do not describe one fiscal year (expected end {})",
                        start, end, expected_end
                    )));
                }
                (end, is_feb_29(start))
            }
        };

        let calendar = Self {
            anchor_end,
            leap_anchor,
            num_prior,
            num_post,
            cache: RefCell::new(BTreeMap::new()),
        };

        if let Some(start) = fy_start_date {
            let baseline = calendar.fiscal_year_for_offset(0)?;
            if baseline.start_date != start {
                return Err(FiscalLedgerError::Inconsistency(format!(
                    "fy_start_date {} does not match derived baseline start {}",
                    start, baseline.start_date
                )));
            }
        }

        Ok(calendar)
    }

    pub fn from_start(fy_start_date: NaiveDate) -> Result<Self> {
        Self::new(Some(fy_start_date), None, DEFAULT_NUM_PRIOR, DEFAULT_NUM_POST)
    }

    pub fn from_end(fy_end_date: NaiveDate) -> Result<Self> {
        Self::new(None, Some(fy_end_date), DEFAULT_NUM_PRIOR, DEFAULT_NUM_POST)
    }

    pub fn num_prior(&self) -> i32 {
        self.num_prior
    }

    pub fn num_post(&self) -> i32 {
        self.num_post
    }

    pub fn contains_offset(&self, offset: i32) -> bool {
        (-self.num_prior..=self.num_post).contains(&offset)
    }

    fn end_for_offset(&self, offset: i32) -> Result<NaiveDate> {
        let mut end = shift_years(self.anchor_end, offset)?;

        if is_feb_28_of_leap_year(end) {
            end = add_days(end, 1)?;
        }

        if self.leap_anchor
            && offset.rem_euclid(4) == 3
            && end.month() == 2
            && end.day() == 27
            && is_leap_year(end.year())
        {
            end = add_days(end, 1)?;
        }

        Ok(end)
    }

    pub fn fiscal_year_for_offset(&self, offset: i32) -> Result<FiscalYear> {
        if !self.contains_offset(offset) {
            return Err(FiscalLedgerError::OffsetOutOfRange {
                offset,
                min: -self.num_prior,
                max: self.num_post,
            });
        }

        if let Some(fy) = self.cache.borrow().get(&offset) {
            return Ok(*fy);
        }

        let start_date = add_days(self.end_for_offset(offset - 1)?, 1)?;
        let end_date = self.end_for_offset(offset)?;
        let fy = FiscalYear {
            offset,
            start_date,
            end_date,
            label: end_date.year(),
            day_count: days_inclusive(start_date, end_date),
        };

        debug!("Computed fiscal year for offset {}: {}", offset, fy);
        self.cache.borrow_mut().insert(offset, fy);
        Ok(fy)
    }

    pub fn fiscal_year_label_for_offset(&self, offset: i32) -> Result<i32> {
        Ok(self.fiscal_year_for_offset(offset)?.label)
    }

    /// Labels advance by exactly one per offset, so the inverse is a
    /// subtraction against the baseline label. The result is not range
    /// checked.
    pub fn offset_for_fiscal_year_label(&self, label: i32) -> Result<i32> {
        let baseline = self.fiscal_year_label_for_offset(0)?;
        Ok(label - baseline)
    }

    pub fn resolve_offset(&self, label: Option<i32>, offset: Option<i32>) -> Result<i32> {
        match (label, offset) {
            (None, None) => Err(FiscalLedgerError::Configuration(
                "Either a fiscal year label or an offset must be provided".to_string(),
            )),
            (Some(label), None) => self.offset_for_fiscal_year_label(label),
            (None, Some(offset)) => Ok(offset),
            (Some(label), Some(offset)) => {
                let derived = self.offset_for_fiscal_year_label(label)?;
                if derived != offset {
                    return Err(FiscalLedgerError::Inconsistency(format!(
                        "Fiscal year label {} corresponds to offset {}, not {}",
                        label, derived, offset
                    )));
                }
                Ok(offset)
            }
        }
    }

    /// First and last day covered by the calendar window.
    pub fn window(&self) -> Result<(NaiveDate, NaiveDate)> {
        let first = self.fiscal_year_for_offset(-self.num_prior)?;
        let last = self.fiscal_year_for_offset(self.num_post)?;
        Ok((first.start_date, last.end_date))
    }

    pub fn fiscal_years(&self) -> Result<Vec<FiscalYear>> {
        (-self.num_prior..=self.num_post)
            .map(|offset| self.fiscal_year_for_offset(offset))
            .collect()
    }

    pub fn fiscal_year_for_date(&self, date: NaiveDate) -> Result<FiscalYear> {
        let (first, last) = self.window()?;
        if date < first || date > last {
            return Err(FiscalLedgerError::DateOutsideWindow { date, first, last });
        }

        // The containing year ends within a year after `date`, so its label
        // is one of these two.
        for candidate in [date.year(), date.year() + 1] {
            let offset = self.offset_for_fiscal_year_label(candidate)?;
            if !self.contains_offset(offset) {
                continue;
            }
            let fy = self.fiscal_year_for_offset(offset)?;
            if fy.contains(date) {
                return Ok(fy);
            }
        }

        Err(FiscalLedgerError::NotFound(date))
    }

    pub fn date_to_fiscal_year(&self, date: NaiveDate) -> Result<i32> {
        Ok(self.fiscal_year_for_date(date)?.label)
    }

    pub fn get_boundaries(
        &self,
        label: Option<i32>,
        offset: Option<i32>,
        which: Boundary,
    ) -> Result<Boundaries> {
        let offset = self.resolve_offset(label, offset)?;
        let fy = self.fiscal_year_for_offset(offset)?;

        Ok(match which {
            Boundary::Start => Boundaries::Start(fy.start_date),
            Boundary::End => Boundaries::End(fy.end_date),
            Boundary::Both => Boundaries::Both(fy.start_date, fy.end_date),
        })
    }
}
