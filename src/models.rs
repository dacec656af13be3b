use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::ReportError;

/// One usable row of an uploaded production log.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionRecord {
    /// 1-based data row number in the source table.
    pub row: usize,
    pub capture_date: NaiveDate,
    pub capture_time: NaiveTime,
    pub kiln_id: u32,
    pub quantity: i64,
    pub material: String,
}

impl ProductionRecord {
    pub fn entry_timestamp(&self) -> NaiveDateTime {
        self.capture_date.and_time(self.capture_time)
    }
}

/// Longest cure a kiln may be configured with (one year).
pub const MAX_CURE_HOURS: f64 = 8_760.0;

/// Largest batch quantity accepted from a production log.
pub const MAX_QUANTITY: i64 = 1_000_000_000_000;

/// Cure hours per kiln, kilns numbered `1..=kiln_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct KilnCureTable {
    hours: BTreeMap<u32, f64>,
}

impl KilnCureTable {
    /// Every kiln starts unconfigured (zero hours).
    pub fn new(kiln_count: u32) -> Self {
        Self {
            hours: (1..=kiln_count).map(|kiln| (kiln, 0.0)).collect(),
        }
    }

    pub fn from_entries(
        kiln_count: u32,
        entries: impl IntoIterator<Item = (u32, f64)>,
    ) -> Result<Self, ReportError> {
        let mut table = Self::new(kiln_count);
        for (kiln, hours) in entries {
            table.set(kiln, hours)?;
        }
        Ok(table)
    }

    pub fn set(&mut self, kiln_id: u32, hours: f64) -> Result<(), ReportError> {
        if !hours.is_finite() || !(0.0..=MAX_CURE_HOURS).contains(&hours) {
            return Err(ReportError::InvalidInput(format!(
                "cure hours for kiln {kiln_id} must be between 0 and {MAX_CURE_HOURS}, got {hours}"
            )));
        }
        match self.hours.get_mut(&kiln_id) {
            Some(slot) => {
                *slot = hours;
                Ok(())
            }
            None => Err(ReportError::InvalidInput(format!(
                "kiln {kiln_id} is outside 1..={}",
                self.kiln_count()
            ))),
        }
    }

    pub fn get(&self, kiln_id: u32) -> Option<f64> {
        self.hours.get(&kiln_id).copied()
    }

    pub fn kiln_count(&self) -> u32 {
        self.hours.len() as u32
    }

    /// Kilns whose cure duration is still zero.
    pub fn unconfigured(&self) -> Vec<u32> {
        self.hours
            .iter()
            .filter(|(_, hours)| **hours == 0.0)
            .map(|(kiln, _)| *kiln)
            .collect()
    }
}

/// A recurring daily time-of-day interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A shift window pinned to concrete instants. Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictedRecord {
    pub record: ProductionRecord,
    pub entry: NaiveDateTime,
    pub exit: NaiveDateTime,
    pub in_shift: bool,
}

/// Per-row audit line of an in-shift batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftDetailRow {
    pub material: String,
    #[serde(rename = "horno")]
    pub kiln_id: u32,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    #[serde(rename = "salida_estimada", serialize_with = "serialize_timestamp")]
    pub exit: NaiveDateTime,
}

/// Quantity per material, ordered by material id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialSummary {
    pub totals: BTreeMap<String, i64>,
}

impl MaterialSummary {
    /// Sums saturate at the `i64` bounds.
    pub fn add(&mut self, material: &str, quantity: i64) {
        let slot = self.totals.entry(material.to_string()).or_insert(0);
        *slot = slot.saturating_add(quantity);
    }

    pub fn total(&self) -> i64 {
        self.totals.values().fold(0, |acc, value| acc.saturating_add(*value))
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Date,
    Time,
    Kiln,
    Quantity,
    /// The predicted exit falls outside the representable calendar.
    Exit,
}

impl RowField {
    pub fn label(&self) -> &'static str {
        match self {
            RowField::Date => "fecha",
            RowField::Time => "hora",
            RowField::Kiln => "horno",
            RowField::Quantity => "cantidad",
            RowField::Exit => "salida_estimada",
        }
    }
}

/// A row excluded from prediction because one of its fields did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparseableRow {
    pub row: usize,
    pub field: RowField,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub rows_total: usize,
    pub rows_dropped: usize,
    pub rows_in_shift: usize,
    pub dropped: Vec<UnparseableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub summary: MaterialSummary,
    pub detail: Vec<ShiftDetailRow>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftFilter {
    #[default]
    All,
    Number(i64),
}

impl std::str::FromStr for ShiftFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("todos") || value.eq_ignore_ascii_case("all")
        {
            return Ok(ShiftFilter::All);
        }
        value
            .parse::<i64>()
            .map(ShiftFilter::Number)
            .map_err(|_| format!("shift must be a number or 'Todos', got '{value}'"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilterCriteria {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub shift: ShiftFilter,
    pub line: Option<String>,
    pub sap_code: Option<String>,
}

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn serialize_timestamp<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
}
