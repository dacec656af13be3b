use chrono::NaiveDate;

use crate::error::ReportError;
use crate::models::{ReportFilterCriteria, ShiftFilter};
use crate::normalize::parse_date;
use crate::table::Table;

pub const COL_DATE: &str = "fecha";
pub const COL_SHIFT: &str = "turno";
pub const COL_LINE: &str = "linea";
pub const COL_SAP: &str = "codigoSAP";

enum Predicate<'a> {
    DateFrom(usize, NaiveDate),
    DateTo(usize, NaiveDate),
    Shift(usize, i64),
    Equals(usize, &'a str),
}

impl Predicate<'_> {
    fn matches(&self, row: &[String]) -> bool {
        match *self {
            Predicate::DateFrom(col, from) => parse_date(&row[col]).is_some_and(|d| d >= from),
            Predicate::DateTo(col, to) => parse_date(&row[col]).is_some_and(|d| d <= to),
            Predicate::Shift(col, shift) => parse_shift(&row[col]) == Some(shift),
            Predicate::Equals(col, value) => row[col].trim() == value,
        }
    }
}

impl ReportFilterCriteria {
    /// True when no criterion would exclude anything.
    pub fn is_unconstrained(&self) -> bool {
        self.date_from.is_none()
            && self.date_to.is_none()
            && self.shift == ShiftFilter::All
            && active_text(&self.line).is_none()
            && active_text(&self.sap_code).is_none()
    }
}

/// Returns the rows of `table` satisfying every present criterion.
pub fn apply(table: &Table, criteria: &ReportFilterCriteria) -> Result<Table, ReportError> {
    let predicates = build_predicates(table, criteria)?;

    let rows = table
        .rows
        .iter()
        .filter(|row| predicates.iter().all(|p| p.matches(row)))
        .cloned()
        .collect();

    Ok(Table::new(table.headers.clone(), rows))
}

fn build_predicates<'a>(
    table: &Table,
    criteria: &'a ReportFilterCriteria,
) -> Result<Vec<Predicate<'a>>, ReportError> {
    let mut predicates = Vec::new();
    let mut missing = Vec::new();
    let mut column = |name: &str| {
        let index = table.column(name);
        if index.is_none() && !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
        index
    };

    if let Some(from) = criteria.date_from {
        if let Some(col) = column(COL_DATE) {
            predicates.push(Predicate::DateFrom(col, from));
        }
    }
    if let Some(to) = criteria.date_to {
        if let Some(col) = column(COL_DATE) {
            predicates.push(Predicate::DateTo(col, to));
        }
    }
    if let ShiftFilter::Number(shift) = criteria.shift {
        if let Some(col) = column(COL_SHIFT) {
            predicates.push(Predicate::Shift(col, shift));
        }
    }
    if let Some(line) = active_text(&criteria.line) {
        if let Some(col) = column(COL_LINE) {
            predicates.push(Predicate::Equals(col, line));
        }
    }
    if let Some(sap) = active_text(&criteria.sap_code) {
        if let Some(col) = column(COL_SAP) {
            predicates.push(Predicate::Equals(col, sap));
        }
    }

    if missing.is_empty() {
        Ok(predicates)
    } else {
        Err(ReportError::MissingColumns(missing))
    }
}

fn active_text(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

// Shift numbers may come through as `2` or `2.0`.
fn parse_shift(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}
