//! Predicts which batches of a production log leave their kiln inside a
//! shift and sums them per material.

use tracing::{debug, trace, warn};

use crate::error::ReportError;
use crate::models::{
    Diagnostics, KilnCureTable, MaterialSummary, PredictedRecord, PredictionOutcome,
    ProductionRecord, RowField, ShiftDetailRow, ShiftWindow, UnparseableRow, MAX_QUANTITY,
    TIMESTAMP_FORMAT,
};
use crate::normalize::normalize_timestamp;
use crate::predict::predict_exit;
use crate::table::Table;

pub const COL_DATE: &str = "fecha";
pub const COL_TIME: &str = "hora";
pub const COL_KILN: &str = "horno";
pub const COL_QUANTITY: &str = "cantidad";
pub const COL_MATERIAL: &str = "material";

pub const REQUIRED_COLUMNS: [&str; 5] = [COL_DATE, COL_TIME, COL_KILN, COL_QUANTITY, COL_MATERIAL];

struct Columns {
    date: usize,
    time: usize,
    kiln: usize,
    quantity: usize,
    material: usize,
}

pub fn run(
    table: &Table,
    cure: &KilnCureTable,
    shift: &ShiftWindow,
) -> Result<PredictionOutcome, ReportError> {
    let columns = validate_schema(table)?;
    require_cure_durations(cure)?;

    let (records, mut dropped) = normalize_rows(table, &columns);
    let (predicted, overflowed) = predict_records(records, cure, shift);
    if !overflowed.is_empty() {
        dropped.extend(overflowed);
        dropped.sort_by_key(|issue| issue.row);
    }
    if !dropped.is_empty() {
        warn!(
            dropped = dropped.len(),
            total = table.len(),
            "rows excluded because a field could not be parsed"
        );
    }

    let in_shift: Vec<PredictedRecord> = predicted.into_iter().filter(|p| p.in_shift).collect();
    debug!(in_shift = in_shift.len(), "rows predicted inside the shift");

    let (summary, detail) = aggregate(&in_shift);

    Ok(PredictionOutcome {
        summary,
        detail,
        diagnostics: Diagnostics {
            rows_total: table.len(),
            rows_dropped: dropped.len(),
            rows_in_shift: in_shift.len(),
            dropped,
        },
    })
}

fn validate_schema(table: &Table) -> Result<Columns, ReportError> {
    let missing = table.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(ReportError::MissingColumns(missing));
    }

    let index = |name: &str| {
        table
            .column(name)
            .ok_or_else(|| ReportError::MissingColumns(vec![name.to_string()]))
    };

    Ok(Columns {
        date: index(COL_DATE)?,
        time: index(COL_TIME)?,
        kiln: index(COL_KILN)?,
        quantity: index(COL_QUANTITY)?,
        material: index(COL_MATERIAL)?,
    })
}

fn require_cure_durations(cure: &KilnCureTable) -> Result<(), ReportError> {
    let unconfigured = cure.unconfigured();
    if unconfigured.is_empty() {
        Ok(())
    } else {
        Err(ReportError::IncompleteConfiguration(unconfigured))
    }
}

fn normalize_rows(table: &Table, columns: &Columns) -> (Vec<ProductionRecord>, Vec<UnparseableRow>) {
    let mut records = Vec::with_capacity(table.len());
    let mut dropped = Vec::new();

    for (idx, row) in table.rows.iter().enumerate() {
        match parse_record(idx + 1, row, columns) {
            Ok(record) => records.push(record),
            Err(issue) => {
                debug!(row = issue.row, field = issue.field.label(), value = %issue.value, "unparseable row");
                dropped.push(issue);
            }
        }
    }

    (records, dropped)
}

fn parse_record(
    row_number: usize,
    row: &[String],
    columns: &Columns,
) -> Result<ProductionRecord, UnparseableRow> {
    let issue = |field: RowField, index: usize| UnparseableRow {
        row: row_number,
        field,
        value: row[index].clone(),
    };

    let entry = normalize_timestamp(&row[columns.date], &row[columns.time]).map_err(|field| {
        let index = match field {
            RowField::Date => columns.date,
            _ => columns.time,
        };
        issue(field, index)
    })?;

    let kiln_id = parse_integer(&row[columns.kiln])
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| issue(RowField::Kiln, columns.kiln))?;
    let quantity = parse_integer(&row[columns.quantity])
        .filter(|value| value.abs() <= MAX_QUANTITY)
        .ok_or_else(|| issue(RowField::Quantity, columns.quantity))?;

    Ok(ProductionRecord {
        row: row_number,
        capture_date: entry.date(),
        capture_time: entry.time(),
        kiln_id,
        quantity,
        material: row[columns.material].trim().to_string(),
    })
}

/// Accepts `12` as well as the `12.0` spreadsheets tend to produce.
fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

fn predict_records(
    records: Vec<ProductionRecord>,
    cure: &KilnCureTable,
    shift: &ShiftWindow,
) -> (Vec<PredictedRecord>, Vec<UnparseableRow>) {
    let mut predicted = Vec::with_capacity(records.len());
    let mut overflowed = Vec::new();

    for record in records {
        let entry = record.entry_timestamp();
        let Some(exit) = predict_exit(entry, record.kiln_id, cure) else {
            debug!(row = record.row, %entry, "predicted exit out of range");
            overflowed.push(UnparseableRow {
                row: record.row,
                field: RowField::Exit,
                value: entry.format(TIMESTAMP_FORMAT).to_string(),
            });
            continue;
        };
        let in_shift = shift.contains(record.capture_date, exit);
        predicted.push(PredictedRecord {
            record,
            entry,
            exit,
            in_shift,
        });
    }

    (predicted, overflowed)
}

fn aggregate(in_shift: &[PredictedRecord]) -> (MaterialSummary, Vec<ShiftDetailRow>) {
    let mut summary = MaterialSummary::default();
    let mut detail = Vec::with_capacity(in_shift.len());

    for predicted in in_shift {
        let record = &predicted.record;
        trace!(row = record.row, entry = %predicted.entry, exit = %predicted.exit, "in shift");
        summary.add(&record.material, record.quantity);
        detail.push(ShiftDetailRow {
            material: record.material.clone(),
            kiln_id: record.kiln_id,
            quantity: record.quantity,
            exit: predicted.exit,
        });
    }

    (summary, detail)
}
