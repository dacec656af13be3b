use std::fmt::Write;

use csv::WriterBuilder;

use crate::error::ReportError;
use crate::models::{
    PredictionOutcome, ReportFilterCriteria, ShiftFilter, ShiftWindow, ShiftDetailRow,
    TIMESTAMP_FORMAT,
};
use crate::table::{Table, PRIMARY_DELIMITER};

pub const FILTERED_EXPORT_NAME: &str = "salida_horno_turnos_filtrado.csv";

/// Semicolon-separated UTF-8 export of a report table.
pub fn export_table(table: &Table) -> Result<Vec<u8>, ReportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(PRIMARY_DELIMITER)
        .from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    into_bytes(writer)
}

/// Semicolon-separated UTF-8 export of the in-shift detail rows.
pub fn export_detail(detail: &[ShiftDetailRow]) -> Result<Vec<u8>, ReportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(PRIMARY_DELIMITER)
        .from_writer(Vec::new());
    if detail.is_empty() {
        writer.write_record(["material", "horno", "cantidad", "salida_estimada"])?;
    }
    for row in detail {
        writer.serialize(row)?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ReportError> {
    writer
        .into_inner()
        .map_err(|err| ReportError::Io(err.into_error()))
}

pub fn build_prediction_report(shift: &ShiftWindow, outcome: &PredictionOutcome) -> String {
    let mut output = String::new();
    let diagnostics = &outcome.diagnostics;

    let _ = writeln!(output, "# Kiln Exit Forecast");
    let _ = writeln!(
        output,
        "Shift {} - {}{}",
        shift.start.format("%H:%M"),
        shift.end.format("%H:%M"),
        if shift.crosses_midnight() {
            " (ends next day)"
        } else {
            ""
        }
    );
    let _ = writeln!(
        output,
        "Rows read: {} | dropped: {} | exiting in shift: {}",
        diagnostics.rows_total, diagnostics.rows_dropped, diagnostics.rows_in_shift
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Output by Material");

    if outcome.summary.is_empty() {
        let _ = writeln!(output, "No batches exit within this shift.");
    } else {
        for (material, quantity) in &outcome.summary.totals {
            let _ = writeln!(output, "- {material}: {quantity}");
        }
        let _ = writeln!(output, "- Total: {}", outcome.summary.total());
    }

    if !outcome.detail.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Batches");
        for row in &outcome.detail {
            let _ = writeln!(
                output,
                "- {} from kiln {}: {} at {}",
                row.material,
                row.kiln_id,
                row.quantity,
                row.exit.format(TIMESTAMP_FORMAT)
            );
        }
    }

    if !diagnostics.dropped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Rows");
        for issue in &diagnostics.dropped {
            let _ = writeln!(
                output,
                "- row {}: unreadable {} '{}'",
                issue.row,
                issue.field.label(),
                issue.value
            );
        }
    }

    output
}

pub fn build_filter_summary(
    criteria: &ReportFilterCriteria,
    total: usize,
    filtered: usize,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Filters: {}", describe_criteria(criteria));
    let _ = write!(
        output,
        "Total records: {total} | After filtering: {filtered}"
    );
    if filtered == 0 {
        let _ = write!(output, "\nNo data matches these criteria.");
    }

    output
}

fn describe_criteria(criteria: &ReportFilterCriteria) -> String {
    if criteria.is_unconstrained() {
        return "none".to_string();
    }

    let mut parts = Vec::new();
    if let Some(from) = criteria.date_from {
        parts.push(format!("from {from}"));
    }
    if let Some(to) = criteria.date_to {
        parts.push(format!("to {to}"));
    }
    if let ShiftFilter::Number(shift) = criteria.shift {
        parts.push(format!("shift {shift}"));
    }
    if let Some(line) = criteria.line.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        parts.push(format!("line '{line}'"));
    }
    if let Some(sap) = criteria.sap_code.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        parts.push(format!("SAP '{sap}'"));
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Diagnostics, MaterialSummary, RowField, UnparseableRow};
    use chrono::{NaiveDate, NaiveTime};

    fn night_shift() -> ShiftWindow {
        ShiftWindow {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        }
    }

    fn outcome() -> PredictionOutcome {
        let mut summary = MaterialSummary::default();
        summary.add("O14191035", 12);
        PredictionOutcome {
            summary,
            detail: vec![ShiftDetailRow {
                material: "O14191035".into(),
                kiln_id: 2,
                quantity: 12,
                exit: NaiveDate::from_ymd_opt(2024, 3, 6)
                    .unwrap()
                    .and_hms_opt(3, 30, 0)
                    .unwrap(),
            }],
            diagnostics: Diagnostics {
                rows_total: 3,
                rows_dropped: 1,
                rows_in_shift: 1,
                dropped: vec![UnparseableRow {
                    row: 2,
                    field: RowField::Time,
                    value: "??".into(),
                }],
            },
        }
    }

    #[test]
    fn detail_export_uses_semicolons() {
        let bytes = export_detail(&outcome().detail).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "material;horno;cantidad;salida_estimada\nO14191035;2;12;2024-03-06 03:30:00\n"
        );
    }

    #[test]
    fn empty_detail_export_still_has_header() {
        let text = String::from_utf8(export_detail(&[]).unwrap()).unwrap();
        assert_eq!(text, "material;horno;cantidad;salida_estimada\n");
    }

    #[test]
    fn table_export_round_trips_through_reader() {
        let table = Table::new(
            vec!["linea".into(), "codigoSAP".into()],
            vec![vec!["LV&PD".into(), "O1;2".into()]],
        );
        let bytes = export_table(&table).unwrap();
        assert_eq!(crate::table::read_delimited(&bytes).unwrap(), table);
    }

    #[test]
    fn prediction_report_lists_totals_and_skips() {
        let report = build_prediction_report(&night_shift(), &outcome());
        assert!(report.contains("Shift 22:00 - 06:00 (ends next day)"));
        assert!(report.contains("Rows read: 3 | dropped: 1 | exiting in shift: 1"));
        assert!(report.contains("- O14191035: 12"));
        assert!(report.contains("- Total: 12"));
        assert!(report.contains("- row 2: unreadable hora '??'"));
    }

    #[test]
    fn empty_forecast_is_stated() {
        let empty = PredictionOutcome {
            summary: MaterialSummary::default(),
            detail: vec![],
            diagnostics: Diagnostics::default(),
        };
        let report = build_prediction_report(&night_shift(), &empty);
        assert!(report.contains("No batches exit within this shift."));
        assert!(!report.contains("## Batches"));
    }

    #[test]
    fn filter_summary_warns_when_nothing_matches() {
        let criteria = ReportFilterCriteria {
            shift: ShiftFilter::Number(2),
            line: Some("TQ".into()),
            ..Default::default()
        };
        let summary = build_filter_summary(&criteria, 40, 0);
        assert!(summary.starts_with("Filters: shift 2, line 'TQ'"));
        assert!(summary.contains("Total records: 40 | After filtering: 0"));
        assert!(summary.ends_with("No data matches these criteria."));
        assert!(build_filter_summary(&ReportFilterCriteria::default(), 5, 5)
            .starts_with("Filters: none"));
    }
}
