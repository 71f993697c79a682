//! Text rendering of records for the terminal.

use std::fmt::Write as _;

use super::OutputFormat;
use crate::error::Result;
use crate::record::{CalculatedRecord, CalculationPreview, ProductionRecord};

/// Render a list of records in the chosen format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_records(records: &[ProductionRecord], format: OutputFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Json => {
            out = serde_json::to_string_pretty(records)?;
        }
        OutputFormat::Plain => {
            for r in records {
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{:.2}",
                    r.id,
                    r.inputs().date,
                    r.inputs().production,
                    r.costs().grand_total_cost_per_tube
                );
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                return Ok("No records found.".to_string());
            }
            let _ = writeln!(
                out,
                "{:>5}  {:<10}  {:>10}  {:>10}  {:>9}  {:>10}  {:>10}",
                "ID", "DATE", "PRODUCTION", "OUTDONE", "REJECTION", "PAPER/TUBE", "TOTAL/TUBE"
            );
            let _ = writeln!(out, "{}", "-".repeat(78));
            for r in records {
                let _ = writeln!(
                    out,
                    "{:>5}  {:<10}  {:>10}  {:>10}  {:>9}  {:>10.2}  {:>10.2}",
                    r.id,
                    r.inputs().date,
                    r.inputs().production,
                    r.inputs().outdone,
                    r.record.rejection(),
                    r.costs().paper_cost_per_tube,
                    r.costs().grand_total_cost_per_tube
                );
            }
        }
    }
    Ok(out.trim_end().to_string())
}

/// Render one stored record.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_record(record: &ProductionRecord, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(record)?);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Record {}", record.id);
    if let Some(created) = record.created_at {
        let _ = writeln!(out, "  Created:  {}", created.to_rfc3339());
    }
    if let Some(updated) = record.updated_at {
        let _ = writeln!(out, "  Updated:  {}", updated.to_rfc3339());
    }
    out.push_str(&breakdown(&record.record));
    Ok(out.trim_end().to_string())
}

/// Render a calculation preview.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_calculation(record: &CalculatedRecord, json: bool) -> Result<String> {
    if json {
        let preview = CalculationPreview::from(record.clone());
        return Ok(serde_json::to_string_pretty(&preview)?);
    }
    Ok(breakdown(record).trim_end().to_string())
}

fn breakdown(record: &CalculatedRecord) -> String {
    let inputs = &record.inputs;
    let costs = &record.costs;
    let mut out = String::new();

    let _ = writeln!(out, "Date:        {}", inputs.date);
    let _ = writeln!(out, "Production:  {}", inputs.production);
    let _ = writeln!(out, "Outdone:     {}", inputs.outdone);
    let _ = writeln!(
        out,
        "Rejection:   {} ({:.2}%)",
        record.rejection(),
        record.rejection_rate()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<12} {:>12} {:>10}", "CATEGORY", "COST", "PER TUBE");

    let rows = [
        ("Paper", Some(costs.paper_cost), costs.paper_cost_per_tube),
        ("Paste", Some(costs.paste_cost), costs.paste_cost_per_tube),
        (
            "Outer paste",
            Some(costs.outer_paste_cost),
            costs.outer_paste_cost_per_tube,
        ),
        ("Packing", Some(costs.packing_cost), costs.packing_cost_per_tube),
        ("Labour", Some(costs.labour_cost), costs.labour_cost_per_tube),
        ("Electricity", Some(inputs.eb_amount), costs.eb_cost_per_tube),
        (
            "Overheads",
            Some(inputs.overheads_amount),
            costs.overheads_cost_per_tube,
        ),
        ("Food", Some(inputs.food_amount), costs.food_cost_per_tube),
        ("Total", None, costs.grand_total_cost_per_tube),
    ];
    for (name, total, per_tube) in rows {
        let total = total.map_or_else(String::new, |t| format!("{t:.2}"));
        let _ = writeln!(out, "{name:<12} {total:>12} {per_tube:>10.2}");
    }
    out
}
