//! CSV output of the glucose trace behind a meal view

use super::MealReport;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Row<'a> {
    timestamp: String,
    glucose: f64,
    meal: &'a str,
    meal_type: String,
}

pub fn write<W: Write>(writer: &mut W, report: &MealReport) -> Result<()> {
    let mut out = ::csv::Writer::from_writer(writer);
    for s in report.window.samples() {
        out.serialize(Row {
            timestamp: s.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            glucose: s.glucose,
            meal: s.meal.as_deref().unwrap_or(""),
            meal_type: s.meal_type.map(|t| t.to_string()).unwrap_or_default(),
        })?;
    }
    if report.window.is_empty() {
        out.write_record(["timestamp", "glucose", "meal", "meal_type"])?;
    }
    out.flush()?;
    Ok(())
}
