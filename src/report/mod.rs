//! Report generation for a selected meal
//!
//! A [`MealReport`] is everything a chart layer needs to draw one meal view:
//! the nutrient readings against their baselines, the takeaway text, and the
//! glucose day window with its statistics. It can be written as:
//!
//! - **JSON**: the full report, for programmatic consumption or a web page
//! - **CSV**: the glucose trace of the day window, for spreadsheets
//!
//! # Usage
//!
//! ```ignore
//! use glucoaster::report;
//!
//! // Automatically picks format based on extension
//! report::generate("dinner.json", &meal_report)?;  // JSON
//! report::generate("dinner.csv", &meal_report)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::catalog;
use crate::character::Character;
use crate::error::{Error, Result};
use crate::glucose::{self, DayWindow, GlucoseSample, RangeStats, TimeRange};
use crate::nutrients::{self, Baselines, NutrientReading, NutrientSummary};
use crate::record::Record;
use serde::Serialize;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, report: &MealReport) -> Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, report),
        _ => csv::write(&mut file, report),
    }
}

/// Computed view of one meal for one character
#[derive(Debug, Clone, Serialize)]
pub struct MealReport {
    pub generated: String,
    pub character: Character,
    pub meal: String,
    pub display_name: String,
    pub image: String,
    /// Rows sharing this meal identifier; only the first one is analysed
    pub occurrences: usize,
    pub baselines: Baselines,
    pub readings: Vec<NutrientReading>,
    pub summary: NutrientSummary,
    pub takeaway: String,
    pub chart_ceiling: f64,
    pub window: DayWindow,
    pub markers: Vec<GlucoseSample>,
    pub stats: Option<RangeStats>,
}

impl MealReport {
    pub fn build(
        character: Character,
        table: &[Record],
        meal: &str,
        baselines: &Baselines,
        range: Option<TimeRange>,
    ) -> Result<Self> {
        let record = catalog::find_meal(table, meal)
            .ok_or_else(|| Error::UnknownMeal(meal.to_string()))?;
        let reference = record
            .timestamp
            .ok_or_else(|| Error::MissingTimestamp(meal.to_string()))?;

        let readings = nutrients::analyze(record, baselines);
        let summary = nutrients::summarize(&readings);
        let window = glucose::select_day(table, reference, range);
        let markers: Vec<GlucoseSample> = glucose::meal_markers(&window).into_iter().cloned().collect();

        Ok(Self {
            generated: chrono::Local::now().to_rfc3339(),
            character,
            meal: meal.to_string(),
            display_name: catalog::display_name(meal),
            image: catalog::image_file_name(meal),
            occurrences: catalog::occurrences(table, meal),
            baselines: *baselines,
            takeaway: summary.takeaway(),
            chart_ceiling: nutrients::chart_ceiling(&readings),
            stats: window.stats(),
            readings,
            summary,
            markers,
            window,
        })
    }
}
