//! Typed rows of a character table
//!
//! Every character table is a CSV export of one person's continuous glucose
//! monitor joined with a food log. Most rows are plain glucose readings; the
//! rows where the person ate something also carry a meal identifier, a meal
//! type and the macronutrients of that meal.
//!
//! The raw tables are messy, so conversion is lenient:
//!
//! | Field | Missing / unparseable |
//! |-------|-----------------------|
//! | `Meal` | `None` (also for empty or whitespace-only text) |
//! | `Timestamp` | `None` (the row never joins a day window) |
//! | `Dexcom GL`, `Carbs`, `Protein`, `Fat`, `Fiber` | `0.0` |
//! | `Meal Type` | `None` (also for unknown kinds) |
//!
//! Nothing in this module ever fails on bad field content.

use crate::error::{Error, Result};
use crate::loader::RawRecord;
use crate::nutrients::Nutrient;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Formats tried in order when parsing a `Timestamp` cell
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Kind of meal logged on a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Case-insensitive parse; unknown kinds are `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Some(MealType::Breakfast),
            "lunch" => Some(MealType::Lunch),
            "dinner" => Some(MealType::Dinner),
            "snack" => Some(MealType::Snack),
            _ => None,
        }
    }

    /// Main meals get a marker on the glucose chart, snacks don't
    pub fn is_annotated(&self) -> bool {
        !matches!(self, MealType::Snack)
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        };
        write!(f, "{}", s)
    }
}

/// One row of a character table
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Record {
    pub meal: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    /// Dexcom glucose reading in mg/dL
    pub glucose: f64,
    pub meal_type: Option<MealType>,
    /// Grams
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
}

impl Record {
    pub fn from_raw(raw: RawRecord) -> Self {
        Self {
            meal: raw
                .meal
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            timestamp: raw.timestamp.as_deref().and_then(|t| parse_timestamp(t).ok()),
            glucose: parse_number(raw.glucose.as_deref()),
            meal_type: raw.meal_type.as_deref().and_then(MealType::parse),
            carbs: parse_number(raw.carbs.as_deref()),
            protein: parse_number(raw.protein.as_deref()),
            fat: parse_number(raw.fat.as_deref()),
            fiber: parse_number(raw.fiber.as_deref()),
        }
    }

    pub fn nutrient(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Carbs => self.carbs,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
        }
    }
}

/// Lenient numeric cell: absent, blank, non-numeric or non-finite is 0
pub fn parse_number(cell: Option<&str>) -> f64 {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Parse a timestamp in any of the layouts seen in CGM exports.
///
/// Offsets in RFC 3339 input are dropped after conversion, so the result is
/// the wall-clock time the reading was taken at.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_local());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).unwrap_or_default());
    }
    Err(Error::InvalidTimestamp(s.to_string()))
}
