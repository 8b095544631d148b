//! Nutrient analysis of a single meal
//!
//! Each meal is compared against a baseline amount for four macronutrients.
//! The baseline is configuration, not data: two sets are in use and neither
//! is canonical, so callers pick one explicitly.
//!
//! | Nutrient | NIH (g) | Meal target (g) |
//! |----------|---------|-----------------|
//! | Carbs    | 91      | 45              |
//! | Protein  | 37.5    | 20              |
//! | Fat      | 20.3    | 15              |
//! | Fiber    | 10      | 25              |
//!
//! Readings always come back in the order Carbs, Protein, Fat, Fiber.

use crate::error::Error;
use crate::record::Record;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Nutrient {
    Carbs,
    Protein,
    Fat,
    Fiber,
}

impl Nutrient {
    /// Evaluation order
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Carbs,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Fiber,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Nutrient::Carbs => "Carbs",
            Nutrient::Protein => "Protein",
            Nutrient::Fat => "Fat",
            Nutrient::Fiber => "Fiber",
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Reference amount per nutrient, in grams
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Baselines {
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
    pub fiber: f64,
}

impl Baselines {
    /// National Institute of Health recommendations
    pub const NIH: Baselines = Baselines {
        carbs: 91.0,
        protein: 37.5,
        fat: 20.3,
        fiber: 10.0,
    };

    /// Per-meal targets used by the earlier version of the page
    pub const MEAL_TARGET: Baselines = Baselines {
        carbs: 45.0,
        protein: 20.0,
        fat: 15.0,
        fiber: 25.0,
    };

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Carbs => self.carbs,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Fiber => self.fiber,
        }
    }
}

impl Default for Baselines {
    fn default() -> Self {
        Baselines::NIH
    }
}

/// Named baseline configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineSet {
    #[default]
    Nih,
    MealTarget,
}

impl BaselineSet {
    pub fn baselines(&self) -> Baselines {
        match self {
            BaselineSet::Nih => Baselines::NIH,
            BaselineSet::MealTarget => Baselines::MEAL_TARGET,
        }
    }
}

impl fmt::Display for BaselineSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaselineSet::Nih => write!(f, "nih"),
            BaselineSet::MealTarget => write!(f, "meal-target"),
        }
    }
}

impl FromStr for BaselineSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nih" => Ok(BaselineSet::Nih),
            "meal-target" | "meal_target" | "meal" => Ok(BaselineSet::MealTarget),
            _ => Err(Error::UnknownBaselines(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Above,
    At,
    Below,
}

impl Classification {
    pub fn from_difference(difference: f64) -> Self {
        if difference > 0.0 {
            Classification::Above
        } else if difference < 0.0 {
            Classification::Below
        } else {
            Classification::At
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Above => "above",
            Classification::At => "at",
            Classification::Below => "below",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientReading {
    pub nutrient: Nutrient,
    pub value: f64,
    pub baseline: f64,
    /// `value - baseline`
    pub difference: f64,
    pub classification: Classification,
}

/// Compare a meal's nutrients against the baselines
pub fn analyze(meal: &Record, baselines: &Baselines) -> Vec<NutrientReading> {
    Nutrient::ALL
        .iter()
        .map(|&nutrient| {
            let value = meal.nutrient(nutrient);
            let baseline = baselines.get(nutrient);
            let difference = value - baseline;
            NutrientReading {
                nutrient,
                value,
                baseline,
                difference,
                classification: Classification::from_difference(difference),
            }
        })
        .collect()
}

/// Readings partitioned by classification
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NutrientSummary {
    pub above: Vec<Nutrient>,
    pub below: Vec<Nutrient>,
    pub at_baseline: usize,
}

pub fn summarize(readings: &[NutrientReading]) -> NutrientSummary {
    let mut summary = NutrientSummary::default();
    for r in readings {
        match r.classification {
            Classification::Above => summary.above.push(r.nutrient),
            Classification::Below => summary.below.push(r.nutrient),
            Classification::At => summary.at_baseline += 1,
        }
    }
    summary
}

impl NutrientSummary {
    /// Takeaway paragraph shown next to the nutrient chart
    pub fn takeaway(&self) -> String {
        let mut text = String::new();

        if !self.above.is_empty() {
            text.push_str(&format!(
                "Your consumption of {} is above the baseline. ",
                join_names(&self.above)
            ));
        }
        if !self.below.is_empty() {
            text.push_str(&format!(
                "Your consumption of {} is below the baseline. ",
                join_names(&self.below)
            ));
        }
        if self.at_baseline > 0 {
            text.push_str(&format!(
                "There was {} nutrient{} which was on par with the recommendations from the National Institute of Health.",
                self.at_baseline,
                if self.at_baseline > 1 { "s" } else { "" }
            ));
        }

        text.trim_end().to_string()
    }
}

fn join_names(nutrients: &[Nutrient]) -> String {
    nutrients
        .iter()
        .map(Nutrient::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Upper bound of the value axis: 20% headroom over the largest bar or baseline.
///
/// Baselines are included so their markers never fall off the chart.
pub fn chart_ceiling(readings: &[NutrientReading]) -> f64 {
    readings
        .iter()
        .flat_map(|r| [r.value, r.baseline])
        .fold(0.0, f64::max)
        * 1.2
}
