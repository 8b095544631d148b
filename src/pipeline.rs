//! Selection state for one view of the page
//!
//! The page runs the same character -> meal -> analysis flow three times:
//! once in the main story and once in each of the two comparison slots. Each
//! run is a [`Pipeline`] value; the three live together in a [`Session`].
//!
//! ```text
//! NoCharacter -> CharacterChosen -> MealListed -> MealChosen -> GlucoseReady
//!      ^               (load)                                        |
//!      +-------------------------- restart --------------------------+
//! ```
//!
//! Choosing a character starts a table load and hands back a [`LoadTicket`].
//! Only the ticket of the most recent selection is honoured when the load
//! completes, so a slow load for an earlier choice can never overwrite a
//! newer one.

use crate::catalog;
use crate::character::Character;
use crate::error::{Error, Result};
use crate::glucose::{self, DayWindow, GlucoseSample, RangeStats, TimeRange};
use crate::loader::TableLoader;
use crate::nutrients::{self, Baselines, NutrientReading};
use crate::record::Record;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NoCharacter,
    CharacterChosen,
    MealListed,
    MealChosen,
    GlucoseReady,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::NoCharacter => "no character is chosen",
            Stage::CharacterChosen => "the character's table is not loaded",
            Stage::MealListed => "no meal is chosen",
            Stage::MealChosen => "a meal is chosen",
            Stage::GlucoseReady => "the glucose view is ready",
        };
        write!(f, "{}", s)
    }
}

/// Which view a pipeline drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Primary,
    Comparison1,
    Comparison2,
}

impl Slot {
    /// Comparison charts only cover the evening around dinner
    pub fn time_range(&self) -> Option<TimeRange> {
        match self {
            Slot::Primary => None,
            Slot::Comparison1 | Slot::Comparison2 => Some(TimeRange::evening()),
        }
    }
}

/// Proof of which selection a table load belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub slot: Slot,
    pub character: Character,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Table accepted, meals listed
    Applied,
    /// Load failed; the pipeline stays at `CharacterChosen`
    Failed,
    /// A newer selection or a restart superseded this load
    Discarded,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    slot: Slot,
    baselines: Baselines,
    stage: Stage,
    generation: u64,
    character: Option<Character>,
    load_error: Option<String>,
    table: Vec<Record>,
    meals: Vec<String>,
    meal: Option<Record>,
    readings: Vec<NutrientReading>,
    window: Option<DayWindow>,
}

impl Pipeline {
    pub fn new(slot: Slot, baselines: Baselines) -> Self {
        Self {
            slot,
            baselines,
            stage: Stage::NoCharacter,
            generation: 0,
            character: None,
            load_error: None,
            table: Vec::new(),
            meals: Vec::new(),
            meal: None,
            readings: Vec::new(),
            window: None,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn baselines(&self) -> &Baselines {
        &self.baselines
    }

    pub fn character(&self) -> Option<Character> {
        self.character
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn table(&self) -> &[Record] {
        &self.table
    }

    pub fn meals(&self) -> &[String] {
        &self.meals
    }

    pub fn meal(&self) -> Option<&Record> {
        self.meal.as_ref()
    }

    pub fn readings(&self) -> &[NutrientReading] {
        &self.readings
    }

    pub fn window(&self) -> Option<&DayWindow> {
        self.window.as_ref()
    }

    /// Drop every derived value and go back to `NoCharacter`.
    ///
    /// Any load still in flight becomes stale.
    pub fn restart(&mut self) {
        let generation = self.generation + 1;
        *self = Self {
            generation,
            ..Self::new(self.slot, self.baselines)
        };
        log::debug!("{:?}: restarted", self.slot);
    }

    /// Select a character. Allowed from any stage; previous state is cleared.
    pub fn choose_character(&mut self, character: Character) -> LoadTicket {
        self.restart();
        self.character = Some(character);
        self.stage = Stage::CharacterChosen;
        log::debug!(
            "{:?}: chose {} (load #{})",
            self.slot,
            character,
            self.generation
        );
        LoadTicket {
            slot: self.slot,
            character,
            generation: self.generation,
        }
    }

    /// Deliver the result of a table load
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<Vec<Record>>) -> LoadOutcome {
        if ticket.generation != self.generation
            || ticket.slot != self.slot
            || self.stage != Stage::CharacterChosen
        {
            log::debug!(
                "{:?}: discarding stale load for {} (#{}, current #{})",
                self.slot,
                ticket.character,
                ticket.generation,
                self.generation
            );
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(table) => {
                self.meals = catalog::distinct_meals(&table);
                self.table = table;
                self.load_error = None;
                self.stage = Stage::MealListed;
                log::info!(
                    "{:?}: {} rows, {} meals for {}",
                    self.slot,
                    self.table.len(),
                    self.meals.len(),
                    ticket.character
                );
                LoadOutcome::Applied
            }
            Err(e) => {
                log::warn!("{:?}: load failed for {}: {}", self.slot, ticket.character, e);
                self.load_error = Some(e.to_string());
                LoadOutcome::Failed
            }
        }
    }

    /// Choose a character and load its table synchronously
    pub fn load_with(&mut self, loader: &dyn TableLoader, character: Character) -> Result<()> {
        let ticket = self.choose_character(character);
        match self.complete_load(ticket, loader.load(character)) {
            LoadOutcome::Applied => Ok(()),
            _ => Err(Error::LoadFailed(
                self.load_error.clone().unwrap_or_else(|| "superseded".to_string()),
            )),
        }
    }

    /// Pick a meal from the catalog and compute its nutrient readings
    pub fn choose_meal(&mut self, meal: &str) -> Result<&[NutrientReading]> {
        match self.stage {
            Stage::MealListed | Stage::MealChosen | Stage::GlucoseReady => {}
            stage => {
                return Err(Error::InvalidTransition {
                    stage,
                    action: "choose a meal",
                })
            }
        }

        let record = catalog::find_meal(&self.table, meal)
            .ok_or_else(|| Error::UnknownMeal(meal.to_string()))?
            .clone();
        let count = catalog::occurrences(&self.table, meal);
        if count > 1 {
            log::debug!(
                "{:?}: meal '{}' appears {} times, using the first",
                self.slot,
                meal,
                count
            );
        }

        self.readings = nutrients::analyze(&record, &self.baselines);
        self.meal = Some(record);
        self.window = None;
        self.stage = Stage::MealChosen;
        Ok(self.readings.as_slice())
    }

    /// Build the glucose day window around the chosen meal
    pub fn show_glucose(&mut self) -> Result<&DayWindow> {
        let meal = match (self.stage, self.meal.as_ref()) {
            (Stage::MealChosen | Stage::GlucoseReady, Some(meal)) => meal,
            (stage, _) => {
                return Err(Error::InvalidTransition {
                    stage,
                    action: "show glucose",
                })
            }
        };
        let reference = meal
            .timestamp
            .ok_or_else(|| Error::MissingTimestamp(meal.meal.clone().unwrap_or_default()))?;

        let window = glucose::select_day(&self.table, reference, self.slot.time_range());
        if window.is_empty() {
            log::warn!("{:?}: no glucose samples on {}", self.slot, window.date);
        }
        self.stage = Stage::GlucoseReady;
        Ok(&*self.window.insert(window))
    }

    fn ready_window(&self, action: &'static str) -> Result<&DayWindow> {
        self.window.as_ref().ok_or(Error::InvalidTransition {
            stage: self.stage,
            action,
        })
    }

    /// Hover query against the current window
    pub fn nearest(&self, query: NaiveDateTime) -> Result<&GlucoseSample> {
        glucose::nearest(self.ready_window("inspect a sample")?, query)
    }

    /// Brush query against the current window
    pub fn aggregate(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<Option<RangeStats>> {
        Ok(glucose::aggregate(self.ready_window("aggregate a range")?, from, to))
    }
}

/// The main view plus the two comparison slots
#[derive(Debug, Clone)]
pub struct Session {
    pub primary: Pipeline,
    pub comparison: [Pipeline; 2],
}

impl Session {
    pub fn new(baselines: Baselines) -> Self {
        Self {
            primary: Pipeline::new(Slot::Primary, baselines),
            comparison: [
                Pipeline::new(Slot::Comparison1, baselines),
                Pipeline::new(Slot::Comparison2, baselines),
            ],
        }
    }

    pub fn slot(&self, slot: Slot) -> &Pipeline {
        match slot {
            Slot::Primary => &self.primary,
            Slot::Comparison1 => &self.comparison[0],
            Slot::Comparison2 => &self.comparison[1],
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut Pipeline {
        match slot {
            Slot::Primary => &mut self.primary,
            Slot::Comparison1 => &mut self.comparison[0],
            Slot::Comparison2 => &mut self.comparison[1],
        }
    }

    /// Reset every slot together
    pub fn restart(&mut self) {
        self.primary.restart();
        for p in &mut self.comparison {
            p.restart();
        }
        log::info!("session restarted");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Baselines::default())
    }
}
