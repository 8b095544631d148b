//! Glucoaster - Meal nutrients and blood glucose, side by side
//!
//! Glucoaster powers an educational story page: pick one of two characters,
//! pick a meal they ate, and see how that meal compares with recommended
//! nutrient amounts and what their blood glucose did that day.
//!
//! # Overview
//!
//! Each character has one CSV table exported from a continuous glucose
//! monitor and a food log. From it the crate derives:
//!
//! 1. **Meal catalog**: the distinct meals the character logged, in the order
//!    they first appear.
//!
//! 2. **Nutrient readings**: carbs, protein, fat and fiber of the meal,
//!    classified as above, at or below a baseline set.
//!
//! 3. **Glucose day window**: every reading from the day of the meal,
//!    optionally limited to the evening, with nearest-sample and range
//!    statistics queries for hover and brush interaction.
//!
//! # Quick Start
//!
//! ```no_run
//! use glucoaster::{Baselines, Character, CsvDirLoader, Pipeline, Slot};
//!
//! let loader = CsvDirLoader::new("data");
//! let mut view = Pipeline::new(Slot::Primary, Baselines::NIH);
//!
//! view.load_with(&loader, Character::Jack)?;
//! println!("Meals: {:?}", view.meals());
//!
//! for reading in view.choose_meal("Dinner")? {
//!     println!("{}: {}g ({})", reading.nutrient, reading.value, reading.classification);
//! }
//!
//! let window = view.show_glucose()?;
//! println!("{} readings on {}", window.len(), window.date);
//! # Ok::<(), glucoaster::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`loader`]: CSV tables into typed [`Record`]s
//! - [`catalog`]: distinct meals and meal lookup
//! - [`nutrients`]: baselines, readings and the takeaway summary
//! - [`glucose`]: day windows, nearest sample and range aggregates
//! - [`pipeline`]: per-view selection state and the three-slot session
//! - [`report`]: JSON and CSV output
//! - `serve`: local JSON API for a chart front end (feature `server`)

pub mod catalog;
pub mod character;
pub mod error;
pub mod glucose;
pub mod loader;
pub mod nutrients;
pub mod pipeline;
pub mod record;
pub mod report;
#[cfg(feature = "server")]
pub mod serve;

pub use character::Character;
pub use error::{Error, Result};
pub use glucose::{DayWindow, GlucoseSample, RangeStats, TimeRange, TimeScale};
pub use loader::{CsvDirLoader, MemoryLoader, TableLoader};
pub use nutrients::{BaselineSet, Baselines, Classification, Nutrient, NutrientReading, NutrientSummary};
pub use pipeline::{LoadOutcome, LoadTicket, Pipeline, Session, Slot, Stage};
pub use record::{MealType, Record};
pub use report::MealReport;
