use glucoaster::glucose::{self, DayWindow, GlucoseSample, RangeStats, TimeRange, TimeScale};
use glucoaster::loader::parse_table;
use glucoaster::{BaselineSet, Baselines, Character, MealReport, Record};
use serde::Serialize;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
pub struct DayResult {
    pub window: DayWindow,
    pub markers: Vec<GlucoseSample>,
    pub stats: Option<RangeStats>,
    pub within_ideal: bool,
}

/// Both character tables, parsed once, queried from the page
#[wasm_bindgen]
pub struct Analyzer {
    tables: HashMap<Character, Vec<Record>>,
    baselines: Baselines,
}

#[wasm_bindgen]
impl Analyzer {
    /// Parse the male (Jack) and female (Jill) CSV text
    #[wasm_bindgen(constructor)]
    pub fn new(male_csv: &str, female_csv: &str, baselines: &str) -> Result<Analyzer, JsValue> {
        let set: BaselineSet = baselines.parse().map_err(js_error)?;

        let mut tables = HashMap::new();
        for (character, text) in [(Character::Jack, male_csv), (Character::Jill, female_csv)] {
            let table = parse_table(text.as_bytes()).map_err(js_error)?;
            web_sys::console::log_1(&format!("{}: {} rows", character, table.len()).into());
            tables.insert(character, table);
        }

        Ok(Analyzer {
            tables,
            baselines: set.baselines(),
        })
    }

    /// Distinct meal identifiers in first-seen order
    #[wasm_bindgen]
    pub fn meals(&self, character: &str) -> Result<js_sys::Array, JsValue> {
        let table = self.table(character)?;
        Ok(glucoaster::catalog::distinct_meals(table)
            .into_iter()
            .map(JsValue::from)
            .collect())
    }

    /// Nutrient readings, takeaway and the full-day window of one meal
    #[wasm_bindgen]
    pub fn analyze(&self, character: &str, meal: &str) -> Result<JsValue, JsValue> {
        to_js(&self.report(character, meal, false)?)
    }

    #[wasm_bindgen]
    pub fn day(&self, character: &str, meal: &str, evening: bool) -> Result<JsValue, JsValue> {
        let report = self.report(character, meal, evening)?;
        let within_ideal = report.stats.as_ref().map_or(false, |s| s.within_ideal());
        to_js(&DayResult {
            window: report.window,
            markers: report.markers,
            stats: report.stats,
            within_ideal,
        })
    }

    /// Sample closest to `at` (clock time or full timestamp)
    #[wasm_bindgen]
    pub fn nearest(&self, character: &str, meal: &str, evening: bool, at: &str) -> Result<JsValue, JsValue> {
        let report = self.report(character, meal, evening)?;
        let query = glucose::resolve_time(report.window.date, at).map_err(js_error)?;
        let sample = glucose::nearest(&report.window, query).map_err(js_error)?;
        to_js(sample)
    }

    /// Range statistics between `from` and `to`, `null` when the range is empty
    #[wasm_bindgen]
    pub fn aggregate(
        &self,
        character: &str,
        meal: &str,
        evening: bool,
        from: &str,
        to: &str,
    ) -> Result<JsValue, JsValue> {
        let report = self.report(character, meal, evening)?;
        let date = report.window.date;
        let from = glucose::resolve_time(date, from).map_err(js_error)?;
        let to = glucose::resolve_time(date, to).map_err(js_error)?;
        to_js(&glucose::aggregate(&report.window, from, to))
    }

    /// Range statistics for a brush given in pixels on a chart `width` wide
    #[wasm_bindgen(js_name = aggregateSpan)]
    pub fn aggregate_span(
        &self,
        character: &str,
        meal: &str,
        evening: bool,
        x0: f64,
        x1: f64,
        width: f64,
    ) -> Result<JsValue, JsValue> {
        let report = self.report(character, meal, evening)?;
        let stats = TimeScale::new(&report.window, width)
            .and_then(|scale| glucose::aggregate_span(&report.window, &scale, x0, x1));
        to_js(&stats)
    }
}

impl Analyzer {
    fn table(&self, character: &str) -> Result<&[Record], JsValue> {
        let character: Character = character.parse().map_err(js_error)?;
        Ok(self.tables.get(&character).map(Vec::as_slice).unwrap_or(&[]))
    }

    fn report(&self, character: &str, meal: &str, evening: bool) -> Result<MealReport, JsValue> {
        let table = self.table(character)?;
        let character: Character = character.parse().map_err(js_error)?;
        let range = if evening { Some(TimeRange::evening()) } else { None };
        MealReport::build(character, table, meal, &self.baselines, range).map_err(js_error)
    }
}

fn js_error(e: glucoaster::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}
