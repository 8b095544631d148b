//! Table loading
//!
//! A character table is a CSV file with a header row. Only the columns the
//! analysis needs are read; any extra columns are ignored and any missing
//! ones are treated as empty.

use crate::character::Character;
use crate::error::{Error, Result};
use crate::record::Record;
use csv::{ByteRecord, StringRecord};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

/// A table row as text, keyed by the column names of the export
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "Meal")]
    pub meal: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
    #[serde(rename = "Dexcom GL")]
    pub glucose: Option<String>,
    #[serde(rename = "Meal Type")]
    pub meal_type: Option<String>,
    #[serde(rename = "Carbs")]
    pub carbs: Option<String>,
    #[serde(rename = "Protein")]
    pub protein: Option<String>,
    #[serde(rename = "Fat")]
    pub fat: Option<String>,
    #[serde(rename = "Fiber")]
    pub fiber: Option<String>,
}

/// Source of character tables
pub trait TableLoader {
    fn load(&self, character: Character) -> Result<Vec<Record>>;
}

/// Parse CSV text into records, preserving row order.
///
/// Cells that are not valid UTF-8 are decoded lossily instead of failing
/// the table.
pub fn parse_table<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = decode_lossy(csv_reader.byte_headers()?);

    let mut records = Vec::new();
    let mut undated = 0usize;
    for row in csv_reader.byte_records() {
        let raw: RawRecord = decode_lossy(&row?).deserialize(Some(&headers))?;
        let record = Record::from_raw(raw);
        if record.timestamp.is_none() {
            undated += 1;
        }
        records.push(record);
    }

    if undated > 0 {
        log::warn!(
            "{} of {} rows have no parseable timestamp and will not appear in any day window",
            undated,
            records.len()
        );
    }
    log::debug!("parsed {} rows", records.len());

    Ok(records)
}

fn decode_lossy(record: &ByteRecord) -> StringRecord {
    record.iter().map(String::from_utf8_lossy).collect()
}

/// Reads `male.csv` / `female.csv` from a data directory
#[derive(Debug, Clone)]
pub struct CsvDirLoader {
    dir: PathBuf,
}

impl CsvDirLoader {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, character: Character) -> PathBuf {
        self.dir.join(character.table_file())
    }
}

impl TableLoader for CsvDirLoader {
    fn load(&self, character: Character) -> Result<Vec<Record>> {
        let path = self.path_for(character);
        log::info!("loading {} table from {}", character, path.display());
        let file = std::fs::File::open(&path)
            .map_err(|e| Error::LoadFailed(format!("{}: {}", path.display(), e)))?;
        parse_table(file)
    }
}

/// Tables held as CSV text, e.g. handed over by a web page
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    tables: HashMap<Character, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, character: Character, csv_text: impl Into<String>) -> Self {
        self.tables.insert(character, csv_text.into());
        self
    }
}

impl TableLoader for MemoryLoader {
    fn load(&self, character: Character) -> Result<Vec<Record>> {
        let text = self
            .tables
            .get(&character)
            .ok_or_else(|| Error::LoadFailed(format!("no table for {}", character)))?;
        parse_table(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
Timestamp,Dexcom GL,Meal,Meal Type,Carbs,Protein,Fat,Fiber,Calories
2024-03-01 08:00:00,95,,,,,,,
2024-03-01 08:05:00,101,Oatmeal,Breakfast,45,8,5,6,250
2024-03-01 08:10:00,118,,,,,,,
";

    // ==========================================================================
    // CSV PARSING TESTS
    // ==========================================================================

    #[test]
    fn test_parse_table_rows_in_order() {
        let records = parse_table(TABLE.as_bytes()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].glucose, 95.0);
        assert_eq!(records[1].glucose, 101.0);
        assert_eq!(records[2].glucose, 118.0);
    }

    #[test]
    fn test_parse_table_ignores_extra_columns() {
        let records = parse_table(TABLE.as_bytes()).unwrap();
        assert_eq!(records[1].meal.as_deref(), Some("Oatmeal"));
        assert_eq!(records[1].carbs, 45.0);
    }

    #[test]
    fn test_parse_table_missing_columns() {
        let text = "Timestamp,Meal\n2024-03-01 12:00:00,Salad\n";
        let records = parse_table(text.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].meal.as_deref(), Some("Salad"));
        assert_eq!(records[0].glucose, 0.0);
        assert_eq!(records[0].fiber, 0.0);
    }

    #[test]
    fn test_parse_table_latin1_cell() {
        let mut bytes = b"Timestamp,Dexcom GL,Meal,Carbs\n".to_vec();
        bytes.extend_from_slice(b"2024-03-01 08:00:00,99,Caf\xE9 au lait,12\n");
        bytes.extend_from_slice(b"2024-03-01 08:05:00,104,,\n");

        let records = parse_table(&bytes[..]).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].meal.as_deref(), Some("Caf\u{FFFD} au lait"));
        assert_eq!(records[0].carbs, 12.0);
        assert_eq!(records[1].glucose, 104.0);
    }

    #[test]
    fn test_parse_table_trims_meal_identifiers() {
        let text = "Timestamp,Meal\n2024-03-01 12:00:00, Pasta\n2024-03-01 19:00:00,Pasta \n";
        let records = parse_table(text.as_bytes()).unwrap();

        assert_eq!(records[0].meal.as_deref(), Some("Pasta"));
        assert_eq!(crate::catalog::distinct_meals(&records), vec!["Pasta".to_string()]);
    }

    #[test]
    fn test_parse_table_empty_input() {
        let records = parse_table("".as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_table_header_only() {
        let records = parse_table("Timestamp,Meal\n".as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    // ==========================================================================
    // LOADER TESTS
    // ==========================================================================

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_table(Character::Jack, TABLE);

        assert_eq!(loader.load(Character::Jack).unwrap().len(), 3);
        assert!(matches!(
            loader.load(Character::Jill),
            Err(Error::LoadFailed(_))
        ));
    }

    #[test]
    fn test_dir_loader_paths() {
        let loader = CsvDirLoader::new("data");
        assert_eq!(loader.path_for(Character::Jack), Path::new("data").join("male.csv"));
        assert_eq!(loader.path_for(Character::Jill), Path::new("data").join("female.csv"));
    }

    #[test]
    fn test_dir_loader_missing_file() {
        let loader = CsvDirLoader::new("/nonexistent/glucoaster/data");
        assert!(matches!(
            loader.load(Character::Jill),
            Err(Error::LoadFailed(_))
        ));
    }

    #[test]
    fn test_dir_loader_reads_file() {
        let dir = std::env::temp_dir().join(format!("glucoaster-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("female.csv"), TABLE).unwrap();

        let records = CsvDirLoader::new(&dir).load(Character::Jill).unwrap();
        assert_eq!(records.len(), 3);

        std::fs::remove_dir_all(&dir).ok();
    }
}
