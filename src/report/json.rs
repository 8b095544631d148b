//! JSON report output

use super::MealReport;
use crate::error::Result;
use std::io::Write;

pub fn write<W: Write>(writer: &mut W, report: &MealReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, report)?;
    writeln!(writer)?;
    Ok(())
}
