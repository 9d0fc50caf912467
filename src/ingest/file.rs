//! CSV intake files, as exported from the maintenance spreadsheet.
//!
//! Columns are matched by their French header. `Num_equipement`, `Systeme`
//! and `Description` must be present; the detection date and owning section
//! are optional and anything else is ignored.

use super::{AnomalyInput, IngestError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

pub const REQUIRED_COLUMNS: [&str; 3] = ["Num_equipement", "Systeme", "Description"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const DAY_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "Num_equipement")]
    equipment_id: Option<String>,
    #[serde(rename = "Systeme")]
    system: Option<String>,
    #[serde(rename = "Description")]
    description: Option<String>,
    #[serde(
        rename = "Date de détéction de l'anomalie",
        alias = "Date de détection de l'anomalie",
        default
    )]
    detected_on: Option<String>,
    #[serde(rename = "Section propriétaire", default)]
    service: Option<String>,
}

impl From<CsvRecord> for AnomalyInput {
    fn from(r: CsvRecord) -> Self {
        let detected_on = r.detected_on.as_deref().and_then(|raw| {
            let day = parse_day(raw);
            if day.is_none() {
                debug!(raw, "ignoring unreadable detection date");
            }
            day
        });
        AnomalyInput {
            equipment_id: r.equipment_id,
            system: r.system,
            description: r.description,
            service: r.service,
            detected_on,
        }
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DAY_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parse a comma separated file with a header row into intake records.
///
/// Blank cells become missing values, so required fields left empty are
/// reported by [`AnomalyInput::into_anomaly`] rather than here.
pub fn parse_csv(data: &[u8]) -> Result<Vec<AnomalyInput>, IngestError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    let missing: Vec<&'static str> = REQUIRED_COLUMNS
        .into_iter()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let mut inputs = Vec::new();
    for (index, record) in reader.deserialize::<CsvRecord>().enumerate() {
        let record = record.map_err(|e| IngestError::Record {
            index,
            source: Box::new(e.into()),
        })?;
        inputs.push(record.into());
    }
    Ok(inputs)
}
