// src/domain/property.rs

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The listing sites we ingest from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Realtor,
    Zillow,
    Redfin,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Realtor, Source::Zillow, Source::Redfin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Realtor => "realtor",
            Source::Zillow => "zillow",
            Source::Redfin => "redfin",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realtor" => Ok(Source::Realtor),
            "zillow" => Ok(Source::Zillow),
            "redfin" => Ok(Source::Redfin),
            other => Err(format!("unknown source: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyType {
    #[serde(rename = "Single_Family")]
    SingleFamily,
    #[serde(rename = "Multi_Family")]
    MultiFamily,
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::SingleFamily => "Single_Family",
            PropertyType::MultiFamily => "Multi_Family",
            PropertyType::Other => "Other",
        }
    }

    /// Lenient parse used for stored values; anything unrecognised is `Other`.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "Single_Family" => PropertyType::SingleFamily,
            "Multi_Family" => PropertyType::MultiFamily,
            _ => PropertyType::Other,
        }
    }
}

/// Why a property did not pass verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    SquareFootage,
    NotInterested,
    NoAddress,
    ApiError,
}

impl FailureReason {
    pub const ALL: [FailureReason; 4] = [
        FailureReason::SquareFootage,
        FailureReason::NotInterested,
        FailureReason::NoAddress,
        FailureReason::ApiError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::SquareFootage => "SQUARE_FOOTAGE",
            FailureReason::NotInterested => "NOT_INTERESTED",
            FailureReason::NoAddress => "NO_ADDRESS",
            FailureReason::ApiError => "API_ERROR",
        }
    }

    /// `API_ERROR` stays eligible for later runs; everything else is terminal.
    pub fn is_soft(&self) -> bool {
        matches!(self, FailureReason::ApiError)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SQUARE_FOOTAGE" => Ok(FailureReason::SquareFootage),
            "NOT_INTERESTED" => Ok(FailureReason::NotInterested),
            "NO_ADDRESS" => Ok(FailureReason::NoAddress),
            "API_ERROR" => Ok(FailureReason::ApiError),
            other => Err(format!("unknown failure reason: {other}")),
        }
    }
}

/// One listing in its canonical, source-independent shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub property_id: String,
    pub state: String,
    pub property_type: PropertyType,
    pub occupancy_status: String,
    pub address: String,
    pub zip_code: String,
    pub square_footage: f64,
    pub bedrooms: i64,
    pub bathrooms: f64,
    pub year_built: i32,
    pub after_repair_value: f64,
    pub url: String,
    pub source: Source,
    pub is_verified: bool,
    pub failure_reason: Option<FailureReason>,
    /// Set by the store on first insert; `None` for records not yet persisted.
    pub date_added: Option<NaiveDateTime>,
}

impl PropertyRecord {
    /// A fresh, unverified record as produced by a source adapter.
    pub fn new(property_id: impl Into<String>, source: Source) -> Self {
        Self {
            property_id: property_id.into(),
            state: String::new(),
            property_type: PropertyType::Other,
            occupancy_status: "Unknown".to_string(),
            address: String::new(),
            zip_code: String::new(),
            square_footage: 0.0,
            bedrooms: 0,
            bathrooms: 0.0,
            year_built: 0,
            after_repair_value: 0.0,
            url: String::new(),
            source,
            is_verified: false,
            failure_reason: None,
            date_added: None,
        }
    }

    /// Numeric attributes must be non-negative; adapters drop records that are not.
    pub fn has_valid_measurements(&self) -> bool {
        self.square_footage >= 0.0
            && self.bedrooms >= 0
            && self.bathrooms >= 0.0
            && self.after_repair_value >= 0.0
    }
}

/// Joins the non-empty parts of an address as `line, city, ST zip`.
pub fn format_address(line: &str, city: &str, state_code: &str, zip: &str) -> String {
    let region = [state_code.trim(), zip.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    [line.trim(), city.trim(), region.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

macro_rules! sql_text_enum {
    ($ty:ty, $parse:expr) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                $parse(text).map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

sql_text_enum!(Source, Source::from_str);
sql_text_enum!(FailureReason, FailureReason::from_str);
sql_text_enum!(PropertyType, |s: &str| Ok::<_, String>(PropertyType::from_stored(s)));
