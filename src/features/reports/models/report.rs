use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::storage::{RecordFilter, ReportRecord, StorageError};

/// Recognized crime categories, in the order the client renders them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum CrimeType {
    Theft,
    Assault,
    Burglary,
    Robbery,
    Vandalism,
    Harassment,
    Other,
}

impl CrimeType {
    pub const ALL: [CrimeType; 7] = [
        CrimeType::Theft,
        CrimeType::Assault,
        CrimeType::Burglary,
        CrimeType::Robbery,
        CrimeType::Vandalism,
        CrimeType::Harassment,
        CrimeType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrimeType::Theft => "Theft",
            CrimeType::Assault => "Assault",
            CrimeType::Burglary => "Burglary",
            CrimeType::Robbery => "Robbery",
            CrimeType::Vandalism => "Vandalism",
            CrimeType::Harassment => "Harassment",
            CrimeType::Other => "Other",
        }
    }

    /// Case-insensitive lookup of a trimmed category name
    pub fn parse(value: &str) -> Option<CrimeType> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for CrimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WGS84 coordinate pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Raw submission before validation; every field may be missing or malformed
#[derive(Debug, Clone, Default)]
pub struct ReportCandidate {
    pub crime_type: String,
    pub other_type: Option<String>,
    pub description: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Validated report awaiting an id from the store
#[derive(Debug, Clone, PartialEq)]
pub struct CreateReport {
    pub crime_type: CrimeType,
    pub other_type: Option<String>,
    pub description: Option<String>,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

/// Stored incident report. Never mutated after `ReportStore::put`.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: Uuid,
    pub crime_type: CrimeType,
    pub other_type: Option<String>,
    pub description: Option<String>,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn from_create(id: Uuid, data: CreateReport) -> Self {
        Self {
            id,
            crime_type: data.crime_type,
            other_type: data.other_type,
            description: data.description,
            location: data.location,
            created_at: data.created_at,
        }
    }
}

impl From<&Report> for ReportRecord {
    fn from(r: &Report) -> Self {
        Self {
            id: r.id,
            crime_type: r.crime_type.as_str().to_string(),
            other_type: r.other_type.clone(),
            description: r.description.clone(),
            lat: r.location.lat,
            lng: r.location.lng,
            created_at: r.created_at,
        }
    }
}

impl TryFrom<ReportRecord> for Report {
    type Error = StorageError;

    fn try_from(r: ReportRecord) -> Result<Self, Self::Error> {
        let crime_type = CrimeType::parse(&r.crime_type).ok_or_else(|| {
            StorageError::Corrupt(format!(
                "record {} has unknown crime type '{}'",
                r.id, r.crime_type
            ))
        })?;

        Ok(Self {
            id: r.id,
            crime_type,
            other_type: r.other_type,
            description: r.description,
            location: GeoPoint {
                lat: r.lat,
                lng: r.lng,
            },
            created_at: r.created_at,
        })
    }
}

/// Optional constraints for `ReportStore::list`
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub crime_type: Option<CrimeType>,
    /// Inclusive lower bound on `created_at`
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl From<&ReportFilter> for RecordFilter {
    fn from(f: &ReportFilter) -> Self {
        Self {
            crime_type: f.crime_type.map(|t| t.as_str().to_string()),
            since: f.since,
            limit: f.limit,
        }
    }
}
