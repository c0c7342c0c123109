use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::AppError;
use crate::features::reports::models::{
    CrimeType, GeoPoint, Report, ReportCandidate, ReportFilter,
};
use crate::shared::constants::{
    DEFAULT_LIST_LIMIT, DEFAULT_NEARBY_LIMIT, MAX_LIST_LIMIT, MAX_NEARBY_LIMIT, MAX_RADIUS_METERS,
};

/// Location as sent by the client; either coordinate may be missing
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct LocationDto {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

/// Request body for submitting a report
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportDto {
    /// One of the recognized categories (see `/api/crime-types`)
    pub crime_type: Option<String>,
    /// Required when `crimeType` is `Other`
    pub other_type: Option<String>,
    /// Up to 300 characters
    pub description: Option<String>,
    pub location: Option<LocationDto>,
}

impl From<SubmitReportDto> for ReportCandidate {
    fn from(dto: SubmitReportDto) -> Self {
        let location = dto.location.and_then(|l| match (l.lat, l.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        });

        Self {
            crime_type: dto.crime_type.unwrap_or_default(),
            other_type: dto.other_type,
            description: dto.description,
            location,
        }
    }
}

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponseDto {
    pub id: Uuid,
    pub crime_type: CrimeType,
    pub other_type: Option<String>,
    pub description: Option<String>,
    pub location: GeoPoint,
    pub created_at: DateTime<Utc>,
}

impl From<Report> for ReportResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            crime_type: r.crime_type,
            other_type: r.other_type,
            description: r.description,
            location: r.location,
            created_at: r.created_at,
        }
    }
}

/// Recognized crime category
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrimeTypeDto {
    pub name: CrimeType,
    /// Whether submissions must carry `otherType`
    pub requires_subtype: bool,
}

impl From<CrimeType> for CrimeTypeDto {
    fn from(t: CrimeType) -> Self {
        Self {
            name: t,
            requires_subtype: t == CrimeType::Other,
        }
    }
}

fn validate_radius(radius: f64) -> Result<(), validator::ValidationError> {
    if radius.is_finite() && radius > 0.0 && radius <= MAX_RADIUS_METERS {
        Ok(())
    } else {
        Err(validator::ValidationError::new("radius_range")
            .with_message("radiusMeters must be greater than 0 and at most 50000".into()))
    }
}

/// Query parameters for the nearby search
#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NearbyQueryParams {
    /// Centre latitude in degrees
    pub lat: Option<f64>,
    /// Centre longitude in degrees
    pub lng: Option<f64>,
    /// Search radius in meters
    #[validate(
        required(message = "radiusMeters is required"),
        custom(function = "validate_radius")
    )]
    #[param(minimum = 0, maximum = 50000)]
    pub radius_meters: Option<f64>,
    /// Maximum number of results (default 50)
    #[validate(range(min = 1, max = 200, message = "limit must be between 1 and 200"))]
    #[param(minimum = 1, maximum = 200)]
    pub limit: Option<usize>,
}

impl NearbyQueryParams {
    /// `None` when either coordinate is missing
    pub fn center(&self) -> Option<GeoPoint> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        }
    }

    pub fn radius(&self) -> f64 {
        self.radius_meters.unwrap_or_default()
    }

    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_NEARBY_LIMIT)
            .clamp(1, MAX_NEARBY_LIMIT)
    }
}

/// Query parameters for listing reports
#[derive(Debug, Clone, Default, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListReportsQueryParams {
    /// Restrict to one category (case-insensitive)
    pub crime_type: Option<String>,
    /// Only reports created at or after this instant (RFC 3339)
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of results (default 100)
    #[validate(range(min = 1, max = 1000, message = "limit must be between 1 and 1000"))]
    #[param(minimum = 1, maximum = 1000)]
    pub limit: Option<usize>,
}

impl ListReportsQueryParams {
    pub fn to_filter(&self) -> Result<ReportFilter, AppError> {
        let crime_type = match self.crime_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(CrimeType::parse(raw).ok_or_else(|| {
                AppError::Validation(format!("Unknown crime type '{}'", raw))
            })?),
        };

        Ok(ReportFilter {
            crime_type,
            since: self.since,
            limit: Some(self.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)),
        })
    }
}
