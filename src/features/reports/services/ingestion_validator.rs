use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::features::reports::models::{CreateReport, CrimeType, ReportCandidate};
use crate::shared::constants::MAX_DESCRIPTION_LENGTH;

/// Client-fixable rejection of a submitted report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a crime type.")]
    MissingCrimeType,

    #[error("Crime type is not one of the recognized categories.")]
    UnknownCrimeType,

    #[error("Please specify the crime type when selecting 'Other'.")]
    MissingOtherType,

    #[error("Description cannot exceed 300 characters.")]
    DescriptionTooLong,

    #[error("A location is required to submit a report.")]
    MissingLocation,

    #[error("Location coordinates are out of range.")]
    InvalidLocation,
}

impl ValidationError {
    /// Stable reason code returned to clients
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingCrimeType => "MissingCrimeType",
            ValidationError::UnknownCrimeType => "UnknownCrimeType",
            ValidationError::MissingOtherType => "MissingOtherType",
            ValidationError::DescriptionTooLong => "DescriptionTooLong",
            ValidationError::MissingLocation => "MissingLocation",
            ValidationError::InvalidLocation => "InvalidLocation",
        }
    }
}

/// Gate in front of the report store.
///
/// Rules run in order and the first failure wins: crime type present,
/// crime type recognized, subtype present for `Other`, description length,
/// location present and in range.
pub struct IngestionValidator;

impl IngestionValidator {
    pub fn validate(
        candidate: &ReportCandidate,
        accepted_at: DateTime<Utc>,
    ) -> Result<CreateReport, ValidationError> {
        let raw_type = candidate.crime_type.trim();
        if raw_type.is_empty() {
            return Err(ValidationError::MissingCrimeType);
        }

        let crime_type = CrimeType::parse(raw_type).ok_or(ValidationError::UnknownCrimeType)?;

        let other_type = match crime_type {
            CrimeType::Other => {
                let subtype = candidate
                    .other_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or(ValidationError::MissingOtherType)?;
                Some(subtype.to_string())
            }
            _ => None,
        };

        let description = match candidate.description.as_deref().map(str::trim) {
            Some(d) if d.chars().count() > MAX_DESCRIPTION_LENGTH => {
                return Err(ValidationError::DescriptionTooLong)
            }
            Some(d) if !d.is_empty() => Some(d.to_string()),
            _ => None,
        };

        let location = candidate.location.ok_or(ValidationError::MissingLocation)?;
        if !location.is_valid() {
            return Err(ValidationError::InvalidLocation);
        }

        Ok(CreateReport {
            crime_type,
            other_type,
            description,
            location,
            created_at: accepted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reports::models::GeoPoint;
    use crate::shared::test_helpers::candidate;

    fn validate(c: &ReportCandidate) -> Result<CreateReport, ValidationError> {
        IngestionValidator::validate(c, Utc::now())
    }

    #[test]
    fn test_accepts_valid_report() {
        let accepted_at = Utc::now();
        let mut c = candidate("Theft", 53.3498, -6.2603);
        c.description = Some("Phone snatched near the shop entrance.".to_string());

        let report = IngestionValidator::validate(&c, accepted_at).unwrap();
        assert_eq!(report.crime_type, CrimeType::Theft);
        assert_eq!(
            report.description.as_deref(),
            Some("Phone snatched near the shop entrance.")
        );
        assert_eq!(report.location, GeoPoint { lat: 53.3498, lng: -6.2603 });
        assert_eq!(report.created_at, accepted_at);
        assert_eq!(report.other_type, None);
    }

    #[test]
    fn test_empty_crime_type() {
        assert_eq!(
            validate(&candidate("", 0.0, 0.0)),
            Err(ValidationError::MissingCrimeType)
        );
        assert_eq!(
            validate(&candidate("   ", 0.0, 0.0)),
            Err(ValidationError::MissingCrimeType)
        );
    }

    #[test]
    fn test_unrecognized_crime_type() {
        assert_eq!(
            validate(&candidate("Jaywalking", 0.0, 0.0)),
            Err(ValidationError::UnknownCrimeType)
        );
    }

    #[test]
    fn test_other_requires_subtype() {
        let mut c = candidate("Other", 0.0, 0.0);
        assert_eq!(validate(&c), Err(ValidationError::MissingOtherType));

        c.other_type = Some("".to_string());
        assert_eq!(validate(&c), Err(ValidationError::MissingOtherType));

        c.other_type = Some("  Car break-in ".to_string());
        let report = validate(&c).unwrap();
        assert_eq!(report.crime_type, CrimeType::Other);
        assert_eq!(report.other_type.as_deref(), Some("Car break-in"));
    }

    #[test]
    fn test_subtype_discarded_for_recognized_category() {
        let mut c = candidate("Assault", 0.0, 0.0);
        c.other_type = Some("leftover".to_string());
        assert_eq!(validate(&c).unwrap().other_type, None);
    }

    #[test]
    fn test_description_length_limit() {
        let mut c = candidate("Theft", 0.0, 0.0);

        c.description = Some("a".repeat(301));
        assert_eq!(validate(&c), Err(ValidationError::DescriptionTooLong));

        c.description = Some("a".repeat(300));
        assert!(validate(&c).is_ok());

        // Measured after trimming
        c.description = Some(format!("  {}  ", "a".repeat(300)));
        assert!(validate(&c).is_ok());

        // Characters, not bytes
        c.description = Some("é".repeat(300));
        assert!(validate(&c).is_ok());
    }

    #[test]
    fn test_blank_description_is_dropped() {
        let mut c = candidate("Theft", 0.0, 0.0);
        c.description = Some("   ".to_string());
        assert_eq!(validate(&c).unwrap().description, None);
    }

    #[test]
    fn test_location_rules() {
        let mut c = candidate("Theft", 0.0, 0.0);
        c.location = None;
        assert_eq!(validate(&c), Err(ValidationError::MissingLocation));

        assert_eq!(
            validate(&candidate("Theft", 91.0, 0.0)),
            Err(ValidationError::InvalidLocation)
        );
        assert_eq!(
            validate(&candidate("Theft", 0.0, -180.01)),
            Err(ValidationError::InvalidLocation)
        );
        assert_eq!(
            validate(&candidate("Theft", f64::NAN, 0.0)),
            Err(ValidationError::InvalidLocation)
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let c = ReportCandidate {
            crime_type: "Other".to_string(),
            other_type: None,
            description: Some("a".repeat(400)),
            location: None,
        };
        assert_eq!(validate(&c), Err(ValidationError::MissingOtherType));

        let c = ReportCandidate {
            crime_type: "Theft".to_string(),
            other_type: None,
            description: Some("a".repeat(400)),
            location: None,
        };
        assert_eq!(validate(&c), Err(ValidationError::DescriptionTooLong));
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ValidationError::MissingCrimeType.code(), "MissingCrimeType");
        assert_eq!(ValidationError::InvalidLocation.code(), "InvalidLocation");
    }
}
