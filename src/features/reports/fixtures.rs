//! Sample incidents for an empty store (Dublin city centre)

use crate::core::error::Result;
use crate::features::reports::models::{GeoPoint, ReportCandidate, ReportFilter};
use crate::features::reports::services::ReportService;

const SAMPLE_REPORTS: [(&str, &str, f64, f64); 3] = [
    ("Theft", "Phone snatched near the shop entrance.", 53.3498, -6.2603),
    ("Vandalism", "Graffiti on the wall beside the bus stop.", 53.3479, -6.2591),
    ("Harassment", "Reported harassment outside a bar.", 53.3466, -6.2582),
];

/// Submit the sample incidents through the normal ingestion path when the
/// store holds no reports. Returns the number of reports created.
pub async fn seed_if_empty(service: &ReportService) -> Result<usize> {
    let existing = service
        .list_reports(&ReportFilter {
            limit: Some(1),
            ..Default::default()
        })
        .await?;

    if !existing.is_empty() {
        tracing::info!("Store already holds reports, skipping sample fixtures");
        return Ok(0);
    }

    for (crime_type, description, lat, lng) in SAMPLE_REPORTS {
        service
            .submit_report(ReportCandidate {
                crime_type: crime_type.to_string(),
                other_type: None,
                description: Some(description.to_string()),
                location: Some(GeoPoint { lat, lng }),
            })
            .await?;
    }

    tracing::info!("Seeded {} sample reports", SAMPLE_REPORTS.len());
    Ok(SAMPLE_REPORTS.len())
}
