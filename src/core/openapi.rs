use utoipa::{Modify, OpenApi};

use crate::features::reports::{
    dtos as reports_dtos, handlers as reports_handlers, models as reports_models,
};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        reports_handlers::report_handler::submit_report,
        reports_handlers::report_handler::list_reports,
        reports_handlers::report_handler::nearby_reports,
        reports_handlers::report_handler::get_report,
        reports_handlers::report_handler::list_crime_types,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Reports
            reports_models::CrimeType,
            reports_models::GeoPoint,
            reports_dtos::LocationDto,
            reports_dtos::SubmitReportDto,
            reports_dtos::ReportResponseDto,
            reports_dtos::CrimeTypeDto,
            ApiResponse<reports_dtos::ReportResponseDto>,
            ApiResponse<Vec<reports_dtos::ReportResponseDto>>,
            ApiResponse<Vec<reports_dtos::CrimeTypeDto>>,
        )
    ),
    tags(
        (name = "reports", description = "Crime report submission and nearby search"),
    ),
    info(
        title = "Crimewatch API",
        version = "0.1.0",
        description = "Crime report ingestion and nearby search",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_report_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/reports",
            "/api/reports/nearby",
            "/api/reports/{id}",
            "/api/crime-types",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_submit_rejection_lists_every_reason_code() {
        use crate::features::reports::services::ValidationError;
        use utoipa::openapi::RefOr;

        let doc = ApiDoc::openapi();
        let submit = doc.paths.paths["/api/reports"].post.as_ref().unwrap();
        let description = match &submit.responses.responses["400"] {
            RefOr::T(response) => response.description.clone(),
            RefOr::Ref(_) => panic!("400 response should be inline"),
        };

        for reason in [
            ValidationError::MissingCrimeType,
            ValidationError::UnknownCrimeType,
            ValidationError::MissingOtherType,
            ValidationError::DescriptionTooLong,
            ValidationError::MissingLocation,
            ValidationError::InvalidLocation,
        ] {
            assert!(description.contains(reason.code()), "missing {}", reason.code());
        }
    }

    #[test]
    fn test_info_modifier_overrides_title() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Staging".to_string(),
            version: "9.9.9".to_string(),
            description: "staging build".to_string(),
        }
        .modify(&mut doc);
        assert_eq!(doc.info.title, "Staging");
        assert_eq!(doc.info.version, "9.9.9");
    }
}
