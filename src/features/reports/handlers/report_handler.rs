use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppQuery};
use crate::features::reports::dtos::{
    CrimeTypeDto, ListReportsQueryParams, NearbyQueryParams, ReportResponseDto, SubmitReportDto,
};
use crate::features::reports::models::CrimeType;
use crate::features::reports::services::{ReportService, ValidationError};
use crate::shared::types::{ApiResponse, Meta};

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub report_service: Arc<ReportService>,
}

/// Submit a new crime report
#[utoipa::path(
    post,
    path = "/api/reports",
    request_body = SubmitReportDto,
    responses(
        (status = 201, description = "Report stored", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Report rejected; `errors` holds one reason code: MissingCrimeType, UnknownCrimeType, MissingOtherType, DescriptionTooLong, MissingLocation or InvalidLocation"),
        (status = 503, description = "Report storage unavailable, retry later")
    ),
    tag = "reports"
)]
pub async fn submit_report(
    State(state): State<ReportState>,
    AppJson(dto): AppJson<SubmitReportDto>,
) -> Result<(StatusCode, Json<ApiResponse<ReportResponseDto>>)> {
    let report = state.report_service.submit_report(dto.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(report.into()),
            Some("Report submitted successfully".to_string()),
            None,
        )),
    ))
}

/// List reports, most recent first
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ListReportsQueryParams),
    responses(
        (status = 200, description = "Matching reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 400, description = "Invalid filter"),
        (status = 503, description = "Report storage unavailable, retry later")
    ),
    tag = "reports"
)]
pub async fn list_reports(
    State(state): State<ReportState>,
    AppQuery(params): AppQuery<ListReportsQueryParams>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reports = state.report_service.list_reports(&params.to_filter()?).await?;
    let total = reports.len();
    let dtos: Vec<ReportResponseDto> = reports.into_iter().map(|r| r.into()).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta::total(total)),
    )))
}

/// Reports within a radius of a point, most recent first
#[utoipa::path(
    get,
    path = "/api/reports/nearby",
    params(NearbyQueryParams),
    responses(
        (status = 200, description = "Reports inside the radius", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 400, description = "Invalid query; a missing or out-of-range centre carries MissingLocation or InvalidLocation in `errors`"),
        (status = 503, description = "Report storage unavailable, retry later")
    ),
    tag = "reports"
)]
pub async fn nearby_reports(
    State(state): State<ReportState>,
    AppQuery(params): AppQuery<NearbyQueryParams>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let center = params.center().ok_or(ValidationError::MissingLocation)?;
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let reports = state
        .report_service
        .nearby(center, params.radius(), params.limit())
        .await?;
    let total = reports.len();
    let dtos: Vec<ReportResponseDto> = reports.into_iter().map(|r| r.into()).collect();
    Ok(Json(ApiResponse::success(
        Some(dtos),
        None,
        Some(Meta::total(total)),
    )))
}

/// Get report by ID
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    params(
        ("id" = Uuid, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report found", body = ApiResponse<ReportResponseDto>),
        (status = 404, description = "Report not found"),
        (status = 503, description = "Report storage unavailable, retry later")
    ),
    tag = "reports"
)]
pub async fn get_report(
    State(state): State<ReportState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.report_service.get_report(id).await?;
    Ok(Json(ApiResponse::success(Some(report.into()), None, None)))
}

/// Recognized crime categories in display order
#[utoipa::path(
    get,
    path = "/api/crime-types",
    responses(
        (status = 200, description = "Crime categories; submitting any other value is rejected with UnknownCrimeType", body = ApiResponse<Vec<CrimeTypeDto>>)
    ),
    tag = "reports"
)]
pub async fn list_crime_types() -> Json<ApiResponse<Vec<CrimeTypeDto>>> {
    let dtos: Vec<CrimeTypeDto> = CrimeType::ALL.into_iter().map(|t| t.into()).collect();
    let total = dtos.len();
    Json(ApiResponse::success(
        Some(dtos),
        Some(format!(
            "Any other crimeType is rejected with {}",
            ValidationError::UnknownCrimeType.code()
        )),
        Some(Meta::total(total)),
    ))
}

#[cfg(test)]
mod tests {
    use crate::features::reports::routes;
    use crate::shared::test_helpers::create_test_service;
    use axum_test::TestServer;
    use serde_json::{json, Value};
    use uuid::Uuid;

    async fn server() -> TestServer {
        TestServer::new(routes::routes(create_test_service().await)).unwrap()
    }

    fn dublin_theft() -> Value {
        json!({
            "crimeType": "Theft",
            "description": "Phone snatched near the shop entrance.",
            "location": { "lat": 53.3498, "lng": -6.2603 }
        })
    }

    #[tokio::test]
    async fn test_submit_returns_created_report() {
        let server = server().await;

        let response = server.post("/api/reports").json(&dublin_theft()).await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["crimeType"], "Theft");
        assert_eq!(body["data"]["location"]["lat"], 53.3498);
        assert!(Uuid::parse_str(body["data"]["id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_submit_rejection_reports_code() {
        let server = server().await;

        let response = server
            .post("/api/reports")
            .json(&json!({
                "crimeType": "Other",
                "location": { "lat": 53.3498, "lng": -6.2603 }
            }))
            .await;
        response.assert_status_bad_request();

        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["errors"], json!(["MissingOtherType"]));
    }

    #[tokio::test]
    async fn test_submit_without_location() {
        let server = server().await;

        let response = server
            .post("/api/reports")
            .json(&json!({ "crimeType": "Theft" }))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["errors"][0], "MissingLocation");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let server = server().await;

        let response = server
            .post("/api/reports")
            .content_type("application/json")
            .bytes("{\"crimeType\": ".into())
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_get_round_trip_and_not_found() {
        let server = server().await;

        let created: Value = server.post("/api/reports").json(&dublin_theft()).await.json();
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let response = server.get(&format!("/api/reports/{}", id)).await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["data"], created["data"]);

        server
            .get(&format!("/api/reports/{}", Uuid::now_v7()))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn test_nearby_excludes_distant_reports() {
        let server = server().await;
        server.post("/api/reports").json(&dublin_theft()).await;

        let near: Value = server
            .get("/api/reports/nearby")
            .add_query_param("lat", 53.3498)
            .add_query_param("lng", -6.2603)
            .add_query_param("radiusMeters", 500)
            .await
            .json();
        assert_eq!(near["meta"]["total"], 1);

        let far: Value = server
            .get("/api/reports/nearby")
            .add_query_param("lat", 0.0)
            .add_query_param("lng", 0.0)
            .add_query_param("radiusMeters", 500)
            .await
            .json();
        assert_eq!(far["meta"]["total"], 0);
    }

    #[tokio::test]
    async fn test_nearby_parameter_errors() {
        let server = server().await;

        let response = server
            .get("/api/reports/nearby")
            .add_query_param("lat", 53.3498)
            .add_query_param("lng", -6.2603)
            .add_query_param("radiusMeters", 60000)
            .await;
        response.assert_status_bad_request();

        let response = server
            .get("/api/reports/nearby")
            .add_query_param("lat", 95.0)
            .add_query_param("lng", -6.2603)
            .add_query_param("radiusMeters", 500)
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["errors"][0], "InvalidLocation");

        let response = server
            .get("/api/reports/nearby")
            .add_query_param("radiusMeters", 500)
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["errors"][0], "MissingLocation");

        let response = server
            .get("/api/reports/nearby")
            .add_query_param("lat", "abc")
            .add_query_param("lng", -6.2603)
            .add_query_param("radiusMeters", 500)
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_unknown_crime_type_is_rejected_with_code() {
        let server = server().await;

        let response = server
            .post("/api/reports")
            .json(&json!({
                "crimeType": "Jaywalking",
                "location": { "lat": 53.3498, "lng": -6.2603 }
            }))
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["errors"], json!(["UnknownCrimeType"]));
    }

    #[tokio::test]
    async fn test_list_filters_by_crime_type() {
        let server = server().await;
        server.post("/api/reports").json(&dublin_theft()).await;
        server
            .post("/api/reports")
            .json(&json!({
                "crimeType": "Vandalism",
                "location": { "lat": 53.3479, "lng": -6.2591 }
            }))
            .await;

        let all: Value = server.get("/api/reports").await.json();
        assert_eq!(all["meta"]["total"], 2);
        assert_eq!(all["data"][0]["crimeType"], "Vandalism");

        let thefts: Value = server
            .get("/api/reports")
            .add_query_param("crimeType", "theft")
            .await
            .json();
        assert_eq!(thefts["meta"]["total"], 1);
        assert_eq!(thefts["data"][0]["crimeType"], "Theft");

        server
            .get("/api/reports")
            .add_query_param("crimeType", "Jaywalking")
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn test_crime_types_in_display_order() {
        let server = server().await;
        let body: Value = server.get("/api/crime-types").await.json();

        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "Theft",
                "Assault",
                "Burglary",
                "Robbery",
                "Vandalism",
                "Harassment",
                "Other"
            ]
        );
        assert_eq!(body["data"][6]["requiresSubtype"], true);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("UnknownCrimeType"));
    }
}
