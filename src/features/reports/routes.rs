use std::sync::Arc;

use axum::{routing::get, Router};

use crate::features::reports::handlers::{self, ReportState};
use crate::features::reports::services::ReportService;

/// Create routes for the reports feature
pub fn routes(report_service: Arc<ReportService>) -> Router {
    let state = ReportState { report_service };

    Router::new()
        .route(
            "/api/reports",
            get(handlers::list_reports).post(handlers::submit_report),
        )
        .route("/api/reports/nearby", get(handlers::nearby_reports))
        .route("/api/reports/{id}", get(handlers::get_report))
        .route("/api/crime-types", get(handlers::list_crime_types))
        .with_state(state)
}
