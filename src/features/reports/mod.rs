pub mod dtos;
pub mod fixtures;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod workers;

pub use services::{ReportService, ReportStore, SpatialIndex};
pub use workers::IndexReconciler;
