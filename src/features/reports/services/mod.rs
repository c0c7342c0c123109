mod ingestion_validator;
mod report_service;
mod report_store;
mod spatial_index;

pub use ingestion_validator::ValidationError;
pub use report_service::ReportService;
pub use report_store::ReportStore;
pub use spatial_index::SpatialIndex;

#[cfg(test)]
pub use spatial_index::haversine_distance;
