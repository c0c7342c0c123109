use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::models::{GeoPoint, Report, ReportCandidate, ReportFilter};
use crate::features::reports::services::ingestion_validator::{
    IngestionValidator, ValidationError,
};
use crate::features::reports::services::report_store::{sort_by_recency, ReportStore};
use crate::features::reports::services::spatial_index::{SpatialIndex, SpatialIndexEntry};

/// Submission and query entry point composing validator, store and index
pub struct ReportService {
    store: Arc<ReportStore>,
    index: Arc<SpatialIndex>,
}

impl ReportService {
    pub fn new(store: Arc<ReportStore>, index: Arc<SpatialIndex>) -> Self {
        Self { store, index }
    }

    /// Validate, persist, then index a report.
    ///
    /// The report counts as submitted once the store accepts it; an indexing
    /// failure only marks the index stale for the reconciler to repair.
    pub async fn submit_report(&self, candidate: ReportCandidate) -> Result<Report> {
        let data = IngestionValidator::validate(&candidate, Utc::now())?;
        let report = self.store.put(data).await?;

        if let Err(e) = self.index.index(report.id, report.location).await {
            tracing::warn!("Index update failed for report {}: {}", report.id, e);
            self.index.mark_stale();
        }

        tracing::info!(
            "Report submitted: id={}, crime_type={}",
            report.id,
            report.crime_type
        );

        Ok(report)
    }

    /// Reports within `radius_meters` of `center`, newest first, at most `limit`
    pub async fn nearby(
        &self,
        center: GeoPoint,
        radius_meters: f64,
        limit: usize,
    ) -> Result<Vec<Report>> {
        if !center.is_valid() {
            return Err(ValidationError::InvalidLocation.into());
        }

        let ids = self.index.query(center, radius_meters).await;
        let lookups = join_all(ids.into_iter().map(|id| self.store.get(id))).await;

        let mut reports = Vec::with_capacity(lookups.len());
        let mut orphans = 0usize;
        for lookup in lookups {
            match lookup {
                Ok(report) => reports.push(report),
                Err(AppError::NotFound(_)) => orphans += 1,
                Err(e) => return Err(e),
            }
        }

        if orphans > 0 {
            tracing::warn!(
                "Nearby query skipped {} index entries missing from the store",
                orphans
            );
            self.index.mark_stale();
        }

        sort_by_recency(&mut reports);
        reports.truncate(limit);
        Ok(reports)
    }

    pub async fn get_report(&self, id: Uuid) -> Result<Report> {
        self.store.get(id).await
    }

    pub async fn list_reports(&self, filter: &ReportFilter) -> Result<Vec<Report>> {
        self.store.list(filter).await
    }

    /// Rebuild the spatial index from a full store scan
    pub async fn rebuild_index(&self) -> Result<usize> {
        let ticket = self.index.begin_rebuild().await;

        let reports = match self.store.list(&ReportFilter::default()).await {
            Ok(reports) => reports,
            Err(e) => {
                self.index.mark_stale();
                return Err(e);
            }
        };

        let indexed = self
            .index
            .finish_rebuild(ticket, reports.iter().map(SpatialIndexEntry::from))
            .await;

        tracing::info!(
            "Spatial index rebuilt: {} entries from {} stored reports",
            indexed,
            reports.len()
        );

        Ok(indexed)
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }
}
