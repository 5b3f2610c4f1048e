use chrono::{DateTime, Utc};

use crate::store::{Page, Paged, RepositoryError};

use super::domain::{DashboardCounts, Report, ReportFilter, ReportId, ReportStatus};

/// Storage abstraction for user and review reports plus the dashboard aggregates.
pub trait ReportRepository: Send + Sync {
    /// `Conflict` when the reporter already has an open report on the same target.
    fn insert_report(&self, report: Report) -> Result<Report, RepositoryError>;
    fn fetch_report(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError>;
    /// Replace a report whose stored status is still `expected`.
    fn update_report(
        &self,
        report: Report,
        expected: ReportStatus,
    ) -> Result<Report, RepositoryError>;
    /// Newest reports first.
    fn query_reports(
        &self,
        filter: &ReportFilter,
        page: Page,
    ) -> Result<Paged<Report>, RepositoryError>;
    fn dashboard_counts(&self, now: DateTime<Utc>) -> Result<DashboardCounts, RepositoryError>;
}
