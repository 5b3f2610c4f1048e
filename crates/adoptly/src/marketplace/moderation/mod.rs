//! User and review reports, account sanctions, and the admin dashboard.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    BanRequest, DashboardCounts, NewReviewReport, NewUserReport, OpenReportCounts, PetCounts,
    Report, ReportDecision, ReportFilter, ReportId, ReportKind, ReportStatus, ReportTarget,
    RequestCounts, SuspendRequest, UserCounts,
};
pub use repository::ReportRepository;
pub use service::{ModerationService, ModerationServiceError};
