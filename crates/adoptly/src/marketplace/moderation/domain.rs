use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::reviews::ReviewId;
use crate::marketplace::users::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub String);

impl ReportId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `pending → reviewed → resolved | dismissed`, with `pending` allowed to close directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
            ReportStatus::Dismissed => "dismissed",
        }
    }

    pub const fn is_open(self) -> bool {
        matches!(self, ReportStatus::Pending | ReportStatus::Reviewed)
    }

    pub const fn can_become(self, next: ReportStatus) -> bool {
        matches!(
            (self, next),
            (
                ReportStatus::Pending,
                ReportStatus::Reviewed | ReportStatus::Resolved | ReportStatus::Dismissed
            ) | (
                ReportStatus::Reviewed,
                ReportStatus::Resolved | ReportStatus::Dismissed
            )
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    User,
    Review,
}

/// What a report points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReportTarget {
    User {
        #[serde(rename = "reportedUserId")]
        user_id: UserId,
    },
    Review {
        #[serde(rename = "reviewId")]
        review_id: ReviewId,
    },
}

impl ReportTarget {
    pub fn kind(&self) -> ReportKind {
        match self {
            ReportTarget::User { .. } => ReportKind::User,
            ReportTarget::Review { .. } => ReportKind::Review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub reporter_id: UserId,
    #[serde(flatten)]
    pub target: ReportTarget,
    pub reason: String,
    pub details: String,
    pub status: ReportStatus,
    pub resolution_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Report {
    /// Same reporter and target while still open.
    pub fn duplicates(&self, other: &Report) -> bool {
        self.status.is_open()
            && self.reporter_id == other.reporter_id
            && self.target == other.target
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserReport {
    pub reported_user_id: UserId,
    pub reason: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReviewReport {
    pub review_id: ReviewId,
    pub reason: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportDecision {
    pub status: ReportStatus,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub kind: Option<ReportKind>,
    pub status: Option<ReportStatus>,
}

impl ReportFilter {
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(kind) = self.kind {
            if report.target.kind() != kind {
                return false;
            }
        }
        match self.status {
            Some(status) => report.status == status,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BanRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuspendRequest {
    pub days: u32,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total: usize,
    pub admins: usize,
    pub banned: usize,
    pub suspended: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PetCounts {
    pub total: usize,
    pub available: usize,
    pub pending: usize,
    pub adopted: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCounts {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReportCounts {
    pub users: usize,
    pub reviews: usize,
}

/// Counters shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub users: UserCounts,
    pub pets: PetCounts,
    pub adoptions: RequestCounts,
    pub reviews: usize,
    pub open_reports: OpenReportCounts,
}
