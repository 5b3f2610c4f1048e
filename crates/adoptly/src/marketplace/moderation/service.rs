use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::marketplace::pets::{Pet, PetId, PetRepository};
use crate::marketplace::reviews::{Review, ReviewId, ReviewRepository};
use crate::marketplace::users::{
    AccountChange, User, UserFilter, UserId, UserProfile, UserRepository,
};
use crate::store::{Page, Paged, RepositoryError};

use super::domain::{
    BanRequest, DashboardCounts, NewReviewReport, NewUserReport, Report, ReportDecision,
    ReportFilter, ReportId, ReportStatus, ReportTarget, SuspendRequest,
};
use super::repository::ReportRepository;

const MAX_REASON_LENGTH: usize = 100;
const MAX_DETAILS_LENGTH: usize = 1000;
const SUSPENSION_DAYS: std::ops::RangeInclusive<u32> = 1..=365;

/// Reports raised by users plus the admin tooling that acts on them.
pub struct ModerationService<R> {
    repository: Arc<R>,
}

impl<R> ModerationService<R>
where
    R: ReportRepository + UserRepository + ReviewRepository + PetRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn report_user(
        &self,
        reporter: &UserId,
        report: NewUserReport,
        now: DateTime<Utc>,
    ) -> Result<Report, ModerationServiceError> {
        if &report.reported_user_id == reporter {
            return Err(ModerationServiceError::Invalid(
                "you cannot report yourself".to_string(),
            ));
        }
        if self.repository.fetch_user(&report.reported_user_id)?.is_none() {
            return Err(ModerationServiceError::UserNotFound);
        }
        let target = ReportTarget::User {
            user_id: report.reported_user_id,
        };
        self.file(reporter, target, &report.reason, report.details.as_deref(), now)
    }

    pub fn report_review(
        &self,
        reporter: &UserId,
        report: NewReviewReport,
        now: DateTime<Utc>,
    ) -> Result<Report, ModerationServiceError> {
        let review = self
            .repository
            .fetch_review(&report.review_id)?
            .ok_or(ModerationServiceError::ReviewNotFound)?;
        if &review.author_id == reporter {
            return Err(ModerationServiceError::Invalid(
                "you cannot report your own review".to_string(),
            ));
        }
        let target = ReportTarget::Review {
            review_id: review.id,
        };
        self.file(reporter, target, &report.reason, report.details.as_deref(), now)
    }

    fn file(
        &self,
        reporter: &UserId,
        target: ReportTarget,
        reason: &str,
        details: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Report, ModerationServiceError> {
        let reason = reason.trim();
        if reason.is_empty() || reason.chars().count() > MAX_REASON_LENGTH {
            return Err(ModerationServiceError::Invalid(format!(
                "reason must be between 1 and {MAX_REASON_LENGTH} characters"
            )));
        }
        let details = bounded_note("details", details.unwrap_or(""))?;

        let report = Report {
            id: ReportId::generate(),
            reporter_id: reporter.clone(),
            target,
            reason: reason.to_string(),
            details,
            status: ReportStatus::Pending,
            resolution_note: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        let stored = self
            .repository
            .insert_report(report)
            .map_err(|err| match err {
                RepositoryError::Conflict => ModerationServiceError::AlreadyReported,
                other => ModerationServiceError::Repository(other),
            })?;
        info!(report_id = %stored.id, reporter_id = %reporter, kind = ?stored.target.kind(), "report filed");
        Ok(stored)
    }

    pub fn list_reports(
        &self,
        filter: &ReportFilter,
        page: Page,
    ) -> Result<Paged<Report>, ModerationServiceError> {
        Ok(self.repository.query_reports(filter, page)?)
    }

    pub fn decide_report(
        &self,
        admin: &User,
        id: &ReportId,
        decision: ReportDecision,
        now: DateTime<Utc>,
    ) -> Result<Report, ModerationServiceError> {
        let mut report = self
            .repository
            .fetch_report(id)?
            .ok_or(ModerationServiceError::ReportNotFound)?;
        let current = report.status;
        if !current.can_become(decision.status) {
            return Err(ModerationServiceError::InvalidTransition {
                from: current,
                to: decision.status,
            });
        }

        report.status = decision.status;
        if let Some(note) = decision.note {
            report.resolution_note = Some(bounded_note("note", &note)?);
        }
        report.updated_at = now;
        if !decision.status.is_open() {
            report.resolved_at = Some(now);
        }

        let stored = self
            .repository
            .update_report(report, current)
            .map_err(|err| match err {
                RepositoryError::Stale => {
                    warn!(report_id = %id, "report decided concurrently");
                    ModerationServiceError::Concurrent
                }
                RepositoryError::NotFound => ModerationServiceError::ReportNotFound,
                other => ModerationServiceError::Repository(other),
            })?;
        info!(report_id = %id, admin_id = %admin.id, status = %stored.status, "report updated");
        Ok(stored)
    }

    pub fn ban(
        &self,
        admin: &User,
        target: &UserId,
        request: BanRequest,
        now: DateTime<Utc>,
    ) -> Result<User, ModerationServiceError> {
        self.ensure_moderatable(admin, target)?;
        let reason = request
            .reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());
        let stored = self.apply(target, AccountChange::Ban { reason }, now)?;
        info!(user_id = %target, admin_id = %admin.id, "user banned");
        Ok(stored)
    }

    pub fn unban(
        &self,
        admin: &User,
        target: &UserId,
        now: DateTime<Utc>,
    ) -> Result<User, ModerationServiceError> {
        self.ensure_moderatable(admin, target)?;
        let stored = self.apply(target, AccountChange::Unban, now)?;
        info!(user_id = %target, admin_id = %admin.id, "user unbanned");
        Ok(stored)
    }

    pub fn suspend(
        &self,
        admin: &User,
        target: &UserId,
        request: SuspendRequest,
        now: DateTime<Utc>,
    ) -> Result<User, ModerationServiceError> {
        if !SUSPENSION_DAYS.contains(&request.days) {
            return Err(ModerationServiceError::Invalid(
                "suspension must last between 1 and 365 days".to_string(),
            ));
        }
        self.ensure_moderatable(admin, target)?;
        let until = now + Duration::days(i64::from(request.days));
        let stored = self.apply(target, AccountChange::Suspend { until }, now)?;
        info!(
            user_id = %target,
            admin_id = %admin.id,
            %until,
            reason = request.reason.as_deref().unwrap_or(""),
            "user suspended"
        );
        Ok(stored)
    }

    /// Admin removal bypasses the adoption-state check. The pet's requests and reviews go with it
    /// and open reports on those reviews are dismissed.
    pub fn remove_pet(
        &self,
        admin: &User,
        id: &PetId,
        now: DateTime<Utc>,
    ) -> Result<Pet, ModerationServiceError> {
        let removed = self.repository.remove_pet(id, true, now).map_err(|err| match err {
            RepositoryError::NotFound => ModerationServiceError::PetNotFound,
            other => ModerationServiceError::Repository(other),
        })?;
        info!(pet_id = %id, admin_id = %admin.id, "pet removed by admin");
        Ok(removed)
    }

    pub fn remove_review(
        &self,
        admin: &User,
        id: &ReviewId,
        now: DateTime<Utc>,
    ) -> Result<Review, ModerationServiceError> {
        let removed = self.repository.delete_review(id, now).map_err(|err| match err {
            RepositoryError::NotFound => ModerationServiceError::ReviewNotFound,
            other => ModerationServiceError::Repository(other),
        })?;
        info!(review_id = %id, admin_id = %admin.id, "review removed by admin");
        Ok(removed)
    }

    pub fn dashboard(&self, now: DateTime<Utc>) -> Result<DashboardCounts, ModerationServiceError> {
        Ok(self.repository.dashboard_counts(now)?)
    }

    pub fn list_users(
        &self,
        filter: &UserFilter,
        page: Page,
    ) -> Result<Paged<UserProfile>, ModerationServiceError> {
        Ok(self
            .repository
            .query_users(filter, page)?
            .map(|user| user.profile()))
    }

    fn apply(
        &self,
        target: &UserId,
        change: AccountChange,
        now: DateTime<Utc>,
    ) -> Result<User, ModerationServiceError> {
        self.repository
            .apply_user_change(target, change, now)
            .map_err(|err| match err {
                RepositoryError::NotFound => ModerationServiceError::UserNotFound,
                other => ModerationServiceError::Repository(other),
            })
    }

    /// Admins act on regular accounts only, and never on themselves.
    fn ensure_moderatable(
        &self,
        admin: &User,
        target: &UserId,
    ) -> Result<(), ModerationServiceError> {
        if &admin.id == target {
            return Err(ModerationServiceError::Invalid(
                "you cannot moderate your own account".to_string(),
            ));
        }
        let user = self
            .repository
            .fetch_user(target)?
            .ok_or(ModerationServiceError::UserNotFound)?;
        if user.is_admin() {
            return Err(ModerationServiceError::ProtectedAccount);
        }
        Ok(())
    }
}

fn bounded_note(field: &str, raw: &str) -> Result<String, ModerationServiceError> {
    let note = raw.trim();
    if note.chars().count() > MAX_DETAILS_LENGTH {
        return Err(ModerationServiceError::Invalid(format!(
            "{field} must be at most {MAX_DETAILS_LENGTH} characters"
        )));
    }
    Ok(note.to_string())
}

/// Error raised by the moderation service.
#[derive(Debug, thiserror::Error)]
pub enum ModerationServiceError {
    #[error("{0}")]
    Invalid(String),
    #[error("user not found")]
    UserNotFound,
    #[error("review not found")]
    ReviewNotFound,
    #[error("pet not found")]
    PetNotFound,
    #[error("report not found")]
    ReportNotFound,
    #[error("you already have an open report on this target")]
    AlreadyReported,
    #[error("report cannot move from {from} to {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },
    #[error("admin accounts cannot be moderated")]
    ProtectedAccount,
    #[error("report was updated concurrently, retry")]
    Concurrent,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
