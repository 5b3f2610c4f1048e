use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::marketplace::adoption::{
    AdoptionFilter, AdoptionRepository, AdoptionRequest, PetTransition, RequestId, RequestStatus,
};
use crate::marketplace::messages::{Message, MessageId, MessageRemoval, MessageRepository};
use crate::marketplace::moderation::{
    DashboardCounts, OpenReportCounts, PetCounts, Report, ReportFilter, ReportId, ReportKind,
    ReportRepository, ReportStatus, ReportTarget, RequestCounts, UserCounts,
};
use crate::marketplace::pets::{AdoptionStatus, Pet, PetFilter, PetId, PetRepository};
use crate::marketplace::reviews::{Review, ReviewId, ReviewRepository, ReviewSummary};
use crate::marketplace::users::{
    AccountChange, AccountStanding, User, UserFilter, UserId, UserRepository,
};

use super::{Page, Paged, RepositoryError};

const REVIEW_REMOVED_NOTE: &str = "review was removed";

/// In-process document store. Every collection sits behind one lock so multi-document writes
/// (request + pet, review uniqueness, report uniqueness) are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

/// Documents are kept in insertion order.
#[derive(Debug, Default)]
struct Collections {
    users: Vec<User>,
    pets: Vec<Pet>,
    requests: Vec<AdoptionRequest>,
    messages: Vec<Message>,
    reviews: Vec<Review>,
    reports: Vec<Report>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, RepositoryError> {
        self.collections
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }
}

impl Collections {
    fn pet_mut(&mut self, id: &PetId) -> Option<&mut Pet> {
        self.pets.iter_mut().find(|pet| &pet.id == id)
    }

    fn request_position(&self, id: &RequestId) -> Option<usize> {
        self.requests.iter().position(|request| &request.id == id)
    }

    /// Check the pet guard and return its index without mutating anything.
    fn guard_pet(&self, transition: &PetTransition) -> Result<usize, RepositoryError> {
        let index = self
            .pets
            .iter()
            .position(|pet| pet.id == transition.pet_id)
            .ok_or(RepositoryError::NotFound)?;
        if self.pets[index].adoption_status != transition.from {
            return Err(RepositoryError::Stale);
        }
        Ok(index)
    }

    /// Open reports against reviews that no longer exist are closed as dismissed.
    fn dismiss_review_reports(&mut self, removed: &[ReviewId], now: DateTime<Utc>) {
        for report in self.reports.iter_mut().filter(|report| report.status.is_open()) {
            let ReportTarget::Review { review_id } = &report.target else {
                continue;
            };
            if !removed.contains(review_id) {
                continue;
            }
            report.status = ReportStatus::Dismissed;
            report.resolution_note = Some(REVIEW_REMOVED_NOTE.to_string());
            report.updated_at = now;
            report.resolved_at = Some(now);
        }
    }

    fn owner_of(&self, pet: &PetId) -> Option<&UserId> {
        self.pets
            .iter()
            .find(|candidate| &candidate.id == pet)
            .map(|candidate| &candidate.owner_id)
    }
}

impl UserRepository for MemoryStore {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut collections = self.lock()?;
        let taken = collections.users.iter().any(|existing| {
            existing.username.eq_ignore_ascii_case(&user.username)
                || existing.email == user.email
                || existing.id == user.id
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        collections.users.push(user.clone());
        Ok(user)
    }

    fn apply_user_change(
        &self,
        id: &UserId,
        change: AccountChange,
        now: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut collections = self.lock()?;
        if let Some(email) = change.new_email() {
            if collections
                .users
                .iter()
                .any(|existing| &existing.id != id && existing.email == email)
            {
                return Err(RepositoryError::Conflict);
            }
        }
        let slot = collections
            .users
            .iter_mut()
            .find(|existing| &existing.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if !change.apply(slot, now) {
            return Err(RepositoryError::Stale);
        }
        Ok(slot.clone())
    }

    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections.users.iter().find(|user| &user.id == id).cloned())
    }

    fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>, RepositoryError> {
        let identifier = identifier.trim();
        let collections = self.lock()?;
        Ok(collections
            .users
            .iter()
            .find(|user| {
                user.email.eq_ignore_ascii_case(identifier)
                    || user.username.eq_ignore_ascii_case(identifier)
            })
            .cloned())
    }

    fn find_user_by_reset_digest(&self, digest: &str) -> Result<Option<User>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .users
            .iter()
            .find(|user| user.reset_digest.as_deref() == Some(digest))
            .cloned())
    }

    fn query_users(&self, filter: &UserFilter, page: Page) -> Result<Paged<User>, RepositoryError> {
        let collections = self.lock()?;
        Ok(page.slice(
            collections
                .users
                .iter()
                .rev()
                .filter(|user| filter.matches(user))
                .cloned(),
        ))
    }
}

impl PetRepository for MemoryStore {
    fn insert_pet(&self, pet: Pet) -> Result<Pet, RepositoryError> {
        let mut collections = self.lock()?;
        if collections.pets.iter().any(|existing| existing.id == pet.id) {
            return Err(RepositoryError::Conflict);
        }
        collections.pets.push(pet.clone());
        Ok(pet)
    }

    fn fetch_pet(&self, id: &PetId) -> Result<Option<Pet>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections.pets.iter().find(|pet| &pet.id == id).cloned())
    }

    fn update_pet_details(&self, mut pet: Pet) -> Result<Pet, RepositoryError> {
        let mut collections = self.lock()?;
        let slot = collections
            .pet_mut(&pet.id)
            .ok_or(RepositoryError::NotFound)?;
        pet.adoption_status = slot.adoption_status;
        *slot = pet.clone();
        Ok(pet)
    }

    fn remove_pet(
        &self,
        id: &PetId,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<Pet, RepositoryError> {
        let mut collections = self.lock()?;
        let index = collections
            .pets
            .iter()
            .position(|pet| &pet.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if !force && collections.pets[index].adoption_status != AdoptionStatus::Available {
            return Err(RepositoryError::Stale);
        }
        let removed = collections.pets.remove(index);
        collections.requests.retain(|request| &request.pet_id != id);
        let orphaned: Vec<ReviewId> = collections
            .reviews
            .iter()
            .filter(|review| &review.pet_id == id)
            .map(|review| review.id.clone())
            .collect();
        collections.reviews.retain(|review| &review.pet_id != id);
        collections.dismiss_review_reports(&orphaned, now);
        Ok(removed)
    }

    fn search_pets(&self, filter: &PetFilter, page: Page) -> Result<Paged<Pet>, RepositoryError> {
        let collections = self.lock()?;
        Ok(page.slice(
            collections
                .pets
                .iter()
                .rev()
                .filter(|pet| filter.matches(pet))
                .cloned(),
        ))
    }
}

impl AdoptionRepository for MemoryStore {
    fn fetch_request(&self, id: &RequestId) -> Result<Option<AdoptionRequest>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .requests
            .iter()
            .find(|request| &request.id == id)
            .cloned())
    }

    fn find_request(
        &self,
        requester: &UserId,
        pet: &PetId,
    ) -> Result<Option<AdoptionRequest>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .requests
            .iter()
            .find(|request| &request.requester_id == requester && &request.pet_id == pet)
            .cloned())
    }

    fn query_requests(
        &self,
        filter: &AdoptionFilter,
        page: Page,
    ) -> Result<Paged<AdoptionRequest>, RepositoryError> {
        let collections = self.lock()?;
        let owned_by = |request: &AdoptionRequest| match &filter.pet_owner {
            Some(owner) => collections.owner_of(&request.pet_id) == Some(owner),
            None => true,
        };
        Ok(page.slice(
            collections
                .requests
                .iter()
                .rev()
                .filter(|request| filter.matches(request) && owned_by(*request))
                .cloned(),
        ))
    }

    fn open_request(
        &self,
        request: AdoptionRequest,
        pet: PetTransition,
    ) -> Result<AdoptionRequest, RepositoryError> {
        let mut collections = self.lock()?;
        if collections.requests.iter().any(|existing| {
            existing.requester_id == request.requester_id && existing.pet_id == request.pet_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        let index = collections.guard_pet(&pet)?;
        collections.pets[index].adoption_status = pet.to;
        collections.pets[index].updated_at = request.requested_at;
        collections.requests.push(request.clone());
        Ok(request)
    }

    fn settle_request(
        &self,
        request: AdoptionRequest,
        expected: RequestStatus,
        pet: PetTransition,
    ) -> Result<AdoptionRequest, RepositoryError> {
        let mut collections = self.lock()?;
        let position = collections
            .request_position(&request.id)
            .ok_or(RepositoryError::NotFound)?;
        if collections.requests[position].status != expected {
            return Err(RepositoryError::Stale);
        }
        let pet_index = collections.guard_pet(&pet)?;

        collections.pets[pet_index].adoption_status = pet.to;
        if let Some(decided_at) = request.decided_at {
            collections.pets[pet_index].updated_at = decided_at;
        }
        collections.requests[position] = request.clone();
        Ok(request)
    }

    fn withdraw_request(
        &self,
        id: &RequestId,
        expected: RequestStatus,
        pet: PetTransition,
        now: DateTime<Utc>,
    ) -> Result<AdoptionRequest, RepositoryError> {
        let mut collections = self.lock()?;
        let position = collections
            .request_position(id)
            .ok_or(RepositoryError::NotFound)?;
        if collections.requests[position].status != expected {
            return Err(RepositoryError::Stale);
        }
        let pet_index = collections.guard_pet(&pet)?;

        collections.pets[pet_index].adoption_status = pet.to;
        collections.pets[pet_index].updated_at = now;
        Ok(collections.requests.remove(position))
    }
}

impl MessageRepository for MemoryStore {
    fn insert_message(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut collections = self.lock()?;
        collections.messages.push(message.clone());
        Ok(message)
    }

    fn fetch_message(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .messages
            .iter()
            .find(|message| &message.id == id)
            .cloned())
    }

    fn conversation(
        &self,
        viewer: &UserId,
        other: &UserId,
        page: Page,
    ) -> Result<Paged<Message>, RepositoryError> {
        let collections = self.lock()?;
        Ok(page.slice(
            collections
                .messages
                .iter()
                .filter(|message| message.between(viewer, other) && message.visible_to(viewer))
                .cloned(),
        ))
    }

    fn mark_read(&self, receiver: &UserId, sender: &UserId) -> Result<usize, RepositoryError> {
        let mut collections = self.lock()?;
        let mut changed = 0;
        for message in collections.messages.iter_mut().filter(|message| {
            &message.receiver_id == receiver && &message.sender_id == sender && !message.read
        }) {
            message.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    fn visible_messages(&self, viewer: &UserId) -> Result<Vec<Message>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .messages
            .iter()
            .filter(|message| message.visible_to(viewer))
            .cloned()
            .collect())
    }

    fn hide_message(
        &self,
        id: &MessageId,
        user: &UserId,
    ) -> Result<MessageRemoval, RepositoryError> {
        let mut collections = self.lock()?;
        let position = collections
            .messages
            .iter()
            .position(|message| &message.id == id)
            .ok_or(RepositoryError::NotFound)?;

        let message = &mut collections.messages[position];
        if !message.deleted_for.contains(user) {
            message.deleted_for.push(user.clone());
        }
        let purge = message.deleted_for.contains(&message.sender_id)
            && message.deleted_for.contains(&message.receiver_id);
        if purge {
            collections.messages.remove(position);
            Ok(MessageRemoval::Purged)
        } else {
            Ok(MessageRemoval::Hidden)
        }
    }
}

impl ReviewRepository for MemoryStore {
    fn insert_review(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut collections = self.lock()?;
        if !collections.pets.iter().any(|pet| pet.id == review.pet_id) {
            return Err(RepositoryError::NotFound);
        }
        if collections.reviews.iter().any(|existing| {
            existing.author_id == review.author_id && existing.pet_id == review.pet_id
        }) {
            return Err(RepositoryError::Conflict);
        }
        collections.reviews.push(review.clone());
        Ok(review)
    }

    fn fetch_review(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .reviews
            .iter()
            .find(|review| &review.id == id)
            .cloned())
    }

    fn update_review(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut collections = self.lock()?;
        let slot = collections
            .reviews
            .iter_mut()
            .find(|existing| existing.id == review.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = review.clone();
        Ok(review)
    }

    fn delete_review(&self, id: &ReviewId, now: DateTime<Utc>) -> Result<Review, RepositoryError> {
        let mut collections = self.lock()?;
        let position = collections
            .reviews
            .iter()
            .position(|review| &review.id == id)
            .ok_or(RepositoryError::NotFound)?;
        let removed = collections.reviews.remove(position);
        collections.dismiss_review_reports(std::slice::from_ref(id), now);
        Ok(removed)
    }

    fn reviews_for_pet(&self, pet: &PetId, page: Page) -> Result<Paged<Review>, RepositoryError> {
        let collections = self.lock()?;
        Ok(page.slice(
            collections
                .reviews
                .iter()
                .rev()
                .filter(|review| &review.pet_id == pet)
                .cloned(),
        ))
    }

    fn review_summary(&self, pet: &PetId) -> Result<ReviewSummary, RepositoryError> {
        let collections = self.lock()?;
        Ok(ReviewSummary::from_ratings(
            collections
                .reviews
                .iter()
                .filter(|review| &review.pet_id == pet)
                .map(|review| review.rating),
        ))
    }
}

impl ReportRepository for MemoryStore {
    fn insert_report(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut collections = self.lock()?;
        if collections
            .reports
            .iter()
            .any(|existing| existing.duplicates(&report))
        {
            return Err(RepositoryError::Conflict);
        }
        collections.reports.push(report.clone());
        Ok(report)
    }

    fn fetch_report(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        let collections = self.lock()?;
        Ok(collections
            .reports
            .iter()
            .find(|report| &report.id == id)
            .cloned())
    }

    fn update_report(
        &self,
        report: Report,
        expected: ReportStatus,
    ) -> Result<Report, RepositoryError> {
        let mut collections = self.lock()?;
        let slot = collections
            .reports
            .iter_mut()
            .find(|existing| existing.id == report.id)
            .ok_or(RepositoryError::NotFound)?;
        if slot.status != expected {
            return Err(RepositoryError::Stale);
        }
        *slot = report.clone();
        Ok(report)
    }

    fn query_reports(
        &self,
        filter: &ReportFilter,
        page: Page,
    ) -> Result<Paged<Report>, RepositoryError> {
        let collections = self.lock()?;
        Ok(page.slice(
            collections
                .reports
                .iter()
                .rev()
                .filter(|report| filter.matches(report))
                .cloned(),
        ))
    }

    fn dashboard_counts(&self, now: DateTime<Utc>) -> Result<DashboardCounts, RepositoryError> {
        let collections = self.lock()?;
        let mut counts = DashboardCounts::default();

        for user in &collections.users {
            counts.users.total += 1;
            if user.is_admin() {
                counts.users.admins += 1;
            }
            match user.standing(now) {
                AccountStanding::Banned { .. } => counts.users.banned += 1,
                AccountStanding::Suspended { .. } => counts.users.suspended += 1,
                AccountStanding::Active => {}
            }
        }
        for pet in &collections.pets {
            let PetCounts {
                total,
                available,
                pending,
                adopted,
            } = &mut counts.pets;
            *total += 1;
            match pet.adoption_status {
                AdoptionStatus::Available => *available += 1,
                AdoptionStatus::Pending => *pending += 1,
                AdoptionStatus::Adopted => *adopted += 1,
            }
        }
        for request in &collections.requests {
            let RequestCounts {
                total,
                pending,
                approved,
                rejected,
            } = &mut counts.adoptions;
            *total += 1;
            match request.status {
                RequestStatus::Pending => *pending += 1,
                RequestStatus::Approved => *approved += 1,
                RequestStatus::Rejected => *rejected += 1,
            }
        }
        counts.reviews = collections.reviews.len();
        for report in collections.reports.iter().filter(|report| report.status.is_open()) {
            let OpenReportCounts { users, reviews } = &mut counts.open_reports;
            match report.target.kind() {
                ReportKind::User => *users += 1,
                ReportKind::Review => *reviews += 1,
            }
        }
        Ok(counts)
    }
}
