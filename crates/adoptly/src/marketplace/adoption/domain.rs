use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::marketplace::pets::{AdoptionStatus, PetId};
use crate::marketplace::users::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a single adoption request. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Pet status that mirrors a request settling into `self`.
    pub const fn pet_status(self) -> AdoptionStatus {
        match self {
            RequestStatus::Pending => AdoptionStatus::Pending,
            RequestStatus::Approved => AdoptionStatus::Adopted,
            RequestStatus::Rejected => AdoptionStatus::Available,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdoptionRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub pet_id: PetId,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdoptionRequest {
    pub pet_id: PetId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Owner decision payload. Kept as free text so unknown values surface as a 400.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

#[derive(Debug, Clone, Default)]
pub struct AdoptionFilter {
    pub requester: Option<UserId>,
    pub pet: Option<PetId>,
    /// Restricts results to requests on pets owned by this user.
    pub pet_owner: Option<UserId>,
    pub status: Option<RequestStatus>,
}

impl AdoptionFilter {
    /// Matches everything except the `pet_owner` clause, which needs the pet document.
    pub fn matches(&self, request: &AdoptionRequest) -> bool {
        if let Some(requester) = &self.requester {
            if &request.requester_id != requester {
                return false;
            }
        }
        if let Some(pet) = &self.pet {
            if &request.pet_id != pet {
                return false;
            }
        }
        match self.status {
            Some(status) => request.status == status,
            None => true,
        }
    }
}

/// Expected and target pet status for a guarded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PetTransition {
    pub pet_id: PetId,
    pub from: AdoptionStatus,
    pub to: AdoptionStatus,
}

impl PetTransition {
    pub fn new(pet_id: PetId, from: AdoptionStatus, to: AdoptionStatus) -> Self {
        Self { pet_id, from, to }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_is_case_insensitive() {
        assert_eq!(RequestStatus::parse(" Approved "), Some(RequestStatus::Approved));
        assert_eq!(RequestStatus::parse("rejected"), Some(RequestStatus::Rejected));
        assert_eq!(RequestStatus::parse("adopted"), None);
    }

    #[test]
    fn settled_statuses_mirror_onto_pets() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert_eq!(RequestStatus::Approved.pet_status(), AdoptionStatus::Adopted);
        assert_eq!(RequestStatus::Rejected.pet_status(), AdoptionStatus::Available);
    }
}
