//! Accounts: registration, login, password management, and profiles.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{
    AccountChange, AccountStanding, Credentials, PasswordChange, PasswordReset, ProfileUpdate,
    PublicProfile, Registration, ResetRequest, Role, User, UserFilter, UserId, UserProfile,
};
pub use repository::UserRepository;
pub use service::{UserService, UserServiceError};
