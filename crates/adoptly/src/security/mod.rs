//! Credential hashing, signed access tokens, reset tokens, and message encryption.

pub mod cipher;
pub mod password;
pub mod reset;
pub mod token;

pub use cipher::{CipherError, MessageCipher, SealedMessage};
pub use password::{hash_password, verify_password, PasswordError};
pub use reset::{digest_reset_token, generate_reset_token, ResetToken};
pub use token::{Claims, IssuedToken, TokenError, TokenSigner};
