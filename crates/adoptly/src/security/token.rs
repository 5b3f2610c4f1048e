//! Compact HMAC-SHA256 signed access tokens: `base64url(claims).base64url(signature)`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::marketplace::users::{Role, UserId};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    /// Expiry as unix seconds.
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("access token is malformed")]
    Malformed,
    #[error("access token signature is invalid")]
    BadSignature,
    #[error("access token has expired")]
    Expired,
    #[error("signing key rejected")]
    InvalidKey,
    #[error("failed to encode access token claims: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        user: &UserId,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.clone(),
            role,
            exp: expires_at.timestamp(),
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.mac(payload.as_bytes())?.finalize().into_bytes();
        let signature = URL_SAFE_NO_PAD.encode(signature);

        Ok(IssuedToken {
            token: format!("{payload}.{signature}"),
            expires_at,
        })
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let (payload, signature) = token.trim().split_once('.').ok_or(TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        self.mac(payload.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let raw = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims = serde_json::from_slice(&raw).map_err(|_| TokenError::Malformed)?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or(TokenError::Malformed)?;
        if expires_at <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256, TokenError> {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|_| TokenError::InvalidKey)?;
        mac.update(payload);
        Ok(mac)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret-that-is-long-enough-for-hmac", 60)
    }

    #[test]
    fn issued_tokens_verify_until_expiry() {
        let now = Utc::now();
        let user = UserId("u1".to_string());
        let issued = signer().issue(&user, Role::Adopter, now).expect("issue");

        let claims = signer().verify(&issued.token, now).expect("verify");
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Adopter);

        let later = now + Duration::minutes(61);
        assert!(matches!(
            signer().verify(&issued.token, later),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let now = Utc::now();
        let issued = signer()
            .issue(&UserId("u1".to_string()), Role::Adopter, now)
            .expect("issue");
        let (_, signature) = issued.token.split_once('.').expect("two parts");

        let forged_claims = Claims {
            sub: UserId("u1".to_string()),
            role: Role::Admin,
            exp: (now + Duration::minutes(30)).timestamp(),
        };
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).expect("encode"));
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(
            signer().verify(&forged, now),
            Err(TokenError::BadSignature)
        ));
        assert!(matches!(
            signer().verify("no-dot-here", now),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let now = Utc::now();
        let other = TokenSigner::new("a-completely-different-secret-value!!", 60);
        let issued = other
            .issue(&UserId("u1".to_string()), Role::Admin, now)
            .expect("issue");
        assert!(matches!(
            signer().verify(&issued.token, now),
            Err(TokenError::BadSignature)
        ));
    }
}
