use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use jwt::{Claims, Header, RegisteredClaims, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;
use uuid::Uuid;

use crate::config::AppConfig;

pub struct JwtState {
    /// The id of the user this token authenticates.
    pub user_id: Uuid,
    /// The time the token expires.
    pub expiration: Option<DateTime<Utc>>,
    /// The time the token was issued.
    pub issued_at: DateTime<Utc>,
}

impl JwtState {
    pub fn new(user_id: Uuid, valid_for: chrono::Duration) -> Self {
        let now = Utc::now();

        Self {
            user_id,
            expiration: Some(now + valid_for),
            issued_at: now,
        }
    }

    pub fn serialize(&self, config: &AppConfig) -> Option<String> {
        let key = Hmac::<Sha256>::new_from_slice(config.jwt_secret.as_bytes()).ok()?;

        let claims = Claims::new(RegisteredClaims {
            issued_at: Some(self.issued_at.timestamp() as u64),
            expiration: self.expiration.map(|x| x.timestamp() as u64),
            issuer: Some(config.jwt_issuer.clone()),
            subject: Some(self.user_id.to_string()),
            ..Default::default()
        });

        claims.sign_with_key(&key).ok()
    }

    pub fn verify(config: &AppConfig, token: &str) -> Option<Self> {
        let key = Hmac::<Sha256>::new_from_slice(config.jwt_secret.as_bytes()).ok()?;
        let token: Token<Header, Claims, _> = token.verify_with_key(&key).ok()?;
        let claims = token.claims();

        if claims.registered.issuer.as_deref()? != config.jwt_issuer {
            return None;
        }

        let issued_at = Utc
            .timestamp_opt(claims.registered.issued_at? as i64, 0)
            .single()?;
        if issued_at > Utc::now() {
            return None;
        }

        let expiration = match claims.registered.expiration {
            Some(exp) => {
                let exp = Utc.timestamp_opt(exp as i64, 0).single()?;
                if exp < Utc::now() {
                    return None;
                }

                Some(exp)
            }
            None => None,
        };

        let user_id = claims.registered.subject.as_deref()?.parse().ok()?;

        Some(Self {
            user_id,
            expiration,
            issued_at,
        })
    }
}
