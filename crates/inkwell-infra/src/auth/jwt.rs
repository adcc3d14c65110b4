//! Session tokens as signed JWTs.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use inkwell_core::ports::AuthError;

const DEFAULT_SECRET: &str = "change-me-in-production";

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            expiration_hours: 24,
            issuer: "inkwell".to_string(),
        }
    }
}

impl JwtConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_SECRET.to_string());

        if secret == DEFAULT_SECRET {
            let is_production = std::env::var("RUST_ENV")
                .map(|v| v == "production" || v == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!(
                    "SECURITY: Using default JWT secret in production! Set JWT_SECRET environment variable."
                );
            } else {
                tracing::warn!("Using default JWT secret. Set JWT_SECRET for production use.");
            }
        }

        Self {
            secret,
            expiration_hours: std::env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "inkwell".to_string()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    jti: String,
    exp: i64,
    iat: i64,
    iss: String,
}

/// What a verified session token carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub uid: String,
    pub email: Option<String>,
    /// Session id, used for revocation.
    pub jti: String,
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens.
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl SessionTokens {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }

    pub fn issue(&self, uid: &str, email: Option<&str>) -> Result<(String, SessionClaims), AuthError> {
        let now = Utc::now();
        let exp = now + TimeDelta::hours(self.config.expiration_hours);
        let claims = Claims {
            sub: uid.to_string(),
            email: email.map(String::from),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok((
            token,
            SessionClaims {
                uid: claims.sub,
                email: claims.email,
                jti: claims.jti,
                exp: claims.exp,
            },
        ))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(SessionClaims {
            uid: data.claims.sub,
            email: data.claims.email,
            jti: data.claims.jti,
            exp: data.claims.exp,
        })
    }

    /// Lifetime of a freshly issued token.
    pub fn expires_in(&self) -> u64 {
        u64::try_from(self.config.expiration_hours * 3600).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(issuer: &str) -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key".to_string(),
            expiration_hours: 1,
            issuer: issuer.to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = SessionTokens::new(config("inkwell"));
        let (token, issued) = tokens.issue("u1", Some("ada@example.com")).unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims, issued);
        assert_eq!(claims.uid, "u1");
        assert_eq!(claims.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_every_token_gets_its_own_session_id() {
        let tokens = SessionTokens::new(config("inkwell"));
        let (_, first) = tokens.issue("u1", None).unwrap();
        let (_, second) = tokens.issue("u1", None).unwrap();
        assert_ne!(first.jti, second.jti);
    }

    #[test]
    fn test_garbage_token_is_invalid() {
        let tokens = SessionTokens::new(config("inkwell"));
        assert!(matches!(tokens.verify("invalid-token"), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_wrong_issuer_is_rejected() {
        let (token, _) = SessionTokens::new(config("one")).issue("u1", None).unwrap();
        assert!(SessionTokens::new(config("two")).verify(&token).is_err());
    }

    #[test]
    fn test_expired_token() {
        let tokens = SessionTokens::new(JwtConfig {
            expiration_hours: -2,
            ..config("inkwell")
        });
        let (token, _) = tokens.issue("u1", None).unwrap();
        assert_eq!(tokens.verify(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_expires_in() {
        let tokens = SessionTokens::new(JwtConfig {
            expiration_hours: 24,
            ..config("inkwell")
        });
        assert_eq!(tokens.expires_in(), 86400);
    }
}
