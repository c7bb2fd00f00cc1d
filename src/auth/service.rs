use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::Identity;
use crate::config::AuthConfig;
use crate::error::{AppError, AuthError};

/// Session token claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // External user id
    pub exp: i64,     // Expiration time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Verifies identity-provider session tokens. Users are never issued tokens here.
pub struct AuthService {
    key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    /// HS256 verification against a shared secret.
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn from_config(config: &AuthConfig) -> crate::Result<Self> {
        let mut service = match &config.jwt_public_key_pem {
            Some(pem) if !pem.trim().is_empty() => {
                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| AppError::ConfigError(format!("invalid auth.jwt_public_key_pem: {}", e)))?;
                Self {
                    key,
                    validation: Validation::new(Algorithm::RS256),
                }
            }
            _ => Self::new(&config.jwt_secret),
        };

        if let Some(issuer) = config.issuer.as_deref().filter(|i| !i.is_empty()) {
            service.validation.set_issuer(&[issuer]);
        }

        Ok(service)
    }

    pub fn validate_token(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }

        Ok(Identity {
            external_id: claims.sub,
            email: claims.email,
        })
    }
}
