//! JWT validation

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Claims carried by a tenant access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Tenant id.
    pub sub: String,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Verifies tenant bearer tokens.
#[derive(Clone)]
pub struct JwtManager {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtManager {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate a token and return the tenant id it identifies.
    pub fn verify_tenant(&self, token: &str) -> Result<Uuid, ApiError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token"))?;

        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("token subject is not a tenant id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    fn token_for(sub: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp: OffsetDateTime::now_utc().unix_timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_resolves_tenant() {
        let manager = JwtManager::new(SECRET);
        let tenant_id = Uuid::new_v4();
        let token = token_for(&tenant_id.to_string(), 3600);
        assert_eq!(manager.verify_tenant(&token).unwrap(), tenant_id);
    }

    #[test]
    fn expired_token_is_rejected() {
        let manager = JwtManager::new(SECRET);
        let token = token_for(&Uuid::new_v4().to_string(), -3600);
        assert!(manager.verify_tenant(&token).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let manager = JwtManager::new("another-secret-another-secret-secret");
        let token = token_for(&Uuid::new_v4().to_string(), 3600);
        assert!(manager.verify_tenant(&token).is_err());
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let manager = JwtManager::new(SECRET);
        let token = token_for("not-a-uuid", 3600);
        assert!(manager.verify_tenant(&token).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let manager = JwtManager::new(SECRET);
        assert!(manager.verify_tenant("garbage.token.here").is_err());
    }
}
