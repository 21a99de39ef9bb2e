//! HS256 bearer tokens carrying `{ sub, role, exp }`.

use domains::{Actor, ActorResolver, AppError, Role};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id, as a decimal string.
    sub: String,
    role: Role,
    exp: i64,
}

pub struct JwtActorResolver {
    key: DecodingKey,
    validation: Validation,
}

impl JwtActorResolver {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl ActorResolver for JwtActorResolver {
    fn resolve(&self, bearer: Option<&str>) -> Result<Actor, AppError> {
        let Some(token) = bearer else {
            return Ok(Actor::guest());
        };

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "rejected bearer token");
            AppError::Unauthorized("invalid token".into())
        })?;
        let user_id = data
            .claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::Unauthorized("token subject is not a user id".into()))?;

        Ok(Actor { user_id: Some(user_id), role: data.claims.role })
    }
}

/// Signs a token for `user_id` valid until `expires_at` (unix seconds).
pub fn issue_token(secret: &[u8], user_id: i64, role: Role, expires_at: i64) -> anyhow::Result<String> {
    let claims = Claims { sub: user_id.to_string(), role, exp: expires_at };
    Ok(encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret))?)
}
