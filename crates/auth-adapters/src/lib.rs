//! # auth-adapters
//!
//! Role model adapters: the default visibility policy and the ways a
//! request credential becomes an `Actor`.

pub mod policy;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

use domains::{Actor, ActorResolver, AppError};

pub use policy::RolePolicy;

#[cfg(feature = "auth-jwt")]
pub use jwt::{issue_token, JwtActorResolver};

/// Treats every request as a guest, whatever credential it carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousResolver;

impl ActorResolver for AnonymousResolver {
    fn resolve(&self, _bearer: Option<&str>) -> Result<Actor, AppError> {
        Ok(Actor::guest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_ignores_credentials() {
        assert_eq!(AnonymousResolver.resolve(Some("whatever")).unwrap(), Actor::guest());
    }
}
