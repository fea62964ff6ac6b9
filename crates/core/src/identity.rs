//! Caller identity.
//!
//! Accounts and credentials live in an external auth service. This module
//! only verifies the bearer tokens it issues and exposes the caller.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use roadwatch_common::{AppError, AppResult, config::AuthConfig};
use roadwatch_db::entities::accident_report::ReporterSnapshot;
use serde::{Deserialize, Serialize};

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Citizen reporter.
    #[default]
    User,
    /// Privileged handler.
    Admin,
}

/// Reporter details carried by the token.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReporterProfile {
    pub name: String,
    pub national_id: String,
    pub phone: String,
    pub email: String,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// User ID in the auth service.
    pub id: String,
    pub role: Role,
    pub profile: ReporterProfile,
}

impl Caller {
    /// Whether the caller is a privileged handler.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Profile copy stored on new reports.
    #[must_use]
    pub fn snapshot(&self) -> ReporterSnapshot {
        ReporterSnapshot {
            name: self.profile.name.clone(),
            national_id_number: self.profile.national_id.clone(),
            phone: self.profile.phone.clone(),
            email: self.profile.email.clone(),
        }
    }

    /// Fail with `Forbidden` unless the caller is privileged.
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "This action requires an administrator".to_string(),
            ))
        }
    }
}

/// Resolves bearer tokens to callers.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate a bearer token.
    async fn authenticate(&self, token: &str) -> AppResult<Caller>;
}

/// Token claims issued by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub national_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub exp: i64,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            profile: ReporterProfile {
                name: claims.name,
                national_id: claims.national_id,
                phone: claims.phone,
                email: claims.email,
            },
        }
    }
}

/// Verifies HS256 tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    /// Create a provider from the auth configuration.
    pub fn new(config: &AuthConfig) -> AppResult<Self> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::Config("auth.jwt_secret must be set".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn authenticate(&self, token: &str) -> AppResult<Caller> {
        let data = decode::<Claims>(token, &self.key, &self.validation)?;
        if data.claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }
        Ok(data.claims.into())
    }
}
