//! Provider boundary: the narrow request/response contract each agent
//! consumes.
//!
//! The core never implements a vendor SDK. Each trait takes identity fields
//! in and hands a small payload back inside a success/error envelope;
//! authentication, pagination and transport details belong to the
//! integration that implements the trait. `HttpProviderClient` is the thin
//! JSON transport implementations can build on.

mod http;

pub use http::HttpProviderClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Identity fields handed to profile and person-search providers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PersonQuery {
    pub person_name: Option<String>,
    pub company_name: Option<String>,
    pub domain: Option<String>,
    /// Known profile URL, when a lookup starts from one
    pub linkedin_url: Option<String>,
}

/// Payload from a profile resolution.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileResponse {
    pub linkedin_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
}

/// Payload from a profile accessibility check.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessibilityResponse {
    /// Whether the profile is publicly viewable
    pub public: bool,
}

/// Payload from a person search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonSearchResponse {
    pub linkedin_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
}

/// Payload from a domain email-pattern lookup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternResponse {
    /// Pattern template such as `{first}.{last}`
    pub pattern: Option<String>,
}

/// Payload from a name+domain email finder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailFinderResponse {
    pub email: Option<String>,
}

/// Verdict from an email verification provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Verified,
    Invalid,
    Unknown,
}

/// Payload from an email verification call.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationResponse {
    pub status: VerificationStatus,
}

/// Resolves a person to their profile URL (and whatever title/company data
/// rides along), and checks profile accessibility.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    async fn resolve_profile(&self, query: &PersonQuery) -> Result<ProfileResponse, ProviderError>;

    async fn check_accessibility(&self, url: &str)
        -> Result<AccessibilityResponse, ProviderError>;
}

/// Searches for a person by name and company.
#[async_trait]
pub trait PersonSearchProvider: Send + Sync {
    async fn search_person(
        &self,
        query: &PersonQuery,
    ) -> Result<PersonSearchResponse, ProviderError>;
}

/// Looks up the dominant email pattern for a domain.
#[async_trait]
pub trait PatternProvider: Send + Sync {
    async fn domain_pattern(&self, domain: &str) -> Result<PatternResponse, ProviderError>;
}

/// Finds an email address from a full name and domain.
#[async_trait]
pub trait EmailFinderProvider: Send + Sync {
    async fn find_email(
        &self,
        full_name: &str,
        domain: &str,
    ) -> Result<EmailFinderResponse, ProviderError>;
}

/// Verifies deliverability of an email address.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    async fn verify(&self, email: &str) -> Result<VerificationResponse, ProviderError>;
}

/// Errors crossing the provider boundary.
///
/// Display strings feed the failure classifier, so the wording here lines
/// up with its substring heuristics.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("provider call timed out")]
    Timeout,

    #[error("invalid response payload: {0}")]
    Decode(String),

    #[error("provider error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            return Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        Self::Network(err.to_string())
    }
}
