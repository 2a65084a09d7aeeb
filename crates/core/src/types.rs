//! Request scoping types
//!
//! - RequestContext: per-request tenant/locale identifiers handed in by the
//!   controller layer
//! - Namespace: tenant + collection pair scoping every store call

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant used when a context does not name one
pub const DEFAULT_TENANT: &str = "default";

/// Locale used when a context does not name one
pub const DEFAULT_LOCALE: &str = "en";

/// Request-scoped identifiers
///
/// The core never authenticates or localizes; it only uses `tenant` for
/// isolation and threads the whole context through to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Tenant (school) identifier; documents of different tenants never meet
    pub tenant: String,
    /// Locale for user-facing messages rendered outside the core
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Correlation id for logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

impl RequestContext {
    /// Context for a tenant with the default locale
    pub fn new(tenant: impl Into<String>) -> Self {
        RequestContext {
            tenant: tenant.into(),
            locale: default_locale(),
            request_id: None,
        }
    }

    /// Override the locale (builder)
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Attach a correlation id (builder)
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Namespace for a collection under this context's tenant
    pub fn namespace(&self, collection: &str) -> Namespace {
        Namespace::new(self.tenant.clone(), collection.to_string())
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        RequestContext::new(DEFAULT_TENANT)
    }
}

/// Storage scope: one collection of one tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    /// Tenant identifier (top-level isolation)
    pub tenant: String,
    /// Collection name
    pub collection: String,
}

impl Namespace {
    /// Create a new namespace
    pub fn new(tenant: String, collection: String) -> Self {
        Self { tenant, collection }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant, self.collection)
    }
}
