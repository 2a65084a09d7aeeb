//! Service wiring via `lyceum.toml`
//!
//! One file declares every entity service, its unique fields, and the
//! reference fields it embeds from other services. A default file is
//! written on first start; edit it and restart to change the wiring.

use lyceum_core::{Error, FieldSelector, Projection, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Config file name placed in the service's working directory.
pub const CONFIG_FILE_NAME: &str = "lyceum.toml";

/// Asynchronous notification channel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueConfig {
    /// Publish every notification to the in-memory queue as well.
    #[serde(default)]
    pub enabled: bool,
    /// Redeliveries after a consumer's first failure (default: 3)
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,
}

fn default_max_redeliveries() -> u32 {
    crate::queue::DEFAULT_MAX_REDELIVERIES
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_redeliveries: default_max_redeliveries(),
        }
    }
}

/// A field embedding entities owned by another service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Field selector: `"school"` or `"schools[]"`
    pub field: String,
    /// Name of the owning service
    pub owner: String,
    /// Fields copied into the embedded object; `reference_fields` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<Vec<String>>,
}

impl ReferenceConfig {
    /// Declared projection, if any
    pub fn projection(&self) -> Option<Projection> {
        self.projection.as_ref().map(Projection::fields)
    }
}

/// One entity service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Collection name, also the `serviceName` its notifications carry
    pub name: String,
    /// Dotted paths whose values must be unique per tenant
    #[serde(default)]
    pub unique_fields: Vec<String>,
    /// Reference fields embedded from other services
    #[serde(default)]
    pub references: Vec<ReferenceConfig>,
}

impl ServiceConfig {
    /// Service with no unique fields or references
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique_fields: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Require `field` to be unique
    pub fn with_unique(mut self, field: impl Into<String>) -> Self {
        self.unique_fields.push(field.into());
        self
    }

    /// Embed references from `owner` under `field`
    pub fn with_reference(mut self, field: impl Into<String>, owner: impl Into<String>) -> Self {
        self.references.push(ReferenceConfig {
            field: field.into(),
            owner: owner.into(),
            projection: None,
        });
        self
    }
}

/// Configuration loaded from `lyceum.toml`.
///
/// # Example
///
/// ```toml
/// fill_references = true
/// reference_fields = ["id", "name"]
///
/// [[services]]
/// name = "schools"
///
/// [[services]]
/// name = "classes"
/// [[services.references]]
/// field = "school"
/// owner = "schools"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LyceumConfig {
    /// Master switch for reference filling and synchronization.
    #[serde(default = "default_true")]
    pub fill_references: bool,
    /// Default projection for references and subscribers.
    #[serde(default = "default_reference_fields")]
    pub reference_fields: Vec<String>,
    /// Notification queue settings.
    #[serde(default)]
    pub queue: QueueConfig,
    /// Entity services.
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

fn default_true() -> bool {
    true
}

fn default_reference_fields() -> Vec<String> {
    vec!["id".to_string(), "name".to_string()]
}

impl Default for LyceumConfig {
    fn default() -> Self {
        Self {
            fill_references: true,
            reference_fields: default_reference_fields(),
            queue: QueueConfig::default(),
            services: Vec::new(),
        }
    }
}

impl LyceumConfig {
    /// Projection built from `reference_fields`
    pub fn default_projection(&self) -> Projection {
        Projection::fields(&self.reference_fields)
    }

    /// Look up a service by name
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Add a service
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.services.push(service);
        self
    }

    /// Check service names, reference owners and field selectors.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty or duplicate service name, an empty field,
    /// an unparseable selector, or an owner that is not a declared service.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                return Err(Error::validation("service name must not be empty"));
            }
            if !names.insert(service.name.as_str()) {
                return Err(Error::validation(format!(
                    "service '{}' is declared twice",
                    service.name
                )));
            }
        }
        for service in &self.services {
            if service.unique_fields.iter().any(String::is_empty) {
                return Err(Error::validation(format!(
                    "service '{}' has an empty unique field",
                    service.name
                )));
            }
            for reference in &service.references {
                if reference.field.is_empty() {
                    return Err(Error::validation(format!(
                        "service '{}' has a reference with an empty field",
                        service.name
                    )));
                }
                reference.field.parse::<FieldSelector>()?;
                if !names.contains(reference.owner.as_str()) {
                    return Err(Error::validation(format!(
                        "reference '{}' of service '{}' names unknown owner '{}'",
                        reference.field, service.name, reference.owner
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Lyceum service configuration
#
# Fill reference fields from their owning services on write, and keep
# embedded copies current when owners change (default: true)
fill_references = true

# Fields copied into embedded references that declare no projection
reference_fields = ["id", "name"]

[queue]
# Also publish notifications to the in-memory queue (default: false)
enabled = false
# Redeliveries after a consumer's first failure
max_redeliveries = 3

# Declare one [[services]] table per entity service.
# [[services]]
# name = "schools"
# unique_fields = ["code"]
#
# [[services]]
# name = "classes"
# [[services.references]]
# field = "school"          # "schools[]" for an array of references
# owner = "schools"
# projection = ["name", "city"]   # optional
"#
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read or parsed; `Validation` if the
    /// wiring is inconsistent.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: LyceumConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
