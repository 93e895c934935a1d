use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Path the SCIM router is nested under.
pub const SCIM_MOUNT_PATH: &str = "/scim/v2";

/// SCIM protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScimConfig {
    /// Absolute base URL of the SCIM endpoint as seen by identity providers,
    /// e.g. `https://sync.example.com/scim/v2`. Used for `meta.location` and
    /// member `$ref` values.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum number of member ids accepted in a single create, replace or
    /// patch request for a group.
    #[serde(default = "default_max_members")]
    pub max_members_per_request: usize,

    /// Page size used when `count` is absent.
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,

    /// Upper bound for `count`. Also advertised as `filter.maxResults`.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,
}

impl Default for ScimConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_members_per_request: default_max_members(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl ScimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_members_per_request == 0 {
            return Err(ConfigError::Validation(
                "scim.max_members_per_request must be at least 1".into(),
            ));
        }
        if self.default_page_size < 1 || self.max_page_size < 1 {
            return Err(ConfigError::Validation(
                "scim page sizes must be at least 1".into(),
            ));
        }
        if self.default_page_size > self.max_page_size {
            return Err(ConfigError::Validation(
                "scim.default_page_size cannot exceed scim.max_page_size".into(),
            ));
        }
        if let Some(url) = &self.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "scim.base_url must be an absolute http(s) URL, got '{url}'"
            )));
        }
        Ok(())
    }
}

fn default_max_members() -> usize {
    1000
}

fn default_page_size() -> i64 {
    100
}

fn default_max_page_size() -> i64 {
    1000
}
