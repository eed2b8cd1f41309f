/// Engine configuration for query resolution and render enumeration
use serde::{Deserialize, Serialize};

/// Hard ceiling for `max_per_page`
const MAX_SUPPORTED_PER_PAGE: usize = 100_000;

/// Configuration shared by the query service and the render service
///
/// Both services take the same config so paginated routes are enumerated with
/// exactly the page size the live resolver would use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Page size when a query gives neither `perPage` nor `limit`
    pub default_per_page: usize,

    /// Upper clamp for `perPage`
    pub max_per_page: usize,

    /// Enumerate routes on the rayon thread pool
    pub parallel_render: bool,

    /// Append `/` to every rendered path
    pub trailing_slash: bool,

    /// Capacity of the store event channel
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_per_page: 100,
            max_per_page: 1000,
            parallel_render: true,
            trailing_slash: false,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_per_page == 0 {
            return Err("default_per_page must be greater than 0".to_string());
        }

        if self.max_per_page == 0 {
            return Err("max_per_page must be greater than 0".to_string());
        }

        if self.max_per_page > MAX_SUPPORTED_PER_PAGE {
            return Err(format!(
                "max_per_page cannot exceed {}",
                MAX_SUPPORTED_PER_PAGE
            ));
        }

        if self.default_per_page > self.max_per_page {
            return Err(format!(
                "default_per_page ({}) cannot exceed max_per_page ({})",
                self.default_per_page, self.max_per_page
            ));
        }

        if self.event_capacity == 0 {
            return Err("event_capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_value(json!({"default_per_page": 10, "trailing_slash": true}))
                .unwrap();
        assert_eq!(config.default_per_page, 10);
        assert!(config.trailing_slash);
        assert_eq!(config.max_per_page, 1000);
        assert!(config.parallel_render);
    }

    #[test]
    fn test_validate_rejects_inconsistent_limits() {
        let config = EngineConfig {
            default_per_page: 50,
            max_per_page: 10,
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("cannot exceed"));

        let config = EngineConfig {
            default_per_page: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
