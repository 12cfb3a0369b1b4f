//! Backend registry

use std::sync::Arc;

use crate::config::BackendsConfig;
use crate::{Error, Result};

/// Ordered, read-only list of configured inference servers
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    /// Server identifiers in configuration order
    servers: Arc<[String]>,
}

impl BackendRegistry {
    /// Build the registry from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no servers are configured.
    pub fn from_config(config: &BackendsConfig) -> Result<Self> {
        if config.servers.is_empty() {
            return Err(Error::Config(
                "backend registry is empty; configure backends.servers".to_string(),
            ));
        }
        Ok(Self {
            servers: config.servers.iter().cloned().collect(),
        })
    }

    /// Server identifiers in configuration order
    #[must_use]
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Number of registered servers
    #[must_use]
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Always false for a registry built through [`BackendRegistry::from_config`]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_order() {
        let config = BackendsConfig {
            servers: vec![
                "http://host2:11434".to_string(),
                "http://host1:11434".to_string(),
                "http://host3:11434".to_string(),
            ],
        };
        let registry = BackendRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.servers(), config.servers.as_slice());
    }

    #[test]
    fn test_empty_registry_is_misconfiguration() {
        let err = BackendRegistry::from_config(&BackendsConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
