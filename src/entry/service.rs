//! Service provider configuration files (`META-INF/services/<interface>`).

use std::io;

use crate::{Error, Result};

/// The providers registered for one service interface.
///
/// The file format is one fully-qualified provider name per line; `#` starts
/// a comment, surrounding whitespace is ignored, and blank lines are skipped.
///
/// # Example
///
/// ```rust
/// use atlas::entry::ServiceProviderConfiguration;
///
/// let config = ServiceProviderConfiguration::parse(
///     "java.sql.Driver",
///     b"# drivers\norg.h2.Driver\n  org.postgresql.Driver  # pg\n",
/// ).unwrap();
/// assert_eq!(config.providers(), ["org.h2.Driver", "org.postgresql.Driver"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceProviderConfiguration {
    service: String,
    providers: Vec<String>,
}

impl ServiceProviderConfiguration {
    /// Creates a configuration with no providers.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            providers: Vec::new(),
        }
    }

    /// Parses a configuration file for the given service.
    ///
    /// Duplicate providers are dropped, keeping the first occurrence.
    pub fn parse(service: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut config = Self::new(service);
        for line in text.lines() {
            let provider = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            }
            .trim();
            if !provider.is_empty() {
                config.add_provider(provider);
            }
        }
        Ok(config)
    }

    /// Returns the service interface name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the providers in declaration order.
    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Appends a provider, returning `false` if it was already registered.
    pub fn add_provider(&mut self, provider: impl Into<String>) -> bool {
        let provider = provider.into();
        if self.providers.contains(&provider) {
            return false;
        }
        self.providers.push(provider);
        true
    }

    /// Removes a provider, returning `true` if it was registered.
    pub fn remove_provider(&mut self, provider: &str) -> bool {
        let before = self.providers.len();
        self.providers.retain(|p| p != provider);
        self.providers.len() != before
    }

    /// Replaces every provider name through `f`, dropping any that become duplicates.
    pub fn map_providers(&mut self, mut f: impl FnMut(&str) -> String) {
        let old = std::mem::take(&mut self.providers);
        for provider in old {
            self.add_provider(f(&provider));
        }
    }

    /// Serializes the configuration, one provider per line.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        for provider in &self.providers {
            out.push_str(provider);
            out.push('\n');
        }
        out.into_bytes()
    }
}
