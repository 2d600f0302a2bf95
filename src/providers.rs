//! Pluggable collaborators for deriving user attributes.
//!
//! IP geolocation and user agent parsing are deliberately not bundled; the
//! embedding program wires in whatever database or parser it already uses.
//! Without a provider the corresponding conditions only see attributes set
//! explicitly on the user.
use std::sync::Arc;

/// Resolves an IP address to an ISO 3166-1 alpha-2 country code.
pub trait CountryLookup: Send + Sync {
    fn country(&self, ip: &str) -> Option<String>;
}

/// Splits a user agent string into OS and browser components.
pub trait UserAgentParser: Send + Sync {
    fn parse(&self, user_agent: &str) -> Option<ParsedUserAgent>;
}

#[derive(Debug, Clone, Default)]
pub struct ParsedUserAgent {
    pub os_name: String,
    pub os_version: UaVersion,
    pub browser_name: String,
    pub browser_version: UaVersion,
}

/// Version components as reported by a user agent parser. Trailing components
/// are empty strings when the parser could not extract them.
#[derive(Debug, Clone, Default)]
pub struct UaVersion {
    pub major: String,
    pub minor: String,
    pub patch: String,
    pub patch_minor: String,
}

impl UaVersion {
    /// Joins the available components with dots, skipping empty ones.
    pub fn dotted(&self) -> String {
        [&self.major, &self.minor, &self.patch, &self.patch_minor]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Clone, Default)]
pub struct Providers {
    pub country_lookup: Option<Arc<dyn CountryLookup>>,
    pub user_agent_parser: Option<Arc<dyn UserAgentParser>>,
}
