//! Runtime settings for the client and the live lookup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Base of the JSON lookup endpoint on pypi.org.
pub const DEFAULT_API_URL: &str = "https://pypi.org/pypi";

/// Base of the project pages on pypi.org.
pub const DEFAULT_PROJECT_URL: &str = "https://pypi.org/project";

/// Quiet period after the last edit before a lookup starts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The package index a [`Client`](crate::check::Client) talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Base URL; a lookup requests `{api_url}/{name}/json`.
    pub api_url: String,
    /// Base URL; a taken name links to `{project_url}/{name}/`.
    pub project_url: String,
}

impl Index {
    /// URL queried for a canonical name.
    ///
    /// ```
    /// use pypi_avail::config::Index;
    /// assert_eq!(
    ///     Index::default().lookup_url("requests"),
    ///     "https://pypi.org/pypi/requests/json",
    /// );
    /// ```
    #[must_use]
    pub fn lookup_url(&self, name: &str) -> String {
        format!("{}/{name}/json", self.api_url.trim_end_matches('/'))
    }

    /// Page of an existing project. Derived, never fetched.
    #[must_use]
    pub fn project_url(&self, name: &str) -> String {
        format!("{}/{name}/", self.project_url.trim_end_matches('/'))
    }
}

impl Default for Index {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            project_url: DEFAULT_PROJECT_URL.to_string(),
        }
    }
}

/// Settings shared by [`Client`](crate::check::Client) and
/// [`LiveLookup`](crate::lookup::LiveLookup).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Quiet period before a typed name is looked up.
    #[serde(default = "Config::default_debounce")]
    pub debounce: Duration,
    /// Upper bound on a single request.
    #[serde(default = "Config::default_timeout")]
    pub timeout: Duration,
    /// Index to query.
    #[serde(default)]
    pub index: Index,
}

impl Config {
    fn default_debounce() -> Duration {
        DEFAULT_DEBOUNCE
    }

    fn default_timeout() -> Duration {
        DEFAULT_TIMEOUT
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce: Self::default_debounce(),
            timeout: Self::default_timeout(),
            index: Index::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_index_is_pypi() {
        let index = Index::default();
        assert_eq!(index.lookup_url("my-package"), "https://pypi.org/pypi/my-package/json");
        assert_eq!(index.project_url("requests"), "https://pypi.org/project/requests/");
    }

    #[test]
    fn trailing_slashes_are_ignored() {
        let index = Index {
            api_url: "http://mirror.local/pypi/".into(),
            project_url: "http://mirror.local/project/".into(),
        };
        assert_eq!(index.lookup_url("demo"), "http://mirror.local/pypi/demo/json");
        assert_eq!(index.project_url("demo"), "http://mirror.local/project/demo/");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.debounce, Duration::from_millis(300));
    }
}
