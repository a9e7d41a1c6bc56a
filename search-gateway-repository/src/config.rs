//! Configuration types for the search engine connection.

/// Default search engine URL.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:9200";

/// Configuration for [`crate::OpenSearchEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine URL (e.g., "http://localhost:9200").
    pub url: String,
    /// Basic-auth username. Credentials are only sent when both parts are set.
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ENGINE_URL.to_string(),
            username: None,
            password: None,
        }
    }
}

impl EngineConfig {
    /// Create a config for the given URL without credentials.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Both credential parts, when configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}
