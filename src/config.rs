use std::env;
use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/search";
const PREFS_FILE_NAME: &str = ".sectionscope-prefs.json";

/// Settings shared by the front ends that drive a [`crate::SearchOrchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Full URL of the search endpoint, e.g. `http://host/search`.
    pub endpoint: String,
    /// Where the CLI persists theme and font-size preferences.
    pub prefs_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            prefs_path: default_prefs_path(),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint.trim().to_string();
        }
        self
    }

    pub fn with_prefs_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.prefs_path = path;
        }
        self
    }
}

/// `$HOME/.sectionscope-prefs.json`, or the working directory without a home.
pub fn default_prefs_path() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(PREFS_FILE_NAME)
}
