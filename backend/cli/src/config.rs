use std::path::PathBuf;

/// CLI settings taken from the environment; flags override them.
#[derive(Debug, Clone)]
pub struct Config {
    /// Node config file
    pub config_path: PathBuf,
    /// Base URL used by `call` and `status`
    pub node_url: String,
    /// Hex-encoded P-256 private key used by `call`
    pub signing_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        Self {
            config_path: std::env::var("KEYGATE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| keygate_config::config_file_path(&keygate_config::config_dir())),
            node_url: std::env::var("KEYGATE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8080".to_string()),
            signing_key: std::env::var("KEYGATE_SIGNING_KEY").ok().filter(|k| !k.trim().is_empty()),
        }
    }
}
