use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api: ApiCredentials,
}

/// Credentials callers must present via HTTP Basic auth.
#[derive(Clone)]
pub struct ApiCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl ServerConfig {
    /// Loads listener settings from `server.toml` (or
    /// `PAGECOPY_SERVER_CONFIG`) falling back to environment variables.
    /// API credentials always come from the environment and are required:
    /// refusing to start beats answering every request with a 500.
    pub fn load() -> anyhow::Result<Self> {
        let api = api_credentials_from_env()?;

        if let Some(file_config) = load_from_file()? {
            return Ok(Self {
                host: file_config.server.host,
                port: file_config.server.port,
                api,
            });
        }

        let host = env::var("PAGECOPY_SERVER_HOST").unwrap_or_else(|_| default_host());
        let port = env::var("PAGECOPY_SERVER_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or_else(default_port);

        Ok(Self { host, port, api })
    }
}

fn api_credentials_from_env() -> anyhow::Result<ApiCredentials> {
    let username = env::var("API_USERNAME").ok().filter(|v| !v.trim().is_empty());
    let password = env::var("API_PASSWORD").ok().filter(|v| !v.trim().is_empty());

    match (username, password) {
        (Some(username), Some(password)) => Ok(ApiCredentials { username, password }),
        _ => Err(anyhow::anyhow!("API_USERNAME and API_PASSWORD must be set")),
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("PAGECOPY_SERVER_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("server.toml").exists() {
        Some("server.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}
