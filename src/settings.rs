use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub server: Server,
    pub auth: Auth,
    pub storage: Storage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Serve the GraphiQL page on `GET /graphql`
    #[serde(default = "default_playground")]
    pub playground: bool,
}

fn default_playground() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Auth {
    /// JWS algorithm tokens must be signed with (HS256, RS256, ES256, ...)
    pub algorithm: String,
    /// Shared HMAC secret
    pub secret_key: Option<String>,
    /// PEM public key for RS*/ES*/PS* tokens; takes precedence over `secret_key`
    pub public_key_file: Option<PathBuf>,
}

// Keep the secret out of logs.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("algorithm", &self.algorithm)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("public_key_file", &self.public_key_file)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Mock,
    Sqlite,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    pub backend: Backend,
    /// SeaORM connection string for the sqlite backend,
    /// e.g. sqlite:///usr/shared/db/opends.db?mode=ro
    pub database_url: String,
    /// Apply migrations (create `vss_data`) on startup
    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
    /// JSON document for the json backend
    pub json_path: PathBuf,
    /// Upper bound for one backend read
    pub read_timeout_ms: u64,
}

fn default_run_migrations() -> bool {
    true
}

impl Storage {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            playground: true,
        }
    }
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            algorithm: "HS256".to_string(),
            secret_key: None,
            public_key_file: None,
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            backend: Backend::Mock,
            database_url: "sqlite://opends.db?mode=rwc".to_string(),
            run_migrations: true,
            json_path: PathBuf::from("data/vss.json"),
            read_timeout_ms: 5000,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    /// Load defaults, then the optional TOML file, then `VSS_GRAPHQL__*`
    /// overrides, then the plain `PORT`, `SECRET_KEY` and `PUBLIC_KEY_FILE`
    /// variables looked up through `env`.
    pub fn load_with_env<F>(path: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default("auth.algorithm", Auth::default().algorithm)
            .into_diagnostic()?
            .set_default("storage.backend", "mock")
            .into_diagnostic()?
            .set_default("storage.database_url", Storage::default().database_url)
            .into_diagnostic()?
            .set_default(
                "storage.json_path",
                Storage::default().json_path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default("storage.read_timeout_ms", Storage::default().read_timeout_ms)
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: VSS_GRAPHQL__SERVER__PORT=9090, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("VSS_GRAPHQL").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;
        s.apply_legacy_env(env);

        if s.storage.json_path.is_relative() {
            s.storage.json_path = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.storage.json_path);
        }

        Ok(s)
    }

    fn apply_legacy_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = env("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(%port, "Ignoring non-numeric PORT"),
            }
        }
        if let Some(secret) = env("SECRET_KEY").filter(|s| !s.is_empty()) {
            self.auth.secret_key = Some(secret);
        }
        if let Some(file) = env("PUBLIC_KEY_FILE").filter(|s| !s.is_empty()) {
            self.auth.public_key_file = Some(PathBuf::from(file));
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_settings_load_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load_with_env(config_path.to_str().unwrap(), no_env)
            .expect("Failed to load settings");

        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 4000);
        assert!(settings.server.playground);
        assert_eq!(settings.auth.algorithm, "HS256");
        assert_eq!(settings.storage.backend, Backend::Mock);
        assert_eq!(settings.storage.read_timeout(), Duration::from_secs(5));
        assert!(settings.storage.run_migrations);
    }

    #[test]
    fn test_settings_load_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");

        let config_content = r#"
[server]
host = "127.0.0.1"
port = 9090
playground = false

[auth]
algorithm = "RS256"
public_key_file = "/etc/vss/public.pem"

[storage]
backend = "sqlite"
database_url = "sqlite:///usr/shared/db/opends.db?mode=ro"
run_migrations = false
json_path = "/var/lib/vss/vss.json"
read_timeout_ms = 250
"#;
        fs::write(&config_path, config_content).expect("Failed to write config");

        let settings = Settings::load_with_env(config_path.to_str().unwrap(), no_env)
            .expect("Failed to load settings");

        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9090);
        assert!(!settings.server.playground);
        assert_eq!(settings.auth.algorithm, "RS256");
        assert_eq!(
            settings.auth.public_key_file,
            Some(PathBuf::from("/etc/vss/public.pem"))
        );
        assert_eq!(settings.storage.backend, Backend::Sqlite);
        assert!(!settings.storage.run_migrations);
        assert_eq!(settings.storage.json_path, PathBuf::from("/var/lib/vss/vss.json"));
        assert_eq!(settings.storage.read_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_legacy_env_overrides() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");
        fs::write(&config_path, "[server]\nport = 8080\n").expect("Failed to write config");

        let settings = Settings::load_with_env(
            config_path.to_str().unwrap(),
            env_from(&[
                ("PORT", "5000"),
                ("SECRET_KEY", "s3cret"),
                ("PUBLIC_KEY_FILE", "/keys/pub.pem"),
            ]),
        )
        .expect("Failed to load settings");

        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.auth.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(
            settings.auth.public_key_file,
            Some(PathBuf::from("/keys/pub.pem"))
        );
    }

    #[test]
    fn test_non_numeric_port_ignored() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load_with_env(
            config_path.to_str().unwrap(),
            env_from(&[("PORT", "http")]),
        )
        .expect("Failed to load settings");

        assert_eq!(settings.server.port, DEFAULT_PORT);
    }

    #[test]
    fn test_relative_json_path_normalized() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("test_config.toml");
        fs::write(&config_path, "[storage]\njson_path = \"relative/vss.json\"\n")
            .expect("Failed to write config");

        let settings = Settings::load_with_env(config_path.to_str().unwrap(), no_env)
            .expect("Failed to load settings");

        assert!(settings.storage.json_path.is_absolute());
        assert!(settings.storage.json_path.ends_with("relative/vss.json"));
    }

    #[test]
    fn test_auth_debug_redacts_secret() {
        let auth = Auth {
            secret_key: Some("hunter2".into()),
            ..Auth::default()
        };
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_listen_addr() {
        let mut settings = Settings::default();
        settings.server.host = "127.0.0.1".into();
        settings.server.port = 4001;
        assert_eq!(settings.listen_addr(), "127.0.0.1:4001");
    }
}
