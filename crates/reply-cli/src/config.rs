//! Configuration file management for reply.
//!
//! Provides a TOML-based config file at `~/.config/reply/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use reply_axum::CsrfTokens;
use reply_core::AdapterConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub adapter: AdapterConfig,
    pub csrf: Option<CsrfSection>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CsrfSection {
    /// Hex-encoded HMAC secret (64 hex chars = 32 bytes).
    pub secret: String,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the reply config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/reply` or `~/.config/reply`,
/// never the platform-specific `dirs::config_dir()`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("reply");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("reply")
}

/// Return the path to the reply config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file at `path`.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(path: &Path, config: &ConfigFile) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Generate a random CSRF secret: 32 random bytes, hex-encoded (64 chars).
pub fn generate_secret() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ReplyConfig {
    pub bind: String,
    pub port: u16,
    pub adapter: AdapterConfig,
    /// `None` leaves CSRF tokens unavailable to handlers.
    pub csrf: Option<CsrfTokens>,
}

impl ReplyConfig {
    /// Resolve from the process environment and the default config path.
    /// A missing config file is not an error.
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        let path = config_path();
        let file = if path.exists() {
            Some(load_config(&path)?)
        } else {
            None
        };
        Self::resolve_with(cli, |key| std::env::var(key).ok(), file)
    }

    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - bind: `--bind` > `REPLY_BIND` > `server.bind` > `127.0.0.1`
    /// - port: `--port` > `REPLY_PORT` > `server.port` > `3000`
    /// - CSRF secret: `REPLY_CSRF_SECRET` > `csrf.secret` > disabled
    pub fn resolve_with(
        cli: CliOverrides,
        env: impl Fn(&str) -> Option<String>,
        file: Option<ConfigFile>,
    ) -> Result<Self> {
        let (server, adapter, file_secret) = match file {
            Some(cfg) => (cfg.server, cfg.adapter, cfg.csrf.map(|c| c.secret)),
            None => (ServerSection::default(), AdapterConfig::default(), None),
        };

        let bind = cli
            .bind
            .or_else(|| env("REPLY_BIND"))
            .unwrap_or(server.bind);

        let port = match (cli.port, env("REPLY_PORT")) {
            (Some(port), _) => port,
            (None, Some(raw)) => raw
                .parse()
                .with_context(|| format!("REPLY_PORT is not a valid port: {raw}"))?,
            (None, None) => server.port,
        };

        let csrf = if let Some(secret) = env("REPLY_CSRF_SECRET") {
            let tokens = CsrfTokens::from_hex(&secret)
                .context("REPLY_CSRF_SECRET env var is not valid hex")?;
            Some(tokens)
        } else if let Some(secret) = file_secret {
            Some(CsrfTokens::from_hex(&secret).context("invalid hex in config file csrf.secret")?)
        } else {
            None
        };

        Ok(Self {
            bind,
            port,
            adapter,
            csrf,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use reply_core::BodyPresence;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn file(bind: &str, port: u16) -> ConfigFile {
        ConfigFile {
            server: ServerSection {
                bind: bind.to_string(),
                port,
            },
            adapter: AdapterConfig::default(),
            csrf: Some(CsrfSection {
                secret: "aa".repeat(32),
            }),
        }
    }

    #[test]
    fn generate_secret_is_64_hex_chars() {
        let secret = generate_secret();
        assert_eq!(secret.len(), 64);
        assert!(
            secret.chars().all(|c| c.is_ascii_hexdigit()),
            "expected all hex digits, got: {secret}"
        );
        assert_ne!(secret, generate_secret(), "two generated secrets should differ");
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("reply").join("config.toml");

        let mut original = file("0.0.0.0", 8080);
        original.adapter.body_presence = BodyPresence::Truthy;
        save_config(&path, &original).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.server.bind, "0.0.0.0");
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.adapter.body_presence, BodyPresence::Truthy);
        assert_eq!(
            loaded.csrf.map(|c| c.secret),
            original.csrf.map(|c| c.secret)
        );
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        save_config(&path, &file(DEFAULT_BIND, DEFAULT_PORT)).unwrap();

        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn partial_config_file_uses_defaults() {
        let config: ConfigFile = toml::from_str("[adapter]\ncsrf = false\n").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(!config.adapter.csrf);
        assert!(config.adapter.redirects);
        assert!(config.csrf.is_none());
    }

    #[test]
    fn load_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = load_config(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let config = ReplyConfig::resolve_with(
            CliOverrides {
                bind: Some("10.0.0.1".into()),
                port: Some(9000),
            },
            env(&[("REPLY_BIND", "10.0.0.2"), ("REPLY_PORT", "9001")]),
            Some(file("10.0.0.3", 9002)),
        )
        .unwrap();
        assert_eq!(config.bind, "10.0.0.1");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let config = ReplyConfig::resolve_with(
            CliOverrides::default(),
            env(&[("REPLY_BIND", "10.0.0.2"), ("REPLY_PORT", "9001")]),
            Some(file("10.0.0.3", 9002)),
        )
        .unwrap();
        assert_eq!(config.bind, "10.0.0.2");
        assert_eq!(config.port, 9001);
        assert!(config.csrf.is_some());
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let config = ReplyConfig::resolve_with(CliOverrides::default(), env(&[]), None).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.adapter, AdapterConfig::default());
        assert!(config.csrf.is_none(), "csrf stays disabled without a secret");
    }

    #[test]
    fn resolve_rejects_bad_env_values() {
        let err = ReplyConfig::resolve_with(
            CliOverrides::default(),
            env(&[("REPLY_PORT", "eighty")]),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("REPLY_PORT"), "unexpected error: {err}");

        let err = ReplyConfig::resolve_with(
            CliOverrides::default(),
            env(&[("REPLY_CSRF_SECRET", "not-hex")]),
            None,
        )
        .unwrap_err();
        assert!(
            err.to_string().contains("REPLY_CSRF_SECRET"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("reply/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
