//! Configuration manager for authd.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable taking precedence over `token.secret`.
const SECRET_ENV: &str = "SECRET";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REDIRECT_PATH: &str = "/articles";

// Reference lifetime policy, in seconds.
const DEFAULT_ACCESS_TTL: u64 = 24 * 60 * 60;
const DEFAULT_EXCHANGE_TTL: u64 = 2 * 60 * 60;
const DEFAULT_REFRESH_TTL: u64 = 14 * 24 * 60 * 60;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance. Minted as JWT issuer.
    pub url: String,
    /// Port to listen on.
    pub port: Option<u16>,
    /// Path the login callback redirects to, with `?token=` appended.
    pub redirect_path: Option<String>,
    #[serde(default)]
    version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
}

/// Json Web Token configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Shared HS256 signing secret.
    /// The `SECRET` environment variable takes precedence.
    pub secret: Option<String>,
    /// Lifetime of login-issued access tokens, in seconds.
    pub access_token_ttl: Option<u64>,
    /// Lifetime of refresh-exchange-issued access tokens, in seconds.
    pub exchange_token_ttl: Option<u64>,
    /// Lifetime of refresh tokens, in seconds.
    /// Also bounds the max-age of the `refresh_token` cookie.
    pub refresh_token_ttl: Option<u64>,
}

/// Token lifetime policy, read-only after startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPolicy {
    pub access_ttl: u64,
    pub exchange_ttl: u64,
    pub refresh_ttl: u64,
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Signing secret, from the environment or the `token` entry.
    pub fn secret(&self) -> Option<String> {
        std::env::var(SECRET_ENV)
            .ok()
            .or_else(|| self.token.as_ref().and_then(|t| t.secret.clone()))
    }

    /// Lifetime policy with reference defaults filled in.
    pub fn policy(&self) -> TokenPolicy {
        let token = self.token.clone().unwrap_or_default();

        TokenPolicy {
            access_ttl: token.access_token_ttl.unwrap_or(DEFAULT_ACCESS_TTL),
            exchange_ttl: token.exchange_token_ttl.unwrap_or(DEFAULT_EXCHANGE_TTL),
            refresh_ttl: token.refresh_token_ttl.unwrap_or(DEFAULT_REFRESH_TTL),
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn redirect_path(&self) -> &str {
        self.redirect_path.as_deref().unwrap_or(DEFAULT_REDIRECT_PATH)
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme =
            if url.starts_with("http://") || url.starts_with("https://") {
                url.to_string()
            } else {
                format!("https://{url}")
            };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            &self.path
        } else {
            &Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        match File::open(file_path) {
            Ok(file) => {
                let mut config: Configuration =
                    match serde_yaml::from_reader(file) {
                        Ok(config) => config,
                        Err(err) => {
                            return Ok(Arc::new(self.error(err)));
                        },
                    };

                // set app version.
                config.version = VERSION.to_owned();

                // normalize issuer URL.
                config.url = self.normalize_url(&config.url)?;

                Ok(Arc::new(config))
            },
            Err(err) => Ok(Arc::new(self.error(err))),
        }
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found");
        Self {
            version: VERSION.to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_falls_back_to_reference_lifetimes() {
        let config = Configuration::default();
        let policy = config.policy();

        assert_eq!(policy.access_ttl, DEFAULT_ACCESS_TTL);
        assert_eq!(policy.exchange_ttl, DEFAULT_EXCHANGE_TTL);
        assert_eq!(policy.refresh_ttl, DEFAULT_REFRESH_TTL);
    }

    #[test]
    fn policy_keeps_configured_lifetimes() {
        let config = Configuration {
            token: Some(Token {
                access_token_ttl: Some(60),
                exchange_token_ttl: Some(30),
                refresh_token_ttl: Some(120),
                ..Default::default()
            }),
            ..Default::default()
        };
        let policy = config.policy();

        assert_eq!(policy.access_ttl, 60);
        assert_eq!(policy.exchange_ttl, 30);
        assert_eq!(policy.refresh_ttl, 120);
    }

    #[test]
    fn read_loads_configured_file() {
        let path = std::env::temp_dir().join("authd-config-sample.yaml");
        std::fs::write(&path, "name: sample\nurl: auth.test\nport: 9090\n")
            .unwrap();

        let config = Configuration::default().path(path).read().unwrap();

        assert_eq!(config.name, "sample");
        assert_eq!(config.url, "https://auth.test/");
        assert_eq!(config.port(), 9090);
        assert!(config.token.is_none());
    }

    #[test]
    fn unreadable_file_falls_back_to_default() {
        let path = std::env::temp_dir().join("authd-config-unreadable.yaml");
        std::fs::write(&path, "[not, a, mapping").unwrap();

        let config = Configuration::default().path(path).read().unwrap();

        assert_eq!(config.version, VERSION);
        assert!(config.token.is_none());
    }
}
