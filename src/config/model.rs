use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub const ENV_UPSTREAM_URL: &str = "STASH_API_URL";
pub const ENV_SERVER_ADDR: &str = "PIXEL_ADDR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failure read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failure parse file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("active profile {0:?} has no application-{0}.yml")]
    MissingProfile(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Profiles {
    pub active: String,
}
// application.yml only names the active profile
#[derive(Serialize, Deserialize, Debug)]
pub struct EnvConfig {
    pub profiles: Profiles,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Bootstrap {
    pub server: Server,
    pub upstream: Upstream,
    pub refresh: Refresh,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Server {
    pub addr: String,
    pub request_timeout_secs: u64,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            addr: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Upstream {
    pub name: String,
    pub base_url: Option<String>,
    pub status_path: String,
    pub timeout_ms: u64,
}

impl Default for Upstream {
    fn default() -> Self {
        Upstream {
            name: "Stash API".to_string(),
            base_url: None,
            status_path: "/internal/status".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl Upstream {
    /// Base URL without trailing slashes; blank counts as not configured.
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Refresh {
    pub enabled: bool,
}

impl Default for Refresh {
    fn default() -> Self {
        Refresh { enabled: true }
    }
}

impl Bootstrap {
    /// Applies environment overrides looked up through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Bootstrap
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            self.upstream.base_url = Some(url);
        }
        if let Some(addr) = lookup(ENV_SERVER_ADDR) {
            self.server.addr = addr;
        }
        self
    }
}

// 加载指定配置文件, a missing file is not an error
fn load_config<T>(path: &Path) -> Result<Option<T>, ConfigError>
where
    T: DeserializeOwned,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_yaml::from_str::<T>(&content)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn load_env_config(dir: &Path) -> Result<Option<EnvConfig>, ConfigError> {
    load_config::<EnvConfig>(&dir.join("application.yml"))
}

fn load_bootstrap_config_from_env(dir: &Path, active: &str) -> Result<Bootstrap, ConfigError> {
    let path = dir.join(format!("application-{}.yml", active));
    load_config::<Bootstrap>(&path)?.ok_or_else(|| ConfigError::MissingProfile(active.to_string()))
}

/// Loads `application.yml` from `dir`, then the profile file it names, then
/// applies environment overrides. Without `application.yml` the defaults are
/// used, which leaves the upstream unconfigured.
pub fn load_bootstrap_config(dir: &Path) -> Result<Bootstrap, ConfigError> {
    let bootstrap = match load_env_config(dir)? {
        Some(env_config) => {
            info!(profile = %env_config.profiles.active, "loading configuration profile");
            load_bootstrap_config_from_env(dir, &env_config.profiles.active)?
        }
        None => {
            info!("no application.yml in {}, using defaults", dir.display());
            Bootstrap::default()
        }
    };
    Ok(bootstrap.with_overrides(|key| std::env::var(key).ok()))
}

#[cfg(test)]
mod test {
    use crate::config::model::*;
    use std::collections::HashMap;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pixel-status-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn defaults_leave_upstream_unconfigured() {
        let config = Bootstrap::default();
        assert_eq!(config.upstream.base_url(), None);
        assert_eq!(config.upstream.status_path, "/internal/status");
        assert_eq!(config.upstream.timeout(), Duration::from_secs(5));
        assert_eq!(config.server.addr, "127.0.0.1:3000");
        assert!(config.refresh.enabled);
    }

    #[test]
    fn base_url_is_normalized() {
        let mut upstream = Upstream::default();
        upstream.base_url = Some("  https://stash.example.com/ ".to_string());
        assert_eq!(upstream.base_url(), Some("https://stash.example.com"));
        upstream.base_url = Some("   ".to_string());
        assert_eq!(upstream.base_url(), None);
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_UPSTREAM_URL, "http://localhost:8080"),
            (ENV_SERVER_ADDR, "0.0.0.0:80"),
        ]
        .into_iter()
        .collect();
        let config = Bootstrap::default().with_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.upstream.base_url(), Some("http://localhost:8080"));
        assert_eq!(config.server.addr, "0.0.0.0:80");
    }

    #[test]
    fn loads_active_profile() {
        let dir = scratch_dir("profile");
        std::fs::write(dir.join("application.yml"), "profiles:\n  active: test\n").unwrap();
        std::fs::write(
            dir.join("application-test.yml"),
            "upstream:\n  base_url: https://stash.example.com\n  timeout_ms: 2500\nrefresh:\n  enabled: false\n",
        )
        .unwrap();
        let config = load_bootstrap_config_from_env(&dir, "test").unwrap();
        assert_eq!(config.upstream.base_url(), Some("https://stash.example.com"));
        assert_eq!(config.upstream.timeout_ms, 2500);
        assert_eq!(config.upstream.name, "Stash API");
        assert!(!config.refresh.enabled);
        assert_eq!(config.server, Server::default());
    }

    #[test]
    fn missing_application_yml_is_none() {
        let dir = scratch_dir("empty");
        assert!(load_env_config(&dir).unwrap().is_none());
    }

    #[test]
    fn missing_profile_file_is_an_error() {
        let dir = scratch_dir("missing");
        std::fs::write(dir.join("application.yml"), "profiles:\n  active: prod\n").unwrap();
        match load_bootstrap_config(&dir) {
            Err(ConfigError::MissingProfile(profile)) => assert_eq!(profile, "prod"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = scratch_dir("malformed");
        std::fs::write(dir.join("application.yml"), "profiles: [oops").unwrap();
        assert!(matches!(
            load_env_config(&dir),
            Err(ConfigError::Parse { .. })
        ));
    }
}
