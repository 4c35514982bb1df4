//! Configuration persistante de l'outil.
//!
//! Lue depuis un fichier TOML optionnel (`~/.httpfile/config.toml` par défaut);
//! chaque clé absente prend sa valeur par défaut. Les options de la ligne de
//! commande ont priorité sur le fichier.
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use serde::Deserialize;
use crate::downloader::{DownloadOptions, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS};

const APP_DIR: &str = ".httpfile";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunk_size: u64,
    pub workers: usize,
    pub cache_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            cache_dir: None,
            user_agent: None,
            connect_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("configuration TOML invalide")
    }

    /// Charge `path`; un fichier absent donne la configuration par défaut.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content)
                .with_context(|| format!("lecture de {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("lecture de {}", path.display())),
        }
    }

    /// Chemin du fichier de configuration par défaut, s'il existe un répertoire personnel.
    pub fn default_path() -> Option<PathBuf> {
        app_home().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Racine du cache: `cache_dir` si fournie, sinon `~/.httpfile/cache`,
    /// et en dernier recours le répertoire temporaire du système.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .or_else(|| app_home().map(|dir| dir.join("cache")))
            .unwrap_or_else(|| std::env::temp_dir().join("httpfile"))
    }

    pub fn download_options(&self) -> DownloadOptions {
        DownloadOptions {
            chunk_size: self.chunk_size,
            workers: self.workers,
            cache_root: self.cache_root(),
            user_agent: self.user_agent.clone(),
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn app_home() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.chunk_size, 1 << 20);
        assert_eq!(config.workers, 6);
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = Config::from_toml(
            r#"
            workers = 12
            cache_dir = "/var/cache/httpfile"
            connect_timeout_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.workers, 12);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.cache_root(), PathBuf::from("/var/cache/httpfile"));

        let opts = config.download_options();
        assert_eq!(opts.workers, 12);
        assert_eq!(opts.connect_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml("workers = \"many\"").is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "chunk_size = 4096\nuser_agent = \"httpfile/0.1\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.user_agent.as_deref(), Some("httpfile/0.1"));
    }
}
