use std::path::PathBuf;
use std::time::Duration;

/// Taille de chunk par défaut: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1 << 20;

/// Nombre de workers par défaut.
pub const DEFAULT_WORKERS: usize = 6;

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("sonde HEAD impossible pour {url}: {reason}")]
    Probe { url: String, reason: String },
    #[error("plan de chunks invalide: {0}")]
    Plan(String),
    #[error("erreur de stockage sur {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("échec du chunk {index}: {reason}")]
    Fetch { index: usize, reason: String },
    #[error("échec de la fusion vers {}: {reason}", .path.display())]
    Merge { path: PathBuf, reason: String },
    #[error("workers arrêtés avant la fin: {completed}/{total} chunks")]
    Incomplete { completed: usize, total: usize },
    #[error("client HTTP: {0}")]
    Client(#[from] reqwest::Error),
    #[error("téléchargement annulé")]
    Cancelled,
}

impl DownloadError {
    pub(crate) fn store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DownloadError::Store {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn fetch(index: usize, reason: impl ToString) -> Self {
        DownloadError::Fetch {
            index,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn merge(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DownloadError::Merge {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Options contrôlant une session de téléchargement
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// taille cible d'un chunk en octets (le dernier peut être plus petit)
    pub chunk_size: u64,
    /// nombre maximum de workers en parallèle
    pub workers: usize,
    /// racine du cache où vivent les fichiers de chunks
    pub cache_root: PathBuf,
    /// en-tête User-Agent envoyé au serveur
    pub user_agent: Option<String>,
    /// délai maximal d'établissement de connexion
    pub connect_timeout: Option<Duration>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            cache_root: std::env::temp_dir().join("httpfile"),
            user_agent: None,
            connect_timeout: None,
        }
    }
}

impl DownloadOptions {
    /// Construit le client HTTP partagé par toutes les requêtes de la session.
    pub fn build_client(&self) -> Result<reqwest::Client, DownloadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

/// Événement émis par un worker lorsqu'un chunk est complet sur disque
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDone {
    pub index: usize,
    /// vrai si le chunk était déjà complet (reprise), sans requête réseau
    pub skipped: bool,
}

/// Bilan d'une exécution terminée du coordinateur
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outcome {
    pub fetched: usize,
    pub skipped: usize,
}

impl Outcome {
    #[inline]
    pub fn total(&self) -> usize {
        self.fetched + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_options_default() {
        let opts = DownloadOptions::default();
        assert_eq!(opts.chunk_size, 1024 * 1024);
        assert_eq!(opts.workers, 6);
        assert!(opts.user_agent.is_none());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = DownloadError::fetch(3, "statut 500");
        assert!(err.to_string().contains("chunk 3"));
        assert!(err.to_string().contains("statut 500"));

        let io_error = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let err = DownloadError::store("/tmp/cache/chunk-0", io_error);
        assert!(err.to_string().contains("/tmp/cache/chunk-0"));
    }

    #[test]
    fn test_outcome_total() {
        let outcome = Outcome { fetched: 3, skipped: 2 };
        assert_eq!(outcome.total(), 5);
    }

    #[test]
    fn test_build_client_with_options() {
        let opts = DownloadOptions {
            user_agent: Some("httpfile-test".into()),
            connect_timeout: Some(Duration::from_secs(5)),
            ..DownloadOptions::default()
        };
        assert!(opts.build_client().is_ok());
    }
}
