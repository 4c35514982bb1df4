//! Emplacement disque des chunks et test de reprise.
//!
//! Chaque URL possède une entrée de cache `racine/<fnv1a32(url)>`:
//! un répertoire contenant `chunk-<index>` en mode segmenté, ou un fichier unique
//! en flux unique. Un chunk est complet si et seulement si la taille de son
//! fichier est égale à la taille attendue.
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tracing::debug;
use crate::downloader::types::{chunk_file_name, Chunk};
use crate::downloader::DownloadError;

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Hachage FNV‑1a 32 bits, utilisé pour nommer l'entrée de cache d'une URL.
pub fn url_hash(url: &str) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    url.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(PRIME)
    })
}

#[derive(Debug, Clone)]
pub struct ChunkStore {
    root: PathBuf,
    entry: PathBuf,
}

impl ChunkStore {
    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let root = root.into();
        let entry = root.join(url_hash(url).to_string());
        Self { root, entry }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Répertoire des chunks (mode segmenté) ou fichier unique (flux unique).
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Fonction pure de la racine et de l'ordinal du chunk.
    pub fn backing_path(&self, index: usize) -> PathBuf {
        self.entry.join(chunk_file_name(index))
    }

    /// Fichier intermédiaire dans lequel un chunk est écrit avant d'être
    /// renommé sur son chemin définitif.
    pub fn staging_path(chunk: &Chunk) -> PathBuf {
        let mut name = chunk.path.clone().into_os_string();
        name.push(".part");
        PathBuf::from(name)
    }

    /// Crée la racine du cache et, si demandé, le répertoire de l'entrée.
    pub async fn prepare(&self, chunked: bool) -> Result<(), DownloadError> {
        create_dir(&self.root).await?;
        if chunked {
            create_dir(&self.entry).await?;
        }
        Ok(())
    }

    /// Un fichier absent n'est pas une erreur: le chunk n'a simplement pas
    /// encore été téléchargé.
    pub async fn is_complete(chunk: &Chunk) -> Result<bool, DownloadError> {
        let metadata = match fs::metadata(&chunk.path).await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(DownloadError::store(&chunk.path, e)),
        };

        Ok(match chunk.expected_len {
            Some(len) => metadata.len() == len,
            None => false,
        })
    }

    /// Ouvre le fichier du chunk en ajout, sans jamais tronquer les octets
    /// déjà présents. Sans effet sur un chunk déjà complet.
    ///
    /// Le corps n'est pas écrit ici (il passe par `staging_path` puis un
    /// renommage); cette ouverture réserve l'emplacement et fait échouer le
    /// chunk en `Store` avant toute requête si le cache n'est pas inscriptible.
    /// Après un échec réseau il ne reste qu'un fichier vide, jamais complet.
    pub async fn create(chunk: &Chunk) -> Result<File, DownloadError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&chunk.path)
            .await
            .map_err(|e| DownloadError::store(&chunk.path, e))
    }

    /// Supprime l'entrée de cache (répertoire ou fichier unique).
    pub async fn clean(&self) -> Result<(), DownloadError> {
        let result = match fs::metadata(&self.entry).await {
            Ok(m) if m.is_dir() => fs::remove_dir_all(&self.entry).await,
            Ok(_) => fs::remove_file(&self.entry).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                debug!("entrée de cache supprimée: {}", self.entry.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DownloadError::store(&self.entry, e)),
        }
    }
}

async fn create_dir(path: &Path) -> Result<(), DownloadError> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    builder
        .create(path)
        .await
        .map_err(|e| DownloadError::store(path, e))
}
