//! Types de base pour décrire une ressource distante et ses segments.
//!
//! Invariants principaux:
//! - `chunk_size` (> 0) est la taille cible d'un segment; le dernier peut être plus petit.
//! - Les segments générés couvrent l'intervalle `[0, size - 1]` sans chevauchement,
//!   dans l'ordre croissant des index.
//! - Un segment sans `range` représente la ressource entière (mode non‑segmenté).
use std::path::{Path, PathBuf};
use crate::downloader::DownloadError;

/// Ressource distante telle que sondée par la requête HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub url: String,
    /// `None` si le serveur n'annonce pas de `Content-Length` exploitable
    pub size: Option<u64>,
    pub accept_ranges: bool,
}

/// Mode de transfert retenu après la sonde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// requêtes `Range` parallèles, un fichier par chunk
    Chunked,
    /// une seule requête sans `Range` pour toute la ressource
    SingleStream,
}

impl Resource {
    /// Une taille non nulle est requise pour planifier des chunks: inconnue ou
    /// nulle, on repasse en flux unique, quel que soit `accept_ranges`.
    /// Un `Content-Length: 0` sur HEAD n'empêche donc pas le GET.
    pub fn transfer_mode(&self) -> TransferMode {
        match self.size {
            Some(size) if size > 0 && self.accept_ranges => TransferMode::Chunked,
            _ => TransferMode::SingleStream,
        }
    }
}

/// Intervalle d'octets, bornes inclusives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[inline]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Valeur de l'en‑tête `Range`
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Représente un intervalle (chunk) d'un téléchargement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub range: Option<ByteRange>,
    /// taille attendue du fichier de chunk une fois complet
    pub expected_len: Option<u64>,
    pub path: PathBuf, // fichier de cache associé à ce segment
}

impl Chunk {
    /// Chunk couvrant toute la ressource, sans en‑tête `Range`.
    pub fn whole(path: PathBuf, expected_len: Option<u64>) -> Self {
        Self {
            index: 0,
            range: None,
            expected_len,
            path,
        }
    }
}

/// Nom de fichier d'un chunk dans son répertoire de cache
pub fn chunk_file_name(index: usize) -> String {
    format!("chunk-{}", index)
}

/// Découpe une ressource de taille connue en chunks de taille fixe.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlanner {
    chunk_size: u64,
}

impl ChunkPlanner {
    pub fn new(chunk_size: u64) -> Self {
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Génère les segments à partir de la taille totale.
    ///
    /// Contrats:
    /// - Retourne un vecteur vide si `size == 0`.
    /// - Échoue avec `DownloadError::Plan` si `chunk_size == 0`.
    /// - Les bornes `start`/`end` sont inclusives et continues sans trou ni chevauchement.
    /// - Le dernier segment absorbe le reste au lieu d'être redécoupé.
    pub fn plan(&self, size: u64, dir: &Path) -> Result<Vec<Chunk>, DownloadError> {
        if self.chunk_size == 0 {
            return Err(DownloadError::Plan("chunk_size doit être > 0".into()));
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let estimated_chunks = size.div_ceil(self.chunk_size) as usize;
        let mut chunks = Vec::with_capacity(estimated_chunks);
        let mut start = 0;
        let mut i = 0;

        while start < size {
            let end = start.saturating_add(self.chunk_size - 1).min(size - 1);
            let range = ByteRange { start, end };
            chunks.push(Chunk {
                index: i,
                range: Some(range),
                expected_len: Some(range.len()),
                path: dir.join(chunk_file_name(i)),
            });
            i += 1;
            start = end + 1;
        }

        Ok(chunks)
    }
}
