//! Session de téléchargement d'une ressource HTTP unique.
//!
//! Cycle de vie: `open` (sonde + plan + cache) → `download` → `save_to` → `clean`.
//! En cas d'échec le cache n'est pas nettoyé, afin qu'une nouvelle session sur
//! la même URL reprenne les chunks déjà complets.
use std::path::{Path, PathBuf};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;
use crate::downloader::manager::{DownloadHandle, DownloadManager};
use crate::downloader::probe::probe;
use crate::downloader::store::ChunkStore;
use crate::downloader::types::{Chunk, ChunkPlanner, Resource, TransferMode};
use crate::downloader::utils::{merge_chunks, move_file};
use crate::downloader::{DownloadError, DownloadOptions};

pub struct HttpFile {
    client: Client,
    resource: Resource,
    mode: TransferMode,
    store: ChunkStore,
    chunks: Vec<Chunk>,
    workers: usize,
}

impl HttpFile {
    /// Sonde `url`, choisit le mode de transfert et prépare l'entrée de cache.
    pub async fn open(client: Client, url: &str, opts: &DownloadOptions) -> Result<Self, DownloadError> {
        if opts.workers == 0 {
            return Err(DownloadError::Plan("il faut au moins un worker".into()));
        }

        let resource = probe(&client, url).await?;
        let mode = resource.transfer_mode();
        let store = ChunkStore::new(&opts.cache_root, url);

        let chunks = match (mode, resource.size) {
            (TransferMode::Chunked, Some(size)) => {
                store.prepare(true).await?;
                ChunkPlanner::new(opts.chunk_size).plan(size, store.entry())?
            }
            _ => {
                // taille nulle: le GET peut quand même renvoyer un corps, on ne le borne pas
                store.prepare(false).await?;
                let expected = resource.size.filter(|&size| size > 0);
                vec![Chunk::whole(store.entry().to_path_buf(), expected)]
            }
        };

        info!(url, ?mode, chunks = chunks.len(), cache = %store.entry().display(), "session ouverte");
        Ok(Self {
            client,
            resource,
            mode,
            store,
            chunks,
            workers: opts.workers,
        })
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn cache_entry(&self) -> &Path {
        self.store.entry()
    }

    pub fn set_workers(&mut self, n: usize) -> Result<(), DownloadError> {
        if n < 1 {
            return Err(DownloadError::Plan("il faut au moins un worker".into()));
        }
        self.workers = n;
        Ok(())
    }

    /// Lance les workers; voir `DownloadHandle::wait` pour la suite.
    pub fn download(&self, cancel: &CancellationToken) -> DownloadHandle {
        DownloadManager::new(self.client.clone(), self.resource.url.as_str())
            .run(self.chunks.clone(), self.workers, cancel)
    }

    /// Reconstruit la ressource dans `dst` à partir des chunks, dans l'ordre du plan.
    ///
    /// Un plan d'un seul chunk est déplacé par renommage, sans copie.
    pub async fn save_to(&self, dst: impl AsRef<Path>) -> Result<(), DownloadError> {
        let dst = dst.as_ref().to_path_buf();
        let target = dst.clone();
        let parts: Vec<PathBuf> = self.chunks.iter().map(|c| c.path.clone()).collect();

        info!(dst = %dst.display(), chunks = parts.len(), "fusion des chunks");
        tokio::task::spawn_blocking(move || {
            if let [single] = parts.as_slice() {
                return move_file(single, &dst);
            }
            let parts: Vec<&Path> = parts.iter().map(|p| p.as_path()).collect();
            merge_chunks(&parts, &dst).map(|_| ())
        })
        .await
        .map_err(|e| DownloadError::merge(target, e))?
    }

    /// Supprime l'entrée de cache de la session.
    pub async fn clean(&self) -> Result<(), DownloadError> {
        self.store.clean().await
    }
}
