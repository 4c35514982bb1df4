//! Coordination du téléchargement parallèle des chunks.
//!
//! Rôle:
//! - Lancer au plus `min(workers, chunks)` tâches qui tirent les chunks d'une file partagée.
//! - Sauter les chunks déjà complets sur disque (reprise), télécharger les autres.
//! - Agréger deux flux d'événements: un tick par chunk terminé, et les erreurs fatales.
//!
//! La première erreur interrompt la session: plus aucun chunk n'est distribué,
//! mais les requêtes déjà parties ne sont pas arrachées; elles terminent ou
//! échouent en arrière‑plan et leurs événements sont ignorés.
use std::collections::VecDeque;
use std::sync::Arc;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::downloader::fetcher::fetch_chunk;
use crate::downloader::store::ChunkStore;
use crate::downloader::types::Chunk;
use crate::downloader::{ChunkDone, DownloadError, Outcome};

/// File de travail partagée: chaque chunk n'est remis qu'à un seul worker.
struct WorkQueue {
    chunks: Mutex<VecDeque<Chunk>>,
    cancel: CancellationToken,
}

impl WorkQueue {
    fn new(chunks: Vec<Chunk>, cancel: CancellationToken) -> Self {
        Self {
            chunks: Mutex::new(chunks.into()),
            cancel,
        }
    }

    async fn pull(&self) -> Option<Chunk> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.chunks.lock().await.pop_front()
    }
}

pub struct DownloadManager {
    client: Client,
    url: Arc<str>,
}

impl DownloadManager {
    /// Initialise un nouveau gestionnaire de téléchargement
    pub fn new(client: Client, url: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Démarre les workers sur `chunks` et retourne immédiatement.
    ///
    /// Doit être appelé depuis un runtime tokio. Annuler `cancel` arrête la
    /// distribution de nouveaux chunks et fait échouer `DownloadHandle::wait`
    /// avec `DownloadError::Cancelled`.
    pub fn run(&self, chunks: Vec<Chunk>, workers: usize, cancel: &CancellationToken) -> DownloadHandle {
        let total = chunks.len();
        let workers = workers.min(total);
        let cancel = cancel.child_token();

        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let queue = Arc::new(WorkQueue::new(chunks, cancel.clone()));

        info!(url = %self.url, chunks = total, workers, "démarrage des workers");
        for id in 0..workers {
            tokio::spawn(worker(
                id,
                self.client.clone(),
                self.url.clone(),
                queue.clone(),
                done_tx.clone(),
                err_tx.clone(),
            ));
        }

        DownloadHandle {
            done_rx,
            err_rx,
            total,
            workers,
            cancel,
        }
    }
}

async fn worker(
    id: usize,
    client: Client,
    url: Arc<str>,
    queue: Arc<WorkQueue>,
    done_tx: mpsc::UnboundedSender<ChunkDone>,
    err_tx: mpsc::UnboundedSender<DownloadError>,
) {
    while let Some(chunk) = queue.pull().await {
        match process_chunk(&client, &url, &chunk).await {
            Ok(skipped) => {
                let _ = done_tx.send(ChunkDone {
                    index: chunk.index,
                    skipped,
                });
            }
            Err(e) => {
                warn!(worker = id, chunk = chunk.index, "arrêt du worker: {}", e);
                let _ = err_tx.send(e);
                return;
            }
        }
    }
    debug!(worker = id, "plus de chunk à traiter");
}

/// Retourne `true` si le chunk était déjà complet et n'a pas été téléchargé.
async fn process_chunk(client: &Client, url: &str, chunk: &Chunk) -> Result<bool, DownloadError> {
    if ChunkStore::is_complete(chunk).await? {
        debug!(chunk = chunk.index, "chunk déjà présent, ignoré");
        return Ok(true);
    }

    // réserve l'emplacement avant le réseau; le corps arrive par `.part`
    ChunkStore::create(chunk).await?;
    fetch_chunk(client, url, chunk).await?;
    Ok(false)
}

/// Session en cours: les deux flux d'événements des workers.
pub struct DownloadHandle {
    done_rx: mpsc::UnboundedReceiver<ChunkDone>,
    err_rx: mpsc::UnboundedReceiver<DownloadError>,
    total: usize,
    workers: usize,
    cancel: CancellationToken,
}

impl DownloadHandle {
    /// Nombre de workers réellement lancés.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Nombre de chunks du plan.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Expose les flux bruts (ticks, erreurs) pour un appelant qui veut
    /// piloter lui‑même la boucle de réception.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<ChunkDone>,
        mpsc::UnboundedReceiver<DownloadError>,
    ) {
        (self.done_rx, self.err_rx)
    }

    /// Attend la fin de la session.
    ///
    /// `on_tick` est appelé une fois par chunk terminé, dans l'ordre d'arrivée
    /// (aucun ordre entre chunks n'est garanti). Retourne dès la première erreur.
    pub async fn wait<F>(mut self, mut on_tick: F) -> Result<Outcome, DownloadError>
    where
        F: FnMut(ChunkDone),
    {
        let mut outcome = Outcome::default();
        if self.total == 0 {
            return Ok(outcome);
        }

        loop {
            tokio::select! {
                biased;

                Some(err) = self.err_rx.recv() => {
                    self.cancel.cancel();
                    return Err(err);
                }
                _ = self.cancel.cancelled() => {
                    return Err(DownloadError::Cancelled);
                }
                done = self.done_rx.recv() => {
                    let Some(done) = done else {
                        // tous les workers sont partis sans finir ni signaler d'erreur
                        return Err(DownloadError::Incomplete {
                            completed: outcome.total(),
                            total: self.total,
                        });
                    };

                    if done.skipped {
                        outcome.skipped += 1;
                    } else {
                        outcome.fetched += 1;
                    }
                    on_tick(done);

                    if outcome.total() == self.total {
                        info!(fetched = outcome.fetched, skipped = outcome.skipped, "tous les chunks sont complets");
                        return Ok(outcome);
                    }
                }
            }
        }
    }
}
