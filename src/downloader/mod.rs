//! Téléchargeur HTTP segmenté avec reprise.
//!
//! Ce module regroupe:
//! - **types**: ressource sondée, segments (`Chunk`) et leur planification.
//! - **store**: emplacement des chunks dans le cache et test de reprise.
//! - **probe**: requête HEAD (taille, support des plages).
//! - **fetcher**: téléchargement d'un chunk, en flux, vers son fichier.
//! - **manager**: pool de workers et agrégation des événements.
//! - **utils**: fusion des chunks vers le fichier final.
//! - **http_file**: session complète sonde → plan → téléchargement → fusion → nettoyage.
//!
//! Conception:
//! - Un chunk est tout ou rien: seuls les chunks complets sont repris d'une exécution à l'autre.
//! - Toute erreur sur un chunk est fatale à la session; aucune nouvelle tentative.
//! - En cas d'échec le cache reste en place pour la prochaine exécution.
pub mod fetcher;
pub mod http_file;
pub mod manager;
pub mod params;
pub mod probe;
pub mod store;
pub mod types;
pub mod utils;

pub use http_file::HttpFile;
pub use manager::{DownloadHandle, DownloadManager};
pub use params::{ChunkDone, DownloadError, DownloadOptions, Outcome, DEFAULT_CHUNK_SIZE, DEFAULT_WORKERS};
pub use types::{ByteRange, Chunk, ChunkPlanner, Resource, TransferMode};

use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Télécharge `url` vers `output` avec les options par défaut.
///
/// # Exemple
/// ```no_run
/// use httpfile::downloader;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// downloader::download_to("https://example.com/file.iso", "file.iso").await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_to(url: impl AsRef<str>, output: impl AsRef<Path>) -> Result<Outcome, DownloadError> {
    download_with_options(
        url,
        output,
        &DownloadOptions::default(),
        &CancellationToken::new(),
        None::<fn(&HttpFile, ChunkDone)>,
    )
    .await
}

/// Télécharge une URL avec un callback appelé à chaque chunk terminé.
pub async fn download_with_progress<F>(
    url: impl AsRef<str>,
    output: impl AsRef<Path>,
    on_progress: F,
) -> Result<Outcome, DownloadError>
where
    F: FnMut(&HttpFile, ChunkDone),
{
    download_with_options(
        url,
        output,
        &DownloadOptions::default(),
        &CancellationToken::new(),
        Some(on_progress),
    )
    .await
}

/// Télécharge une URL avec des options personnalisées, un jeton d'annulation
/// et un callback optionnel de progression.
///
/// Le nettoyage du cache n'a lieu qu'après une fusion réussie.
///
/// # Exemple
/// ```no_run
/// use httpfile::downloader::{self, DownloadOptions};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = DownloadOptions {
///     workers: 8,
///     chunk_size: 4 * 1024 * 1024,
///     ..DownloadOptions::default()
/// };
///
/// downloader::download_with_options(
///     "https://example.com/file.iso",
///     "file.iso",
///     &options,
///     &CancellationToken::new(),
///     Some(|file: &downloader::HttpFile, done: downloader::ChunkDone| {
///         println!("chunk {} / {}", done.index, file.chunks().len());
///     }),
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub async fn download_with_options<F>(
    url: impl AsRef<str>,
    output: impl AsRef<Path>,
    options: &DownloadOptions,
    cancel: &CancellationToken,
    mut on_progress: Option<F>,
) -> Result<Outcome, DownloadError>
where
    F: FnMut(&HttpFile, ChunkDone),
{
    let client = options.build_client()?;
    let file = HttpFile::open(client, url.as_ref(), options).await?;

    let outcome = file
        .download(cancel)
        .wait(|done| {
            if let Some(callback) = on_progress.as_mut() {
                callback(&file, done);
            }
        })
        .await?;

    file.save_to(output.as_ref()).await?;
    file.clean().await?;

    info!(
        url = url.as_ref(),
        output = %output.as_ref().display(),
        fetched = outcome.fetched,
        skipped = outcome.skipped,
        "téléchargement terminé"
    );
    Ok(outcome)
}
