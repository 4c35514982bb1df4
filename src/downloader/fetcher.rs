//! Téléchargement d'un chunk: une requête GET, éventuellement avec `Range`,
//! dont le corps est écrit en flux dans le fichier du chunk.
//!
//! Le corps est d'abord écrit dans `<chunk>.part`, sa longueur vérifiée,
//! synchronisé sur disque puis renommé sur le chemin définitif. Une écriture
//! interrompue ne peut donc jamais passer pour un chunk complet.
use futures::StreamExt;
use reqwest::header::RANGE;
use reqwest::Client;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use crate::downloader::store::ChunkStore;
use crate::downloader::types::Chunk;
use crate::downloader::DownloadError;

/// Télécharge `chunk` depuis `url`. Retourne le nombre d'octets écrits.
///
/// Aucune nouvelle tentative: toute erreur est remontée telle quelle au
/// coordinateur, qui la traite comme fatale.
pub async fn fetch_chunk(client: &Client, url: &str, chunk: &Chunk) -> Result<u64, DownloadError> {
    let index = chunk.index;
    let mut request = client.get(url);
    if let Some(range) = chunk.range {
        request = request.header(RANGE, range.header_value());
    }

    let resp = request
        .send()
        .await
        .map_err(|e| DownloadError::fetch(index, format!("requête impossible: {}", e)))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::fetch(index, format!("statut HTTP inattendu: {}", status)));
    }
    debug!(chunk = index, %status, "réponse reçue");

    let staging = ChunkStore::staging_path(chunk);
    let written = match write_body(resp, &staging, chunk).await {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&staging).await;
            return Err(e);
        }
    };

    fs::rename(&staging, &chunk.path)
        .await
        .map_err(|e| DownloadError::fetch(index, format!("renommage de {} impossible: {}", staging.display(), e)))?;

    debug!(chunk = index, bytes = written, "chunk écrit");
    Ok(written)
}

async fn write_body(
    resp: reqwest::Response,
    staging: &std::path::Path,
    chunk: &Chunk,
) -> Result<u64, DownloadError> {
    let index = chunk.index;
    let mut file = File::create(staging)
        .await
        .map_err(|e| DownloadError::fetch(index, format!("création de {} impossible: {}", staging.display(), e)))?;

    let mut stream = resp.bytes_stream();
    let mut written = 0u64;

    while let Some(item) = stream.next().await {
        let bytes = item.map_err(|e| DownloadError::fetch(index, format!("lecture du corps: {}", e)))?;
        written += bytes.len() as u64;

        // Un serveur qui ignore `Range` renvoie toute la ressource: inutile de continuer.
        if let Some(expected) = chunk.expected_len {
            if written > expected {
                return Err(DownloadError::fetch(
                    index,
                    format!("corps trop long: plus de {} octets attendus", expected),
                ));
            }
        }

        file.write_all(&bytes)
            .await
            .map_err(|e| DownloadError::fetch(index, format!("écriture impossible: {}", e)))?;
    }

    if let Some(expected) = chunk.expected_len {
        if written != expected {
            return Err(DownloadError::fetch(
                index,
                format!("corps tronqué: {} octets reçus sur {}", written, expected),
            ));
        }
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::fetch(index, format!("écriture impossible: {}", e)))?;
    file.sync_all()
        .await
        .map_err(|e| DownloadError::fetch(index, format!("fsync impossible: {}", e)))?;

    Ok(written)
}
