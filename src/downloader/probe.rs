use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH};
use reqwest::Client;
use tracing::info;
use crate::downloader::types::Resource;
use crate::downloader::DownloadError;

/// Sonde la ressource par une requête HEAD: taille totale et support des plages.
pub async fn probe(client: &Client, url: &str) -> Result<Resource, DownloadError> {
    let resp = client.head(url).send().await.map_err(|e| DownloadError::Probe {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::Probe {
            url: url.to_string(),
            reason: format!("statut HTTP {}", status),
        });
    }

    // Pas de `Response::content_length()` ici: sur une réponse HEAD elle décrit
    // le corps (vide), pas la ressource.
    let size = content_length(resp.headers());
    let accept_ranges = accepts_ranges(resp.headers());

    info!(url, ?size, accept_ranges, "ressource sondée");
    Ok(Resource {
        url: url.to_string(),
        size,
        accept_ranges,
    })
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

fn accepts_ranges(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .is_some_and(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
}
