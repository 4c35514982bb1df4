//! Fonctions utilitaires d'E/S pour la fusion des chunks.
//!
//! Objectifs:
//! - Fusionner des parties vers un fichier final en minimisant les appels système
//!   via des tampons de 1 MiB en lecture et écriture.
//! - Déplacer un chunk unique sans copie (renommage).
use std::fs::{self, File};
use std::path::Path;
use std::io::{self, BufReader, BufWriter, Write, Read};
use crate::downloader::DownloadError;

const BUFFER_SIZE: usize = 1 << 20; // 1 MiB

/// Concatène `parts` dans l'ordre donné vers `output`.
///
/// En cas d'échec, le fichier de sortie partiellement écrit est laissé en place
/// et les parties restent intactes.
pub fn merge_chunks(parts: &[&Path], output: &Path) -> Result<u64, DownloadError> {
    let out_file = File::create(output)
        .map_err(|e| DownloadError::merge(output, format!("création impossible: {}", e)))?;
    // Tampon de sortie plus grand pour réduire les appels système
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, out_file);

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut total = 0u64;
    for part in parts {
        let file = File::open(part).map_err(|e| {
            DownloadError::merge(output, format!("ouverture de {} impossible: {}", part.display(), e))
        })?;
        let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
        loop {
            let read_count = reader.read(&mut buffer).map_err(|e| {
                DownloadError::merge(output, format!("lecture de {} impossible: {}", part.display(), e))
            })?;
            if read_count == 0 { break; }
            writer.write_all(&buffer[..read_count]).map_err(|e| {
                DownloadError::merge(output, format!("écriture de {} impossible: {}", part.display(), e))
            })?;
            total += read_count as u64;
        }
    }

    writer
        .flush()
        .map_err(|e| DownloadError::merge(output, format!("écriture impossible: {}", e)))?;
    Ok(total)
}

/// Déplace `from` vers `to` par renommage. Si les deux chemins ne sont pas
/// sur le même système de fichiers, retombe sur copie + suppression.
pub fn move_file(from: &Path, to: &Path) -> Result<(), DownloadError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)
                .and_then(|_| fs::remove_file(from))
                .map_err(|e| DownloadError::merge(to, format!("copie de {} impossible: {}", from.display(), e)))
        }
        Err(e) => Err(DownloadError::merge(to, format!("renommage de {} impossible: {}", from.display(), e))),
    }
}
