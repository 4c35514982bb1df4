//! Téléchargement d'une ressource HTTP(S) par requêtes `Range` parallèles,
//! avec reprise des chunks déjà complets d'une exécution à l'autre.
pub mod config;
pub mod downloader;
