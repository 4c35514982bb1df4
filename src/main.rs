//! Outil en ligne de commande: télécharge une URL vers un fichier local.
//!
//! Étapes:
//! 1. Charger la configuration (fichier TOML puis options de la ligne de commande).
//! 2. Télécharger via `downloader::download_with_options`, avec une barre de progression par chunk.
//! 3. Ctrl‑C annule la session; le cache reste en place pour reprendre plus tard.
use std::path::PathBuf;
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use httpfile::config::Config;
use httpfile::downloader::{self, ChunkDone, HttpFile};

const PB_STYLE: &str = "{spinner:.blue} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} chunks ({eta})";

#[derive(Debug, Parser)]
#[command(name = "httpfile", version, about = "Téléchargement HTTP segmenté avec reprise")]
struct Cli {
    /// URL à télécharger
    #[arg(short = 'u', long = "url")]
    url: String,

    /// Fichier de sortie (par défaut: dernier segment du chemin de l'URL)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Nombre de workers en parallèle
    #[arg(short = 'w', long = "workers")]
    workers: Option<usize>,

    /// Taille d'un chunk en octets
    #[arg(long = "chunk-size")]
    chunk_size: Option<u64>,

    /// Racine du cache des chunks
    #[arg(long = "cache-dir")]
    cache_dir: Option<PathBuf>,

    /// Fichier de configuration TOML
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match self.config.as_ref().cloned().or_else(Config::default_path) {
            Some(path) => Config::load(&path)?,
            None => Config::default(),
        };

        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = Some(cache_dir.clone());
        }
        Ok(config)
    }

    fn output_path(&self) -> Result<PathBuf> {
        if let Some(output) = &self.output {
            return Ok(output.clone());
        }
        let url = url::Url::parse(&self.url).with_context(|| format!("URL invalide: {}", self.url))?;
        let name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("index.html");
        Ok(PathBuf::from(name))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("httpfile=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::no_length();
    if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
        pb.set_style(style);
    }
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let output = cli.output_path()?;
    let options = config.download_options();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interruption reçue, arrêt de la distribution des chunks");
            interrupt.cancel();
        }
    });

    let pb = progress_bar();
    let result = downloader::download_with_options(
        &cli.url,
        &output,
        &options,
        &cancel,
        Some(|file: &HttpFile, _done: ChunkDone| {
            pb.set_length(file.chunks().len() as u64);
            pb.inc(1);
        }),
    )
    .await;

    match result {
        Ok(outcome) => {
            pb.finish_with_message("terminé");
            println!(
                "{} -> {} ({} chunks téléchargés, {} repris)",
                cli.url,
                output.display(),
                outcome.fetched,
                outcome.skipped
            );
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            Err(e).with_context(|| format!("échec du téléchargement de {}", cli.url))
        }
    }
}
