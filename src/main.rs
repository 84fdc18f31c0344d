//! CardLens - trading card recognition from camera frames
//!
//! Detects a card, rectifies it and resolves it against a local catalog.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use card_lens::config::{self, AppConfig};
use card_lens::scan::{ManualTextReader, ScanSession};
use card_lens::storage::{self, CardCatalog, SqliteCatalog};
use card_lens::vision::{CardQuadrilateralDetector, ContourRectangleDetector, ImageRectifier};
use card_lens::{CardResolver, ResolveInput};

/// CardLens - identify trading cards from photos
#[derive(Parser, Debug)]
#[command(name = "card-lens")]
#[command(about = "Detect, rectify and identify trading cards")]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog database (overrides the configured path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a JSON card list into the catalog
    Import {
        /// JSON array of cards
        cards: PathBuf,
    },
    /// Resolve card fields against the catalog
    Resolve(CardFields),
    /// Detect the card quadrilateral in an image
    Detect {
        image: PathBuf,
    },
    /// Detect and rectify the card in an image
    Rectify {
        image: PathBuf,
        /// Output image path
        out: PathBuf,
    },
    /// Detect, rectify and resolve with manually entered fields
    Scan {
        image: PathBuf,
        /// Save the rectified card here
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        fields: CardFields,
    },
}

/// Card fields as read off the card
#[derive(ClapArgs, Debug, Clone)]
struct CardFields {
    /// Card name
    #[arg(long)]
    name: Option<String>,
    /// Set code
    #[arg(long)]
    set: Option<String>,
    /// Collector number
    #[arg(long)]
    number: Option<String>,
    /// Language tag
    #[arg(long)]
    language: Option<String>,
}

impl From<CardFields> for ResolveInput {
    fn from(fields: CardFields) -> Self {
        ResolveInput {
            language: fields.language,
            set_code: fields.set,
            number: fields.number,
            name_hint: fields.name,
            ocr_confidence: None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_or_create_config(args.config.as_deref());

    match args.command {
        Command::Import { cards } => {
            let catalog = open_catalog(&config, args.catalog.as_deref())?;
            let cards = storage::load_cards(&cards)
                .with_context(|| format!("Failed to load card list {:?}", cards))?;
            let count = catalog.insert_cards(&cards)?;
            println!("Imported {} cards ({} total)", count, catalog.card_count()?);
        }
        Command::Resolve(fields) => {
            let catalog = Arc::new(open_catalog(&config, args.catalog.as_deref())?);
            let resolver = CardResolver::with_config(catalog, config.resolver);
            let resolution = resolver.resolve(&fields.into()).await?;
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Command::Detect { image } => {
            let frame = open_image(&image)?;
            let quad = build_detector(&config).detect(&frame).await;
            println!("{}", serde_json::to_string_pretty(&quad)?);
        }
        Command::Rectify { image, out } => {
            let frame = open_image(&image)?;
            let quad = build_detector(&config)
                .detect(&frame)
                .await
                .context("No card found in image")?;
            let rectified = ImageRectifier::with_config(config.rectify)
                .rectify(&frame, &quad)
                .context("Card could not be rectified")?;
            rectified
                .save(&out)
                .with_context(|| format!("Failed to write {:?}", out))?;
            info!("Rectified card written to {:?}", out);
        }
        Command::Scan { image, out, fields } => {
            let frame = open_image(&image)?;
            let catalog = Arc::new(open_catalog(&config, args.catalog.as_deref())?);
            let names = catalog.card_names()?;

            let session = ScanSession::new(
                build_detector(&config),
                ImageRectifier::with_config(config.rectify),
                Arc::new(ManualTextReader::new(fields.into())),
                CardResolver::with_config(catalog as Arc<dyn CardCatalog>, config.resolver),
            )
            .with_vocabulary(names, config.matching);

            let (outcome, rectified) = session.scan_frame(&frame).await?;
            if let Some(out) = out {
                match rectified {
                    Some(card) => {
                        card.save(&out)
                            .with_context(|| format!("Failed to write {:?}", out))?;
                        info!("Rectified card written to {:?}", out);
                    }
                    None => info!("No rectified card, nothing written to {:?}", out),
                }
            }
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(explicit: Option<&Path>) -> AppConfig {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => storage::get_config_dir()
            .ok()
            .map(|dir| dir.join(config::CONFIG_FILE_NAME)),
    };

    if let Some(path) = path {
        if path.exists() {
            match config::load_config(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    return config;
                }
                Err(e) => tracing::warn!("Ignoring invalid configuration {:?}: {}", path, e),
            }
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}

fn open_catalog(config: &AppConfig, explicit: Option<&Path>) -> Result<SqliteCatalog> {
    let path = match explicit.or(config.catalog.database_path.as_deref()) {
        Some(path) => path.to_path_buf(),
        None => storage::default_catalog_path()?,
    };
    SqliteCatalog::open(&path).with_context(|| format!("Failed to open catalog {:?}", path))
}

fn open_image(path: &Path) -> Result<image::DynamicImage> {
    image::open(path).with_context(|| format!("Failed to load image: {:?}", path))
}

fn build_detector(config: &AppConfig) -> CardQuadrilateralDetector {
    let backend = ContourRectangleDetector::new(config.detection.min_area_fraction);
    CardQuadrilateralDetector::with_request(Arc::new(backend), config.detection.request)
}
