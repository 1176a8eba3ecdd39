use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spacerval::archive::{ArchiveReader, CatalogExporter, CatalogImporter};
use spacerval::catalog_store::{CatalogStore, SqliteCatalogStore};
use spacerval::config::{AppConfig, CliConfig, FileConfig};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(version, about = "Personal media catalog with portable archives")]
struct CliArgs {
    /// Directory holding the catalog database and its media.
    /// Defaults to the platform's per-user data directory.
    #[clap(long, global = true, value_parser = parse_path)]
    pub data_dir: Option<PathBuf>,

    /// Optional TOML config file. Its values override command line flags.
    #[clap(long, global = true, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Writes the whole catalog into a new archive inside the target directory.
    Export {
        #[clap(value_parser = parse_path)]
        target_dir: PathBuf,

        /// Leave cover images out of the archive.
        /// `include_images` in the --config file takes precedence over this flag.
        #[clap(long)]
        no_images: bool,

        /// Leave background music out of the archive.
        /// `include_music` in the --config file takes precedence over this flag.
        #[clap(long)]
        no_music: bool,
    },

    /// Adds the entries of an archive to the catalog, skipping titles that
    /// already exist.
    Import {
        #[clap(value_parser = parse_path)]
        archive: PathBuf,
    },

    /// Shows all entries, newest first.
    List,

    /// Shows every tag in use.
    Tags,

    /// Deletes an entry and its cover image.
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };

    let (include_images, include_music) = match &cli_args.command {
        Command::Export {
            no_images,
            no_music,
            ..
        } => (!no_images, !no_music),
        _ => (true, true),
    };
    let cli_config = CliConfig {
        data_dir: cli_args.data_dir.clone(),
        include_images,
        include_music,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    // Opening the store creates an empty database, which must not happen on export.
    if matches!(cli_args.command, Command::Export { .. }) && !config.library.db_path().is_file() {
        bail!(
            "No catalog database at {:?}, nothing to export",
            config.library.db_path()
        );
    }

    info!(
        "Opening catalog database at {:?}...",
        config.library.db_path()
    );
    let store = Arc::new(SqliteCatalogStore::new(config.library.db_path())?);

    match cli_args.command {
        Command::Export { target_dir, .. } => {
            let settings = config.export_settings();
            let exporter = CatalogExporter::new(store).with_notes(settings.notes);
            let archive = exporter
                .export(&target_dir, settings.include_images, settings.include_music)
                .await?;
            println!("{}", archive.display());
        }
        Command::Import { archive } => {
            let importer = CatalogImporter::new(
                store,
                config.library.covers_dir(),
                config.library.music_dir(),
            )
            .with_reader(ArchiveReader::new(config.scratch_dir.clone()));
            match importer.import(&archive).await {
                Ok(summary) => {
                    println!("{}", summary.message);
                    for (old_id, new_id) in summary.id_remap.iter() {
                        println!("  {} -> {}", old_id, new_id);
                    }
                }
                Err(e) => {
                    error!("Import of {:?} failed: {}", archive, e);
                    println!("Import failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::List => {
            for record in store.list_all()? {
                if record.tags.is_empty() {
                    println!("{:>6}  {}", record.id, record.title);
                } else {
                    println!(
                        "{:>6}  {}  [{}]",
                        record.id,
                        record.title,
                        record.tags.join(", ")
                    );
                }
            }
        }
        Command::Tags => {
            for tag in store.all_tags()? {
                println!("{}", tag);
            }
        }
        Command::Delete { id } => {
            if store.delete(id)? {
                println!("Deleted entry {}", id);
            } else {
                println!("No entry with id {}", id);
            }
        }
    }

    Ok(())
}
