mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "spacerval";

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub include_images: bool,
    pub include_music: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            include_images: true,
            include_music: true,
        }
    }
}

/// Where the local installation keeps its database and media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    root: PathBuf,
}

impl LibraryPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Per-user persistent data directory for this platform.
    pub fn platform_default() -> Result<Self> {
        match dirs::data_dir() {
            Some(dir) => Ok(Self::new(dir.join(APP_DIR_NAME))),
            None => bail!("Could not determine the user data directory, use --data-dir"),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join("db.sqlite")
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.root.join("covers")
    }

    pub fn music_dir(&self) -> PathBuf {
        self.root.join("music")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub include_images: bool,
    pub include_music: bool,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub library: LibraryPaths,
    pub scratch_dir: Option<PathBuf>,
    pub include_images: bool,
    pub include_music: bool,
    pub archive_notes: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let library = match file.data_dir.map(PathBuf::from).or_else(|| cli.data_dir.clone()) {
            Some(dir) => {
                if dir.exists() && !dir.is_dir() {
                    bail!("data_dir is not a directory: {:?}", dir);
                }
                LibraryPaths::new(dir)
            }
            None => LibraryPaths::platform_default()?,
        };

        let scratch_dir = file.scratch_dir.map(PathBuf::from);
        if let Some(dir) = &scratch_dir {
            if dir.exists() && !dir.is_dir() {
                bail!("scratch_dir is not a directory: {:?}", dir);
            }
        }

        Ok(Self {
            library,
            scratch_dir,
            include_images: file.include_images.unwrap_or(cli.include_images),
            include_music: file.include_music.unwrap_or(cli.include_music),
            archive_notes: file.archive_notes.unwrap_or_default(),
        })
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            include_images: self.include_images,
            include_music: self.include_music,
            notes: self.archive_notes.clone(),
        }
    }
}
