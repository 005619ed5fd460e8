mod app;
mod components;
mod event;
mod handler;
mod tui;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use simplelog::WriteLogger;

use notebook_tree::config::{AppConfig, GeneralConfig, LogConfig, NotebookConfig};
use notebook_tree::error::{Result, TreeError};
use notebook_tree::notebook::Library;

use crate::app::App;
use crate::event::{Event, EventHandler};
use crate::tui::{install_panic_hook, Tui};

/// Browse and organize the folders of one or more notebooks.
#[derive(Parser, Debug)]
#[command(name = "nbtree", version, about)]
struct Cli {
    /// Notebook root folders (defaults to the configured notebooks, then the current directory)
    paths: Vec<PathBuf>,

    /// Path to a config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the log here instead of the cache directory
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Delete and reload without asking first
    #[arg(long)]
    no_confirm: bool,
}

impl Cli {
    /// Settings given on the command line, layered over every config file.
    fn overrides(&self) -> AppConfig {
        let mut overrides = AppConfig::default();
        if self.no_confirm {
            overrides.general = GeneralConfig {
                confirm_delete: Some(false),
                confirm_reload: Some(false),
            };
        }
        overrides.log = LogConfig {
            level: None,
            file: self.log_file.as_ref().map(|p| p.display().to_string()),
        };
        if !self.paths.is_empty() {
            overrides.notebooks = Some(
                self.paths
                    .iter()
                    .map(|p| NotebookConfig {
                        name: None,
                        path: p.display().to_string(),
                    })
                    .collect(),
            );
        }
        overrides
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let path = config.log_file();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    WriteLogger::init(
        config.log_level(),
        simplelog::Config::default(),
        File::create(&path)?,
    )
    .map_err(|e| TreeError::Terminal(format!("Failed to start logging: {}", e)))
}

fn notebook_name(entry: &NotebookConfig, path: &Path) -> String {
    entry.name.clone().unwrap_or_else(|| {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    })
}

/// Register every configured notebook that exists, falling back to the
/// current directory when none is configured.
fn build_library(config: &AppConfig) -> Result<Library> {
    let mut entries = config.notebooks().to_vec();
    if entries.is_empty() {
        entries.push(NotebookConfig {
            name: None,
            path: ".".to_string(),
        });
    }

    let mut library = Library::new();
    for entry in &entries {
        let path = PathBuf::from(&entry.path).canonicalize().map_err(|_| {
            TreeError::InvalidPath(format!("{} does not exist", entry.path))
        });
        let added = path.and_then(|p| library.add_notebook(&notebook_name(entry, &p), &p));
        if let Err(e) = added {
            log::warn!("Skipping notebook {}: {}", entry.path, e);
        }
    }

    if library.notebooks().next().is_none() {
        return Err(TreeError::InvalidPath(
            "none of the notebook folders could be opened".into(),
        ));
    }
    Ok(library)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), Some(&cli.overrides()));

    init_logging(&config)?;
    let library = build_library(&config)?;
    log::info!(
        "Starting with {} notebook(s)",
        library.notebooks().count()
    );

    install_panic_hook();

    let mut tui = Tui::new()?;
    let mut app = App::new(library, config);
    let mut events = EventHandler::new(Duration::from_millis(100));

    while !app.should_quit {
        tui.draw(&mut app)?;

        match events.next().await? {
            Event::Key(key) => handler::handle_key_event(&mut app, key),
            Event::Tick => app.clear_expired_status(),
            Event::Resize => {}
        }
    }

    tui.restore()?;
    Ok(())
}
