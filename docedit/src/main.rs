//! docedit - inspect the outline and blocks of a markdown-seeded document

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docedit_core::outline::{outline_of, render_outline};
use docedit_core::{
    seed, Block, BlockView, Config, DocumentModel, EditorDocument, HeadingLevel,
    MalformedTagPolicy, OutlineEntry,
};
use std::path::{Path, PathBuf};

/// Headless document editor tools
#[derive(Parser, Debug)]
#[command(name = "docedit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Read configuration from this file instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the heading outline
    Outline {
        /// Markdown file to seed the document with (defaults to the configured initial content)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// How to treat heading tags other than h1..h6 (overrides the config)
        #[arg(long, value_enum, value_name = "POLICY")]
        on_malformed: Option<OnMalformed>,
    },
    /// Print the blocks the document was seeded with
    Blocks {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Reprint the outline every time the file changes
    #[cfg(feature = "watch")]
    Watch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OnMalformed {
    Fail,
    Skip,
    /// Treat the heading as level 1
    Default,
}

impl From<OnMalformed> for MalformedTagPolicy {
    fn from(value: OnMalformed) -> Self {
        match value {
            OnMalformed::Fail => MalformedTagPolicy::Fail,
            OnMalformed::Skip => MalformedTagPolicy::Skip,
            OnMalformed::Default => MalformedTagPolicy::DefaultLevel(HeadingLevel::H1),
        }
    }
}

/// The command-line flag wins over `outline.on_malformed_tag`
fn malformed_policy(config: &Config, flag: Option<OnMalformed>) -> MalformedTagPolicy {
    flag.map_or(config.outline.on_malformed_tag, MalformedTagPolicy::from)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    match args.command {
        Command::Outline {
            file,
            format,
            on_malformed,
        } => {
            let doc = open_document(&config, file.as_deref())?;
            let policy = malformed_policy(&config, on_malformed);
            log::debug!("malformed heading policy: {policy:?}");
            let outline = outline_of(&doc, policy)
                .context("Failed to extract outline")?;
            print_outline(&outline, format, config.outline.indent_width)
        }
        Command::Blocks { file, format } => {
            let doc = open_document(&config, file.as_deref())?;
            print_blocks(doc.children()?, format)
        }
        #[cfg(feature = "watch")]
        Command::Watch { file } => watch::run(&config, &file),
    }
}

/// Seed a fresh document from `file`, or from the configured initial content
fn open_document(config: &Config, file: Option<&Path>) -> Result<EditorDocument> {
    let mut doc = EditorDocument::new();
    match file {
        Some(path) => {
            let source = read_source(path)?;
            seed(&mut doc, Some(source.as_str()))?;
        }
        None => {
            seed(&mut doc, config.document.initial_source())?;
        }
    }
    log::debug!("document opened with {} blocks", doc.children()?.len());
    Ok(doc)
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))
}

fn print_outline(outline: &[OutlineEntry], format: Format, indent_width: usize) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(outline)?),
        Format::Text if outline.is_empty() => println!("No headings found"),
        Format::Text => print!("{}", render_outline(outline, indent_width)),
    }
    Ok(())
}

fn print_blocks(blocks: &[Block], format: Format) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(blocks)?),
        Format::Text => {
            for (index, block) in blocks.iter().enumerate() {
                let kind = block.heading_tag().unwrap_or("p");
                println!("{index}\t{kind}\t{block}");
            }
        }
    }
    Ok(())
}

#[cfg(feature = "watch")]
mod watch {
    use super::*;
    use docedit_core::watcher::FileWatcher;
    use docedit_core::OutlinePanel;
    use std::rc::Rc;
    use std::time::Duration;

    pub fn run(config: &Config, file: &Path) -> Result<()> {
        if !config.watch.enabled {
            anyhow::bail!("File watching is disabled in the configuration");
        }

        let watcher = FileWatcher::new(file, Duration::from_millis(config.watch.debounce_ms))?;
        let mut doc = EditorDocument::new();

        let (panel, _panel_subscription) =
            OutlinePanel::attach(&mut doc, config.outline.on_malformed_tag);
        log::info!(
            "watching {} (malformed heading policy: {:?})",
            watcher.path().display(),
            panel.borrow().policy()
        );

        // Subscribed after the panel, so it always prints the refreshed outline
        let printer_panel = Rc::clone(&panel);
        let indent_width = config.outline.indent_width;
        let _printer_subscription = doc.subscribe(move |_| {
            let panel = printer_panel.borrow();
            println!("--- outline (generation {}) ---", panel.generation());
            if let Err(err) = print_outline(panel.entries(), Format::Text, indent_width) {
                log::warn!("failed to print outline: {err}");
            }
        });

        let source = read_source(watcher.path())?;
        seed(&mut doc, Some(source.as_str()))?;

        while watcher.wait_for_change() {
            match read_source(watcher.path()) {
                Ok(source) => {
                    seed(&mut doc, Some(source.as_str()))?;
                }
                Err(err) => log::warn!("skipping reload: {err:#}"),
            }
        }

        Ok(())
    }
}
