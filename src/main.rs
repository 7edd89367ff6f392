use anyhow::{Context, Result, bail};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rustyflow::catalog::ModuleCatalog;
use rustyflow::config::EditorConfig;
use rustyflow::editor::{EditorState, Normalized};
use rustyflow::layout::CharWidthMeasurer;

#[derive(Parser, Debug)]
#[command(author, version, about = "Normalize and lay out dataflow graph documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a graph, drop dangling wires and print the normalized document
    Normalize {
        #[command(flatten)]
        input: Input,
        /// Write the result here instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<Utf8PathBuf>,
    },
    /// Lay out the inner modules of a combined module and print the layout as JSON
    Layout {
        #[command(flatten)]
        input: Input,
        /// Position of the combined module (defaults to the first one)
        #[arg(long, value_name = "INDEX")]
        combined: Option<usize>,
        /// Glyph width used to measure module titles
        #[arg(long, value_name = "W", default_value_t = 7.0)]
        char_width: f64,
    },
    /// Import a graph and report what normalization changed
    Check {
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Args, Debug)]
struct Input {
    /// Graph document (JSON)
    #[arg(value_name = "DOC")]
    doc: Utf8PathBuf,
    /// Module catalog (JSON object of type name to terminal definitions)
    #[arg(long, value_name = "FILE")]
    catalog: Option<Utf8PathBuf>,
    /// Editor configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<Utf8PathBuf>,
}

impl Input {
    fn load(&self) -> Result<(EditorState, Normalized)> {
        let config = match &self.config {
            Some(path) => EditorConfig::load(path)?,
            None => EditorConfig::default(),
        };
        let catalog = match &self.catalog {
            Some(path) => ModuleCatalog::load(path)?,
            None => ModuleCatalog::new(),
        };
        let text = std::fs::read_to_string(&self.doc)
            .with_context(|| format!("Open {}", self.doc))?;
        let mut state = EditorState::new(config).with_catalog(catalog);
        let normalized = state
            .import_json(&text)
            .with_context(|| format!("Failed to import {}", self.doc))?;
        Ok((state, normalized))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Normalize { input, out } => {
            let (state, _) = input.load()?;
            match out {
                Some(path) => state.export().save_json(&path)?,
                None => println!("{}", state.export_json()?),
            }
        }
        Command::Layout {
            input,
            combined,
            char_width,
        } => {
            let (state, _) = input.load()?;
            let index = match combined {
                Some(index) => index,
                None => match state.combined_modules().first() {
                    Some(&index) => index,
                    None => bail!("{} has no combined module", input.doc),
                },
            };
            let Some(layout) =
                state.layout_combined(index, &CharWidthMeasurer::new(char_width))
            else {
                bail!("module {} is not a combined module", index);
            };
            println!("{}", serde_json::to_string_pretty(&layout)?);
        }
        Command::Check { input } => {
            let (state, normalized) = input.load()?;
            let graph = state.graph();
            println!("modules: {}", graph.len());
            println!("wires: {}", graph.wires().len());
            println!(
                "dropped: {} ({} orphaned, {} dangling, {} duplicate)",
                normalized.dropped(),
                normalized.orphaned,
                normalized.dangling,
                normalized.duplicates
            );
        }
    }
    Ok(())
}
