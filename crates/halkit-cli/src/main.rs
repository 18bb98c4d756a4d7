//! hal — build and inspect HAL+JSON documents from the command line.
//!
//! Commands: build, inspect, embedded, completions

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use halkit_core::{LinkOption, Resource};
use serde_json::{json, Value};
use tracing::Level;

#[derive(Parser)]
#[command(name = "hal")]
#[command(version)]
#[command(about = "Build and inspect HAL+JSON documents")]
struct Cli {
    /// Log more (-v debug, -vv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Build a HAL document and print it
    Build {
        /// Request URI used as the `self` link
        #[arg(long = "self-href", value_name = "URI")]
        self_href: Option<String>,
        /// Target of the `next` link, repeatable (last one wins)
        #[arg(long, value_name = "HREF")]
        next: Vec<String>,
        /// Target of the `prev` link, repeatable (last one wins)
        #[arg(long, value_name = "HREF")]
        prev: Vec<String>,
        /// Embedded sub-resource, repeatable
        #[arg(long = "embed", value_name = "KEY=JSON", value_parser = parse_key_json)]
        embeds: Vec<(String, Value)>,
        /// Extra top-level field, repeatable
        #[arg(long = "extra", value_name = "KEY=JSON", value_parser = parse_key_json)]
        extras: Vec<(String, Value)>,
        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },
    /// Summarize the links, embedded relations and extra fields of a document
    #[command(alias = "i")]
    Inspect {
        /// Document to read (stdin when omitted)
        file: Option<PathBuf>,
    },
    /// Print one embedded sub-resource
    #[command(alias = "e")]
    Embedded {
        /// Relation name under `_embedded`
        key: String,
        /// Document to read (stdin when omitted)
        file: Option<PathBuf>,
        /// Indent the output
        #[arg(long)]
        pretty: bool,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Build {
            self_href,
            next: next_href,
            prev: prev_href,
            embeds,
            extras,
            pretty,
        } => {
            let overrides: Vec<LinkOption> = next_href
                .into_iter()
                .map(LinkOption::Next)
                .chain(prev_href.into_iter().map(LinkOption::Prev))
                .collect();
            let hal = build(self_href.as_deref(), overrides, embeds, extras)?;
            let output = if pretty {
                hal.to_string_pretty()?
            } else {
                hal.to_string()?
            };
            println!("{output}");
        }
        Commands::Inspect { file } => {
            let hal = read_resource(file.as_deref())?;
            let summary = json!({
                "links": hal.links(),
                "embedded": hal.embedded().map(|store| store.keys().collect::<Vec<_>>()).unwrap_or_default(),
                "extras": hal.extras().keys().collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Embedded { key, file, pretty } => {
            let hal = read_resource(file.as_deref())?;
            let Some(fragment) = hal.embedded().and_then(|store| store.raw(&key)) else {
                bail!("no embedded relation named '{key}'");
            };
            if pretty {
                let value: Value = serde_json::from_str(fragment.get())?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}", fragment.get());
            }
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "hal", &mut io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn build(
    self_href: Option<&str>,
    overrides: Vec<LinkOption>,
    embeds: Vec<(String, Value)>,
    extras: Vec<(String, Value)>,
) -> Result<Resource> {
    let mut hal = match self_href {
        Some(uri) => Resource::from_request(uri, overrides),
        None => Resource::with_links(overrides),
    };
    for (key, value) in &embeds {
        hal.embed(key.as_str(), value)
            .with_context(|| format!("failed to embed '{key}'"))?;
    }
    hal.add_extras(extras).context("failed to add extra fields")?;
    tracing::debug!(embeds = embeds.len(), "built HAL document");
    Ok(hal)
}

fn read_resource(file: Option<&Path>) -> Result<Resource> {
    let bytes = match file {
        Some(path) => fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    Resource::from_slice(&bytes).context("input is not a HAL+JSON document")
}

fn parse_key_json(s: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=JSON, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    let value = serde_json::from_str(raw).map_err(|e| format!("invalid JSON for '{key}': {e}"))?;
    Ok((key.to_string(), value))
}
