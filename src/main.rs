//! IR Attributes CLI
//!
//! Command-line interface for inspecting and editing the attribute trailer
//! of infrared video and image files.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use ir_attributes::{
    store::{FileConfig, StoreConfig},
    AttributesStore,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "ir-attrs", version, about = "Inspect and edit IR file attribute trailers")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print timestamps and attributes.
    Show {
        file: PathBuf,
        /// Also print per-frame attributes.
        #[arg(long)]
        frames: bool,
        /// Print timestamps as UTC datetimes (ns since the Unix epoch).
        #[arg(long)]
        datetime: bool,
        /// Print a TOML summary instead of plain text.
        #[arg(long)]
        toml: bool,
    },
    /// Add or replace global attributes.
    Set {
        file: PathBuf,
        /// KEY=VALUE pairs.
        #[arg(required = true, value_parser = parse_pair)]
        attributes: Vec<(String, String)>,
    },
    /// Add or replace attributes of one frame.
    SetFrame {
        file: PathBuf,
        frame: usize,
        /// KEY=VALUE pairs.
        #[arg(required = true, value_parser = parse_pair)]
        attributes: Vec<(String, String)>,
    },
    /// Write a regular timestamp vector.
    Times {
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        start: i64,
        #[arg(long)]
        step: i64,
        #[arg(long)]
        count: usize,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}

/// Serializable view of a trailer for `show --toml`.
#[derive(Debug, Serialize)]
struct Summary {
    file: String,
    frame_count: usize,
    table_size: usize,
    timestamps: Vec<i64>,
    attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    frames: BTreeMap<String, BTreeMap<String, String>>,
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn format_time(ns: i64, datetime: bool) -> String {
    if !datetime {
        return ns.to_string();
    }
    let dt: DateTime<Utc> = DateTime::from_timestamp_nanos(ns);
    dt.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
}

fn show(
    store: &AttributesStore,
    file: &Path,
    frames: bool,
    datetime: bool,
    as_toml: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let attributes: BTreeMap<String, String> = store
        .global_attributes()?
        .iter()
        .map(|(k, v)| (text(k), text(v)))
        .collect();

    let mut frame_attributes = BTreeMap::new();
    if frames {
        for frame in 0..store.frame_count()? {
            let map = store.frame_attributes(frame)?;
            if !map.is_empty() {
                frame_attributes.insert(
                    frame.to_string(),
                    map.iter().map(|(k, v)| (text(k), text(v))).collect(),
                );
            }
        }
    }

    if as_toml {
        let summary = Summary {
            file: file.display().to_string(),
            frame_count: store.frame_count()?,
            table_size: store.table_size()?,
            timestamps: store.timestamps()?.to_vec(),
            attributes,
            frames: frame_attributes,
        };
        print!("{}", toml::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("file:        {}", file.display());
    println!("frames:      {}", store.frame_count()?);
    println!("table size:  {} bytes", store.table_size()?);
    println!("attributes:");
    for (key, value) in &attributes {
        println!("  {key} = {value}");
    }
    println!("timestamps:");
    for (frame, &ns) in store.timestamps()?.iter().enumerate() {
        println!("  [{frame}] {}", format_time(ns, datetime));
        if let Some(map) = frame_attributes.get(&frame.to_string()) {
            for (key, value) in map {
                println!("      {key} = {value}");
            }
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?.store,
        None => StoreConfig::default(),
    };

    match cli.command {
        Command::Show {
            file,
            frames,
            datetime,
            toml,
        } => {
            if !file.is_file() {
                return Err(format!("{} is not a file", file.display()).into());
            }
            let mut store = AttributesStore::open_path_with(&file, config)?;
            let result = show(&store, &file, frames, datetime, toml);
            store.discard();
            result
        }
        Command::Set { file, attributes } => {
            let mut store = AttributesStore::open_path_with(&file, config)?;
            for (key, value) in attributes {
                store.add_global_attribute(key, value)?;
            }
            store.close()?;
            info!("Updated global attributes of {}", file.display());
            Ok(())
        }
        Command::SetFrame {
            file,
            frame,
            attributes,
        } => {
            let mut store = AttributesStore::open_path_with(&file, config)?;
            for (key, value) in attributes {
                if let Err(e) = store.add_frame_attribute(frame, key, value) {
                    store.discard();
                    return Err(e.into());
                }
            }
            store.close()?;
            info!("Updated attributes of frame {} in {}", frame, file.display());
            Ok(())
        }
        Command::Times {
            file,
            start,
            step,
            count,
        } => {
            let times = (0..count as i64)
                .map(|i| i.checked_mul(step).and_then(|offset| start.checked_add(offset)))
                .collect::<Option<Vec<i64>>>()
                .ok_or("timestamp overflows i64")?;
            let mut store = AttributesStore::open_path_with(&file, config)?;
            store.set_times(&times)?;
            store.close()?;
            info!("Wrote {} timestamps to {}", count, file.display());
            Ok(())
        }
    }
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
