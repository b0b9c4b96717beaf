//! protostream - Decode Protocol Buffer messages using runtime descriptors
//!
//! This tool loads a serialized `FileDescriptorSet`, decodes binary messages
//! of a chosen type without generated code and prints them as JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use protostream_core::types::{normalize_type_url, type_url_for};
use protostream_core::well_known;
use protostream_core::{
    DecoderConfig, DescriptorPoolResolver, ProtoStreamDecoder, TypeInfo, DEFAULT_MAX_RECURSION_DEPTH,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Decode Protocol Buffer messages to JSON using runtime descriptors
#[derive(Parser, Debug)]
#[command(name = "protostream")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Serialized FileDescriptorSet (`protoc --include_imports -o <FILE>`)
    #[arg(short = 's', long)]
    descriptor_set: PathBuf,

    /// Fully qualified message type or type URL of the input
    #[arg(short = 't', long = "type")]
    type_name: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Maximum nesting of messages below the root
    #[arg(long, default_value_t = DEFAULT_MAX_RECURSION_DEPTH)]
    max_depth: usize,

    /// Render enum names in lowerCamelCase
    #[arg(long)]
    lower_camel_enums: bool,

    /// Include fields missing from the descriptor under their field number
    #[arg(long)]
    unknown_fields: bool,

    /// Replace invalid UTF-8 in string fields instead of failing
    #[arg(long)]
    lossy_utf8: bool,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single encoded message
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of encoded messages to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

impl Cli {
    fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig::new()
            .max_recursion_depth(self.max_depth)
            .use_lower_camel_for_enums(self.lower_camel_enums)
            .render_unknown_fields(self.unknown_fields)
            .strict_utf8(!self.lossy_utf8)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let decoder = build_decoder(&cli)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &decoder, file, &mut out)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &decoder, directory, &mut out).map(|_| ())
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Load the descriptor set and check that the requested type exists
fn build_decoder(cli: &Cli) -> Result<ProtoStreamDecoder> {
    let resolver = DescriptorPoolResolver::from_file(&cli.descriptor_set).with_context(|| {
        format!(
            "Failed to load descriptor set: {}",
            cli.descriptor_set.display()
        )
    })?;

    let type_name = normalize_type_url(&cli.type_name);
    if resolver.pool().get_message_by_name(type_name).is_none() && !well_known::is_well_known(type_name) {
        bail!(
            "Type {} is not defined in {}",
            type_name,
            cli.descriptor_set.display()
        );
    }

    debug!(
        "Loaded {} message type(s) from {}",
        resolver.pool().all_messages().count(),
        cli.descriptor_set.display()
    );

    let type_info = Arc::new(TypeInfo::new(resolver));
    Ok(ProtoStreamDecoder::with_config(type_info, cli.decoder_config()))
}

/// Decode a single message file
fn process_single_file(
    cli: &Cli,
    decoder: &ProtoStreamDecoder,
    file: &Path,
    out: &mut impl Write,
) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let json = decode_file(cli, decoder, file)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

/// Decode every message file in a directory recursively, returning the
/// number of files decoded
fn process_directory(
    cli: &Cli,
    decoder: &ProtoStreamDecoder,
    directory: &Path,
    out: &mut impl Write,
) -> Result<usize> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut decoded = 0;
    let mut failed = 0;

    // Walk in name order so output is stable
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            trace!("Skipping hidden file: {}", path.display());
            continue;
        }

        debug!("Processing message: {}", path.display());
        match decode_file(cli, decoder, path) {
            Ok(json) => {
                writeln!(out, "{}", json)?;
                decoded += 1;
            }
            Err(e) => {
                // Log error but continue with other files
                warn!("Error processing {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
    }

    info!("Decoded {} message(s), {} failed", decoded, failed);
    Ok(decoded)
}

/// Read and decode one message, returning its JSON rendering
fn decode_file(cli: &Cli, decoder: &ProtoStreamDecoder, path: &Path) -> Result<String> {
    trace!("Reading {}", path.display());
    let data = fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;

    trace!("Read {} bytes from {}", data.len(), path.display());

    let value = decoder
        .decode_to_value(&type_url_for(&cli.type_name), &data)
        .with_context(|| format!("Failed to decode {} as {}", path.display(), cli.type_name))?;

    let json = value.to_json();
    let rendered = if cli.compact {
        serde_json::to_string(&json)?
    } else {
        serde_json::to_string_pretty(&json)?
    };
    Ok(rendered)
}
