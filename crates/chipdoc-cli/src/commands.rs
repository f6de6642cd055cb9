use std::path::Path;

use anyhow::{anyhow, Context};
use chipdoc_crypto::{CompressionLevel, Level2Gate, UNLOCK_TOKEN};
use chipdoc_pack::{
    peek, AnyLoader, BinarySaver, Format, OpenOptions, PackError, PackResult, SaveOptions,
};
use chipdoc_tree::{read_element, write_children, CursorResult, Element, TextSaver, TreeWriter};
use chipdoc_types::{EncryptionLevel, FormatVersion, Signature, Value};
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use crate::cli::*;
use crate::config::CliConfig;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if cli.unlock {
        Level2Gate::global().register_unlock(|| UNLOCK_TOKEN);
    }
    let config = CliConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(&args, cli.output),
        Command::Verify(args) => cmd_verify(&args, cli.output),
        Command::Dump(args) => cmd_dump(&args, cli.output),
        Command::Convert(args) => cmd_convert(&args, &config),
    }
}

impl From<CompressionArg> for CompressionLevel {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => Self::None,
            CompressionArg::Fastest => Self::Fastest,
            CompressionArg::Default => Self::Default,
            CompressionArg::Smallest => Self::Smallest,
        }
    }
}

impl From<EncryptionArg> for EncryptionLevel {
    fn from(arg: EncryptionArg) -> Self {
        match arg {
            EncryptionArg::None => Self::None,
            EncryptionArg::Level1 => Self::Level1,
            EncryptionArg::Level2 => Self::Level2,
        }
    }
}

impl From<TargetFormat> for Format {
    fn from(arg: TargetFormat) -> Self {
        match arg {
            TargetFormat::Binary => Self::Binary,
            TargetFormat::Xml => Self::Xml,
            TargetFormat::Json => Self::Json,
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn cmd_inspect(args: &FileArgs, output: OutputFormat) -> anyhow::Result<()> {
    let bytes = read_file(&args.file)?;
    let format = Format::detect(&bytes)?;
    if format != Format::Binary {
        let loader = AnyLoader::open_memory(&bytes, &OpenOptions::default())?;
        let version = loader.version();
        match output {
            OutputFormat::Json => println!(
                "{}",
                json!({ "format": format.to_string(), "version": version.to_string() })
            ),
            OutputFormat::Text => {
                println!("{} {}", "format: ".bold(), format);
                println!("{} {}", "version:".bold(), version_label(version));
            }
        }
        return Ok(());
    }

    let header = peek(&bytes)?;
    let level = header.level();
    match output {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "format": "binary",
                "compressed_size": header.compressed_size,
                "uncompressed_size": header.uncompressed_size,
                "checksum": format!("{:08x}", header.checksum),
                "compressed": header.is_compressed(),
                "encryption": level.as_ref().map(|l| l.to_string()).ok(),
                "scramble_seed": header.scramble_seed,
            })
        ),
        OutputFormat::Text => {
            println!("{} binary", "format:      ".bold());
            println!("{} {} bytes", "stored:      ".bold(), header.compressed_size);
            println!("{} {} bytes", "payload:     ".bold(), header.uncompressed_size);
            println!("{} {:08x}", "crc32:       ".bold(), header.checksum);
            println!("{} {}", "compressed:  ".bold(), header.is_compressed());
            match level {
                Ok(level) => println!("{} {}", "encryption:  ".bold(), level.to_string().cyan()),
                Err(e) => println!("{} {}", "encryption:  ".bold(), e.to_string().red()),
            }
            println!("{} {}", "seed:        ".bold(), header.scramble_seed);
        }
    }
    Ok(())
}

fn version_label(version: FormatVersion) -> String {
    if version == FormatVersion::CURRENT {
        version.to_string()
    } else {
        format!("{version} (legacy)")
    }
}

#[derive(Debug)]
struct Verified {
    format: Format,
    version: FormatVersion,
    level: Option<EncryptionLevel>,
    nodes: usize,
}

/// Open `path` and decode every node of the tree.
fn verify(path: &Path) -> PackResult<Verified> {
    let mut loader = AnyLoader::open_file(path, &OpenOptions::default())?;
    let tree = read_element(&mut loader)?;
    Ok(Verified {
        format: loader.format(),
        version: loader.version(),
        level: match &loader {
            AnyLoader::Binary(binary) => Some(binary.level()),
            AnyLoader::Text(_) => None,
        },
        nodes: tree.node_count(),
    })
}

fn failure_class(err: &PackError) -> &'static str {
    if err.is_integrity() {
        "integrity"
    } else if err.is_policy() {
        "policy"
    } else {
        "error"
    }
}

fn cmd_verify(args: &FileArgs, output: OutputFormat) -> anyhow::Result<()> {
    match verify(&args.file) {
        Ok(verified) => {
            match output {
                OutputFormat::Json => println!(
                    "{}",
                    json!({
                        "ok": true,
                        "format": verified.format.to_string(),
                        "version": verified.version.to_string(),
                        "encryption": verified.level.map(|l| l.to_string()),
                        "nodes": verified.nodes,
                    })
                ),
                OutputFormat::Text => {
                    println!("{} {} document verified", "✓".green().bold(), verified.format);
                    println!("  Version: {}", version_label(verified.version));
                    if let Some(level) = verified.level {
                        println!("  Encryption: {}", level.to_string().cyan());
                    }
                    println!("  Nodes: {}", verified.nodes);
                }
            }
            Ok(())
        }
        Err(err) => {
            let class = failure_class(&err);
            match output {
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "ok": false, "failure": class, "error": err.to_string() })
                ),
                OutputFormat::Text => {
                    println!("{} {} failure: {}", "✗".red().bold(), class, err.to_string().red())
                }
            }
            Err(anyhow!(err).context(format!("{} did not verify", args.file.display())))
        }
    }
}

fn render(value: &Value) -> String {
    const MAX_CHARS: usize = 60;
    match value {
        Value::String(s) if s.chars().count() > MAX_CHARS => {
            let head: String = s.chars().take(MAX_CHARS).collect();
            format!("{head:?}...")
        }
        Value::String(s) => format!("{s:?}"),
        Value::Bytes(b) => format!("<{} bytes>", b.len()),
        Value::Array(a) => format!("<{}[{}]>", a.element_kind(), a.len()),
        other => other.as_key().map(|k| k.into_owned()).unwrap_or_default(),
    }
}

fn outline(element: &Element, depth: usize, max_depth: Option<usize>, out: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    if element.is_data() {
        let value = element.value.as_ref().map(render).unwrap_or_default();
        out.push(format!("{indent}= {value}"));
        return;
    }
    let mut line = format!("{indent}{}", element.tag);
    for (key, value) in &element.attributes {
        line.push_str(&format!(" {key}={}", render(value)));
    }
    if max_depth.is_some_and(|max| depth >= max) && !element.children.is_empty() {
        line.push_str(&format!(" ({} children)", element.children.len()));
        out.push(line);
        return;
    }
    out.push(line);
    for child in &element.children {
        outline(child, depth + 1, max_depth, out);
    }
}

fn to_json(element: &Element) -> serde_json::Value {
    if element.is_data() {
        return json!(element.value.as_ref().map(render));
    }
    let attributes: serde_json::Map<String, serde_json::Value> = element
        .attributes
        .iter()
        .map(|(key, value)| (key.to_string(), json!(render(value))))
        .collect();
    json!({
        "tag": element.tag.to_string(),
        "attributes": attributes,
        "children": element.children.iter().map(to_json).collect::<Vec<_>>(),
    })
}

fn cmd_dump(args: &DumpArgs, output: OutputFormat) -> anyhow::Result<()> {
    let mut loader = AnyLoader::open_file(&args.file, &OpenOptions::default())
        .with_context(|| format!("opening {}", args.file.display()))?;
    let tree = read_element(&mut loader)?;
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&tree))?),
        OutputFormat::Text => {
            let mut lines = Vec::new();
            outline(&tree, 0, args.max_depth, &mut lines);
            for line in lines {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn save_options(config: &CliConfig, args: &ConvertArgs) -> SaveOptions {
    let mut options = config.save.clone();
    if let Some(compression) = args.compression {
        options.compression = compression.into();
    }
    if let Some(encryption) = args.encryption {
        options.encryption = encryption.into();
    }
    if let Some(vendor) = &args.vendor {
        options.signature = Some(Signature::derive(vendor));
    }
    if let Some(seed) = args.seed {
        options.scramble_seed = Some(seed);
    }
    options
}

/// Write the root's attributes and children into a saver's open root.
fn copy_tree<W: TreeWriter>(tree: &Element, writer: &mut W) -> CursorResult<()> {
    for (key, value) in &tree.attributes {
        writer.write_attribute(*key, value.clone())?;
    }
    write_children(writer, tree)
}

fn cmd_convert(args: &ConvertArgs, config: &CliConfig) -> anyhow::Result<()> {
    let target = match args.to {
        Some(to) => to.into(),
        None => Format::from_extension(&args.output).ok_or_else(|| {
            anyhow!(
                "cannot tell the output format of {}; pass --to",
                args.output.display()
            )
        })?,
    };

    let mut loader = AnyLoader::open_file(&args.input, &OpenOptions::default())
        .with_context(|| format!("opening {}", args.input.display()))?;
    let source = loader.format();
    let tree = read_element(&mut loader)?;
    debug!(%source, %target, nodes = tree.node_count(), "converting");

    match target.encoding() {
        None => {
            let mut saver = BinarySaver::new(save_options(config, args));
            copy_tree(&tree, &mut saver)?;
            saver.save_to_file(&args.output)?;
        }
        Some(encoding) => {
            let mut options = config.text.clone();
            if args.compact {
                options.pretty = false;
            }
            let mut saver = TextSaver::new(encoding, options);
            copy_tree(&tree, &mut saver)?;
            saver.save_to_file(&args.output)?;
        }
    }
    println!(
        "{} {} ({}) → {} ({})",
        "✓".green().bold(),
        args.input.display(),
        source,
        args.output.display(),
        target
    );
    Ok(())
}
