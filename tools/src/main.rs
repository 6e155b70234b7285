use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use figure::DType;
use figsync_tools::{
    apply_script, decode_json, delta_json, encode_json, figure_from_json, figure_to_json,
    trace_deltas_json, ApplyReport,
};
use glob::Pattern;

#[derive(Parser)]
#[command(
    name = "figsync-tools",
    version,
    about = "figsync delta, command and wire inspection tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print what a resolved object holds beyond its authoritative version.
    Delta {
        /// JSON file with the engine-resolved state.
        full: PathBuf,
        /// JSON file with the authoritative state.
        authoritative: PathBuf,
        /// Treat both files as trace arrays and diff them pairwise.
        #[arg(long)]
        traces: bool,
    },
    /// Apply host commands to a figure and print the result.
    Apply {
        /// Figure JSON (`{"data": [...], "layout": {...}}`).
        figure: PathBuf,
        /// Command script file, or a directory of them applied in name order.
        commands: PathBuf,
        /// Optional glob filter when reading a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Fail on the first bad command instead of skipping it.
        #[arg(long)]
        strict: bool,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Encode a JSON value into its wire form.
    Encode {
        /// Path to the JSON value.
        input: PathBuf,
        /// Pack number arrays into buffers of this dtype.
        #[arg(long, value_parser = parse_dtype)]
        pack: Option<DType>,
    },
    /// Decode a wire value given as JSON.
    Decode {
        /// Path to the wire JSON.
        input: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Delta {
            full,
            authoritative,
            traces,
        } => {
            let full = read_json(&full)?;
            let authoritative = read_json(&authoritative)?;
            let delta = if traces {
                trace_deltas_json(full, authoritative)?
            } else {
                delta_json(full, authoritative)
            };
            print_json(&delta)?;
        }
        Command::Apply {
            figure,
            commands,
            glob,
            strict,
            format,
        } => {
            let mut figure = figure_from_json(read_json(&figure)?).context("load figure")?;
            let script = if commands.is_dir() {
                let mut script = Vec::new();
                for path in collect_script_paths(&commands, glob.as_deref())? {
                    script.extend(read_commands(&path)?);
                }
                script
            } else {
                read_commands(&commands)?
            };
            let report = apply_script(&mut figure, &script, strict)?;
            match format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "figure": figure_to_json(&figure),
                    "report": report,
                }))?,
                OutputFormat::Pretty => {
                    print_report(&report);
                    print_json(&figure_to_json(&figure))?;
                }
            }
        }
        Command::Encode { input, pack } => {
            let wire = encode_json(read_json(&input)?, pack)?;
            print_json(&wire)?;
        }
        Command::Decode { input } => {
            let value = decode_json(read_json(&input)?, &wire::Limits::default())?;
            print_json(&value)?;
        }
    }
    Ok(())
}

fn parse_dtype(name: &str) -> Result<DType, String> {
    DType::from_name(name).ok_or_else(|| {
        let names: Vec<_> = DType::ALL.iter().map(|dtype| dtype.name()).collect();
        format!("expected one of {}", names.join(", "))
    })
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse json {}", path.display()))
}

/// A script file holds one command object or an array of them.
fn read_commands(path: &Path) -> Result<Vec<serde_json::Value>> {
    Ok(match read_json(path)? {
        serde_json::Value::Array(commands) => commands,
        command => vec![command],
    })
}

fn collect_script_paths(dir: &Path, glob: Option<&str>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{json}");
    Ok(())
}

fn print_report(report: &ApplyReport) {
    println!(
        "applied: {} skipped: {}",
        report.applied,
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  command {}: {}", skipped.index, skipped.error);
    }
}
