//! Command-line front end for the banded posterior pair-HMM aligner.
//!
//! Reads two single-record FASTA files, runs the full anchor/split/band
//! pipeline, and prints every aligned pair clearing the posterior threshold.

use std::path::PathBuf;
use std::process::ExitCode;

use bio::io::fasta;
use clap::{Parser, ValueEnum};
use tracing::info;

use pairhmm_core::prelude::*;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// `x\ty\tp` per line, sorted by (x, y).
    Text,
    /// A JSON array of `[p, x, y]` triples.
    Json,
}

/// Anchored banded posterior-decoding pair-HMM aligner.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// FASTA file holding the first sequence.
    seq_a: PathBuf,

    /// FASTA file holding the second sequence.
    seq_b: PathBuf,

    /// JSON-encoded `Parameters` record to start from; any of the flags
    /// below that are also given override the corresponding field.
    #[arg(long)]
    params_file: Option<PathBuf>,

    /// Posterior probability below which an aligned pair is discarded.
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum antidiagonal distance between checkpointed tracebacks.
    #[arg(long)]
    min_diags_between_trace_back: Option<i64>,

    /// Antidiagonals a checkpointed traceback looks back over.
    #[arg(long)]
    trace_back_diagonals: Option<i64>,

    /// Cells of slack added on every side of the anchor-constrained band.
    #[arg(long)]
    diagonal_expansion: Option<i64>,

    /// Cells trimmed from each end of an anchor-derived constraint diagonal.
    #[arg(long)]
    constraint_diagonal_trim: Option<i64>,

    /// Rectangles at or above this area fall back to repeat-masked anchors.
    #[arg(long)]
    anchor_matrix_bigger_than_this: Option<i64>,

    /// Rectangles at or above this area recurse into bottom-level anchors.
    #[arg(long)]
    repeat_mask_matrix_bigger_than_this: Option<i64>,

    /// Rectangles at or above this area are split by large gaps before alignment.
    #[arg(long)]
    split_matrix_bigger_than_this: Option<i64>,

    /// Reserved: not consumed by the core engine.
    #[arg(long)]
    align_ambiguity_characters: Option<bool>,

    /// Name of the seed-finder executable to invoke for anchoring.
    #[arg(long, default_value = "lastz")]
    seed_finder: String,

    /// Skip the external seed finder entirely and align with no anchors.
    #[arg(long)]
    no_anchors: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Starts from `Parameters::default()` (or the contents of `--params-file`,
/// if given) and applies every CLI flag that was explicitly set on top.
fn resolve_parameters(cli: &Cli) -> Result<Parameters, BoxError> {
    let mut params = match &cli.params_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str(&text)?
        }
        None => Parameters::default(),
    };

    if let Some(v) = cli.threshold {
        params.threshold = v;
    }
    if let Some(v) = cli.min_diags_between_trace_back {
        params.min_diags_between_trace_back = v;
    }
    if let Some(v) = cli.trace_back_diagonals {
        params.trace_back_diagonals = v;
    }
    if let Some(v) = cli.diagonal_expansion {
        params.diagonal_expansion = v;
    }
    if let Some(v) = cli.constraint_diagonal_trim {
        params.constraint_diagonal_trim = v;
    }
    if let Some(v) = cli.anchor_matrix_bigger_than_this {
        params.anchor_matrix_bigger_than_this = v;
    }
    if let Some(v) = cli.repeat_mask_matrix_bigger_than_this {
        params.repeat_mask_matrix_bigger_than_this = v;
    }
    if let Some(v) = cli.split_matrix_bigger_than_this {
        params.split_matrix_bigger_than_this = v;
    }
    if let Some(v) = cli.align_ambiguity_characters {
        params.align_ambiguity_characters = v;
    }

    params.validate()?;
    Ok(params)
}

type BoxError = Box<dyn std::error::Error>;

fn read_first_record(path: &PathBuf) -> Result<String, BoxError> {
    let reader = fasta::Reader::from_file(path)?;
    let record = reader
        .records()
        .next()
        .ok_or_else(|| -> BoxError { format!("{} contains no FASTA records", path.display()).into() })??;
    Ok(String::from_utf8(record.seq().to_vec())?)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "pairhmm_cli=info,pairhmm_core=warn".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BoxError> {
    let sx = read_first_record(&cli.seq_a)?;
    let sy = read_first_record(&cli.seq_b)?;
    let params = resolve_parameters(cli)?;

    info!(lx = sx.len(), ly = sy.len(), "aligning sequences");

    let mut pairs = if cli.no_anchors {
        pairhmm_core::align(&sx, &sy, &FixedSeedFinder::new(Vec::new()), &params)?
    } else {
        let finder = LastzSeedFinder::with_executable(cli.seed_finder.clone());
        pairhmm_core::align(&sx, &sy, &finder, &params)?
    };
    pairs.sort_by_key(|&(_, x, y)| (x, y));

    match cli.format {
        OutputFormat::Text => {
            for (p, x, y) in &pairs {
                println!("{x}\t{y}\t{p}");
            }
        }
        OutputFormat::Json => {
            let rows: Vec<[i64; 3]> = pairs.iter().map(|&(p, x, y)| [p, x, y]).collect();
            println!("{}", serde_json::to_string(&rows)?);
        }
    }

    info!(pairs = pairs.len(), "done");
    Ok(())
}
