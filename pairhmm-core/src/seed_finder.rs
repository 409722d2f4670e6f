//! The external seed-finder boundary: a local-alignment tool invoked as a
//! subprocess, abstracted behind a trait so tests can inject deterministic
//! anchors instead of spawning a process.

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};

use bio::io::fasta;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::cigar::{matched_pairs_from_record, parse_cigar_line};
use crate::error::{PairwiseAlignmentError, Result};

/// Produces monotonically-increasing `(x, y)` seed matches between two raw
/// sequences, trimming `trim` bases from each end of every match run.
pub trait SeedFinder {
    fn find_seed_matches(&self, sx: &str, sy: &str, trim: i64, repeat_mask: bool) -> Result<Vec<(i64, i64)>>;
}

/// Invokes `lastz` over temporary FASTA files, mirroring the reference
/// pipeline's `getBlastPairs`: strand-plus, gapped, IUPAC-ambiguous, CIGAR
/// output, with sequences named "a" and "b".
pub struct LastzSeedFinder {
    executable: String,
}

impl LastzSeedFinder {
    pub fn new() -> Self {
        LastzSeedFinder {
            executable: "lastz".to_string(),
        }
    }

    pub fn with_executable(executable: impl Into<String>) -> Self {
        LastzSeedFinder {
            executable: executable.into(),
        }
    }
}

impl Default for LastzSeedFinder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_fasta(name: &str, sequence: &str) -> Result<NamedTempFile> {
    let file = NamedTempFile::new()
        .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("creating temp file: {e}")))?;
    {
        let mut writer = fasta::Writer::new(file.reopen().map_err(|e| {
            PairwiseAlignmentError::SeedFinderIo(format!("reopening temp fasta for writing: {e}"))
        })?);
        writer
            .write(name, None, sequence.as_bytes())
            .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("writing temp fasta: {e}")))?;
        writer
            .flush()
            .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("flushing temp fasta: {e}")))?;
    }
    Ok(file)
}

impl SeedFinder for LastzSeedFinder {
    fn find_seed_matches(&self, sx: &str, sy: &str, trim: i64, repeat_mask: bool) -> Result<Vec<(i64, i64)>> {
        if sx.is_empty() || sy.is_empty() {
            return Ok(Vec::new());
        }

        let (sx_owned, sy_owned);
        let (sx, sy): (&str, &str) = if repeat_mask {
            (sx, sy)
        } else {
            sx_owned = sx.to_uppercase();
            sy_owned = sy.to_uppercase();
            (sx_owned.as_str(), sy_owned.as_str())
        };

        let file_a = write_fasta("a", sx)?;

        let mut command = Command::new(&self.executable);
        command
            .arg("--hspthresh=800")
            .arg("--chain")
            .arg("--strand=plus")
            .arg("--gapped")
            .arg("--format=cigar")
            .arg("--ambiguous=iupac")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let _file_b = if sy.len() > 1000 {
            let file_b = write_fasta("b", sy)?;
            command.arg(file_a.path()).arg(file_b.path());
            Some(file_b)
        } else {
            command.arg(format!("{}[nameparse=darkspace]", file_a.path().display()));
            command.stdin(Stdio::piped());
            None
        };

        debug!(executable = %self.executable, "invoking seed finder");
        let mut child = command
            .spawn()
            .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("spawning {}: {e}", self.executable)))?;

        if sy.len() <= 1000 {
            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| PairwiseAlignmentError::SeedFinderIo("failed to open seed finder stdin".to_string()))?;
            let mut writer = fasta::Writer::new(stdin);
            writer
                .write("b", None, sy.as_bytes())
                .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("writing seed finder stdin: {e}")))?;
            writer
                .flush()
                .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("flushing seed finder stdin: {e}")))?;
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PairwiseAlignmentError::SeedFinderIo("failed to capture seed finder stdout".to_string()))?;

        let mut pairs = Vec::new();
        for line in BufReader::new(stdout).lines() {
            let line = line.map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("reading seed finder output: {e}")))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = parse_cigar_line(&line)?;
            pairs.extend(matched_pairs_from_record(&record, trim)?);
        }

        let status = child
            .wait()
            .map_err(|e| PairwiseAlignmentError::SeedFinderIo(format!("waiting for seed finder: {e}")))?;
        if !status.success() {
            return Err(PairwiseAlignmentError::SeedFinderIo(format!(
                "seed finder exited with {status}"
            )));
        }

        pairs.sort_by_key(|&(x, y)| x + y);
        Ok(pairs)
    }
}

/// A seed finder that returns a fixed list of matches, for tests and for
/// callers that already have anchors from elsewhere.
pub struct FixedSeedFinder {
    pairs: Vec<(i64, i64)>,
}

impl FixedSeedFinder {
    pub fn new(pairs: Vec<(i64, i64)>) -> Self {
        FixedSeedFinder { pairs }
    }
}

impl SeedFinder for FixedSeedFinder {
    fn find_seed_matches(&self, _sx: &str, _sy: &str, _trim: i64, _repeat_mask: bool) -> Result<Vec<(i64, i64)>> {
        Ok(self.pairs.clone())
    }
}
