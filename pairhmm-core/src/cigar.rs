//! Parsing of the seed finder's CIGAR output: `contig1 start1 end1 strand1
//! contig2 start2 end2 strand2 score <op len>*`.

use crate::error::{PairwiseAlignmentError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOp {
    Match,
    InsertionInX,
    InsertionInY,
}

#[derive(Debug, Clone)]
pub struct CigarRecord {
    pub contig1: String,
    pub start1: i64,
    pub end1: i64,
    pub contig2: String,
    pub start2: i64,
    pub end2: i64,
    pub operations: Vec<(CigarOp, i64)>,
}

fn parse_strand(token: &str, line: &str) -> Result<()> {
    match token {
        "+" | "1" => Ok(()),
        _ => Err(PairwiseAlignmentError::SeedFinderIo(format!(
            "expected a positive strand in cigar line: {line}"
        ))),
    }
}

/// Parses a single `cigar` line, enforcing that both contigs are named `a`
/// and `b` and that both strands are positive, since the seed finder is
/// always invoked with `--strand=plus` on single-record inputs.
pub fn parse_cigar_line(line: &str) -> Result<CigarRecord> {
    let malformed = || PairwiseAlignmentError::SeedFinderIo(format!("malformed cigar line: {line}"));

    let mut tokens = line.split_whitespace();
    let tag = tokens.next().ok_or_else(malformed)?;
    if tag != "cigar" {
        return Err(malformed());
    }
    let contig1 = tokens.next().ok_or_else(malformed)?.to_string();
    let start1: i64 = tokens.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let end1: i64 = tokens.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let strand1 = tokens.next().ok_or_else(malformed)?;
    let contig2 = tokens.next().ok_or_else(malformed)?.to_string();
    let start2: i64 = tokens.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let end2: i64 = tokens.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
    let strand2 = tokens.next().ok_or_else(malformed)?;
    let _score: f64 = tokens.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;

    if contig1 != "a" {
        return Err(PairwiseAlignmentError::SeedFinderIo(format!(
            "expected contig1 \"a\", found \"{contig1}\""
        )));
    }
    if contig2 != "b" {
        return Err(PairwiseAlignmentError::SeedFinderIo(format!(
            "expected contig2 \"b\", found \"{contig2}\""
        )));
    }
    parse_strand(strand1, line)?;
    parse_strand(strand2, line)?;

    let mut operations = Vec::new();
    loop {
        let op = match tokens.next() {
            Some(op) => op,
            None => break,
        };
        let len: i64 = tokens.next().ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
        let op = match op {
            "M" => CigarOp::Match,
            "I" => CigarOp::InsertionInX,
            "D" => CigarOp::InsertionInY,
            other => {
                return Err(PairwiseAlignmentError::SeedFinderIo(format!(
                    "unrecognised cigar operation \"{other}\""
                )))
            }
        };
        operations.push((op, len));
    }

    Ok(CigarRecord {
        contig1,
        start1,
        end1,
        contig2,
        start2,
        end2,
        operations,
    })
}

/// Walks a record's operations, emitting `(x, y)` for every position `trim`
/// cells in from either end of each run of `M`s. `I` advances only `x`, `D`
/// only `y`, `M` advances both.
pub fn matched_pairs_from_record(record: &CigarRecord, trim: i64) -> Result<Vec<(i64, i64)>> {
    let mut pairs = Vec::new();
    let mut j = record.start1;
    let mut k = record.start2;
    for &(op, len) in &record.operations {
        if op == CigarOp::Match {
            let mut i = trim;
            while i < len - trim {
                pairs.push((j + i, k + i));
                i += 1;
            }
        }
        if op != CigarOp::InsertionInY {
            j += len;
        }
        if op != CigarOp::InsertionInX {
            k += len;
        }
    }
    if j != record.end1 || k != record.end2 {
        return Err(PairwiseAlignmentError::SeedFinderIo(format!(
            "cigar operations do not reach the declared end coordinates ({j},{k}) != ({},{})",
            record.end1, record.end2
        )));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_match_run() {
        let line = "cigar a 0 10 + b 0 10 + 900 M 10";
        let record = parse_cigar_line(line).unwrap();
        assert_eq!(record.start1, 0);
        assert_eq!(record.end2, 10);
        assert_eq!(record.operations, vec![(CigarOp::Match, 10)]);
    }

    #[test]
    fn rejects_wrong_contig_names() {
        let line = "cigar x 0 10 + b 0 10 + 900 M 10";
        assert!(parse_cigar_line(line).is_err());
    }

    #[test]
    fn rejects_negative_strand() {
        let line = "cigar a 0 10 - b 0 10 + 900 M 10";
        assert!(parse_cigar_line(line).is_err());
    }

    #[test]
    fn match_run_trims_both_ends() {
        let record = CigarRecord {
            contig1: "a".into(),
            start1: 0,
            end1: 10,
            contig2: "b".into(),
            start2: 0,
            end2: 10,
            operations: vec![(CigarOp::Match, 10)],
        };
        let pairs = matched_pairs_from_record(&record, 3).unwrap();
        assert_eq!(pairs, vec![(3, 3), (4, 4), (5, 5), (6, 6)]);
    }

    #[test]
    fn indels_advance_only_one_axis() {
        let record = CigarRecord {
            contig1: "a".into(),
            start1: 0,
            end1: 7,
            contig2: "b".into(),
            start2: 0,
            end2: 5,
            operations: vec![(CigarOp::Match, 5), (CigarOp::InsertionInX, 2)],
        };
        let pairs = matched_pairs_from_record(&record, 0).unwrap();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
    }

    #[test]
    fn mismatched_end_coordinates_error() {
        let record = CigarRecord {
            contig1: "a".into(),
            start1: 0,
            end1: 99,
            contig2: "b".into(),
            start2: 0,
            end2: 10,
            operations: vec![(CigarOp::Match, 10)],
        };
        assert!(matched_pairs_from_record(&record, 0).is_err());
    }
}
