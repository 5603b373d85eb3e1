//! K-mer File Ingest
//!
//! Input files carry one k-mer per line: the bases, the backward extension
//! symbol, and the forward extension symbol, whitespace separated. The total
//! line count equals the number of distinct k-mers, and each rank reads a
//! contiguous shard of the lines; the shards cover the file exactly once.

use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::types::{Extension, KmerPair, PackedKmer};

/// Reports the k-mer length used in a file by measuring the first k-mer token.
pub fn kmer_size(path: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .with_context(|| format!("reading {}", path.display()))?;
        if bytes == 0 {
            return Err(anyhow!("{} contains no k-mers", path.display()));
        }
        if let Some(token) = line.split_whitespace().next() {
            return Ok(token.len());
        }
    }
}

/// Total number of k-mers in a file (non-empty lines).
pub fn line_count(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut count = 0u64;
    for line in reader.lines() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if !line.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

fn parse_line(line: &str, k: usize) -> Result<KmerPair> {
    let mut fields = line.split_whitespace();
    let bases = fields.next().ok_or_else(|| anyhow!("missing k-mer field"))?;
    let backward = fields
        .next()
        .ok_or_else(|| anyhow!("missing backward extension field"))?;
    let forward = fields
        .next()
        .ok_or_else(|| anyhow!("missing forward extension field"))?;

    if bases.len() != k {
        return Err(anyhow!(
            "found a {}-mer in a file of {}-mers",
            bases.len(),
            k
        ));
    }
    let backward = single_symbol(backward).and_then(Extension::from_symbol)?;
    let forward = single_symbol(forward).and_then(Extension::from_symbol)?;

    Ok(KmerPair::new(
        PackedKmer::from_bases(bases)?,
        backward,
        forward,
    ))
}

fn single_symbol(field: &str) -> Result<char> {
    let mut chars = field.chars();
    match (chars.next(), chars.next()) {
        (Some(symbol), None) => Ok(symbol),
        _ => Err(anyhow!("extension field '{}' is not a single symbol", field)),
    }
}

/// Reads this rank's shard of the k-mer file.
///
/// Lines are split into `n_ranks` contiguous shards of `ceil(total / n_ranks)`
/// lines each; the last shard may be shorter. Every line belongs to exactly
/// one shard.
pub fn read_kmers(path: &Path, k: usize, n_ranks: u32, rank: u32) -> Result<Vec<KmerPair>> {
    if rank >= n_ranks {
        return Err(anyhow!("rank {} out of range for {} ranks", rank, n_ranks));
    }
    let total = line_count(path)?;
    let shard = total.div_ceil(u64::from(n_ranks)).max(1);
    let start = u64::from(rank) * shard;
    let end = (start + shard).min(total);

    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut kmers = Vec::with_capacity(end.saturating_sub(start) as usize);
    let mut index = 0u64;
    for line in reader.lines() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        if index >= end {
            break;
        }
        if index >= start {
            let pair = parse_line(&line, k)
                .with_context(|| format!("parsing {} line {}", path.display(), index + 1))?;
            kmers.push(pair);
        }
        index += 1;
    }
    Ok(kmers)
}
