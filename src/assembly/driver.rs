use anyhow::{Context, Result, anyhow};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use super::contig::{Contig, extract_contig};
use crate::cluster::fabric::ClusterFabric;
use crate::kmer::types::KmerPair;
use crate::table::map::DistributedKmerMap;

/// How a run reports and emits its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Minimal timing only.
    Quiet,
    /// Timing and counts for every phase.
    Verbose,
    /// Like `Quiet`, plus one `<prefix>_<rank>.dat` contig file per rank.
    Test { prefix: String },
}

/// Per-rank counts and timings of one assembly run.
#[derive(Debug)]
pub struct AssemblyReport {
    pub inserted: usize,
    pub start_nodes: usize,
    pub contigs: usize,
    pub insert_secs: f64,
    pub traverse_secs: f64,
}

/// Walks every start node to its terminating k-mer.
///
/// Each step predicts the successor key from the current tail's forward
/// extension and looks it up; the insertion phase put every k-mer of the
/// input into the table, so a miss means the input graph is corrupt and the
/// run aborts.
pub async fn walk_contigs(
    map: &DistributedKmerMap,
    start_nodes: &[KmerPair],
) -> Result<Vec<Contig>> {
    let mut contigs = Vec::with_capacity(start_nodes.len());
    for seed in start_nodes {
        let mut contig: Contig = vec![*seed];
        loop {
            let tail = contig[contig.len() - 1];
            let Some(next_key) = tail.next_kmer() else {
                break;
            };
            let found = map.find(&next_key).await?.ok_or_else(|| {
                anyhow!(
                    "lookup miss: predicted successor {} of {} is not in the table",
                    next_key,
                    tail.kmer
                )
            })?;
            contig.push(found);
        }
        contigs.push(contig);
    }
    Ok(contigs)
}

/// Runs one rank's share of the assembly.
pub async fn run(
    fabric: &ClusterFabric,
    map: &DistributedKmerMap,
    kmers: Vec<KmerPair>,
    mode: &RunMode,
) -> Result<AssemblyReport> {
    let rank = fabric.rank();
    tracing::info!("rank {} processing {} k-mers", rank, kmers.len());

    // All listeners must be serving before the first remote insert.
    fabric.barrier().await?;

    let insert_start = Instant::now();
    let mut start_nodes = Vec::new();
    for pair in &kmers {
        map.insert(*pair).await?;
        if pair.is_start_node() {
            start_nodes.push(*pair);
        }
    }
    // Seals the insertion phase: the table is read-only from here on.
    fabric.barrier().await?;
    let insert_secs = insert_start.elapsed().as_secs_f64();
    tracing::info!("rank {} identified {} start nodes", rank, start_nodes.len());

    let traverse_start = Instant::now();
    let contigs = walk_contigs(map, &start_nodes).await?;
    fabric.barrier().await?;
    let traverse_secs = traverse_start.elapsed().as_secs_f64();
    tracing::info!("rank {} assembled {} contigs", rank, contigs.len());

    if let RunMode::Test { prefix } = mode {
        write_contigs(prefix, rank, &contigs)?;
    }

    Ok(AssemblyReport {
        inserted: kmers.len(),
        start_nodes: start_nodes.len(),
        contigs: contigs.len(),
        insert_secs,
        traverse_secs,
    })
}

fn write_contigs(prefix: &str, rank: u32, contigs: &[Contig]) -> Result<()> {
    let path = format!("{}_{}.dat", prefix, rank);
    let file = File::create(&path).with_context(|| format!("creating {}", path))?;
    let mut out = BufWriter::new(file);
    for contig in contigs {
        writeln!(out, "{}", extract_contig(contig)).with_context(|| format!("writing {}", path))?;
    }
    out.flush().with_context(|| format!("flushing {}", path))?;
    tracing::info!("rank {} wrote {} contigs to {}", rank, contigs.len(), path);
    Ok(())
}
