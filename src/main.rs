use anyhow::{Result, anyhow};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use distributed_assembler::assembly::driver::{self, RunMode};
use distributed_assembler::cluster::fabric::RankListener;
use distributed_assembler::kmer::io::{kmer_size, line_count, read_kmers};
use distributed_assembler::kmer::types::MAX_KMER_LEN;
use distributed_assembler::table::map::DistributedKmerMap;
use distributed_assembler::table::partitioner::SlotPartitioner;
use distributed_assembler::table::store::SlotStore;

fn usage(binary: &str) {
    eprintln!(
        "Usage: {} --bind <addr:port> [--peers <addr:port,...>] <kmer_file> [verbose|test [prefix]]",
        binary
    );
    eprintln!("Example (single rank): {} kmers.dat verbose", binary);
    eprintln!(
        "Example (two ranks):   {} --bind 127.0.0.1:5000 --peers 127.0.0.1:5000,127.0.0.1:5001 kmers.dat test",
        binary
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut bind: Option<SocketAddr> = None;
    let mut peers: Vec<SocketAddr> = vec![];
    let mut positional: Vec<String> = vec![];

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                let value = args.get(i + 1).ok_or_else(|| anyhow!("--bind needs a value"))?;
                bind = Some(value.parse()?);
                i += 2;
            }
            "--peers" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow!("--peers needs a value"))?;
                peers = value
                    .split(',')
                    .map(|addr| addr.parse())
                    .collect::<Result<_, _>>()?;
                i += 2;
            }
            other => {
                positional.push(other.to_string());
                i += 1;
            }
        }
    }

    if positional.is_empty() {
        usage(&args[0]);
        std::process::exit(1);
    }
    let kmer_file = positional[0].clone();
    let mode = match positional.get(1).map(String::as_str) {
        None => RunMode::Quiet,
        Some("verbose") => RunMode::Verbose,
        Some("test") => RunMode::Test {
            prefix: positional
                .get(2)
                .cloned()
                .unwrap_or_else(|| "test".to_string()),
        },
        Some(other) => {
            eprintln!("Unknown run mode '{}'", other);
            usage(&args[0]);
            std::process::exit(1);
        }
    };

    // A rank's id is the position of its bind address in the shared roster.
    let (roster, rank) = if peers.is_empty() {
        let addr = bind.unwrap_or("127.0.0.1:0".parse()?);
        (vec![addr], 0u32)
    } else {
        let bind = bind.ok_or_else(|| anyhow!("--bind is required when --peers is given"))?;
        let rank = peers
            .iter()
            .position(|addr| *addr == bind)
            .ok_or_else(|| anyhow!("--bind {} does not appear in --peers", bind))?;
        (peers, rank as u32)
    };
    let world = roster.len() as u32;

    let path = Path::new(&kmer_file);
    let k = kmer_size(path)?;
    if k > MAX_KMER_LEN {
        return Err(anyhow!(
            "{} contains {}-mers, longest supported is {}-mers",
            kmer_file,
            k,
            MAX_KMER_LEN
        ));
    }
    let n_kmers = line_count(path)?;
    tracing::info!(
        "assembling {} ({} {}-mers) across {} ranks",
        kmer_file,
        n_kmers,
        k,
        world
    );

    let partitioner = SlotPartitioner::for_expected_keys(n_kmers.max(1), world);
    let store = Arc::new(SlotStore::new(partitioner.slots_per_rank()));

    let listener = RankListener::bind(roster[rank as usize]).await?;
    let fabric = listener.join(rank, &roster, store.clone()).await?;
    let map = DistributedKmerMap::new(fabric.clone(), partitioner)?;

    let kmers = read_kmers(path, k, world, rank)?;

    let total_start = Instant::now();
    let report = driver::run(&fabric, &map, kmers, &mode).await?;
    let total_secs = total_start.elapsed().as_secs_f64();

    match mode {
        RunMode::Verbose => {
            tracing::info!(
                "rank {}: inserted {} k-mers in {:.3}s ({} slots occupied locally)",
                rank,
                report.inserted,
                report.insert_secs,
                store.occupied()
            );
            tracing::info!(
                "rank {}: traversed {} start nodes into {} contigs in {:.3}s",
                rank,
                report.start_nodes,
                report.contigs,
                report.traverse_secs
            );
            tracing::info!("rank {}: finished in {:.3}s total", rank, total_secs);
        }
        _ => {
            tracing::info!(
                "rank {}: assembled {} contigs in {:.3}s",
                rank,
                report.contigs,
                total_secs
            );
        }
    }

    Ok(())
}
