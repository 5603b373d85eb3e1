use crate::kmer::types::{Extension, KmerPair};

/// A maximal forward path through the de Bruijn graph, seeded at a start
/// node. Consecutive entries overlap by `k - 1` bases.
pub type Contig = Vec<KmerPair>;

/// Renders a contig as its assembled bases: the first k-mer in full, then
/// one base per forward extension until the terminating `F`.
pub fn extract_contig(contig: &[KmerPair]) -> String {
    let Some(first) = contig.first() else {
        return String::new();
    };
    let mut bases = first.kmer.to_string();
    for pair in contig {
        match pair.forward {
            Extension::Stop => break,
            ext => bases.push(ext.symbol()),
        }
    }
    bases
}
