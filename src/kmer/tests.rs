#[cfg(test)]
mod tests {
    use crate::kmer::io::{kmer_size, line_count, read_kmers};
    use crate::kmer::types::{Extension, KmerPair, PackedKmer};
    use std::path::PathBuf;

    fn temp_file(name: &str, lines: &[&str]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "asm_{}_{}_{}.kmers",
            name,
            std::process::id(),
            lines.len()
        ));
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    // ============================================================
    // PACKING TESTS
    // ============================================================

    #[test]
    fn test_pack_and_render_round_trip() {
        for bases in ["A", "ATC", "ACGTACGTACGT", "TTTTGGGGCCCCAAAA"] {
            let packed = PackedKmer::from_bases(bases).unwrap();
            assert_eq!(packed.to_string(), bases);
            assert_eq!(packed.len(), bases.len());
        }
    }

    #[test]
    fn test_pack_rejects_bad_input() {
        assert!(PackedKmer::from_bases("").is_err());
        assert!(PackedKmer::from_bases("ATN").is_err());
        assert!(PackedKmer::from_bases("atc").is_err());
        let too_long = "A".repeat(65);
        assert!(PackedKmer::from_bases(&too_long).is_err());
        let longest = "G".repeat(64);
        assert!(PackedKmer::from_bases(&longest).is_ok());
    }

    #[test]
    fn test_equality_is_on_packed_value() {
        let a = PackedKmer::from_bases("ATCG").unwrap();
        let b = PackedKmer::from_bases("ATCG").unwrap();
        let c = PackedKmer::from_bases("ATCC").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let a = PackedKmer::from_bases("ATCGATCGATCGATCGATC").unwrap();
        let b = PackedKmer::from_bases("ATCGATCGATCGATCGATC").unwrap();
        assert_eq!(a.hash64(), b.hash64());
        let c = PackedKmer::from_bases("TTCGATCGATCGATCGATC").unwrap();
        assert_ne!(a.hash64(), c.hash64());
    }

    #[test]
    fn test_step_drops_first_base_and_appends() {
        let atc = PackedKmer::from_bases("ATC").unwrap();
        let next = atc.step(Extension::G.code().unwrap());
        assert_eq!(next.to_string(), "TCG");
    }

    // ============================================================
    // EXTENSION AND PAIR TESTS
    // ============================================================

    #[test]
    fn test_extension_symbols_round_trip() {
        for symbol in ['A', 'C', 'G', 'T', 'F'] {
            let ext = Extension::from_symbol(symbol).unwrap();
            assert_eq!(ext.symbol(), symbol);
        }
        assert!(Extension::from_symbol('X').is_err());
        assert_eq!(Extension::Stop.code(), None);
    }

    #[test]
    fn test_next_kmer_follows_forward_extension() {
        let pair = KmerPair::new(
            PackedKmer::from_bases("ATC").unwrap(),
            Extension::Stop,
            Extension::G,
        );
        assert!(pair.is_start_node());
        assert_eq!(pair.next_kmer().unwrap().to_string(), "TCG");

        let terminal = KmerPair::new(
            PackedKmer::from_bases("TCG").unwrap(),
            Extension::A,
            Extension::Stop,
        );
        assert!(!terminal.is_start_node());
        assert!(terminal.next_kmer().is_none());
    }

    // ============================================================
    // FILE INGEST TESTS
    // ============================================================

    #[test]
    fn test_kmer_size_and_line_count() {
        let path = temp_file("size", &["ATC F G", "TCG A T", "CGT C F"]);
        assert_eq!(kmer_size(&path).unwrap(), 3);
        assert_eq!(line_count(&path).unwrap(), 3);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_shards_cover_the_file_exactly_once() {
        let path = temp_file("shards", &["ATC F G", "TCG A T", "CGT C F"]);

        let solo = read_kmers(&path, 3, 1, 0).unwrap();
        assert_eq!(solo.len(), 3);
        assert_eq!(solo[0].kmer_str(), "ATC");

        let rank0 = read_kmers(&path, 3, 2, 0).unwrap();
        let rank1 = read_kmers(&path, 3, 2, 1).unwrap();
        assert_eq!(rank0.len() + rank1.len(), 3);
        let mut all: Vec<String> = rank0
            .iter()
            .chain(rank1.iter())
            .map(|pair| pair.kmer_str())
            .collect();
        all.sort();
        assert_eq!(all, vec!["ATC", "CGT", "TCG"]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_kmers_parses_extensions() {
        let path = temp_file("parse", &["ATC F G", "TCG A F"]);
        let kmers = read_kmers(&path, 3, 1, 0).unwrap();
        assert_eq!(kmers[0].backward, Extension::Stop);
        assert_eq!(kmers[0].forward, Extension::G);
        assert_eq!(kmers[1].backward, Extension::A);
        assert_eq!(kmers[1].forward, Extension::Stop);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_kmers_rejects_length_mismatch() {
        let path = temp_file("mismatch", &["ATCG F G"]);
        assert!(read_kmers(&path, 3, 1, 0).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_kmers_rejects_malformed_lines() {
        let path = temp_file("malformed", &["ATC F"]);
        assert!(read_kmers(&path, 3, 1, 0).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
