use anyhow::{Result, anyhow};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;

/// Longest k-mer the packed representation can carry.
pub const MAX_KMER_LEN: usize = 64;

/// Packed capacity in bytes: four bases per byte.
const PACKED_BYTES: usize = MAX_KMER_LEN / 4;

/// A DNA k-mer packed two bits per base.
///
/// The length travels with the value; bits beyond the packed length are always
/// zero, so bitwise equality on the backing array is value equality. The type
/// is `Copy` and serde-serializable so it can travel by value inside remote
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedKmer {
    len: u8,
    bytes: [u8; PACKED_BYTES],
}

fn base_code(base: char) -> Result<u8> {
    match base {
        'A' => Ok(0b00),
        'C' => Ok(0b01),
        'G' => Ok(0b10),
        'T' => Ok(0b11),
        other => Err(anyhow!("invalid DNA base '{}'", other)),
    }
}

fn code_base(code: u8) -> char {
    match code & 0b11 {
        0b00 => 'A',
        0b01 => 'C',
        0b10 => 'G',
        _ => 'T',
    }
}

impl PackedKmer {
    /// Packs a base string. Fails on an empty string, a string longer than
    /// [`MAX_KMER_LEN`], or any character outside `ACGT`.
    pub fn from_bases(bases: &str) -> Result<Self> {
        if bases.is_empty() {
            return Err(anyhow!("cannot pack an empty k-mer"));
        }
        if bases.len() > MAX_KMER_LEN {
            return Err(anyhow!(
                "k-mer of length {} exceeds the supported maximum of {}",
                bases.len(),
                MAX_KMER_LEN
            ));
        }
        let mut packed = Self {
            len: bases.len() as u8,
            bytes: [0u8; PACKED_BYTES],
        };
        for (i, base) in bases.chars().enumerate() {
            packed.set_base(i, base_code(base)?);
        }
        Ok(packed)
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Two-bit code of the base at position `i`. Position must be in range.
    fn base(&self, i: usize) -> u8 {
        (self.bytes[i / 4] >> ((i % 4) * 2)) & 0b11
    }

    /// Assumes the target bits are still zero.
    fn set_base(&mut self, i: usize, code: u8) {
        self.bytes[i / 4] |= (code & 0b11) << ((i % 4) * 2);
    }

    /// The successor key: drop the first base, append `code` at the end.
    pub fn step(&self, code: u8) -> Self {
        let mut next = Self {
            len: self.len,
            bytes: [0u8; PACKED_BYTES],
        };
        for i in 1..self.len() {
            next.set_base(i - 1, self.base(i));
        }
        next.set_base(self.len() - 1, code);
        next
    }

    /// Deterministic 64-bit hash of the packed bytes.
    ///
    /// Hashes the payload directly rather than a string rendering, and uses
    /// FxHash so every rank computes the same value for the same k-mer.
    pub fn hash64(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(&self.bytes[..self.len().div_ceil(4)]);
        hasher.write_u8(self.len);
        hasher.finish()
    }
}

impl fmt::Display for PackedKmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len() {
            write!(f, "{}", code_base(self.base(i)))?;
        }
        Ok(())
    }
}

/// One-base extension of a k-mer, or `Stop` when the edge is missing.
///
/// `Stop` renders as `F` in the input and output formats. A k-mer whose
/// backward extension is `Stop` is a start node; a forward `Stop` terminates
/// the contig walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extension {
    A,
    C,
    G,
    T,
    Stop,
}

impl Extension {
    pub fn from_symbol(symbol: char) -> Result<Self> {
        match symbol {
            'A' => Ok(Self::A),
            'C' => Ok(Self::C),
            'G' => Ok(Self::G),
            'T' => Ok(Self::T),
            'F' => Ok(Self::Stop),
            other => Err(anyhow!("invalid extension symbol '{}'", other)),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::T => 'T',
            Self::Stop => 'F',
        }
    }

    /// Two-bit base code, or `None` for `Stop`.
    pub fn code(self) -> Option<u8> {
        match self {
            Self::A => Some(0b00),
            Self::C => Some(0b01),
            Self::G => Some(0b10),
            Self::T => Some(0b11),
            Self::Stop => None,
        }
    }
}

/// A k-mer together with its backward and forward extensions.
///
/// This is the entry stored in the distributed table and the value carried by
/// remote insert operations. It is small and `Copy`; never pass it by
/// reference across the wire layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmerPair {
    pub kmer: PackedKmer,
    pub backward: Extension,
    pub forward: Extension,
}

impl KmerPair {
    pub fn new(kmer: PackedKmer, backward: Extension, forward: Extension) -> Self {
        Self {
            kmer,
            backward,
            forward,
        }
    }

    /// A start node has no backward edge and seeds a contig walk.
    pub fn is_start_node(&self) -> bool {
        self.backward == Extension::Stop
    }

    /// The key of the next k-mer along the forward edge, or `None` when this
    /// k-mer ends its contig.
    pub fn next_kmer(&self) -> Option<PackedKmer> {
        self.forward.code().map(|code| self.kmer.step(code))
    }

    pub fn kmer_str(&self) -> String {
        self.kmer.to_string()
    }
}
