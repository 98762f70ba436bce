//! Genome file parser and the whole-genome contig offset table.
//!
//! Parses .genome files (tab-delimited: chrom\tsize). Laying the contigs end
//! to end in file order gives each one a base offset in a single linear
//! coordinate space, which is what global region ordering is computed in.

use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::bed::BedError;

/// Genome information containing chromosome sizes.
/// Preserves chromosome order from input file.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    sizes: FxHashMap<String, u64>,
    order: Vec<String>,
}

impl Genome {
    /// Create an empty genome.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load genome from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BedError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BedError::Open {
            path: path.display().to_string(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut genome = Genome::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split('\t');
            let (Some(chrom), Some(size)) = (fields.next(), fields.next()) else {
                return Err(BedError::Parse {
                    line: line_num + 1,
                    message: "Genome file requires two columns: chrom and size".to_string(),
                });
            };

            let size: u64 = size.trim().parse().map_err(|_| BedError::Parse {
                line: line_num + 1,
                message: format!("Invalid chromosome size: {}", size),
            })?;

            genome.insert(chrom.to_string(), size);
        }

        Ok(genome)
    }

    /// Get the size of a chromosome.
    #[inline]
    pub fn chrom_size(&self, chrom: &str) -> Option<u64> {
        self.sizes.get(chrom).copied()
    }

    /// Get all chromosome names in order.
    pub fn chromosomes(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Insert a chromosome size (appends to order if new).
    pub fn insert(&mut self, chrom: String, size: u64) {
        if !self.sizes.contains_key(&chrom) {
            self.order.push(chrom.clone());
        }
        self.sizes.insert(chrom, size);
    }

    /// Cumulative offsets of each chromosome, in file order.
    ///
    /// Fails if the preceding contigs do not fit in a 32-bit coordinate space.
    pub fn contig_offsets(&self) -> Result<ContigOffsets, BedError> {
        let mut offsets = ContigOffsets::new();
        let mut total: u64 = 0;
        for chrom in self.chromosomes() {
            let offset = u32::try_from(total).map_err(|_| {
                BedError::InvalidFormat(format!(
                    "Genome too large: offset of '{}' exceeds {}",
                    chrom,
                    u32::MAX
                ))
            })?;
            offsets.insert(chrom.clone(), offset);
            total += self.chrom_size(chrom).unwrap_or_default();
        }
        Ok(offsets)
    }
}

/// Mapping from contig name to its base offset in whole-genome coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContigOffsets {
    offsets: FxHashMap<String, u32>,
}

impl ContigOffsets {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, contig: &str) -> Option<u32> {
        self.offsets.get(contig).copied()
    }

    #[inline]
    pub fn contains(&self, contig: &str) -> bool {
        self.offsets.contains_key(contig)
    }

    pub fn insert(&mut self, contig: String, offset: u32) -> Option<u32> {
        self.offsets.insert(contig, offset)
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ContigOffsets {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        Self {
            offsets: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<S: Into<String>> Extend<(S, u32)> for ContigOffsets {
    fn extend<I: IntoIterator<Item = (S, u32)>>(&mut self, iter: I) {
        self.offsets
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}
