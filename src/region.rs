//! Genomic regions and the indexing conventions used to write them down.
//!
//! Internally a [`Region`] is always zero-indexed and inclusive on both ends.
//! Text and files use other conventions, so every conversion goes through
//! [`Region::parse`] and [`Region::to_string_as`] with an explicit [`RegionType`].

use crate::bed::{self, BedError, RegionFileReader};
use crate::genome::ContigOffsets;
use crate::logging::LogLevelOverride;
use crate::parallel::PARALLEL_THRESHOLD;
use log::LevelFilter;
use rayon::prelude::*;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while parsing, formatting or sorting regions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegionError {
    #[error("Error parsing region string '{0}'; invalid format, should be CHR:XX,XXX-YY,YYY")]
    InvalidFormat(String),

    #[error("Invalid region '{0}', min > max")]
    InvertedRange(String),

    #[error("Error sorting regions list; no contig offset found for '{0}'")]
    MissingContigOffset(String),

    #[error("Unknown region type '{0}' (expected 0-inclusive, 0-half-open or 1-inclusive)")]
    UnknownConvention(String),
}

pub type Result<T> = std::result::Result<T, RegionError>;

/// Indexing convention of a textual region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionType {
    /// `chr1:0-9` covers the first ten bases. This is the internal form.
    ZeroIndexedInclusive,
    /// `chr1:0-10` covers the first ten bases (BED style).
    ZeroIndexedHalfOpen,
    /// `chr1:1-10` covers the first ten bases (samtools / bcftools style).
    OneIndexedInclusive,
}

impl RegionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionType::ZeroIndexedInclusive => "0-inclusive",
            RegionType::ZeroIndexedHalfOpen => "0-half-open",
            RegionType::OneIndexedInclusive => "1-inclusive",
        }
    }
}

impl FromStr for RegionType {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "0-inclusive" | "zero-indexed-inclusive" => Ok(RegionType::ZeroIndexedInclusive),
            "0-half-open" | "zero-indexed-half-open" | "bed" => {
                Ok(RegionType::ZeroIndexedHalfOpen)
            }
            "1-inclusive" | "one-indexed-inclusive" => Ok(RegionType::OneIndexedInclusive),
            _ => Err(RegionError::UnknownConvention(s.to_string())),
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An interval on a named sequence, stored zero-indexed and inclusive.
///
/// `seq_offset` caches the contig's position in a whole-genome coordinate
/// space once it has been looked up; it does not take part in equality.
#[derive(Debug, Clone, Default)]
pub struct Region {
    pub seq_name: String,
    pub min: u32,
    pub max: u32,
    seq_offset: Option<u32>,
}

impl Region {
    /// Create a region from already-canonical bounds. No validation is done.
    pub fn new(seq_name: impl Into<String>, min: u32, max: u32) -> Self {
        Self {
            seq_name: seq_name.into(),
            min,
            max,
            seq_offset: None,
        }
    }

    /// Parse `NAME` or `NAME:START-END`, interpreting the bounds per `parse_from`.
    ///
    /// Digit-grouping commas in the range are ignored. A bare name yields
    /// `(NAME, 0, 0)` and an empty string yields `("", 0, 0)`.
    pub fn parse(region_str: &str, parse_from: RegionType) -> Result<Self> {
        if region_str.is_empty() {
            return Ok(Self::new("", 0, 0));
        }

        let mut parts = region_str.split(':');
        let seq_name = parts.next().unwrap_or_default();
        let range = parts.next();
        if parts.next().is_some() {
            return Err(RegionError::InvalidFormat(region_str.to_string()));
        }

        let Some(range) = range else {
            return Ok(Self::new(seq_name, 0, 0));
        };

        let range: String = range.chars().filter(|&c| c != ',').collect();
        let mut bounds = range.split('-');
        let (Some(lo), Some(hi), None) = (bounds.next(), bounds.next(), bounds.next()) else {
            return Err(RegionError::InvalidFormat(region_str.to_string()));
        };

        let min = parse_bound(lo, region_str)?;
        let max = parse_bound(hi, region_str)?;
        if min > max {
            return Err(RegionError::InvertedRange(region_str.to_string()));
        }

        let (min, max) = match parse_from {
            RegionType::ZeroIndexedInclusive => (min, max),
            RegionType::ZeroIndexedHalfOpen => {
                // An interval ending at 0 is empty
                let max = max
                    .checked_sub(1)
                    .ok_or_else(|| RegionError::InvalidFormat(region_str.to_string()))?;
                if min > max {
                    return Err(RegionError::InvertedRange(region_str.to_string()));
                }
                (min, max)
            }
            RegionType::OneIndexedInclusive => {
                if min == 0 {
                    return Err(RegionError::InvalidFormat(region_str.to_string()));
                }
                (min - 1, max - 1)
            }
        };

        Ok(Self::new(
            seq_name,
            narrow_bound(min, region_str)?,
            narrow_bound(max, region_str)?,
        ))
    }

    /// Render as `NAME:START-END` in the given convention.
    pub fn to_string_as(&self, convention: RegionType) -> String {
        let (min, max) = (u64::from(self.min), u64::from(self.max));
        let (lo, hi) = match convention {
            RegionType::ZeroIndexedInclusive => (min, max),
            RegionType::ZeroIndexedHalfOpen => (min, max + 1),
            RegionType::OneIndexedInclusive => (min + 1, max + 1),
        };

        let mut buf = itoa::Buffer::new();
        let mut out = String::with_capacity(self.seq_name.len() + 24);
        out.push_str(&self.seq_name);
        out.push(':');
        out.push_str(buf.format(lo));
        out.push('-');
        out.push_str(buf.format(hi));
        out
    }

    /// Render using a convention given by name, e.g. from user input.
    pub fn to_string_named(&self, convention: &str) -> Result<String> {
        Ok(self.to_string_as(convention.parse()?))
    }

    /// Number of bases covered.
    #[inline]
    pub fn len(&self) -> u64 {
        u64::from(self.max) - u64::from(self.min) + 1
    }

    /// Always false: an inclusive region covers at least one base.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Contig offset recorded by [`Region::resolve_offset`], if any.
    #[inline]
    pub fn seq_offset(&self) -> Option<u32> {
        self.seq_offset
    }

    /// Look up and remember this region's contig offset.
    pub fn resolve_offset(&mut self, contig_offsets: &ContigOffsets) -> Result<u32> {
        let offset = contig_offsets
            .get(&self.seq_name)
            .ok_or_else(|| RegionError::MissingContigOffset(self.seq_name.clone()))?;
        self.seq_offset = Some(offset);
        Ok(offset)
    }

    /// Start of the region in whole-genome coordinates.
    pub fn global_min(&self, contig_offsets: &ContigOffsets) -> Result<u64> {
        let offset = match self.seq_offset {
            Some(offset) => offset,
            None => contig_offsets
                .get(&self.seq_name)
                .ok_or_else(|| RegionError::MissingContigOffset(self.seq_name.clone()))?,
        };
        Ok(u64::from(offset) + u64::from(self.min))
    }

    /// Sort regions by global start coordinate.
    ///
    /// Every region must have an entry in `contig_offsets`; otherwise the
    /// list is left untouched and the missing contig is reported. Resolved
    /// offsets are stored on the regions. Order among equal keys is unspecified.
    pub fn sort(contig_offsets: &ContigOffsets, regions: &mut [Region]) -> Result<()> {
        let mut resolved = Vec::with_capacity(regions.len());
        for region in regions.iter() {
            let offset = contig_offsets
                .get(&region.seq_name)
                .ok_or_else(|| RegionError::MissingContigOffset(region.seq_name.clone()))?;
            resolved.push(offset);
        }
        for (region, offset) in regions.iter_mut().zip(resolved) {
            region.seq_offset = Some(offset);
        }

        let key = |r: &Region| u64::from(r.seq_offset.unwrap_or(u32::MAX)) + u64::from(r.min);
        if regions.len() >= PARALLEL_THRESHOLD {
            regions.par_sort_unstable_by_key(key);
        } else {
            regions.sort_unstable_by_key(key);
        }
        Ok(())
    }

    /// Append every interval of a local region file to `result`.
    ///
    /// `.bed` files are read as zero-indexed half-open, anything else as a
    /// one-indexed `CHROM POS [END]` list. Logging is held at error level
    /// while the file is read.
    pub fn parse_bed_file<P: AsRef<Path>>(
        path: P,
        result: &mut Vec<Region>,
    ) -> std::result::Result<usize, BedError> {
        let _quiet = LogLevelOverride::new(LevelFilter::Error);
        let mut reader = RegionFileReader::from_path(path)?;
        bed::read_regions(&mut reader, result)
    }
}

/// Read as u64: the shifted conventions print bounds up to `u32::MAX + 1`.
fn parse_bound(field: &str, region_str: &str) -> Result<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RegionError::InvalidFormat(region_str.to_string()));
    }
    field
        .parse()
        .map_err(|_| RegionError::InvalidFormat(region_str.to_string()))
}

fn narrow_bound(value: u64, region_str: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| RegionError::InvalidFormat(region_str.to_string()))
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.seq_name == other.seq_name && self.min == other.min && self.max == other.max
    }
}

impl Eq for Region {}

impl Hash for Region {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.seq_name.hash(state);
        self.min.hash(state);
        self.max.hash(state);
    }
}

/// Zero-indexed inclusive form, matching the stored bounds.
impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_as(RegionType::ZeroIndexedInclusive))
    }
}

/// Parses one-indexed inclusive strings, the form users type on the command line.
impl FromStr for Region {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self> {
        Region::parse(s, RegionType::OneIndexedInclusive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [RegionType; 3] = [
        RegionType::ZeroIndexedInclusive,
        RegionType::ZeroIndexedHalfOpen,
        RegionType::OneIndexedInclusive,
    ];

    fn offsets(pairs: &[(&str, u32)]) -> ContigOffsets {
        pairs.iter().map(|(n, o)| (n.to_string(), *o)).collect()
    }

    #[test]
    fn test_parse_one_indexed_with_commas() {
        let r = Region::parse("chr1:1,000-2,000", RegionType::OneIndexedInclusive).unwrap();
        assert_eq!(r.seq_name, "chr1");
        assert_eq!(r.min, 999);
        assert_eq!(r.max, 1999);
        assert_eq!(r.seq_offset(), None);
    }

    #[test]
    fn test_parse_conventions() {
        let r = Region::parse("chr2:10-20", RegionType::ZeroIndexedInclusive).unwrap();
        assert_eq!((r.min, r.max), (10, 20));

        let r = Region::parse("chr2:10-20", RegionType::ZeroIndexedHalfOpen).unwrap();
        assert_eq!((r.min, r.max), (10, 19));

        let r = Region::parse("chr2:10-20", RegionType::OneIndexedInclusive).unwrap();
        assert_eq!((r.min, r.max), (9, 19));
    }

    #[test]
    fn test_parse_bare_name_and_empty() {
        for t in ALL_TYPES {
            assert_eq!(Region::parse("chr1", t).unwrap(), Region::new("chr1", 0, 0));
            assert_eq!(Region::parse("", t).unwrap(), Region::new("", 0, 0));
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bad = [
            "chr1:1:2-3",
            "chr1:100",
            "chr1:1-2-3",
            "chr1:a-10",
            "chr1:10-b",
            "chr1:-10",
            "chr1:",
            "chr1:+1-5",
        ];
        for s in bad {
            for t in ALL_TYPES {
                assert!(Region::parse(s, t).is_err(), "{} should fail as {}", s, t);
            }
        }
    }

    #[test]
    fn test_parse_inverted_range() {
        for t in ALL_TYPES {
            let err = Region::parse("chr1:100-50", t).unwrap_err();
            assert_eq!(err, RegionError::InvertedRange("chr1:100-50".to_string()));
        }
    }

    #[test]
    fn test_parse_convention_underflow() {
        assert!(Region::parse("chr1:0-0", RegionType::ZeroIndexedHalfOpen).is_err());
        assert!(Region::parse("chr1:5-5", RegionType::ZeroIndexedHalfOpen).is_err());
        assert!(Region::parse("chr1:0-5", RegionType::OneIndexedInclusive).is_err());
        assert!(Region::parse("chr1:0-0", RegionType::ZeroIndexedInclusive).is_ok());
    }

    #[test]
    fn test_format() {
        let r = Region::new("chrX", 999, 1999);
        assert_eq!(r.to_string_as(RegionType::ZeroIndexedInclusive), "chrX:999-1999");
        assert_eq!(r.to_string_as(RegionType::ZeroIndexedHalfOpen), "chrX:999-2000");
        assert_eq!(r.to_string_as(RegionType::OneIndexedInclusive), "chrX:1000-2000");
        assert_eq!(r.to_string(), "chrX:999-1999");
    }

    #[test]
    fn test_format_named_convention() {
        let r = Region::new("chr1", 0, 9);
        assert_eq!(r.to_string_named("1-inclusive").unwrap(), "chr1:1-10");
        assert_eq!(
            r.to_string_named("2-exclusive").unwrap_err(),
            RegionError::UnknownConvention("2-exclusive".to_string())
        );
    }

    #[test]
    fn test_format_max_bound_does_not_overflow() {
        let r = Region::new("chr1", u32::MAX, u32::MAX);
        assert_eq!(r.to_string_as(RegionType::OneIndexedInclusive), "chr1:4294967296-4294967296");
    }

    #[test]
    fn test_round_trip_at_u32_bounds() {
        let regions = [
            Region::new("chr1", 0, u32::MAX),
            Region::new("chr1", u32::MAX, u32::MAX),
            Region::new("chr1", u32::MAX - 1, u32::MAX),
        ];
        for r in &regions {
            for t in ALL_TYPES {
                let text = r.to_string_as(t);
                let parsed = Region::parse(&text, t)
                    .unwrap_or_else(|e| panic!("{} as {} failed: {}", text, t, e));
                assert_eq!(&parsed, r);
                assert_eq!(parsed.to_string_as(t), text);
            }
        }
    }

    #[test]
    fn test_parse_rejects_bound_past_u32_after_shift() {
        let cases = [
            ("chr1:0-4294967296", RegionType::ZeroIndexedInclusive),
            ("chr1:0-4294967297", RegionType::ZeroIndexedHalfOpen),
            ("chr1:1-4294967297", RegionType::OneIndexedInclusive),
            ("chr1:1-99999999999999999999", RegionType::OneIndexedInclusive),
        ];
        for (text, t) in cases {
            assert!(
                matches!(Region::parse(text, t), Err(RegionError::InvalidFormat(_))),
                "{} as {}",
                text,
                t
            );
        }
    }

    #[test]
    fn test_round_trip_each_convention() {
        let regions = [
            Region::new("chr1", 0, 0),
            Region::new("chr1", 5, 5),
            Region::new("chr17", 123, 45678),
            Region::new("HLA-A*01:01", 7, 9),
        ];
        for r in &regions {
            for t in ALL_TYPES {
                let text = r.to_string_as(t);
                // Names containing ':' cannot round trip
                if r.seq_name.contains(':') {
                    assert!(Region::parse(&text, t).is_err());
                    continue;
                }
                let parsed = Region::parse(&text, t).unwrap();
                assert_eq!(&parsed, r);
                assert_eq!(parsed.to_string_as(t), text);
            }
        }
    }

    #[test]
    fn test_from_str_is_one_indexed() {
        let r: Region = "chr3:1-10".parse().unwrap();
        assert_eq!(r, Region::new("chr3", 0, 9));
    }

    #[test]
    fn test_sort_by_global_coordinate() {
        let offs = offsets(&[("chrA", 0), ("chrB", 1000)]);
        let mut regions = vec![Region::new("chrB", 10, 20), Region::new("chrA", 5, 15)];
        Region::sort(&offs, &mut regions).unwrap();
        assert_eq!(
            regions,
            vec![Region::new("chrA", 5, 15), Region::new("chrB", 10, 20)]
        );
        assert_eq!(regions[0].seq_offset(), Some(0));
        assert_eq!(regions[1].seq_offset(), Some(1000));
    }

    #[test]
    fn test_sort_interleaves_across_contigs_by_offset() {
        let offs = offsets(&[("chr1", 0), ("chr2", 100), ("chr10", 50)]);
        let mut regions = vec![
            Region::new("chr2", 0, 1),
            Region::new("chr10", 60, 70),
            Region::new("chr1", 70, 80),
            Region::new("chr10", 0, 5),
        ];
        Region::sort(&offs, &mut regions).unwrap();
        let names: Vec<_> = regions.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, ["chr10:0-5", "chr1:70-80", "chr2:0-1", "chr10:60-70"]);
    }

    #[test]
    fn test_sort_missing_contig_any_position() {
        let offs = offsets(&[("chr1", 0), ("chr2", 500)]);
        let known = [Region::new("chr1", 1, 2), Region::new("chr2", 3, 4)];
        for pos in 0..=known.len() {
            let mut regions = known.to_vec();
            regions.insert(pos, Region::new("chrUn", 0, 1));
            let before = regions.clone();
            let err = Region::sort(&offs, &mut regions).unwrap_err();
            assert_eq!(err, RegionError::MissingContigOffset("chrUn".to_string()));
            assert_eq!(regions, before);
        }

        let mut single = vec![Region::new("chrUn", 0, 1)];
        assert!(Region::sort(&offs, &mut single).is_err());
    }

    #[test]
    fn test_global_min_uses_cached_offset() {
        let offs = offsets(&[("chr2", 1000)]);
        let mut r = Region::new("chr2", 5, 10);
        assert_eq!(r.global_min(&offs).unwrap(), 1005);
        assert_eq!(r.resolve_offset(&offs).unwrap(), 1000);
        assert_eq!(r.global_min(&ContigOffsets::new()).unwrap(), 1005);
        assert!(Region::new("chr3", 0, 0).global_min(&offs).is_err());
    }

    #[test]
    fn test_region_type_names() {
        for t in ALL_TYPES {
            assert_eq!(t.as_str().parse::<RegionType>().unwrap(), t);
        }
        assert_eq!("BED".parse::<RegionType>().unwrap(), RegionType::ZeroIndexedHalfOpen);
    }

    #[test]
    fn test_len() {
        assert_eq!(Region::new("chr1", 0, 0).len(), 1);
        assert_eq!(Region::new("chr1", 10, 19).len(), 10);
    }
}
