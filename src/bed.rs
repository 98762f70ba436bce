//! Region file reader.
//!
//! Produces `(seq_name, start, end)` triples in the canonical zero-indexed
//! inclusive form from either a BED file (zero-indexed, half-open) or a
//! tab-delimited `CHROM POS` / `CHROM BEG END` list (one-indexed, inclusive).

use crate::region::Region;
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while reading region and genome files.
#[derive(Error, Debug)]
pub enum BedError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Error opening region file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Remote URI '{0}' must be read with a remote-capable interval reader")]
    UnsupportedScheme(String),
}

pub type Result<T> = std::result::Result<T, BedError>;

const REMOTE_SCHEMES: [&str; 3] = ["ftp://", "http://", "https://"];

/// True for URIs that a local file reader cannot open.
pub fn is_remote_uri(uri: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|s| uri.starts_with(s))
}

/// One interval from a region file, zero-indexed inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInterval {
    pub seq_name: String,
    pub start: u32,
    pub end: u32,
}

impl From<RawInterval> for Region {
    fn from(iv: RawInterval) -> Self {
        Region::new(iv.seq_name, iv.start, iv.end)
    }
}

/// A source of named-sequence intervals.
///
/// Remote or indexed readers plug in here; [`RegionFileReader`] covers local files.
pub trait IntervalReader {
    fn next_interval(&mut self) -> Result<Option<RawInterval>>;
}

/// Coordinate layout of a region file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFileLayout {
    /// `CHROM START END`, zero-indexed half-open.
    Bed,
    /// `CHROM POS` or `CHROM BEG END`, one-indexed inclusive.
    Tab,
}

impl RegionFileLayout {
    /// Pick the layout from the file name, like bcftools does.
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if name.ends_with(".bed") || name.ends_with(".bed.txt") {
            RegionFileLayout::Bed
        } else {
            RegionFileLayout::Tab
        }
    }
}

/// A streaming region file reader.
pub struct RegionFileReader<R: Read> {
    reader: BufReader<R>,
    layout: RegionFileLayout,
    line_number: usize,
    buffer: String,
}

impl RegionFileReader<File> {
    /// Open a local region file, choosing the layout from its extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        if is_remote_uri(&display) {
            return Err(BedError::UnsupportedScheme(display));
        }
        let file = File::open(path).map_err(|source| BedError::Open {
            path: display,
            source,
        })?;
        debug!("Reading regions from {}", path.display());
        Ok(Self::new(file, RegionFileLayout::from_path(path)))
    }
}

impl<R: Read> RegionFileReader<R> {
    pub fn new(reader: R, layout: RegionFileLayout) -> Self {
        Self {
            reader: BufReader::new(reader),
            layout,
            line_number: 0,
            buffer: String::with_capacity(256),
        }
    }

    /// Read the next interval, skipping blank, comment, track and browser lines.
    pub fn read_interval(&mut self) -> Result<Option<RawInterval>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> Result<RawInterval> {
        let fields: Vec<&str> = line.split('\t').collect();
        let seq_name = fields[0].to_string();

        match self.layout {
            RegionFileLayout::Bed => {
                if fields.len() < 3 {
                    return Err(self.parse_error(format!(
                        "Expected at least 3 fields, got {}",
                        fields.len()
                    )));
                }
                let start = self.parse_position(fields[1], "start")?;
                let end = self.parse_position(fields[2], "end")?;
                if start >= end {
                    return Err(
                        self.parse_error(format!("Empty or inverted interval {}-{}", start, end))
                    );
                }
                Ok(RawInterval {
                    seq_name,
                    start,
                    end: end - 1,
                })
            }
            RegionFileLayout::Tab => {
                if fields.len() < 2 {
                    return Err(self.parse_error(format!(
                        "Expected at least 2 fields, got {}",
                        fields.len()
                    )));
                }
                let beg = self.parse_position(fields[1], "position")?;
                let end = match fields.get(2) {
                    Some(f) => self.parse_position(f, "end")?,
                    None => beg,
                };
                if beg == 0 {
                    return Err(self.parse_error("Positions are 1-based, got 0".to_string()));
                }
                if beg > end {
                    return Err(self.parse_error(format!("Start ({}) > end ({})", beg, end)));
                }
                Ok(RawInterval {
                    seq_name,
                    start: beg - 1,
                    end: end - 1,
                })
            }
        }
    }

    fn parse_position(&self, s: &str, field_name: &str) -> Result<u32> {
        s.trim()
            .parse()
            .map_err(|_| self.parse_error(format!("Invalid {} position: '{}'", field_name, s)))
    }

    fn parse_error(&self, message: String) -> BedError {
        BedError::Parse {
            line: self.line_number,
            message,
        }
    }

    /// Get an iterator over all intervals.
    pub fn intervals(self) -> RegionFileIter<R> {
        RegionFileIter { reader: self }
    }
}

impl<R: Read> IntervalReader for RegionFileReader<R> {
    fn next_interval(&mut self) -> Result<Option<RawInterval>> {
        self.read_interval()
    }
}

/// Iterator over region file intervals.
pub struct RegionFileIter<R: Read> {
    reader: RegionFileReader<R>,
}

impl<R: Read> Iterator for RegionFileIter<R> {
    type Item = Result<RawInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_interval().transpose()
    }
}

/// Drain `reader`, appending each interval to `result` as a [`Region`].
///
/// Returns the number of regions appended. On error, regions read before
/// the failure remain in `result`; callers are expected to abort.
pub fn read_regions<I: IntervalReader + ?Sized>(
    reader: &mut I,
    result: &mut Vec<Region>,
) -> Result<usize> {
    let before = result.len();
    while let Some(interval) = reader.next_interval()? {
        result.push(interval.into());
    }
    let added = result.len() - before;
    if added == 0 {
        warn!("Region file contained no intervals");
    }
    Ok(added)
}

/// Parse intervals from a string (useful for testing).
pub fn parse_intervals(content: &str, layout: RegionFileLayout) -> Result<Vec<RawInterval>> {
    RegionFileReader::new(content.as_bytes(), layout)
        .intervals()
        .collect()
}
