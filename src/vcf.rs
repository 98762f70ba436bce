//! Minimal single-sample text VCF reader feeding the merge.
//!
//! Only the site columns are decoded (CHROM, POS, ID, REF, ALT and the
//! INFO `END` key); genotype columns are ignored. Positions are mapped into
//! whole-genome coordinates with a [`ContigOffsets`] table so that records
//! from different contigs order correctly in one merge.

use crate::genome::ContigOffsets;
use crate::merge::{MergeError, Positioned, RecordSource, Result};
use memchr::memchr_iter;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Site-level fields of one VCF data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfRecord {
    pub chrom: String,
    /// One-indexed position as written in the file
    pub pos: u32,
    /// One-indexed inclusive end (INFO `END`, else `POS + len(REF) - 1`)
    pub end: u32,
    pub id: String,
    pub ref_allele: String,
    pub alt: String,
    global_start: u32,
    global_end: u32,
}

impl Positioned for VcfRecord {
    #[inline]
    fn start_pos(&self) -> u32 {
        self.global_start
    }

    #[inline]
    fn end_pos(&self) -> u32 {
        self.global_end
    }
}

/// A [`RecordSource`] over one text VCF.
pub struct VcfSource<'a, R: Read> {
    reader: BufReader<R>,
    offsets: &'a ContigOffsets,
    sample_id: u32,
    sample_name: String,
    line_number: usize,
    buffer: String,
    peeked: Option<VcfRecord>,
}

impl<'a> VcfSource<'a, File> {
    /// Open a VCF file. The sample name defaults to the file stem.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        sample_id: u32,
        offsets: &'a ContigOffsets,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().trim_end_matches(".vcf").to_string())
            .unwrap_or_default();
        Self::new(file, sample_id, fallback, offsets)
    }
}

impl<'a, R: Read> VcfSource<'a, R> {
    /// Wrap a reader, consuming the header.
    ///
    /// The sample name is taken from the first genotype column of the
    /// `#CHROM` line when there is one, otherwise `fallback_name` is used.
    pub fn new(
        reader: R,
        sample_id: u32,
        fallback_name: impl Into<String>,
        offsets: &'a ContigOffsets,
    ) -> Result<Self> {
        let mut source = Self {
            reader: BufReader::with_capacity(64 * 1024, reader),
            offsets,
            sample_id,
            sample_name: fallback_name.into(),
            line_number: 0,
            buffer: String::with_capacity(1024),
            peeked: None,
        };
        source.read_header()?;
        Ok(source)
    }

    pub fn sample_name(&self) -> &str {
        &self.sample_name
    }

    fn read_header(&mut self) -> Result<()> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(());
            }
            self.line_number += 1;
            let line = self.buffer.trim_end();

            if line.starts_with("##") {
                continue;
            }
            if line.starts_with("#CHROM") {
                if let Some(name) = line.split('\t').nth(9) {
                    self.sample_name = name.to_string();
                }
                continue;
            }
            if line.is_empty() {
                continue;
            }

            let record = self.parse_line(line)?;
            self.peeked = Some(record);
            return Ok(());
        }
    }

    fn read_record(&mut self) -> Result<Option<VcfRecord>> {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = self.buffer.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> Result<VcfRecord> {
        let bytes = line.as_bytes();
        let mut fields: [&str; 8] = [""; 8];
        let mut n = 0;
        let mut field_start = 0;
        for tab in memchr_iter(b'\t', bytes).chain(std::iter::once(bytes.len())) {
            if n == fields.len() {
                break;
            }
            fields[n] = &line[field_start..tab];
            n += 1;
            field_start = tab + 1;
        }
        if n < 5 {
            return Err(self.parse_error(format!("Expected at least 5 columns, got {}", n)));
        }

        let chrom = fields[0];
        let pos: u32 = fields[1]
            .parse()
            .map_err(|_| self.parse_error(format!("Invalid POS '{}'", fields[1])))?;
        if pos == 0 {
            return Err(self.parse_error("POS must be 1-based".to_string()));
        }
        let ref_allele = fields[3];
        if ref_allele.is_empty() {
            return Err(self.parse_error("Empty REF allele".to_string()));
        }

        let end = match info_end(fields[7]) {
            Some(end) => end
                .parse::<u32>()
                .map_err(|_| self.parse_error(format!("Invalid INFO END '{}'", end)))?,
            None => pos.saturating_add(ref_allele.len() as u32 - 1),
        };
        if end < pos {
            return Err(self.parse_error(format!("END ({}) before POS ({})", end, pos)));
        }

        let offset = self
            .offsets
            .get(chrom)
            .ok_or_else(|| MergeError::UnknownContig(chrom.to_string()))?;
        let global_start = offset.checked_add(pos - 1);
        let global_end = offset.checked_add(end - 1);
        let (Some(global_start), Some(global_end)) = (global_start, global_end) else {
            return Err(self.parse_error(format!(
                "Position {}:{} overflows the global coordinate space",
                chrom, end
            )));
        };

        Ok(VcfRecord {
            chrom: chrom.to_string(),
            pos,
            end,
            id: fields[2].to_string(),
            ref_allele: ref_allele.to_string(),
            alt: fields[4].to_string(),
            global_start,
            global_end,
        })
    }

    fn parse_error(&self, message: String) -> MergeError {
        MergeError::Parse {
            sample_id: self.sample_id,
            line: self.line_number,
            message,
        }
    }
}

fn info_end(info: &str) -> Option<&str> {
    info.split(';').find_map(|kv| kv.strip_prefix("END="))
}

impl<R: Read> RecordSource for VcfSource<'_, R> {
    type Record = VcfRecord;

    fn sample_id(&self) -> u32 {
        self.sample_id
    }

    fn next_record(&mut self) -> Result<Option<VcfRecord>> {
        self.read_record()
    }
}
