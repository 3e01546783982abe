//! Line readers for corpus files: buffered for small files, memory-mapped
//! above a size threshold.
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Corpus files at or above this size are memory-mapped.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024;

pub type Lines = Box<dyn Iterator<Item = io::Result<String>> + Send + 'static>;

pub fn use_mmap(len: u64, threshold: u64) -> bool {
    threshold > 0 && len >= threshold
}

pub fn buffered_lines<P: AsRef<Path>>(path: P) -> Result<Lines> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    // invalid UTF-8 is replaced, never fatal
    let lines = BufReader::new(file)
        .split(b'\n')
        .map(|r| r.map(|bytes| decode_line(&bytes)));
    Ok(Box::new(lines))
}

pub fn mapped_lines<P: AsRef<Path>>(path: P) -> Result<Lines> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    // SAFETY: the map is read-only and dropped with the iterator.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.display()))?;
    Ok(Box::new(MappedLines { map, pos: 0 }))
}

struct MappedLines {
    map: Mmap,
    pos: usize,
}

impl Iterator for MappedLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let data: &[u8] = &self.map;
        if self.pos >= data.len() {
            return None;
        }
        let rest = &data[self.pos..];
        let end = memchr::memchr(b'\n', rest).unwrap_or(rest.len());
        self.pos += end + 1;
        Some(Ok(decode_line(&rest[..end])))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Pick the reader by file size. A threshold of 0 disables mmap.
pub fn lines<P: AsRef<Path>>(path: P, mmap_threshold: u64) -> Result<Lines> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    if meta.is_file() && use_mmap(meta.len(), mmap_threshold) {
        log::debug!("memory-mapping {} ({} bytes)", path.display(), meta.len());
        mapped_lines(path)
    } else {
        buffered_lines(path)
    }
}
