//! The collection file: newline-terminated `<article id>\t<text>` records,
//! addressed by byte offset.

use crate::{ArticleId, ArticleOffset, IndexError, Result};
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

pub const EXCERPT_CHARS: usize = 80;

/// Random-access reader used to materialize result excerpts. Seek-then-read
/// is serialized through the handle's lock.
pub struct CollectionReader {
    file: Mutex<BufReader<File>>,
    len: u64,
}

impl CollectionReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let len = file.metadata()?.len();
        Ok(Self { file: Mutex::new(BufReader::new(file)), len })
    }

    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// The full record starting at `offset`, without its newline.
    pub fn fetch_line(&self, offset: ArticleOffset) -> Result<String> {
        let read_error = |reason: String| IndexError::ReadError { offset, reason };
        if offset >= self.len {
            return Err(read_error(format!("past end of collection ({} bytes)", self.len)));
        }
        let mut buf = Vec::new();
        {
            let mut reader = self.file.lock();
            reader.seek(SeekFrom::Start(offset)).map_err(|e| read_error(e.to_string()))?;
            reader.read_until(b'\n', &mut buf).map_err(|e| read_error(e.to_string()))?;
        }
        if buf.pop() != Some(b'\n') {
            return Err(read_error("record is not newline-terminated".into()));
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// First 80 characters of the record at `offset`, with `...` when cut.
    pub fn fetch_excerpt(&self, offset: ArticleOffset) -> Result<String> {
        Ok(excerpt(&self.fetch_line(offset)?))
    }
}

pub fn excerpt(line: &str) -> String {
    match line.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

/// Split a record into its article id and text.
pub fn parse_record(offset: ArticleOffset, line: &str) -> Result<(ArticleId, &str)> {
    let (id, text) = line.split_once('\t').ok_or_else(|| {
        IndexError::MalformedInput(format!("record at offset {offset} has no tab separator"))
    })?;
    let id = id.trim().parse().map_err(|_| {
        IndexError::MalformedInput(format!("record at offset {offset} has invalid article id {id:?}"))
    })?;
    Ok((id, text))
}

/// Sequential scan yielding every non-blank record with its byte offset.
pub struct Records<R> {
    reader: R,
    offset: ArticleOffset,
    buf: Vec<u8>,
}

impl<R: BufRead> Records<R> {
    pub fn new(reader: R) -> Self { Self { reader, offset: 0, buf: Vec::new() } }
}

pub fn records<P: AsRef<Path>>(path: P) -> Result<Records<BufReader<File>>> {
    Ok(Records::new(BufReader::new(File::open(path.as_ref())?)))
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<(ArticleOffset, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let start = self.offset;
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(n) => self.offset += n as u64,
                Err(e) => return Some(Err(e.into())),
            }
            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            return Some(Ok((start, line.to_string())));
        }
    }
}

lazy_static! {
    static ref DUMP_LINE: Regex = Regex::new(r#"^wikipedia-(\d+),"\s*(.+)\s*"\s*$"#).expect("valid regex");
}

/// Convert one raw dump line (`wikipedia-<id>,"<text>"`) into a record.
pub fn convert_dump_line(line: &str) -> Option<String> {
    let caps = DUMP_LINE.captures(line)?;
    Some(format!("{}\t{}", &caps[1], &caps[2]))
}

/// Rewrite a raw dump into the collection format, returning the number of
/// records written. Lines that do not match are skipped.
pub fn prepare_collection(input: &Path, output: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(input)?);
    let mut out = BufWriter::new(File::create(output)?);
    let mut written = 0usize;
    let mut skipped = 0usize;
    for line in reader.lines() {
        match convert_dump_line(&line?) {
            Some(record) => {
                writeln!(out, "{record}")?;
                written += 1;
            }
            None => skipped += 1,
        }
    }
    out.flush()?;
    tracing::info!(written, skipped, "collection prepared");
    Ok(written)
}
