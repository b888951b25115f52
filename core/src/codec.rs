//! Binary posting-list format.
//!
//! One term entry is
//!
//! ```text
//! VarUInt  document_frequency
//! repeat document_frequency times:
//!   VarUInt  offset_gap       (offset - previous offset, first relative to 0)
//!   f32      term_frequency   (big-endian IEEE-754)
//!   VarUInt  article_id
//! ```
//!
//! The partition metadata record reuses the leading VarUInt to carry the
//! partition's distinct-article count and has no entries after it.

use crate::{ArticleId, ArticleOffset, IndexError, Posting, PostingList, Result};

const MAX_VARINT_LEN: usize = 10;

/// Append `value` as unsigned LEB128.
pub fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read one unsigned LEB128 value starting at `*pos`, advancing `*pos`.
pub fn read_varint(input: &[u8], pos: &mut usize) -> Result<u64> {
    let mut result: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = *input
            .get(*pos)
            .ok_or_else(|| IndexError::CorruptPosting("buffer ends inside a varint".into()))?;
        *pos += 1;
        let payload = (byte & 0x7F) as u64;
        if i == MAX_VARINT_LEN - 1 && payload > 1 {
            return Err(IndexError::CorruptPosting("varint overflows 64 bits".into()));
        }
        result |= payload << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(IndexError::CorruptPosting("varint longer than 10 bytes".into()))
}

fn read_f32(input: &[u8], pos: &mut usize) -> Result<f32> {
    let bytes: [u8; 4] = input
        .get(*pos..*pos + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| IndexError::CorruptPosting("buffer ends inside a term frequency".into()))?;
    *pos += 4;
    Ok(f32::from_be_bytes(bytes))
}

/// Incremental encoder for one term's postings. Offsets must arrive in
/// non-decreasing order.
#[derive(Debug, Default)]
pub struct PostingListEncoder {
    entries: Vec<u8>,
    document_frequency: u64,
    prev_offset: ArticleOffset,
}

impl PostingListEncoder {
    pub fn new() -> Self { Self::default() }

    /// Append one posting. Returns the offset the gap was taken against
    /// when `offset` would move backwards.
    pub fn push(
        &mut self,
        offset: ArticleOffset,
        term_frequency: f32,
        article_id: ArticleId,
    ) -> std::result::Result<(), ArticleOffset> {
        let gap = offset.checked_sub(self.prev_offset).ok_or(self.prev_offset)?;
        write_varint(gap, &mut self.entries);
        self.entries.extend_from_slice(&term_frequency.to_be_bytes());
        write_varint(article_id as u64, &mut self.entries);
        self.document_frequency += 1;
        self.prev_offset = offset;
        Ok(())
    }

    pub fn document_frequency(&self) -> u64 { self.document_frequency }

    pub fn is_empty(&self) -> bool { self.document_frequency == 0 }

    /// Produce the framed record and reset the encoder for the next term.
    pub fn take(&mut self) -> Vec<u8> {
        let mut record = Vec::with_capacity(self.entries.len() + MAX_VARINT_LEN);
        write_varint(self.document_frequency, &mut record);
        record.append(&mut self.entries);
        self.document_frequency = 0;
        self.prev_offset = 0;
        record
    }
}

/// Encode `term`'s postings as one record. `term` only labels errors.
pub fn encode_posting_list(term: &str, list: &PostingList) -> Result<Vec<u8>> {
    let mut encoder = PostingListEncoder::new();
    for p in list.iter() {
        encoder
            .push(p.article_offset, p.term_frequency, p.article_id)
            .map_err(|previous| IndexError::OutOfOrderOffsets {
                term: term.to_string(),
                offset: p.article_offset,
                previous,
            })?;
    }
    Ok(encoder.take())
}

pub fn decode_posting_list(bytes: &[u8]) -> Result<PostingList> {
    let mut pos = 0;
    let df = read_varint(bytes, &mut pos)?;
    // Every entry takes at least six bytes; reject absurd counts before allocating.
    if df > (bytes.len() as u64) / 6 + 1 {
        return Err(IndexError::CorruptPosting(format!(
            "declared document frequency {df} exceeds a {} byte record",
            bytes.len()
        )));
    }
    let mut postings = Vec::with_capacity(df as usize);
    let mut offset: ArticleOffset = 0;
    for _ in 0..df {
        let gap = read_varint(bytes, &mut pos)?;
        let term_frequency = read_f32(bytes, &mut pos)?;
        let raw_id = read_varint(bytes, &mut pos)?;
        let article_id = ArticleId::try_from(raw_id)
            .map_err(|_| IndexError::CorruptPosting(format!("article id {raw_id} overflows u32")))?;
        offset = offset
            .checked_add(gap)
            .ok_or_else(|| IndexError::CorruptPosting("article offset overflows u64".into()))?;
        postings.push(Posting { article_id, article_offset: offset, term_frequency });
    }
    if pos != bytes.len() {
        return Err(IndexError::CorruptPosting(format!(
            "{} trailing bytes after {df} entries",
            bytes.len() - pos
        )));
    }
    Ok(PostingList { postings })
}

/// Encode a partition's distinct-article count as a metadata record.
pub fn encode_sentinel(document_count: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_VARINT_LEN);
    write_varint(document_count, &mut out);
    out
}

pub fn decode_sentinel(bytes: &[u8]) -> Result<u64> {
    let mut pos = 0;
    let count = read_varint(bytes, &mut pos)?;
    if pos != bytes.len() {
        return Err(IndexError::CorruptPosting("metadata record carries posting entries".into()));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(article_id: ArticleId, article_offset: ArticleOffset, term_frequency: f32) -> Posting {
        Posting { article_id, article_offset, term_frequency }
    }

    #[test]
    fn varint_boundaries() {
        for value in [0u64, 1, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut buf = Vec::new();
            write_varint(value, &mut buf);
            let mut pos = 0;
            assert_eq!(read_varint(&buf, &mut pos).unwrap(), value);
            assert_eq!(pos, buf.len());
        }
        let mut buf = Vec::new();
        write_varint(300, &mut buf);
        assert_eq!(buf, vec![0xAC, 0x02]);
    }

    #[test]
    fn round_trips_a_posting_list() {
        let list = PostingList::from(vec![
            posting(4, 0, 0.25),
            posting(1, 50, 1.0),
            posting(9, 120_000_000_000, 0.0001),
        ]);
        let bytes = encode_posting_list("t", &list).unwrap();
        assert_eq!(decode_posting_list(&bytes).unwrap(), list);
    }

    #[test]
    fn stores_gaps_not_offsets() {
        let list = PostingList::from(vec![posting(1, 1_000_000, 0.5), posting(2, 1_000_001, 0.5)]);
        let bytes = encode_posting_list("t", &list).unwrap();
        // df(1) + [gap(3) + f32(4) + id(1)] + [gap(1) + f32(4) + id(1)]
        assert_eq!(bytes.len(), 1 + 8 + 6);
    }

    #[test]
    fn empty_list_is_a_single_zero() {
        let bytes = encode_posting_list("t", &PostingList::new()).unwrap();
        assert_eq!(bytes, vec![0]);
        assert!(decode_posting_list(&bytes).unwrap().is_empty());
    }

    #[test]
    fn rejects_decreasing_offsets() {
        let list = PostingList::from(vec![posting(1, 50, 0.5), posting(2, 10, 0.5)]);
        assert!(matches!(
            encode_posting_list("zebra", &list),
            Err(IndexError::OutOfOrderOffsets { ref term, offset: 10, previous: 50 }) if term == "zebra"
        ));
    }

    #[test]
    fn rejects_truncated_record() {
        let list = PostingList::from(vec![posting(1, 5, 0.5), posting(2, 9, 0.5)]);
        let bytes = encode_posting_list("t", &list).unwrap();
        for cut in 1..bytes.len() {
            assert!(
                matches!(decode_posting_list(&bytes[..cut]), Err(IndexError::CorruptPosting(_))),
                "cut at {cut} decoded"
            );
        }
    }

    #[test]
    fn rejects_count_mismatch() {
        let list = PostingList::from(vec![posting(1, 5, 0.5)]);
        let mut bytes = encode_posting_list("t", &list).unwrap();
        bytes[0] = 2;
        assert!(matches!(decode_posting_list(&bytes), Err(IndexError::CorruptPosting(_))));

        let mut bytes = encode_posting_list("t", &list).unwrap();
        bytes[0] = 0;
        assert!(matches!(decode_posting_list(&bytes), Err(IndexError::CorruptPosting(_))));
    }

    #[test]
    fn encoder_resets_between_terms() {
        let mut encoder = PostingListEncoder::new();
        encoder.push(100, 0.5, 1).unwrap();
        let first = encoder.take();
        assert!(encoder.is_empty());
        encoder.push(10, 0.5, 2).unwrap();
        let second = encoder.take();
        assert_eq!(decode_posting_list(&first).unwrap().postings[0].article_offset, 100);
        assert_eq!(decode_posting_list(&second).unwrap().postings[0].article_offset, 10);
    }

    #[test]
    fn sentinel_round_trip() {
        let bytes = encode_sentinel(42);
        assert_eq!(decode_sentinel(&bytes).unwrap(), 42);
        let with_entries = encode_posting_list("t", &PostingList::from(vec![posting(1, 0, 1.0)])).unwrap();
        assert!(decode_sentinel(&with_entries).is_err());
    }
}
