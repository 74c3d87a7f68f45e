//! Cutting the rendered book into text records.

use crate::compression::{pack, Compression, CompressionStrategy, MarkedChunk, RECORD_SIZE};
use crate::error::Result;
use std::thread;
use tracing::debug;

/// Cuts `text` into records of `RECORD_SIZE` bytes, each extended to the
/// next character boundary. The number of bytes past the nominal size
/// becomes the record's tail marker.
pub(crate) fn split_records(text: &[u8]) -> Result<Vec<MarkedChunk>> {
    let mut chunks = Vec::with_capacity(text.len().div_ceil(RECORD_SIZE));
    let mut start = 0;
    while start < text.len() {
        let mut end = (start + RECORD_SIZE).min(text.len());
        let mut overflow = 0u8;
        while end < text.len() && is_continuation(text[end]) && overflow < 3 {
            end += 1;
            overflow += 1;
        }
        chunks.push(MarkedChunk::new(text[start..end].to_vec(), overflow)?);
        start = end;
    }
    Ok(chunks)
}

fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Turns marked chunks into record payloads, in order.
pub(crate) fn encode_records(
    chunks: Vec<MarkedChunk>,
    compression: Compression,
    strategy: CompressionStrategy,
    parallel: bool,
) -> Result<Vec<Vec<u8>>> {
    if compression != Compression::PalmDoc {
        return Ok(chunks.into_iter().map(MarkedChunk::into_inner).collect());
    }

    let workers = if parallel {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(chunks.len())
            .max(1)
    } else {
        1
    };
    debug!(records = chunks.len(), workers, "compressing text records");

    if workers == 1 {
        return chunks.iter().map(|chunk| pack(chunk, strategy)).collect();
    }

    let group = chunks.len().div_ceil(workers);
    let mut slots: Vec<Result<Vec<u8>>> = (0..chunks.len()).map(|_| Ok(Vec::new())).collect();
    thread::scope(|scope| {
        for (inputs, outputs) in chunks.chunks(group).zip(slots.chunks_mut(group)) {
            scope.spawn(move || {
                for (chunk, slot) in inputs.iter().zip(outputs) {
                    *slot = pack(chunk, strategy);
                }
            });
        }
    });
    slots.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::unpack;

    #[test]
    fn splits_on_character_boundaries() {
        let mut text = "a".repeat(4095).into_bytes();
        text.extend_from_slice("€bc".as_bytes());
        let chunks = split_records(&text).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].as_bytes().len(), 4098 + 1);
        assert_eq!(chunks[0].tail_len(), 2);
        assert_eq!(chunks[1].as_bytes(), b"bc\x00");
    }

    #[test]
    fn exact_record_has_empty_tail() {
        let text = vec![b'x'; RECORD_SIZE];
        let chunks = split_records(&text).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].tail_len(), 0);
        assert!(split_records(b"").unwrap().is_empty());
    }

    #[test]
    fn parallel_output_matches_sequential() {
        let text: Vec<u8> = (0..20_000u32)
            .map(|i| b"<p>Lorem ipsum dolor</p>\n"[(i % 25) as usize])
            .collect();
        let chunks = split_records(&text).unwrap();
        let parallel = encode_records(
            chunks.clone(),
            Compression::PalmDoc,
            CompressionStrategy::Fast,
            true,
        )
        .unwrap();
        let sequential = encode_records(
            chunks.clone(),
            Compression::PalmDoc,
            CompressionStrategy::LowMemory,
            false,
        )
        .unwrap();
        assert_eq!(parallel, sequential);

        let restored: Vec<u8> = parallel
            .iter()
            .flat_map(|record| {
                let mut data = unpack(record).unwrap();
                data.pop();
                data
            })
            .collect();
        assert_eq!(restored, text);
    }

    #[test]
    fn uncompressed_records_keep_their_marker() {
        let chunks = split_records(b"plain").unwrap();
        let records =
            encode_records(chunks, Compression::None, CompressionStrategy::Fast, true).unwrap();
        assert_eq!(records, [b"plain\x00".to_vec()]);
    }
}
