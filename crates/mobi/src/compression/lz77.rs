use super::resolver::{LookupResolver, Resolver, TreeResolver};
use super::{CompressionStrategy, MarkedChunk, MAX_CHUNK_LEN, MIN_CHUNK_LEN, WINDOW_SIZE};
use crate::error::{Error, Result};
use tracing::trace;

/// Bytes that stand for themselves in the compressed stream.
fn is_literal(byte: u8) -> bool {
    byte == 0 || (0x09..0x80).contains(&byte)
}

/// Compresses one record. The tail declared by the chunk marker is copied
/// after the compressed body unchanged.
pub fn pack(chunk: &MarkedChunk, strategy: CompressionStrategy) -> Result<Vec<u8>> {
    let (body, _) = chunk.split();
    match strategy {
        CompressionStrategy::Fast => pack_with(chunk, &TreeResolver::new(body)),
        CompressionStrategy::LowMemory => pack_with(chunk, &LookupResolver::new(body)),
    }
}

/// Compresses one record with a caller supplied resolver. Matches outside
/// the search window or of an unencodable length are rejected.
pub fn pack_with<R: Resolver>(chunk: &MarkedChunk, resolver: &R) -> Result<Vec<u8>> {
    let (data, tail) = chunk.split();
    let len = data.len();
    let mut out = Vec::with_capacity(chunk.as_bytes().len());

    let mut i = 0;
    while i < len {
        if i > MAX_CHUNK_LEN && len - i > MAX_CHUNK_LEN {
            let window = i.saturating_sub(WINDOW_SIZE)..i;
            if let Some(found) = resolver.find_chunk(&data[i..i + MAX_CHUNK_LEN], window.clone())? {
                if !window.contains(&found.position) {
                    return Err(Error::InvalidBackReference {
                        distance: i.wrapping_sub(found.position),
                        position: i,
                    });
                }
                if !(MIN_CHUNK_LEN..=MAX_CHUNK_LEN).contains(&found.len) {
                    return Err(Error::MalformedChunkRequest { len: found.len });
                }
                let distance = (i - found.position) as u16;
                let code = 0x8000 | (distance << 3) | (found.len - MIN_CHUNK_LEN) as u16;
                out.extend_from_slice(&code.to_be_bytes());
                i += found.len;
                continue;
            }
        }

        let byte = data[i];
        if byte == b' ' && i + 1 < len {
            let next = data[i + 1];
            if (0x40..0x80).contains(&next) {
                out.push(next ^ 0x80);
                i += 2;
            } else {
                out.push(byte);
                i += 1;
            }
            continue;
        }

        if is_literal(byte) {
            out.push(byte);
            i += 1;
            continue;
        }

        let run = data[i..]
            .iter()
            .take(8)
            .take_while(|&&b| !is_literal(b))
            .count();
        out.push(run as u8);
        out.extend_from_slice(&data[i..i + run]);
        i += run;
    }

    out.extend_from_slice(tail);
    trace!(
        input = chunk.as_bytes().len(),
        output = out.len(),
        "packed record"
    );
    Ok(out)
}

/// Expands a compressed stream with no trailing tail.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let frame = data[i];
        i += 1;

        match frame {
            1..=8 => {
                let n = frame as usize;
                let raw = data
                    .get(i..i + n)
                    .ok_or(Error::Truncated("raw byte run"))?;
                out.extend_from_slice(raw);
                i += n;
            }
            0 | 0x09..=0x7F => out.push(frame),
            0xC0..=0xFF => {
                out.push(b' ');
                out.push(frame ^ 0x80);
            }
            0x80..=0xBF => {
                let second = *data.get(i).ok_or(Error::Truncated("back reference"))?;
                i += 1;

                let code = u16::from_be_bytes([frame, second]);
                let distance = ((code & 0x3FFF) >> 3) as usize;
                let length = (code & 0x07) as usize + MIN_CHUNK_LEN;
                if distance == 0 || distance > out.len() {
                    return Err(Error::InvalidBackReference {
                        distance,
                        position: out.len(),
                    });
                }

                // Byte by byte, the source may overlap what is being written
                let mut src = out.len() - distance;
                for _ in 0..length {
                    out.push(out[src]);
                    src += 1;
                }
            }
        }
    }

    Ok(out)
}

/// Reverses [`pack`]: decompresses the body and reattaches the raw tail, so
/// the result ends with the original marker byte.
pub fn unpack(record: &[u8]) -> Result<Vec<u8>> {
    let chunk = MarkedChunk::from_marked(record.to_vec())?;
    let (body, tail) = chunk.split();
    let mut out = decompress(body)?;
    out.extend_from_slice(tail);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::ChunkMatch;
    use proptest::prelude::*;
    use std::ops::Range;

    fn marked(body: &[u8]) -> MarkedChunk {
        MarkedChunk::new(body.to_vec(), 0).unwrap()
    }

    #[test]
    fn packs_plain_ascii_as_literals() {
        let packed = pack(&marked(b"Hi!"), CompressionStrategy::Fast).unwrap();
        assert_eq!(packed, b"Hi!\x00");
    }

    #[test]
    fn unique_literals_pass_through() {
        let body: Vec<u8> = (0x21..0x7F).collect();
        let packed = pack(&marked(&body), CompressionStrategy::Fast).unwrap();
        assert_eq!(packed, [&body[..], &[0]].concat());
    }

    #[test]
    fn folds_space_before_letters() {
        let packed = pack(&marked(b"a b 1"), CompressionStrategy::Fast).unwrap();
        assert_eq!(packed, [b'a', b'b' ^ 0x80, b' ', b'1', 0]);
        assert_eq!(decompress(&packed[..4]).unwrap(), b"a b 1");
    }

    #[test]
    fn groups_binary_runs() {
        let body = [0xE2, 0x80, 0x94, b'x', 1, 2, 3, 4, 5, 6, 7, 8, 0xFF];
        let packed = pack(&marked(&body), CompressionStrategy::LowMemory).unwrap();
        assert_eq!(
            packed,
            [3, 0xE2, 0x80, 0x94, b'x', 8, 1, 2, 3, 4, 5, 6, 7, 8, 1, 0xFF, 0]
        );
        assert_eq!(unpack(&packed).unwrap()[..body.len()], body);
    }

    #[test]
    fn emits_back_references() {
        let body = b"<p>abcdefghijk</p><p>abcdefghijk</p>";
        let packed = pack(&marked(body), CompressionStrategy::Fast).unwrap();
        assert!(packed.len() < body.len());
        assert!(packed.iter().any(|b| (0x80..0xC0).contains(b)));
        assert_eq!(unpack(&packed).unwrap(), [&body[..], &[0]].concat());
    }

    struct FixedMatch(ChunkMatch);

    impl Resolver for FixedMatch {
        fn find_chunk(&self, _: &[u8], _: Range<usize>) -> Result<Option<ChunkMatch>> {
            Ok(Some(self.0))
        }
    }

    #[test]
    fn rejects_matches_outside_the_window() {
        let chunk = marked(&[b'x'; 40]);
        let ahead = FixedMatch(ChunkMatch {
            position: 20,
            len: 3,
        });
        assert!(matches!(
            pack_with(&chunk, &ahead),
            Err(Error::InvalidBackReference { position: 11, .. })
        ));

        let too_long = FixedMatch(ChunkMatch {
            position: 0,
            len: 11,
        });
        assert!(matches!(
            pack_with(&chunk, &too_long),
            Err(Error::MalformedChunkRequest { len: 11 })
        ));
    }

    #[test]
    fn tail_is_stored_verbatim() {
        let mut body = b"some text with an overflowing character ".to_vec();
        body.extend_from_slice("é".as_bytes());
        let chunk = MarkedChunk::new(body.clone(), 1).unwrap();
        let packed = pack(&chunk, CompressionStrategy::Fast).unwrap();
        assert_eq!(&packed[packed.len() - 2..], &[0xA9, 1]);
        assert_eq!(unpack(&packed).unwrap(), chunk.as_bytes());
    }

    #[test]
    fn strategies_agree_on_html() {
        let html = include_bytes!("../../tests/data/lipsum.html");
        let chunk = marked(html);
        let fast = pack(&chunk, CompressionStrategy::Fast).unwrap();
        let low_memory = pack(&chunk, CompressionStrategy::LowMemory).unwrap();
        assert_eq!(fast, low_memory);
        assert!(fast.len() < html.len());
        assert_eq!(unpack(&fast).unwrap(), chunk.as_bytes());
    }

    #[test]
    fn full_record_round_trips() {
        let body: Vec<u8> = b"0123456789abcdef".iter().cycle().take(4096).copied().collect();
        let chunk = marked(&body);
        let packed = pack(&chunk, CompressionStrategy::Fast).unwrap();
        assert_eq!(packed.last(), Some(&0));
        assert_eq!(unpack(&packed).unwrap(), chunk.as_bytes());
    }

    #[test]
    fn rejects_corrupt_streams() {
        assert!(matches!(decompress(&[0x80]), Err(Error::Truncated(_))));
        assert!(matches!(decompress(&[3, 0xFF]), Err(Error::Truncated(_))));
        assert!(matches!(
            decompress(&[b'a', 0x80, 0x18]),
            Err(Error::InvalidBackReference { distance: 3, .. })
        ));
        assert!(unpack(&[]).is_err());
    }

    proptest! {
        #[test]
        fn strategies_produce_identical_output(
            body in proptest::collection::vec(prop_oneof![Just(b'a'), Just(b'b'), Just(b' '), any::<u8>()], 0..1500)
        ) {
            let chunk = marked(&body);
            let fast = pack(&chunk, CompressionStrategy::Fast).unwrap();
            let low_memory = pack(&chunk, CompressionStrategy::LowMemory).unwrap();
            prop_assert_eq!(&fast, &low_memory);
            prop_assert_eq!(unpack(&fast).unwrap(), chunk.into_inner());
        }

        #[test]
        fn round_trips_with_any_tail(
            body in proptest::collection::vec(any::<u8>(), 0..4100),
            tail in 0u8..=3,
        ) {
            let tail = tail.min(body.len() as u8);
            let chunk = MarkedChunk::new(body, tail).unwrap();
            let packed = pack(&chunk, CompressionStrategy::Fast).unwrap();
            prop_assert_eq!(unpack(&packed).unwrap(), chunk.into_inner());
        }
    }
}
