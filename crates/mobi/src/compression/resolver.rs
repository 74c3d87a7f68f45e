//! Back-reference search strategies.

use super::{MAX_CHUNK_LEN, MIN_CHUNK_LEN};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::ops::Range;

/// A run of bytes in the already seen data that equals a prefix of the
/// needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMatch {
    pub position: usize,
    pub len: usize,
}

pub trait Resolver {
    /// Finds the longest prefix of `needle` (at least `MIN_CHUNK_LEN` bytes)
    /// that occurs in the data at a start position inside `window`.
    ///
    /// The window ends right at the current position, so a match may start
    /// one or two bytes back and run past `window.end`. Among equally long
    /// matches the one starting closest to `window.end` wins, giving the
    /// shortest distance.
    fn find_chunk(&self, needle: &[u8], window: Range<usize>) -> Result<Option<ChunkMatch>>;
}

fn check_needle(needle: &[u8]) -> Result<()> {
    if (MIN_CHUNK_LEN..=MAX_CHUNK_LEN).contains(&needle.len()) {
        Ok(())
    } else {
        Err(Error::MalformedChunkRequest { len: needle.len() })
    }
}

fn common_prefix(data: &[u8], position: usize, needle: &[u8]) -> usize {
    data[position..]
        .iter()
        .zip(needle)
        .take_while(|(a, b)| a == b)
        .count()
}

/// Scans the window backwards from its end. Needs no state besides the data.
#[derive(Debug, Clone, Copy)]
pub struct LookupResolver<'a> {
    data: &'a [u8],
}

impl<'a> LookupResolver<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        LookupResolver { data }
    }
}

impl Resolver for LookupResolver<'_> {
    fn find_chunk(&self, needle: &[u8], window: Range<usize>) -> Result<Option<ChunkMatch>> {
        check_needle(needle)?;
        let end = window.end.min(self.data.len());
        let first = needle[0];

        let mut best: Option<ChunkMatch> = None;
        let mut best_len = MIN_CHUNK_LEN - 1;
        for position in (window.start..end).rev() {
            // Cheap first-byte check before comparing the run
            if self.data[position] != first {
                continue;
            }
            let len = common_prefix(self.data, position, needle);
            if len > best_len {
                best_len = len;
                best = Some(ChunkMatch { position, len });
                if len == needle.len() {
                    break;
                }
            }
        }
        Ok(best)
    }
}

/// Maps every 3-byte prefix of the data to the ascending list of positions
/// it starts at.
#[derive(Debug, Clone)]
pub struct TreeResolver<'a> {
    data: &'a [u8],
    prefixes: HashMap<[u8; 3], Vec<usize>>,
}

impl<'a> TreeResolver<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut prefixes: HashMap<[u8; 3], Vec<usize>> = HashMap::new();
        for (position, window) in data.windows(3).enumerate() {
            prefixes
                .entry([window[0], window[1], window[2]])
                .or_default()
                .push(position);
        }
        TreeResolver { data, prefixes }
    }

    pub fn prefix_locations(&self, prefix: &[u8]) -> &[usize] {
        let key = match prefix {
            [a, b, c, ..] => [*a, *b, *c],
            _ => return &[],
        };
        self.prefixes.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Resolver for TreeResolver<'_> {
    fn find_chunk(&self, needle: &[u8], window: Range<usize>) -> Result<Option<ChunkMatch>> {
        check_needle(needle)?;
        let locations = self.prefix_locations(needle);
        let first = locations.partition_point(|&position| position < window.start);

        let mut best: Option<ChunkMatch> = None;
        for &position in &locations[first..] {
            if position >= window.end {
                break;
            }
            let len = common_prefix(self.data, position, needle);
            // Later positions replace earlier ones of the same length
            if best.is_none_or(|found| len >= found.len) {
                best = Some(ChunkMatch { position, len });
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &[u8] = b"abcdefgh abcdxyz abcdefgh abcde";

    fn both(data: &[u8]) -> (LookupResolver<'_>, TreeResolver<'_>) {
        (LookupResolver::new(data), TreeResolver::new(data))
    }

    #[test]
    fn prefers_longest_then_closest() {
        let (lookup, tree) = both(TEXT);
        let needle = &TEXT[26..31]; // "abcde"
        let expected = Some(ChunkMatch {
            position: 17,
            len: 5,
        });
        assert_eq!(lookup.find_chunk(needle, 0..26).unwrap(), expected);
        assert_eq!(tree.find_chunk(needle, 0..26).unwrap(), expected);
    }

    #[test]
    fn respects_window_start() {
        let (lookup, tree) = both(TEXT);
        let needle = &TEXT[17..25]; // "abcdefgh"
        // Only the "abcdxyz" occurrence at 9 lies inside the window.
        let expected = Some(ChunkMatch {
            position: 9,
            len: 4,
        });
        assert_eq!(lookup.find_chunk(needle, 1..17).unwrap(), expected);
        assert_eq!(tree.find_chunk(needle, 1..17).unwrap(), expected);
        assert_eq!(lookup.find_chunk(needle, 10..17).unwrap(), None);
        assert_eq!(tree.find_chunk(needle, 10..17).unwrap(), None);
    }

    #[test]
    fn matches_may_overlap_the_needle() {
        let data = b"xaaaaaaaaaaaaaaa";
        let (lookup, tree) = both(data);
        let needle = &data[5..15];
        let expected = Some(ChunkMatch {
            position: 4,
            len: 10,
        });
        assert_eq!(lookup.find_chunk(needle, 0..5).unwrap(), expected);
        assert_eq!(tree.find_chunk(needle, 0..5).unwrap(), expected);
    }

    #[test]
    fn short_matches_are_ignored() {
        let data = b"abXYZab_abQ";
        let (lookup, tree) = both(data);
        assert_eq!(lookup.find_chunk(b"abQ", 0..8).unwrap(), None);
        assert_eq!(tree.find_chunk(b"abQ", 0..8).unwrap(), None);
    }

    #[test]
    fn rejects_malformed_requests() {
        let (lookup, tree) = both(TEXT);
        assert!(matches!(
            lookup.find_chunk(b"ab", 0..10),
            Err(Error::MalformedChunkRequest { len: 2 })
        ));
        assert!(matches!(
            tree.find_chunk(&TEXT[..11], 0..10),
            Err(Error::MalformedChunkRequest { len: 11 })
        ));
    }

    #[test]
    fn prefix_locations_are_ascending() {
        let tree = TreeResolver::new(TEXT);
        assert_eq!(tree.prefix_locations(b"abc"), &[0, 9, 17, 26]);
        assert!(tree.prefix_locations(b"zz").is_empty());
        assert!(tree.prefix_locations(b"qqq").is_empty());
    }
}
