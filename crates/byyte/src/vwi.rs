//! Variable-width integers as used by MOBI index records.
//!
//! Every byte carries seven payload bits, most significant group first. The
//! top bit marks the last byte of a value.

const STOP_BIT: u8 = 0x80;
const PAYLOAD_MASK: u8 = 0x7F;

/// Decodes one value from the start of `src` (or from its end when `forward`
/// is false). Returns the value and the number of bytes it occupied.
///
/// Decoding stops at the byte carrying the stop bit. Input without a stop bit
/// is consumed entirely.
pub fn decode(src: &[u8], forward: bool) -> (u32, usize) {
    let mut groups: Vec<u8> = Vec::with_capacity(5);

    let mut collect = |byte: u8| {
        groups.push(byte & PAYLOAD_MASK);
        byte & STOP_BIT != 0
    };
    if forward {
        for &byte in src {
            if collect(byte) {
                break;
            }
        }
    } else {
        for &byte in src.iter().rev() {
            if collect(byte) {
                break;
            }
        }
        groups.reverse();
    }

    let value = groups
        .iter()
        .fold(0u32, |value, &group| (value << 7) | group as u32);
    (value, groups.len())
}

/// Number of bytes `encode(value)` produces.
pub fn encoded_len(value: u32) -> usize {
    let bits = (u32::BITS - value.leading_zeros()) as usize;
    bits.div_ceil(7).max(1)
}

/// Encodes `value` with the stop bit on the final byte.
pub fn encode(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    encode_into(value, &mut out);
    out
}

/// Appends the encoding of `value` to `out`, returning the byte count.
pub fn encode_into(value: u32, out: &mut Vec<u8>) -> usize {
    let len = encoded_len(value);
    for shift in (0..len).rev() {
        let group = ((value >> (shift * 7)) as u8) & PAYLOAD_MASK;
        out.push(if shift == 0 { group | STOP_BIT } else { group });
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_encodings() {
        assert_eq!(encode(0), [0x80]);
        assert_eq!(encode(0x7F), [0xFF]);
        assert_eq!(encode(0x80), [0x01, 0x80]);
        assert_eq!(encode(300), [0x02, 0xAC]);
        assert_eq!(encode(u32::MAX), [0x0F, 0x7F, 0x7F, 0x7F, 0xFF]);
    }

    #[test]
    fn forward_decode_stops_at_terminal_byte() {
        let data = [0x02, 0xAC, 0x85, 0x99];
        assert_eq!(decode(&data, true), (300, 2));
        assert_eq!(decode(&data[2..], true), (5, 1));
    }

    #[test]
    fn backward_decode_reads_from_the_end() {
        // Trailing entries store their size this way: read from the last
        // byte towards the front until a stop bit.
        let data = [0x41, 0x42, 0x81, 0x05];
        assert_eq!(decode(&data, false), (0x85, 2));
        assert_eq!(decode(&[0x11, 0x83], false), (3, 1));
    }

    #[test]
    fn unterminated_input_is_consumed_entirely() {
        assert_eq!(decode(&[0x01, 0x02], true), (0x82, 2));
        assert_eq!(decode(&[], true), (0, 0));
    }

    proptest! {
        #[test]
        fn round_trip(value: u32) {
            let bytes = encode(value);
            prop_assert_eq!(decode(&bytes, true), (value, bytes.len()));
            let bits = (32 - value.leading_zeros()) as usize;
            prop_assert_eq!(bytes.len(), bits.div_ceil(7).max(1));
        }

        #[test]
        fn decode_ignores_following_bytes(value: u32, tail in proptest::collection::vec(any::<u8>(), 0..8)) {
            let mut bytes = encode(value);
            let len = bytes.len();
            bytes.extend(tail);
            prop_assert_eq!(decode(&bytes, true), (value, len));
        }
    }
}
