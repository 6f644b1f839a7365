//! A variable-length encoding for signed integers, used to store literal and hint streams
//! compactly.
//!
//! Every integer is first mapped to an unsigned value with a zig-zag mapping: `x >= 0` becomes
//! `2x`, and `x < 0` becomes `2(-x) + 1`. This is the same mapping binary DRAT uses for
//! literals, which keeps small magnitudes small regardless of their sign. The unsigned value is
//! then written in groups of 7 bits, least significant group first. Every byte except the last
//! one of an integer has its high bit set.
//!
//! The stream carries no length information. Consumers either know how many integers to expect,
//! or rely on a sentinel of the enclosing protocol.
//!
//! # Example
//! ```
//! use pbip_format::varint;
//!
//! let values = [0, -1, 1, -64, 64, 123456];
//! let bytes = varint::encode(&values);
//!
//! assert_eq!(values.to_vec(), varint::decode(&bytes).unwrap());
//! ```
use std::io::Write;

/// The maximum number of bytes a single encoded `i64` can occupy.
///
/// The zig-zag value of [`i64::MIN`] needs 65 bits, which takes ten groups of 7 bits.
pub const MAX_ENCODED_LEN: usize = 10;

/// Errors that can occur when decoding a varint stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VarintError {
    #[error("the stream ends in the middle of an integer starting at byte {offset}")]
    Truncated { offset: usize },

    #[error("the integer starting at byte {offset} does not fit in 64 bits")]
    Overflow { offset: usize },

    #[error("the integer starting at byte {offset} is not in its shortest encoding")]
    NonCanonical { offset: usize },
}

/// Map a signed integer to its unsigned zig-zag representation.
pub fn zigzag(value: i64) -> u128 {
    let magnitude = u128::from(value.unsigned_abs());

    if value < 0 {
        2 * magnitude + 1
    } else {
        2 * magnitude
    }
}

/// The inverse of [`zigzag`].
///
/// Returns [`None`] if the value is not the zig-zag representation of an `i64`. This includes
/// `1`, which would be a negative zero.
pub fn unzigzag(value: u128) -> Option<i64> {
    let magnitude = value >> 1;

    if value == 1 {
        None
    } else if value & 1 == 0 {
        i64::try_from(magnitude).ok()
    } else if magnitude == u128::from(i64::MIN.unsigned_abs()) {
        Some(i64::MIN)
    } else {
        i64::try_from(magnitude).ok().map(|magnitude| -magnitude)
    }
}

/// Encode a single value into the given buffer, and return the slice that was written.
fn encode_value(value: i64, buf: &mut [u8; MAX_ENCODED_LEN]) -> &[u8] {
    let mut num = zigzag(value);
    let mut len = 0;

    loop {
        buf[len] = (num & 0x7f) as u8 | 0x80;
        len += 1;
        num >>= 7;

        if num == 0 {
            break;
        }
    }

    buf[len - 1] &= 0x7f;
    &buf[..len]
}

/// Write one encoded integer to the sink.
pub fn write_varint(sink: &mut impl Write, value: i64) -> std::io::Result<()> {
    let mut buf = [0; MAX_ENCODED_LEN];
    sink.write_all(encode_value(value, &mut buf))
}

/// Append one encoded integer to the buffer.
pub fn encode_into(buffer: &mut Vec<u8>, value: i64) {
    let mut buf = [0; MAX_ENCODED_LEN];
    buffer.extend_from_slice(encode_value(value, &mut buf));
}

/// Encode a sequence of integers.
pub fn encode(values: &[i64]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(values.len());

    for &value in values {
        encode_into(&mut buffer, value);
    }

    buffer
}

/// Decode a complete byte stream into the integers it contains.
pub fn decode(bytes: &[u8]) -> Result<Vec<i64>, VarintError> {
    Decoder::new(bytes).collect()
}

/// Decodes integers from a byte stream one at a time.
///
/// Useful when the number of integers is determined by the enclosing protocol rather than by
/// the end of the stream.
#[derive(Clone, Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Decoder { bytes, position: 0 }
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Decode the next integer, or return `Ok(None)` if the stream is exhausted.
    pub fn next_value(&mut self) -> Result<Option<i64>, VarintError> {
        if self.position == self.bytes.len() {
            return Ok(None);
        }

        let offset = self.position;
        let mut accumulator = Accumulator::new(offset);

        loop {
            let Some(&byte) = self.bytes.get(self.position) else {
                return Err(VarintError::Truncated { offset });
            };
            self.position += 1;

            if let Some(value) = accumulator.push(byte)? {
                return Ok(Some(value));
            }
        }
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<i64, VarintError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}

/// Read a single integer from a byte source.
///
/// Returns `Ok(None)` if the source is exhausted before the first byte. The `position` is the
/// offset of the next byte in the overall stream; it is advanced for every byte that is read and
/// used to annotate errors.
pub fn read_varint(
    source: &mut impl std::io::Read,
    position: &mut usize,
) -> std::io::Result<Option<Result<i64, VarintError>>> {
    let offset = *position;
    let mut accumulator = Accumulator::new(offset);
    let mut byte = [0_u8];

    loop {
        if source.read(&mut byte)? == 0 {
            return if *position == offset {
                Ok(None)
            } else {
                Ok(Some(Err(VarintError::Truncated { offset })))
            };
        }
        *position += 1;

        match accumulator.push(byte[0]) {
            Ok(Some(value)) => return Ok(Some(Ok(value))),
            Ok(None) => {}
            Err(err) => return Ok(Some(Err(err))),
        }
    }
}

/// Collects 7-bit groups until a terminating byte is seen.
struct Accumulator {
    offset: usize,
    value: u128,
    shift: u32,
}

impl Accumulator {
    fn new(offset: usize) -> Self {
        Accumulator {
            offset,
            value: 0,
            shift: 0,
        }
    }

    fn push(&mut self, byte: u8) -> Result<Option<i64>, VarintError> {
        if self.shift >= 7 * MAX_ENCODED_LEN as u32 {
            return Err(VarintError::Overflow {
                offset: self.offset,
            });
        }

        self.value |= u128::from(byte & 0x7f) << self.shift;
        self.shift += 7;

        if byte & 0x80 != 0 {
            return Ok(None);
        }

        // Only the shortest encoding of an integer is accepted, and there is no negative zero.
        if (byte == 0 && self.shift > 7) || self.value == 1 {
            return Err(VarintError::NonCanonical {
                offset: self.offset,
            });
        }

        unzigzag(self.value)
            .map(Some)
            .ok_or(VarintError::Overflow {
                offset: self.offset,
            })
    }
}
