//! Word-oriented LZSS compression.
//!
//! The stream is a sequence of chunks. Each chunk starts with a 16-bit mask
//! word followed by up to 16 units; mask bits are consumed MSB-first, one
//! per unit. A clear bit means the unit is a literal word. A set bit means
//! the unit is a back-reference:
//!
//! - `0x0000` ends the stream.
//! - If the word fits in 11 bits it is a long reference: the word is the
//!   distance and the *next* word is the length. The length word does not
//!   consume a mask bit.
//! - Otherwise it is a short reference: bits 11-15 hold the length and bits
//!   0-10 the distance.
//!
//! Distances are in words, counted back from the end of the output. A
//! reference may be longer than its distance, in which case the copied
//! pattern repeats.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use crate::error::{DecodeError, DecodeResult};
use crate::reader::{word_bytes, words};

/// Number of units described by one mask word.
const UNITS_PER_CHUNK: usize = 16;
/// Largest distance a reference can express (11 bits).
const MAX_DISTANCE: usize = 0x7FF;
/// Longest match a short reference can carry (5 bits).
const MAX_SHORT_LENGTH: usize = 0x1F;
/// Longest match a long reference can carry.
const MAX_LONG_LENGTH: usize = u16::MAX as usize;

/// Decompress a word-oriented LZSS stream.
///
/// Fails on truncated streams and on references that reach before the start
/// of the output; both usually mean the input was never compressed.
pub fn decompress(data: &[u8]) -> DecodeResult<Vec<u8>> {
    // A trailing odd byte is padding from the container, never stream data.
    let input = words(&data[..data.len() & !1])?;
    let mut output: Vec<u16> = Vec::with_capacity(input.len() * 2);
    let mut pos = 0;

    'stream: while pos < input.len() {
        let mask = input[pos];
        pos += 1;

        for bit in 0..UNITS_PER_CHUNK {
            let Some(&unit) = input.get(pos) else {
                if bit == 0 {
                    break 'stream;
                }
                return Err(truncated(pos, input.len()));
            };
            pos += 1;

            if mask & (0x8000 >> bit) == 0 {
                output.push(unit);
                continue;
            }

            if unit == 0 {
                break 'stream;
            }

            let (distance, length) = if unit & 0x7FF == unit {
                let length = *input.get(pos).ok_or_else(|| truncated(pos, input.len()))?;
                pos += 1;
                (usize::from(unit), usize::from(length))
            } else {
                (usize::from(unit & 0x7FF), usize::from((unit >> 11) & 0x1F))
            };

            copy_back_reference(&mut output, distance, length)?;
        }
    }

    Ok(word_bytes(&output))
}

/// Append `length` words starting `distance` words back from the end.
///
/// When the window overlaps the write cursor the available `distance` words
/// form a pattern that repeats until `length` words are written.
fn copy_back_reference(output: &mut Vec<u16>, distance: usize, length: usize) -> DecodeResult<()> {
    if distance == 0 || distance > output.len() {
        return Err(DecodeError::invalid(
            "lzss stream",
            format!(
                "reference {distance} words back with only {} words decoded",
                output.len()
            ),
        ));
    }

    let start = output.len() - distance;
    let grab = length.min(distance);
    output.extend_from_within(start..start + grab);

    let pattern_len = grab;
    for j in 0..length - grab {
        let word = output[start + j % pattern_len];
        output.push(word);
    }
    Ok(())
}

fn truncated(pos: usize, len: usize) -> DecodeError {
    DecodeError::OutOfBounds {
        offset: pos * 2,
        len: 2,
        buffer_len: len * 2,
    }
}

/// One encoded unit before it is packed into a chunk.
#[derive(Debug, Clone, Copy)]
enum Unit {
    Literal(u16),
    Short { distance: u16, length: u16 },
    Long { distance: u16, length: u16 },
    End,
}

/// Compress bytes into a word-oriented LZSS stream.
///
/// Greedy longest-match over a 2048-word window. Candidate positions are
/// indexed by word value so each step only visits earlier occurrences of the
/// current word. On equal-length matches the most recent occurrence wins.
pub fn compress(data: &[u8]) -> DecodeResult<Vec<u8>> {
    let input = words(data)?;
    let mut units = Vec::with_capacity(input.len() + 1);
    let mut window = MatchWindow::default();

    let mut pos = 0;
    while pos < input.len() {
        let (distance, length) = window.longest_match(&input, pos);

        let unit = match length {
            0 | 1 => Unit::Literal(input[pos]),
            2..=MAX_SHORT_LENGTH => Unit::Short {
                distance: distance as u16,
                length: length as u16,
            },
            _ => Unit::Long {
                distance: distance as u16,
                length: length as u16,
            },
        };
        units.push(unit);

        let advance = length.max(1);
        for p in pos..pos + advance {
            window.insert(input[p], p);
        }
        pos += advance;
        window.slide(&input, pos);
    }
    units.push(Unit::End);

    Ok(word_bytes(&pack_units(&units)))
}

/// Earlier positions of each word value still inside the match window.
///
/// Every position is inserted once and evicted once as the window slides
/// past it, so the index never holds more than `MAX_DISTANCE + 1` entries
/// beyond the current match.
#[derive(Default)]
struct MatchWindow {
    occurrences: HashMap<u16, VecDeque<usize>>,
    /// Positions below this have been evicted.
    start: usize,
}

impl MatchWindow {
    fn insert(&mut self, word: u16, pos: usize) {
        self.occurrences.entry(word).or_default().push_back(pos);
    }

    /// Evict every position too far behind `pos` to be referenced.
    fn slide(&mut self, input: &[u16], pos: usize) {
        let start = pos.saturating_sub(MAX_DISTANCE);
        for expired in self.start..start {
            if let Entry::Occupied(mut entry) = self.occurrences.entry(input[expired]) {
                entry.get_mut().pop_front();
                if entry.get().is_empty() {
                    entry.remove();
                }
            }
        }
        self.start = self.start.max(start);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.occurrences.values().map(VecDeque::len).sum()
    }

    /// Find the longest match for `input[pos..]` inside the window.
    ///
    /// Returns `(distance, length)`; a length of 0 means no earlier
    /// occurrence.
    fn longest_match(&self, input: &[u16], pos: usize) -> (usize, usize) {
        let Some(candidates) = self.occurrences.get(&input[pos]) else {
            return (0, 0);
        };

        let limit = (input.len() - pos).min(MAX_LONG_LENGTH);
        let mut best = (0, 0);
        for &candidate in candidates.iter().rev() {
            let mut length = 1;
            while length < limit && input[candidate + length] == input[pos + length] {
                length += 1;
            }
            if length > best.1 {
                best = (pos - candidate, length);
                if length == limit {
                    break;
                }
            }
        }
        best
    }
}

/// Lay units out as mask-prefixed chunks.
fn pack_units(units: &[Unit]) -> Vec<u16> {
    let mut out = Vec::with_capacity(units.len() * 2);
    for chunk in units.chunks(UNITS_PER_CHUNK) {
        let mask_index = out.len();
        out.push(0);
        let mut mask = 0u16;
        for (bit, unit) in chunk.iter().enumerate() {
            match *unit {
                Unit::Literal(word) => out.push(word),
                Unit::Short { distance, length } => {
                    mask |= 0x8000 >> bit;
                    out.push((length << 11) | distance);
                }
                Unit::Long { distance, length } => {
                    mask |= 0x8000 >> bit;
                    out.push(distance);
                    out.push(length);
                }
                Unit::End => {
                    mask |= 0x8000 >> bit;
                    out.push(0);
                }
            }
        }
        out[mask_index] = mask;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn as_words(bytes: &[u8]) -> Vec<u16> {
        words(bytes).unwrap()
    }

    #[test]
    fn test_decompress_literals() {
        // Two literals, then the end marker.
        let stream = word_bytes(&[0b0010_0000_0000_0000, 0x1111, 0x2222, 0x0000]);
        let out = decompress(&stream).unwrap();
        assert_eq!(as_words(&out), vec![0x1111, 0x2222]);
    }

    #[test]
    fn test_decompress_short_reference() {
        // Literals A B, then a short reference: length 4, distance 2.
        let stream = word_bytes(&[
            0b0011_0000_0000_0000,
            0xAAAA,
            0xBBBB,
            (4 << 11) | 2,
            0x0000,
        ]);
        let out = decompress(&stream).unwrap();
        assert_eq!(as_words(&out), vec![0xAAAA, 0xBBBB, 0xAAAA, 0xBBBB, 0xAAAA, 0xBBBB]);
    }

    #[test]
    fn test_decompress_long_reference_and_end() {
        // Literal A, long reference distance 1 length 40, end marker.
        let stream = word_bytes(&[0b0110_0000_0000_0000, 0xAAAA, 0x0001, 40, 0x0000]);
        let out = decompress(&stream).unwrap();
        assert_eq!(as_words(&out), vec![0xAAAA; 41]);
    }

    #[test]
    fn test_decompress_stops_at_end_marker() {
        // Words after the end marker are ignored.
        let stream = word_bytes(&[0b0100_0000_0000_0000, 0x1234, 0x0000, 0x5555, 0x6666]);
        assert_eq!(as_words(&decompress(&stream).unwrap()), vec![0x1234]);
    }

    #[test]
    fn test_decompress_rejects_reference_before_start() {
        let stream = word_bytes(&[0x8000, (3 << 11) | 5]);
        assert!(matches!(
            decompress(&stream),
            Err(DecodeError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_decompress_rejects_truncated_long_reference() {
        let stream = word_bytes(&[0b0100_0000_0000_0000, 0x1234, 0x0001]);
        let err = decompress(&stream).unwrap_err();
        assert!(err.is_out_of_bounds());
    }

    #[test]
    fn test_decompress_rejects_truncated_chunk() {
        // Mask announces units that never arrive.
        let stream = word_bytes(&[0x0000, 0x1111]);
        // One literal then the input ends mid-chunk.
        assert!(decompress(&stream).unwrap_err().is_out_of_bounds());
    }

    #[test]
    fn test_decompress_accepts_stream_ending_on_chunk_boundary() {
        let mut stream = vec![0x0000];
        stream.extend(1..=16u16);
        let out = decompress(&word_bytes(&stream)).unwrap();
        assert_eq!(as_words(&out), (1..=16).collect::<Vec<u16>>());
    }

    #[test]
    fn test_compress_repeating_pattern() {
        let original: Vec<u16> = (0..32).flat_map(|_| [0x1234, 0xABCD]).collect();
        let bytes = word_bytes(&original);

        let compressed = compress(&bytes).unwrap();
        assert!(compressed.len() < bytes.len());
        assert_eq!(decompress(&compressed).unwrap(), bytes);
    }

    #[test]
    fn test_compress_long_run_uses_long_reference() {
        let bytes = word_bytes(&[7u16; 500]);
        let compressed = as_words(&compress(&bytes).unwrap());
        // mask, literal, distance 1, length 499, end
        assert_eq!(compressed, vec![0b0110_0000_0000_0000, 7, 1, 499, 0]);
    }

    #[test]
    fn test_compress_empty() {
        let compressed = compress(&[]).unwrap();
        assert_eq!(as_words(&compressed), vec![0x8000, 0x0000]);
        assert!(decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_compress_end_marker_in_new_chunk() {
        // Sixteen distinct literals fill the first chunk exactly.
        let original: Vec<u16> = (1..=16).collect();
        let compressed = as_words(&compress(&word_bytes(&original)).unwrap());
        assert_eq!(compressed.len(), 1 + 16 + 2);
        assert_eq!(&compressed[17..], &[0x8000, 0x0000]);
    }

    #[test]
    fn test_match_window_evicts_as_it_slides() {
        // Distinct words never repeat, so nothing is pruned on lookup.
        let input: Vec<u16> = (0..10_000u16).collect();
        let mut window = MatchWindow::default();
        for (pos, &word) in input.iter().enumerate() {
            assert_eq!(window.longest_match(&input, pos), (0, 0));
            window.insert(word, pos);
            window.slide(&input, pos + 1);
            assert!(window.len() <= MAX_DISTANCE);
        }
        assert_eq!(window.len(), MAX_DISTANCE);
    }

    #[test]
    fn test_match_beyond_window_is_not_used() {
        // The repeat lies exactly one word too far back.
        let mut original: Vec<u16> = vec![0xAAAA, 0xBBBB];
        original.extend((0..MAX_DISTANCE as u16 - 1).map(|i| 0x4000 + i));
        original.extend([0xAAAA, 0xBBBB]);
        let bytes = word_bytes(&original);
        assert_eq!(decompress(&compress(&bytes).unwrap()).unwrap(), bytes);

        let input = as_words(&bytes);
        let mut window = MatchWindow::default();
        let repeat = input.len() - 2;
        for (pos, &word) in input[..repeat].iter().enumerate() {
            window.insert(word, pos);
            window.slide(&input, pos + 1);
        }
        assert_eq!(repeat, MAX_DISTANCE + 1);
        assert_eq!(window.longest_match(&input, repeat), (0, 0));
    }

    #[test]
    fn test_compress_rejects_odd_length() {
        assert_eq!(compress(&[1, 2, 3]), Err(DecodeError::OddLength(3)));
    }

    proptest! {
        #[test]
        fn prop_round_trip(words in proptest::collection::vec(0u16..8, 0..600)) {
            let bytes = word_bytes(&words);
            let compressed = compress(&bytes).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), bytes);
        }

        #[test]
        fn prop_round_trip_arbitrary(bytes in proptest::collection::vec(any::<u8>(), 0..400)) {
            let even = &bytes[..bytes.len() & !1];
            let compressed = compress(even).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), even.to_vec());
        }
    }
}
