//! Machine word conversions.
//!
//! A machine word is a plain `u16`. Signed values are the two's-complement
//! reinterpretation of the same bits, and booleans are zero/nonzero with 1 as
//! the canonical true.

/// Canonical encoding of a boolean: 1 for true, 0 for false.
pub const fn from_bool(value: bool) -> u16 {
    value as u16
}

/// Any nonzero word is true.
pub const fn to_bool(word: u16) -> bool {
    word != 0
}

pub const fn from_i16(value: i16) -> u16 {
    value as u16
}

pub const fn to_i16(word: u16) -> i16 {
    word as i16
}

/// Packs a big-endian byte stream into words, `(high << 8) | low`.
///
/// An odd trailing byte becomes the high byte of a final word.
///
/// # Examples
///
/// ```
/// use dcpu16::word::words_from_be_bytes;
///
/// assert_eq!(words_from_be_bytes(&[0x7c, 0x01, 0x00, 0x30]), vec![0x7c01, 0x0030]);
/// assert_eq!(words_from_be_bytes(&[0xab]), vec![0xab00]);
/// ```
pub fn words_from_be_bytes(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| {
            let high = pair[0] as u16;
            let low = pair.get(1).copied().unwrap_or(0) as u16;
            (high << 8) | low
        })
        .collect()
}

/// Inverse of [`words_from_be_bytes`] for whole words.
pub fn be_bytes_from_words(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}
