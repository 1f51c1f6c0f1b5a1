//! Data segments: picking a character mode and packing the payload bits.

use crate::qrcode::Version;

static ALPHANUMERIC_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

/// Character mode of a segment.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SegmentMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl SegmentMode {
    /// Picks the most compact mode able to represent every byte of `data`.
    pub fn for_data(data: &[u8]) -> Self {
        if data.iter().all(u8::is_ascii_digit) {
            SegmentMode::Numeric
        } else if data.iter().all(|b| ALPHANUMERIC_CHARSET.contains(b)) {
            SegmentMode::Alphanumeric
        } else {
            SegmentMode::Byte
        }
    }

    pub(crate) fn mode_bits(self) -> u32 {
        match self {
            SegmentMode::Numeric => 0x1,
            SegmentMode::Alphanumeric => 0x2,
            SegmentMode::Byte => 0x4,
        }
    }

    /// Width of the character count field for the given version.
    pub(crate) fn num_char_count_bits(self, ver: Version) -> u8 {
        let bits = match self {
            SegmentMode::Numeric => [10, 12, 14],
            SegmentMode::Alphanumeric => [9, 11, 13],
            SegmentMode::Byte => [8, 16, 16],
        };
        bits[usize::from((ver.value() + 7) / 17)]
    }
}

/// A run of data encoded in a single mode.
///
/// Segments are immutable; build one with [`Segment::make`] or one of the
/// mode-specific constructors.
#[derive(Clone, Debug)]
pub struct Segment {
    mode: SegmentMode,
    numchars: usize,
    bits: BitBuffer,
}

impl Segment {
    /// Encodes `data` in the most compact mode that can represent it.
    pub fn make(data: &[u8]) -> Self {
        match SegmentMode::for_data(data) {
            SegmentMode::Numeric => Segment::make_numeric(data),
            SegmentMode::Alphanumeric => Segment::make_alphanumeric(data),
            SegmentMode::Byte => Segment::make_bytes(data),
        }
    }

    /// Creates a byte mode segment.
    pub fn make_bytes(data: &[u8]) -> Self {
        let mut bits = BitBuffer::with_capacity(data.len() * 8);
        for &b in data {
            bits.append_bits(u32::from(b), 8);
        }
        Segment { mode: SegmentMode::Byte, numchars: data.len(), bits }
    }

    /// Creates a numeric mode segment: three digits per 10 bits.
    ///
    /// # Panics
    ///
    /// Panics if `digits` contains anything other than `0`-`9`.
    pub fn make_numeric(digits: &[u8]) -> Self {
        let mut bits = BitBuffer::with_capacity(digits.len() * 10 / 3 + 4);
        for chunk in digits.chunks(3) {
            let value = chunk.iter().fold(0u32, |acc, &b| {
                assert!(b.is_ascii_digit(), "String contains non-numeric characters");
                acc * 10 + u32::from(b - b'0')
            });
            bits.append_bits(value, chunk.len() as u8 * 3 + 1);
        }
        Segment { mode: SegmentMode::Numeric, numchars: digits.len(), bits }
    }

    /// Creates an alphanumeric mode segment: two characters per 11 bits.
    ///
    /// Allowed characters: 0–9, A–Z (uppercase), space, `$`, `%`, `*`, `+`, `-`, `.`, `/`, `:`.
    ///
    /// # Panics
    ///
    /// Panics if `text` contains characters outside that set.
    pub fn make_alphanumeric(text: &[u8]) -> Self {
        let mut bits = BitBuffer::with_capacity(text.len() * 11 / 2 + 6);
        for pair in text.chunks(2) {
            let value = pair.iter().fold(0u32, |acc, b| {
                let i = ALPHANUMERIC_CHARSET
                    .iter()
                    .position(|c| c == b)
                    .expect("String contains unencodable characters in alphanumeric mode");
                acc * 45 + i as u32
            });
            bits.append_bits(value, if pair.len() == 2 { 11 } else { 6 });
        }
        Segment { mode: SegmentMode::Alphanumeric, numchars: text.len(), bits }
    }

    pub fn mode(&self) -> SegmentMode {
        self.mode
    }

    pub fn num_chars(&self) -> usize {
        self.numchars
    }

    pub(crate) fn data(&self) -> &BitBuffer {
        &self.bits
    }

    /// Bits needed by this segment at `version`, headers included, or `None`
    /// if the character count does not fit the version's count field.
    pub(crate) fn total_bits(&self, version: Version) -> Option<usize> {
        let ccbits = self.mode.num_char_count_bits(version);
        if self.numchars >= 1usize << ccbits {
            return None;
        }
        Some(4 + usize::from(ccbits) + self.bits.len())
    }
}

/// Growable sequence of bits, most significant bit of each byte first.
#[derive(Clone, Debug, Default)]
pub struct BitBuffer {
    data: Vec<u8>,
    length: usize,
}

impl BitBuffer {
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            data: Vec::with_capacity((bits + 7) / 8),
            length: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends the low `len` bits of `val`, most significant first.
    pub fn append_bits(&mut self, val: u32, len: u8) {
        assert!(len <= 31 && (val >> len) == 0, "Value out of range");
        for i in (0..len).rev() {
            if self.length % 8 == 0 {
                self.data.push(0);
            }
            let bit = ((val >> i) & 1) as u8;
            let last = self.data.len() - 1;
            self.data[last] |= bit << (7 - (self.length % 8));
            self.length += 1;
        }
    }

    pub fn append(&mut self, other: &BitBuffer) {
        for i in 0..other.length {
            self.append_bits(u32::from(other.bit(i)), 1);
        }
    }

    pub fn bit(&self, i: usize) -> bool {
        assert!(i < self.length, "Bit index out of range");
        (self.data[i >> 3] >> (7 - (i & 7))) & 1 != 0
    }

    /// Consumes the buffer, returning its bytes. The last byte is zero padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}
