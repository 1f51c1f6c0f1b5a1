//! QR symbol construction.
//!
//! This module turns data into a [`QrCode`]: it picks a segment mode, finds the
//! smallest version that holds the payload, adds Reed-Solomon error correction,
//! draws the function patterns, places the codewords and chooses the mask with
//! the lowest penalty score. Only QR Code Model 2 is supported.

use crate::ecc::{self, EcLevel};
use crate::error::{Error, Result};
use crate::matrix::BitMatrix;
use crate::segment::{BitBuffer, Segment};

/// An encoded QR Code symbol.
///
/// Instances are immutable after creation and own their module grid.
///
/// # Example
///
/// ```rust
/// use logoqr::{EcLevel, QrCode};
///
/// let qr = QrCode::encode_text("HELLO", EcLevel::High).unwrap();
/// assert_eq!(qr.version().value(), 1);
/// assert_eq!(qr.matrix().size(), 21);
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QrCode {
    version: Version,
    ecl: EcLevel,
    mask: Mask,
    modules: BitMatrix,
}

impl QrCode {
    /// Encodes a text string as UTF-8.
    ///
    /// See [`QrCode::encode`].
    pub fn encode_text(text: &str, ecl: EcLevel) -> Result<Self> {
        Self::encode(text.as_bytes(), ecl)
    }

    /// Encodes arbitrary data at the given error correction level.
    ///
    /// The data goes into a single segment using the most compact mode that
    /// can represent it, and the smallest fitting version is chosen.
    ///
    /// # Errors
    ///
    /// * [`Error::UnencodableData`] if `data` is empty.
    /// * [`Error::DataTooLarge`] if not even version 40 can hold it.
    pub fn encode(data: &[u8], ecl: EcLevel) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::UnencodableData("input is empty"));
        }
        let seg = Segment::make(data);
        log::debug!("encoding {} bytes in {:?} mode", data.len(), seg.mode());
        Self::encode_segments(&[seg], ecl)
    }

    /// Encodes pre-built segments, choosing the smallest fitting version.
    pub fn encode_segments(segs: &[Segment], ecl: EcLevel) -> Result<Self> {
        let (version, usedbits) = Self::fit_version(segs, ecl)?;
        let capacitybits = ecc::data_codewords(version, ecl) * 8;

        let mut bb = BitBuffer::with_capacity(capacitybits);
        for seg in segs {
            bb.append_bits(seg.mode().mode_bits(), 4);
            bb.append_bits(seg.num_chars() as u32, seg.mode().num_char_count_bits(version));
            bb.append(seg.data());
        }
        debug_assert_eq!(bb.len(), usedbits);

        // Terminator, then pad to a byte boundary
        let terminator = (capacitybits - bb.len()).min(4);
        bb.append_bits(0, terminator as u8);
        let padding = bb.len().wrapping_neg() & 7;
        bb.append_bits(0, padding as u8);

        for &padbyte in [0xec, 0x11].iter().cycle() {
            if bb.len() >= capacitybits {
                break;
            }
            bb.append_bits(padbyte, 8);
        }

        let codewords = ecc::add_ecc_and_interleave(&bb.into_bytes(), version, ecl);
        Ok(Self::from_codewords(version, ecl, &codewords))
    }

    /// Returns the smallest version whose capacity holds `segs`, with the
    /// number of bits the segments use at that version.
    fn fit_version(segs: &[Segment], ecl: EcLevel) -> Result<(Version, usize)> {
        let mut version = Version::MIN;
        loop {
            let capacitybits = ecc::data_codewords(version, ecl) * 8;
            let used = segs
                .iter()
                .try_fold(0usize, |acc, seg| Some(acc + seg.total_bits(version)?));
            match used {
                Some(n) if n <= capacitybits => return Ok((version, n)),
                _ if version >= Version::MAX => {
                    let bits = used.unwrap_or_else(|| {
                        segs.iter().map(|s| 4 + s.data().len()).sum::<usize>()
                    });
                    return Err(Error::DataTooLarge { bits, capacity: capacitybits });
                }
                _ => version = Version::new(version.value() + 1),
            }
        }
    }

    /// Draws the symbol for already interleaved codewords and picks a mask.
    fn from_codewords(version: Version, ecl: EcLevel, codewords: &[u8]) -> Self {
        let functions = function_modules(version);
        let mut result = QrCode {
            version,
            ecl,
            mask: Mask::new(0),
            modules: functions.clone(),
        };
        result.draw_codewords(codewords, &functions);
        result.draw_light_function_modules();

        let mut best = (i32::MAX, Mask::new(0));
        for i in 0..8 {
            let mask = Mask::new(i);
            result.apply_mask(&functions, mask);
            result.draw_format_bits(mask);
            let penalty = result.penalty_score();
            if penalty < best.0 {
                best = (penalty, mask);
            }
            result.apply_mask(&functions, mask); // XOR again to undo
        }
        let mask = best.1;
        log::debug!(
            "built version {} symbol at {:?}, mask {} (penalty {})",
            version.value(),
            ecl,
            mask.value(),
            best.0
        );
        result.apply_mask(&functions, mask);
        result.draw_format_bits(mask);
        result.mask = mask;
        result
    }

    /// Returns this QR Code's version, in the range [1, 40].
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns this QR Code's size in modules, in the range [21, 177].
    pub fn size(&self) -> u32 {
        self.modules.size()
    }

    /// Returns this QR Code's error correction level.
    pub fn error_correction_level(&self) -> EcLevel {
        self.ecl
    }

    /// Returns the mask chosen for this QR Code.
    pub fn mask(&self) -> Mask {
        self.mask
    }

    /// Returns the module grid.
    pub fn matrix(&self) -> &BitMatrix {
        &self.modules
    }

    /// Consumes the code, keeping only its module grid.
    pub fn into_matrix(self) -> BitMatrix {
        self.modules
    }

    /// Draws the parts of the function patterns that are light: finder
    /// interiors, separators, timing gaps, alignment rings, version info.
    fn draw_light_function_modules(&mut self) {
        let size = self.modules.size() as u8;
        for i in (7..size - 7).step_by(2) {
            self.modules.set(6, i, false);
            self.modules.set(i, 6, false);
        }
        let far = i32::from(size) - 4;
        for dy in -4i32..=4 {
            for dx in -4i32..=4 {
                let dist = dx.abs().max(dy.abs());
                if dist == 2 || dist == 4 {
                    self.modules.set_clipped(3 + dx, 3 + dy, false);
                    self.modules.set_clipped(far + dx, 3 + dy, false);
                    self.modules.set_clipped(3 + dx, far + dy, false);
                }
            }
        }
        for (x, y) in alignment_centers(self.version) {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    let px = (i32::from(x) + dx) as u8;
                    let py = (i32::from(y) + dy) as u8;
                    self.modules.set(px, py, dx == 0 && dy == 0);
                }
            }
        }
        if self.version.value() >= 7 {
            let bits = version_bits(self.version);
            for i in 0u8..18 {
                let bit = get_bit(bits, i);
                let a = size - 11 + i % 3;
                let b = i / 3;
                self.modules.set(a, b, bit);
                self.modules.set(b, a, bit);
            }
        }
    }

    fn draw_format_bits(&mut self, mask: Mask) {
        let bits = format_bits(self.ecl, mask);
        let size = self.modules.size() as u8;
        // Around the top left finder
        for i in 0..6 {
            self.modules.set(8, i, get_bit(bits, i));
        }
        self.modules.set(8, 7, get_bit(bits, 6));
        self.modules.set(8, 8, get_bit(bits, 7));
        self.modules.set(7, 8, get_bit(bits, 8));
        for i in 9..15 {
            self.modules.set(14 - i, 8, get_bit(bits, i));
        }
        // Split between the other two finders
        for i in 0..8 {
            self.modules.set(size - 1 - i, 8, get_bit(bits, i));
        }
        for i in 8..15 {
            self.modules.set(8, size - 15 + i, get_bit(bits, i));
        }
        self.modules.set(8, size - 8, true);
    }

    fn draw_codewords(&mut self, data: &[u8], functions: &BitMatrix) {
        assert_eq!(
            data.len(),
            ecc::raw_data_modules(self.version) / 8,
            "Codeword count does not match version"
        );
        let size = self.modules.size() as i32;
        let total = data.len() * 8;
        let mut i = 0usize;
        let mut right = size - 1;
        while right >= 1 {
            if right == 6 {
                right = 5;
            }
            let upward = ((right + 1) & 2) == 0;
            for vert in 0..size {
                let y = (if upward { size - 1 - vert } else { vert }) as u8;
                for j in 0..2 {
                    let x = (right - j) as u8;
                    if !functions.get(x, y) && i < total {
                        self.modules.set(x, y, get_bit(u32::from(data[i >> 3]), 7 - (i & 7) as u8));
                        i += 1;
                    }
                }
            }
            right -= 2;
        }
        debug_assert_eq!(i, total);
    }

    /// XORs the mask pattern into every non-function module. Applying the
    /// same mask twice restores the original grid.
    fn apply_mask(&mut self, functions: &BitMatrix, mask: Mask) {
        let size = self.modules.size() as u8;
        for y in 0..size {
            for x in 0..size {
                if functions.get(x, y) {
                    continue;
                }
                if mask.inverts(i32::from(x), i32::from(y)) {
                    let dark = self.modules.get(x, y);
                    self.modules.set(x, y, !dark);
                }
            }
        }
    }

    fn penalty_score(&self) -> i32 {
        let size = self.modules.size() as u8;
        let mut result = 0;

        for y in 0..size {
            result += line_penalty(size, |x| self.modules.get(x, y));
        }
        for x in 0..size {
            result += line_penalty(size, |y| self.modules.get(x, y));
        }

        for y in 0..size - 1 {
            for x in 0..size - 1 {
                let color = self.modules.get(x, y);
                if color == self.modules.get(x + 1, y)
                    && color == self.modules.get(x, y + 1)
                    && color == self.modules.get(x + 1, y + 1)
                {
                    result += PENALTY_N2;
                }
            }
        }

        let dark = self.modules.dark_count() as i32;
        let total = i32::from(size) * i32::from(size);
        // Smallest k such that (45-5k)% <= dark <= (55+5k)%
        let k = ((dark * 20 - total * 10).abs() + total - 1) / total - 1;
        result + k * PENALTY_N4
    }
}

/// Run-length (N1) and finder-like (N3) penalties for one row or column.
fn line_penalty(size: u8, module: impl Fn(u8) -> bool) -> i32 {
    let mut result = 0;
    let mut runcolor = false;
    let mut runlen = 0;
    let mut history = FinderPenalty::new(size);
    for i in 0..size {
        if module(i) == runcolor {
            runlen += 1;
            if runlen == 5 {
                result += PENALTY_N1;
            } else if runlen > 5 {
                result += 1;
            }
        } else {
            history.add_history(runlen);
            if !runcolor {
                result += history.count_patterns() * PENALTY_N3;
            }
            runcolor = module(i);
            runlen = 1;
        }
    }
    result + history.terminate_and_count(runcolor, runlen) * PENALTY_N3
}

/// Marks every function module (finders, separators, timing, alignment,
/// format and version areas) dark.
fn function_modules(ver: Version) -> BitMatrix {
    let size = ver.size() as u8;
    let mut m = BitMatrix::new(size);
    m.fill_rect(6, 0, 1, size);
    m.fill_rect(0, 6, size, 1);
    m.fill_rect(0, 0, 9, 9);
    m.fill_rect(size - 8, 0, 8, 9);
    m.fill_rect(0, size - 8, 9, 8);
    for (x, y) in alignment_centers(ver) {
        m.fill_rect(x - 2, y - 2, 5, 5);
    }
    if ver.value() >= 7 {
        m.fill_rect(size - 11, 0, 3, 6);
        m.fill_rect(0, size - 11, 6, 3);
    }
    m
}

/// Alignment pattern centers, leaving out the three that would sit on finders.
fn alignment_centers(ver: Version) -> Vec<(u8, u8)> {
    let positions = alignment_positions(ver);
    let last = positions.len().saturating_sub(1);
    let mut result = Vec::new();
    for (i, &x) in positions.iter().enumerate() {
        for (j, &y) in positions.iter().enumerate() {
            let on_finder = (i == 0 && j == 0) || (i == 0 && j == last) || (i == last && j == 0);
            if !on_finder {
                result.push((x, y));
            }
        }
    }
    result
}

/// Ascending row/column coordinates of the alignment pattern centers.
fn alignment_positions(ver: Version) -> Vec<u8> {
    let v = ver.value();
    if v == 1 {
        return Vec::new();
    }
    let numalign = v / 7 + 2;
    let step = if v == 32 {
        26
    } else {
        (v * 4 + numalign * 2 + 1) / (numalign * 2 - 2) * 2
    };
    let size = ver.size() as u8;
    let mut result: Vec<u8> = (0..numalign - 1).map(|i| size - 7 - i * step).collect();
    result.push(6);
    result.reverse();
    result
}

/// 15-bit format word: level and mask, BCH(15,5) protected and masked.
fn format_bits(ecl: EcLevel, mask: Mask) -> u32 {
    let data = u32::from((ecl.format_bits() << 3) | mask.value());
    let mut rem = data;
    for _ in 0..10 {
        rem = (rem << 1) ^ ((rem >> 9) * 0x537);
    }
    ((data << 10) | rem) ^ 0x5412
}

/// 18-bit version word, BCH(18,6) protected.
fn version_bits(ver: Version) -> u32 {
    let v = u32::from(ver.value());
    let mut rem = v;
    for _ in 0..12 {
        rem = (rem << 1) ^ ((rem >> 11) * 0x1f25);
    }
    (v << 12) | rem
}

struct FinderPenalty {
    qr_size: i32,
    run_history: [i32; 7],
}

impl FinderPenalty {
    fn new(size: u8) -> Self {
        Self {
            qr_size: i32::from(size),
            run_history: [0; 7],
        }
    }

    fn add_history(&mut self, mut currentrunlength: i32) {
        if self.run_history[0] == 0 {
            // Light border before the first run
            currentrunlength += self.qr_size;
        }
        self.run_history.copy_within(0..6, 1);
        self.run_history[0] = currentrunlength;
    }

    /// Counts 1:1:3:1:1 dark/light patterns with a light run of 4 on either side.
    fn count_patterns(&self) -> i32 {
        let rh = &self.run_history;
        let n = rh[1];
        let core = n > 0 && rh[2] == n && rh[3] == n * 3 && rh[4] == n && rh[5] == n;
        i32::from(core && rh[0] >= n * 4 && rh[6] >= n)
            + i32::from(core && rh[6] >= n * 4 && rh[0] >= n)
    }

    fn terminate_and_count(mut self, currentruncolor: bool, mut currentrunlength: i32) -> i32 {
        if currentruncolor {
            self.add_history(currentrunlength);
            currentrunlength = 0;
        }
        currentrunlength += self.qr_size;
        self.add_history(currentrunlength);
        self.count_patterns()
    }
}

const PENALTY_N1: i32 = 3;
const PENALTY_N2: i32 = 3;
const PENALTY_N3: i32 = 40;
const PENALTY_N4: i32 = 10;

/// A QR code version (1–40).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Version(u8);

impl Version {
    /// The minimum version number supported in the QR Code Model 2 standard.
    pub const MIN: Version = Version(1);

    /// The maximum version number supported in the QR Code Model 2 standard.
    pub const MAX: Version = Version(40);

    /// Creates a version object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [1, 40].
    pub const fn new(ver: u8) -> Self {
        assert!(
            Version::MIN.value() <= ver && ver <= Version::MAX.value(),
            "Version number out of range"
        );
        Self(ver)
    }

    /// Returns the value, which is in the range [1, 40].
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Side length in modules: `17 + 4 * version`.
    pub const fn size(self) -> u32 {
        self.0 as u32 * 4 + 17
    }
}

/// A mask pattern (0–7).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Mask(u8);

impl Mask {
    /// Creates a mask object from the given number.
    ///
    /// # Panics
    ///
    /// Panics if the number is outside the range [0, 7].
    pub const fn new(mask: u8) -> Self {
        assert!(mask <= 7, "Mask value out of range");
        Self(mask)
    }

    /// Returns the value, which is in the range [0, 7].
    pub const fn value(self) -> u8 {
        self.0
    }

    fn inverts(self, x: i32, y: i32) -> bool {
        match self.0 {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (x / 3 + y / 2) % 2 == 0,
            5 => x * y % 2 + x * y % 3 == 0,
            6 => (x * y % 2 + x * y % 3) % 2 == 0,
            7 => ((x + y) % 2 + x * y % 3) % 2 == 0,
            _ => unreachable!(),
        }
    }
}

fn get_bit(x: u32, i: u8) -> bool {
    ((x >> i) & 1) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reads the copy of the format word next to the top left finder.
    fn read_format(qr: &QrCode) -> u32 {
        let m = qr.matrix();
        let mut bits = 0u32;
        let mut put = |i: u32, x: u8, y: u8| bits |= u32::from(m.get(x, y)) << i;
        for i in 0..6 {
            put(i, 8, i as u8);
        }
        put(6, 8, 7);
        put(7, 8, 8);
        put(8, 7, 8);
        for i in 9..15 {
            put(i, 14 - i as u8, 8);
        }
        bits
    }

    #[test]
    fn test_hello_is_version_one() {
        let qr = QrCode::encode_text("HELLO", EcLevel::High).unwrap();
        assert_eq!(qr.version(), Version::MIN);
        assert_eq!(qr.size(), 21);
        assert_eq!(qr.error_correction_level(), EcLevel::High);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = QrCode::encode(b"", EcLevel::High).unwrap_err();
        assert!(matches!(err, Error::UnencodableData(_)));
    }

    #[test]
    fn test_whitespace_is_encoded() {
        let qr = QrCode::encode_text("   ", EcLevel::High).unwrap();
        assert_eq!(qr.version(), Version::MIN);
    }

    #[test]
    fn test_minimal_version_boundaries() {
        // Level H capacities of version 1: 17 digits, 10 alphanumerics, 7 bytes.
        let cases: [(&[u8], u8); 6] = [
            (&[b'7'; 17], 1),
            (&[b'7'; 18], 2),
            (&[b'Q'; 10], 1),
            (&[b'Q'; 11], 2),
            (&[b'q'; 7], 1),
            (&[b'q'; 8], 2),
        ];
        for (data, ver) in cases {
            let qr = QrCode::encode(data, EcLevel::High).unwrap();
            assert_eq!(qr.version().value(), ver, "{} bytes", data.len());
        }
    }

    #[test]
    fn test_version_forty_limits() {
        for (byte, max) in [(b'9', 3057), (b'Z', 1852), (b'z', 1273)] {
            let qr = QrCode::encode(&vec![byte; max], EcLevel::High).unwrap();
            assert_eq!(qr.version(), Version::MAX);
            assert_eq!(qr.size(), 177);
            let err = QrCode::encode(&vec![byte; max + 1], EcLevel::High).unwrap_err();
            assert!(matches!(err, Error::DataTooLarge { capacity: 10208, .. }), "{:?}", err);
        }
    }

    #[test]
    fn test_oversized_text() {
        let text = "a".repeat(3000);
        let err = QrCode::encode_text(&text, EcLevel::High).unwrap_err();
        assert!(matches!(err, Error::DataTooLarge { bits, capacity } if bits > capacity));
    }

    #[test]
    fn test_lower_levels_fit_more() {
        let text = "https://example.com/a/rather/long/path?with=query";
        let low = QrCode::encode_text(text, EcLevel::Low).unwrap();
        let high = QrCode::encode_text(text, EcLevel::High).unwrap();
        assert!(low.version() < high.version());
    }

    #[test]
    fn test_finder_and_timing_patterns() {
        let qr = QrCode::encode_text("https://example.com", EcLevel::High).unwrap();
        let m = qr.matrix();
        let s = qr.size() as i32;
        for (cx, cy) in [(3, 3), (s - 4, 3), (3, s - 4)] {
            assert!(m.is_dark(cx, cy));
            assert!(m.is_dark(cx - 3, cy - 3));
            assert!(!m.is_dark(cx - 2, cy));
            assert!(m.is_dark(cx - 1, cy + 1));
        }
        for i in 8..s - 8 {
            assert_eq!(m.is_dark(6, i), i % 2 == 0);
            assert_eq!(m.is_dark(i, 6), i % 2 == 0);
        }
        assert!(m.is_dark(8, s - 8));
    }

    #[test]
    fn test_format_information() {
        let qr = QrCode::encode_text("HELLO WORLD", EcLevel::Quartile).unwrap();
        assert_eq!(read_format(&qr), format_bits(EcLevel::Quartile, qr.mask()));
        let word = (read_format(&qr) ^ 0x5412) >> 10;
        assert_eq!((word >> 3) as u8, EcLevel::Quartile.format_bits());
        assert_eq!(word & 7, u32::from(qr.mask().value()));
    }

    #[test]
    fn test_known_bch_words() {
        // Level M, mask 5 and version 7 as given in the standard.
        assert_eq!(format_bits(EcLevel::Medium, Mask::new(5)), 0b100000011001110);
        assert_eq!(version_bits(Version::new(7)), 0b000111110010010100);
    }

    #[test]
    fn test_alignment_positions() {
        assert!(alignment_positions(Version::MIN).is_empty());
        assert_eq!(alignment_positions(Version::new(2)), [6, 18]);
        assert_eq!(alignment_positions(Version::new(7)), [6, 22, 38]);
        assert_eq!(alignment_positions(Version::new(32)), [6, 34, 60, 86, 112, 138]);
        assert_eq!(alignment_centers(Version::new(7)).len(), 6);
    }

    #[test]
    fn test_function_module_count() {
        for v in 1..=40 {
            let ver = Version::new(v);
            let m = function_modules(ver);
            assert_eq!(
                (ver.size() * ver.size() - m.dark_count()) as usize,
                ecc::raw_data_modules(ver),
                "version {}",
                v
            );
        }
    }

    #[test]
    fn test_mask_is_best_penalty() {
        let qr = QrCode::encode_text("0123456789", EcLevel::Medium).unwrap();
        let functions = function_modules(qr.version());
        let chosen = qr.penalty_score();
        for i in 0..8 {
            let mut other = qr.clone();
            other.apply_mask(&functions, qr.mask());
            other.apply_mask(&functions, Mask::new(i));
            other.draw_format_bits(Mask::new(i));
            let score = other.penalty_score();
            assert!(score > chosen || (score == chosen && i >= qr.mask().value()));
        }
    }

    #[test]
    fn test_deterministic() {
        let a = QrCode::encode_text("same input", EcLevel::High).unwrap();
        let b = QrCode::encode_text("same input", EcLevel::High).unwrap();
        assert_eq!(a, b);
    }
}
