/// Square grid of dark and light modules.
///
/// Modules are packed bitwise (row-major, least significant bit first). The
/// grid is built by the encoder and only readable from outside this crate.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BitMatrix {
    size: u8,
    bits: Vec<u8>,
}

impl BitMatrix {
    /// Creates an all-light matrix with `size` modules per side.
    pub(crate) fn new(size: u8) -> Self {
        let count = usize::from(size) * usize::from(size);
        Self {
            size,
            bits: vec![0u8; (count + 7) / 8],
        }
    }

    /// Returns the number of modules per side.
    pub fn size(&self) -> u32 {
        u32::from(self.size)
    }

    /// Returns `true` if the module at (`x`, `y`) is dark.
    ///
    /// Coordinates outside the grid are light, which lets callers treat the
    /// quiet zone as part of the symbol.
    ///
    /// # Arguments
    ///
    /// * `x` - X-coordinate (0 is left).
    /// * `y` - Y-coordinate (0 is top).
    pub fn is_dark(&self, x: i32, y: i32) -> bool {
        let range = 0..i32::from(self.size);
        range.contains(&x) && range.contains(&y) && self.get(x as u8, y as u8)
    }

    /// Returns the number of dark modules.
    pub fn dark_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    pub(crate) fn get(&self, x: u8, y: u8) -> bool {
        let (byte, bit) = self.index(x, y);
        (self.bits[byte] >> bit) & 1 != 0
    }

    pub(crate) fn set(&mut self, x: u8, y: u8, dark: bool) {
        let (byte, bit) = self.index(x, y);
        if dark {
            self.bits[byte] |= 1u8 << bit;
        } else {
            self.bits[byte] &= !(1u8 << bit);
        }
    }

    /// Like [`set`](Self::set), but silently drops coordinates off the grid.
    pub(crate) fn set_clipped(&mut self, x: i32, y: i32, dark: bool) {
        let range = 0..i32::from(self.size);
        if range.contains(&x) && range.contains(&y) {
            self.set(x as u8, y as u8, dark);
        }
    }

    pub(crate) fn fill_rect(&mut self, left: u8, top: u8, width: u8, height: u8) {
        for dy in 0..height {
            for dx in 0..width {
                self.set(left + dx, top + dy, true);
            }
        }
    }

    fn index(&self, x: u8, y: u8) -> (usize, u32) {
        assert!(x < self.size && y < self.size, "Module coordinates out of range");
        let i = usize::from(y) * usize::from(self.size) + usize::from(x);
        (i >> 3, (i & 7) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut m = BitMatrix::new(21);
        assert_eq!(m.dark_count(), 0);
        m.set(3, 4, true);
        m.set(20, 20, true);
        assert!(m.get(3, 4));
        assert!(m.is_dark(20, 20));
        assert!(!m.get(4, 3));
        m.set(3, 4, false);
        assert_eq!(m.dark_count(), 1);
    }

    #[test]
    fn test_out_of_bounds_is_light() {
        let mut m = BitMatrix::new(21);
        m.fill_rect(0, 0, 21, 21);
        assert_eq!(m.dark_count(), 21 * 21);
        assert!(!m.is_dark(-1, 0));
        assert!(!m.is_dark(0, 21));
        m.set_clipped(-1, 5, false);
        m.set_clipped(25, 5, false);
        assert_eq!(m.dark_count(), 21 * 21);
    }
}
