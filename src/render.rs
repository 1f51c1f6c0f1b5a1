//! Rasterizing a module grid and stamping a logo into its center.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba};

use crate::error::{Error, Result};
use crate::matrix::BitMatrix;

/// Color of dark modules.
pub const FOREGROUND: Rgb<u8> = Rgb([0, 0, 0]);
/// Color of light modules, the quiet zone and the logo plate.
pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Number of pixels per module side.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ModuleScale(u32);

impl ModuleScale {
    /// Creates a scale of `pixels` per module side.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` is zero.
    pub const fn new(pixels: u32) -> Self {
        assert!(pixels > 0, "Module scale must be positive");
        Self(pixels)
    }

    pub const fn pixels(self) -> u32 {
        self.0
    }
}

/// A decoded logo, ready to be composited.
#[derive(Clone, Debug)]
pub struct LogoOverlay {
    image: DynamicImage,
}

impl LogoOverlay {
    /// Wraps an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LogoSourceUnreadable`] if the image has no pixels.
    pub fn from_image(image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(Error::LogoSourceUnreadable {
                path: None,
                reason: "image has no pixels".into(),
            });
        }
        Ok(Self { image })
    }

    /// Decodes a logo from encoded image bytes (PNG, JPEG, ...).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).map_err(|e| Error::LogoSourceUnreadable {
            path: None,
            reason: e.to_string(),
        })?;
        Self::from_image(image)
    }

    /// Reads and decodes a logo file.
    pub fn open(path: &Path) -> Result<Self> {
        let unreadable = |reason: String| Error::LogoSourceUnreadable {
            path: Some(path.to_path_buf()),
            reason,
        };
        let image = image::open(path).map_err(|e| unreadable(e.to_string()))?;
        Self::from_image(image).map_err(|_| unreadable("image has no pixels".into()))
    }

    /// Dimensions of the source image.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Placement of the logo plate and the logo on a square canvas.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LogoGeometry {
    /// Side of the canvas in pixels.
    pub canvas: u32,
    /// Side of the light plate that is cleared behind the logo.
    pub plate: u32,
    /// Top left corner of the plate (same on both axes).
    pub plate_offset: u32,
    /// Side of the resized logo.
    pub logo: u32,
    /// Top left corner of the logo (same on both axes).
    pub logo_offset: u32,
}

impl LogoGeometry {
    /// Plate is a quarter and logo a fifth of the canvas side, both centered.
    pub fn for_canvas(canvas: u32) -> Self {
        let plate = canvas / 4;
        let logo = canvas / 5;
        Self {
            canvas,
            plate,
            plate_offset: (canvas - plate) / 2,
            logo,
            logo_offset: (canvas - logo) / 2,
        }
    }
}

/// Side in pixels of the image [`composite`] produces.
pub fn canvas_side(matrix: &BitMatrix, scale: ModuleScale, quiet_zone: u32) -> u32 {
    (matrix.size() + 2 * quiet_zone) * scale.pixels()
}

/// Renders `matrix` into an RGB image.
///
/// Every module becomes a `scale` × `scale` block, surrounded by a light
/// border `quiet_zone` modules wide. With a logo, a light plate a quarter of
/// the image side is cleared in the center and the logo, resized to a fifth of
/// the side, is pasted on top of it. Logo transparency is blended onto the
/// plate.
///
/// # Errors
///
/// * [`Error::EmptyMatrix`] if the matrix has no modules.
///
/// # Example
///
/// ```rust
/// use logoqr::{composite, EcLevel, ModuleScale, QrCode};
///
/// let qr = QrCode::encode_text("HELLO", EcLevel::High).unwrap();
/// let scale = ModuleScale::new(5);
/// let img = composite(qr.matrix(), scale, 4, None).unwrap();
/// assert_eq!(img.dimensions(), (145, 145));
/// ```
pub fn composite(
    matrix: &BitMatrix,
    scale: ModuleScale,
    quiet_zone: u32,
    logo: Option<&LogoOverlay>,
) -> Result<RgbImage> {
    if matrix.size() == 0 {
        return Err(Error::EmptyMatrix);
    }
    let side = canvas_side(matrix, scale, quiet_zone);
    let px = scale.pixels();
    let mut img = RgbImage::from_pixel(side, side, BACKGROUND);

    for y in 0..matrix.size() {
        for x in 0..matrix.size() {
            if !matrix.is_dark(x as i32, y as i32) {
                continue;
            }
            let left = (x + quiet_zone) * px;
            let top = (y + quiet_zone) * px;
            fill_square(&mut img, left, top, px, FOREGROUND);
        }
    }

    if let Some(logo) = logo {
        let geo = LogoGeometry::for_canvas(side);
        log::debug!(
            "placing {}x{} logo: plate {}px at {}, logo {}px at {}",
            logo.image.width(),
            logo.image.height(),
            geo.plate,
            geo.plate_offset,
            geo.logo,
            geo.logo_offset
        );
        fill_square(&mut img, geo.plate_offset, geo.plate_offset, geo.plate, BACKGROUND);
        if geo.logo > 0 {
            let resized = imageops::resize(&logo.image.to_rgba8(), geo.logo, geo.logo, FilterType::Lanczos3);
            for (x, y, src) in resized.enumerate_pixels() {
                let dst = img.get_pixel_mut(geo.logo_offset + x, geo.logo_offset + y);
                *dst = blend_over(*dst, *src);
            }
        }
    }

    Ok(img)
}

/// Source-over blend of `fg` onto an opaque `bg`.
fn blend_over(bg: Rgb<u8>, fg: Rgba<u8>) -> Rgb<u8> {
    let alpha = u16::from(fg[3]);
    let mix = |f: u8, b: u8| ((u16::from(f) * alpha + u16::from(b) * (255 - alpha) + 127) / 255) as u8;
    Rgb([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])])
}

fn fill_square(img: &mut RgbImage, left: u32, top: u32, side: u32, color: Rgb<u8>) {
    for y in top..top + side {
        for x in left..left + side {
            img.put_pixel(x, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecc::EcLevel;
    use crate::qrcode::QrCode;
    use image::RgbaImage;

    fn scale(px: u32) -> ModuleScale {
        ModuleScale::new(px)
    }

    #[test]
    fn test_canvas_side() {
        let qr = QrCode::encode_text("HELLO", EcLevel::High).unwrap();
        for px in [5, 10, 15] {
            let img = composite(qr.matrix(), scale(px), 4, None).unwrap();
            assert_eq!(img.dimensions(), (29 * px, 29 * px));
        }
        let img = composite(qr.matrix(), scale(3), 0, None).unwrap();
        assert_eq!(img.dimensions(), (63, 63));
    }

    #[test]
    fn test_modules_map_to_blocks() {
        let qr = QrCode::encode_text("HELLO", EcLevel::High).unwrap();
        let img = composite(qr.matrix(), scale(5), 4, None).unwrap();
        // Quiet zone is light, finder corner is dark.
        assert_eq!(*img.get_pixel(0, 0), BACKGROUND);
        assert_eq!(*img.get_pixel(19, 19), BACKGROUND);
        assert_eq!(*img.get_pixel(20, 20), FOREGROUND);
        assert_eq!(*img.get_pixel(24, 24), FOREGROUND);
        for y in 0..21 {
            for x in 0..21 {
                let expected = if qr.matrix().is_dark(x, y) { FOREGROUND } else { BACKGROUND };
                let p = img.get_pixel((x as u32 + 4) * 5 + 2, (y as u32 + 4) * 5 + 2);
                assert_eq!(*p, expected);
            }
        }
    }

    #[test]
    fn test_blend_over() {
        let white = Rgb([255, 255, 255]);
        assert_eq!(blend_over(white, Rgba([10, 20, 30, 255])), Rgb([10, 20, 30]));
        assert_eq!(blend_over(white, Rgba([10, 20, 30, 0])), white);
        assert_eq!(blend_over(white, Rgba([0, 0, 0, 128])), Rgb([127, 127, 127]));
    }

    #[test]
    #[should_panic(expected = "Module scale must be positive")]
    fn test_zero_scale_rejected() {
        ModuleScale::new(0);
    }

    #[test]
    fn test_empty_matrix() {
        let err = composite(&BitMatrix::new(0), scale(10), 4, None).unwrap_err();
        assert!(matches!(err, Error::EmptyMatrix));
    }

    #[test]
    fn test_geometry() {
        for side in [145, 290, 435, 675, 1000, 2655] {
            let geo = LogoGeometry::for_canvas(side);
            assert!(geo.plate > geo.logo);
            assert_eq!(geo.plate, side / 4);
            assert_eq!(geo.logo, side / 5);
            // Centers agree with the canvas center within a pixel.
            let center = side as f64 / 2.0;
            let plate_center = geo.plate_offset as f64 + geo.plate as f64 / 2.0;
            let logo_center = geo.logo_offset as f64 + geo.logo as f64 / 2.0;
            assert!((plate_center - center).abs() <= 1.0);
            assert!((logo_center - center).abs() <= 1.0);
            // The plate fully backs the logo.
            assert!(geo.plate_offset <= geo.logo_offset);
            assert!(geo.plate_offset + geo.plate >= geo.logo_offset + geo.logo);
        }
    }

    #[test]
    fn test_logo_on_plate() {
        let qr = QrCode::encode_text("https://example.com/logo", EcLevel::High).unwrap();
        let red = RgbaImage::from_pixel(64, 32, Rgba([200, 0, 0, 255]));
        let logo = LogoOverlay::from_image(DynamicImage::ImageRgba8(red)).unwrap();
        let img = composite(qr.matrix(), scale(10), 4, Some(&logo)).unwrap();
        let geo = LogoGeometry::for_canvas(img.width());

        // Logo is stretched to a square a fifth of the side.
        let mid = geo.logo_offset + geo.logo / 2;
        assert_eq!(*img.get_pixel(mid, mid), Rgb([200, 0, 0]));
        assert_eq!(*img.get_pixel(geo.logo_offset, geo.logo_offset), Rgb([200, 0, 0]));
        // Between the logo and the plate edge everything is light.
        for i in geo.plate_offset..geo.logo_offset {
            assert_eq!(*img.get_pixel(i, i), BACKGROUND);
            assert_eq!(*img.get_pixel(i, mid), BACKGROUND);
        }
        let last = geo.plate_offset + geo.plate - 1;
        assert_eq!(*img.get_pixel(last, last), BACKGROUND);
    }

    #[test]
    fn test_transparent_logo_leaves_plate() {
        let qr = QrCode::encode_text("HELLO", EcLevel::High).unwrap();
        let clear = RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0]));
        let logo = LogoOverlay::from_image(DynamicImage::ImageRgba8(clear)).unwrap();
        let img = composite(qr.matrix(), scale(10), 4, Some(&logo)).unwrap();
        let geo = LogoGeometry::for_canvas(img.width());
        for y in geo.plate_offset..geo.plate_offset + geo.plate {
            for x in geo.plate_offset..geo.plate_offset + geo.plate {
                assert_eq!(*img.get_pixel(x, y), BACKGROUND);
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let qr = QrCode::encode_text("repeatable", EcLevel::High).unwrap();
        let logo = LogoOverlay::from_image(DynamicImage::new_rgb8(40, 40)).unwrap();
        let a = composite(qr.matrix(), scale(15), 4, Some(&logo)).unwrap();
        let b = composite(qr.matrix(), scale(15), 4, Some(&logo)).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_unreadable_logo() {
        assert!(matches!(
            LogoOverlay::decode(b"definitely not an image"),
            Err(Error::LogoSourceUnreadable { path: None, .. })
        ));
        assert!(matches!(
            LogoOverlay::open(Path::new("/nonexistent/logo.png")),
            Err(Error::LogoSourceUnreadable { path: Some(_), .. })
        ));
        assert!(LogoOverlay::from_image(DynamicImage::new_rgb8(0, 4)).is_err());
    }
}
