//! Request building and file output around the encoder and the compositor.
//!
//! This is the layer callers (the command line tool, or any other front end)
//! talk to: it maps size tiers to module scales, fixes the error correction
//! level, loads the logo and writes the finished PNG.

use std::ffi::OsStr;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{ImageFormat, RgbImage};

use crate::ecc::EcLevel;
use crate::error::{Error, Result};
use crate::qrcode::QrCode;
use crate::render::{self, LogoOverlay, ModuleScale};

/// Error correction used for every generated code. A logo destroys part of
/// the symbol, so the highest level is always used.
pub const DEFAULT_EC_LEVEL: EcLevel = EcLevel::High;

/// Quiet zone width in modules.
pub const DEFAULT_QUIET_ZONE: u32 = 4;

/// Output size of a generated code.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum SizeTier {
    /// 5 pixels per module.
    Small,
    /// 10 pixels per module.
    #[default]
    Medium,
    /// 15 pixels per module.
    Large,
}

impl SizeTier {
    pub fn module_scale(self) -> ModuleScale {
        match self {
            SizeTier::Small => ModuleScale::new(5),
            SizeTier::Medium => ModuleScale::new(10),
            SizeTier::Large => ModuleScale::new(15),
        }
    }

    /// Parses a tier, falling back to [`SizeTier::Medium`] for anything
    /// unrecognized.
    ///
    /// Accepts `small`, `medium`, `large` in any case, as well as the numeric
    /// shorthands `1`, `2` and `3`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use logoqr::SizeTier;
    ///
    /// assert_eq!(SizeTier::parse_lenient("3"), SizeTier::Large);
    /// assert_eq!(SizeTier::parse_lenient("huge"), SizeTier::Medium);
    /// ```
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            log::warn!("unknown size tier {:?}, using medium", s);
            SizeTier::Medium
        })
    }
}

impl FromStr for SizeTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "small" | "s" => Ok(SizeTier::Small),
            "2" | "medium" | "m" => Ok(SizeTier::Medium),
            "3" | "large" | "l" => Ok(SizeTier::Large),
            other => Err(format!("unknown size tier {:?}", other)),
        }
    }
}

/// Everything needed to encode and render one code, fixed at construction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EncodingRequest {
    data: Vec<u8>,
    ec_level: EcLevel,
    quiet_zone: u32,
    scale: ModuleScale,
}

impl EncodingRequest {
    /// Creates a request at level H with a 4 module quiet zone.
    pub fn new(data: impl Into<Vec<u8>>, tier: SizeTier) -> Self {
        Self {
            data: data.into(),
            ec_level: DEFAULT_EC_LEVEL,
            quiet_zone: DEFAULT_QUIET_ZONE,
            scale: tier.module_scale(),
        }
    }

    /// Returns a copy of this request with a different quiet zone width.
    pub fn with_quiet_zone(self, modules: u32) -> Self {
        Self { quiet_zone: modules, ..self }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn ec_level(&self) -> EcLevel {
        self.ec_level
    }

    pub fn quiet_zone(&self) -> u32 {
        self.quiet_zone
    }

    pub fn scale(&self) -> ModuleScale {
        self.scale
    }
}

/// Encodes and renders a request in memory.
///
/// # Example
///
/// ```rust
/// use logoqr::{render_request, EncodingRequest, SizeTier};
///
/// let request = EncodingRequest::new("HELLO", SizeTier::Small);
/// let img = render_request(&request, None).unwrap();
/// assert_eq!(img.dimensions(), (145, 145));
/// ```
pub fn render_request(request: &EncodingRequest, logo: Option<&LogoOverlay>) -> Result<RgbImage> {
    let qr = QrCode::encode(&request.data, request.ec_level)?;
    render::composite(qr.matrix(), request.scale, request.quiet_zone, logo)
}

/// Generates a QR code image and saves it as a PNG.
///
/// The logo, when given, is read from disk first. The image is encoded in
/// memory before the destination is touched, so nothing is written unless the
/// whole request succeeds. An output path without an extension gets `.png`.
///
/// # Arguments
///
/// * `request` - What to encode and how large to draw it.
/// * `logo_path` - Optional. Image to stamp into the center of the code.
/// * `output_path` - Where to write the PNG.
///
/// # Returns
///
/// The absolute path of the written file.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use logoqr::{generate_to_file, EncodingRequest, SizeTier};
///
/// let request = EncodingRequest::new("https://example.com", SizeTier::Large);
/// let path = generate_to_file(&request, Some(Path::new("logo.png")), Path::new("qr")).unwrap();
/// println!("{}", path.display());
/// ```
pub fn generate_to_file(
    request: &EncodingRequest,
    logo_path: Option<&Path>,
    output_path: &Path,
) -> Result<PathBuf> {
    let output_path = png_output_path(output_path)?;
    let logo = logo_path.map(LogoOverlay::open).transpose()?;
    let img = render_request(request, logo.as_ref())?;

    let write_failure = |reason: String| Error::OutputWriteFailure {
        path: output_path.clone(),
        reason,
    };
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| write_failure(e.to_string()))?;
    if let Err(e) = fs::write(&output_path, &bytes) {
        // Do not leave a truncated file behind
        let _ = fs::remove_file(&output_path);
        return Err(write_failure(e.to_string()));
    }

    let absolute = fs::canonicalize(&output_path).map_err(|e| write_failure(e.to_string()))?;
    log::info!("wrote {}x{} QR code to {}", img.width(), img.height(), absolute.display());
    Ok(absolute)
}

/// Appends `.png` to extensionless paths and rejects other formats.
fn png_output_path(path: &Path) -> Result<PathBuf> {
    match path.extension().and_then(OsStr::to_str) {
        None => {
            let mut name = path.as_os_str().to_owned();
            name.push(".png");
            Ok(PathBuf::from(name))
        }
        Some(ext) if ext.eq_ignore_ascii_case("png") => Ok(path.to_path_buf()),
        Some(ext) => Err(Error::OutputWriteFailure {
            path: path.to_path_buf(),
            reason: format!("unsupported image extension {:?}, only PNG is written", ext),
        }),
    }
}
