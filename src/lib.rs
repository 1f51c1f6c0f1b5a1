//! # logoqr
//!
//! A Rust library for generating QR codes that carry a logo in their center.
//!
//! `logoqr` encodes text or binary data into QR codes following the QR Code
//! Model 2 specification: versions 1 to 40, four error correction levels and
//! numeric, alphanumeric or byte mode. The symbol is rendered into an RGB
//! image, and an optional logo is pasted onto a cleared plate in the middle of
//! it. Generated codes always use the High error correction level so that the
//! symbol survives the area the logo covers.
//!
//! ## Features
//!
//! - Full encoder: mode selection, minimal version, Reed-Solomon, masking.
//! - Three output sizes (5, 10 or 15 pixels per module) with a quiet zone.
//! - Logo overlay on a white plate, resized with a Lanczos filter.
//! - PNG output, written only once the whole image is ready.
//! - Safe Rust implementation with no unsafe code.
//!
//! ## Example
//!
//! Render a code in memory:
//!
//! ```rust
//! use logoqr::{render_request, EncodingRequest, SizeTier};
//!
//! let request = EncodingRequest::new("Hello, World!", SizeTier::Medium);
//! let img = render_request(&request, None).unwrap();
//! assert_eq!(img.width(), img.height());
//! ```
//!
//! Generate a file with a logo:
//!
//! ```no_run
//! use std::path::Path;
//! use logoqr::{generate_to_file, EncodingRequest, SizeTier};
//!
//! let request = EncodingRequest::new("https://example.com", SizeTier::Large);
//! generate_to_file(&request, Some(Path::new("logo.png")), Path::new("output/qr.png")).unwrap();
//! ```
//!
//! ## Modules
//!
//! - [`qrcode`]: Encoding data into a QR symbol.
//! - [`render`]: Rasterizing a symbol and compositing a logo.
//! - [`generator`]: Size tiers, requests and PNG output.
#![forbid(unsafe_code)]

pub mod ecc;
pub mod error;
pub mod generator;
pub mod matrix;
pub mod qrcode;
pub mod render;
pub mod segment;

pub use ecc::EcLevel;
pub use error::{Error, Result};
pub use generator::{generate_to_file, render_request, EncodingRequest, SizeTier};
pub use matrix::BitMatrix;
pub use qrcode::{Mask, QrCode, Version};
pub use render::{composite, LogoGeometry, LogoOverlay, ModuleScale};
pub use segment::{Segment, SegmentMode};
