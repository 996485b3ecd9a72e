//! Document generation: QR rasterization, page layout and PDF assembly.
//!
//! - `qr` - text to a two-tone raster
//! - `layout` - layout specifications and word wrapping
//! - `compose` - draw operations for one page
//! - `assemble` - PDF serialization and template overlay

pub mod assemble;
pub mod compose;
pub mod fonts;
pub mod layout;
pub mod qr;

pub use assemble::{assemble, AssembleError, BaseDocument};
pub use compose::{compose, DrawOp, RenderedPage};
pub use fonts::StandardFont;
pub use layout::{wrap_text, Alignment, LayoutError, LayoutSpec, QrBox, TextAnchor};
pub use qr::{encode, QrError, QrOptions, QrRaster, MAX_MODULE_SCALE, MAX_QUIET_ZONE};
