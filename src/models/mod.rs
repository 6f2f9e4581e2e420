/// Decode outcomes and validated codes
pub mod barcode;
/// Boxes and detector candidates
pub mod geometry;
/// Owned pixel buffers
pub mod raster;
/// Supported 1D symbologies
pub mod symbology;

pub use barcode::{DecodeOutcome, ValidatedBarcode};
pub use geometry::{BoundingBox, DetectionCandidate};
pub use raster::RasterImage;
pub use symbology::Symbology;
