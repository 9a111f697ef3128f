pub mod codec;
pub mod diff;
pub mod normalize;

pub use codec::{PngCodec, RasterCodec};
pub use diff::{DiffError, DiffOptions, DiffOutput, DiffResult, PixelDiffer, RasterDiffer, similarity_pct};
pub use normalize::{PAD_COLOR, contain_size, normalize, normalize_image};

/// Result type for raster codec operations
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors decoding or encoding rasters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    /// Bytes are not a readable raster
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// Encoding the output raster failed
    #[error("failed to encode image: {0}")]
    Encode(String),
}
