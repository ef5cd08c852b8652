//! Image decoding, resizing and re-encoding.

use super::define_port_error;
use crate::domain::photos::{OptimisationPolicy, OptimisedImage};

define_port_error! {
    /// Errors raised by photo codecs.
    pub enum PhotoCodecError {
        /// The bytes are not an image format the codec reads.
        Unsupported { format: String } => invalid_argument, "unsupported image format: {format}",
        /// The source has more pixels than the policy allows.
        TooLarge { width: u32, height: u32 } => invalid_argument, "image {width}x{height} exceeds the pixel limit",
        /// Decoding failed.
        Decode { message: String } => invalid_argument, "image could not be decoded: {message}",
        /// Encoding failed.
        Encode { message: String } => internal, "image could not be encoded: {message}",
    }
}

/// CPU-bound optimiser; callers run it off the async executor.
#[cfg_attr(test, mockall::automock)]
pub trait PhotoCodec: Send + Sync {
    fn optimise(
        &self,
        bytes: &[u8],
        policy: &OptimisationPolicy,
    ) -> Result<OptimisedImage, PhotoCodecError>;
}
