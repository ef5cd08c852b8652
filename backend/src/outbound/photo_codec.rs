//! `image`-crate implementation of [`PhotoCodec`].
//!
//! Dimensions are read from the header before decoding so oversized
//! sources are refused without allocating their pixel buffers.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader};

use crate::domain::photos::{OptimisationPolicy, OptimisedImage, OutputFormat, choose_output};
use crate::domain::ports::{PhotoCodec, PhotoCodecError};

/// Decodes JPEG, PNG and WebP; passes AVIF through untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImagePhotoCodec;

impl PhotoCodec for ImagePhotoCodec {
    fn optimise(
        &self,
        bytes: &[u8],
        policy: &OptimisationPolicy,
    ) -> Result<OptimisedImage, PhotoCodecError> {
        let format = image::guess_format(bytes)
            .map_err(|_| PhotoCodecError::unsupported("unknown"))?;
        if format == ImageFormat::Avif {
            return Ok(OptimisedImage {
                bytes: bytes.to_vec(),
                format: OutputFormat::AvifPassthrough,
                width: 0,
                height: 0,
            });
        }

        let (width, height) = reader(bytes, format)
            .into_dimensions()
            .map_err(|err| map_image_error(err, format))?;
        if policy.exceeds_pixel_limit(width, height) {
            return Err(PhotoCodecError::too_large(width, height));
        }

        let decoded = reader(bytes, format)
            .decode()
            .map_err(|err| map_image_error(err, format))?;
        let output = choose_output(false, decoded.color().has_alpha());
        let (target_width, target_height) = policy.target_size(width, height);
        let resized = if (target_width, target_height) == (width, height) {
            decoded
        } else {
            decoded.resize_exact(target_width, target_height, FilterType::Lanczos3)
        };

        let encoded = encode(&resized, output, policy.jpeg_quality)?;
        Ok(OptimisedImage {
            bytes: encoded,
            format: output,
            width: resized.width(),
            height: resized.height(),
        })
    }
}

fn reader(bytes: &[u8], format: ImageFormat) -> ImageReader<Cursor<&[u8]>> {
    ImageReader::with_format(Cursor::new(bytes), format)
}

fn encode(
    image: &DynamicImage,
    output: OutputFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, PhotoCodecError> {
    let mut buffer = Vec::new();
    let result = match output {
        OutputFormat::Jpeg => image
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, jpeg_quality)),
        OutputFormat::Png => image
            .to_rgba8()
            .write_with_encoder(PngEncoder::new(&mut buffer)),
        OutputFormat::AvifPassthrough => {
            return Err(PhotoCodecError::encode("AVIF is never re-encoded"));
        }
    };
    result.map_err(|err| PhotoCodecError::encode(err.to_string()))?;
    Ok(buffer)
}

fn map_image_error(error: ImageError, format: ImageFormat) -> PhotoCodecError {
    match error {
        ImageError::Unsupported(_) => PhotoCodecError::unsupported(format!("{format:?}")),
        other => PhotoCodecError::decode(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use rstest::rstest;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .expect("png encodes");
        buffer.into_inner()
    }

    fn opaque(width: u32, height: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([120, 80, 40]),
        )))
    }

    #[rstest]
    fn opaque_sources_become_resized_jpeg() {
        let policy = OptimisationPolicy {
            max_side: 64,
            ..OptimisationPolicy::default()
        };

        let optimised = ImagePhotoCodec
            .optimise(&opaque(256, 128), &policy)
            .expect("optimises");

        assert_eq!(optimised.format, OutputFormat::Jpeg);
        assert_eq!((optimised.width, optimised.height), (64, 32));
        assert_eq!(
            image::guess_format(&optimised.bytes).expect("known format"),
            ImageFormat::Jpeg
        );
    }

    #[rstest]
    fn transparent_sources_stay_png() {
        let source = png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            8,
            8,
            Rgba([0, 0, 0, 0]),
        )));

        let optimised = ImagePhotoCodec
            .optimise(&source, &OptimisationPolicy::default())
            .expect("optimises");

        assert_eq!(optimised.format, OutputFormat::Png);
        assert_eq!((optimised.width, optimised.height), (8, 8));
    }

    #[rstest]
    fn identical_sources_encode_identically() {
        let source = opaque(32, 32);
        let policy = OptimisationPolicy::default();

        let first = ImagePhotoCodec.optimise(&source, &policy).expect("optimises");
        let second = ImagePhotoCodec.optimise(&source, &policy).expect("optimises");

        assert_eq!(first.bytes, second.bytes);
    }

    #[rstest]
    fn oversized_sources_are_refused_before_decoding() {
        let policy = OptimisationPolicy {
            max_pixels: 100,
            ..OptimisationPolicy::default()
        };

        let err = ImagePhotoCodec
            .optimise(&opaque(20, 10), &policy)
            .expect_err("too many pixels");

        assert_eq!(err, PhotoCodecError::too_large(20_u32, 10_u32));
    }

    #[rstest]
    fn unknown_bytes_are_unsupported() {
        let err = ImagePhotoCodec
            .optimise(b"definitely not an image", &OptimisationPolicy::default())
            .expect_err("not an image");

        assert!(matches!(err, PhotoCodecError::Unsupported { .. }));
    }
}
