//! Optimisation policy applied by the photo codec.

/// Limits for decoding and re-encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisationPolicy {
    /// Reject sources with more pixels than this.
    pub max_pixels: u64,
    /// Longest side after resizing.
    pub max_side: u32,
    /// JPEG quality for opaque images.
    pub jpeg_quality: u8,
}

impl Default for OptimisationPolicy {
    fn default() -> Self {
        Self {
            max_pixels: 24_000_000,
            max_side: 1920,
            jpeg_quality: 82,
        }
    }
}

/// Encoded output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    /// AVIF sources are stored untouched.
    AvifPassthrough,
}

impl OutputFormat {
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::AvifPassthrough => "image/avif",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::AvifPassthrough => "avif",
        }
    }
}

/// Choose the output format for a decoded source.
#[must_use]
pub const fn choose_output(source_is_avif: bool, has_alpha: bool) -> OutputFormat {
    if source_is_avif {
        OutputFormat::AvifPassthrough
    } else if has_alpha {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    }
}

impl OptimisationPolicy {
    /// Whether a source of `width`×`height` is too large to process.
    #[must_use]
    pub fn exceeds_pixel_limit(&self, width: u32, height: u32) -> bool {
        u64::from(width) * u64::from(height) > self.max_pixels
    }

    /// Target size preserving aspect ratio with the longest side capped.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::photos::OptimisationPolicy;
    ///
    /// let policy = OptimisationPolicy::default();
    /// assert_eq!(policy.target_size(4000, 3000), (1920, 1440));
    /// assert_eq!(policy.target_size(800, 600), (800, 600));
    /// ```
    #[must_use]
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= self.max_side || longest == 0 {
            return (width, height);
        }
        let scale = |side: u32| -> u32 {
            let scaled = u64::from(side) * u64::from(self.max_side) / u64::from(longest);
            u32::try_from(scaled).unwrap_or(self.max_side).max(1)
        };
        (scale(width), scale(height))
    }
}

/// Bytes ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(true, true, OutputFormat::AvifPassthrough)]
    #[case(false, true, OutputFormat::Png)]
    #[case(false, false, OutputFormat::Jpeg)]
    fn output_format_choice(#[case] avif: bool, #[case] alpha: bool, #[case] expected: OutputFormat) {
        assert_eq!(choose_output(avif, alpha), expected);
    }

    #[rstest]
    #[case(6000, 4000, false)]
    #[case(6000, 4001, true)]
    #[case(1920, 1080, false)]
    fn pixel_limit(#[case] width: u32, #[case] height: u32, #[case] exceeds: bool) {
        let policy = OptimisationPolicy::default();
        assert_eq!(policy.exceeds_pixel_limit(width, height), exceeds);
    }

    #[test]
    fn portrait_images_scale_by_height() {
        let policy = OptimisationPolicy::default();
        assert_eq!(policy.target_size(1500, 3000), (960, 1920));
    }
}
