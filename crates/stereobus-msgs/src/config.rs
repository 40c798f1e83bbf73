use crate::header::VersionPolicy;

/// Default bound on `rows * cols` for image messages.
pub const DEFAULT_MAX_IMAGE_PIXELS: u64 = 100_000_000;

/// Default bound on the element count of array messages.
pub const DEFAULT_MAX_ARRAY_ELEMENTS: u64 = 100_000_000;

/// Decode-time limits and version handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Largest accepted `rows * cols`. Default: 10^8.
    pub max_image_pixels: u64,
    /// Largest accepted element count for point, obstacle and finding arrays. Default: 10^8.
    pub max_array_elements: u64,
    /// Minor-version handling. Default: exact match.
    pub version_policy: VersionPolicy,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_image_pixels: DEFAULT_MAX_IMAGE_PIXELS,
            max_array_elements: DEFAULT_MAX_ARRAY_ELEMENTS,
            version_policy: VersionPolicy::Exact,
        }
    }
}
