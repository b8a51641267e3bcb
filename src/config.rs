//! Configuration types for strip split/merge runs.
//!
//! All behaviour that is not the operation itself (split vs merge and its
//! count) is controlled through [`StripConfig`], built via its
//! [`StripConfigBuilder`]. The two historical output conventions
//! (`{id}_group_N.jpg` and `merged_N.png`) are expressed as
//! [`NamingScheme`] + [`OutputFormat`] combinations of one pipeline.

use crate::error::StripError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default JPEG quality for every encoded strip.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Configuration for a split or merge run.
///
/// Built via [`StripConfig::builder()`] or using [`StripConfig::default()`].
///
/// # Example
/// ```rust
/// use stripcut::{NamingScheme, OutputFormat, StripConfig};
///
/// let config = StripConfig::builder()
///     .naming(NamingScheme::Sequential)
///     .output_format(OutputFormat::Png)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StripConfig {
    /// Encoding used for every output image. Default: JPEG, quality 95.
    pub output_format: OutputFormat,

    /// How output entries are named. Default: [`NamingScheme::Source`].
    pub naming: NamingScheme,

    /// Replaces the source identifier (folder name or upload label) in
    /// output names when set.
    pub output_prefix: Option<String>,

    /// What happens to the `height % parts` rows left over by a split.
    /// Default: [`RemainderPolicy::Drop`].
    pub remainder: RemainderPolicy,

    /// Which file-name key decides reading order. Default: first number.
    pub ordering: OrderingKey,

    /// How transparent pixels are flattened to RGB before crop/paste.
    pub alpha: AlphaPolicy,

    /// Optional resize applied to every decoded image before the transform.
    pub resize: Option<ResizeSpec>,

    /// Abort on the first undecodable file instead of skipping it. Default: false.
    pub strict_decode: bool,

    /// In on-disk mode, delete the consumed source files once the archive
    /// has been built. Default: true. Ignored for in-memory sources.
    pub consume_sources: bool,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::default(),
            naming: NamingScheme::default(),
            output_prefix: None,
            remainder: RemainderPolicy::default(),
            ordering: OrderingKey::default(),
            alpha: AlphaPolicy::default(),
            resize: None,
            strict_decode: false,
            consume_sources: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StripConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripConfig")
            .field("output_format", &self.output_format)
            .field("naming", &self.naming)
            .field("output_prefix", &self.output_prefix)
            .field("remainder", &self.remainder)
            .field("ordering", &self.ordering)
            .field("alpha", &self.alpha)
            .field("resize", &self.resize)
            .field("strict_decode", &self.strict_decode)
            .field("consume_sources", &self.consume_sources)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn StripProgressCallback>"),
            )
            .finish()
    }
}

impl StripConfig {
    /// Create a new builder for `StripConfig`.
    pub fn builder() -> StripConfigBuilder {
        StripConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`StripConfig`].
pub struct StripConfigBuilder {
    config: StripConfig,
}

impl fmt::Debug for StripConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl StripConfigBuilder {
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Shorthand for `output_format(OutputFormat::Jpeg { quality })`.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.output_format = OutputFormat::Jpeg { quality };
        self
    }

    pub fn naming(mut self, naming: NamingScheme) -> Self {
        self.config.naming = naming;
        self
    }

    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = Some(prefix.into());
        self
    }

    pub fn remainder(mut self, policy: RemainderPolicy) -> Self {
        self.config.remainder = policy;
        self
    }

    pub fn ordering(mut self, key: OrderingKey) -> Self {
        self.config.ordering = key;
        self
    }

    pub fn alpha(mut self, policy: AlphaPolicy) -> Self {
        self.config.alpha = policy;
        self
    }

    pub fn resize(mut self, spec: ResizeSpec) -> Self {
        self.config.resize = if spec.is_noop() { None } else { Some(spec) };
        self
    }

    pub fn strict_decode(mut self, v: bool) -> Self {
        self.config.strict_decode = v;
        self
    }

    pub fn consume_sources(mut self, v: bool) -> Self {
        self.config.consume_sources = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StripConfig, StripError> {
        let c = &self.config;
        if let OutputFormat::Jpeg { quality } = c.output_format {
            if !(1..=100).contains(&quality) {
                return Err(StripError::InvalidConfig(format!(
                    "JPEG quality must be 1-100, got {quality}"
                )));
            }
        }
        if let Some(spec) = c.resize {
            if spec.width == Some(0) || spec.height == Some(0) {
                return Err(StripError::InvalidConfig(
                    "Resize dimensions must be at least 1px".into(),
                ));
            }
        }
        if let Some(ref prefix) = c.output_prefix {
            if prefix.is_empty() || prefix.contains(['/', '\\']) {
                return Err(StripError::InvalidConfig(format!(
                    "Output prefix must be a non-empty file-name fragment, got {prefix:?}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding applied to every output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Lossy JPEG at the given quality (1-100). (default, quality 95)
    Jpeg { quality: u8 },
    /// Lossless PNG.
    Png,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl OutputFormat {
    /// File extension used for entries in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg { .. } => "jpg",
            OutputFormat::Png => "png",
        }
    }
}

/// Output naming convention.
///
/// | Scheme | split | merge |
/// |--------|-------|-------|
/// | `Source` | `{id}_{n}.{ext}` | `{id}_group_{n}.{ext}` |
/// | `Sequential` | `part_{n}.{ext}` | `merged_{n}.{ext}` |
///
/// `n` is 1-indexed; `{id}` is the source identifier or `output_prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NamingScheme {
    #[default]
    Source,
    Sequential,
}

impl NamingScheme {
    /// Name of the `index`-th (0-based) strip produced by a split.
    pub fn split_name(&self, id: &str, index: usize, format: OutputFormat) -> String {
        match self {
            NamingScheme::Source => format!("{id}_{}.{}", index + 1, format.extension()),
            NamingScheme::Sequential => format!("part_{}.{}", index + 1, format.extension()),
        }
    }

    /// Name of the `index`-th (0-based) group produced by a merge.
    pub fn merge_name(&self, id: &str, index: usize, format: OutputFormat) -> String {
        match self {
            NamingScheme::Source => format!("{id}_group_{}.{}", index + 1, format.extension()),
            NamingScheme::Sequential => format!("merged_{}.{}", index + 1, format.extension()),
        }
    }
}

/// Treatment of rows that do not fit evenly into split bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemainderPolicy {
    /// Discard the trailing `height % parts` rows. (default)
    #[default]
    Drop,
    /// Append the trailing rows to the last band, which becomes taller.
    Extend,
}

/// File-name key used to establish reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderingKey {
    /// First run of digits anywhere in the name (`img10.png` → 10). (default)
    #[default]
    FirstNumber,
    /// `XX_YY` stems (`01_15.jpg` → `[1, 15]`); anything else keys as `[0, 0]`.
    TwoPart,
}

/// Flattening of images that carry an alpha channel.
///
/// Both variants are lossy for transparent sources: outputs are always
/// opaque RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AlphaPolicy {
    /// Drop the alpha channel and keep the underlying colour values. (default)
    #[default]
    Discard,
    /// Composite over a solid background colour.
    Background([u8; 3]),
}

impl AlphaPolicy {
    /// Composite over white.
    pub const WHITE: AlphaPolicy = AlphaPolicy::Background([255, 255, 255]);
}

/// Target dimensions for the resize pre-step.
///
/// A missing dimension keeps the image's original size along that axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ResizeSpec {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self { width, height }
    }

    /// True when neither dimension is set.
    pub fn is_noop(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Resolve the target size for an image of `width × height`.
    pub fn target(&self, width: u32, height: u32) -> (u32, u32) {
        (self.width.unwrap_or(width), self.height.unwrap_or(height))
    }
}
