//! Dataset and extraction configuration.
//!
//! [`DatasetConfig`] fixes the remote resource ranges for each split and
//! [`ExtractOptions`] carries the frame selection policy for an extraction
//! run. Both are builders with sensible defaults, so a default-constructed
//! value reproduces the canonical dataset.
//!
//! # Example
//!
//! ```
//! use frameset::{DatasetConfig, ExtractOptions, Strategy};
//!
//! let config = DatasetConfig::new().with_train_range(1..=2).with_test_range(1..=1);
//! let options = ExtractOptions::new()
//!     .with_strategy(Strategy::Smooth)
//!     .with_cutoff(5);
//! ```

use std::ops::RangeInclusive;

use crate::selection::Strategy;

/// Default half-width, in frames, of the window around an annotated event.
pub const DEFAULT_CUTOFF: u32 = 9;

/// Largest cutoff the command line accepts. Smooth windows span up to
/// `4 * cutoff + 1` frames per event.
pub const MAX_CUTOFF: u32 = 10_000;

/// Remote resource ranges and file naming for a dataset.
///
/// Each index `n` of a split's range yields one archive resource and one
/// video resource. The canonical dataset uses `1..=5` for training and
/// `1..=7` for testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetConfig {
    pub(crate) train_range: RangeInclusive<u32>,
    pub(crate) test_range: RangeInclusive<u32>,
    pub(crate) video_extension: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetConfig {
    /// Create the canonical configuration.
    pub fn new() -> Self {
        Self {
            train_range: 1..=5,
            test_range: 1..=7,
            video_extension: "mp4".to_string(),
        }
    }

    /// Set the resource indices of the training split.
    #[must_use]
    pub fn with_train_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.train_range = range;
        self
    }

    /// Set the resource indices of the testing split.
    #[must_use]
    pub fn with_test_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.test_range = range;
        self
    }

    /// Set the extension of remote video resources (without the dot).
    #[must_use]
    pub fn with_video_extension(mut self, extension: impl Into<String>) -> Self {
        self.video_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Resource indices of the training split.
    pub fn train_range(&self) -> RangeInclusive<u32> {
        self.train_range.clone()
    }

    /// Resource indices of the testing split.
    pub fn test_range(&self) -> RangeInclusive<u32> {
        self.test_range.clone()
    }

    /// Extension of remote video resources.
    pub fn video_extension(&self) -> &str {
        &self.video_extension
    }

    /// Number of resources a download plan will contain.
    pub fn resource_count(&self) -> usize {
        2 * (self.train_range.clone().count() + self.test_range.clone().count())
    }
}

/// Frame selection settings for an extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub(crate) strategy: Strategy,
    pub(crate) cutoff: u32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Defaults: [`Strategy::All`], cutoff [`DEFAULT_CUTOFF`].
    pub fn new() -> Self {
        Self {
            strategy: Strategy::All,
            cutoff: DEFAULT_CUTOFF,
        }
    }

    /// Set the frame selection strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the window half-width used by the `selected` and `smooth`
    /// strategies. Ignored by [`Strategy::All`].
    #[must_use]
    pub fn with_cutoff(mut self, cutoff: u32) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn cutoff(&self) -> u32 {
        self.cutoff
    }
}
