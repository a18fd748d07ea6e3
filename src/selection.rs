//! Frame selection around annotated events.
//!
//! A [`Strategy`] decides which decoded frames of a video become images:
//!
//! | Strategy   | Frames written                                                    |
//! |------------|-------------------------------------------------------------------|
//! | `all`      | every decoded frame; annotations are never read                   |
//! | `selected` | `[f - cutoff, f + cutoff]` around every annotated frame `f`        |
//! | `smooth`   | as `selected`, but the window doubles for labels other than `empty_event` |
//!
//! The windowed strategies produce a [`SelectedIndexSet`], the union of
//! every event's window. Overlapping windows merge, so no frame is written
//! twice. Windows near the start of a video reach below zero; those indices
//! stay in the set and simply never match a decoded frame.
//!
//! # Example
//!
//! ```
//! use frameset::{EventAnnotations, WindowStrategy, select_indices};
//!
//! let events: EventAnnotations = [(100, "empty_event"), (200, "goal")].into_iter().collect();
//! let indices = select_indices(&events, WindowStrategy::Smooth, 9);
//! assert_eq!(indices.len(), 19 + 37);
//! assert!(indices.contains(182) && indices.contains(218));
//! ```

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter, Result as FmtResult},
    path::Path,
    str::FromStr,
};

use crate::{
    annotation::{EMPTY_EVENT, EventAnnotations, load_events},
    error::DatasetError,
};

/// How frames are chosen for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// Every decoded frame.
    #[default]
    All,
    /// A fixed window around every annotated event.
    Selected,
    /// A window whose width depends on the event label.
    Smooth,
}

/// The annotation-driven strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowStrategy {
    Selected,
    Smooth,
}

impl WindowStrategy {
    /// Window half-width multiplier for an event label.
    pub fn multiplier(self, label: &str) -> i64 {
        match self {
            WindowStrategy::Selected => 1,
            WindowStrategy::Smooth if label == EMPTY_EVENT => 1,
            WindowStrategy::Smooth => 2,
        }
    }
}

impl Strategy {
    /// Every strategy, in CLI order.
    pub const ALL: [Strategy; 3] = [Strategy::All, Strategy::Selected, Strategy::Smooth];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::All => "all",
            Strategy::Selected => "selected",
            Strategy::Smooth => "smooth",
        }
    }

    /// The windowing rule of an annotation-driven strategy; `None` for
    /// [`Strategy::All`].
    pub fn window(self) -> Option<WindowStrategy> {
        match self {
            Strategy::All => None,
            Strategy::Selected => Some(WindowStrategy::Selected),
            Strategy::Smooth => Some(WindowStrategy::Smooth),
        }
    }

    /// Build the frame selection for one video.
    ///
    /// [`Strategy::All`] returns [`FrameSelection::All`] without touching
    /// `annotation_path`; the other strategies load it and compute the
    /// selected indices.
    ///
    /// # Errors
    ///
    /// Any error of [`load_events`] for the windowed strategies.
    pub fn frame_selection(self, annotation_path: &Path, cutoff: u32) -> Result<FrameSelection, DatasetError> {
        match self.window() {
            None => Ok(FrameSelection::All),
            Some(window) => {
                let events = load_events(annotation_path)?;
                Ok(FrameSelection::Indices(select_indices(&events, window, cutoff)))
            }
        }
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    /// Case-insensitive: `all`, `selected`, or `smooth`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown strategy {value:?} (expected all, selected, or smooth)"))
    }
}

/// Frame indices chosen for extraction. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedIndexSet {
    indices: BTreeSet<i64>,
}

impl SelectedIndexSet {
    pub fn contains(&self, index: i64) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> {
        self.indices.iter().copied()
    }
}

impl FromIterator<i64> for SelectedIndexSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

/// Which frames of a video to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameSelection {
    /// Every decoded frame.
    All,
    /// Only frames whose index is in the set.
    Indices(SelectedIndexSet),
}

impl FrameSelection {
    /// Returns `true` if the frame at `index` should be written.
    pub fn contains(&self, index: i64) -> bool {
        match self {
            FrameSelection::All => true,
            FrameSelection::Indices(indices) => indices.contains(index),
        }
    }
}

/// Union of the windows around every annotated event.
///
/// Each event at frame `f` contributes every integer in
/// `[f - cutoff * m, f + cutoff * m]`, where `m` is the
/// [`WindowStrategy::multiplier`] of its label. Events are visited in
/// ascending frame order.
pub fn select_indices(events: &EventAnnotations, window: WindowStrategy, cutoff: u32) -> SelectedIndexSet {
    let cutoff = i64::from(cutoff);

    events
        .iter()
        .flat_map(|(frame, label)| {
            let half_width = cutoff * window.multiplier(label);
            let (first, last) = (frame.saturating_sub(half_width), frame.saturating_add(half_width));
            log::trace!("Event {label:?} at frame {frame}: selecting {first}..={last}");
            first..=last
        })
        .collect()
}
