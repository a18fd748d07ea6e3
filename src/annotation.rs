//! Event annotation loading.
//!
//! Each video `<split>/videos/<name>.mp4` has an annotation file at
//! `<split>/annotations/<name>/events_markup.json`: a JSON object whose
//! keys are frame indices written as decimal strings and whose values are
//! event labels.
//!
//! ```json
//! { "100": "empty_event", "245": "bounce", "1020": "net" }
//! ```

use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, ErrorKind},
    path::Path,
};

use crate::error::DatasetError;

/// File name of a video's event annotations.
pub const EVENTS_FILE_NAME: &str = "events_markup.json";

/// Label marking an annotated frame where nothing notable happens.
pub const EMPTY_EVENT: &str = "empty_event";

/// Event labels keyed by frame index.
///
/// Iteration is always in ascending numeric frame order, regardless of the
/// key order in the source file. Distinct keys naming the same frame
/// (`"7"` and `"07"`) are all kept: that frame then carries several labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventAnnotations {
    events: BTreeMap<i64, Vec<String>>,
}

impl EventAnnotations {
    /// Parse annotations from a JSON document.
    ///
    /// The returned error message describes why the document was rejected;
    /// callers attach the file path.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let raw: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|error| error.to_string())?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, String>) -> Result<Self, String> {
        let mut annotations = Self::default();
        for (key, label) in raw {
            let frame = key
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("frame index {key:?} is not an integer"))?;
            annotations.insert(frame, label);
        }
        Ok(annotations)
    }

    fn insert(&mut self, frame: i64, label: String) {
        let labels = self.events.entry(frame).or_default();
        if !labels.is_empty() {
            log::debug!("Frame {frame} is annotated more than once; keeping every label");
        }
        labels.push(label);
    }

    /// Number of `(frame, label)` events.
    pub fn len(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Labels annotated at `frame`; empty if there are none.
    pub fn labels(&self, frame: i64) -> &[String] {
        self.events.get(&frame).map(Vec::as_slice).unwrap_or_default()
    }

    /// `(frame, label)` pairs in ascending frame order. A frame with
    /// several labels appears once per label.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.events
            .iter()
            .flat_map(|(&frame, labels)| labels.iter().map(move |label| (frame, label.as_str())))
    }
}

impl<S: Into<String>> FromIterator<(i64, S)> for EventAnnotations {
    fn from_iter<I: IntoIterator<Item = (i64, S)>>(iter: I) -> Self {
        let mut annotations = Self::default();
        for (frame, label) in iter {
            annotations.insert(frame, label.into());
        }
        annotations
    }
}

/// Load a video's event annotations.
///
/// # Errors
///
/// - [`DatasetError::AnnotationNotFound`] if `path` does not exist.
/// - [`DatasetError::AnnotationParse`] if the file is not a JSON object of
///   string labels keyed by integer frame indices.
/// - [`DatasetError::Io`] if the file exists but cannot be read.
pub fn load_events(path: &Path) -> Result<EventAnnotations, DatasetError> {
    let file = File::open(path).map_err(|error| match error.kind() {
        ErrorKind::NotFound => DatasetError::AnnotationNotFound {
            path: path.to_path_buf(),
        },
        _ => DatasetError::Io(error),
    })?;

    let parse_error = |reason: String| DatasetError::AnnotationParse {
        path: path.to_path_buf(),
        reason,
    };

    let raw: BTreeMap<String, String> =
        serde_json::from_reader(BufReader::new(file)).map_err(|error| parse_error(error.to_string()))?;
    let events = EventAnnotations::from_raw(raw).map_err(parse_error)?;

    log::debug!("Loaded {} events from {}", events.len(), path.display());
    Ok(events)
}
