//! Dataset directory layout and download planning.
//!
//! A dataset root holds two [`Split`]s, `train` and `test`, each with
//! `annotations`, `images` and `videos` subdirectories:
//!
//! ```text
//! <root>/
//!   train/{annotations,images,videos}/
//!   test/{annotations,images,videos}/
//! ```
//!
//! [`plan_downloads`] maps every remote resource of the dataset to its place
//! in that tree, and [`plan_extraction`] lists the videos to extract while
//! reserving one image output directory per video.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use crate::{
    annotation::EVENTS_FILE_NAME, archive::ARCHIVE_EXTENSION, config::DatasetConfig,
    error::DatasetError,
};

/// Subdirectory holding unpacked annotation archives.
pub const ANNOTATIONS_DIRECTORY: &str = "annotations";
/// Subdirectory holding extracted frames, one directory per video.
pub const IMAGES_DIRECTORY: &str = "images";
/// Subdirectory holding downloaded videos.
pub const VIDEOS_DIRECTORY: &str = "videos";

/// A top-level partition of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Both splits, training first.
    pub const ALL: [Split; 2] = [Split::Train, Split::Test];

    /// Name of the split's directory under the dataset root.
    pub fn directory_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }

    /// File name prefix of the split's remote resources.
    pub fn resource_prefix(self) -> &'static str {
        match self {
            Split::Train => "game",
            Split::Test => "test",
        }
    }
}

/// Path arithmetic for one dataset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn split_directory(&self, split: Split) -> PathBuf {
        self.root.join(split.directory_name())
    }

    pub fn annotations_directory(&self, split: Split) -> PathBuf {
        self.split_directory(split).join(ANNOTATIONS_DIRECTORY)
    }

    pub fn images_directory(&self, split: Split) -> PathBuf {
        self.split_directory(split).join(IMAGES_DIRECTORY)
    }

    pub fn videos_directory(&self, split: Split) -> PathBuf {
        self.split_directory(split).join(VIDEOS_DIRECTORY)
    }

    /// All six split subdirectories.
    pub fn directories(&self) -> Vec<PathBuf> {
        Split::ALL
            .iter()
            .flat_map(|&split| {
                [
                    self.annotations_directory(split),
                    self.images_directory(split),
                    self.videos_directory(split),
                ]
            })
            .collect()
    }

    /// Create the root and every split subdirectory.
    ///
    /// Existing directories are left untouched, so calling this repeatedly
    /// is safe.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Io`] if a directory cannot be created.
    pub fn ensure(&self) -> Result<(), DatasetError> {
        fs::create_dir_all(&self.root)?;
        for directory in self.directories() {
            fs::create_dir_all(&directory)?;
        }
        log::debug!("Dataset layout ready at {}", self.root.display());
        Ok(())
    }

    /// Plan every remote-to-local transfer for this root.
    pub fn plan_downloads(&self, base_url: &str, config: &DatasetConfig) -> ResourceMap {
        let base_url = base_url.trim_end_matches('/');
        let mut resources = ResourceMap::default();

        for split in Split::ALL {
            let range = match split {
                Split::Train => config.train_range(),
                Split::Test => config.test_range(),
            };
            for index in range {
                let stem = format!("{}_{index}", split.resource_prefix());

                let archive_name = format!("{stem}.{ARCHIVE_EXTENSION}");
                resources.insert(
                    format!("{base_url}/{archive_name}"),
                    self.annotations_directory(split).join(archive_name),
                );

                let video_name = format!("{stem}.{}", config.video_extension());
                resources.insert(
                    format!("{base_url}/{video_name}"),
                    self.videos_directory(split).join(video_name),
                );
            }
        }

        log::debug!(
            "Planned {} downloads from {base_url} into {}",
            resources.len(),
            self.root.display()
        );
        resources
    }

    /// List the videos of both splits and create their image output
    /// directories.
    ///
    /// Only regular files directly inside each `videos` directory are
    /// returned, training split first. Within a split the order is whatever
    /// the filesystem yields.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::DirectoryNotFound`] if a `videos` directory is
    ///   missing.
    /// - [`DatasetError::DirectoryAlreadyExists`] if a video already has an
    ///   image output directory. Every video is checked before any directory
    ///   is created, so a refused plan leaves the tree unchanged.
    pub fn plan_extraction(&self) -> Result<Vec<PathBuf>, DatasetError> {
        let mut videos = Vec::new();

        for split in Split::ALL {
            let directory = self.videos_directory(split);
            let entries = fs::read_dir(&directory).map_err(|error| match error.kind() {
                ErrorKind::NotFound => DatasetError::DirectoryNotFound {
                    path: directory.clone(),
                },
                _ => DatasetError::Io(error),
            })?;

            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    videos.push(entry.path());
                }
            }
        }

        let output_directories: Vec<PathBuf> = videos
            .iter()
            .map(|video| image_output_directory(video))
            .collect();
        if let Some(existing) = output_directories.iter().find(|directory| directory.exists()) {
            return Err(DatasetError::DirectoryAlreadyExists {
                path: existing.clone(),
            });
        }

        for output_directory in &output_directories {
            fs::create_dir(output_directory).map_err(|error| match error.kind() {
                ErrorKind::AlreadyExists => DatasetError::DirectoryAlreadyExists {
                    path: output_directory.clone(),
                },
                _ => DatasetError::Io(error),
            })?;
        }

        log::info!("Planned extraction of {} videos", videos.len());
        Ok(videos)
    }
}

/// Planned remote-to-local transfers for one dataset root.
///
/// URLs and destinations are both unique. Entries iterate in URL order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMap {
    entries: BTreeMap<String, PathBuf>,
}

impl ResourceMap {
    fn insert(&mut self, url: String, destination: PathBuf) {
        self.entries.insert(url, destination);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Local destination planned for `url`.
    pub fn get(&self, url: &str) -> Option<&Path> {
        self.entries.get(url).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries
            .iter()
            .map(|(url, path)| (url.as_str(), path.as_path()))
    }

    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.entries.values().map(PathBuf::as_path)
    }

    /// Destinations that are archives and will need expanding.
    pub fn archive_paths(&self) -> Vec<PathBuf> {
        self.entries
            .values()
            .filter(|path| crate::archive::has_archive_extension(path))
            .cloned()
            .collect()
    }

    /// Owned `(url, destination)` pairs, ready to hand to a
    /// [`WorkerPool`](crate::WorkerPool).
    pub fn into_entries(self) -> Vec<(String, PathBuf)> {
        self.entries.into_iter().collect()
    }
}

/// Create the dataset root and its six split subdirectories.
///
/// See [`DatasetLayout::ensure`].
pub fn ensure_layout<P: AsRef<Path>>(root: P) -> Result<(), DatasetError> {
    DatasetLayout::new(root).ensure()
}

/// Plan the canonical dataset's downloads. Pure; performs no I/O.
///
/// # Example
///
/// ```
/// let resources = frameset::plan_downloads("data", "https://example.com/dataset");
/// assert_eq!(resources.len(), 24);
/// assert_eq!(
///     resources.get("https://example.com/dataset/game_1.zip"),
///     Some(std::path::Path::new("data/train/annotations/game_1.zip")),
/// );
/// ```
pub fn plan_downloads<P: AsRef<Path>>(root: P, base_url: &str) -> ResourceMap {
    plan_downloads_with_config(root, base_url, &DatasetConfig::default())
}

/// Plan downloads for a custom resource range configuration.
pub fn plan_downloads_with_config<P: AsRef<Path>>(
    root: P,
    base_url: &str,
    config: &DatasetConfig,
) -> ResourceMap {
    DatasetLayout::new(root).plan_downloads(base_url, config)
}

/// List videos and reserve their image output directories.
///
/// See [`DatasetLayout::plan_extraction`].
pub fn plan_extraction<P: AsRef<Path>>(root: P) -> Result<Vec<PathBuf>, DatasetError> {
    DatasetLayout::new(root).plan_extraction()
}

/// `<split>/images/<video stem>` for a video at `<split>/videos/<file>`.
pub fn image_output_directory(video_path: &Path) -> PathBuf {
    split_directory_of(video_path)
        .join(IMAGES_DIRECTORY)
        .join(video_stem(video_path))
}

/// `<split>/annotations/<video stem>/events_markup.json` for a video at
/// `<split>/videos/<file>`.
pub fn annotation_path(video_path: &Path) -> PathBuf {
    split_directory_of(video_path)
        .join(ANNOTATIONS_DIRECTORY)
        .join(video_stem(video_path))
        .join(EVENTS_FILE_NAME)
}

fn split_directory_of(video_path: &Path) -> PathBuf {
    video_path
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn video_stem(video_path: &Path) -> &std::ffi::OsStr {
    video_path.file_stem().unwrap_or_default()
}
