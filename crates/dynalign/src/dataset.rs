//! Dataset inputs: the metadata table and the alignment annotation store.
//!
//! Both are loaded once by the caller and passed by reference into the
//! per-performance work.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::warp::TimeWarper;

/// One row of the metadata table. Columns other than these are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    /// Performance MIDI path relative to the dataset root.
    pub midi_performance: String,
    /// Score MIDI path relative to the dataset root.
    pub midi_score: String,
}

/// Load the metadata CSV.
pub fn load_metadata(path: &Path) -> crate::Result<Vec<MetadataRow>> {
    let to_err = |source: csv::Error| crate::Error::Metadata {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(to_err)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<MetadataRow>, csv::Error>>()
        .map_err(to_err)?;
    info!(path = %path.display(), rows = rows.len(), "loaded metadata");
    Ok(rows)
}

/// Alignment annotations for one performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub score_and_performance_aligned: bool,
    #[serde(default)]
    pub performance_beats: Vec<f64>,
    #[serde(default)]
    pub midi_score_beats: Vec<f64>,
}

impl Annotation {
    /// Warper from performance time into score time.
    pub fn warper(&self) -> crate::Result<TimeWarper> {
        TimeWarper::new(self.performance_beats.clone(), self.midi_score_beats.clone())
    }
}

/// Annotations keyed by performance path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationStore {
    entries: HashMap<String, Annotation>,
}

impl AnnotationStore {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self::from_json(&contents).map_err(|source| crate::Error::Annotations {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), entries = store.len(), "loaded annotations");
        Ok(store)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, performance: &str) -> Option<&Annotation> {
        self.entries.get(performance)
    }

    pub fn insert(&mut self, performance: impl Into<String>, annotation: Annotation) {
        self.entries.insert(performance.into(), annotation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A dataset root with its metadata and annotations.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub root: PathBuf,
    pub metadata: Vec<MetadataRow>,
    pub annotations: AnnotationStore,
}

impl Dataset {
    /// Load `metadata_file` and `annotations_file`, both relative to `root`
    /// unless absolute.
    pub fn load(root: &Path, metadata_file: &Path, annotations_file: &Path) -> crate::Result<Self> {
        let metadata = load_metadata(&root.join(metadata_file))?;
        let annotations = AnnotationStore::load(&root.join(annotations_file))?;
        Ok(Self {
            root: root.to_path_buf(),
            metadata,
            annotations,
        })
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Metadata row for a performance path.
    pub fn row(&self, performance: &str) -> Option<&MetadataRow> {
        self.metadata.iter().find(|r| r.midi_performance == performance)
    }

    pub fn read(&self, relative: &str) -> crate::Result<Vec<u8>> {
        let path = self.resolve(relative);
        std::fs::read(&path).map_err(|source| crate::Error::Io { path, source })
    }
}

/// Output location for a performance: `out_dir` + its relative path with
/// `extension` in place of the MIDI one.
pub fn output_path(out_dir: &Path, performance: &str, extension: &str) -> PathBuf {
    out_dir.join(performance).with_extension(extension)
}
