//! Model manifest: which weight files the front-end needs, grouped by network.

use std::path::{Component, Path};

use crate::error::ManifestError;

/// face-api.js weight files, in the order the front-end loads the networks.
const FACE_API_MODELS: &[(&str, &[&str])] = &[
    (
        "tiny_face_detector",
        &[
            "tiny_face_detector_model-weights_manifest.json",
            "tiny_face_detector_model-shard1",
        ],
    ),
    (
        "face_landmark_68",
        &[
            "face_landmark_68_model-weights_manifest.json",
            "face_landmark_68_model-shard1",
        ],
    ),
    (
        "face_recognition",
        &[
            "face_recognition_model-weights_manifest.json",
            "face_recognition_model-shard1",
            "face_recognition_model-shard2",
        ],
    ),
    (
        "face_expression",
        &[
            "face_expression_model-weights_manifest.json",
            "face_expression_model-shard1",
        ],
    ),
    (
        "age_gender",
        &[
            "age_gender_model-weights_manifest.json",
            "age_gender_model-shard1",
        ],
    ),
];

/// A named family of weight files (e.g. a detector or a classifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    pub name: String,
    pub files: Vec<String>,
}

/// Ordered mapping of model group to required file names.
///
/// Every file name is a single plain path component, so it resolves to
/// `<base_url>/<name>` remotely and to exactly one file in the flat local
/// model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelManifest {
    groups: Vec<ModelGroup>,
}

impl ModelManifest {
    pub fn new(groups: Vec<ModelGroup>) -> Result<Self, ManifestError> {
        if groups.is_empty() {
            return Err(ManifestError::Empty);
        }

        for group in &groups {
            if group.files.is_empty() {
                return Err(ManifestError::EmptyGroup(group.name.clone()));
            }
            if let Some(bad) = group.files.iter().find(|f| !is_flat_file_name(f)) {
                return Err(ManifestError::InvalidFileName {
                    group: group.name.clone(),
                    file: bad.clone(),
                });
            }
        }

        Ok(Self { groups })
    }

    /// The face-api.js networks used by the bundled front-end.
    pub fn face_api() -> Self {
        let groups = FACE_API_MODELS
            .iter()
            .map(|(name, files)| ModelGroup {
                name: name.to_string(),
                files: files.iter().map(|f| f.to_string()).collect(),
            })
            .collect();

        Self { groups }
    }

    /// `(group, file)` pairs in manifest order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups.iter().flat_map(|g| {
            g.files
                .iter()
                .map(move |f| (g.name.as_str(), f.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    /// File names with no regular file of that name in `dir`, in manifest order.
    pub async fn missing_files(&self, dir: &Path) -> Vec<&str> {
        let mut missing = Vec::new();
        for (_, file) in self.files() {
            if !is_regular_file(&dir.join(file)).await {
                missing.push(file);
            }
        }
        missing
    }
}

/// Only a regular file counts as present; directories and unreadable
/// entries are treated as missing.
pub async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

fn is_flat_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
