//! Image/label pairing for Decathlon-style scan directories

use crate::error::DataError;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

const IMAGES_DIR: &str = "imagesTr";
const LABELS_DIR: &str = "labelsTr";

/// Map a scan path under `imagesTr` to its label volume under `labelsTr`.
///
/// Only the first `imagesTr` component is replaced, the rest of the path
/// (including the file name) is kept as-is.
pub fn image_to_label_path(path: &Path) -> Result<PathBuf, DataError> {
    let mut replaced = false;
    let rewritten: PathBuf = path
        .components()
        .map(|component| match component {
            Component::Normal(name) if !replaced && name == OsStr::new(IMAGES_DIR) => {
                replaced = true;
                Component::Normal(OsStr::new(LABELS_DIR))
            }
            other => other,
        })
        .collect();

    if replaced {
        Ok(rewritten)
    } else {
        Err(DataError::MissingImagesDir(path.to_path_buf()))
    }
}

/// A scan image and its matching label volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPair {
    pub image: PathBuf,
    pub label: PathBuf,
}

/// Ordered collection of scan/label pairs.
#[derive(Debug, Clone, Default)]
pub struct ScanDataset {
    pairs: Vec<ScanPair>,
}

impl ScanDataset {
    /// Pair the sorted contents of `image_dir` with the sorted contents of `label_dir`.
    ///
    /// Pairing is positional: the i-th image (by file name) goes with the i-th label.
    #[tracing::instrument(skip_all, fields(images = %image_dir.display(), labels = %label_dir.display()))]
    pub fn open(image_dir: &Path, label_dir: &Path) -> Result<Self, DataError> {
        let images = sorted_files(image_dir)?;
        let labels = sorted_files(label_dir)?;

        if images.len() != labels.len() {
            warn!(
                "Image/label count mismatch: {} vs {}",
                images.len(),
                labels.len()
            );
            return Err(DataError::UnpairedScans {
                images: images.len(),
                labels: labels.len(),
            });
        }

        let pairs: Vec<ScanPair> = images
            .into_iter()
            .zip(labels)
            .map(|(image, label)| ScanPair { image, label })
            .collect();

        info!("Paired {} scans", pairs.len());
        Ok(Self { pairs })
    }

    /// Pair every file in `image_dir` with the path `image_to_label_path` derives for it.
    ///
    /// The label files are not required to exist yet.
    pub fn from_images(image_dir: &Path) -> Result<Self, DataError> {
        let pairs = sorted_files(image_dir)?
            .into_iter()
            .map(|image| {
                let label = image_to_label_path(&image)?;
                Ok(ScanPair { image, label })
            })
            .collect::<Result<Vec<_>, DataError>>()?;

        debug!("Derived {} label paths from {}", pairs.len(), image_dir.display());
        Ok(Self { pairs })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScanPair> {
        self.pairs.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanPair> {
        self.pairs.iter()
    }
}

/// Regular files in `dir`, hidden files skipped, sorted by file name.
fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, DataError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let hidden = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'));
        if !hidden {
            files.push(entry.path());
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("livseg-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join(IMAGES_DIR)).unwrap();
        fs::create_dir_all(dir.join(LABELS_DIR)).unwrap();
        dir
    }

    fn touch(path: PathBuf) {
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_image_to_label_path() {
        let path = Path::new("/content/Task03_Liver/imagesTr/liver_7.nii.gz");
        let label = image_to_label_path(path).unwrap();
        assert_eq!(label, Path::new("/content/Task03_Liver/labelsTr/liver_7.nii.gz"));
    }

    #[test]
    fn test_image_to_label_path_replaces_first_only() {
        let path = Path::new("data/imagesTr/imagesTr/liver_0.nii");
        let label = image_to_label_path(path).unwrap();
        assert_eq!(label, Path::new("data/labelsTr/imagesTr/liver_0.nii"));
    }

    #[test]
    fn test_image_to_label_path_missing_component() {
        let result = image_to_label_path(Path::new("data/scans/liver_0.nii"));
        assert!(matches!(result, Err(DataError::MissingImagesDir(_))));
    }

    #[test]
    fn test_open_pairs_sorted_files() {
        let dir = scratch_dir("open");
        for name in ["liver_2.nii", "liver_0.nii", "liver_1.nii"] {
            touch(dir.join(IMAGES_DIR).join(name));
            touch(dir.join(LABELS_DIR).join(name));
        }
        touch(dir.join(IMAGES_DIR).join(".DS_Store"));

        let dataset = ScanDataset::open(&dir.join(IMAGES_DIR), &dir.join(LABELS_DIR)).unwrap();
        assert_eq!(dataset.len(), 3);
        for (i, pair) in dataset.iter().enumerate() {
            let expected = format!("liver_{}.nii", i);
            assert_eq!(pair.image.file_name().unwrap(), expected.as_str());
            assert_eq!(pair.label.file_name().unwrap(), expected.as_str());
        }
        assert!(dataset.get(3).is_none());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_open_unpaired_counts() {
        let dir = scratch_dir("unpaired");
        touch(dir.join(IMAGES_DIR).join("liver_0.nii"));
        touch(dir.join(IMAGES_DIR).join("liver_1.nii"));
        touch(dir.join(LABELS_DIR).join("liver_0.nii"));

        let result = ScanDataset::open(&dir.join(IMAGES_DIR), &dir.join(LABELS_DIR));
        assert!(matches!(
            result,
            Err(DataError::UnpairedScans { images: 2, labels: 1 })
        ));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_from_images_derives_labels() {
        let dir = scratch_dir("derive");
        touch(dir.join(IMAGES_DIR).join("liver_5.nii"));

        let dataset = ScanDataset::from_images(&dir.join(IMAGES_DIR)).unwrap();
        assert_eq!(dataset.len(), 1);
        let pair = dataset.get(0).unwrap();
        assert_eq!(pair.label, dir.join(LABELS_DIR).join("liver_5.nii"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_open_missing_directory() {
        let missing = std::env::temp_dir().join("livseg-does-not-exist-imagesTr");
        let result = ScanDataset::open(&missing, &missing);
        assert!(matches!(result, Err(DataError::Io(_))));
    }
}
