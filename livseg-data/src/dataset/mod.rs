//! Scan dataset discovery and image/label pairing

mod pairing;

pub use pairing::{ScanDataset, ScanPair, image_to_label_path};
