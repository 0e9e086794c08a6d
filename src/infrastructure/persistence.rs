//! Dataset persistence.
//!
//! One directory per save, named `{timestamp}-{name}`, containing a
//! human-readable metadata file and a single `.npz` container holding
//! the three named arrays: the full windowed tensor and the per-feature
//! train-min/max vectors. Reloading the directory reconstructs a dataset
//! observably identical to the one saved; nothing is recomputed.
//!
//! There is no partial-write recovery: a directory left behind by a
//! failed save must be treated as corrupt and regenerated.

use crate::application::dataset::WindowedDataset;
use anyhow::{Context, Result};
use ndarray::{Array1, Array3};
use ndarray_npy::{NpzReader, NpzWriter};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

pub const META_FILENAME: &str = "meta.json";
pub const DATA_FILENAME: &str = "data.npz";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetMetadata {
    name: String,
    data_shape: Vec<usize>,
    train_fraction: f64,
    column_names: Vec<String>,
    timestamp: i64,
    data_file: String,
    arr_name: String,
    f_min_name: String,
    f_max_name: String,
}

/// Saves the dataset under `{base_dir}/{timestamp}-{name}/` and returns
/// the created directory.
pub fn save_dataset(dataset: &WindowedDataset, base_dir: &Path, name: &str) -> Result<PathBuf> {
    let dir = base_dir.join(format!("{}-{}", dataset.timestamp(), name));
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create dataset directory {:?}", dir))?;

    let metadata = DatasetMetadata {
        name: name.to_string(),
        data_shape: dataset.arr().shape().to_vec(),
        train_fraction: dataset.train_fraction(),
        column_names: dataset.column_names().to_vec(),
        timestamp: dataset.timestamp(),
        data_file: DATA_FILENAME.to_string(),
        arr_name: "arr".to_string(),
        f_min_name: "f_min".to_string(),
        f_max_name: "f_max".to_string(),
    };

    let data_path = dir.join(&metadata.data_file);
    let file = File::create(&data_path)
        .with_context(|| format!("Failed to create data container {:?}", data_path))?;
    let mut npz = NpzWriter::new(file);
    npz.add_array(metadata.arr_name.as_str(), dataset.arr())
        .context("Failed to write windowed tensor")?;
    npz.add_array(metadata.f_min_name.as_str(), dataset.f_min())
        .context("Failed to write f_min vector")?;
    npz.add_array(metadata.f_max_name.as_str(), dataset.f_max())
        .context("Failed to write f_max vector")?;
    npz.finish().context("Failed to finish data container")?;

    let content =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize dataset metadata")?;
    // Atomic write: write to temp file then rename
    let meta_path = dir.join(META_FILENAME);
    let temp_path = meta_path.with_extension("tmp");
    fs::write(&temp_path, content).context("Failed to write temp metadata file")?;
    fs::rename(&temp_path, &meta_path).context("Failed to rename metadata file")?;

    info!("Saved dataset to {:?}", dir);
    Ok(dir)
}

/// Restores a dataset from a directory written by [`save_dataset`].
pub fn load_dataset(dir: &Path) -> Result<WindowedDataset> {
    let meta_path = dir.join(META_FILENAME);
    let content = fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read metadata file {:?}", meta_path))?;
    let metadata: DatasetMetadata =
        serde_json::from_str(&content).context("Failed to parse dataset metadata")?;

    let data_path = dir.join(&metadata.data_file);
    let file = File::open(&data_path)
        .with_context(|| format!("Failed to open data container {:?}", data_path))?;
    let mut npz = NpzReader::new(file).context("Failed to read data container")?;
    let arr: Array3<f64> = npz
        .by_name(&metadata.arr_name)
        .context("Failed to read windowed tensor")?;
    let f_min: Array1<f64> = npz
        .by_name(&metadata.f_min_name)
        .context("Failed to read f_min vector")?;
    let f_max: Array1<f64> = npz
        .by_name(&metadata.f_max_name)
        .context("Failed to read f_max vector")?;

    info!("Loaded dataset from {:?}", dir);
    Ok(WindowedDataset::from_parts(
        arr,
        metadata.column_names,
        metadata.train_fraction,
        f_min,
        f_max,
        metadata.timestamp,
    ))
}
