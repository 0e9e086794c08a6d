//! Persistence round-trip fidelity and scaling-statistics isolation.

use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array2;
use stockpile::application::dataset::WindowedDataset;
use stockpile::application::generator::ExportedFrame;
use stockpile::infrastructure::persistence;

fn minute(day: u32, offset: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 4, day)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + chrono::Duration::minutes(offset as i64)
}

/// Synthetic exported frame: one day per entry of `day_values`, each row
/// carrying (value, value * 10, small target).
fn frame_from(day_values: &[Vec<f64>]) -> ExportedFrame {
    let total: usize = day_values.iter().map(Vec::len).sum();
    let mut index = Vec::with_capacity(total);
    let mut values = Array2::zeros((total, 3));
    let mut row = 0;
    for (day_ix, day) in day_values.iter().enumerate() {
        for (offset, &v) in day.iter().enumerate() {
            index.push(minute(19 + day_ix as u32, offset));
            values[[row, 0]] = v;
            values[[row, 1]] = v * 10.0;
            values[[row, 2]] = 0.001;
            row += 1;
        }
    }
    ExportedFrame {
        index,
        columns: vec!["a".to_string(), "b".to_string(), "target".to_string()],
        values,
    }
}

fn ramp(start: f64, len: usize) -> Vec<f64> {
    (0..len).map(|i| start + i as f64).collect()
}

#[test]
fn save_then_load_restores_every_property() {
    let frame = frame_from(&[ramp(0.0, 30), ramp(100.0, 30)]);
    let dataset = WindowedDataset::from_frame(&frame, 5, 0.8, 0.03).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let saved = persistence::save_dataset(&dataset, dir.path(), "TST").unwrap();
    let restored = persistence::load_dataset(&saved).unwrap();

    assert_eq!(restored.arr(), dataset.arr());
    assert_eq!(restored.f_min(), dataset.f_min());
    assert_eq!(restored.f_max(), dataset.f_max());
    assert_eq!(restored.column_names(), dataset.column_names());
    assert_eq!(restored.train_fraction(), dataset.train_fraction());
    assert_eq!(restored.timestamp(), dataset.timestamp());
    // Derived views agree too.
    assert_eq!(restored.split_ix_train(), dataset.split_ix_train());
    assert_eq!(restored.train_x(), dataset.train_x());
    assert_eq!(restored.test_y(), dataset.test_y());
}

#[test]
fn saved_artifact_is_metadata_plus_single_container() {
    let frame = frame_from(&[ramp(0.0, 30)]);
    let dataset = WindowedDataset::from_frame(&frame, 5, 0.8, 0.03).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let saved = persistence::save_dataset(&dataset, dir.path(), "TST").unwrap();

    assert!(saved.join(persistence::META_FILENAME).is_file());
    assert!(saved.join(persistence::DATA_FILENAME).is_file());
    // All three arrays live in the one container; nothing else is written.
    let entries: Vec<_> = std::fs::read_dir(&saved)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 2);
}

#[test]
fn reloaded_dataset_transforms_identically() {
    let frame = frame_from(&[ramp(0.0, 40)]);
    let dataset = WindowedDataset::from_frame(&frame, 5, 0.7, 0.03).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let saved = persistence::save_dataset(&dataset, dir.path(), "TST").unwrap();
    let restored = persistence::load_dataset(&saved).unwrap();

    let x = dataset.val_x().to_owned();
    let a = dataset.transform(&x.view()).unwrap();
    let b = restored.transform(&x.view()).unwrap();
    assert_eq!(a, b);

    let back = restored.reverse_transform(&a.view()).unwrap();
    for (orig, round) in x.iter().zip(back.iter()) {
        assert!((orig - round).abs() < 1e-9);
    }
}

#[test]
fn stats_ignore_validation_and_test_content() {
    // Two frames identical in the training region, wildly different
    // afterwards, must freeze identical scaling statistics.
    let base = frame_from(&[ramp(0.0, 30), ramp(30.0, 30)]);
    let shifted = frame_from(&[ramp(0.0, 30), ramp(30000.0, 30)]);

    let a = WindowedDataset::from_frame(&base, 5, 0.4, f64::INFINITY).unwrap();
    let b = WindowedDataset::from_frame(&shifted, 5, 0.4, f64::INFINITY).unwrap();

    // train_fraction 0.4 of 52 windows -> 20 training windows, all drawn
    // from the first day, which both frames share.
    assert!(a.split_ix_train() <= 26);
    assert_eq!(a.f_min(), b.f_min());
    assert_eq!(a.f_max(), b.f_max());
}

#[test]
fn loading_a_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(persistence::load_dataset(&dir.path().join("nope")).is_err());
}
