//! Export merging and export-then-import round-trip tests.

use crate::format::{export_json, export_records, parse_points};
use crate::model::{DatasetRecord, Point};
use crate::store::PointStore;

fn dataset() -> Vec<DatasetRecord> {
    let mut first = DatasetRecord::new("A01");
    first.signals.insert("ch1", 0.25);
    first.signals.insert("ch2", 0.75);
    let second = DatasetRecord::new("A02");
    vec![first, second]
}

#[test]
fn test_export_merges_dataset_record_by_row() {
    let points = vec![Point::new(100.0, 50.0, 24.0, 1)];
    let records = export_records(&points, &dataset());

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].row, 1);
    assert_eq!(records[0].plate.as_deref(), Some("A01"));

    let signals = records[0].signals.as_ref().unwrap();
    assert_eq!(signals.get("ch1"), Some(0.25));
    assert_eq!(signals.get("ch2"), Some(0.75));
}

#[test]
fn test_export_without_record_has_no_extra_fields() {
    // Row 9 has no dataset record.
    let points = vec![Point::new(1.0, 2.0, 24.0, 9)];
    let json = export_json(&points, &dataset()).unwrap();

    assert!(json.contains("\"row\": 9"));
    assert!(!json.contains("plate"));
    assert!(!json.contains("signals"));
}

#[test]
fn test_export_then_import_reproduces_point_set() {
    let mut store = PointStore::in_memory();
    store.add_point(Point::new(100.0, 50.0, 24.0, 1)).unwrap();
    store.add_point(Point::new(30.5, 71.25, 18.0, 5)).unwrap();
    store.add_point(Point::new(0.0, 0.0, 24.0, 215)).unwrap();

    let original: Vec<(u32, f64, f64, f64)> = store
        .points()
        .iter()
        .map(|p| (p.row_num, p.x, p.y, p.size))
        .collect();
    let original_ids: Vec<_> = store.points().iter().map(|p| p.id).collect();

    let json = export_json(store.points(), &dataset()).unwrap();
    let imported = parse_points(&json).unwrap();
    let kept = store.import_points(imported);

    assert_eq!(kept, 3);
    let reimported: Vec<(u32, f64, f64, f64)> = store
        .points()
        .iter()
        .map(|p| (p.row_num, p.x, p.y, p.size))
        .collect();
    assert_eq!(reimported, original);

    // Imported points never retain previous ids.
    assert!(store.points().iter().all(|p| !original_ids.contains(&p.id)));
}
