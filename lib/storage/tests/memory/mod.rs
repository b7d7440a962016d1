use crate::{collect_features, collect_rows};
use geo::{point, Geometry};
use rdf_geopackage_common::{Feature, Row, SourceError, SourceStore, SpatialReferenceSystem};
use rdf_geopackage_model::{BoundingBox, SourceValue};
use rdf_geopackage_storage::memory::{MemSourceStore, MemTable};

fn store() -> MemSourceStore {
    MemSourceStore::new()
        .with_table(MemTable::attributes(
            "numbers",
            [1_i64, 2, 3].map(|n| Row::from_iter([("n", n)])),
        ))
        .with_table(MemTable::features(
            "points",
            SpatialReferenceSystem::wgs84(),
            [
                Feature::new(
                    Row::from_iter([("name", "a")]),
                    Geometry::Point(point!(x: 1.0, y: 1.0)),
                ),
                Feature::new(
                    Row::from_iter([("name", "b")]),
                    Geometry::Point(point!(x: 50.0, y: 40.0)),
                ),
            ],
        ))
}

#[test]
fn lists_tables_in_insertion_order() {
    let store = store();
    assert_eq!(store.attribute_tables().unwrap()[0].name, "numbers");
    assert_eq!(store.feature_tables().unwrap()[0].name, "points");
}

#[test]
fn computes_missing_extent() {
    let store = store();
    let table = &store.feature_tables().unwrap()[0];
    assert_eq!(
        store.table_extent(table).unwrap(),
        Some(BoundingBox::new(1.0, 1.0, 50.0, 40.0))
    );
}

#[test]
fn filters_features() {
    let store = store();
    let table = &store.feature_tables().unwrap()[0];
    let features = collect_features(&store, table, Some(&BoundingBox::new(0.0, 0.0, 2.0, 2.0)));
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].row.get("name"), Some(&SourceValue::from("a")));
}

#[test]
fn failing_tables_fail_after_some_rows() {
    let store = MemSourceStore::new().with_table(
        MemTable::attributes("flaky", [1_i64, 2].map(|n| Row::from_iter([("n", n)])))
            .failing_after(1, "disk on fire"),
    );
    let table = &store.attribute_tables().unwrap()[0];
    let results = store.open_row_cursor(table).unwrap().collect::<Vec<_>>();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert_eq!(
        results[1].as_ref().unwrap_err().to_string(),
        "disk on fire"
    );
}

#[test]
fn close_is_idempotent() {
    let mut store = store().failing_on_close("boom");
    let table = store.attribute_tables().unwrap().remove(0);
    assert_eq!(collect_rows(&store, &table).len(), 3);

    assert!(store.close().is_err());
    assert!(store.close().is_ok());
    assert!(store.is_closed());
    assert!(matches!(
        store.open_row_cursor(&table),
        Err(SourceError::Closed)
    ));
}
