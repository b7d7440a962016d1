use crate::{collect_features, collect_rows};
use assert_fs::prelude::*;
use assert_fs::TempDir;
use geo::{line_string, point, polygon, Geometry};
use itertools::Itertools;
use rdf_geopackage_common::{FeatureGeometry, SourceError, SourceStore, TableKind};
use rdf_geopackage_model::{BoundingBox, SourceValue};
use rdf_geopackage_storage::geopackage::fixture::GeoPackageFixture;
use rdf_geopackage_storage::geopackage::GeoPackage;
use rusqlite::types::Value;
use std::path::PathBuf;

fn sample(dir: &TempDir, spatial_index: bool) -> PathBuf {
    let path = dir.child("sample.gpkg").to_path_buf();
    let mut fixture = GeoPackageFixture::create(&path).unwrap();
    fixture
        .add_attribute_table(
            "people",
            &[
                ("name", "TEXT"),
                ("active", "BOOLEAN"),
                ("born", "DATE"),
                ("seen", "DATETIME"),
                ("height", "REAL"),
                ("photo", "BLOB"),
            ],
        )
        .unwrap();
    fixture
        .insert_row(
            "people",
            &[
                ("name", SourceValue::from("Alice")),
                ("active", SourceValue::Boolean(true)),
                ("born", SourceValue::Date("1990-01-02".to_owned())),
                ("seen", SourceValue::DateTime("2020-05-06T07:08:09Z".to_owned())),
                ("height", SourceValue::Real(1.72)),
                ("photo", SourceValue::Blob(vec![1, 2, 3])),
            ],
        )
        .unwrap();
    fixture
        .insert_row("people", &[("name", SourceValue::from("Bob"))])
        .unwrap();

    fixture
        .add_feature_table("places", &[("label", "TEXT")], 4326, spatial_index)
        .unwrap();
    fixture
        .insert_feature(
            "places",
            &[("label", SourceValue::from("west"))],
            Some(&Geometry::Point(point!(x: -10.0, y: 5.0))),
        )
        .unwrap();
    fixture
        .insert_feature(
            "places",
            &[("label", SourceValue::from("east"))],
            Some(&Geometry::LineString(line_string![(x: 10.0, y: 5.0), (x: 12.0, y: 7.0)])),
        )
        .unwrap();
    fixture
        .insert_feature("places", &[("label", SourceValue::from("nowhere"))], None)
        .unwrap();
    fixture.finish().unwrap();
    path
}

#[test]
fn lists_tables_by_kind() {
    let dir = TempDir::new().unwrap();
    let package = GeoPackage::open(sample(&dir, false)).unwrap();

    let attributes = package.attribute_tables().unwrap();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].name, "people");
    assert_eq!(attributes[0].kind, TableKind::Attributes);
    assert_eq!(attributes[0].id_columns, vec!["fid".to_owned()]);

    let features = package.feature_tables().unwrap();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].name, "places");
}

#[test]
fn reads_typed_columns() {
    let dir = TempDir::new().unwrap();
    let package = GeoPackage::open(sample(&dir, false)).unwrap();
    let table = &package.attribute_tables().unwrap()[0];

    let rows = collect_rows(&package, table);
    assert_eq!(rows.len(), 2);
    let alice = &rows[0];
    assert_eq!(alice.get("fid"), Some(&SourceValue::Integer(1)));
    assert_eq!(alice.get("name"), Some(&SourceValue::from("Alice")));
    assert_eq!(alice.get("active"), Some(&SourceValue::Boolean(true)));
    assert_eq!(
        alice.get("born"),
        Some(&SourceValue::Date("1990-01-02".to_owned()))
    );
    assert_eq!(
        alice.get("seen"),
        Some(&SourceValue::DateTime("2020-05-06T07:08:09Z".to_owned()))
    );
    assert_eq!(alice.get("height"), Some(&SourceValue::Real(1.72)));
    assert_eq!(alice.get("photo"), Some(&SourceValue::Blob(vec![1, 2, 3])));

    let bob = &rows[1];
    assert_eq!(bob.get("active"), Some(&SourceValue::Null));
}

#[test]
fn reads_features_and_srs() {
    let dir = TempDir::new().unwrap();
    let package = GeoPackage::open(sample(&dir, false)).unwrap();
    let table = &package.feature_tables().unwrap()[0];

    let srs = package.table_srs(table).unwrap();
    assert_eq!(srs.code(), "EPSG:4326");
    assert!(srs.is_wgs84());

    let features = collect_features(&package, table, None);
    assert_eq!(features.len(), 3);
    assert!(features[0].row.get("geom").is_none());
    assert_eq!(
        features[0].geometry,
        FeatureGeometry::Valid(Geometry::Point(point!(x: -10.0, y: 5.0)))
    );
    assert_eq!(features[2].geometry, FeatureGeometry::Missing);
}

#[test]
fn reads_extent_from_contents() {
    let dir = TempDir::new().unwrap();
    let package = GeoPackage::open(sample(&dir, false)).unwrap();
    let table = &package.feature_tables().unwrap()[0];

    assert_eq!(
        package.table_extent(table).unwrap(),
        Some(BoundingBox::new(-10.0, 5.0, 12.0, 7.0))
    );
}

#[test]
fn filters_by_bounding_box() {
    for spatial_index in [false, true] {
        let dir = TempDir::new().unwrap();
        let package = GeoPackage::open(sample(&dir, spatial_index)).unwrap();
        let table = &package.feature_tables().unwrap()[0];

        let features = collect_features(
            &package,
            table,
            Some(&BoundingBox::new(0.0, 0.0, 11.0, 6.0)),
        );
        let labels = features
            .iter()
            .map(|feature| feature.row.get("label").cloned())
            .collect_vec();
        assert_eq!(
            labels,
            vec![Some(SourceValue::from("east"))],
            "spatial index: {spatial_index}"
        );
    }
}

#[test]
fn pages_through_large_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("large.gpkg").to_path_buf();
    let mut fixture = GeoPackageFixture::create(&path).unwrap();
    fixture
        .add_feature_table("grid", &[("n", "INTEGER")], 4326, true)
        .unwrap();
    for n in 0..1300_i64 {
        #[expect(clippy::cast_precision_loss, reason = "small test values")]
        let point = Geometry::Point(point!(x: (n % 100) as f64, y: (n / 100) as f64));
        fixture
            .insert_feature("grid", &[("n", SourceValue::Integer(n))], Some(&point))
            .unwrap();
    }
    fixture.finish().unwrap();

    let package = GeoPackage::open(&path).unwrap();
    let table = &package.feature_tables().unwrap()[0];
    let values = collect_features(&package, table, None)
        .into_iter()
        .map(|feature| feature.row.get("n").and_then(SourceValue::as_integer))
        .collect_vec();
    assert_eq!(values, (0..1300).map(Some).collect_vec());

    let filtered = collect_features(
        &package,
        table,
        Some(&BoundingBox::new(-0.5, -0.5, 0.5, 12.5)),
    );
    assert_eq!(filtered.len(), 13);
}

#[test]
fn reads_the_smallest_possible_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("keys.gpkg").to_path_buf();
    let mut fixture = GeoPackageFixture::create(&path).unwrap();
    fixture
        .add_attribute_table("log", &[("entry", "TEXT")])
        .unwrap();
    fixture
        .add_feature_table("sites", &[("entry", "TEXT")], 4326, true)
        .unwrap();
    for (table, geometry) in [
        ("log", None),
        ("sites", Some(Geometry::Point(point!(x: 1.0, y: 1.0)))),
    ] {
        for (fid, entry) in [(Some(i64::MIN), "first"), (None, "second")] {
            let mut values = vec![("entry", SourceValue::from(entry))];
            values.extend(fid.map(|fid| ("fid", SourceValue::Integer(fid))));
            let inserted = match &geometry {
                Some(geometry) => fixture.insert_feature(table, &values, Some(geometry)),
                None => fixture.insert_row(table, &values),
            };
            inserted.unwrap();
        }
    }
    fixture.finish().unwrap();

    let package = GeoPackage::open(&path).unwrap();
    let rows = collect_rows(&package, &package.attribute_tables().unwrap()[0]);
    assert_eq!(
        rows.iter().map(|row| row.get("fid").cloned()).collect_vec(),
        vec![
            Some(SourceValue::Integer(i64::MIN)),
            Some(SourceValue::Integer(1))
        ]
    );

    let sites = &package.feature_tables().unwrap()[0];
    for bounding_box in [None, Some(BoundingBox::new(0.0, 0.0, 2.0, 2.0))] {
        let entries = collect_features(&package, sites, bounding_box.as_ref())
            .iter()
            .map(|feature| feature.row.get("entry").cloned())
            .collect_vec();
        assert_eq!(
            entries,
            vec![
                Some(SourceValue::from("first")),
                Some(SourceValue::from("second"))
            ],
            "bounding box: {bounding_box:?}"
        );
    }
}

#[test]
fn invalid_geometries_do_not_fail_the_cursor() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("broken.gpkg").to_path_buf();
    let mut fixture = GeoPackageFixture::create(&path).unwrap();
    fixture
        .add_feature_table("shapes", &[], 4326, false)
        .unwrap();
    fixture
        .insert_raw_feature("shapes", &[], Value::Blob(b"GP garbage".to_vec()))
        .unwrap();
    fixture
        .insert_feature(
            "shapes",
            &[],
            Some(&Geometry::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 0.0)
            ])),
        )
        .unwrap();
    fixture.finish().unwrap();

    let package = GeoPackage::open(&path).unwrap();
    let table = &package.feature_tables().unwrap()[0];
    let features = collect_features(&package, table, None);
    assert_eq!(features.len(), 2);
    assert!(matches!(features[0].geometry, FeatureGeometry::Invalid(_)));
    assert!(matches!(features[1].geometry, FeatureGeometry::Valid(_)));
}

#[test]
fn opens_from_bytes() {
    let dir = TempDir::new().unwrap();
    let bytes = std::fs::read(sample(&dir, true)).unwrap();
    let mut package = GeoPackage::from_bytes(&bytes).unwrap();
    assert_eq!(package.feature_tables().unwrap().len(), 1);
    package.close().unwrap();
}

#[test]
fn rejects_plain_sqlite_databases() {
    let dir = TempDir::new().unwrap();
    let path = dir.child("plain.sqlite").to_path_buf();
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE t (x INTEGER)")
        .unwrap();

    assert!(matches!(
        GeoPackage::open(&path),
        Err(SourceError::Corruption(_))
    ));
}

#[test]
fn rejects_files_that_are_not_databases() {
    let dir = TempDir::new().unwrap();
    let file = dir.child("text.gpkg");
    file.write_str("this is not a database at all, just some text that is long enough")
        .unwrap();

    assert!(GeoPackage::open(file.path()).is_err());
}

#[test]
fn cursors_fail_after_close() {
    let dir = TempDir::new().unwrap();
    let mut package = GeoPackage::open(sample(&dir, false)).unwrap();
    let table = package.attribute_tables().unwrap().remove(0);
    let mut cursor = package.open_row_cursor(&table).unwrap();

    package.close().unwrap();
    package.close().unwrap();

    assert!(matches!(cursor.next(), Some(Err(SourceError::Closed))));
    assert!(cursor.next().is_none());
    assert!(matches!(
        package.attribute_tables(),
        Err(SourceError::Closed)
    ));
}
