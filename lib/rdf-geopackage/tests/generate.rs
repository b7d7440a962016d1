#![cfg(test)]
#![expect(clippy::panic_in_result_fn, reason = "tests")]

use geo::{line_string, point, polygon, Geometry};
use rdf_geopackage::common::{
    BlankNodeMode, Feature, FeatureGeometry, Row, SourceStore, SpatialReferenceSystem,
};
use rdf_geopackage::error::StreamFailure;
use rdf_geopackage::io::{RdfFormat, SerializerSink};
use rdf_geopackage::model::vocab::xsd;
use rdf_geopackage::model::{BoundingBox, GraphName, Literal, Quad, SourceValue, Term};
use rdf_geopackage::storage::geopackage::fixture::GeoPackageFixture;
use rdf_geopackage::storage::geopackage::GeoPackage;
use rdf_geopackage::storage::memory::{MemSourceStore, MemTable};
use rdf_geopackage::{
    dataset_bounding_box, ConversionOptions, CrsResolver, QuadStream, StrategyRegistry,
    StreamState,
};
use std::error::Error;
use wkt::TryFromWkt;

const UTRECHT_MERCATOR: (f64, f64) = (569_955.8, 6_816_415.0);
const PARIS_MERCATOR: (f64, f64) = (261_845.7, 6_250_564.3);

fn cities() -> MemSourceStore {
    MemSourceStore::new()
        .with_table(MemTable::attributes(
            "mayors",
            [
                Row::from_iter([("name", "Sharon Dijksma")]),
                Row::from_iter([("name", "Anne Hidalgo")]),
            ],
        ))
        .with_table(MemTable::features(
            "cities",
            SpatialReferenceSystem::epsg(3857),
            [
                Feature::new(
                    Row::from_iter([("name", "Utrecht")]),
                    Geometry::Point(point!(x: UTRECHT_MERCATOR.0, y: UTRECHT_MERCATOR.1)),
                ),
                Feature::new(
                    Row::from_iter([("name", "Paris")]),
                    Geometry::Point(point!(x: PARIS_MERCATOR.0, y: PARIS_MERCATOR.1)),
                ),
            ],
        ))
        .with_table(MemTable::features(
            "shapes",
            SpatialReferenceSystem::wgs84(),
            [
                Feature::new(
                    Row::from_iter([("kind", "line")]),
                    Geometry::LineString(line_string![(x: 5.0, y: 52.0), (x: 5.1, y: 52.0)]),
                ),
                Feature::new(
                    Row::from_iter([("kind", "area")]),
                    Geometry::Polygon(polygon![
                        (x: 5.0, y: 52.0),
                        (x: 5.01, y: 52.0),
                        (x: 5.01, y: 52.01),
                        (x: 5.0, y: 52.01),
                        (x: 5.0, y: 52.0),
                    ]),
                ),
                Feature::new(
                    Row::from_iter([("kind", "point")]),
                    Geometry::Point(point!(x: 5.0, y: 52.0)),
                ),
            ],
        ))
}

async fn convert(
    store: impl SourceStore,
    options: ConversionOptions,
) -> Result<Vec<Quad>, Box<dyn Error>> {
    let context = ConversionOptions {
        blank_node_mode: BlankNodeMode::Sequential,
        ..options
    }
    .into_context(&StrategyRegistry::with_defaults())?;
    let mut stream = QuadStream::open(store, context, &mut CrsResolver::offline()).await?;
    let mut quads = Vec::new();
    assert_eq!(stream.read(&mut quads)?, StreamState::Done);
    Ok(quads)
}

fn with_predicate<'a>(quads: &'a [Quad], suffix: &str) -> Vec<&'a Quad> {
    quads
        .iter()
        .filter(|quad| quad.predicate.as_str().ends_with(suffix))
        .collect()
}

fn literal(term: &Term) -> &Literal {
    match term {
        Term::Literal(literal) => literal,
        _ => panic!("{term} is not a literal"),
    }
}

#[tokio::test]
async fn test_only_layers() -> Result<(), Box<dyn Error>> {
    let quads = convert(
        cities(),
        ConversionOptions {
            allowed_layers: Some(vec!["mayors".into(), "shapes".into()]),
            ..ConversionOptions::default()
        },
    )
    .await?;
    assert!(!quads.is_empty());
    for quad in &quads {
        let GraphName::NamedNode(graph) = &quad.graph_name else {
            panic!("{quad} is in the default graph");
        };
        assert!(
            graph.as_str().ends_with("/mayors") || graph.as_str().ends_with("/shapes"),
            "{quad} is not in an allowed table"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_bounding_box_filters_reprojected_tables() -> Result<(), Box<dyn Error>> {
    let all = convert(cities(), ConversionOptions::default()).await?;
    let filtered = convert(
        cities(),
        ConversionOptions {
            bounding_box: Some(BoundingBox::parse("4,51,6,53")?),
            ..ConversionOptions::default()
        },
    )
    .await?;
    assert!(filtered.len() < all.len());

    let names = filtered
        .iter()
        .filter(|quad| quad.predicate.as_str().ends_with("/name"))
        .map(|quad| literal(&quad.object).value().to_owned())
        .collect::<Vec<_>>();
    assert!(names.contains(&"Utrecht".to_owned()));
    assert!(!names.contains(&"Paris".to_owned()));
    // Attribute tables are never filtered.
    assert!(names.contains(&"Anne Hidalgo".to_owned()));
    Ok(())
}

#[tokio::test]
async fn test_bounding_box_that_contains_everything() -> Result<(), Box<dyn Error>> {
    let all = convert(cities(), ConversionOptions::default()).await?;
    let filtered = convert(
        cities(),
        ConversionOptions {
            bounding_box: Some(BoundingBox::parse("-10,40,20,60")?),
            ..ConversionOptions::default()
        },
    )
    .await?;
    assert_eq!(filtered.len(), all.len());
    Ok(())
}

#[tokio::test]
async fn test_bounding_box_at_the_edge_of_the_projection() -> Result<(), Box<dyn Error>> {
    let all = convert(cities(), ConversionOptions::default()).await?;
    for bbox in ["-180,-90,180,90", "-10,40,20,90", "-10,-90,20,60"] {
        let filtered = convert(
            cities(),
            ConversionOptions {
                bounding_box: Some(BoundingBox::parse(bbox)?),
                ..ConversionOptions::default()
            },
        )
        .await?;
        assert_eq!(filtered.len(), all.len(), "{bbox}");
    }
    Ok(())
}

#[tokio::test]
async fn test_table_crs_from_a_wkt_definition() -> Result<(), Box<dyn Error>> {
    let utm_31n = SpatialReferenceSystem {
        srs_id: 7,
        organization: "ACME".into(),
        organization_coordsys_id: 31,
        definition: "PROJCS[\"WGS 84 / UTM zone 31N\",\
            GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],\
                PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],\
            PROJECTION[\"Transverse_Mercator\"],PARAMETER[\"latitude_of_origin\",0],\
            PARAMETER[\"central_meridian\",3],PARAMETER[\"scale_factor\",0.9996],\
            PARAMETER[\"false_easting\",500000],PARAMETER[\"false_northing\",0],\
            UNIT[\"metre\",1]]"
            .into(),
    };
    let store = MemSourceStore::new().with_table(MemTable::features(
        "buoys",
        utm_31n,
        [
            Feature::new(
                Row::from_iter([("name", "equator")]),
                Geometry::Point(point!(x: 500_000.0, y: 0.0)),
            ),
            Feature::new(
                Row::from_iter([("name", "north")]),
                Geometry::Point(point!(x: 500_000.0, y: 5_000_000.0)),
            ),
        ],
    ));
    let quads = convert(
        store,
        ConversionOptions {
            bounding_box: Some(BoundingBox::parse("2,-1,4,1")?),
            geometry_models: vec!["geojson".into()],
            ..ConversionOptions::default()
        },
    )
    .await?;

    let geojson = with_predicate(&quads, "#asGeoJSON");
    assert_eq!(geojson.len(), 1);
    let geometry = literal(&geojson[0].object)
        .value()
        .parse::<geojson::Geometry>()?;
    let Geometry::Point(buoy) = Geometry::<f64>::try_from(geometry.value)? else {
        panic!("not a point");
    };
    assert!((buoy.x() - 3.0).abs() < 1e-6, "{buoy:?}");
    assert!(buoy.y().abs() < 1e-6, "{buoy:?}");
    Ok(())
}

#[tokio::test]
async fn test_binary_values() -> Result<(), Box<dyn Error>> {
    let store = || {
        MemSourceStore::new().with_table(MemTable::attributes(
            "files",
            [Row::from_iter([
                ("name", SourceValue::from("logo")),
                ("content", SourceValue::Blob(vec![0xde, 0xad, 0xbe, 0xef])),
            ])],
        ))
    };
    let without = convert(store(), ConversionOptions::default()).await?;
    assert!(with_predicate(&without, "/content").is_empty());

    let with = convert(
        store(),
        ConversionOptions {
            include_binary_values: true,
            ..ConversionOptions::default()
        },
    )
    .await?;
    let content = with_predicate(&with, "/content");
    assert_eq!(content.len(), 1);
    assert_eq!(
        literal(&content[0].object),
        &Literal::new_typed_literal("3q2+7w==", xsd::BASE_64_BINARY)
    );
    Ok(())
}

#[tokio::test]
async fn test_length_and_area_eligibility() -> Result<(), Box<dyn Error>> {
    let quads = convert(
        cities(),
        ConversionOptions {
            allowed_layers: Some(vec!["shapes".into()]),
            geometry_models: vec!["length-area".into()],
            ..ConversionOptions::default()
        },
    )
    .await?;
    let lengths = with_predicate(&quads, "#hasMetricLength");
    let areas = with_predicate(&quads, "#hasMetricArea");
    assert_eq!(lengths.len(), 1);
    assert_eq!(areas.len(), 1);

    let length = literal(&lengths[0].object).value().parse::<f64>()?;
    assert!((6_800.0..6_900.0).contains(&length), "unexpected length {length}");
    let area = literal(&areas[0].object).value().parse::<f64>()?;
    assert!((750_000.0..800_000.0).contains(&area), "unexpected area {area}");
    assert_ne!(lengths[0].subject, areas[0].subject);
    Ok(())
}

#[tokio::test]
async fn test_every_strategy_emits_its_predicate() -> Result<(), Box<dyn Error>> {
    for (strategy, predicate) in [
        ("wkt", "#asWKT"),
        ("geojson", "#asGeoJSON"),
        ("bbox", "#hasBoundingBox"),
        ("centroid", "#hasCentroid"),
        ("length-area", "#hasMetricLength"),
    ] {
        let quads = convert(
            cities(),
            ConversionOptions {
                geometry_models: vec![strategy.into()],
                ..ConversionOptions::default()
            },
        )
        .await?;
        assert!(
            !with_predicate(&quads, predicate).is_empty(),
            "{strategy} emitted no {predicate}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_wkt_and_geojson_agree_in_wgs84() -> Result<(), Box<dyn Error>> {
    let quads = convert(
        cities(),
        ConversionOptions {
            allowed_layers: Some(vec!["shapes".into()]),
            geometry_models: vec!["wkt".into(), "geojson".into()],
            ..ConversionOptions::default()
        },
    )
    .await?;
    let wkts = with_predicate(&quads, "#asWKT");
    let geojsons = with_predicate(&quads, "#asGeoJSON");
    assert_eq!(wkts.len(), 3);
    assert_eq!(geojsons.len(), 3);
    for (wkt, geojson) in wkts.into_iter().zip(geojsons) {
        assert_eq!(wkt.subject, geojson.subject);
        let (_, wkt) = literal(&wkt.object)
            .value()
            .split_once("> ")
            .ok_or("untagged WKT literal")?;
        let from_wkt = Geometry::<f64>::try_from_wkt_str(wkt)?;
        let geojson = literal(&geojson.object).value().parse::<geojson::Geometry>()?;
        let from_geojson = Geometry::<f64>::try_from(geojson.value)?;
        assert_eq!(from_wkt, from_geojson);
    }
    Ok(())
}

#[tokio::test]
async fn test_geojson_is_reprojected() -> Result<(), Box<dyn Error>> {
    let quads = convert(
        cities(),
        ConversionOptions {
            allowed_layers: Some(vec!["cities".into()]),
            geometry_models: vec!["wkt".into(), "geojson".into()],
            ..ConversionOptions::default()
        },
    )
    .await?;
    let geojson = with_predicate(&quads, "#asGeoJSON");
    let geometry = literal(&geojson[0].object)
        .value()
        .parse::<geojson::Geometry>()?;
    let Geometry::Point(utrecht) = Geometry::<f64>::try_from(geometry.value)? else {
        panic!("not a point");
    };
    assert!((utrecht.x() - 5.12).abs() < 0.01);
    assert!((utrecht.y() - 52.09).abs() < 0.01);

    // The reprojected geometry is not the stored one.
    let wkt = with_predicate(&quads, "#asWKT");
    assert_ne!(wkt[0].subject, geojson[0].subject);
    Ok(())
}

#[tokio::test]
async fn test_iri_model() -> Result<(), Box<dyn Error>> {
    let store = MemSourceStore::new().with_table(
        MemTable::attributes("rivers", [Row::from_iter([("code", "RHINE")])])
            .with_id_columns(["code"]),
    );
    let quads = convert(
        store,
        ConversionOptions {
            base_iri: Some("https://example.com/data/".into()),
            model: Some("facade-x-iri".into()),
            ..ConversionOptions::default()
        },
    )
    .await?;
    assert_eq!(
        quads[2].subject.to_string(),
        "<https://example.com/data/rivers_RHINE>"
    );
    Ok(())
}

#[tokio::test]
async fn test_backpressure() -> Result<(), Box<dyn Error>> {
    let context = ConversionOptions::default().into_context(&StrategyRegistry::with_defaults())?;
    let mut stream = QuadStream::open(cities(), context, &mut CrsResolver::offline()).await?;
    let mut sink = SerializerSink::new(RdfFormat::NQuads, Vec::new())?.with_high_water_mark(3);

    assert_eq!(stream.read(&mut sink)?, StreamState::Paused);
    assert_eq!(sink.written(), 3);
    assert_eq!(stream.source().advances(), 3);

    assert_eq!(stream.read(&mut sink)?, StreamState::Paused);
    assert_eq!(stream.source().advances(), 6);

    while stream.read(&mut sink)? == StreamState::Paused {}
    assert_eq!(stream.state(), StreamState::Done);
    assert_eq!(stream.source().advances(), sink.written() + 1);
    Ok(())
}

#[tokio::test]
async fn test_warnings_are_counted() -> Result<(), Box<dyn Error>> {
    let store = MemSourceStore::new().with_table(MemTable::features(
        "broken",
        SpatialReferenceSystem::wgs84(),
        [
            Feature::new(Row::default(), FeatureGeometry::Invalid("bad blob".into())),
            Feature::new(Row::default(), FeatureGeometry::Invalid("bad blob".into())),
            Feature::new(Row::default(), Geometry::Point(point!(x: 1.0, y: 1.0))),
        ],
    ));
    let context = ConversionOptions::default().into_context(&StrategyRegistry::with_defaults())?;
    let mut stream = QuadStream::open(store, context, &mut CrsResolver::offline()).await?;
    let mut quads = Vec::new();
    stream.read(&mut quads)?;

    let warnings = stream.source().warnings();
    assert_eq!(warnings.total(), 2);
    assert_eq!(
        warnings.to_string(),
        "Table \"broken\": \"bad blob\"; skipped (2x)\n"
    );
    assert_eq!(with_predicate(&quads, "#asWKT").len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_release_errors_keep_the_cause() -> Result<(), Box<dyn Error>> {
    let store = MemSourceStore::new()
        .with_table(
            MemTable::attributes("rows", [Row::default(), Row::default()])
                .failing_after(1, "disk on fire"),
        )
        .failing_on_close("cannot close");
    let context = ConversionOptions::default().into_context(&StrategyRegistry::with_defaults())?;
    let mut stream = QuadStream::open(store, context, &mut CrsResolver::offline()).await?;

    let error = stream.read(&mut Vec::new()).unwrap_err();
    assert!(matches!(error.failure(), StreamFailure::Generation(_)));
    assert!(error.to_string().contains("disk on fire"));
    assert!(error
        .release_failure()
        .is_some_and(|release| release.to_string().contains("cannot close")));
    assert_eq!(stream.state(), StreamState::Destroyed);
    Ok(())
}

#[tokio::test]
async fn test_unresolvable_crs_with_a_bounding_box() -> Result<(), Box<dyn Error>> {
    let store = MemSourceStore::new().with_table(MemTable::features(
        "local",
        SpatialReferenceSystem {
            srs_id: 1,
            organization: "ACME".into(),
            organization_coordsys_id: 1,
            definition: "LOCAL_CS[\"plant\"]".into(),
        },
        [Feature::new(Row::default(), Geometry::Point(point!(x: 1.0, y: 1.0)))],
    ));
    let context = ConversionOptions {
        bounding_box: Some(BoundingBox::parse("0,0,1,1")?),
        ..ConversionOptions::default()
    }
    .into_context(&StrategyRegistry::with_defaults())?;
    let mut stream = QuadStream::open(store, context, &mut CrsResolver::offline()).await?;
    let error = stream.read(&mut Vec::new()).unwrap_err();
    assert!(error.to_string().contains("ACME:1"));
    Ok(())
}

#[tokio::test]
async fn test_dataset_bounding_box() -> Result<(), Box<dyn Error>> {
    let bbox = dataset_bounding_box(&cities(), &mut CrsResolver::offline())
        .await?
        .ok_or("no extent")?;
    assert!((bbox.west - 2.35).abs() < 0.01, "{bbox}");
    assert!((bbox.south - 48.85).abs() < 0.01, "{bbox}");
    assert!((bbox.east - 5.12).abs() < 0.01, "{bbox}");
    assert!((bbox.north - 52.09).abs() < 0.01, "{bbox}");

    let empty = dataset_bounding_box(&MemSourceStore::new(), &mut CrsResolver::offline()).await?;
    assert_eq!(empty, None);
    Ok(())
}

#[tokio::test]
async fn test_geopackage_to_nquads() -> Result<(), Box<dyn Error>> {
    let directory = tempfile::tempdir()?;
    let path = directory.path().join("data.gpkg");
    let mut fixture = GeoPackageFixture::create(&path)?;
    fixture.add_attribute_table("owners", &[("name", "TEXT"), ("active", "BOOLEAN")])?;
    fixture.insert_row(
        "owners",
        &[("name", "Ada".into()), ("active", SourceValue::Boolean(true))],
    )?;
    fixture.add_feature_table("wells", &[("depth", "REAL")], 4326, true)?;
    fixture.insert_feature(
        "wells",
        &[("depth", SourceValue::Real(12.0))],
        Some(&Geometry::Point(point!(x: 5.1, y: 52.1))),
    )?;
    fixture.insert_feature(
        "wells",
        &[("depth", SourceValue::Real(7.5))],
        Some(&Geometry::Point(point!(x: 9.0, y: 45.0))),
    )?;
    fixture.finish()?;

    let context = ConversionOptions {
        bounding_box: Some(BoundingBox::parse("4 6 51 53")?),
        blank_node_mode: BlankNodeMode::Sequential,
        ..ConversionOptions::default()
    }
    .into_context(&StrategyRegistry::with_defaults())?;
    let store = GeoPackage::from_bytes(&std::fs::read(&path)?)?;
    let mut stream = QuadStream::open(store, context, &mut CrsResolver::offline()).await?;
    let mut sink = SerializerSink::new(RdfFormat::NQuads, Vec::new())?;
    while stream.read(&mut sink)? == StreamState::Paused {}
    let output = String::from_utf8(sink.into_inner().ok_or("unfinished sink")?)?;

    assert!(output.contains(
        "<http://sparql.xyz/facade-x/data/owners> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://sparql.xyz/facade-x/ns/root> <http://sparql.xyz/facade-x/data/owners> ."
    ));
    assert!(output.contains(
        "<http://sparql.xyz/facade-x/data/active> \"true\"^^<http://www.w3.org/2001/XMLSchema#boolean>"
    ));
    assert!(output.contains(
        "<http://sparql.xyz/facade-x/data/depth> \"12\"^^<http://www.w3.org/2001/XMLSchema#integer>"
    ));
    assert!(output.contains("POINT(5.1 52.1)"));
    assert!(!output.contains("7.5"));
    Ok(())
}
