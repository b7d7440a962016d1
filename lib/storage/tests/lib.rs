use rdf_geopackage_common::{Feature, Row, SourceStore, TableInfo};
use rdf_geopackage_model::BoundingBox;

mod geopackage;
mod memory;

fn collect_rows(store: &impl SourceStore, table: &TableInfo) -> Vec<Row> {
    store
        .open_row_cursor(table)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn collect_features(
    store: &impl SourceStore,
    table: &TableInfo,
    bounding_box: Option<&BoundingBox>,
) -> Vec<Feature> {
    store
        .open_feature_cursor(table, bounding_box)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}
