//! Decoding of GeoPackage geometry blobs.

use geozero::wkb::GpkgWkb;
use geozero::ToGeo;
use rdf_geopackage_common::FeatureGeometry;
use rusqlite::types::ValueRef;

const MAGIC: &[u8] = b"GP";
const EMPTY_GEOMETRY_FLAG: u8 = 0b0001_0000;

/// Decodes the value of a geometry column.
///
/// Geometries that cannot be decoded do not fail the cursor. They are returned as
/// [FeatureGeometry::Invalid] so that the caller can skip them.
pub(crate) fn decode_geometry(value: ValueRef<'_>) -> FeatureGeometry {
    match value {
        ValueRef::Null => FeatureGeometry::Missing,
        ValueRef::Blob(blob) => decode_blob(blob),
        _ => FeatureGeometry::Invalid(format!(
            "expected a geometry blob but found a {} value",
            value.data_type()
        )),
    }
}

fn decode_blob(blob: &[u8]) -> FeatureGeometry {
    let Some(flags) = blob.get(3) else {
        return FeatureGeometry::Invalid("geometry blob is truncated".to_owned());
    };
    if !blob.starts_with(MAGIC) {
        return FeatureGeometry::Invalid("geometry blob has no GeoPackage header".to_owned());
    }
    if flags & EMPTY_GEOMETRY_FLAG != 0 {
        return FeatureGeometry::Missing;
    }
    match GpkgWkb(blob.to_vec()).to_geo() {
        Ok(geometry) => FeatureGeometry::Valid(geometry),
        Err(error) => FeatureGeometry::Invalid(error.to_string()),
    }
}
