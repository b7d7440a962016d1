use crate::SourceResult;
use geo::Geometry;
use rdf_geopackage_model::{BoundingBox, SourceValue};
use std::fmt;

/// The kind of a source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// A table of plain records.
    Attributes,
    /// A table of records that each own a geometry.
    Features,
}

/// Describes a table of a [SourceStore].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableInfo {
    pub name: String,
    pub kind: TableKind,
    /// The columns that uniquely identify a row, in key order.
    pub id_columns: Vec<String>,
}

impl TableInfo {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            id_columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id_columns(mut self, id_columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.id_columns = id_columns.into_iter().map(Into::into).collect();
        self
    }
}

/// The coordinate reference system of a feature table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpatialReferenceSystem {
    /// The store-local identifier of this CRS.
    pub srs_id: i32,
    /// The defining organization, e.g., `EPSG`.
    pub organization: String,
    /// The code of the CRS within the organization, e.g., `4326`.
    pub organization_coordsys_id: i32,
    /// A textual definition (usually WKT) of the CRS. May be empty.
    pub definition: String,
}

impl SpatialReferenceSystem {
    /// The WGS84 geographic CRS, the only CRS that may be used in GeoJSON.
    pub fn wgs84() -> Self {
        Self {
            srs_id: 4326,
            organization: "EPSG".to_owned(),
            organization_coordsys_id: 4326,
            definition: String::new(),
        }
    }

    /// Returns a CRS identified by an EPSG code.
    pub fn epsg(code: i32) -> Self {
        Self {
            srs_id: code,
            organization: "EPSG".to_owned(),
            organization_coordsys_id: code,
            definition: String::new(),
        }
    }

    pub fn is_wgs84(&self) -> bool {
        self.organization.eq_ignore_ascii_case("epsg") && self.organization_coordsys_id == 4326
    }

    /// Returns the CRS code in the `ORGANIZATION:CODE` notation.
    pub fn code(&self) -> String {
        format!(
            "{}:{}",
            self.organization.to_ascii_uppercase(),
            self.organization_coordsys_id
        )
    }
}

impl fmt::Display for SpatialReferenceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// A single record of a table. Column order is preserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub values: Vec<(String, SourceValue)>,
}

impl Row {
    pub fn new(values: Vec<(String, SourceValue)>) -> Self {
        Self { values }
    }

    /// Returns the value of the given column.
    pub fn get(&self, column: &str) -> Option<&SourceValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

impl<K: Into<String>, V: Into<SourceValue>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// The geometry of a feature.
///
/// Unreadable geometries are an expected outcome when reading real-world data. They are
/// represented as a value so that the remaining attributes of the feature can still be used.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Valid(Geometry<f64>),
    /// The feature has no geometry.
    Missing,
    /// The geometry could not be decoded. Holds the reason.
    Invalid(String),
}

impl FeatureGeometry {
    pub fn as_valid(&self) -> Option<&Geometry<f64>> {
        match self {
            FeatureGeometry::Valid(geometry) => Some(geometry),
            FeatureGeometry::Missing | FeatureGeometry::Invalid(_) => None,
        }
    }
}

impl From<Geometry<f64>> for FeatureGeometry {
    fn from(value: Geometry<f64>) -> Self {
        FeatureGeometry::Valid(value)
    }
}

/// A record of a feature table: its attributes and its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub row: Row,
    pub geometry: FeatureGeometry,
}

impl Feature {
    pub fn new(row: Row, geometry: impl Into<FeatureGeometry>) -> Self {
        Self {
            row,
            geometry: geometry.into(),
        }
    }
}

/// A lazy cursor over the rows of an attribute table.
pub type RowCursor = Box<dyn Iterator<Item = SourceResult<Row>> + Send>;

/// A lazy cursor over the features of a feature table.
pub type FeatureCursor = Box<dyn Iterator<Item = SourceResult<Feature>> + Send>;

/// A read-only store of attribute and feature tables, e.g., a GeoPackage.
///
/// # Ownership
///
/// The cursors returned by a store do not borrow it. Implementations that share a connection
/// between the store and its cursors must make sure that a cursor of a closed store returns
/// [SourceError::Closed](crate::SourceError::Closed) instead of panicking.
pub trait SourceStore: Send {
    /// Returns the attribute tables of the store in a stable order.
    fn attribute_tables(&self) -> SourceResult<Vec<TableInfo>>;

    /// Returns the feature tables of the store in a stable order.
    fn feature_tables(&self) -> SourceResult<Vec<TableInfo>>;

    /// Opens a cursor over all rows of an attribute table.
    fn open_row_cursor(&self, table: &TableInfo) -> SourceResult<RowCursor>;

    /// Opens a cursor over the features of a feature table.
    ///
    /// If `bounding_box` is given, only features whose envelope intersects the box are returned.
    /// The box must be given in the CRS of the table.
    fn open_feature_cursor(
        &self,
        table: &TableInfo,
        bounding_box: Option<&BoundingBox>,
    ) -> SourceResult<FeatureCursor>;

    /// Returns the CRS of a feature table.
    fn table_srs(&self, table: &TableInfo) -> SourceResult<SpatialReferenceSystem>;

    /// Returns the stored extent of a feature table in the CRS of the table, if known.
    fn table_extent(&self, table: &TableInfo) -> SourceResult<Option<BoundingBox>>;

    /// Releases the resources of the store.
    ///
    /// Closing is idempotent. Cursors that are still alive fail on their next page.
    fn close(&mut self) -> SourceResult<()>;
}

impl<S: SourceStore + ?Sized> SourceStore for Box<S> {
    fn attribute_tables(&self) -> SourceResult<Vec<TableInfo>> {
        (**self).attribute_tables()
    }

    fn feature_tables(&self) -> SourceResult<Vec<TableInfo>> {
        (**self).feature_tables()
    }

    fn open_row_cursor(&self, table: &TableInfo) -> SourceResult<RowCursor> {
        (**self).open_row_cursor(table)
    }

    fn open_feature_cursor(
        &self,
        table: &TableInfo,
        bounding_box: Option<&BoundingBox>,
    ) -> SourceResult<FeatureCursor> {
        (**self).open_feature_cursor(table, bounding_box)
    }

    fn table_srs(&self, table: &TableInfo) -> SourceResult<SpatialReferenceSystem> {
        (**self).table_srs(table)
    }

    fn table_extent(&self, table: &TableInfo) -> SourceResult<Option<BoundingBox>> {
        (**self).table_extent(table)
    }

    fn close(&mut self) -> SourceResult<()> {
        (**self).close()
    }
}
