//! Reads the metadata tables of a GeoPackage into [TableLayout]s.

use super::sql_error;
use rdf_geopackage_common::{
    CorruptionError, SourceResult, SpatialReferenceSystem, TableInfo, TableKind,
};
use rdf_geopackage_model::{BoundingBox, SourceValue};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension};

/// How a column value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    Boolean,
    Date,
    DateTime,
    /// Typed by the SQLite storage class of each value.
    Dynamic,
}

impl ColumnKind {
    fn from_declared_type(declared: &str) -> Self {
        let declared = declared.trim().to_ascii_uppercase();
        if declared.starts_with("BOOL") {
            ColumnKind::Boolean
        } else if declared.starts_with("DATETIME") || declared.starts_with("TIMESTAMP") {
            ColumnKind::DateTime
        } else if declared.starts_with("DATE") {
            ColumnKind::Date
        } else {
            ColumnKind::Dynamic
        }
    }

    pub(crate) fn decode(self, value: ValueRef<'_>) -> SourceValue {
        match (self, value) {
            (_, ValueRef::Null) => SourceValue::Null,
            (ColumnKind::Boolean, ValueRef::Integer(value)) => SourceValue::Boolean(value != 0),
            (ColumnKind::Date, ValueRef::Text(text)) => {
                SourceValue::Date(String::from_utf8_lossy(text).into_owned())
            }
            (ColumnKind::DateTime, ValueRef::Text(text)) => {
                SourceValue::DateTime(String::from_utf8_lossy(text).into_owned())
            }
            (_, ValueRef::Integer(value)) => SourceValue::Integer(value),
            (_, ValueRef::Real(value)) => SourceValue::Real(value),
            (_, ValueRef::Text(text)) => SourceValue::Text(String::from_utf8_lossy(text).into_owned()),
            (_, ValueRef::Blob(bytes)) => SourceValue::Blob(bytes.to_vec()),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ColumnLayout {
    pub name: String,
    pub kind: ColumnKind,
}

/// The column used for keyset pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PageKey {
    /// A single `INTEGER PRIMARY KEY` column.
    Column(String),
    /// The implicit SQLite `rowid`.
    RowId,
}

/// Everything that is needed to read a table.
#[derive(Debug, Clone)]
pub(crate) struct TableLayout {
    pub info: TableInfo,
    pub key: PageKey,
    /// The attribute columns, without the geometry column.
    pub columns: Vec<ColumnLayout>,
    pub geometry_column: Option<String>,
    pub srs: Option<SpatialReferenceSystem>,
    /// The name of the R-tree index of the geometry column, if the table has one.
    pub rtree: Option<String>,
    pub extent: Option<BoundingBox>,
}

/// Loads the layouts of all attribute and feature tables, ordered by table name.
pub(crate) fn load_layouts(connection: &Connection) -> SourceResult<Vec<TableLayout>> {
    let has_contents: bool = connection
        .query_row(
            "SELECT count(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'gpkg_contents'",
            [],
            |row| row.get(0),
        )
        .map_err(sql_error)?;
    if !has_contents {
        return Err(
            CorruptionError::msg("Not a GeoPackage: the gpkg_contents table is missing").into(),
        );
    }

    let mut statement = connection
        .prepare(
            "SELECT table_name, data_type, min_x, min_y, max_x, max_y FROM gpkg_contents \
             WHERE data_type IN ('attributes', 'features') ORDER BY table_name",
        )
        .map_err(sql_error)?;
    let contents = statement
        .query_map([], |row| {
            let kind = match row.get::<_, String>(1)?.as_str() {
                "features" => TableKind::Features,
                _ => TableKind::Attributes,
            };
            let extent = match (
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<f64>>(5)?,
            ) {
                (Some(west), Some(south), Some(east), Some(north)) => {
                    Some(BoundingBox::new(west, south, east, north))
                }
                _ => None,
            };
            Ok((row.get::<_, String>(0)?, kind, extent))
        })
        .map_err(sql_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sql_error)?;

    contents
        .into_iter()
        .map(|(name, kind, extent)| load_layout(connection, name, kind, extent))
        .collect()
}

fn load_layout(
    connection: &Connection,
    name: String,
    kind: TableKind,
    extent: Option<BoundingBox>,
) -> SourceResult<TableLayout> {
    let mut statement = connection
        .prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")
        .map_err(sql_error)?;
    let raw_columns = statement
        .query_map([&name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .map_err(sql_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(sql_error)?;
    if raw_columns.is_empty() {
        return Err(CorruptionError::msg(format!(
            "Table '{name}' is listed in gpkg_contents but does not exist"
        ))
        .into());
    }

    let (geometry_column, srs) = match kind {
        TableKind::Features => {
            let (column, srs) = load_geometry_column(connection, &name)?;
            (Some(column), Some(srs))
        }
        TableKind::Attributes => (None, None),
    };

    let mut primary_key = raw_columns
        .iter()
        .filter(|(_, _, pk)| *pk > 0)
        .collect::<Vec<_>>();
    primary_key.sort_by_key(|(_, _, pk)| *pk);
    let key = match primary_key.as_slice() {
        [(column, declared, _)] if declared.eq_ignore_ascii_case("INTEGER") => {
            PageKey::Column(column.clone())
        }
        _ => PageKey::RowId,
    };
    let id_columns = primary_key
        .iter()
        .map(|(column, _, _)| column.clone())
        .collect::<Vec<_>>();

    let columns = raw_columns
        .iter()
        .filter(|(column, _, _)| Some(column) != geometry_column.as_ref())
        .map(|(column, declared, _)| ColumnLayout {
            name: column.clone(),
            kind: ColumnKind::from_declared_type(declared),
        })
        .collect();

    let rtree = match (&geometry_column, &key) {
        (Some(column), PageKey::Column(_)) => find_rtree(connection, &name, column)?,
        _ => None,
    };

    Ok(TableLayout {
        info: TableInfo::new(name, kind).with_id_columns(id_columns),
        key,
        columns,
        geometry_column,
        srs,
        rtree,
        extent,
    })
}

fn load_geometry_column(
    connection: &Connection,
    table: &str,
) -> SourceResult<(String, SpatialReferenceSystem)> {
    connection
        .query_row(
            "SELECT g.column_name, s.srs_id, s.organization, s.organization_coordsys_id, s.definition \
             FROM gpkg_geometry_columns AS g JOIN gpkg_spatial_ref_sys AS s ON s.srs_id = g.srs_id \
             WHERE g.table_name = ?1",
            [table],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    SpatialReferenceSystem {
                        srs_id: row.get(1)?,
                        organization: row.get(2)?,
                        organization_coordsys_id: row.get(3)?,
                        definition: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    },
                ))
            },
        )
        .optional()
        .map_err(sql_error)?
        .ok_or_else(|| {
            CorruptionError::msg(format!(
                "Feature table '{table}' has no registered geometry column or spatial reference system"
            ))
            .into()
        })
}

fn find_rtree(connection: &Connection, table: &str, column: &str) -> SourceResult<Option<String>> {
    let name = format!("rtree_{table}_{column}");
    let exists: bool = connection
        .query_row(
            "SELECT count(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [&name],
            |row| row.get(0),
        )
        .map_err(sql_error)?;
    Ok(exists.then_some(name))
}

/// Quotes an SQL identifier.
pub(crate) fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
