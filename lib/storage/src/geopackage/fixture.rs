//! A minimal GeoPackage writer for tests.
//!
//! It writes just enough of the GeoPackage schema for [GeoPackage](super::GeoPackage) to read the
//! file: the spatial reference systems, the contents and geometry column tables, and optional
//! R-tree indexes.

use geo::{BoundingRect, Coord, Geometry, LineString, Polygon};
use rdf_geopackage_model::SourceValue;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use std::collections::HashSet;
use std::path::Path;

/// Writes a GeoPackage file.
pub struct GeoPackageFixture {
    connection: Connection,
    indexed: HashSet<String>,
}

impl GeoPackageFixture {
    /// Creates a new GeoPackage with the systems WGS84 (4326), Web Mercator (3857) and the two
    /// undefined systems (-1 and 0).
    pub fn create(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let connection = Connection::open(path)?;
        connection.execute_batch(
            "PRAGMA application_id = 1196444487;
             CREATE TABLE gpkg_spatial_ref_sys (
                 srs_name TEXT NOT NULL,
                 srs_id INTEGER PRIMARY KEY,
                 organization TEXT NOT NULL,
                 organization_coordsys_id INTEGER NOT NULL,
                 definition TEXT NOT NULL,
                 description TEXT
             );
             CREATE TABLE gpkg_contents (
                 table_name TEXT NOT NULL PRIMARY KEY,
                 data_type TEXT NOT NULL,
                 identifier TEXT UNIQUE,
                 description TEXT DEFAULT '',
                 last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
                 min_x DOUBLE,
                 min_y DOUBLE,
                 max_x DOUBLE,
                 max_y DOUBLE,
                 srs_id INTEGER
             );
             CREATE TABLE gpkg_geometry_columns (
                 table_name TEXT NOT NULL,
                 column_name TEXT NOT NULL,
                 geometry_type_name TEXT NOT NULL,
                 srs_id INTEGER NOT NULL,
                 z TINYINT NOT NULL,
                 m TINYINT NOT NULL,
                 CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name)
             );",
        )?;
        let fixture = Self {
            connection,
            indexed: HashSet::new(),
        };
        fixture.add_srs(
            "WGS 84 geodetic",
            4326,
            "EPSG",
            4326,
            "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]",
        )?;
        fixture.add_srs(
            "WGS 84 / Pseudo-Mercator",
            3857,
            "EPSG",
            3857,
            "PROJCS[\"WGS 84 / Pseudo-Mercator\",GEOGCS[\"WGS 84\"],PROJECTION[\"Mercator_1SP\"]]",
        )?;
        fixture.add_srs("Undefined cartesian SRS", -1, "NONE", -1, "undefined")?;
        fixture.add_srs("Undefined geographic SRS", 0, "NONE", 0, "undefined")?;
        Ok(fixture)
    }

    pub fn add_srs(
        &self,
        name: &str,
        srs_id: i32,
        organization: &str,
        organization_coordsys_id: i32,
        definition: &str,
    ) -> rusqlite::Result<()> {
        self.connection.execute(
            "INSERT INTO gpkg_spatial_ref_sys (srs_name, srs_id, organization, organization_coordsys_id, definition) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![name, srs_id, organization, organization_coordsys_id, definition],
        )?;
        Ok(())
    }

    /// Creates an attribute table with an `fid INTEGER PRIMARY KEY` column and the given
    /// `(name, declared type)` columns.
    pub fn add_attribute_table(&self, name: &str, columns: &[(&str, &str)]) -> rusqlite::Result<()> {
        self.create_table(name, columns, None)?;
        self.connection.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier) VALUES (?1, 'attributes', ?1)",
            [name],
        )?;
        Ok(())
    }

    /// Creates a feature table with an `fid INTEGER PRIMARY KEY` column, the given columns and a
    /// `geom` geometry column.
    pub fn add_feature_table(
        &mut self,
        name: &str,
        columns: &[(&str, &str)],
        srs_id: i32,
        spatial_index: bool,
    ) -> rusqlite::Result<()> {
        self.create_table(name, columns, Some("geom"))?;
        self.connection.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES (?1, 'features', ?1, ?2)",
            params![name, srs_id],
        )?;
        self.connection.execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', 'GEOMETRY', ?2, 0, 0)",
            params![name, srs_id],
        )?;
        if spatial_index {
            self.connection.execute_batch(&format!(
                "CREATE VIRTUAL TABLE \"rtree_{name}_geom\" USING rtree(id, minx, maxx, miny, maxy)"
            ))?;
            self.indexed.insert(name.to_owned());
        }
        Ok(())
    }

    /// Inserts a row into an attribute table.
    pub fn insert_row(&self, table: &str, values: &[(&str, SourceValue)]) -> rusqlite::Result<i64> {
        self.insert(table, values, None)
    }

    /// Inserts a feature. The extent of the table and its R-tree index are updated accordingly.
    pub fn insert_feature(
        &self,
        table: &str,
        values: &[(&str, SourceValue)],
        geometry: Option<&Geometry<f64>>,
    ) -> rusqlite::Result<i64> {
        let srs_id: i32 = self.connection.query_row(
            "SELECT srs_id FROM gpkg_geometry_columns WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        )?;
        let blob = geometry.map(|geometry| encode_geometry(geometry, srs_id));
        let fid = self.insert(table, values, Some(Value::from(blob)))?;
        if let Some(rect) = geometry.and_then(|geometry| geometry.bounding_rect()) {
            self.connection.execute(
                "UPDATE gpkg_contents SET \
                 min_x = min(coalesce(min_x, ?2), ?2), min_y = min(coalesce(min_y, ?3), ?3), \
                 max_x = max(coalesce(max_x, ?4), ?4), max_y = max(coalesce(max_y, ?5), ?5) \
                 WHERE table_name = ?1",
                params![table, rect.min().x, rect.min().y, rect.max().x, rect.max().y],
            )?;
            if self.indexed.contains(table) {
                self.connection.execute(
                    &format!("INSERT INTO \"rtree_{table}_geom\" VALUES (?1, ?2, ?3, ?4, ?5)"),
                    params![fid, rect.min().x, rect.max().x, rect.min().y, rect.max().y],
                )?;
            }
        }
        Ok(fid)
    }

    /// Stores a raw value in the geometry column, e.g., a corrupted blob.
    pub fn insert_raw_feature(
        &self,
        table: &str,
        values: &[(&str, SourceValue)],
        geometry: Value,
    ) -> rusqlite::Result<i64> {
        self.insert(table, values, Some(geometry))
    }

    pub fn finish(self) -> rusqlite::Result<()> {
        self.connection.close().map_err(|(_, error)| error)
    }

    fn create_table(
        &self,
        name: &str,
        columns: &[(&str, &str)],
        geometry_column: Option<&str>,
    ) -> rusqlite::Result<()> {
        let mut definitions = vec!["\"fid\" INTEGER PRIMARY KEY AUTOINCREMENT".to_owned()];
        definitions.extend(
            columns
                .iter()
                .map(|(column, declared)| format!("\"{column}\" {declared}")),
        );
        if let Some(geometry_column) = geometry_column {
            definitions.push(format!("\"{geometry_column}\" GEOMETRY"));
        }
        self.connection.execute_batch(&format!(
            "CREATE TABLE \"{name}\" ({})",
            definitions.join(", ")
        ))
    }

    fn insert(
        &self,
        table: &str,
        values: &[(&str, SourceValue)],
        geometry: Option<Value>,
    ) -> rusqlite::Result<i64> {
        let mut columns = values
            .iter()
            .map(|(column, _)| format!("\"{column}\""))
            .collect::<Vec<_>>();
        let mut parameters = values
            .iter()
            .map(|(_, value)| to_sql_value(value))
            .collect::<Vec<_>>();
        if let Some(geometry) = geometry {
            columns.push("\"geom\"".to_owned());
            parameters.push(geometry);
        }
        let sql = if columns.is_empty() {
            format!("INSERT INTO \"{table}\" DEFAULT VALUES")
        } else {
            let placeholders = (1..=columns.len())
                .map(|index| format!("?{index}"))
                .collect::<Vec<_>>();
            format!(
                "INSERT INTO \"{table}\" ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        self.connection.execute(&sql, params_from_iter(parameters))?;
        Ok(self.connection.last_insert_rowid())
    }
}

fn to_sql_value(value: &SourceValue) -> Value {
    match value {
        SourceValue::Null => Value::Null,
        SourceValue::Boolean(value) => Value::Integer(i64::from(*value)),
        SourceValue::Integer(value) => Value::Integer(*value),
        SourceValue::Real(value) => Value::Real(*value),
        SourceValue::Text(value) | SourceValue::Date(value) | SourceValue::DateTime(value) => {
            Value::Text(value.clone())
        }
        SourceValue::Blob(value) => Value::Blob(value.clone()),
    }
}

/// Encodes a geometry as a GeoPackage blob without an envelope.
pub fn encode_geometry(geometry: &Geometry<f64>, srs_id: i32) -> Vec<u8> {
    // Magic, version 0, little endian without an envelope.
    let mut blob = vec![b'G', b'P', 0, 0b0000_0001];
    blob.extend_from_slice(&srs_id.to_le_bytes());
    write_wkb(&mut blob, geometry);
    blob
}

fn write_wkb(out: &mut Vec<u8>, geometry: &Geometry<f64>) {
    out.push(1);
    match geometry {
        Geometry::Point(point) => {
            out.extend_from_slice(&1_u32.to_le_bytes());
            write_coord(out, point.0);
        }
        Geometry::Line(line) => {
            write_wkb(out, &Geometry::LineString(LineString::new(vec![line.start, line.end])));
        }
        Geometry::LineString(line_string) => {
            out.extend_from_slice(&2_u32.to_le_bytes());
            write_coords(out, &line_string.0);
        }
        Geometry::Polygon(polygon) => {
            out.extend_from_slice(&3_u32.to_le_bytes());
            write_rings(out, polygon);
        }
        Geometry::MultiPoint(points) => {
            out.extend_from_slice(&4_u32.to_le_bytes());
            write_count(out, points.0.len());
            for point in &points.0 {
                write_wkb(out, &Geometry::Point(*point));
            }
        }
        Geometry::MultiLineString(lines) => {
            out.extend_from_slice(&5_u32.to_le_bytes());
            write_count(out, lines.0.len());
            for line in &lines.0 {
                write_wkb(out, &Geometry::LineString(line.clone()));
            }
        }
        Geometry::MultiPolygon(polygons) => {
            out.extend_from_slice(&6_u32.to_le_bytes());
            write_count(out, polygons.0.len());
            for polygon in &polygons.0 {
                write_wkb(out, &Geometry::Polygon(polygon.clone()));
            }
        }
        Geometry::GeometryCollection(collection) => {
            out.extend_from_slice(&7_u32.to_le_bytes());
            write_count(out, collection.0.len());
            for member in &collection.0 {
                write_wkb(out, member);
            }
        }
        Geometry::Rect(rect) => {
            // The byte order marker was already written.
            out.pop();
            write_wkb(out, &Geometry::Polygon(rect.to_polygon()));
        }
        Geometry::Triangle(triangle) => {
            out.pop();
            write_wkb(out, &Geometry::Polygon(triangle.to_polygon()));
        }
    }
}

fn write_rings(out: &mut Vec<u8>, polygon: &Polygon<f64>) {
    write_count(out, polygon.interiors().len() + 1);
    write_coords(out, &polygon.exterior().0);
    for interior in polygon.interiors() {
        write_coords(out, &interior.0);
    }
}

fn write_coords(out: &mut Vec<u8>, coords: &[Coord<f64>]) {
    write_count(out, coords.len());
    for coord in coords {
        write_coord(out, *coord);
    }
}

fn write_coord(out: &mut Vec<u8>, coord: Coord<f64>) {
    out.extend_from_slice(&coord.x.to_le_bytes());
    out.extend_from_slice(&coord.y.to_le_bytes());
}

fn write_count(out: &mut Vec<u8>, count: usize) {
    let count = u32::try_from(count).unwrap_or(u32::MAX);
    out.extend_from_slice(&count.to_le_bytes());
}
