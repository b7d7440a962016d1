//! Reads [OGC GeoPackage](https://www.geopackage.org/) files.

mod cursor;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
mod geometry;
mod schema;

use rdf_geopackage_common::{
    CorruptionError, FeatureCursor, RowCursor, SourceError, SourceResult, SourceStore,
    SpatialReferenceSystem, TableInfo, TableKind,
};
use rdf_geopackage_model::BoundingBox;
use rusqlite::{Connection, OpenFlags};
use schema::TableLayout;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

pub(crate) type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// A GeoPackage that is opened read-only.
///
/// The table metadata is read once when the package is opened. Cursors share the connection with
/// the package and fail with [SourceError::Closed] once the package is closed.
pub struct GeoPackage {
    connection: SharedConnection,
    layouts: Vec<Arc<TableLayout>>,
    /// Keeps a spooled in-memory input alive for as long as the package is open.
    spool: Option<NamedTempFile>,
}

impl GeoPackage {
    /// Opens the GeoPackage at the given path.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        tracing::debug!("Opening GeoPackage {}", path.display());
        let connection = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(sql_error)?;
        let layouts = schema::load_layouts(&connection)?
            .into_iter()
            .map(Arc::new)
            .collect::<Vec<_>>();
        tracing::debug!("Found {} tables in {}", layouts.len(), path.display());
        Ok(Self {
            connection: Arc::new(Mutex::new(Some(connection))),
            layouts,
            spool: None,
        })
    }

    /// Opens a GeoPackage that is held in memory, e.g., one read from standard input.
    ///
    /// SQLite can only open files, so the bytes are written to a temporary file first. The file
    /// is deleted when the package is closed or dropped.
    pub fn from_bytes(bytes: &[u8]) -> SourceResult<Self> {
        let mut spool = NamedTempFile::new()?;
        spool.write_all(bytes)?;
        spool.flush()?;
        let mut package = Self::open(spool.path())?;
        package.spool = Some(spool);
        Ok(package)
    }

    fn layout(&self, table: &TableInfo) -> SourceResult<&Arc<TableLayout>> {
        self.layouts
            .iter()
            .find(|layout| layout.info.name == table.name)
            .ok_or_else(|| SourceError::UnknownTable(table.name.clone()))
    }

    fn tables(&self, kind: TableKind) -> Vec<TableInfo> {
        self.layouts
            .iter()
            .filter(|layout| layout.info.kind == kind)
            .map(|layout| layout.info.clone())
            .collect()
    }

    fn ensure_open(&self) -> SourceResult<()> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SourceError::other("the GeoPackage connection lock is poisoned"))?;
        if guard.is_some() {
            Ok(())
        } else {
            Err(SourceError::Closed)
        }
    }
}

impl SourceStore for GeoPackage {
    fn attribute_tables(&self) -> SourceResult<Vec<TableInfo>> {
        self.ensure_open()?;
        Ok(self.tables(TableKind::Attributes))
    }

    fn feature_tables(&self) -> SourceResult<Vec<TableInfo>> {
        self.ensure_open()?;
        Ok(self.tables(TableKind::Features))
    }

    fn open_row_cursor(&self, table: &TableInfo) -> SourceResult<RowCursor> {
        self.ensure_open()?;
        let layout = Arc::clone(self.layout(table)?);
        Ok(Box::new(cursor::rows(cursor::PagedCursor::new(
            Arc::clone(&self.connection),
            layout,
            None,
        ))))
    }

    fn open_feature_cursor(
        &self,
        table: &TableInfo,
        bounding_box: Option<&BoundingBox>,
    ) -> SourceResult<FeatureCursor> {
        self.ensure_open()?;
        let layout = Arc::clone(self.layout(table)?);
        Ok(Box::new(cursor::features(cursor::PagedCursor::new(
            Arc::clone(&self.connection),
            layout,
            bounding_box,
        ))))
    }

    fn table_srs(&self, table: &TableInfo) -> SourceResult<SpatialReferenceSystem> {
        let layout = self.layout(table)?;
        layout.srs.clone().ok_or_else(|| {
            SourceError::other(format!("Table '{}' is not a feature table", table.name))
        })
    }

    fn table_extent(&self, table: &TableInfo) -> SourceResult<Option<BoundingBox>> {
        Ok(self.layout(table)?.extent)
    }

    fn close(&mut self) -> SourceResult<()> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| SourceError::other("the GeoPackage connection lock is poisoned"))?
            .take();
        if let Some(connection) = connection {
            tracing::debug!("Closing GeoPackage");
            connection.close().map_err(|(_, error)| sql_error(error))?;
        }
        if let Some(spool) = self.spool.take() {
            spool.close()?;
        }
        Ok(())
    }
}

/// Converts a SQLite error into a [SourceError].
pub(crate) fn sql_error(error: rusqlite::Error) -> SourceError {
    if matches!(
        error.sqlite_error_code(),
        Some(rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt)
    ) {
        CorruptionError::new(error).into()
    } else {
        SourceError::other(error)
    }
}
