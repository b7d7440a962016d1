//! A [SourceStore] that keeps its tables in memory.
//!
//! It is mostly used to test the quad generator without going through SQLite.

use geo::BoundingRect;
use rdf_geopackage_common::{
    Feature, FeatureCursor, Row, RowCursor, SourceError, SourceResult, SourceStore,
    SpatialReferenceSystem, TableInfo, TableKind,
};
use rdf_geopackage_model::BoundingBox;

/// An attribute or feature table held by a [MemSourceStore].
#[derive(Debug, Clone)]
pub struct MemTable {
    info: TableInfo,
    srs: Option<SpatialReferenceSystem>,
    extent: Option<BoundingBox>,
    rows: Vec<Row>,
    features: Vec<Feature>,
    failure: Option<(usize, String)>,
}

impl MemTable {
    pub fn attributes(name: impl Into<String>, rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            info: TableInfo::new(name, TableKind::Attributes),
            srs: None,
            extent: None,
            rows: rows.into_iter().collect(),
            features: Vec::new(),
            failure: None,
        }
    }

    pub fn features(
        name: impl Into<String>,
        srs: SpatialReferenceSystem,
        features: impl IntoIterator<Item = Feature>,
    ) -> Self {
        Self {
            info: TableInfo::new(name, TableKind::Features),
            srs: Some(srs),
            extent: None,
            rows: Vec::new(),
            features: features.into_iter().collect(),
            failure: None,
        }
    }

    #[must_use]
    pub fn with_id_columns(mut self, id_columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.info = self.info.with_id_columns(id_columns);
        self
    }

    /// Sets the stored extent. Without it, the extent is computed from the geometries.
    #[must_use]
    pub fn with_extent(mut self, extent: BoundingBox) -> Self {
        self.extent = Some(extent);
        self
    }

    /// Makes cursors over this table fail with `message` after `rows` rows.
    #[must_use]
    pub fn failing_after(mut self, rows: usize, message: impl Into<String>) -> Self {
        self.failure = Some((rows, message.into()));
        self
    }

    fn computed_extent(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|feature| feature.geometry.as_valid()?.bounding_rect())
            .map(|rect| BoundingBox::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
            .reduce(|a, b| a.union(&b))
    }

    fn cursor<T: Send + 'static>(
        &self,
        items: Vec<T>,
    ) -> Box<dyn Iterator<Item = SourceResult<T>> + Send> {
        match &self.failure {
            None => Box::new(items.into_iter().map(Ok)),
            Some((limit, message)) => {
                let error = message.clone();
                Box::new(
                    items
                        .into_iter()
                        .take(*limit)
                        .map(Ok)
                        .chain(std::iter::once_with(move || Err(SourceError::other(error)))),
                )
            }
        }
    }
}

/// An in-memory [SourceStore].
///
/// Tables are listed in the order they were added.
///
/// ```
/// use rdf_geopackage_common::{Row, SourceStore};
/// use rdf_geopackage_storage::memory::{MemSourceStore, MemTable};
///
/// let store = MemSourceStore::new().with_table(MemTable::attributes(
///     "people",
///     [Row::from_iter([("name", "Alice")])],
/// ));
/// assert_eq!(store.attribute_tables()?.len(), 1);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemSourceStore {
    tables: Vec<MemTable>,
    closed: bool,
    close_error: Option<String>,
}

impl MemSourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_table(mut self, table: MemTable) -> Self {
        self.tables.push(table);
        self
    }

    /// Makes [SourceStore::close] fail with the given message.
    #[must_use]
    pub fn failing_on_close(mut self, message: impl Into<String>) -> Self {
        self.close_error = Some(message.into());
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn table(&self, table: &TableInfo) -> SourceResult<&MemTable> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        self.tables
            .iter()
            .find(|candidate| candidate.info.name == table.name)
            .ok_or_else(|| SourceError::UnknownTable(table.name.clone()))
    }

    fn tables(&self, kind: TableKind) -> SourceResult<Vec<TableInfo>> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        Ok(self
            .tables
            .iter()
            .filter(|table| table.info.kind == kind)
            .map(|table| table.info.clone())
            .collect())
    }
}

impl SourceStore for MemSourceStore {
    fn attribute_tables(&self) -> SourceResult<Vec<TableInfo>> {
        self.tables(TableKind::Attributes)
    }

    fn feature_tables(&self) -> SourceResult<Vec<TableInfo>> {
        self.tables(TableKind::Features)
    }

    fn open_row_cursor(&self, table: &TableInfo) -> SourceResult<RowCursor> {
        let table = self.table(table)?;
        let rows = match table.info.kind {
            TableKind::Attributes => table.rows.clone(),
            TableKind::Features => table
                .features
                .iter()
                .map(|feature| feature.row.clone())
                .collect(),
        };
        Ok(table.cursor(rows))
    }

    fn open_feature_cursor(
        &self,
        table: &TableInfo,
        bounding_box: Option<&BoundingBox>,
    ) -> SourceResult<FeatureCursor> {
        let table = self.table(table)?;
        let features = table
            .features
            .iter()
            .filter(|feature| {
                let Some(bounding_box) = bounding_box else {
                    return true;
                };
                feature
                    .geometry
                    .as_valid()
                    .and_then(|geometry| geometry.bounding_rect())
                    .is_some_and(|rect| {
                        bounding_box.intersects(&BoundingBox::new(
                            rect.min().x,
                            rect.min().y,
                            rect.max().x,
                            rect.max().y,
                        ))
                    })
            })
            .cloned()
            .collect();
        Ok(table.cursor(features))
    }

    fn table_srs(&self, table: &TableInfo) -> SourceResult<SpatialReferenceSystem> {
        let table = self.table(table)?;
        table.srs.clone().ok_or_else(|| {
            SourceError::other(format!("Table '{}' is not a feature table", table.info.name))
        })
    }

    fn table_extent(&self, table: &TableInfo) -> SourceResult<Option<BoundingBox>> {
        let table = self.table(table)?;
        Ok(table.extent.or_else(|| table.computed_extent()))
    }

    fn close(&mut self) -> SourceResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.close_error.take() {
            Some(message) => Err(SourceError::other(message)),
            None => Ok(()),
        }
    }
}
