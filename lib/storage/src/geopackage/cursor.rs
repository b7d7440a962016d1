//! Lazy cursors over the rows of a GeoPackage table.
//!
//! A cursor does not hold an open SQLite statement between pages. It remembers the key of the last
//! row it returned and fetches the next page with a fresh query (keyset pagination). This way it
//! only shares the connection with its store and can be dropped at any time.

use super::geometry::decode_geometry;
use super::schema::{quote, PageKey, TableLayout};
use super::{sql_error, SharedConnection};
use geo::BoundingRect;
use rdf_geopackage_common::{Feature, FeatureGeometry, Row, SourceError, SourceResult};
use rdf_geopackage_model::BoundingBox;
use rusqlite::params;
use std::collections::VecDeque;
use std::sync::Arc;

/// The number of rows that are fetched per query.
pub(crate) const PAGE_SIZE: usize = 512;

/// How the features of a page are filtered.
#[derive(Debug, Clone, Copy)]
enum SpatialFilter {
    None,
    /// The R-tree index is joined in the query.
    RTree(BoundingBox),
    /// The envelope of each decoded geometry is compared with the box.
    Envelope(BoundingBox),
}

/// A cursor over the rows of a table, with their geometry if the table has one.
pub(crate) struct PagedCursor {
    connection: SharedConnection,
    layout: Arc<TableLayout>,
    first_page: String,
    next_page: String,
    filter: SpatialFilter,
    /// The key of the last returned row, [None] before the first page.
    last_key: Option<i64>,
    buffer: VecDeque<(Row, Option<FeatureGeometry>)>,
    exhausted: bool,
}

impl PagedCursor {
    pub(crate) fn new(
        connection: SharedConnection,
        layout: Arc<TableLayout>,
        bounding_box: Option<&BoundingBox>,
    ) -> Self {
        let filter = match (bounding_box, &layout.geometry_column, &layout.rtree) {
            (Some(bounding_box), Some(_), Some(_)) => SpatialFilter::RTree(*bounding_box),
            (Some(bounding_box), Some(_), None) => SpatialFilter::Envelope(*bounding_box),
            _ => SpatialFilter::None,
        };
        let use_rtree = matches!(filter, SpatialFilter::RTree(_));
        let first_page = page_query(&layout, use_rtree, false);
        let next_page = page_query(&layout, use_rtree, true);
        Self {
            connection,
            layout,
            first_page,
            next_page,
            filter,
            last_key: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> SourceResult<()> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SourceError::other("the GeoPackage connection lock is poisoned"))?;
        let connection = guard.as_ref().ok_or(SourceError::Closed)?;
        let sql = if self.last_key.is_some() {
            &self.next_page
        } else {
            &self.first_page
        };
        let mut statement = connection.prepare_cached(sql).map_err(sql_error)?;
        // The box is always bound to ?2 to ?5, so ?1 stays a slot even on the first page.
        let mut rows = match (self.filter, self.last_key) {
            (SpatialFilter::RTree(bbox), last_key) => statement.query(params![
                last_key,
                bbox.west,
                bbox.east,
                bbox.south,
                bbox.north
            ]),
            (SpatialFilter::None | SpatialFilter::Envelope(_), Some(last_key)) => {
                statement.query(params![last_key])
            }
            (SpatialFilter::None | SpatialFilter::Envelope(_), None) => statement.query([]),
        }
        .map_err(sql_error)?;

        let mut fetched = 0;
        while let Some(row) = rows.next().map_err(sql_error)? {
            fetched += 1;
            self.last_key = Some(row.get(0).map_err(sql_error)?);
            let mut values = Vec::with_capacity(self.layout.columns.len());
            for (index, column) in self.layout.columns.iter().enumerate() {
                let value = row.get_ref(index + 1).map_err(sql_error)?;
                values.push((column.name.clone(), column.kind.decode(value)));
            }
            let geometry = if self.layout.geometry_column.is_some() {
                let value = row
                    .get_ref(self.layout.columns.len() + 1)
                    .map_err(sql_error)?;
                Some(decode_geometry(value))
            } else {
                None
            };
            if let (SpatialFilter::Envelope(bbox), Some(geometry)) = (&self.filter, &geometry) {
                if !envelope_intersects(geometry, bbox) {
                    continue;
                }
            }
            self.buffer.push_back((Row::new(values), geometry));
        }
        if fetched < PAGE_SIZE {
            self.exhausted = true;
        }
        Ok(())
    }
}

impl Iterator for PagedCursor {
    type Item = SourceResult<(Row, Option<FeatureGeometry>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.exhausted {
                return None;
            }
            if let Err(error) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(error));
            }
        }
    }
}

/// A cursor that only yields the attributes of each row.
pub(crate) fn rows(cursor: PagedCursor) -> impl Iterator<Item = SourceResult<Row>> + Send {
    cursor.map(|entry| entry.map(|(row, _)| row))
}

/// A cursor that yields features. Rows without a geometry column yield [FeatureGeometry::Missing].
pub(crate) fn features(cursor: PagedCursor) -> impl Iterator<Item = SourceResult<Feature>> + Send {
    cursor.map(|entry| {
        entry.map(|(row, geometry)| Feature::new(row, geometry.unwrap_or(FeatureGeometry::Missing)))
    })
}

/// Features without a decodable geometry have no envelope and never match a filter.
fn envelope_intersects(geometry: &FeatureGeometry, bbox: &BoundingBox) -> bool {
    geometry
        .as_valid()
        .and_then(|geometry| geometry.bounding_rect())
        .is_some_and(|rect| {
            bbox.intersects(&BoundingBox::new(
                rect.min().x,
                rect.min().y,
                rect.max().x,
                rect.max().y,
            ))
        })
}

/// Builds the query for one page. Pages after the first only return keys greater than `?1`.
fn page_query(layout: &TableLayout, use_rtree: bool, after_key: bool) -> String {
    let table = quote(&layout.info.name);
    let key = match &layout.key {
        PageKey::Column(column) => format!("t.{}", quote(column)),
        PageKey::RowId => "t.rowid".to_owned(),
    };
    let mut selection = vec![key.clone()];
    selection.extend(
        layout
            .columns
            .iter()
            .map(|column| format!("t.{}", quote(&column.name))),
    );
    if let Some(geometry_column) = &layout.geometry_column {
        selection.push(format!("t.{}", quote(geometry_column)));
    }

    let mut clauses = vec![format!("SELECT {} FROM {table} AS t", selection.join(", "))];
    let mut predicates = Vec::new();
    if let (Some(rtree), true) = (&layout.rtree, use_rtree) {
        clauses.push(format!("JOIN {} AS r ON r.id = {key}", quote(rtree)));
        predicates.push(
            "r.maxx >= ?2 AND r.minx <= ?3 AND r.maxy >= ?4 AND r.miny <= ?5".to_owned(),
        );
    }
    if after_key {
        predicates.push(format!("{key} > ?1"));
    }
    if !predicates.is_empty() {
        clauses.push(format!("WHERE {}", predicates.join(" AND ")));
    }
    clauses.push(format!("ORDER BY {key} LIMIT {PAGE_SIZE}"));
    clauses.join(" ")
}
