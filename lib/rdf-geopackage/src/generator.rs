use crate::context::GenerationContext;
use crate::crs::ProjectionCatalog;
use crate::error::GenerationError;
use crate::geometry::{FeatureTableContext, GeometryNodes};
use crate::models::RowContext;
use crate::warnings::WarningCounter;
use rdf_geopackage_common::{
    BlankNodeFactory, Feature, FeatureCursor, FeatureGeometry, Row, RowCursor, SourceError,
    SourceStore, TableInfo, TableKind,
};
use rdf_geopackage_model::vocab::geo as geosparql;
use rdf_geopackage_model::vocab::rdf;
use rdf_geopackage_model::{NamedNode, Quad, Subject};
use std::collections::VecDeque;

/// A lazy, pull-based sequence of quads.
pub trait QuadSource {
    /// Computes the next quad. [None] once the sequence is exhausted.
    fn advance(&mut self) -> Result<Option<Quad>, GenerationError>;

    /// Releases the resources of the sequence. Releasing is idempotent, only the first call may
    /// fail.
    fn release(&mut self) -> Result<(), GenerationError>;
}

/// The message recorded for a feature without a geometry.
pub const MISSING_GEOMETRY: &str = "Feature has no geometry";

/// Produces the quads of all selected tables of a [SourceStore].
///
/// Attribute tables come first, then feature tables, each in the order of the store. Tables are
/// opened one at a time and rows are only read when the buffered quads of the previous row are
/// consumed.
pub struct QuadGenerator<S: SourceStore> {
    store: S,
    context: GenerationContext,
    catalog: ProjectionCatalog,
    pending: Option<VecDeque<TableInfo>>,
    current: Option<TableState>,
    buffer: VecDeque<Quad>,
    scratch: Vec<Quad>,
    blank_nodes: BlankNodeFactory,
    warnings: WarningCounter,
    advances: u64,
    exhausted: bool,
    released: bool,
}

struct TableState {
    table: TableInfo,
    node: NamedNode,
    cursor: TableCursor,
    ordinal: u64,
}

enum TableCursor {
    Rows(RowCursor),
    Features(FeatureCursor, Box<FeatureTableContext>),
}

impl<S: SourceStore> QuadGenerator<S> {
    /// Creates a generator over `store`. The catalog must hold the CRS of every selected feature
    /// table if the context [needs projections](GenerationContext::needs_projections).
    pub fn new(store: S, context: GenerationContext, catalog: ProjectionCatalog) -> Self {
        let blank_nodes = BlankNodeFactory::new(context.blank_node_mode());
        Self {
            store,
            context,
            catalog,
            pending: None,
            current: None,
            buffer: VecDeque::new(),
            scratch: Vec::new(),
            blank_nodes,
            warnings: WarningCounter::new(),
            advances: 0,
            exhausted: false,
            released: false,
        }
    }

    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    /// The recoverable problems met so far.
    pub fn warnings(&self) -> &WarningCounter {
        &self.warnings
    }

    /// How often [QuadSource::advance] has been called.
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Fills the buffer with the quads of the next row. Returns `false` once all tables are done.
    fn fill(&mut self) -> Result<bool, GenerationError> {
        loop {
            if self.current.is_none() {
                let Some(table) = self.next_table()? else {
                    return Ok(false);
                };
                self.current = Some(self.open_table(table)?);
            }
            let Some(state) = self.current.as_mut() else {
                continue;
            };
            let next = match &mut state.cursor {
                TableCursor::Rows(cursor) => cursor.next().map(|row| row.map(Item::Row)),
                TableCursor::Features(cursor, _) => {
                    cursor.next().map(|feature| feature.map(Item::Feature))
                }
            };
            let Some(item) = next.transpose()? else {
                tracing::debug!(
                    "Table '{}' done after {} rows",
                    state.table.name,
                    state.ordinal
                );
                self.current = None;
                continue;
            };
            state.ordinal += 1;
            let mut emitter = Emitter {
                context: &self.context,
                blank_nodes: &mut self.blank_nodes,
                warnings: &mut self.warnings,
                quads: &mut self.scratch,
            };
            match &item {
                Item::Row(row) => {
                    emitter.row(state, row)?;
                }
                Item::Feature(feature) => emitter.feature(state, feature)?,
            }
            self.buffer.extend(self.scratch.drain(..));
            return Ok(true);
        }
    }

    fn next_table(&mut self) -> Result<Option<TableInfo>, GenerationError> {
        if self.pending.is_none() {
            let mut tables = self.store.attribute_tables()?;
            tables.extend(self.store.feature_tables()?);
            tables.retain(|table| self.context.allows_layer(&table.name));
            self.pending = Some(tables.into());
        }
        Ok(self.pending.as_mut().and_then(VecDeque::pop_front))
    }

    fn open_table(&self, table: TableInfo) -> Result<TableState, GenerationError> {
        let node = self
            .context
            .model()
            .table_node(&table, self.context.base_iri())?;
        let cursor = match table.kind {
            TableKind::Attributes => {
                tracing::debug!("Opening attribute table '{}'", table.name);
                TableCursor::Rows(self.store.open_row_cursor(&table)?)
            }
            TableKind::Features => self.open_feature_table(&table)?,
        };
        Ok(TableState {
            table,
            node,
            cursor,
            ordinal: 0,
        })
    }

    fn open_feature_table(&self, table: &TableInfo) -> Result<TableCursor, GenerationError> {
        let srs = self.store.table_srs(table)?;
        let bounding_box = match self.context.bounding_box() {
            Some(bounding_box) if srs.is_wgs84() => Some(*bounding_box),
            Some(bounding_box) => Some(
                self.catalog
                    .from_wgs84(&srs)?
                    .transform_bounding_box(bounding_box)?,
            ),
            None => None,
        };
        tracing::debug!(
            "Opening feature table '{}' in {srs} with bounding box {bounding_box:?}",
            table.name
        );
        let cursor = self
            .store
            .open_feature_cursor(table, bounding_box.as_ref())?;
        let to_wgs84 = self.catalog.to_wgs84(&srs);
        Ok(TableCursor::Features(
            cursor,
            Box::new(FeatureTableContext::new(table.clone(), srs, to_wgs84)),
        ))
    }
}

impl<S: SourceStore> QuadSource for QuadGenerator<S> {
    fn advance(&mut self) -> Result<Option<Quad>, GenerationError> {
        if self.released {
            return Err(SourceError::Closed.into());
        }
        self.advances += 1;
        loop {
            if let Some(quad) = self.buffer.pop_front() {
                return Ok(Some(quad));
            }
            if self.exhausted {
                return Ok(None);
            }
            if !self.fill()? {
                self.exhausted = true;
                self.warnings.log_summary();
            }
        }
    }

    fn release(&mut self) -> Result<(), GenerationError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.current = None;
        self.buffer.clear();
        self.store.close()?;
        Ok(())
    }
}

enum Item {
    Row(Row),
    Feature(Feature),
}

/// Writes the quads of a single row into a scratch buffer.
struct Emitter<'a> {
    context: &'a GenerationContext,
    blank_nodes: &'a mut BlankNodeFactory,
    warnings: &'a mut WarningCounter,
    quads: &'a mut Vec<Quad>,
}

impl Emitter<'_> {
    fn row(&mut self, state: &TableState, row: &Row) -> Result<Subject, GenerationError> {
        let model = self.context.model();
        let row_context = RowContext {
            table: &state.table,
            table_node: &state.node,
            row,
            ordinal: state.ordinal,
            base_iri: self.context.base_iri(),
            include_binary_values: self.context.include_binary_values(),
        };
        let subject = model.row_subject(&row_context, self.blank_nodes)?;
        model.row_quads(&row_context, &subject, self.quads);
        Ok(subject)
    }

    fn feature(&mut self, state: &TableState, feature: &Feature) -> Result<(), GenerationError> {
        let subject = self.row(state, &feature.row)?;
        self.quads.push(Quad::new(
            subject.clone(),
            rdf::TYPE,
            geosparql::FEATURE,
            state.node.clone(),
        ));
        let TableCursor::Features(_, table) = &state.cursor else {
            return Ok(());
        };
        let geometry = match &feature.geometry {
            FeatureGeometry::Valid(geometry) => geometry,
            FeatureGeometry::Missing => {
                self.warnings.record(&state.table.name, MISSING_GEOMETRY);
                return Ok(());
            }
            FeatureGeometry::Invalid(message) => {
                self.warnings.record(&state.table.name, message.as_str());
                return Ok(());
            }
        };

        let mut shared = None;
        for strategy in self.context.geometry_models() {
            let geometry_node = if strategy.requires_separate_geometry_subject(table) {
                Subject::from(self.blank_nodes.fresh())
            } else {
                shared
                    .get_or_insert_with(|| Subject::from(self.blank_nodes.fresh()))
                    .clone()
            };
            let nodes = GeometryNodes {
                feature: &subject,
                geometry: &geometry_node,
                graph: &state.node,
            };
            let mark = self.quads.len();
            if let Err(error) = strategy.quads(geometry, &nodes, table, self.quads) {
                self.quads.truncate(mark);
                self.warnings.record(&state.table.name, error.to_string());
            }
        }
        Ok(())
    }
}
