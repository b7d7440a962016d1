//! Generic models: how the rows of a table are mapped to quads.
//!
//! Exactly one generic model is active per run. It decides the node of each table and row and
//! the quads that describe the attributes of a row. Geometries are handled separately by the
//! [geometry strategies](crate::geometry).

mod facade_x;

pub use facade_x::{FacadeX, RowSubjects};

use rdf_geopackage_common::{BlankNodeFactory, Row, TableInfo};
use rdf_geopackage_model::{mint_iri, Iri, MintIriError, NamedNode, Quad, Subject};

/// A strategy that maps the rows of a table to quads.
pub trait TabularModel: Send + Sync {
    /// The id under which the model is registered.
    fn id(&self) -> &'static str;

    /// Returns the node that stands for a table. It is also the graph of all quads of the table.
    fn table_node(
        &self,
        table: &TableInfo,
        base_iri: &Iri<String>,
    ) -> Result<NamedNode, MintIriError> {
        mint_iri(base_iri, &table.name)
    }

    /// Returns the subject of a row.
    fn row_subject(
        &self,
        row: &RowContext<'_>,
        blank_nodes: &mut BlankNodeFactory,
    ) -> Result<Subject, MintIriError>;

    /// Appends the quads that place the row in its table and describe its attributes.
    fn row_quads(&self, row: &RowContext<'_>, subject: &Subject, quads: &mut Vec<Quad>);
}

/// A row and everything a [TabularModel] may need to know about it.
#[derive(Debug, Clone, Copy)]
pub struct RowContext<'a> {
    pub table: &'a TableInfo,
    /// The node returned by [TabularModel::table_node].
    pub table_node: &'a NamedNode,
    pub row: &'a Row,
    /// The position of the row in its table, starting at 1.
    pub ordinal: u64,
    pub base_iri: &'a Iri<String>,
    pub include_binary_values: bool,
}
