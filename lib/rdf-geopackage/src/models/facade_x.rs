use super::{RowContext, TabularModel};
use rdf_geopackage_common::BlankNodeFactory;
use rdf_geopackage_model::vocab::{fx, rdf, rdf_member, xyz};
use rdf_geopackage_model::{
    mint_iri, namespaced_iri, value_to_literal, MintIriError, NamedNode, Quad, Subject,
};

/// How [FacadeX] identifies rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSubjects {
    /// Every row is a fresh blank node.
    BlankNodes,
    /// Every row is an IRI minted from the table name and the first identifier column, or the
    /// row ordinal if the table has none.
    Iris,
}

/// The [Facade-X](https://sparql.xyz/facade-x/) model.
///
/// A table is a `fx:root` container whose rows are its members. Attributes become properties
/// in the `xyz:` namespace.
///
/// ```text
/// <base/table> a fx:root ;
///     rdf:_1 _:row1 .
/// _:row1 xyz:name "Utrecht" ;
///     xyz:population 361924 .
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FacadeX {
    subjects: RowSubjects,
}

impl FacadeX {
    pub const fn new(subjects: RowSubjects) -> Self {
        Self { subjects }
    }

    pub fn subjects(&self) -> RowSubjects {
        self.subjects
    }

    fn row_iri(&self, row: &RowContext<'_>) -> Result<NamedNode, MintIriError> {
        let identifier = row
            .table
            .id_columns
            .first()
            .and_then(|column| row.row.get(column))
            .and_then(|value| value.to_identifier());
        let local_name = format!(
            "{}_{}",
            row.table.name,
            identifier.unwrap_or_else(|| row.ordinal.to_string())
        );
        mint_iri(row.base_iri, &local_name)
    }
}

impl Default for FacadeX {
    fn default() -> Self {
        Self::new(RowSubjects::BlankNodes)
    }
}

impl TabularModel for FacadeX {
    fn id(&self) -> &'static str {
        match self.subjects {
            RowSubjects::BlankNodes => "facade-x",
            RowSubjects::Iris => "facade-x-iri",
        }
    }

    fn row_subject(
        &self,
        row: &RowContext<'_>,
        blank_nodes: &mut BlankNodeFactory,
    ) -> Result<Subject, MintIriError> {
        Ok(match self.subjects {
            RowSubjects::BlankNodes => blank_nodes.fresh().into(),
            RowSubjects::Iris => self.row_iri(row)?.into(),
        })
    }

    fn row_quads(&self, row: &RowContext<'_>, subject: &Subject, quads: &mut Vec<Quad>) {
        let graph = row.table_node;
        quads.push(Quad::new(graph.clone(), rdf::TYPE, fx::ROOT, graph.clone()));
        quads.push(Quad::new(
            graph.clone(),
            rdf_member(row.ordinal),
            subject.clone(),
            graph.clone(),
        ));
        for (column, value) in &row.row.values {
            if let Some(literal) = value_to_literal(value, row.include_binary_values) {
                quads.push(Quad::new(
                    subject.clone(),
                    namespaced_iri(xyz::NAMESPACE, column),
                    literal,
                    graph.clone(),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdf_geopackage_common::{BlankNodeMode, Row, TableInfo, TableKind};
    use rdf_geopackage_model::vocab::xsd;
    use rdf_geopackage_model::{GraphName, Iri, Literal, SourceValue, Term};

    fn base() -> Iri<String> {
        Iri::parse("http://example.com/data/".to_owned()).unwrap()
    }

    fn quads_for(model: &FacadeX, table: &TableInfo, row: &Row, ordinal: u64) -> Vec<Quad> {
        let base = base();
        let table_node = model.table_node(table, &base).unwrap();
        let context = RowContext {
            table,
            table_node: &table_node,
            row,
            ordinal,
            base_iri: &base,
            include_binary_values: false,
        };
        let mut blank_nodes = BlankNodeFactory::new(BlankNodeMode::Sequential);
        let subject = model.row_subject(&context, &mut blank_nodes).unwrap();
        let mut quads = Vec::new();
        model.row_quads(&context, &subject, &mut quads);
        quads
    }

    #[test]
    fn table_node_is_escaped_and_resolved() {
        let table = TableInfo::new("my table", TableKind::Attributes);
        assert_eq!(
            FacadeX::default().table_node(&table, &base()).unwrap().as_str(),
            "http://example.com/data/my%20table"
        );
    }

    #[test]
    fn rows_are_container_members() {
        let table = TableInfo::new("cities", TableKind::Attributes);
        let row = Row::from_iter([
            ("name", SourceValue::from("Utrecht")),
            ("mayor", SourceValue::Null),
            ("population", SourceValue::Integer(361_924)),
        ]);
        let quads = quads_for(&FacadeX::default(), &table, &row, 3);
        let graph = NamedNode::new_unchecked("http://example.com/data/cities");

        assert_eq!(quads.len(), 4);
        assert_eq!(
            quads[0],
            Quad::new(graph.clone(), rdf::TYPE, fx::ROOT, graph.clone())
        );
        assert_eq!(quads[1].predicate.as_str(), "http://www.w3.org/1999/02/22-rdf-syntax-ns#_3");
        assert!(matches!(quads[1].object, Term::BlankNode(_)));
        assert_eq!(
            quads[3].predicate.as_str(),
            "http://sparql.xyz/facade-x/data/population"
        );
        assert_eq!(
            quads[3].object,
            Term::from(Literal::new_typed_literal("361924", xsd::INTEGER))
        );
        assert!(quads
            .iter()
            .all(|quad| quad.graph_name == GraphName::from(graph.clone())));
    }

    #[test]
    fn iri_subjects_use_the_first_id_column() {
        let model = FacadeX::new(RowSubjects::Iris);
        let table = TableInfo::new("cities", TableKind::Attributes).with_id_columns(["fid"]);
        let row = Row::from_iter([("fid", 7_i64)]);
        let quads = quads_for(&model, &table, &row, 1);
        assert_eq!(
            quads[1].object,
            Term::from(NamedNode::new_unchecked("http://example.com/data/cities_7"))
        );
    }

    #[test]
    fn iri_subjects_fall_back_to_the_ordinal() {
        let model = FacadeX::new(RowSubjects::Iris);
        let table = TableInfo::new("cities", TableKind::Attributes);
        let quads = quads_for(&model, &table, &Row::default(), 12);
        assert_eq!(
            quads[1].object,
            Term::from(NamedNode::new_unchecked("http://example.com/data/cities_12"))
        );
    }
}
