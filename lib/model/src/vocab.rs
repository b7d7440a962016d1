//! Vocabularies used by the generated quads.

pub use oxrdf::vocab::{rdf, xsd};

pub mod fx {
    //! [Facade-X](https://sparql.xyz/facade-x/ns/) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://sparql.xyz/facade-x/ns/";

    /// The root container of a Facade-X data source, here: a table.
    pub const ROOT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://sparql.xyz/facade-x/ns/root");
}

pub mod xyz {
    //! The Facade-X data namespace, used for attribute predicates and as the default base IRI.

    pub const NAMESPACE: &str = "http://sparql.xyz/facade-x/data/";
}

pub mod geo {
    //! [GeoSPARQL](http://www.opengis.net/ont/geosparql#) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.opengis.net/ont/geosparql#";

    pub const FEATURE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#Feature");
    pub const GEOMETRY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#Geometry");
    pub const HAS_DEFAULT_GEOMETRY: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#hasDefaultGeometry");
    pub const HAS_BOUNDING_BOX: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#hasBoundingBox");
    pub const HAS_CENTROID: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#hasCentroid");
    pub const HAS_METRIC_LENGTH: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#hasMetricLength");
    pub const HAS_METRIC_AREA: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#hasMetricArea");
    pub const AS_WKT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#asWKT");
    pub const WKT_LITERAL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#wktLiteral");
    pub const AS_GEO_JSON: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#asGeoJSON");
    pub const GEO_JSON_LITERAL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/geosparql#geoJSONLiteral");
}

pub mod sf {
    //! [Simple Features](http://www.opengis.net/ont/sf#) vocabulary.
    use oxrdf::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.opengis.net/ont/sf#";

    pub const ENVELOPE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/sf#Envelope");
    pub const POINT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.opengis.net/ont/sf#Point");
}

/// Returns the `rdf:_<index>` container membership property.
pub fn rdf_member(index: u64) -> oxrdf::NamedNode {
    oxrdf::NamedNode::new_unchecked(format!(
        "http://www.w3.org/1999/02/22-rdf-syntax-ns#_{index}"
    ))
}

/// The prefixes that serializers may use to abbreviate the generated IRIs.
pub const PREFIXES: [(&str, &str); 6] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("fx", fx::NAMESPACE),
    ("xyz", xyz::NAMESPACE),
    ("geo", geo::NAMESPACE),
    ("sf", sf::NAMESPACE),
];
