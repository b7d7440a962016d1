use crate::MintIriError;
use oxiri::Iri;
use oxrdf::NamedNode;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that are escaped when a name becomes a single IRI path segment.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters that are escaped when a name is appended to a namespace. Reserved IRI characters
/// are kept, so a column called `a/b` becomes `<ns>a/b`.
const LOCAL_NAME: &AsciiSet = &COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

/// Escapes `name` so that it forms exactly one path segment.
pub fn encode_component(name: &str) -> String {
    utf8_percent_encode(name, COMPONENT).to_string()
}

/// Resolves the escaped `name` against `base`, e.g., `points` against `http://example.com/data/`
/// gives `http://example.com/data/points`.
pub fn mint_iri(base: &Iri<String>, name: &str) -> Result<NamedNode, MintIriError> {
    base.resolve(&encode_component(name))
        .map(|iri| NamedNode::new_unchecked(iri.into_inner()))
        .map_err(|error| MintIriError {
            base: base.as_str().to_owned(),
            name: name.to_owned(),
            error,
        })
}

/// Appends the escaped `local_name` to a namespace IRI.
pub fn namespaced_iri(namespace: &str, local_name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!(
        "{namespace}{}",
        utf8_percent_encode(local_name, LOCAL_NAME)
    ))
}
