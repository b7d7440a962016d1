//! Serialization of generated quads.

use crate::stream::{Demand, QuadSink};
pub use oxrdfio::{RdfFormat, RdfSerializer, WriterQuadSerializer};
use rdf_geopackage_model::vocab::PREFIXES;
use rdf_geopackage_model::{GraphName, IriParseError, Quad};
use std::io::{self, Write};
use std::path::Path;

/// Moves `quad` into the default graph if `format` cannot represent named graphs.
///
/// Subject, predicate and object are kept as they are.
pub fn merge_graph(mut quad: Quad, format: RdfFormat) -> Quad {
    if !format.supports_datasets() {
        quad.graph_name = GraphName::DefaultGraph;
    }
    quad
}

/// Guesses the format from a file name, e.g., `out.ttl` or `out.nq.gz`.
///
/// A trailing `.gz` is ignored.
pub fn format_from_path(path: &Path) -> Option<RdfFormat> {
    let name = path.file_name()?.to_str()?;
    let name = name.strip_suffix(".gz").unwrap_or(name);
    let (_, extension) = name.rsplit_once('.')?;
    RdfFormat::from_extension(extension)
}

/// Looks up a format by extension (`ttl`) or media type (`text/turtle`).
pub fn format_from_name(name: &str) -> Option<RdfFormat> {
    RdfFormat::from_extension(name).or_else(|| RdfFormat::from_media_type(name))
}

/// Whether the path asks for gzip compressed output.
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
}

/// A serializer for `format` that knows the prefixes of the generated vocabularies.
pub fn serializer(format: RdfFormat) -> Result<RdfSerializer, IriParseError> {
    PREFIXES
        .iter()
        .try_fold(RdfSerializer::from_format(format), |serializer, (name, iri)| {
            serializer.with_prefix(*name, *iri)
        })
}

/// A [QuadSink] that serializes quads into a writer.
///
/// Graphs are merged if the format has no named graphs. The sink reports [Demand::Saturated]
/// every `high_water_mark` quads.
pub struct SerializerSink<W: Write> {
    format: RdfFormat,
    serializer: Option<WriterQuadSerializer<W>>,
    high_water_mark: usize,
    pending: usize,
    written: u64,
    writer: Option<W>,
}

impl<W: Write> SerializerSink<W> {
    /// The default number of quads between two flushes.
    pub const DEFAULT_HIGH_WATER_MARK: usize = 1024;

    pub fn new(format: RdfFormat, writer: W) -> io::Result<Self> {
        let serializer = serializer(format)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?;
        Ok(Self {
            format,
            serializer: Some(serializer.for_writer(writer)),
            high_water_mark: Self::DEFAULT_HIGH_WATER_MARK,
            pending: 0,
            written: 0,
            writer: None,
        })
    }

    #[must_use]
    pub fn with_high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.high_water_mark = high_water_mark.max(1);
        self
    }

    pub fn format(&self) -> RdfFormat {
        self.format
    }

    /// The number of quads serialized so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns the writer once the sink is finished.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }

    fn serializer(&mut self) -> io::Result<&mut WriterQuadSerializer<W>> {
        self.serializer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "The serializer is already finished")
        })
    }
}

impl<W: Write> QuadSink for SerializerSink<W> {
    fn push(&mut self, quad: Quad) -> io::Result<Demand> {
        let quad = merge_graph(quad, self.format);
        self.serializer()?.serialize_quad(&quad)?;
        self.written += 1;
        self.pending += 1;
        if self.pending < self.high_water_mark {
            return Ok(Demand::More);
        }
        self.pending = 0;
        Ok(Demand::Saturated)
    }

    fn finish(&mut self) -> io::Result<()> {
        if let Some(serializer) = self.serializer.take() {
            let mut writer = serializer.finish()?;
            writer.flush()?;
            self.writer = Some(writer);
        }
        Ok(())
    }
}
