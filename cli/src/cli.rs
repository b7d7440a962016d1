use clap::{ArgAction, Parser, ValueHint};
use rdf_geopackage::crs::DEFAULT_EPSG_REGISTRY;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about, version, name = "rdf-geopackage")]
/// Converts the tables of a GeoPackage into RDF
pub struct Args {
    /// The GeoPackage to convert
    ///
    /// If no file is given, stdin is read.
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,
    /// File to write the quads to
    ///
    /// If no file is given, stdout is written. A ".gz" suffix compresses the output.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
    /// The format of the output
    ///
    /// It can be an extension like "nt" or a MIME type like "application/n-triples".
    ///
    /// By default the format is guessed from the output file extension, falling back to N-Quads.
    #[arg(long)]
    pub format: Option<String>,
    /// Only convert the features within this bounding box
    ///
    /// Four numbers "west,south,east,north". The legacy order "west east south north" with
    /// spaces is accepted as well.
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: Option<String>,
    /// The coordinate reference system of --bbox
    ///
    /// An EPSG code like "EPSG:28992", a PROJ string or a WKT definition.
    #[arg(long, default_value = "EPSG:4326")]
    pub bbox_crs: String,
    /// Only convert the given tables
    ///
    /// By default all tables are converted.
    ///
    /// Can be given more than once.
    #[arg(long)]
    pub only_layers: Vec<String>,
    /// The IRI the table and row IRIs are built from
    #[arg(long, value_hint = ValueHint::Url)]
    pub base_iri: Option<String>,
    /// The model that maps table rows to RDF
    #[arg(long)]
    pub model: Option<String>,
    /// A GeoSPARQL serialization of the geometries
    ///
    /// Can be given more than once.
    #[arg(long)]
    pub geosparql: Vec<String>,
    /// Also convert BLOB values to base64 literals
    #[arg(long)]
    pub include_binary_values: bool,
    /// Print the extent of the GeoPackage in WGS84 and exit
    #[arg(long, conflicts_with_all = ["output", "format"])]
    pub print_extent: bool,
    /// Where unknown EPSG codes are fetched from
    ///
    /// "{code}" is replaced by the numeric code.
    #[arg(long, env = "RDF_GEOPACKAGE_EPSG_REGISTRY", default_value = DEFAULT_EPSG_REGISTRY, value_hint = ValueHint::Url)]
    pub epsg_registry: String,
    /// Log more, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
