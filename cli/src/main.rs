#![expect(clippy::print_stderr, clippy::print_stdout, reason = "command line tool")]
use crate::cli::Args;
use anyhow::{bail, Context};
use clap::Parser;
use flate2::write::GzEncoder;
use flate2::Compression;
use rdf_geopackage::common::SourceStore;
use rdf_geopackage::io::{format_from_name, format_from_path, is_gzip_path, RdfFormat, SerializerSink};
use rdf_geopackage::model::BoundingBox;
use rdf_geopackage::storage::geopackage::GeoPackage;
use rdf_geopackage::{
    dataset_bounding_box, ConversionOptions, CrsResolver, EpsgRegistry, QuadGenerator, QuadStream,
    StrategyRegistry, StreamState,
};
use std::fs::File;
use std::io::{self, stdin, stdout, BufWriter, IsTerminal, Read, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let mut resolver =
        CrsResolver::with_fetcher(Arc::new(EpsgRegistry::new(args.epsg_registry.as_str())));

    if args.print_extent {
        let mut store = open_store(args.input.as_deref())?;
        let extent = dataset_bounding_box(&store, &mut resolver).await;
        store.close()?;
        let Some(extent) = extent? else {
            bail!("The GeoPackage has no feature table with an extent")
        };
        println!("{extent}");
        return Ok(());
    }

    let bounding_box = match &args.bbox {
        Some(literal) => {
            let bbox = BoundingBox::parse(literal)?;
            Some(
                resolver
                    .bounding_box_to_wgs84(&bbox, &args.bbox_crs)
                    .await
                    .with_context(|| format!("The bounding box CRS {} is invalid", args.bbox_crs))?,
            )
        }
        None => None,
    };
    let options = ConversionOptions {
        base_iri: args.base_iri,
        allowed_layers: (!args.only_layers.is_empty()).then_some(args.only_layers),
        bounding_box,
        include_binary_values: args.include_binary_values,
        model: args.model,
        geometry_models: args.geosparql,
        ..ConversionOptions::default()
    };
    let context = options.into_context(&StrategyRegistry::with_defaults())?;
    let format = if let Some(format) = &args.format {
        rdf_format_from_name(format)?
    } else if let Some(output) = &args.output {
        rdf_format_from_path(output)?
    } else {
        RdfFormat::NQuads
    };

    let store = open_store(args.input.as_deref())?;
    let mut stream = QuadStream::open(store, context, &mut resolver).await?;
    match &args.output {
        Some(output) => {
            let file = BufWriter::new(
                File::create(output)
                    .with_context(|| format!("Failed to create {}", output.display()))?,
            );
            if is_gzip_path(output) {
                let encoder = convert(
                    &mut stream,
                    format,
                    GzEncoder::new(file, Compression::default()),
                )?;
                close_file_writer(encoder.finish()?)?;
            } else {
                close_file_writer(convert(&mut stream, format, file)?)?;
            }
        }
        None => convert(&mut stream, format, stdout().lock())?.flush()?,
    }

    let warnings = stream.source().warnings();
    if !warnings.is_empty() && !tracing::enabled!(tracing::Level::WARN) {
        eprint!("{warnings}");
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();
}

fn open_store(input: Option<&Path>) -> anyhow::Result<GeoPackage> {
    Ok(match input {
        Some(path) => GeoPackage::open(path)
            .with_context(|| format!("Failed to open the GeoPackage {}", path.display()))?,
        None => {
            let mut bytes = Vec::new();
            stdin()
                .lock()
                .read_to_end(&mut bytes)
                .context("Failed to read the GeoPackage from stdin")?;
            GeoPackage::from_bytes(&bytes)
                .context("Failed to open the GeoPackage read from stdin")?
        }
    })
}

fn convert<S: SourceStore, W: Write>(
    stream: &mut QuadStream<QuadGenerator<S>>,
    format: RdfFormat,
    writer: W,
) -> anyhow::Result<W> {
    let mut sink = SerializerSink::new(format, writer)?;
    while stream.read(&mut sink)? == StreamState::Paused {}
    sink.into_inner()
        .context("The serialization stopped before all quads were written")
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    format_from_path(path).with_context(|| {
        format!(
            "Not able to guess the output format from the file name {}, use --format",
            path.display()
        )
    })
}

fn rdf_format_from_name(name: &str) -> anyhow::Result<RdfFormat> {
    format_from_name(name).with_context(|| format!("The file format '{name}' is unknown"))
}

fn close_file_writer(writer: BufWriter<File>) -> io::Result<()> {
    let mut file = writer
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?;
    file.flush()?;
    file.sync_all()
}
