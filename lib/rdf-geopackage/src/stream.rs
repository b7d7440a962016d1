//! Exposes a [QuadSource] as a pull-based stream with backpressure.

use crate::context::GenerationContext;
use crate::crs::{CrsResolver, ProjectionCatalog};
use crate::error::{StreamError, StreamFailure};
use crate::generator::{QuadGenerator, QuadSource};
use futures::Stream;
use rdf_geopackage_common::SourceStore;
use rdf_geopackage_model::Quad;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The state of a [QuadStream].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// The source store is being opened.
    Constructing,
    /// Waiting for the first pull.
    Idle,
    /// Quads are handed to the consumer.
    Draining,
    /// The consumer is saturated. Nothing is computed until the next pull.
    Paused,
    /// All quads have been handed out and the source is released.
    Done,
    /// The stream was aborted or failed. The source is released.
    Destroyed,
}

/// Whether a [QuadSink] takes more quads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Demand {
    More,
    Saturated,
}

/// A consumer of quads that may ask the producer to slow down.
pub trait QuadSink {
    /// Takes a quad and tells whether more quads are welcome right now.
    fn push(&mut self, quad: Quad) -> io::Result<Demand>;

    /// Called once after the last quad.
    fn finish(&mut self) -> io::Result<()>;
}

impl QuadSink for Vec<Quad> {
    fn push(&mut self, quad: Quad) -> io::Result<Demand> {
        Vec::push(self, quad);
        Ok(Demand::More)
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Drives a [QuadSource] on behalf of a consumer.
///
/// Quads are only computed while the consumer wants them: [QuadStream::read] stops advancing the
/// source as soon as the sink reports [Demand::Saturated], and a later call resumes where it
/// stopped. The stream is also a [futures::Stream] that computes one quad per poll.
///
/// The source is released exactly once, when the stream is done, fails, is destroyed or dropped.
/// If releasing fails after another error, the other error is reported and the release error is
/// attached to it.
///
/// ```
/// use rdf_geopackage::stream::{QuadStream, StreamState};
/// use rdf_geopackage::{ConversionOptions, CrsResolver, StrategyRegistry};
/// use rdf_geopackage::storage::memory::{MemSourceStore, MemTable};
/// use rdf_geopackage::common::Row;
///
/// # tokio_test::block_on(async {
/// let store = MemSourceStore::new().with_table(MemTable::attributes(
///     "people",
///     [Row::from_iter([("name", "Alice")])],
/// ));
/// let context = ConversionOptions::default().into_context(&StrategyRegistry::with_defaults())?;
/// let mut stream = QuadStream::open(store, context, &mut CrsResolver::offline()).await?;
///
/// let mut quads = Vec::new();
/// assert_eq!(stream.read(&mut quads)?, StreamState::Done);
/// assert_eq!(quads.len(), 3);
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// # }).unwrap();
/// ```
pub struct QuadStream<S: QuadSource> {
    source: S,
    state: StreamState,
}

impl<S: SourceStore> QuadStream<QuadGenerator<S>> {
    /// Resolves the projections the run needs and creates a stream over the quads of `store`.
    ///
    /// If this fails, the store is closed before the error is returned.
    pub async fn open(
        mut store: S,
        context: GenerationContext,
        resolver: &mut CrsResolver,
    ) -> Result<Self, StreamError> {
        tracing::trace!("Stream state: {:?}", StreamState::Constructing);
        match ProjectionCatalog::prepare(&store, &context, resolver).await {
            Ok(catalog) => Ok(Self::new(QuadGenerator::new(store, context, catalog))),
            Err(error) => {
                let error = StreamError::from(error);
                Err(match store.close() {
                    Ok(()) => error,
                    Err(release) => error.with_release_failure(release.into()),
                })
            }
        }
    }
}

impl<S: QuadSource> QuadStream<S> {
    pub fn new(source: S) -> Self {
        let mut stream = Self {
            source,
            state: StreamState::Constructing,
        };
        stream.transition(StreamState::Idle);
        stream
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Hands quads to `sink` until it is saturated or the source is exhausted.
    ///
    /// Returns the state the stream ends up in: [StreamState::Paused] if the sink asked to slow
    /// down, [StreamState::Done] once all quads are handed out and the sink is finished. Reading
    /// a done or destroyed stream does nothing.
    pub fn read(&mut self, sink: &mut impl QuadSink) -> Result<StreamState, StreamError> {
        if matches!(self.state, StreamState::Done | StreamState::Destroyed) {
            return Ok(self.state);
        }
        self.transition(StreamState::Draining);
        loop {
            let quad = match self.source.advance() {
                Ok(Some(quad)) => quad,
                Ok(None) => return self.complete(sink),
                Err(error) => return Err(self.fail(error.into())),
            };
            match sink.push(quad) {
                Ok(Demand::More) => (),
                Ok(Demand::Saturated) => {
                    self.transition(StreamState::Paused);
                    return Ok(self.state);
                }
                Err(error) => return Err(self.fail(error.into())),
            }
        }
    }

    /// Releases the source and moves to [StreamState::Destroyed]. Idempotent.
    pub fn destroy(&mut self) -> Result<(), StreamError> {
        if self.state == StreamState::Destroyed {
            return Ok(());
        }
        self.transition(StreamState::Destroyed);
        self.source
            .release()
            .map_err(|error| StreamFailure::Release(error).into())
    }

    fn complete(&mut self, sink: &mut impl QuadSink) -> Result<StreamState, StreamError> {
        if let Err(error) = sink.finish() {
            return Err(self.fail(error.into()));
        }
        if let Err(error) = self.source.release() {
            self.transition(StreamState::Destroyed);
            return Err(StreamFailure::Release(error).into());
        }
        self.transition(StreamState::Done);
        Ok(self.state)
    }

    /// Destroys the stream after `failure`, attaching a release error if there is one.
    fn fail(&mut self, failure: StreamFailure) -> StreamError {
        let error = StreamError::from(failure);
        self.transition(StreamState::Destroyed);
        match self.source.release() {
            Ok(()) => error,
            Err(release) => error.with_release_failure(release),
        }
    }

    fn transition(&mut self, state: StreamState) {
        if self.state != state {
            tracing::trace!("Stream state: {:?} -> {state:?}", self.state);
            self.state = state;
        }
    }
}

impl<S: QuadSource + Unpin> Stream for QuadStream<S> {
    type Item = Result<Quad, StreamError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if matches!(this.state, StreamState::Done | StreamState::Destroyed) {
            return Poll::Ready(None);
        }
        this.transition(StreamState::Draining);
        Poll::Ready(match this.source.advance() {
            Ok(Some(quad)) => {
                this.transition(StreamState::Paused);
                Some(Ok(quad))
            }
            Ok(None) => match this.source.release() {
                Ok(()) => {
                    this.transition(StreamState::Done);
                    None
                }
                Err(error) => {
                    this.transition(StreamState::Destroyed);
                    Some(Err(StreamFailure::Release(error).into()))
                }
            },
            Err(error) => Some(Err(this.fail(error.into()))),
        })
    }
}

impl<S: QuadSource> Drop for QuadStream<S> {
    fn drop(&mut self) {
        if self.state == StreamState::Done {
            return;
        }
        if let Err(error) = self.destroy() {
            tracing::warn!("Failed to release the source: {error}");
        }
    }
}
