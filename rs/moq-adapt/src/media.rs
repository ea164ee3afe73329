//! The media pipeline collaborator.
//!
//! Pipelines are built from a declarative description (ex. a `gst-launch` string) by a [Backend].
//! Instead of registering callbacks, [Pipeline::start] is given a channel and every buffer,
//! end-of-stream and error is delivered on it as a [PipelineEvent].

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::Error;

/// Synthetic 720p test video encoded with x264 into matroska.
pub const VIDEO_TEST_SOURCE: &str = "videotestsrc ! video/x-raw,width=1280,height=720 ! clocksync ! x264enc name=encoder pass=5 speed-preset=4 tune=4 bitrate=1000 ! matroskamux ! appsink name=appsink";

/// Decodes matroska video and renders it.
pub const VIDEO_SINK: &str = "appsrc name=src ! matroskademux ! decodebin ! videoconvert ! autovideosink";

/// Something that happened inside a running pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineEvent {
	/// A buffer was produced by the pipeline's sink.
	Buffer(Bytes),

	/// The pipeline reached the end of the stream.
	Eos,

	/// The pipeline failed.
	Error(String),
}

/// A single running (or runnable) pipeline.
pub trait Pipeline: Send + Sync + 'static {
	/// Start playback, delivering events on the channel until stopped.
	fn start(&self, events: mpsc::UnboundedSender<PipelineEvent>) -> Result<(), Error>;

	/// Stop playback. Calling this more than once is harmless.
	fn stop(&self);

	/// Push bytes into the pipeline's source.
	fn write(&self, data: &[u8]) -> Result<(), Error>;

	/// Signal that no more data will be written.
	fn send_eos(&self);

	/// Set an integer property on a named element.
	fn set_property(&self, element: &str, name: &str, value: u64) -> Result<(), Error>;

	/// Read an integer property from a named element.
	fn property(&self, element: &str, name: &str) -> Option<u64>;
}

/// The process-wide pipeline library.
pub trait Backend: Send + Sync + 'static {
	fn init(&self) -> Result<(), Error>;
	fn deinit(&self);

	/// Construct a pipeline from a declarative description.
	fn pipeline(&self, description: &str) -> Result<Box<dyn Pipeline>, Error>;
}

/// The single owner of the pipeline library.
///
/// Created once at startup and handed to anything that builds pipelines.
/// The library is deinitialized exactly once: on the first [Media::close], or when the last handle is dropped.
#[derive(Clone)]
pub struct Media {
	inner: Arc<MediaInner>,
}

struct MediaInner {
	backend: Box<dyn Backend>,
	closed: AtomicBool,
}

impl MediaInner {
	fn close(&self) -> bool {
		if self.closed.swap(true, Ordering::AcqRel) {
			return false;
		}

		self.backend.deinit();
		true
	}
}

impl Drop for MediaInner {
	fn drop(&mut self) {
		self.close();
	}
}

impl Media {
	pub fn init<B: Backend>(backend: B) -> Result<Self, Error> {
		backend.init()?;
		tracing::debug!("media library initialized");

		Ok(Self {
			inner: Arc::new(MediaInner {
				backend: Box::new(backend),
				closed: AtomicBool::new(false),
			}),
		})
	}

	/// Build a new pipeline, failing if the library was already closed.
	pub fn pipeline(&self, description: &str) -> Result<Box<dyn Pipeline>, Error> {
		if self.is_closed() {
			return Err(Error::Closed);
		}

		self.inner.backend.pipeline(description)
	}

	/// Release the library. Only the first call has any effect.
	pub fn close(&self) {
		if self.inner.close() {
			tracing::debug!("media library deinitialized");
		}
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}
}

/// Stops the pipeline when dropped, so cancellation can't leave it running.
pub(crate) struct StopGuard<'a>(pub &'a dyn Pipeline);

impl Drop for StopGuard<'_> {
	fn drop(&mut self) {
		self.0.stop();
	}
}
