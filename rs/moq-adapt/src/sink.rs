use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::media::StopGuard;
use crate::{Error, Media, Meter, Pipeline, PipelineEvent, TrackReader};

/// How long to wait for the pipeline to play out after the track ends.
pub const SINK_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Builds a new sink for each media track we subscribe to.
pub type SinkFactory = Arc<dyn Fn() -> Result<Sink, Error> + Send + Sync>;

/// Feeds the payloads of a subscribed track into a playback pipeline.
pub struct Sink {
	pipeline: Box<dyn Pipeline>,
	meter: Option<Meter>,
}

impl Sink {
	pub fn new(media: &Media, description: &str) -> Result<Self, Error> {
		Ok(Self::from_pipeline(media.pipeline(description)?))
	}

	pub fn from_pipeline(pipeline: Box<dyn Pipeline>) -> Self {
		Self { pipeline, meter: None }
	}

	/// Count every received byte.
	pub fn with_meter(mut self, meter: Meter) -> Self {
		self.meter = Some(meter);
		self
	}

	/// Play the track until it ends, then wait for the pipeline to drain.
	pub async fn run<R: TrackReader>(self, mut track: R) -> Result<(), Error> {
		let (tx, mut events) = mpsc::unbounded_channel();
		self.pipeline.start(tx)?;

		let _guard = StopGuard(self.pipeline.as_ref());

		loop {
			tokio::select! {
				Some(event) = events.recv() => match event {
					PipelineEvent::Eos => return Ok(()),
					PipelineEvent::Error(err) => return Err(Error::Pipeline(err)),
					PipelineEvent::Buffer(_) => {}
				},
				res = track.read_object() => match res {
					Ok(Some(object)) => {
						if let Some(meter) = &self.meter {
							meter.add(object.payload.len() as u64);
						}
						self.pipeline.write(&object.payload)?;
					}
					Ok(None) => {
						tracing::debug!("media track ended");
						break;
					}
					Err(err) => {
						tracing::warn!(%err, "failed to read media track");
						break;
					}
				},
			}
		}

		self.pipeline.send_eos();

		match tokio::time::timeout(SINK_DRAIN_TIMEOUT, Self::drain(&mut events)).await {
			Ok(res) => res,
			Err(_) => {
				tracing::warn!(timeout = ?SINK_DRAIN_TIMEOUT, "pipeline did not drain");
				Ok(())
			}
		}
	}

	async fn drain(events: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Result<(), Error> {
		while let Some(event) = events.recv().await {
			match event {
				PipelineEvent::Eos => return Ok(()),
				PipelineEvent::Error(err) => return Err(Error::Pipeline(err)),
				PipelineEvent::Buffer(_) => {}
			}
		}

		Ok(())
	}
}
