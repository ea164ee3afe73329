//! Content sources that drive a single outbound track.
//!
//! The set of sources is closed: a [Producer] is one of a pipeline, an external process,
//! or estimator feedback. The registry picks the variant when a subscription arrives.

mod feedback;
mod pipeline;
mod process;

pub use feedback::*;
pub use pipeline::*;
pub use process::*;

use crate::{Error, TrackWriter};

#[derive(derive_more::From)]
pub enum Producer {
	Pipeline(PipelineProducer),
	Process(ProcessProducer),
	Feedback(FeedbackProducer),
}

impl Producer {
	/// Pump objects into the track until the source ends, fails, or the future is dropped.
	///
	/// Production has stopped by the time this returns.
	pub async fn start<W: TrackWriter>(&self, track: W) -> Result<(), Error> {
		match self {
			Self::Pipeline(producer) => producer.start(track).await,
			Self::Process(producer) => producer.start(track).await,
			Self::Feedback(producer) => producer.start(track).await,
		}
	}

	/// Adjust the target bitrate, taking effect whenever the source gets around to it.
	///
	/// Safe to call while [Self::start] is running. Sources without an adjustable rate ignore it.
	pub fn set_bitrate(&self, bps: u64) {
		match self {
			Self::Pipeline(producer) => producer.set_bitrate(bps),
			Self::Process(producer) => producer.set_bitrate(bps),
			Self::Feedback(producer) => producer.set_bitrate(bps),
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Pipeline(_) => "pipeline",
			Self::Process(_) => "process",
			Self::Feedback(_) => "feedback",
		}
	}
}
