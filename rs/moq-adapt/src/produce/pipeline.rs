use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::media::StopGuard;
use crate::{Error, ForwardingPreference, Media, ObjectSequence, Pipeline, PipelineEvent, TrackWriter};

/// The encoder element and property that controls the bitrate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderProperty {
	/// The element name, ex. `name=encoder` in the description.
	pub element: String,

	/// The integer property to set.
	pub property: String,

	/// Bits per second are divided by this before being set, ex. 1000 for kbit/s.
	pub divisor: u64,
}

impl EncoderProperty {
	/// x264enc takes `bitrate` in kbit/s.
	pub fn x264() -> Self {
		Self {
			element: "encoder".to_string(),
			property: "bitrate".to_string(),
			divisor: 1000,
		}
	}

	/// vp8enc takes `target-bitrate` in bit/s.
	pub fn vp8() -> Self {
		Self {
			element: "encoder".to_string(),
			property: "target-bitrate".to_string(),
			divisor: 1,
		}
	}

	fn value(&self, bps: u64) -> u64 {
		bps / self.divisor.max(1)
	}
}

impl Default for EncoderProperty {
	fn default() -> Self {
		Self::x264()
	}
}

/// Publishes every buffer produced by an encoding pipeline.
pub struct PipelineProducer {
	pipeline: Box<dyn Pipeline>,
	encoder: EncoderProperty,
	forwarding: ForwardingPreference,
}

impl PipelineProducer {
	pub fn new(media: &Media, description: &str, encoder: EncoderProperty) -> Result<Self, Error> {
		let pipeline = media.pipeline(description)?;
		Ok(Self::from_pipeline(pipeline, encoder))
	}

	pub fn from_pipeline(pipeline: Box<dyn Pipeline>, encoder: EncoderProperty) -> Self {
		Self {
			pipeline,
			encoder,
			forwarding: ForwardingPreference::StreamTrack,
		}
	}

	pub fn with_forwarding(mut self, forwarding: ForwardingPreference) -> Self {
		self.forwarding = forwarding;
		self
	}

	pub async fn start<W: TrackWriter>(&self, mut track: W) -> Result<(), Error> {
		let (tx, mut rx) = mpsc::unbounded_channel();
		self.pipeline.start(tx)?;

		// Stop the pipeline no matter how we exit, including cancellation.
		let _guard = StopGuard(self.pipeline.as_ref());

		let mut sequence = ObjectSequence::new(0, self.forwarding);

		while let Some(event) = rx.recv().await {
			match event {
				PipelineEvent::Buffer(buffer) => track.write_object(sequence.next(buffer)).await?,
				PipelineEvent::Eos => {
					tracing::debug!("pipeline finished");
					return Ok(());
				}
				PipelineEvent::Error(err) => return Err(Error::Pipeline(err)),
			}
		}

		Ok(())
	}

	pub fn set_bitrate(&self, bps: u64) {
		let value = self.encoder.value(bps);
		let previous = self.pipeline.property(&self.encoder.element, &self.encoder.property);

		match self
			.pipeline
			.set_property(&self.encoder.element, &self.encoder.property, value)
		{
			Ok(()) => tracing::info!(
				element = %self.encoder.element,
				property = %self.encoder.property,
				?previous,
				value,
				"updated encoder bitrate"
			),
			Err(err) => tracing::warn!(%err, "failed to update encoder bitrate"),
		}
	}
}

#[cfg(test)]
mod tests {
	use bytes::Bytes;

	use super::*;
	use crate::media::mock::MockPipeline;
	use crate::transport::mock;

	fn producer(encoder: EncoderProperty) -> (std::sync::Arc<PipelineProducer>, MockPipeline) {
		let pipeline = MockPipeline::default();
		let producer = PipelineProducer::from_pipeline(Box::new(pipeline.clone()), encoder);
		(std::sync::Arc::new(producer), pipeline)
	}

	#[tokio::test]
	async fn test_buffers_become_objects() {
		let (producer, pipeline) = producer(EncoderProperty::x264());
		let (writer, mut reader) = mock::track();

		let task = tokio::spawn({
			let producer = producer.clone();
			async move { producer.start(writer).await }
		});
		pipeline.started().await;

		pipeline.emit(PipelineEvent::Buffer(Bytes::from_static(b"one")));
		pipeline.emit(PipelineEvent::Buffer(Bytes::from_static(b"two")));
		pipeline.emit(PipelineEvent::Eos);

		task.await.unwrap().unwrap();

		let first = reader.next().await.unwrap();
		let second = reader.next().await.unwrap();
		assert_eq!(first.payload, Bytes::from_static(b"one"));
		assert_eq!(first.object_id, 0);
		assert_eq!(second.object_id, 1);
		assert_eq!(second.group_id, 0);
		assert_eq!(second.forwarding, ForwardingPreference::StreamTrack);

		let state = pipeline.state.lock().unwrap();
		assert_eq!(state.started, 1);
		assert_eq!(state.stopped, 1);
	}

	#[tokio::test]
	async fn test_pipeline_error() {
		let (producer, pipeline) = producer(EncoderProperty::x264());
		let (writer, _reader) = mock::track();

		let task = tokio::spawn({
			let producer = producer.clone();
			async move { producer.start(writer).await }
		});
		pipeline.started().await;

		pipeline.emit(PipelineEvent::Error("not negotiated".to_string()));

		let err = task.await.unwrap().unwrap_err();
		assert!(matches!(err, Error::Pipeline(msg) if msg == "not negotiated"));
		assert_eq!(pipeline.state.lock().unwrap().stopped, 1);
	}

	#[tokio::test]
	async fn test_write_failure_stops() {
		let (producer, pipeline) = producer(EncoderProperty::x264());
		let (writer, reader) = mock::track();
		drop(reader);

		let task = tokio::spawn({
			let producer = producer.clone();
			async move { producer.start(writer).await }
		});
		pipeline.started().await;

		pipeline.emit(PipelineEvent::Buffer(Bytes::from_static(b"lost")));

		assert!(matches!(task.await.unwrap(), Err(Error::Closed)));
		assert_eq!(pipeline.state.lock().unwrap().stopped, 1);
	}

	#[tokio::test]
	async fn test_cancel_stops_pipeline() {
		let (producer, pipeline) = producer(EncoderProperty::x264());
		let (writer, _reader) = mock::track();

		let task = tokio::spawn({
			let producer = producer.clone();
			async move { producer.start(writer).await }
		});
		pipeline.started().await;

		task.abort();
		let _ = task.await;

		assert_eq!(pipeline.state.lock().unwrap().stopped, 1);
	}

	#[test]
	fn test_set_bitrate_units() {
		let (producer, pipeline) = producer(EncoderProperty::x264());
		producer.set_bitrate(2_500_000);
		assert_eq!(pipeline.property("encoder", "bitrate"), Some(2_500));

		let (producer, pipeline) = self::producer(EncoderProperty::vp8());
		producer.set_bitrate(2_500_000);
		assert_eq!(pipeline.property("encoder", "target-bitrate"), Some(2_500_000));
	}
}
