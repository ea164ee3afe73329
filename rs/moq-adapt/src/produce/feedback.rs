use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;

use crate::coding::{Decode, DecodeError, Encode, VarInt};
use crate::{Error, ForwardingPreference, ObjectSequence, TrackWriter};

/// Encode a bitrate report as a single varint.
pub fn encode_rate(bps: u64) -> Result<Bytes, Error> {
	Ok(VarInt::try_from(bps)?.encode_bytes())
}

/// Decode a bitrate report, which must be exactly one varint.
pub fn decode_rate(mut payload: Bytes) -> Result<u64, Error> {
	match VarInt::decode_exact(&mut payload) {
		Ok(rate) => Ok(rate.into()),
		Err(DecodeError::Long) => Err(Error::InvalidRate),
		Err(err) => Err(err.into()),
	}
}

/// Fans out the most recent bitrate measurement to every feedback track.
///
/// Only the latest value is kept; a slow track skips reports rather than queueing them.
#[derive(Clone)]
pub struct Feedback {
	reports: Arc<watch::Sender<Option<u64>>>,
}

impl Feedback {
	pub fn new() -> Self {
		let (reports, _) = watch::channel(None);
		Self {
			reports: Arc::new(reports),
		}
	}

	/// Publish a new measurement in bits per second.
	pub fn report(&self, bps: u64) {
		self.reports.send_replace(Some(bps));
	}

	pub fn latest(&self) -> Option<u64> {
		*self.reports.borrow()
	}

	/// A producer that writes every subsequent report.
	pub fn producer(&self) -> FeedbackProducer {
		FeedbackProducer {
			reports: self.reports.subscribe(),
		}
	}
}

impl Default for Feedback {
	fn default() -> Self {
		Self::new()
	}
}

/// Writes bitrate reports as varint objects.
///
/// Each report is its own group-forwarded object, numbered from 1.
pub struct FeedbackProducer {
	reports: watch::Receiver<Option<u64>>,
}

impl FeedbackProducer {
	pub async fn start<W: TrackWriter>(&self, mut track: W) -> Result<(), Error> {
		let mut reports = self.reports.clone();
		let mut sequence = ObjectSequence::new(1, ForwardingPreference::StreamGroup);

		while reports.changed().await.is_ok() {
			let Some(bps) = *reports.borrow_and_update() else {
				continue;
			};

			track.write_object(sequence.next(encode_rate(bps)?)).await?;
			tracing::trace!(bps, "sent feedback");
		}

		// Every Feedback handle was dropped.
		Ok(())
	}

	pub fn set_bitrate(&self, bps: u64) {
		tracing::trace!(bps, "feedback rate is not adjustable");
	}
}
