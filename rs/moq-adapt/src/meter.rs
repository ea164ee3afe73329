use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::Feedback;

/// The shortest interval [Meter::run] reports at.
pub const METER_MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Counts received bytes so the receive rate can be reported back to the sender.
#[derive(Clone, Default)]
pub struct Meter {
	bytes: Arc<AtomicU64>,
}

impl Meter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&self, bytes: u64) {
		self.bytes.fetch_add(bytes, Ordering::Relaxed);
	}

	/// Return the bytes counted since the last call.
	pub fn take(&self) -> u64 {
		self.bytes.swap(0, Ordering::Relaxed)
	}

	/// Report the receive rate in bits per second every interval. Runs until dropped.
	///
	/// The interval is at least [METER_MIN_INTERVAL].
	pub async fn run(self, interval: Duration, feedback: Feedback) {
		let interval = interval.max(METER_MIN_INTERVAL);
		let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			ticker.tick().await;

			let bytes = self.take();
			let bps = bitrate(bytes, interval);
			tracing::debug!(bytes, bps, "measured receive rate");
			feedback.report(bps);
		}
	}
}

fn bitrate(bytes: u64, interval: Duration) -> u64 {
	let secs = interval.as_secs_f64();
	if secs <= 0.0 {
		return 0;
	}

	(bytes as f64 * 8.0 / secs) as u64
}
