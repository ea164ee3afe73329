use tokio::time::Instant;

use crate::{Distributor, Error, EstimatorConfig, TrackReader, decode_rate};

/// Whether the estimator is currently testing a higher bitrate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
	Steady,
	Probing,
}

/// Picks a target bitrate from the receiver's measured rate.
///
/// Samples are snapped to the configured tiers. Every probe interval the bitrate is multiplied
/// to see if the link can sustain more, and samples are ignored until the probe has run its course.
#[derive(Clone, Debug)]
pub struct Estimator {
	config: EstimatorConfig,
	state: Probe,
	current: u64,
	probe_start: Instant,
	last_probe_end: Instant,
}

impl Estimator {
	/// Start in [Probe::Steady] at the lowest tier, as if a probe just ended.
	pub fn new(config: EstimatorConfig, now: Instant) -> Self {
		let current = config.tiers.first().copied().unwrap_or_default();

		Self {
			config,
			state: Probe::Steady,
			current,
			probe_start: now,
			last_probe_end: now,
		}
	}

	pub fn current(&self) -> u64 {
		self.current
	}

	pub fn state(&self) -> Probe {
		self.state
	}

	/// The highest tier the sample reaches, using the margin as hysteresis.
	pub fn classify(&self, sample: u64) -> u64 {
		let Some((&lowest, higher)) = self.config.tiers.split_first() else {
			return sample;
		};

		let mut tier = lowest;
		for &next in higher {
			if (sample as f64) < self.config.margin * next as f64 {
				break;
			}
			tier = next;
		}

		tier
	}

	/// Process a sample, returning the bitrate to apply if there's something to apply.
	pub fn update(&mut self, sample: u64, now: Instant) -> Option<u64> {
		match self.state {
			Probe::Probing if now.duration_since(self.probe_start) < self.config.probe_duration => {
				tracing::trace!(sample, "ignoring sample while probing");
				None
			}
			Probe::Probing => {
				self.state = Probe::Steady;
				self.last_probe_end = now;
				tracing::debug!(bitrate = self.current, "probe finished");
				None
			}
			Probe::Steady if now.duration_since(self.last_probe_end) > self.config.probe_interval => {
				self.state = Probe::Probing;
				self.probe_start = now;
				self.current = self.current.saturating_mul(self.config.probe_factor);
				tracing::debug!(bitrate = self.current, "probing");
				Some(self.current)
			}
			Probe::Steady => {
				self.current = self.classify(sample);
				Some(self.current)
			}
		}
	}

	/// Read samples from the feedback track and apply each new target to every producer.
	///
	/// Returns when the track ends. Producers keep their last bitrate after an error.
	pub async fn run<R: TrackReader>(mut self, mut reader: R, distributor: Distributor) -> Result<(), Error> {
		while let Some(object) = reader.read_object().await? {
			let sample = decode_rate(object.payload)?;
			tracing::debug!(sample, state = ?self.state, "received bitrate sample");

			let previous = self.current;
			let Some(bitrate) = self.update(sample, Instant::now()) else {
				continue;
			};

			if bitrate != previous {
				tracing::info!(previous, bitrate, state = ?self.state, "target bitrate changed");
			}

			let tracks = distributor.update_shares(bitrate);
			tracing::debug!(bitrate, tracks, "distributed bitrate");
		}

		tracing::debug!("feedback track ended");
		Ok(())
	}
}
