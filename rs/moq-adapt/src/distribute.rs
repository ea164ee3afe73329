use std::sync::Arc;

use crate::{TrackKey, Tracks};

/// Decides how a total bitrate is split between the live tracks.
pub trait SharePolicy: Send + Sync + 'static {
	/// Return one bitrate per track, in the same order.
	fn split(&self, total: u64, tracks: &[TrackKey]) -> Vec<u64>;
}

/// Every track gets `total / N`, rounding down.
#[derive(Clone, Copy, Debug, Default)]
pub struct EqualSplit;

impl SharePolicy for EqualSplit {
	fn split(&self, total: u64, tracks: &[TrackKey]) -> Vec<u64> {
		if tracks.is_empty() {
			return Vec::new();
		}

		let share = total / tracks.len() as u64;
		vec![share; tracks.len()]
	}
}

/// Applies an estimated total bitrate to every live producer.
#[derive(Clone)]
pub struct Distributor {
	tracks: Tracks,
	policy: Arc<dyn SharePolicy>,
}

impl Distributor {
	pub fn new(tracks: Tracks) -> Self {
		Self::with_policy(tracks, EqualSplit)
	}

	pub fn with_policy<P: SharePolicy>(tracks: Tracks, policy: P) -> Self {
		Self {
			tracks,
			policy: Arc::new(policy),
		}
	}

	/// Split the total between the live producers and apply it, returning how many were updated.
	///
	/// Tracks that appear or disappear while this runs are picked up by the next call.
	pub fn update_shares(&self, total: u64) -> usize {
		let snapshot = self.tracks.snapshot();
		if snapshot.is_empty() {
			tracing::debug!(total, "no tracks to update");
			return 0;
		}

		let keys: Vec<TrackKey> = snapshot.iter().map(|(key, _)| key.clone()).collect();
		let shares = self.policy.split(total, &keys);

		let mut updated = 0;
		for ((key, producer), share) in snapshot.iter().zip(shares) {
			tracing::debug!(track = %key, share, "setting bitrate");
			producer.set_bitrate(share);
			updated += 1;
		}

		updated
	}
}
