use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::oneshot;
use web_async::Lock;

use crate::{Error, Producer, TrackKey};

struct Entry {
	producer: Arc<Producer>,

	// Dropping this cancels the producer task.
	_cancel: oneshot::Sender<()>,
}

#[derive(Default)]
struct State {
	next_id: u64,
	active: HashMap<TrackKey, Entry>,

	// Set by close; nothing may be inserted afterwards.
	closed: bool,
}

/// The live producers, one per accepted subscription.
///
/// Each entry owns the cancellation signal for its producer task,
/// so removing an entry (or clearing the map) stops the producer.
#[derive(Clone, Default)]
pub struct Tracks {
	state: Lock<State>,
}

impl Tracks {
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocate a track ID. IDs are never reused within a session.
	pub fn next_id(&self) -> u64 {
		let mut state = self.state.lock();
		let id = state.next_id;
		state.next_id += 1;
		id
	}

	/// Insert a live producer, returning a receiver that resolves when the entry is gone.
	///
	/// Fails with [Error::Closed] once [Self::close] has been called.
	pub fn insert(&self, key: TrackKey, producer: Arc<Producer>) -> Result<oneshot::Receiver<()>, Error> {
		let mut state = self.state.lock();
		if state.closed {
			return Err(Error::Closed);
		}

		let (cancel, cancelled) = oneshot::channel();
		state.active.insert(
			key,
			Entry {
				producer,
				_cancel: cancel,
			},
		);

		Ok(cancelled)
	}

	pub fn remove(&self, key: &TrackKey) -> bool {
		self.state.lock().active.remove(key).is_some()
	}

	pub fn contains(&self, key: &TrackKey) -> bool {
		self.state.lock().active.contains_key(key)
	}

	/// A copy of the current producers, ordered by key.
	pub fn snapshot(&self) -> Vec<(TrackKey, Arc<Producer>)> {
		let state = self.state.lock();
		let mut snapshot: Vec<_> = state
			.active
			.iter()
			.map(|(key, entry)| (key.clone(), entry.producer.clone()))
			.collect();
		snapshot.sort_by(|a, b| a.0.cmp(&b.0));
		snapshot
	}

	pub fn keys(&self) -> Vec<TrackKey> {
		self.snapshot().into_iter().map(|(key, _)| key).collect()
	}

	pub fn len(&self) -> usize {
		self.state.lock().active.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Remove every entry and refuse new ones, cancelling all producers. Returns how many there were.
	pub fn close(&self) -> usize {
		// Drop the entries outside of the lock.
		let active = {
			let mut state = self.state.lock();
			state.closed = true;
			std::mem::take(&mut state.active)
		};

		active.len()
	}

	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Feedback, FullTrackName};

	fn key(track: &str, id: u64) -> TrackKey {
		TrackKey {
			name: FullTrackName::new("moq", track),
			id,
		}
	}

	fn producer() -> Arc<Producer> {
		Arc::new(Feedback::new().producer().into())
	}

	#[test]
	fn test_next_id() {
		let tracks = Tracks::new();
		assert_eq!(tracks.next_id(), 0);
		assert_eq!(tracks.next_id(), 1);
		assert_eq!(tracks.clone().next_id(), 2);
	}

	#[test]
	fn test_remove_cancels() {
		let tracks = Tracks::new();
		let mut cancelled = tracks.insert(key("video", 0), producer()).unwrap();

		assert!(tracks.contains(&key("video", 0)));
		assert!(cancelled.try_recv().is_err());
		assert!(!matches!(cancelled.try_recv(), Err(oneshot::error::TryRecvError::Closed)));

		assert!(tracks.remove(&key("video", 0)));
		assert!(!tracks.remove(&key("video", 0)));
		assert!(matches!(cancelled.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
	}

	#[test]
	fn test_snapshot_and_close() {
		let tracks = Tracks::new();
		let mut first = tracks.insert(key("video", 1), producer()).unwrap();
		let mut second = tracks.insert(key("audio", 0), producer()).unwrap();

		assert_eq!(tracks.keys(), vec![key("audio", 0), key("video", 1)]);
		assert_eq!(tracks.len(), 2);

		assert_eq!(tracks.close(), 2);
		assert!(tracks.is_empty());
		assert!(tracks.is_closed());
		assert!(matches!(first.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
		assert!(matches!(second.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
	}

	#[test]
	fn test_insert_after_close() {
		let tracks = Tracks::new();
		let other = tracks.clone();
		assert_eq!(other.close(), 0);

		assert!(matches!(tracks.insert(key("video", 0), producer()), Err(Error::Closed)));
		assert!(tracks.is_empty());

		// Closing again is harmless.
		assert_eq!(tracks.close(), 0);
	}
}
