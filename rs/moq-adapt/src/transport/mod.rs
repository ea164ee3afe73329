//! The surface this crate needs from a MoQ transport session.
//!
//! Framing, reliability and congestion control all live behind these traits.
//! A binding for a concrete transport implements [Session] and hands it to [crate::Peer].

use std::future::Future;

use bytes::Bytes;

use crate::Error;

#[cfg(test)]
pub(crate) mod mock;

/// How the transport should map objects onto the underlying connection.
///
/// The mapping itself is owned by the transport; this is just the request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ForwardingPreference {
	/// Each object is sent as an unreliable datagram.
	Datagram,
	/// Each object gets its own stream.
	#[default]
	Stream,
	/// All objects of a group share a stream.
	StreamGroup,
	/// All objects of a track share a stream.
	StreamTrack,
}

/// A single payload within a track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Object {
	pub group_id: u64,
	pub object_id: u64,
	pub send_order: u64,
	pub forwarding: ForwardingPreference,
	pub payload: Bytes,
}

/// Assigns group and object IDs to a stream of payloads.
///
/// Everything is sent in group 0 with a monotonically increasing object ID.
#[derive(Clone, Debug)]
pub struct ObjectSequence {
	next: u64,
	forwarding: ForwardingPreference,
}

impl ObjectSequence {
	pub fn new(first: u64, forwarding: ForwardingPreference) -> Self {
		Self { next: first, forwarding }
	}

	/// Wrap the payload in the next object.
	pub fn next(&mut self, payload: Bytes) -> Object {
		let object_id = self.next;
		self.next += 1;

		Object {
			group_id: 0,
			object_id,
			send_order: 0,
			forwarding: self.forwarding,
			payload,
		}
	}
}

/// The writable half of an accepted subscription.
pub trait TrackWriter: Send + 'static {
	/// Write an object, waiting for the transport to have capacity.
	fn write_object(&mut self, object: Object) -> impl Future<Output = Result<(), Error>> + Send;
}

/// The readable half of a subscription we made.
pub trait TrackReader: Send + 'static {
	/// Read the next object, or [None] when the publisher has ended the track.
	fn read_object(&mut self) -> impl Future<Output = Result<Option<Object>, Error>> + Send;
}

/// A namespace announced by the remote peer, waiting for a response.
pub trait Announcement: Send + 'static {
	fn namespace(&self) -> &str;

	fn accept(self) -> Result<(), Error>;
	fn reject(self, reason: &str) -> Result<(), Error>;
}

/// A track subscription requested by the remote peer, waiting for a response.
pub trait Subscription: Send + 'static {
	type Writer: TrackWriter;

	fn namespace(&self) -> &str;
	fn track(&self) -> &str;

	/// Accept the subscription under the given track ID, returning a handle to write objects.
	fn accept(self, id: u64) -> Result<Self::Writer, Error>;
	fn reject(self, reason: &str) -> Result<(), Error>;
}

/// A session with a single remote peer.
///
/// Cloning must be cheap; the orchestrator reads announcements and subscriptions from separate futures.
pub trait Session: Clone + Send + Sync + 'static {
	type Announcement: Announcement;
	type Subscription: Subscription;
	type Reader: TrackReader;

	/// Wait for the next namespace announced by the peer.
	///
	/// An error means no further announcements can be read.
	fn read_announcement(&self) -> impl Future<Output = Result<Self::Announcement, Error>> + Send;

	/// Wait for the next subscription requested by the peer.
	///
	/// An error means no further subscriptions can be read.
	fn read_subscription(&self) -> impl Future<Output = Result<Self::Subscription, Error>> + Send;

	/// Announce that we publish tracks under the namespace.
	fn announce(&self, namespace: &str) -> impl Future<Output = Result<(), Error>> + Send;

	/// Subscribe to a track published by the peer.
	fn subscribe(&self, namespace: &str, track: &str) -> impl Future<Output = Result<Self::Reader, Error>> + Send;
}
