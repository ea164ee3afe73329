//! An in-memory [Session] for exercising the orchestrator without a network.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot};

use super::*;
use crate::FullTrackName;

/// Create a connected track writer and reader.
pub fn track() -> (MockWriter, MockReader) {
	let (tx, rx) = mpsc::unbounded_channel();
	(MockWriter { tx }, MockReader { rx })
}

#[derive(Debug)]
pub struct MockWriter {
	tx: mpsc::UnboundedSender<Result<Object, Error>>,
}

impl MockWriter {
	/// Make the reader's next read fail.
	pub fn fail(&self, err: Error) {
		let _ = self.tx.send(Err(err));
	}
}

impl TrackWriter for MockWriter {
	async fn write_object(&mut self, object: Object) -> Result<(), Error> {
		self.tx.send(Ok(object)).map_err(|_| Error::Closed)
	}
}

#[derive(Debug)]
pub struct MockReader {
	rx: mpsc::UnboundedReceiver<Result<Object, Error>>,
}

impl MockReader {
	/// The next object, or [None] on error or when the writer is gone.
	pub async fn next(&mut self) -> Option<Object> {
		self.read_object().await.ok().flatten()
	}
}

impl TrackReader for MockReader {
	async fn read_object(&mut self) -> Result<Option<Object>, Error> {
		match self.rx.recv().await {
			Some(Ok(object)) => Ok(Some(object)),
			Some(Err(err)) => Err(err),
			None => Ok(None),
		}
	}
}

pub struct MockAnnouncement {
	namespace: String,
	reply: oneshot::Sender<Result<(), String>>,
}

impl Announcement for MockAnnouncement {
	fn namespace(&self) -> &str {
		&self.namespace
	}

	fn accept(self) -> Result<(), Error> {
		self.reply.send(Ok(())).map_err(|_| Error::Closed)
	}

	fn reject(self, reason: &str) -> Result<(), Error> {
		self.reply.send(Err(reason.to_string())).map_err(|_| Error::Closed)
	}
}

/// What the remote sees once a subscription is answered: the track ID and its objects, or the reason.
pub type SubscribeReply = Result<(u64, MockReader), String>;

pub struct MockSubscription {
	name: FullTrackName,
	reply: oneshot::Sender<SubscribeReply>,
}

impl Subscription for MockSubscription {
	type Writer = MockWriter;

	fn namespace(&self) -> &str {
		&self.name.namespace
	}

	fn track(&self) -> &str {
		&self.name.track
	}

	fn accept(self, id: u64) -> Result<MockWriter, Error> {
		let (writer, reader) = track();
		self.reply.send(Ok((id, reader))).map_err(|_| Error::Closed)?;
		Ok(writer)
	}

	fn reject(self, reason: &str) -> Result<(), Error> {
		self.reply.send(Err(reason.to_string())).map_err(|_| Error::Closed)
	}
}

#[derive(Default)]
struct Shared {
	// Tracks the remote publishes, consumed by our subscribe.
	published: HashMap<FullTrackName, MockReader>,
	announced: Vec<String>,
	subscribed: Vec<FullTrackName>,
	reject_announce: HashSet<String>,
}

/// Our side of the session.
#[derive(Clone)]
pub struct MockSession {
	announcements: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<MockAnnouncement, Error>>>>,
	subscriptions: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<MockSubscription, Error>>>>,
	shared: Arc<Mutex<Shared>>,
}

/// The remote peer, driven by the test.
pub struct MockRemote {
	announcements: mpsc::UnboundedSender<Result<MockAnnouncement, Error>>,
	subscriptions: mpsc::UnboundedSender<Result<MockSubscription, Error>>,
	shared: Arc<Mutex<Shared>>,
}

pub fn session() -> (MockSession, MockRemote) {
	let (announce_tx, announce_rx) = mpsc::unbounded_channel();
	let (subscribe_tx, subscribe_rx) = mpsc::unbounded_channel();
	let shared = Arc::new(Mutex::new(Shared::default()));

	let session = MockSession {
		announcements: Arc::new(tokio::sync::Mutex::new(announce_rx)),
		subscriptions: Arc::new(tokio::sync::Mutex::new(subscribe_rx)),
		shared: shared.clone(),
	};

	let remote = MockRemote {
		announcements: announce_tx,
		subscriptions: subscribe_tx,
		shared,
	};

	(session, remote)
}

impl MockRemote {
	/// Announce a namespace to our side.
	pub fn announce(&self, namespace: &str) -> oneshot::Receiver<Result<(), String>> {
		let (reply, rx) = oneshot::channel();
		let announcement = MockAnnouncement {
			namespace: namespace.to_string(),
			reply,
		};
		self.announcements.send(Ok(announcement)).unwrap();
		rx
	}

	/// Subscribe to one of our tracks.
	pub fn subscribe(&self, namespace: &str, track: &str) -> oneshot::Receiver<SubscribeReply> {
		let (reply, rx) = oneshot::channel();
		let subscription = MockSubscription {
			name: FullTrackName::new(namespace, track),
			reply,
		};
		self.subscriptions.send(Ok(subscription)).unwrap();
		rx
	}

	/// Offer a track that our side may subscribe to.
	pub fn publish(&self, namespace: &str, track: &str) -> MockWriter {
		let (writer, reader) = self::track();
		self.shared
			.lock()
			.unwrap()
			.published
			.insert(FullTrackName::new(namespace, track), reader);
		writer
	}

	/// Refuse our announcement of this namespace.
	pub fn reject_announce(&self, namespace: &str) {
		self.shared.lock().unwrap().reject_announce.insert(namespace.to_string());
	}

	/// Break the announcement stream.
	pub fn fail_announcements(&self) {
		let err = Error::transport(anyhow::anyhow!("connection lost"));
		self.announcements.send(Err(err)).unwrap();
	}

	/// Break the subscription stream.
	pub fn fail_subscriptions(&self) {
		let err = Error::transport(anyhow::anyhow!("connection lost"));
		self.subscriptions.send(Err(err)).unwrap();
	}

	/// Namespaces our side announced, in order.
	pub fn announced(&self) -> Vec<String> {
		self.shared.lock().unwrap().announced.clone()
	}

	/// Tracks our side subscribed to, in order.
	pub fn subscribed(&self) -> Vec<FullTrackName> {
		self.shared.lock().unwrap().subscribed.clone()
	}
}

impl Session for MockSession {
	type Announcement = MockAnnouncement;
	type Subscription = MockSubscription;
	type Reader = MockReader;

	async fn read_announcement(&self) -> Result<MockAnnouncement, Error> {
		let mut announcements = self.announcements.lock().await;
		announcements.recv().await.unwrap_or(Err(Error::Closed))
	}

	async fn read_subscription(&self) -> Result<MockSubscription, Error> {
		let mut subscriptions = self.subscriptions.lock().await;
		subscriptions.recv().await.unwrap_or(Err(Error::Closed))
	}

	async fn announce(&self, namespace: &str) -> Result<(), Error> {
		let mut shared = self.shared.lock().unwrap();
		shared.announced.push(namespace.to_string());

		match shared.reject_announce.contains(namespace) {
			true => Err(Error::transport(anyhow::anyhow!("announce rejected"))),
			false => Ok(()),
		}
	}

	async fn subscribe(&self, namespace: &str, track: &str) -> Result<MockReader, Error> {
		let name = FullTrackName::new(namespace, track);
		let mut shared = self.shared.lock().unwrap();
		shared.subscribed.push(name.clone());

		shared
			.published
			.remove(&name)
			.ok_or_else(|| Error::transport(anyhow::anyhow!("no such track: {name}")))
	}
}
