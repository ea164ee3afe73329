use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::time::Instant;

use crate::{
	Announcement, Config, Distributor, Error, Estimator, FullTrackName, Media, Registry, Role, Session, SharePolicy,
	Sink, SinkFactory, Subscription, TrackKey, Tracks,
};

/// Serves a single MoQ session: answers announcements and subscriptions,
/// runs a producer per accepted subscription, and adapts their bitrate to feedback from the peer.
#[derive(Clone)]
pub struct Peer<S: Session> {
	session: S,
	config: Arc<Config>,
	registry: Arc<Registry>,
	tracks: Tracks,
	distributor: Distributor,
	sink: Option<SinkFactory>,
	media: Option<Media>,

	// Set while an estimator is reading the feedback track.
	estimating: Arc<AtomicBool>,

	closed: Arc<watch::Sender<bool>>,
}

impl<S: Session> Peer<S> {
	pub fn new(session: S, config: Config, registry: Registry) -> Result<Self, Error> {
		config.validate()?;

		let tracks = Tracks::new();
		let (closed, _) = watch::channel(false);

		Ok(Self {
			session,
			config: Arc::new(config),
			registry: Arc::new(registry),
			distributor: Distributor::new(tracks.clone()),
			tracks,
			sink: None,
			media: None,
			estimating: Default::default(),
			closed: Arc::new(closed),
		})
	}

	/// Play the media track of every accepted media namespace.
	pub fn with_sink<F>(mut self, factory: F) -> Self
	where
		F: Fn() -> Result<Sink, Error> + Send + Sync + 'static,
	{
		self.sink = Some(Arc::new(factory));
		self
	}

	/// Release the pipeline library when the session closes.
	pub fn with_media(mut self, media: Media) -> Self {
		self.media = Some(media);
		self
	}

	/// Replace the default equal split.
	pub fn with_policy<P: SharePolicy>(mut self, policy: P) -> Self {
		self.distributor = Distributor::with_policy(self.tracks.clone(), policy);
		self
	}

	pub fn tracks(&self) -> &Tracks {
		&self.tracks
	}

	pub fn is_closed(&self) -> bool {
		*self.closed.borrow()
	}

	/// Serve the session until it fails or [Self::close] is called.
	///
	/// The session is closed when this returns, either way.
	#[tracing::instrument("session", skip_all)]
	pub async fn run(&self) -> Result<(), Error> {
		tracing::info!(tracks = self.registry.len(), "serving session");

		let res = tokio::select! {
			res = self.serve() => res,
			_ = self.closed() => Ok(()),
		};

		if let Err(err) = &res {
			tracing::warn!(%err, "session failed");
		}

		self.close();
		res
	}

	async fn serve(&self) -> Result<(), Error> {
		let announce = async {
			self.announce_owned().await;
			Ok::<_, Error>(())
		};

		tokio::try_join!(announce, self.run_announcements(), self.run_subscriptions())?;
		Ok(())
	}

	async fn run_announcements(&self) -> Result<(), Error> {
		loop {
			let announcement = self.session.read_announcement().await?;
			if let Err(err) = self.on_announcement(announcement) {
				tracing::warn!(%err, "failed to answer announcement");
			}
		}
	}

	async fn run_subscriptions(&self) -> Result<(), Error> {
		loop {
			let subscription = self.session.read_subscription().await?;
			if let Err(err) = self.on_subscription(subscription) {
				tracing::warn!(%err, "failed to answer subscription");
			}
		}
	}

	/// Announce every configured namespace. Failures are logged and skipped.
	pub async fn announce_owned(&self) {
		for namespace in &self.config.announce {
			match self.session.announce(namespace).await {
				Ok(()) => tracing::info!(%namespace, "announced"),
				Err(err) => tracing::warn!(%namespace, %err, "failed to announce"),
			}
		}
	}

	/// Accept or reject a namespace announced by the peer.
	///
	/// The returned error only concerns the response; it never affects the session.
	pub fn on_announcement(&self, announcement: S::Announcement) -> Result<(), Error> {
		let namespace = announcement.namespace().to_string();

		let Some(role) = self.config.role(&namespace) else {
			tracing::info!(%namespace, "rejected announcement");
			return announcement.reject(&Error::UnknownNamespace.to_string());
		};

		announcement.accept()?;
		tracing::info!(%namespace, ?role, "accepted announcement");

		match role {
			Role::Feedback => self.start_estimator(),
			Role::Media => self.start_sink(namespace),
		}

		Ok(())
	}

	fn start_estimator(&self) {
		if self.estimating.swap(true, Ordering::AcqRel) {
			tracing::debug!("estimator already running");
			return;
		}

		let this = self.clone();
		web_async::spawn(async move {
			let res = tokio::select! {
				res = this.run_estimator() => res,
				_ = this.closed() => Ok(()),
			};

			if let Err(err) = res {
				tracing::warn!(%err, "estimator failed");
			}

			this.estimating.store(false, Ordering::Release);
		});
	}

	async fn run_estimator(&self) -> Result<(), Error> {
		let feedback = &self.config.feedback;
		let reader = self.session.subscribe(&feedback.namespace, &feedback.track).await?;
		tracing::info!(namespace = %feedback.namespace, track = %feedback.track, "subscribed to feedback");

		let estimator = Estimator::new(self.config.estimator.clone(), Instant::now());
		estimator.run(reader, self.distributor.clone()).await
	}

	fn start_sink(&self, namespace: String) {
		let Some(factory) = self.sink.clone() else {
			tracing::debug!(%namespace, "no sink configured");
			return;
		};

		let this = self.clone();
		web_async::spawn(async move {
			let res = tokio::select! {
				res = this.run_sink(&namespace, factory) => res,
				_ = this.closed() => Ok(()),
			};

			match res {
				Ok(()) => tracing::info!(%namespace, "media track finished"),
				Err(err) => tracing::warn!(%namespace, %err, "sink failed"),
			}
		});
	}

	async fn run_sink(&self, namespace: &str, factory: SinkFactory) -> Result<(), Error> {
		let track = &self.config.media.track;
		let reader = self.session.subscribe(namespace, track).await?;
		tracing::info!(%namespace, %track, "subscribed to media");

		factory()?.run(reader).await
	}

	/// Accept a subscription to a registered track and start its producer, or reject it.
	///
	/// The returned error only concerns the response; it never affects the session.
	pub fn on_subscription(&self, subscription: S::Subscription) -> Result<(), Error> {
		let name = FullTrackName::new(subscription.namespace(), subscription.track());

		if self.is_closed() {
			return subscription.reject(&Error::Closed.to_string());
		}

		if !self.registry.contains(&name) {
			tracing::info!(track = %name, "rejected subscription");
			return subscription.reject(&Error::UnknownTrack.to_string());
		}

		// The ID is used up even if the factory fails.
		let key = TrackKey {
			name,
			id: self.tracks.next_id(),
		};

		let producer = match self.registry.create(&key.name) {
			Some(Ok(producer)) => Arc::new(producer),
			Some(Err(err)) => {
				tracing::warn!(track = %key, %err, "failed to create producer");
				return subscription.reject(&err.to_string());
			}
			None => return subscription.reject(&Error::UnknownTrack.to_string()),
		};

		// Checked again under the map's lock, in case close raced with the factory.
		let cancel = match self.tracks.insert(key.clone(), producer.clone()) {
			Ok(cancel) => cancel,
			Err(err) => return subscription.reject(&err.to_string()),
		};

		let writer = match subscription.accept(key.id) {
			Ok(writer) => writer,
			Err(err) => {
				self.tracks.remove(&key);
				return Err(err);
			}
		};

		tracing::info!(track = %key, kind = producer.kind(), "accepted subscription");

		let tracks = self.tracks.clone();
		web_async::spawn(async move {
			let res = tokio::select! {
				res = producer.start(writer) => res,
				// The entry was removed, which means the session is closing.
				_ = cancel => Err(Error::Cancel),
			};

			match res {
				Ok(()) => tracing::info!(track = %key, "producer finished"),
				Err(Error::Cancel) => tracing::debug!(track = %key, "producer cancelled"),
				Err(err) => tracing::warn!(track = %key, %err, "producer failed"),
			}

			tracks.remove(&key);
		});

		Ok(())
	}

	/// Split a total bitrate between the live producers, returning how many were updated.
	pub fn update_shares(&self, total: u64) -> usize {
		self.distributor.update_shares(total)
	}

	/// Stop every producer, estimator and sink, and release the pipeline library.
	///
	/// Only the first call has any effect.
	pub fn close(&self) {
		if self.closed.send_replace(true) {
			return;
		}

		let tracks = self.tracks.close();

		if let Some(media) = &self.media {
			media.close();
		}

		tracing::info!(tracks, "session closed");
	}

	async fn closed(&self) {
		let mut closed = self.closed.subscribe();
		// Can't fail; self holds the sender.
		closed.wait_for(|closed| *closed).await.ok();
	}
}
