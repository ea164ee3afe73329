use std::collections::HashMap;

use crate::{Error, FullTrackName, Producer};

/// Builds a new producer for each subscription to a track.
pub type Factory = Box<dyn Fn() -> Result<Producer, Error> + Send + Sync>;

/// The tracks we're willing to publish, keyed by their full name.
///
/// Populated before serving and then moved into [crate::Peer], after which it can't change.
#[derive(Default)]
pub struct Registry {
	factories: HashMap<FullTrackName, Factory>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a factory for the track, replacing any previous one.
	pub fn register<F>(&mut self, name: FullTrackName, factory: F)
	where
		F: Fn() -> Result<Producer, Error> + Send + Sync + 'static,
	{
		if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
			tracing::warn!(track = %name, "replaced track factory");
		}
	}

	pub fn contains(&self, name: &FullTrackName) -> bool {
		self.factories.contains_key(name)
	}

	/// Run the factory for the track, or [None] if nothing is registered.
	pub fn create(&self, name: &FullTrackName) -> Option<Result<Producer, Error>> {
		self.factories.get(name).map(|factory| factory())
	}

	pub fn len(&self) -> usize {
		self.factories.len()
	}

	pub fn is_empty(&self) -> bool {
		self.factories.is_empty()
	}
}
