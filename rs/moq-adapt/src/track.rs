use std::fmt;

/// A namespace and track name pair, rendered as `namespace/track`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullTrackName {
	pub namespace: String,
	pub track: String,
}

impl FullTrackName {
	pub fn new(namespace: impl Into<String>, track: impl Into<String>) -> Self {
		Self {
			namespace: namespace.into(),
			track: track.into(),
		}
	}
}

impl fmt::Display for FullTrackName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.namespace, self.track)
	}
}

/// Identifies one live instance of a track.
///
/// The same track may be subscribed multiple times; each subscription gets a new ID.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackKey {
	pub name: FullTrackName,
	pub id: u64,
}

impl fmt::Display for TrackKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.name, self.id)
	}
}
