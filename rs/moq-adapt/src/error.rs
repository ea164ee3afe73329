use std::sync::Arc;

use crate::coding::{BoundsExceeded, DecodeError};

/// A list of possible errors that can occur while orchestrating a session.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
	#[error("closed")]
	Closed,

	#[error("cancelled")]
	Cancel,

	#[error("unknown namespace")]
	UnknownNamespace,

	#[error("unknown trackname")]
	UnknownTrack,

	#[error("transport error: {0}")]
	Transport(Arc<anyhow::Error>),

	#[error("pipeline error: {0}")]
	Pipeline(String),

	#[error("process error: {0}")]
	Process(Arc<std::io::Error>),

	#[error("decode error: {0}")]
	Decode(#[from] DecodeError),

	#[error("invalid rate format")]
	InvalidRate,

	#[error("invalid config: {0}")]
	Config(String),
}

impl Error {
	/// Wrap an error reported by the transport collaborator.
	pub fn transport<E: Into<anyhow::Error>>(err: E) -> Self {
		Self::Transport(Arc::new(err.into()))
	}

	/// Wrap an error reported by the media pipeline.
	pub fn pipeline<E: ToString>(err: E) -> Self {
		Self::Pipeline(err.to_string())
	}
}

impl From<std::io::Error> for Error {
	fn from(err: std::io::Error) -> Self {
		Self::Process(Arc::new(err))
	}
}

impl From<BoundsExceeded> for Error {
	fn from(err: BoundsExceeded) -> Self {
		Self::Decode(err.into())
	}
}
