//! Bandwidth-adaptive publishing over a MoQ session.
//!
//! A [Peer] serves one session with a remote peer:
//! - Subscriptions to tracks in the [Registry] are accepted and each gets its own [Producer].
//! - A feedback announcement starts an [Estimator], which turns the peer's receive-rate reports into a
//!   target bitrate that the [Distributor] splits between the live producers.
//! - A media announcement is played back through a [Sink], whose [Meter] feeds the reports the other way.
//!
//! The transport is abstracted by the [Session] trait and media pipelines by the [Backend] trait,
//! so neither QUIC nor the pipeline library is a dependency of this crate.

pub mod coding;

mod config;
mod distribute;
mod error;
mod estimate;
mod log;
mod media;
mod meter;
mod produce;
mod registry;
mod session;
mod sink;
mod track;
mod tracks;
mod transport;

pub use config::*;
pub use distribute::*;
pub use error::*;
pub use estimate::*;
pub use log::*;
pub use media::*;
pub use meter::*;
pub use produce::*;
pub use registry::*;
pub use session::*;
pub use sink::*;
pub use track::*;
pub use tracks::*;
pub use transport::*;
