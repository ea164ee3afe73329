use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Everything needed to run a [crate::Peer].
///
/// Can be flattened into a CLI or loaded from a TOML file.
#[derive(clap::Args, Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
	/// Namespaces we announce to the peer when the session starts.
	#[arg(id = "announce", long = "announce", value_delimiter = ',')]
	pub announce: Vec<String>,

	#[command(flatten)]
	pub feedback: FeedbackConfig,

	#[command(flatten)]
	pub media: MediaConfig,

	#[command(flatten)]
	pub estimator: EstimatorConfig,
}

/// What an accepted namespace is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
	/// Carries bitrate reports that drive the estimator.
	Feedback,

	/// Carries media that we play back.
	Media,
}

impl Config {
	/// Load and validate a TOML config file.
	pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		let config: Self = toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
		config.validate()?;

		Ok(config)
	}

	pub fn validate(&self) -> Result<(), Error> {
		self.estimator.validate()
	}

	/// The role of an announced namespace, or [None] if we don't accept it.
	pub fn role(&self, namespace: &str) -> Option<Role> {
		if namespace == self.feedback.namespace {
			return Some(Role::Feedback);
		}

		self.media.namespaces.iter().any(|ns| ns == namespace).then_some(Role::Media)
	}
}

#[derive(clap::Args, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FeedbackConfig {
	/// The namespace the peer announces to offer bitrate reports.
	#[arg(id = "feedback-namespace", long = "feedback-namespace", default_value = "moqfb")]
	pub namespace: String,

	/// The track carrying the reports.
	#[arg(id = "feedback-track", long = "feedback-track", default_value = "rate")]
	pub track: String,
}

impl Default for FeedbackConfig {
	fn default() -> Self {
		Self {
			namespace: "moqfb".to_string(),
			track: "rate".to_string(),
		}
	}
}

#[derive(clap::Args, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MediaConfig {
	/// Namespaces the peer may announce to offer media.
	#[arg(id = "media-namespace", long = "media-namespace", value_delimiter = ',', default_value = "moq")]
	pub namespaces: Vec<String>,

	/// The track we subscribe to within each media namespace.
	#[arg(id = "media-track", long = "media-track", default_value = "video")]
	pub track: String,
}

impl Default for MediaConfig {
	fn default() -> Self {
		Self {
			namespaces: vec!["moq".to_string()],
			track: "video".to_string(),
		}
	}
}

/// Tuning for the probing bitrate estimator.
#[derive(clap::Args, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EstimatorConfig {
	/// Ascending bitrate tiers in bits per second.
	#[arg(
		id = "estimator-tiers",
		long = "estimator-tiers",
		value_delimiter = ',',
		default_values_t = [1_000_000u64, 3_000_000, 5_000_000]
	)]
	pub tiers: Vec<u64>,

	/// A tier is chosen once the measured rate reaches this fraction of it.
	#[arg(id = "estimator-margin", long = "estimator-margin", default_value_t = 0.9)]
	pub margin: f64,

	/// The bitrate is multiplied by this when probing.
	#[arg(id = "estimator-probe-factor", long = "estimator-probe-factor", default_value_t = 3)]
	pub probe_factor: u64,

	/// How long to ignore samples after probing.
	#[arg(
		id = "estimator-probe-duration",
		long = "estimator-probe-duration",
		value_parser = humantime::parse_duration,
		default_value = "5s"
	)]
	#[serde(with = "humantime_serde")]
	pub probe_duration: Duration,

	/// How long to wait after a probe before probing again.
	#[arg(
		id = "estimator-probe-interval",
		long = "estimator-probe-interval",
		value_parser = humantime::parse_duration,
		default_value = "10s"
	)]
	#[serde(with = "humantime_serde")]
	pub probe_interval: Duration,
}

impl Default for EstimatorConfig {
	fn default() -> Self {
		Self {
			tiers: vec![1_000_000, 3_000_000, 5_000_000],
			margin: 0.9,
			probe_factor: 3,
			probe_duration: Duration::from_secs(5),
			probe_interval: Duration::from_secs(10),
		}
	}
}

impl EstimatorConfig {
	pub fn validate(&self) -> Result<(), Error> {
		if self.tiers.is_empty() {
			return Err(Error::Config("at least one tier is required".to_string()));
		}

		if self.tiers.windows(2).any(|pair| pair[0] >= pair[1]) {
			return Err(Error::Config("tiers must be strictly ascending".to_string()));
		}

		if !(self.margin > 0.0 && self.margin <= 1.0) {
			return Err(Error::Config(format!("margin must be within (0, 1]: {}", self.margin)));
		}

		if self.probe_factor == 0 {
			return Err(Error::Config("probe factor must be non-zero".to_string()));
		}

		Ok(())
	}
}
