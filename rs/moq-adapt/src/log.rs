use serde::{Deserialize, Serialize};
use serde_with::DisplayFromStr;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Logging configuration, written to stderr.
///
/// `RUST_LOG` directives take precedence over the level.
#[serde_with::serde_as]
#[derive(clap::Args, Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Log {
	/// The default level for every target.
	#[serde_as(as = "DisplayFromStr")]
	#[arg(id = "log-level", long = "log-level", default_value = "info", env = "MOQ_LOG_LEVEL")]
	pub level: tracing::Level,
}

impl Default for Log {
	fn default() -> Self {
		Self {
			level: tracing::Level::INFO,
		}
	}
}

impl Log {
	pub fn level(&self) -> LevelFilter {
		LevelFilter::from_level(self.level)
	}

	/// Install the global subscriber, failing if one is already set.
	pub fn init(&self) -> anyhow::Result<()> {
		let filter = EnvFilter::builder()
			.with_default_directive(self.level().into())
			.from_env_lossy()
			.add_directive("tokio=info".parse()?)
			.add_directive("runtime=info".parse()?);

		tracing_subscriber::fmt()
			.with_writer(std::io::stderr)
			.with_env_filter(filter)
			.try_init()
			.map_err(|err| anyhow::anyhow!(err))?;

		Ok(())
	}
}
