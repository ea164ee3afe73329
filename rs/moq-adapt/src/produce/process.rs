use std::process::Stdio;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::{Error, ForwardingPreference, ObjectSequence, TrackWriter};

/// The largest payload read from the process at once.
pub const PROCESS_CHUNK_SIZE: usize = 1024;

/// Publishes the stdout of an external encoder, chunk by chunk.
///
/// The process is spawned by [Self::start] and killed if the track ends first.
#[derive(Clone, Debug)]
pub struct ProcessProducer {
	program: String,
	args: Vec<String>,
	chunk_size: usize,
	forwarding: ForwardingPreference,
}

impl ProcessProducer {
	pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			program: program.into(),
			args: args.into_iter().map(Into::into).collect(),
			chunk_size: PROCESS_CHUNK_SIZE,
			forwarding: ForwardingPreference::StreamTrack,
		}
	}

	/// Real-time fragmented MP4 of ffmpeg's synthetic test pattern.
	pub fn ffmpeg_test_source() -> Self {
		Self::new(
			"ffmpeg",
			[
				"-hide_banner",
				"-v",
				"quiet",
				"-f",
				"lavfi",
				"-re",
				"-i",
				"testsrc",
				"-f",
				"mp4",
				"-movflags",
				"cmaf+separate_moof+delay_moov+skip_trailer+frag_every_frame",
				"-",
			],
		)
	}

	pub fn with_chunk_size(mut self, size: usize) -> Self {
		self.chunk_size = size.max(1);
		self
	}

	pub fn with_forwarding(mut self, forwarding: ForwardingPreference) -> Self {
		self.forwarding = forwarding;
		self
	}

	pub async fn start<W: TrackWriter>(&self, mut track: W) -> Result<(), Error> {
		let mut child = Command::new(&self.program)
			.args(&self.args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::inherit())
			.kill_on_drop(true)
			.spawn()?;

		tracing::debug!(program = %self.program, pid = ?child.id(), "spawned process");

		let mut stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::pipeline("process stdout not captured"))?;

		let res = self.forward(&mut stdout, &mut track).await;
		match &res {
			Ok(()) => {
				let status = child.wait().await?;
				tracing::debug!(%status, "process exited");
			}
			Err(err) => {
				tracing::debug!(%err, "killing process");
				child.kill().await.ok();
			}
		}

		res
	}

	async fn forward<R, W>(&self, stdout: &mut R, track: &mut W) -> Result<(), Error>
	where
		R: AsyncRead + Unpin,
		W: TrackWriter,
	{
		let mut sequence = ObjectSequence::new(0, self.forwarding);
		let mut buffer = vec![0u8; self.chunk_size];

		loop {
			let size = stdout.read(&mut buffer).await?;
			if size == 0 {
				return Ok(());
			}

			let payload = Bytes::copy_from_slice(&buffer[..size]);
			track.write_object(sequence.next(payload)).await?;
		}
	}

	pub fn set_bitrate(&self, bps: u64) {
		tracing::debug!(bps, program = %self.program, "process has no adjustable bitrate");
	}
}
