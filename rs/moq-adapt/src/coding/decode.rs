use thiserror::Error;

/// Read the value from a buffer.
///
/// If [DecodeError::Short] is returned, the buffer did not contain the whole value.
pub trait Decode: Sized {
	/// Decode the value from the given buffer.
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError>;

	/// Decode the value, requiring that it consumes the entire buffer.
	fn decode_exact<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError> {
		let value = Self::decode(buf)?;
		match buf.has_remaining() {
			true => Err(DecodeError::Long),
			false => Ok(value),
		}
	}
}

/// A decode error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
	#[error("short buffer")]
	Short,

	#[error("long buffer")]
	Long,

	#[error("bounds exceeded")]
	BoundsExceeded,
}
