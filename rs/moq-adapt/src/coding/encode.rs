use bytes::{Bytes, BytesMut};

/// Write the value to a buffer.
pub trait Encode: Sized {
	/// Encode the value to the given writer.
	///
	/// This will panic if the [bytes::BufMut] does not have enough capacity.
	fn encode<W: bytes::BufMut>(&self, w: &mut W);

	/// Encode the value into a [Bytes] buffer.
	///
	/// NOTE: This will allocate.
	fn encode_bytes(&self) -> Bytes {
		let mut buf = BytesMut::new();
		self.encode(&mut buf);
		buf.freeze()
	}
}
