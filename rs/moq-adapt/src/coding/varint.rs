// Based on quinn-proto
// https://github.com/quinn-rs/quinn/blob/main/quinn-proto/src/varint.rs
// Licensed via Apache 2.0 and MIT

use std::fmt;

use thiserror::Error;

use super::{Decode, DecodeError, Encode};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("value too large for varint encoding")]
pub struct BoundsExceeded;

impl From<BoundsExceeded> for DecodeError {
	fn from(_: BoundsExceeded) -> Self {
		DecodeError::BoundsExceeded
	}
}

/// An integer less than 2^62
///
/// Values of this type are suitable for encoding as QUIC variable-length integer.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarInt(u64);

impl VarInt {
	pub const MAX: Self = Self((1 << 62) - 1);
	pub const ZERO: Self = Self(0);

	/// Construct a `VarInt` infallibly using the largest available type.
	/// Larger values need to use `try_from` instead.
	pub const fn from_u32(x: u32) -> Self {
		Self(x as u64)
	}

	/// Extract the integer value
	pub const fn into_inner(self) -> u64 {
		self.0
	}

	/// The number of bytes this value occupies once encoded.
	pub const fn size(self) -> usize {
		let x = self.0;
		if x < 2u64.pow(6) {
			1
		} else if x < 2u64.pow(14) {
			2
		} else if x < 2u64.pow(30) {
			4
		} else {
			8
		}
	}
}

impl From<VarInt> for u64 {
	fn from(x: VarInt) -> Self {
		x.0
	}
}

impl From<u32> for VarInt {
	fn from(x: u32) -> Self {
		Self(x.into())
	}
}

impl TryFrom<u64> for VarInt {
	type Error = BoundsExceeded;

	/// Succeeds iff `x` < 2^62
	fn try_from(x: u64) -> Result<Self, BoundsExceeded> {
		if x <= Self::MAX.into_inner() {
			Ok(Self(x))
		} else {
			Err(BoundsExceeded)
		}
	}
}

impl fmt::Debug for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl fmt::Display for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl Decode for VarInt {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		if !r.has_remaining() {
			return Err(DecodeError::Short);
		}

		let mut buf = [0; 8];
		buf[0] = r.chunk()[0];

		let size = 1 << (buf[0] >> 6);
		if r.remaining() < size {
			return Err(DecodeError::Short);
		}

		r.copy_to_slice(&mut buf[..size]);
		buf[0] &= 0b0011_1111;

		let x = match size {
			1 => u64::from(buf[0]),
			2 => u64::from(u16::from_be_bytes([buf[0], buf[1]])),
			4 => u64::from(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
			_ => u64::from_be_bytes(buf),
		};

		Ok(Self(x))
	}
}

impl Encode for VarInt {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		let x = self.0;
		match self.size() {
			1 => w.put_u8(x as u8),
			2 => w.put_u16((0b01 << 14) | x as u16),
			4 => w.put_u32((0b10 << 30) | x as u32),
			_ => w.put_u64((0b11 << 62) | x),
		}
	}
}
