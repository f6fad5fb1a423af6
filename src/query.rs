//! Typed control queries, in place of raw ioctl request numbers.

/// `_IOR(0x12, 114, size_t)`: block device size in bytes, as a `u64`.
pub const BLKGETSIZE64: u32 = 0x8008_1272;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Query {
	/// Cumulative bytes written, answered in the block-device size format.
	TotalSize,
	/// Any request code the sink does not recognise.
	Other(u32),
}

impl Query {
	pub fn code(self) -> u32 {
		match self {
			Query::TotalSize => BLKGETSIZE64,
			Query::Other(code) => code,
		}
	}
}

impl From<u32> for Query {
	fn from(code: u32) -> Self {
		match code {
			BLKGETSIZE64 => Query::TotalSize,
			code => Query::Other(code),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn only_blkgetsize64_is_recognised() {
		assert_eq!(Query::from(BLKGETSIZE64), Query::TotalSize);
		// BLKGETSIZE (32 bit) and FIONREAD look similar but are not ours
		assert_eq!(Query::from(0x1260), Query::Other(0x1260));
		assert_eq!(Query::from(0x541b), Query::Other(0x541b));
		assert_eq!(Query::from(0x541b).code(), 0x541b);
		assert_eq!(Query::TotalSize.code(), BLKGETSIZE64);
	}
}
