//! The accounting sink: a null device that counts what it swallows.
//!
//! Writes are discarded but their lengths are added to a single counter.
//! Once a write would push the counter past a non-zero capacity it is
//! refused whole; there is no partial acceptance. Reads are always at end
//! of stream and seeking always lands on 0.
//!
//! The capacity check and the counter update form one critical section,
//! so concurrent writers can never both pass the check on a stale count.
use derive_more::Display;
use tracing::{debug, warn};

use crate::gate::{Gate, Interrupt, Interrupted};
use crate::query::Query;

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum WriteError {
	#[display(
		fmt = "writing {} byte(s) would exceed the capacity of {} ({} already written)",
		requested,
		capacity,
		written
	)]
	CapacityExceeded { capacity: u64, written: u64, requested: u64 },
	#[display(fmt = "interrupted while waiting for the sink")]
	Interrupted,
	/// Only reachable without a capacity; a limited sink reports
	/// `CapacityExceeded` instead.
	#[display(fmt = "byte counter would overflow ({} + {})", written, requested)]
	Overflow { written: u64, requested: u64 },
}

impl From<Interrupted> for WriteError {
	fn from(_: Interrupted) -> Self {
		WriteError::Interrupted
	}
}

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum QueryError {
	#[display(fmt = "interrupted while waiting for the sink")]
	Interrupted,
	#[display(fmt = "unsupported query {:#x}", code)]
	Unsupported { code: u32 },
}

impl From<Interrupted> for QueryError {
	fn from(_: Interrupted) -> Self {
		QueryError::Interrupted
	}
}

#[derive(Debug)]
pub struct AccountingSink {
	/// 0 means no limit
	capacity: u64,
	written: Gate<u64>,
}

impl AccountingSink {
	pub fn new(capacity: u64) -> Self {
		Self { capacity, written: Gate::new(0) }
	}

	#[inline]
	pub fn capacity(&self) -> u64 {
		self.capacity
	}

	#[inline]
	pub fn is_unlimited(&self) -> bool {
		self.capacity == 0
	}

	/// Accounts for `requested_len` bytes, returning how many were accepted:
	/// all of them, or none.
	pub fn write(
		&self,
		requested_len: u64,
		interrupt: &Interrupt,
	) -> Result<u64, WriteError> {
		let mut written = self.written.lock(interrupt)?;

		match self.admit(*written, requested_len) {
			Ok(total) => {
				*written = total;
				debug!(requested_len, written = total, "write accepted");
				Ok(requested_len)
			}
			Err(err) => {
				warn!(requested_len, written = *written, %err, "write rejected");
				Err(err)
			}
		}
	}

	/// New counter value if `requested` more bytes fit.
	fn admit(&self, written: u64, requested: u64) -> Result<u64, WriteError> {
		match (written.checked_add(requested), self.capacity) {
			(Some(total), 0) => Ok(total),
			(Some(total), capacity) if total <= capacity => Ok(total),
			(None, 0) => Err(WriteError::Overflow { written, requested }),
			(_, capacity) => {
				Err(WriteError::CapacityExceeded { capacity, written, requested })
			}
		}
	}

	/// Always end of stream.
	#[inline]
	pub fn read(&self) -> usize {
		0
	}

	/// Every seek, whatever the offset or origin, lands on 0.
	#[inline]
	pub fn reset_position(&self) -> u64 {
		0
	}

	pub fn query_total_written(
		&self,
		interrupt: &Interrupt,
	) -> Result<u64, QueryError> {
		let written = *self.written.lock(interrupt)?;
		debug!(written, "total size queried");
		Ok(written)
	}

	pub fn query(
		&self,
		query: Query,
		interrupt: &Interrupt,
	) -> Result<u64, QueryError> {
		match query {
			Query::TotalSize => self.query_total_written(interrupt),
			Query::Other(code) => Err(QueryError::Unsupported { code }),
		}
	}

	/// Holds the counter so other callers block on it.
	#[cfg(test)]
	pub(crate) fn hold(&self, interrupt: &Interrupt) -> crate::gate::Guard<'_, u64> {
		self.written.lock(interrupt).expect("uncontended in tests")
	}
}
