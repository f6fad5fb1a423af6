//! nulll is a throttled /dev/null: writes are thrown away but counted, and
//! once a configured capacity is reached further writes fail with ENOSPC.
//! Reads are always at end of stream, seeks always land on 0, and the
//! block-device size query reports how many bytes were swallowed so far.
//!
//! Implementation notes:
//! - One counter per sink, guarded by a lock whose waits can be interrupted.
//! - The capacity check and the counter update are a single critical
//!   section. Never check outside the lock.
//! - No data is kept and nothing survives a restart.
//! - Assumes linux, 64 bit, little endian, since the size query hands out
//!   a raw native `u64`.

#[cfg(not(target_pointer_width = "64"))]
compile_error!("code assumes usize is u64");
#[cfg(not(target_endian = "little"))]
compile_error!("code assumes little-endian");
// May work on other OSes but no testing has been done. Remove if you want!
#[cfg(not(target_os = "linux"))]
compile_error!("code assumes linux");

pub mod config;
pub mod gate;
pub mod host;
pub mod logging;
pub mod query;
pub mod sink;
#[cfg(test)]
mod test_utils;

pub use gate::{Interrupt, Interrupted};
pub use query::{Query, BLKGETSIZE64};
pub use sink::{AccountingSink, QueryError, WriteError};
