//! Binds sinks to the outside world: a registry of named devices, open file
//! handles, and the errno vocabulary callers of a character device expect.
//!
//! Nothing in here touches the counter directly; every operation is a thin
//! translation onto `AccountingSink`.
use std::io::SeekFrom;
use std::sync::{Arc, Mutex, PoisonError};

use derive_more::Display;
use hashbrown::HashMap;
use rustix::fd::AsFd;
use rustix::io::{self, Errno};
use tracing::{debug, error, info};

use crate::gate::Interrupt;
use crate::query::Query;
use crate::sink::{AccountingSink, QueryError, WriteError};

impl From<WriteError> for Errno {
	fn from(err: WriteError) -> Self {
		match err {
			WriteError::CapacityExceeded { .. } => Errno::NOSPC,
			WriteError::Interrupted => Errno::INTR,
			WriteError::Overflow { .. } => Errno::OVERFLOW,
		}
	}
}

impl From<QueryError> for Errno {
	fn from(err: QueryError) -> Self {
		match err {
			QueryError::Interrupted => Errno::INTR,
			QueryError::Unsupported { .. } => Errno::NOTTY,
		}
	}
}

#[derive(Debug, Display, PartialEq)]
pub enum RegisterErr {
	#[display(fmt = "device {:?} is already registered", _0)]
	Exists(String),
	#[display(fmt = "device name must not be empty")]
	EmptyName,
}

#[derive(Debug, Display, PartialEq)]
pub enum OpenErr {
	#[display(fmt = "no device named {:?}", _0)]
	NoDevice(String),
}

impl From<OpenErr> for Errno {
	fn from(err: OpenErr) -> Self {
		match err {
			OpenErr::NoDevice(_) => Errno::NODEV,
		}
	}
}

impl From<RegisterErr> for Errno {
	fn from(err: RegisterErr) -> Self {
		match err {
			RegisterErr::Exists(_) => Errno::EXIST,
			RegisterErr::EmptyName => Errno::INVAL,
		}
	}
}

/// Devices by name. Each registered sink is shared with every open handle.
#[derive(Debug, Default)]
pub struct Registry {
	devices: Mutex<HashMap<String, Arc<AccountingSink>>>,
}

impl Registry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(
		&self,
		name: &str,
		sink: Arc<AccountingSink>,
	) -> Result<(), RegisterErr> {
		if name.is_empty() {
			error!("refusing to register a device without a name");
			return Err(RegisterErr::EmptyName);
		}

		let mut devices =
			self.devices.lock().unwrap_or_else(PoisonError::into_inner);
		if devices.contains_key(name) {
			error!(device = name, "device registration failed, name taken");
			return Err(RegisterErr::Exists(name.to_owned()));
		}

		let (capacity, unlimited) = (sink.capacity(), sink.is_unlimited());
		devices.insert(name.to_owned(), sink);
		info!(device = name, capacity, unlimited, "device registered");
		Ok(())
	}

	/// Removes the device. Handles that are still open keep their sink.
	pub fn deregister(&self, name: &str) -> Option<Arc<AccountingSink>> {
		let removed = self
			.devices
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.remove(name);
		if removed.is_some() {
			info!(device = name, "device unregistered");
		}
		removed
	}

	pub fn open(&self, name: &str) -> Result<File, OpenErr> {
		let devices =
			self.devices.lock().unwrap_or_else(PoisonError::into_inner);
		let sink = devices
			.get(name)
			.cloned()
			.ok_or_else(|| OpenErr::NoDevice(name.to_owned()))?;
		debug!(device = name, "device opened");
		Ok(File { sink, pos: 0, interrupt: Interrupt::new() })
	}
}

/// An open handle on a registered sink.
#[derive(Debug)]
pub struct File {
	sink: Arc<AccountingSink>,
	pos: u64,
	interrupt: Interrupt,
}

impl File {
	/// Raising the returned flag interrupts whatever this handle is waiting on.
	pub fn interrupt(&self) -> Interrupt {
		self.interrupt.clone()
	}

	/// Writes are never positional, `_offset` is accepted for shape only.
	pub fn write(&self, _offset: u64, buf: &[u8]) -> io::Result<usize> {
		let accepted = self.sink.write(buf.len() as u64, &self.interrupt)?;
		Ok(accepted as usize)
	}

	pub fn read(&self, _buf: &mut [u8]) -> io::Result<usize> {
		Ok(self.sink.read())
	}

	pub fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
		self.pos = self.sink.reset_position();
		Ok(self.pos)
	}

	/// Answers `request` by copying a native `u64` to the front of `out`.
	pub fn ioctl(&self, request: u32, out: &mut [u8]) -> io::Result<()> {
		let total = self.sink.query(Query::from(request), &self.interrupt)?;
		let bytes = bytemuck::bytes_of(&total);
		out.get_mut(..bytes.len())
			.ok_or(Errno::FAULT)?
			.copy_from_slice(bytes);
		Ok(())
	}
}

#[derive(Debug, Display, PartialEq)]
pub enum PumpErr {
	#[display(fmt = "reading input failed: {}", _0)]
	Read(Errno),
	#[display(fmt = "device refused a write after {} byte(s): {}", accepted, errno)]
	Device { accepted: u64, errno: Errno },
}

/// Copies `fd` into `file` until end of stream, `buf.len()` bytes at a time.
/// Returns the number of bytes the device accepted.
pub fn pump<Fd: AsFd>(
	fd: Fd,
	file: &File,
	buf: &mut [u8],
) -> Result<u64, PumpErr> {
	let mut accepted = 0u64;
	loop {
		let n = match io::read(fd.as_fd(), &mut *buf) {
			Ok(0) => return Ok(accepted),
			Ok(n) => n,
			Err(Errno::INTR) => continue,
			Err(errno) => return Err(PumpErr::Read(errno)),
		};
		file.write(accepted, &buf[..n])
			.map_err(|errno| PumpErr::Device { accepted, errno })?;
		accepted += n as u64;
	}
}
