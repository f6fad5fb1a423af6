//! A lock whose acquisition can be interrupted.
//!
//! `std::sync::Mutex` blocks until it gets the lock, no matter what. Device
//! style callers need the `mutex_lock_interruptible` contract instead: a
//! caller parked on the lock can be told to give up, and then walks away
//! without having touched the protected value.
//!
//! The protected value is handed from holder to holder. A `Gate` keeps it in
//! a slot; whoever takes it out owns the lock, and the guard puts it back on
//! drop. Every calling context carries an `Interrupt`, a cloneable flag that
//! some other thread can raise.
use core::fmt;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use derive_more::Display;

/// Returned when the waiting caller's `Interrupt` was raised.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[display(fmt = "interrupted while waiting for the lock")]
pub struct Interrupted;

// Nothing panics while holding these, but a panicking test thread must not
// wedge everybody else.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

trait Wake: Send + Sync {
	fn wake(&self);
}

#[derive(Default)]
struct Signal {
	raised: AtomicBool,
	/// One entry per waiter currently blocked under this flag. Clones of an
	/// `Interrupt` can wait on several gates, or on one gate several times.
	parked_on: Mutex<Vec<Arc<dyn Wake>>>,
}

/// Cancellation flag for one calling context.
///
/// Raising is sticky, like a pending signal: every interruptible wait fails
/// until `clear` is called.
#[derive(Clone, Default)]
pub struct Interrupt(Arc<Signal>);

impl Interrupt {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn raise(&self) {
		self.0.raised.store(true, Ordering::SeqCst);
		// Clone out so a gate's slot is never locked under `parked_on`.
		let parked = lock(&self.0.parked_on).clone();
		for gate in parked {
			gate.wake();
		}
	}

	pub fn clear(&self) {
		self.0.raised.store(false, Ordering::SeqCst);
	}

	pub fn is_raised(&self) -> bool {
		self.0.raised.load(Ordering::SeqCst)
	}

	fn park(&self, on: Arc<dyn Wake>) {
		lock(&self.0.parked_on).push(on);
	}

	/// Drops one entry for `on`; other waiters on the same gate stay parked.
	fn unpark(&self, on: &Arc<dyn Wake>) {
		let mut parked = lock(&self.0.parked_on);
		let same = |p: &Arc<dyn Wake>| {
			Arc::as_ptr(p) as *const () == Arc::as_ptr(on) as *const ()
		};
		if let Some(i) = parked.iter().position(same) {
			parked.swap_remove(i);
		}
	}
}

impl fmt::Debug for Interrupt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Interrupt").field(&self.is_raised()).finish()
	}
}

struct Shared<T> {
	slot: Mutex<Option<T>>,
	freed: Condvar,
}

impl<T: Send> Wake for Shared<T> {
	fn wake(&self) {
		// Taking the slot lock orders this after the waiter's flag check.
		let _slot = lock(&self.slot);
		self.freed.notify_all();
	}
}

pub struct Gate<T> {
	shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Gate<T> {
	pub fn new(value: T) -> Self {
		let shared = Shared { slot: Mutex::new(Some(value)), freed: Condvar::new() };
		Self { shared: Arc::new(shared) }
	}

	/// Blocks until the value is free or `interrupt` is raised.
	///
	/// An uncontended lock succeeds even when `interrupt` is already raised;
	/// only waiting is interruptible.
	pub fn lock(&self, interrupt: &Interrupt) -> Result<Guard<'_, T>, Interrupted> {
		let mut slot = lock(&self.shared.slot);
		if let Some(value) = slot.take() {
			return Ok(Guard { gate: self, value: Some(value) });
		}

		// Park before looking at the flag, so a raise either sees us parked
		// or happens before the check below.
		let waker: Arc<dyn Wake> = self.shared.clone();
		interrupt.park(waker.clone());
		let taken = loop {
			if interrupt.is_raised() {
				break None;
			}
			slot = self
				.shared
				.freed
				.wait(slot)
				.unwrap_or_else(PoisonError::into_inner);
			if let Some(value) = slot.take() {
				break Some(value);
			}
		};
		interrupt.unpark(&waker);

		match taken {
			Some(value) => Ok(Guard { gate: self, value: Some(value) }),
			None => {
				// We may have swallowed the release meant for another waiter.
				if slot.is_some() {
					self.shared.freed.notify_one();
				}
				Err(Interrupted)
			}
		}
	}
}

impl<T> fmt::Debug for Gate<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Gate").finish_non_exhaustive()
	}
}

/// Owns the protected value until dropped.
pub struct Guard<'a, T> {
	gate: &'a Gate<T>,
	value: Option<T>,
}

impl<T> Deref for Guard<'_, T> {
	type Target = T;

	fn deref(&self) -> &T {
		self.value.as_ref().expect("value is held until drop")
	}
}

impl<T> DerefMut for Guard<'_, T> {
	fn deref_mut(&mut self) -> &mut T {
		self.value.as_mut().expect("value is held until drop")
	}
}

impl<T> Drop for Guard<'_, T> {
	fn drop(&mut self) {
		if let Some(value) = self.value.take() {
			*lock(&self.gate.shared.slot) = Some(value);
			self.gate.shared.freed.notify_one();
		}
	}
}
