//! A write-once cell.
//!
//! This structure is similar to `std::sync::OnceLock`, but initialization is given a value
//! rather than a closure, and a second initialization attempt is reported to the caller
//! instead of being silently ignored. The rejected value is handed back.
//!
//! Once initialized, the cell only ever hands out shared references, so it can be read
//! concurrently without any further synchronization.
//!
//! ## Examples
//!
//! ```rust
//! # use hyperdrive::once::Once;
//! #
//! static ONCE: Once<u8> = Once::uninit();
//! assert!(ONCE.get().is_none());
//!
//! assert_eq!(ONCE.try_init(42), Ok(&42));
//! assert_eq!(ONCE.try_init(7), Err(7));
//!
//! assert_eq!(ONCE.get(), Some(&42));
//! ```
use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Possible states of the `Once` structure.
enum State {
    Uninitialized,
    Initializing,
    Initialized,
}

impl State {
    const fn from_raw(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            _ => Self::Initialized,
        }
    }

    const fn as_raw(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Initialized => 2,
        }
    }
}

/// Wrapper around `AtomicU8` to provide a more convenient API.
struct AtomicState(AtomicU8);

impl AtomicState {
    const fn uninit() -> Self {
        Self(AtomicU8::new(State::Uninitialized.as_raw()))
    }

    fn load(&self, order: Ordering) -> State {
        State::from_raw(self.0.load(order))
    }

    fn try_claim(&self) -> bool {
        self.0
            .compare_exchange(
                State::Uninitialized.as_raw(),
                State::Initializing.as_raw(),
                Ordering::Acquire,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    fn store(&self, value: State, order: Ordering) {
        self.0.store(value.as_raw(), order);
    }
}

/// A cell that can be written exactly once.
///
/// This structure is not a lock and does NOT provide interior mutability
/// after initialization.
pub struct Once<T> {
    state: AtomicState,
    value: UnsafeCell<MaybeUninit<T>>,
}

// Safety:
// `Once` only provides an immutable reference to the value when initialized.
// Exactly one caller wins the `Uninitialized -> Initializing` transition and writes the value.
#[allow(clippy::non_send_fields_in_send_ty)]
unsafe impl<T: Send> Send for Once<T> {}
unsafe impl<T: Send + Sync> Sync for Once<T> {}

impl<T> Default for Once<T> {
    fn default() -> Self {
        Self::uninit()
    }
}

impl<T> Once<T> {
    #[must_use]
    pub const fn uninit() -> Self {
        Self {
            state: AtomicState::uninit(),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Stores `value` if the cell has never been initialized.
    ///
    /// Returns a reference to the stored value.
    ///
    /// # Errors
    ///
    /// Gives `value` back if another initialization already happened
    /// or is in progress.
    pub fn try_init(&self, value: T) -> Result<&T, T> {
        if !self.state.try_claim() {
            return Err(value);
        }

        // Safety:
        // Thanks to `self.state`, we are the only one accessing the value right now.
        let stored = unsafe { (*self.value.get()).write(value) };

        self.state.store(State::Initialized, Ordering::Release);

        Ok(stored)
    }

    #[must_use]
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == State::Initialized
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        match self.state.load(Ordering::Acquire) {
            State::Initialized => {
                // Safety:
                // We have ensured that the value is initialized.
                Some(unsafe { (*self.value.get()).assume_init_ref() })
            }
            // The value is being written and will be readable shortly.
            // `try_init` never runs user code while in this state, so it cannot get stuck.
            State::Initializing => {
                while self.state.load(Ordering::Acquire) == State::Initializing {
                    core::hint::spin_loop();
                }
                debug_assert_eq!(self.state.load(Ordering::Acquire), State::Initialized);
                Some(unsafe { (*self.value.get()).assume_init_ref() })
            }
            State::Uninitialized => None,
        }
    }
}

impl<T> Drop for Once<T> {
    fn drop(&mut self) {
        if self.state.load(Ordering::Acquire) == State::Initialized {
            // Safety:
            // We are the only one accessing the value right now (dropping)
            // AND the value is initialized (if-statement).
            unsafe { (*self.value.get()).assume_init_drop() };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread::spawn;

    #[test]
    fn test_once() {
        let once = Once::uninit();
        assert!(once.get().is_none());
        assert!(!once.is_initialized());

        assert_eq!(once.try_init(42), Ok(&42));

        assert!(once.is_initialized());
        assert_eq!(once.get(), Some(&42));
    }

    #[test]
    fn test_once_rejects_second_init() {
        let once = Once::uninit();

        assert!(once.try_init(42).is_ok());
        assert_eq!(once.try_init(43), Err(43));
        assert_eq!(once.get(), Some(&42));
    }

    #[test]
    fn test_drop_initialized() {
        let value = Arc::new(());
        let once = Once::uninit();
        once.try_init(value.clone()).unwrap();
        assert_eq!(Arc::strong_count(&value), 2);

        drop(once);
        assert_eq!(Arc::strong_count(&value), 1);
    }

    #[test]
    fn test_concurrent_init() {
        let once = Arc::new(Once::uninit());

        let num_threads = 10;
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles = (0..num_threads)
            .map(|i| {
                spawn({
                    let once = once.clone();
                    let barrier = barrier.clone();
                    move || {
                        barrier.wait();
                        once.try_init(i).is_ok()
                    }
                })
            })
            .collect::<Vec<_>>();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(once.get().is_some());
    }

    #[test]
    fn test_concurrent_read() {
        let once = Arc::new(Once::uninit());
        once.try_init(42).unwrap();

        let num_threads = 10;
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles = (0..num_threads)
            .map(|_| {
                spawn({
                    let once = once.clone();
                    let barrier = barrier.clone();
                    move || {
                        let value = *once.get().unwrap();
                        barrier.wait();
                        assert_eq!(value, 42);
                    }
                })
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
