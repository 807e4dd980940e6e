//! The leak tracker's table lock: `parking_lot` when enabled, std otherwise.

#[cfg(feature = "parking_lot")]
pub use parking_lot::Mutex;

#[cfg(not(feature = "parking_lot"))]
pub use self::fallback::Mutex;

#[cfg(not(feature = "parking_lot"))]
mod fallback {
    use std::sync::{MutexGuard, PoisonError};

    /// `std::sync::Mutex` with a `parking_lot`-shaped `lock`.
    ///
    /// A panicking sink poisons the lock; later frees still have to get in.
    pub struct Mutex<T>(std::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub const fn new(value: T) -> Self {
            Self(std::sync::Mutex::new(value))
        }

        pub fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}
