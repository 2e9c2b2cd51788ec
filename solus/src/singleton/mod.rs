// Copyright 2024 tison <wander4096@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Holders that own at most one lazily constructed instance.
//!
//! The module provides:
//!
//! - [`Singleton`]: constructs its instance on first access with an infallible constructor.
//! - [`TrySingleton`]: the same, for constructors that may fail. A failed construction leaves
//!   the holder empty so that a later call can retry.
//!
//! Both holders bind the constructor when the holder itself is created, so the type they hold
//! can keep its constructor private and hand out nothing but a holder:
//!
//! ```
//! use solus::singleton::Singleton;
//!
//! pub struct Config {
//!     name: String,
//! }
//!
//! impl Config {
//!     fn new(name: &str) -> Self {
//!         Config {
//!             name: name.to_string(),
//!         }
//!     }
//!
//!     pub fn get_instance(name: &'static str) -> &'static Config {
//!         static INSTANCE: Singleton<Config, &'static str> = Singleton::new(Config::new);
//!         INSTANCE.get_instance(name)
//!     }
//! }
//!
//! let first = Config::get_instance("first");
//! let second = Config::get_instance("second");
//! assert!(std::ptr::eq(first, second));
//! assert_eq!(second.name, "first");
//! ```
//!
//! A holder does not have to be a `static`. It can be created once at startup, owned by an
//! application context and passed by reference to whoever needs the instance.

use std::fmt;

use self::slot::Slot;

mod slot;


/// A holder that lazily constructs a single `T` from arguments of type `A`.
///
/// The first call to [`get_instance`] runs the constructor with the arguments it was given; every
/// later call ignores its arguments and returns the same instance. Once constructed, the
/// instance is never replaced and lives as long as the holder.
///
/// Construction is guarded by a lock. Threads racing on an empty holder block until the first
/// one finishes constructing, then observe its instance. Like [`std::sync::OnceLock`], calling
/// [`get_instance`] on the same holder from inside its own constructor deadlocks.
///
/// There is no poisoning: if the constructor panics, the attempt is abandoned and the next
/// caller constructs again.
///
/// # Examples
///
/// ```
/// use solus::singleton::Singleton;
///
/// static COUNTER: Singleton<Vec<u32>, usize> = Singleton::new(Vec::with_capacity);
///
/// assert!(COUNTER.get().is_none());
/// let v = COUNTER.get_instance(16);
/// assert!(v.capacity() >= 16);
/// assert!(COUNTER.is_initialized());
/// ```
///
/// [`get_instance`]: Singleton::get_instance
pub struct Singleton<T, A = ()> {
    slot: Slot<T>,
    init: fn(A) -> T,
}

impl<T, A> Singleton<T, A> {
    /// Creates an empty holder that will construct its instance with `init`.
    pub const fn new(init: fn(A) -> T) -> Self {
        Self {
            slot: Slot::new(),
            init,
        }
    }

    /// Returns the held instance, constructing it from `args` if this is the first access.
    ///
    /// `args` is dropped unused once an instance exists.
    pub fn get_instance(&self, args: A) -> &T {
        let init = self.init;
        self.slot.get_or_init(move || init(args))
    }

    /// Returns the held instance, constructing it with `f` instead of the bound constructor if
    /// this is the first access.
    ///
    /// # Examples
    ///
    /// ```
    /// use solus::singleton::Singleton;
    ///
    /// let holder: Singleton<String, &str> = Singleton::new(str::to_uppercase);
    /// assert_eq!(holder.get_or_init(|| "custom".to_string()), "custom");
    /// assert_eq!(holder.get_instance("ignored"), "custom");
    /// ```
    pub fn get_or_init<F>(&self, f: F) -> &T
    where
        F: FnOnce() -> T,
    {
        self.slot.get_or_init(f)
    }

    /// Returns the held instance, or `None` if it has not been constructed yet.
    ///
    /// This method never blocks.
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Returns `true` if the instance has been constructed.
    pub fn is_initialized(&self) -> bool {
        self.slot.is_initialized()
    }
}

impl<T: fmt::Debug, A> fmt::Debug for Singleton<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Singleton").field(&self.slot).finish()
    }
}

/// A holder that lazily constructs a single `T` with a constructor that may fail.
///
/// Behaves like [`Singleton`], except that a constructor error is returned to the caller right
/// away and the holder stays empty. The next call to [`get_instance`] constructs again with its
/// own arguments.
///
/// # Examples
///
/// ```
/// use solus::singleton::TrySingleton;
///
/// fn parse(s: &str) -> Result<u16, std::num::ParseIntError> {
///     s.parse()
/// }
///
/// let port: TrySingleton<u16, &str, _> = TrySingleton::new(parse);
/// assert!(port.get_instance("http").is_err());
/// assert!(!port.is_initialized());
/// assert_eq!(*port.get_instance("8080").unwrap(), 8080);
/// assert_eq!(*port.get_instance("9090").unwrap(), 8080);
/// ```
///
/// [`get_instance`]: TrySingleton::get_instance
pub struct TrySingleton<T, A, E> {
    slot: Slot<T>,
    init: fn(A) -> Result<T, E>,
}

impl<T, A, E> TrySingleton<T, A, E> {
    /// Creates an empty holder that will construct its instance with `init`.
    pub const fn new(init: fn(A) -> Result<T, E>) -> Self {
        Self {
            slot: Slot::new(),
            init,
        }
    }

    /// Returns the held instance, constructing it from `args` if this is the first access.
    ///
    /// If construction fails, the error is returned and the holder stays empty.
    pub fn get_instance(&self, args: A) -> Result<&T, E> {
        let init = self.init;
        self.slot.get_or_try_init(move || init(args))
    }

    /// Returns the held instance, constructing it with `f` instead of the bound constructor if
    /// this is the first access.
    pub fn get_or_try_init<F>(&self, f: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        self.slot.get_or_try_init(f)
    }

    /// Returns the held instance, or `None` if it has not been constructed yet.
    ///
    /// This method never blocks.
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Returns `true` if the instance has been constructed.
    pub fn is_initialized(&self) -> bool {
        self.slot.is_initialized()
    }
}

impl<T: fmt::Debug, A, E> fmt::Debug for TrySingleton<T, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TrySingleton").field(&self.slot).finish()
    }
}
