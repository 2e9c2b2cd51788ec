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

//! A shared cell for the result of a background operation.
//!
//! A [`Deferred`] is created together with the operation that will fill it, and returns
//! immediately. Any number of tasks may then await the same cell with [`Deferred::get`]; they
//! all observe the same outcome, and once the outcome is known every later await returns it
//! without suspending.
//!
//! The cell is in one of three states:
//!
//! * **Pending**: the operation is still running.
//! * **Resolved**: the operation produced a value, which is cached for the life of the cell.
//! * **Abandoned**: the producer went away without a value, e.g. its task panicked or the
//!   runtime driving it shut down. Every await returns [`Error::Abandoned`].
//!
//! The cell never retries. An operation that can fail should produce a `Result`; the cached
//! error is then handed to every caller, exactly like a cached value.
//!
//! # Examples
//!
//! ```
//! # #[tokio::main]
//! # async fn main() {
//! use std::time::Duration;
//!
//! use solus::deferred::Deferred;
//!
//! let answer = Deferred::spawn(async {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     42
//! });
//!
//! assert_eq!(*answer.get().await.unwrap(), 42);
//! assert_eq!(answer.try_get(), Some(&42));
//! # }
//! ```

use std::cell::UnsafeCell;
use std::fmt;
use std::future::Future;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;

use crate::Error;
use crate::internal::Signal;


const PENDING: u8 = 0;
const RESOLVED: u8 = 1;
const ABANDONED: u8 = 2;

/// A cloneable handle to the eventual result of a background operation.
///
/// See the [module level documentation](self) for more.
pub struct Deferred<T> {
    shared: Arc<Shared<T>>,
}

/// The producing side of a [`Deferred`].
///
/// Dropping a `Resolver` without calling [`resolve`] abandons the cell.
///
/// [`resolve`]: Resolver::resolve
pub struct Resolver<T> {
    shared: Option<Arc<Shared<T>>>,
}

struct Shared<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
    signal: Signal,
}

// SAFETY: Shared<T> can be shared between threads as long as T is Sync + Send.
unsafe impl<T: Sync + Send> Sync for Shared<T> {}

// SAFETY: Shared<T> can be sent between threads as long as T is Send.
unsafe impl<T: Send> Send for Shared<T> {}

impl<T> Shared<T> {
    fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    /// # Safety
    ///
    /// Must be called at most once, by the unique resolver.
    unsafe fn complete(&self, value: Option<T>) {
        match value {
            Some(value) => {
                unsafe { self.value.get().write(MaybeUninit::new(value)) };
                self.state.store(RESOLVED, Ordering::Release);
            }
            None => self.state.store(ABANDONED, Ordering::Release),
        }
        self.signal.fire();
    }

    /// # Safety
    ///
    /// The cell must be resolved.
    unsafe fn get_unchecked(&self) -> &T {
        debug_assert_eq!(self.state(), RESOLVED);
        unsafe { (&*self.value.get()).assume_init_ref() }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        if *self.state.get_mut() == RESOLVED {
            // SAFETY: the cell is resolved and being dropped, so it can't be accessed again.
            unsafe { (&mut *self.value.get()).assume_init_drop() };
        }
    }
}

impl<T> Deferred<T> {
    /// Creates a pending cell and the resolver that completes it.
    ///
    /// # Examples
    ///
    /// ```
    /// # #[tokio::main]
    /// # async fn main() {
    /// use solus::deferred::Deferred;
    ///
    /// let (resolver, deferred) = Deferred::pending();
    /// assert!(!deferred.is_resolved());
    ///
    /// std::thread::spawn(move || resolver.resolve("done"));
    /// assert_eq!(*deferred.get().await.unwrap(), "done");
    /// # }
    /// ```
    pub fn pending() -> (Resolver<T>, Deferred<T>) {
        let shared = Arc::new(Shared {
            state: AtomicU8::new(PENDING),
            value: UnsafeCell::new(MaybeUninit::uninit()),
            signal: Signal::new(),
        });
        let resolver = Resolver {
            shared: Some(shared.clone()),
        };
        (resolver, Deferred { shared })
    }

    /// Creates a cell that is already resolved with `value`.
    pub fn resolved(value: T) -> Deferred<T> {
        let (resolver, deferred) = Self::pending();
        resolver.resolve(value);
        deferred
    }

    /// Starts `future` in the background and returns a cell for its output.
    ///
    /// The future starts running right away; it does not wait for anyone to call
    /// [`get`](Deferred::get). It runs on the current tokio runtime if there is one; otherwise
    /// it gets a dedicated thread driving a single-threaded runtime until it completes. The
    /// returned cell can be awaited from any executor.
    ///
    /// If the future panics, the runtime shuts down before it completes, or no thread can be
    /// started for it, the cell is abandoned.
    pub fn spawn<F>(future: F) -> Deferred<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + Sync + 'static,
    {
        let (resolver, deferred) = Self::pending();
        let task = async move { resolver.resolve(future.await) };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => {
                log::debug!(
                    "no tokio runtime in context; running background operation on its own thread"
                );
                let spawned = std::thread::Builder::new()
                    .name("solus-deferred".to_string())
                    .spawn(move || {
                        match tokio::runtime::Builder::new_current_thread()
                            .enable_time()
                            .build()
                        {
                            Ok(rt) => rt.block_on(task),
                            Err(err) => {
                                log::warn!("failed to build runtime for background operation: {err}")
                            }
                        }
                    });
                // a thread that never started dropped the task, and with it the resolver
                if let Err(err) = spawned {
                    log::warn!("failed to start thread for background operation: {err}");
                }
            }
        }

        deferred
    }

    /// Waits for the background operation and returns its cached value.
    ///
    /// Returns [`Error::Abandoned`] if the producer went away without a value. Cancelling this
    /// future has no effect on the operation or on other waiters.
    pub async fn get(&self) -> Result<&T, Error> {
        if self.shared.state() == PENDING {
            self.shared.signal.wait().await;
        }

        match self.shared.state() {
            // SAFETY: checked resolved
            RESOLVED => Ok(unsafe { self.shared.get_unchecked() }),
            ABANDONED => Err(Error::Abandoned),
            state => unreachable!("deferred is still pending after its signal fired: {state}"),
        }
    }

    /// Returns the value if the cell is resolved.
    ///
    /// This method never blocks.
    pub fn try_get(&self) -> Option<&T> {
        if self.is_resolved() {
            // SAFETY: checked resolved
            Some(unsafe { self.shared.get_unchecked() })
        } else {
            None
        }
    }

    /// Returns `true` if the background operation has produced its value.
    pub fn is_resolved(&self) -> bool {
        self.shared.state() == RESOLVED
    }

    /// Returns `true` if the producer went away without a value.
    pub fn is_abandoned(&self) -> bool {
        self.shared.state() == ABANDONED
    }
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Deferred {
            shared: self.shared.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_tuple("Deferred");
        match self.shared.state() {
            // SAFETY: checked resolved
            RESOLVED => d.field(unsafe { self.shared.get_unchecked() }),
            ABANDONED => d.field(&format_args!("<abandoned>")),
            _ => d.field(&format_args!("<pending>")),
        };
        d.finish()
    }
}

impl<T> Resolver<T> {
    /// Resolves the cell with `value` and wakes every waiter.
    pub fn resolve(mut self, value: T) {
        if let Some(shared) = self.shared.take() {
            // SAFETY: the resolver is unique and consumed here
            unsafe { shared.complete(Some(value)) };
        }
    }
}

impl<T> Drop for Resolver<T> {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            log::warn!("background operation abandoned before producing a value");
            // SAFETY: the resolver is unique and being dropped
            unsafe { shared.complete(None) };
        }
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
