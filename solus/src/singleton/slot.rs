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

use std::cell::UnsafeCell;
use std::convert::Infallible;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use crate::internal::Mutex;

/// A thread-safe cell that is written at most once, by a blocking initializer.
pub(crate) struct Slot<T> {
    value_set: AtomicBool,
    value: UnsafeCell<MaybeUninit<T>>,
    lock: Mutex<()>,
}

// SAFETY: Slot<T> can be shared between threads as long as T is Sync + Send.
unsafe impl<T: Sync + Send> Sync for Slot<T> {}

// SAFETY: Slot<T> can be sent between threads as long as T is Send.
unsafe impl<T: Send> Send for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) const fn new() -> Self {
        Self {
            value_set: AtomicBool::new(false),
            value: UnsafeCell::new(MaybeUninit::uninit()),
            lock: Mutex::new(()),
        }
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.value_set.load(Ordering::Acquire)
    }

    /// Returns `None` if the slot is uninitialized, or being initialized.
    ///
    /// This method never blocks.
    pub(crate) fn get(&self) -> Option<&T> {
        if self.is_initialized() {
            // SAFETY: checked is_initialized
            Some(unsafe { self.get_unchecked() })
        } else {
            None
        }
    }

    pub(crate) fn get_or_init<F>(&self, init: F) -> &T
    where
        F: FnOnce() -> T,
    {
        match self.get_or_try_init(|| Ok::<T, Infallible>(init())) {
            Ok(v) => v,
            Err(never) => match never {},
        }
    }

    /// Initializes the slot with `init` unless some caller already did.
    ///
    /// Callers racing on an empty slot block until the first one finishes. If `init` fails or
    /// panics, the slot stays empty and the next caller runs its own initializer.
    pub(crate) fn get_or_try_init<E, F>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(v) = self.get() {
            return Ok(v);
        }

        let guard = self.lock.lock();

        if let Some(v) = self.get() {
            // double-checked: another thread initialized the value
            // while we were waiting for the lock
            return Ok(v);
        }

        let value = init()?;
        // SAFETY: holding the lock ensures exclusive access
        unsafe {
            self.set_value(value);
        }
        drop(guard);
        // SAFETY: value initialized above
        unsafe { Ok(self.get_unchecked()) }
    }

    /// # Safety
    ///
    /// The slot must be initialized
    #[inline]
    unsafe fn get_unchecked(&self) -> &T {
        debug_assert!(self.is_initialized());
        unsafe { (&*self.value.get()).assume_init_ref() }
    }

    /// # Safety
    ///
    /// This method must be accessed exclusively, i.e. holding the lock.
    unsafe fn set_value(&self, value: T) {
        let value_ptr = self.value.get();
        unsafe { value_ptr.write(MaybeUninit::new(value)) };

        // Use `store` with `Release` ordering to ensure that when loading it with `Acquire`
        // ordering, the initialized value is visible.
        self.value_set.store(true, Ordering::Release);
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if *self.value_set.get_mut() {
            // SAFETY: The slot is initialized and being dropped, so it can't be accessed again.
            unsafe { (&mut *self.value.get()).assume_init_drop() };
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(v) => fmt::Debug::fmt(v, f),
            None => f.write_str("<uninit>"),
        }
    }
}
