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

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

//! # Solus - One Instance, Loaded Lazily
//!
//! `solus` provides holders that own at most one lazily constructed instance of a type, and a
//! shared result cell for the slow work such an instance starts when it is constructed.
//!
//! ## Features
//!
//! * [`Singleton`]: constructs its instance on first access; later arguments are ignored
//! * [`TrySingleton`]: the same for fallible constructors; a failed construction can be retried
//! * [`Deferred`]: the eventual result of a background operation, awaited by any number of tasks
//! * [`services`]: a currency converter, a database connection and a delayed operation, each
//!   reachable only through its holder
//!
//! ## Construct Now, Await Later
//!
//! Constructing an instance never waits. A type whose setup is slow starts that work in the
//! background during construction and keeps a [`Deferred`] for it; its accessors await the
//! cell, and every caller observes the same outcome.
//!
//! ## Thread Safety
//!
//! Holders guard construction with a lock, so threads racing on first access construct exactly
//! one instance. All public types are `Send` and `Sync` when the values they hold are.
//!
//! [`Singleton`]: singleton::Singleton
//! [`TrySingleton`]: singleton::TrySingleton
//! [`Deferred`]: deferred::Deferred

pub(crate) mod internal;

mod error;

pub mod deferred;
pub mod services;
pub mod singleton;

pub use self::error::Error;

#[cfg(test)]
fn test_runtime() -> &'static tokio::runtime::Runtime {
    use std::sync::OnceLock;

    use tokio::runtime::Runtime;
    static RT: OnceLock<Runtime> = OnceLock::new();
    RT.get_or_init(|| Runtime::new().unwrap())
}

#[cfg(test)]
fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use crate::Error;
    use crate::deferred::Deferred;
    use crate::deferred::Resolver;
    use crate::services::currency::CurrencyConverter;
    use crate::services::database::DatabaseConnection;
    use crate::services::delayed::DelayedOperation;
    use crate::singleton::Singleton;
    use crate::singleton::TrySingleton;

    #[test]
    fn assert_send_and_sync() {
        fn do_assert_send_and_sync<T: Send + Sync>() {}
        do_assert_send_and_sync::<Singleton<u32>>();
        do_assert_send_and_sync::<Singleton<String, f64>>();
        do_assert_send_and_sync::<TrySingleton<u32, &str, Error>>();
        do_assert_send_and_sync::<Deferred<u32>>();
        do_assert_send_and_sync::<Resolver<u32>>();
        do_assert_send_and_sync::<Error>();
        do_assert_send_and_sync::<CurrencyConverter>();
        do_assert_send_and_sync::<DatabaseConnection>();
        do_assert_send_and_sync::<DelayedOperation>();
    }

    #[test]
    fn assert_unpin() {
        fn do_assert_unpin<T: Unpin>() {}
        do_assert_unpin::<Singleton<u32>>();
        do_assert_unpin::<TrySingleton<u32, &str, Error>>();
        do_assert_unpin::<Deferred<u32>>();
        do_assert_unpin::<Resolver<u32>>();
    }
}
