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

//! An operation that completes after a delay and caches its result.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crate::Error;
use crate::deferred::Deferred;
use crate::singleton::Singleton;

/// What a [`DelayedOperation`] waits for and what it produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelaySpec {
    /// How long the operation takes.
    pub delay: Duration,
    /// The result it produces.
    pub output: String,
}

impl Default for DelaySpec {
    fn default() -> Self {
        DelaySpec {
            delay: Duration::from_secs(5),
            output: "Operation Result".to_string(),
        }
    }
}

/// Runs a delayed operation once, at construction, and hands its result to every caller.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// use solus::services::delayed::DelayedOperation;
///
/// let service1 = DelayedOperation::get_instance();
/// assert_eq!(service1.get_result().await.unwrap(), "Operation Result");
///
/// let service2 = DelayedOperation::get_instance();
/// assert_eq!(service2.get_result().await.unwrap(), "Operation Result");
/// assert_eq!(service2.runs(), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct DelayedOperation {
    result: Deferred<String>,
    runs: AtomicUsize,
}

impl DelayedOperation {
    fn start(spec: DelaySpec) -> Self {
        log::info!("start");
        let runs = AtomicUsize::new(0);
        runs.fetch_add(1, Ordering::SeqCst);
        let result = Deferred::spawn(async move {
            tokio::time::sleep(spec.delay).await;
            spec.output
        });
        DelayedOperation { result, runs }
    }

    /// Returns the process-wide operation, starting it with [`DelaySpec::default`] on first
    /// access.
    pub fn get_instance() -> &'static DelayedOperation {
        static INSTANCE: Singleton<DelayedOperation, DelaySpec> = DelayedOperation::holder();
        INSTANCE.get_instance(DelaySpec::default())
    }

    /// Returns an empty holder for an operation owned by the caller.
    pub const fn holder() -> Singleton<DelayedOperation, DelaySpec> {
        Singleton::new(DelayedOperation::start)
    }

    /// Waits for the operation to finish and returns its result.
    pub async fn get_result(&self) -> Result<&str, Error> {
        self.result.get().await.map(String::as_str)
    }

    /// How many times this instance started its operation. Counted when the instance is
    /// constructed, before the operation is first polled.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::DelaySpec;
    use super::DelayedOperation;
    use crate::init_test_logging;
    use crate::singleton::Singleton;
    use crate::test_runtime;

    #[tokio::test(start_paused = true)]
    async fn counted_at_construction() {
        let holder = DelayedOperation::holder();

        let service = holder.get_instance(DelaySpec::default());
        assert_eq!(service.runs(), 1);
        assert!(service.result.try_get().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn constructed_once_across_instances() {
        static STARTS: AtomicUsize = AtomicUsize::new(0);

        fn counting_start(spec: DelaySpec) -> DelayedOperation {
            STARTS.fetch_add(1, Ordering::SeqCst);
            DelayedOperation::start(spec)
        }

        let holder = Singleton::new(counting_start);

        let service1 = holder.get_instance(DelaySpec::default());
        assert_eq!(service1.get_result().await.unwrap(), "Operation Result");
        let service2 = holder.get_instance(DelaySpec::default());
        assert_eq!(service2.get_result().await.unwrap(), "Operation Result");

        assert_eq!(STARTS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn construct_outside_runtime() {
        let holder = DelayedOperation::holder();
        let service = holder.get_instance(DelaySpec {
            delay: Duration::from_millis(10),
            output: "threaded".to_string(),
        });
        assert_eq!(service.runs(), 1);

        let result = test_runtime().block_on(service.get_result());
        assert_eq!(result.unwrap(), "threaded");
    }

    #[tokio::test(start_paused = true)]
    async fn result_is_shared_and_started_once() {
        init_test_logging();
        let holder = DelayedOperation::holder();

        let service1 = holder.get_instance(DelaySpec::default());
        let result1 = service1.get_result().await.unwrap();

        let service2 = holder.get_instance(DelaySpec {
            delay: Duration::from_secs(1),
            output: "other".to_string(),
        });
        let result2 = service2.get_result().await.unwrap();

        assert_eq!(result1, "Operation Result");
        assert_eq!(result2, "Operation Result");
        assert!(std::ptr::eq(service1, service2));
        assert_eq!(service2.runs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn starts_before_anyone_waits() {
        let holder = DelayedOperation::holder();
        let start = tokio::time::Instant::now();

        let service = holder.get_instance(DelaySpec::default());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(service.runs(), 1);

        // the delay already elapsed, so the result is ready
        assert_eq!(service.get_result().await.unwrap(), "Operation Result");
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn concurrent_waiters_observe_the_same_result() {
        let holder = DelayedOperation::holder();
        let service = holder.get_instance(DelaySpec {
            delay: Duration::from_millis(20),
            output: "shared".to_string(),
        });

        let (a, b) = tokio::join!(service.get_result(), service.get_result());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a, "shared");
        assert!(std::ptr::eq(a, b));
    }

    #[tokio::test(start_paused = true)]
    async fn process_wide_instance() {
        let service1 = DelayedOperation::get_instance();
        let service2 = DelayedOperation::get_instance();
        assert!(std::ptr::eq(service1, service2));
        assert_eq!(service1.get_result().await.unwrap(), "Operation Result");
        assert_eq!(service2.runs(), 1);
    }
}
