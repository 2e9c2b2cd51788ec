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

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;
use std::task::Waker;

use slab::Slab;

use crate::internal::Mutex;

/// A one-shot broadcast: once fired, every current and future waiter completes.
#[derive(Debug)]
pub(crate) struct Signal {
    fired: AtomicBool,
    waiters: Mutex<Slab<WaitNode>>,
}

#[derive(Debug)]
struct WaitNode {
    notified: bool,
    waker: Option<Waker>,
}

impl Signal {
    pub(crate) const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            waiters: Mutex::new(Slab::new()),
        }
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Fires the signal and wakes all registered waiters.
    ///
    /// Any state published before this call is visible to a waiter once its [`Wait`] resolves.
    pub(crate) fn fire(&self) {
        // Store before taking the lock: a waiter that registers after we release the lock
        // re-checks the flag under the same lock and will see it.
        self.fired.store(true, Ordering::Release);

        let mut waiters = self.waiters.lock();
        let wakers = waiters
            .iter_mut()
            .filter_map(|(_, node)| {
                node.notified = true;
                node.waker.take()
            })
            .collect::<Vec<_>>();
        drop(waiters);

        for waker in wakers {
            waker.wake();
        }
    }

    pub(crate) fn wait(&self) -> Wait<'_> {
        Wait {
            signal: self,
            index: None,
        }
    }
}

/// Future returned by [`Signal::wait`].
#[derive(Debug)]
pub(crate) struct Wait<'a> {
    signal: &'a Signal,
    index: Option<usize>,
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        if let Some(index) = self.index.take() {
            self.signal.waiters.lock().remove(index);
        }
    }
}

impl Future for Wait<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Self { signal, index } = self.get_mut();

        if signal.is_fired() {
            return Poll::Ready(());
        }

        let mut waiters = signal.waiters.lock();
        match *index {
            None => {
                // double-checked: the signal may have fired before we took the lock
                if signal.is_fired() {
                    return Poll::Ready(());
                }
                *index = Some(waiters.insert(WaitNode {
                    notified: false,
                    waker: Some(cx.waker().clone()),
                }));
                Poll::Pending
            }
            Some(idx) => {
                let node = &mut waiters[idx];
                if node.notified {
                    waiters.remove(idx);
                    *index = None;
                    Poll::Ready(())
                } else {
                    let update_waker = node
                        .waker
                        .as_ref()
                        .is_none_or(|w| !w.will_wake(cx.waker()));
                    if update_waker {
                        node.waker = Some(cx.waker().clone());
                    }
                    Poll::Pending
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::Signal;

    #[tokio::test]
    async fn fired_before_wait() {
        let signal = Signal::new();
        signal.fire();
        assert!(signal.is_fired());
        signal.wait().await;
    }

    #[tokio::test]
    async fn wakes_all_waiters() {
        let signal = Arc::new(Signal::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let signal = signal.clone();
            handles.push(tokio::spawn(async move { signal.wait().await }));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.fire();

        for handle in handles {
            handle.await.unwrap();
        }
        assert!(signal.waiters.lock().is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_deregisters() {
        let signal = Signal::new();

        let timeout = tokio::time::timeout(Duration::from_millis(1), signal.wait()).await;
        assert!(timeout.is_err());
        assert!(signal.waiters.lock().is_empty());
    }
}
