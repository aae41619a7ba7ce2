use futures::task::{Context, Poll, Waker};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

struct Resolution<R> {
    value: Option<R>,
    resolved: bool,
    waker: Option<Waker>,
}

/// the resolving half of a ResolvableFuture
///
/// a resolver may be called any number of times, only the first resolution is delivered
pub struct ResolvableFutureResolver<R> {
    state: Mutex<Resolution<R>>,
}

impl<R> ResolvableFutureResolver<R> {
    fn new() -> Self {
        Self {
            state: Mutex::new(Resolution {
                value: None,
                resolved: false,
                waker: None,
            }),
        }
    }

    /// resolve the future, returns false if it was already resolved
    pub fn resolve(&self, resolution: R) -> bool {
        let waker = {
            let state = &mut *self.state.lock();
            if state.resolved {
                log::trace!("ResolvableFutureResolver.resolve -> already resolved");
                return false;
            }
            log::trace!("ResolvableFutureResolver.resolve");
            state.resolved = true;
            state.value = Some(resolution);
            state.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    pub fn is_resolved(&self) -> bool {
        self.state.lock().resolved
    }
}

/// a one-shot future which is completed from the outside via its resolver
pub struct ResolvableFuture<R> {
    resolver: Arc<ResolvableFutureResolver<R>>,
}

impl<R> ResolvableFuture<R> {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(ResolvableFutureResolver::new()),
        }
    }
    pub fn get_resolver(&self) -> Arc<ResolvableFutureResolver<R>> {
        self.resolver.clone()
    }
}

impl<R> Default for ResolvableFuture<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Future for ResolvableFuture<R> {
    type Output = R;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        log::trace!("ResolvableFuture::poll");
        let state = &mut *self.resolver.state.lock();
        match state.value.take() {
            Some(res) => {
                log::trace!("ResolvableFuture::poll -> Ready");
                Poll::Ready(res)
            }
            None => {
                log::trace!("ResolvableFuture::poll -> Pending");
                let _ = state.waker.replace(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use crate::resolvable_future::ResolvableFuture;
    use futures::executor::block_on;

    #[test]
    fn test_resolve_once() {
        let rf = ResolvableFuture::new();
        let resolver = rf.get_resolver();
        assert!(!resolver.is_resolved());

        assert!(resolver.resolve(1));
        // a late second signal is dropped
        assert!(!resolver.resolve(2));
        assert!(resolver.is_resolved());

        assert_eq!(block_on(rf), 1);
    }

    #[test]
    fn test_resolve_from_thread() {
        let rf = ResolvableFuture::new();
        let resolver = rf.get_resolver();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            resolver.resolve("done".to_string());
        });
        assert_eq!(block_on(rf).as_str(), "done");
    }
}
