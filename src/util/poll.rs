use std::{
    future::Future,
    task::{Context, Poll},
    thread,
    time::{Duration, Instant},
};

use futures::task::noop_waker_ref;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub fn poll_until_ready_error<Fut, T, E>(future: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    poll_until_ready(future)
}

pub fn poll_until_ready<Fut, T>(future: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let mut future = Box::pin(future);
    let mut context = Context::from_waker(noop_waker_ref());

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(result) => {
                return result;
            }
            Poll::Pending => {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }
}

/// Polls `future` until it resolves or `deadline` passes. Returns `None` on
/// expiry; the future is dropped, which cancels any in-flight request.
pub fn poll_until_deadline<Fut, T>(future: Fut, deadline: Instant) -> Option<T>
where
    Fut: Future<Output = T>,
{
    let mut future = Box::pin(future);
    let mut context = Context::from_waker(noop_waker_ref());

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(result) => {
                return Some(result);
            }
            Poll::Pending => {
                let now = Instant::now();
                if now >= deadline {
                    return None;
                }
                thread::sleep(POLL_INTERVAL.min(deadline - now));
            }
        }
    }
}
