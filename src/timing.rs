//! Optional upper bound on a detector future, using browser timers.

use std::future::Future;

use futures::future::{select, Either};
use futures::pin_mut;
use gloo_timers::future::TimeoutFuture;

use crate::error::{Result, VisitorError};

/// Await `fut`, giving up after `timeout_ms` when one is set.
///
/// Without a timeout this is a plain `.await`, so a stalled future stalls
/// the caller. The timer is only created when a timeout is set.
pub async fn with_timeout<F, T>(fut: F, timeout_ms: Option<u32>) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(ms) = timeout_ms else {
        return fut.await;
    };

    let timer = TimeoutFuture::new(ms);
    pin_mut!(fut);
    pin_mut!(timer);

    match select(fut, timer).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(VisitorError::Timeout(ms)),
    }
}
