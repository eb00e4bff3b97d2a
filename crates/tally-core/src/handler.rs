//! Setup, teardown and test handlers.
//!
//! The variant of a [`Handler`] is its async flag. A [`Handler::Sync`] phase
//! completes as soon as the handler returns. A [`Handler::Async`] handler is
//! given a [`Done`] continuation and its phase completes only once that
//! continuation is invoked (or the phase times out). A [`Handler::Future`]
//! phase completes when the returned future does.

use std::{fmt, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt};

use crate::context::{Done, TestContext};

/// Value returned by every handler. Errors are recorded with status
/// `errors` and fail the phase.
pub type HandlerResult = anyhow::Result<()>;

type SyncFn = dyn Fn(&TestContext) -> HandlerResult + Send + Sync;
type DoneFn = dyn Fn(TestContext, Done) -> HandlerResult + Send + Sync;
type FutureFn = dyn Fn(TestContext) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A phase handler. Cheap to clone.
#[derive(Clone)]
pub enum Handler {
    /// Completes when the function returns
    Sync(Arc<SyncFn>),

    /// Completes when the supplied [`Done`] is invoked
    Async(Arc<DoneFn>),

    /// Completes when the returned future resolves
    Future(Arc<FutureFn>),
}

impl Handler {
    /// Wraps a synchronous handler.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Sync(Arc::new(f))
    }

    /// Wraps a handler that signals completion through a [`Done`].
    pub fn with_done<F>(f: F) -> Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Async(Arc::new(f))
    }

    /// Wraps a handler that returns a future.
    pub fn future<F, Fut>(f: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Handler::Future(Arc::new(move |ctx| f(ctx).boxed()))
    }

    /// Whether completion is deferred past the handler's return.
    pub fn is_async(&self) -> bool {
        !matches!(self, Handler::Sync(_))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Handler::Sync(_) => "sync",
            Handler::Async(_) => "async",
            Handler::Future(_) => "future",
        };
        f.debug_tuple("Handler").field(&kind).finish()
    }
}
