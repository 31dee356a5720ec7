use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;

/// Raw message bytes shared by every handler of one message.
pub type Payload = Arc<[u8]>;

/// Callback invoked with the raw bytes of every message of its event type.
///
/// Each invocation runs in its own task. A handler decodes the payload
/// itself and deals with its own decode errors.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: Context, payload: Payload);
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Context, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, ctx: Context, payload: Payload) {
        (self)(ctx, payload).await
    }
}
