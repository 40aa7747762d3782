//! Application handlers invoked once per authorized request.

use async_trait::async_trait;
use keygate_core::SignedCall;

use crate::response::CallResponse;

/// Application logic behind a route.
///
/// Returning an error (or panicking) turns the response into a generic
/// internal error; the handler's partial response is discarded.
#[async_trait]
pub trait CallHandler: Send + Sync + 'static {
    async fn handle(&self, call: &SignedCall, response: &mut CallResponse) -> anyhow::Result<()>;
}

/// Adapter for plain synchronous closures.
pub struct FnHandler<F>(F);

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&SignedCall, &mut CallResponse) -> anyhow::Result<()> + Send + Sync + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F> CallHandler for FnHandler<F>
where
    F: Fn(&SignedCall, &mut CallResponse) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn handle(&self, call: &SignedCall, response: &mut CallResponse) -> anyhow::Result<()> {
        (self.0)(call, response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closure_handler_mutates_response() {
        let handler = handler_fn(|call, response| {
            response.set_status(200).pair("function", &call.function)?;
            Ok(())
        });
        let mut response = CallResponse::new();
        handler.handle(&SignedCall::new("/echo"), &mut response).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.data()["function"], "/echo");
    }
}
