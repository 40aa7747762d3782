//! Per-request pipeline.
//!
//! 1. method gating (403)
//! 2. JSON content type (400)
//! 3. sender resolution (500 on failure; a transport/proxy fault, not the caller's)
//! 4. body decoding into a `SignedCall` (400, including bodies over the limit)
//! 5. authorization for auth-required routes (401); the signed function must
//!    match the route path
//! 6. exactly one handler invocation
//!
//! The whole pipeline runs inside one unwind boundary, before any bytes are
//! written, so a late panic still becomes a generic 500.

use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::{FutureExt, StreamExt};
use keygate_core::{Address, KeygateError, Method, SignedCall};
use keygate_logging::{AccessEvent, AccessLogEntry, AccessLogger};
use keygate_security::TrustRegistry;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::handler::CallHandler;
use crate::node::NodeShared;
use crate::response::{CallResponse, NO_SUCH_ROUTE};
use crate::route::Route;
use crate::sender::{is_json_content, resolve_sender};

pub(crate) struct DispatchContext {
    pub(crate) node: Arc<NodeShared>,
    pub(crate) debug: bool,
    pub(crate) trust: Option<Arc<TrustRegistry>>,
    pub(crate) trust_forwarded_for: bool,
    pub(crate) body_limit: usize,
}

impl DispatchContext {
    /// Pipeline decisions are surfaced at `info` in debug mode, `debug` otherwise.
    fn note(&self, route: &str, message: &str) {
        if self.debug {
            info!(node = %self.node.name(), route, "{message}");
        } else {
            debug!(route, "{message}");
        }
    }

    fn authorize(
        &self,
        sender: &Address,
        call: &SignedCall,
        route: &str,
        method: Method,
    ) -> Result<(), KeygateError> {
        if self.debug && sender.is_loopback() {
            self.note(route, "Loopback caller admitted by debug bypass");
            return Ok(());
        }
        // the signature covers call.function, so it must name this route
        if call.function != route {
            return Err(KeygateError::PermissionDenied {
                route: route.to_string(),
                method: method.to_string(),
            });
        }
        match &self.trust {
            Some(trust) => trust.authorize(sender, call, route, method),
            None => Err(KeygateError::UnknownSender(sender.host().to_string())),
        }
    }
}

pub(crate) struct RouteContext {
    pub(crate) dispatch: Arc<DispatchContext>,
    pub(crate) route: Route,
    pub(crate) handler: Arc<dyn CallHandler>,
}

struct Outcome {
    response: CallResponse,
    sender: Option<Address>,
    rejection: Option<String>,
}

impl Outcome {
    fn rejected(err: KeygateError, sender: Option<Address>) -> Self {
        Self {
            response: CallResponse::from_error(&err),
            sender,
            rejection: Some(err.to_string()),
        }
    }
}

pub(crate) async fn dispatch(ctx: Arc<RouteContext>, req: Request) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().to_string();

    let outcome = match AssertUnwindSafe(run_pipeline(&ctx, req)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(request_id = %request_id, route = ctx.route.path(), "Request handling panicked");
            Outcome {
                response: CallResponse::internal_error(),
                sender: None,
                rejection: Some("panic during dispatch".into()),
            }
        }
    };

    let status = outcome.response.status();
    let event = match outcome.rejection {
        Some(reason) => AccessEvent::Rejected { status, reason },
        None => AccessEvent::Dispatched { status },
    };
    AccessLogger::log_event(AccessLogEntry {
        request_id,
        node: ctx.dispatch.node.name(),
        route: ctx.route.path().to_string(),
        method,
        sender: outcome.sender.map(|s| s.to_string()),
        timestamp: Utc::now(),
        event,
    });

    outcome.response.into_response()
}

async fn run_pipeline(ctx: &RouteContext, req: Request) -> Outcome {
    let shared = &ctx.dispatch;
    let route = &ctx.route;
    let path = route.path();

    let method = match req.method().as_str().parse::<Method>() {
        Ok(method) if route.is_method_supported(method) => method,
        _ => {
            shared.note(path, "Path does not support the request method");
            return Outcome::rejected(KeygateError::MethodNotAllowed(req.method().to_string()), None);
        }
    };

    let (parts, body) = req.into_parts();

    if !is_json_content(&parts.headers) {
        shared.note(path, "Request did not declare JSON content");
        let declared = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none")
            .to_string();
        return Outcome::rejected(KeygateError::ContentType(declared), None);
    }

    let sender = match resolve_sender(&parts, shared.trust_forwarded_for) {
        Ok(sender) => sender,
        Err(e) => {
            warn!(route = path, error = %e, "Could not resolve sender address");
            return Outcome::rejected(e, None);
        }
    };

    let bytes = match read_body(body, shared.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            shared.note(path, "Request body could not be read");
            return Outcome::rejected(e, Some(sender));
        }
    };
    let call = match SignedCall::from_json(&bytes) {
        Ok(call) => call,
        Err(e) => {
            shared.note(path, "Request contained a malformed body");
            return Outcome::rejected(e, Some(sender));
        }
    };

    if route.requires_auth() {
        if let Err(e) = shared.authorize(&sender, &call, path, method) {
            shared.note(path, "Sender is not permitted on this route");
            return Outcome::rejected(e, Some(sender));
        }
    }

    let mut response = CallResponse::new();
    match ctx.handler.handle(&call, &mut response).await {
        Ok(()) => Outcome { response, sender: Some(sender), rejection: None },
        Err(e) => {
            error!(route = path, error = %e, "Handler failed");
            Outcome {
                response: CallResponse::internal_error(),
                sender: Some(sender),
                rejection: Some(format!("handler failed: {e}")),
            }
        }
    }
}

/// Collect the body, refusing anything over `limit` whether or not its size was declared.
async fn read_body(body: Body, limit: usize) -> Result<Vec<u8>, KeygateError> {
    let too_large = || KeygateError::MalformedBody(format!("body exceeds {limit} bytes"));
    if body.size_hint().lower() > limit as u64 {
        return Err(too_large());
    }
    let mut stream = body.into_data_stream();
    let mut bytes = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| KeygateError::Transport(e.to_string()))?;
        if bytes.len() + chunk.len() > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

pub(crate) async fn unknown_route() -> CallResponse {
    CallResponse::rejection(StatusCode::NOT_FOUND.as_u16(), NO_SUCH_ROUTE)
}
