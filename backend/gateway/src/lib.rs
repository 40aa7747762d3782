//! keygate Gateway: signed-call RPC dispatcher.
//!
//! Routes carry their own method set and auth flag; every request runs through
//! method gating, content negotiation, sender resolution, body decoding and the
//! trust-registry decision before the application handler is invoked.

pub mod client;
mod dispatch;
pub mod handler;
pub mod node;
pub mod response;
pub mod route;
pub mod sender;
pub mod server;
pub mod status;

pub use client::RpcClient;
pub use handler::{CallHandler, FnHandler, handler_fn};
pub use node::{Node, NodeHandle, NodeOptions};
pub use response::{CallResponse, ResponseError};
pub use route::Route;
pub use status::NodeStatus;
