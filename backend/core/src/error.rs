use thiserror::Error;

/// Top-level error type for keygate.
///
/// Client-triggered kinds are turned into a JSON rejection by the dispatcher;
/// `Config` is only ever returned to the code registering routes or peers.
#[derive(Debug, Error)]
pub enum KeygateError {
    #[error("could not convert invalid string to address: {0}")]
    AddressParse(String),

    #[error("public key could not be decoded: {0}")]
    KeyDecode(String),

    #[error("nonce {nonce} is not greater than last accepted nonce {last}")]
    Replay { nonce: i64, last: i64 },

    #[error("signature verification failed")]
    Signature,

    #[error("permission denied: {method} on {route}")]
    PermissionDenied { route: String, method: String },

    #[error("method {0} is not allowed on this route")]
    MethodNotAllowed(String),

    #[error("unsupported content type: {0}")]
    ContentType(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("sender {0} is not a trusted endpoint")]
    UnknownSender(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KeygateError {
    /// HTTP status a dispatcher answers with for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            KeygateError::ContentType(_) | KeygateError::MalformedBody(_) => 400,
            KeygateError::KeyDecode(_)
            | KeygateError::Replay { .. }
            | KeygateError::Signature
            | KeygateError::PermissionDenied { .. }
            | KeygateError::UnknownSender(_) => 401,
            KeygateError::MethodNotAllowed(_) => 403,
            KeygateError::AddressParse(_)
            | KeygateError::Transport(_)
            | KeygateError::Config(_)
            | KeygateError::Other(_) => 500,
        }
    }

    /// Whether the failure was caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
