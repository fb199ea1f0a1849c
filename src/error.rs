use thiserror::Error;

/// Failures reported by the connectivity layer.
///
/// The five `Refused*` variants map the broker's CONNACK refusal codes 1..5.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection refused: incorrect protocol version")]
    RefusedProtocolVersion,
    #[error("connection refused: invalid client identifier")]
    RefusedClientId,
    #[error("connection refused: server unavailable")]
    ServerUnavailable,
    #[error("connection refused: bad user name or password")]
    BadCredentials,
    #[error("connection refused: not authorised")]
    NotAuthorized,
    #[error("connection attempt timed out")]
    Timeout,
    #[error("unexpected disconnect from gateway")]
    UnexpectedDisconnect,
    #[error("mqtt client error: {0}")]
    Client(String),
}

/// Failures while encoding or decoding gateway messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("message on unexpected topic `{0}`")]
    UnexpectedTopic(String),
    #[error("no device key in topic `{0}`")]
    MissingDeviceKey(String),
}

/// Errors surfaced by the module's public API.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid wiring detected at construction time: mismatched capability
    /// handler/provider pairs or an invalid device template. Never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// User-supplied callback returned data that cannot be published.
    #[error("invalid value from callback: {0}")]
    Validation(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The outbound queue refused to store a message.
    #[error("unable to store message for topic `{0}`")]
    MessageNotStored(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
