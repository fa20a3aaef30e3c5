//! Server constants
//!
//! Operator-visible log prefixes and the protocol's user-facing reply text.
//! The reply strings are part of the wire contract; clients match on them.

// =============================================================================
// Startup / shutdown messages
// =============================================================================

pub const MSG_BANNER: &str = "Courier relay broker v";
pub const MSG_LISTENING: &str = "Listening on ";
pub const MSG_SHUTDOWN_RECEIVED: &str = "Shutdown signal received, exiting...";

// =============================================================================
// Error log prefixes
// =============================================================================

pub const ERR_ACCEPT: &str = "Accept error: ";
pub const ERR_BIND_FAILED: &str = "Failed to bind ";
pub const ERR_CONNECTION: &str = "Connection error from ";
pub const ERR_CONNECTION_LIMIT: &str = "Connection limit reached for ";
pub const ERR_PARSE_MESSAGE: &str = "Failed to parse message from ";
pub const ERR_HANDLING_MESSAGE: &str = "Error handling message: ";
pub const ERR_CHANNEL_CLOSED: &str = "outbound channel closed";
pub const ERR_SIGNAL_SIGTERM: &str = "failed to install SIGTERM handler";
pub const ERR_SIGNAL_SIGINT: &str = "failed to install SIGINT handler";
pub const ERR_SIGNAL_CTRLC: &str = "failed to install Ctrl+C handler";

// =============================================================================
// Protocol reply text (wire contract)
// =============================================================================

/// Greeting sent in the `Hello` event on connect
pub const MSG_GREETING: &str = "please enter your name: ";
/// Registration acknowledgement
pub const MSG_WELCOME: &str = "welcome to the courier server!";
/// Reply to a successful `send` command
pub const MSG_REQUEST_SENT: &str = "request sent.";
/// Reply when a `send` target cannot be resolved
pub const MSG_NO_SUCH_USER: &str = "no such user.";
/// Reply to an unrecognized command
pub const MSG_UNKNOWN_CMD: &str = "unknown cmd.";
/// Reply to a recognized command with unusable arguments
pub const MSG_INVALID_ARGS: &str = "invalid arguments.";
/// Notice sent to both parties when a transfer completes
pub const MSG_TRANSFER_FINISHED: &str = "transfer finished!";
/// Notice sent to both parties when an offer is denied
pub const MSG_REQUEST_DENIED: &str = "request denied.";

// =============================================================================
// Per-event error replies
// =============================================================================

/// The request id does not exist (never created, or already retired)
pub const ERR_UNKNOWN_REQUEST: &str = "unknown request id.";
/// The request exists but is not in a state where this event is valid
pub const ERR_REQUEST_WRONG_STATE: &str = "request is not in a valid state for that.";
/// The event came from a connection that is not party to the request
pub const ERR_NOT_YOUR_REQUEST: &str = "not your request.";
/// The other party disconnected before the event could be honored
pub const ERR_PEER_GONE: &str = "peer disconnected.";
/// Malformed event payload
pub const ERR_INVALID_MESSAGE: &str = "invalid message format.";
