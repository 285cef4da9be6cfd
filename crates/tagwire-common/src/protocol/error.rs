use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagwireError {
    /// Malformed element grammar, tag mismatch, or arity mismatch. Fatal to
    /// the current message, never retried.
    #[error("format error: {0}")]
    Format(String),

    /// Inconsistent frame header fields during reassembly. Fatal to the
    /// current reassembly, surfaced like a disconnect.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer went away mid-operation. Terminates the connection's
    /// receive/dispatch cycle.
    #[error("peer disconnected: {0}")]
    Disconnected(String),

    /// A call named a procedure the remote registry does not hold.
    #[error("no procedure named '{0}' is registered")]
    UnknownProcedure(String),

    /// The remote side answered with a fault reply.
    #[error("remote fault: {0}")]
    Fault(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TagwireError>;
