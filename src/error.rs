use thiserror::Error;

/// Errors that can occur in the ringward application
#[derive(Error, Debug)]
pub enum RingError {
    /// Bootstrap arguments were present but incomplete
    #[error("malformed bootstrap arguments: got {0}, need none or at least 3")]
    MalformedBootstrap(usize),

    /// Shutdown was requested (e.g., via Ctrl+C)
    #[error("shutdown requested")]
    ShutdownRequested,

    /// Failed to spawn a ring participant process
    #[error("failed to spawn child process: {0}")]
    SpawnError(#[source] std::io::Error),

    /// Failed to resolve the executable to relaunch children with
    #[error("failed to resolve child executable: {0}")]
    ExecutableError(#[source] std::io::Error),

    /// Error setting up or using the multicast socket
    #[error("gossip socket error: {0}")]
    SocketError(#[source] std::io::Error),

    /// A datagram was shorter than its opcode requires
    #[error("short datagram: {got} bytes, opcode {opcode} needs {need}")]
    ShortDatagram { opcode: u16, need: usize, got: usize },

    /// A datagram did not carry even an opcode
    #[error("datagram too short for an opcode: {0} bytes")]
    MissingOpcode(usize),

    /// Error reading or parsing configuration
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Error writing the final result artifact
    #[error("failed to write result file: {0}")]
    ResultFileError(#[source] std::io::Error),
}

/// Result type alias for ringward operations
pub type Result<T> = std::result::Result<T, RingError>;
