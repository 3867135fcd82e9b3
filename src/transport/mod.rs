//! Transport layer for device communication.
//!
//! The session facade never talks to a socket directly. It hands a rendered
//! operation to a [`Transport`], which frames it as a NETCONF `<rpc>`, sends
//! it, and returns the parsed [`RpcReply`].
//!
//! # Supported Transports
//!
//! - **NETCONF over SSH** (via `russh`, feature `russh`, default): see [`ssh`]
//! - Anything else that implements [`Transport`] (test fixtures, proxies)
//!
//! # Example
//!
//! ```rust,ignore
//! use junos::transport::ssh::{SshTransport, Credentials};
//!
//! let creds = Credentials::password("admin", "secret");
//! let transport = SshTransport::connect("10.0.0.1", &creds).await?;
//! let reply = transport.execute("<get-software-information/>").await?;
//! println!("{}", reply.data);
//! ```

/// NETCONF 1.0 framing, hello exchange, and reply parsing.
pub mod netconf;

/// NETCONF over SSH using russh.
#[cfg(feature = "russh")]
pub mod ssh;

use async_trait::async_trait;
use thiserror::Error;

pub use netconf::RpcReply;

/// Errors that can occur below the RPC layer.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to establish the connection to the device.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected by the device.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The NETCONF stream could not be framed or parsed.
    #[error("NETCONF framing error: {0}")]
    Framing(String),

    /// The RPC did not complete before the caller-supplied deadline.
    #[error("RPC timed out after {0} seconds")]
    Timeout(u64),

    /// SSH-specific error from the underlying implementation.
    #[error("SSH error: {0}")]
    Ssh(String),

    /// I/O error during transport operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport was already closed.
    #[error("Connection closed")]
    Closed,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// An authenticated RPC channel to exactly one device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Identifier of the remote end (usually host:port)
    fn identifier(&self) -> &str;

    /// Send one operation and wait for its reply.
    ///
    /// `operation` is the body of the `<rpc>` element; framing and message-id
    /// handling belong to the transport.
    async fn execute(&self, operation: &str) -> TransportResult<RpcReply>;

    /// Close the channel. Further calls to [`Transport::execute`] fail with
    /// [`TransportError::Closed`].
    async fn close(&self) -> TransportResult<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    async fn execute(&self, operation: &str) -> TransportResult<RpcReply> {
        (**self).execute(operation).await
    }

    async fn close(&self) -> TransportResult<()> {
        (**self).close().await
    }
}
