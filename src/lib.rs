//! # Junos - An Async NETCONF Client for Juniper Devices
//!
//! Junos drives Juniper devices over NETCONF (SSH subsystem, RFC 4741
//! framing) and the Junos Space platform over its REST API. It covers the
//! configuration lifecycle an operator runs by hand: lock, load, check,
//! commit, unlock, plus rollback history, the rescue configuration, ad-hoc
//! commands, and typed operational views.
//!
//! ## Core Concepts
//!
//! - **Transport**: An authenticated RPC channel to exactly one device
//! - **Session**: A transport plus the facts gathered when it was opened
//! - **Candidate / Active**: The editable and the running configuration
//! - **Rollback slots**: Numbered snapshots `0..=49` of prior active configurations
//! - **Views**: Typed decodings of operational RPC replies, single or per routing engine
//! - **SRX builders**: `set` statement batches for policies, the global address book, and IPsec VPNs
//! - **Space**: A Junos Space server managing a fleet of devices and policies
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              Session                                │
//! │        (lifecycle, rollback/rescue, commands, views, diffs)         │
//! └─────────────────────────────────────────────────────────────────────┘
//!          │                         │                         │
//!          ▼                         ▼                         ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────────┐
//! │   RPC builder   │   │   View decoders     │   │   Facts / Diff      │
//! │  (Junos XML)    │   │   (roxmltree)       │   │   parsers           │
//! └─────────────────┘   └─────────────────────┘   └─────────────────────┘
//!          │
//!          ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Transport (NETCONF / SSH)                      │
//! └─────────────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              SpaceClient (reqwest, Junos Space REST API)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use junos::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let creds = Credentials::password("admin", "juniper123");
//!     let session = Session::connect("fw1.lab", &creds).await?;
//!
//!     session.lock().await?;
//!     session
//!         .load_configuration(
//!             ConfigPayload::inline("set system host-name fw1"),
//!             ConfigFormat::Set,
//!             false,
//!         )
//!         .await?;
//!     session.commit_check().await?;
//!     session.commit_with_log("rename").await?;
//!     session.unlock().await?;
//!
//!     println!("{}", session.diff(1).await?);
//!     session.close().await
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types.
    //!
    //! ```rust,ignore
    //! use junos::prelude::*;
    //! ```

    pub use crate::config::{Config, DeviceConfig, LogFormat, LogLevel, SpaceConfig};
    pub use crate::diff::ConfigDiff;
    pub use crate::error::{Error, Result, RpcError};
    pub use crate::facts::{Facts, RoutingEngine};
    pub use crate::logging::LoggingBuilder;
    pub use crate::rpc::{CommandFormat, ConfigFormat, ConfigPayload, RescueAction, RollbackTarget};
    pub use crate::session::{CommandOutput, CommitEntry, Session, SessionBuilder};
    pub use crate::srx::{FirewallPolicy, IpsecVpn, PolicyAction, Rule, VpnPeer};
    pub use crate::space::{DeviceRef, PolicyRef, SoftwareUpgrade, SpaceClient};
    #[cfg(feature = "russh")]
    pub use crate::transport::ssh::{Credentials, SshOptions, SshTransport};
    pub use crate::transport::{RpcReply, Transport, TransportError};
    pub use crate::views::{PlatformTable, Topology, View, ViewData};
}

// ============================================================================
// Core
// ============================================================================

/// Error types and the crate-wide [`Result`](error::Result) alias.
pub mod error;

/// Layered configuration: files, environment, defaults.
pub mod config;

/// Structured logging setup on top of `tracing-subscriber`.
pub mod logging;

// ============================================================================
// Device Protocol
// ============================================================================

/// Transport layer for device communication.
///
/// The [`Transport`](transport::Transport) trait is the only seam between
/// sessions and the wire. The default build ships NETCONF over SSH via russh.
pub mod transport;

/// Junos XML RPC documents and their argument types.
pub mod rpc;

/// Device facts gathered when a session opens.
pub mod facts;

/// Typed operational views decoded from RPC replies.
pub mod views;

/// Parser for the curly-brace configuration diff format.
pub mod diff;

/// Device sessions and the configuration lifecycle.
pub mod session;

/// SRX security policy, address book, and IPsec VPN builders.
pub mod srx;

// ============================================================================
// Junos Space
// ============================================================================

/// Junos Space and Security Director REST client.
pub mod space;

mod xml;

pub use error::{Error, Result};
pub use session::Session;
pub use space::SpaceClient;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
