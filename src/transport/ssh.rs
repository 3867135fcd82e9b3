//! NETCONF over SSH using russh.
//!
//! One TCP connection, one SSH session, one `netconf` subsystem channel.
//! Requests are serialized on that channel; the reply to each `<rpc>` is read
//! back before the next one is written.

use super::netconf::{self, MessageIds, RpcReply, ServerHello};
use super::{Transport, TransportError, TransportResult};
use async_trait::async_trait;
use russh::client::{Handle, Handler, Msg};
use russh::keys::key::PublicKey;
use russh::keys::load_secret_key;
use russh::{Channel, ChannelMsg};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace, warn};

/// Default TCP connect / SSH handshake timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Credentials
// ============================================================================

/// How to authenticate against the device.
#[derive(Clone)]
pub enum Auth {
    /// Password authentication
    Password(String),
    /// Public key authentication with an OpenSSH private key file
    PrivateKey {
        /// Path to the key file
        path: PathBuf,
        /// Passphrase for an encrypted key
        passphrase: Option<String>,
    },
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Password(_) => f.write_str("Password(****)"),
            Auth::PrivateKey { path, .. } => f
                .debug_struct("PrivateKey")
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}

/// Username plus authentication method.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub auth: Auth,
}

impl Credentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth: Auth::Password(password.into()),
        }
    }

    pub fn private_key(username: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            auth: Auth::PrivateKey {
                path: path.into(),
                passphrase: None,
            },
        }
    }

    /// Set the passphrase used to decrypt a private key. No effect for password auth.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        if let Auth::PrivateKey {
            passphrase: ref mut p,
            ..
        } = self.auth
        {
            *p = Some(passphrase.into());
        }
        self
    }
}

/// Connection options for [`SshTransport`].
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub port: u16,
    pub connect_timeout: Duration,
    /// Deadline for a single RPC; `None` waits indefinitely
    pub rpc_timeout: Option<Duration>,
    /// Accept hosts missing from `~/.ssh/known_hosts`
    pub accept_unknown_hosts: bool,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            port: netconf::DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            rpc_timeout: None,
            accept_unknown_hosts: true,
        }
    }
}

// ============================================================================
// Host Key Verification
// ============================================================================

/// Client handler for russh with known_hosts verification
struct ClientHandler {
    host: String,
    port: u16,
    accept_unknown: bool,
}

#[async_trait]
impl Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match russh::keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => {
                debug!(host = %self.host, "Host key verified against known_hosts");
                Ok(true)
            }
            Ok(false) if self.accept_unknown => {
                warn!(host = %self.host, "Host not found in known_hosts, accepting");
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, "Host not found in known_hosts, rejecting");
                Ok(false)
            }
            Err(e) => {
                warn!(
                    host = %self.host,
                    error = %e,
                    "HOST KEY VERIFICATION FAILED! Server key does not match known_hosts entry."
                );
                Ok(false)
            }
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// The netconf subsystem channel plus bytes received but not yet framed.
struct NetconfChannel {
    channel: Channel<Msg>,
    buffer: Vec<u8>,
}

impl NetconfChannel {
    async fn send(&mut self, message: &str) -> TransportResult<()> {
        self.channel
            .data(message.as_bytes())
            .await
            .map_err(|e| TransportError::Ssh(format!("Failed to write to channel: {}", e)))
    }

    async fn receive(&mut self) -> TransportResult<String> {
        loop {
            if let Some(message) = netconf::take_message(&mut self.buffer)? {
                return Ok(message);
            }
            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => {
                    self.buffer.extend_from_slice(data);
                }
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    trace!(stderr = %String::from_utf8_lossy(data), "netconf stderr");
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(TransportError::Closed);
                }
                Some(_) => {}
            }
        }
    }
}

/// One request/reply exchange on an open channel.
#[async_trait]
trait Exchange: Send {
    async fn exchange(&mut self, message_id: u32, operation: &str) -> TransportResult<RpcReply>;
}

#[async_trait]
impl Exchange for NetconfChannel {
    async fn exchange(&mut self, message_id: u32, operation: &str) -> TransportResult<RpcReply> {
        self.send(&netconf::wrap_rpc(message_id, operation)).await?;
        loop {
            let reply = RpcReply::parse(&self.receive().await?)?;
            if reply.answers(message_id) {
                return Ok(reply);
            }
            warn!(
                expected = message_id,
                received = ?reply.message_id,
                "Discarding reply to an earlier rpc"
            );
        }
    }
}

/// Run one exchange on the channel in `slot`, bounded by `limit`.
///
/// A timeout or transport failure leaves the stream at an unknown position,
/// so the channel is dropped and every later call fails with
/// [`TransportError::Closed`].
async fn exchange_within<C: Exchange>(
    slot: &mut Option<C>,
    message_id: u32,
    operation: &str,
    limit: Option<Duration>,
) -> TransportResult<RpcReply> {
    let channel = slot.as_mut().ok_or(TransportError::Closed)?;
    let result = match limit {
        Some(limit) => tokio::time::timeout(limit, channel.exchange(message_id, operation))
            .await
            .unwrap_or(Err(TransportError::Timeout(limit.as_secs()))),
        None => channel.exchange(message_id, operation).await,
    };
    if let Err(ref e) = result {
        warn!(message_id, error = %e, "Dropping NETCONF channel");
        *slot = None;
    }
    result
}

/// NETCONF session over an SSH `netconf` subsystem.
pub struct SshTransport {
    identifier: String,
    handle: RwLock<Option<Handle<ClientHandler>>>,
    channel: Mutex<Option<NetconfChannel>>,
    message_ids: MessageIds,
    rpc_timeout: Option<Duration>,
    server_hello: ServerHello,
}

impl SshTransport {
    /// Connect on the default NETCONF port with default options.
    pub async fn connect(host: &str, credentials: &Credentials) -> TransportResult<Self> {
        Self::connect_with(host, credentials, &SshOptions::default()).await
    }

    /// Connect, authenticate, open the netconf subsystem and exchange hellos.
    pub async fn connect_with(
        host: &str,
        credentials: &Credentials,
        options: &SshOptions,
    ) -> TransportResult<Self> {
        let identifier = format!("{}:{}", host, options.port);
        debug!(host = %identifier, user = %credentials.username, "Connecting NETCONF over SSH");

        let mut config = russh::client::Config::default();
        config.inactivity_timeout = None;
        let config = Arc::new(config);

        let timeout = options.connect_timeout;
        let socket = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&identifier))
            .await
            .map_err(|_| TransportError::Timeout(timeout.as_secs()))?
            .map_err(|e| {
                TransportError::ConnectionFailed(format!(
                    "Failed to connect to {}: {}",
                    identifier, e
                ))
            })?;
        socket.set_nodelay(true).map_err(|e| {
            TransportError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
        })?;

        let handler = ClientHandler {
            host: host.to_string(),
            port: options.port,
            accept_unknown: options.accept_unknown_hosts,
        };

        let mut handle = tokio::time::timeout(
            timeout,
            russh::client::connect_stream(config, socket, handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout.as_secs()))?
        .map_err(|e| TransportError::ConnectionFailed(format!("SSH handshake failed: {}", e)))?;

        Self::authenticate(&mut handle, credentials).await?;

        let channel = handle
            .channel_open_session()
            .await
            .map_err(|e| TransportError::Ssh(format!("Failed to open channel: {}", e)))?;
        channel
            .request_subsystem(true, netconf::SUBSYSTEM)
            .await
            .map_err(|e| {
                TransportError::Ssh(format!("Failed to request netconf subsystem: {}", e))
            })?;

        let mut channel = NetconfChannel {
            channel,
            buffer: Vec::new(),
        };
        channel.send(&netconf::client_hello()).await?;
        let hello = tokio::time::timeout(timeout, channel.receive())
            .await
            .map_err(|_| TransportError::Timeout(timeout.as_secs()))??;
        let server_hello = ServerHello::parse(&hello)?;

        debug!(
            host = %identifier,
            session_id = ?server_hello.session_id,
            capabilities = server_hello.capabilities.len(),
            "NETCONF session established"
        );

        Ok(Self {
            identifier,
            handle: RwLock::new(Some(handle)),
            channel: Mutex::new(Some(channel)),
            message_ids: MessageIds::new(),
            rpc_timeout: options.rpc_timeout,
            server_hello,
        })
    }

    async fn authenticate(
        handle: &mut Handle<ClientHandler>,
        credentials: &Credentials,
    ) -> TransportResult<()> {
        let user = credentials.username.as_str();
        let authenticated = match &credentials.auth {
            Auth::Password(password) => handle
                .authenticate_password(user, password)
                .await
                .map_err(|e| {
                    TransportError::AuthenticationFailed(format!(
                        "Password authentication failed: {}",
                        e
                    ))
                })?,
            Auth::PrivateKey { path, passphrase } => {
                let key_pair = load_secret_key(path, passphrase.as_deref()).map_err(|e| {
                    TransportError::AuthenticationFailed(format!(
                        "Failed to load key {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                handle
                    .authenticate_publickey(user, Arc::new(key_pair))
                    .await
                    .map_err(|e| {
                        TransportError::AuthenticationFailed(format!(
                            "Key authentication failed for {}: {}",
                            path.display(),
                            e
                        ))
                    })?
            }
        };

        if authenticated {
            debug!(user = %user, "Authenticated");
            Ok(())
        } else {
            Err(TransportError::AuthenticationFailed(format!(
                "Device rejected credentials for user {}",
                user
            )))
        }
    }

    /// Hello announced by the device.
    pub fn server_hello(&self) -> &ServerHello {
        &self.server_hello
    }
}

#[async_trait]
impl Transport for SshTransport {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn execute(&self, operation: &str) -> TransportResult<RpcReply> {
        let mut guard = self.channel.lock().await;
        let message_id = self.message_ids.next();
        trace!(host = %self.identifier, message_id, "Sending rpc");
        exchange_within(&mut *guard, message_id, operation, self.rpc_timeout).await
    }

    async fn close(&self) -> TransportResult<()> {
        debug!(host = %self.identifier, "Closing NETCONF session");

        if let Some(mut channel) = self.channel.lock().await.take() {
            let close = netconf::wrap_rpc(self.message_ids.next(), "<close-session/>");
            if channel.send(&close).await.is_ok() {
                let _ = tokio::time::timeout(Duration::from_secs(5), channel.receive()).await;
            }
            let _ = channel.channel.eof().await;
        }

        let handle = self.handle.write().await.take();
        if let Some(handle) = handle {
            let _ = handle
                .disconnect(
                    russh::Disconnect::ByApplication,
                    "NETCONF session closed by client",
                    "en",
                )
                .await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::password("admin", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_with_passphrase_only_applies_to_keys() {
        let key = Credentials::private_key("admin", "/tmp/id_ed25519").with_passphrase("pw");
        match key.auth {
            Auth::PrivateKey { passphrase, .. } => assert_eq!(passphrase.as_deref(), Some("pw")),
            Auth::Password(_) => panic!("expected key auth"),
        }

        let password = Credentials::password("admin", "pw").with_passphrase("ignored");
        assert!(matches!(password.auth, Auth::Password(ref p) if p == "pw"));
    }

    #[test]
    fn test_default_options() {
        let options = SshOptions::default();
        assert_eq!(options.port, 830);
        assert!(options.rpc_timeout.is_none());
        assert!(options.accept_unknown_hosts);
    }

    /// Answers after `delay`, echoing the id of the request it answers.
    struct SlowChannel {
        delay: Duration,
        sent: Vec<u32>,
    }

    #[async_trait]
    impl Exchange for SlowChannel {
        async fn exchange(
            &mut self,
            message_id: u32,
            _operation: &str,
        ) -> TransportResult<RpcReply> {
            self.sent.push(message_id);
            tokio::time::sleep(self.delay).await;
            RpcReply::parse(&format!(
                r#"<rpc-reply message-id="{}"><ok/></rpc-reply>"#,
                message_id
            ))
        }
    }

    #[tokio::test]
    async fn test_exchange_within_deadline() {
        let mut slot = Some(SlowChannel {
            delay: Duration::from_millis(1),
            sent: Vec::new(),
        });
        let reply = exchange_within(&mut slot, 4, "<lock/>", Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(reply.message_id, Some(4));
        assert_eq!(slot.as_ref().map(|c| c.sent.clone()), Some(vec![4]));
    }

    #[tokio::test]
    async fn test_timed_out_exchange_closes_channel() {
        let mut slot = Some(SlowChannel {
            delay: Duration::from_millis(200),
            sent: Vec::new(),
        });

        let err = exchange_within(&mut slot, 1, "<lock/>", Some(Duration::from_millis(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout(_)));
        assert!(slot.is_none());

        // The late reply to message 1 can never be read as the reply to message 2
        let err = exchange_within(&mut slot, 2, "<commit-configuration/>", None)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let options = SshOptions {
            port: 1,
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let result =
            SshTransport::connect_with("127.0.0.1", &Credentials::password("u", "p"), &options)
                .await;
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed(_)) | Err(TransportError::Timeout(_))
        ));
    }
}
