//! NETCONF 1.0 message handling (RFC 6241, RFC 6242 end-of-message framing).
//!
//! This module is transport-agnostic: it builds hello and `<rpc>` envelopes,
//! splits a byte stream into messages, and parses `<rpc-reply>` documents.

use super::{TransportError, TransportResult};
use crate::error::RpcError;
use roxmltree::{Document, Node};
use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// NETCONF Constants
// ============================================================================

/// NETCONF 1.0 message delimiter (used with SSH subsystem framing)
pub const DELIMITER: &str = "]]>]]>";

/// NETCONF SSH subsystem name
pub const SUBSYSTEM: &str = "netconf";

/// Default NETCONF port
pub const DEFAULT_PORT: u16 = 830;

/// NETCONF base namespace (RFC 6241)
pub const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Capabilities announced in the client hello
const CLIENT_CAPABILITIES: &[&str] = &[
    "urn:ietf:params:netconf:base:1.0",
    "urn:ietf:params:netconf:capability:candidate:1.0",
    "urn:ietf:params:netconf:capability:confirmed-commit:1.0",
    "urn:ietf:params:netconf:capability:validate:1.0",
    "urn:ietf:params:netconf:capability:url:1.0?scheme=http,ftp,file",
];

// ============================================================================
// Message IDs
// ============================================================================

/// Monotonic message-id source, one per transport.
#[derive(Debug)]
pub struct MessageIds(AtomicU32);

impl MessageIds {
    pub fn new() -> Self {
        Self(AtomicU32::new(1))
    }

    /// Get the next message ID
    pub fn next(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MessageIds {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// Build the client hello message, including the end-of-message delimiter.
pub fn client_hello() -> String {
    let capabilities: String = CLIENT_CAPABILITIES
        .iter()
        .map(|c| format!("<capability>{}</capability>", c))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><hello xmlns="{}"><capabilities>{}</capabilities></hello>{}"#,
        NETCONF_NS, capabilities, DELIMITER
    )
}

/// Wrap an operation in an `<rpc>` envelope, including the delimiter.
pub fn wrap_rpc(message_id: u32, operation: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rpc xmlns="{}" message-id="{}">{}</rpc>{}"#,
        NETCONF_NS, message_id, operation, DELIMITER
    )
}

/// Remove one complete message from the front of `buffer`, if present.
///
/// The buffer holds raw bytes so a character split across two reads is only
/// decoded once the whole message has arrived.
pub fn take_message(buffer: &mut Vec<u8>) -> TransportResult<Option<String>> {
    let delimiter = DELIMITER.as_bytes();
    let Some(end) = buffer
        .windows(delimiter.len())
        .position(|window| window == delimiter)
    else {
        return Ok(None);
    };
    let bytes: Vec<u8> = buffer.drain(..end + delimiter.len()).take(end).collect();
    let message = String::from_utf8(bytes)
        .map_err(|e| TransportError::Framing(format!("message is not valid UTF-8: {}", e)))?;
    Ok(Some(message.trim().to_string()))
}

// ============================================================================
// Server Hello
// ============================================================================

/// Parsed server hello
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHello {
    /// Session ID assigned by the device
    pub session_id: Option<u32>,
    /// Capabilities announced by the device
    pub capabilities: Vec<String>,
}

impl ServerHello {
    pub fn parse(message: &str) -> TransportResult<Self> {
        let doc = Document::parse(message)
            .map_err(|e| TransportError::Framing(format!("invalid server hello: {}", e)))?;
        let root = doc.root_element();
        if root.tag_name().name() != "hello" {
            return Err(TransportError::Framing(format!(
                "expected <hello>, got <{}>",
                root.tag_name().name()
            )));
        }

        let session_id = root
            .descendants()
            .find(|n| n.has_tag_name("session-id"))
            .and_then(|n| n.text())
            .and_then(|t| t.trim().parse().ok());

        let capabilities = root
            .descendants()
            .filter(|n| n.has_tag_name("capability"))
            .filter_map(|n| n.text())
            .map(|t| t.trim().to_string())
            .collect();

        Ok(Self {
            session_id,
            capabilities,
        })
    }

    /// Check if a capability is supported
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c.contains(capability))
    }
}

// ============================================================================
// RPC Reply
// ============================================================================

/// Parsed NETCONF `<rpc-reply>`
#[derive(Debug, Clone, Default)]
pub struct RpcReply {
    /// Message ID echoed by the device, if any
    pub message_id: Option<u32>,
    /// Whether the reply carried an `<ok/>` element
    pub ok: bool,
    /// Every `rpc-error` in the reply, wherever it was nested
    pub errors: Vec<RpcError>,
    /// Inner XML of the `<rpc-reply>` element
    pub data: String,
    /// The complete reply document
    pub raw: String,
}

impl RpcReply {
    /// Parse a complete `<rpc-reply>` message (without delimiter).
    pub fn parse(message: &str) -> TransportResult<Self> {
        let doc = Document::parse(message)
            .map_err(|e| TransportError::Framing(format!("invalid rpc-reply: {}", e)))?;
        let root = doc.root_element();
        if root.tag_name().name() != "rpc-reply" {
            return Err(TransportError::Framing(format!(
                "expected <rpc-reply>, got <{}>",
                root.tag_name().name()
            )));
        }

        let message_id = root.attribute("message-id").and_then(|v| v.parse().ok());
        let ok = root.children().any(|n| n.has_tag_name("ok"));
        let errors = root
            .descendants()
            .filter(|n| n.has_tag_name("rpc-error"))
            .map(parse_rpc_error)
            .collect();

        Ok(Self {
            message_id,
            ok,
            errors,
            data: inner_xml(message, root).trim().to_string(),
            raw: message.to_string(),
        })
    }

    /// Whether this reply answers the request sent with `message_id`.
    ///
    /// Replies that do not echo a message-id are accepted.
    pub fn answers(&self, message_id: u32) -> bool {
        self.message_id.map_or(true, |id| id == message_id)
    }

    /// Errors that are not mere warnings.
    pub fn failures(&self) -> Vec<RpcError> {
        self.errors.iter().filter(|e| !e.is_warning()).cloned().collect()
    }

    /// Warnings reported alongside an otherwise successful reply.
    pub fn warnings(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| e.is_warning())
    }

    /// Parse the complete reply again for decoding.
    ///
    /// Decoders work on the full document rather than on `data` so namespace
    /// prefixes declared on `<rpc-reply>` stay resolvable.
    pub fn document(&self) -> Result<Document<'_>, roxmltree::Error> {
        Document::parse(&self.raw)
    }
}

/// Source text between the start and end tags of `node`.
pub(crate) fn inner_xml<'a>(source: &'a str, node: Node<'_, '_>) -> &'a str {
    match (node.first_child(), node.last_child()) {
        (Some(first), Some(last)) => &source[first.range().start..last.range().end],
        _ => "",
    }
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_rpc_error(node: Node<'_, '_>) -> RpcError {
    let bad_element = node
        .children()
        .find(|n| n.has_tag_name("error-info"))
        .and_then(|info| child_text(info, "bad-element"));

    RpcError {
        error_type: child_text(node, "error-type").unwrap_or_default(),
        error_tag: child_text(node, "error-tag").unwrap_or_default(),
        severity: child_text(node, "error-severity").unwrap_or_else(|| "error".to_string()),
        path: child_text(node, "error-path"),
        bad_element,
        message: child_text(node, "error-message").unwrap_or_default(),
    }
}
