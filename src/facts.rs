//! Routing engine facts gathered at session establishment.
//!
//! `get-software-information` answers in one of two shapes. A single routing
//! engine replies with one `<software-information>`; a dual-RE chassis or an
//! SRX cluster wraps one per engine in `multi-routing-engine-results`. The
//! shape is picked by peeking for that marker, then only the matching shape is
//! decoded.

use crate::error::{Error, Result};
use crate::transport::RpcReply;
use crate::views::is_multi_re;
use crate::xml::{child, find, text};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Node;
use serde::Serialize;

/// Bracketed version token in a package comment
static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("Invalid version regex"));

/// Extract the bracketed version from a package comment.
///
/// `"JUNOS Software Release [12.1X47-D10.4]"` yields `12.1X47-D10.4`.
pub fn extract_version(comment: &str) -> Option<&str> {
    VERSION_PATTERN
        .captures(comment)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Software identity of one routing engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingEngine {
    /// `re0`, `node0`, ... for multi-RE devices
    pub name: Option<String>,
    /// Upper-cased product model, e.g. `SRX240H2`
    pub model: String,
    /// Version extracted from the package comment; empty when none was found
    pub version: String,
}

/// Facts for a whole device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facts {
    pub hostname: String,
    pub routing_engines: Vec<RoutingEngine>,
}

impl Facts {
    /// Decode a `get-software-information` reply.
    pub fn parse(reply: &RpcReply) -> Result<Self> {
        let doc = reply.document()?;
        let root = doc.root_element();

        let facts = if is_multi_re(&reply.raw) {
            let items: Vec<_> = root
                .descendants()
                .filter(|n| n.has_tag_name("multi-routing-engine-item"))
                .collect();
            let hostname = items
                .first()
                .map(|item| text_in(*item, "software-information", "host-name"))
                .unwrap_or_default();
            let routing_engines = items
                .into_iter()
                .filter_map(|item| {
                    let software = find(item, "software-information")?;
                    let mut re = decode_routing_engine(software);
                    re.name = Some(text(item, "re-name")).filter(|n| !n.is_empty());
                    Some(re)
                })
                .collect();
            Facts {
                hostname,
                routing_engines,
            }
        } else {
            match find(root, "software-information") {
                Some(software) => Facts {
                    hostname: text(software, "host-name"),
                    routing_engines: vec![decode_routing_engine(software)],
                },
                None => Facts::default(),
            }
        };

        if facts.routing_engines.is_empty() {
            return Err(Error::UnexpectedReply(
                "software information lists no routing engines".to_string(),
            ));
        }
        Ok(facts)
    }

    pub fn re_count(&self) -> usize {
        self.routing_engines.len()
    }

    /// Model of the first routing engine.
    pub fn model(&self) -> &str {
        self.routing_engines
            .first()
            .map(|re| re.model.as_str())
            .unwrap_or_default()
    }
}

fn text_in(node: Node<'_, '_>, container: &str, path: &str) -> String {
    find(node, container)
        .map(|c| text(c, path))
        .unwrap_or_default()
}

fn decode_routing_engine(software: Node<'_, '_>) -> RoutingEngine {
    let version = software
        .children()
        .filter(|n| n.has_tag_name("package-information"))
        .filter_map(|pkg| child(pkg, "comment").and_then(|c| c.text()))
        .find_map(extract_version)
        .map(str::to_string)
        .unwrap_or_else(|| text(software, "junos-version"));

    RoutingEngine {
        name: None,
        model: text(software, "product-model").to_uppercase(),
        version,
    }
}
