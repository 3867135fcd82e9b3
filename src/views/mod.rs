//! Operational views.
//!
//! Each view is one fixed RPC plus a typed decode target. Some views come back
//! in two incompatible shapes: a single routing engine answers with the data
//! directly, a chassis cluster wraps one copy per node in
//! `multi-routing-engine-results`. The shape is decided by a cheap peek for
//! that marker before any decoding happens, and the result is a [`Topology`].

mod chassis;
mod network;
mod security;

pub use chassis::{
    Chassis, FileSystem, HardwareInventory, Module, SystemStorage, VcMember, VcNeighbor,
    VirtualChassis,
};
pub use network::{
    ArpEntry, ArpTable, BgpPeer, BgpTable, EthernetSwitchingTable, Interfaces, L2MacEntry,
    LldpNeighbor, LldpNeighbors, LogicalInterface, MacEntry, PhysicalInterface, Route,
    RouteTable, RoutingTable, Vlan, Vlans,
};
pub use security::{
    FirewallPolicy, Rule, SecurityContext, SourceNatEntry, SourceNats, StaticNatEntry,
    StaticNats,
};

use crate::error::{Error, Result};
use crate::rpc::escape_xml;
use crate::transport::RpcReply;
use roxmltree::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Element that marks a reply from a multi routing engine / clustered device
pub const MULTI_RE_MARKER: &str = "multi-routing-engine-results";

/// Whether a raw reply uses the multi routing engine shape.
pub fn is_multi_re(raw: &str) -> bool {
    raw.contains(MULTI_RE_MARKER)
}

// ============================================================================
// View Selection
// ============================================================================

/// Available operational views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Arp,
    Route,
    Interface,
    Vlan,
    Lldp,
    EthernetSwitching,
    Inventory,
    VirtualChassis,
    Bgp,
    StaticNat,
    SourceNat,
    Storage,
    FirewallPolicy,
}

impl View {
    pub const ALL: [View; 13] = [
        View::Arp,
        View::Route,
        View::Interface,
        View::Vlan,
        View::Lldp,
        View::EthernetSwitching,
        View::Inventory,
        View::VirtualChassis,
        View::Bgp,
        View::StaticNat,
        View::SourceNat,
        View::Storage,
        View::FirewallPolicy,
    ];

    /// Name of the device RPC behind this view
    pub fn rpc_name(&self) -> &'static str {
        match self {
            View::Arp => "get-arp-table-information",
            View::Route => "get-route-information",
            View::Interface => "get-interface-information",
            View::Vlan => "get-vlan-information",
            View::Lldp => "get-lldp-neighbors-information",
            View::EthernetSwitching => "get-ethernet-switching-table-information",
            View::Inventory => "get-chassis-inventory",
            View::VirtualChassis => "get-virtual-chassis-information",
            View::Bgp => "get-bgp-summary-information",
            View::StaticNat => "get-static-nat-rule-information",
            View::SourceNat => "get-source-nat-rule-sets-information",
            View::Storage => "get-system-storage",
            View::FirewallPolicy => "get-firewall-policies",
        }
    }

    /// Whether a clustered device answers this view per node.
    pub fn has_clustered_shape(&self) -> bool {
        matches!(
            self,
            View::Inventory
                | View::StaticNat
                | View::SourceNat
                | View::Storage
                | View::FirewallPolicy
        )
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::Arp => "arp",
            View::Route => "route",
            View::Interface => "interface",
            View::Vlan => "vlan",
            View::Lldp => "lldp",
            View::EthernetSwitching => "ethernet-switching",
            View::Inventory => "inventory",
            View::VirtualChassis => "virtual-chassis",
            View::Bgp => "bgp",
            View::StaticNat => "static-nat",
            View::SourceNat => "source-nat",
            View::Storage => "storage",
            View::FirewallPolicy => "firewall-policy",
        };
        f.write_str(name)
    }
}

impl FromStr for View {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "arp" => Ok(View::Arp),
            "route" => Ok(View::Route),
            "interface" => Ok(View::Interface),
            "vlan" => Ok(View::Vlan),
            "lldp" => Ok(View::Lldp),
            "ethernetswitch" | "ethernetswitching" => Ok(View::EthernetSwitching),
            "inventory" => Ok(View::Inventory),
            "virtualchassis" => Ok(View::VirtualChassis),
            "bgp" => Ok(View::Bgp),
            "staticnat" => Ok(View::StaticNat),
            "sourcenat" => Ok(View::SourceNat),
            "storage" => Ok(View::Storage),
            "firewallpolicy" => Ok(View::FirewallPolicy),
            _ => Err(Error::InvalidArgument(format!("Unknown view '{}'", s))),
        }
    }
}

/// A view plus its optional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    pub view: View,
    /// Physical interface name; only used by [`View::Interface`]
    pub interface: Option<String>,
}

impl ViewRequest {
    pub fn new(view: View) -> Self {
        Self {
            view,
            interface: None,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            view: View::Interface,
            interface: Some(name.into()),
        }
    }

    pub(crate) fn render(&self) -> String {
        match (self.view, self.interface.as_deref()) {
            (View::Interface, Some(name)) => format!(
                "<get-interface-information><interface-name>{}</interface-name></get-interface-information>",
                escape_xml(name)
            ),
            (View::Arp, _) => "<get-arp-table-information><no-resolve/></get-arp-table-information>".to_string(),
            (View::StaticNat, _) => {
                "<get-static-nat-rule-information><all/></get-static-nat-rule-information>".to_string()
            }
            (View::SourceNat, _) => {
                "<get-source-nat-rule-sets-information><all/></get-source-nat-rule-sets-information>"
                    .to_string()
            }
            (view, _) => format!("<{}/>", view.rpc_name()),
        }
    }
}

// ============================================================================
// Topology
// ============================================================================

/// Result of a view that a clustered device answers once per node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology<T> {
    /// Single routing engine
    Single(T),
    /// One entry per cluster node, in reply order
    Clustered(Vec<T>),
}

impl<T> Topology<T> {
    pub fn is_clustered(&self) -> bool {
        matches!(self, Topology::Clustered(_))
    }

    /// Every node's data, one element for single devices.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Topology::Single(data) => std::slice::from_ref(data),
            Topology::Clustered(nodes) => nodes,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Topology::Single(data) => vec![data],
            Topology::Clustered(nodes) => nodes,
        }
    }
}

/// Decode target for one view (or one cluster node of a view).
pub(crate) trait Decode: Default {
    /// Build from the reply root, or from one `multi-routing-engine-item`.
    fn decode(scope: Node<'_, '_>) -> Self;
}

/// Pick the shape first, then decode into that shape only.
pub(crate) fn decode_topology<T: Decode>(raw: &str, root: Node<'_, '_>) -> Topology<T> {
    if is_multi_re(raw) {
        Topology::Clustered(
            root.descendants()
                .filter(|n| n.has_tag_name("multi-routing-engine-item"))
                .map(T::decode)
                .collect(),
        )
    } else {
        Topology::Single(T::decode(root))
    }
}

// ============================================================================
// Platform Support
// ============================================================================

/// Which views are unavailable on which model families.
///
/// A model matches a family when the family string occurs in the upper-cased
/// model name (`SRX` matches `SRX240H2`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTable {
    denied: HashMap<View, Vec<String>>,
}

impl PlatformTable {
    /// A table that allows every view everywhere.
    pub fn permissive() -> Self {
        Self {
            denied: HashMap::new(),
        }
    }

    /// Deny `view` on models containing `family`.
    pub fn deny(mut self, view: View, family: impl Into<String>) -> Self {
        self.denied
            .entry(view)
            .or_default()
            .push(family.into().to_uppercase());
        self
    }

    pub fn is_supported(&self, view: View, model: &str) -> bool {
        let model = model.to_uppercase();
        self.denied
            .get(&view)
            .map(|families| !families.iter().any(|f| model.contains(f.as_str())))
            .unwrap_or(true)
    }

    /// Fail with [`Error::UnsupportedOnPlatform`] when `view` is denied for `model`.
    pub fn check(&self, view: View, model: &str) -> Result<()> {
        if self.is_supported(view, model) {
            Ok(())
        } else {
            Err(Error::UnsupportedOnPlatform {
                view: view.to_string(),
                model: model.to_string(),
            })
        }
    }
}

impl Default for PlatformTable {
    fn default() -> Self {
        Self::permissive()
            .deny(View::EthernetSwitching, "SRX")
            .deny(View::EthernetSwitching, "MX")
            .deny(View::VirtualChassis, "SRX")
            .deny(View::VirtualChassis, "MX")
    }
}

// ============================================================================
// View Data
// ============================================================================

/// Decoded result of any view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", content = "data", rename_all = "kebab-case")]
pub enum ViewData {
    Arp(ArpTable),
    Route(RoutingTable),
    Interface(Interfaces),
    Vlan(Vlans),
    Lldp(LldpNeighbors),
    EthernetSwitching(EthernetSwitchingTable),
    Inventory(Topology<HardwareInventory>),
    VirtualChassis(VirtualChassis),
    Bgp(BgpTable),
    StaticNat(Topology<StaticNats>),
    SourceNat(Topology<SourceNats>),
    Storage(Topology<SystemStorage>),
    FirewallPolicy(Topology<FirewallPolicy>),
}

/// Decode a view reply.
pub fn decode(view: View, reply: &RpcReply) -> Result<ViewData> {
    if reply.data.is_empty() {
        return Err(Error::UnexpectedReply(format!(
            "no output available for the {} view",
            view
        )));
    }

    let doc = reply.document()?;
    let root = doc.root_element();
    let raw = reply.raw.as_str();

    let data = match view {
        View::Arp => ViewData::Arp(ArpTable::decode(root)),
        View::Route => ViewData::Route(RoutingTable::decode(root)),
        View::Interface => ViewData::Interface(Interfaces::decode(root)),
        View::Vlan => ViewData::Vlan(Vlans::decode(root)),
        View::Lldp => ViewData::Lldp(LldpNeighbors::decode(root)),
        View::EthernetSwitching => {
            ViewData::EthernetSwitching(EthernetSwitchingTable::decode(root))
        }
        View::Inventory => ViewData::Inventory(decode_topology(raw, root)),
        View::VirtualChassis => ViewData::VirtualChassis(VirtualChassis::decode(root)),
        View::Bgp => ViewData::Bgp(BgpTable::decode(root)),
        View::StaticNat => ViewData::StaticNat(decode_topology(raw, root)),
        View::SourceNat => ViewData::SourceNat(decode_topology(raw, root)),
        View::Storage => ViewData::Storage(decode_topology(raw, root)),
        View::FirewallPolicy => ViewData::FirewallPolicy(decode_topology(raw, root)),
    };
    Ok(data)
}
