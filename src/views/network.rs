//! Forwarding and neighbor views: ARP, routes, interfaces, VLANs, LLDP,
//! ethernet-switching and BGP.

use super::Decode;
use crate::xml::{find, list, number, text, texts};
use roxmltree::Node;
use serde::Serialize;

// ============================================================================
// ARP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArpTable {
    pub count: u32,
    pub entries: Vec<ArpEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArpEntry {
    pub mac_address: String,
    pub ip_address: String,
    pub interface: String,
}

impl Decode for ArpTable {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(table) = find(scope, "arp-table-information") else {
            return Self::default();
        };
        Self {
            count: number(table, "arp-entry-count"),
            entries: list(table, "arp-table-entry", |n| ArpEntry {
                mac_address: text(n, "mac-address"),
                ip_address: text(n, "ip-address"),
                interface: text(n, "interface-name"),
            }),
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Every routing table on the device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingTable {
    pub tables: Vec<RouteTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    pub name: String,
    pub total_routes: u32,
    pub active_routes: u32,
    pub holddown_routes: u32,
    pub hidden_routes: u32,
    pub entries: Vec<Route>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Route {
    pub destination: String,
    /// `*` for the active entry
    pub active: String,
    pub protocol: String,
    pub preference: u32,
    pub age: String,
    pub next_hop: String,
    pub next_hop_interface: String,
    pub next_hop_table: String,
    pub next_hop_local_interface: String,
}

impl Decode for RoutingTable {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "route-information") else {
            return Self::default();
        };
        Self {
            tables: list(info, "route-table", |t| RouteTable {
                name: text(t, "table-name"),
                total_routes: number(t, "total-route-count"),
                active_routes: number(t, "active-route-count"),
                holddown_routes: number(t, "holddown-route-count"),
                hidden_routes: number(t, "hidden-route-count"),
                entries: list(t, "rt", |rt| Route {
                    destination: text(rt, "rt-destination"),
                    active: text(rt, "rt-entry>active-tag"),
                    protocol: text(rt, "rt-entry>protocol-name"),
                    preference: number(rt, "rt-entry>preference"),
                    age: text(rt, "rt-entry>age"),
                    next_hop: text(rt, "rt-entry>nh>to"),
                    next_hop_interface: text(rt, "rt-entry>nh>via"),
                    next_hop_table: text(rt, "rt-entry>nh>nh-table"),
                    next_hop_local_interface: text(rt, "rt-entry>nh>nh-local-interface"),
                }),
            }),
        }
    }
}

// ============================================================================
// Interfaces
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Interfaces {
    pub entries: Vec<PhysicalInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhysicalInterface {
    pub name: String,
    pub admin_status: String,
    pub oper_status: String,
    pub local_index: u32,
    pub snmp_index: u32,
    pub link_level_type: String,
    pub interface_type: String,
    pub mtu: String,
    pub link_mode: String,
    pub speed: String,
    pub flow_control: String,
    pub auto_negotiation: String,
    pub hardware_physical_address: String,
    pub flapped: String,
    pub input_bps: u64,
    pub input_pps: u64,
    pub output_bps: u64,
    pub output_pps: u64,
    pub logical_interfaces: Vec<LogicalInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogicalInterface {
    pub name: String,
    pub mtu: String,
    pub cidr: String,
    pub ip_address: String,
    pub local_index: u32,
    pub snmp_index: u32,
    pub encapsulation: String,
    pub zone_name: String,
    pub input_packets: u64,
    pub output_packets: u64,
    pub address_family: String,
    pub aggregated_ethernet: String,
    pub link_address: String,
}

impl Decode for Interfaces {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "interface-information") else {
            return Self::default();
        };
        Self {
            entries: list(info, "physical-interface", decode_physical),
        }
    }
}

fn decode_physical(n: Node<'_, '_>) -> PhysicalInterface {
    PhysicalInterface {
        name: text(n, "name"),
        admin_status: text(n, "admin-status"),
        oper_status: text(n, "oper-status"),
        local_index: number(n, "local-index"),
        snmp_index: number(n, "snmp-index"),
        link_level_type: text(n, "link-level-type"),
        interface_type: text(n, "if-type"),
        mtu: text(n, "mtu"),
        link_mode: text(n, "link-mode"),
        speed: text(n, "speed"),
        flow_control: text(n, "if-flow-control"),
        auto_negotiation: text(n, "if-auto-negotiation"),
        hardware_physical_address: text(n, "hardware-physical-address"),
        flapped: text(n, "interface-flapped"),
        input_bps: number(n, "traffic-statistics>input-bps"),
        input_pps: number(n, "traffic-statistics>input-pps"),
        output_bps: number(n, "traffic-statistics>output-bps"),
        output_pps: number(n, "traffic-statistics>output-pps"),
        logical_interfaces: list(n, "logical-interface", |l| LogicalInterface {
            name: text(l, "name"),
            mtu: text(l, "address-family>mtu"),
            cidr: text(l, "address-family>interface-address>ifa-destination"),
            ip_address: text(l, "address-family>interface-address>ifa-local"),
            local_index: number(l, "local-index"),
            snmp_index: number(l, "snmp-index"),
            encapsulation: text(l, "encapsulation"),
            zone_name: text(l, "logical-interface-zone-name"),
            input_packets: number(l, "traffic-statistics>input-packets"),
            output_packets: number(l, "traffic-statistics>output-packets"),
            address_family: text(l, "address-family>address-family-name"),
            aggregated_ethernet: text(l, "address-family>ae-bundle-name"),
            link_address: text(l, "link-address"),
        }),
    }
}

// ============================================================================
// VLANs
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vlans {
    pub entries: Vec<Vlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vlan {
    pub name: String,
    pub tag: u32,
    pub member_interfaces: Vec<String>,
}

impl Decode for Vlans {
    fn decode(scope: Node<'_, '_>) -> Self {
        Self {
            entries: scope
                .descendants()
                .filter(|n| n.has_tag_name("l2ng-l2ald-vlan-instance-group"))
                .map(|n| Vlan {
                    name: text(n, "l2ng-l2rtb-vlan-name"),
                    tag: number(n, "l2ng-l2rtb-vlan-tag"),
                    member_interfaces: texts(
                        n,
                        "l2ng-l2rtb-vlan-member>l2ng-l2rtb-vlan-member-interface",
                    ),
                })
                .collect(),
        }
    }
}

// ============================================================================
// LLDP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LldpNeighbors {
    pub entries: Vec<LldpNeighbor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LldpNeighbor {
    pub local_port_id: String,
    pub local_parent_interface_name: String,
    pub remote_chassis_id_subtype: String,
    pub remote_chassis_id: String,
    pub remote_port_description: String,
    pub remote_port_id: String,
    pub remote_system_name: String,
}

impl Decode for LldpNeighbors {
    fn decode(scope: Node<'_, '_>) -> Self {
        Self {
            entries: scope
                .descendants()
                .filter(|n| n.has_tag_name("lldp-neighbor-information"))
                .map(|n| LldpNeighbor {
                    local_port_id: text(n, "lldp-local-port-id"),
                    local_parent_interface_name: text(n, "lldp-local-parent-interface-name"),
                    remote_chassis_id_subtype: text(n, "lldp-remote-chassis-id-subtype"),
                    remote_chassis_id: text(n, "lldp-remote-chassis-id"),
                    remote_port_description: text(n, "lldp-remote-port-description"),
                    remote_port_id: text(n, "lldp-remote-port-id"),
                    remote_system_name: text(n, "lldp-remote-system-name"),
                })
                .collect(),
        }
    }
}

// ============================================================================
// Ethernet Switching
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EthernetSwitchingTable {
    pub entries: Vec<L2MacEntry>,
}

/// MAC addresses learned on one VLAN
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct L2MacEntry {
    pub global_mac_count: u32,
    pub learned_mac_count: u32,
    pub routing_instance: String,
    pub vlan_id: u32,
    pub mac_entries: Vec<MacEntry>,
}

/// One MAC address. Flags: S static, D dynamic, L locally learned,
/// P persistent static, SE statistics enabled, NM non configured,
/// R remote PE, O ovsdb.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MacEntry {
    pub vlan_name: String,
    pub mac_address: String,
    pub age: String,
    pub flags: String,
    pub logical_interface: String,
}

impl Decode for EthernetSwitchingTable {
    fn decode(scope: Node<'_, '_>) -> Self {
        Self {
            entries: scope
                .descendants()
                .filter(|n| n.has_tag_name("l2ng-l2ald-mac-entry-vlan"))
                .map(|n| L2MacEntry {
                    global_mac_count: number(n, "mac-count-global"),
                    learned_mac_count: number(n, "learnt-mac-count"),
                    routing_instance: text(n, "l2ng-l2-mac-routing-instance"),
                    vlan_id: number(n, "l2ng-l2-vlan-id"),
                    mac_entries: list(n, "l2ng-mac-entry", |m| MacEntry {
                        vlan_name: text(m, "l2ng-l2-mac-vlan-name"),
                        mac_address: text(m, "l2ng-l2-mac-address"),
                        age: text(m, "l2ng-l2-mac-age"),
                        flags: text(m, "l2ng-l2-mac-flags"),
                        logical_interface: text(m, "l2ng-l2-mac-logical-interface"),
                    }),
                })
                .collect(),
        }
    }
}

// ============================================================================
// BGP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BgpTable {
    pub total_groups: u32,
    pub total_peers: u32,
    pub down_peers: u32,
    pub peers: Vec<BgpPeer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BgpPeer {
    pub address: String,
    pub asn: u32,
    pub input_messages: u64,
    pub output_messages: u64,
    pub queued_routes: u32,
    pub flaps: u32,
    pub elapsed_time: String,
    pub state: String,
    pub routing_table: String,
    pub active_prefixes: u32,
    pub received_prefixes: u32,
    pub accepted_prefixes: u32,
    pub suppressed_prefixes: u32,
}

impl Decode for BgpTable {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "bgp-information") else {
            return Self::default();
        };
        Self {
            total_groups: number(info, "group-count"),
            total_peers: number(info, "peer-count"),
            down_peers: number(info, "down-peer-count"),
            peers: list(info, "bgp-peer", |p| BgpPeer {
                address: text(p, "peer-address"),
                asn: number(p, "peer-as"),
                input_messages: number(p, "input-messages"),
                output_messages: number(p, "output-messages"),
                queued_routes: number(p, "route-queue-count"),
                flaps: number(p, "flap-count"),
                elapsed_time: text(p, "elapsed-time"),
                state: text(p, "peer-state"),
                routing_table: text(p, "bgp-rib>name"),
                active_prefixes: number(p, "bgp-rib>active-prefix-count"),
                received_prefixes: number(p, "bgp-rib>received-prefix-count"),
                accepted_prefixes: number(p, "bgp-rib>accepted-prefix-count"),
                suppressed_prefixes: number(p, "bgp-rib>suppressed-prefix-count"),
            }),
        }
    }
}
