//! SRX security views: static NAT, source NAT and firewall policies.

use super::Decode;
use crate::xml::{find, list, number, text, texts};
use roxmltree::Node;
use serde::Serialize;

// ============================================================================
// Static NAT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaticNats {
    pub entries: Vec<StaticNatEntry>,
}

impl StaticNats {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaticNatEntry {
    pub name: String,
    pub set_name: String,
    pub id: String,
    pub rule_matching_position: u32,
    pub from_context: String,
    pub from_zone: String,
    pub source_address_low_range: String,
    pub source_address_high_range: String,
    pub destination_address_prefix: String,
    pub destination_port_low: u16,
    pub destination_port_high: u16,
    pub host_address_prefix: String,
    pub host_port_low: u16,
    pub host_port_high: u16,
    pub netmask: String,
    pub routing_instance: String,
    pub translation_hits: u64,
    pub successful_sessions: u64,
    pub concurrent_hits: u64,
}

impl Decode for StaticNats {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "static-nat-rule-information") else {
            return Self::default();
        };
        Self {
            entries: list(info, "static-nat-rule-entry", |e| StaticNatEntry {
                name: text(e, "rule-name"),
                set_name: text(e, "rule-set-name"),
                id: text(e, "rule-id"),
                rule_matching_position: number(e, "rule-matching-position"),
                from_context: text(e, "rule-from-context"),
                from_zone: text(e, "rule-from-context-name"),
                source_address_low_range: text(
                    e,
                    "static-source-address-range-entry>rule-source-address-low-range",
                ),
                source_address_high_range: text(
                    e,
                    "static-source-address-range-entry>rule-source-address-high-range",
                ),
                destination_address_prefix: text(e, "rule-destination-address-prefix"),
                destination_port_low: number(e, "rule-destination-port-low"),
                destination_port_high: number(e, "rule-destination-port-high"),
                host_address_prefix: text(e, "rule-host-address-prefix"),
                host_port_low: number(e, "rule-host-port-low"),
                host_port_high: number(e, "rule-host-port-high"),
                netmask: text(e, "rule-address-netmask"),
                routing_instance: text(e, "rule-host-routing-instance"),
                translation_hits: number(e, "rule-translation-hits"),
                successful_sessions: number(e, "succ-hits"),
                concurrent_hits: number(e, "concurrent-hits"),
            }),
        }
    }
}

// ============================================================================
// Source NAT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceNats {
    pub entries: Vec<SourceNatEntry>,
}

impl SourceNats {
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceNatEntry {
    pub name: String,
    pub set_name: String,
    pub id: String,
    pub rule_matching_position: u32,
    pub from_context: String,
    pub from_zone: String,
    pub to_context: String,
    pub to_zone: String,
    pub source_address_low_range: String,
    pub source_address_high_range: String,
    pub source_addresses: Vec<String>,
    pub destination_addresses: Vec<String>,
    pub destination_port_low: u16,
    pub destination_port_high: u16,
    pub source_port_low: u16,
    pub source_port_high: u16,
    pub protocol: String,
    pub action: String,
    pub persistent_nat_type: String,
    pub persistent_nat_mapping_type: String,
    pub persistent_nat_timeout: u32,
    pub persistent_nat_max_session: u32,
    pub translation_hits: u64,
    pub successful_sessions: u64,
    pub concurrent_hits: u64,
}

impl Decode for SourceNats {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(info) = find(scope, "source-nat-rule-detail-information") else {
            return Self::default();
        };
        Self {
            entries: list(info, "source-nat-rule-entry", |e| SourceNatEntry {
                name: text(e, "rule-name"),
                set_name: text(e, "rule-set-name"),
                id: text(e, "rule-id"),
                rule_matching_position: number(e, "rule-matching-position"),
                from_context: text(e, "rule-from-context"),
                from_zone: text(e, "rule-from-context-name"),
                to_context: text(e, "rule-to-context"),
                to_zone: text(e, "rule-to-context-name"),
                source_address_low_range: text(
                    e,
                    "source-address-range-entry>rule-source-address-low-range",
                ),
                source_address_high_range: text(
                    e,
                    "source-address-range-entry>rule-source-address-high-range",
                ),
                source_addresses: texts(e, "source-address-range-entry>rule-source-address"),
                destination_addresses: texts(
                    e,
                    "destination-address-range-entry>rule-destination-address",
                ),
                destination_port_low: number(e, "destination-port-entry>rule-destination-port-low"),
                destination_port_high: number(
                    e,
                    "destination-port-entry>rule-destination-port-high",
                ),
                source_port_low: number(e, "source-port-entry>rule-source-port-low"),
                source_port_high: number(e, "source-port-entry>rule-source-port-high"),
                protocol: text(e, "src-nat-protocol-entry"),
                action: text(e, "source-nat-rule-action-entry>source-nat-rule-action"),
                persistent_nat_type: text(e, "source-nat-rule-action-entry>persistent-nat-type"),
                persistent_nat_mapping_type: text(
                    e,
                    "source-nat-rule-action-entry>persistent-nat-mapping-type",
                ),
                persistent_nat_timeout: number(
                    e,
                    "source-nat-rule-action-entry>persistent-nat-timeout",
                ),
                persistent_nat_max_session: number(
                    e,
                    "source-nat-rule-action-entry>persistent-nat-max-session",
                ),
                translation_hits: number(e, "source-nat-rule-hits-entry>rule-translation-hits"),
                successful_sessions: number(e, "source-nat-rule-hits-entry>succ-hits"),
                concurrent_hits: number(e, "source-nat-rule-hits-entry>concurrent-hits"),
            }),
        }
    }
}

// ============================================================================
// Firewall Policy
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FirewallPolicy {
    pub contexts: Vec<SecurityContext>,
}

/// Policies from one zone to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityContext {
    pub source_zone: String,
    pub destination_zone: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub state: String,
    pub identifier: u32,
    pub scope_identifier: u32,
    pub sequence_number: u32,
    pub source_addresses: Vec<String>,
    pub destination_addresses: Vec<String>,
    pub applications: Vec<String>,
    pub source_identities: Vec<String>,
    pub action: String,
    pub tcp_syn_check: String,
    pub tcp_sequence_check: String,
}

impl Decode for FirewallPolicy {
    fn decode(scope: Node<'_, '_>) -> Self {
        let Some(policies) = find(scope, "security-policies") else {
            return Self::default();
        };
        Self {
            contexts: list(policies, "security-context", |c| SecurityContext {
                source_zone: text(c, "context-information>source-zone-name"),
                destination_zone: text(c, "context-information>destination-zone-name"),
                rules: list(c, "policies>policy-information", decode_rule),
            }),
        }
    }
}

fn decode_rule(r: Node<'_, '_>) -> Rule {
    Rule {
        name: text(r, "policy-name"),
        state: text(r, "policy-state"),
        identifier: number(r, "policy-identifier"),
        scope_identifier: number(r, "scope-policy-identifier"),
        sequence_number: number(r, "policy-sequence-number"),
        source_addresses: texts(r, "source-addresses>source-address>address-name"),
        destination_addresses: texts(r, "destination-addresses>destination-address>address-name"),
        applications: texts(r, "applications>application>application-name"),
        source_identities: texts(r, "source-identities>source-identity>role-name"),
        action: text(r, "policy-action>action-type"),
        tcp_syn_check: text(
            r,
            "policy-action>policy-tcp-options>policy-tcp-options-syn-check",
        ),
        tcp_sequence_check: text(
            r,
            "policy-action>policy-tcp-options>policy-tcp-options-sequence-check",
        ),
    }
}
