//! SRX configuration builders.
//!
//! Each builder produces a batch of `set` statements meant for
//! [`Session::load_configuration`] with [`ConfigFormat::Set`]. The session
//! helpers read what already exists on the firewall first: the global address
//! book and applications for policies, the zone address books for the
//! global address-book migration, and the `st0` units for a new route-based
//! VPN.
//!
//! ```rust,ignore
//! use junos::srx::{PolicyAction, Rule};
//!
//! let mut policy = session.new_policy().await?;
//! policy.add_rule(
//!     Rule::new("allow-web", "untrust", "dmz", PolicyAction::Permit)
//!         .sources(["any"])
//!         .destinations(["web-01"])
//!         .applications(["junos-https"]),
//! );
//! let statements = policy.build()?;
//! session
//!     .load_configuration(ConfigPayload::lines(statements), ConfigFormat::Set, false)
//!     .await?;
//! ```

use crate::error::{Error, Result};
use crate::session::{CommandOutput, Session};
use crate::rpc::{CommandFormat, ConfigFormat};
use crate::xml::{all, text};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::Document;
use std::fmt;
use tracing::debug;

/// Major and minor release numbers at the start of a Junos version
static RELEASE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)").expect("Invalid release regex"));

/// First release with a global address book
const GLOBAL_ADDRESS_BOOK_RELEASE: (u32, u32) = (11, 2);

/// Object names that always resolve on an SRX
const ANY: &str = "any";

/// Prefix shared by the predefined Junos applications
const PREDEFINED_APPLICATION_PREFIX: &str = "junos-";

/// Reply bodies use `junos:` attributes declared on the enclosing `<rpc-reply>`.
fn wrap_fragment(fragment: &str) -> String {
    format!(
        r#"<fragment xmlns:junos="http://xml.juniper.net/junos/*/junos">{}</fragment>"#,
        fragment
    )
}

/// Names of every element at `path` under a configuration fragment.
fn names(fragment: &str, paths: &[&str]) -> Result<Vec<String>> {
    let wrapped = wrap_fragment(fragment);
    let doc = Document::parse(&wrapped)?;
    let root = doc.root_element();
    Ok(paths
        .iter()
        .flat_map(|path| all(root, path))
        .map(|n| text(n, "name"))
        .filter(|n| !n.is_empty())
        .collect())
}

// ============================================================================
// Security Policy
// ============================================================================

/// Transport protocol of a custom application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// What a matching policy does with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyAction {
    Permit,
    Deny,
    Reject,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyAction::Permit => "permit",
            PolicyAction::Deny => "deny",
            PolicyAction::Reject => "reject",
        }
    }
}

/// A single zone-to-zone policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub from_zone: String,
    pub to_zone: String,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub applications: Vec<String>,
    pub action: PolicyAction,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        from_zone: impl Into<String>,
        to_zone: impl Into<String>,
        action: PolicyAction,
    ) -> Self {
        Self {
            name: name.into(),
            from_zone: from_zone.into(),
            to_zone: to_zone.into(),
            sources: Vec::new(),
            destinations: Vec::new(),
            applications: Vec::new(),
            action,
        }
    }

    /// Source address-book entries or sets.
    pub fn sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    /// Destination address-book entries or sets.
    pub fn destinations<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.destinations
            .extend(destinations.into_iter().map(Into::into));
        self
    }

    /// Applications or application sets.
    pub fn applications<I, S>(mut self, applications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applications
            .extend(applications.into_iter().map(Into::into));
        self
    }

    fn statements(&self) -> Vec<String> {
        let prefix = format!(
            "set security policies from-zone {} to-zone {} policy {}",
            self.from_zone, self.to_zone, self.name
        );
        vec![
            format!(
                "{} match source-address {} destination-address {} application {}",
                prefix,
                bracket(&self.sources),
                bracket(&self.destinations),
                bracket(&self.applications)
            ),
            format!("{} then {}", prefix, self.action.as_str()),
            format!("{} then log session-init session-close", prefix),
        ]
    }
}

/// `[ a b c ]` list syntax.
fn bracket(items: &[String]) -> String {
    let inner: Vec<&str> = items.iter().map(|i| i.trim()).collect();
    format!("[ {} ]", inner.join(" "))
}

/// A custom TCP or UDP application created alongside the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub protocol: Protocol,
    /// Port or `low-high` range
    pub destination_port: String,
}

/// Security policy under construction.
///
/// A policy built from a session knows the firewall's address book and
/// applications, and [`build`](FirewallPolicy::build) rejects rules that
/// reference anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FirewallPolicy {
    inventory: Option<(Vec<String>, Vec<String>)>,
    applications: Vec<Application>,
    rules: Vec<Rule>,
}

impl FirewallPolicy {
    /// Policy that does not check object names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy that only accepts the given address and application names.
    pub fn with_inventory(addresses: Vec<String>, applications: Vec<String>) -> Self {
        Self {
            inventory: Some((addresses, applications)),
            ..Self::default()
        }
    }

    /// Address-book entries and sets known to exist.
    pub fn known_addresses(&self) -> &[String] {
        self.inventory
            .as_ref()
            .map(|(addresses, _)| addresses.as_slice())
            .unwrap_or_default()
    }

    /// Applications and application sets known to exist.
    pub fn known_applications(&self) -> &[String] {
        self.inventory
            .as_ref()
            .map(|(_, applications)| applications.as_slice())
            .unwrap_or_default()
    }

    /// Define an application that does not exist on the firewall yet.
    pub fn create_application(
        &mut self,
        name: impl Into<String>,
        protocol: Protocol,
        destination_port: impl Into<String>,
    ) -> &mut Self {
        self.applications.push(Application {
            name: name.into(),
            protocol,
            destination_port: destination_port.into(),
        });
        self
    }

    pub fn add_rule(&mut self, rule: Rule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Statements for every created application, then every rule in order.
    pub fn build(&self) -> Result<Vec<String>> {
        for rule in &self.rules {
            self.check(rule)?;
        }

        let mut statements: Vec<String> = self
            .applications
            .iter()
            .map(|app| {
                format!(
                    "set applications application {} protocol {} destination-port {}",
                    app.name,
                    app.protocol.as_str(),
                    app.destination_port
                )
            })
            .collect();
        statements.extend(self.rules.iter().flat_map(Rule::statements));
        Ok(statements)
    }

    fn check(&self, rule: &Rule) -> Result<()> {
        for (what, items) in [
            ("source-address", &rule.sources),
            ("destination-address", &rule.destinations),
            ("application", &rule.applications),
        ] {
            if items.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "policy {} has no {}",
                    rule.name, what
                )));
            }
        }

        let Some((addresses, applications)) = &self.inventory else {
            return Ok(());
        };
        for address in rule.sources.iter().chain(&rule.destinations) {
            let address = address.trim();
            if address != ANY && !addresses.iter().any(|a| a == address) {
                return Err(Error::not_found(
                    format!("address {}", address),
                    format!("policy {} references an unknown address", rule.name),
                ));
            }
        }
        for application in &rule.applications {
            let application = application.trim();
            let known = application == ANY
                || application.starts_with(PREDEFINED_APPLICATION_PREFIX)
                || applications.iter().any(|a| a == application)
                || self.applications.iter().any(|a| a.name == application);
            if !known {
                return Err(Error::not_found(
                    format!("application {}", application),
                    format!("policy {} references an unknown application", rule.name),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Global Address Book
// ============================================================================

/// `set` statements that move every zone address book into the global one,
/// then delete the zone address books.
pub fn convert_zone_address_books(zones: &str) -> Result<Vec<String>> {
    let wrapped = wrap_fragment(zones);
    let doc = Document::parse(&wrapped)?;
    let mut statements = Vec::new();

    for zone in all(
        doc.root_element(),
        "configuration>security>zones>security-zone",
    ) {
        let book = all(zone, "address-book");
        if book.is_empty() {
            continue;
        }
        for book in book {
            for address in all(book, "address") {
                let name = text(address, "name");
                let dns = text(address, "dns-name>name");
                let wildcard = text(address, "wildcard-address>name");
                let prefix = text(address, "ip-prefix");
                if !dns.is_empty() {
                    statements.push(format!(
                        "set security address-book global address {} dns-name {}",
                        name, dns
                    ));
                }
                if !wildcard.is_empty() {
                    statements.push(format!(
                        "set security address-book global address {} wildcard-address {}",
                        name, wildcard
                    ));
                }
                if !prefix.is_empty() {
                    statements.push(format!(
                        "set security address-book global address {} {}",
                        name, prefix
                    ));
                }
            }
            for set in all(book, "address-set") {
                let set_name = text(set, "name");
                for member in all(set, "address") {
                    statements.push(format!(
                        "set security address-book global address-set {} address {}",
                        set_name,
                        text(member, "name")
                    ));
                }
            }
        }
        statements.push(format!(
            "delete security zones security-zone {} address-book",
            text(zone, "name")
        ));
    }
    Ok(statements)
}

/// Major and minor numbers of a Junos release string.
fn release(version: &str) -> Option<(u32, u32)> {
    let captures = RELEASE_PATTERN.captures(version)?;
    Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
}

// ============================================================================
// Route-based IPsec VPN
// ============================================================================

/// Diffie-Hellman group for IKE and perfect forward secrecy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhGroup {
    Group1,
    Group2,
    Group5,
    Group14,
    Group19,
    Group20,
    Group24,
}

impl DhGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            DhGroup::Group1 => "group1",
            DhGroup::Group2 => "group2",
            DhGroup::Group5 => "group5",
            DhGroup::Group14 => "group14",
            DhGroup::Group19 => "group19",
            DhGroup::Group20 => "group20",
            DhGroup::Group24 => "group24",
        }
    }
}

impl TryFrom<u8> for DhGroup {
    type Error = Error;

    fn try_from(group: u8) -> Result<Self> {
        match group {
            1 => Ok(DhGroup::Group1),
            2 => Ok(DhGroup::Group2),
            5 => Ok(DhGroup::Group5),
            14 => Ok(DhGroup::Group14),
            19 => Ok(DhGroup::Group19),
            20 => Ok(DhGroup::Group20),
            24 => Ok(DhGroup::Group24),
            other => Err(Error::InvalidArgument(format!(
                "Diffie-Hellman group must be 1, 2, 5, 14, 19, 20 or 24, got {}",
                other
            ))),
        }
    }
}

/// Encryption algorithm for both phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    Des,
    TripleDes,
    Aes128,
    Aes192,
    Aes256,
}

impl Encryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encryption::Des => "des-cbc",
            Encryption::TripleDes => "3des-cbc",
            Encryption::Aes128 => "aes-128-cbc",
            Encryption::Aes192 => "aes-192-cbc",
            Encryption::Aes256 => "aes-256-cbc",
        }
    }
}

/// Hash used for authentication. Phase 2 uses the HMAC form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authentication {
    Md5,
    Sha1,
}

impl Authentication {
    fn ike(&self) -> &'static str {
        match self {
            Authentication::Md5 => "md5",
            Authentication::Sha1 => "sha1",
        }
    }

    fn ipsec(&self) -> &'static str {
        match self {
            Authentication::Md5 => "hmac-md5-96",
            Authentication::Sha1 => "hmac-sha1-96",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkeMode {
    Main,
    Aggressive,
}

impl IkeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IkeMode::Main => "main",
            IkeMode::Aggressive => "aggressive",
        }
    }
}

/// When the tunnel comes up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Establish {
    OnTraffic,
    Immediately,
}

impl Establish {
    pub fn as_str(&self) -> &'static str {
        match self {
            Establish::OnTraffic => "on-traffic",
            Establish::Immediately => "immediately",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpsecProtocol {
    Ah,
    Esp,
}

impl IpsecProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            IpsecProtocol::Ah => "ah",
            IpsecProtocol::Esp => "esp",
        }
    }
}

/// IKE (phase 1) proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase1 {
    pub name: String,
    pub dh_group: DhGroup,
    pub authentication: Authentication,
    pub encryption: Encryption,
    pub lifetime_seconds: u32,
}

/// IPsec (phase 2) proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase2 {
    pub name: String,
    pub protocol: IpsecProtocol,
    pub authentication: Authentication,
    pub encryption: Encryption,
    pub lifetime_seconds: u32,
}

/// The two ends of a site-to-site VPN and how to bring it up.
#[derive(Clone, PartialEq, Eq)]
pub struct VpnPeer {
    /// Name shared by the gateway, IKE policy, IPsec policy and VPN
    pub name: String,
    /// Public address of this SRX
    pub local_address: String,
    /// Address of the remote device
    pub peer_address: String,
    /// Interface `local_address` lives on
    pub external_interface: String,
    /// Security zone the new `st0` unit joins
    pub zone: String,
    pub mode: IkeMode,
    pub pre_shared_key: String,
    /// Perfect forward secrecy group, `None` to disable
    pub pfs: Option<DhGroup>,
    pub establish: Establish,
}

impl fmt::Debug for VpnPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VpnPeer")
            .field("name", &self.name)
            .field("local_address", &self.local_address)
            .field("peer_address", &self.peer_address)
            .field("external_interface", &self.external_interface)
            .field("zone", &self.zone)
            .field("mode", &self.mode)
            .field("pfs", &self.pfs)
            .field("establish", &self.establish)
            .finish_non_exhaustive()
    }
}

/// Route-based site-to-site VPN bound to one `st0` unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpsecVpn {
    peer: VpnPeer,
    tunnel_interface: String,
    phase1: Vec<Phase1>,
    phase2: Vec<Phase2>,
    traffic_selectors: Vec<(String, String)>,
}

impl IpsecVpn {
    /// VPN bound to `tunnel_interface`, e.g. `st0.3`.
    pub fn new(peer: VpnPeer, tunnel_interface: impl Into<String>) -> Self {
        Self {
            peer,
            tunnel_interface: tunnel_interface.into(),
            phase1: Vec::new(),
            phase2: Vec::new(),
            traffic_selectors: Vec::new(),
        }
    }

    pub fn tunnel_interface(&self) -> &str {
        &self.tunnel_interface
    }

    pub fn phase1(&mut self, proposal: Phase1) -> &mut Self {
        self.phase1.push(proposal);
        self
    }

    pub fn phase2(&mut self, proposal: Phase2) -> &mut Self {
        self.phase2.push(proposal);
        self
    }

    /// One traffic selector per local and remote prefix pair, replacing any
    /// set before.
    pub fn traffic_selectors(&mut self, local: &[&str], remote: &[&str]) -> &mut Self {
        self.traffic_selectors = local
            .iter()
            .flat_map(|l| remote.iter().map(move |r| (l.to_string(), r.to_string())))
            .collect();
        self
    }

    pub fn build(&self) -> Result<Vec<String>> {
        let name = &self.peer.name;
        if self.phase1.is_empty() || self.phase2.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "VPN {} needs at least one phase 1 and one phase 2 proposal",
                name
            )));
        }
        if self.peer.pre_shared_key.contains('"') {
            return Err(Error::InvalidArgument(
                "pre-shared key must not contain double quotes".to_string(),
            ));
        }

        let st0 = &self.tunnel_interface;
        let mut config = vec![
            format!("set interfaces {} family inet", st0),
            format!(
                "set security zones security-zone {} interfaces {}",
                self.peer.zone, st0
            ),
        ];

        for p1 in &self.phase1 {
            let prefix = format!("set security ike proposal {}", p1.name);
            config.push(format!("{} authentication-method pre-shared-keys", prefix));
            config.push(format!("{} dh-group {}", prefix, p1.dh_group.as_str()));
            config.push(format!(
                "{} authentication-algorithm {}",
                prefix,
                p1.authentication.ike()
            ));
            config.push(format!(
                "{} encryption-algorithm {}",
                prefix,
                p1.encryption.as_str()
            ));
            config.push(format!("{} lifetime-seconds {}", prefix, p1.lifetime_seconds));
        }

        config.push(format!(
            "set security ike policy {} mode {}",
            name,
            self.peer.mode.as_str()
        ));
        config.push(format!(
            "set security ike policy {} pre-shared-key ascii-text \"{}\"",
            name, self.peer.pre_shared_key
        ));
        for p1 in &self.phase1 {
            config.push(format!("set security ike policy {} proposals {}", name, p1.name));
        }

        let gateway = format!("set security ike gateway {}", name);
        config.push(format!("{} address {}", gateway, self.peer.peer_address));
        config.push(format!(
            "{} external-interface {}",
            gateway, self.peer.external_interface
        ));
        config.push(format!("{} ike-policy {}", gateway, name));
        config.push(format!("{} local-address {}", gateway, self.peer.local_address));

        for p2 in &self.phase2 {
            let prefix = format!("set security ipsec proposal {}", p2.name);
            config.push(format!("{} protocol {}", prefix, p2.protocol.as_str()));
            config.push(format!(
                "{} authentication-algorithm {}",
                prefix,
                p2.authentication.ipsec()
            ));
            config.push(format!(
                "{} encryption-algorithm {}",
                prefix,
                p2.encryption.as_str()
            ));
            config.push(format!("{} lifetime-seconds {}", prefix, p2.lifetime_seconds));
        }
        for p2 in &self.phase2 {
            config.push(format!("set security ipsec policy {} proposals {}", name, p2.name));
        }
        if let Some(group) = self.peer.pfs {
            config.push(format!(
                "set security ipsec policy {} perfect-forward-secrecy keys {}",
                name,
                group.as_str()
            ));
        }

        let vpn = format!("set security ipsec vpn {}", name);
        config.push(format!("{} bind-interface {}", vpn, st0));
        config.push(format!("{} ike gateway {}", vpn, name));
        config.push(format!("{} ike idle-time 60", vpn));
        config.push(format!("{} ike ipsec-policy {}", vpn, name));
        config.push(format!(
            "{} establish-tunnels {}",
            vpn,
            self.peer.establish.as_str()
        ));
        for (i, (local, remote)) in self.traffic_selectors.iter().enumerate() {
            config.push(format!(
                "{} traffic-selector ts{} local-ip {} remote-ip {}",
                vpn,
                i + 1,
                local,
                remote
            ));
        }
        Ok(config)
    }
}

/// Next free `st0` unit after the ones listed in `show interfaces st0` XML.
pub fn next_tunnel_interface(interfaces: &str) -> Result<String> {
    let wrapped = wrap_fragment(interfaces);
    let doc = Document::parse(&wrapped)?;
    let next = all(
        doc.root_element(),
        "interface-information>physical-interface>logical-interface",
    )
    .into_iter()
    .filter_map(|unit| {
        text(unit, "name")
            .strip_prefix("st0.")
            .and_then(|u| u.parse::<u32>().ok())
    })
    .max()
    .map_or(0, |highest| highest + 1);
    Ok(format!("st0.{}", next))
}

// ============================================================================
// Session helpers
// ============================================================================

/// Configuration section as XML, or `None` when it is not configured.
async fn section_xml(session: &Session, section: &str) -> Result<Option<String>> {
    match session.get_config(Some(section), ConfigFormat::Xml).await {
        Ok(xml) => Ok(Some(xml)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

impl Session {
    /// Empty security policy that knows this firewall's global address book
    /// and applications, including the predefined `junos-*` ones.
    pub async fn new_policy(&self) -> Result<FirewallPolicy> {
        let addresses = match section_xml(self, "security>address-book").await? {
            Some(xml) => names(
                &xml,
                &[
                    "configuration>security>address-book>address",
                    "configuration>security>address-book>address-set",
                ],
            )?,
            None => Vec::new(),
        };
        let applications = match section_xml(self, "applications").await? {
            Some(xml) => names(
                &xml,
                &[
                    "configuration>applications>application",
                    "configuration>applications>application-set",
                ],
            )?,
            None => Vec::new(),
        };
        debug!(
            host = %self.hostname(),
            addresses = addresses.len(),
            applications = applications.len(),
            "Loaded policy objects"
        );
        Ok(FirewallPolicy::with_inventory(addresses, applications))
    }

    /// Statements that migrate zone address books to the global address book.
    ///
    /// Every routing engine must be an SRX (vSRX/Firefly is accepted) on
    /// release 11.2 or later.
    pub async fn convert_address_book(&self) -> Result<Vec<String>> {
        for re in self.routing_engines() {
            if re.model.contains("FIREFLY") {
                continue;
            }
            if !re.model.contains("SRX") {
                return Err(Error::UnsupportedOnPlatform {
                    view: "security address-book".to_string(),
                    model: re.model.clone(),
                });
            }
            let too_old = release(&re.version).map_or(true, |r| r < GLOBAL_ADDRESS_BOOK_RELEASE);
            if too_old {
                return Err(Error::UnsupportedRelease {
                    feature: "global address book".to_string(),
                    version: re.version.clone(),
                    minimum: format!(
                        "{}.{}",
                        GLOBAL_ADDRESS_BOOK_RELEASE.0, GLOBAL_ADDRESS_BOOK_RELEASE.1
                    ),
                });
            }
        }

        match section_xml(self, "security>zones").await? {
            Some(zones) => convert_zone_address_books(&zones),
            None => Ok(Vec::new()),
        }
    }

    /// VPN template bound to the next free `st0` unit.
    pub async fn new_ipsec_vpn(&self, peer: VpnPeer) -> Result<IpsecVpn> {
        let tunnel_interface = match self.command("show interfaces st0", CommandFormat::Xml).await {
            Ok(CommandOutput::Xml(xml)) => next_tunnel_interface(&xml)?,
            Ok(_) => "st0.0".to_string(),
            // No st0 units exist yet
            Err(Error::DeviceRpc { errors })
                if errors.iter().all(|e| e.message.contains("not found")) =>
            {
                "st0.0".to_string()
            }
            Err(e) => return Err(e),
        };
        debug!(host = %self.hostname(), vpn = %peer.name, st0 = %tunnel_interface, "New IPsec VPN");
        Ok(IpsecVpn::new(peer, tunnel_interface))
    }
}
