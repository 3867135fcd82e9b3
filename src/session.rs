//! Device session and configuration lifecycle.
//!
//! A [`Session`] owns one transport to one device. Establishing it runs a
//! single `get-software-information` RPC so that hostname and routing engine
//! facts are known before the caller gets the session back; a device that
//! reports no routing engine never yields a session.
//!
//! The recommended sequence for changes is lock, load, check, commit, unlock.
//! Nothing here enforces that order. Each call is an independent request and
//! reply, and the candidate configuration is shared with every other operator
//! on the device.

use crate::diff::ConfigDiff;
use crate::error::{Error, ErrorList, Result, RpcError};
use crate::facts::{Facts, RoutingEngine};
use crate::rpc::{
    parse_section_path, CommandFormat, ConfigFormat, ConfigPayload, RescueAction, Rpc,
    RollbackTarget, MAX_ROLLBACK,
};
use crate::transport::{RpcReply, Transport};
use crate::views::{
    self, ArpTable, BgpTable, EthernetSwitchingTable, FirewallPolicy, HardwareInventory, Interfaces,
    LldpNeighbors, PlatformTable, RoutingTable, SourceNats, StaticNats, SystemStorage, Topology,
    View, ViewData, ViewRequest, VirtualChassis, Vlans,
};
use crate::xml::{find, text};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Replies shorter than this are read as "nothing configured there".
const MIN_PAYLOAD_LEN: usize = 50;

/// Device messages that mean a rollback slot or rescue configuration is missing.
const MISSING_MARKERS: [&str; 5] = [
    "does not exist",
    "doesn't exist",
    "not found",
    "is not set",
    "no rescue",
];

/// Device messages that mean there was no lock to release.
const NOT_LOCKED_MARKERS: [&str; 2] = ["not locked", "not open"];

// ============================================================================
// Results
// ============================================================================

/// Result of an operational command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", content = "output", rename_all = "lowercase")]
pub enum CommandOutput {
    /// Plain CLI text, unwrapped from the reply envelope
    Text(String),
    /// The reply body as XML
    Xml(String),
    /// The device answered with an empty body
    NoOutput,
}

impl CommandOutput {
    pub fn is_empty(&self) -> bool {
        matches!(self, CommandOutput::NoOutput)
    }

    /// Output text, `None` when the device returned nothing.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CommandOutput::Text(s) | CommandOutput::Xml(s) => Some(s),
            CommandOutput::NoOutput => None,
        }
    }
}

/// One entry of the device's commit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitEntry {
    /// Rollback slot this commit now occupies
    pub sequence: u32,
    pub user: String,
    /// How the commit was made (`cli`, `netconf`, `junoscript`, ...)
    pub client: String,
    /// Date and time as printed by the device
    pub date_time: String,
    /// Parsed from the `seconds` attribute when the device supplies it
    pub timestamp: Option<DateTime<Utc>>,
    /// Commit log message
    pub log: Option<String>,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Session`].
pub struct SessionBuilder {
    transport: Box<dyn Transport>,
    commit_timeout: Option<Duration>,
    platform_table: PlatformTable,
}

impl SessionBuilder {
    /// Pause this long after every successful lock, commit and unlock.
    pub fn commit_timeout(mut self, timeout: Duration) -> Self {
        self.commit_timeout = Some(timeout);
        self
    }

    /// Replace the default view/platform support table.
    pub fn platform_table(mut self, table: PlatformTable) -> Self {
        self.platform_table = table;
        self
    }

    /// Gather facts and hand back the session.
    ///
    /// On failure the transport is closed before the error is returned.
    pub async fn build(self) -> Result<Session> {
        let facts = match fetch_facts(self.transport.as_ref()).await {
            Ok(facts) => facts,
            Err(e) => {
                if let Err(close_err) = self.transport.close().await {
                    debug!(
                        transport = %self.transport.identifier(),
                        error = %close_err,
                        "Failed to close transport after establishment error"
                    );
                }
                return Err(e);
            }
        };

        debug!(
            host = %facts.hostname,
            model = %facts.model(),
            routing_engines = facts.re_count(),
            "Session established"
        );

        Ok(Session {
            transport: self.transport,
            facts,
            commit_timeout: self.commit_timeout.filter(|d| !d.is_zero()),
            platform_table: self.platform_table,
        })
    }
}

async fn fetch_facts(transport: &dyn Transport) -> Result<Facts> {
    let rpc = Rpc::GetSoftwareInformation;
    let reply = transport.execute(&rpc.render()?).await?;
    if let Some(errors) = failures(&reply) {
        return Err(Error::DeviceRpc { errors });
    }
    Facts::parse(&reply)
}

// ============================================================================
// Session
// ============================================================================

/// One established session to one device.
pub struct Session {
    transport: Box<dyn Transport>,
    facts: Facts,
    commit_timeout: Option<Duration>,
    platform_table: PlatformTable,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.identifier())
            .field("facts", &self.facts)
            .field("commit_timeout", &self.commit_timeout)
            .finish()
    }
}

macro_rules! typed_views {
    ($($(#[$doc:meta])* $method:ident => $view:ident($ty:ty);)*) => {
        $(
            $(#[$doc])*
            pub async fn $method(&self) -> Result<$ty> {
                match self.view(View::$view, None).await? {
                    ViewData::$view(data) => Ok(data),
                    _ => Err(mismatched_view(View::$view)),
                }
            }
        )*
    };
}

impl Session {
    /// Start building a session over an already connected transport.
    pub fn builder<T: Transport + 'static>(transport: T) -> SessionBuilder {
        SessionBuilder {
            transport: Box::new(transport),
            commit_timeout: None,
            platform_table: PlatformTable::default(),
        }
    }

    /// Establish a session with default settings.
    pub async fn new<T: Transport + 'static>(transport: T) -> Result<Self> {
        Self::builder(transport).build().await
    }

    /// Connect over NETCONF/SSH with default options.
    #[cfg(feature = "russh")]
    pub async fn connect(
        host: &str,
        credentials: &crate::transport::ssh::Credentials,
    ) -> Result<Self> {
        let transport = crate::transport::ssh::SshTransport::connect(host, credentials).await?;
        Self::new(transport).await
    }

    /// Connect using a loaded device configuration.
    #[cfg(feature = "russh")]
    pub async fn from_config(config: &crate::config::DeviceConfig) -> Result<Self> {
        let credentials = config.credentials()?;
        let transport = crate::transport::ssh::SshTransport::connect_with(
            &config.host,
            &credentials,
            &config.ssh_options(),
        )
        .await?;
        let mut builder = Self::builder(transport);
        if let Some(timeout) = config.commit_timeout {
            builder = builder.commit_timeout(timeout);
        }
        builder.build().await
    }

    // ------------------------------------------------------------------------
    // Facts
    // ------------------------------------------------------------------------

    pub fn hostname(&self) -> &str {
        &self.facts.hostname
    }

    pub fn routing_engines(&self) -> &[RoutingEngine] {
        &self.facts.routing_engines
    }

    pub fn re_count(&self) -> usize {
        self.facts.re_count()
    }

    pub fn facts(&self) -> &Facts {
        &self.facts
    }

    pub fn commit_timeout(&self) -> Option<Duration> {
        self.commit_timeout
    }

    // ------------------------------------------------------------------------
    // Configuration lifecycle
    // ------------------------------------------------------------------------

    /// Take the candidate configuration lock.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn lock(&self) -> Result<()> {
        let reply = self.call(&Rpc::Lock).await?;
        if let Some(errors) = failures(&reply) {
            return Err(Error::LockConflict { errors });
        }
        self.pace(&Rpc::Lock).await;
        Ok(())
    }

    /// Release the candidate configuration lock.
    ///
    /// Releasing a lock that is not held counts as success.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn unlock(&self) -> Result<()> {
        let reply = self.call(&Rpc::Unlock).await?;
        if let Some(errors) = failures(&reply) {
            if !errors.iter().all(|e| mentions(e, &NOT_LOCKED_MARKERS)) {
                return Err(Error::DeviceRpc { errors });
            }
            debug!(host = %self.hostname(), "Configuration was not locked");
        }
        self.pace(&Rpc::Unlock).await;
        Ok(())
    }

    /// Stage a payload into the candidate configuration.
    ///
    /// With `commit` set, a commit follows immediately and its failure is this
    /// call's failure. The loaded change stays staged in that case.
    #[instrument(level = "debug", skip(self, payload), fields(host = %self.hostname()))]
    pub async fn load_configuration(
        &self,
        payload: ConfigPayload,
        format: ConfigFormat,
        commit: bool,
    ) -> Result<()> {
        let rpc = Rpc::LoadConfiguration {
            format,
            source: payload.resolve().await?,
        };
        let reply = self.call(&rpc).await?;
        if let Some(errors) = failures(&reply) {
            return Err(load_error(errors));
        }

        if commit {
            self.commit().await?;
        }
        Ok(())
    }

    /// Validate the candidate configuration without activating it.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit_check(&self) -> Result<()> {
        let reply = self.call(&Rpc::CommitCheck).await?;
        match failures(&reply) {
            Some(errors) => Err(Error::Validation { errors }),
            None => Ok(()),
        }
    }

    /// Activate the candidate configuration.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit(&self) -> Result<()> {
        self.run_commit(Rpc::Commit).await
    }

    /// Commit with a log message recorded in the commit history.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit_with_log(&self, message: &str) -> Result<()> {
        self.run_commit(Rpc::CommitLog {
            log: message.to_string(),
        })
        .await
    }

    /// Schedule a commit at a device-local `HH:MM:SS`.
    ///
    /// Returns once the device accepts the schedule.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit_at(&self, time: &str, log: Option<&str>) -> Result<()> {
        self.run_commit(Rpc::CommitAt {
            time: time.to_string(),
            log: log.map(str::to_string),
        })
        .await
    }

    /// Commit now, rolled back by the device unless confirmed within `minutes`.
    ///
    /// Confirm with a plain [`Session::commit`] before the window closes.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit_confirmed(&self, minutes: u32) -> Result<()> {
        self.run_commit(Rpc::CommitConfirmed { minutes }).await
    }

    /// Commit with every subsystem re-reading the full configuration.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit_full(&self) -> Result<()> {
        self.run_commit(Rpc::CommitFull).await
    }

    async fn run_commit(&self, rpc: Rpc) -> Result<()> {
        let reply = self.call(&rpc).await?;
        if let Some(errors) = failures(&reply) {
            return Err(Error::Commit { errors });
        }
        self.pace(&rpc).await;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Rollback history
    // ------------------------------------------------------------------------

    /// Candidate configuration compared against rollback `slot`.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn diff(&self, slot: u8) -> Result<String> {
        check_slot(slot)?;
        let reply = self.call(&Rpc::GetConfigurationCompare { rollback: slot }).await?;
        configuration_output(&reply, &format!("rollback {}", slot))
    }

    pub async fn diff_parsed(&self, slot: u8) -> Result<ConfigDiff> {
        self.diff(slot).await.map(|text| ConfigDiff::parse(&text))
    }

    /// Active configuration compared against rollback `slot`.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn config_diff(&self, slot: u8) -> Result<String> {
        check_slot(slot)?;
        let rpc = Rpc::GetRollbackInformation {
            rollback: 0,
            compare: Some(slot),
        };
        let reply = self.call(&rpc).await?;
        configuration_output(&reply, &format!("rollback {}", slot))
    }

    pub async fn config_diff_parsed(&self, slot: u8) -> Result<ConfigDiff> {
        self.config_diff(slot).await.map(|text| ConfigDiff::parse(&text))
    }

    /// Load a historical or rescue configuration and commit it.
    ///
    /// If the commit fails the rolled back content stays in the candidate.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn rollback(&self, target: RollbackTarget) -> Result<()> {
        let rpc = match target {
            RollbackTarget::Numbered(slot) => Rpc::LoadRollback(slot),
            RollbackTarget::Rescue => Rpc::LoadRescue,
        };
        let reply = self.call(&rpc).await?;
        if let Some(errors) = failures(&reply) {
            if errors.iter().any(|e| mentions(e, &MISSING_MARKERS)) {
                return Err(Error::not_found(
                    target.to_string(),
                    ErrorList(&errors).to_string(),
                ));
            }
            return Err(load_error(errors));
        }

        self.commit().await
    }

    /// Save or delete the rescue configuration.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn rescue(&self, action: RescueAction) -> Result<()> {
        let rpc = match action {
            RescueAction::Save => Rpc::SaveRescue,
            RescueAction::Delete => Rpc::DeleteRescue,
        };
        let reply = self.call(&rpc).await?;
        match failures(&reply) {
            Some(errors) => Err(Error::DeviceRpc { errors }),
            None => Ok(()),
        }
    }

    /// Text of the saved rescue configuration.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn rescue_config(&self) -> Result<String> {
        let reply = self.call(&Rpc::GetRescueInformation).await?;
        configuration_output(&reply, "rescue")
    }

    /// Commit history, most recent first.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn commit_history(&self) -> Result<Vec<CommitEntry>> {
        let reply = self.call(&Rpc::GetCommitInformation).await?;
        if let Some(errors) = failures(&reply) {
            return Err(Error::DeviceRpc { errors });
        }

        let doc = reply.document()?;
        let entries = doc
            .root_element()
            .descendants()
            .filter(|n| n.has_tag_name("commit-history"))
            .filter_map(|entry| {
                let Ok(sequence) = text(entry, "sequence-number").parse() else {
                    warn!(
                        host = %self.hostname(),
                        sequence = %text(entry, "sequence-number"),
                        "Skipping commit history entry without a sequence number"
                    );
                    return None;
                };
                let timestamp = find(entry, "date-time")
                    .and_then(|dt| {
                        dt.attributes()
                            .find(|a| a.name() == "seconds")
                            .and_then(|a| a.value().parse::<i64>().ok())
                    })
                    .and_then(|secs| DateTime::from_timestamp(secs, 0));
                let log = Some(text(entry, "log"))
                    .filter(|l| !l.is_empty())
                    .or_else(|| Some(text(entry, "comment")).filter(|c| !c.is_empty()));
                Some(CommitEntry {
                    sequence,
                    user: text(entry, "user"),
                    client: text(entry, "client"),
                    date_time: text(entry, "date-time"),
                    timestamp,
                    log,
                })
            })
            .collect();
        Ok(entries)
    }

    /// Active configuration, optionally limited to a `>`-separated section.
    ///
    /// Text and set formats return the configuration text; XML returns the
    /// reply body.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn get_config(&self, section: Option<&str>, format: ConfigFormat) -> Result<String> {
        let rpc = Rpc::GetConfiguration {
            section: section.map(parse_section_path).unwrap_or_default(),
            format,
        };
        let reply = self.call(&rpc).await?;
        if let Some(errors) = failures(&reply) {
            return Err(Error::DeviceRpc { errors });
        }

        let what = section.unwrap_or("configuration");
        if reply.data.len() < MIN_PAYLOAD_LEN {
            return Err(Error::not_found(what, "section is not configured"));
        }

        let element = match format {
            ConfigFormat::Text => "configuration-text",
            ConfigFormat::Set => "configuration-set",
            ConfigFormat::Xml => return Ok(reply.data),
        };
        let doc = reply.document()?;
        match find(doc.root_element(), element) {
            Some(node) => Ok(node.text().unwrap_or_default().trim().to_string()),
            None => Err(Error::UnexpectedReply(format!(
                "configuration reply has no <{}>",
                element
            ))),
        }
    }

    // ------------------------------------------------------------------------
    // Operational
    // ------------------------------------------------------------------------

    /// Run an operational-mode command.
    ///
    /// An empty reply body is [`CommandOutput::NoOutput`], not an error.
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn command(&self, command: &str, format: CommandFormat) -> Result<CommandOutput> {
        let rpc = Rpc::Command {
            command: command.to_string(),
            format,
        };
        let reply = self.call(&rpc).await?;
        if let Some(errors) = failures(&reply) {
            return Err(Error::DeviceRpc { errors });
        }
        if reply.data.is_empty() {
            return Ok(CommandOutput::NoOutput);
        }

        match format {
            CommandFormat::Xml => Ok(CommandOutput::Xml(reply.data)),
            CommandFormat::Text => {
                let doc = reply.document()?;
                let output = doc
                    .root_element()
                    .descendants()
                    .filter(|n| n.has_tag_name("output") || n.has_tag_name("configuration-output"))
                    .filter_map(|n| n.text())
                    .map(|t| t.trim_matches(|c| c == '\n' || c == '\r'))
                    .filter(|t| !t.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if output.is_empty() {
                    Ok(CommandOutput::NoOutput)
                } else {
                    Ok(CommandOutput::Text(output))
                }
            }
        }
    }

    /// Fetch and decode a view.
    ///
    /// Views the platform table denies for this device's model fail before any
    /// RPC is sent. `interface` is only accepted by [`View::Interface`].
    #[instrument(level = "debug", skip(self), fields(host = %self.hostname()))]
    pub async fn view(&self, view: View, interface: Option<&str>) -> Result<ViewData> {
        self.platform_table.check(view, self.facts.model())?;
        let request = match (view, interface) {
            (View::Interface, Some(name)) => ViewRequest::interface(name),
            (_, Some(_)) => {
                return Err(Error::InvalidArgument(format!(
                    "the {} view does not take an interface name",
                    view
                )))
            }
            (_, None) => ViewRequest::new(view),
        };

        let reply = self.call(&Rpc::View(request)).await?;
        if let Some(errors) = failures(&reply) {
            return Err(Error::DeviceRpc { errors });
        }
        views::decode(view, &reply)
    }

    /// Interfaces, optionally a single named one.
    pub async fn view_interface(&self, name: Option<&str>) -> Result<Interfaces> {
        match self.view(View::Interface, name).await? {
            ViewData::Interface(data) => Ok(data),
            _ => Err(mismatched_view(View::Interface)),
        }
    }

    typed_views! {
        view_arp => Arp(ArpTable);
        view_route => Route(RoutingTable);
        view_vlan => Vlan(Vlans);
        view_lldp => Lldp(LldpNeighbors);
        view_ethernet_switching => EthernetSwitching(EthernetSwitchingTable);
        /// Hardware inventory, per node on clusters.
        view_inventory => Inventory(Topology<HardwareInventory>);
        view_virtual_chassis => VirtualChassis(VirtualChassis);
        view_bgp => Bgp(BgpTable);
        /// Static NAT rules, per node on clusters.
        view_static_nat => StaticNat(Topology<StaticNats>);
        /// Source NAT rule sets, per node on clusters.
        view_source_nat => SourceNat(Topology<SourceNats>);
        /// File system usage, per node on clusters.
        view_storage => Storage(Topology<SystemStorage>);
        /// Security policies, per node on clusters.
        view_firewall_policy => FirewallPolicy(Topology<FirewallPolicy>);
    }

    /// Close the session and its transport.
    pub async fn close(self) -> Result<()> {
        debug!(host = %self.hostname(), "Closing session");
        self.transport.close().await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    async fn call(&self, rpc: &Rpc) -> Result<RpcReply> {
        let operation = rpc.render()?;
        trace!(host = %self.hostname(), rpc = rpc.name(), "Executing RPC");
        let reply = self.transport.execute(&operation).await?;
        for warning in reply.warnings() {
            debug!(host = %self.hostname(), rpc = rpc.name(), warning = %warning, "Device warning");
        }
        Ok(reply)
    }

    async fn pace(&self, after: &Rpc) {
        if let Some(delay) = self.commit_timeout {
            debug!(host = %self.hostname(), rpc = after.name(), delay = ?delay, "Pacing after operation");
            tokio::time::sleep(delay).await;
        }
    }
}

fn failures(reply: &RpcReply) -> Option<Vec<RpcError>> {
    let errors = reply.failures();
    (!errors.is_empty()).then_some(errors)
}

fn mentions(error: &RpcError, markers: &[&str]) -> bool {
    let message = error.message.to_lowercase();
    markers.iter().any(|m| message.contains(m))
}

fn load_error(errors: Vec<RpcError>) -> Error {
    Error::Load {
        message: ErrorList(&errors).to_string(),
        errors,
    }
}

fn check_slot(slot: u8) -> Result<()> {
    if slot > MAX_ROLLBACK {
        return Err(Error::InvalidArgument(format!(
            "Rollback slot must be 0-{}, got {}",
            MAX_ROLLBACK, slot
        )));
    }
    Ok(())
}

fn mismatched_view(view: View) -> Error {
    Error::UnexpectedReply(format!("{} view decoded into another view's data", view))
}

/// Pull `configuration-output` text out of a rollback, compare or rescue reply.
fn configuration_output(reply: &RpcReply, what: &str) -> Result<String> {
    if let Some(errors) = failures(reply) {
        if errors.iter().any(|e| mentions(e, &MISSING_MARKERS)) {
            return Err(Error::not_found(what, ErrorList(&errors).to_string()));
        }
        return Err(Error::DeviceRpc { errors });
    }
    if reply.data.len() < MIN_PAYLOAD_LEN {
        return Err(Error::not_found(what, "device returned no configuration"));
    }

    let doc = reply.document()?;
    find(doc.root_element(), "configuration-output")
        .map(|n| n.text().unwrap_or_default().trim_matches('\n').to_string())
        .ok_or_else(|| Error::not_found(what, "reply carries no configuration output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportError, TransportResult};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    const SOFTWARE: &str = r#"<rpc-reply><software-information><host-name>fw1</host-name>
<product-model>srx240h2</product-model>
<package-information><name>junos</name><comment>JUNOS Software Release [12.1X47-D10.4]</comment></package-information>
</software-information></rpc-reply>"#;

    /// Replays canned replies and records every operation sent.
    #[derive(Clone, Default)]
    struct Scripted {
        replies: Arc<Mutex<VecDeque<String>>>,
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            let scripted = Self::default();
            scripted
                .replies
                .lock()
                .unwrap()
                .extend(replies.iter().map(|r| r.to_string()));
            scripted
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        fn identifier(&self) -> &str {
            "scripted"
        }

        async fn execute(&self, operation: &str) -> TransportResult<RpcReply> {
            self.sent.lock().unwrap().push(operation.to_string());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(TransportError::Closed)?;
            RpcReply::parse(&reply)
        }

        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    async fn session(replies: &[&str]) -> (Session, Scripted) {
        let mut all = vec![SOFTWARE];
        all.extend_from_slice(replies);
        let transport = Scripted::new(&all);
        let session = Session::new(transport.clone()).await.unwrap();
        (session, transport)
    }

    fn error_reply(message: &str) -> String {
        format!(
            "<rpc-reply><rpc-error><error-type>protocol</error-type><error-tag>operation-failed</error-tag>\
<error-severity>error</error-severity><error-message>{}</error-message></rpc-error></rpc-reply>",
            message
        )
    }

    #[tokio::test]
    async fn test_establishment_gathers_facts() {
        let (session, transport) = session(&[]).await;
        assert_eq!(session.hostname(), "fw1");
        assert_eq!(session.re_count(), 1);
        assert_eq!(session.routing_engines()[0].model, "SRX240H2");
        assert_eq!(transport.sent(), vec!["<get-software-information/>"]);
    }

    #[tokio::test]
    async fn test_establishment_fails_without_routing_engines() {
        let transport = Scripted::new(&["<rpc-reply><ok/></rpc-reply>"]);
        let err = Session::new(transport).await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedReply(_)));
    }

    #[tokio::test]
    async fn test_lock_conflict() {
        let reply = error_reply("configuration database locked by:\n  admin");
        let (session, _) = session(&[&reply]).await;
        let err = session.lock().await.unwrap_err();
        assert!(matches!(err, Error::LockConflict { .. }));
        assert_eq!(err.rpc_errors().len(), 1);
    }

    #[tokio::test]
    async fn test_unlock_when_not_locked_is_success() {
        let reply = error_reply("Configuration database is not locked");
        let (session, _) = session(&[&reply]).await;
        session.unlock().await.unwrap();
    }

    #[tokio::test]
    async fn test_unlock_other_error_is_returned() {
        let reply = error_reply("permission denied");
        let (session, _) = session(&[&reply]).await;
        assert!(matches!(
            session.unlock().await,
            Err(Error::DeviceRpc { .. })
        ));
    }

    #[tokio::test]
    async fn test_warnings_do_not_fail() {
        let reply = "<rpc-reply><rpc-error><error-severity>warning</error-severity>\
<error-message>statement not found</error-message></rpc-error><ok/></rpc-reply>";
        let (session, _) = session(&[reply]).await;
        session.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_check_collects_every_error() {
        let reply = "<rpc-reply><commit-results>\
<rpc-error><error-severity>error</error-severity><error-path>[edit security]</error-path><error-message>first</error-message></rpc-error>\
<rpc-error><error-severity>error</error-severity><error-message>second</error-message></rpc-error>\
</commit-results></rpc-reply>";
        let (session, _) = session(&[reply]).await;
        let err = session.commit_check().await.unwrap_err();
        let Error::Validation { errors } = &err else {
            panic!("expected validation error, got {:?}", err);
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path.as_deref(), Some("[edit security]"));
        assert!(err.to_string().contains("(and 1 more)"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_send_nothing() {
        let (session, transport) = session(&[]).await;
        assert!(matches!(
            session.commit_at("25:00:00", None).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            session.commit_confirmed(0).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(session.diff(50).await, Err(Error::InvalidArgument(_))));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_view_sends_nothing() {
        let (session, transport) = session(&[]).await;
        let err = session.view_ethernet_switching().await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedOnPlatform { .. }));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_platform_table() {
        let transport = Scripted::new(&[
            SOFTWARE,
            "<rpc-reply><ethernet-switching-table-information></ethernet-switching-table-information></rpc-reply>",
        ]);
        let session = Session::builder(transport)
            .platform_table(PlatformTable::permissive())
            .build()
            .await
            .unwrap();
        let table = session.view_ethernet_switching().await.unwrap();
        assert!(table.entries.is_empty());
    }

    #[tokio::test]
    async fn test_interface_name_only_for_interface_view() {
        let (session, transport) = session(&[]).await;
        assert!(matches!(
            session.view(View::Arp, Some("ge-0/0/0")).await,
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_command_text_unwraps_output() {
        let reply = "<rpc-reply><output>\nHostname: fw1\nModel: srx240h2\n</output></rpc-reply>";
        let (session, transport) = session(&[reply]).await;
        let output = session.command("show version", CommandFormat::Text).await.unwrap();
        assert_eq!(output, CommandOutput::Text("Hostname: fw1\nModel: srx240h2".to_string()));
        assert_eq!(
            transport.sent()[1],
            r#"<command format="text">show version</command>"#
        );
    }

    #[tokio::test]
    async fn test_command_empty_body_is_no_output() {
        let (session, _) = session(&["<rpc-reply></rpc-reply>"]).await;
        let output = session.command("show version", CommandFormat::Text).await.unwrap();
        assert!(output.is_empty());
        assert_eq!(output.as_str(), None);
    }

    #[tokio::test]
    async fn test_get_config_short_payload_is_not_found() {
        let (session, transport) =
            session(&["<rpc-reply><configuration-text>\n</configuration-text></rpc-reply>"]).await;
        let err = session
            .get_config(Some("security>address-book"), ConfigFormat::Text)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(transport.sent()[1].contains("<security><address-book/></security>"));
    }

    #[tokio::test]
    async fn test_rollback_missing_rescue_is_not_found() {
        let reply = error_reply("rescue configuration is not set");
        let (session, _) = session(&[&reply]).await;
        let err = session.rollback(RollbackTarget::Rescue).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rollback_commits_after_load() {
        let (session, transport) = session(&[
            "<rpc-reply><load-configuration-results><ok/></load-configuration-results></rpc-reply>",
            "<rpc-reply><commit-results></commit-results><ok/></rpc-reply>",
        ])
        .await;
        session.rollback(RollbackTarget::Numbered(2)).await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent[1], r#"<load-configuration rollback="2"/>"#);
        assert_eq!(sent[2], "<commit-configuration/>");
    }

    #[tokio::test]
    async fn test_commit_history() {
        let reply = r#"<rpc-reply xmlns:junos="http://xml.juniper.net/junos/12.1X47/junos"><commit-information>
<commit-history><sequence-number>0</sequence-number><user>admin</user><client>netconf</client>
<date-time junos:seconds="1700000000">2023-11-14 22:13:20 UTC</date-time><log>add snmp</log></commit-history>
<commit-history><sequence-number>1</sequence-number><user>root</user><client>cli</client>
<date-time junos:seconds="1699990000">2023-11-14 19:26:40 UTC</date-time></commit-history>
</commit-information></rpc-reply>"#;
        let (session, _) = session(&[reply]).await;
        let history = session.commit_history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].log.as_deref(), Some("add snmp"));
        assert_eq!(history[0].timestamp.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(history[1].sequence, 1);
        assert_eq!(history[1].client, "cli");
        assert_eq!(history[1].log, None);
    }

    #[tokio::test]
    async fn test_commit_timeout_paces_commit() {
        let transport = Scripted::new(&[SOFTWARE, "<rpc-reply><ok/></rpc-reply>"]);
        let session = Session::builder(transport)
            .commit_timeout(Duration::from_millis(50))
            .build()
            .await
            .unwrap();
        let started = std::time::Instant::now();
        session.commit().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
