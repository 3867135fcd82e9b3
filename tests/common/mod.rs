//! Shared test utilities for the Junos test suite.
//!
//! This module provides:
//! - [`SimulatedDevice`], a stateful in-memory device implementing [`Transport`]
//! - Fixture loading helpers
//! - Session construction helpers
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use roxmltree::{Document, Node};

use junos::transport::{RpcReply, Transport, TransportError, TransportResult};
use junos::Session;

/// Rollback history the simulated device retains (slots 0..=49).
pub const HISTORY_DEPTH: usize = 50;

// ============================================================================
// Fixtures
// ============================================================================

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Contents of a file under `tests/fixtures`.
pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("missing fixture {}: {}", name, e))
}

/// A fixture parsed as an `<rpc-reply>`.
pub fn fixture_reply(name: &str) -> RpcReply {
    RpcReply::parse(&fixture(name)).expect("fixture is a valid rpc-reply")
}

// ============================================================================
// Simulated Device
// ============================================================================

/// Committed configuration plus bookkeeping for one commit.
#[derive(Debug, Clone, Default)]
struct Revision {
    lines: Vec<String>,
    user: String,
    log: Option<String>,
    seconds: i64,
}

#[derive(Debug, Default)]
struct DeviceState {
    hostname: String,
    model: String,
    version: String,
    dual_re: bool,
    candidate: Vec<String>,
    /// Index 0 is the active configuration
    history: Vec<Revision>,
    rescue: Option<Vec<String>>,
    locked: bool,
    locked_by_other: bool,
    commit_failure: Option<String>,
    commands: HashMap<String, Option<String>>,
    /// XML answers for configuration sections, keyed by space-joined path
    section_xml: HashMap<String, String>,
    /// Time of a pending `commit at`
    scheduled_commit: Option<String>,
    /// Minutes left on an unconfirmed `commit confirmed`
    pending_confirm: Option<u32>,
    full_commits: usize,
    /// Appended verbatim to `commit-information` replies
    extra_history: Option<String>,
    sent: Vec<String>,
    clock: i64,
    closed: bool,
}

/// In-memory Junos device speaking just enough of the XML API for the
/// configuration lifecycle.
///
/// Configuration is modelled as a list of statements without the leading
/// `set`, e.g. `system host-name fw1`. Diffs are printed under a single
/// `[edit]` header.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    /// Single routing engine SRX with a minimal active configuration.
    pub fn new(hostname: &str) -> Self {
        let base = vec![
            format!("system host-name {}", hostname),
            "system services netconf ssh".to_string(),
        ];
        let state = DeviceState {
            hostname: hostname.to_string(),
            model: "srx240h2".to_string(),
            version: "12.1X47-D10.4".to_string(),
            candidate: base.clone(),
            history: vec![Revision {
                lines: base,
                user: "root".to_string(),
                log: Some("initial".to_string()),
                seconds: 1_400_000_000,
            }],
            clock: 1_400_000_000,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Answer `get-software-information` with one entry per routing engine.
    pub fn dual_re(self) -> Self {
        self.state.lock().dual_re = true;
        self
    }

    pub fn model(self, model: &str) -> Self {
        self.state.lock().model = model.to_string();
        self
    }

    pub fn version(self, version: &str) -> Self {
        self.state.lock().version = version.to_string();
        self
    }

    /// Commit `count` revisions so slots `1..=count` exist. Each revision is
    /// the initial configuration plus one distinct statement.
    pub fn with_history(self, count: usize) -> Self {
        {
            let mut state = self.state.lock();
            let base = state.history[state.history.len() - 1].lines.clone();
            for i in 0..count {
                let mut lines = base.clone();
                lines.push(format!("system login message revision-{}", i));
                state.candidate = lines;
                state.commit(Some(format!("revision {}", i)));
            }
        }
        self
    }

    /// Another operator holds the configuration lock.
    pub fn locked_by_other(self) -> Self {
        self.state.lock().locked_by_other = true;
        self
    }

    /// Every commit fails with this message.
    pub fn failing_commits(self, message: &str) -> Self {
        self.state.lock().commit_failure = Some(message.to_string());
        self
    }

    /// Register the text output of an operational command; `None` answers
    /// with an empty reply.
    pub fn command(self, command: &str, output: Option<&str>) -> Self {
        self.state
            .lock()
            .commands
            .insert(command.to_string(), output.map(str::to_string));
        self
    }

    /// Answer XML requests for `section` (e.g. `security zones`) with a raw
    /// `<configuration>` document instead of the statement list.
    pub fn config_xml(self, section: &str, xml: &str) -> Self {
        self.state
            .lock()
            .section_xml
            .insert(section.to_string(), xml.to_string());
        self
    }

    /// Append a raw `commit-history` element to every commit-information reply.
    pub fn extra_history_entry(self, xml: &str) -> Self {
        self.state.lock().extra_history = Some(xml.to_string());
        self
    }

    pub fn active(&self) -> Vec<String> {
        self.state.lock().history[0].lines.clone()
    }

    pub fn candidate(&self) -> Vec<String> {
        self.state.lock().candidate.clone()
    }

    /// Configuration held in rollback `slot`.
    pub fn slot(&self, slot: usize) -> Option<Vec<String>> {
        self.state.lock().history.get(slot).map(|r| r.lines.clone())
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn has_rescue(&self) -> bool {
        self.state.lock().rescue.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn scheduled_commit(&self) -> Option<String> {
        self.state.lock().scheduled_commit.clone()
    }

    pub fn pending_confirm(&self) -> Option<u32> {
        self.state.lock().pending_confirm
    }

    pub fn full_commits(&self) -> usize {
        self.state.lock().full_commits
    }

    /// Every operation received, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Root element names of every operation received.
    pub fn operations(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|op| {
                Document::parse(op)
                    .ok()
                    .map(|d| d.root_element().tag_name().name().to_string())
            })
            .collect()
    }
}

#[async_trait]
impl Transport for SimulatedDevice {
    fn identifier(&self) -> &str {
        "simulated:830"
    }

    async fn execute(&self, operation: &str) -> TransportResult<RpcReply> {
        let body = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(TransportError::Closed);
            }
            state.sent.push(operation.to_string());
            let doc = Document::parse(operation)
                .map_err(|e| TransportError::Framing(format!("bad operation: {}", e)))?;
            state.handle(doc.root_element())
        };
        RpcReply::parse(&format!(
            "<rpc-reply xmlns:junos=\"http://xml.juniper.net/junos/12.1X47/junos\">{}</rpc-reply>",
            body
        ))
    }

    async fn close(&self) -> TransportResult<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

impl DeviceState {
    fn handle(&mut self, op: Node<'_, '_>) -> String {
        match op.tag_name().name() {
            "get-software-information" => self.software_information(),
            "lock" => self.lock(),
            "unlock" => self.unlock(),
            "load-configuration" => self.load(op),
            "commit-configuration" => self.commit_configuration(op),
            "get-configuration" => self.get_configuration(op),
            "get-rollback-information" => self.rollback_information(op),
            "get-rescue-information" => match self.rescue.clone() {
                Some(lines) => configuration_information("rescue-information", &render(&lines)),
                None => error_reply("Rescue configuration is not set"),
            },
            "request-save-rescue-configuration" => {
                self.rescue = Some(self.history[0].lines.clone());
                ok()
            }
            "request-delete-rescue-configuration" => {
                self.rescue = None;
                ok()
            }
            "get-commit-information" => self.commit_information(),
            "command" => self.command(op),
            other => error_reply(&format!("syntax error: {}", other)),
        }
    }

    fn software_information(&self) -> String {
        let software = |re: &str| {
            format!(
                "<software-information><host-name>{host}{re}</host-name><product-model>{model}</product-model>\
<product-name>{model}</product-name><package-information><name>junos</name>\
<comment>JUNOS Software Release [{version}]</comment></package-information></software-information>",
                host = self.hostname,
                re = re,
                model = self.model,
                version = self.version
            )
        };
        if self.dual_re {
            format!(
                "<multi-routing-engine-results>\
<multi-routing-engine-item><re-name>re0</re-name>{}</multi-routing-engine-item>\
<multi-routing-engine-item><re-name>re1</re-name>{}</multi-routing-engine-item>\
</multi-routing-engine-results>",
                software(""),
                software("")
            )
        } else {
            software("")
        }
    }

    fn lock(&mut self) -> String {
        if self.locked || self.locked_by_other {
            return error_reply("configuration database locked by:\n  netops terminal p0 (pid 4242)");
        }
        self.locked = true;
        ok()
    }

    fn unlock(&mut self) -> String {
        if !self.locked {
            return error_reply("configuration database not locked");
        }
        self.locked = false;
        ok()
    }

    fn load(&mut self, op: Node<'_, '_>) -> String {
        if let Some(slot) = op.attribute("rollback") {
            let slot: usize = slot.parse().unwrap_or(usize::MAX);
            return match self.history.get(slot) {
                Some(revision) => {
                    self.candidate = revision.lines.clone();
                    load_success()
                }
                None => error_reply(&format!("rollback {}: configuration does not exist", slot)),
            };
        }
        if op.attribute("rescue").is_some() {
            return match self.rescue.clone() {
                Some(lines) => {
                    self.candidate = lines;
                    load_success()
                }
                None => error_reply("Rescue configuration is not set"),
            };
        }

        let payload = op
            .descendants()
            .find(|n| n.has_tag_name("configuration-set") || n.has_tag_name("configuration-text"))
            .and_then(|n| n.text())
            .unwrap_or_default()
            .to_string();
        for line in payload.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(statement) = line.strip_prefix("set ") {
                if !self.candidate.iter().any(|l| l == statement) {
                    self.candidate.push(statement.to_string());
                }
            } else if let Some(statement) = line.strip_prefix("delete ") {
                self.candidate.retain(|l| !l.starts_with(statement));
            } else {
                return error_reply(&format!("syntax error, expecting <command>: {}", line));
            }
        }
        load_success()
    }

    fn commit_configuration(&mut self, op: Node<'_, '_>) -> String {
        if let Some(bad) = self.candidate.iter().find(|l| l.contains("ge-0/0/99")) {
            return format!(
                "<commit-results><routing-engine><name>re0</name>\
<rpc-error><error-severity>error</error-severity><error-path>[edit interfaces]</error-path>\
<error-info><bad-element>ge-0/0/99</bad-element></error-info>\
<error-message>invalid interface type in '{}'</error-message></rpc-error>\
<rpc-error><error-severity>error</error-severity><error-message>configuration check-out failed</error-message></rpc-error>\
</routing-engine></commit-results>",
                escape(bad)
            );
        }
        if op.children().any(|c| c.has_tag_name("check")) {
            return "<commit-results><routing-engine><name>re0</name><commit-check-success/></routing-engine></commit-results>"
                .to_string();
        }
        if let Some(message) = self.commit_failure.clone() {
            return error_reply(&message);
        }

        let child = |name: &str| {
            op.children()
                .find(|c| c.has_tag_name(name))
                .and_then(|c| c.text())
                .map(str::to_string)
        };
        let log = child("log");
        if let Some(time) = child("at-time") {
            self.scheduled_commit = Some(time);
            return "<commit-results><routing-engine><name>re0</name>\
<commit-success/></routing-engine></commit-results>"
                .to_string();
        }

        // Any immediate commit cancels a scheduled one and confirms a pending one
        self.scheduled_commit = None;
        self.pending_confirm = if op.children().any(|c| c.has_tag_name("confirmed")) {
            child("confirm-timeout").and_then(|m| m.trim().parse().ok())
        } else {
            None
        };
        if op.children().any(|c| c.has_tag_name("full")) {
            self.full_commits += 1;
        }
        self.commit(log);
        "<commit-results><routing-engine><name>re0</name><commit-success/></routing-engine></commit-results>"
            .to_string()
    }

    fn commit(&mut self, log: Option<String>) {
        self.clock += 60;
        self.history.insert(
            0,
            Revision {
                lines: self.candidate.clone(),
                user: "netconf".to_string(),
                log,
                seconds: self.clock,
            },
        );
        self.history.truncate(HISTORY_DEPTH);
    }

    fn get_configuration(&self, op: Node<'_, '_>) -> String {
        if op.attribute("compare") == Some("rollback") {
            let slot: usize = op
                .attribute("rollback")
                .and_then(|s| s.parse().ok())
                .unwrap_or(usize::MAX);
            return match self.history.get(slot) {
                Some(revision) => configuration_information(
                    "configuration-information",
                    &diff(&revision.lines, &self.candidate),
                ),
                None => error_reply(&format!("rollback {}: configuration does not exist", slot)),
            };
        }

        let section = op
            .children()
            .find(|c| c.has_tag_name("configuration"))
            .map(|c| {
                c.descendants()
                    .filter(|n| n.is_element() && !n.has_tag_name("configuration"))
                    .map(|n| n.tag_name().name().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();
        let lines: Vec<&String> = self.history[0]
            .lines
            .iter()
            .filter(|l| section.is_empty() || l.starts_with(&format!("{} ", section)))
            .collect();

        if op.attribute("format") == Some("xml") {
            if let Some(xml) = self.section_xml.get(&section) {
                return xml.clone();
            }
        }

        match op.attribute("format") {
            Some("set") => {
                let set = lines
                    .iter()
                    .map(|l| format!("set {}", l))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("<configuration-set>{}</configuration-set>", escape(&set))
            }
            Some("xml") => {
                if lines.is_empty() {
                    "<configuration/>".to_string()
                } else {
                    format!(
                        "<configuration junos:commit-user=\"netconf\">{}</configuration>",
                        lines
                            .iter()
                            .map(|l| format!("<statement>{}</statement>", escape(l)))
                            .collect::<String>()
                    )
                }
            }
            _ => {
                let text = lines.iter().map(|l| format!("{};", l)).collect::<Vec<_>>().join("\n");
                format!("<configuration-text>{}</configuration-text>", escape(&text))
            }
        }
    }

    fn rollback_information(&self, op: Node<'_, '_>) -> String {
        let number = |name: &str| {
            op.children()
                .find(|c| c.has_tag_name(name))
                .and_then(|c| c.text())
                .and_then(|t| t.trim().parse::<usize>().ok())
        };
        let rollback = number("rollback").unwrap_or(0);
        let (Some(newer), compare) = (self.history.get(rollback), number("compare")) else {
            return error_reply(&format!("rollback {}: configuration does not exist", rollback));
        };
        match compare {
            Some(slot) => match self.history.get(slot) {
                Some(older) => {
                    configuration_information("rollback-information", &diff(&older.lines, &newer.lines))
                }
                None => error_reply(&format!("rollback {}: configuration does not exist", slot)),
            },
            None => configuration_information("rollback-information", &render(&newer.lines)),
        }
    }

    fn commit_information(&self) -> String {
        let entries: String = self
            .history
            .iter()
            .enumerate()
            .map(|(i, revision)| {
                let log = revision
                    .log
                    .as_deref()
                    .map(|l| format!("<log>{}</log>", escape(l)))
                    .unwrap_or_default();
                format!(
                    "<commit-history><sequence-number>{}</sequence-number><user>{}</user>\
<client>netconf</client><date-time junos:seconds=\"{}\">{}</date-time>{}</commit-history>",
                    i,
                    revision.user,
                    revision.seconds,
                    chrono::DateTime::from_timestamp(revision.seconds, 0)
                        .map(|d| d.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_default(),
                    log
                )
            })
            .collect();
        format!(
            "<commit-information>{}{}</commit-information>",
            entries,
            self.extra_history.as_deref().unwrap_or_default()
        )
    }

    fn command(&self, op: Node<'_, '_>) -> String {
        let command = op.text().unwrap_or_default().trim().to_string();
        match self.commands.get(&command) {
            Some(None) => String::new(),
            Some(Some(output)) if op.attribute("format") == Some("xml") => output.clone(),
            Some(Some(output)) => format!("<output>\n{}\n</output>", escape(output)),
            None => error_reply(&format!("syntax error, expecting <command>: {}", command)),
        }
    }
}

/// Statements in `newer` but not `older` are `+`, the reverse `-`.
fn diff(older: &[String], newer: &[String]) -> String {
    let removed: Vec<_> = older.iter().filter(|l| !newer.contains(l)).collect();
    let added: Vec<_> = newer.iter().filter(|l| !older.contains(l)).collect();
    if removed.is_empty() && added.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n[edit]\n");
    for line in removed {
        out.push_str(&format!("-  {};\n", line));
    }
    for line in added {
        out.push_str(&format!("+  {};\n", line));
    }
    out
}

fn render(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{};\n", l)).collect()
}

fn configuration_information(wrapper: &str, output: &str) -> String {
    format!(
        "<{w}><configuration-information><configuration-output>{}</configuration-output></configuration-information></{w}>",
        escape(output),
        w = wrapper
    )
}

fn load_success() -> String {
    "<load-configuration-results><load-success/></load-configuration-results>".to_string()
}

fn ok() -> String {
    "<ok/>".to_string()
}

fn error_reply(message: &str) -> String {
    format!(
        "<rpc-error><error-type>protocol</error-type><error-tag>operation-failed</error-tag>\
<error-severity>error</error-severity><error-message>{}</error-message></rpc-error>",
        escape(message)
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ============================================================================
// Sessions
// ============================================================================

/// Open a session on a simulated device and keep a handle to the device.
pub async fn open(device: SimulatedDevice) -> (Session, SimulatedDevice) {
    let session = Session::new(device.clone())
        .await
        .expect("simulated device yields a session");
    (session, device)
}
