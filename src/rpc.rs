//! Typed RPC request builder.
//!
//! Every device operation is one [`Rpc`] variant. [`Rpc::render`] produces the
//! body of the `<rpc>` element; the transport adds the envelope. Caller-supplied
//! strings are escaped and validated here, so a bad argument is rejected before
//! anything reaches the wire.

use crate::error::{Error, Result};
use crate::views::ViewRequest;
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Highest rollback slot a Junos device retains
pub const MAX_ROLLBACK: u8 = 49;

/// Valid XML element name for configuration section paths
static ELEMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("Invalid element name regex")
});

// ============================================================================
// Argument Types
// ============================================================================

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// Set commands (e.g. "set system host-name router01")
    Set,
    /// Hierarchical text format (default Junos format)
    #[default]
    Text,
    /// Junos XML
    Xml,
}

impl ConfigFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigFormat::Set => "set",
            ConfigFormat::Text => "text",
            ConfigFormat::Xml => "xml",
        }
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "set" => Ok(ConfigFormat::Set),
            "text" => Ok(ConfigFormat::Text),
            "xml" => Ok(ConfigFormat::Xml),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid config format '{}'. Valid formats: set, text, xml",
                s
            ))),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format for operational commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandFormat {
    /// Plain CLI text, unwrapped from the `<output>` envelope
    #[default]
    Text,
    /// The device's XML reply, unmodified
    Xml,
}

impl CommandFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandFormat::Text => "text",
            CommandFormat::Xml => "xml",
        }
    }
}

impl FromStr for CommandFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(CommandFormat::Text),
            "xml" => Ok(CommandFormat::Xml),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid command format '{}'. Valid formats: text, xml",
                s
            ))),
        }
    }
}

/// Rollback target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackTarget {
    /// Rollback slot N (0 = active, 1 = previous, ...)
    Numbered(u8),
    /// The saved rescue configuration
    Rescue,
}

impl RollbackTarget {
    /// Numbered slot, rejecting anything beyond the retained history.
    pub fn numbered(slot: u32) -> Result<Self> {
        if slot > u32::from(MAX_ROLLBACK) {
            return Err(Error::InvalidArgument(format!(
                "Rollback slot must be 0-{}, got {}",
                MAX_ROLLBACK, slot
            )));
        }
        Ok(RollbackTarget::Numbered(slot as u8))
    }
}

impl FromStr for RollbackTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("rescue") {
            return Ok(RollbackTarget::Rescue);
        }
        match s.parse::<u32>() {
            Ok(slot) => RollbackTarget::numbered(slot),
            Err(_) => Err(Error::InvalidArgument(format!(
                "Invalid rollback target '{}'. Use 0-{} or 'rescue'",
                s, MAX_ROLLBACK
            ))),
        }
    }
}

impl fmt::Display for RollbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackTarget::Numbered(slot) => write!(f, "rollback {}", slot),
            RollbackTarget::Rescue => f.write_str("rescue"),
        }
    }
}

/// Rescue configuration action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescueAction {
    /// Snapshot the active configuration as the rescue configuration
    Save,
    /// Remove the rescue configuration
    Delete,
}

impl FromStr for RescueAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "save" => Ok(RescueAction::Save),
            "delete" => Ok(RescueAction::Delete),
            _ => Err(Error::InvalidArgument(format!(
                "Invalid rescue action '{}'. Valid actions: save, delete",
                s
            ))),
        }
    }
}

// ============================================================================
// Configuration Payload
// ============================================================================

/// Where a configuration payload comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigPayload {
    /// Local file, read before the RPC is built
    File(PathBuf),
    /// Remote `ftp://` or `http://` location fetched by the device
    Url(String),
    /// Configuration text or commands supplied directly
    Inline(String),
}

impl ConfigPayload {
    /// Classify a path-like source: anything containing `tp://` is a URL,
    /// everything else a local file.
    pub fn from_source(source: &str) -> Self {
        if source.contains("tp://") {
            ConfigPayload::Url(source.to_string())
        } else {
            ConfigPayload::File(PathBuf::from(source))
        }
    }

    pub fn inline(content: impl Into<String>) -> Self {
        ConfigPayload::Inline(content.into())
    }

    /// A batch of commands, one per line.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = lines
            .into_iter()
            .map(|l| l.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("\n");
        ConfigPayload::Inline(joined)
    }

    /// Read local files so the payload can be embedded in an RPC.
    pub async fn resolve(self) -> Result<LoadSource> {
        match self {
            ConfigPayload::Url(url) => Ok(LoadSource::Url(url)),
            ConfigPayload::Inline(content) => Ok(LoadSource::Content(content)),
            ConfigPayload::File(path) => tokio::fs::read_to_string(&path)
                .await
                .map(LoadSource::Content)
                .map_err(|e| Error::Load {
                    message: format!("cannot read {}: {}", path.display(), e),
                    errors: Vec::new(),
                }),
        }
    }
}

/// A resolved payload, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    Url(String),
    Content(String),
}

// ============================================================================
// RPC
// ============================================================================

/// One device operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Rpc {
    /// Operational-mode CLI command
    Command { command: String, format: CommandFormat },
    Commit,
    /// Scheduled commit at a device-local `HH:MM:SS`
    CommitAt { time: String, log: Option<String> },
    CommitCheck,
    /// Commit that rolls back unless confirmed within `minutes`
    CommitConfirmed { minutes: u32 },
    CommitFull,
    CommitLog { log: String },
    Lock,
    Unlock,
    LoadConfiguration { format: ConfigFormat, source: LoadSource },
    LoadRollback(u8),
    LoadRescue,
    /// Rollback history entry, optionally compared against another slot
    GetRollbackInformation { rollback: u8, compare: Option<u8> },
    /// Candidate configuration compared against a rollback slot
    GetConfigurationCompare { rollback: u8 },
    /// Committed configuration, optionally limited to a section path
    GetConfiguration { section: Vec<String>, format: ConfigFormat },
    GetRescueInformation,
    SaveRescue,
    DeleteRescue,
    GetSoftwareInformation,
    GetCommitInformation,
    View(ViewRequest),
}

impl Rpc {
    /// Logical operation name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Rpc::Command { .. } => "command",
            Rpc::Commit => "commit",
            Rpc::CommitAt { .. } => "commit-at",
            Rpc::CommitCheck => "commit-check",
            Rpc::CommitConfirmed { .. } => "commit-confirm",
            Rpc::CommitFull => "commit-full",
            Rpc::CommitLog { .. } => "commit-log",
            Rpc::Lock => "lock",
            Rpc::Unlock => "unlock",
            Rpc::LoadConfiguration { format, source } => match (format, source) {
                (ConfigFormat::Set, LoadSource::Content(_)) => "load-config-local-set",
                (ConfigFormat::Text, LoadSource::Content(_)) => "load-config-local-text",
                (ConfigFormat::Xml, LoadSource::Content(_)) => "load-config-local-xml",
                (ConfigFormat::Set, LoadSource::Url(_)) => "load-config-url-set",
                (ConfigFormat::Text, LoadSource::Url(_)) => "load-config-url-text",
                (ConfigFormat::Xml, LoadSource::Url(_)) => "load-config-url-xml",
            },
            Rpc::LoadRollback(_) => "rollback-config",
            Rpc::LoadRescue => "rescue-config",
            Rpc::GetRollbackInformation { compare: None, .. } => "get-rollback-information",
            Rpc::GetRollbackInformation { .. } => "get-rollback-information-compare",
            Rpc::GetConfigurationCompare { .. } => "get-configuration-compare",
            Rpc::GetConfiguration { .. } => "get-configuration",
            Rpc::GetRescueInformation => "get-rescue-information",
            Rpc::SaveRescue => "rescue-save",
            Rpc::DeleteRescue => "rescue-delete",
            Rpc::GetSoftwareInformation => "software",
            Rpc::GetCommitInformation => "commit-history",
            Rpc::View(request) => request.view.rpc_name(),
        }
    }

    /// Render the operation XML.
    pub fn render(&self) -> Result<String> {
        let xml = match self {
            Rpc::Command { command, format } => format!(
                r#"<command format="{}">{}</command>"#,
                format.as_str(),
                escape_xml(command)
            ),
            Rpc::Commit => "<commit-configuration/>".to_string(),
            Rpc::CommitAt { time, log } => {
                NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| {
                    Error::InvalidArgument(format!(
                        "Commit time '{}' is not a 24-hour HH:MM:SS time",
                        time
                    ))
                })?;
                let log = log
                    .as_deref()
                    .map(|l| format!("<log>{}</log>", escape_xml(l)))
                    .unwrap_or_default();
                format!(
                    "<commit-configuration><at-time>{}</at-time>{}</commit-configuration>",
                    time, log
                )
            }
            Rpc::CommitCheck => "<commit-configuration><check/></commit-configuration>".to_string(),
            Rpc::CommitConfirmed { minutes } => {
                if !(1..=65535).contains(minutes) {
                    return Err(Error::InvalidArgument(format!(
                        "Confirm timeout must be 1-65535 minutes, got {}",
                        minutes
                    )));
                }
                format!(
                    "<commit-configuration><confirmed/><confirm-timeout>{}</confirm-timeout></commit-configuration>",
                    minutes
                )
            }
            Rpc::CommitFull => "<commit-configuration><full/></commit-configuration>".to_string(),
            Rpc::CommitLog { log } => format!(
                "<commit-configuration><log>{}</log></commit-configuration>",
                escape_xml(log)
            ),
            Rpc::Lock => "<lock><target><candidate/></target></lock>".to_string(),
            Rpc::Unlock => "<unlock><target><candidate/></target></unlock>".to_string(),
            Rpc::LoadConfiguration { format, source } => render_load(*format, source)?,
            Rpc::LoadRollback(slot) => {
                if *slot > MAX_ROLLBACK {
                    return Err(Error::InvalidArgument(format!(
                        "Rollback slot must be 0-{}, got {}",
                        MAX_ROLLBACK, slot
                    )));
                }
                format!(r#"<load-configuration rollback="{}"/>"#, slot)
            }
            Rpc::LoadRescue => r#"<load-configuration rescue="rescue"/>"#.to_string(),
            Rpc::GetRollbackInformation { rollback, compare } => {
                let compare = compare
                    .map(|c| format!("<compare>{}</compare>", c))
                    .unwrap_or_default();
                format!(
                    "<get-rollback-information><rollback>{}</rollback>{}<format>text</format></get-rollback-information>",
                    rollback, compare
                )
            }
            Rpc::GetConfigurationCompare { rollback } => format!(
                r#"<get-configuration compare="rollback" rollback="{}" format="text"/>"#,
                rollback
            ),
            Rpc::GetConfiguration { section, format } => {
                if section.is_empty() {
                    format!(
                        r#"<get-configuration database="committed" format="{}"/>"#,
                        format.as_str()
                    )
                } else {
                    format!(
                        r#"<get-configuration database="committed" format="{}"><configuration>{}</configuration></get-configuration>"#,
                        format.as_str(),
                        section_filter(section)?
                    )
                }
            }
            Rpc::GetRescueInformation => {
                "<get-rescue-information><format>text</format></get-rescue-information>".to_string()
            }
            Rpc::SaveRescue => "<request-save-rescue-configuration/>".to_string(),
            Rpc::DeleteRescue => "<request-delete-rescue-configuration/>".to_string(),
            Rpc::GetSoftwareInformation => "<get-software-information/>".to_string(),
            Rpc::GetCommitInformation => "<get-commit-information/>".to_string(),
            Rpc::View(request) => request.render(),
        };
        Ok(xml)
    }
}

/// Split a `>`-separated section path (e.g. `security>address-book`).
pub fn parse_section_path(path: &str) -> Vec<String> {
    path.split('>')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Nest section names into an empty-element filter: `<a><b/></a>`.
fn section_filter(section: &[String]) -> Result<String> {
    if let Some(bad) = section.iter().find(|s| !ELEMENT_NAME.is_match(s)) {
        return Err(Error::InvalidArgument(format!(
            "'{}' is not a valid configuration section name",
            bad
        )));
    }

    let (last, parents) = match section.split_last() {
        Some(split) => split,
        None => return Ok(String::new()),
    };
    let mut xml = String::new();
    for name in parents {
        xml.push_str(&format!("<{}>", name));
    }
    xml.push_str(&format!("<{}/>", last));
    for name in parents.iter().rev() {
        xml.push_str(&format!("</{}>", name));
    }
    Ok(xml)
}

fn render_load(format: ConfigFormat, source: &LoadSource) -> Result<String> {
    let xml = match (format, source) {
        (ConfigFormat::Set, LoadSource::Content(content)) => format!(
            r#"<load-configuration action="set" format="text"><configuration-set>{}</configuration-set></load-configuration>"#,
            escape_xml(content)
        ),
        (ConfigFormat::Text, LoadSource::Content(content)) => format!(
            r#"<load-configuration format="text"><configuration-text>{}</configuration-text></load-configuration>"#,
            escape_xml(content)
        ),
        (ConfigFormat::Xml, LoadSource::Content(content)) => format!(
            r#"<load-configuration format="xml">{}</load-configuration>"#,
            xml_configuration(content)?
        ),
        (ConfigFormat::Set, LoadSource::Url(url)) => format!(
            r#"<load-configuration action="set" format="text" url="{}"/>"#,
            escape_xml(url)
        ),
        (ConfigFormat::Text, LoadSource::Url(url)) => format!(
            r#"<load-configuration format="text" url="{}"/>"#,
            escape_xml(url)
        ),
        (ConfigFormat::Xml, LoadSource::Url(url)) => format!(
            r#"<load-configuration format="xml" url="{}"/>"#,
            escape_xml(url)
        ),
    };
    Ok(xml)
}

/// Wrap an XML payload in `<configuration>` unless it already is one, and
/// check that the result is well-formed.
fn xml_configuration(content: &str) -> Result<String> {
    let trimmed = content.trim();
    let trimmed = match trimmed.strip_prefix("<?xml") {
        Some(rest) => rest.split_once("?>").map(|(_, body)| body.trim()).unwrap_or(""),
        None => trimmed,
    };
    let element = if trimmed.starts_with("<configuration") {
        trimmed.to_string()
    } else {
        format!("<configuration>{}</configuration>", trimmed)
    };

    roxmltree::Document::parse(&element).map_err(|e| Error::Load {
        message: format!("configuration is not well-formed XML: {}", e),
        errors: Vec::new(),
    })?;
    Ok(element)
}

/// Escape special XML characters in text content and attribute values
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
