//! Managed device inventory.

use super::{SpaceClient, SpaceOperation};
use crate::error::{Error, Result};
use crate::rpc::escape_xml;
use crate::xml::{list, text};
use roxmltree::Document;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use tracing::debug;

/// A device managed by Space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: u64,
    pub family: String,
    pub os_version: String,
    pub platform: String,
    pub serial_number: String,
    pub ip_address: String,
    pub name: String,
}

/// How a caller names a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRef {
    Id(u64),
    Name(String),
    Ip(String),
}

impl DeviceRef {
    /// An IP literal becomes [`DeviceRef::Ip`], anything else a name.
    pub fn parse(s: &str) -> Self {
        if s.parse::<IpAddr>().is_ok() {
            DeviceRef::Ip(s.to_string())
        } else {
            DeviceRef::Name(s.to_string())
        }
    }

    pub(crate) fn matches(&self, id: u64, name: &str, ip: &str) -> bool {
        match self {
            DeviceRef::Id(wanted) => *wanted == id,
            DeviceRef::Name(wanted) => wanted == name,
            DeviceRef::Ip(wanted) => wanted == ip,
        }
    }
}

impl From<u64> for DeviceRef {
    fn from(id: u64) -> Self {
        DeviceRef::Id(id)
    }
}

impl From<&str> for DeviceRef {
    fn from(s: &str) -> Self {
        DeviceRef::parse(s)
    }
}

impl fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRef::Id(id) => write!(f, "device {}", id),
            DeviceRef::Name(name) => write!(f, "device {}", name),
            DeviceRef::Ip(ip) => write!(f, "device at {}", ip),
        }
    }
}

fn parse_devices(body: &str) -> Result<Vec<Device>> {
    let doc = Document::parse(body)?;
    Ok(list(doc.root_element(), "device", |d| Device {
        id: d
            .attribute("key")
            .and_then(|k| k.parse().ok())
            .unwrap_or_default(),
        family: text(d, "deviceFamily"),
        os_version: text(d, "OSVersion"),
        platform: text(d, "platform"),
        serial_number: text(d, "serialNumber"),
        ip_address: text(d, "ipAddr"),
        name: text(d, "name"),
    }))
}

fn discover_xml(host: &str, username: &str, password: &str) -> String {
    let mut xml = String::from("<discover-devices>");
    if host.parse::<IpAddr>().is_ok() {
        xml.push_str(&format!(
            "<ipAddressDiscoveryTarget><ipAddress>{}</ipAddress></ipAddressDiscoveryTarget>",
            escape_xml(host)
        ));
    } else {
        xml.push_str(&format!(
            "<hostNameDiscoveryTarget><hostName>{}</hostName></hostNameDiscoveryTarget>",
            escape_xml(host)
        ));
    }
    xml.push_str(&format!(
        "<sshCredential><userName>{}</userName><password>{}</password></sshCredential>",
        escape_xml(username),
        escape_xml(password)
    ));
    xml.push_str(
        "<manageDiscoveredSystemsFlag>true</manageDiscoveredSystemsFlag><usePing>true</usePing></discover-devices>",
    );
    xml
}

impl SpaceClient {
    /// Every managed device.
    pub async fn devices(&self) -> Result<Vec<Device>> {
        let body = self.get("space/device-management/devices").await?;
        parse_devices(&body)
    }

    /// Space id of a managed device.
    pub async fn device_id(&self, device: &DeviceRef) -> Result<u64> {
        if let DeviceRef::Id(id) = device {
            return Ok(*id);
        }
        self.devices()
            .await?
            .into_iter()
            .find(|d| device.matches(d.id, &d.name, &d.ip_address))
            .map(|d| d.id)
            .ok_or_else(|| Error::not_found(device.to_string(), "not managed by Junos Space"))
    }

    /// Discover and manage a new device. Returns the discovery job id.
    pub async fn add_device(&self, host: &str, username: &str, password: &str) -> Result<u64> {
        debug!(host = %host, "Discovering device");
        self.start_job(
            "space/device-management/discover-devices",
            SpaceOperation::DiscoverDevices,
            discover_xml(host, username, password),
        )
        .await
    }

    /// Stop managing a device.
    pub async fn remove_device(&self, device: &DeviceRef) -> Result<()> {
        let id = self.device_id(device).await?;
        self.delete(&format!("space/device-management/devices/{}", id), None)
            .await
    }

    /// Resynchronize Space's copy of a device's configuration.
    pub async fn resync_device(&self, device: &DeviceRef) -> Result<u64> {
        let id = self.device_id(device).await?;
        self.start_job(
            &format!("space/device-management/devices/{}/exec-resync", id),
            SpaceOperation::ExecResync,
            String::new(),
        )
        .await
    }
}
