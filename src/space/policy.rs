//! Security Director: security devices, firewall policies and variables.

use super::{DeviceRef, SpaceClient, SpaceOperation};
use crate::error::{Error, Result};
use crate::rpc::escape_xml;
use crate::xml::{child, list, number, text};
use roxmltree::Document;
use serde::Serialize;
use std::fmt;

/// A device as Security Director knows it. Ids differ from platform ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityDevice {
    pub id: u64,
    pub family: String,
    pub platform: String,
    pub ip_address: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Policy {
    pub id: u64,
    pub name: String,
    pub description: String,
}

/// A polymorphic (variable) object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub id: u64,
    pub name: String,
    pub description: String,
}

/// A Security Director address object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Address {
    pub id: u64,
    pub name: String,
    /// `IPADDRESS`, `NETWORK`, `DNS`, ...
    pub address_type: String,
    pub description: String,
    pub ip_address: String,
    pub hostname: String,
}

/// Variable definition as fetched for editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct VariableDefinition {
    name: String,
    description: String,
    variable_type: String,
    edit_version: u64,
    default_name: String,
    default_value: String,
    values: Vec<VariableValue>,
}

/// One device-specific value of a variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct VariableValue {
    device_moid: String,
    device_name: String,
    value: String,
    value_name: String,
}

impl VariableValue {
    fn to_xml(&self) -> String {
        format!(
            "<variable-values><device><moid>{}</moid><name>{}</name></device>\
<variable-value-detail><variable-value>{}</variable-value><name>{}</name></variable-value-detail>\
</variable-values>",
            escape_xml(&self.device_moid),
            escape_xml(&self.device_name),
            escape_xml(&self.value),
            escape_xml(&self.value_name)
        )
    }
}

impl VariableDefinition {
    fn parse(body: &str) -> Result<Self> {
        let doc = Document::parse(body)?;
        let root = doc.root_element();
        let values = child(root, "variable-values-list")
            .map(|values| {
                list(values, "variable-values", |v| VariableValue {
                    device_moid: text(v, "device>moid"),
                    device_name: text(v, "device>name"),
                    value: text(v, "variable-value-detail>variable-value"),
                    value_name: text(v, "variable-value-detail>name"),
                })
            })
            .unwrap_or_default();
        Ok(Self {
            name: text(root, "name"),
            description: text(root, "description"),
            variable_type: text(root, "type"),
            edit_version: number(root, "edit-version"),
            default_name: text(root, "default-name"),
            default_value: text(root, "default-value-detail>default-value"),
            values,
        })
    }

    fn to_xml(&self) -> String {
        let values: String = self.values.iter().map(VariableValue::to_xml).collect();
        format!(
            "<variable-definition><name>{}</name><type>{}</type><description>{}</description>\
<edit-version>{}</edit-version><context>DEVICE</context><default-name>{}</default-name>\
<default-value-detail><default-value>{}</default-value></default-value-detail>\
<variable-values-list>{}</variable-values-list></variable-definition>",
            escape_xml(&self.name),
            escape_xml(&self.variable_type),
            escape_xml(&self.description),
            self.edit_version,
            escape_xml(&self.default_name),
            escape_xml(&self.default_value),
            values
        )
    }
}

/// Managed-object id Space uses for an address inside variable values.
fn address_moid(id: u64) -> String {
    format!("net.juniper.jnap.sm.om.jpa.AddressEntity:{}", id)
}

/// Managed-object id Space uses for a security device inside variable values.
fn device_moid(id: u64) -> String {
    format!("net.juniper.jnap.sm.om.jpa.SecurityDeviceEntity:{}", id)
}

/// How a caller names a firewall policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRef {
    Id(u64),
    Name(String),
}

impl From<u64> for PolicyRef {
    fn from(id: u64) -> Self {
        PolicyRef::Id(id)
    }
}

impl From<&str> for PolicyRef {
    fn from(name: &str) -> Self {
        PolicyRef::Name(name.to_string())
    }
}

impl fmt::Display for PolicyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyRef::Id(id) => write!(f, "policy {}", id),
            PolicyRef::Name(name) => write!(f, "policy {}", name),
        }
    }
}

fn parse_security_devices(body: &str) -> Result<Vec<SecurityDevice>> {
    let doc = Document::parse(body)?;
    Ok(list(doc.root_element(), "device", |d| SecurityDevice {
        id: number(d, "id"),
        family: text(d, "device-family"),
        platform: text(d, "platform"),
        ip_address: text(d, "device-ip"),
        name: text(d, "name"),
    }))
}

fn parse_policies(body: &str) -> Result<Vec<Policy>> {
    let doc = Document::parse(body)?;
    Ok(list(doc.root_element(), "firewall-policy", |p| Policy {
        id: number(p, "id"),
        name: text(p, "name"),
        description: text(p, "description"),
    }))
}

fn parse_addresses(body: &str) -> Result<Vec<Address>> {
    let doc = Document::parse(body)?;
    Ok(list(doc.root_element(), "address", |a| Address {
        id: number(a, "id"),
        name: text(a, "name"),
        address_type: text(a, "address-type"),
        description: text(a, "description"),
        ip_address: text(a, "ip-address"),
        hostname: text(a, "host-name"),
    }))
}

fn parse_variables(body: &str) -> Result<Vec<Variable>> {
    let doc = Document::parse(body)?;
    Ok(list(doc.root_element(), "variable-definition", |v| Variable {
        id: number(v, "id"),
        name: text(v, "name"),
        description: text(v, "description"),
    }))
}

impl SpaceClient {
    /// Devices managed by Security Director.
    pub async fn security_devices(&self) -> Result<Vec<SecurityDevice>> {
        let body = self.get("juniper/sd/device-management/devices").await?;
        parse_security_devices(&body)
    }

    /// Every firewall policy.
    pub async fn policies(&self) -> Result<Vec<Policy>> {
        let body = self
            .get("juniper/sd/fwpolicy-management/firewall-policies")
            .await?;
        parse_policies(&body)
    }

    /// Every polymorphic (variable) object.
    pub async fn variables(&self) -> Result<Vec<Variable>> {
        let body = self
            .get("juniper/sd/variable-management/variable-definitions")
            .await?;
        parse_variables(&body)
    }

    /// Address objects, optionally narrowed by a Space filter value.
    pub async fn addresses(&self, filter: Option<&str>) -> Result<Vec<Address>> {
        let filter = format!("(global eq '{}')", filter.unwrap_or_default());
        let encoded: String = url::form_urlencoded::byte_serialize(filter.as_bytes()).collect();
        let body = self
            .get(&format!(
                "juniper/sd/address-management/addresses?filter={}",
                encoded
            ))
            .await?;
        parse_addresses(&body)
    }

    /// Address object by name or IP address.
    async fn address(&self, address: &str) -> Result<Address> {
        self.addresses(Some(address))
            .await?
            .into_iter()
            .find(|a| a.name == address || a.ip_address == address)
            .ok_or_else(|| Error::not_found(format!("address {}", address), "no such address object"))
    }

    async fn variable_id(&self, name: &str) -> Result<u64> {
        self.variables()
            .await?
            .into_iter()
            .find(|v| v.name == name)
            .map(|v| v.id)
            .ok_or_else(|| Error::not_found(format!("variable {}", name), "no such variable"))
    }

    async fn policy_id(&self, policy: &PolicyRef) -> Result<u64> {
        match policy {
            PolicyRef::Id(id) => Ok(*id),
            PolicyRef::Name(name) => self
                .policies()
                .await?
                .into_iter()
                .find(|p| &p.name == name)
                .map(|p| p.id)
                .ok_or_else(|| Error::not_found(policy.to_string(), "no such firewall policy")),
        }
    }

    async fn security_device_id(&self, device: &DeviceRef) -> Result<u64> {
        if let DeviceRef::Id(id) = device {
            return Ok(*id);
        }
        self.security_devices()
            .await?
            .into_iter()
            .find(|d| device.matches(d.id, &d.name, &d.ip_address))
            .map(|d| d.id)
            .ok_or_else(|| Error::not_found(device.to_string(), "not known to Security Director"))
    }

    /// Publish a changed policy, also pushing it to devices when `update` is set.
    ///
    /// Space answers without a job when there is nothing to publish.
    pub async fn publish_policy(&self, policy: &PolicyRef, update: bool) -> Result<u64> {
        let id = self.policy_id(policy).await?;
        let path = if update {
            "juniper/sd/fwpolicy-management/publish?update=true"
        } else {
            "juniper/sd/fwpolicy-management/publish"
        };
        let body = format!(
            "<publish><policy-ids><policy-id>{}</policy-id></policy-ids></publish>",
            id
        );
        self.start_job(path, SpaceOperation::Publish, body)
            .await
            .map_err(|e| match e {
                Error::UnexpectedReply(_) | Error::Xml(_) => Error::not_found(
                    policy.to_string(),
                    "no policy changes to publish",
                ),
                other => other,
            })
    }

    /// Push pending policy changes to a security device.
    pub async fn update_security_device(&self, device: &DeviceRef) -> Result<u64> {
        let id = self.security_device_id(device).await?;
        let body = format!(
            "<update-devices><sd-ids><id>{}</id></sd-ids>\
<service-types><service-type>POLICY</service-type></service-types>\
<update-options><enable-policy-rematch-srx-only>false</enable-policy-rematch-srx-only></update-options>\
</update-devices>",
            id
        );
        self.start_job(
            "juniper/sd/device-management/update-devices",
            SpaceOperation::UpdateDevices,
            body,
        )
        .await
    }

    /// Create an address variable whose default value is an existing address
    /// object, named or given by IP.
    pub async fn add_variable(
        &self,
        name: &str,
        default_address: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let address = self.address(default_address).await?;
        let body = format!(
            "<variable-definition><name>{}</name><type>ADDRESS</type><description>{}</description>\
<context>DEVICE</context><default-name>{}</default-name>\
<default-value-detail><default-value>{}</default-value></default-value-detail></variable-definition>",
            escape_xml(name),
            escape_xml(description.unwrap_or_default()),
            escape_xml(&address.name),
            address.id
        );
        self.post(
            "juniper/sd/variable-management/variable-definitions",
            SpaceOperation::Variable,
            body,
        )
        .await?;
        Ok(())
    }

    /// Give `variable` the value `address` on `device`.
    ///
    /// Existing per-device values are sent back unchanged along with the new
    /// one, at the edit version Space last reported.
    pub async fn add_variable_member(
        &self,
        variable: &str,
        address: &str,
        device: &DeviceRef,
    ) -> Result<()> {
        let variable_id = self.variable_id(variable).await?;
        let device = self
            .security_devices()
            .await?
            .into_iter()
            .find(|d| device.matches(d.id, &d.name, &d.ip_address))
            .ok_or_else(|| Error::not_found(device.to_string(), "not known to Security Director"))?;
        let address = self.address(address).await?;

        let path = format!(
            "juniper/sd/variable-management/variable-definitions/{}",
            variable_id
        );
        let mut definition = VariableDefinition::parse(&self.get(&path).await?)?;
        definition.values.push(VariableValue {
            device_moid: device_moid(device.id),
            device_name: device.name,
            value: address_moid(address.id),
            value_name: address.name,
        });
        self.put(&path, SpaceOperation::Variable, definition.to_xml())
            .await?;
        Ok(())
    }

    /// Delete a variable object. Space refuses while a policy still uses it.
    pub async fn delete_variable(&self, name: &str) -> Result<()> {
        let id = self.variable_id(name).await?;
        self.delete(
            &format!("juniper/sd/variable-management/variable-definitions/{}", id),
            Some(SpaceOperation::Variable),
        )
        .await
    }
}
