//! Software image management.

use super::{DeviceRef, SpaceClient, SpaceOperation};
use crate::error::{Error, Result};
use crate::xml::{list, text};
use roxmltree::Document;
use serde::Serialize;

/// A software image held by Space.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SoftwarePackage {
    pub id: u64,
    pub file_name: String,
    pub version: String,
    pub platform: String,
}

/// Options for a software deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftwareUpgrade {
    /// Use an image already staged on the device
    pub use_downloaded: bool,
    /// Check compatibility with the current configuration
    pub validate: bool,
    /// Reboot after adding the package
    pub reboot: bool,
    /// Minutes to wait before rebooting
    pub reboot_after: u32,
    /// Remove packages already on the device first
    pub cleanup: bool,
    /// Remove the package after a successful install
    pub remove_after: bool,
}

fn device_href(id: u64) -> String {
    format!("/api/space/device-management/devices/{}", id)
}

fn parse_packages(body: &str) -> Result<Vec<SoftwarePackage>> {
    let doc = Document::parse(body)?;
    Ok(list(doc.root_element(), "package", |p| SoftwarePackage {
        id: p
            .attribute("key")
            .and_then(|k| k.parse().ok())
            .unwrap_or_default(),
        file_name: text(p, "fileName"),
        version: text(p, "version"),
        platform: text(p, "platformType"),
    }))
}

fn deploy_xml(device: u64, options: &SoftwareUpgrade) -> String {
    format!(
        "<exec-deploy><devices><device href=\"{}\"/></devices><deployOptions>\
<useAlreadyDownloaded>{}</useAlreadyDownloaded><validate>{}</validate>\
<bestEffortLoad>false</bestEffortLoad><snapShotRequired>false</snapShotRequired>\
<rebootDevice>{}</rebootDevice><rebootAfterXMinutes>{}</rebootAfterXMinutes>\
<cleanUpExistingOnDevice>{}</cleanUpExistingOnDevice>\
<removePkgAfterInstallation>{}</removePkgAfterInstallation>\
</deployOptions></exec-deploy>",
        device_href(device),
        options.use_downloaded,
        options.validate,
        options.reboot,
        options.reboot_after,
        options.cleanup,
        options.remove_after
    )
}

impl SpaceClient {
    /// Every software image Space holds.
    pub async fn software(&self) -> Result<Vec<SoftwarePackage>> {
        let body = self.get("space/software-management/packages").await?;
        parse_packages(&body)
    }

    /// Space id of the image with this file name.
    pub async fn package_id(&self, image: &str) -> Result<u64> {
        self.software()
            .await?
            .into_iter()
            .find(|p| p.file_name == image)
            .map(|p| p.id)
            .ok_or_else(|| Error::not_found(format!("image {}", image), "not held by Junos Space"))
    }

    /// Install `image` on a device. Returns the job id.
    pub async fn deploy_software(
        &self,
        device: &DeviceRef,
        image: &str,
        options: &SoftwareUpgrade,
    ) -> Result<u64> {
        let device = self.device_id(device).await?;
        let package = self.package_id(image).await?;
        self.start_job(
            &format!("space/software-management/packages/{}/exec-deploy", package),
            SpaceOperation::ExecDeploy,
            deploy_xml(device, options),
        )
        .await
    }

    /// Copy `image` to the device's `/var/tmp` without installing it.
    pub async fn stage_software(&self, device: &DeviceRef, image: &str, cleanup: bool) -> Result<u64> {
        let device = self.device_id(device).await?;
        let package = self.package_id(image).await?;
        let body = format!(
            "<exec-stage><devices><device href=\"{}\"/></devices>\
<stageOptions><cleanUpExistingOnDevice>{}</cleanUpExistingOnDevice></stageOptions></exec-stage>",
            device_href(device),
            cleanup
        );
        self.start_job(
            &format!("space/software-management/packages/{}/exec-stage", package),
            SpaceOperation::ExecStage,
            body,
        )
        .await
    }

    /// Delete a staged image from the device.
    pub async fn remove_staged_software(&self, device: &DeviceRef, image: &str) -> Result<u64> {
        let device = self.device_id(device).await?;
        let package = self.package_id(image).await?;
        let body = format!(
            "<exec-remove><devices><device href=\"{}\"/></devices></exec-remove>",
            device_href(device)
        );
        self.start_job(
            &format!("space/software-management/packages/{}/exec-remove", package),
            SpaceOperation::ExecRemove,
            body,
        )
        .await
    }
}
