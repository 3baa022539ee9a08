// Store is responsible for:
// finding images by name and visibility
// registering a new image from a local file
// deleting images by id
//
// The publish workflow only talks to this trait, the glance module
// provides the real implementation.
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Shared,
    Community,
    Public,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Shared => "shared",
            Visibility::Community => "community",
            Visibility::Public => "public",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Queued,
    Saving,
    Uploading,
    Importing,
    Active,
    Deactivated,
    Killed,
    Deleted,
    PendingDelete,
    #[serde(other)]
    Unknown,
}

impl ImageStatus {
    /// Statuses an upload can no longer recover from.
    pub fn is_failed(self) -> bool {
        match self {
            ImageStatus::Deactivated
            | ImageStatus::Killed
            | ImageStatus::Deleted
            | ImageStatus::PendingDelete => true,
            _ => false,
        }
    }
}

/// An image record as the image service reports it. Only the fields
/// this tool reads are decoded.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub status: ImageStatus,
    pub visibility: Visibility,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(rename = "owner_specified.openstack.sha256", default)]
    pub owner_sha256: Option<String>,
    #[serde(rename = "owner_specified.openstack.md5", default)]
    pub owner_md5: Option<String>,
}

/// The only filters ever sent with a search.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFilters {
    pub name: String,
    pub visibility: Visibility,
}

impl ImageFilters {
    pub fn private(name: &str) -> ImageFilters {
        ImageFilters {
            name: name.to_string(),
            visibility: Visibility::Private,
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("visibility", self.visibility.as_str().to_string()),
        ]
    }
}

/// Fixed hardware and OS metadata attached to every published image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageProperties {
    pub architecture: String,
    pub disk_format: String,
    pub container_format: String,
    pub hw_disk_bus: String,
    pub hw_firmware_type: String,
    pub hw_video_model: String,
    pub hw_vif_model: String,
    /// GiB
    pub min_disk: u32,
    /// MiB
    pub min_ram: u32,
    pub os_distro: String,
    pub os_type: String,
}

impl Default for ImageProperties {
    fn default() -> ImageProperties {
        ImageProperties {
            architecture: "x86_64".to_string(),
            disk_format: "qcow2".to_string(),
            container_format: "bare".to_string(),
            hw_disk_bus: "virtio".to_string(),
            hw_firmware_type: "uefi".to_string(),
            hw_video_model: "virtio".to_string(),
            hw_vif_model: "virtio".to_string(),
            min_disk: 2,
            min_ram: 1,
            os_distro: "arch".to_string(),
            os_type: "linux".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub name: String,
    pub filename: PathBuf,
    pub sha256: String,
    pub md5: String,
    /// goes into os_version
    pub version: String,
    pub visibility: Visibility,
    pub allow_duplicates: bool,
    pub timeout: Duration,
    pub properties: ImageProperties,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Created(Image),
    /// The service answered but did not end up with an active image.
    Rejected(String),
}

pub trait Store {
    fn search_images(&self, filters: &ImageFilters) -> Result<Vec<Image>, Error>;
    fn create_image(&self, upload: &ImageUpload) -> Result<UploadOutcome, Error>;
    fn delete_image(&self, id: &str) -> Result<(), Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_query() {
        let filters = ImageFilters::private("punoko");
        assert_eq!(
            filters.query(),
            vec![
                ("name", "punoko".to_string()),
                ("visibility", "private".to_string())
            ]
        );
    }

    #[test]
    fn test_decode_image() {
        let image: Image = serde_json::from_str(
            r#"{
                "id": "1bea47ed-f6a9-463b-b423-14b9cca9ad27",
                "name": "punoko",
                "status": "active",
                "visibility": "private",
                "os_version": "2024.01.31",
                "checksum": "900150983cd24fb0d6963f7d28e17f72",
                "os_hash_algo": "sha512",
                "owner_specified.openstack.sha256": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
                "min_disk": 2,
                "tags": []
            }"#,
        )
        .unwrap();
        assert_eq!(image.id, "1bea47ed-f6a9-463b-b423-14b9cca9ad27");
        assert_eq!(image.status, ImageStatus::Active);
        assert_eq!(image.visibility, Visibility::Private);
        assert_eq!(image.os_version.as_deref(), Some("2024.01.31"));
        assert_eq!(image.owner_md5, None);
        assert!(image.owner_sha256.is_some());
    }

    #[test]
    fn test_unknown_status() {
        let image: Image = serde_json::from_str(
            r#"{"id": "x", "name": null, "status": "uploading-somewhere", "visibility": "shared"}"#,
        )
        .unwrap();
        assert_eq!(image.status, ImageStatus::Unknown);
        assert!(!image.status.is_failed());
        assert_eq!(image.name, None);
    }

    #[test]
    fn test_failed_statuses() {
        assert!(ImageStatus::Killed.is_failed());
        assert!(ImageStatus::Deactivated.is_failed());
        assert!(!ImageStatus::Active.is_failed());
        assert!(!ImageStatus::Queued.is_failed());
    }
}
