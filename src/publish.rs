use crate::digest::{file_digest, Algorithm};
use crate::error::Error;
use crate::store::{Image, ImageFilters, ImageProperties, ImageUpload, Store, UploadOutcome, Visibility};
use chrono::NaiveDate;
use std::path::Path;
use std::time::Duration;

// label column width of the metadata block
const WIDTH: usize = 10;

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Published { image: Image, deleted: usize },
    UploadFailed,
}

/// `YYYY.MM.DD`, zero padded.
pub fn version(date: NaiveDate) -> String {
    date.format("%Y.%m.%d").to_string()
}

pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Uploads `image_path` as `name` and removes the private images that
/// carried that name before the upload. Old images are only touched
/// once the new one is active.
pub fn publish<S: Store>(
    store: &S,
    image_path: &Path,
    name: &str,
    date: NaiveDate,
    timeout: Duration,
) -> Result<Outcome, Error> {
    info!("Searching for old images");
    let old_images = store.search_images(&ImageFilters::private(name))?;

    info!("Preparing image metadata");
    let filename = image_path.canonicalize()?;
    info!("{:>width$}: {}", "filename", filename.display(), width = WIDTH);
    let version = version(date);
    info!("{:>width$}: {}", "version", version, width = WIDTH);
    let sha256 = file_digest(&filename, Algorithm::Sha256)?;
    info!("{:>width$}: {}", "sha256", sha256.hex, width = WIDTH);
    debug!("hashed {} bytes", sha256.size);
    let md5 = file_digest(&filename, Algorithm::Md5)?;
    info!("{:>width$}: {}", "md5", md5.hex, width = WIDTH);

    let upload = ImageUpload {
        name: name.to_string(),
        filename,
        sha256: sha256.hex,
        md5: md5.hex,
        version,
        visibility: Visibility::Private,
        allow_duplicates: true,
        timeout,
        properties: ImageProperties::default(),
    };

    info!("Uploading image {}", name);
    let image = match store.create_image(&upload)? {
        UploadOutcome::Created(image) => image,
        UploadOutcome::Rejected(reason) => {
            error!("Upload fail: {}", reason);
            return Ok(Outcome::UploadFailed);
        }
    };
    info!("Upload success");

    info!("Old images to delete: {}", old_images.len());
    for old in &old_images {
        info!(
            "Deleting image version:{} id:{}",
            old.os_version.as_deref().unwrap_or("-"),
            old.id
        );
        store.delete_image(&old.id)?;
    }

    Ok(Outcome::Published {
        image,
        deleted: old_images.len(),
    })
}
