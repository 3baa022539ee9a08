// Glance v2 implementation of Store.
use crate::error::Error;
use crate::session::Session;
use crate::store::{Image, ImageFilters, ImageStatus, ImageUpload, Store, UploadOutcome};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs::File;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Deserialize, Debug)]
struct ImageList {
    images: Vec<Image>,
}

pub struct GlanceStore {
    session: Session,
}

impl GlanceStore {
    pub fn new(session: Session) -> GlanceStore {
        GlanceStore { session }
    }

    fn get_image(&self, id: &str) -> Result<Image, Error> {
        Ok(self
            .session
            .get(&format!("images/{}", id))
            .send()?
            .error_for_status()?
            .json()?)
    }

    /// An already active image with the same name and checksums, if any.
    fn find_duplicate(&self, upload: &ImageUpload) -> Result<Option<Image>, Error> {
        let filters = ImageFilters {
            name: upload.name.clone(),
            visibility: upload.visibility,
        };
        Ok(self.search_images(&filters)?.into_iter().find(|image| {
            image.status == ImageStatus::Active
                && image.owner_sha256.as_deref() == Some(upload.sha256.as_str())
                && image.owner_md5.as_deref() == Some(upload.md5.as_str())
        }))
    }

    /// Sends the file and waits for the image to settle. Shares `deadline`
    /// with the POST that created the record.
    fn upload_data(&self, upload: &ImageUpload, id: &str, deadline: Instant) -> Result<UploadOutcome, Error> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::from_secs(0) {
            return Err(timed_out(id, upload.timeout));
        }
        let file = File::open(&upload.filename)?;
        self.session
            .put(&format!("images/{}/file", id))
            .header("Content-Type", "application/octet-stream")
            .timeout(remaining)
            .body(file)
            .send()?
            .error_for_status()?;
        debug!("uploaded data for {}", id);

        self.wait_for_image(id, deadline, upload.timeout)
    }

    /// Polls until the image leaves the queued/saving states or `deadline` passes.
    fn wait_for_image(&self, id: &str, deadline: Instant, timeout: Duration) -> Result<UploadOutcome, Error> {
        loop {
            let image = self.get_image(id)?;
            debug!("image {} is {:?}", id, image.status);
            if let Some(outcome) = poll_outcome(image) {
                return Ok(outcome);
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out(id, timeout));
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

fn timed_out(id: &str, timeout: Duration) -> Error {
    Error::UploadTimeout {
        id: id.to_string(),
        secs: timeout.as_secs(),
    }
}

/// `None` while the image is still on its way to a terminal status.
fn poll_outcome(image: Image) -> Option<UploadOutcome> {
    if image.status == ImageStatus::Active {
        Some(UploadOutcome::Created(image))
    } else if image.status.is_failed() {
        Some(UploadOutcome::Rejected(format!(
            "image {} ended up {:?}",
            image.id, image.status
        )))
    } else {
        None
    }
}

/// Body for `POST /v2/images`. Extra properties sit at the top level in v2.
fn create_body(upload: &ImageUpload) -> Value {
    let p = &upload.properties;
    json!({
        "name": upload.name,
        "visibility": upload.visibility,
        "disk_format": p.disk_format,
        "container_format": p.container_format,
        "min_disk": p.min_disk,
        "min_ram": p.min_ram,
        "architecture": p.architecture,
        "hw_disk_bus": p.hw_disk_bus,
        "hw_firmware_type": p.hw_firmware_type,
        "hw_video_model": p.hw_video_model,
        "hw_vif_model": p.hw_vif_model,
        "os_distro": p.os_distro,
        "os_type": p.os_type,
        "os_version": upload.version,
        "owner_specified.openstack.md5": upload.md5,
        "owner_specified.openstack.sha256": upload.sha256,
        "owner_specified.openstack.object": format!("images/{}", upload.name),
    })
}

impl Store for GlanceStore {
    fn search_images(&self, filters: &ImageFilters) -> Result<Vec<Image>, Error> {
        // single page, the filters keep the result small
        let list: ImageList = self
            .session
            .get("images")
            .query(&filters.query())
            .send()?
            .error_for_status()?
            .json()?;
        Ok(list.images)
    }

    fn create_image(&self, upload: &ImageUpload) -> Result<UploadOutcome, Error> {
        if !upload.allow_duplicates {
            if let Some(existing) = self.find_duplicate(upload)? {
                info!("Image with identical checksums exists: {}", existing.id);
                return Ok(UploadOutcome::Created(existing));
            }
        }

        let deadline = Instant::now() + upload.timeout;
        let image: Image = self
            .session
            .post("images")
            .json(&create_body(upload))
            .send()?
            .error_for_status()?
            .json()?;
        debug!("created image record {}", image.id);

        // a record without data would show up in the next search, drop it
        let result = self.upload_data(upload, &image.id, deadline);
        if result.is_err() {
            if let Err(err) = self.delete_image(&image.id) {
                debug!("could not remove image {}: {}", image.id, err);
            }
        }
        result
    }

    fn delete_image(&self, id: &str) -> Result<(), Error> {
        self.session
            .delete(&format!("images/{}", id))
            .send()?
            .error_for_status()?;
        Ok(())
    }
}
