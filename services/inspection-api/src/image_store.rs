use crate::config::S3Config;
use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;
use inspection_contracts::record::new_image_id;
use std::time::Duration;
use tracing::{debug, info};

/// Pre-signed URL issuer for the inspection image bucket.
///
/// Image bytes never pass through this service; clients upload and download
/// directly against S3 with short-lived URLs.
pub struct ImageStore {
    client: S3Client,
    bucket: String,
    upload_expiry: Duration,
    download_expiry: Duration,
}

/// A freshly minted upload slot
#[derive(Debug)]
pub struct UploadSlot {
    pub image_id: String,
    pub s3_key: String,
    pub url: String,
    pub expires_in_secs: u64,
}

impl ImageStore {
    pub async fn new(config: &S3Config) -> Result<Self> {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        // Configure custom endpoint for MinIO/LocalStack
        if let Some(ref endpoint_url) = config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        // Force path-style access for MinIO compatibility
        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = S3Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.bucket,
            region = %config.region,
            "Image store initialized"
        );

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            upload_expiry: config.upload_expiry(),
            download_expiry: config.download_expiry(),
        })
    }

    /// Mint a pre-signed PUT URL for a new image of an inspection.
    ///
    /// The object key is derived here; the caller records the returned key
    /// and image id on the inspection record after the client uploads.
    pub async fn presign_upload(
        &self,
        inspection_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<UploadSlot> {
        let image_id = new_image_id();
        let s3_key = object_key(inspection_id, &image_id, file_name);

        debug!(s3_key = %s3_key, content_type, "Minting upload URL");

        let presigning = PresigningConfig::expires_in(self.upload_expiry)
            .context("Failed to create presigning config")?;

        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&s3_key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .context("Failed to presign upload URL")?;

        Ok(UploadSlot {
            image_id,
            s3_key,
            url: presigned.uri().to_string(),
            expires_in_secs: self.upload_expiry.as_secs(),
        })
    }

    /// Mint a pre-signed GET URL for an existing object key
    pub async fn presign_download(&self, s3_key: &str) -> Result<(String, u64)> {
        let presigning = PresigningConfig::expires_in(self.download_expiry)
            .context("Failed to create presigning config")?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(s3_key)
            .presigned(presigning)
            .await
            .context("Failed to presign download URL")?;

        Ok((presigned.uri().to_string(), self.download_expiry.as_secs()))
    }
}

/// Object key layout: inspections/{inspection_id}/{image_id}.{ext}
///
/// The extension carries over from the client's original filename; a name
/// with no extension falls back to "bin".
pub fn object_key(inspection_id: &str, image_id: &str, file_name: &str) -> String {
    let ext = file_name
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty() && ext.len() < file_name.len())
        .unwrap_or("bin");

    format!(
        "inspections/{}/{}.{}",
        sanitize_path_component(inspection_id),
        image_id,
        ext.to_lowercase()
    )
}

fn sanitize_path_component(component: &str) -> String {
    component
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let key = object_key("insp_1a2b3c4d", "img_9f8e7d6c", "front porch.JPG");
        assert_eq!(key, "inspections/insp_1a2b3c4d/img_9f8e7d6c.jpg");
    }

    #[test]
    fn test_object_key_without_extension() {
        let key = object_key("insp_1a2b3c4d", "img_9f8e7d6c", "scan");
        assert_eq!(key, "inspections/insp_1a2b3c4d/img_9f8e7d6c.bin");
    }

    #[test]
    fn test_object_key_sanitizes_inspection_id() {
        let key = object_key("../escape", "img_9f8e7d6c", "a.png");
        assert!(key.starts_with("inspections/___escape/"));
    }
}
