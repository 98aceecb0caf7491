//! S3-backed storage for uploaded catalogs and campaign images.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::store::{BlobError, BlobStore};

/// Characters left as-is in the path of a public object URL.
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    region: String,
}

impl S3BlobStore {
    /// Loads AWS credentials from the default provider chain.
    pub async fn new(bucket: &str, region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_owned()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
            bucket: bucket.to_owned(),
            region: region.to_owned(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| BlobError::Backend(format!("failed to upload {key}: {e}")))?;
        tracing::debug!(bucket = %self.bucket, key, size, "uploaded object");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    BlobError::NotFound(key.to_owned())
                } else {
                    BlobError::Backend(format!("failed to download {key}: {service}"))
                }
            })?;

        let bytes = result
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Backend(format!("failed to read {key}: {e}")))?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| BlobError::Backend(format!("failed to delete {key}: {e}")))?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        object_url(&self.bucket, &self.region, key)
    }
}

fn object_url(bucket: &str, region: &str, key: &str) -> String {
    format!(
        "https://{bucket}.s3.{region}.amazonaws.com/{}",
        utf8_percent_encode(key, KEY_ENCODE_SET)
    )
}
