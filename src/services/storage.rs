use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use std::sync::Arc;

/// `(loaded, total)` callback fired as bytes reach storage. Values for one
/// put are monotonic; the final call reports `(total, total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Part size for multipart puts. Objects at or under this go up in a single
/// request.
const PART_SIZE: usize = 8 * 1024 * 1024;

/// The object-storage boundary. The pipeline only requires monotonic
/// progress and a clear success/error terminal signal; everything else about
/// the backing store is opaque.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `data` under `key`, reporting progress along the way. Returns
    /// the key the object was stored under.
    async fn put(&self, key: &str, data: Bytes, on_progress: ProgressFn) -> Result<String>;
    async fn get(&self, key: &str) -> Result<ByteStream>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
}

impl S3ObjectStorage {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(&self, key: &str, data: Bytes, on_progress: ProgressFn) -> Result<String> {
        let total = data.len() as u64;
        on_progress(0, total);

        if data.len() <= PART_SIZE {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .body(ByteStream::from(data.to_vec()))
                .send()
                .await?;
            on_progress(total, total);
            return Ok(key.to_string());
        }

        let multipart = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        let upload_id = multipart
            .upload_id()
            .ok_or_else(|| anyhow::anyhow!("No upload ID"))?;

        let mut completed_parts = Vec::new();
        let mut loaded: u64 = 0;
        for (index, part) in data.chunks(PART_SIZE).enumerate() {
            let part_number = index as i32 + 1;
            let upload_part_res = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .body(ByteStream::from(part.to_vec()))
                .part_number(part_number)
                .send()
                .await?;

            completed_parts.push(
                CompletedPart::builder()
                    .e_tag(upload_part_res.e_tag().unwrap_or_default())
                    .part_number(part_number)
                    .build(),
            );

            loaded += part.len() as u64;
            on_progress(loaded, total);
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed_parts))
                    .build(),
            )
            .send()
            .await?;

        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let res = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(res.body)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }
}
