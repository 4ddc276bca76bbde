use anyhow::Result;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::config::AppConfig;

/// Prefix uploaded post images are stored under.
pub const POSTS_PREFIX: &str = "posts";

#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
}

impl ObjectStorage {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.s3_region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .endpoint_url(config.s3_endpoint.clone())
            .force_path_style(true);
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let client = Client::from_conf(s3_builder.build());

        Ok(Self {
            client,
            bucket: config.s3_bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Stores an uploaded post image verbatim, preserving the submitted
    /// filename, and returns the object key.
    pub async fn store_post_image(
        &self,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<String> {
        let key = format!("{}/{}", POSTS_PREFIX, filename);
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data));
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        request.send().await?;
        Ok(key)
    }
}
