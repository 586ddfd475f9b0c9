//! Durable binary-asset collaborator.
//!
//! Raw uploads arrive from clients as base64 data-URIs; anything else in
//! the image field is already a durable reference and passes through the
//! pipeline untouched. Upload failures abort the send before persistence.

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use uuid::Uuid;

use crate::config::S3Config;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload raw image bytes and return the durable public URL.
    async fn store_image(&self, data: Vec<u8>, content_type: &str) -> AppResult<String>;
}

/// Whether an image field carries a raw upload rather than a durable
/// reference.
pub fn is_raw_upload(value: &str) -> bool {
    value.starts_with("data:")
}

/// Split a base64 data-URI into payload bytes and content type.
pub fn decode_data_uri(value: &str) -> AppResult<(Vec<u8>, String)> {
    let rest = value
        .strip_prefix("data:")
        .ok_or_else(|| AppError::BadRequest("image is not a data URI".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::BadRequest("malformed data URI".into()))?;
    if !meta.ends_with(";base64") {
        return Err(AppError::BadRequest("image data URI must be base64".into()));
    }

    let content_type = match meta.trim_end_matches(";base64") {
        "" => "application/octet-stream".to_string(),
        ct => ct.to_string(),
    };
    let data = BASE64
        .decode(payload)
        .map_err(|e| AppError::BadRequest(format!("image base64 decode: {e}")))?;
    Ok((data, content_type))
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// S3-backed asset store.
pub struct S3AssetStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    public_base_url: Option<String>,
}

impl S3AssetStore {
    pub async fn from_config(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;

        Self {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[async_trait]
impl AssetStore for S3AssetStore {
    async fn store_image(&self, data: Vec<u8>, content_type: &str) -> AppResult<String> {
        let key = format!(
            "chat-media/{}.{}",
            Uuid::new_v4(),
            extension_for(content_type)
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| AppError::AssetStore(e.to_string()))?;

        tracing::info!(key = %key, "image uploaded to asset store");
        Ok(self.object_url(&key))
    }
}
