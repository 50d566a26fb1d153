use anyhow::{anyhow, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::time::Duration;
use url::Url;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    public_endpoint: Option<String>,
}

#[derive(Debug)]
pub struct PresignedPut {
    pub url: String,
    pub headers: Vec<(String, String)>,
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
        let s3_config = s3_builder.build();

        let client = Client::from_conf(s3_config);

        Ok(Self {
            client,
            bucket: config.s3_bucket.clone(),
            public_endpoint: config.s3_public_endpoint.clone(),
        })
    }

    pub async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        bytes: i64,
        expires_in_seconds: u64,
    ) -> Result<PresignedPut> {
        let presign_config = PresigningConfig::expires_in(Duration::from_secs(expires_in_seconds))?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(bytes)
            .presigned(presign_config)
            .await?;

        let headers = presigned
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let mut url = presigned.uri().to_string();
        if let Some(ref public_endpoint) = self.public_endpoint {
            match rewrite_presigned_url(&url, public_endpoint) {
                Ok(rewritten) => url = rewritten,
                Err(err) => tracing::warn!(error = ?err, "failed to rewrite presigned upload URL"),
            }
        }

        Ok(PresignedPut { url, headers })
    }
}

/// Points a presigned URL at the externally reachable endpoint while keeping
/// its path and signed query string.
fn rewrite_presigned_url(original: &str, public_endpoint: &str) -> Result<String> {
    let mut original_url = Url::parse(original)?;
    let public_url = if public_endpoint.contains("://") {
        Url::parse(public_endpoint)?
    } else {
        Url::parse(&format!("http://{}", public_endpoint))?
    };

    original_url
        .set_scheme(public_url.scheme())
        .map_err(|_| anyhow!("invalid scheme for public endpoint"))?;
    original_url
        .set_host(public_url.host_str())
        .map_err(|_| anyhow!("invalid host for public endpoint"))?;
    original_url.set_port(public_url.port()).ok();

    Ok(original_url.to_string())
}

#[cfg(test)]
mod tests {
    use super::rewrite_presigned_url;

    #[test]
    fn rewrite_keeps_path_and_signature() {
        let rewritten = rewrite_presigned_url(
            "http://localstack:4566/bucket/chat/a.png?X-Amz-Signature=abc",
            "https://files.example.org",
        )
        .unwrap();
        assert_eq!(
            rewritten,
            "https://files.example.org/bucket/chat/a.png?X-Amz-Signature=abc"
        );
    }

    #[test]
    fn rewrite_accepts_bare_host_with_port() {
        let rewritten =
            rewrite_presigned_url("http://internal:4566/b/k?sig=1", "localhost:9000").unwrap();
        assert_eq!(rewritten, "http://localhost:9000/b/k?sig=1");
    }
}
