use crate::errors::{BundlerError, Result};
use crate::models::api::IpfsResponse;
use crate::models::token::TokenMetadata;
use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use std::{path::Path, time::Duration};

/// Stores token metadata off-chain and returns its URI.
#[async_trait]
pub trait MetadataUploader: Send + Sync {
    async fn upload(&self, metadata: &TokenMetadata) -> Result<String>;
}

/// Uploads through pump.fun's IPFS form endpoint.
pub struct IpfsMetadataUploader {
    client: Client,
    endpoint: String,
}

impl IpfsMetadataUploader {
    pub fn new(endpoint: impl Into<String>) -> Self {
        IpfsMetadataUploader { client: Client::new(), endpoint: endpoint.into() }
    }

    async fn build_form(metadata: &TokenMetadata) -> Result<Form> {
        let mut form = Form::new()
            .text("name", metadata.name.clone())
            .text("symbol", metadata.symbol.clone())
            .text("description", metadata.description.clone())
            .text("showName", metadata.show_name.to_string());

        for (field, value) in metadata.social_links() {
            form = form.text(field, value.to_string());
        }

        if let Some(image) = &metadata.image {
            let path = Path::new(image);
            if path.is_file() {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| BundlerError::Io(format!("Failed to read image {}: {}", image, e)))?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "image".to_string());
                form = form.part("file", Part::bytes(bytes).file_name(file_name));
            } else {
                // Not a local file, so treat it as a URL
                form = form.text("image", image.clone());
            }
        }
        Ok(form)
    }
}

#[async_trait]
impl MetadataUploader for IpfsMetadataUploader {
    async fn upload(&self, metadata: &TokenMetadata) -> Result<String> {
        let form = Self::build_form(metadata).await?;
        debug!("Uploading metadata for {} to {}", metadata.symbol, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("IPFS endpoint failed with status: {}, error: {}", status, error_text);
            return Err(BundlerError::Metadata(format!(
                "upload failed with status {}: {}",
                status, error_text
            )));
        }

        let body: IpfsResponse = response
            .json()
            .await
            .map_err(|e| BundlerError::Metadata(format!("Failed to parse IPFS response: {}", e)))?;
        info!("Metadata uploaded. URI: {}", body.metadata_uri);
        Ok(body.metadata_uri)
    }
}

/// Returns the pre-uploaded URI when present, otherwise uploads.
pub async fn resolve_metadata_uri(uploader: &dyn MetadataUploader, metadata: &TokenMetadata) -> Result<String> {
    match &metadata.metadata_uri {
        Some(uri) => {
            info!("Using pre-uploaded metadata URI {}", uri);
            Ok(uri.clone())
        }
        None => uploader.upload(metadata).await,
    }
}
