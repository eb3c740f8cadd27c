use serde::{Deserialize, Serialize};

/// Request body for minting a signed upload target.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    /// Original filename; kept readable in the generated key.
    #[schema(example = "presets.zip")]
    pub file_name: Option<String>,
    /// Declared MIME type the upload must be sent with.
    #[schema(example = "application/zip")]
    pub file_type: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// Time-limited URL accepting a single PUT of the object.
    pub signed_url: String,
    /// Key to pass back when registering the product.
    #[schema(example = "products/5f0c2a8e-9d1b-4c3e-8f7a-1b2c3d4e5f60-presets.zip")]
    pub file_key: String,
}
