use crate::model::error::StorageError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    AWS,
    GCS,
}

impl Provider {
    pub fn is_aws(&self) -> bool {
        matches!(self, Provider::AWS)
    }

    pub fn is_gcs(&self) -> bool {
        matches!(self, Provider::GCS)
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Provider::AWS => "s3",
            Provider::GCS => "gs",
        }
    }
}

/// A `scheme://bucket/key` location split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectLocation {
    pub provider: Provider,
    pub bucket: String,
    pub key: String,
}

pub fn parse_provider_from_uri(bucket_uri: &str) -> Result<Provider, StorageError> {
    if bucket_uri.starts_with("s3://") {
        Ok(Provider::AWS)
    } else if bucket_uri.starts_with("gs://") {
        Ok(Provider::GCS)
    } else {
        Err(StorageError::invalid(format!(
            "failed to parse provider of: {}",
            bucket_uri
        )))
    }
}

pub fn parse_bucket_from_uri(bucket_uri: &str) -> &str {
    let rest = bucket_uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or("");

    rest.split_once('/').map(|(bucket, _)| bucket).unwrap_or(rest)
}

pub fn parse_key_from_uri(object_uri: &str) -> &str {
    object_uri
        .split_once("://")
        .and_then(|(_, rest)| rest.split_once('/'))
        .map(|(_, key)| key)
        .unwrap_or("")
}

pub fn parse_object_uri(object_uri: &str) -> Result<ObjectLocation, StorageError> {
    let provider = parse_provider_from_uri(object_uri)?;
    let bucket = parse_bucket_from_uri(object_uri);
    if bucket.is_empty() {
        return Err(StorageError::invalid(format!(
            "missing bucket in: {}",
            object_uri
        )));
    }

    Ok(ObjectLocation {
        provider,
        bucket: bucket.to_string(),
        key: parse_key_from_uri(object_uri).to_string(),
    })
}

pub fn object_uri(scheme: &str, bucket: &str, key: &str) -> String {
    format!("{}://{}/{}", scheme, bucket, key)
}
