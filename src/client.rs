use google_cloud_storage::client::ClientConfig;
use tracing::{debug, info};

use crate::{adapters, model, util};

/// Builds a client for `provider` from ambient credentials: Application
/// Default Credentials for GCS, the standard AWS environment chain for S3.
pub fn connect(
    provider: util::object::Provider,
) -> Result<Box<dyn adapters::Object>, model::error::StorageError> {
    debug!(scheme = provider.scheme(), "creating client");

    let client: Box<dyn adapters::Object> = match provider {
        util::object::Provider::GCS => {
            let config = util::poll::poll_until_ready_error(ClientConfig::default().with_auth())
                .map_err(|err| {
                    model::error::StorageError::backend(format!(
                        "failed to create gcs client, {}",
                        err
                    ))
                })?;

            Box::new(google_cloud_storage::client::Client::new(config))
        }
        util::object::Provider::AWS => {
            let config = util::poll::poll_until_ready(aws_config::load_from_env());
            Box::new(aws_sdk_s3::Client::new(&config))
        }
    };

    info!(scheme = provider.scheme(), "client ready");
    Ok(client)
}
