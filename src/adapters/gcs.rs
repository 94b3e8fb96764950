use std::time::{Instant, SystemTime};

use google_cloud_storage::http::{
    buckets::list::ListBucketsRequest,
    objects::{
        download::Range,
        get::GetObjectRequest,
        list::ListObjectsRequest,
        upload::{Media, UploadObjectRequest, UploadType},
    },
};
use tracing::debug;

use crate::{adapters, model, util};

fn to_system_time(t: Option<time::OffsetDateTime>) -> SystemTime {
    t.map(SystemTime::from).unwrap_or(SystemTime::UNIX_EPOCH)
}

fn is_not_found(err: &google_cloud_storage::http::Error) -> bool {
    matches!(err, google_cloud_storage::http::Error::Response(resp) if resp.code == 404)
}

impl adapters::Object for google_cloud_storage::client::Client {
    fn fs_scheme(&self) -> &str {
        util::object::Provider::GCS.scheme()
    }

    fn fs_list_buckets(
        &self,
        project: &str,
        deadline: Instant,
    ) -> Result<Vec<model::object::BucketDescriptor>, model::error::StorageError> {
        let mut buckets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let req = ListBucketsRequest {
                project: project.to_string(),
                page_token: page_token.clone(),
                ..Default::default()
            };

            let lb = util::poll::poll_until_deadline(self.list_buckets(&req), deadline)
                .ok_or_else(|| {
                    model::error::StorageError::timeout(format!(
                        "list_buckets for project: {}",
                        project
                    ))
                })?
                .map_err(|err| {
                    model::error::StorageError::backend(format!(
                        "failed to list_buckets for project: {}, {}",
                        project, err
                    ))
                })?;

            for b in lb.items {
                buckets.push(model::object::BucketDescriptor {
                    name: b.name,
                    location: Some(b.location),
                    created: b.time_created.map(SystemTime::from),
                });
            }

            page_token = lb.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(buckets)
    }

    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        deadline: Instant,
    ) -> Result<Vec<model::object::ObjectDescriptor>, model::error::StorageError> {
        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let req = ListObjectsRequest {
                bucket: bucket.to_string(),
                prefix: Some(prefix.to_string()),
                delimiter: delimiter.map(|d| d.to_string()),
                page_token: page_token.clone(),
                ..Default::default()
            };

            let lo = util::poll::poll_until_deadline(self.list_objects(&req), deadline)
                .ok_or_else(|| {
                    model::error::StorageError::timeout(format!(
                        "list_objects at: {}",
                        util::object::object_uri(self.fs_scheme(), bucket, prefix)
                    ))
                })?
                .map_err(|err| {
                    model::error::StorageError::backend(format!(
                        "failed to list_objects at: {}, {}",
                        prefix, err
                    ))
                })?;

            if let Some(objs) = lo.items {
                for obj in objs {
                    objects.push(model::object::ObjectDescriptor {
                        key: obj.name,
                        size: obj.size,
                        modified_time: to_system_time(obj.updated),
                    });
                }
            }

            if let Some(p) = lo.prefixes {
                prefixes.extend(p);
            }

            page_token = lo.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(
            count = objects.len(),
            prefixes = prefixes.len(),
            "gcs list_objects done"
        );

        objects.extend(prefixes.into_iter().map(|key| model::object::ObjectDescriptor {
            key,
            size: 0,
            modified_time: SystemTime::UNIX_EPOCH,
        }));

        Ok(objects)
    }

    fn fs_head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::object::ObjectDescriptor>, model::error::StorageError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };

        let obj = match util::poll::poll_until_ready_error(self.get_object(&req)) {
            Err(err) if is_not_found(&err) => return Ok(None),
            Err(err) => {
                return Err(model::error::StorageError::backend(format!(
                    "failed to head_object: {}, {}",
                    key, err
                )));
            }
            Ok(obj) => obj,
        };

        Ok(Some(model::object::ObjectDescriptor {
            key: obj.name,
            size: obj.size,
            modified_time: to_system_time(obj.updated),
        }))
    }

    fn fs_download_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::error::StorageError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: key.to_string(),
            ..Default::default()
        };

        match util::poll::poll_until_ready_error(self.download_object(&req, &Range::default())) {
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(model::error::StorageError::backend(format!(
                "failed to download_object: {}, {}",
                key, err
            ))),
            Ok(bytes) => Ok(Some(bytes)),
        }
    }

    fn fs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::error::StorageError> {
        let req = UploadObjectRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };

        util::poll::poll_until_ready_error(self.upload_object(
            &req,
            body,
            &UploadType::Simple(Media::new(key.to_string())),
        ))
        .map_err(|err| {
            model::error::StorageError::backend(format!(
                "failed to put_object at: {}, {}",
                key, err
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_to_system_time() {
        let cases = vec![
            (None, SystemTime::UNIX_EPOCH),
            (
                Some(time::OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(90)),
                SystemTime::UNIX_EPOCH + Duration::from_secs(90),
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(to_system_time(input), expected, "failed for case: {:?}", input);
        }
    }
}
