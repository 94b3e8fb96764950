use std::time::{Duration, Instant, SystemTime};

use tracing::debug;

use crate::{adapters, model, util};

fn to_system_time(dt: Option<&aws_sdk_s3::primitives::DateTime>) -> SystemTime {
    match dt {
        Some(dt) if dt.secs() >= 0 => {
            SystemTime::UNIX_EPOCH + Duration::new(dt.secs() as u64, dt.subsec_nanos())
        }
        _ => SystemTime::UNIX_EPOCH,
    }
}

impl adapters::Object for aws_sdk_s3::Client {
    fn fs_scheme(&self) -> &str {
        util::object::Provider::AWS.scheme()
    }

    fn fs_list_buckets(
        &self,
        project: &str,
        deadline: Instant,
    ) -> Result<Vec<model::object::BucketDescriptor>, model::error::StorageError> {
        // S3 buckets belong to the account, not to a project.
        debug!(project = project, "ignoring project for s3 list_buckets");

        let lb = util::poll::poll_until_deadline(self.list_buckets().send(), deadline)
            .ok_or_else(|| model::error::StorageError::timeout("list_buckets"))?
            .map_err(|err| {
                model::error::StorageError::backend(format!("failed to list_buckets, {}", err))
            })?;

        Ok(lb
            .buckets()
            .iter()
            .map(|b| model::object::BucketDescriptor {
                name: b.name().unwrap_or("").to_string(),
                location: None,
                created: b.creation_date().map(|dt| to_system_time(Some(dt))),
            })
            .collect())
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
        let mut continuation_token: Option<String> = None;

        loop {
            let mut req = self.list_objects_v2().bucket(bucket).prefix(prefix);

            if let Some(d) = delimiter {
                req = req.delimiter(d);
            }

            if let Some(tok) = continuation_token {
                req = req.continuation_token(tok);
            }

            let lo = util::poll::poll_until_deadline(req.send(), deadline)
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

            for o in lo.contents() {
                objects.push(model::object::ObjectDescriptor {
                    key: o.key().unwrap_or("").to_string(),
                    size: o.size().unwrap_or(0),
                    modified_time: to_system_time(o.last_modified()),
                });
            }

            for p in lo.common_prefixes() {
                if let Some(p) = p.prefix() {
                    prefixes.push(p.to_string());
                }
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
            if continuation_token.is_none() {
                break;
            }
        }

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
        let req = self.head_object().bucket(bucket).key(key);

        let ho = match util::poll::poll_until_ready_error(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_not_found() {
                        return Ok(None);
                    }
                }

                return Err(model::error::StorageError::backend(format!(
                    "failed to head_object: {}, {}",
                    key, err
                )));
            }
            Ok(ho) => ho,
        };

        Ok(Some(model::object::ObjectDescriptor {
            key: key.to_string(),
            size: ho.content_length().unwrap_or(0),
            modified_time: to_system_time(ho.last_modified()),
        }))
    }

    fn fs_download_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::error::StorageError> {
        let req = self.get_object().bucket(bucket).key(key);

        let o = match util::poll::poll_until_ready_error(req.send()) {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Ok(None);
                    }
                }

                return Err(model::error::StorageError::backend(format!(
                    "failed to get_object: {}, {}",
                    key, err
                )));
            }
            Ok(o) => o,
        };

        let bytes = util::poll::poll_until_ready_error(o.body.collect()).map_err(|err| {
            model::error::StorageError::backend(format!(
                "failed to collect body: {}, {}",
                key, err
            ))
        })?;

        Ok(Some(bytes.into_bytes().to_vec()))
    }

    fn fs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::error::StorageError> {
        let req = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body));

        util::poll::poll_until_ready_error(req.send()).map_err(|err| {
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

    use aws_sdk_s3::primitives::DateTime;

    #[test]
    fn test_to_system_time() {
        let cases = vec![
            (None, SystemTime::UNIX_EPOCH),
            (
                Some(DateTime::from_secs(120)),
                SystemTime::UNIX_EPOCH + Duration::from_secs(120),
            ),
            (
                Some(DateTime::from_secs_and_nanos(1, 500)),
                SystemTime::UNIX_EPOCH + Duration::new(1, 500),
            ),
            (Some(DateTime::from_secs(-5)), SystemTime::UNIX_EPOCH),
        ];

        for (input, expected) in cases {
            assert_eq!(
                to_system_time(input.as_ref()),
                expected,
                "failed for case: {:?}",
                input
            );
        }
    }
}
