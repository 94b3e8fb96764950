use std::{
    io::{self, Read},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    thread,
    time::{Duration, Instant, SystemTime},
};

use crate::{
    adapters::{self, ObjectReader},
    model,
};

struct MockObject {
    bucket: String,
    descriptor: model::object::ObjectDescriptor,
    body: Vec<u8>,
}

/// In-memory store. Objects enumerate in insertion order; overwriting a key
/// keeps its original position.
#[derive(Default)]
pub struct MockClient {
    buckets: Vec<model::object::BucketDescriptor>,
    /// Sleep applied to every listing call before answering.
    list_delay: Option<Duration>,
    fail_list: bool,
    /// Answer listings even when the deadline has passed.
    ignore_deadline: bool,
    fail_put: bool,
    fail_close: bool,
    /// Bytes withheld from every opened reader.
    truncate_reads: u64,
    closed_readers: AtomicUsize,
    objects: Mutex<Vec<MockObject>>,
}

/// Reader handed out by `MockClient`; counts closes on its client.
pub struct MockReader<'a> {
    inner: adapters::BufferedReader,
    client: &'a MockClient,
}

impl Read for MockReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ObjectReader for MockReader<'_> {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn close(&mut self) -> Result<(), model::error::StorageError> {
        self.client.closed_readers.fetch_add(1, Ordering::SeqCst);
        self.inner.close()?;

        if self.client.fail_close {
            return Err(model::error::StorageError::backend(
                "failed to close reader: injected failure",
            ));
        }
        Ok(())
    }
}

impl MockClient {
    pub fn with_bucket(mut self, name: &str) -> Self {
        self.buckets.push(model::object::BucketDescriptor {
            name: name.to_string(),
            location: Some("mock".to_string()),
            created: Some(SystemTime::UNIX_EPOCH),
        });
        self
    }

    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn ignoring_deadline(mut self) -> Self {
        self.ignore_deadline = true;
        self
    }

    pub fn failing_put(mut self) -> Self {
        self.fail_put = true;
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Readers report the stored size but yield `missing` fewer bytes.
    pub fn truncating_reads(mut self, missing: u64) -> Self {
        self.truncate_reads = missing;
        self
    }

    /// Number of `close` calls made on readers from this client.
    pub fn closed_readers(&self) -> usize {
        self.closed_readers.load(Ordering::SeqCst)
    }

    pub fn with_object(
        self,
        bucket: &str,
        key: &str,
        modified_time: SystemTime,
        body: Vec<u8>,
    ) -> Self {
        self.insert(bucket, key, modified_time, body);
        self
    }

    fn insert(&self, bucket: &str, key: &str, modified_time: SystemTime, body: Vec<u8>) {
        let mut objects = match self.objects.lock() {
            Err(poisoned) => poisoned.into_inner(),
            Ok(guard) => guard,
        };

        let descriptor = model::object::ObjectDescriptor {
            key: key.to_string(),
            size: body.len() as i64,
            modified_time,
        };

        match objects
            .iter_mut()
            .find(|o| o.bucket == bucket && o.descriptor.key == key)
        {
            Some(existing) => {
                existing.descriptor = descriptor;
                existing.body = body;
            }
            None => objects.push(MockObject {
                bucket: bucket.to_string(),
                descriptor,
                body,
            }),
        }
    }

    fn wait_for_listing(&self, deadline: Instant) -> Result<(), model::error::StorageError> {
        if let Some(delay) = self.list_delay {
            thread::sleep(delay);
        }

        if self.fail_list {
            return Err(model::error::StorageError::backend(
                "failed to list: injected failure",
            ));
        }

        if !self.ignore_deadline && Instant::now() > deadline {
            return Err(model::error::StorageError::timeout("mock listing"));
        }

        Ok(())
    }
}

impl adapters::Object for MockClient {
    fn fs_scheme(&self) -> &str {
        "mem"
    }

    fn fs_list_buckets(
        &self,
        _project: &str,
        deadline: Instant,
    ) -> Result<Vec<model::object::BucketDescriptor>, model::error::StorageError> {
        self.wait_for_listing(deadline)?;

        Ok(self.buckets.clone())
    }

    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        deadline: Instant,
    ) -> Result<Vec<model::object::ObjectDescriptor>, model::error::StorageError> {
        self.wait_for_listing(deadline)?;

        let objects = self
            .objects
            .lock()
            .map_err(|err| model::error::StorageError::backend(err.to_string()))?;

        let mut items = Vec::new();
        let mut prefixes: Vec<String> = Vec::new();
        for obj in objects.iter() {
            if obj.bucket != bucket || !obj.descriptor.key.starts_with(prefix) {
                continue;
            }

            let rest = &obj.descriptor.key[prefix.len()..];
            let common = delimiter
                .filter(|d| !d.is_empty())
                .and_then(|d| rest.find(d).map(|pos| pos + d.len()));

            match common {
                Some(end) => {
                    let common_prefix = format!("{}{}", prefix, &rest[..end]);
                    if !prefixes.contains(&common_prefix) {
                        prefixes.push(common_prefix);
                    }
                }
                None => items.push(obj.descriptor.clone()),
            }
        }

        items.extend(prefixes.into_iter().map(|key| model::object::ObjectDescriptor {
            key,
            size: 0,
            modified_time: SystemTime::UNIX_EPOCH,
        }));

        Ok(items)
    }

    fn fs_head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::object::ObjectDescriptor>, model::error::StorageError> {
        let objects = self
            .objects
            .lock()
            .map_err(|err| model::error::StorageError::backend(err.to_string()))?;

        Ok(objects
            .iter()
            .find(|o| o.bucket == bucket && o.descriptor.key == key)
            .map(|o| o.descriptor.clone()))
    }

    fn fs_download_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::error::StorageError> {
        let objects = self
            .objects
            .lock()
            .map_err(|err| model::error::StorageError::backend(err.to_string()))?;

        Ok(objects
            .iter()
            .find(|o| o.bucket == bucket && o.descriptor.key == key)
            .map(|o| o.body.clone()))
    }

    fn fs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::error::StorageError> {
        if self.fail_put {
            return Err(model::error::StorageError::backend(format!(
                "failed to put_object at: {}, injected failure",
                key
            )));
        }

        self.insert(bucket, key, SystemTime::now(), body);
        Ok(())
    }

    fn fs_open_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn adapters::ObjectReader + '_>, model::error::StorageError> {
        let not_found = || {
            model::error::StorageError::backend(format!("object not found: mem://{}/{}", bucket, key))
        };

        let head = self.fs_head_object(bucket, key)?.ok_or_else(not_found)?;
        let mut data = self.fs_download_object(bucket, key)?.ok_or_else(not_found)?;

        let keep = data.len().saturating_sub(self.truncate_reads as usize);
        data.truncate(keep);

        Ok(Box::new(MockReader {
            inner: adapters::BufferedReader::new(data, head.size.max(0) as u64),
            client: self,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::adapters::Object;

    fn far() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn keys(objects: Vec<model::object::ObjectDescriptor>) -> Vec<String> {
        objects.into_iter().map(|o| o.key).collect()
    }

    #[test]
    fn test_list_objects_prefix_and_delimiter() {
        let client = MockClient::default()
            .with_object("b", "a/1.csv", SystemTime::UNIX_EPOCH, vec![])
            .with_object("b", "a/x/2.csv", SystemTime::UNIX_EPOCH, vec![])
            .with_object("b", "a/3.csv", SystemTime::UNIX_EPOCH, vec![])
            .with_object("b", "a/x/4.csv", SystemTime::UNIX_EPOCH, vec![])
            .with_object("b", "c/5.csv", SystemTime::UNIX_EPOCH, vec![])
            .with_object("other", "a/6.csv", SystemTime::UNIX_EPOCH, vec![]);

        let cases = vec![
            ("", None, vec!["a/1.csv", "a/x/2.csv", "a/3.csv", "a/x/4.csv", "c/5.csv"]),
            ("a/", None, vec!["a/1.csv", "a/x/2.csv", "a/3.csv", "a/x/4.csv"]),
            ("a/", Some("/"), vec!["a/1.csv", "a/3.csv", "a/x/"]),
            ("", Some("/"), vec!["a/", "c/"]),
            ("z/", None, vec![]),
        ];

        for (prefix, delimiter, expected) in cases {
            let result = keys(client.fs_list_objects("b", prefix, delimiter, far()).unwrap());
            assert_eq!(result, expected, "failed for case: {} {:?}", prefix, delimiter);
        }
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let client = MockClient::default()
            .with_object("b", "first", SystemTime::UNIX_EPOCH, b"1".to_vec())
            .with_object("b", "second", SystemTime::UNIX_EPOCH, b"2".to_vec());

        client.fs_put_object("b", "first", b"one".to_vec()).unwrap();

        let result = keys(client.fs_list_objects("b", "", None, far()).unwrap());
        assert_eq!(result, vec!["first", "second"]);
        assert_eq!(
            client.fs_head_object("b", "first").unwrap().map(|o| o.size),
            Some(3)
        );
    }

    #[test]
    fn test_injected_failures() {
        let client = MockClient::default().failing_list().failing_put();

        assert!(client.fs_list_objects("b", "", None, far()).is_err());
        assert!(client.fs_list_buckets("p", far()).is_err());
        assert!(client.fs_put_object("b", "k", vec![]).is_err());
    }

    #[test]
    fn test_reader_knobs() {
        let client = MockClient::default()
            .with_object("b", "k", SystemTime::UNIX_EPOCH, b"abcdef".to_vec())
            .truncating_reads(2)
            .failing_close();

        let mut reader = client.fs_open_reader("b", "k").unwrap();
        let mut data = Vec::new();
        reader.read_to_end(&mut data).unwrap();

        assert_eq!(reader.size(), 6);
        assert_eq!(data, b"abcd".to_vec());
        assert_eq!(client.closed_readers(), 0);
        assert!(reader.close().is_err());
        assert_eq!(client.closed_readers(), 1);
    }

    #[test]
    fn test_list_ignoring_deadline() {
        let client = MockClient::default()
            .with_object("b", "k", SystemTime::UNIX_EPOCH, vec![])
            .with_list_delay(Duration::from_millis(20))
            .ignoring_deadline();

        let res = client.fs_list_objects("b", "", None, Instant::now());
        assert_eq!(keys(res.unwrap()), vec!["k"]);
    }

    #[test]
    fn test_list_past_deadline() {
        let client = MockClient::default().with_list_delay(Duration::from_millis(20));

        let res = client.fs_list_objects("b", "", None, Instant::now());
        assert!(matches!(
            res,
            Err(model::error::StorageError::Timeout { .. })
        ));
    }
}
