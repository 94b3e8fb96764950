use std::{
    io::{self, Cursor, Read, Write},
    time::Instant,
};

use crate::{model, util};

pub mod gcs;
pub mod mock;
pub mod s3;

/// Primitive operations every storage backend provides.
///
/// Listing calls are bounded by `deadline` and follow pagination until the
/// backend reports no more pages, so the result is always complete.
pub trait Object {
    fn fs_scheme(&self) -> &str;

    fn fs_list_buckets(
        &self,
        project: &str,
        deadline: Instant,
    ) -> Result<Vec<model::object::BucketDescriptor>, model::error::StorageError>;

    /// Objects under `prefix`. With a delimiter, common prefixes follow the
    /// objects as zero-sized descriptors named by the prefix.
    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
        deadline: Instant,
    ) -> Result<Vec<model::object::ObjectDescriptor>, model::error::StorageError>;

    fn fs_head_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::object::ObjectDescriptor>, model::error::StorageError>;

    fn fs_download_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<Vec<u8>>, model::error::StorageError>;

    fn fs_put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), model::error::StorageError>;

    fn fs_open_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectReader + '_>, model::error::StorageError> {
        let path = util::object::object_uri(self.fs_scheme(), bucket, key);

        let head = self.fs_head_object(bucket, key)?.ok_or_else(|| {
            model::error::StorageError::backend(format!("object not found: {}", path))
        })?;

        let data = self.fs_download_object(bucket, key)?.ok_or_else(|| {
            model::error::StorageError::backend(format!("object not found: {}", path))
        })?;

        Ok(Box::new(BufferedReader::new(data, head.size.max(0) as u64)))
    }

    fn fs_open_writer(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn ObjectWriter + '_>, model::error::StorageError> {
        Ok(Box::new(UploadWriter::new(self, bucket, key)))
    }
}

/// Readable object stream with a known total length.
pub trait ObjectReader: Read {
    /// Length reported by the store when the stream was opened.
    fn size(&self) -> u64;

    fn close(&mut self) -> Result<(), model::error::StorageError>;
}

/// Writable object stream. Nothing is durable until `close` succeeds.
pub trait ObjectWriter: Write {
    fn close(&mut self) -> Result<(), model::error::StorageError>;

    /// Releases the stream without committing what was written.
    fn abort(&mut self);
}

pub struct BufferedReader {
    data: Cursor<Vec<u8>>,
    size: u64,
    closed: bool,
}

impl BufferedReader {
    pub fn new(data: Vec<u8>, size: u64) -> Self {
        Self {
            data: Cursor::new(data),
            size,
            closed: false,
        }
    }
}

impl Read for BufferedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::Other, "reader is closed"));
        }
        self.data.read(buf)
    }
}

impl ObjectReader for BufferedReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn close(&mut self) -> Result<(), model::error::StorageError> {
        if self.closed {
            return Err(model::error::StorageError::backend("reader already closed"));
        }
        self.closed = true;
        self.data = Cursor::new(Vec::new());
        Ok(())
    }
}

/// Buffers written bytes and uploads them in one request on `close`.
pub struct UploadWriter<'a, C: Object + ?Sized> {
    client: &'a C,
    bucket: String,
    key: String,
    buf: Vec<u8>,
    done: bool,
}

impl<'a, C: Object + ?Sized> UploadWriter<'a, C> {
    pub fn new(client: &'a C, bucket: &str, key: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
            buf: Vec::new(),
            done: false,
        }
    }
}

impl<C: Object + ?Sized> Write for UploadWriter<'_, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.done {
            return Err(io::Error::new(io::ErrorKind::Other, "writer is closed"));
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<C: Object + ?Sized> ObjectWriter for UploadWriter<'_, C> {
    fn close(&mut self) -> Result<(), model::error::StorageError> {
        if self.done {
            return Err(model::error::StorageError::backend("writer already closed"));
        }
        self.done = true;

        let body = std::mem::take(&mut self.buf);
        self.client.fs_put_object(&self.bucket, &self.key, body)
    }

    fn abort(&mut self) {
        self.done = true;
        self.buf.clear();
    }
}
