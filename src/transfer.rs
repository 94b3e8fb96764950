use std::io::{Read, Write};

use tracing::{debug, error, info, span, Level};

use crate::{
    adapters,
    model::{error::StorageError, object::Table},
    util,
};

pub fn open_reader<'a>(
    client: &'a dyn adapters::Object,
    bucket: &str,
    key: &str,
) -> Result<Box<dyn adapters::ObjectReader + 'a>, StorageError> {
    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    debug!(path = %path, "loading object reader");

    client.fs_open_reader(bucket, key).map_err(|err| {
        error!(error_message=%err, error_group="open_reader", path=%path);
        err
    })
}

pub fn open_writer<'a>(
    client: &'a dyn adapters::Object,
    bucket: &str,
    key: &str,
) -> Result<Box<dyn adapters::ObjectWriter + 'a>, StorageError> {
    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    debug!(path = %path, "getting object writer");

    client.fs_open_writer(bucket, key).map_err(|err| {
        error!(error_message=%err, error_group="open_writer", path=%path);
        err
    })
}

/// Runs `f` against a freshly opened reader and closes it on every path.
/// A failed close is logged; the outcome of `f` stands.
fn with_reader<'a, T, F>(
    client: &'a dyn adapters::Object,
    bucket: &str,
    key: &str,
    f: F,
) -> Result<T, StorageError>
where
    F: FnOnce(&mut (dyn adapters::ObjectReader + 'a)) -> Result<T, StorageError>,
{
    let mut reader = open_reader(client, bucket, key)?;

    let result = f(&mut *reader);

    if let Err(err) = reader.close() {
        let path = util::object::object_uri(client.fs_scheme(), bucket, key);
        error!(error_message=%err, error_group="close", path=%path);
    }

    result
}

/// Runs `f` against a freshly opened writer. The writer is committed only if
/// `f` succeeds; otherwise it is aborted.
fn with_writer<'a, T, F>(
    client: &'a dyn adapters::Object,
    bucket: &str,
    key: &str,
    f: F,
) -> Result<T, StorageError>
where
    F: FnOnce(&mut (dyn adapters::ObjectWriter + 'a)) -> Result<T, StorageError>,
{
    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    let mut writer = open_writer(client, bucket, key)?;

    let value = match f(&mut *writer) {
        Err(err) => {
            writer.abort();
            error!(error_message=%err, error_group="write", path=%path);
            return Err(err);
        }
        Ok(value) => value,
    };

    writer.close().map_err(|err| {
        error!(error_message=%err, error_group="close", path=%path);
        StorageError::IncompleteWrite {
            path: path.clone(),
            message: err.to_string(),
        }
    })?;

    Ok(value)
}

pub fn read_bytes(
    client: &dyn adapters::Object,
    bucket: &str,
    key: &str,
) -> Result<Vec<u8>, StorageError> {
    let span = span!(Level::INFO, "read_bytes", context = "read_bytes");
    let _e = span.enter();

    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    debug!(path = %path, "reading object");

    let data = with_reader(client, bucket, key, |reader| {
        let size = reader.size();
        let mut data = Vec::with_capacity(size as usize);

        reader.read_to_end(&mut data).map_err(|err| {
            StorageError::backend(format!("failed to read: {}, {}", path, err))
        })?;

        if (data.len() as u64) < size {
            return Err(StorageError::backend(format!(
                "short read: {}, got {} of {} bytes",
                path,
                data.len(),
                size
            )));
        }

        Ok(data)
    })?;

    debug!(path = %path, bytes = data.len(), "loaded object");
    Ok(data)
}

pub fn read_table(
    client: &dyn adapters::Object,
    bucket: &str,
    key: &str,
) -> Result<Table, StorageError> {
    let span = span!(Level::INFO, "read_table", context = "read_table");
    let _e = span.enter();

    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    debug!(path = %path, "loading csv file");

    let table = with_reader(client, bucket, key, |reader| {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(reader);

        let mut table = Table::new();
        for record in csv_reader.records() {
            let record = record.map_err(|err| {
                if err.is_io_error() {
                    StorageError::backend(format!("failed to read: {}, {}", path, err))
                } else {
                    StorageError::Parse {
                        path: path.clone(),
                        message: err.to_string(),
                    }
                }
            })?;

            table.push(record.iter().map(|field| field.to_string()).collect());
        }

        Ok(table)
    })
    .map_err(|err| {
        error!(error_message=%err, error_group=err.group(), path=%path);
        err
    })?;

    debug!(path = %path, rows = table.len(), "loaded csv file");
    Ok(table)
}

pub fn write_bytes(
    client: &dyn adapters::Object,
    bucket: &str,
    key: &str,
    data: &[u8],
) -> Result<(), StorageError> {
    let span = span!(Level::INFO, "write_bytes", context = "write_bytes");
    let _e = span.enter();

    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    info!(path = %path, bytes = data.len(), "writing object");

    with_writer(client, bucket, key, |writer| {
        writer.write_all(data).map_err(|err| {
            StorageError::backend(format!("failed to write: {}, {}", path, err))
        })
    })?;

    info!(path = %path, bytes = data.len(), "wrote object");
    Ok(())
}

/// Serializes `rows` as CSV, quoting fields that contain the delimiter, a
/// quote or a line break. Rows may differ in length.
pub fn write_table(
    client: &dyn adapters::Object,
    bucket: &str,
    key: &str,
    rows: &[Vec<String>],
) -> Result<(), StorageError> {
    let span = span!(Level::INFO, "write_table", context = "write_table");
    let _e = span.enter();

    let path = util::object::object_uri(client.fs_scheme(), bucket, key);
    info!(path = %path, rows = rows.len(), "writing records");

    with_writer(client, bucket, key, |writer| {
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        for row in rows {
            csv_writer.write_record(row).map_err(|err| {
                StorageError::backend(format!("failed to write: {}, {}", path, err))
            })?;
        }

        csv_writer.flush().map_err(|err| {
            StorageError::backend(format!("failed to flush: {}, {}", path, err))
        })
    })?;

    info!(path = %path, rows = rows.len(), "wrote records");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::SystemTime;

    use crate::adapters::{mock::MockClient, Object};

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter()
            .map(|row| row.iter().map(|f| f.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_read_bytes() {
        let client =
            MockClient::default().with_object("b", "k.bin", SystemTime::UNIX_EPOCH, vec![0, 1, 2, 255]);

        assert_eq!(read_bytes(&client, "b", "k.bin").unwrap(), vec![0, 1, 2, 255]);
    }

    #[test]
    fn test_read_missing_object() {
        let client = MockClient::default();

        let cases = vec!["missing", "", "dir/"];

        for key in cases {
            assert!(
                matches!(read_bytes(&client, "b", key), Err(StorageError::Backend { .. })),
                "failed for case: {}",
                key
            );
            assert!(
                matches!(read_table(&client, "b", key), Err(StorageError::Backend { .. })),
                "failed for case: {}",
                key
            );
        }
    }

    #[test]
    fn test_write_then_read_bytes() {
        let client = MockClient::default();

        write_bytes(&client, "b", "out/blob", b"payload").unwrap();

        assert_eq!(read_bytes(&client, "b", "out/blob").unwrap(), b"payload".to_vec());
    }

    #[test]
    fn test_table_round_trip() {
        let client = MockClient::default();
        let rows = table(&[&["a", "b"], &["c,d", "e"]]);

        write_table(&client, "b", "t.csv", &rows).unwrap();

        let raw = client.fs_download_object("b", "t.csv").unwrap().unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), "a,b\n\"c,d\",e\n");

        assert_eq!(read_table(&client, "b", "t.csv").unwrap(), rows);
    }

    #[test]
    fn test_table_round_trip_quoting() {
        let client = MockClient::default();
        let rows = table(&[
            &["say \"hi\"", "multi\nline"],
            &["", "plain"],
            &["crlf\r\nfield", " spaced "],
        ]);

        write_table(&client, "b", "q.csv", &rows).unwrap();

        assert_eq!(read_table(&client, "b", "q.csv").unwrap(), rows);
    }

    #[test]
    fn test_read_table() {
        let cases = vec![
            ("", table(&[])),
            ("x\n", table(&[&["x"]])),
            ("a,b\r\n1,2\r\n", table(&[&["a", "b"], &["1", "2"]])),
            ("a,\"b,c\"\n", table(&[&["a", "b,c"]])),
        ];

        for (body, expected) in cases {
            let client = MockClient::default().with_object(
                "b",
                "in.csv",
                SystemTime::UNIX_EPOCH,
                body.as_bytes().to_vec(),
            );

            assert_eq!(
                read_table(&client, "b", "in.csv").unwrap(),
                expected,
                "failed for case: {:?}",
                body
            );
        }
    }

    #[test]
    fn test_read_table_malformed_row() {
        let client = MockClient::default().with_object(
            "b",
            "bad.csv",
            SystemTime::UNIX_EPOCH,
            b"a,b\nc\nd,e\n".to_vec(),
        );

        assert!(matches!(
            read_table(&client, "b", "bad.csv"),
            Err(StorageError::Parse { .. })
        ));
    }

    #[test]
    fn test_write_close_failure_is_incomplete_write() {
        let client = MockClient::default().failing_put();

        assert!(matches!(
            write_bytes(&client, "b", "k", b"data"),
            Err(StorageError::IncompleteWrite { .. })
        ));
        assert!(matches!(
            write_table(&client, "b", "k.csv", &table(&[&["a"]])),
            Err(StorageError::IncompleteWrite { .. })
        ));
        assert_eq!(client.fs_download_object("b", "k").unwrap(), None);
    }

    #[test]
    fn test_overwrite() {
        let client = MockClient::default().with_object(
            "b",
            "k",
            SystemTime::UNIX_EPOCH,
            b"old contents".to_vec(),
        );

        write_bytes(&client, "b", "k", b"new").unwrap();

        assert_eq!(read_bytes(&client, "b", "k").unwrap(), b"new".to_vec());
    }

    #[test]
    fn test_read_close_failure_keeps_data() {
        let client = MockClient::default()
            .with_object("b", "k.bin", SystemTime::UNIX_EPOCH, b"payload".to_vec())
            .with_object("b", "k.csv", SystemTime::UNIX_EPOCH, b"a,b\n1,2\n".to_vec())
            .failing_close();

        assert_eq!(read_bytes(&client, "b", "k.bin").unwrap(), b"payload".to_vec());
        assert_eq!(
            read_table(&client, "b", "k.csv").unwrap(),
            table(&[&["a", "b"], &["1", "2"]])
        );
        assert_eq!(client.closed_readers(), 2);
    }

    #[test]
    fn test_reader_closed_on_failure() {
        let client = MockClient::default()
            .with_object("b", "bad.csv", SystemTime::UNIX_EPOCH, b"a,b\nc\n".to_vec());

        assert!(matches!(
            read_table(&client, "b", "bad.csv"),
            Err(StorageError::Parse { .. })
        ));
        assert_eq!(client.closed_readers(), 1);

        let client = MockClient::default()
            .with_object("b", "bad.csv", SystemTime::UNIX_EPOCH, b"a,b\nc\n".to_vec())
            .failing_close();

        assert!(matches!(
            read_table(&client, "b", "bad.csv"),
            Err(StorageError::Parse { .. })
        ));
        assert_eq!(client.closed_readers(), 1);
    }

    #[test]
    fn test_short_read() {
        let cases = vec![(b"abcdef".to_vec(), 1), (b"abcdef".to_vec(), 6), (b"x".to_vec(), 1)];

        for (body, missing) in cases {
            let client = MockClient::default()
                .with_object("b", "k", SystemTime::UNIX_EPOCH, body.clone())
                .truncating_reads(missing);

            assert!(
                matches!(read_bytes(&client, "b", "k"), Err(StorageError::Backend { .. })),
                "failed for case: {:?} {}",
                body,
                missing
            );
            assert_eq!(client.closed_readers(), 1, "failed for case: {:?} {}", body, missing);
        }
    }
}
