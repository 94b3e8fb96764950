use std::time::{Duration, Instant};

use tracing::{debug, error, span, Level};

use crate::{
    adapters,
    model::{
        error::StorageError,
        object::{
            BucketDescriptor, ListingRequest, ObjectDescriptor, SortMode, DEFAULT_LIST_TIMEOUT,
        },
    },
    util,
};

fn deadline_after(started: Instant, timeout: Duration) -> Result<Instant, StorageError> {
    started
        .checked_add(timeout)
        .ok_or_else(|| StorageError::invalid(format!("timeout out of range: {:?}", timeout)))
}

/// An enumeration that returns after its deadline counts as timed out.
fn check_deadline(
    started: Instant,
    timeout: Duration,
    operation: &str,
) -> Result<(), StorageError> {
    if started.elapsed() > timeout {
        return Err(StorageError::timeout(operation));
    }
    Ok(())
}

pub fn get_buckets(
    client: &dyn adapters::Object,
    project: &str,
) -> Result<Vec<BucketDescriptor>, StorageError> {
    get_buckets_with_timeout(client, project, DEFAULT_LIST_TIMEOUT)
}

pub fn get_buckets_with_timeout(
    client: &dyn adapters::Object,
    project: &str,
    timeout: Duration,
) -> Result<Vec<BucketDescriptor>, StorageError> {
    let span = span!(Level::INFO, "get_buckets", context = "get_buckets");
    let _e = span.enter();
    debug!(project = project, "loading buckets");

    let started = Instant::now();
    let buckets = deadline_after(started, timeout)
        .and_then(|deadline| client.fs_list_buckets(project, deadline))
        .and_then(|buckets| {
            check_deadline(started, timeout, &format!("list_buckets for project: {}", project))?;
            Ok(buckets)
        })
        .map_err(|err| {
            error!(error_message=%err, error_group=err.group(), project=project);
            err
        })?;

    debug!(project = project, count = buckets.len(), "loaded buckets");
    Ok(buckets)
}

/// Names of every bucket visible to `project`, in backend order.
pub fn list_buckets(
    client: &dyn adapters::Object,
    project: &str,
) -> Result<Vec<String>, StorageError> {
    Ok(get_buckets(client, project)?
        .into_iter()
        .map(|b| b.name)
        .collect())
}

/// Stable in-place ordering of listed objects.
pub fn sort_objects(objects: &mut [ObjectDescriptor], mode: SortMode) {
    match mode {
        SortMode::None => {}
        SortMode::ByModificationTime => objects.sort_by_key(|o| o.modified_time),
        SortMode::NaturalName => objects.sort_by(|a, b| util::natural::compare(&a.key, &b.key)),
    }
}

pub fn list(
    client: &dyn adapters::Object,
    request: &ListingRequest,
) -> Result<Vec<String>, StorageError> {
    let span = span!(Level::INFO, "list_objects", context = "list_objects");
    let _e = span.enter();

    let path = util::object::object_uri(client.fs_scheme(), &request.bucket, &request.prefix);
    debug!(path = %path, delimiter = ?request.delimiter, sort = ?request.sort, "getting objects");

    let started = Instant::now();
    let mut objects = deadline_after(started, request.timeout)
        .and_then(|deadline| {
            client.fs_list_objects(
                &request.bucket,
                &request.prefix,
                request.delimiter.as_deref(),
                deadline,
            )
        })
        .and_then(|objects| {
            check_deadline(started, request.timeout, &format!("list_objects at: {}", path))?;
            Ok(objects)
        })
        .map_err(|err| {
            error!(error_message=%err, error_group=err.group(), path=%path);
            err
        })?;

    debug!(path = %path, count = objects.len(), "got objects");

    sort_objects(&mut objects, request.sort);

    Ok(objects.into_iter().map(|o| o.key).collect())
}

pub fn list_objects(
    client: &dyn adapters::Object,
    bucket: &str,
    prefix: &str,
    delimiter: Option<&str>,
    sort: SortMode,
) -> Result<Vec<String>, StorageError> {
    let mut request = ListingRequest::new(bucket).with_prefix(prefix).with_sort(sort);
    if let Some(d) = delimiter {
        request = request.with_delimiter(d);
    }

    list(client, &request)
}

/// Every object below `folder`, at any depth, in backend order.
pub fn list_objects_in_folder(
    client: &dyn adapters::Object,
    bucket: &str,
    folder: &str,
) -> Result<Vec<String>, StorageError> {
    list_objects_in_folder_with_timeout(client, bucket, folder, DEFAULT_LIST_TIMEOUT)
}

pub fn list_objects_in_folder_with_timeout(
    client: &dyn adapters::Object,
    bucket: &str,
    folder: &str,
    timeout: Duration,
) -> Result<Vec<String>, StorageError> {
    let request = ListingRequest::new(bucket)
        .with_prefix(util::path::format_folder_prefix(folder))
        .with_timeout(timeout);

    list(client, &request)
}
