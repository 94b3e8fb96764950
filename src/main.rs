use std::{
    fs,
    io::{self, Read, Write},
    time::Duration,
};

use clap::{Arg, ArgMatches, Command};
use thiserror::Error;
use tracing::{error, info, span, Level};
use tracing_subscriber::EnvFilter;

use objectkit::{listing, model, transfer, util, ListingRequest, SortMode, StorageError};

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One day.
const MAX_TIMEOUT_SECS: u64 = 86_400;

fn cli() -> Command {
    let location = || Arg::new("URI").required(true).index(1);

    Command::new("objectkit")
        .version(clap::crate_version!())
        .subcommand_required(true)
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .value_parser(["json", "text"])
                .default_value("json"),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))
                .default_value("30"),
        )
        .subcommand(
            Command::new("buckets")
                .about("List bucket names")
                .arg(Arg::new("PROVIDER").required(true).index(1))
                .arg(
                    Arg::new("project")
                        .long("project")
                        .env("GOOGLE_CLOUD_PROJECT")
                        .default_value(""),
                ),
        )
        .subcommand(
            Command::new("ls")
                .about("List objects under a prefix")
                .arg(location())
                .arg(Arg::new("delimiter").long("delimiter"))
                .arg(Arg::new("sort").long("sort").default_value("none")),
        )
        .subcommand(
            Command::new("ls-folder")
                .about("List every object below a folder")
                .arg(location()),
        )
        .subcommand(Command::new("cat").about("Print an object").arg(location()))
        .subcommand(
            Command::new("cat-csv")
                .about("Parse an object as CSV and print its rows")
                .arg(location()),
        )
        .subcommand(
            Command::new("put")
                .about("Upload a local file, or stdin with '-'")
                .arg(location())
                .arg(Arg::new("FILE").required(true).index(2)),
        )
        .subcommand(
            Command::new("put-csv")
                .about("Upload the rows of a local CSV file")
                .arg(location())
                .arg(Arg::new("FILE").required(true).index(2)),
        )
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    matches
        .get_one::<String>(name)
        .map(|s| s.as_str())
        .unwrap_or("")
}

fn run(matches: &ArgMatches) -> Result<(), CliError> {
    let timeout = Duration::from_secs(
        matches
            .get_one::<u64>("timeout-secs")
            .copied()
            .unwrap_or(model::object::DEFAULT_LIST_TIMEOUT.as_secs()),
    );

    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| StorageError::invalid("missing command"))?;

    let span = span!(Level::INFO, "run", context = "run", command = name);
    let _e = span.enter();
    info!("called");

    let mut stdout = io::stdout().lock();

    if name == "buckets" {
        let provider = util::object::parse_provider_from_uri(arg(sub, "PROVIDER"))?;
        let project = arg(sub, "project");
        if provider.is_gcs() && project.is_empty() {
            return Err(StorageError::invalid("--project or GOOGLE_CLOUD_PROJECT is required").into());
        }

        let client = objectkit::client::connect(provider)?;
        for b in listing::get_buckets_with_timeout(client.as_ref(), project, timeout)? {
            writeln!(stdout, "{}", b.name)?;
        }
        return Ok(());
    }

    let location = util::object::parse_object_uri(arg(sub, "URI"))?;
    info!(bucket = %location.bucket, key = %location.key, "args");

    let client = objectkit::client::connect(location.provider)?;
    let client = client.as_ref();

    match name {
        "ls" => {
            let sort: SortMode = arg(sub, "sort").parse()?;
            let mut request = ListingRequest::new(location.bucket.as_str())
                .with_prefix(location.key.as_str())
                .with_sort(sort)
                .with_timeout(timeout);
            if let Some(d) = sub.get_one::<String>("delimiter") {
                request = request.with_delimiter(d.as_str());
            }

            for key in listing::list(client, &request)? {
                writeln!(stdout, "{}", key)?;
            }
        }
        "ls-folder" => {
            let keys = listing::list_objects_in_folder_with_timeout(
                client,
                &location.bucket,
                &location.key,
                timeout,
            )?;

            for key in keys {
                writeln!(stdout, "{}", key)?;
            }
        }
        "cat" => {
            let data = transfer::read_bytes(client, &location.bucket, &location.key)?;
            stdout.write_all(&data)?;
        }
        "cat-csv" => {
            let rows = transfer::read_table(client, &location.bucket, &location.key)?;

            let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(stdout);
            for row in &rows {
                csv_writer.write_record(row)?;
            }
            csv_writer.flush()?;
        }
        "put" => {
            let file = arg(sub, "FILE");
            let data = if file == "-" {
                let mut data = Vec::new();
                io::stdin().read_to_end(&mut data)?;
                data
            } else {
                fs::read(file)?
            };

            transfer::write_bytes(client, &location.bucket, &location.key, &data)?;
        }
        "put-csv" => {
            let mut csv_reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_path(arg(sub, "FILE"))?;

            let mut rows: model::object::Table = Vec::new();
            for record in csv_reader.records() {
                rows.push(record?.iter().map(|field| field.to_string()).collect());
            }

            transfer::write_table(client, &location.bucket, &location.key, &rows)?;
        }
        other => {
            return Err(StorageError::invalid(format!("unknown command: {}", other)).into());
        }
    }

    Ok(())
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if format == "text" {
        builder.init();
    } else {
        builder.json().init();
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    init_tracing(arg(&matches, "log-format"));

    if let Err(err) = run(&matches) {
        error!(error_message=%err, "failed");
        std::process::exit(1);
    }
}
