use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skyway::canvas::{CanvasCollection, LocalStorage};
use skyway::config::Config;
use skyway::metrics;
use skyway::models::{Bbox, OverpassResponse};
use skyway::overpass::OverpassClient;
use skyway::query::{
    CsvFormat, ElementQuery, ElementType, OutputMode, PayloadFormat, QueryBuilder, QueryDate,
    QuerySettings, TagFilter,
};
use skyway::SkywayError;

#[derive(Parser)]
#[command(name = "skyway")]
#[command(about = "Build and send Overpass queries, inspect tile coverage", long_about = None)]
struct Cli {
    /// Print Prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an Overpass query and send it
    Query {
        /// Tag filters: key, !key, key=value, key=v1|v2
        tags: Vec<String>,

        /// Global bounding box as south,west,north,east
        #[arg(long)]
        bbox: Option<String>,

        /// Server-side timeout in seconds
        #[arg(long)]
        timeout: Option<u32>,

        /// Server-side memory limit in bytes
        #[arg(long)]
        maxsize: Option<u64>,

        /// Attic date
        #[arg(long)]
        date: Option<String>,

        /// Payload format: json or csv
        #[arg(long, default_value = "json")]
        format: String,

        /// Columns for csv output
        #[arg(long, value_delimiter = ',')]
        csv_columns: Vec<String>,

        /// Output mode: geom, skel, recurse, body, tags, count
        #[arg(long, default_value = "geom")]
        output: String,

        /// Element type: nwr, node, way, rel
        #[arg(long, default_value = "nwr")]
        element: String,

        /// Print the query instead of sending it
        #[arg(long)]
        dry_run: bool,
    },

    /// Summarize tile coverage under a bucket
    Canvas {
        /// Bucket path; defaults to CANVAS_BUCKET
        #[arg(long)]
        bucket: Option<String>,

        /// Only this UTM zone
        #[arg(long)]
        zone: Option<u32>,
    },
}

fn main() -> ExitCode {
    // Logs go to stderr so query output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skyway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    metrics::registry::init_metrics();

    let cli = Cli::parse();
    let print_metrics = cli.metrics;

    let result = run(cli.command);

    if print_metrics {
        match metrics::render() {
            Ok(text) => print!("{}", text),
            Err(e) => error!("{:#}", e),
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            let code = e
                .downcast_ref::<SkywayError>()
                .map(|err| err.code().exit_code())
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    match command {
        Commands::Query {
            tags,
            bbox,
            timeout,
            maxsize,
            date,
            format,
            csv_columns,
            output,
            element,
            dry_run,
        } => {
            let mut payload_format = PayloadFormat::parse(&format)?;
            if let PayloadFormat::Csv(csv) = &mut payload_format {
                if !csv_columns.is_empty() {
                    *csv = CsvFormat::with_columns(csv_columns);
                }
            }

            let mut settings = QuerySettings::new().with_payload_format(payload_format);
            settings.set_timeout(timeout);
            settings.set_maxsize(maxsize);
            settings.set_date(date.as_deref().map(QueryDate::parse).transpose()?);
            settings.set_bbox(bbox.as_deref().map(Bbox::parse).transpose()?);

            let mut statement = ElementQuery::new(ElementType::parse(&element)?);
            for tag in &tags {
                statement.add_tagfilter(
                    tag.parse::<TagFilter>()
                        .with_context(|| format!("Invalid tag filter '{}'", tag))?,
                );
            }

            let builder = QueryBuilder::new(settings)
                .with_statement(statement)
                .with_output(OutputMode::parse(&output)?);

            if dry_run {
                println!("{}", builder);
                return Ok(());
            }

            let client = OverpassClient::new(&config.overpass)?;
            match builder.request(&client)? {
                OverpassResponse::Json(json) => {
                    info!("Received {} elements", json.elements.len());
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OverpassResponse::Csv(table) => {
                    info!("Received {} rows", table.rows.len());
                    if let Some(header) = &table.header {
                        println!("{}", header.join("\t"));
                    }
                    for row in &table.rows {
                        println!("{}", row.join("\t"));
                    }
                }
            }
        }

        Commands::Canvas { bucket, zone } => {
            let bucket = bucket
                .or(config.canvas.bucket)
                .ok_or_else(|| anyhow!("No bucket given and CANVAS_BUCKET is not set"))?;
            let mut collection = CanvasCollection::new(Arc::new(LocalStorage), bucket);

            let summaries = match zone {
                Some(utm_zone) => vec![collection.zone(utm_zone)?.summary()?],
                None => collection.descriptions()?,
            };
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
    }

    Ok(())
}
