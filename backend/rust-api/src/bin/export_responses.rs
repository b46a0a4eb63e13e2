use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::fmt::init;

use annotation_api::services::spreadsheet_export;

/// Copies tables of a response database into an .xlsx workbook, one sheet per table.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// SQLite file path or `sqlite:` URL
    #[clap(long, value_parser, default_value = "responses.db")]
    db: String,

    /// Output workbook
    #[clap(short, long, value_parser, default_value = "exported_responses.xlsx")]
    output: PathBuf,

    /// Table to export (repeatable). All tables when omitted.
    #[clap(short, long = "table", value_parser)]
    tables: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();

    if !args.db.starts_with("sqlite:") && !std::path::Path::new(&args.db).exists() {
        anyhow::bail!("database file not found at '{}'", args.db);
    }

    let pool = spreadsheet_export::connect(&args.db)
        .await
        .with_context(|| format!("failed to open {}", args.db))?;
    tracing::info!("Connected to database: {}", args.db);

    let report = spreadsheet_export::export_tables(&pool, &args.tables, &args.output).await?;
    pool.close().await;

    for (table, rows) in &report.exported {
        tracing::info!("Exported '{}' ({} rows)", table, rows);
    }
    if report.wrote_file() {
        tracing::info!("Conversion complete: {}", args.output.display());
    }

    Ok(())
}
