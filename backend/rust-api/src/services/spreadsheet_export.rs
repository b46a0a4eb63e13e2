use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, SqlitePool, ValueRef};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Table not found: {0}")]
    UnknownTable(String),

    #[error("Spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),
}

/// A single cell as read from SQLite storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Null,
}

/// Rows of one table with columns in declaration order.
#[derive(Debug, Clone)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[derive(Debug, Default)]
pub struct ExportReport {
    /// (table, row count) for every sheet written
    pub exported: Vec<(String, usize)>,
    pub skipped_empty: Vec<String>,
}

impl ExportReport {
    pub fn wrote_file(&self) -> bool {
        !self.exported.is_empty()
    }
}

/// Opens a database given either a `sqlite:` URL or a plain file path.
pub async fn connect(db: &str) -> Result<SqlitePool, ExportError> {
    let url = if db.starts_with("sqlite:") {
        db.to_string()
    } else {
        format!("sqlite://{}?mode=ro", db)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await?;
    Ok(pool)
}

pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>, ExportError> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(names)
}

pub async fn read_table(pool: &SqlitePool, table: &str) -> Result<TableData, ExportError> {
    let query = format!("SELECT * FROM \"{}\"", table.replace('"', "\"\""));
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let columns = match rows.first() {
        Some(row) => row
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect(),
        None => table_columns(pool, table).await?,
    };

    let rows = rows.iter().map(row_cells).collect::<Result<_, _>>()?;

    Ok(TableData {
        name: table.to_string(),
        columns,
        rows,
    })
}

async fn table_columns(pool: &SqlitePool, table: &str) -> Result<Vec<String>, ExportError> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?1) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|r| r.try_get::<String, _>("name").map_err(ExportError::from))
        .collect()
}

fn row_cells(row: &SqliteRow) -> Result<Vec<CellValue>, ExportError> {
    (0..row.len())
        .map(|i| {
            if row.try_get_raw(i)?.is_null() {
                return Ok(CellValue::Null);
            }
            if let Ok(v) = row.try_get::<i64, _>(i) {
                return Ok(CellValue::Integer(v));
            }
            if let Ok(v) = row.try_get::<f64, _>(i) {
                return Ok(CellValue::Real(v));
            }
            if let Ok(v) = row.try_get::<String, _>(i) {
                return Ok(CellValue::Text(v));
            }
            Ok(CellValue::Blob(row.try_get::<Vec<u8>, _>(i)?))
        })
        .collect()
}

/// Writes every non-empty table as one sheet of `output`.
///
/// An empty `tables` slice means all user tables. Empty tables are skipped with
/// a warning; when nothing is left no file is created.
pub async fn export_tables(
    pool: &SqlitePool,
    tables: &[String],
    output: &Path,
) -> Result<ExportReport, ExportError> {
    let available = list_tables(pool).await?;
    let selected: Vec<String> = if tables.is_empty() {
        available
    } else {
        for table in tables {
            if !available.contains(table) {
                return Err(ExportError::UnknownTable(table.clone()));
            }
        }
        tables.to_vec()
    };

    let mut report = ExportReport::default();
    let mut data = Vec::new();
    for table in &selected {
        let table_data = read_table(pool, table).await?;
        if table_data.rows.is_empty() {
            tracing::warn!("Table '{}' is empty. No data to export.", table);
            report.skipped_empty.push(table.clone());
            continue;
        }
        tracing::info!(
            "Read {} rows and {} columns from '{}'",
            table_data.rows.len(),
            table_data.columns.len(),
            table
        );
        report
            .exported
            .push((table.clone(), table_data.rows.len()));
        data.push(table_data);
    }

    if data.is_empty() {
        tracing::warn!("Nothing to export, {} not written", output.display());
        return Ok(report);
    }

    let mut workbook = build_workbook(&data)?;
    workbook.save(output)?;
    tracing::info!("Saved {} sheet(s) to {}", data.len(), output.display());

    Ok(report)
}

fn build_workbook(tables: &[TableData]) -> Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&table.name)?;

        for (col, name) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
        }

        for (idx, cells) in table.rows.iter().enumerate() {
            let row = (idx + 1) as u32;
            for (col, cell) in cells.iter().enumerate() {
                let col = col as u16;
                match cell {
                    CellValue::Integer(v) => {
                        worksheet.write_number(row, col, *v as f64)?;
                    }
                    CellValue::Real(v) => {
                        worksheet.write_number(row, col, *v)?;
                    }
                    CellValue::Text(v) => {
                        worksheet.write_string(row, col, v)?;
                    }
                    CellValue::Blob(bytes) => {
                        worksheet.write_string(row, col, String::from_utf8_lossy(bytes))?;
                    }
                    CellValue::Null => {}
                }
            }
        }
    }

    Ok(workbook)
}
