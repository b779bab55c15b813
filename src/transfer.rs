//! Spreadsheet import and export of course rows.
//!
//! `.csv` files go through the `csv` crate; anything else is read as a workbook
//! with `calamine` (first worksheet, first row is the header). Exports to a path
//! ending in `.xlsx` are written with `umya-spreadsheet`, everything else as CSV.

use crate::calc;
use crate::error::{GpaError, GpaResult};
use crate::grades::{self, CourseDraft};
use crate::store;
use calamine::{open_workbook_auto, Data, Reader};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const COURSE_COLUMNS: [&str; 5] = ["year", "semester", "course_name", "grade", "credits"];
pub const SUMMARY_COLUMNS: [&str; 6] = ["Name", "Index Number", "Year", "Semester", "GPA", "Credits"];

/// Reported row numbers count the header as row 1, like a spreadsheet does.
pub const HEADER_ROW_OFFSET: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub content: BTreeMap<String, String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<RowError>,
}

fn is_csv(path: &Path) -> bool {
    has_extension(path, "csv")
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

pub fn read_table(path: &Path) -> GpaResult<Table> {
    if is_csv(path) {
        read_csv_table(path)
    } else {
        read_workbook_table(path)
    }
}

fn read_csv_table(path: &Path) -> GpaResult<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table { headers, rows })
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Empty | Data::Error(_) => String::new(),
    }
}

fn read_workbook_table(path: &Path) -> GpaResult<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(first) = workbook.sheet_names().first().cloned() else {
        return Ok(Table::default());
    };
    let range = workbook.worksheet_range(&first)?;
    let mut rows = range
        .rows()
        .map(|r| r.iter().map(cell_to_string).collect::<Vec<_>>());
    let headers = rows.next().unwrap_or_default();
    Ok(Table {
        headers,
        rows: rows.collect(),
    })
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    year: usize,
    semester: usize,
    course_name: usize,
    grade: usize,
    credits: usize,
}

fn locate_columns(headers: &[String]) -> GpaResult<Columns> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let missing: Vec<String> = COURSE_COLUMNS
        .iter()
        .filter(|&&c| find(c).is_none())
        .map(|c| c.to_string())
        .collect();
    match (
        find("year"),
        find("semester"),
        find("course_name"),
        find("grade"),
        find("credits"),
    ) {
        (Some(year), Some(semester), Some(course_name), Some(grade), Some(credits)) => {
            Ok(Columns {
                year,
                semester,
                course_name,
                grade,
                credits,
            })
        }
        _ => Err(GpaError::Schema { missing }),
    }
}

/// One data row with the required columns picked out, still untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub year: String,
    pub semester: String,
    pub course_name: String,
    pub grade: String,
    pub credits: String,
}

impl ImportRow {
    fn from_cells(cells: &[String], cols: Columns) -> Self {
        let at = |i: usize| cells.get(i).cloned().unwrap_or_default();
        Self {
            year: at(cols.year).trim().to_string(),
            semester: at(cols.semester).trim().to_string(),
            course_name: at(cols.course_name),
            grade: at(cols.grade),
            credits: at(cols.credits),
        }
    }

    pub fn parse(&self) -> GpaResult<CourseDraft> {
        grades::validate_term(&self.year, &self.semester)?;
        grades::validate_course(&self.course_name, &self.grade, &self.credits)
    }
}

fn row_content(headers: &[String], cells: &[String]) -> BTreeMap<String, String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), cells.get(i).cloned().unwrap_or_default()))
        .collect()
}

/// A spreadsheet whose header carries every required column.
#[derive(Debug, Clone)]
pub struct CourseSheet {
    table: Table,
    cols: Columns,
}

/// Reads `path` and checks its header. A missing required column rejects the
/// file before any row is looked at.
pub fn read_course_sheet(path: &Path) -> GpaResult<CourseSheet> {
    let table = read_table(path)?;
    let cols = locate_columns(&table.headers).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "import rejected");
        e
    })?;
    Ok(CourseSheet { table, cols })
}

/// Appends every valid row of the sheet to the student's courses.
/// Rows that fail validation are reported and skipped; the rest commit together.
pub fn import_course_sheet(
    conn: &Connection,
    student_id: &str,
    sheet: &CourseSheet,
) -> GpaResult<ImportReport> {
    let CourseSheet { table, cols } = sheet;
    let cols = *cols;
    store::get_student(conn, student_id)?;

    let mut report = ImportReport::default();
    let tx = conn.unchecked_transaction()?;
    for (i, cells) in table.rows.iter().enumerate() {
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let row = ImportRow::from_cells(cells, cols);
        let outcome = row.parse().and_then(|draft| {
            store::append_course(&tx, student_id, &row.year, &row.semester, &draft)
        });
        match outcome {
            Ok(_) => report.imported += 1,
            Err(GpaError::Validation(message)) => {
                let row_no = i + HEADER_ROW_OFFSET;
                tracing::debug!(row = row_no, %message, "import row skipped");
                report.errors.push(RowError {
                    row: row_no,
                    content: row_content(&table.headers, cells),
                    message,
                });
            }
            Err(e) => return Err(e),
        }
    }
    tx.commit()?;

    tracing::info!(
        %student_id,
        imported = report.imported,
        failed = report.errors.len(),
        "courses imported"
    );
    Ok(report)
}

pub fn write_table(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) -> GpaResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    if has_extension(path, "xlsx") {
        write_xlsx(path, headers, rows)
    } else {
        write_csv(path, headers, rows)
    }
}

fn write_csv(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) -> GpaResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row.iter().map(|c| match c {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
        }))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(path: &Path, headers: &[&str], rows: &[Vec<Cell>]) -> GpaResult<()> {
    let mut book = umya_spreadsheet::new_file();
    let sheet = book
        .get_sheet_mut(&0)
        .ok_or_else(|| GpaError::Io("new workbook has no worksheet".to_string()))?;
    for (c, h) in headers.iter().enumerate() {
        sheet.get_cell_mut(((c + 1) as u32, 1u32)).set_value(*h);
    }
    for (r, row) in rows.iter().enumerate() {
        let row_no = (r + 2) as u32;
        for (c, cell) in row.iter().enumerate() {
            let target = sheet.get_cell_mut(((c + 1) as u32, row_no));
            match cell {
                Cell::Text(s) => {
                    target.set_value(s.as_str());
                }
                Cell::Number(n) => {
                    target.set_value_number(*n);
                }
            }
        }
    }
    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| GpaError::Io(format!("could not write workbook: {e:?}")))
}

/// Writes one row per course of the student, in store order. Returns the row count.
pub fn export_student_courses(conn: &Connection, student_id: &str, path: &Path) -> GpaResult<usize> {
    store::get_student(conn, student_id)?;
    let rows: Vec<Vec<Cell>> = store::list_all_courses(conn, student_id)?
        .into_iter()
        .map(|c| {
            vec![
                Cell::Text(c.year),
                Cell::Text(c.semester),
                Cell::Text(c.course_name),
                Cell::Text(c.grade),
                Cell::Number(c.credits),
            ]
        })
        .collect();
    write_table(path, &COURSE_COLUMNS, &rows)?;
    tracing::info!(%student_id, path = %path.display(), rows = rows.len(), "courses exported");
    Ok(rows.len())
}

/// Writes one row per (student, year, semester) with the term GPA rounded to 3 decimals.
/// With no courses in the store nothing is written and 0 is returned.
pub fn export_summary(conn: &Connection, path: &Path) -> GpaResult<usize> {
    let summaries = calc::term_summaries(&store::summary_rows(conn)?);
    if summaries.is_empty() {
        tracing::info!(path = %path.display(), "no gpa records, summary not written");
        return Ok(0);
    }
    let rows: Vec<Vec<Cell>> = summaries
        .into_iter()
        .map(|s| {
            vec![
                Cell::Text(s.name),
                Cell::Text(s.index_number),
                Cell::Text(s.year),
                Cell::Text(s.semester),
                Cell::Number(s.gpa),
                Cell::Number(s.credits),
            ]
        })
        .collect();
    write_table(path, &SUMMARY_COLUMNS, &rows)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "gpa summary exported");
    Ok(rows.len())
}
