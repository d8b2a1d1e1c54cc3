use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Writer};

use crate::model::{MatchSession, PlayerInfo, TableMatch};
use crate::scoring;

// Recognized import headers, first match wins, checked in this order.
const TABLE_NUMBER_HEADERS: [&str; 3] = ["桌號", "抬號", "Table"];
const P1_ID_HEADERS: [&str; 3] = ["先手ID", "先手編號", "P1 ID"];
const P1_NAME_HEADERS: [&str; 2] = ["先手姓名", "P1 Name"];
const P2_ID_HEADERS: [&str; 3] = ["後手ID", "後手編號", "P2 ID"];
const P2_NAME_HEADERS: [&str; 2] = ["後手姓名", "P2 Name"];

#[derive(Debug, PartialEq, Eq)]
pub enum SheetError {
    Unreadable(String),
    MissingColumn(&'static str)
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable(detail) => write!(f, "The file could not be parsed: {}", detail),
            Self::MissingColumn(which) => write!(f, "No recognized column for {}", which)
        }
    }
}

impl std::error::Error for SheetError {}

fn find_column(headers: &StringRecord, candidates: &[&str]) -> Option<usize> {
    for candidate in candidates {
        if let Some(index) = headers.iter().position(|h| h.trim() == *candidate) {
            return Some(index);
        };
    }
    None
}

fn cell(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_owned()
}

/// Parses a tabular pairing list into fresh tables. Every imported table
/// starts PENDING regardless of what the file says; a missing table-number
/// column (or an unparseable cell) falls back to the 1-based row index. Any
/// parse failure aborts the whole import so existing tables stay untouched.
pub fn import_tables<R: Read>(input: R) -> Result<Vec<TableMatch>, SheetError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader
        .headers()
        .map_err(|e| SheetError::Unreadable(e.to_string()))?
        .clone();

    let table_column = find_column(&headers, &TABLE_NUMBER_HEADERS);
    let p1_id = find_column(&headers, &P1_ID_HEADERS).ok_or(SheetError::MissingColumn("player 1 id"))?;
    let p1_name = find_column(&headers, &P1_NAME_HEADERS).ok_or(SheetError::MissingColumn("player 1 name"))?;
    let p2_id = find_column(&headers, &P2_ID_HEADERS).ok_or(SheetError::MissingColumn("player 2 id"))?;
    let p2_name = find_column(&headers, &P2_NAME_HEADERS).ok_or(SheetError::MissingColumn("player 2 name"))?;

    let mut tables = Vec::new();
    for (row_index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| SheetError::Unreadable(e.to_string()))?;
        let fallback_number = (row_index + 1) as u32;
        let table_number = table_column
            .and_then(|index| cell(&record, index).parse::<u32>().ok())
            .unwrap_or(fallback_number);
        tables.push(TableMatch::new(
            table_number,
            PlayerInfo { id: cell(&record, p1_id), name: cell(&record, p1_name) },
            PlayerInfo { id: cell(&record, p2_id), name: cell(&record, p2_name) }
        ));
    }
    Ok(tables)
}

fn finish(writer: Writer<Vec<u8>>) -> String {
    writer
        .into_inner()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_default()
}

/// Per-table raw results report. Headers use the primary recognized names so
/// the output re-imports cleanly (results reset to PENDING on the way back).
pub fn export_tables(session: &MatchSession) -> String {
    let mut writer = Writer::from_writer(vec![]);
    let _ = writer.write_record([
        "桌號", "先手ID", "先手姓名", "後手ID", "後手姓名", "Result", "Submitted By", "Updated At"
    ]);
    let mut tables: Vec<&TableMatch> = session.tables.iter().collect();
    tables.sort_by_key(|t| t.table_number);
    for table in tables {
        let _ = writer.write_record([
            table.table_number.to_string(),
            table.player1.id.clone(),
            table.player1.name.clone(),
            table.player2.id.clone(),
            table.player2.name.clone(),
            table.result.to_string(),
            table.submitted_by.clone().unwrap_or_default(),
            table.updated_at.map(|t| t.to_string()).unwrap_or_default()
        ]);
    }
    finish(writer)
}

/// Per-player standings report in numeric-aware id order.
pub fn export_standings(session: &MatchSession) -> String {
    let mut writer = Writer::from_writer(vec![]);
    let _ = writer.write_record(["ID", "Name", "Points", "Wins", "Losses", "Draws", "Matches"]);
    for score in scoring::aggregate(session) {
        let _ = writer.write_record([
            score.id,
            score.name,
            score.points.to_string(),
            score.win_count.to_string(),
            score.loss_count.to_string(),
            score.draw_count.to_string(),
            score.match_count.to_string()
        ]);
    }
    finish(writer)
}
