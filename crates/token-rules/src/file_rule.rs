//! `file[...]` / `mvfile[...]` replacements.
//!
//! A plain file spec draws whole lines. An indexed spec addresses one column
//! of a record, either by 1-based position in a comma-separated sample file
//! or by header name in a CSV lookup. The record chosen for an event is
//! cached in its correlation map, so every indexed token referencing the
//! same file within one event reads from the same record.

use crate::spec::FileIndex;
use gen_core::{FileSelection, ReplacementType, SampleEvent, TokenValue};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fs;
use std::path::Path;

pub fn replace<R: Rng>(
    path: &Path,
    index: Option<&FileIndex>,
    replacement_type: ReplacementType,
    event: &mut SampleEvent,
    token_count: usize,
    rng: &mut R,
) -> Vec<TokenValue> {
    match index {
        None => replace_plain(path, replacement_type, token_count, rng),
        Some(FileIndex::Column(n)) if replacement_type == ReplacementType::All => {
            replace_all_column(path, *n)
        }
        Some(index) => {
            if replacement_type == ReplacementType::All {
                tracing::warn!(
                    "replacement_type=all is not supported for header-indexed file '{}'",
                    path.display()
                );
                return Vec::new();
            }
            replace_indexed(path, index, event, token_count, rng)
        }
    }
}

/// Exhaustive column draw: the 1-based column of every non-empty line.
fn replace_all_column(path: &Path, column: usize) -> Vec<TokenValue> {
    let Some(lines) = read_lines(path) else {
        return Vec::new();
    };
    lines
        .iter()
        .filter_map(|line| line.split(',').nth(column.saturating_sub(1)))
        .map(|field| TokenValue::same(field.trim()))
        .collect()
}

fn read_lines(path: &Path) -> Option<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Some(
            text.lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect(),
        ),
        Err(_) => {
            tracing::warn!("File not found : {}", path.display());
            None
        }
    }
}

fn replace_plain<R: Rng>(
    path: &Path,
    replacement_type: ReplacementType,
    token_count: usize,
    rng: &mut R,
) -> Vec<TokenValue> {
    let Some(lines) = read_lines(path) else {
        return Vec::new();
    };
    if lines.is_empty() {
        return Vec::new();
    }
    if replacement_type == ReplacementType::All {
        lines.into_iter().map(TokenValue::same).collect()
    } else {
        (0..token_count)
            .map(|_| TokenValue::same(lines.choose(rng).cloned().unwrap_or_default()))
            .collect()
    }
}

fn replace_indexed<R: Rng>(
    path: &Path,
    index: &FileIndex,
    event: &mut SampleEvent,
    token_count: usize,
    rng: &mut R,
) -> Vec<TokenValue> {
    let selection = match event.correlation.file_rows.get(path) {
        Some(selection) => selection.clone(),
        None => {
            let Some(selection) = select_record(path, index, rng) else {
                return Vec::new();
            };
            event
                .correlation
                .file_rows
                .insert(path.to_path_buf(), selection.clone());
            selection
        }
    };

    let value = match index {
        FileIndex::Column(n) => selection.row.get(n.saturating_sub(1)).cloned(),
        FileIndex::Header(name) => selection
            .header
            .iter()
            .position(|h| h == name)
            .and_then(|pos| selection.row.get(pos).cloned()),
    };
    let Some(value) = value else {
        tracing::warn!(
            "Column '{index:?}' not present in file '{}'",
            path.display()
        );
        return Vec::new();
    };
    vec![TokenValue::same(value); token_count]
}

/// Pick one record at random. Positional indexes split on commas; named
/// indexes go through the CSV reader to honor quoting and the header row.
fn select_record<R: Rng>(path: &Path, index: &FileIndex, rng: &mut R) -> Option<FileSelection> {
    match index {
        FileIndex::Column(_) => {
            let lines = read_lines(path)?;
            let line = lines.choose(rng)?;
            Some(FileSelection {
                row: line.split(',').map(|f| f.trim().to_string()).collect(),
                header: Vec::new(),
            })
        }
        FileIndex::Header(_) => {
            let mut reader = match csv::Reader::from_path(path) {
                Ok(reader) => reader,
                Err(_) => {
                    tracing::warn!("File not found : {}", path.display());
                    return None;
                }
            };
            let header: Vec<String> = match reader.headers() {
                Ok(headers) => headers.iter().map(str::to_string).collect(),
                Err(err) => {
                    tracing::warn!("Unreadable CSV header in '{}': {err}", path.display());
                    return None;
                }
            };
            let records: Vec<Vec<String>> = reader
                .records()
                .filter_map(Result::ok)
                .map(|record| record.iter().map(str::to_string).collect())
                .collect();
            let row = records.choose(rng)?.clone();
            Some(FileSelection { row, header })
        }
    }
}
