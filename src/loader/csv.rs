//! CSV input (RFC 4180 quoting).

use crate::error::{Error, Result};
use crate::model::{Document, Section};

/// The first record is the header; every other record is a body row.
pub(super) fn parse(source: &str) -> Result<Document> {
    let mut records = read_records(source)?;
    if records.is_empty() {
        return Ok(Document::new());
    }
    let headers = records.remove(0);
    Ok(Document::with_sections(vec![Section::table(headers, records)]))
}

fn read_records(source: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_started = false;
    let mut line = 1usize;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if !field_started => {
                in_quotes = true;
                field_started = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_started = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                end_record(&mut records, &mut record, &mut field, field_started);
                field_started = false;
                line += 1;
            }
            _ => {
                field.push(c);
                field_started = true;
            }
        }
    }

    if in_quotes {
        return Err(Error::MalformedInput(format!(
            "unterminated quoted CSV field (line {})",
            line
        )));
    }
    end_record(&mut records, &mut record, &mut field, field_started);
    Ok(records)
}

fn end_record(
    records: &mut Vec<Vec<String>>,
    record: &mut Vec<String>,
    field: &mut String,
    field_started: bool,
) {
    // Blank lines are skipped.
    if record.is_empty() && !field_started && field.is_empty() {
        return;
    }
    record.push(std::mem::take(field));
    records.push(std::mem::take(record));
}
