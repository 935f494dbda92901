use std::{fs::File, path::Path};

use csv::StringRecord;
use serde::Deserialize;

use crate::{graph::ExtSegment, primitives::Meters};

const NUM_SEGMENT_FIELDS: usize = 8;

#[derive(Debug, Deserialize)]
struct SegmentRow {
    segment_id: String,
    slice_id: String,
    length: Meters,
    vehicle_count: String,
    speed: String,
    start: String,
    end: String,
    connection: String,
}

#[derive(Debug, PartialEq, Eq)]
pub enum MalformedReason {
    TooFewFields(usize),
    InvalidLength(Box<str>),
    EmptyLabel,
}

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Csv(csv::Error),
    MalformedRecord { line: u64, reason: MalformedReason },
}

fn reader() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All).flexible(true);

    builder
}

fn parse_segment(record: &StringRecord) -> Result<ExtSegment, LoadError> {
    let line = record.position().map_or(0, |it| it.line());
    let malformed = |reason| LoadError::MalformedRecord { line, reason };
    if record.len() < NUM_SEGMENT_FIELDS {
        return Err(malformed(MalformedReason::TooFewFields(record.len())));
    }

    let record: StringRecord = record.iter().take(NUM_SEGMENT_FIELDS).collect();
    let row: SegmentRow = record
        .deserialize(None)
        .map_err(|_| malformed(MalformedReason::InvalidLength(record[2].into())))?;
    if row.start.is_empty() || row.end.is_empty() {
        return Err(malformed(MalformedReason::EmptyLabel));
    }

    Ok(ExtSegment {
        segment_id: row.segment_id.into(),
        slice_id: row.slice_id.into(),
        length: row.length,
        vehicle_count: row.vehicle_count.into(),
        speed: row.speed.into(),
        start: row.start.into(),
        end: row.end.into(),
        connection: row.connection.into(),
    })
}

/// Parses the segment file. The first row is a header and is skipped.
pub fn parse_segments(stream: impl std::io::Read) -> Result<Box<[ExtSegment]>, LoadError> {
    reader()
        .has_headers(true)
        .from_reader(stream)
        .records()
        .map(|record| parse_segment(&record.map_err(LoadError::Csv)?))
        .collect()
}

/// Parses the city list: one label per line, blank lines ignored.
pub fn parse_cities(stream: impl std::io::Read) -> Result<Box<[Box<str>]>, LoadError> {
    let mut cities: Vec<Box<str>> = Vec::new();
    for record in reader().has_headers(false).from_reader(stream).records() {
        let record = record.map_err(LoadError::Csv)?;
        match record.get(0) {
            Some(label) if !label.is_empty() => cities.push(label.into()),
            _ => continue,
        }
    }
    Ok(cities.into_boxed_slice())
}

pub fn load_segments(path: &Path) -> Result<Box<[ExtSegment]>, LoadError> {
    parse_segments(File::open(path).map_err(LoadError::Io)?)
}

pub fn load_cities(path: &Path) -> Result<Box<[Box<str>]>, LoadError> {
    parse_cities(File::open(path).map_err(LoadError::Io)?)
}
