use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::Value;
use synthdb_core::Table;

use crate::model::Record;

/// Write a table as CSV: schema columns first, then any extra record keys
/// in alphabetical order. Returns bytes written.
pub fn write_table_csv(path: &Path, table: &Table, records: &[Record]) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    let header = csv_columns(table, records);
    writer.write_record(&header)?;

    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|column| record.get(column).map(csv_field).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

/// Header for `table`: declared columns, then unknown keys sorted.
pub fn csv_columns(table: &Table, records: &[Record]) -> Vec<String> {
    let mut columns: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let extra: BTreeSet<&String> = records
        .iter()
        .flat_map(|record| record.keys())
        .filter(|key| !columns.contains(*key))
        .collect();
    columns.extend(extra.into_iter().cloned());
    columns
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        nested => nested.to_string(),
    }
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
