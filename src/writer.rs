use crate::{Record, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{error, info};

/// Header row of the output file: name, province, city, area, detailed address.
pub const HEADER: [&str; 5] = ["店名", "省份", "城市", "区域", "详细地址"];

/// UTF-8 byte-order mark, so spreadsheet tools pick the right encoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Drops every record whose (name, address) pair was already seen, keeping the first one.
pub fn dedup(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let (name, address) = record.dedup_key();
            seen.insert((name.to_string(), address.to_string()))
        })
        .collect()
}

/// Deduplicates `records` and writes them to `path`.
///
/// Failures are logged and never returned.
pub fn write(records: Vec<Record>, path: &Path) {
    match save(records, path) {
        Ok(rows) => info!("Saved {} rows to {}", rows, path.display()),
        Err(e) => error!("Failed to save {}: {}", path.display(), e),
    }
}

/// Deduplicates `records`, writes them as a CSV with BOM and header, and returns the row count.
pub fn save(records: Vec<Record>, path: &Path) -> Result<usize> {
    let rows = dedup(records);

    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);

    writer.write_record(HEADER)?;
    for row in &rows {
        writer.write_record([&row.name, &row.province, &row.city, &row.area, &row.address])?;
    }
    writer.flush()?;

    Ok(rows.len())
}
