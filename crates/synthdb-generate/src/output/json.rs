use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::model::GeneratedData;

/// Write every table's records as one pretty-printed JSON object.
pub fn write_generated_json(path: &Path, data: &GeneratedData) -> Result<u64, std::io::Error> {
    let encoded = serde_json::to_vec_pretty(data)?;
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&encoded)?;
    writer.flush()?;
    Ok(encoded.len() as u64)
}
