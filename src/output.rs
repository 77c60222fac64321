//! Final record set persistence.
//!
//! Pure serialization: the session hands over the frozen, ascending record
//! list and it is written out as a JSON array, one field-named object per
//! record.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};

use crate::feed::Record;

/// Write the final record set to `path` as pretty-printed JSON.
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records)
        .with_context(|| format!("serialize {} records", records.len()))?;
    Ok(())
}
