use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregation::result_table::ResultTable;
use crate::shared::constants::OUTPUT_CSV_FILE;
use crate::shared::error::AnalysisError;

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A rendered CSV ready to hand to the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CsvExport {
    /// Writes the export into `dir` under its fixed file name.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, AnalysisError> {
        fs::create_dir_all(dir).map_err(|e| AnalysisError::io(dir, e))?;
        let path = dir.join(self.file_name);
        self.write_file(&path)?;
        Ok(path)
    }

    pub fn write_file(&self, path: &Path) -> Result<(), AnalysisError> {
        fs::write(path, &self.bytes).map_err(|e| AnalysisError::io(path, e))
    }
}

pub fn export(table: &ResultTable) -> CsvExport {
    CsvExport {
        file_name: OUTPUT_CSV_FILE,
        content_type: CSV_CONTENT_TYPE,
        bytes: to_csv(table).into_bytes(),
    }
}

/// Renders the table with a leading unnamed row-index column.
///
/// Null cells are written empty; every line ends with `\n`.
pub fn to_csv(table: &ResultTable) -> String {
    let mut out = String::from(",tracking_id,plate\n");
    for (i, row) in table.rows().iter().enumerate() {
        let tracking_id = row.tracking_id.as_deref().map(csv_escape).unwrap_or_default();
        let plate = row.plate.as_deref().map(csv_escape).unwrap_or_default();
        out.push_str(&format!("{i},{tracking_id},{plate}\n"));
    }
    out
}

/// Quotes a value if it contains a comma, quote, or line break.
fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
