//! Input file format detection.

use std::path::Path;

use crate::error::LoadError;

/// Tabular file formats we can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Excel / OpenDocument workbook (first sheet is read)
    Excel,
}

impl FileFormat {
    /// Detect the format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self, LoadError> {
        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .and_then(|ext| match ext.as_str() {
                "csv" => Some(FileFormat::Csv),
                "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(FileFormat::Excel),
                _ => None,
            })
            .ok_or_else(|| LoadError::UnsupportedFormat {
                file: file_name.to_string(),
            })
    }

    /// Detect the format from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::from_file_name(name).map_err(|_| LoadError::UnsupportedFormat {
            file: path.display().to_string(),
        })
    }
}

/// Default SQL table name for an uploaded file: the name minus its last extension.
///
/// `sales.2024.csv` becomes `sales.2024`; a name without a dot is kept as is.
pub fn default_table_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(FileFormat::from_file_name("a.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_file_name("A.CSV").unwrap(), FileFormat::Csv);
        assert_eq!(
            FileFormat::from_file_name("report.xlsx").unwrap(),
            FileFormat::Excel
        );
        assert_eq!(
            FileFormat::from_file_name("legacy.xls").unwrap(),
            FileFormat::Excel
        );
        assert!(matches!(
            FileFormat::from_file_name("notes.txt"),
            Err(LoadError::UnsupportedFormat { .. })
        ));
        assert!(FileFormat::from_file_name("noext").is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FileFormat::from_path("/tmp/data/orders.csv").unwrap(),
            FileFormat::Csv
        );
        assert!(FileFormat::from_path("/tmp/data/").is_err());
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("sales.csv"), "sales");
        assert_eq!(default_table_name("sales.2024.xlsx"), "sales.2024");
        assert_eq!(default_table_name("plain"), "plain");
        assert_eq!(default_table_name(".hidden"), ".hidden");
    }
}
