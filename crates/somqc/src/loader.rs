//! Workbook loading: a JSON workbook file, a single CSV/TSV sheet, or a
//! directory of CSV/TSV sheets.
//!
//! JSON workbooks are parsed up front. Delimited files are only listed when
//! the workbook is opened and read lazily, so an unreadable or malformed file
//! skips that sheet instead of failing the whole batch.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use somqc_core::error::QcError;
use somqc_core::table::{RawCell, RawTable};
use somqc_orchestration::interfaces::SheetSource;

#[derive(Deserialize)]
struct WorkbookFile {
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    name: String,
    #[serde(default)]
    neurons: Vec<String>,
    categories: Vec<String>,
    counts: Vec<Vec<RawCell>>,
}

enum Backend {
    Memory(HashMap<String, RawTable>),
    Files(HashMap<String, PathBuf>),
}

/// Named sheets available for analysis, in workbook order.
pub struct Workbook {
    names: Vec<String>,
    backend: Backend,
}

impl Workbook {
    /// Open `path` as a JSON workbook, a delimited file or a directory of them.
    pub fn open(path: &Path) -> Result<Self, QcError> {
        if path.is_dir() {
            return Self::open_dir(path);
        }
        if !path.exists() {
            return Err(QcError::Config(format!(
                "input '{}' does not exist",
                path.display()
            )));
        }
        match extension(path).as_deref() {
            Some("json") => Self::open_json(path),
            Some("csv" | "tsv" | "txt") => {
                let name = sheet_name(path);
                Ok(Self {
                    names: vec![name.clone()],
                    backend: Backend::Files(HashMap::from([(name, path.to_path_buf())])),
                })
            }
            _ => Err(QcError::Config(format!(
                "unsupported input '{}': expected .json, .csv, .tsv or a directory",
                path.display()
            ))),
        }
    }

    /// Parse a JSON workbook from text.
    pub fn from_json(text: &str) -> Result<Self, QcError> {
        let file: WorkbookFile = serde_json::from_str(text)
            .map_err(|e| QcError::Config(format!("invalid workbook JSON: {e}")))?;
        let mut names = Vec::with_capacity(file.sheets.len());
        let mut sheets = HashMap::with_capacity(file.sheets.len());
        for entry in file.sheets {
            if sheets.contains_key(&entry.name) {
                return Err(QcError::Config(format!(
                    "duplicate sheet name '{}'",
                    entry.name
                )));
            }
            let neurons = if entry.neurons.is_empty() {
                (1..=entry.counts.len()).map(|i| format!("N{i}")).collect()
            } else {
                entry.neurons
            };
            names.push(entry.name.clone());
            sheets.insert(
                entry.name,
                RawTable::new(neurons, entry.categories, entry.counts),
            );
        }
        Ok(Self {
            names,
            backend: Backend::Memory(sheets),
        })
    }

    fn open_json(path: &Path) -> Result<Self, QcError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    fn open_dir(dir: &Path) -> Result<Self, QcError> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && matches!(extension(p).as_deref(), Some("csv" | "tsv")))
            .collect();
        files.sort();

        let mut names = Vec::with_capacity(files.len());
        let mut map = HashMap::with_capacity(files.len());
        for path in files {
            let name = sheet_name(&path);
            if map.contains_key(&name) {
                debug!(file = %path.display(), "Ignoring file with duplicate sheet name");
                continue;
            }
            names.push(name.clone());
            map.insert(name, path);
        }
        debug!(dir = %dir.display(), sheets = names.len(), "Workbook directory opened");
        Ok(Self {
            names,
            backend: Backend::Files(map),
        })
    }

    /// Sheet names in workbook order.
    #[must_use]
    pub fn sheet_names(&self) -> &[String] {
        &self.names
    }
}

impl SheetSource for Workbook {
    fn read_sheet(&self, sheet: &str) -> Result<RawTable, QcError> {
        let source_err = |reason: String| QcError::Source {
            sheet: sheet.to_string(),
            reason,
        };
        match &self.backend {
            Backend::Memory(sheets) => sheets
                .get(sheet)
                .cloned()
                .ok_or_else(|| source_err("no such sheet".into())),
            Backend::Files(files) => {
                let path = files
                    .get(sheet)
                    .ok_or_else(|| source_err("no such sheet".into()))?;
                let text = fs::read_to_string(path).map_err(|e| source_err(e.to_string()))?;
                let delimiter = if extension(path).as_deref() == Some("tsv") {
                    '\t'
                } else {
                    ','
                };
                parse_delimited(&text, delimiter).map_err(source_err)
            }
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn sheet_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

/// Parse a delimited sheet: the first row holds category labels after a
/// corner cell, each following row a neuron id and its counts.
///
/// Records are line based. A quoted field may contain the delimiter but not
/// a line break; one that spans lines is an "unterminated quoted field".
pub fn parse_delimited(text: &str, delimiter: char) -> Result<RawTable, String> {
    let mut lines = text
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());
    let header = lines.next().ok_or_else(|| "file is empty".to_string())?;
    let header = split_record(header, delimiter)?;
    if header.len() < 2 {
        return Err("header row has no category columns".into());
    }
    let categories: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();

    let mut neurons = Vec::new();
    let mut cells = Vec::new();
    for (i, line) in lines.enumerate() {
        let fields = split_record(line, delimiter).map_err(|e| format!("row {}: {e}", i + 2))?;
        let mut fields = fields.into_iter();
        neurons.push(fields.next().unwrap_or_default().trim().to_string());
        cells.push(fields.map(|f| RawCell::from_text(&f)).collect());
    }
    Ok(RawTable::new(neurons, categories, cells))
}

/// Split one record, honoring double-quoted fields with `""` escapes.
fn split_record(line: &str, delimiter: char) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".into());
    }
    fields.push(field);
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use somqc_core::table::CellValue;

    #[test]
    fn parse_csv_sheet() {
        let text = "neuron,cat1,cat2\nn1,10,0\nn2,0,10\nn3,5,\n";
        let table = parse_delimited(text, ',').unwrap();
        assert_eq!(table.categories, vec!["cat1", "cat2"]);
        assert_eq!(table.neurons, vec!["n1", "n2", "n3"]);
        assert_eq!(table.cell(0, 0).value(), CellValue::Value(10.0));
        assert_eq!(table.cell(2, 1).value(), CellValue::Empty);
    }

    #[test]
    fn parse_quoted_fields() {
        let text = "id,\"cat, one\",\"say \"\"hi\"\"\"\nn1,1,n/a\n";
        let table = parse_delimited(text, ',').unwrap();
        assert_eq!(table.categories, vec!["cat, one", "say \"hi\""]);
        assert_eq!(table.cell(0, 1).value(), CellValue::NonNumeric);
    }

    #[test]
    fn parse_tsv_and_ragged_rows() {
        let text = "id\ta\tb\tc\nn1\t1\t2\nn2\t1\t2\t3\t99\n";
        let table = parse_delimited(text, '\t').unwrap();
        assert_eq!(table.width(), 3);
        assert_eq!(table.cells[0].len(), 3);
        assert!(table.cell(0, 2).is_empty());
        assert_eq!(table.cells[1].len(), 3);
    }

    #[test]
    fn parse_errors() {
        assert!(parse_delimited("", ',').is_err());
        assert!(parse_delimited("only\n1\n", ',').is_err());
        assert!(parse_delimited("id,a\nn1,\"open\n", ',').is_err());
    }

    #[test]
    fn quoted_field_cannot_span_lines() {
        let err = parse_delimited("id,\"cat\none\",b\nn1,1,2\n", ',').unwrap_err();
        assert_eq!(err, "unterminated quoted field");

        let err = parse_delimited("id,a\n\"n\n1\",3\n", ',').unwrap_err();
        assert_eq!(err, "row 2: unterminated quoted field");
    }

    #[test]
    fn json_workbook() {
        let wb = Workbook::from_json(
            r#"{"sheets": [
                {"name": "S1", "categories": ["a", "b"], "counts": [[1, 2], [3, null], ["x", 4]]},
                {"name": "S2", "neurons": ["p", "q"], "categories": ["a", "b"], "counts": [[1, 0], [0, 1]]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(wb.sheet_names(), ["S1", "S2"]);
        let s1 = wb.read_sheet("S1").unwrap();
        assert_eq!(s1.neurons, vec!["N1", "N2", "N3"]);
        assert!(s1.cell(1, 1).is_empty());
        assert_eq!(s1.cell(2, 0).value(), CellValue::NonNumeric);
        assert_eq!(wb.read_sheet("S2").unwrap().neurons, vec!["p", "q"]);
        assert!(matches!(
            wb.read_sheet("S9"),
            Err(QcError::Source { .. })
        ));
    }

    #[test]
    fn json_workbook_rejects_duplicates_and_garbage() {
        let dup = r#"{"sheets": [
            {"name": "S", "categories": ["a"], "counts": []},
            {"name": "S", "categories": ["a"], "counts": []}
        ]}"#;
        assert!(matches!(Workbook::from_json(dup), Err(QcError::Config(_))));
        assert!(matches!(Workbook::from_json("{"), Err(QcError::Config(_))));
    }

    #[test]
    fn directory_workbook_reads_lazily() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "id,x,y\nn1,1,2\n").unwrap();
        fs::write(dir.path().join("a.tsv"), "id\tx\ty\nn1\t3\t4\n").unwrap();
        fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let wb = Workbook::open(dir.path()).unwrap();
        assert_eq!(wb.sheet_names(), ["a", "b"]);
        assert_eq!(wb.read_sheet("a").unwrap().cell(0, 1).value(), CellValue::Value(4.0));

        fs::remove_file(dir.path().join("b.csv")).unwrap();
        let err = wb.read_sheet("b").unwrap_err();
        assert!(err.is_per_sheet());
    }

    #[test]
    fn missing_or_unsupported_input() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Workbook::open(&dir.path().join("nope.json")),
            Err(QcError::Config(_))
        ));
        let odd = dir.path().join("data.xlsx");
        fs::write(&odd, "binary").unwrap();
        assert!(matches!(Workbook::open(&odd), Err(QcError::Config(_))));
    }
}
