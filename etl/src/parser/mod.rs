//! CSV decoding with encoding and delimiter auto-detection.
//!
//! Turns raw bytes into a [`TabularData`]: ordered headers plus rows of
//! string cells. No shipment-specific logic here; typing happens in
//! [`crate::models`].

use serde_json::{json, Map, Value};

/// CSV parsing error with context
#[derive(Debug, Clone, PartialEq)]
pub struct CsvError {
    pub line: usize,
    pub column: Option<String>,
    pub value: Option<String>,
    pub message: String,
}

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.column, &self.value) {
            (Some(col), Some(val)) => {
                write!(f, "Line {}, column '{}' (value '{}'): {}", self.line, col, val, self.message)
            }
            (Some(col), None) => {
                write!(f, "Line {}, column '{}': {}", self.line, col, self.message)
            }
            _ => {
                write!(f, "Line {}: {}", self.line, self.message)
            }
        }
    }
}

impl std::error::Error for CsvError {}

impl CsvError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column: None,
            value: None,
            message: message.into(),
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// One data row and the source line it came from (1-based, header is line 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub line: usize,
    pub cells: Vec<String>,
}

/// An in-memory table as produced by a [`crate::source::Loader`].
#[derive(Debug, Clone, PartialEq)]
pub struct TabularData {
    /// Column headers, in file order
    pub headers: Vec<String>,
    /// Data rows; every row has exactly `headers.len()` cells
    pub rows: Vec<Row>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl TabularData {
    /// Create an empty table with the given headers.
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            encoding: "utf-8".to_string(),
            delimiter: ',',
        }
    }

    /// Build a table from literal cells. Line numbers are assigned as if the
    /// rows followed a header line.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(headers.iter().copied());
        for cells in rows {
            table.push_row(cells.iter().map(|c| c.to_string()).collect());
        }
        table
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        let line = self.rows.last().map_or(2, |r| r.line + 1);
        self.rows.push(Row { line, cells });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact header name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Required columns that are not present in the header, in the order given.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| self.column_index(col).is_none())
            .map(|col| col.to_string())
            .collect()
    }

    /// Rows as JSON objects keyed by header.
    pub fn to_json_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let mut obj = Map::new();
                for (header, cell) in self.headers.iter().zip(&row.cells) {
                    obj.insert(header.clone(), json!(cell));
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use shipload::parser::csv_to_table;
///
/// let table = csv_to_table("product,on_time\nWidget,true", ',').unwrap();
/// assert_eq!(table.headers, vec!["product", "on_time"]);
/// assert_eq!(table.rows[0].cells[0], "Widget");
/// ```
pub fn csv_to_table(csv: &str, delimiter: char) -> Result<TabularData, CsvError> {
    parse_str(csv, delimiter, "utf-8".to_string())
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> Result<TabularData, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    parse_str(&content, delimiter, encoding)
}

/// Parse CSV text with explicit delimiter, recording the encoding it came from.
///
/// Rows shorter than the header are padded with empty cells; rows longer
/// than the header are rejected. Blank lines are skipped.
pub fn parse_str(content: &str, delimiter: char, encoding: String) -> Result<TabularData, CsvError> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::new(1, "Empty CSV file"));
    }
    if !delimiter.is_ascii() {
        return Err(CsvError::new(0, format!("Delimiter '{}' is not ASCII", delimiter)));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::new(1, format!("Cannot read header: {}", e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::new(1, "No headers found"));
    }
    for (i, header) in headers.iter().enumerate() {
        if !header.is_empty() && headers[..i].contains(header) {
            return Err(CsvError::new(1, "Duplicate column").with_column(header.clone()));
        }
    }

    let mut table = TabularData {
        headers,
        rows: Vec::new(),
        encoding,
        delimiter,
    };

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line() as usize);
            CsvError::new(line, format!("Cannot read record: {}", e))
        })?;
        let line = record.position().map_or(0, |p| p.line() as usize);

        if record.len() <= 1 && record.iter().all(|c| c.is_empty()) {
            continue;
        }
        if record.len() > table.headers.len() {
            return Err(CsvError::new(
                line,
                format!("Expected {} fields, found {}", table.headers.len(), record.len()),
            ));
        }

        let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        cells.resize(table.headers.len(), String::new());
        table.rows.push(Row { line, cells });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = csv_to_table("name,age\nAlice,30\nBob,25", ',').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows[0].cells, vec!["Alice", "30"]);
        assert_eq!(table.rows[1].cells, vec!["Bob", "25"]);
    }

    #[test]
    fn test_line_numbers_follow_source() {
        let table = csv_to_table("a,b\n1,2\n\n3,4\n", ',').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 4);
    }

    #[test]
    fn test_quoted_values() {
        let csv = "name;value\n\"Alice\";\"Hello; World\"";
        let table = csv_to_table(csv, ';').unwrap();

        assert_eq!(table.rows[0].cells, vec!["Alice", "Hello; World"]);
    }

    #[test]
    fn test_missing_values_padded() {
        let table = csv_to_table("a,b,c\n1,,3\n4", ',').unwrap();

        assert_eq!(table.rows[0].cells, vec!["1", "", "3"]);
        assert_eq!(table.rows[1].cells, vec!["4", "", ""]);
    }

    #[test]
    fn test_extra_fields_rejected() {
        let err = csv_to_table("a,b\n1,2\n1,2,3", ',').unwrap_err();

        assert_eq!(err.line, 3);
        assert!(err.message.contains("Expected 2 fields, found 3"));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = csv_to_table("product,product\nA,B", ',').unwrap_err();
        assert_eq!(err.column.as_deref(), Some("product"));
    }

    #[test]
    fn test_error_message_format() {
        let err = CsvError::new(5, "Invalid value")
            .with_column("quantity")
            .with_value("abc");

        let msg = err.to_string();
        assert!(msg.contains("Line 5"));
        assert!(msg.contains("column 'quantity'"));
        assert!(msg.contains("value 'abc'"));
    }

    #[test]
    fn test_empty_csv_error() {
        let err = csv_to_table("", ',').unwrap_err();
        assert!(err.message.contains("Empty"));

        let err = csv_to_table("  \n\n", ',').unwrap_err();
        assert!(err.message.contains("Empty"));
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = csv_to_table("shipment_identifier,on_time\n", ',').unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers.len(), 2);
    }

    #[test]
    fn test_bom_stripped() {
        let table = csv_to_table("\u{feff}origin,destination\nW1,S1", ',').unwrap();
        assert_eq!(table.column_index("origin"), Some(0));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_auto_parse() {
        let csv = "origin_warehouse;product\nW1;Widget\nW2;Gadget";
        let table = parse_bytes_auto(csv.as_bytes()).unwrap();

        assert_eq!(table.delimiter, ';');
        assert_eq!(table.encoding, "utf-8");
        assert_eq!(table.len(), 2);
        assert_eq!(table.headers, vec!["origin_warehouse", "product"]);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_missing_columns_and_json() {
        let table = TabularData::from_rows(&["a", "b"], &[&["1", "2"]]);

        assert_eq!(table.missing_columns(&["a", "c", "d"]), vec!["c", "d"]);
        let records = table.to_json_records();
        assert_eq!(records[0]["a"], "1");
        assert_eq!(records[0]["b"], "2");
    }

    #[test]
    fn test_from_rows_pads_and_numbers() {
        let table = TabularData::from_rows(&["a", "b"], &[&["1"], &["2", "3"]]);

        assert_eq!(table.rows[0].cells, vec!["1", ""]);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.rows[1].line, 3);
    }
}
