//! Global query settings, written as the bracketed prologue
//! `[out:json][timeout:25]...;`

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

use crate::errors::{Result, SkywayError};
use crate::models::bbox::Bbox;

/// One `[name:value]` clause of the prologue
pub trait Setting {
    fn param_name(&self) -> &'static str;

    fn format_value(&self) -> String;

    fn format(&self) -> String {
        format!("[{}:{}]", self.param_name(), self.format_value())
    }
}

/// Columns used when none are given; Overpass requires a field list
pub const DEFAULT_CSV_COLUMNS: &[&str] = &["::type", "::id"];

/// Column layout for `[out:csv(...)]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvFormat {
    pub columns: Vec<String>,
    pub header: bool,
    pub separator: String,
}

impl Default for CsvFormat {
    fn default() -> Self {
        Self {
            columns: DEFAULT_CSV_COLUMNS.iter().map(|c| c.to_string()).collect(),
            header: true,
            separator: "\t".to_string(),
        }
    }
}

impl CsvFormat {
    /// An empty column list falls back to [`DEFAULT_CSV_COLUMNS`]
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Self::default();
        }
        Self {
            columns,
            ..Self::default()
        }
    }

    fn separator_literal(&self) -> String {
        self.separator
            .replace('\\', "\\\\")
            .replace('\t', "\\t")
            .replace('"', "\\\"")
    }
}

impl fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = if self.columns.is_empty() {
            DEFAULT_CSV_COLUMNS.join(",")
        } else {
            self.columns.join(",")
        };
        write!(
            f,
            "csv({};{};\"{}\")",
            columns,
            self.header,
            self.separator_literal()
        )
    }
}

/// Value of the `out` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Csv(CsvFormat),
    Xml,
    Custom,
    Popup,
}

impl PayloadFormat {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv(CsvFormat::default())),
            "xml" => Ok(Self::Xml),
            "custom" => Ok(Self::Custom),
            "popup" => Ok(Self::Popup),
            other => Err(SkywayError::unsupported_format(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv(_) => "csv",
            Self::Xml => "xml",
            Self::Custom => "custom",
            Self::Popup => "popup",
        }
    }

    /// Whether the client can decode responses in this format
    pub fn is_decodable(&self) -> bool {
        matches!(self, Self::Json | Self::Csv(_))
    }
}

impl Setting for PayloadFormat {
    fn param_name(&self) -> &'static str {
        "out"
    }

    fn format_value(&self) -> String {
        match self {
            Self::Csv(csv) => csv.to_string(),
            other => other.name().to_string(),
        }
    }
}

/// Server-side runtime limit in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(pub u32);

impl Setting for Timeout {
    fn param_name(&self) -> &'static str {
        "timeout"
    }

    fn format_value(&self) -> String {
        self.0.to_string()
    }
}

/// Server-side memory limit in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Maxsize(pub u64);

impl Setting for Maxsize {
    fn param_name(&self) -> &'static str {
        "maxsize"
    }

    fn format_value(&self) -> String {
        self.0.to_string()
    }
}

/// Attic date; always held in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDate(pub DateTime<Utc>);

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

impl QueryDate {
    /// Parse a date, converting any offset to UTC
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self(dt.with_timezone(&Utc)));
        }

        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
                return Ok(Self(naive.and_utc()));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Self(naive.and_utc()));
            }
        }

        Err(SkywayError::construction(format!(
            "unrecognized date '{}'",
            text
        )))
    }
}

impl Setting for QueryDate {
    fn param_name(&self) -> &'static str {
        "date"
    }

    fn format_value(&self) -> String {
        format!("\"{}\"", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

impl Setting for Bbox {
    fn param_name(&self) -> &'static str {
        "bbox"
    }

    fn format_value(&self) -> String {
        self.to_string()
    }
}

/// Optional prologue parameters; unset ones are omitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySettings {
    payload_format: Option<PayloadFormat>,
    timeout: Option<Timeout>,
    maxsize: Option<Maxsize>,
    date: Option<QueryDate>,
    bbox: Option<Bbox>,
}

impl QuerySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = Some(format);
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(Timeout(seconds));
        self
    }

    pub fn with_maxsize(mut self, bytes: u64) -> Self {
        self.maxsize = Some(Maxsize(bytes));
        self
    }

    pub fn with_date(mut self, date: QueryDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_bbox(mut self, bbox: Bbox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn payload_format(&self) -> Option<&PayloadFormat> {
        self.payload_format.as_ref()
    }

    pub fn set_payload_format(&mut self, format: Option<PayloadFormat>) {
        self.payload_format = format;
    }

    pub fn timeout(&self) -> Option<u32> {
        self.timeout.map(|t| t.0)
    }

    pub fn set_timeout(&mut self, seconds: Option<u32>) {
        self.timeout = seconds.map(Timeout);
    }

    pub fn maxsize(&self) -> Option<u64> {
        self.maxsize.map(|m| m.0)
    }

    pub fn set_maxsize(&mut self, bytes: Option<u64>) {
        self.maxsize = bytes.map(Maxsize);
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date.map(|d| d.0)
    }

    pub fn set_date(&mut self, date: Option<QueryDate>) {
        self.date = date;
    }

    pub fn bbox(&self) -> Option<Bbox> {
        self.bbox
    }

    pub fn set_bbox(&mut self, bbox: Option<Bbox>) {
        self.bbox = bbox;
    }

    fn clauses(&self) -> Vec<&dyn Setting> {
        let mut clauses: Vec<&dyn Setting> = Vec::new();
        if let Some(out) = &self.payload_format {
            clauses.push(out);
        }
        if let Some(timeout) = &self.timeout {
            clauses.push(timeout);
        }
        if let Some(maxsize) = &self.maxsize {
            clauses.push(maxsize);
        }
        if let Some(date) = &self.date {
            clauses.push(date);
        }
        if let Some(bbox) = &self.bbox {
            clauses.push(bbox);
        }
        clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses().is_empty()
    }
}

impl fmt::Display for QuerySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clauses = self.clauses();
        if clauses.is_empty() {
            return Ok(());
        }
        for clause in clauses {
            f.write_str(&clause.format())?;
        }
        f.write_str(";")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_settings() {
        let settings = QuerySettings::new();
        assert!(settings.is_empty());
        assert_eq!(settings.to_string(), "");
    }

    #[test]
    fn test_single_clause_each() {
        let date = QueryDate::parse("2020-01-01").unwrap();
        let bbox = Bbox::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let cases = vec![
            (QuerySettings::new().with_payload_format(PayloadFormat::Json), "[out:json];"),
            (QuerySettings::new().with_timeout(60), "[timeout:60];"),
            (QuerySettings::new().with_maxsize(1073741824), "[maxsize:1073741824];"),
            (QuerySettings::new().with_date(date), "[date:\"2020-01-01T00:00:00Z\"];"),
            (QuerySettings::new().with_bbox(bbox), "[bbox:1.00,2.00,3.00,4.00];"),
        ];
        for (settings, expected) in cases {
            assert_eq!(settings.to_string(), expected);
        }
    }

    #[test]
    fn test_all_clauses_in_order() {
        let settings = QuerySettings::new()
            .with_bbox(Bbox::new(1.0, 2.0, 3.0, 4.0).unwrap())
            .with_date(QueryDate::parse("2019-06-01T12:30:00Z").unwrap())
            .with_maxsize(1000)
            .with_timeout(25)
            .with_payload_format(PayloadFormat::Json);
        assert_eq!(
            settings.to_string(),
            "[out:json][timeout:25][maxsize:1000][date:\"2019-06-01T12:30:00Z\"][bbox:1.00,2.00,3.00,4.00];"
        );
    }

    #[test]
    fn test_setters_clear() {
        let mut settings = QuerySettings::new().with_timeout(10);
        assert_eq!(settings.timeout(), Some(10));
        settings.set_timeout(None);
        assert_eq!(settings.to_string(), "");
    }

    #[test]
    fn test_date_normalizes_offset() {
        let date = QueryDate::parse("2020-01-01T02:00:00+02:00").unwrap();
        assert_eq!(date.0, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(date.format(), "[date:\"2020-01-01T00:00:00Z\"]");
    }

    #[test]
    fn test_date_flexible_inputs() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
        for text in [
            "2021-03-04T05:06:07",
            "2021-03-04 05:06:07",
            "2021-03-04T05:06:07Z",
            " 2021-03-04T05:06:07.250Z ",
        ] {
            assert_eq!(QueryDate::parse(text).unwrap().0.timestamp(), expected.timestamp());
        }
        assert!(QueryDate::parse("yesterday").is_err());
    }

    #[test]
    fn test_payload_format_parse() {
        assert_eq!(PayloadFormat::parse("JSON").unwrap(), PayloadFormat::Json);
        assert!(PayloadFormat::parse("xml").unwrap().format_value() == "xml");
        assert!(!PayloadFormat::Popup.is_decodable());
        let err = PayloadFormat::parse("geojson").unwrap_err();
        assert!(matches!(err, SkywayError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_csv_format() {
        assert_eq!(
            PayloadFormat::Csv(CsvFormat::default()).format_value(),
            "csv(::type,::id;true;\"\\t\")"
        );
        assert_eq!(
            PayloadFormat::parse("csv").unwrap().format(),
            "[out:csv(::type,::id;true;\"\\t\")]"
        );
        assert_eq!(
            CsvFormat::with_columns(Vec::<String>::new()).columns,
            vec!["::type", "::id"]
        );

        let bare = CsvFormat {
            columns: Vec::new(),
            ..CsvFormat::default()
        };
        assert_eq!(bare.to_string(), "csv(::type,::id;true;\"\\t\")");

        let csv = CsvFormat::with_columns(["::id", "name"]);
        assert_eq!(
            PayloadFormat::Csv(csv).format(),
            "[out:csv(::id,name;true;\"\\t\")]"
        );

        let csv = CsvFormat {
            columns: vec!["name".to_string()],
            header: false,
            separator: ",".to_string(),
        };
        assert_eq!(csv.to_string(), "csv(name;false;\",\")");
    }
}
