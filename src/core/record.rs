//! Equipment records and the placeholder map built from them

use std::collections::HashMap;
use std::fmt;

/// The spreadsheet columns a template can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    EquipmentName,
    Make,
    Model,
    SerialNumber,
    EquipmentId,
    Department,
    CalibrationDate,
    DueDate,
    Clr,
    Ulr,
    Temperature,
    Humidity,
}

impl Field {
    /// All recognized fields, in the order their placeholders are substituted
    pub const ALL: [Field; 12] = [
        Field::EquipmentName,
        Field::Make,
        Field::Model,
        Field::SerialNumber,
        Field::EquipmentId,
        Field::Department,
        Field::CalibrationDate,
        Field::DueDate,
        Field::Clr,
        Field::Ulr,
        Field::Temperature,
        Field::Humidity,
    ];

    /// Column header as it appears in the spreadsheet (after trimming)
    pub fn column(&self) -> &'static str {
        match self {
            Field::EquipmentName => "Equipment name",
            Field::Make => "MK",
            Field::Model => "MO",
            Field::SerialNumber => "SN",
            Field::EquipmentId => "ID",
            Field::Department => "DEPT",
            Field::CalibrationDate => "D Date",
            Field::DueDate => "E date",
            Field::Clr => "CLR",
            Field::Ulr => "ULR",
            Field::Temperature => "TEM",
            Field::Humidity => "HUM",
        }
    }

    /// Placeholder token written in templates, e.g. `<SN>`
    pub fn token(&self) -> String {
        format!("<{}>", self.column())
    }

    /// Report numbers are compared and used in file names, so surrounding
    /// whitespace is dropped from them
    fn trims_value(&self) -> bool {
        matches!(self, Field::Clr | Field::Ulr)
    }

    pub fn from_column(column: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == column)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// One spreadsheet row reduced to the recognized fields.
///
/// Fields that are absent from the sheet or empty in the row read as "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRecord {
    values: HashMap<Field, String>,
}

impl FieldRecord {
    /// Build a record from `(column header, cell value)` pairs.
    ///
    /// Headers are trimmed before lookup; unknown columns are ignored and the
    /// first column carrying a given header wins.
    pub fn from_columns<'a, I>(columns: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut values = HashMap::new();
        for (header, value) in columns {
            let Some(field) = Field::from_column(header.trim()) else {
                continue;
            };
            let value = if field.trims_value() {
                value.trim()
            } else {
                value
            };
            values.entry(field).or_insert_with(|| value.to_string());
        }
        Self { values }
    }

    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map_or("", String::as_str)
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    /// Value used to name this record's output document
    pub fn reference_code(&self) -> &str {
        self.get(Field::Clr)
    }
}

/// Ordered token to replacement pairs for one record.
///
/// Replacement text is uppercased when the map is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    entries: Vec<(String, String)>,
}

impl PlaceholderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_record(record: &FieldRecord) -> Self {
        let entries = Field::ALL
            .iter()
            .map(|field| (field.token(), record.get(*field).to_uppercase()))
            .collect();
        Self { entries }
    }

    pub fn insert(&mut self, token: impl Into<String>, value: &str) {
        self.entries.push((token.into(), value.to_uppercase()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Apply every token in order to `text`.
    ///
    /// Tokens match as plain substrings. Returns `None` when no token occurs.
    pub fn substitute(&self, text: &str) -> Option<String> {
        let mut out: Option<String> = None;
        for (token, value) in self.iter() {
            let current = out.as_deref().unwrap_or(text);
            if current.contains(token) {
                out = Some(current.replace(token, value));
            }
        }
        out
    }
}
