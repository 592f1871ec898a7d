use serde::ser::{Serialize, SerializeMap, Serializer};

/// One harvested table row: column name to cell text, in header order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Zip header names to cell texts. Returns `None` when the lengths differ.
    pub fn from_cells(headers: &[String], cells: &[String]) -> Option<Self> {
        if headers.len() != cells.len() {
            return None;
        }
        let fields = headers
            .iter()
            .cloned()
            .zip(cells.iter().cloned())
            .collect();
        Some(Self { fields })
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// Serialized as a flat object whose keys keep header order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Deduplication key for a rendered row.
///
/// Uses the row's stable identifier attribute when present, otherwise its full
/// rendered text. Two distinct rows with identical text and no identifier
/// collapse into one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowIdentity(String);

impl RowIdentity {
    pub fn new(stable_id: Option<&str>, rendered_text: &str) -> Self {
        match stable_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => Self(id.to_string()),
            None => Self(rendered_text.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
