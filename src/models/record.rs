//! Residence record data structure.

/// One scraped listing with its available fields.
///
/// The upstream site does not guarantee stable column names across scrapes
/// ("Residence", "résidence" and "titre" have all been observed for the same
/// logical field), so a record is nothing more than an ordered list of named
/// fields. Lookups go through [`ResidenceRecord::field`], which matches
/// field names case-insensitively against a caller-supplied alias table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResidenceRecord {
    fields: Vec<(String, String)>,
}

impl ResidenceRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(name, value)` pairs, preserving order.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    /// Append a field. Duplicate names are kept; `field` returns the first.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Look up a field value under any of the accepted aliases.
    ///
    /// Field names are trimmed and lowercased before comparison, so aliases
    /// must be given in lowercase. Returns the first match in field order.
    pub fn field(&self, aliases: &[&str]) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| {
                let folded = name.trim().to_lowercase();
                aliases.iter().any(|alias| folded == *alias)
            })
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True if the record has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
