use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Genres offered to every user and used whenever stored preferences are unusable
pub const DEFAULT_GENRES: [&str; 10] = [
    "Action",
    "Comedy",
    "Drama",
    "Sci-Fi",
    "Romance",
    "Horror",
    "Thriller",
    "Family",
    "Animation",
    "Documentary",
];

/// A user's preferred genres: ordered, unique by value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct GenrePreferenceSet(Vec<String>);

impl Default for GenrePreferenceSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl GenrePreferenceSet {
    /// The fixed default genre list
    pub fn defaults() -> Self {
        Self(DEFAULT_GENRES.iter().map(|g| g.to_string()).collect())
    }

    /// Builds a set from names, trimming them and dropping blanks and repeats
    ///
    /// Returns `None` when nothing usable remains.
    pub fn from_names<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut genres: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || genres.iter().any(|g| g == name) {
                continue;
            }
            genres.push(name.to_string());
        }

        if genres.is_empty() {
            None
        } else {
            Some(Self(genres))
        }
    }

    /// Normalizes a stored `preferences` value
    ///
    /// The column holds either a JSON-encoded string (`"[\"Action\"]"`) or an
    /// already structured array. Anything else yields `None`.
    pub fn from_stored(value: &Value) -> Option<Self> {
        match value {
            Value::String(encoded) => {
                let decoded: Value = serde_json::from_str(encoded).ok()?;
                match decoded {
                    Value::Array(items) => Self::from_array(&items),
                    _ => None,
                }
            }
            Value::Array(items) => Self::from_array(items),
            _ => None,
        }
    }

    fn from_array(items: &[Value]) -> Option<Self> {
        Self::from_names(items.iter().filter_map(Value::as_str))
    }

    /// JSON-encoded form written back to the store
    pub fn to_stored(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}
