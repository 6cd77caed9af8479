use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::territory::{RegionKind, TerritorySets};

pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_RESULTS: usize = 10;

/// Lowercase, decompose, drop combining marks, trim. "Áncash" → "ancash".
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub kind: RegionKind,
    /// Index into the tier of the `TerritorySets` the index was built from.
    pub index: usize,
    pub name: String,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    entries: Vec<(String, SearchHit)>,
}

impl SearchIndex {
    /// Entries are laid out departments, provinces, districts; query results
    /// keep that order.
    pub fn build(sets: &TerritorySets) -> Self {
        let mut entries = Vec::with_capacity(
            sets.departments.len() + sets.provinces.len() + sets.districts.len(),
        );
        for kind in [RegionKind::Department, RegionKind::Province, RegionKind::District] {
            for (index, entity) in sets.layer(kind).iter().enumerate() {
                let code = entity.code.clone();
                let haystack = normalize_text(&format!(
                    "{} {}",
                    entity.name,
                    code.as_deref().unwrap_or_default()
                ));
                entries.push((
                    haystack,
                    SearchHit {
                        kind,
                        index,
                        name: entity.name.clone(),
                        code,
                    },
                ));
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn query(&self, raw: &str) -> Vec<SearchHit> {
        if raw.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }
        let needle = normalize_text(raw);
        self.entries
            .iter()
            .filter(|(haystack, _)| haystack.contains(&needle))
            .take(MAX_RESULTS)
            .map(|(_, hit)| hit.clone())
            .collect()
    }
}
