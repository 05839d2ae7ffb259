use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index-level attribute configuration shared by every engine backend.
///
/// Searchable attributes are listed in descending importance; an engine
/// weighs matches in earlier attributes higher. Stop words are dropped
/// from query text and synonyms expand query terms, both at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    pub searchable_attributes: Vec<String>,
    pub filterable_attributes: Vec<String>,
    pub sortable_attributes: Vec<String>,
    pub ranking_rules: Vec<String>,
    pub stop_words: Vec<String>,
    pub synonyms: HashMap<String, Vec<String>>,
}

impl Default for IndexSettings {
    fn default() -> Self {
        let mut synonyms = HashMap::new();
        synonyms.insert(
            "movie".to_string(),
            vec!["film".to_string(), "cinema".to_string()],
        );
        synonyms.insert(
            "tv".to_string(),
            vec![
                "television".to_string(),
                "series".to_string(),
                "show".to_string(),
            ],
        );
        synonyms.insert(
            "music".to_string(),
            vec!["audio".to_string(), "song".to_string(), "album".to_string()],
        );
        synonyms.insert(
            "game".to_string(),
            vec!["gaming".to_string(), "videogame".to_string()],
        );

        Self {
            searchable_attributes: vec![
                "name".to_string(),
                "tags".to_string(),
                "description".to_string(),
            ],
            filterable_attributes: vec![
                "category".to_string(),
                "tags".to_string(),
                "media_type".to_string(),
                "resolution".to_string(),
                "codec".to_string(),
                "quality".to_string(),
                "uploaded_at".to_string(),
                "size".to_string(),
                "seeders".to_string(),
                "leechers".to_string(),
                "uploader".to_string(),
                "uploader_id".to_string(),
                "year".to_string(),
                "is_freeleech".to_string(),
                "is_double_upload".to_string(),
                "is_featured".to_string(),
            ],
            sortable_attributes: vec![
                "uploaded_at".to_string(),
                "size".to_string(),
                "seeders".to_string(),
                "leechers".to_string(),
                "snatched".to_string(),
                "rating".to_string(),
                "comment_count".to_string(),
                "is_featured".to_string(),
            ],
            ranking_rules: vec![
                "typo".to_string(),
                "words".to_string(),
                "proximity".to_string(),
                "attribute".to_string(),
                "sort".to_string(),
                "exactness".to_string(),
            ],
            stop_words: vec![
                "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            synonyms,
        }
    }
}

impl IndexSettings {
    /// Add a synonym mapping; query terms equal to `word` also match its
    /// synonyms
    pub fn add_synonym(mut self, word: impl Into<String>, synonyms: Vec<String>) -> Self {
        self.synonyms.insert(word.into(), synonyms);
        self
    }

    pub fn is_stop_word(&self, term: &str) -> bool {
        self.stop_words.iter().any(|w| w == term)
    }

    /// The term plus its configured synonyms
    pub fn expand_term(&self, term: &str) -> Vec<String> {
        let mut expanded = vec![term.to_string()];
        if let Some(synonyms) = self.synonyms.get(term) {
            expanded.extend(synonyms.iter().cloned());
        }
        expanded
    }

    /// Match weight of a searchable attribute; earlier attributes in the
    /// configured list weigh more
    pub fn attribute_weight(&self, attribute: &str) -> f32 {
        match self
            .searchable_attributes
            .iter()
            .position(|a| a == attribute)
        {
            Some(0) => 10.0,
            Some(1) => 5.0,
            Some(2) => 3.0,
            Some(_) => 1.0,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_attribute_sets() {
        let settings = IndexSettings::default();
        assert_eq!(settings.searchable_attributes[0], "name");
        assert!(settings
            .filterable_attributes
            .contains(&"category".to_string()));
        assert!(settings
            .sortable_attributes
            .contains(&"seeders".to_string()));
        assert_eq!(settings.ranking_rules.len(), 6);
    }

    #[test]
    fn test_stop_words() {
        let settings = IndexSettings::default();
        assert!(settings.is_stop_word("the"));
        assert!(!settings.is_stop_word("ubuntu"));
    }

    #[test]
    fn test_synonym_expansion() {
        let settings = IndexSettings::default();
        let expanded = settings.expand_term("movie");
        assert!(expanded.contains(&"film".to_string()));
        assert!(expanded.contains(&"cinema".to_string()));
        assert_eq!(settings.expand_term("ubuntu"), vec!["ubuntu"]);
    }

    #[test]
    fn test_attribute_weights_follow_declaration_order() {
        let settings = IndexSettings::default();
        assert!(settings.attribute_weight("name") > settings.attribute_weight("tags"));
        assert!(settings.attribute_weight("tags") > settings.attribute_weight("description"));
        assert_eq!(settings.attribute_weight("seeders"), 0.0);
    }
}
