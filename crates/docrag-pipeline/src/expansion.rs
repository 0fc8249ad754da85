use std::collections::BTreeMap;

use tracing::debug;

use docrag_core::config::ExpansionSettings;

/// Appends related terms from a fixed term table to matching queries.
///
/// The table is configuration; this type never changes it. A term matches
/// when it occurs in the lowercased query, and contributes its first
/// `max_terms_per_match` related terms in table order.
#[derive(Debug, Clone)]
pub struct KnowledgeExpander {
    terms: BTreeMap<String, Vec<String>>,
    max_terms_per_match: usize,
    enabled: bool,
}

impl KnowledgeExpander {
    pub fn new(settings: &ExpansionSettings) -> Self {
        let terms = settings.terms.iter().map(|(k, v)| (k.to_lowercase(), v.clone())).collect();
        Self { terms, max_terms_per_match: settings.max_terms_per_match, enabled: settings.enabled }
    }

    pub fn is_enabled(&self) -> bool { self.enabled && !self.terms.is_empty() }

    /// Table terms that occur in `query`.
    pub fn matched_terms(&self, query: &str) -> Vec<&str> {
        let lower = query.to_lowercase();
        self.terms.keys().filter(|t| !t.is_empty() && lower.contains(t.as_str())).map(String::as_str).collect()
    }

    /// `query` followed by the related terms of every match, or `query`
    /// unchanged when nothing matches or expansion is disabled.
    pub fn expand(&self, query: &str) -> String {
        if !self.is_enabled() {
            return query.to_string();
        }
        let added: Vec<&str> = self
            .matched_terms(query)
            .into_iter()
            .filter_map(|t| self.terms.get(t))
            .flat_map(|related| related.iter().take(self.max_terms_per_match).map(String::as_str))
            .collect();
        if added.is_empty() {
            return query.to_string();
        }
        debug!(?added, "query expanded");
        format!("{} {}", query, added.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expander() -> KnowledgeExpander {
        let mut terms = BTreeMap::new();
        terms.insert("Judiciary".to_string(), vec!["courts".into(), "judicial system".into(), "supreme court".into()]);
        terms.insert("rights".to_string(), vec!["fundamental rights".into(), "civil rights".into()]);
        KnowledgeExpander::new(&ExpansionSettings { enabled: true, max_terms_per_match: 2, terms })
    }

    #[test]
    fn matching_terms_add_their_first_related_terms() {
        assert_eq!(
            expander().expand("Is the judiciary independent?"),
            "Is the judiciary independent? courts judicial system"
        );
    }

    #[test]
    fn unmatched_or_disabled_leaves_query_alone() {
        assert_eq!(expander().expand("notice period"), "notice period");
        let mut off = expander();
        off.enabled = false;
        assert_eq!(off.expand("rights of citizens"), "rights of citizens");
    }
}
