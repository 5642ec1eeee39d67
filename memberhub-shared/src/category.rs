/// Article category normalization
///
/// Articles carry one of five canonical topic tags. Older rows (and some
/// clients) still use legacy labels, so every write normalizes the submitted
/// label and every read expands a canonical category back into all the labels
/// that may be stored for it.
///
/// # Aliases
///
/// | Legacy label | Canonical    |
/// |--------------|--------------|
/// | `avantages`  | `prestations`|
/// | `prestation` | `prestations`|
/// | `activites`  | `prestations`|
///
/// # Example
///
/// ```
/// use memberhub_shared::category::ArticleCategory;
///
/// assert_eq!(ArticleCategory::normalize("avantages"), Some(ArticleCategory::Prestations));
/// assert_eq!(ArticleCategory::normalize(" Voyages "), Some(ArticleCategory::Voyages));
/// assert_eq!(ArticleCategory::normalize("unknown"), None);
///
/// // Read-path expansion
/// assert!(ArticleCategory::Prestations.stored_labels().contains(&"avantages"));
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical article categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleCategory {
    General,
    Prestations,
    Voyages,
    Retraites,
    Evenements,
}

/// Canonical category → legacy labels still found in stored rows
const LEGACY_ALIASES: &[(ArticleCategory, &[&str])] = &[
    (ArticleCategory::General, &[]),
    (
        ArticleCategory::Prestations,
        &["avantages", "prestation", "activites"],
    ),
    (ArticleCategory::Voyages, &[]),
    (ArticleCategory::Retraites, &[]),
    (ArticleCategory::Evenements, &[]),
];

impl ArticleCategory {
    /// All canonical categories
    pub const ALL: [ArticleCategory; 5] = [
        ArticleCategory::General,
        ArticleCategory::Prestations,
        ArticleCategory::Voyages,
        ArticleCategory::Retraites,
        ArticleCategory::Evenements,
    ];

    /// Canonical label as stored on write
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleCategory::General => "general",
            ArticleCategory::Prestations => "prestations",
            ArticleCategory::Voyages => "voyages",
            ArticleCategory::Retraites => "retraites",
            ArticleCategory::Evenements => "evenements",
        }
    }

    /// Maps a user-supplied or stored label to its canonical category
    ///
    /// Matching ignores surrounding whitespace and ASCII case. Returns `None`
    /// for labels that are neither canonical nor a known legacy alias.
    pub fn normalize(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();

        LEGACY_ALIASES.iter().find_map(|(canonical, aliases)| {
            if canonical.as_str() == label || aliases.contains(&label.as_str()) {
                Some(*canonical)
            } else {
                None
            }
        })
    }

    /// Legacy labels that normalize to this category
    pub fn legacy_aliases(&self) -> &'static [&'static str] {
        LEGACY_ALIASES
            .iter()
            .find(|(canonical, _)| canonical == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }

    /// Every label a stored row of this category may carry
    ///
    /// Used to expand list queries so rows still tagged with a legacy alias
    /// are returned alongside canonical ones.
    pub fn stored_labels(&self) -> Vec<&'static str> {
        let mut labels = vec![self.as_str()];
        labels.extend_from_slice(self.legacy_aliases());
        labels
    }
}

impl fmt::Display for ArticleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
