//! Article name resolution against the reference table.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, warn};

use super::similarity::{quick_ratio, ratio};
use super::{ArticleEntry, ArticleReference};
use crate::models::ResolverConfig;

/// Column of the reference table a caller asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArticleField {
    Code,
    Weight,
}

impl fmt::Display for ArticleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => write!(f, "CODE"),
            Self::Weight => write!(f, "POIDS/ARTICLE"),
        }
    }
}

/// A resolved reference value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArticleValue {
    Code(String),
    Weight(Decimal),
}

impl fmt::Display for ArticleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{}", code),
            Self::Weight(weight) => write!(f, "{}", weight),
        }
    }
}

/// How a queried name was matched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MatchKind {
    Exact,
    Fuzzy { score: f64 },
    Prefix,
}

/// A reference entry found for a queried name.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleMatch<'r> {
    pub entry: &'r ArticleEntry,
    pub kind: MatchKind,
}

impl ArticleMatch<'_> {
    pub fn is_exact(&self) -> bool {
        self.kind == MatchKind::Exact
    }

    fn value(&self, field: ArticleField) -> Option<ArticleValue> {
        match field {
            ArticleField::Code => self.entry.code.clone().map(ArticleValue::Code),
            ArticleField::Weight => self.entry.weight.map(ArticleValue::Weight),
        }
    }
}

/// Maps article names to customs codes and unit weights.
///
/// Lookup tries, in order: exact name, best similarity ratio at or above
/// the cutoff, then prefix containment in sheet order. Every inexact match
/// is logged at warn level and a miss at error level; a miss is never an
/// error value.
#[derive(Debug, Clone, Copy)]
pub struct ArticleResolver<'r> {
    reference: &'r ArticleReference,
    cutoff: f64,
    strip_lot_prefix: bool,
}

impl<'r> ArticleResolver<'r> {
    pub fn new(reference: &'r ArticleReference) -> Self {
        Self::with_config(reference, &ResolverConfig::default())
    }

    pub fn with_config(reference: &'r ArticleReference, config: &ResolverConfig) -> Self {
        Self {
            reference,
            cutoff: config.cutoff,
            strip_lot_prefix: config.strip_lot_prefix,
        }
    }

    pub fn reference(&self) -> &'r ArticleReference {
        self.reference
    }

    /// Resolve one field of the article called `name`.
    pub fn resolve(&self, name: &str, field: ArticleField) -> Option<ArticleValue> {
        let query = self.normalize(name);
        let Some(found) = self.lookup(name) else {
            error!("No close matches found for '{}'", query);
            return None;
        };

        let value = found.value(field);
        match (&value, found.kind) {
            (None, _) => {
                error!("Article '{}' has no {} in the reference", found.entry.article, field);
            }
            (Some(value), MatchKind::Exact) => {
                debug!("The {} for {} is {}", field, query, value);
            }
            (Some(value), MatchKind::Fuzzy { score }) => {
                warn!(
                    "No exact match found for '{}'. Closest match: '{}' (ratio {:.3}) with {}='{}'",
                    query, found.entry.article, score, field, value
                );
            }
            (Some(value), MatchKind::Prefix) => {
                warn!(
                    "No exact match found for '{}'. Prefix match: '{}' with {}='{}'",
                    query, found.entry.article, field, value
                );
            }
        }
        value
    }

    /// Customs code of `name`.
    pub fn resolve_code(&self, name: &str) -> Option<String> {
        match self.resolve(name, ArticleField::Code)? {
            ArticleValue::Code(code) => Some(code),
            ArticleValue::Weight(_) => None,
        }
    }

    /// Unit weight of `name`, in kilograms.
    pub fn resolve_weight(&self, name: &str) -> Option<Decimal> {
        match self.resolve(name, ArticleField::Weight)? {
            ArticleValue::Weight(weight) => Some(weight),
            ArticleValue::Code(_) => None,
        }
    }

    /// Find the reference entry for `name` without logging.
    pub fn lookup(&self, name: &str) -> Option<ArticleMatch<'r>> {
        let query = self.normalize(name);
        if query.is_empty() {
            return None;
        }
        let entries = self.reference.entries();

        if let Some(entry) = entries.iter().find(|e| e.article == query) {
            return Some(ArticleMatch {
                entry,
                kind: MatchKind::Exact,
            });
        }

        if let Some((score, entry)) = self.closest(query) {
            return Some(ArticleMatch {
                entry,
                kind: MatchKind::Fuzzy { score },
            });
        }

        entries
            .iter()
            .filter(|e| !e.article.is_empty())
            .find(|e| query.starts_with(e.article.as_str()) || e.article.starts_with(query))
            .map(|entry| ArticleMatch {
                entry,
                kind: MatchKind::Prefix,
            })
    }

    /// Highest-scoring entry at or above the cutoff; equal scores go to the
    /// larger name.
    fn closest(&self, query: &str) -> Option<(f64, &'r ArticleEntry)> {
        let mut best: Option<(f64, &'r ArticleEntry)> = None;
        for entry in self.reference.entries() {
            if quick_ratio(&entry.article, query) < self.cutoff {
                continue;
            }
            let score = ratio(&entry.article, query);
            if score < self.cutoff {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_score, best_entry)) => {
                    score > best_score || (score == best_score && entry.article > best_entry.article)
                }
            };
            if better {
                best = Some((score, entry));
            }
        }
        best
    }

    fn normalize<'a>(&self, name: &'a str) -> &'a str {
        let name = name.trim();
        if !self.strip_lot_prefix {
            return name;
        }
        match name.split_once(char::is_whitespace) {
            Some((first, rest)) if first.eq_ignore_ascii_case("LOT") || first.eq_ignore_ascii_case("LOTS") => {
                rest.trim_start()
            }
            _ => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::articles::tests::sample_reference;
    use pretty_assertions::assert_eq;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `f` and return its value with the log lines it emitted.
    fn with_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let value = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (value, text)
    }

    #[test]
    fn test_exact_match() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        let found = resolver.lookup("ROBE").unwrap();
        assert!(found.is_exact());
        assert_eq!(resolver.resolve_code("ROBE"), Some("62044200".to_string()));
        assert_eq!(resolver.resolve_weight("ROBE"), Some("0.5".parse().unwrap()));
    }

    #[test]
    fn test_fuzzy_match() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        let found = resolver.lookup("TUNIQUES").unwrap();
        assert_eq!(found.entry.article, "TUNIQUE");
        assert!(matches!(found.kind, MatchKind::Fuzzy { score } if score > 0.9));
        assert_eq!(resolver.resolve_code("TUNIQUES"), Some("06114200".to_string()));
    }

    #[test]
    fn test_prefix_match() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        // Ratio 8/21 is below the cutoff; the prefix rule still finds it.
        let found = resolver.lookup("ROBEFLEURIELONGUE").unwrap();
        assert_eq!(found.entry.article, "ROBE");
        assert_eq!(found.kind, MatchKind::Prefix);
    }

    #[test]
    fn test_lot_prefix_is_stripped() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        assert!(resolver.lookup("LOT PANTALON").unwrap().is_exact());
        assert!(resolver.lookup("LOTS TSHIRT").unwrap().is_exact());

        let config = ResolverConfig {
            strip_lot_prefix: false,
            ..ResolverConfig::default()
        };
        let strict = ArticleResolver::with_config(&reference, &config);
        assert!(!strict.lookup("LOT PANTALON").unwrap().is_exact());
    }

    #[test]
    fn test_not_found() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        assert!(resolver.lookup("XYZ").is_none());
        assert_eq!(resolver.resolve("XYZ", ArticleField::Code), None);
        assert_eq!(resolver.resolve("", ArticleField::Code), None);
    }

    #[test]
    fn test_empty_field_is_not_found() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        assert_eq!(resolver.resolve_code("CEINTURE"), None);
        assert_eq!(resolver.resolve_weight("CEINTURE"), Some("0.1".parse().unwrap()));
    }

    #[test]
    fn test_exact_match_logs_no_warning() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        let (code, logs) = with_logs(|| resolver.resolve_code("ROBE"));
        assert_eq!(code, Some("62044200".to_string()));
        assert!(!logs.contains("WARN"), "{}", logs);
        assert!(!logs.contains("ERROR"), "{}", logs);
    }

    #[test]
    fn test_inexact_matches_log_warnings() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);

        let (_, logs) = with_logs(|| resolver.resolve_code("TUNIQUES"));
        assert!(logs.contains("WARN"), "{}", logs);
        assert!(logs.contains("'TUNIQUES'"), "{}", logs);
        assert!(logs.contains("Closest match: 'TUNIQUE'"), "{}", logs);
        assert!(logs.contains("06114200"), "{}", logs);

        let (_, logs) = with_logs(|| resolver.resolve_code("ROBEFLEURIELONGUE"));
        assert!(logs.contains("WARN"), "{}", logs);
        assert!(logs.contains("Prefix match: 'ROBE'"), "{}", logs);
        assert!(logs.contains("62044200"), "{}", logs);
    }

    #[test]
    fn test_miss_logs_error() {
        let reference = sample_reference();
        let resolver = ArticleResolver::new(&reference);
        let (code, logs) = with_logs(|| resolver.resolve_code("XYZ"));
        assert_eq!(code, None);
        assert!(logs.contains("ERROR"), "{}", logs);
        assert!(logs.contains("No close matches found for 'XYZ'"), "{}", logs);
        assert!(!logs.contains("WARN"), "{}", logs);
    }
}
