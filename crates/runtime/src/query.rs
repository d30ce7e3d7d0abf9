//! Search-query extraction from natural-language requests.
//!
//! Recovers the `X` in phrasings like "find X in google" or "google X" when
//! the model left the query argument empty. Everything here is pure and
//! deterministic.

use std::sync::OnceLock;

use regex::Regex;

/// Phrases naming the search engine explicitly. Order matters: "search for"
/// must be tried before "search" so the `for` is not captured.
const ANCHORED_PATTERNS: &[&str] = &[
    r"(?i)\bfind\s+(.+)\s+in\s+google\b",
    r"(?i)\bsearch\s+for\s+(.+)\s+in\s+google\b",
    r"(?i)\bsearch\s+(.+)\s+in\s+google\b",
    r"(?i)\blook\s+up\s+(.+)\s+in\s+google\b",
    r"(?i)\bgoogle\s+(.+)$",
];

/// Bare search verbs at the start of the request.
const VERB_PATTERNS: &[&str] = &[
    r"(?i)^find\s+(.+)$",
    r"(?i)^search\s+for\s+(.+)$",
    r"(?i)^search\s+(.+)$",
    r"(?i)^look\s+up\s+(.+)$",
];

const LEADING_MARKERS: &[&str] = &[
    r"(?i)^find\s+",
    r"(?i)^search\s+for\s+",
    r"(?i)^search\s+",
    r"(?i)^look\s+up\s+",
];

static ANCHORED: OnceLock<Vec<Regex>> = OnceLock::new();
static VERBS: OnceLock<Vec<Regex>> = OnceLock::new();
static LEADING: OnceLock<Vec<Regex>> = OnceLock::new();
static ENGINE_SUFFIX: OnceLock<Option<Regex>> = OnceLock::new();
static MARKER_WORDS: OnceLock<Option<Regex>> = OnceLock::new();

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

fn anchored() -> &'static [Regex] {
    ANCHORED.get_or_init(|| compile(ANCHORED_PATTERNS))
}

fn verbs() -> &'static [Regex] {
    VERBS.get_or_init(|| compile(VERB_PATTERNS))
}

fn leading() -> &'static [Regex] {
    LEADING.get_or_init(|| compile(LEADING_MARKERS))
}

fn engine_suffix() -> Option<&'static Regex> {
    ENGINE_SUFFIX
        .get_or_init(|| Regex::new(r"(?i)(?:^|\s+)in\s+google\b.*$").ok())
        .as_ref()
}

fn marker_words() -> Option<&'static Regex> {
    MARKER_WORDS
        .get_or_init(|| Regex::new(r"(?i)\b(?:in\s+google|find|search|for)\b").ok())
        .as_ref()
}

/// Extract a search query from the user's phrasing.
///
/// Tries the phrases that name the search engine first, then bare search
/// verbs, then strips known markers. Returns `None` when nothing marks the
/// text as a search request or the remainder is empty.
pub fn extract(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    anchored()
        .iter()
        .chain(verbs())
        .find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .and_then(|m| clean(m.as_str()))
        })
        .or_else(|| strip_leading_and_suffix(text))
}

/// Last-resort repair: drop every search marker word and keep the rest.
pub fn strip_markers(text: &str) -> Option<String> {
    let stripped = match marker_words() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    };
    let words: Vec<&str> = stripped.split_whitespace().collect();
    (!words.is_empty()).then(|| words.join(" "))
}

fn clean(capture: &str) -> Option<String> {
    let mut query = capture.trim();
    if let Some(re) = engine_suffix()
        && let Some(m) = re.find(query)
    {
        query = &query[..m.start()];
    }

    let query = query.trim();
    let query = match strip_prefix_ignore_case(query, "for ") {
        Some(rest) => rest,
        None if query.eq_ignore_ascii_case("for") => "",
        None => query,
    };
    let query = query
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(['.', '?', '!', ','])
        .trim();

    (!query.is_empty()).then(|| query.to_string())
}

fn strip_leading_and_suffix(text: &str) -> Option<String> {
    let mut rest = text.to_string();
    let mut stripped = false;

    for re in leading() {
        if let Some(m) = re.find(&rest) {
            rest = rest[m.end()..].to_string();
            stripped = true;
        }
    }
    if let Some(re) = engine_suffix()
        && let Some(m) = re.find(&rest)
    {
        rest.truncate(m.start());
        stripped = true;
    }

    if !stripped {
        return None;
    }
    clean(&rest)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}
