//! Local English→Telugu phrase dictionary, the last tier of the fallback chain.

/// Common phrases, most specific first within each theme
const BUILTIN_ENTRIES: &[(&str, &str)] = &[
    ("hello", "హలో"),
    ("hi", "హాయ్"),
    ("good morning", "శుభోదయం"),
    ("good afternoon", "శుభ మధ్యాహ్నం"),
    ("good evening", "శుభ సాయంత్రం"),
    ("good night", "శుభ రాత్రి"),
    ("goodbye", "వీడ్కోలు"),
    ("how are you", "మీరు ఎలా ఉన్నారు"),
    ("i am fine", "నేను బాగున్నాను"),
    ("thank you", "ధన్యవాదాలు"),
    ("thanks", "ధన్యవాదాలు"),
    ("please", "దయచేసి"),
    ("sorry", "క్షమించండి"),
    ("welcome", "స్వాగతం"),
    ("yes", "అవును"),
    ("no", "కాదు"),
    ("what is your name", "మీ పేరు ఏమిటి"),
    ("my name is", "నా పేరు"),
    ("i love you", "నేను నిన్ను ప్రేమిస్తున్నాను"),
    ("where are you going", "మీరు ఎక్కడికి వెళ్తున్నారు"),
    ("see you later", "తర్వాత కలుద్దాం"),
    ("friend", "స్నేహితుడు"),
    ("mother", "అమ్మ"),
    ("father", "నాన్న"),
    ("water", "నీరు"),
    ("food", "ఆహారం"),
    ("home", "ఇల్లు"),
    ("book", "పుస్తకం"),
    ("school", "పాఠశాల"),
    ("love", "ప్రేమ"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictionaryMatch {
    /// The whole line is a dictionary key
    Exact(String),
    /// A key phrase occurs inside the line, or the line is part of a key
    Partial(String),
    Miss,
}

#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: Vec<(String, String)>,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Dictionary {
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_ENTRIES.iter().copied())
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.to_string()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a line: exact on the lowercase trimmed text, then by phrase.
    ///
    /// Phrase matching compares punctuation-stripped words. The longest key
    /// found inside the line wins; otherwise the shortest key that contains
    /// the whole line, provided the line covers at least half of its words.
    pub fn lookup(&self, text: &str) -> DictionaryMatch {
        let normalized = text.trim().to_lowercase();
        if normalized.is_empty() {
            return DictionaryMatch::Miss;
        }

        if let Some((_, value)) = self.entries.iter().find(|(key, _)| *key == normalized) {
            return DictionaryMatch::Exact(value.clone());
        }

        let line_words = words(&normalized);
        if line_words.is_empty() {
            return DictionaryMatch::Miss;
        }

        let inside_line = self
            .entries
            .iter()
            .map(|(key, value)| (words(key), value))
            .filter(|(key_words, _)| contains_phrase(&line_words, key_words))
            .max_by_key(|(key_words, _)| key_words.len());
        if let Some((_, value)) = inside_line {
            return DictionaryMatch::Partial(value.clone());
        }

        let around_line = self
            .entries
            .iter()
            .map(|(key, value)| (words(key), value))
            .filter(|(key_words, _)| line_words.len() * 2 >= key_words.len())
            .filter(|(key_words, _)| contains_phrase(key_words, &line_words))
            .min_by_key(|(key_words, _)| key_words.len());
        match around_line {
            Some((_, value)) => DictionaryMatch::Partial(value.clone()),
            None => DictionaryMatch::Miss,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether `needle` occurs as a contiguous run of words in `haystack`
fn contains_phrase(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty()
        && needle.len() <= haystack.len()
        && haystack.windows(needle.len()).any(|w| w == needle)
}
