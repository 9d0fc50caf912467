//! Keyword detection over an incoming chat message.

use regex::Regex;
use std::sync::LazyLock;

/// Letter-dash-digits equipment tag, e.g. `P-101`.
static EQUIPMENT_TOKEN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)\b([a-z]{1,4}-\d{1,6})\b").ok());

const ANOMALY_WORDS: &[&str] = &["anomal", "anomaly", "défaut", "defaut", "problème", "probleme"];
const CRITICAL_WORDS: &[&str] = &["critique", "critical", "urgent"];
const STATISTICS_WORDS: &[&str] = &["statisti", "stats", "combien", "nombre", "kpi", "taux"];
const MAINTENANCE_WORDS: &[&str] = &["maintenance", "arrêt", "arret", "planning", "fenêtre", "fenetre"];
const EQUIPMENT_WORDS: &[&str] = &["équipement", "equipement", "equipment", "machine"];
const SEARCH_WORDS: &[&str] = &["rechercher", "recherche", "chercher", "cherche", "search", "trouver", "trouve"];
const HELP_WORDS: &[&str] = &["aide", "help", "comment", "que peux-tu", "que sais-tu"];

/// Words dropped from the start of a search term.
const SEARCH_STOP_WORDS: &[&str] = &[
    "les", "le", "la", "l'", "des", "de", "du", "d'", "une", "un", "moi", "anomalie", "anomalies",
    "sur", "pour", "avec", "concernant", "à", "a", "toutes", "tous",
];

/// What a message asks about, as far as keywords tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triggers {
    pub anomaly: bool,
    pub critical: bool,
    pub statistics: bool,
    pub maintenance: bool,
    pub equipment_keyword: bool,
    pub equipment_id: Option<String>,
    pub search: bool,
    pub search_term: Option<String>,
    pub help: bool,
}

/// A chat message with its lower-cased form and detected triggers.
#[derive(Debug, Clone)]
pub struct Message {
    pub original: String,
    pub lower: String,
    pub triggers: Triggers,
}

impl Message {
    pub fn parse(text: &str) -> Self {
        let original = text.trim().to_string();
        let lower = original.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        let statistics = has(STATISTICS_WORDS);
        let search = has(SEARCH_WORDS);
        let triggers = Triggers {
            anomaly: has(ANOMALY_WORDS) || statistics,
            critical: has(CRITICAL_WORDS),
            statistics,
            maintenance: has(MAINTENANCE_WORDS),
            equipment_keyword: has(EQUIPMENT_WORDS),
            equipment_id: equipment_id(&original),
            search,
            search_term: if search { search_term(&lower) } else { None },
            help: has(HELP_WORDS),
        };

        Self {
            original,
            lower,
            triggers,
        }
    }
}

/// First equipment tag in `text`, upper-cased.
pub fn equipment_id(text: &str) -> Option<String> {
    let re = EQUIPMENT_TOKEN.as_ref()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

/// The words following the first search keyword, minus leading filler.
pub fn search_term(lower: &str) -> Option<String> {
    let (pos, word) = SEARCH_WORDS
        .iter()
        .filter_map(|w| lower.find(w).map(|p| (p, *w)))
        .min_by_key(|(p, w)| (*p, std::cmp::Reverse(w.len())))?;
    let rest = &lower[pos + word.len()..];

    let words: Vec<&str> = rest
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-' && c != '\''))
        .filter(|w| !w.is_empty())
        .skip_while(|w| SEARCH_STOP_WORDS.contains(w))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}
