//! Best-effort extraction from RateMyProfessors pages
//!
//! All functions here are pure and operate on scraped markdown.

use once_cell::sync::Lazy;
use regex::Regex;

/// Generic words that say nothing about which university a profile belongs to
const UNIVERSITY_STOP_WORDS: [&str; 13] = [
    "university",
    "college",
    "institute",
    "school",
    "of",
    "the",
    "and",
    "at",
    "in",
    "state",
    "campus",
    "department",
    "faculty",
];

const MAX_TAGS: usize = 10;
const MAX_REVIEWS: usize = 5;

static PROFILE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/professor/(\d+)").expect("valid id regex"));
static OVERALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Overall Quality\s*([\d.]+)").expect("valid rating regex"));
static DIFFICULTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Difficulty\s*([\d.]+)").expect("valid difficulty regex"));
static TAKE_AGAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Would Take Again\s*([\d%]+)").expect("valid take-again regex"));
static NUM_RATINGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s+Ratings").expect("valid ratings count regex"));
static TOP_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Top Tags\s*(.*?)(?:\n\n|\z)").expect("valid tags regex"));
static TAG_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\s*([^\n]+)").expect("valid tag regex"));
static REVIEW_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Rating\s*Comment").expect("valid review regex"));

/// Parsed fields of one profile page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFields {
    pub overall_rating: Option<String>,
    pub difficulty: Option<String>,
    pub would_take_again: Option<String>,
    pub num_ratings: u32,
    pub top_tags: Vec<String>,
    pub recent_reviews: Vec<String>,
}

/// Profile ids linked from a search page, first occurrence order, no duplicates
pub fn profile_ids(page: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in PROFILE_ID.captures_iter(page) {
        let id = caps[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Lower-case, punctuation replaced by spaces
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect()
}

/// Tokens of a university name that identify it (length >= 4, not a stop word)
pub fn distinctive_tokens(university: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for token in normalize(university).split_whitespace() {
        if token.len() >= 4
            && !UNIVERSITY_STOP_WORDS.contains(&token)
            && !tokens.iter().any(|t| t == token)
        {
            tokens.push(token.to_string());
        }
    }
    tokens
}

/// Whether a profile page mentions the university.
///
/// Names without distinctive tokens ("MIT") are matched as a whole word instead.
pub fn university_matches(profile_text: &str, university: &str) -> bool {
    let text = normalize(profile_text);
    let tokens = distinctive_tokens(university);

    if tokens.is_empty() {
        let phrase = normalize(university).split_whitespace().collect::<Vec<_>>().join(" ");
        if phrase.is_empty() {
            return false;
        }
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        return format!(" {text} ").contains(&format!(" {phrase} "));
    }

    tokens.iter().any(|t| text.contains(t.as_str()))
}

pub fn is_profile_url(url: &str) -> bool {
    url.contains("ratemyprofessors.com/professor/")
}

pub fn parse_profile(markdown: &str) -> ProfileFields {
    let capture = |re: &Regex| re.captures(markdown).map(|c| c[1].to_string());

    let top_tags = TOP_TAGS
        .captures(markdown)
        .map(|section| {
            TAG_ITEM
                .captures_iter(&section[1])
                .map(|c| c[1].trim().to_string())
                .take(MAX_TAGS)
                .collect()
        })
        .unwrap_or_default();

    ProfileFields {
        overall_rating: capture(&OVERALL),
        difficulty: capture(&DIFFICULTY),
        would_take_again: capture(&TAKE_AGAIN),
        num_ratings: capture(&NUM_RATINGS)
            .and_then(|n| n.parse().ok())
            .unwrap_or(0),
        top_tags,
        recent_reviews: parse_reviews(markdown),
    }
}

/// First meaningful line of each "Rating Comment" block
fn parse_reviews(markdown: &str) -> Vec<String> {
    REVIEW_SPLIT
        .split(markdown)
        .skip(1)
        .take(MAX_REVIEWS)
        .filter_map(|section| {
            let body = section
                .find("Comment")
                .map(|i| &section[i + "Comment".len()..])
                .unwrap_or(section);
            body.lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .filter(|line| line.len() > 10)
                .map(str::to_string)
        })
        .collect()
}
