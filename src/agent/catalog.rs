//! University course catalogues and course code parsing

use super::LookupError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// How a catalogue addresses a single course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlPattern {
    /// `{base}/{SUBJECT}/{number}`
    SubjectPath,
    /// `{base}/search?q={SUBJECT}+{number}`
    SearchQuery,
    /// `{base}/subjects/{SUBJECT}/`, one page per subject
    SubjectIndex,
    /// `{base}/course/{SUBJECT}{number}h1`
    CompactH1,
}

impl UrlPattern {
    pub fn render(&self, base_url: &str, code: &CourseCode) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            UrlPattern::SubjectPath => format!("{base}/{}/{}", code.subject, code.number),
            UrlPattern::SearchQuery => format!("{base}/search?q={}+{}", code.subject, code.number),
            UrlPattern::SubjectIndex => format!("{base}/subjects/{}/", code.subject),
            UrlPattern::CompactH1 => format!("{base}/course/{}{}h1", code.subject, code.number),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct University {
    pub key: String,
    pub name: String,
    pub base_url: String,
    pub pattern: UrlPattern,
    pub example: String,
    /// Extra lower-case spellings accepted by `resolve`
    pub aliases: Vec<String>,
}

impl University {
    fn new(
        key: &str,
        name: &str,
        base_url: &str,
        pattern: UrlPattern,
        example: &str,
        aliases: &[&str],
    ) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            base_url: base_url.to_string(),
            pattern,
            example: example.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn course_url(&self, code: &CourseCode) -> String {
        self.pattern.render(&self.base_url, code)
    }

    fn matches(&self, reference: &str) -> bool {
        let reference = reference.trim().to_lowercase();
        reference == self.key || reference == self.name.to_lowercase() || self.aliases.contains(&reference)
    }
}

/// A course code split into subject and number, e.g. `CMPUT` / `174`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCode {
    pub subject: String,
    pub number: String,
}

static COMPACT_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]+)(\d+)").expect("valid compact code regex"));

static DOTTED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.(\d+)$").expect("valid dotted code regex"));

static CODE_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2,6}) ?(\d{3}[A-Z]?)\b").expect("valid code search regex"));

impl CourseCode {
    /// `"CMPUT 174"`, `"cmput 174"`, `"CSC148"` and `"6.006"` are accepted
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let invalid = || LookupError::InvalidCourseCode {
            code: raw.trim().to_string(),
        };

        let parts: Vec<&str> = raw.split_whitespace().collect();
        match parts.as_slice() {
            [] => Err(invalid()),
            [single] => {
                let upper = single.to_uppercase();
                if let Some(caps) = COMPACT_CODE.captures(&upper) {
                    return Ok(Self {
                        subject: caps[1].to_string(),
                        number: caps[2].to_string(),
                    });
                }
                if let Some(caps) = DOTTED_CODE.captures(&upper) {
                    return Ok(Self {
                        subject: caps[1].to_string(),
                        number: caps[2].to_string(),
                    });
                }
                Err(invalid())
            }
            [subject, number, ..] => Ok(Self {
                subject: subject.to_uppercase(),
                number: number.to_string(),
            }),
        }
    }

    /// First course-code-looking token in free text, such as "CMPUT 174" in a question
    pub fn find_in_text(text: &str) -> Option<Self> {
        CODE_IN_TEXT.captures(text).map(|caps| Self {
            subject: caps[1].to_string(),
            number: caps[2].to_string(),
        })
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.number)
    }
}

#[derive(Debug, Clone)]
pub struct UniversityCatalog {
    universities: Vec<University>,
    default_key: String,
}

impl UniversityCatalog {
    /// The built-in catalogues, with `default_key` used for unqualified questions
    pub fn builtin(default_key: impl Into<String>) -> Self {
        Self {
            universities: vec![
                University::new(
                    "ualberta",
                    "University of Alberta",
                    "https://apps.ualberta.ca/catalogue/course",
                    UrlPattern::SubjectPath,
                    "CMPUT 174",
                    &["uofa", "u of a", "ualberta", "alberta"],
                ),
                University::new(
                    "stanford",
                    "Stanford University",
                    "https://explorecourses.stanford.edu",
                    UrlPattern::SearchQuery,
                    "CS 229",
                    &["stanford"],
                ),
                University::new(
                    "mit",
                    "MIT",
                    "http://catalog.mit.edu",
                    UrlPattern::SubjectIndex,
                    "6.006",
                    &["massachusetts institute of technology"],
                ),
                University::new(
                    "utoronto",
                    "University of Toronto",
                    "https://artsci.calendar.utoronto.ca",
                    UrlPattern::CompactH1,
                    "CSC148",
                    &["uoft", "u of t", "toronto"],
                ),
            ],
            default_key: default_key.into().to_lowercase(),
        }
    }

    pub fn with_university(mut self, university: University) -> Self {
        self.universities.retain(|u| u.key != university.key);
        self.universities.push(university);
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.universities.iter().map(|u| u.key.clone()).collect()
    }

    pub fn universities(&self) -> &[University] {
        &self.universities
    }

    /// Match by key, display name or alias; `None` means the default catalogue
    pub fn resolve(&self, reference: Option<&str>) -> Result<&University, LookupError> {
        let reference = reference.unwrap_or(&self.default_key);
        self.universities
            .iter()
            .find(|u| u.matches(reference))
            .ok_or_else(|| LookupError::UnknownUniversity {
                key: reference.to_string(),
                available: self.keys(),
            })
    }
}

impl Default for UniversityCatalog {
    fn default() -> Self {
        Self::builtin("ualberta")
    }
}
