use std::{thread, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::Url;

/// Produces raw dictionary markup for a headword. The network client in
/// production, an in-memory fixture table in tests.
pub trait AccentSource {
    fn fetch(&self, headword: &str) -> Result<String>;
}

/// Blocking HTTP client for the online accent dictionary. Retries transient
/// failures with a linear backoff so one hiccup does not abort a whole run.
pub struct WeblioClient {
    base: Url,
    http: Client,
    retries: u32,
    backoff: Duration,
}

impl WeblioClient {
    pub fn new(base_url: &str, retries: u32, backoff: Duration) -> Result<WeblioClient> {
        let base = Url::parse(base_url).with_context(|| format!("bad dictionary url {}", base_url))?;
        Ok(WeblioClient {
            base,
            http: Client::new(),
            retries,
            backoff,
        })
    }
}

impl AccentSource for WeblioClient {
    fn fetch(&self, headword: &str) -> Result<String> {
        // Url::join percent-escapes the headword for us.
        let url = self
            .base
            .join(headword)
            .with_context(|| format!("bad headword {}", headword))?;
        let mut last_err = None;
        for attempt in 0..=self.retries {
            if attempt > 0 {
                warn!("retrying lookup for {} (attempt {})", headword, attempt + 1);
                thread::sleep(self.backoff * attempt);
            }
            match self
                .http
                .get(url.clone())
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.text())
            {
                Ok(body) => return Ok(body),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.expect("at least one attempt"))
            .with_context(|| format!("dictionary fetch failed for {}", headword))
    }
}

/// What the markup parser recovers from one dictionary page.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DictEntry {
    pub pronunciation: String,
    pub accent_class: u32,
    /// Count of accent-class candidates at the match location; more than one
    /// means the page is ambiguous and the caller should flag it.
    pub accent_matches: usize,
}

/// Extracts pronunciation and accent class from a dictionary page: the first
/// alphabetic run inside a bolded element and the first numeric run inside a
/// span, both scoped to the entry-head container.
pub struct EntryParser {
    head: Regex,
    bold: Regex,
    span: Regex,
    letters: Regex,
    digits: Regex,
}

impl EntryParser {
    pub fn new() -> Result<EntryParser> {
        Ok(EntryParser {
            head: Regex::new(r#"(?s)<div[^>]*class="[^"]*NetDicHead[^"]*"[^>]*>(.*?)</div>"#)?,
            bold: Regex::new(r"(?s)<b[^>]*>(.*?)</b>")?,
            span: Regex::new(r"(?s)<span[^>]*>(.*?)</span>")?,
            letters: Regex::new(r"\D+")?,
            digits: Regex::new(r"\d+")?,
        })
    }

    pub fn parse(&self, markup: &str) -> Option<DictEntry> {
        let pronunciation = self.pronunciation(markup).unwrap_or_default();

        // First-match-wins: the first numeric span in document order decides
        // the accent class; remaining candidates in the same container are
        // only counted, never consulted.
        for head in self.head.captures_iter(markup) {
            let head = head.get(1)?.as_str();
            let mut accent = None;
            let mut matches = 0;
            for span in self.span.captures_iter(head) {
                let text = span.get(1)?.as_str();
                if let Some(run) = self.digits.find(text) {
                    matches += 1;
                    if accent.is_none() {
                        accent = run.as_str().parse::<u32>().ok();
                    }
                }
            }
            if let Some(accent_class) = accent {
                return Some(DictEntry {
                    pronunciation,
                    accent_class,
                    accent_matches: matches,
                });
            }
        }
        None
    }

    fn pronunciation(&self, markup: &str) -> Option<String> {
        for head in self.head.captures_iter(markup) {
            let head = head.get(1)?.as_str();
            for bold in self.bold.captures_iter(head) {
                let text = bold.get(1)?.as_str();
                let runs: String = self
                    .letters
                    .find_iter(text)
                    .map(|m| m.as_str())
                    .collect();
                if !runs.is_empty() {
                    return Some(runs);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(head: &str) -> String {
        format!(
            r#"<html><body><div class="other"><span>9</span></div><div class="NetDicHead">{}</div></body></html>"#,
            head
        )
    }

    #[test]
    fn parses_pronunciation_and_accent() {
        let parser = EntryParser::new().unwrap();
        let markup = page(r#"<b>にほん</b><span>2</span>"#);
        let entry = parser.parse(&markup).unwrap();
        assert_eq!(entry.pronunciation, "にほん");
        assert_eq!(entry.accent_class, 2);
        assert_eq!(entry.accent_matches, 1);
    }

    #[test]
    fn first_numeric_span_wins() {
        let parser = EntryParser::new().unwrap();
        let markup = page(r#"<b>はし</b><span>1</span><span>2</span>"#);
        let entry = parser.parse(&markup).unwrap();
        assert_eq!(entry.accent_class, 1);
        assert_eq!(entry.accent_matches, 2);
    }

    #[test]
    fn container_scoping_skips_foreign_spans() {
        let parser = EntryParser::new().unwrap();
        // The only numeric span lives outside the entry-head container.
        let markup = r#"<div class="menu"><span>5</span></div><div class="NetDicHead"><b>ことば</b></div>"#;
        assert_eq!(parser.parse(markup), None);
    }

    #[test]
    fn no_accent_means_not_found() {
        let parser = EntryParser::new().unwrap();
        let markup = page(r#"<b>ことば</b><span>accent free</span>"#);
        assert_eq!(parser.parse(&markup), None);
    }

    #[test]
    fn numeric_bold_is_not_a_pronunciation() {
        let parser = EntryParser::new().unwrap();
        let markup = page(r#"<b>12</b><b>たのしい</b><span>3</span>"#);
        let entry = parser.parse(&markup).unwrap();
        assert_eq!(entry.pronunciation, "たのしい");
    }
}
