use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cache::AccentCache;
use crate::dict::{AccentSource, EntryParser};
use crate::morph::{PartOfSpeech, Token};

/// Symbol alphabet for accent classes 0..=6, in class order. Classes above 6
/// carry no symbol and render as their literal decimal digits.
pub const ACCENT_SYMBOLS: [char; 7] = ['α', 'β', 'γ', 'δ', 'ϵ', 'ζ', 'η'];

/// Appended after sentence-final punctuation; the renderer starts a new
/// paragraph here.
pub const BOUNDARY_SYMBOL: char = 'Ω';

/// Marker distinguishing derived-accent notes from ordinary dictionary notes.
const DERIVED_MARKER: &str = "イ形容詞變化型";

/// Marker the renderer bolds: the page had more than one accent candidate.
pub const AMBIGUOUS_MARKER: &str = "請覆查字典";

const VOWEL_MORAE: [char; 5] = ['あ', 'い', 'う', 'え', 'お'];

const SENTENCE_ENDS: [&str; 3] = ["。", "？", "?"];

pub fn accent_symbol(class: u32) -> Option<char> {
    ACCENT_SYMBOLS.get(class as usize).copied()
}

pub fn accent_class(symbol: char) -> Option<u32> {
    ACCENT_SYMBOLS
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as u32)
}

/// One resolved dictionary entry. Never mutated once created; cache hits hand
/// back clones of the same record.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct AccentRecord {
    pub accent_class: u32,
    pub pronunciation: String,
    pub note: String,
    pub headword: String,
}

/// One element of the annotated output stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Glyph {
    Literal(char),
    Accent(u32),
    Boundary,
}

/// Pipeline output: the glyph stream plus the three note lists, all in token
/// processing order.
#[derive(Default, Debug)]
pub struct Annotated {
    pub glyphs: Vec<Glyph>,
    pub derived_notes: Vec<String>,
    pub debug_notes: Vec<String>,
    pub no_result_notes: Vec<String>,
}

impl Annotated {
    /// Symbol-encoded form of the stream, one char per literal or in-alphabet
    /// accent; out-of-alphabet classes spell out their decimal digits.
    pub fn line(&self) -> String {
        let mut line = String::new();
        for glyph in &self.glyphs {
            match glyph {
                Glyph::Literal(c) => line.push(*c),
                Glyph::Accent(class) => match accent_symbol(*class) {
                    Some(symbol) => line.push(symbol),
                    None => line.push_str(&class.to_string()),
                },
                Glyph::Boundary => line.push(BOUNDARY_SYMBOL),
            }
        }
        line
    }
}

/// Resolves accent records for content words: override table, then cache,
/// then the injected dictionary source, with derivation rules for inflected
/// adjectives the dictionary only indexes by base form.
pub struct AccentResolver<S: AccentSource> {
    source: S,
    parser: EntryParser,
    cache: AccentCache,
    overrides: HashMap<String, AccentRecord>,
}

impl<S: AccentSource> AccentResolver<S> {
    pub fn new(source: S, cache: AccentCache) -> anyhow::Result<AccentResolver<S>> {
        Ok(AccentResolver {
            source,
            parser: EntryParser::new()?,
            cache,
            overrides: HashMap::new(),
        })
    }

    /// Hard-coded exceptions consulted before cache and network. Empty unless
    /// configured.
    pub fn with_overrides(mut self, overrides: HashMap<String, AccentRecord>) -> AccentResolver<S> {
        self.overrides = overrides;
        self
    }

    pub fn into_cache(self) -> AccentCache {
        self.cache
    }

    /// Drives the whole run: per-token dispatch, symbol encoding, sentence
    /// boundary marking, note collection.
    pub fn resolve(&mut self, tokens: &[Token]) -> Annotated {
        let mut out = Annotated::default();
        for token in tokens {
            let record = if !token.pos.is_content_word() {
                None
            } else if token.pos == PartOfSpeech::Adjective && is_supported_inflection(&token.surface)
            {
                self.derive_inflected(&token.surface)
            } else {
                self.lookup(&token.surface, token.pos)
            };

            match record {
                Some(record) => {
                    if record.note.contains(DERIVED_MARKER) {
                        out.derived_notes.push(record.note.clone());
                    } else if !record.note.is_empty() {
                        out.debug_notes.push(record.note.clone());
                    }
                    out.glyphs.push(Glyph::Accent(record.accent_class));
                    out.glyphs.extend(token.surface.chars().map(Glyph::Literal));
                }
                None if token.pos.is_content_word() => {
                    out.no_result_notes
                        .push(format!("{} : {}, 字典查無此字。", token.surface, token.pos.ja_tag()));
                    out.glyphs.extend(token.surface.chars().map(Glyph::Literal));
                }
                None => {
                    out.glyphs.extend(token.surface.chars().map(Glyph::Literal));
                }
            }

            if token.pos.is_punctuation() && SENTENCE_ENDS.contains(&token.surface.as_str()) {
                out.glyphs.push(Glyph::Boundary);
            }
        }
        out
    }

    /// Direct lookup: overrides, then cache, then the dictionary source.
    /// Transport failures degrade to not-found after the source's own
    /// retries, so a run never loses its accumulated cache.
    pub fn lookup(&mut self, headword: &str, pos: PartOfSpeech) -> Option<AccentRecord> {
        if let Some(record) = self.overrides.get(headword) {
            return Some(record.clone());
        }
        if let Some(record) = self.cache.get(headword) {
            return Some(record.clone());
        }

        info!("looking up dictionary for {}", headword);
        let markup = match self.source.fetch(headword) {
            Ok(markup) => markup,
            Err(e) => {
                warn!("lookup failed for {}: {:#}", headword, e);
                return None;
            }
        };
        let entry = self.parser.parse(&markup)?;

        let mut note = format!(
            "{}: {}, 發音 : {}, 聲調: {}",
            headword,
            pos.ja_tag(),
            entry.pronunciation,
            entry.accent_class
        );
        if entry.accent_matches > 1 {
            note.push_str(&format!(
                ". 請覆查字典。檢索結果多於1。共有{}個檢索結果。",
                entry.accent_matches
            ));
        }

        let record = AccentRecord {
            accent_class: entry.accent_class,
            pronunciation: entry.pronunciation,
            note,
            headword: headword.to_owned(),
        };
        self.cache.put(record.clone());
        Some(record)
    }

    /// Variant inference for inflected i-adjectives: reconstruct the base
    /// (dictionary) form, look it up, and derive the accent of the inflected
    /// surface from the base accent. Derived records are cached under the
    /// inflected surface.
    pub fn derive_inflected(&mut self, surface: &str) -> Option<AccentRecord> {
        if let Some(record) = self.cache.get(surface) {
            return Some(record.clone());
        }
        info!("deriving accent for inflected form {}", surface);
        if let Some(stem) = surface.strip_suffix("かっ") {
            self.derive_katta(surface, stem)
        } else if let Some(stem) = surface.strip_suffix('く') {
            self.derive_ku(surface, stem)
        } else {
            // Other inflections (conditional, negative stem, ...) are not
            // supported; the caller records a no-result note.
            None
        }
    }

    /// Continuative "-ku" form. A flat base stays flat; otherwise the accent
    /// moves one mora left, never below 1.
    fn derive_ku(&mut self, surface: &str, stem: &str) -> Option<AccentRecord> {
        let base = self.lookup(&format!("{}い", stem), PartOfSpeech::Adjective)?;
        let truncated = drop_last_mora(&base.pronunciation);

        let derived = if base.accent_class == 0 {
            0
        } else {
            (base.accent_class - 1).max(1)
        };
        let note = format!(
            "イ形容詞變化型-く: {}, 發音: {}く, 聲調(按規則推斷): {}, 原來聲調: {}",
            surface, truncated, derived, base.accent_class
        );

        let record = AccentRecord {
            accent_class: derived,
            pronunciation: base.pronunciation.clone(),
            note,
            headword: surface.to_owned(),
        };
        self.cache.put(record.clone());
        Some(record)
    }

    /// Past "-katta" form. For a flat base the accent lands before the
    /// suffix: two morae from the end of the truncated pronunciation when it
    /// ends in a bare vowel mora, one otherwise. A non-flat base moves one
    /// mora left, never below 1.
    fn derive_katta(&mut self, surface: &str, stem: &str) -> Option<AccentRecord> {
        let base = self.lookup(&format!("{}い", stem), PartOfSpeech::Adjective)?;
        let truncated = drop_last_mora(&base.pronunciation);

        let derived = if base.accent_class == 0 {
            let morae = truncated.chars().count() as u32;
            let last = truncated.chars().last()?;
            if VOWEL_MORAE.contains(&last) {
                morae.saturating_sub(2)
            } else {
                morae.saturating_sub(1)
            }
        } else {
            (base.accent_class - 1).max(1)
        };
        let note = format!(
            "イ形容詞變化型-かった: {}, 發音: {}かった, 聲調(估計): {}, 原來聲調: {}",
            surface, truncated, derived, base.accent_class
        );

        let record = AccentRecord {
            accent_class: derived,
            pronunciation: base.pronunciation.clone(),
            note,
            headword: surface.to_owned(),
        };
        self.cache.put(record.clone());
        Some(record)
    }
}

fn is_supported_inflection(surface: &str) -> bool {
    surface.ends_with('く') || surface.ends_with("かっ")
}

fn drop_last_mora(pronunciation: &str) -> String {
    let mut chars = pronunciation.chars();
    chars.next_back();
    chars.as_str().to_owned()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Markup-table stand-in for the network client, counting fetches so
    /// cache behavior is observable.
    struct FixtureSource {
        pages: HashMap<String, String>,
        fetches: RefCell<u32>,
    }

    impl FixtureSource {
        fn new(entries: &[(&str, &str, u32)]) -> FixtureSource {
            let pages = entries
                .iter()
                .map(|(headword, pronunciation, accent)| {
                    (headword.to_string(), entry_page(pronunciation, &[*accent]))
                })
                .collect();
            FixtureSource {
                pages,
                fetches: RefCell::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            *self.fetches.borrow()
        }
    }

    impl AccentSource for FixtureSource {
        fn fetch(&self, headword: &str) -> anyhow::Result<String> {
            *self.fetches.borrow_mut() += 1;
            self.pages
                .get(headword)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no fixture page for {}", headword))
        }
    }

    fn entry_page(pronunciation: &str, accents: &[u32]) -> String {
        let spans: String = accents
            .iter()
            .map(|a| format!("<span>{}</span>", a))
            .collect();
        format!(
            r#"<div class="NetDicHead"><b>{}</b>{}</div>"#,
            pronunciation, spans
        )
    }

    fn resolver(entries: &[(&str, &str, u32)]) -> AccentResolver<FixtureSource> {
        AccentResolver::new(FixtureSource::new(entries), AccentCache::new()).unwrap()
    }

    #[test]
    fn symbol_encoding_is_a_bijection_on_0_to_6() {
        for class in 0..7 {
            let symbol = accent_symbol(class).unwrap();
            assert_eq!(accent_class(symbol), Some(class));
        }
        assert_eq!(accent_symbol(7), None);
    }

    #[test]
    fn out_of_alphabet_class_renders_literal_digits() {
        let annotated = Annotated {
            glyphs: vec![Glyph::Accent(12), Glyph::Literal('語')],
            ..Annotated::default()
        };
        assert_eq!(annotated.line(), "12語");
    }

    #[test]
    fn cached_headword_skips_the_network() {
        let mut resolver = resolver(&[("日本", "にほん", 2)]);
        let first = resolver.lookup("日本", PartOfSpeech::Noun).unwrap();
        let second = resolver.lookup("日本", PartOfSpeech::Noun).unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.source.fetch_count(), 1);
    }

    #[test]
    fn overrides_win_without_any_fetch() {
        let record = AccentRecord {
            accent_class: 1,
            pronunciation: "よく".to_owned(),
            note: String::new(),
            headword: "よく".to_owned(),
        };
        let mut resolver = resolver(&[])
            .with_overrides(HashMap::from([("よく".to_owned(), record.clone())]));
        assert_eq!(resolver.lookup("よく", PartOfSpeech::Adjective), Some(record));
        assert_eq!(resolver.source.fetch_count(), 0);
    }

    #[test]
    fn ambiguous_page_is_flagged_but_first_match_wins() {
        let source = FixtureSource {
            pages: HashMap::from([("箸".to_owned(), entry_page("はし", &[1, 2]))]),
            fetches: RefCell::new(0),
        };
        let mut resolver = AccentResolver::new(source, AccentCache::new()).unwrap();
        let record = resolver.lookup("箸", PartOfSpeech::Noun).unwrap();
        assert_eq!(record.accent_class, 1);
        assert!(record.note.contains(AMBIGUOUS_MARKER));
        assert!(record.note.contains("共有2個檢索結果"));
    }

    #[test]
    fn transport_failure_degrades_to_not_found() {
        let mut resolver = resolver(&[]);
        assert_eq!(resolver.lookup("未収録", PartOfSpeech::Noun), None);
    }

    #[test]
    fn ku_rule_keeps_flat_base_flat() {
        let mut resolver = resolver(&[("たのしい", "たのしい", 0)]);
        let record = resolver.derive_inflected("たのしく").unwrap();
        assert_eq!(record.accent_class, 0);
        assert!(record.note.contains("イ形容詞變化型-く"));
        assert!(record.note.contains("たのしく"));
    }

    #[test]
    fn ku_rule_shifts_accent_left() {
        let mut resolver = resolver(&[("たかい", "たかい", 3)]);
        let record = resolver.derive_inflected("たかく").unwrap();
        assert_eq!(record.accent_class, 2);
    }

    #[test]
    fn ku_rule_floors_at_one() {
        let mut resolver = resolver(&[("ない", "ない", 1)]);
        let record = resolver.derive_inflected("なく").unwrap();
        assert_eq!(record.accent_class, 1);
    }

    #[test]
    fn katta_rule_flat_base_vowel_final() {
        // Truncated pronunciation つよう: 3 morae ending in う, 3 - 2 = 1.
        let mut resolver = resolver(&[("つよい", "つようい", 0)]);
        let record = resolver.derive_inflected("つよかっ").unwrap();
        assert_eq!(record.accent_class, 1);
    }

    #[test]
    fn katta_rule_flat_base_len_4() {
        // Vowel-final truncation of length 4: derived = 4 - 2 = 2.
        let mut resolver = resolver(&[("あかるい", "あかるおい", 0)]);
        let record = resolver.derive_inflected("あかるかっ").unwrap();
        assert_eq!(record.accent_class, 2);

        // Non-vowel-final truncation of length 4: derived = 4 - 1 = 3.
        let mut resolver = self::resolver(&[("すばらしい", "すばらしい", 0)]);
        let record = resolver.derive_inflected("すばらしかっ").unwrap();
        assert_eq!(record.accent_class, 3);
    }

    #[test]
    fn katta_rule_non_flat_base_shifts_left() {
        let mut resolver = resolver(&[("たかい", "たかい", 3)]);
        let record = resolver.derive_inflected("たかかっ").unwrap();
        assert_eq!(record.accent_class, 2);
        assert!(record.note.contains("イ形容詞變化型-かった"));
    }

    #[test]
    fn derived_record_is_cached_under_inflected_surface() {
        let mut resolver = resolver(&[("たかい", "たかい", 3)]);
        resolver.derive_inflected("たかく").unwrap();
        // Base form fetched once; second derivation hits the cache.
        resolver.derive_inflected("たかく").unwrap();
        assert_eq!(resolver.source.fetch_count(), 1);
        let cache = resolver.into_cache();
        assert!(cache.get("たかく").is_some());
        assert!(cache.get("たかい").is_some());
    }

    #[test]
    fn unsupported_inflection_is_not_found() {
        let mut resolver = resolver(&[("たのしい", "たのしい", 0)]);
        assert_eq!(resolver.derive_inflected("たのしけれ"), None);
    }

    #[test]
    fn pipeline_annotates_known_noun() {
        let mut resolver = resolver(&[("日本", "にほん", 2)]);
        let tokens = [
            Token::new("日本", PartOfSpeech::Noun),
            Token::new("へ", PartOfSpeech::Particle),
        ];
        let annotated = resolver.resolve(&tokens);
        assert_eq!(annotated.line(), "γ日本へ");
        assert!(annotated.no_result_notes.is_empty());
        assert_eq!(annotated.debug_notes.len(), 1);
    }

    #[test]
    fn pipeline_marks_sentence_boundary() {
        let mut resolver = resolver(&[]);
        let tokens = [
            Token::new("はい", PartOfSpeech::Interjection),
            Token::new("。", PartOfSpeech::Sign),
        ];
        let annotated = resolver.resolve(&tokens);
        assert_eq!(annotated.line(), "はい。Ω");
    }

    #[test]
    fn non_final_punctuation_gets_no_boundary() {
        let mut resolver = resolver(&[]);
        let tokens = [Token::new("、", PartOfSpeech::Sign)];
        let annotated = resolver.resolve(&tokens);
        assert_eq!(annotated.line(), "、");
    }

    #[test]
    fn pipeline_routes_inflected_adjective_through_derivation() {
        let mut resolver = resolver(&[("たかい", "たかい", 3)]);
        let tokens = [Token::new("たかく", PartOfSpeech::Adjective)];
        let annotated = resolver.resolve(&tokens);
        assert_eq!(annotated.line(), "γたかく");
        assert_eq!(annotated.derived_notes.len(), 1);
        assert!(annotated.debug_notes.is_empty());
    }

    #[test]
    fn unsupported_inflection_yields_no_result_note() {
        let mut resolver = resolver(&[]);
        let tokens = [Token::new("たのしけれ", PartOfSpeech::Adjective)];
        let annotated = resolver.resolve(&tokens);
        assert_eq!(annotated.line(), "たのしけれ");
        assert_eq!(
            annotated.no_result_notes,
            vec!["たのしけれ : 形容詞, 字典查無此字。".to_owned()]
        );
    }

    #[test]
    fn lookup_failure_emits_verbatim_text() {
        let mut resolver = resolver(&[]);
        let tokens = [Token::new("謎語", PartOfSpeech::Noun)];
        let annotated = resolver.resolve(&tokens);
        assert_eq!(annotated.line(), "謎語");
        assert_eq!(annotated.no_result_notes.len(), 1);
    }
}
