use std::fmt;

use anyhow::Result;
use lindera::tokenizer::Tokenizer;

/// Coarse part-of-speech vocabulary of the ipadic tagger, first field of a
/// token's detail vector. Anything else maps to `Other` and passes through
/// the pipeline untouched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PartOfSpeech {
    Adnominal,
    Conjunction,
    Particle,
    Adjective,
    Sign,
    Noun,
    Prefix,
    Adverb,
    BosEos,
    AuxiliaryVerb,
    Filler,
    Interjection,
    Verb,
    Other,
}

impl PartOfSpeech {
    pub fn from_tag(tag: &str) -> PartOfSpeech {
        match tag {
            "連体詞" => PartOfSpeech::Adnominal,
            "接続詞" => PartOfSpeech::Conjunction,
            "助詞" => PartOfSpeech::Particle,
            "形容詞" => PartOfSpeech::Adjective,
            "記号" => PartOfSpeech::Sign,
            "名詞" => PartOfSpeech::Noun,
            "接頭詞" => PartOfSpeech::Prefix,
            "副詞" => PartOfSpeech::Adverb,
            "BOS/EOS" => PartOfSpeech::BosEos,
            "助動詞" => PartOfSpeech::AuxiliaryVerb,
            "フィラー" => PartOfSpeech::Filler,
            "感動詞" => PartOfSpeech::Interjection,
            "動詞" => PartOfSpeech::Verb,
            _ => PartOfSpeech::Other,
        }
    }

    /// The raw tagger tag, used verbatim in note lines.
    pub fn ja_tag(&self) -> &'static str {
        match self {
            PartOfSpeech::Adnominal => "連体詞",
            PartOfSpeech::Conjunction => "接続詞",
            PartOfSpeech::Particle => "助詞",
            PartOfSpeech::Adjective => "形容詞",
            PartOfSpeech::Sign => "記号",
            PartOfSpeech::Noun => "名詞",
            PartOfSpeech::Prefix => "接頭詞",
            PartOfSpeech::Adverb => "副詞",
            PartOfSpeech::BosEos => "BOS/EOS",
            PartOfSpeech::AuxiliaryVerb => "助動詞",
            PartOfSpeech::Filler => "フィラー",
            PartOfSpeech::Interjection => "感動詞",
            PartOfSpeech::Verb => "動詞",
            PartOfSpeech::Other => "UNK",
        }
    }

    /// Only adjectives and nouns are looked up in the accent dictionary.
    pub fn is_content_word(&self) -> bool {
        matches!(self, PartOfSpeech::Adjective | PartOfSpeech::Noun)
    }

    pub fn is_punctuation(&self) -> bool {
        *self == PartOfSpeech::Sign
    }
}

impl fmt::Display for PartOfSpeech {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub surface: String,
    pub pos: PartOfSpeech,
}

impl Token {
    pub fn new(surface: impl Into<String>, pos: PartOfSpeech) -> Token {
        Token {
            surface: surface.into(),
            pos,
        }
    }
}

/// Adapter around the lindera tokenizer, reducing its detail vectors to the
/// (surface, coarse part-of-speech) pairs the pipeline dispatches on.
pub struct MorphTagger {
    tokenizer: Tokenizer,
}

impl MorphTagger {
    pub fn new() -> Result<MorphTagger> {
        let tokenizer = Tokenizer::new().map_err(|e| anyhow::anyhow!("tokenizer init: {}", e))?;
        Ok(MorphTagger { tokenizer })
    }

    pub fn tag(&self, text: &str) -> Result<Vec<Token>> {
        let tokens = self
            .tokenizer
            .tokenize(text)
            .map_err(|e| anyhow::anyhow!("tokenization: {}", e))?;
        Ok(tokens
            .iter()
            .filter(|t| !t.text.is_empty())
            .map(|t| {
                let tag = t.detail.first().map(String::as_str).unwrap_or("");
                Token::new(t.text.to_string(), PartOfSpeech::from_tag(tag))
            })
            .collect())
    }
}

#[test]
fn 名詞_maps_to_noun() {
    assert_eq!(PartOfSpeech::from_tag("名詞"), PartOfSpeech::Noun);
    assert!(PartOfSpeech::Noun.is_content_word());
}

#[test]
fn 形容詞_maps_to_adjective() {
    assert_eq!(PartOfSpeech::from_tag("形容詞"), PartOfSpeech::Adjective);
    assert!(PartOfSpeech::Adjective.is_content_word());
}

#[test]
fn 記号_is_punctuation_not_content() {
    let pos = PartOfSpeech::from_tag("記号");
    assert!(pos.is_punctuation());
    assert!(!pos.is_content_word());
}

#[test]
fn unknown_tag_passes_through() {
    let pos = PartOfSpeech::from_tag("未知語");
    assert_eq!(pos, PartOfSpeech::Other);
    assert!(!pos.is_content_word());
    assert!(!pos.is_punctuation());
}

#[test]
fn ja_tag_round_trips_the_vocabulary() {
    for tag in [
        "連体詞", "接続詞", "助詞", "形容詞", "記号", "名詞", "接頭詞", "副詞", "BOS/EOS",
        "助動詞", "フィラー", "感動詞", "動詞",
    ] {
        assert_eq!(PartOfSpeech::from_tag(tag).ja_tag(), tag);
    }
}

#[test]
fn 日本_is_noun() {
    let tokens = MorphTagger::new().unwrap().tag("日本").unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].pos, PartOfSpeech::Noun);
}

#[test]
fn 楽しかった_splits_before_た() {
    let tokens = MorphTagger::new().unwrap().tag("楽しかった").unwrap();
    assert_eq!(tokens[0].surface, "楽しかっ");
    assert_eq!(tokens[0].pos, PartOfSpeech::Adjective);
}
