use std::{collections::HashMap, path::PathBuf};

use config::File;
use directories::BaseDirs;
use log::warn;
use serde::Deserialize;

use crate::accent::AccentRecord;

const CONFIG_FILE: &str = "pitchmark.toml";

pub fn load_config() -> Config {
    match config::Config::builder()
        .add_source(File::from(config_path()))
        .build()
    {
        Ok(c) => match c.try_deserialize() {
            Ok(config) => config,
            Err(e) => {
                warn!("Incompatible configuration: {:?}\nUsing default config", e);
                Config::default()
            }
        },
        Err(e) => {
            warn!("Failed to load config file: {:?}\nUsing default config", e);
            Config::default()
        }
    }
}

fn config_path() -> PathBuf {
    let mut path = BaseDirs::new()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_default();
    path.push(CONFIG_FILE);
    path
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default = "Paths::default")]
    pub paths: Paths,
    #[serde(default = "Dictionary::default")]
    pub dictionary: Dictionary,
    #[serde(default = "Document::default")]
    pub document: Document,
    /// Hard-coded lookup exceptions, headword -> record. Empty by default.
    #[serde(default)]
    pub overrides: HashMap<String, OverrideEntry>,
}

impl Config {
    pub fn override_records(&self) -> HashMap<String, AccentRecord> {
        self.overrides
            .iter()
            .map(|(headword, entry)| {
                (
                    headword.clone(),
                    AccentRecord {
                        accent_class: entry.accent_class,
                        pronunciation: entry.pronunciation.clone(),
                        note: entry.note.clone().unwrap_or_default(),
                        headword: headword.clone(),
                    },
                )
            })
            .collect()
    }
}

// paths

fn default_source() -> PathBuf {
    PathBuf::from("japan_text.txt")
}

fn default_cache() -> PathBuf {
    PathBuf::from("accent_cache.json")
}

fn default_output() -> PathBuf {
    PathBuf::from("processed_japan_text.html")
}

#[derive(Deserialize, Debug)]
pub struct Paths {
    #[serde(default = "default_source")]
    pub source: PathBuf,
    #[serde(default = "default_cache")]
    pub cache: PathBuf,
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            source: default_source(),
            cache: default_cache(),
            output: default_output(),
        }
    }
}

// dictionary

fn default_base_url() -> String {
    "https://www.weblio.jp/content/".to_owned()
}

fn default_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    500
}

#[derive(Deserialize, Debug)]
pub struct Dictionary {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

// document

fn default_title() -> String {
    "Japan".to_owned()
}

#[derive(Deserialize, Debug)]
pub struct Document {
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            title: default_title(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct OverrideEntry {
    pub accent_class: u32,
    pub pronunciation: String,
    #[serde(default)]
    pub note: Option<String>,
}
