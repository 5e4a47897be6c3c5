// ABOUTME: Source languages known to the extraction and instrumentation pipeline
// ABOUTME: Pairs each language with its Tree-sitter grammar and file extensions
use pulsegraph_core::Language;
use std::path::Path;
use tree_sitter::Parser;

/// A grammar and the extensions that select it.
pub struct LanguageConfig {
    pub language: Language,
    pub grammar: tree_sitter::Language,
    pub extensions: &'static [&'static str],
}

/// Registered languages in registration order.
pub struct LanguageRegistry {
    entries: Vec<LanguageConfig>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let entries = vec![LanguageConfig {
            language: Language::Java,
            grammar: tree_sitter_java::LANGUAGE.into(),
            extensions: Language::Java.extensions(),
        }];
        Self { entries }
    }

    /// Language selected by the file extension, compared case-insensitively.
    pub fn detect_language(&self, file_path: &str) -> Option<Language> {
        let extension = Path::new(file_path).extension()?.to_str()?.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.extensions.contains(&extension.as_str()))
            .map(|entry| entry.language)
    }

    pub fn get_config(&self, language: &Language) -> Option<&LanguageConfig> {
        self.entries.iter().find(|entry| entry.language == *language)
    }

    /// A fresh parser for `language`; parsers are not shared across threads.
    pub fn create_parser(&self, language: &Language) -> Option<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.get_config(language)?.grammar).ok()?;
        Some(parser)
    }

    pub fn languages(&self) -> Vec<Language> {
        self.entries.iter().map(|entry| entry.language).collect()
    }
}
