// ABOUTME: Language binding modules and shared infrastructure
// ABOUTME: Provides the extraction and instrumentation interfaces every binding implements

pub mod extractor_utils;
pub mod java;

use crate::instrument::EditSet;
use pulsegraph_core::{CodeGraph, InjectionOptions, Language, Result};
use tree_sitter::Tree;

/// Trait for language-specific static graph extractors
///
/// Extraction never fails: whatever the tree does not yield is simply absent
/// from the returned graph.
pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, tree: &Tree, content: &str, file_path: &str) -> CodeGraph;

    fn language(&self) -> Language;
}

/// Trait for language-specific source instrumenters
///
/// Implementations only compute insertions; applying them is shared.
pub trait LanguageInstrumenter: Send + Sync {
    fn plan(&self, tree: &Tree, content: &str, options: &InjectionOptions) -> Result<EditSet>;

    fn language(&self) -> Language;
}

pub use java::JavaExtractor;
