use crate::file_collect::collect_source_files;
use crate::heuristics::{CallSiteSets, ExtractionHeuristics};
use crate::instrument::JavaInstrumenter;
use crate::languages::{JavaExtractor, LanguageExtractor, LanguageInstrumenter};
use crate::LanguageRegistry;
use pulsegraph_core::{
    CodeGraph, CodeParser, InjectionOptions, Instrumenter, Language, PulseGraphConfig,
    PulseGraphError, Result,
};
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tree_sitter::{Parser, Tree};

/// One tree-sitter parser per language, owned by a single worker.
type ParserCache = HashMap<Language, Parser>;

/// Result of instrumenting one file of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub content: String,
    /// False when the rewritten content equals the original.
    pub changed: bool,
}

pub struct TreeSitterParser {
    registry: Arc<LanguageRegistry>,
    java_extractor: JavaExtractor,
    java_instrumenter: JavaInstrumenter,
}

impl Default for TreeSitterParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeSitterParser {
    pub fn new() -> Self {
        Self::with_heuristics(ExtractionHeuristics::default(), CallSiteSets::default())
    }

    pub fn with_heuristics(heuristics: ExtractionHeuristics, call_sites: CallSiteSets) -> Self {
        Self {
            registry: Arc::new(LanguageRegistry::new()),
            java_extractor: JavaExtractor::with_heuristics(heuristics),
            java_instrumenter: JavaInstrumenter::with_call_sites(call_sites),
        }
    }

    /// Call-site sets come from the `[instrumentation]` section.
    pub fn from_config(config: &PulseGraphConfig) -> Self {
        Self::with_heuristics(
            ExtractionHeuristics::default(),
            CallSiteSets::from(&config.instrumentation),
        )
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    fn extractor(&self, language: Language) -> &dyn LanguageExtractor {
        match language {
            Language::Java => &self.java_extractor,
        }
    }

    fn instrumenter(&self, language: Language) -> &dyn LanguageInstrumenter {
        match language {
            Language::Java => &self.java_instrumenter,
        }
    }

    fn parse_tree(&self, cache: &mut ParserCache, content: &str, file_path: &str) -> Result<(Language, Tree)> {
        let language = self
            .registry
            .detect_language(file_path)
            .ok_or_else(|| PulseGraphError::UnsupportedLanguage(file_path.to_string()))?;

        let parser = match cache.entry(language) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let parser = self.registry.create_parser(&language).ok_or_else(|| {
                    PulseGraphError::Parse(format!("Failed to configure {} parser", language))
                })?;
                entry.insert(parser)
            }
        };

        let tree = parser
            .parse(content, None)
            .ok_or_else(|| PulseGraphError::Parse(format!("Failed to parse file: {}", file_path)))?;
        Ok((language, tree))
    }

    fn extract_with(&self, cache: &mut ParserCache, content: &str, file_path: &str) -> Result<CodeGraph> {
        let (language, tree) = self.parse_tree(cache, content, file_path)?;
        let graph = self.extractor(language).extract(&tree, content, file_path);
        debug!(
            "Extracted {} nodes, {} edges from {}",
            graph.nodes.len(),
            graph.edges.len(),
            file_path
        );
        Ok(graph)
    }

    fn instrument_with(
        &self,
        cache: &mut ParserCache,
        content: &str,
        file_path: &str,
        options: &InjectionOptions,
    ) -> Result<String> {
        let (language, tree) = self.parse_tree(cache, content, file_path)?;
        self.instrumenter(language)
            .plan(&tree, content, options)?
            .apply(content)
    }

    /// Static graph for one file's content. Fails only when no grammar
    /// handles `file_path` or tree-sitter produces no tree.
    pub fn parse_content(&self, content: &str, file_path: &str) -> Result<CodeGraph> {
        self.extract_with(&mut ParserCache::new(), content, file_path)
    }

    pub fn parse_file(&self, path: &Path) -> Result<CodeGraph> {
        let content = std::fs::read_to_string(path)?;
        self.parse_content(&content, &path.to_string_lossy())
    }

    /// Union of the graphs of every source file under `root`, in path
    /// order. Files that cannot be read or parsed are logged and left out.
    pub fn parse_project(&self, root: &Path, skip_dirs: &[String]) -> Result<CodeGraph> {
        let files = collect_source_files(root, skip_dirs, &self.registry)?;
        info!("Extracting {} files", files.len());

        let graphs: Vec<CodeGraph> = files
            .par_iter()
            .map_init(ParserCache::new, |cache, path| {
                let file_path = path.to_string_lossy();
                let result = std::fs::read_to_string(path)
                    .map_err(PulseGraphError::from)
                    .and_then(|content| self.extract_with(cache, &content, &file_path));
                match result {
                    Ok(graph) => graph,
                    Err(e) => {
                        warn!("Skipping {}: {}", file_path, e);
                        CodeGraph::new()
                    }
                }
            })
            .collect();

        let graph: CodeGraph = graphs.into_iter().collect();
        info!(
            "Extraction complete: {} nodes, {} edges",
            graph.nodes.len(),
            graph.edges.len()
        );
        Ok(graph)
    }

    /// Instrument every source file under `root` (or `root` itself when it
    /// is a file). Nothing is written; each result carries the path it is
    /// meant for. Files that fail to instrument keep their original content.
    pub fn instrument_project(
        &self,
        root: &Path,
        skip_dirs: &[String],
        options: &InjectionOptions,
        out_dir: Option<&Path>,
    ) -> Result<Vec<InstrumentedFile>> {
        let files = if root.is_file() {
            vec![root.to_path_buf()]
        } else {
            collect_source_files(root, skip_dirs, &self.registry)?
        };
        info!("Instrumenting {} files ({} mode)", files.len(), options.mode);

        let results: Vec<Option<InstrumentedFile>> = files
            .par_iter()
            .map_init(ParserCache::new, |cache, path| {
                let file_path = path.to_string_lossy();
                let original = match std::fs::read_to_string(path) {
                    Ok(content) => content,
                    Err(e) => {
                        warn!("Skipping {}: {}", file_path, e);
                        return None;
                    }
                };

                let content = match self.instrument_with(cache, &original, &file_path, options) {
                    Ok(rewritten) => rewritten,
                    Err(e) => {
                        warn!("Leaving {} uninstrumented: {}", file_path, e);
                        original.clone()
                    }
                };

                Some(InstrumentedFile {
                    destination: options.destination(path, root, out_dir),
                    source: path.clone(),
                    changed: content != original,
                    content,
                })
            })
            .collect();

        Ok(results.into_iter().flatten().collect())
    }
}

impl CodeParser for TreeSitterParser {
    fn parse(&self, content: &str, file_path: &str) -> Result<CodeGraph> {
        self.parse_content(content, file_path)
    }

    fn supported_languages(&self) -> Vec<Language> {
        self.registry.languages()
    }
}

impl Instrumenter for TreeSitterParser {
    fn instrument(&self, content: &str, file_path: &str, options: &InjectionOptions) -> Result<String> {
        self.instrument_with(&mut ParserCache::new(), content, file_path, options)
    }
}
