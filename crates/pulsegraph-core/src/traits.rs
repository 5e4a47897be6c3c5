use crate::{CodeGraph, InjectionMode, Language, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Turns one source file into a language-agnostic graph.
pub trait CodeParser {
    fn parse(&self, content: &str, file_path: &str) -> Result<CodeGraph>;
    fn supported_languages(&self) -> Vec<Language>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InjectionOptions {
    pub mode: InjectionMode,
    /// Replaces the enclosing type name in generated span names.
    pub class_name_override: Option<String>,
}

impl InjectionOptions {
    pub fn sidecar() -> Self {
        Self {
            mode: InjectionMode::Sidecar,
            ..Default::default()
        }
    }

    /// Path the rewritten content of `file_path` should be written to.
    ///
    /// Intrusive mode always targets the file itself. Sidecar mode mirrors
    /// the path relative to `source_root` under `out_dir`; without an
    /// `out_dir` it falls back to a `.instrumented` sibling.
    pub fn destination(&self, file_path: &Path, source_root: &Path, out_dir: Option<&Path>) -> PathBuf {
        match (self.mode, out_dir) {
            (InjectionMode::Intrusive, _) => file_path.to_path_buf(),
            (InjectionMode::Sidecar, Some(out_dir)) => {
                let relative = file_path
                    .strip_prefix(source_root)
                    .ok()
                    .filter(|p| !p.as_os_str().is_empty())
                    .or_else(|| file_path.file_name().map(Path::new))
                    .unwrap_or(file_path);
                out_dir.join(relative)
            }
            (InjectionMode::Sidecar, None) => {
                let mut name = file_path.as_os_str().to_os_string();
                name.push(".instrumented");
                PathBuf::from(name)
            }
        }
    }
}

/// Rewrites source so the running program emits trace spans.
pub trait Instrumenter {
    /// Compute the rewritten source, or report why the file cannot be
    /// instrumented. Never returns partially instrumented text.
    fn instrument(&self, content: &str, file_path: &str, options: &InjectionOptions) -> Result<String>;

    /// Fail-open variant: any error yields the original `content`.
    fn inject(&self, content: &str, file_path: &str, options: &InjectionOptions) -> String {
        match self.instrument(content, file_path, options) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                warn!("Leaving {} uninstrumented: {}", file_path, e);
                content.to_string()
            }
        }
    }
}
