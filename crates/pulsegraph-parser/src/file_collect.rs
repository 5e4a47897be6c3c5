use crate::LanguageRegistry;
use ignore::WalkBuilder;
use pulsegraph_core::{PulseGraphError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Every file under `dir` with a registered language, sorted by path.
///
/// Directories whose name is in `skip_dirs` are not descended into.
/// Ignore files are not consulted; the skip list is the only filter.
pub fn collect_source_files(
    dir: &Path,
    skip_dirs: &[String],
    registry: &LanguageRegistry,
) -> Result<Vec<PathBuf>> {
    info!("Collecting source files from: {:?}", dir);
    if !dir.exists() {
        return Err(PulseGraphError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source root {} does not exist", dir.display()),
        )));
    }
    debug!("Skip dirs: {:?}", skip_dirs);

    let skip: HashSet<String> = skip_dirs.iter().cloned().collect();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let name = entry.file_name().to_string_lossy();
            !(is_dir && entry.depth() > 0 && skip.contains(&*name))
        })
        .build();

    let mut paths = Vec::new();
    let mut total_files = 0;

    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("Walker error: {}", e);
                continue;
            }
        };

        let path = dent.path();
        if !path.is_file() {
            continue;
        }
        total_files += 1;

        if registry.detect_language(&path.to_string_lossy()).is_some() {
            paths.push(path.to_path_buf());
        }
    }

    info!(
        "File collection complete: {} files found, {} source files",
        total_files,
        paths.len()
    );

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class A {}").unwrap();
    }

    #[test]
    fn test_skip_dirs_and_extensions() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "src/main/java/A.java");
        touch(tmp.path(), "src/main/java/b/B.java");
        touch(tmp.path(), "build/generated/C.java");
        touch(tmp.path(), "node_modules/x/D.java");
        touch(tmp.path(), "src/README.md");

        let skip = vec!["build".to_string(), "node_modules".to_string()];
        let files = collect_source_files(tmp.path(), &skip, &LanguageRegistry::new()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["src/main/java/A.java", "src/main/java/b/B.java"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(collect_source_files(&missing, &[], &LanguageRegistry::new()).is_err());
    }
}
