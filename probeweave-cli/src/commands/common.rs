use std::path::{Path, PathBuf};

use anyhow::Context;
use probeweave::{engine::UnitResolver, ClassFile, UnitFile};

/// Load and parse one class file.
pub fn load_class(path: &Path) -> anyhow::Result<ClassFile> {
    let unit = UnitFile::from_file(path)
        .with_context(|| format!("failed to read class file: {}", path.display()))?;
    unit.parse()
        .with_context(|| format!("failed to parse class file: {}", path.display()))
}

/// Collect all `.class` files below `dir`, sorted.
pub fn collect_class_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if is_class_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

/// Returns true if the path has a `.class` extension.
pub fn is_class_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("class")
}

/// Internal unit name of `path` relative to the classpath `root`, e.g. `com/acme/Job`.
pub fn unit_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

/// A directory classpath entry acting as the loader's view for companion probes.
#[derive(Debug, Clone)]
pub struct DirectoryClasspath {
    root: PathBuf,
}

impl DirectoryClasspath {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl UnitResolver for DirectoryClasspath {
    fn resolve(&self, name: &str) -> bool {
        self.root
            .join(format!("{}.class", name.replace('.', "/")))
            .is_file()
    }
}
