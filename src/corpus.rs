//! Regression-test corpus access
//!
//! One grammar alternative splices existing regression-test files into the
//! generated output. The corpus is an optional collaborator: when none is
//! configured, the alternative degrades to a fixed placeholder string
//! rather than failing.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Placeholder emitted when no corpus is available.
pub const NO_CORPUS_PLACEHOLDER: &str = "/* no regression tests found */";

/// Testing functions that can throw, or whose results depend on shell
/// flags; tests referencing them are marked `/*NODIFF*/` so a differential
/// harness knows to skip output comparison.
const NODIFF_FUNCTIONS: &[&str] = &[
    "gcparam",
    "startgc",
    "setJitCompilerOption",
    "disableSingleStepProfiling",
    "enableSingleStepProfiling",
    "isAsmJSCompilationAvailable",
    "hasChild",
    "PerfMeasurement",
];

/// Source of regression-test files to inline into generated programs.
pub trait RegressionCorpus: Send + Sync {
    /// All known test file paths, relative to the corpus root.
    fn list(&self) -> &[PathBuf];

    /// Support files that must precede `main_test` (shell.js chains etc.),
    /// ending with `main_test` itself.
    fn dependencies(&self, main_test: &Path) -> Vec<PathBuf>;

    /// Read one file's contents.
    fn read(&self, path: &Path) -> Result<String>;
}

/// Filesystem-backed corpus rooted at a directory.
#[derive(Debug)]
pub struct DirCorpus {
    root: PathBuf,
    tests: Vec<PathBuf>,
}

impl DirCorpus {
    /// Scan `root` recursively for `.js` files.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let mut tests = Vec::new();
        collect_js_files(&root, &root, &mut tests)?;
        tests.sort();
        Ok(Self { root, tests })
    }

    /// Number of test files found.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Whether the corpus found no test files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

fn collect_js_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_js_files(root, &path, out)?;
        } else if path.extension().is_some_and(|e| e == "js") {
            if let Ok(rel) = path.strip_prefix(root) {
                out.push(rel.to_path_buf());
            }
        }
    }
    Ok(())
}

impl RegressionCorpus for DirCorpus {
    fn list(&self) -> &[PathBuf] {
        &self.tests
    }

    fn dependencies(&self, main_test: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        // Chain of shell.js files in the containing directories, outermost first
        let mut prefix = PathBuf::new();
        for comp in main_test.iter() {
            let shell = prefix.join("shell.js");
            if shell != main_test && self.tests.contains(&shell) {
                files.push(shell);
            }
            prefix.push(comp);
        }
        files.push(main_test.to_path_buf());
        files
    }

    fn read(&self, path: &Path) -> Result<String> {
        Ok(fs::read_to_string(self.root.join(path))?)
    }
}

/// A test that would confuse the harness if inlined.
#[must_use]
pub fn is_evil_test(contents: &str) -> bool {
    // SIMD tests are too unstable to splice; clobbering |print| breaks log parsing
    contents.contains("SIMD") || contents.contains("print = ")
}

/// Wrap test contents for inlining, adding `/*NODIFF*/` when the test calls
/// a testing function whose behavior varies across runs or shell flags.
#[must_use]
pub fn inline_test(filename: &Path, contents: &str) -> String {
    let body = format!("/* {} */ {contents}\n", filename.display());
    if NODIFF_FUNCTIONS.iter().any(|f| contents.contains(f)) {
        format!("/*NODIFF*/ {body}")
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evil_detection() {
        assert!(is_evil_test("var x = SIMD.Int32x4(1, 2, 3, 4);"));
        assert!(is_evil_test("print = function() {};"));
        assert!(!is_evil_test("var x = 3; assertEq(x, 3);"));
    }

    #[test]
    fn test_inline_plain_test() {
        let s = inline_test(Path::new("basic/add.js"), "assertEq(1 + 1, 2);");
        assert!(s.starts_with("/* basic/add.js */"));
        assert!(!s.contains("NODIFF"));
    }

    #[test]
    fn test_inline_marks_nodiff() {
        let s = inline_test(Path::new("gc/zeal.js"), "gcparam('maxBytes', 1000);");
        assert!(s.starts_with("/*NODIFF*/"));
    }

    #[test]
    fn test_dir_corpus_dependencies_shell_chain() {
        let corpus = DirCorpus {
            root: PathBuf::from("/corpus"),
            tests: vec![
                PathBuf::from("shell.js"),
                PathBuf::from("sub/shell.js"),
                PathBuf::from("sub/test.js"),
            ],
        };
        let deps = corpus.dependencies(Path::new("sub/test.js"));
        assert_eq!(
            deps,
            vec![
                PathBuf::from("shell.js"),
                PathBuf::from("sub/shell.js"),
                PathBuf::from("sub/test.js"),
            ]
        );
    }

    #[test]
    fn test_shell_js_is_not_its_own_dependency() {
        let corpus = DirCorpus {
            root: PathBuf::from("/corpus"),
            tests: vec![PathBuf::from("shell.js")],
        };
        let deps = corpus.dependencies(Path::new("shell.js"));
        assert_eq!(deps, vec![PathBuf::from("shell.js")]);
    }
}
