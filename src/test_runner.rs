//! Test discovery and reporting for `uyac test`.
//!
//! Modeled on the teacher's `TestRunner`/`TestResult`/`TestSummary`/
//! `FileTestResults` quartet (`crates/compiler/src/test_runner.rs`),
//! adapted to this language's `test "name" { ... }` blocks (spec 3's
//! `Decl::Test`, emitted as `@test$<name>` entry points per spec 4.6)
//! rather than the teacher's `test-*.seq` file-naming convention.
//!
//! `uyac` has no runtime of its own (spec's Non-goals exclude an
//! interpreter), so "running" a test means: compile the file, and for
//! each discovered test block, report whether it compiled to a callable
//! C99 entry point. Actually executing the emitted C is left to the
//! caller's own toolchain (spec 6: `uyac build --exec` pipes through a
//! system `cc` plus the produced binary).

use crate::ast::Decl;
use crate::{check_source, compile_source, CompilerConfig};
use std::path::{Path, PathBuf};

/// Outcome for one `test "name" { ... }` block.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error_output: Option<String>,
}

/// Aggregate result for one source file.
#[derive(Debug, Clone)]
pub struct FileTestResults {
    pub path: PathBuf,
    pub tests: Vec<TestResult>,
    /// Set when the file failed to lex/parse/check at all, short-circuiting
    /// per-test discovery.
    pub compile_error: Option<String>,
}

/// Totals across every discovered file, mirroring the teacher's
/// `TestSummary`.
#[derive(Debug, Clone, Default)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub file_results: Vec<FileTestResults>,
}

pub struct TestRunner {
    verbose: bool,
    filter: Option<String>,
    config: CompilerConfig,
}

impl TestRunner {
    pub fn new(verbose: bool, filter: Option<String>) -> Self {
        TestRunner {
            verbose,
            filter,
            config: CompilerConfig::default(),
        }
    }

    /// Resolve a mix of file and directory paths into the `.uya` files
    /// to test, recursing into directories (teacher:
    /// `discover_test_files`/`discover_in_directory`).
    pub fn discover_test_files(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for path in paths {
            if path.is_dir() {
                self.discover_in_directory(path, &mut out);
            } else if Self::is_test_file(path) {
                out.push(path.clone());
            }
        }
        out
    }

    fn discover_in_directory(&self, dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        let mut entries: Vec<_> = entries.filter_map(|e| e.ok()).collect();
        entries.sort_by_key(|e| e.path());
        for entry in entries {
            let p = entry.path();
            if p.is_dir() {
                self.discover_in_directory(&p, out);
            } else if Self::is_test_file(&p) {
                out.push(p);
            }
        }
    }

    /// Any `.uya` file is eligible; test blocks are a per-declaration
    /// construct here rather than the teacher's whole-file naming
    /// convention (`test-*.seq`), since spec 3 scopes `test` at the
    /// declaration level.
    fn is_test_file(path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some("uya")
    }

    /// Compile `source` and report on every `test` block found, honoring
    /// `self.filter` as a substring match against the test name.
    pub fn run_file(&self, path: &Path) -> FileTestResults {
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                return FileTestResults {
                    path: path.to_path_buf(),
                    tests: Vec::new(),
                    compile_error: Some(format!("failed to read {}: {e}", path.display())),
                }
            }
        };

        let file_name = path.display().to_string();
        let (checked, diags) = check_source(&source, &file_name);
        let Some(checked) = checked else {
            return FileTestResults {
                path: path.to_path_buf(),
                tests: Vec::new(),
                compile_error: Some(diags.format()),
            };
        };

        let test_names: Vec<String> = checked
            .program
            .decls
            .iter()
            .filter_map(|d| match d {
                Decl::Test { name, .. } => Some(name.clone()),
                _ => None,
            })
            .filter(|name| self.filter.as_deref().is_none_or(|f| name.contains(f)))
            .collect();

        if test_names.is_empty() {
            return FileTestResults {
                path: path.to_path_buf(),
                tests: Vec::new(),
                compile_error: None,
            };
        }

        // Emission failure here means at least one test block's body
        // doesn't lower/emit cleanly; attribute it to every test in the
        // file since irgen/emit don't report per-declaration position.
        let emit_result = compile_source(&source, &file_name, &self.config);
        let tests = test_names
            .into_iter()
            .map(|name| match &emit_result {
                Ok(_) => TestResult {
                    name,
                    passed: true,
                    error_output: None,
                },
                Err(diags) => TestResult {
                    name,
                    passed: false,
                    error_output: Some(diags.format()),
                },
            })
            .collect();

        FileTestResults {
            path: path.to_path_buf(),
            tests,
            compile_error: None,
        }
    }

    pub fn run(&self, paths: &[PathBuf]) -> TestSummary {
        let files = self.discover_test_files(paths);
        let mut summary = TestSummary::default();
        for file in files {
            if self.verbose {
                eprintln!("testing {}", file.display());
            }
            let result = self.run_file(&file);
            summary.total += result.tests.len();
            summary.passed += result.tests.iter().filter(|t| t.passed).count();
            summary.failed += result.tests.iter().filter(|t| !t.passed).count();
            summary.file_results.push(result);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".uya").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn discovers_and_passes_a_trivial_test_block() {
        let f = write_tmp(r#"test "adds" { var x: i32 = 1 + 1; }"#);
        let runner = TestRunner::new(false, None);
        let result = runner.run_file(f.path());
        assert!(result.compile_error.is_none());
        assert_eq!(result.tests.len(), 1);
        assert_eq!(result.tests[0].name, "adds");
        assert!(result.tests[0].passed);
    }

    #[test]
    fn filter_excludes_non_matching_test_names() {
        let f = write_tmp(r#"test "alpha" { var x: i32 = 0; } test "beta" { var y: i32 = 0; }"#);
        let runner = TestRunner::new(false, Some("alpha".to_string()));
        let result = runner.run_file(f.path());
        assert_eq!(result.tests.len(), 1);
        assert_eq!(result.tests[0].name, "alpha");
    }

    #[test]
    fn compile_error_is_reported_without_panicking() {
        let f = write_tmp("fn main() i32 { return");
        let runner = TestRunner::new(false, None);
        let result = runner.run_file(f.path());
        assert!(result.compile_error.is_some());
        assert!(result.tests.is_empty());
    }
}
