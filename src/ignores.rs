//! Ignore globs for the watch command
//!
//! The watch engine matches raw regular expressions against absolute paths.
//! This module turns gitignore-style globs (from `.podsyncignore`, the config
//! file and `--ignore` flags) into those expressions, anchored under the
//! watched directory. Glob syntax is parsed by `globset`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use thiserror::Error;

/// Ignore file looked up in the watched directory
pub const IGNORE_FILE: &str = ".podsyncignore";

/// Always ignored, whatever the ignore file says
pub const DEFAULT_IGNORES: &[&str] = &[".git", ".podsync"];

/// Maximum ignore file size (64KB)
const MAX_FILE_SIZE: u64 = 65536;

/// Maximum number of patterns in one ignore file
const MAX_PATTERNS: usize = 1000;

#[derive(Debug, Error)]
pub enum IgnoreFileError {
    #[error("{} exceeds {}KB limit ({size} bytes)", .path.display(), .limit / 1024)]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("{} has {count} patterns, exceeds {limit} limit", .path.display())]
    TooManyPatterns {
        path: PathBuf,
        count: usize,
        limit: usize,
    },

    #[error("invalid ignore pattern '{glob}': {message}")]
    InvalidGlob { glob: String, message: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Build the ignore expressions for a watch rooted at `base`.
///
/// Order: built-in defaults, then the ignore file, then `extra` globs.
/// Duplicates are dropped. A missing ignore file is not an error; an
/// unparseable glob is.
pub fn watch_ignores(
    base: &Path,
    extra: &[String],
    ignore_file: Option<&Path>,
) -> Result<Vec<String>, IgnoreFileError> {
    let file = match ignore_file {
        Some(path) => path.to_path_buf(),
        None => base.join(IGNORE_FILE),
    };

    let mut globs: Vec<String> = DEFAULT_IGNORES.iter().map(|s| s.to_string()).collect();
    globs.extend(load_ignore_file(&file)?);
    globs.extend(extra.iter().cloned());

    let mut patterns: Vec<String> = Vec::with_capacity(globs.len());
    for glob in &globs {
        if let Some(pattern) = glob_to_regex(base, glob)? {
            if !patterns.contains(&pattern) {
                patterns.push(pattern);
            }
        }
    }

    tracing::debug!(count = patterns.len(), file = %file.display(), "loaded ignore patterns");
    Ok(patterns)
}

/// Read globs from an ignore file. Returns an empty list if it doesn't exist.
pub fn load_ignore_file(path: &Path) -> Result<Vec<String>, IgnoreFileError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let io_err = |source| IgnoreFileError::Io {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).map_err(io_err)?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(IgnoreFileError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: MAX_FILE_SIZE,
        });
    }

    let content = fs::read_to_string(path).map_err(io_err)?;
    parse_globs(path, &content)
}

/// Parse ignore file content into globs, skipping blanks and comments.
pub fn parse_globs(source: &Path, content: &str) -> Result<Vec<String>, IgnoreFileError> {
    let globs: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if globs.len() > MAX_PATTERNS {
        return Err(IgnoreFileError::TooManyPatterns {
            path: source.to_path_buf(),
            count: globs.len(),
            limit: MAX_PATTERNS,
        });
    }

    Ok(globs)
}

/// Translate one gitignore-style glob into a regex anchored under `base`.
///
/// Returns `Ok(None)` for blank lines, comments and negations (`!pattern`).
/// The glob itself is parsed by `globset`, so escapes (`\*`, `\!`) and
/// character classes follow its rules. The result is meant for
/// `regex::bytes`, since the glob body is a byte-oriented expression.
pub fn glob_to_regex(base: &Path, glob: &str) -> Result<Option<String>, IgnoreFileError> {
    let glob = glob.trim();
    if glob.is_empty() || glob.starts_with('#') {
        return Ok(None);
    }
    if glob.starts_with('!') {
        tracing::warn!(pattern = glob, "negated ignore patterns are not supported, skipping");
        return Ok(None);
    }

    let glob = glob.trim_end_matches('/');
    // A slash anywhere but the end pins the glob to the root
    let anchored = glob.contains('/');
    let glob = glob.trim_start_matches('/');
    if glob.is_empty() {
        return Ok(None);
    }

    let invalid = |message: String| IgnoreFileError::InvalidGlob {
        glob: glob.to_string(),
        message,
    };
    let compiled = GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .map_err(|e| invalid(e.to_string()))?;
    let body = glob_body(compiled.regex())
        .ok_or_else(|| invalid(format!("unexpected expression {}", compiled.regex())))?;

    let base = base.to_string_lossy();
    let mut out = String::from("^");
    out.push_str(&regex::escape(base.trim_end_matches('/')));
    out.push('/');
    if !anchored {
        out.push_str("(?-u:.*/)?");
    }
    out.push_str("(?-u:");
    out.push_str(body);
    out.push(')');
    out.push_str("(/|$)");
    Ok(Some(out))
}

/// The part of a `globset` expression between its `(?-u)^` and `$`
fn glob_body(regex: &str) -> Option<&str> {
    regex
        .strip_prefix("(?-u)")?
        .strip_prefix('^')?
        .strip_suffix('$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::bytes::{Regex, RegexSet};
    use tempfile::tempdir;

    fn matcher(glob: &str) -> Regex {
        let pattern = glob_to_regex(Path::new("/work/app"), glob).unwrap().unwrap();
        Regex::new(&pattern).unwrap()
    }

    fn hits(re: &Regex, path: &str) -> bool {
        re.is_match(path.as_bytes())
    }

    #[test]
    fn test_basename_glob_matches_at_any_depth() {
        let re = matcher("*.log");
        assert!(hits(&re, "/work/app/debug.log"));
        assert!(hits(&re, "/work/app/logs/deep/server.log"));
        assert!(!hits(&re, "/work/app/debug.logs"));
        assert!(!hits(&re, "/elsewhere/debug.log"));
    }

    #[test]
    fn test_directory_glob_covers_contents() {
        let re = matcher("node_modules/");
        assert!(hits(&re, "/work/app/node_modules"));
        assert!(hits(&re, "/work/app/node_modules/left-pad/index.js"));
        assert!(hits(&re, "/work/app/web/node_modules/x"));
        assert!(!hits(&re, "/work/app/node_modules_backup"));
    }

    #[test]
    fn test_slash_anchors_to_root() {
        let re = matcher("/target");
        assert!(hits(&re, "/work/app/target/debug"));
        assert!(!hits(&re, "/work/app/sub/target"));

        let re = matcher("docs/**/*.md");
        assert!(hits(&re, "/work/app/docs/a.md"));
        assert!(hits(&re, "/work/app/docs/x/y/a.md"));
        assert!(!hits(&re, "/work/app/src/docs/a.md"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        let re = matcher("file?.txt");
        assert!(hits(&re, "/work/app/file1.txt"));
        assert!(!hits(&re, "/work/app/file10.txt"));

        let re = matcher("[!a]bc");
        assert!(hits(&re, "/work/app/xbc"));
        assert!(!hits(&re, "/work/app/abc"));
    }

    #[test]
    fn test_escaped_characters_are_literal() {
        let re = matcher(r"\!important.txt");
        assert!(hits(&re, "/work/app/!important.txt"));
        assert!(!hits(&re, "/work/app/important.txt"));

        let re = matcher(r"foo\*");
        assert!(hits(&re, "/work/app/foo*"));
        assert!(!hits(&re, "/work/app/foobar"));

        let re = matcher(r"what\?.md");
        assert!(hits(&re, "/work/app/what?.md"));
        assert!(!hits(&re, "/work/app/whatx.md"));
    }

    #[test]
    fn test_non_ascii_names() {
        let re = matcher("résumé*.pdf");
        assert!(hits(&re, "/work/app/docs/résumé-2024.pdf"));
        assert!(!hits(&re, "/work/app/resume.pdf"));
    }

    #[test]
    fn test_root_itself_is_never_ignored() {
        let re = matcher("app");
        assert!(!hits(&re, "/work/app"));
    }

    #[test]
    fn test_negation_and_comments_are_skipped() {
        let base = Path::new("/work/app");
        assert!(glob_to_regex(base, "!keep.log").unwrap().is_none());
        assert!(glob_to_regex(base, "# note").unwrap().is_none());
        assert!(glob_to_regex(base, "   ").unwrap().is_none());
    }

    #[test]
    fn test_malformed_class_is_an_error() {
        let err = glob_to_regex(Path::new("/work/app"), "[z-a].txt").unwrap_err();
        assert!(matches!(err, IgnoreFileError::InvalidGlob { ref glob, .. } if glob == "[z-a].txt"));
    }

    #[test]
    fn test_watch_ignores_reads_file_and_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(IGNORE_FILE), "# build output\ntarget/\n\n*.tmp\n").unwrap();

        let patterns = watch_ignores(dir.path(), &["*.tmp".to_string()], None).unwrap();

        // .git, .podsync, target, *.tmp (deduplicated)
        assert_eq!(patterns.len(), 4);
        let set = RegexSet::new(&patterns).unwrap();
        let root = dir.path();
        let hit = |rel: &str| set.is_match(root.join(rel).to_string_lossy().as_bytes());
        assert!(hit(".git/HEAD"));
        assert!(hit("target/app"));
        assert!(hit("a/b.tmp"));
        assert!(!hit("src/main.rs"));
    }

    #[test]
    fn test_invalid_glob_in_ignore_file_fails() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(IGNORE_FILE), "ok.txt\n[z-a]\n").unwrap();

        let err = watch_ignores(dir.path(), &[], None).unwrap_err();
        assert!(matches!(err, IgnoreFileError::InvalidGlob { .. }));
    }

    #[test]
    fn test_missing_ignore_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let patterns = watch_ignores(dir.path(), &[], None).unwrap();
        assert_eq!(patterns.len(), DEFAULT_IGNORES.len());
    }

    #[test]
    fn test_too_many_patterns() {
        let content = (0..=MAX_PATTERNS)
            .map(|i| format!("f{i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let err = parse_globs(Path::new(IGNORE_FILE), &content).unwrap_err();
        assert!(matches!(err, IgnoreFileError::TooManyPatterns { count, .. } if count == MAX_PATTERNS + 1));
    }

    #[test]
    fn test_file_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(IGNORE_FILE);
        fs::write(&path, "x".repeat(MAX_FILE_SIZE as usize + 1)).unwrap();

        let err = load_ignore_file(&path).unwrap_err();
        assert!(err.to_string().contains("64KB"));
    }
}
