//! YAML frontmatter for wiki documents.
//!
//! Adds a metadata header (title, type, tags, dates, related documents)
//! to markdown files that do not carry one yet. A file that already
//! starts with a frontmatter fence is left alone, and the content below
//! the inserted header is preserved byte-for-byte.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};
use regex::Regex;

use backsync_engine::{write_atomic, EngineError};

const FRONTMATTER_FENCE: &str = "---";
const MAX_TAGS: usize = 5;
const MAX_RELATED: usize = 5;

static LINK_RE: OnceLock<Option<Regex>> = OnceLock::new();
static FILE_REF_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn cached<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Metadata rendered into one document's frontmatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMetadata {
    pub title: String,
    pub doc_type: String,
    pub tags: Vec<String>,
    pub created: String,
    pub updated: String,
    pub related: Vec<String>,
}

/// Per-run counts for a directory pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl OptimizeStats {
    fn absorb(&mut self, other: OptimizeStats) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Derive metadata for a document from its path and content.
///
/// Dates come from filesystem timestamps where available, falling back
/// to `now`, so re-running over an unchanged tree stays stable.
pub fn detect_metadata(path: &Path, content: &str, now: DateTime<Local>) -> DocMetadata {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (created, updated) = file_dates(path, now);

    DocMetadata {
        title: detect_title(&stem, content),
        doc_type: detect_type(&stem, content),
        tags: detect_tags(path, content),
        created,
        updated,
        related: find_related(content),
    }
}

/// First `# ` heading, else the file stem with dashes spaced and words
/// capitalized.
fn detect_title(stem: &str, content: &str) -> String {
    for line in content.lines() {
        if let Some(title) = line.strip_prefix("# ") {
            let title = title.trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }
    title_case(&stem.replace('-', " "))
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Document type from the file name, then a task-list content check.
fn detect_type(stem: &str, content: &str) -> String {
    let name = stem.to_lowercase();
    let kind = if name.contains("backlog") {
        "backlog"
    } else if name.contains("plan") || name.contains("roadmap") {
        "planning"
    } else if name.contains("workflow") || name.contains("manual") {
        "process"
    } else if name.contains("setup") || name.contains("config") {
        "configuration"
    } else if name.contains("readme") {
        "documentation"
    } else if content.contains("## ") && content.contains("- [ ]") {
        "task-list"
    } else {
        "note"
    };
    kind.to_string()
}

/// Tags from the parent directory name plus a keyword table over the
/// content, capped at five.
fn detect_tags(path: &Path, content: &str) -> Vec<String> {
    const KEYWORDS: [(&str, &[&str]); 5] = [
        ("work", &["crm", "project", "team", "task", "issue"]),
        ("automation", &["script", "cron", "daemon", "bot"]),
        ("setup", &["config", "install", "setup"]),
        ("planning", &["plan", "goal", "roadmap", "strategy"]),
        ("documentation", &["guide", "manual", "readme", "how-to"]),
    ];

    let mut tags: Vec<String> = Vec::new();
    if let Some(parent) = path.parent().and_then(Path::file_name) {
        let parent = parent.to_string_lossy();
        if !parent.is_empty() && parent != "wiki" {
            tags.push(parent.into_owned());
        }
    }

    let content_lower = content.to_lowercase();
    for (tag, words) in KEYWORDS {
        if words.iter().any(|word| content_lower.contains(word)) && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }

    tags.truncate(MAX_TAGS);
    tags
}

/// Markdown links and backtick references to sibling `.md` files,
/// deduplicated and sorted, capped at five.
fn find_related(content: &str) -> Vec<String> {
    let mut related: Vec<String> = Vec::new();

    if let Some(re) = cached(&LINK_RE, r"\[[^\]]+\]\(([^)]+\.md)\)") {
        for capture in re.captures_iter(content) {
            let link = &capture[1];
            if !link.starts_with("http") {
                related.push(link.to_string());
            }
        }
    }
    if let Some(re) = cached(&FILE_REF_RE, r"`([A-Za-z0-9_-]+\.md)`") {
        for capture in re.captures_iter(content) {
            related.push(capture[1].to_string());
        }
    }

    related.sort();
    related.dedup();
    related.truncate(MAX_RELATED);
    related
}

fn file_dates(path: &Path, now: DateTime<Local>) -> (String, String) {
    let fallback = now.format("%Y-%m-%d").to_string();
    let Ok(meta) = fs::metadata(path) else {
        return (fallback.clone(), fallback);
    };
    let updated = meta
        .modified()
        .map(|at| DateTime::<Local>::from(at).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| fallback.clone());
    let created = meta
        .created()
        .map(|at| DateTime::<Local>::from(at).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| updated.clone());
    (created, updated)
}

/// Render the frontmatter block, fences included, no trailing newline.
pub fn render_frontmatter(meta: &DocMetadata) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(FRONTMATTER_FENCE.to_string());
    lines.push(format!("title: \"{}\"", meta.title));
    lines.push(format!("type: {}", meta.doc_type));
    if !meta.tags.is_empty() {
        lines.push(format!("tags: [{}]", meta.tags.join(", ")));
    }
    lines.push(format!("created: {}", meta.created));
    lines.push(format!("updated: {}", meta.updated));
    if !meta.related.is_empty() {
        lines.push("related:".to_string());
        for rel in &meta.related {
            lines.push(format!("  - {rel}"));
        }
    }
    lines.push(FRONTMATTER_FENCE.to_string());
    lines.join("\n")
}

/// Prepend frontmatter to `content`; `None` when a fence is already
/// present.
pub fn add_frontmatter(content: &str, meta: &DocMetadata) -> Option<String> {
    if content.starts_with(FRONTMATTER_FENCE) {
        return None;
    }
    Some(format!("{}\n{content}", render_frontmatter(meta)))
}

/// Add frontmatter to one file on disk. Returns whether it was written;
/// a file that already carries frontmatter is left untouched.
pub fn optimize_file(path: &Path, now: DateTime<Local>) -> Result<bool, EngineError> {
    let content = fs::read_to_string(path).map_err(|source| EngineError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let meta = detect_metadata(path, &content, now);
    match add_frontmatter(&content, &meta) {
        Some(updated) => {
            write_atomic(path, &updated)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Add frontmatter to every markdown file in `dir`, hidden files
/// excluded. Errors are counted, not fatal.
pub fn process_directory(
    dir: &Path,
    recursive: bool,
    now: DateTime<Local>,
) -> Result<OptimizeStats, EngineError> {
    let mut stats = OptimizeStats::default();
    let entries = fs::read_dir(dir).map_err(|source| EngineError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .collect();
    paths.sort();

    for path in paths {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            if recursive {
                if let Ok(nested) = process_directory(&path, recursive, now) {
                    stats.absorb(nested);
                }
            }
            continue;
        }
        if path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        match optimize_file(&path, now) {
            Ok(true) => stats.processed += 1,
            Ok(false) => stats.skipped += 1,
            Err(_) => stats.errors += 1,
        }
    }

    Ok(stats)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 5, 7, 0, 0).unwrap()
    }

    #[test]
    fn title_from_heading_else_stem() {
        assert_eq!(detect_title("x", "# Real Title\n\nbody\n"), "Real Title");
        assert_eq!(detect_title("my-notes-file", "no heading"), "My Notes File");
    }

    #[test]
    fn type_detection_rules() {
        assert_eq!(detect_type("BACKLOG", ""), "backlog");
        assert_eq!(detect_type("q3-roadmap", ""), "planning");
        assert_eq!(detect_type("setup-guide", ""), "configuration");
        assert_eq!(detect_type("readme", ""), "documentation");
        assert_eq!(detect_type("misc", "## Todo\n- [ ] item\n"), "task-list");
        assert_eq!(detect_type("misc", "plain prose"), "note");
    }

    #[test]
    fn tags_from_directory_and_keywords() {
        let tags = detect_tags(
            Path::new("/wiki/work/notes.md"),
            "the crm project needs a daemon script",
        );
        assert_eq!(tags, vec!["work", "automation"]);

        // The wiki root itself contributes no directory tag.
        let tags = detect_tags(Path::new("/wiki/notes.md"), "plain");
        assert!(tags.is_empty());
    }

    #[test]
    fn related_files_are_sorted_and_deduped() {
        let related = find_related(
            "see [setup](setup.md) and `BACKLOG.md`, also [ext](http://x.test/a.md)\n\
             and `BACKLOG.md` again",
        );
        assert_eq!(related, vec!["BACKLOG.md", "setup.md"]);
    }

    #[test]
    fn frontmatter_shape() {
        let meta = DocMetadata {
            title: "T".into(),
            doc_type: "note".into(),
            tags: vec!["work".into()],
            created: "2026-08-01".into(),
            updated: "2026-08-05".into(),
            related: vec!["setup.md".into()],
        };
        assert_eq!(
            render_frontmatter(&meta),
            "---\n\
             title: \"T\"\n\
             type: note\n\
             tags: [work]\n\
             created: 2026-08-01\n\
             updated: 2026-08-05\n\
             related:\n\
             \x20 - setup.md\n\
             ---"
        );
    }

    #[test]
    fn existing_frontmatter_is_not_touched() {
        let meta = detect_metadata(Path::new("x.md"), "body", at());
        assert!(add_frontmatter("---\ntitle: old\n---\nbody", &meta).is_none());
        let fresh = add_frontmatter("body\n", &meta).unwrap();
        assert!(fresh.starts_with("---\n"));
        assert!(fresh.ends_with("---\nbody\n"));
    }

    #[test]
    fn optimize_file_is_a_second_run_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\n\nbody\n").unwrap();

        assert!(optimize_file(&path, at()).unwrap());
        let once = fs::read_to_string(&path).unwrap();
        assert!(once.starts_with("---\n"));
        assert!(once.ends_with("# Notes\n\nbody\n"));

        assert!(!optimize_file(&path, at()).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), once);
    }

    #[test]
    fn directory_pass_counts_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "# A\n").unwrap();
        fs::write(dir.path().join("b.md"), "---\nalready\n---\n").unwrap();
        fs::write(dir.path().join(".hidden.md"), "# H\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "not markdown").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("c.md"), "# C\n").unwrap();

        let flat = process_directory(dir.path(), false, at()).unwrap();
        assert_eq!(flat.processed, 1);
        assert_eq!(flat.skipped, 1);
        assert_eq!(flat.errors, 0);
        assert!(!fs::read_to_string(sub.join("c.md")).unwrap().starts_with("---"));

        let deep = process_directory(dir.path(), true, at()).unwrap();
        assert_eq!(deep.processed, 1); // c.md; a.md now skips
        assert_eq!(deep.skipped, 2);
    }

    #[test]
    fn missing_directory_is_a_read_error() {
        let err = process_directory(Path::new("/nonexistent-wiki"), false, at()).unwrap_err();
        assert!(matches!(err, EngineError::Read { .. }));
    }
}
