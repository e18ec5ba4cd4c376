//! Title cleanup for rendered backlog entries.

use std::sync::OnceLock;

use regex::Regex;

static TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LEADING_VERB_RE: OnceLock<Option<Regex>> = OnceLock::new();
static ISSUE_REF_RE: OnceLock<Option<Regex>> = OnceLock::new();
static LEADING_REF_RE: OnceLock<Option<Regex>> = OnceLock::new();
static WS_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn cached<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn replace_all(text: &str, cell: &OnceLock<Option<Regex>>, pattern: &str, with: &str) -> String {
    match cached(cell, pattern) {
        Some(re) => re.replace_all(text, with).into_owned(),
        None => text.to_string(),
    }
}

/// Reduce a title to "title only": drop `[Tag]` markers, leading
/// `Fixes #12`-style verbs with their refs, any remaining `#12` mentions,
/// then normalize whitespace and edge punctuation.
pub fn clean_title(title: &str) -> String {
    let mut t = title.trim().to_string();

    t = replace_all(&t, &TAG_RE, r"\[[^\]]+\]", "");
    t = replace_all(
        &t,
        &LEADING_VERB_RE,
        r"(?i)^(Closes|Fixes|Resolves|Refs?|Issues?)\s+(#\d+)(\s*[+,/]\s*#\d+)*\s*[-:]*\s*",
        "",
    );
    t = replace_all(&t, &ISSUE_REF_RE, r"#\d+", "");
    t = replace_all(&t, &WS_RE, r"\s+", " ");

    t.trim()
        .trim_matches(|ch: char| matches!(ch, '-' | ':' | '\u{2013}' | '\u{2014}' | ' '))
        .trim_end_matches('.')
        .to_string()
}

/// Drop a leading `#12 - ` style reference, keeping the rest of the title.
pub fn strip_leading_issue_ref(title: &str) -> String {
    replace_all(title, &LEADING_REF_RE, r"^\s*#\d+\s*[-:]*\s*", "")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_removes_tags_and_refs() {
        assert_eq!(
            clean_title("[Enhancement] Fixes #123 - Speed up sync"),
            "Speed up sync"
        );
        assert_eq!(clean_title("Closes #1, #2: Tidy config"), "Tidy config");
        assert_eq!(clean_title("Plain title."), "Plain title");
        assert_eq!(clean_title("Refs #9 — dash edges —"), "dash edges");
    }

    #[test]
    fn clean_title_collapses_whitespace() {
        assert_eq!(clean_title("A   [X]   B"), "A B");
    }

    #[test]
    fn strip_leading_issue_ref_only_touches_prefix() {
        assert_eq!(strip_leading_issue_ref("#42 - Fix login"), "Fix login");
        assert_eq!(strip_leading_issue_ref("#42: Fix login"), "Fix login");
        assert_eq!(strip_leading_issue_ref("Fix #42 inside"), "Fix #42 inside");
    }
}
