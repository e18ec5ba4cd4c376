//! Entry parsing inside a located region.
//!
//! Splits region text into a preserved free-form prefix plus a map of
//! external ID → raw entry text. Entry start lines are recognized with
//! explicit byte checks; nothing here backtracks or matches greedily.

use std::collections::BTreeMap;

use crate::order::ORDINAL_TOKEN;
use crate::region::{line_content, lines_with_offsets};

/// Which tracker link path carries the external ID in a numbered template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Pulls,
    Issues,
}

impl LinkKind {
    fn path_segment(self) -> &'static str {
        match self {
            Self::Pulls => "/pulls/",
            Self::Issues => "/issues/",
        }
    }
}

/// Shape of an entry start line and where its external ID lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPattern {
    /// `#### #42 Title` — ID directly after the hash prefix.
    HashId,
    /// `#### 3. [Tag] - Title` — ID from a tracker link inside the block.
    /// The leading ordinal is normalized to the `{n}` placeholder.
    NumberedTemplate { link: LinkKind },
}

/// Result of parsing one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRegion {
    /// Free-form text before the first recognized entry, plus any
    /// malformed blocks. Never discarded.
    pub prefix: String,
    /// External ID → raw entry text (trailing whitespace trimmed).
    pub entries: BTreeMap<u64, String>,
    /// Blocks whose start line matched but whose ID could not be captured.
    pub malformed: usize,
}

/// Parse `region` into a preserved prefix and an ID-keyed entry map.
///
/// An entry spans from its start line up to (but excluding) the next start
/// line, or the end of the region. Text before the first recognized entry
/// is the prefix; with zero matches the whole region is prefix. A block
/// whose start line matches but carries no capturable ID is appended to
/// the prefix and counted, so it survives the rebuild instead of being
/// silently deleted.
pub fn parse_entries(region: &str, pattern: &EntryPattern) -> ParsedRegion {
    let mut starts: Vec<usize> = Vec::new();
    for (offset, raw) in lines_with_offsets(region) {
        if is_entry_start(line_content(raw), pattern) {
            starts.push(offset);
        }
    }

    let Some(&first) = starts.first() else {
        return ParsedRegion {
            prefix: region.to_string(),
            entries: BTreeMap::new(),
            malformed: 0,
        };
    };

    let mut parsed = ParsedRegion {
        prefix: region[..first].to_string(),
        entries: BTreeMap::new(),
        malformed: 0,
    };

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(region.len());
        let block = &region[start..end];
        match capture_id(block, pattern) {
            Some(id) => {
                let text = match pattern {
                    EntryPattern::HashId => block.trim_end().to_string(),
                    EntryPattern::NumberedTemplate { .. } => {
                        normalize_ordinal(block).trim_end().to_string()
                    }
                };
                parsed.entries.insert(id, text);
            }
            None => {
                parsed.malformed += 1;
                if !parsed.prefix.is_empty() && !parsed.prefix.ends_with('\n') {
                    parsed.prefix.push('\n');
                }
                parsed.prefix.push_str(block.trim_end());
                parsed.prefix.push('\n');
            }
        }
    }

    parsed
}

// ---------------------------------------------------------------------------
// Line shape checks
// ---------------------------------------------------------------------------

fn is_entry_start(line: &str, pattern: &EntryPattern) -> bool {
    match pattern {
        EntryPattern::HashId => hash_id_of_line(line).is_some(),
        EntryPattern::NumberedTemplate { .. } => is_numbered_template_start(line),
    }
}

/// `#### #<digits>` with a non-word boundary after the digits.
fn hash_id_of_line(line: &str) -> Option<u64> {
    let rest = strip_entry_hashes(line)?;
    let rest = rest.strip_prefix('#')?;
    let digits = leading_digits(rest);
    if digits.is_empty() {
        return None;
    }
    let after = &rest[digits.len()..];
    if after
        .chars()
        .next()
        .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return None;
    }
    digits.parse().ok()
}

/// `#### <digits>. [` — the numbered-template start shape.
fn is_numbered_template_start(line: &str) -> bool {
    let Some(rest) = strip_entry_hashes(line) else {
        return false;
    };
    let digits = leading_digits(rest);
    if digits.is_empty() {
        return false;
    }
    let Some(rest) = rest[digits.len()..].strip_prefix('.') else {
        return false;
    };
    let trimmed = rest.trim_start();
    trimmed.len() < rest.len() && trimmed.starts_with('[')
}

/// Strip `####` plus at least one space/tab at the start of a line.
fn strip_entry_hashes(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("####")?;
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if trimmed.len() == rest.len() {
        return None;
    }
    Some(trimmed)
}

fn leading_digits(text: &str) -> &str {
    let len = text.bytes().take_while(u8::is_ascii_digit).count();
    &text[..len]
}

fn capture_id(block: &str, pattern: &EntryPattern) -> Option<u64> {
    match pattern {
        EntryPattern::HashId => {
            let first_line = block.lines().next()?;
            hash_id_of_line(first_line)
        }
        EntryPattern::NumberedTemplate { link } => link_id(block, link.path_segment()),
    }
}

/// First `<segment><digits>` occurrence with digits actually present.
fn link_id(block: &str, segment: &str) -> Option<u64> {
    let mut search = block;
    while let Some(pos) = search.find(segment) {
        let rest = &search[pos + segment.len()..];
        let digits = leading_digits(rest);
        if !digits.is_empty() {
            let after = &rest[digits.len()..];
            let bounded = !after
                .chars()
                .next()
                .is_some_and(|ch| ch.is_ascii_alphanumeric() || ch == '_');
            if bounded {
                return digits.parse().ok();
            }
        }
        search = &search[pos + segment.len()..];
    }
    None
}

/// Replace the leading ordinal of every start line with the `{n}` token.
fn normalize_ordinal(block: &str) -> String {
    let mut out = String::with_capacity(block.len());
    for raw in block.split_inclusive('\n') {
        let line = line_content(raw);
        if is_numbered_template_start(line) {
            // Rewrite `#### <digits>.` as `#### {n}.`, keeping the rest.
            if let Some(rest) = strip_entry_hashes(line) {
                let digits = leading_digits(rest);
                let tail_at = line.len() - rest.len() + digits.len() + 1; // past the '.'
                out.push_str("#### ");
                out.push_str(ORDINAL_TOKEN);
                out.push('.');
                out.push_str(&line[tail_at..]);
                if raw.ends_with('\n') {
                    out.push('\n');
                }
                continue;
            }
        }
        out.push_str(raw);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hash_id_start_shapes() {
        assert_eq!(hash_id_of_line("#### #42 Fix login"), Some(42));
        assert_eq!(hash_id_of_line("####  #7"), Some(7));
        assert_eq!(hash_id_of_line("#### #42abc"), None);
        assert_eq!(hash_id_of_line("#### 42"), None);
        assert_eq!(hash_id_of_line("### #42"), None);
        assert_eq!(hash_id_of_line("####42"), None);
        assert_eq!(hash_id_of_line("plain text"), None);
    }

    #[test]
    fn numbered_template_start_shapes() {
        assert!(is_numbered_template_start("#### 1. [In Progress] - Title"));
        assert!(is_numbered_template_start("#### 12. [2026-07-01] - X"));
        assert!(!is_numbered_template_start("#### {n}. [tag] - normalized"));
        assert!(!is_numbered_template_start("#### 1. no tag"));
        assert!(!is_numbered_template_start("#### #42 hash style"));
        assert!(!is_numbered_template_start("## 1. [tag]"));
    }

    #[test]
    fn parses_hash_entries_with_prefix() {
        let region = "\
free-form notes
kept verbatim

#### #5 First
- **Status:** open

#### #9 Second
- **Status:** closed
";
        let parsed = parse_entries(region, &EntryPattern::HashId);
        assert_eq!(parsed.prefix, "free-form notes\nkept verbatim\n\n");
        assert_eq!(parsed.entries.len(), 2);
        assert!(parsed.entries[&5].starts_with("#### #5 First"));
        assert!(parsed.entries[&5].ends_with("- **Status:** open"));
        assert!(parsed.entries[&9].starts_with("#### #9 Second"));
        assert_eq!(parsed.malformed, 0);
    }

    #[test]
    fn zero_matches_leaves_everything_as_prefix() {
        let region = "only prose here\nno entries\n";
        let parsed = parse_entries(region, &EntryPattern::HashId);
        assert_eq!(parsed.prefix, region);
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn numbered_template_ids_come_from_links() {
        let region = "\
#### 1. [In Progress] - Add exports
    > CSV export for orders

   **Link:** https://git.example.test/team/crm/pulls/31
   **Assignee:** @dan

#### 2. [2026-07-20] - Fix totals
    > Rounding fix

   **Link:** https://git.example.test/team/crm/pulls/28
   **Assignee:** @kim
";
        let parsed = parse_entries(
            region,
            &EntryPattern::NumberedTemplate {
                link: LinkKind::Pulls,
            },
        );
        assert_eq!(parsed.entries.len(), 2);
        assert!(parsed.entries[&31].starts_with("#### {n}. [In Progress] - Add exports"));
        assert!(parsed.entries[&28].starts_with("#### {n}. [2026-07-20] - Fix totals"));
        assert_eq!(parsed.prefix, "");
    }

    #[test]
    fn issues_link_kind_ignores_pull_links() {
        let block = "\
#### 1. [In Progress] - T
   **Link:** https://git.example.test/team/crm/pulls/31
";
        let parsed = parse_entries(
            block,
            &EntryPattern::NumberedTemplate {
                link: LinkKind::Issues,
            },
        );
        // Start line matched but no /issues/ link: malformed, kept in prefix.
        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.malformed, 1);
        assert!(parsed.prefix.contains("pulls/31"));
    }

    #[test]
    fn malformed_block_between_entries_is_preserved() {
        let region = "\
#### 1. [In Progress] - Good
   **Link:** https://x.test/o/r/issues/4

#### 2. [In Progress] - No link at all

#### 3. [2026-01-01] - Also good
   **Link:** https://x.test/o/r/issues/9
";
        let parsed = parse_entries(
            region,
            &EntryPattern::NumberedTemplate {
                link: LinkKind::Issues,
            },
        );
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.malformed, 1);
        assert!(parsed.prefix.contains("No link at all"));
    }

    #[test]
    fn link_id_requires_digit_boundary() {
        assert_eq!(link_id("x /pulls/42 y", "/pulls/"), Some(42));
        assert_eq!(link_id("x /pulls/42abc", "/pulls/"), None);
        assert_eq!(link_id("x /pulls/abc /pulls/7", "/pulls/"), Some(7));
        assert_eq!(link_id("no link", "/pulls/"), None);
    }

    #[test]
    fn duplicate_ids_keep_last_block() {
        let region = "\
#### #5 Old copy
- stale

#### #5 New copy
- fresh
";
        let parsed = parse_entries(region, &EntryPattern::HashId);
        assert_eq!(parsed.entries.len(), 1);
        assert!(parsed.entries[&5].contains("New copy"));
    }

    #[test]
    fn ordinal_normalization_only_touches_start_line() {
        let block = "#### 7. [In Progress] - T\n    body 7. stays\n";
        let normalized = normalize_ordinal(block);
        assert!(normalized.starts_with("#### {n}. [In Progress] - T"));
        assert!(normalized.contains("body 7. stays"));
    }
}
