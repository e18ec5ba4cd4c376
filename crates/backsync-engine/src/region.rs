//! Region location inside backlog documents.
//!
//! A region is the half-open byte range `[start, end)` of a document that
//! the engine manages. Two anchor styles exist:
//!
//! - heading-bounded: from just after a `## Heading` line to the start of
//!   the next line with the same heading prefix, or end of document;
//! - marker-bounded: strictly between two literal sentinel lines.
//!
//! Location never performs I/O; creation helpers return mutated text for
//! the caller to re-locate against.

use crate::error::EngineError;
use crate::splice::EMPTY_PLACEHOLDER;

/// Anchor used to locate a managed region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Heading-bounded region, e.g. `## BACKLOG - Team`.
    Heading { line: String },
    /// Marker-bounded region between two literal sentinel lines.
    Markers { begin: String, end: String },
}

impl Anchor {
    pub fn heading(line: impl Into<String>) -> Self {
        Self::Heading { line: line.into() }
    }

    pub fn markers(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self::Markers {
            begin: begin.into(),
            end: end.into(),
        }
    }
}

/// Half-open byte range of a managed region body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: usize,
    pub end: usize,
}

/// Where to insert a missing heading during [`ensure_heading`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Append at the end of the document.
    End,
    /// Insert after the first `# ` level-1 heading line, else append.
    AfterFirstH1,
    /// Insert immediately after the line of this heading, else append.
    AfterHeading(String),
    /// Insert immediately before the line of this heading, else append.
    BeforeHeading(String),
}

/// Locate the region described by `anchor` inside `text`.
pub fn locate(text: &str, anchor: &Anchor) -> Result<Region, EngineError> {
    match anchor {
        Anchor::Heading { line } => locate_heading(text, line),
        Anchor::Markers { begin, end } => locate_markers(text, begin, end),
    }
}

fn locate_heading(text: &str, heading: &str) -> Result<Region, EngineError> {
    let Some((offset, line)) = find_line(text, heading) else {
        return Err(EngineError::HeadingNotFound {
            heading: heading.to_string(),
        });
    };

    let start = offset + line.len();
    let prefix = heading_prefix(heading);
    let mut end = text.len();
    for (line_offset, raw) in lines_with_offsets(text) {
        if line_offset < start {
            continue;
        }
        if line_content(raw).starts_with(prefix.as_str()) {
            end = line_offset;
            break;
        }
    }

    Ok(Region { start, end })
}

fn locate_markers(text: &str, begin: &str, end: &str) -> Result<Region, EngineError> {
    let begin_hit = find_line(text, begin);
    let end_hit = find_line(text, end);

    let (begin_offset, begin_line) = begin_hit.ok_or_else(|| EngineError::MarkerNotFound {
        marker: begin.to_string(),
    })?;
    let (end_offset, _) = end_hit.ok_or_else(|| EngineError::MarkerNotFound {
        marker: end.to_string(),
    })?;

    if end_offset < begin_offset {
        return Err(EngineError::MarkerOrder {
            begin: begin.to_string(),
            end: end.to_string(),
        });
    }

    Ok(Region {
        start: begin_offset + begin_line.len(),
        end: end_offset,
    })
}

/// Ensure `heading` exists in `text`, inserting it at `placement` when
/// absent. Returns the (possibly mutated) text and whether it was created.
pub fn ensure_heading(text: &str, heading: &str, placement: &Placement) -> (String, bool) {
    if find_line(text, heading).is_some() {
        return (text.to_string(), false);
    }

    let insert_at = placement_offset(text, placement);
    let mut out = String::with_capacity(text.len() + heading.len() + 4);
    out.push_str(&text[..insert_at]);

    match placement {
        Placement::BeforeHeading(_) if insert_at < text.len() => {
            out.push_str(heading);
            out.push_str("\n\n");
        }
        _ => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            if !out.is_empty() && !out.ends_with("\n\n") {
                out.push('\n');
            }
            out.push_str(heading);
            out.push('\n');
        }
    }

    out.push_str(&text[insert_at..]);
    (out, true)
}

/// Ensure a `begin`/`end` marker pair exists immediately after `heading`,
/// wrapping the empty placeholder entry when inserted fresh.
///
/// The heading must already exist (callers run [`ensure_heading`] first).
/// A single present marker is structural corruption and errors out.
pub fn ensure_markers(
    text: &str,
    heading: &str,
    begin: &str,
    end: &str,
) -> Result<(String, bool), EngineError> {
    let begin_present = find_line(text, begin).is_some();
    let end_present = find_line(text, end).is_some();

    match (begin_present, end_present) {
        (true, true) => return Ok((text.to_string(), false)),
        (true, false) => {
            return Err(EngineError::MarkerNotFound {
                marker: end.to_string(),
            })
        }
        (false, true) => {
            return Err(EngineError::MarkerNotFound {
                marker: begin.to_string(),
            })
        }
        (false, false) => {}
    }

    let (offset, line) = find_line(text, heading).ok_or_else(|| EngineError::HeadingNotFound {
        heading: heading.to_string(),
    })?;
    let insert_at = offset + line.len();

    let mut out = String::with_capacity(text.len() + begin.len() + end.len() + 16);
    out.push_str(&text[..insert_at]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
    out.push_str(begin);
    out.push('\n');
    out.push_str(EMPTY_PLACEHOLDER);
    out.push('\n');
    out.push_str(end);
    out.push('\n');
    out.push_str(&text[insert_at..]);
    Ok((out, true))
}

// ---------------------------------------------------------------------------
// Line scanning
// ---------------------------------------------------------------------------

/// Iterate lines with their byte offsets; each item keeps its newline.
pub(crate) fn lines_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0usize;
    text.split_inclusive('\n').map(move |line| {
        let at = offset;
        offset += line.len();
        (at, line)
    })
}

/// Line content without the trailing newline.
pub(crate) fn line_content(raw: &str) -> &str {
    let no_lf = raw.strip_suffix('\n').unwrap_or(raw);
    no_lf.strip_suffix('\r').unwrap_or(no_lf)
}

/// First line whose trimmed content equals `needle` (trimmed).
fn find_line<'a>(text: &'a str, needle: &str) -> Option<(usize, &'a str)> {
    let needle = needle.trim();
    lines_with_offsets(text).find(|(_, raw)| line_content(raw).trim() == needle)
}

/// Markdown heading prefix of an anchor line, e.g. `## ` for `## Team`.
fn heading_prefix(heading: &str) -> String {
    let hashes = heading.bytes().take_while(|&b| b == b'#').count();
    let mut prefix = "#".repeat(hashes.max(1));
    prefix.push(' ');
    prefix
}

fn placement_offset(text: &str, placement: &Placement) -> usize {
    match placement {
        Placement::End => text.len(),
        Placement::AfterFirstH1 => lines_with_offsets(text)
            .find(|(_, raw)| {
                let content = line_content(raw);
                content.starts_with("# ") && !content.starts_with("## ")
            })
            .map_or(text.len(), |(offset, raw)| offset + raw.len()),
        Placement::AfterHeading(target) => {
            find_line(text, target).map_or(text.len(), |(offset, raw)| offset + raw.len())
        }
        Placement::BeforeHeading(target) => {
            find_line(text, target).map_or(text.len(), |(offset, _)| offset)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Wiki

intro prose

## BACKLOG - Team

#### #5 Fix login
- **Status:** open

## Automation

notes
";

    #[test]
    fn heading_region_runs_to_next_same_level_heading() {
        let region = locate(DOC, &Anchor::heading("## BACKLOG - Team")).unwrap();
        let body = &DOC[region.start..region.end];
        assert!(body.starts_with("\n#### #5"));
        assert!(body.ends_with("- **Status:** open\n\n"));
        assert!(DOC[region.end..].starts_with("## Automation"));
    }

    #[test]
    fn heading_region_runs_to_end_of_document() {
        let region = locate(DOC, &Anchor::heading("## Automation")).unwrap();
        assert_eq!(&DOC[region.start..region.end], "\nnotes\n");
        assert_eq!(region.end, DOC.len());
    }

    #[test]
    fn level_three_heading_not_closed_by_level_two_prefix_of_other_level() {
        let text = "### Issues\nbody\n#### entry\n### Next\nrest\n";
        let region = locate(text, &Anchor::heading("### Issues")).unwrap();
        let body = &text[region.start..region.end];
        assert_eq!(body, "body\n#### entry\n");
    }

    #[test]
    fn missing_heading_is_structural_error() {
        let err = locate(DOC, &Anchor::heading("## Missing")).unwrap_err();
        assert!(matches!(err, EngineError::HeadingNotFound { .. }));
    }

    #[test]
    fn marker_region_between_sentinels() {
        let text = "\
### Issues

<!-- BEGIN -->
- (none)
<!-- END -->

tail
";
        let region = locate(text, &Anchor::markers("<!-- BEGIN -->", "<!-- END -->")).unwrap();
        assert_eq!(&text[region.start..region.end], "- (none)\n");
    }

    #[test]
    fn lone_marker_is_structural_error() {
        let text = "<!-- BEGIN -->\nbody\n";
        let err = locate(text, &Anchor::markers("<!-- BEGIN -->", "<!-- END -->")).unwrap_err();
        match err {
            EngineError::MarkerNotFound { marker } => assert_eq!(marker, "<!-- END -->"),
            other => panic!("expected MarkerNotFound, got {other:?}"),
        }
    }

    #[test]
    fn reversed_markers_are_structural_error() {
        let text = "<!-- END -->\nbody\n<!-- BEGIN -->\n";
        let err = locate(text, &Anchor::markers("<!-- BEGIN -->", "<!-- END -->")).unwrap_err();
        assert!(matches!(err, EngineError::MarkerOrder { .. }));
    }

    #[test]
    fn ensure_heading_noop_when_present() {
        let (out, created) = ensure_heading(DOC, "## Automation", &Placement::End);
        assert!(!created);
        assert_eq!(out, DOC);
    }

    #[test]
    fn ensure_heading_appends_at_end() {
        let (out, created) = ensure_heading("# Wiki\n\nbody\n", "## New", &Placement::End);
        assert!(created);
        assert!(out.ends_with("\n## New\n"), "out={out:?}");
        assert!(locate(&out, &Anchor::heading("## New")).is_ok());
    }

    #[test]
    fn ensure_heading_after_first_h1() {
        let text = "# Wiki\n\nprose\n\n## Later\n";
        let (out, created) = ensure_heading(text, "## Fresh", &Placement::AfterFirstH1);
        assert!(created);
        let fresh = out.find("## Fresh").unwrap();
        let later = out.find("## Later").unwrap();
        assert!(fresh < later);
        assert!(out.starts_with("# Wiki\n"));
    }

    #[test]
    fn ensure_heading_before_existing_heading() {
        let (out, created) =
            ensure_heading(DOC, "## BACKLOG - Issues", &Placement::BeforeHeading("## Automation".into()));
        assert!(created);
        let issues = out.find("## BACKLOG - Issues").unwrap();
        let automation = out.find("## Automation").unwrap();
        assert!(issues < automation);
        // Everything before the insertion point is untouched.
        assert!(out.starts_with(&DOC[..DOC.find("## Automation").unwrap()]));
    }

    #[test]
    fn ensure_heading_before_missing_target_appends() {
        let (out, created) =
            ensure_heading("body\n", "## X", &Placement::BeforeHeading("## Nope".into()));
        assert!(created);
        assert!(out.ends_with("## X\n"));
    }

    #[test]
    fn ensure_markers_inserts_placeholder_pair() {
        let text = "## [Unreleased]\n\n### Issues\n\nrest\n";
        let (out, created) =
            ensure_markers(text, "### Issues", "<!-- B -->", "<!-- E -->").unwrap();
        assert!(created);
        let region = locate(&out, &Anchor::markers("<!-- B -->", "<!-- E -->")).unwrap();
        assert_eq!(&out[region.start..region.end], "- (none)\n");
        assert!(out.contains("### Issues\n\n<!-- B -->"), "out={out:?}");
        assert!(out.ends_with("rest\n"));
    }

    #[test]
    fn ensure_markers_noop_when_both_present() {
        let text = "### Issues\n\n<!-- B -->\nbody\n<!-- E -->\n";
        let (out, created) =
            ensure_markers(text, "### Issues", "<!-- B -->", "<!-- E -->").unwrap();
        assert!(!created);
        assert_eq!(out, text);
    }

    #[test]
    fn ensure_markers_rejects_single_marker() {
        let text = "### Issues\n<!-- B -->\n";
        let err = ensure_markers(text, "### Issues", "<!-- B -->", "<!-- E -->").unwrap_err();
        assert!(matches!(err, EngineError::MarkerNotFound { .. }));
    }

    #[test]
    fn heading_match_ignores_surrounding_whitespace() {
        let text = "  ## Padded  \nbody\n";
        let region = locate(text, &Anchor::heading("## Padded")).unwrap();
        assert_eq!(&text[region.start..region.end], "body\n");
    }

    #[test]
    fn crlf_lines_are_matched() {
        let text = "## Team\r\nbody\r\n## Next\r\n";
        let region = locate(text, &Anchor::heading("## Team")).unwrap();
        assert_eq!(&text[region.start..region.end], "body\r\n");
    }
}
