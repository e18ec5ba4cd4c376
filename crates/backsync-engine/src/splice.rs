//! Region body assembly and document splicing.

use crate::region::Region;

/// Placeholder written when a synced region has no prefix and no entries,
/// so "synced empty" stays distinguishable from "never synced".
pub const EMPTY_PLACEHOLDER: &str = "- (none)";

/// Build the replacement body for a region.
///
/// Convention: prefix (trailing blank lines trimmed) + one blank-line
/// separator (only when prefix and entries are both non-empty) + entries
/// joined by exactly one blank line + single trailing newline.
/// `leading_blank` opens the body with a blank line; heading-anchored
/// regions use it so the body does not butt against the heading line,
/// marker-bounded regions do not.
pub fn build_region_body(prefix: &str, entries: &[String], leading_blank: bool) -> String {
    let prefix = prefix.trim_end();
    // A placeholder-only prefix is engine output from an earlier empty
    // sync, not user content; dropping it keeps the placeholder from
    // sticking around once real entries arrive.
    let prefix = if prefix.trim() == EMPTY_PLACEHOLDER {
        ""
    } else {
        prefix
    };
    let joined = entries
        .iter()
        .map(|entry| entry.trim_end())
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut body = String::with_capacity(prefix.len() + joined.len() + 8);

    if prefix.is_empty() && joined.is_empty() {
        if leading_blank {
            body.push('\n');
        }
        body.push_str(EMPTY_PLACEHOLDER);
        body.push('\n');
        return body;
    }

    if !prefix.is_empty() {
        body.push_str(prefix);
        body.push('\n');
        if !joined.is_empty() {
            body.push('\n');
        }
    } else if leading_blank {
        body.push('\n');
    }

    if !joined.is_empty() {
        body.push_str(&joined);
        body.push('\n');
    }

    body
}

/// Replace `document[region.start..region.end]` with `body`, copying all
/// bytes outside the region unchanged.
///
/// When the region starts mid-line (an anchor line at end-of-document
/// without its newline), a line break is inserted first so the body's
/// own leading blank line is never consumed as the anchor's terminator —
/// without this, the first sync of such a document would not be a fixed
/// point.
pub fn splice_region(document: &str, region: Region, body: &str) -> String {
    let head = &document[..region.start];
    let mut out =
        String::with_capacity(document.len() - (region.end - region.start) + body.len() + 1);
    out.push_str(head);
    if !head.is_empty() && !head.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(body);
    out.push_str(&document[region.end..]);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
