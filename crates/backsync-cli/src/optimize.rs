//! `backsync optimize` — add YAML frontmatter to wiki documents.

use std::path::Path;

use chrono::Local;

use backsync_backlog::frontmatter::process_directory;

use crate::args::parse_flags;

const FLAGS: [&str; 2] = ["--dir", "--recursive"];

pub fn run(args: &[String]) -> Result<String, String> {
    let flags = parse_flags("optimize", args, &FLAGS)?;
    let Some(dir) = flags.get("--dir") else {
        return Err("optimize requires --dir".to_string());
    };
    let recursive = flags.contains_key("--recursive");

    let stats = process_directory(Path::new(dir), recursive, Local::now())
        .map_err(|err| err.to_string())?;
    Ok(format!(
        "frontmatter: processed={} skipped={} errors={}\n",
        stats.processed, stats.skipped, stats.errors
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::run_for_test;

    #[test]
    fn dir_is_required() {
        let out = run_for_test(&["optimize"]);
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.contains("--dir"));
    }

    #[test]
    fn directory_pass_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("note.md"), "# Note\n").unwrap();

        let out = run_for_test(&["optimize", "--dir", dir.path().to_str().unwrap()]);
        assert_eq!(out.exit_code, 0, "stderr={}", out.stderr);
        assert_eq!(out.stdout, "frontmatter: processed=1 skipped=0 errors=0\n");

        let text = std::fs::read_to_string(dir.path().join("note.md")).unwrap();
        assert!(text.starts_with("---\n"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        let out = run_for_test(&["optimize", "--dir", "/nonexistent-wiki"]);
        assert_eq!(out.exit_code, 1);
        assert!(out.stderr.contains("read"));
    }
}
