//! Parent/child document splitting.
//!
//! Documents are split twice: once along the heading hierarchy into parent
//! sections (the retrieval context handed back to callers), then each
//! section into bounded, overlapping character windows (the units that get
//! embedded and indexed). Splitting is pure and deterministic; identical
//! input always yields identical chunk sequences.

use crate::config::Config;

/// Options governing header and window splitting.
#[derive(Debug, Clone, Copy)]
pub struct SplitOptions {
    /// Deepest heading level treated as a section boundary; deeper headings
    /// are ordinary body text.
    pub max_header_level: usize,
    /// Character length of each child window.
    pub window_size: usize,
    /// Character overlap between adjacent windows; must stay below
    /// `window_size`.
    pub window_overlap: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            max_header_level: 3,
            window_size: 500,
            window_overlap: 100,
        }
    }
}

impl SplitOptions {
    /// Derive splitting options from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_header_level: config.max_header_level,
            window_size: config.window_size,
            window_overlap: config.window_overlap,
        }
    }
}

/// A heading-bounded section produced by [`split_headers`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSection {
    /// `->`-joined heading hierarchy at the point the section was collected.
    pub title_path: String,
    /// Trimmed body text accumulated under the heading.
    pub content: String,
}

/// Split raw text into parent sections along its heading hierarchy.
///
/// A line counts as a header only when it begins with `1..=max_level` `#`
/// characters followed by whitespace. On a header at level `L` the heading
/// stack is truncated to `L-1` entries and the header text pushed; when a
/// header skips over an unset intermediate level no placeholder is inserted,
/// so the title path can be shorter than the header's nominal depth.
/// Downstream display relies on that exact string — do not "repair" it.
pub fn split_headers(text: &str, max_level: usize) -> Vec<ParentSection> {
    let mut sections = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        match parse_header(trimmed, max_level) {
            Some((level, title)) => {
                flush(&mut sections, &stack, &mut buffer);
                stack.truncate(level - 1);
                stack.push(title.to_string());
            }
            None => buffer.push(line),
        }
    }
    flush(&mut sections, &stack, &mut buffer);

    sections
}

/// Recognize `trimmed` as a header of level `1..=max_level`.
fn parse_header(trimmed: &str, max_level: usize) -> Option<(usize, &str)> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > max_level {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    Some((level, rest.trim()))
}

fn flush(sections: &mut Vec<ParentSection>, stack: &[String], buffer: &mut Vec<&str>) {
    if buffer.is_empty() {
        return;
    }
    let content = buffer.join("\n").trim().to_string();
    buffer.clear();
    if content.is_empty() {
        return;
    }
    sections.push(ParentSection {
        title_path: stack.join("->"),
        content,
    });
}

/// Split text into bounded, overlapping character windows.
///
/// Character-based, not word-aware. Text no longer than `window_size` comes
/// back as a single window; otherwise windows advance by
/// `window_size - overlap` characters and the loop stops once a window
/// reaches the end of the text, so the final window may be shorter.
pub fn split_windows(text: &str, window_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if window_size == 0 || chars.len() <= window_size {
        return vec![text.to_string()];
    }

    let step = window_size.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(title_path: &str, content: &str) -> ParentSection {
        ParentSection {
            title_path: title_path.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn split_headers_builds_title_paths_deterministically() {
        let text = "# Title\nIntro\n## Sub\nBody1\n### SubSub\nBody2\n## Sub2\nBody3";
        let sections = split_headers(text, 3);
        assert_eq!(
            sections,
            vec![
                section("Title", "Intro"),
                section("Title->Sub", "Body1"),
                section("Title->Sub->SubSub", "Body2"),
                section("Title->Sub2", "Body3"),
            ]
        );
    }

    #[test]
    fn split_headers_is_idempotent_across_calls() {
        let text = "# A\none\n## B\ntwo";
        assert_eq!(split_headers(text, 3), split_headers(text, 3));
    }

    #[test]
    fn headers_deeper_than_max_level_are_body_text() {
        let text = "# A\n#### Deep heading\nbody";
        let sections = split_headers(text, 3);
        assert_eq!(sections, vec![section("A", "#### Deep heading\nbody")]);
    }

    #[test]
    fn skipped_levels_yield_shorter_title_paths() {
        // Level 3 under a level 1 heading: no placeholder for the unset
        // level 2, the path simply has two entries.
        let text = "# A\nx\n### Deep\ny";
        let sections = split_headers(text, 3);
        assert_eq!(sections, vec![section("A", "x"), section("A->Deep", "y")]);
    }

    #[test]
    fn hash_runs_without_whitespace_are_not_headers() {
        let text = "# A\n#tag not-a-header\nbody";
        let sections = split_headers(text, 3);
        assert_eq!(sections, vec![section("A", "#tag not-a-header\nbody")]);
    }

    #[test]
    fn empty_sections_are_discarded() {
        let text = "# A\n# B\nonly b has content";
        let sections = split_headers(text, 3);
        assert_eq!(sections, vec![section("B", "only b has content")]);
    }

    #[test]
    fn split_windows_matches_documented_formula() {
        let windows = split_windows("0123456789", 4, 1);
        assert_eq!(windows, vec!["0123", "3456", "6789"]);
    }

    #[test]
    fn split_windows_returns_short_text_whole() {
        assert_eq!(split_windows("abc", 4, 1), vec!["abc"]);
        assert_eq!(split_windows("abcd", 4, 1), vec!["abcd"]);
    }

    #[test]
    fn split_windows_final_window_may_be_short() {
        let windows = split_windows("abcdefgh", 5, 2);
        assert_eq!(windows, vec!["abcde", "defgh"]);

        let windows = split_windows("abcdefghi", 5, 2);
        assert_eq!(windows, vec!["abcde", "defgh", "ghi"]);
    }

    #[test]
    fn split_windows_respects_char_boundaries() {
        let windows = split_windows("héllo wörld!", 5, 1);
        for window in &windows {
            assert!(window.chars().count() <= 5);
        }
        assert_eq!(windows.first().map(String::as_str), Some("héllo"));
    }
}
