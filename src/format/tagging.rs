//! Toggling tagged lines in rendered text
//!
//! A deactivated line carries `%@% ` right after its indentation. Both
//! functions return the new text and the number of runs of consecutive
//! lines they changed.

use crate::models::tag::Tag;

const MARKER: &str = "%@% ";
const LEGACY_MARKER: &str = "%%% ";

/// Tags found in the ` %! TAG` suffixes of a line
fn line_tags(line: &str) -> Vec<Tag> {
    line.split(" %! ")
        .skip(1)
        .map(|part| Tag::new(part.split_whitespace().next().unwrap_or("")))
        .filter(|tag| !tag.as_str().is_empty())
        .collect()
}

fn line_matches(line: &str, filter: &Tag) -> bool {
    line_tags(line).iter().any(|tag| tag.matches(filter))
}

fn split_indent(line: &str) -> (&str, &str) {
    let body = line.trim_start_matches(' ');
    (&line[..line.len() - body.len()], body)
}

/// Remove the deactivation marker from every line tagged with `filter`
pub fn activate(text: &str, filter: &Tag) -> (String, usize) {
    toggle(text, filter, |body| {
        body.strip_prefix(MARKER)
            .or_else(|| body.strip_prefix(LEGACY_MARKER))
            .map(str::to_string)
    })
}

/// Add the deactivation marker to every active line tagged with `filter`
pub fn deactivate(text: &str, filter: &Tag) -> (String, usize) {
    toggle(text, filter, |body| {
        if body.starts_with('%') {
            None
        } else {
            Some(format!("{}{}", MARKER, body))
        }
    })
}

fn toggle(text: &str, filter: &Tag, change: impl Fn(&str) -> Option<String>) -> (String, usize) {
    let mut count = 0;
    let mut in_run = false;
    let mut lines = Vec::new();
    for line in text.split('\n') {
        if !line_matches(line, filter) {
            in_run = false;
            lines.push(line.to_string());
            continue;
        }
        let (indent, body) = split_indent(line);
        match change(body) {
            Some(body) => {
                if !in_run {
                    count += 1;
                }
                in_run = true;
                lines.push(format!("{}{}", indent, body));
            }
            None => {
                in_run = false;
                lines.push(line.to_string());
            }
        }
    }
    (lines.join("\n"), count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "\\new Staff\n{\n    c'4\n    \\clef \"bass\" %! PARTS\n    \\clef \"treble\" %! SCORE\n    d'4\n}";

    #[test]
    fn test_deactivate_then_activate() {
        let (deactivated, count) = deactivate(TEXT, &Tag::new("PARTS"));
        assert_eq!(count, 1);
        assert!(deactivated.contains("    %@% \\clef \"bass\" %! PARTS"));
        assert!(deactivated.contains("    \\clef \"treble\" %! SCORE"));
        let (again, count) = deactivate(&deactivated, &Tag::new("PARTS"));
        assert_eq!(count, 0);
        assert_eq!(again, deactivated);
        let (activated, count) = activate(&deactivated, &Tag::new("PARTS"));
        assert_eq!(count, 1);
        assert_eq!(activated, TEXT);
    }

    #[test]
    fn test_runs_are_counted_once() {
        let text = "a %! X\nb %! X\nc\nd %! X:Y";
        let (result, count) = deactivate(text, &Tag::new("X"));
        assert_eq!(count, 2);
        assert_eq!(result, "%@% a %! X\n%@% b %! X\nc\n%@% d %! X:Y");
    }

    #[test]
    fn test_line_tags() {
        assert_eq!(line_tags("c'4 %! A:B"), vec![Tag::new("A:B")]);
        assert!(line_tags("c'4").is_empty());
    }
}
