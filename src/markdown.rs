//! Markdown post-processing for summaries.

use pulldown_cmark::{html, Options, Parser};

/// Turn every single newline into a paragraph break.
///
/// Models tend to put each insight on its own line with a single `\n`, which
/// markdown renderers fold into one paragraph. Runs of two or more newlines
/// are left as they are; `\r\n` is normalized first.
pub fn double_newlines(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    let mut chars = text.chars().peekable();
    let mut run = 0usize;

    while let Some(c) = chars.next() {
        if c == '\n' {
            run += 1;
            if chars.peek() != Some(&'\n') {
                let count = if run == 1 { 2 } else { run };
                out.extend(std::iter::repeat('\n').take(count));
                run = 0;
            }
        } else {
            out.push(c);
        }
    }

    out
}

/// Render markdown to HTML for the web UI.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_newlines() {
        assert_eq!(double_newlines("a\nb"), "a\n\nb");
        assert_eq!(double_newlines("a\n\nb"), "a\n\nb");
        assert_eq!(double_newlines("a\n\n\nb\nc"), "a\n\n\nb\n\nc");
        assert_eq!(double_newlines("a\r\nb"), "a\n\nb");
        assert_eq!(double_newlines("no breaks"), "no breaks");
        assert_eq!(double_newlines("end\n"), "end\n\n");
    }

    #[test]
    fn test_to_html() {
        let html = to_html("Summary.\n\n1. 🎯 **Point** [00:10]");
        assert!(html.contains("<p>Summary.</p>"));
        assert!(html.contains("<strong>Point</strong>"));
        assert!(html.contains("<ol>"));
    }
}
