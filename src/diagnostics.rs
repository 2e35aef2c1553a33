use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::InvalidInput { path } => format!(
            "\
# Error: Invalid Input

`{}` is neither a markdown file nor a directory.

## Fix

Pass a `.md` file or a directory containing markdown files.
",
            path.display()
        ),

        Error::SpanOverlap { next_start, prev_end } => format!(
            "\
# Error: Overlapping Rewrite Spans

A rewrite span starting at byte {next_start} begins before the previous
span ends at byte {prev_end}. The document was not modified.
"
        ),

        Error::HttpClient { reason } => format!(
            "\
# Error: HTTP Client

{reason}

## Fix

Check the `proxy` value in `.mdimg.toml` or the `--proxy` flag.
"
        ),

        Error::Fetch { url, reason } => format!(
            "\
# Error: Fetch Failed

`{url}`: {reason}
"
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid Config

{e}

## Fix

Correct `.mdimg.toml` or remove it to run with defaults.
"
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),

        Error::Json(e) => format!(
            "\
# Error: Report Serialization

{e}
"
        ),
    }
}
