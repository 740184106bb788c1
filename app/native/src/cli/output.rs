//! Terminal output helpers shared by the listing commands.

use std::fmt::Write as _;

use colored::Colorize;
use serde_json::Value;

const INDENT: &str = "  ";

/// Prints a JSON value pretty-printed with colored keys and scalars.
pub fn print_highlighted_json(value: &Value) {
    println!("{}", highlight_json(value));
}

/// Pretty-prints `value` with ANSI colors: keys cyan, strings green, numbers
/// yellow, booleans and null magenta.
#[must_use]
pub fn highlight_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().magenta().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().yellow().to_string()),
        Value::String(_) => out.push_str(&value.to_string().green().to_string()),
        Value::Array(items) => {
            write_container(out, depth, ('[', ']'), items.iter(), |out, item| {
                write_value(out, item, depth + 1);
            });
        }
        Value::Object(map) => {
            write_container(out, depth, ('{', '}'), map.iter(), |out, (key, item)| {
                let key = Value::String(key.clone()).to_string();
                let _ = write!(out, "{}: ", key.cyan());
                write_value(out, item, depth + 1);
            });
        }
    }
}

fn write_container<I, F>(out: &mut String, depth: usize, (open, close): (char, char), items: I, mut write_item: F)
where
    I: ExactSizeIterator,
    F: FnMut(&mut String, I::Item),
{
    let open = open.to_string().white().bold();
    let close = close.to_string().white().bold();

    if items.len() == 0 {
        let _ = write!(out, "{open}{close}");
        return;
    }

    let _ = writeln!(out, "{open}");
    let count = items.len();
    for (i, item) in items.enumerate() {
        out.push_str(&INDENT.repeat(depth + 1));
        write_item(out, item);
        if i + 1 < count {
            out.push(',');
        }
        out.push('\n');
    }
    let _ = write!(out, "{}{close}", INDENT.repeat(depth));
}

/// Shortens `s` to at most `max_chars` characters, ending in `…` when cut.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.char_indices().nth(max_chars).is_none() {
        return s.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }
    let cut = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
    format!("{}…", &s[..cut])
}

/// A green check or a red cross.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value { "✓".green().to_string() } else { "✗".red().to_string() }
}
