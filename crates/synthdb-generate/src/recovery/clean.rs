use std::sync::LazyLock;

use regex::Regex;

static TRAILING_COMMA_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("valid regex"));
static TRAILING_COMMA_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("valid regex"));
static MISSING_OBJECT_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*\{").expect("valid regex"));
static SINGLE_QUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']*)':").expect("valid regex"));
static SINGLE_QUOTED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*'([^']*)'").expect("valid regex"));

/// Reduce a model response to the JSON array it most likely contains.
///
/// Strips markdown fences, prose before the first `[` and prose after the
/// `]` that closes that array, then applies [`fix_common_issues`]. A
/// truncated array never closes, so its tail is kept for the strategies.
pub fn clean_response(content: &str) -> String {
    let mut text = strip_fences(content).trim();

    if let Some(start) = text.find('[') {
        text = &text[start..];
        if let Some(end) = closing_bracket(text) {
            let after = text[end + 1..].trim();
            if !after.is_empty() && !after.starts_with(',') {
                text = &text[..=end];
            }
        }
    }

    fix_common_issues(text).trim().to_string()
}

/// Byte index of the `]` that closes the array opened at `text[0]`,
/// ignoring brackets inside string literals.
fn closing_bracket(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return (ch == ']').then_some(index);
                }
            }
            _ => {}
        }
    }

    None
}

fn strip_fences(content: &str) -> &str {
    if let Some((_, rest)) = content.split_once("```json") {
        return rest.split("```").next().unwrap_or(rest);
    }
    let mut parts = content.split("```");
    match (parts.next(), parts.next()) {
        (Some(_), Some(inner)) => inner,
        _ => content,
    }
}

/// Trailing commas, missing commas between objects, single quotes and
/// Python literals.
pub fn fix_common_issues(content: &str) -> String {
    let text = TRAILING_COMMA_OBJECT.replace_all(content, "}");
    let text = TRAILING_COMMA_ARRAY.replace_all(&text, "]");
    let text = MISSING_OBJECT_COMMA.replace_all(&text, "}, {");
    let text = SINGLE_QUOTED_KEY.replace_all(&text, "\"$1\":");
    let text = SINGLE_QUOTED_VALUE.replace_all(&text, ": \"$1\"");
    normalize_python_literals(&text)
}

/// Rewrite bare `True`, `False` and `None` outside string literals.
pub fn normalize_python_literals(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut word = String::new();

    let flush = |word: &mut String, out: &mut String| {
        match word.as_str() {
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            "None" => out.push_str("null"),
            other => out.push_str(other),
        }
        word.clear();
    };

    for ch in content.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch.is_alphanumeric() || ch == '_' {
            word.push(ch);
            continue;
        }

        flush(&mut word, &mut out);
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }
    flush(&mut word, &mut out);

    out
}

/// Close a line that carries an odd number of double quotes.
pub(crate) fn close_unterminated_string(line: &str) -> String {
    if line.matches('"').count() % 2 == 0 {
        return line.to_string();
    }
    let trimmed = line.trim_end();
    for terminator in [',', '}', ']'] {
        if let Some(head) = trimmed.strip_suffix(terminator) {
            return format!("{head}\"{terminator}");
        }
    }
    format!("{trimmed}\"")
}
