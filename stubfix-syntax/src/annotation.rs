/// Normal form of a type expression, used to compare annotations written by different hands.
///
/// Single-quoted strings become double-quoted, whitespace outside strings is dropped, and
/// commas and `|` get one canonical spacing.
pub fn canonical_annotation(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' => {
                out.push('"');
                while let Some(c) = chars.next() {
                    if c == ch {
                        break;
                    }
                    if c == '\\' {
                        out.push(c);
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                        continue;
                    }
                    out.push(c);
                }
                out.push('"');
            }
            ',' => out.push_str(", "),
            '|' => {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push_str(" | ");
            }
            ')' | ']' | '}' => {
                while out.ends_with(' ') {
                    out.pop();
                }
                out.push(ch);
            }
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out.trim_end().to_string()
}
