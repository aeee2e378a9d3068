//! String- and comment-aware character scanning.

/// A character outside any string literal or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CodeChar {
    pub offset: usize,
    pub ch: char,
    /// Bracket depth outside this character. An opener and its matching closer share a depth.
    pub depth: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub code: Vec<CodeChar>,
    /// Byte offsets of `#` characters that start a comment.
    pub comments: Vec<usize>,
}

pub(crate) fn scan(text: &str) -> Scan {
    let mut out = Scan::default();
    let bytes = text.as_bytes();
    let mut depth: u32 = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match ch {
            '#' => {
                out.comments.push(i);
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                    chars.next();
                }
            }
            '\'' | '"' => {
                let quote = ch as u8;
                let triple = bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote);
                if triple {
                    chars.next();
                    chars.next();
                }
                skip_string(&mut chars, bytes, quote, triple);
            }
            '(' | '[' | '{' => {
                out.code.push(CodeChar {
                    offset: i,
                    ch,
                    depth,
                });
                depth += 1;
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                out.code.push(CodeChar {
                    offset: i,
                    ch,
                    depth,
                });
            }
            _ => out.code.push(CodeChar {
                offset: i,
                ch,
                depth,
            }),
        }
    }
    out
}

fn skip_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    bytes: &[u8],
    quote: u8,
    triple: bool,
) {
    while let Some(&(i, c)) = chars.peek() {
        // An unterminated single-line string ends at the newline, which stays code.
        if c == '\n' && !triple {
            return;
        }
        chars.next();
        match c {
            '\\' => {
                chars.next();
            }
            _ if c as u32 == quote as u32 => {
                if !triple {
                    return;
                }
                if bytes.get(i + 1) == Some(&quote) && bytes.get(i + 2) == Some(&quote) {
                    chars.next();
                    chars.next();
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Offset of the first `ch` at bracket depth 0, outside strings and comments.
pub(crate) fn find_top_level(text: &str, ch: char) -> Option<usize> {
    scan(text)
        .code
        .iter()
        .find(|c| c.ch == ch && c.depth == 0)
        .map(|c| c.offset)
}

/// Offset of the closer matching the opener at `open`.
pub(crate) fn matching_close(text: &str, open: usize) -> Option<usize> {
    let scanned = scan(text);
    let opener = scanned.code.iter().find(|c| c.offset == open)?;
    let closer = match opener.ch {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        _ => return None,
    };
    scanned
        .code
        .iter()
        .find(|c| c.offset > open && c.ch == closer && c.depth == opener.depth)
        .map(|c| c.offset)
}

/// Splits `text` at commas at bracket depth 0. Always yields at least one piece.
pub(crate) fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for c in scan(text).code {
        if c.ch == ',' && c.depth == 0 {
            pieces.push(&text[start..c.offset]);
            start = c.offset + 1;
        }
    }
    pieces.push(&text[start..]);
    pieces
}

/// Splits a list item into (leading trivia, core, trailing trivia). Trivia is whitespace,
/// comments and backslash continuations.
pub(crate) fn split_trivia(piece: &str) -> (&str, &str, &str) {
    let scanned = scan(piece);
    let mut trivia = vec![false; piece.len()];
    for c in &scanned.code {
        let continuation = c.ch == '\\' && piece[c.offset + 1..].starts_with(['\n', '\r']);
        if c.ch.is_whitespace() || continuation {
            trivia[c.offset..c.offset + c.ch.len_utf8()].fill(true);
        }
    }
    for &start in &scanned.comments {
        let end = piece[start..]
            .find(['\n', '\r'])
            .map(|i| start + i)
            .unwrap_or(piece.len());
        trivia[start..end].fill(true);
    }

    let Some(start) = trivia.iter().position(|t| !t) else {
        return (piece, "", "");
    };
    let end = trivia.iter().rposition(|t| !t).map_or(start, |i| i + 1);
    (&piece[..start], &piece[start..end], &piece[end..])
}

/// Splits the newline off the end of a logical line.
pub(crate) fn split_newline(text: &str) -> (&str, &str) {
    if let Some(body) = text.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = text.strip_suffix('\n') {
        (body, "\n")
    } else {
        (text, "")
    }
}

/// Splits a logical line into code and its trailing `(whitespace, comment, newline)`. Only a
/// comment on the last physical line counts as trailing.
pub(crate) fn split_trailing(text: &str) -> (&str, &str, Option<&str>, &str) {
    let (body, newline) = split_newline(text);
    let last_line_start = body.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let comment = scan(body)
        .comments
        .into_iter()
        .rev()
        .find(|&c| c >= last_line_start);
    let (code, comment) = match comment {
        Some(c) => (&body[..c], Some(&body[c..])),
        None => (body, None),
    };
    let trimmed = code.trim_end_matches([' ', '\t']);
    (trimmed, &code[trimmed.len()..], comment, newline)
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Length in bytes of the identifier at the start of `text`.
pub(crate) fn ident_len(text: &str) -> usize {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    chars
        .find(|&(_, c)| !is_ident_char(c))
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}
