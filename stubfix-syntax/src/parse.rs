//! Reader for stub source.
//!
//! Source is first cut into logical lines (bracket-, string- and continuation-aware), then
//! grouped into blocks by indentation. Only headers of classes, functions, decorators,
//! `from` imports and assignments are parsed further; everything else is kept verbatim.

use crate::scan::{
    CodeChar, find_top_level, ident_len, matching_close, scan, split_top_level_commas,
    split_trailing, split_trivia,
};
use crate::tree::{
    Annotation, ClassDef, Decorator, FunctionDef, ImportFrom, ImportName, LineSpan, NodeId,
    NodeKind, Param, ParamKind, ParamList, Returns, StubModule, Suite, Trailing,
};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unexpected indent")]
    UnexpectedIndent { line: u32 },

    #[error("line {line}: expected an indented block")]
    ExpectedIndent { line: u32 },

    #[error("line {line}: unindent does not match any outer indentation level")]
    Dedent { line: u32 },

    #[error("line {line}: decorator is not followed by a class or function")]
    DanglingDecorator { line: u32 },

    #[error("line {line}: malformed {what}")]
    Malformed { line: u32, what: &'static str },
}

/// Parses a whole stub file.
pub fn parse_module(source: &str) -> Result<StubModule, ParseError> {
    let mut module = StubModule::empty(detect_newline(source));
    let body = Parser::new(source, &mut module, true).parse_top()?;
    module.body = body;
    Ok(module)
}

impl StubModule {
    /// Parses `text` into new nodes of this module, indented by `indent` and using the
    /// module's newline style. The nodes are not attached to any block and carry no span.
    pub fn parse_fragment(&mut self, text: &str, indent: &str) -> Result<Vec<NodeId>, ParseError> {
        let mut source = String::new();
        for line in text.lines() {
            if !line.trim().is_empty() {
                source.push_str(indent);
                source.push_str(line);
            }
            source.push_str(&self.newline);
        }
        Parser::new(&source, self, false).parse_top()
    }
}

fn detect_newline(source: &str) -> &'static str {
    match source.find('\n') {
        Some(i) if i > 0 && source.as_bytes()[i - 1] == b'\r' => "\r\n",
        _ => "\n",
    }
}

#[derive(Debug, Clone, Copy)]
struct LogicalLine<'a> {
    text: &'a str,
    first: u32,
    last: u32,
}

impl<'a> LogicalLine<'a> {
    fn indent(&self) -> &'a str {
        let content = self.text.trim_start_matches([' ', '\t']);
        &self.text[..self.text.len() - content.len()]
    }

    fn content(&self) -> &'a str {
        &self.text[self.indent().len()..]
    }

    fn is_trivia(&self) -> bool {
        let content = self.content();
        content.is_empty() || content.starts_with(['#', '\n', '\r', '\x0c'])
    }

    fn span(&self) -> LineSpan {
        LineSpan {
            start: self.first,
            end: self.last,
        }
    }
}

fn logical_lines<'a>(source: &'a str) -> Vec<LogicalLine<'a>> {
    let scanned = scan(source);
    let mut lines = Vec::new();
    let mut start = 0;
    let mut line_no = 1u32;

    let mut push = |end: usize, lines: &mut Vec<LogicalLine<'a>>, start: &mut usize| {
        let text = &source[*start..end];
        let breaks = text.matches('\n').count() as u32;
        let last = if text.ends_with('\n') {
            line_no + breaks - 1
        } else {
            line_no + breaks
        };
        lines.push(LogicalLine {
            text: &source[*start..end],
            first: line_no,
            last,
        });
        line_no += breaks;
        *start = end;
    };

    for (k, c) in scanned.code.iter().enumerate() {
        if c.ch == '\n' && c.depth == 0 && !is_continuation(&scanned.code, k) {
            push(c.offset + 1, &mut lines, &mut start);
        }
    }
    if start < source.len() {
        push(source.len(), &mut lines, &mut start);
    }
    lines
}

/// Whether the newline at `code[k]` is escaped by a backslash.
fn is_continuation(code: &[CodeChar], k: usize) -> bool {
    let mut j = k;
    let mut expect = code[k].offset;
    if j > 0 && code[j - 1].ch == '\r' && code[j - 1].offset + 1 == expect {
        j -= 1;
        expect = code[j].offset;
    }
    j > 0 && code[j - 1].ch == '\\' && code[j - 1].offset + 1 == expect
}

fn starts_with_keyword(content: &str, keyword: &str) -> bool {
    content
        .strip_prefix(keyword)
        .is_some_and(|rest| rest.starts_with([' ', '\t']))
}

fn is_def(content: &str) -> bool {
    starts_with_keyword(content, "def")
        || (starts_with_keyword(content, "async")
            && starts_with_keyword(content[5..].trim_start(), "def"))
}

const BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "try", "except", "finally", "with", "for", "while",
];

/// Keywords that can directly precede `:` or `=` and so look like assignment targets.
const NOT_TARGETS: &[&str] = &["else", "try", "finally", "except", "lambda"];

fn assignment_target(content: &str) -> Option<&str> {
    let len = ident_len(content);
    if len == 0 {
        return None;
    }
    let target = &content[..len];
    if NOT_TARGETS.contains(&target) {
        return None;
    }
    let rest = content[len..].trim_start_matches([' ', '\t']);
    if rest.starts_with("==") {
        return None;
    }
    rest.starts_with(['=', ':']).then_some(target)
}

fn opens_block(content: &str) -> bool {
    let len = ident_len(content);
    if len == 0 || !BLOCK_KEYWORDS.contains(&&content[..len]) {
        return false;
    }
    let (code, ..) = split_trailing(content);
    code.ends_with(':')
}

fn trailing(ws: &str, comment: Option<&str>, newline: &str) -> Trailing {
    Trailing {
        whitespace: ws.to_string(),
        comment: comment.map(str::to_string),
        newline: newline.to_string(),
    }
}

fn parse_suite(rest: &str) -> Suite {
    let (code, ws, comment, newline) = split_trailing(rest);
    if code.trim().is_empty() {
        Suite::Block {
            trailing: trailing(&format!("{}{}", code, ws), comment, newline),
            body: Vec::new(),
        }
    } else {
        Suite::Inline {
            code: code.to_string(),
            trailing: trailing(ws, comment, newline),
        }
    }
}

fn parse_decorator(line: &LogicalLine<'_>) -> Decorator {
    let (code, ws, comment, newline) = split_trailing(line.content());
    Decorator {
        indent: line.indent().to_string(),
        expr: code[1..].to_string(),
        trailing: trailing(ws, comment, newline),
        trivia: String::new(),
    }
}

fn parse_function(line: &LogicalLine<'_>) -> Result<FunctionDef, ParseError> {
    let malformed = || ParseError::Malformed {
        line: line.first,
        what: "function definition",
    };
    let content = line.content();

    let def_end = if content.starts_with("def") {
        3
    } else {
        let rest = &content[5..];
        5 + (rest.len() - rest.trim_start().len()) + 3
    };
    let after_def = &content[def_end..];
    let name_start = def_end + (after_def.len() - after_def.trim_start().len());
    let name_len = ident_len(&content[name_start..]);
    if name_len == 0 {
        return Err(malformed());
    }
    let name_end = name_start + name_len;

    let open = content[name_end..].find('(').ok_or_else(malformed)? + name_end;
    let before_paren = &content[name_end..open];
    if !before_paren.trim().is_empty() {
        return Err(malformed());
    }
    let close = matching_close(content, open).ok_or_else(malformed)?;
    let params = parse_params(&content[open + 1..close], line.first)?;

    let after = &content[close + 1..];
    let colon = find_top_level(after, ':').ok_or_else(malformed)?;
    let signature_tail = &after[..colon];
    let (returns, before_colon) = match signature_tail.find("->") {
        Some(arrow) => {
            let ann = &signature_tail[arrow + 2..];
            let expr = ann.trim();
            let after_arrow = &ann[..ann.len() - ann.trim_start().len()];
            let before_colon = &ann[after_arrow.len() + expr.len()..];
            (
                Some(Returns {
                    before_arrow: signature_tail[..arrow].to_string(),
                    after_arrow: after_arrow.to_string(),
                    annotation: expr.to_string(),
                }),
                before_colon,
            )
        }
        None => (None, signature_tail),
    };

    Ok(FunctionDef {
        decorators: Vec::new(),
        indent: line.indent().to_string(),
        keyword: content[..name_start].to_string(),
        name: content[name_start..name_end].to_string(),
        before_paren: before_paren.to_string(),
        params,
        returns,
        before_colon: before_colon.to_string(),
        suite: parse_suite(&after[colon + 1..]),
    })
}

fn parse_params(inner: &str, line: u32) -> Result<ParamList, ParseError> {
    let pieces = split_top_level_commas(inner);
    let count = pieces.len();
    let mut list = ParamList::default();

    for (i, piece) in pieces.into_iter().enumerate() {
        let (leading, core, trailing) = split_trivia(piece);
        if core.is_empty() {
            if i + 1 == count {
                list.tail = piece.to_string();
                break;
            }
            return Err(ParseError::Malformed {
                line,
                what: "parameter list",
            });
        }
        let mut param = parse_param(core, line)?;
        param.leading = leading.to_string();
        param.trailing = trailing.to_string();
        param.comma = i + 1 < count;
        list.items.push(param);
    }
    Ok(list)
}

fn parse_param(core: &str, line: u32) -> Result<Param, ParseError> {
    let (kind, rest) = match core {
        "*" => (ParamKind::StarMarker, ""),
        "/" => (ParamKind::SlashMarker, ""),
        _ => {
            if let Some(rest) = core.strip_prefix("**") {
                (ParamKind::KwArgs, rest)
            } else if let Some(rest) = core.strip_prefix('*') {
                (ParamKind::VarArgs, rest)
            } else {
                (ParamKind::Regular, core)
            }
        }
    };
    let mut param = Param {
        leading: String::new(),
        kind,
        name: String::new(),
        annotation: None,
        default: String::new(),
        trailing: String::new(),
        comma: false,
    };
    if param.is_marker() {
        return Ok(param);
    }

    let name_len = ident_len(rest);
    if name_len == 0 {
        return Err(ParseError::Malformed {
            line,
            what: "parameter",
        });
    }
    param.name = rest[..name_len].to_string();
    let after = &rest[name_len..];
    let trimmed = after.trim_start();

    match trimmed.strip_prefix(':') {
        Some(ann) => {
            let (ann_text, default) = match find_top_level(ann, '=') {
                Some(eq) => (&ann[..eq], &ann[eq..]),
                None => (ann, ""),
            };
            let expr = ann_text.trim();
            let after_colon = &ann_text[..ann_text.len() - ann_text.trim_start().len()];
            let before_default = &ann_text[after_colon.len() + expr.len()..];
            param.annotation = Some(Annotation {
                before_colon: after[..after.len() - trimmed.len()].to_string(),
                after_colon: after_colon.to_string(),
                expr: expr.to_string(),
            });
            param.default = format!("{}{}", before_default, default);
        }
        None => param.default = after.to_string(),
    }
    Ok(param)
}

fn parse_class_header(line: &LogicalLine<'_>) -> Result<ClassDef, ParseError> {
    let malformed = || ParseError::Malformed {
        line: line.first,
        what: "class definition",
    };
    let content = line.content();
    let colon = find_top_level(content, ':').ok_or_else(malformed)?;
    let after_kw = &content[5..];
    let name_start = 5 + (after_kw.len() - after_kw.trim_start().len());
    let name_len = ident_len(&content[name_start..]);
    if name_len == 0 || name_start + name_len > colon {
        return Err(malformed());
    }
    Ok(ClassDef {
        decorators: Vec::new(),
        indent: line.indent().to_string(),
        head: content[..colon].to_string(),
        name: content[name_start..name_start + name_len].to_string(),
        suite: parse_suite(&content[colon + 1..]),
    })
}

fn parse_import_from(line: &LogicalLine<'_>) -> Option<ImportFrom> {
    let content = line.content();
    let after_from = content.strip_prefix("from")?;
    let module_start = 4 + (after_from.len() - after_from.trim_start().len());
    let module_len = content[module_start..]
        .find(|c: char| !(c == '.' || c == '_' || c.is_alphanumeric()))
        .unwrap_or(content.len() - module_start);
    if module_len == 0 {
        return None;
    }
    let module_end = module_start + module_len;
    let after_module = &content[module_end..];
    let import_start = module_end + (after_module.len() - after_module.trim_start().len());
    if !starts_with_keyword(&content[import_start..], "import")
        && !content[import_start..].starts_with("import(")
    {
        return None;
    }
    let import_end = import_start + "import".len();

    let (code, ws, comment, newline) = split_trailing(content);
    let names_code = code.get(import_end..)?;
    let names_trimmed = names_code.trim_start();

    let (head, names_text, close) = if names_trimmed.starts_with('(') {
        let open = import_end + (names_code.len() - names_trimmed.len());
        let close = matching_close(code, open)?;
        (&code[..open + 1], &code[open + 1..close], &code[close..])
    } else {
        (&code[..import_end], names_code, "")
    };

    let pieces = split_top_level_commas(names_text);
    let count = pieces.len();
    let mut names = Vec::new();
    let mut trailing_comma = false;
    let mut tail = String::new();
    for (i, piece) in pieces.into_iter().enumerate() {
        let (leading, core, trail) = split_trivia(piece);
        if core.is_empty() {
            if i + 1 == count && i > 0 {
                trailing_comma = true;
                tail.push_str(piece);
                break;
            }
            return None;
        }
        names.push(ImportName {
            leading: leading.to_string(),
            text: core.to_string(),
            trailing: trail.to_string(),
        });
    }
    tail.push_str(close);

    Some(ImportFrom {
        indent: line.indent().to_string(),
        module: content[module_start..module_end].to_string(),
        head: head.to_string(),
        names,
        trailing_comma,
        tail,
        trailing: trailing(ws, comment, newline),
    })
}

struct Parser<'a, 'm> {
    lines: Vec<LogicalLine<'a>>,
    pos: usize,
    module: &'m mut StubModule,
    with_spans: bool,
}

impl<'a, 'm> Parser<'a, 'm> {
    fn new(source: &'a str, module: &'m mut StubModule, with_spans: bool) -> Self {
        Self {
            lines: logical_lines(source),
            pos: 0,
            module,
            with_spans,
        }
    }

    fn alloc(&mut self, line: &LogicalLine<'_>, kind: NodeKind) -> NodeId {
        let span = self.with_spans.then(|| line.span());
        self.module.alloc(span, kind)
    }

    fn parse_top(mut self) -> Result<Vec<NodeId>, ParseError> {
        let body = self.parse_block(None)?;
        if let Some(line) = self.lines.get(self.pos) {
            return Err(ParseError::Dedent { line: line.first });
        }
        trace!(nodes = self.module.len(), "parsed stub source");
        Ok(body)
    }

    /// Parses statements until a line dedents below the block. `header` is the indent width
    /// and last line of the statement that opened the block.
    fn parse_block(&mut self, header: Option<(usize, u32)>) -> Result<Vec<NodeId>, ParseError> {
        let mut body = Vec::new();
        let mut block_indent: Option<usize> = None;

        loop {
            let mut next = self.pos;
            while next < self.lines.len() && self.lines[next].is_trivia() {
                next += 1;
            }
            if next == self.lines.len() {
                // Trailing blank lines belong to the outermost block.
                if header.is_none() {
                    self.push_trivia(&mut body, next);
                }
                break;
            }

            let line = self.lines[next];
            let indent = line.indent().len();
            match block_indent {
                None => {
                    if let Some((header_indent, _)) = header
                        && indent <= header_indent
                    {
                        return Err(ParseError::ExpectedIndent { line: line.first });
                    }
                    block_indent = Some(indent);
                }
                Some(expected) if indent < expected => break,
                Some(expected) if indent > expected => {
                    return Err(ParseError::UnexpectedIndent { line: line.first });
                }
                Some(_) => {}
            }

            self.push_trivia(&mut body, next);
            let id = self.parse_statement()?;
            body.push(id);
        }

        if let (Some((_, header_line)), None) = (header, block_indent) {
            return Err(ParseError::ExpectedIndent {
                line: header_line + 1,
            });
        }
        Ok(body)
    }

    fn push_trivia(&mut self, body: &mut Vec<NodeId>, until: usize) {
        while self.pos < until {
            let line = self.lines[self.pos];
            let id = self.alloc(&line, NodeKind::Line(line.text.to_string()));
            body.push(id);
            self.pos += 1;
        }
    }

    fn parse_statement(&mut self) -> Result<NodeId, ParseError> {
        let line = self.lines[self.pos];
        let content = line.content();

        if content.starts_with('@') {
            return self.parse_decorated();
        }
        if is_def(content) {
            return self.parse_function_def(Vec::new());
        }
        if starts_with_keyword(content, "class") {
            return self.parse_class_def(Vec::new());
        }

        self.pos += 1;
        if starts_with_keyword(content, "from")
            && let Some(import) = parse_import_from(&line)
        {
            return Ok(self.alloc(&line, NodeKind::ImportFrom(import)));
        }
        if let Some(target) = assignment_target(content) {
            let kind = NodeKind::Assign {
                target: target.to_string(),
                text: line.text.to_string(),
            };
            return Ok(self.alloc(&line, kind));
        }
        if opens_block(content) {
            let body = self.parse_block(Some((line.indent().len(), line.last)))?;
            let kind = NodeKind::Compound {
                header: line.text.to_string(),
                body,
            };
            return Ok(self.alloc(&line, kind));
        }
        Ok(self.alloc(&line, NodeKind::Line(line.text.to_string())))
    }

    fn parse_decorated(&mut self) -> Result<NodeId, ParseError> {
        let first = self.lines[self.pos];
        let mut decorators = Vec::new();
        while let Some(line) = self.lines.get(self.pos).copied() {
            if !line.content().starts_with('@') || line.indent() != first.indent() {
                break;
            }
            self.pos += 1;
            let mut decorator = parse_decorator(&line);
            while let Some(trivia) = self.lines.get(self.pos).copied().filter(LogicalLine::is_trivia) {
                decorator.trivia.push_str(trivia.text);
                self.pos += 1;
            }
            let id = self.alloc(&line, NodeKind::Decorator(decorator));
            decorators.push(id);
        }

        let dangling = ParseError::DanglingDecorator { line: first.first };
        let Some(line) = self.lines.get(self.pos).copied() else {
            return Err(dangling);
        };
        if line.indent() != first.indent() {
            return Err(dangling);
        }
        if is_def(line.content()) {
            self.parse_function_def(decorators)
        } else if starts_with_keyword(line.content(), "class") {
            self.parse_class_def(decorators)
        } else {
            Err(dangling)
        }
    }

    fn parse_function_def(&mut self, decorators: Vec<NodeId>) -> Result<NodeId, ParseError> {
        let line = self.lines[self.pos];
        self.pos += 1;
        let mut function = parse_function(&line)?;
        function.decorators = decorators;
        if let Suite::Block { .. } = function.suite {
            let block = self.parse_block(Some((line.indent().len(), line.last)))?;
            if let Suite::Block { body, .. } = &mut function.suite {
                *body = block;
            }
        }
        Ok(self.alloc(&line, NodeKind::Function(function)))
    }

    fn parse_class_def(&mut self, decorators: Vec<NodeId>) -> Result<NodeId, ParseError> {
        let line = self.lines[self.pos];
        self.pos += 1;
        let mut class = parse_class_header(&line)?;
        class.decorators = decorators;
        if let Suite::Block { .. } = class.suite {
            let block = self.parse_block(Some((line.indent().len(), line.last)))?;
            if let Suite::Block { body, .. } = &mut class.suite {
                *body = block;
            }
        }
        Ok(self.alloc(&line, NodeKind::Class(class)))
    }
}
