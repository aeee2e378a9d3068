use std::fmt;

/// Stable index of a node in its module's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 1-based, inclusive range of physical source lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: u32,
    pub end: u32,
}

impl LineSpan {
    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    /// Lines of the original source this node's own header occupies. `None` for inserted nodes.
    pub span: Option<LineSpan>,
    pub kind: NodeKind,
    removed: bool,
}

impl Node {
    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Class(ClassDef),
    Function(FunctionDef),
    Decorator(Decorator),
    ImportFrom(ImportFrom),
    /// `NAME = ...` or `NAME: ...`; `text` is the raw logical line.
    Assign {
        target: String,
        text: String,
    },
    /// Any other statement that opens a block (`if`, `try`, ...).
    Compound {
        header: String,
        body: Vec<NodeId>,
    },
    /// Raw logical line: blank lines, comments and statements the tree does not model.
    Line(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub decorators: Vec<NodeId>,
    pub indent: String,
    /// Header text up to (not including) the colon, e.g. `class QLabel(QFrame)`.
    pub head: String,
    pub name: String,
    pub suite: Suite,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub decorators: Vec<NodeId>,
    pub indent: String,
    /// `def ` or `async def `, including the whitespace before the name.
    pub keyword: String,
    pub name: String,
    pub before_paren: String,
    pub params: ParamList,
    pub returns: Option<Returns>,
    pub before_colon: String,
    pub suite: Suite,
}

impl FunctionDef {
    /// Parameter count with bare `*` and `/` markers excluded.
    pub fn arity(&self) -> usize {
        self.params.items.iter().filter(|p| !p.is_marker()).count()
    }

    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.params.items.iter().filter(|p| !p.is_marker())
    }

    /// The `*args` parameter, if any.
    pub fn var_args(&self) -> Option<&Param> {
        self.params
            .items
            .iter()
            .find(|p| p.kind == ParamKind::VarArgs)
    }

    /// Looks a parameter up by its star-prefixed name (`a0`, `*args`, `**kwargs`).
    pub fn param_mut(&mut self, spec_name: &str) -> Option<&mut Param> {
        self.params
            .items
            .iter_mut()
            .find(|p| !p.is_marker() && p.spec_name() == spec_name)
    }

    pub fn set_return_annotation(&mut self, expr: &str) {
        match &mut self.returns {
            Some(returns) => returns.annotation = expr.to_string(),
            None => {
                self.returns = Some(Returns {
                    before_arrow: " ".to_string(),
                    after_arrow: " ".to_string(),
                    annotation: expr.to_string(),
                });
                self.before_colon.clear();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Returns {
    pub before_arrow: String,
    pub after_arrow: String,
    pub annotation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamList {
    pub items: Vec<Param>,
    /// Whitespace after the last item (and after a trailing comma).
    pub tail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Regular,
    VarArgs,
    KwArgs,
    /// Bare `*`.
    StarMarker,
    /// Bare `/`.
    SlashMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub leading: String,
    pub kind: ParamKind,
    pub name: String,
    pub annotation: Option<Annotation>,
    /// Raw text after the name/annotation, e.g. ` = ...`.
    pub default: String,
    pub trailing: String,
    pub comma: bool,
}

impl Param {
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, ParamKind::StarMarker | ParamKind::SlashMarker)
    }

    /// Name with its star prefix, the form rule tables use.
    pub fn spec_name(&self) -> String {
        match self.kind {
            ParamKind::VarArgs => format!("*{}", self.name),
            ParamKind::KwArgs => format!("**{}", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn annotation_expr(&self) -> Option<&str> {
        self.annotation.as_ref().map(|a| a.expr.as_str())
    }

    pub fn set_annotation(&mut self, expr: &str) {
        match &mut self.annotation {
            Some(annotation) => annotation.expr = expr.to_string(),
            None => {
                self.annotation = Some(Annotation {
                    before_colon: String::new(),
                    after_colon: " ".to_string(),
                    expr: expr.to_string(),
                });
                // `a=1` becomes `a: T = 1`
                if let Some(value) = self.default.trim_start().strip_prefix('=') {
                    self.default = format!(" = {}", value.trim_start());
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub before_colon: String,
    pub after_colon: String,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suite {
    /// `: ...` on the header line.
    Inline { code: String, trailing: Trailing },
    /// Indented body on the following lines.
    Block { trailing: Trailing, body: Vec<NodeId> },
}

impl Suite {
    /// Trailing whitespace/comment of the header line.
    pub fn trailing(&self) -> &Trailing {
        match self {
            Suite::Inline { trailing, .. } | Suite::Block { trailing, .. } => trailing,
        }
    }

    pub fn trailing_mut(&mut self) -> &mut Trailing {
        match self {
            Suite::Inline { trailing, .. } | Suite::Block { trailing, .. } => trailing,
        }
    }

    pub fn body(&self) -> &[NodeId] {
        match self {
            Suite::Inline { .. } => &[],
            Suite::Block { body, .. } => body,
        }
    }
}

/// End of a physical line: whitespace, optional comment and the newline itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailing {
    pub whitespace: String,
    pub comment: Option<String>,
    /// `\n`, `\r\n`, or empty at end of file.
    pub newline: String,
}

const IGNORE_PREFIX: &str = "# type: ignore";

impl Trailing {
    /// Error codes of a leading `# type: ignore[...]` comment. `Some(vec![])` for a bare ignore.
    pub fn ignore_codes(&self) -> Option<Vec<String>> {
        let rest = self.comment.as_deref()?.strip_prefix(IGNORE_PREFIX)?;
        match rest.strip_prefix('[') {
            Some(inner) => {
                let close = inner.find(']')?;
                Some(
                    inner[..close]
                        .split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect(),
                )
            }
            None => Some(Vec::new()),
        }
    }

    /// Suppresses `code` on this line. Returns `false` when the line already suppresses it.
    pub fn add_ignore(&mut self, code: &str) -> bool {
        match self.ignore_codes() {
            Some(codes) if codes.is_empty() => false,
            Some(codes) if codes.iter().any(|c| c == code) => false,
            Some(mut codes) => {
                let comment = self.comment.as_deref().unwrap_or_default();
                let after = comment
                    .find(']')
                    .map(|i| &comment[i + 1..])
                    .unwrap_or_default();
                codes.push(code.to_string());
                self.comment = Some(format!("{}[{}]{}", IGNORE_PREFIX, codes.join(", "), after));
                true
            }
            None => {
                let ignore = format!("{}[{}]", IGNORE_PREFIX, code);
                self.comment = Some(match self.comment.take() {
                    Some(existing) => format!("{}  {}", ignore, existing),
                    None => ignore,
                });
                if self.whitespace.is_empty() {
                    self.whitespace = "  ".to_string();
                }
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorator {
    pub indent: String,
    /// Expression after `@`.
    pub expr: String,
    pub trailing: Trailing,
    /// Comment and blank lines between this decorator and the next header line.
    pub trivia: String,
}

impl Decorator {
    /// `@typing.overload` or a bare `@overload`.
    pub fn is_overload(&self) -> bool {
        matches!(
            self.expr.trim(),
            "typing.overload" | "overload" | "typing_extensions.overload"
        )
    }

    pub fn is_staticmethod(&self) -> bool {
        self.expr.trim() == "staticmethod"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportFrom {
    pub indent: String,
    /// Dotted module after `from`.
    pub module: String,
    /// Text from `from` through `import`, plus `(` when parenthesized.
    pub head: String,
    pub names: Vec<ImportName>,
    pub trailing_comma: bool,
    /// Whitespace after the names, plus `)` when parenthesized.
    pub tail: String,
    pub trailing: Trailing,
}

impl ImportFrom {
    pub fn is_star(&self) -> bool {
        self.names.len() == 1 && self.names[0].text == "*"
    }

    /// Whether `name` is bound by this statement.
    pub fn binds(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.bound_name() == name)
    }

    /// Appends `name`, following the layout of the existing names.
    pub fn push_name(&mut self, name: &str) {
        let leading = match self.names.last() {
            Some(last) if last.leading.contains('\n') => last.leading.clone(),
            _ => " ".to_string(),
        };
        self.names.push(ImportName {
            leading,
            text: name.to_string(),
            trailing: String::new(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportName {
    pub leading: String,
    /// `Name` or `Name as Alias`.
    pub text: String,
    pub trailing: String,
}

impl ImportName {
    pub fn bound_name(&self) -> &str {
        match self.text.rsplit_once(" as ") {
            Some((_, alias)) => alias.trim(),
            None => self.text.trim(),
        }
    }
}

/// A statement located in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    pub id: NodeId,
    /// Block holding the statement; `None` for the module body.
    pub owner: Option<NodeId>,
    pub class: Option<NodeId>,
}

/// A parsed stub file: node arena plus the top-level statement list.
#[derive(Debug, Clone)]
pub struct StubModule {
    pub(crate) nodes: Vec<Node>,
    pub(crate) body: Vec<NodeId>,
    pub(crate) newline: String,
}

impl StubModule {
    pub(crate) fn empty(newline: &str) -> Self {
        Self {
            nodes: Vec::new(),
            body: Vec::new(),
            newline: newline.to_string(),
        }
    }

    pub(crate) fn alloc(&mut self, span: Option<LineSpan>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            span,
            kind,
            removed: false,
        });
        id
    }

    /// Top-level statements.
    pub fn body(&self) -> &[NodeId] {
        &self.body
    }

    /// Newline style of the source (`\n` or `\r\n`).
    pub fn newline(&self) -> &str {
        &self.newline
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Option<LineSpan> {
        self.node(id).span
    }

    pub fn is_removed(&self, id: NodeId) -> bool {
        self.node(id).removed
    }

    /// Detaches a node; it no longer renders but its id stays valid.
    pub fn remove(&mut self, id: NodeId) {
        self.nodes[id.index()].removed = true;
    }

    pub fn class(&self, id: NodeId) -> Option<&ClassDef> {
        match &self.node(id).kind {
            NodeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn class_mut(&mut self, id: NodeId) -> Option<&mut ClassDef> {
        match self.kind_mut(id) {
            NodeKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn function(&self, id: NodeId) -> Option<&FunctionDef> {
        match &self.node(id).kind {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn function_mut(&mut self, id: NodeId) -> Option<&mut FunctionDef> {
        match self.kind_mut(id) {
            NodeKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn decorator(&self, id: NodeId) -> Option<&Decorator> {
        match &self.node(id).kind {
            NodeKind::Decorator(decorator) => Some(decorator),
            _ => None,
        }
    }

    pub fn decorator_mut(&mut self, id: NodeId) -> Option<&mut Decorator> {
        match self.kind_mut(id) {
            NodeKind::Decorator(decorator) => Some(decorator),
            _ => None,
        }
    }

    pub fn import_from_mut(&mut self, id: NodeId) -> Option<&mut ImportFrom> {
        match self.kind_mut(id) {
            NodeKind::ImportFrom(import) => Some(import),
            _ => None,
        }
    }

    /// Statements of the block owned by `owner`, or the module body for `None`.
    pub fn block(&self, owner: Option<NodeId>) -> &[NodeId] {
        let Some(owner) = owner else {
            return &self.body;
        };
        match &self.node(owner).kind {
            NodeKind::Class(class) => class.suite.body(),
            NodeKind::Function(function) => function.suite.body(),
            NodeKind::Compound { body, .. } => body,
            _ => &[],
        }
    }

    fn block_mut(&mut self, owner: Option<NodeId>) -> Option<&mut Vec<NodeId>> {
        let Some(owner) = owner else {
            return Some(&mut self.body);
        };
        match self.kind_mut(owner) {
            NodeKind::Class(ClassDef {
                suite: Suite::Block { body, .. },
                ..
            })
            | NodeKind::Function(FunctionDef {
                suite: Suite::Block { body, .. },
                ..
            })
            | NodeKind::Compound { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Live statements in source order, each with the block that holds it and its nearest
    /// enclosing class.
    pub fn statements(&self) -> Vec<Statement> {
        let mut out = Vec::new();
        self.collect_statements(None, None, &mut out);
        out
    }

    fn collect_statements(
        &self,
        owner: Option<NodeId>,
        class: Option<NodeId>,
        out: &mut Vec<Statement>,
    ) {
        for &id in self.block(owner) {
            if self.is_removed(id) {
                continue;
            }
            out.push(Statement { id, owner, class });
            let inner_class = match self.node(id).kind {
                NodeKind::Class(_) => Some(id),
                _ => class,
            };
            self.collect_statements(Some(id), inner_class, out);
        }
    }

    /// Inserts `new` right after `anchor` in `owner`'s block. Returns `false` if `anchor` is not
    /// a statement of that block.
    pub fn insert_after(&mut self, owner: Option<NodeId>, anchor: NodeId, new: &[NodeId]) -> bool {
        let Some(block) = self.block_mut(owner) else {
            return false;
        };
        let Some(pos) = block.iter().position(|id| *id == anchor) else {
            return false;
        };
        block.splice(pos + 1..pos + 1, new.iter().copied());
        true
    }

    /// Replaces the statement `target` in `owner`'s block with `new`.
    pub fn replace(&mut self, owner: Option<NodeId>, target: NodeId, new: &[NodeId]) -> bool {
        if !self.insert_after(owner, target, new) {
            return false;
        }
        self.remove(target);
        true
    }
}
