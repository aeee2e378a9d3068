use crate::tree::{
    ClassDef, Decorator, FunctionDef, ImportFrom, NodeId, NodeKind, Param, ParamKind, StubModule,
    Suite, Trailing,
};

impl StubModule {
    /// Renders the module back to source text. Removed nodes are skipped.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for &id in &self.body {
            self.write_node(id, &mut out);
        }
        out
    }

    /// Renders one statement and everything it owns.
    pub fn render_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        if node.is_removed() {
            return;
        }
        match &node.kind {
            NodeKind::Line(text) | NodeKind::Assign { text, .. } => out.push_str(text),
            NodeKind::Compound { header, body } => {
                out.push_str(header);
                self.write_block(body, out);
            }
            NodeKind::Decorator(decorator) => write_decorator(decorator, out),
            NodeKind::ImportFrom(import) => write_import(import, out),
            NodeKind::Class(class) => self.write_class(class, out),
            NodeKind::Function(function) => self.write_function(function, out),
        }
    }

    fn write_block(&self, body: &[NodeId], out: &mut String) {
        for &id in body {
            self.write_node(id, out);
        }
    }

    fn write_class(&self, class: &ClassDef, out: &mut String) {
        self.write_block(&class.decorators, out);
        out.push_str(&class.indent);
        out.push_str(&class.head);
        out.push(':');
        self.write_suite(&class.suite, out);
    }

    fn write_function(&self, function: &FunctionDef, out: &mut String) {
        self.write_block(&function.decorators, out);
        out.push_str(&function.indent);
        out.push_str(&function.keyword);
        out.push_str(&function.name);
        out.push_str(&function.before_paren);
        out.push('(');
        for param in &function.params.items {
            write_param(param, out);
        }
        out.push_str(&function.params.tail);
        out.push(')');
        if let Some(returns) = &function.returns {
            out.push_str(&returns.before_arrow);
            out.push_str("->");
            out.push_str(&returns.after_arrow);
            out.push_str(&returns.annotation);
        }
        out.push_str(&function.before_colon);
        out.push(':');
        self.write_suite(&function.suite, out);
    }

    fn write_suite(&self, suite: &Suite, out: &mut String) {
        match suite {
            Suite::Inline { code, trailing } => {
                out.push_str(code);
                write_trailing(trailing, out);
            }
            Suite::Block { trailing, body } => {
                write_trailing(trailing, out);
                self.write_block(body, out);
            }
        }
    }
}

fn write_trailing(trailing: &Trailing, out: &mut String) {
    out.push_str(&trailing.whitespace);
    if let Some(comment) = &trailing.comment {
        out.push_str(comment);
    }
    out.push_str(&trailing.newline);
}

fn write_decorator(decorator: &Decorator, out: &mut String) {
    out.push_str(&decorator.indent);
    out.push('@');
    out.push_str(&decorator.expr);
    write_trailing(&decorator.trailing, out);
    out.push_str(&decorator.trivia);
}

fn write_param(param: &Param, out: &mut String) {
    out.push_str(&param.leading);
    match param.kind {
        ParamKind::StarMarker => out.push('*'),
        ParamKind::SlashMarker => out.push('/'),
        ParamKind::VarArgs => out.push('*'),
        ParamKind::KwArgs => out.push_str("**"),
        ParamKind::Regular => {}
    }
    out.push_str(&param.name);
    if let Some(annotation) = &param.annotation {
        out.push_str(&annotation.before_colon);
        out.push(':');
        out.push_str(&annotation.after_colon);
        out.push_str(&annotation.expr);
    }
    out.push_str(&param.default);
    out.push_str(&param.trailing);
    if param.comma {
        out.push(',');
    }
}

fn write_import(import: &ImportFrom, out: &mut String) {
    out.push_str(&import.indent);
    out.push_str(&import.head);
    for (i, name) in import.names.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&name.leading);
        out.push_str(&name.text);
        out.push_str(&name.trailing);
    }
    if import.trailing_comma {
        out.push(',');
    }
    out.push_str(&import.tail);
    write_trailing(&import.trailing, out);
}
