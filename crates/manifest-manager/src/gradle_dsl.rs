//! Gradle Kotlin DSL reader
//!
//! Parses a `build.gradle.kts` script with the tree-sitter Kotlin grammar
//! and lowers the syntax tree into a small statement tree: nested blocks,
//! assignments, calls with positional or named arguments, member access,
//! infix calls such as `id("x") version "1.0" apply false`, and string
//! templates.

use tracing::trace;
use tree_sitter::{Node, Parser};

use crate::parser::ParseError;

/// Expression in a build script
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    Str(String),
    Number(String),
    Bool(bool),
    /// String with `$name` / `${expr}` interpolations
    Template(Vec<TemplatePart>),
    /// `receiver.name`
    Member(Box<Expr>, String),
    /// `receiver[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `callee(args) { block }`
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        block: Option<Vec<Stmt>>,
    },
    /// `lhs name rhs`
    Infix {
        lhs: Box<Expr>,
        name: String,
        rhs: Box<Expr>,
    },
    /// Any other expression; `kind` is the grammar's node kind
    Opaque { kind: String, text: String },
}

/// Piece of a string template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    /// Interpolated expression and its source text
    Expr { expr: Expr, source: String },
}

impl Expr {
    /// Name of a plain or member-call callee (`android`, `getByName`)
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Ident(name) => Some(name),
                Expr::Member(_, name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// Dotted path of an identifier or member chain (`JavaVersion.VERSION_1_8`)
    pub fn path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Member(receiver, name) => receiver.path().map(|p| format!("{}.{}", p, name)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Expr::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// First positional string argument of a call
    pub fn first_str_arg(&self) -> Option<&str> {
        match self {
            Expr::Call { args, .. } => args.first().and_then(|a| a.value.as_str()),
            _ => None,
        }
    }
}

/// Call argument, optionally named (`plugin = "x"`)
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
}

/// Statement with the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assign { target: Expr, value: Expr },
    Expr(Expr),
    /// Declarations and imports carry no build settings
    Ignored,
}

/// Parse a whole script
pub fn parse_script(source: &str) -> Result<Vec<Stmt>, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_kotlin::language())
        .map_err(|e| ParseError::Grammar(e.to_string()))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ParseError::Grammar("parser returned no tree".into()))?;

    let root = tree.root_node();
    if let Some(bad) = first_error(root) {
        return Err(syntax_error(bad, source));
    }

    let stmts = Lowering { src: source }.statements(root);
    trace!("Lowered {} top-level statements", stmts.len());
    Ok(stmts)
}

fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn is_comment(node: &Node<'_>) -> bool {
    node.kind().ends_with("comment")
}

/// Named children, comments and annotations skipped
fn significant(node: Node<'_>) -> Vec<Node<'_>> {
    children(node)
        .into_iter()
        .filter(|n| n.is_named() && !is_comment(n) && n.kind() != "annotation")
        .collect()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    children(node).into_iter().find_map(first_error)
}

fn syntax_error(node: Node<'_>, source: &str) -> ParseError {
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        let text = node.utf8_text(source.as_bytes()).unwrap_or_default();
        let snippet: String = text.trim().chars().take(24).collect();
        format!("unexpected `{}`", snippet)
    };
    ParseError::Syntax {
        line: line_of(node),
        message,
    }
}

struct Lowering<'s> {
    src: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.src.as_bytes()).unwrap_or_default()
    }

    fn opaque(&self, node: Node<'_>) -> Expr {
        Expr::Opaque {
            kind: node.kind().to_string(),
            text: self.text(node).to_string(),
        }
    }

    fn statements(&self, container: Node<'_>) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        for node in significant(container) {
            match node.kind() {
                "statements" => stmts.extend(self.statements(node)),
                "lambda_parameters" => {}
                _ => stmts.push(self.statement(node)),
            }
        }
        stmts
    }

    fn statement(&self, node: Node<'_>) -> Stmt {
        let kind = match node.kind() {
            "assignment" => {
                let parts = significant(node);
                match (parts.first(), parts.last()) {
                    (Some(target), Some(value)) if parts.len() >= 2 => StmtKind::Assign {
                        target: self.expr(*target),
                        value: self.expr(*value),
                    },
                    _ => StmtKind::Ignored,
                }
            }
            "import_list" | "import_header" | "package_header" | "file_annotation"
            | "shebang_line" | "property_declaration" | "function_declaration"
            | "class_declaration" | "object_declaration" | "type_alias" => StmtKind::Ignored,
            _ => StmtKind::Expr(self.expr(node)),
        };
        Stmt {
            line: line_of(node),
            kind,
        }
    }

    fn expr(&self, node: Node<'_>) -> Expr {
        match node.kind() {
            "simple_identifier" | "identifier" | "type_identifier" => {
                Expr::Ident(self.text(node).to_string())
            }
            "integer_literal" | "long_literal" => Expr::Number(
                self.text(node)
                    .trim_end_matches(['L', 'l', 'u', 'U'])
                    .replace('_', ""),
            ),
            "hex_literal" | "bin_literal" | "real_literal" => {
                Expr::Number(self.text(node).to_string())
            }
            "boolean_literal" => Expr::Bool(self.text(node) == "true"),
            "string_literal" | "multi_line_string_literal" | "line_string_literal" => {
                self.string(node)
            }
            "parenthesized_expression" => match significant(node).first() {
                Some(inner) => self.expr(*inner),
                None => self.opaque(node),
            },
            "navigation_expression" | "indexing_expression" | "directly_assignable_expression" => {
                self.postfix(node)
            }
            "call_expression" => self.call(node),
            "infix_expression" => match significant(node).as_slice() {
                [lhs, name, rhs] => Expr::Infix {
                    lhs: Box::new(self.expr(*lhs)),
                    name: self.text(*name).to_string(),
                    rhs: Box::new(self.expr(*rhs)),
                },
                _ => self.opaque(node),
            },
            _ => self.opaque(node),
        }
    }

    /// An expression followed by `.name` / `[index]` suffixes
    fn postfix(&self, node: Node<'_>) -> Expr {
        let parts = significant(node);
        let Some((head, suffixes)) = parts.split_first() else {
            return self.opaque(node);
        };
        let mut expr = self.expr(*head);
        for suffix in suffixes {
            expr = match suffix.kind() {
                "navigation_suffix" => {
                    let member = significant(*suffix)
                        .into_iter()
                        .find(|n| n.kind() == "simple_identifier");
                    match member {
                        Some(member) => Expr::Member(Box::new(expr), self.text(member).to_string()),
                        None => return self.opaque(node),
                    }
                }
                "indexing_suffix" => match significant(*suffix).first() {
                    Some(index) => Expr::Index(Box::new(expr), Box::new(self.expr(*index))),
                    None => return self.opaque(node),
                },
                _ => return self.opaque(node),
            };
        }
        expr
    }

    fn call(&self, node: Node<'_>) -> Expr {
        let parts = significant(node);
        let (Some(callee), Some(suffix)) = (
            parts.iter().find(|n| n.kind() != "call_suffix"),
            parts.iter().find(|n| n.kind() == "call_suffix"),
        ) else {
            return self.opaque(node);
        };

        let mut args = Vec::new();
        let mut block = None;
        for part in significant(*suffix) {
            match part.kind() {
                "value_arguments" => {
                    args = significant(part)
                        .into_iter()
                        .filter(|n| n.kind() == "value_argument")
                        .map(|n| self.argument(n))
                        .collect();
                }
                "annotated_lambda" => {
                    block = significant(part)
                        .into_iter()
                        .find(|n| n.kind() == "lambda_literal")
                        .map(|lambda| self.statements(lambda));
                }
                _ => {}
            }
        }

        Expr::Call {
            callee: Box::new(self.expr(*callee)),
            args,
            block,
        }
    }

    fn argument(&self, node: Node<'_>) -> Arg {
        let named = children(node).iter().any(|c| !c.is_named() && c.kind() == "=");
        let parts = significant(node);
        let value = match parts.last() {
            Some(value) => self.expr(*value),
            None => self.opaque(node),
        };
        let name = match (named, parts.first()) {
            (true, Some(name)) => Some(self.text(*name).to_string()),
            _ => None,
        };
        Arg { name, value }
    }

    /// Plain, escaped or raw (`"""`) string, with interpolations kept apart
    fn string(&self, node: Node<'_>) -> Expr {
        let raw = self.text(node).starts_with("\"\"\"");
        let delimiter = if raw { 3 } else { 1 };
        let start = node.start_byte() + delimiter;
        let end = node.end_byte().saturating_sub(delimiter).max(start);

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut pos = start;
        for child in children(node) {
            if child.end_byte() <= start || child.start_byte() >= end {
                continue;
            }
            if child.start_byte() > pos {
                push_literal(&mut literal, self.src.get(pos..child.start_byte()).unwrap_or_default(), raw);
            }
            match child.kind() {
                "interpolated_expression" | "interpolated_identifier" => {
                    if !literal.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(TemplatePart::Expr {
                        expr: self.interpolation(child),
                        source: self.text(child).to_string(),
                    });
                }
                // `${`, `}` and `$` around interpolations
                _ if !child.is_named() => {}
                _ => push_literal(&mut literal, self.text(child), raw),
            }
            pos = pos.max(child.end_byte());
        }
        if end > pos {
            push_literal(&mut literal, self.src.get(pos..end).unwrap_or_default(), raw);
        }

        if parts.is_empty() {
            Expr::Str(literal)
        } else {
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(literal));
            }
            Expr::Template(parts)
        }
    }

    /// Body of `$name` or `${expr}`. Depending on the grammar release the
    /// node either wraps the expression with its `${ }` tokens or is the
    /// expression itself under an alias; the latter is re-read from text.
    fn interpolation(&self, node: Node<'_>) -> Expr {
        let inner = significant(node);
        let wrapped = children(node)
            .iter()
            .any(|c| !c.is_named() && c.kind().starts_with('$'));
        if let (true, [only]) = (wrapped, inner.as_slice()) {
            return self.expr(*only);
        }
        let text = self
            .text(node)
            .trim()
            .trim_start_matches('$')
            .trim_start_matches('{')
            .trim_end_matches('}')
            .trim();
        if inner.is_empty() {
            return Expr::Ident(text.to_string());
        }
        expression_from(text).unwrap_or_else(|| self.opaque(node))
    }
}

fn expression_from(text: &str) -> Option<Expr> {
    let stmts = parse_script(text).ok()?;
    match stmts.into_iter().next()?.kind {
        StmtKind::Expr(expr) => Some(expr),
        _ => None,
    }
}

fn push_literal(out: &mut String, text: &str, raw: bool) {
    if raw {
        out.push_str(text);
    } else {
        out.push_str(&unescape(text));
    }
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_assignment(source: &str) -> Expr {
        let stmts = parse_script(source).unwrap();
        match stmts.into_iter().next().map(|s| s.kind) {
            Some(StmtKind::Assign { value, .. }) => value,
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks_and_assignments() {
        let stmts = parse_script(
            r#"
android {
    compileSdk = 35 // trailing comment
    defaultConfig {
        applicationId = "com.example.neoflex"
    }
}
"#,
        )
        .unwrap();

        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].line, 2);
        let StmtKind::Expr(ref android) = stmts[0].kind else {
            panic!("expected block call");
        };
        assert_eq!(android.call_name(), Some("android"));
        let Expr::Call { block: Some(ref body), .. } = android else {
            panic!("expected block");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(
            body[0].kind,
            StmtKind::Assign { value: Expr::Number(ref n), .. } if n == "35"
        ));
    }

    #[test]
    fn test_member_calls_and_paths() {
        let stmts = parse_script(
            "signingConfig = signingConfigs.getByName(\"debug\")\nsourceCompatibility = JavaVersion.VERSION_1_8",
        )
        .unwrap();

        let StmtKind::Assign { ref value, .. } = stmts[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.call_name(), Some("getByName"));
        assert_eq!(value.first_str_arg(), Some("debug"));

        let StmtKind::Assign { ref value, .. } = stmts[1].kind else {
            panic!("expected assignment");
        };
        assert_eq!(value.path().as_deref(), Some("JavaVersion.VERSION_1_8"));
    }

    #[test]
    fn test_infix_plugin_declarations() {
        let stmts = parse_script(
            "plugins {\n    id(\"com.android.application\") version \"8.2.0\" apply false\n    id(\"kotlin-android\")\n}",
        )
        .unwrap();
        let StmtKind::Expr(Expr::Call { block: Some(ref body), .. }) = stmts[0].kind else {
            panic!("expected plugins block");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0].kind, StmtKind::Expr(Expr::Infix { ref name, .. }) if name == "apply"));
        assert!(matches!(body[1].kind, StmtKind::Expr(Expr::Call { .. })));
    }

    #[test]
    fn test_named_arguments() {
        let stmts = parse_script("apply(plugin = \"com.google.gms.google-services\")").unwrap();
        let StmtKind::Expr(Expr::Call { ref args, .. }) = stmts[0].kind else {
            panic!("expected call");
        };
        assert_eq!(args[0].name.as_deref(), Some("plugin"));
        assert_eq!(args[0].value.as_str(), Some("com.google.gms.google-services"));
    }

    #[test]
    fn test_locals_and_imports_are_ignored() {
        let stmts = parse_script(
            "import java.util.Properties\n\nval keystoreProperties = Properties()\n\nflutter {\n    source = \"../..\"\n}\n",
        )
        .unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].kind, StmtKind::Ignored);
        assert_eq!(stmts[1].kind, StmtKind::Ignored);
        assert!(matches!(stmts[2].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn test_templates_keep_interpolations_apart() {
        let value = single_assignment("versionName = \"v${flutter.versionName}-$suffix\"");
        let Expr::Template(parts) = value else {
            panic!("expected template, got {:?}", value);
        };
        assert_eq!(parts[0], TemplatePart::Literal("v".into()));
        assert!(matches!(
            parts[1],
            TemplatePart::Expr { ref expr, .. } if expr.path().as_deref() == Some("flutter.versionName")
        ));
        assert_eq!(parts[2], TemplatePart::Literal("-".into()));
        assert!(matches!(
            parts[3],
            TemplatePart::Expr { ref expr, .. } if expr.path().as_deref() == Some("suffix")
        ));
    }

    #[test]
    fn test_call_inside_template_is_parsed() {
        let value = single_assignment("versionName = \"${project.property(\"vn\")}\"");
        let Expr::Template(parts) = value else {
            panic!("expected template, got {:?}", value);
        };
        assert_eq!(parts.len(), 1);
        assert!(matches!(
            parts[0],
            TemplatePart::Expr { expr: Expr::Call { .. }, ref source } if source.contains("project.property")
        ));
    }

    #[test]
    fn test_raw_and_escaped_strings() {
        assert_eq!(
            single_assignment("versionName = \"\"\"1.0\"\"\""),
            Expr::Str("1.0".into())
        );
        assert_eq!(
            single_assignment("suffix = \"a\\tb\\\"c\\u0041\""),
            Expr::Str("a\tb\"cA".into())
        );
    }

    #[test]
    fn test_keystore_loading_boilerplate_parses() {
        let stmts = parse_script(
            r#"
val keystorePropertiesFile = rootProject.file("key.properties")
if (keystorePropertiesFile.exists()) {
    keystorePropertiesFile.reader().use { reader -> keystoreProperties.load(reader) }
}
android {
    kotlinOptions {
        jvmTarget = JavaVersion.VERSION_11.toString()
    }
    defaultConfig {
        minSdk = flutter.minSdkVersion
        versionCode = (project.findProperty("code") ?: "1").toString().toInt()
    }
}
"#,
        )
        .unwrap();
        assert_eq!(stmts.len(), 3);
        assert_eq!(stmts[0].kind, StmtKind::Ignored);
        assert_eq!(stmts[2].line, 6);
        let StmtKind::Expr(ref android) = stmts[2].kind else {
            panic!("expected android block");
        };
        assert_eq!(android.call_name(), Some("android"));
    }

    #[test]
    fn test_unbalanced_braces_report_syntax_error() {
        let err = parse_script("android {\n  compileSdk = 35\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));

        let err = parse_script("x = \"open\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"\$version"), "$version");
        assert_eq!(unescape(r"tab\tend"), "tab\tend");
        assert_eq!(unescape(r"\uZZZZ"), "\\uZZZZ");
    }
}
