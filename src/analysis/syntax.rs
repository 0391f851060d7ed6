//! Go syntax layer using tree-sitter.
//!
//! Parses a file, rejects trees containing ERROR or MISSING nodes, and lowers
//! the package clause, imports and package-level declarations into the owned
//! [`SourceFile`] model.

use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use crate::error::SyntaxError;

use super::ast::{
    ChanDir, ConstExpr, ConstKind, ConstValue, Decl, FieldExpr, FuncExpr, ImportSpec,
    InterfaceElem, ParamExpr, SourceFile, TypeExpr, TypeParamDecl, TypeSpec, ValueKind,
};
use super::{ParsedFile, Span};

/// Tree-sitter query for package declaration.
const PACKAGE_QUERY: &str = r#"
(package_clause
  (package_identifier) @package_name
)
"#;

/// Tree-sitter query for extracting imports, grouped or not.
const IMPORT_QUERY: &str = r#"
(import_spec
  name: (_)? @alias
  path: (_) @path
) @import
"#;

/// Go parser and lowering pass.
pub struct GoSyntax {
    language: Language,
}

impl GoSyntax {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Create a new parser for this call.
    fn create_parser(&self, path: &str) -> Result<Parser, SyntaxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| internal_error(path, e.to_string()))?;
        Ok(parser)
    }

    /// Parse source code into a tree without lowering it.
    pub fn parse(&self, path: &Path, source: &[u8]) -> Result<ParsedFile, SyntaxError> {
        let display = path.to_string_lossy().to_string();
        let mut parser = self.create_parser(&display)?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| internal_error(&display, "failed to parse Go source"))?;

        Ok(ParsedFile {
            tree,
            source: source.to_vec(),
            path: display,
        })
    }

    /// Parse and lower one file, failing on any syntax error.
    pub fn parse_file(&self, path: &Path, source: &[u8]) -> Result<SourceFile, SyntaxError> {
        let parsed = self.parse(path, source)?;
        if let Some(err) = parsed.first_error() {
            return Err(err);
        }
        self.lower(&parsed)
    }

    /// Lower a clean parse tree into the owned AST.
    pub fn lower(&self, parsed: &ParsedFile) -> Result<SourceFile, SyntaxError> {
        let package = self
            .extract_package(parsed)?
            .ok_or_else(|| internal_error(&parsed.path, "expected 'package' clause"))?;
        let imports = self.extract_imports(parsed)?;
        let decls = Lowerer { parsed }.decls(parsed.tree.root_node())?;

        Ok(SourceFile {
            path: parsed.path.clone(),
            package,
            imports,
            decls,
        })
    }

    /// Extract the package name from a parsed file.
    fn extract_package(&self, parsed: &ParsedFile) -> Result<Option<String>, SyntaxError> {
        let query = Query::new(&self.language, PACKAGE_QUERY)
            .map_err(|e| internal_error(&parsed.path, e.to_string()))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return Ok(Some(parsed.node_text(capture.node).to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Extract imports from a parsed file, in source order.
    fn extract_imports(&self, parsed: &ParsedFile) -> Result<Vec<ImportSpec>, SyntaxError> {
        let query = Query::new(&self.language, IMPORT_QUERY)
            .map_err(|e| internal_error(&parsed.path, e.to_string()))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();

        while let Some(m) = matches.next() {
            let mut path = None;
            let mut name = None;
            let mut span = None;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "path" => {
                        let raw = parsed.node_text(capture.node);
                        path = Some(raw.trim_matches(|c| c == '"' || c == '`').to_string());
                    }
                    "alias" => {
                        name = Some(parsed.node_text(capture.node).to_string());
                    }
                    "import" => {
                        span = Some(Span::from_node(capture.node));
                    }
                    _ => {}
                }
            }

            if let (Some(path), Some(span)) = (path, span) {
                imports.push(ImportSpec { name, path, span });
            }
        }

        imports.sort_by_key(|i| i.span.start_byte);
        Ok(imports)
    }
}

impl Default for GoSyntax {
    fn default() -> Self {
        Self::new()
    }
}

fn internal_error(path: &str, message: impl Into<String>) -> SyntaxError {
    SyntaxError {
        file: path.to_string(),
        line: 1,
        column: 1,
        message: message.into(),
    }
}

/// Named children of a node, comments excluded.
fn named_children(node: Node) -> Vec<Node> {
    node.named_children(&mut node.walk())
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Walks tree-sitter nodes and builds AST values.
struct Lowerer<'a> {
    parsed: &'a ParsedFile,
}

impl<'a> Lowerer<'a> {
    fn text(&self, node: Node) -> String {
        self.parsed.node_text(node).to_string()
    }

    fn field<'t>(&self, node: Node<'t>, field: &str) -> Result<Node<'t>, SyntaxError> {
        node.child_by_field_name(field).ok_or_else(|| {
            self.parsed
                .error_at(node, format!("{} without {}", node.kind(), field))
        })
    }

    fn decls(&self, root: Node) -> Result<Vec<Decl>, SyntaxError> {
        let mut decls = Vec::new();

        for node in named_children(root) {
            match node.kind() {
                "type_declaration" => {
                    for spec in named_children(node) {
                        match spec.kind() {
                            "type_spec" => decls.push(Decl::Type(self.type_spec(spec, false)?)),
                            "type_alias" => decls.push(Decl::Type(self.type_spec(spec, true)?)),
                            _ => {}
                        }
                    }
                }
                "function_declaration" => {
                    let name = self.field(node, "name")?;
                    decls.push(Decl::Value {
                        name: self.text(name),
                        kind: ValueKind::Func,
                        span: Span::from_node(name),
                        value: None,
                    });
                }
                "var_declaration" => self.var_specs(node, &mut decls),
                "const_declaration" => self.const_specs(node, &mut decls),
                _ => {}
            }
        }

        Ok(decls)
    }

    fn var_specs(&self, node: Node, decls: &mut Vec<Decl>) {
        for child in named_children(node) {
            if child.kind() == "var_spec" {
                let names: Vec<_> = child
                    .children_by_field_name("name", &mut child.walk())
                    .collect();
                for name in names {
                    decls.push(Decl::Value {
                        name: self.text(name),
                        kind: ValueKind::Var,
                        span: Span::from_node(name),
                        value: None,
                    });
                }
            } else if child.kind() == "var_spec_list" {
                self.var_specs(child, decls);
            }
        }
    }

    /// Constants of one declaration. A spec without values repeats the
    /// previous spec's expressions with its own `iota`.
    fn const_specs(&self, node: Node, decls: &mut Vec<Decl>) {
        let mut values: Vec<ConstExpr> = Vec::new();
        let specs = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "const_spec");

        for (iota, spec) in specs.enumerate() {
            if let Some(list) = spec.child_by_field_name("value") {
                values = named_children(list)
                    .into_iter()
                    .map(|expr| self.const_expr(expr))
                    .collect();
            }
            let names: Vec<_> = spec
                .children_by_field_name("name", &mut spec.walk())
                .collect();
            for (i, name) in names.into_iter().enumerate() {
                decls.push(Decl::Value {
                    name: self.text(name),
                    kind: ValueKind::Const,
                    span: Span::from_node(name),
                    value: values.get(i).map(|expr| ConstValue {
                        expr: expr.clone(),
                        iota: iota as i128,
                    }),
                });
            }
        }
    }

    /// Lower an expression in constant position. Forms that cannot denote
    /// an integer constant become [`ConstKind::Other`].
    fn const_expr(&self, node: Node) -> ConstExpr {
        let kind = match node.kind() {
            "int_literal" => parse_int(self.parsed.node_text(node))
                .map(ConstKind::Int)
                .unwrap_or(ConstKind::Other),
            "iota" => ConstKind::Iota,
            "identifier" => ConstKind::Name(self.text(node)),
            "selector_expression" => {
                match (
                    node.child_by_field_name("operand"),
                    node.child_by_field_name("field"),
                ) {
                    (Some(operand), Some(field)) if operand.kind() == "identifier" => {
                        ConstKind::Qualified {
                            package: self.text(operand),
                            name: self.text(field),
                        }
                    }
                    _ => ConstKind::Other,
                }
            }
            "parenthesized_expression" => match named_children(node).into_iter().next() {
                Some(inner) => return self.const_expr(inner),
                None => ConstKind::Other,
            },
            "unary_expression" => match (
                node.child_by_field_name("operator"),
                node.child_by_field_name("operand"),
            ) {
                (Some(op), Some(operand)) => ConstKind::Unary {
                    op: self.text(op),
                    operand: Box::new(self.const_expr(operand)),
                },
                _ => ConstKind::Other,
            },
            "binary_expression" => match (
                node.child_by_field_name("left"),
                node.child_by_field_name("operator"),
                node.child_by_field_name("right"),
            ) {
                (Some(lhs), Some(op), Some(rhs)) => ConstKind::Binary {
                    op: self.text(op),
                    lhs: Box::new(self.const_expr(lhs)),
                    rhs: Box::new(self.const_expr(rhs)),
                },
                _ => ConstKind::Other,
            },
            _ => ConstKind::Other,
        };
        ConstExpr {
            text: self.text(node),
            span: Span::from_node(node),
            kind,
        }
    }

    fn type_spec(&self, node: Node, alias: bool) -> Result<TypeSpec, SyntaxError> {
        let name = self.field(node, "name")?;
        let mut type_params = Vec::new();
        if let Some(list) = node.child_by_field_name("type_parameters") {
            for decl in named_children(list) {
                if decl.kind() != "type_parameter_declaration" {
                    continue;
                }
                let constraint = self.lower_type(self.field(decl, "type")?)?;
                let names: Vec<_> = decl
                    .children_by_field_name("name", &mut decl.walk())
                    .collect();
                for param in names {
                    type_params.push(TypeParamDecl {
                        name: self.text(param),
                        constraint: constraint.clone(),
                    });
                }
            }
        }

        Ok(TypeSpec {
            name: self.text(name),
            type_params,
            alias,
            ty: self.lower_type(self.field(node, "type")?)?,
            span: Span::from_node(name),
        })
    }

    /// The single type operand of a wrapper node such as `*T` or `(T)`.
    fn operand(&self, node: Node) -> Result<TypeExpr, SyntaxError> {
        let inner = named_children(node)
            .into_iter()
            .next()
            .ok_or_else(|| self.parsed.error_at(node, format!("empty {}", node.kind())))?;
        self.lower_type(inner)
    }

    fn lower_type(&self, node: Node) -> Result<TypeExpr, SyntaxError> {
        let ty = match node.kind() {
            "type_identifier" | "identifier" => TypeExpr::Name {
                name: self.text(node),
                span: Span::from_node(node),
            },
            "qualified_type" => TypeExpr::Qualified {
                package: self.text(self.field(node, "package")?),
                name: self.text(self.field(node, "name")?),
                span: Span::from_node(node),
            },
            "generic_type" => {
                let base = self.lower_type(self.field(node, "type")?)?;
                let args = named_children(self.field(node, "type_arguments")?)
                    .into_iter()
                    .map(|arg| self.lower_type(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                TypeExpr::Generic {
                    base: Box::new(base),
                    args,
                }
            }
            "pointer_type" => TypeExpr::Pointer(Box::new(self.operand(node)?)),
            "parenthesized_type" => self.operand(node)?,
            "negated_type" => TypeExpr::Tilde(Box::new(self.operand(node)?)),
            "slice_type" => {
                TypeExpr::Slice(Box::new(self.lower_type(self.field(node, "element")?)?))
            }
            "array_type" => TypeExpr::Array {
                len: self.const_expr(self.field(node, "length")?),
                elem: Box::new(self.lower_type(self.field(node, "element")?)?),
            },
            "map_type" => TypeExpr::Map {
                key: Box::new(self.lower_type(self.field(node, "key")?)?),
                value: Box::new(self.lower_type(self.field(node, "value")?)?),
            },
            "channel_type" => TypeExpr::Chan {
                dir: chan_dir(node),
                elem: Box::new(self.lower_type(self.field(node, "value")?)?),
            },
            "function_type" => TypeExpr::Func(self.func_expr(node)?),
            "struct_type" => TypeExpr::Struct(self.fields(node)?),
            "interface_type" => TypeExpr::Interface(self.interface_elems(node)?),
            "type_elem" | "constraint_elem" | "type_constraint" | "union_type" => {
                let mut terms = Vec::new();
                for child in named_children(node) {
                    match self.lower_type(child)? {
                        TypeExpr::Union(inner) => terms.extend(inner),
                        term => terms.push(term),
                    }
                }
                match terms.len() {
                    0 => return Err(self.parsed.error_at(node, "empty type element")),
                    1 => terms.remove(0),
                    _ => TypeExpr::Union(terms),
                }
            }
            other => {
                return Err(self
                    .parsed
                    .error_at(node, format!("unsupported type syntax: {}", other)))
            }
        };
        Ok(ty)
    }

    /// Signature of a `function_type`, `method_elem` or `method_spec` node.
    fn func_expr(&self, node: Node) -> Result<FuncExpr, SyntaxError> {
        let (params, variadic) = self.params(self.field(node, "parameters")?)?;
        let results = match node.child_by_field_name("result") {
            None => Vec::new(),
            Some(result) if result.kind() == "parameter_list" => {
                let (results, variadic) = self.params(result)?;
                if variadic {
                    return Err(self
                        .parsed
                        .error_at(result, "cannot use ... in result list"));
                }
                results
            }
            Some(result) => vec![ParamExpr {
                name: None,
                ty: self.lower_type(result)?,
            }],
        };

        Ok(FuncExpr {
            params,
            results,
            variadic,
        })
    }

    fn params(&self, list: Node) -> Result<(Vec<ParamExpr>, bool), SyntaxError> {
        let mut params = Vec::new();
        let mut variadic = false;

        for decl in named_children(list) {
            if variadic {
                return Err(self
                    .parsed
                    .error_at(decl, "can only use ... with final parameter in list"));
            }
            match decl.kind() {
                "parameter_declaration" => {
                    let ty = self.lower_type(self.field(decl, "type")?)?;
                    let names: Vec<_> = decl
                        .children_by_field_name("name", &mut decl.walk())
                        .collect();
                    if names.is_empty() {
                        params.push(ParamExpr { name: None, ty });
                    } else {
                        for name in names {
                            params.push(ParamExpr {
                                name: Some(self.text(name)),
                                ty: ty.clone(),
                            });
                        }
                    }
                }
                "variadic_parameter_declaration" => {
                    params.push(ParamExpr {
                        name: decl.child_by_field_name("name").map(|n| self.text(n)),
                        ty: self.lower_type(self.field(decl, "type")?)?,
                    });
                    variadic = true;
                }
                other => {
                    return Err(self
                        .parsed
                        .error_at(decl, format!("unexpected {} in parameter list", other)))
                }
            }
        }

        Ok((params, variadic))
    }

    fn fields(&self, node: Node) -> Result<Vec<FieldExpr>, SyntaxError> {
        let mut fields = Vec::new();
        let Some(list) = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Ok(fields);
        };

        for decl in named_children(list) {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let mut ty = self.lower_type(self.field(decl, "type")?)?;
            let tag = decl.child_by_field_name("tag").map(|t| self.text(t));
            let names: Vec<_> = decl
                .children_by_field_name("name", &mut decl.walk())
                .collect();

            if names.is_empty() {
                let pointer = decl
                    .children(&mut decl.walk())
                    .any(|c| c.kind() == "*");
                if pointer {
                    ty = TypeExpr::Pointer(Box::new(ty));
                }
                fields.push(FieldExpr {
                    name: None,
                    ty,
                    tag,
                });
            } else {
                for name in names {
                    fields.push(FieldExpr {
                        name: Some(self.text(name)),
                        ty: ty.clone(),
                        tag: tag.clone(),
                    });
                }
            }
        }

        Ok(fields)
    }

    fn interface_elems(&self, node: Node) -> Result<Vec<InterfaceElem>, SyntaxError> {
        let mut elems = Vec::new();
        for child in named_children(node) {
            match child.kind() {
                "method_elem" | "method_spec" => elems.push(InterfaceElem::Method {
                    name: self.text(self.field(child, "name")?),
                    sig: self.func_expr(child)?,
                }),
                "method_spec_list" => elems.extend(self.interface_elems(child)?),
                _ => elems.push(InterfaceElem::Embed(self.lower_type(child)?)),
            }
        }
        Ok(elems)
    }
}

/// Value of a Go integer literal: decimal, `0x`, `0o`, legacy `0` octal or
/// `0b`, with optional `_` separators.
fn parse_int(text: &str) -> Option<i128> {
    let digits = text.replace('_', "");
    let lower = digits.to_ascii_lowercase();
    let (radix, body) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    i128::from_str_radix(body, radix).ok()
}

fn chan_dir(node: Node) -> ChanDir {
    let tokens: Vec<&str> = node
        .children(&mut node.walk())
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect();
    match tokens.as_slice() {
        ["<-", ..] => ChanDir::Recv,
        tokens if tokens.contains(&"<-") => ChanDir::Send,
        _ => ChanDir::Both,
    }
}
