//! Renderable signature model.
//!
//! [`SignatureBuilder`] turns completed interface methods into
//! [`MethodModel`]s: parameter names are synthesized where missing, every
//! referenced type is rendered with the right package qualifier, and the
//! imports those qualifiers need are returned next to the value instead of
//! being written to shared state.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::ImportSpec;
use crate::extract::InterfaceSymbol;
use crate::types::{type_string, Method, Named, PackageRef, Type, Var};

/// Identifiers a generated method body refers to besides its parameters.
const RESERVED: &[&str] = &["_", "append", "panic", "nil", "struct", RECEIVER];

/// Receiver name of every generated method.
pub const RECEIVER: &str = "m";

/// One import of the generated file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Import {
    /// Explicit alias; empty to use the package's declared name.
    pub name: String,
    pub path: String,
    /// Declared name of the imported package.
    #[serde(skip)]
    pub package: String,
}

impl Import {
    /// The identifier this import binds in the generated file.
    pub fn binding(&self) -> &str {
        if self.name.is_empty() {
            &self.package
        } else {
            &self.name
        }
    }
}

/// Imports of the generated file.
///
/// `named` holds the explicit aliases declared by the target package,
/// `all` every path a rendered type referenced.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    named: BTreeMap<String, String>,
    all: BTreeMap<String, Import>,
}

impl ImportTable {
    /// Collect explicit aliases from the target package's imports.
    pub fn from_specs<'a>(specs: impl IntoIterator<Item = &'a ImportSpec>) -> Self {
        let named = specs
            .into_iter()
            .filter_map(|spec| Some((spec.path.clone(), spec.alias()?.to_string())))
            .collect();
        Self {
            named,
            all: BTreeMap::new(),
        }
    }

    /// The alias the target package uses for `path`.
    pub fn alias(&self, path: &str) -> Option<&str> {
        self.named.get(path).map(String::as_str)
    }

    /// Record imports referenced by a built value.
    pub fn merge(&mut self, imports: impl IntoIterator<Item = Import>) {
        for import in imports {
            self.all.insert(import.path.clone(), import);
        }
    }

    /// Re-apply the declared aliases onto every recorded import and return
    /// them sorted by path.
    pub fn finalize(mut self) -> Vec<Import> {
        for (path, alias) in &self.named {
            if let Some(import) = self.all.get_mut(path) {
                import.name = alias.clone();
            }
        }
        self.all.into_values().collect()
    }
}

/// A parameter or result of a generated method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    /// Declared or synthesized name.
    pub name: String,
    /// Rendered type; `[]T` for a variadic parameter.
    #[serde(rename = "type")]
    pub ty: String,
    pub variadic: bool,
    /// Field name in the call record.
    pub field: String,
}

impl Param {
    /// `name T`, or `name ...T` when variadic.
    pub fn decl(&self) -> String {
        format!("{} {}", self.name, self.type_str())
    }

    /// The argument as forwarded to the configured function.
    pub fn call(&self) -> String {
        if self.variadic {
            format!("{}...", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn type_str(&self) -> String {
        match self.ty.strip_prefix("[]") {
            Some(elem) if self.variadic => format!("...{}", elem),
            _ => self.ty.clone(),
        }
    }

    pub fn return_str(&self) -> &str {
        &self.ty
    }
}

/// One interface method ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodModel {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

impl MethodModel {
    pub fn param_str(&self) -> String {
        join(self.params.iter().map(Param::decl))
    }

    pub fn call_str(&self) -> String {
        join(self.params.iter().map(Param::call))
    }

    /// Result list as written after a signature: nothing, one bare type, or
    /// a parenthesised list.
    pub fn return_str(&self) -> String {
        let returns = join(self.results.iter().map(|r| r.return_str().to_string()));
        if self.results.len() > 1 {
            format!("({})", returns)
        } else {
            returns
        }
    }
}

/// One mock to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceModel {
    /// Interface name as declared.
    pub name: String,
    /// The interface as referenced from the output package.
    pub qualified: String,
    /// Name of the generated mock type.
    pub mock: String,
    pub methods: Vec<MethodModel>,
}

/// Everything the emitter renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDocument {
    pub package: String,
    pub interfaces: Vec<InterfaceModel>,
    /// Finalized imports, sorted by path.
    pub imports: Vec<Import>,
}

/// A built value with the imports its rendered types need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built<T> {
    pub value: T,
    pub imports: Vec<Import>,
}

/// Builds method models for mocks placed in the `recipient` package.
pub struct SignatureBuilder<'a> {
    recipient: &'a str,
    self_package: Option<&'a str>,
    table: &'a ImportTable,
    cwd: Option<PathBuf>,
}

impl<'a> SignatureBuilder<'a> {
    pub fn new(recipient: &'a str, table: &'a ImportTable) -> Self {
        Self {
            recipient,
            self_package: None,
            table,
            cwd: std::env::current_dir().ok(),
        }
    }

    /// Import path rendered unqualified and never imported.
    pub fn self_package(mut self, path: Option<&'a str>) -> Self {
        self.self_package = path.filter(|p| !p.is_empty());
        self
    }

    /// Directory relative display paths are computed against.
    pub fn cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    /// Model a completed interface, naming its mock `prefix + name + suffix`.
    pub fn interface(
        &self,
        symbol: &InterfaceSymbol,
        prefix: &str,
        suffix: &str,
    ) -> Built<InterfaceModel> {
        let mut imports = BTreeMap::new();
        let iface = Type::Named(Named {
            package: Some(symbol.package.clone()),
            name: symbol.name.clone(),
            args: Vec::new(),
        });
        let qualified = self.render(&iface, &mut imports);

        let mut methods = Vec::with_capacity(symbol.methods.len());
        for method in &symbol.methods {
            let built = self.method(method);
            for import in built.imports {
                imports.insert(import.path.clone(), import);
            }
            methods.push(built.value);
        }

        Built {
            value: InterfaceModel {
                name: symbol.name.clone(),
                qualified,
                mock: format!("{}{}{}", prefix, symbol.name, suffix),
                methods,
            },
            imports: imports.into_values().collect(),
        }
    }

    /// Model one method.
    pub fn method(&self, method: &Method) -> Built<MethodModel> {
        let mut imports = BTreeMap::new();
        let sig = &method.sig;

        let params = self.tuple(&sig.params, sig.variadic, &mut imports);
        let results = self.tuple(&sig.results, false, &mut imports);

        // A parameter may not shadow a package or type the method body names.
        let mut taken: HashSet<String> = RESERVED.iter().map(|s| s.to_string()).collect();
        taken.extend(imports.values().map(|i: &Import| i.binding().to_string()));
        for var in sig.params.iter().chain(&sig.results) {
            self.unqualified_names(&var.ty, &mut taken);
        }
        let params = name_all(params, &sig.params, "in", &taken);
        let results = name_all(results, &sig.results, "out", &taken);

        Built {
            value: MethodModel {
                name: method.name.clone(),
                params,
                results,
            },
            imports: imports.into_values().collect(),
        }
    }

    /// Render a type on its own.
    pub fn type_text(&self, ty: &Type) -> Built<String> {
        let mut imports = BTreeMap::new();
        let value = self.render(ty, &mut imports);
        Built {
            value,
            imports: imports.into_values().collect(),
        }
    }

    /// Render each variable's type, marking the variadic last parameter.
    fn tuple(
        &self,
        vars: &[Var],
        variadic: bool,
        imports: &mut BTreeMap<String, Import>,
    ) -> Vec<Param> {
        let last = vars.len().saturating_sub(1);
        vars.iter()
            .enumerate()
            .map(|(i, var)| {
                let ty = self.render(&var.ty, imports);
                let variadic = variadic && i == last && ty.starts_with("[]");
                Param {
                    name: String::new(),
                    ty,
                    variadic,
                    field: String::new(),
                }
            })
            .collect()
    }

    fn render(&self, ty: &Type, imports: &mut BTreeMap<String, Import>) -> String {
        type_string(ty, &mut |pkg| self.qualify(pkg, imports))
    }

    /// Identifiers a rendered type uses without a package qualifier.
    fn unqualified_names(&self, ty: &Type, out: &mut HashSet<String>) {
        match ty {
            Type::Basic(name) | Type::TypeParam(name) => {
                out.insert(name.clone());
            }
            Type::Named(named) => {
                if named.package.as_ref().map_or(true, |pkg| self.elides(pkg)) {
                    out.insert(named.name.clone());
                }
                for arg in &named.args {
                    self.unqualified_names(arg, out);
                }
            }
            Type::Pointer(elem) | Type::Slice(elem) | Type::Tilde(elem) => {
                self.unqualified_names(elem, out)
            }
            Type::Array { elem, .. } | Type::Chan { elem, .. } => self.unqualified_names(elem, out),
            Type::Map { key, value } => {
                self.unqualified_names(key, out);
                self.unqualified_names(value, out);
            }
            Type::Signature(sig) => {
                for var in sig.params.iter().chain(&sig.results) {
                    self.unqualified_names(&var.ty, out);
                }
            }
            Type::Struct(fields) => {
                for field in fields {
                    self.unqualified_names(&field.ty, out);
                }
            }
            Type::Interface(iface) => {
                for method in iface.methods() {
                    self.unqualified_names(&Type::Signature(method.sig.clone()), out);
                }
                for embedded in iface.embeddeds() {
                    self.unqualified_names(embedded, out);
                }
            }
            Type::Union(terms) => {
                for term in terms {
                    self.unqualified_names(term, out);
                }
            }
        }
    }

    /// Whether types of `pkg` are written without a qualifier.
    fn elides(&self, pkg: &PackageRef) -> bool {
        if pkg.name == self.recipient {
            return true;
        }
        self.self_package.map_or(false, |own| {
            own == pkg.path || own == display_path(&pkg.path, self.cwd.as_deref())
        })
    }

    /// The qualifier for a package referenced from the output file.
    fn qualify(&self, pkg: &PackageRef, imports: &mut BTreeMap<String, Import>) -> String {
        if self.elides(pkg) {
            return String::new();
        }
        let path = display_path(&pkg.path, self.cwd.as_deref());

        let name = self.table.alias(&path).unwrap_or("").to_string();
        let import = Import {
            name,
            path: path.clone(),
            package: pkg.name.clone(),
        };
        let binding = import.binding().to_string();
        imports.insert(path, import);
        binding
    }
}

/// Give every entry a usable name and a unique call-record field.
fn name_all(
    mut params: Vec<Param>,
    vars: &[Var],
    template: &str,
    taken: &HashSet<String>,
) -> Vec<Param> {
    let declared: HashSet<&str> = vars
        .iter()
        .filter_map(|v| v.name.as_deref())
        .filter(|n| !taken.contains(*n))
        .collect();

    let mut fields = HashSet::new();
    for (i, (param, var)) in params.iter_mut().zip(vars).enumerate() {
        param.name = match var.name.as_deref() {
            Some(name) if !taken.contains(name) => name.to_string(),
            _ => {
                let mut name = format!("{}{}", template, i + 1);
                while declared.contains(name.as_str()) {
                    name.push('_');
                }
                name
            }
        };

        let mut field = capitalize(&param.name);
        if !fields.insert(field.clone()) {
            field = format!("{}{}", field, i + 1);
            fields.insert(field.clone());
        }
        param.field = field;
    }
    params
}

/// Import path as written in the generated file: vendored paths lose
/// their vendor prefix and directories become relative to `cwd`.
pub fn display_path(path: &str, cwd: Option<&Path>) -> String {
    if let Some(idx) = path.rfind("/vendor/") {
        return path[idx + "/vendor/".len()..].to_string();
    }
    if let Some(rest) = path.strip_prefix("vendor/") {
        return rest.to_string();
    }
    let as_path = Path::new(path);
    if as_path.is_absolute() {
        if let Some(rel) = cwd.and_then(|cwd| as_path.strip_prefix(cwd).ok()) {
            let rel = rel.to_string_lossy().replace('\\', "/");
            return if rel.is_empty() {
                ".".to_string()
            } else {
                format!("./{}", rel)
            };
        }
    }
    path.to_string()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn join(items: impl Iterator<Item = String>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Signature;

    fn basic(name: &str) -> Type {
        Type::Basic(name.to_string())
    }

    fn named(path: &str, pkg: &str, name: &str) -> Type {
        Type::Named(Named {
            package: Some(PackageRef {
                path: path.to_string(),
                name: pkg.to_string(),
            }),
            name: name.to_string(),
            args: Vec::new(),
        })
    }

    fn var(name: Option<&str>, ty: Type) -> Var {
        Var {
            name: name.map(str::to_string),
            ty,
        }
    }

    fn method(name: &str, params: Vec<Var>, results: Vec<Var>, variadic: bool) -> Method {
        Method {
            name: name.to_string(),
            sig: Signature {
                params,
                results,
                variadic,
            },
        }
    }

    #[test]
    fn test_variadic_only_on_last_slice_parameter() {
        let table = ImportTable::default();
        let builder = SignatureBuilder::new("test", &table);
        let one = method(
            "One",
            vec![
                var(Some("str"), basic("string")),
                var(Some("variadic"), Type::Slice(Box::new(basic("string")))),
            ],
            vec![
                var(None, basic("string")),
                var(None, Type::Slice(Box::new(basic("string")))),
            ],
            true,
        );
        let model = builder.method(&one).value;
        assert_eq!(model.param_str(), "str string, variadic ...string");
        assert_eq!(model.call_str(), "str, variadic...");
        assert_eq!(model.return_str(), "(string, []string)");
        assert!(!model.results[1].variadic);

        let plain = method(
            "Plain",
            vec![var(Some("xs"), Type::Slice(Box::new(basic("int"))))],
            Vec::new(),
            false,
        );
        let model = builder.method(&plain).value;
        assert_eq!(model.param_str(), "xs []int");
        assert_eq!(model.call_str(), "xs");
        assert_eq!(model.return_str(), "");
    }

    #[test]
    fn test_synthesized_names_differ_for_params_and_results() {
        let table = ImportTable::default();
        let builder = SignatureBuilder::new("test", &table);
        let two = method(
            "Two",
            vec![var(None, basic("int")), var(None, basic("int"))],
            vec![var(None, basic("int"))],
            false,
        );
        let model = builder.method(&two).value;
        let names: Vec<_> = model.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["in1", "in2"]);
        assert_eq!(model.results[0].name, "out1");
        assert_eq!(model.params[0].field, "In1");
        assert_eq!(model.return_str(), "int");
    }

    #[test]
    fn test_reserved_and_colliding_names_are_replaced() {
        let table = ImportTable::default();
        let builder = SignatureBuilder::new("test", &table);
        let m = method(
            "Do",
            vec![
                var(Some("_"), basic("int")),
                var(Some("in1"), basic("string")),
                var(Some("m"), basic("bool")),
                var(Some("http"), named("net/http", "http", "Header")),
            ],
            Vec::new(),
            false,
        );
        let model = builder.method(&m).value;
        let names: Vec<_> = model.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["in1_", "in1", "in3", "in4"]);
    }

    #[test]
    fn test_params_never_shadow_types_the_body_names() {
        let table = ImportTable::default();
        let builder = SignatureBuilder::new("config", &table);
        let error = Type::Named(Named {
            package: None,
            name: "error".to_string(),
            args: Vec::new(),
        });
        let apply = method(
            "Apply",
            vec![
                var(Some("options"), named("example.com/config", "config", "options")),
                var(Some("string"), basic("string")),
                var(Some("errs"), Type::Slice(Box::new(error.clone()))),
                var(Some("b"), named("example.com/b", "b", "Config")),
            ],
            vec![var(Some("error"), error)],
            false,
        );
        let model = builder.method(&apply).value;

        let names: Vec<_> = model.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["in1", "in2", "errs", "in4"]);
        assert_eq!(model.results[0].name, "out1");
        assert_eq!(model.params[0].decl(), "in1 options");
        assert_eq!(model.params[0].field, "In1");
    }

    #[test]
    fn test_qualifier_elides_recipient_and_self_package() {
        let table = ImportTable::default();
        let builder = SignatureBuilder::new("test", &table).self_package(Some("example.com/own"));

        let same_name = builder.type_text(&named("example.com/other/test", "test", "Int"));
        assert_eq!(same_name.value, "Int");
        assert!(same_name.imports.is_empty());

        let own = builder.type_text(&named("example.com/own", "own", "Thing"));
        assert_eq!(own.value, "Thing");
        assert!(own.imports.is_empty());

        let pointer = Type::Pointer(Box::new(named("example.com/a", "a", "Int")));
        let foreign = builder.type_text(&pointer);
        assert_eq!(foreign.value, "*a.Int");
        assert_eq!(
            foreign.imports,
            vec![Import {
                name: String::new(),
                path: "example.com/a".to_string(),
                package: "a".to_string(),
            }]
        );
    }

    #[test]
    fn test_declared_aliases_are_used_and_reapplied() {
        let specs = vec![ImportSpec {
            name: Some("av1".to_string()),
            path: "example.com/a".to_string(),
            span: crate::analysis::Span {
                start_byte: 0,
                end_byte: 0,
                start_line: 1,
                start_col: 1,
            },
        }];
        let table = ImportTable::from_specs(&specs);
        let built =
            SignatureBuilder::new("test", &table).type_text(&named("example.com/a", "a", "Int"));
        assert_eq!(built.value, "av1.Int");

        let mut table = table.clone();
        table.merge(built.imports.clone());
        table.merge(built.imports);
        let imports = table.finalize();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].name, "av1");
    }

    #[test]
    fn test_display_path() {
        assert_eq!(
            display_path("example.com/app/vendor/github.com/x/y", None),
            "github.com/x/y"
        );
        assert_eq!(display_path("github.com/x/y", None), "github.com/x/y");
        assert_eq!(
            display_path("/work/proj/pkg", Some(Path::new("/work/proj"))),
            "./pkg"
        );
    }

    #[test]
    fn test_duplicate_field_names_get_position_suffix() {
        let table = ImportTable::default();
        let builder = SignatureBuilder::new("test", &table);
        let m = method(
            "Pair",
            vec![var(Some("x"), basic("int")), var(Some("X"), basic("int"))],
            Vec::new(),
            false,
        );
        let model = builder.method(&m).value;
        let fields: Vec<_> = model.params.iter().map(|p| p.field.as_str()).collect();
        assert_eq!(fields, vec!["X", "X2"]);
    }
}
