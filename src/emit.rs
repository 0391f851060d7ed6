//! Go source emission for mock types.
//!
//! Renders an [`OutputDocument`] into one gofmt-style Go file and checks
//! that the result parses as Go before it is handed back.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write;

use crate::analysis::GoSyntax;
use crate::error::EmitError;
use crate::model::{Import, InterfaceModel, MethodModel, OutputDocument, RECEIVER};

/// First line of every generated file.
pub const HEADER: &str = "// Code generated by mocker. DO NOT EDIT.";

/// Candidate names of the generated reset method, in order of preference.
const RESET_NAMES: &[&str] = &["Reset", "ResetCalls", "ResetMock"];

/// Render and validate the document.
pub fn emit(doc: &OutputDocument, syntax: &GoSyntax) -> Result<String, EmitError> {
    let src = render(doc)?;
    validate(&src, syntax)?;
    Ok(src)
}

/// Render the document as Go source.
pub fn render(doc: &OutputDocument) -> Result<String, EmitError> {
    let imports = import_block(&doc.imports)?;
    let mut mocks = HashSet::new();
    for iface in &doc.interfaces {
        if !mocks.insert(iface.mock.as_str()) || iface.mock == iface.qualified {
            return Err(EmitError::Template(format!(
                "mock name {} collides with another declaration",
                iface.mock
            )));
        }
    }

    let mut out = String::new();
    writeln!(out, "{}", HEADER)?;
    writeln!(out)?;
    writeln!(out, "package {}", doc.package)?;
    writeln!(out)?;
    writeln!(out, "import (")?;
    for import in &imports {
        if import.name.is_empty() {
            writeln!(out, "\t{:?}", import.path)?;
        } else {
            writeln!(out, "\t{} {:?}", import.name, import.path)?;
        }
    }
    writeln!(out, ")")?;

    for iface in &doc.interfaces {
        writeln!(out)?;
        write_mock(&mut out, iface)?;
    }

    Ok(out)
}

/// Check that generated text is well-formed Go.
pub fn validate(src: &str, syntax: &GoSyntax) -> Result<(), EmitError> {
    let parsed = syntax
        .parse(std::path::Path::new("mock.go"), src.as_bytes())
        .map_err(|e| EmitError::Formatting(e.to_string()))?;
    match parsed.first_error() {
        Some(err) => Err(EmitError::Formatting(err.to_string())),
        None => Ok(()),
    }
}

/// `sync` plus the document's imports, sorted by path, with unique
/// bindings.
fn import_block(imports: &[Import]) -> Result<Vec<Import>, EmitError> {
    let mut by_path: BTreeMap<&str, &Import> = BTreeMap::new();
    let sync = Import {
        name: String::new(),
        path: "sync".to_string(),
        package: "sync".to_string(),
    };
    by_path.insert("sync", &sync);
    for import in imports {
        if import.path == "sync" && import.name.is_empty() {
            continue;
        }
        by_path.insert(import.path.as_str(), import);
    }

    let mut bindings: BTreeMap<&str, &str> = BTreeMap::new();
    for import in by_path.values() {
        if let Some(other) = bindings.insert(import.binding(), import.path.as_str()) {
            return Err(EmitError::Template(format!(
                "imports {:?} and {:?} are both named {}",
                other,
                import.path,
                import.binding()
            )));
        }
    }

    Ok(by_path.into_values().cloned().collect())
}

// =============================================================================
// Mock type
// =============================================================================

fn write_mock(out: &mut String, iface: &InterfaceModel) -> Result<(), EmitError> {
    let reset = reset_name(iface)?;
    check_members(iface, reset)?;
    let mock = &iface.mock;

    writeln!(out, "var _ {} = &{}{{}}", iface.qualified, mock)?;
    writeln!(out)?;
    writeln!(out, "// {} is a mock implementation of {}.", mock, iface.name)?;
    writeln!(out, "type {} struct {{", mock)?;
    let funcs: Vec<(String, String)> = iface
        .methods
        .iter()
        .map(|m| {
            (
                format!("{}Func", m.name),
                format!("func({}){}", m.param_str(), returns_suffix(m)),
            )
        })
        .collect();
    write_aligned(out, "\t", &funcs)?;
    if !funcs.is_empty() {
        writeln!(out)?;
    }
    writeln!(out, "\tlock  sync.Mutex")?;
    if iface.methods.is_empty() {
        writeln!(out, "\tcalls struct{{}}")?;
    } else {
        writeln!(out, "\tcalls struct {{")?;
        let logs: Vec<(String, String)> = iface
            .methods
            .iter()
            .map(|m| (m.name.clone(), format!("[]{}", record_type(m))))
            .collect();
        write_aligned(out, "\t\t", &logs)?;
        writeln!(out, "\t}}")?;
    }
    writeln!(out, "}}")?;

    for method in &iface.methods {
        writeln!(out)?;
        write_method(out, iface, method)?;
        writeln!(out)?;
        write_accessor(out, iface, method)?;
    }

    writeln!(out)?;
    writeln!(out, "// {} clears every recorded call.", reset)?;
    writeln!(out, "func ({} *{}) {}() {{", RECEIVER, mock, reset)?;
    writeln!(out, "\t{}.lock.Lock()", RECEIVER)?;
    for method in &iface.methods {
        writeln!(out, "\t{}.calls.{} = nil", RECEIVER, method.name)?;
    }
    writeln!(out, "\t{}.lock.Unlock()", RECEIVER)?;
    writeln!(out, "}}")?;
    Ok(())
}

fn write_method(
    out: &mut String,
    iface: &InterfaceModel,
    method: &MethodModel,
) -> Result<(), EmitError> {
    let m = RECEIVER;
    let name = &method.name;
    let record = record_type(method);
    let args = method
        .params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    writeln!(out, "// {} calls {}Func.", name, name)?;
    writeln!(
        out,
        "func ({} *{}) {}({}){} {{",
        m,
        iface.mock,
        name,
        method.param_str(),
        returns_suffix(method)
    )?;
    writeln!(out, "\t{}.lock.Lock()", m)?;
    writeln!(
        out,
        "\t{m}.calls.{name} = append({m}.calls.{name}, {record}{{{args}}})",
        m = m,
        name = name,
        record = record,
        args = args
    )?;
    writeln!(out, "\t{}.lock.Unlock()", m)?;
    writeln!(out, "\tif {}.{}Func == nil {{", m, name)?;
    writeln!(
        out,
        "\t\tpanic(\"{}.{}Func: method is nil but {}.{} was just called\")",
        iface.mock, name, iface.name, name
    )?;
    writeln!(out, "\t}}")?;
    let call = format!("{}.{}Func({})", m, name, method.call_str());
    if method.results.is_empty() {
        writeln!(out, "\t{}", call)?;
    } else {
        writeln!(out, "\treturn {}", call)?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

fn write_accessor(
    out: &mut String,
    iface: &InterfaceModel,
    method: &MethodModel,
) -> Result<(), EmitError> {
    let m = RECEIVER;
    let name = &method.name;
    let record = record_type(method);

    writeln!(out, "// {}Calls returns the calls made to {}.", name, name)?;
    writeln!(
        out,
        "func ({} *{}) {}Calls() []{} {{",
        m, iface.mock, name, record
    )?;
    writeln!(out, "\t{}.lock.Lock()", m)?;
    writeln!(out, "\tdefer {}.lock.Unlock()", m)?;
    writeln!(
        out,
        "\treturn append([]{}(nil), {}.calls.{}...)",
        record, m, name
    )?;
    writeln!(out, "}}")?;
    Ok(())
}

/// Anonymous struct recording one call's arguments.
fn record_type(method: &MethodModel) -> String {
    if method.params.is_empty() {
        return "struct{}".to_string();
    }
    let fields = method
        .params
        .iter()
        .map(|p| format!("{} {}", p.field, p.ty))
        .collect::<Vec<_>>()
        .join("; ");
    format!("struct{{ {} }}", fields)
}

fn returns_suffix(method: &MethodModel) -> String {
    let returns = method.return_str();
    if returns.is_empty() {
        returns
    } else {
        format!(" {}", returns)
    }
}

/// Name the reset method so it does not shadow an interface method or a
/// generated member.
fn reset_name(iface: &InterfaceModel) -> Result<&'static str, EmitError> {
    let taken: HashSet<String> = iface
        .methods
        .iter()
        .flat_map(|m| {
            [
                m.name.clone(),
                format!("{}Func", m.name),
                format!("{}Calls", m.name),
            ]
        })
        .collect();
    RESET_NAMES
        .iter()
        .copied()
        .find(|candidate| !taken.contains(*candidate))
        .ok_or_else(|| {
            EmitError::Template(format!(
                "{} declares every reset method name ({})",
                iface.name,
                RESET_NAMES.join(", ")
            ))
        })
}

/// Fields and methods of the mock type must not collide.
fn check_members(iface: &InterfaceModel, reset: &str) -> Result<(), EmitError> {
    let mut members: HashSet<String> = ["lock", "calls", reset]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for method in &iface.methods {
        let generated = [
            method.name.clone(),
            format!("{}Func", method.name),
            format!("{}Calls", method.name),
        ];
        for member in generated {
            if !members.insert(member.clone()) {
                return Err(EmitError::Template(format!(
                    "{}: generated member {} collides with another member",
                    iface.mock, member
                )));
            }
        }
    }
    Ok(())
}

/// Write `name type` rows with the types in one column.
fn write_aligned(
    out: &mut String,
    indent: &str,
    rows: &[(String, String)],
) -> Result<(), EmitError> {
    let width = rows.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, ty) in rows {
        writeln!(out, "{}{:<width$} {}", indent, name, ty, width = width)?;
    }
    Ok(())
}
