//! Turns catalogue entries into language-neutral stubs that bind to the
//! encoder/decoder contracts (`valkeyclient_core::command::Command`,
//! `TypedCommand`) without attempting to guess a concrete response type:
//! every generated stub decodes to `Frame` and leaves typing the reply to
//! the hand-written wrapper that re-exports it, the same way the bulk
//! command catalogue is explicitly out of scope and only the stubs binding
//! to it are generated.
use crate::catalogue::{ArgumentKind, ArgumentSpec, Catalogue, CatalogueEntry};
use crate::error::{CodegenError, CodegenResult};
use std::fmt::Write as _;

/// Render every catalogue entry as a `Command` struct plus its `Command`
/// impl, as one `commands_generated.rs` module body.
pub fn generate_module(catalogue: &Catalogue) -> CodegenResult<String> {
    let mut out = String::new();
    writeln!(out, "// @generated by valkeyclient-codegen. Do not edit by hand.").unwrap();
    writeln!(out, "#![allow(clippy::all)]").unwrap();
    writeln!(out, "use crate::command::Command;").unwrap();
    writeln!(out, "use crate::resp::Encoder;").unwrap();
    writeln!(out, "use bytes::Bytes;").unwrap();
    writeln!(out).unwrap();

    for (name, entry) in &catalogue.commands {
        render_command(&mut out, name, entry)?;
    }
    Ok(out)
}

fn struct_name(command_name: &str) -> String {
    command_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
                None => String::new(),
            }
        })
        .collect()
}

fn field_name(arg: &ArgumentSpec) -> String {
    let snake: String = arg
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    match snake.as_str() {
        "type" | "match" | "move" | "ref" => format!("{snake}_"),
        _ => snake,
    }
}

fn rust_field_type(command_name: &str, arg: &ArgumentSpec) -> CodegenResult<String> {
    let base = match arg.kind {
        ArgumentKind::Integer | ArgumentKind::UnixTime => "i64",
        ArgumentKind::Double => "f64",
        ArgumentKind::String | ArgumentKind::Key | ArgumentKind::Pattern => "Bytes",
        ArgumentKind::PureToken => "bool",
        ArgumentKind::Oneof | ArgumentKind::Block => {
            return Err(CodegenError::UnmappableArgumentKind {
                command: command_name.to_string(),
                kind: format!("{:?}", arg.kind),
            })
        }
    };
    let with_multiplicity = if arg.multiple { format!("Vec<{base}>") } else { base.to_string() };
    Ok(if arg.optional && arg.kind != ArgumentKind::PureToken {
        format!("Option<{with_multiplicity}>")
    } else {
        with_multiplicity
    })
}

fn render_command(out: &mut String, command_name: &str, entry: &CatalogueEntry) -> CodegenResult<()> {
    let type_name = struct_name(command_name);
    writeln!(out, "/// `{command_name}`: {}", entry.summary).unwrap();
    writeln!(out, "///").unwrap();
    writeln!(out, "/// Since {}, complexity {}.", entry.since, entry.complexity).unwrap();
    writeln!(out, "#[derive(Debug, Clone)]").unwrap();
    writeln!(out, "pub struct {type_name} {{").unwrap();
    for arg in &entry.arguments {
        writeln!(out, "    pub {}: {},", field_name(arg), rust_field_type(command_name, arg)?).unwrap();
    }
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();

    writeln!(out, "impl Command for {type_name} {{").unwrap();
    writeln!(out, "    fn name(&self) -> &'static str {{").unwrap();
    writeln!(out, "        {command_name:?}").unwrap();
    writeln!(out, "    }}").unwrap();
    writeln!(
        out,
        "    fn is_read_only(&self) -> bool {{ {} }}",
        entry.acl_categories.iter().any(|c| c == "@read")
    )
    .unwrap();
    writeln!(out, "    fn encode(&self, enc: &mut Encoder) {{").unwrap();
    let arity = 1 + entry.arguments.len();
    writeln!(out, "        enc.write_array_header({arity});").unwrap();
    writeln!(out, "        enc.write_bulk({command_name:?});").unwrap();
    for arg in &entry.arguments {
        let field = field_name(arg);
        match arg.kind {
            ArgumentKind::PureToken => {
                writeln!(out, "        crate::command::pure_token(enc, {:?}, self.{field});", arg.name.to_uppercase()).unwrap();
            }
            _ if arg.multiple => {
                writeln!(out, "        for item in &self.{field} {{ enc.write_bulk(item); }}").unwrap();
            }
            _ if arg.optional => {
                writeln!(out, "        if let Some(v) = &self.{field} {{ enc.write_bulk(v); }}").unwrap();
            }
            _ => {
                writeln!(out, "        enc.write_bulk(&self.{field});").unwrap();
            }
        }
    }
    writeln!(out, "    }}").unwrap();
    writeln!(out, "}}").unwrap();
    writeln!(out).unwrap();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> CatalogueEntry {
        CatalogueEntry {
            summary: "Get the value of a key".to_string(),
            since: "1.0.0".to_string(),
            complexity: "O(1)".to_string(),
            acl_categories: vec!["@read".to_string()],
            arguments: vec![ArgumentSpec {
                name: "key".to_string(),
                kind: ArgumentKind::Key,
                multiple: false,
                optional: false,
                token: false,
            }],
        }
    }

    #[test]
    fn renders_a_simple_command_struct() {
        let mut out = String::new();
        render_command(&mut out, "GET", &sample_entry()).unwrap();
        assert!(out.contains("pub struct Get {"));
        assert!(out.contains("pub key: Bytes,"));
        assert!(out.contains("fn is_read_only(&self) -> bool { true }"));
    }

    #[test]
    fn struct_name_handles_subcommands() {
        assert_eq!(struct_name("CLIENT SETNAME"), "ClientSetname");
        assert_eq!(struct_name("GET"), "Get");
    }

    #[test]
    fn rejects_oneof_arguments_as_unmappable() {
        let mut entry = sample_entry();
        entry.arguments[0].kind = ArgumentKind::Oneof;
        let mut out = String::new();
        let err = render_command(&mut out, "GET", &entry).unwrap_err();
        assert!(matches!(err, CodegenError::UnmappableArgumentKind { .. }));
    }
}
