//! Tiny v1 and v2 readers.
//!
//! Only class, field and method names are kept. Parameters, local variables
//! and comments are skipped.

use crate::error::{MappingError, Result};
use crate::tree::MappingTree;
use camino::Utf8Path;
use std::fs::File;
use std::io::{BufRead, BufReader};

impl MappingTree {
    /// Parse a Tiny file, detecting the format from its header.
    pub fn read_tiny<R: BufRead>(reader: R) -> Result<Self> {
        read_tiny(reader)
    }

    pub fn read_tiny_file(path: &Utf8Path) -> Result<Self> {
        let file = File::open(path)?;
        read_tiny(BufReader::new(file))
    }
}

pub fn read_tiny<R: BufRead>(reader: R) -> Result<MappingTree> {
    let mut lines = reader.lines().enumerate();
    let (_, header) = lines.next().ok_or(MappingError::Empty)?;
    let header = header?;
    let columns: Vec<&str> = header.split('\t').collect();

    match columns.as_slice() {
        ["v1", namespaces @ ..] if !namespaces.is_empty() => {
            let tree = MappingTree::new(namespaces.iter().copied());
            read_v1(tree, lines)
        }
        ["tiny", "2", _, namespaces @ ..] if !namespaces.is_empty() => {
            let tree = MappingTree::new(namespaces.iter().copied());
            read_v2(tree, lines)
        }
        _ => Err(MappingError::UnknownHeader(header.clone())),
    }
}

fn syntax(line: usize, message: impl Into<String>) -> MappingError {
    MappingError::Syntax {
        line: line + 1,
        message: message.into(),
    }
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn read_v1<I>(mut tree: MappingTree, lines: I) -> Result<MappingTree>
where
    I: Iterator<Item = (usize, std::io::Result<String>)>,
{
    let width = tree.namespaces().len();

    for (number, line) in lines {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let columns: Vec<&str> = line.split('\t').collect();

        match columns[0] {
            "CLASS" => {
                if columns.len() < 2 {
                    return Err(syntax(number, "CLASS needs at least one name"));
                }
                tree.add_class(owned(&columns[1..columns.len().min(1 + width)]));
            }
            kind @ ("FIELD" | "METHOD") => {
                if columns.len() < 4 {
                    return Err(syntax(number, format!("{kind} needs owner, descriptor and a name")));
                }
                let owner = tree.ensure_class(columns[1]);
                let names = owned(&columns[3..columns.len().min(3 + width)]);
                let class = tree.class_mut(owner);
                if kind == "FIELD" {
                    class.add_field(columns[2], names);
                } else {
                    class.add_method(columns[2], names);
                }
            }
            other => {
                tracing::debug!("Skipping unknown Tiny v1 entry kind {} on line {}", other, number + 1);
            }
        }
    }

    Ok(tree)
}

fn read_v2<I>(mut tree: MappingTree, lines: I) -> Result<MappingTree>
where
    I: Iterator<Item = (usize, std::io::Result<String>)>,
{
    let width = tree.namespaces().len();
    let mut escaped = false;
    let mut in_header = true;
    let mut current: Option<usize> = None;

    for (number, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let depth = line.bytes().take_while(|&b| b == b'\t').count();
        let columns: Vec<&str> = line[depth..].split('\t').collect();

        if in_header && depth == 1 {
            if columns[0] == "escaped-names" {
                escaped = true;
            }
            continue;
        }
        in_header = false;

        let names = |from: usize| -> Vec<String> {
            columns[from..columns.len().min(from + width)]
                .iter()
                .map(|c| if escaped { unescape(c) } else { c.to_string() })
                .collect()
        };

        match (depth, columns[0]) {
            (0, "c") => {
                if columns.len() < 2 {
                    return Err(syntax(number, "class entry needs at least one name"));
                }
                current = Some(tree.add_class(names(1)));
            }
            (0, other) => {
                return Err(syntax(number, format!("unexpected top-level entry '{other}'")));
            }
            (1, kind @ ("f" | "m")) => {
                let Some(class) = current else {
                    return Err(syntax(number, "member entry outside of a class"));
                };
                if columns.len() < 3 {
                    return Err(syntax(number, "member entry needs a descriptor and a name"));
                }
                let descriptor = if escaped {
                    unescape(columns[1])
                } else {
                    columns[1].to_string()
                };
                let names = names(2);
                if kind == "f" {
                    tree.class_mut(class).add_field(descriptor, names);
                } else {
                    tree.class_mut(class).add_method(descriptor, names);
                }
            }
            // Class comments at depth 1; parameters, variables and member comments deeper.
            _ => {}
        }
    }

    Ok(tree)
}

fn unescape(value: &str) -> String {
    if !value.contains('\\') {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
