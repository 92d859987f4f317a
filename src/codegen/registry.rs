//! Generated declarations of one compilation
//!
//! Declarations are kept in insertion order and keyed by their generated
//! name; inserting a name twice is a no-op. The registry also collects the
//! imports generated code depends on and renders everything as the
//! auxiliary unit.

use std::collections::{BTreeSet, HashSet};

use crate::syntax::printer::print_imports;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDecl {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeclRegistry {
    decls: Vec<GeneratedDecl>,
    names: HashSet<String>,
    imports: BTreeSet<String>,
}

impl DeclRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration; returns false if the name is already present
    pub fn add_declaration(&mut self, name: &str, code: String) -> bool {
        if !self.names.insert(name.to_string()) {
            return false;
        }
        self.decls.push(GeneratedDecl {
            name: name.to_string(),
            code,
        });
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&GeneratedDecl> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// Record an import path required by generated code
    pub fn require_import(&mut self, path: &str) {
        self.imports.insert(path.to_string());
    }

    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    pub fn declarations(&self) -> &[GeneratedDecl] {
        &self.decls
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Render the auxiliary unit: package clause, imports, then every
    /// declaration in insertion order
    pub fn render(&self, package: &str) -> String {
        let mut out = format!("package {}\n", package);
        let imports: Vec<&str> = self.imports().collect();
        if !imports.is_empty() {
            out.push('\n');
            out.push_str(&print_imports(&imports));
        }
        for decl in &self.decls {
            out.push('\n');
            out.push_str(&decl.code);
            out.push('\n');
        }
        out
    }
}
