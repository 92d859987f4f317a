//! High-level driver: specialize every dialect file of one package

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};

use crate::codegen::templates::validate_registry;
use crate::codegen::{GenerationStats, Specializer};
use crate::config::GenerationConfig;
use crate::error::{GenError, Result};
use crate::syntax::ast::{Decl, File};
use crate::syntax::printer::print_file;
use crate::types::TypeOracle;

/// A parsed source file of the package
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub ast: File,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, ast: File) -> Self {
        SourceFile {
            path: path.into(),
            ast,
        }
    }
}

/// All files of one package, host and dialect alike
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub files: Vec<SourceFile>,
}

impl Package {
    pub fn new(name: &str) -> Self {
        Package {
            name: name.to_string(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, file: SourceFile) -> Self {
        self.files.push(file);
        self
    }

    /// Names declared at package level, which hide builtins of the same name
    pub fn scope(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for file in &self.files {
            for decl in &file.ast.decls {
                match decl {
                    Decl::Func(func) if func.recv.is_none() => {
                        names.insert(func.name.clone());
                    }
                    Decl::Func(_) => {}
                    Decl::Type { name, .. } | Decl::Var { name, .. } => {
                        names.insert(name.clone());
                    }
                }
            }
        }
        names
    }
}

/// Result of compiling a package
#[derive(Debug, Clone)]
pub struct CompilationOutput {
    /// Rewritten dialect files, keyed by output file name
    pub files: BTreeMap<String, String>,
    /// File name of the auxiliary unit
    pub aux_name: String,
    /// Every generated declaration, with the imports they need
    pub aux_source: String,
    pub stats: GenerationStats,
    pub generation_time_ms: u128,
}

impl CompilationOutput {
    /// Every output file, auxiliary unit last
    pub fn all_files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
            .chain(std::iter::once((self.aux_name.as_str(), self.aux_source.as_str())))
    }
}

/// Rewrite every dialect file of `package` into host source.
///
/// The oracle must describe the package as parsed; any diagnostic it carries
/// halts compilation before anything is rewritten, as does a template that
/// breaks the insertion-point invariant. Dialect files are rewritten in place.
pub fn compile_package(
    package: &mut Package,
    oracle: &dyn TypeOracle,
    config: &GenerationConfig,
) -> Result<CompilationOutput> {
    config.validate()?;
    validate_registry()?;
    let diagnostics = oracle.diagnostics();
    if !diagnostics.is_empty() {
        return Err(GenError::TypeCheck(diagnostics.to_vec()));
    }

    let start = Instant::now();
    let mut specializer = Specializer::new(oracle, config).with_shadowed(package.scope());
    let mut files = BTreeMap::new();

    for source in package
        .files
        .iter_mut()
        .filter(|f| config.is_dialect_file(&f.path))
    {
        specializer.specialize_file(&mut source.ast);
        let name = config.output_name(&source.path);
        if files.insert(name.clone(), print_file(&source.ast)).is_some() {
            warn!("{} produced by more than one dialect file, last one kept", name);
        }
    }

    let (registry, stats) = specializer.finish();
    let aux_source = registry.render(&package.name);
    let generation_time_ms = start.elapsed().as_millis();

    info!(
        "package {}: {} file(s) rewritten, {} pipeline(s) fused, {} declaration(s) generated in {}ms",
        package.name,
        files.len(),
        stats.pipelines_fused,
        registry.len(),
        generation_time_ms
    );

    Ok(CompilationOutput {
        files,
        aux_name: config.aux_unit_name.clone(),
        aux_source,
        stats,
        generation_time_ms,
    })
}
