//! Generation configuration: identifier prefixes, fusion switch, file naming

use std::path::Path;

use crate::error::{GenError, Result};

/// Configuration for one specialization run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Fuse chains of builtin methods into a single loop
    pub fusion: bool,
    /// Prefix of generated pipeline types (`__fgpipe_1`)
    pub pipeline_prefix: String,
    /// Prefix of generated receiver types for single methods (`__fgtype_1_filter`)
    pub type_prefix: String,
    /// Prefix of generated free functions (`__fgfn_1_max`)
    pub func_prefix: String,
    /// Prefix of the formal parameters of a fused method (`__fgarg_0`)
    pub arg_prefix: String,
    /// Name of the method every pipeline type declares
    pub pipeline_method: String,
    /// Extension of dialect source files, without the dot
    pub dialect_extension: String,
    /// File name of the auxiliary unit holding generated declarations
    pub aux_unit_name: String,
}

impl GenerationConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        GenerationConfig {
            fusion: true,
            pipeline_prefix: "__fgpipe_".to_string(),
            type_prefix: "__fgtype_".to_string(),
            func_prefix: "__fgfn_".to_string(),
            arg_prefix: "__fgarg_".to_string(),
            pipeline_method: "pipeline".to_string(),
            dialect_extension: "ply".to_string(),
            aux_unit_name: "fusegen_impls.go".to_string(),
        }
    }

    /// Enable or disable pipeline fusion
    pub fn with_fusion(mut self, fusion: bool) -> Self {
        self.fusion = fusion;
        self
    }

    /// Set the prefix of generated pipeline types
    pub fn set_pipeline_prefix(mut self, prefix: &str) -> Self {
        self.pipeline_prefix = prefix.to_string();
        self
    }

    /// Set the prefix of generated single-method receiver types
    pub fn set_type_prefix(mut self, prefix: &str) -> Self {
        self.type_prefix = prefix.to_string();
        self
    }

    /// Set the prefix of generated functions
    pub fn set_func_prefix(mut self, prefix: &str) -> Self {
        self.func_prefix = prefix.to_string();
        self
    }

    /// Set the prefix of fused-method parameters
    pub fn set_arg_prefix(mut self, prefix: &str) -> Self {
        self.arg_prefix = prefix.to_string();
        self
    }

    /// Set the method name used by pipeline types
    pub fn set_pipeline_method(mut self, name: &str) -> Self {
        self.pipeline_method = name.to_string();
        self
    }

    /// Set the dialect file extension (without the dot)
    pub fn set_dialect_extension(mut self, ext: &str) -> Self {
        self.dialect_extension = ext.trim_start_matches('.').to_string();
        self
    }

    /// Set the auxiliary unit's file name
    pub fn set_aux_unit_name(mut self, name: &str) -> Self {
        self.aux_unit_name = name.to_string();
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let idents = [
            ("pipeline prefix", &self.pipeline_prefix),
            ("type prefix", &self.type_prefix),
            ("function prefix", &self.func_prefix),
            ("argument prefix", &self.arg_prefix),
            ("pipeline method", &self.pipeline_method),
        ];
        for (what, value) in idents {
            if !is_identifier(value) {
                return Err(GenError::InvalidConfig(format!(
                    "{} must be an identifier, got {:?}",
                    what, value
                )));
            }
        }

        // generated names must not collide across kinds
        let prefixes = [&self.pipeline_prefix, &self.type_prefix, &self.func_prefix, &self.arg_prefix];
        for (i, a) in prefixes.iter().enumerate() {
            for b in &prefixes[i + 1..] {
                if a.starts_with(b.as_str()) || b.starts_with(a.as_str()) {
                    return Err(GenError::InvalidConfig(format!(
                        "prefixes {:?} and {:?} overlap",
                        a, b
                    )));
                }
            }
        }

        if self.dialect_extension.is_empty() {
            return Err(GenError::InvalidConfig("dialect extension is empty".to_string()));
        }
        if self.dialect_extension == "go" {
            return Err(GenError::InvalidConfig(
                "dialect extension must differ from the host extension".to_string(),
            ));
        }
        if self.aux_unit_name.is_empty() {
            return Err(GenError::InvalidConfig("auxiliary unit name is empty".to_string()));
        }
        Ok(())
    }

    /// Check whether a path names a dialect source file
    pub fn is_dialect_file(&self, path: &Path) -> bool {
        path.extension()
            .map_or(false, |ext| ext.to_string_lossy() == self.dialect_extension)
    }

    /// Output file name for a dialect source: `dir/foo.ply` becomes `foo.go`
    pub fn output_name(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        format!("{}.go", stem)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
