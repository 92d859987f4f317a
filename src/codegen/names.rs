//! Generated-name allocation
//!
//! Names are `<prefix><counter>` for pipelines and `<prefix><counter>_<op>`
//! for everything else, with one counter per declaration kind. The allocator
//! remembers every instantiation signature it has named, so a repeated
//! instantiation gets its existing name back instead of a new declaration.

use std::collections::HashMap;

use crate::config::GenerationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    /// A fused pipeline type and its method
    Pipeline,
    /// A receiver type carrying one builtin method
    Method,
    /// A free function
    Func,
}

/// Result of naming an instantiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    Fresh(String),
    Existing(String),
}

impl Allocation {
    pub fn name(&self) -> &str {
        match self {
            Allocation::Fresh(name) | Allocation::Existing(name) => name,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Allocation::Fresh(_))
    }
}

#[derive(Debug, Clone)]
pub struct NameAllocator {
    pipeline_prefix: String,
    type_prefix: String,
    func_prefix: String,
    counters: HashMap<DeclKind, usize>,
    /// Maps (kind, instantiation signature) to the name it was given
    instances: HashMap<(DeclKind, String), String>,
}

impl NameAllocator {
    pub fn new(config: &GenerationConfig) -> Self {
        NameAllocator {
            pipeline_prefix: config.pipeline_prefix.clone(),
            type_prefix: config.type_prefix.clone(),
            func_prefix: config.func_prefix.clone(),
            counters: HashMap::new(),
            instances: HashMap::new(),
        }
    }

    /// Name an instantiation, reusing the name of an identical earlier one
    pub fn instantiate(&mut self, kind: DeclKind, op: &str, signature: &str) -> Allocation {
        let key = (kind, signature.to_string());
        if let Some(name) = self.instances.get(&key) {
            return Allocation::Existing(name.clone());
        }

        let name = self.generate_name(kind, op);
        self.instances.insert(key, name.clone());
        Allocation::Fresh(name)
    }

    fn generate_name(&mut self, kind: DeclKind, op: &str) -> String {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        match kind {
            DeclKind::Pipeline => format!("{}{}", self.pipeline_prefix, counter),
            DeclKind::Method => format!("{}{}_{}", self.type_prefix, counter, op),
            DeclKind::Func => format!("{}{}_{}", self.func_prefix, counter, op),
        }
    }

    /// Number of distinct instantiations named so far
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
