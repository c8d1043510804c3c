//! The top-level `Module`: a collection of global variables and functions,
//! addressed by name and by dense index.

use std::collections::HashMap;

use crate::ir::function::{Function, Linkage};
use crate::ir::types::Ty;

/// Index of a function within `Module::functions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

/// Index of a global within `Module::globals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(pub u32);

impl FunctionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl GlobalId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A module-scope global variable. The opaque-predicate globals
/// [`crate::passes::opaque_predicate::OpaquePredicateLib`] manufactures are
/// ordinary entries here, addressed by `GlobalId` like any other global —
/// not implicit process-global state.
#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Ty,
    pub initializer: i64,
    pub linkage: Linkage,
}

/// A collection of global variables and functions.
///
/// `PartialEq` compares `functions` and `globals` structurally (derived);
/// `name_to_function` is rebuilt from `functions` by construction so it
/// never needs to participate (and couldn't change the comparison result if
/// it did).
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
    name_to_function: HashMap<String, FunctionId>,
}

impl PartialEq for Module {
    fn eq(&self, other: &Self) -> bool {
        self.functions == other.functions && self.globals == other.globals
    }
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, f: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.name_to_function.insert(f.name.clone(), id);
        self.functions.push(f);
        id
    }

    pub fn add_global(&mut self, g: Global) -> GlobalId {
        let id = GlobalId(self.globals.len() as u32);
        self.globals.push(g);
        id
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.index()]
    }

    pub fn function_id_by_name(&self, name: &str) -> Option<FunctionId> {
        self.name_to_function.get(name).copied()
    }

    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> + '_ {
        (0..self.functions.len() as u32).map(FunctionId)
    }

    /// Re-indexes `name_to_function` after a bulk rename (e.g. `Copy`
    /// inserting a clone under a derived name); call after mutating any
    /// `Function::name` in place.
    pub fn reindex_names(&mut self) {
        self.name_to_function.clear();
        for (i, f) in self.functions.iter().enumerate() {
            self.name_to_function.insert(f.name.clone(), FunctionId(i as u32));
        }
    }
}
