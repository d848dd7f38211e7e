//! Memory and symbol manager.
//!
//! Allocates VM memory cells to scalars, arrays, parameter cells, and the
//! hidden cells (loop limits, return addresses) codegen needs, and
//! resolves names against a two-level scope (global + at most one active
//! procedure). Allocation is monotonic and deterministic: cell `k` is
//! handed out exactly once, in declaration order, and never reused.

use std::collections::HashMap;

use crate::errors::{CompileError, SourceLocation};

pub type Cell = usize;

#[derive(Debug, Clone)]
pub struct ScalarSymbol {
    pub name: String,
    pub cell: Cell,
    pub is_initialized: bool,
    pub is_const: bool,
    pub is_iterator: bool,
    pub is_param: bool,
    pub is_reference: bool,
}

#[derive(Debug, Clone)]
pub struct ArraySymbol {
    pub name: String,
    /// Base address: a compile-time constant for a procedure's own array,
    /// or (for array-reference parameters) the cell holding the base
    /// address at runtime.
    pub base_cell: Cell,
    pub is_reference: bool,
    /// Compile-time bounds for a procedure's own array. Unknown (and
    /// unused) for reference parameters.
    pub lo: i64,
    pub hi: i64,
    /// For array-reference parameters: the cell holding the caller's low
    /// bound at runtime. The low bound travels alongside the base address
    /// in a second parameter cell, since array indexing needs both.
    pub lo_cell: Option<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamCells {
    /// Scalar/Input formal: one callee cell holding either the value
    /// (Input) or the address of the actual (Scalar/Output).
    Scalar(Cell),
    /// Array formal: base-address cell, and (always, by convention) a
    /// low-bound cell right after it.
    Array { base: Cell, lo: Cell },
}

#[derive(Debug, Clone)]
pub struct ProcedureSymbol {
    pub name: String,
    pub formal_kinds: Vec<FormalKind>,
    pub param_cells: Vec<ParamCells>,
    pub return_cell: Cell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormalKind {
    Scalar,
    Array,
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Scalar(ScalarSymbol),
    Array(ArraySymbol),
}

impl Symbol {
    pub fn is_array(&self) -> bool {
        matches!(self, Symbol::Array(_))
    }

    pub fn as_scalar(&self) -> Option<&ScalarSymbol> {
        match self {
            Symbol::Scalar(s) => Some(s),
            Symbol::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArraySymbol> {
        match self {
            Symbol::Array(a) => Some(a),
            Symbol::Scalar(_) => None,
        }
    }
}

pub type Scope = HashMap<String, Symbol>;

/// Allocates cells and resolves names across a global scope plus at most
/// one active procedure scope. `FOR` loops additionally push/pop a
/// temporary binding within the currently active scope so the iterator
/// name shadows any outer binding only for the loop body.
pub struct MemoryManager {
    global: Scope,
    procedure: Option<Scope>,
    current_scope_name: Option<String>,
    next_cell: Cell,
    pub procedures: HashMap<String, ProcedureSymbol>,
    /// Local scopes of procedures that have already been analyzed, kept
    /// around so code generation can resolve names inside a procedure
    /// body without re-running the analyzer.
    finished_scopes: HashMap<String, Scope>,
}

impl MemoryManager {
    pub fn new() -> Self {
        MemoryManager {
            global: Scope::new(),
            procedure: None,
            current_scope_name: None,
            next_cell: 0,
            procedures: HashMap::new(),
            finished_scopes: HashMap::new(),
        }
    }

    pub fn enter_scope(&mut self, name: &str) {
        self.current_scope_name = Some(name.to_string());
        self.procedure = Some(Scope::new());
    }

    /// Leave the active procedure scope, archiving its bindings so they
    /// can be looked up again later (by code generation) via
    /// [`MemoryManager::enter_finished_scope`].
    pub fn exit_scope(&mut self) {
        if let (Some(name), Some(scope)) = (self.current_scope_name.take(), self.procedure.take())
        {
            self.finished_scopes.insert(name, scope);
        }
    }

    /// Re-enter a procedure's already-analyzed scope, read-only, for code
    /// generation. Panics if `name` was never analyzed: a programmer
    /// error, not a user-facing one.
    pub fn enter_finished_scope(&mut self, name: &str) {
        let scope = self
            .finished_scopes
            .get(name)
            .unwrap_or_else(|| panic!("no analyzed scope for procedure '{}'", name))
            .clone();
        self.current_scope_name = Some(name.to_string());
        self.procedure = Some(scope);
    }

    fn active_scope_mut(&mut self) -> &mut Scope {
        match &mut self.procedure {
            Some(scope) => scope,
            None => &mut self.global,
        }
    }

    fn active_scope(&self) -> &Scope {
        match &self.procedure {
            Some(scope) => scope,
            None => &self.global,
        }
    }

    /// Allocate one fresh cell, monotonically.
    fn alloc_cell(&mut self) -> Cell {
        let cell = self.next_cell;
        self.next_cell += 1;
        cell
    }

    fn alloc_cells(&mut self, count: usize) -> Cell {
        let base = self.next_cell;
        self.next_cell += count;
        base
    }

    pub fn declare_scalar(
        &mut self,
        name: &str,
        line: usize,
    ) -> Result<&ScalarSymbol, CompileError> {
        if self.active_scope().contains_key(name) {
            return Err(duplicate(name, line));
        }
        let cell = self.alloc_cell();
        let symbol = ScalarSymbol {
            name: name.to_string(),
            cell,
            is_initialized: false,
            is_const: false,
            is_iterator: false,
            is_param: false,
            is_reference: false,
        };
        self.active_scope_mut()
            .insert(name.to_string(), Symbol::Scalar(symbol));
        Ok(self.active_scope().get(name).unwrap().as_scalar().unwrap())
    }

    pub fn declare_array(
        &mut self,
        name: &str,
        lo: i64,
        hi: i64,
        line: usize,
    ) -> Result<&ArraySymbol, CompileError> {
        if self.active_scope().contains_key(name) {
            return Err(duplicate(name, line));
        }
        if lo > hi {
            return Err(CompileError::semantic(
                format!("invalid array range [{}:{}] for '{}'", lo, hi, name),
                Some(SourceLocation::new(line)),
            ));
        }
        let size = (hi - lo + 1) as usize;
        let base = self.alloc_cells(size);
        let symbol = ArraySymbol {
            name: name.to_string(),
            base_cell: base,
            is_reference: false,
            lo,
            hi,
            lo_cell: None,
        };
        self.active_scope_mut()
            .insert(name.to_string(), Symbol::Array(symbol));
        Ok(self.active_scope().get(name).unwrap().as_array().unwrap())
    }

    /// Declare a hidden cell (loop limit, return address) that is not
    /// visible to name lookup: it's addressed directly by codegen, never
    /// resolved by name from SL source.
    pub fn declare_hidden_cell(&mut self) -> Cell {
        self.alloc_cell()
    }

    /// Declare a scalar formal parameter. `is_reference` is true for
    /// `Scalar`/`Output` formals (the cell holds the caller's address);
    /// false for `Input` formals (the cell holds a copied-in value).
    pub fn declare_scalar_param(
        &mut self,
        name: &str,
        is_reference: bool,
        is_const: bool,
        line: usize,
    ) -> Result<Cell, CompileError> {
        if self.active_scope().contains_key(name) {
            return Err(duplicate(name, line));
        }
        let cell = self.alloc_cell();
        let symbol = ScalarSymbol {
            name: name.to_string(),
            cell,
            is_initialized: !is_reference,
            is_const,
            is_iterator: false,
            is_param: true,
            is_reference,
        };
        self.active_scope_mut()
            .insert(name.to_string(), Symbol::Scalar(symbol));
        Ok(cell)
    }

    /// Declare an array formal parameter: a reference whose base address
    /// and low bound are passed in two callee cells, rather than allocated
    /// as a fixed-size block.
    pub fn declare_array_param(&mut self, name: &str, line: usize) -> Result<(Cell, Cell), CompileError> {
        if self.active_scope().contains_key(name) {
            return Err(duplicate(name, line));
        }
        let base = self.alloc_cell();
        let lo_cell = self.alloc_cell();
        let symbol = ArraySymbol {
            name: name.to_string(),
            base_cell: base,
            is_reference: true,
            lo: 0,
            hi: 0,
            lo_cell: Some(lo_cell),
        };
        self.active_scope_mut()
            .insert(name.to_string(), Symbol::Array(symbol));
        Ok((base, lo_cell))
    }

    pub fn resolve(&self, name: &str, line: usize) -> Result<&Symbol, CompileError> {
        if let Some(scope) = &self.procedure
            && let Some(sym) = scope.get(name)
        {
            return Ok(sym);
        }
        if let Some(sym) = self.global.get(name) {
            return Ok(sym);
        }
        Err(CompileError::semantic(
            format!("use of undeclared name '{}'", name),
            Some(SourceLocation::new(line)),
        ))
    }

    pub fn resolve_mut(&mut self, name: &str, line: usize) -> Result<&mut Symbol, CompileError> {
        if self
            .procedure
            .as_ref()
            .is_some_and(|scope| scope.contains_key(name))
        {
            return Ok(self.procedure.as_mut().unwrap().get_mut(name).unwrap());
        }
        if self.global.contains_key(name) {
            return Ok(self.global.get_mut(name).unwrap());
        }
        Err(CompileError::semantic(
            format!("use of undeclared name '{}'", name),
            Some(SourceLocation::new(line)),
        ))
    }

    /// Temporarily bind `name` in the active scope (used for FOR
    /// iterators); returns whatever was bound before, to be restored by
    /// [`MemoryManager::restore_binding`] once the loop body has been
    /// processed.
    pub fn shadow_binding(&mut self, name: &str, symbol: Symbol) -> Option<Symbol> {
        self.active_scope_mut().insert(name.to_string(), symbol)
    }

    pub fn restore_binding(&mut self, name: &str, previous: Option<Symbol>) {
        match previous {
            Some(symbol) => {
                self.active_scope_mut().insert(name.to_string(), symbol);
            }
            None => {
                self.active_scope_mut().remove(name);
            }
        }
    }

}

impl Default for MemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

fn duplicate(name: &str, line: usize) -> CompileError {
    CompileError::semantic(
        format!("'{}' already declared in this scope", name),
        Some(SourceLocation::new(line)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_cells_monotonically() {
        let mut mem = MemoryManager::new();
        let a = mem.declare_scalar("a", 1).unwrap().cell;
        let b = mem.declare_scalar("b", 1).unwrap().cell;
        assert_eq!(a, 0);
        assert_eq!(b, 1);
    }

    #[test]
    fn array_reserves_hi_minus_lo_plus_one_cells() {
        let mut mem = MemoryManager::new();
        mem.declare_array("arr", 3, 7, 1).unwrap();
        let next = mem.declare_scalar("after", 1).unwrap().cell;
        assert_eq!(next, 5);
    }

    #[test]
    fn rejects_invalid_array_range() {
        let mut mem = MemoryManager::new();
        let err = mem.declare_array("arr", 5, 2, 1).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn rejects_duplicate_declaration_in_scope() {
        let mut mem = MemoryManager::new();
        mem.declare_scalar("a", 1).unwrap();
        let err = mem.declare_scalar("a", 2).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }

    #[test]
    fn procedure_scope_shadows_but_global_is_still_reachable() {
        let mut mem = MemoryManager::new();
        mem.declare_scalar("g", 1).unwrap();
        mem.enter_scope("p");
        mem.declare_scalar("local", 1).unwrap();
        assert!(mem.resolve("g", 1).is_ok());
        assert!(mem.resolve("local", 1).is_ok());
        mem.exit_scope();
        assert!(mem.resolve("local", 1).is_err());
    }

    #[test]
    fn undeclared_name_is_semantic_error() {
        let mem = MemoryManager::new();
        let err = mem.resolve("nope", 1).unwrap_err();
        assert!(matches!(err, CompileError::Semantic { .. }));
    }
}
