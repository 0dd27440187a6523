use std::fmt::Display;

use log::trace;

use crate::{
    compile::ast::{SourcePos, Type},
    datstructures::scope_stack::{ScopeId, ScopeStack},
};

pub const GLOBAL_SCOPE: ScopeId = 0;

/// Where the emitter placed a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    Global(String),
    Stack(String),
}

impl Display for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global(name) => write!(f, "@{name}"),
            Self::Stack(name) => write!(f, "%{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarSymbol {
    pub name: String,
    pub ty: Type,
    storage: Option<Storage>,
}

impl VarSymbol {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        VarSymbol {
            name: name.into(),
            ty,
            storage: None,
        }
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    /// Binds the storage tag. Returns `false` if one was already bound.
    #[must_use]
    pub fn bind_storage(&mut self, storage: Storage) -> bool {
        if self.storage.is_some() {
            return false;
        }

        self.storage = Some(storage);
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncSymbol {
    pub name: String,
    pub ret: Type,
    pub params: Vec<(Type, String)>,
    /// Location of the definition; `None` while only declared.
    pub body: Option<SourcePos>,
}

impl FuncSymbol {
    pub fn is_defined(&self) -> bool {
        self.body.is_some()
    }

    pub fn param_types(&self) -> impl Iterator<Item = Type> + '_ {
        self.params.iter().map(|(ty, _)| *ty)
    }

    pub fn same_signature(&self, ret: Type, params: &[(Type, String)]) -> bool {
        self.ret == ret && self.params == params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Func,
}

impl Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Var => write!(f, "variable"),
            Self::Func => write!(f, "function"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Var(VarSymbol),
    Func(FuncSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Self::Var(var) => &var.name,
            Self::Func(func) => &func.name,
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            Self::Var(_) => SymbolKind::Var,
            Self::Func(_) => SymbolKind::Func,
        }
    }

    pub fn as_var(&self) -> Option<&VarSymbol> {
        match self {
            Self::Var(var) => Some(var),
            Self::Func(_) => None,
        }
    }

    pub fn as_var_mut(&mut self) -> Option<&mut VarSymbol> {
        match self {
            Self::Var(var) => Some(var),
            Self::Func(_) => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncSymbol> {
        match self {
            Self::Func(func) => Some(func),
            Self::Var(_) => None,
        }
    }

}

/// Name resolution for both passes.
///
/// The bottom frame holds globals and lives as long as the table. Every
/// function activation pushes frames under its own scope id; nested blocks
/// reuse that id, so a lookup sees the whole function's open blocks before
/// falling through to the globals.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: ScopeStack<String, Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            scopes: ScopeStack::new(GLOBAL_SCOPE),
        }
    }

    /// Drops every binding, including the globals.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn enter_scope(&mut self, id: ScopeId) {
        trace!("enter scope {id} (depth {})", self.scopes.depth() + 1);
        self.scopes.push(id);
    }

    pub fn exit_scope(&mut self) {
        if self.scopes.pop() {
            trace!("exit scope (depth {})", self.scopes.depth());
        }
    }

    pub fn current_id(&self) -> ScopeId {
        self.scopes.current_id()
    }

    pub fn depth(&self) -> usize {
        self.scopes.depth()
    }

    #[must_use]
    pub fn insert_global(&mut self, symbol: Symbol) -> bool {
        trace!("insert global {} `{}`", symbol.kind(), symbol.name());
        self.scopes
            .insert_root(symbol.name().to_string(), symbol)
            .is_ok()
    }

    #[must_use]
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        trace!(
            "insert {} `{}` in scope {}",
            symbol.kind(),
            symbol.name(),
            self.current_id()
        );
        self.scopes
            .insert_top(symbol.name().to_string(), symbol)
            .is_ok()
    }

    pub fn lookup_global(&self, name: &str) -> Option<&Symbol> {
        self.scopes.get_root(name)
    }

    pub fn lookup_global_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.scopes.get_root_mut(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.get(name)
    }

    /// Looks only at the frames of the current activation, without the
    /// global fallback.
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes.get_in_activation(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Symbol {
        Symbol::Var(VarSymbol::new(name, Type::Int))
    }

    #[test]
    fn fresh_table_only_holds_the_global_frame() {
        let table = SymbolTable::new();
        assert_eq!(table.depth(), 1);
        assert_eq!(table.current_id(), GLOBAL_SCOPE);
    }

    #[test]
    fn exit_scope_keeps_the_global_frame() {
        let mut table = SymbolTable::new();
        assert!(table.insert_global(var("g")));

        table.exit_scope();
        table.exit_scope();

        assert_eq!(table.depth(), 1);
        assert!(table.lookup_global("g").is_some());
    }

    #[test]
    fn insert_rejects_duplicates_in_target_frame() {
        let mut table = SymbolTable::new();
        assert!(table.insert_global(var("x")));
        assert!(!table.insert_global(var("x")));

        table.enter_scope(1);
        assert!(table.insert(var("x")));
        assert!(!table.insert(var("x")));
    }

    #[test]
    fn block_names_are_visible_until_the_block_closes() {
        let mut table = SymbolTable::new();
        table.enter_scope(1);
        assert!(table.insert(var("a")));

        table.enter_scope(1);
        assert!(table.insert(var("b")));
        table.enter_scope(1);
        assert!(table.lookup("a").is_some());
        assert!(table.lookup("b").is_some());
        table.exit_scope();
        assert!(table.lookup("b").is_some());
        table.exit_scope();

        assert!(table.lookup("b").is_none());
        assert!(table.lookup("a").is_some());
    }

    #[test]
    fn other_activation_never_leaks() {
        let mut table = SymbolTable::new();
        table.enter_scope(1);
        assert!(table.insert(var("local")));
        table.enter_scope(2);

        assert!(table.lookup("local").is_none());
        assert!(table.lookup_local("local").is_none());
    }

    #[test]
    fn lookup_falls_back_to_globals() {
        let mut table = SymbolTable::new();
        assert!(table.insert_global(var("g")));
        table.enter_scope(1);

        assert!(table.lookup("g").is_some());
        assert!(table.lookup_local("g").is_none());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut table = SymbolTable::new();
        assert!(table.insert_global(var("g")));
        table.enter_scope(3);
        assert!(table.insert(var("x")));

        table.reset();

        assert_eq!(table.depth(), 1);
        assert!(table.lookup("g").is_none());
        assert!(table.lookup("x").is_none());
    }

    #[test]
    fn storage_binds_once() {
        let mut sym = VarSymbol::new("x", Type::Float);
        assert!(sym.bind_storage(Storage::Stack("x.addr.0".into())));
        assert!(!sym.bind_storage(Storage::Stack("x.addr.1".into())));
        assert_eq!(sym.storage().unwrap().to_string(), "%x.addr.0");
    }
}
