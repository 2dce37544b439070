//! Symbol table for name resolution.
//!
//! Provides lexically scoped symbol tables with parent links. Scopes are
//! stack-structured: created on entering a class, method, or block, and
//! popped on exit. The global scope is pre-populated with the built-in
//! class names.

use crate::token::Span;
use rustc_hash::FxHashMap;

/// Symbol kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Class declaration
    Class,
    /// Method declaration
    Method,
    /// Constructor declaration
    Constructor,
    /// Variable binding (field or local)
    Variable,
    /// Formal parameter
    Parameter,
}

/// Symbol information.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Symbol name
    pub name: String,
    /// Symbol kind
    pub kind: SymbolKind,
    /// Declared type, when one is known
    pub declared_type: Option<String>,
    /// Whether any use site resolved to this symbol
    pub used: bool,
    /// Source location of the declaration
    pub span: Span,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        declared_type: Option<String>,
        span: Span,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            declared_type,
            used: false,
            span,
        }
    }
}

/// Scope identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

/// Scope kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Class,
    Method,
    Block,
}

/// Scope in the scope tree.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Parent scope (None for the global scope)
    pub parent: Option<ScopeId>,
    /// Symbols defined in this scope
    pub symbols: FxHashMap<String, Symbol>,
    /// Definition order, for deterministic reporting
    order: Vec<String>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Scope {
            id,
            kind,
            parent,
            symbols: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Symbols in definition order.
    pub fn symbols_in_order(&self) -> impl Iterator<Item = &Symbol> {
        self.order.iter().filter_map(|name| self.symbols.get(name))
    }
}

/// The built-in class names seeded into the global scope.
pub const BUILTIN_CLASS_NAMES: &[&str] = &[
    "Object", "Integer", "Real", "Boolean", "String", "Array", "List",
];

/// Error indicating a duplicate definition within a single scope.
#[derive(Debug, Clone)]
pub struct DuplicateSymbolError {
    pub name: String,
    pub original: Span,
    pub duplicate: Span,
}

/// Symbol table with a scope tree.
pub struct SymbolTable {
    /// All scopes, indexed by ScopeId
    scopes: Vec<Scope>,
    /// Current scope ID
    current_scope: ScopeId,
}

impl SymbolTable {
    /// Create a symbol table whose global scope holds the built-in classes.
    pub fn new() -> Self {
        let mut global = Scope::new(ScopeId(0), ScopeKind::Global, None);
        for name in BUILTIN_CLASS_NAMES {
            global.order.push((*name).to_string());
            global.symbols.insert(
                (*name).to_string(),
                Symbol::new(*name, SymbolKind::Class, None, Span::default()),
            );
        }

        SymbolTable {
            scopes: vec![global],
            current_scope: ScopeId(0),
        }
    }

    /// Push a new scope as a child of the current scope.
    pub fn push_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, kind, Some(self.current_scope)));
        self.current_scope = id;
        id
    }

    /// Pop the current scope, returning to its parent.
    ///
    /// Does nothing if already at the global scope.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current_scope.0 as usize].parent {
            self.current_scope = parent;
        }
    }

    /// Define a symbol in the current scope.
    ///
    /// Fails if a symbol with the same name already exists in this scope;
    /// shadowing an outer scope is permitted.
    pub fn define(&mut self, symbol: Symbol) -> Result<(), DuplicateSymbolError> {
        let scope = &mut self.scopes[self.current_scope.0 as usize];

        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(DuplicateSymbolError {
                name: symbol.name.clone(),
                original: existing.span,
                duplicate: symbol.span,
            });
        }

        scope.order.push(symbol.name.clone());
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Resolve a symbol by name, walking up the scope chain; first hit wins.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.resolve_from_scope(name, self.current_scope)
    }

    /// Resolve a symbol by name starting from a specific scope.
    pub fn resolve_from_scope(&self, name: &str, mut scope_id: ScopeId) -> Option<&Symbol> {
        loop {
            let scope = &self.scopes[scope_id.0 as usize];
            if let Some(symbol) = scope.symbols.get(name) {
                return Some(symbol);
            }
            match scope.parent {
                Some(parent) => scope_id = parent,
                None => return None,
            }
        }
    }

    /// Mark the nearest definition of `name` as used.
    pub fn mark_used(&mut self, name: &str) {
        self.mark_used_from(name, self.current_scope)
    }

    /// Mark the nearest definition of `name` as used, starting the walk
    /// from a specific scope (`this.name` targets the class scope directly,
    /// bypassing any shadowing local).
    pub fn mark_used_from(&mut self, name: &str, scope_id: ScopeId) {
        let mut scope_id = scope_id;
        loop {
            let scope = &mut self.scopes[scope_id.0 as usize];
            if let Some(symbol) = scope.symbols.get_mut(name) {
                symbol.used = true;
                return;
            }
            match scope.parent {
                Some(parent) => scope_id = parent,
                None => return,
            }
        }
    }

    /// Get the current scope.
    pub fn current(&self) -> &Scope {
        &self.scopes[self.current_scope.0 as usize]
    }

    /// Get the current scope ID.
    pub fn current_scope_id(&self) -> ScopeId {
        self.current_scope
    }

    /// Get a scope by ID.
    pub fn get_scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
