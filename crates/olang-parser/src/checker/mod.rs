//! Semantic analysis for the O language.
//!
//! Two sub-passes run in order: the non-mutating **check** pass
//! ([`analyzer`]) that resolves names, validates inheritance and types, and
//! collects the [`info::ProgramInfo`] registry for the emitter; then the
//! mutating **optimise** pass ([`optimize`]) that removes dead code and
//! folds constant branches, logging each rewrite.

pub mod analyzer;
pub mod builtins;
pub mod error;
pub mod info;
pub mod optimize;
pub mod symbols;

pub use analyzer::{analyze, assignment_compatible, Analysis};
pub use error::{CheckError, CheckWarning};
pub use info::{ClassInfo, CtorInfo, FieldInfo, MethodInfo, ProgramInfo};
pub use optimize::{optimize, Rewrite};
pub use symbols::{Scope, ScopeId, ScopeKind, Symbol, SymbolKind, SymbolTable};
