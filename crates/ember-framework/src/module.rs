//! Modules: named, independently reloadable collections of handlers.
//!
//! A [`Module`] is built from a [`ModuleSource`]'s declarations in one shot
//! and installed into the registry behind an `Arc`. Reload never mutates a
//! live module; it builds a replacement and swaps it in, so dispatch
//! iterations over the old value stay consistent.

use std::sync::Arc;

use crate::error::LoadError;
use crate::handler::{Handler, HandlerDecl};

/// Produces the handler declarations for one named module.
///
/// Sources are registered with the registry once; every load and reload
/// calls [`handlers`](ModuleSource::handlers) again, so a source may
/// re-discover its declarations (and may fail, which aborts that module's
/// load without touching the installed version).
pub trait ModuleSource: Send + Sync {
    /// The unique module name.
    fn name(&self) -> &str;

    /// Produces the module's handler declarations.
    fn handlers(&self) -> Result<Vec<HandlerDecl>, LoadError>;
}

/// A loaded module: a name and its compiled handlers.
///
/// Handler order is insertion order, preserved for listing; dispatch
/// precedence does not depend on it.
pub struct Module {
    name: String,
    handlers: Vec<Handler>,
}

impl Module {
    /// Compiles a full set of declarations into a module.
    ///
    /// Fails on the first pattern that does not compile or on a duplicate
    /// handler name; the caller then keeps whatever module was previously
    /// installed.
    pub(crate) fn build(name: &str, decls: Vec<HandlerDecl>) -> Result<Arc<Self>, LoadError> {
        let mut handlers: Vec<Handler> = Vec::with_capacity(decls.len());

        for decl in &decls {
            if handlers.iter().any(|h| h.name() == decl.name()) {
                return Err(LoadError::DuplicateHandler {
                    module: name.to_string(),
                    handler: decl.name().to_string(),
                });
            }
            handlers.push(decl.compile()?);
        }

        Ok(Arc::new(Self {
            name: name.to_string(),
            handlers,
        }))
    }

    /// The module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterates handlers in insertion order.
    pub fn handlers(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.iter()
    }

    /// Looks up a handler by name.
    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.name() == name)
    }

    /// The number of handlers in this module.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field(
                "handlers",
                &self.handlers.iter().map(Handler::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A [`ModuleSource`] backed by a fixed declaration list.
///
/// Convenient for modules whose handlers are known statically, and for
/// tests that need a source failing on demand.
pub struct StaticModule {
    name: String,
    decls: Vec<HandlerDecl>,
}

impl StaticModule {
    /// Creates a source with no handlers.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            decls: Vec::new(),
        }
    }

    /// Adds a handler declaration.
    pub fn handler(mut self, decl: HandlerDecl) -> Self {
        self.decls.push(decl);
        self
    }
}

impl ModuleSource for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn handlers(&self) -> Result<Vec<HandlerDecl>, LoadError> {
        Ok(self.decls.clone())
    }
}
