//! Function catalog
//!
//! The set of functions a host can instantiate: the built-in translation
//! functions plus any loaded from definitions files.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::WxError;
use crate::export;
use crate::function::Function;
use crate::translate;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    functions: Vec<Arc<Function>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the three translation functions
    pub fn builtin() -> Result<Self, WxError> {
        let mut catalog = Self::new();
        for function in translate::builtin()? {
            catalog.insert(function)?;
        }
        Ok(catalog)
    }

    /// Add a validated function; names must be unique
    pub fn insert(&mut self, function: Function) -> Result<(), WxError> {
        function.validate()?;
        if self.get(&function.name).is_some() {
            return Err(WxError::DuplicateFunction {
                name: function.name.to_string(),
            });
        }
        self.functions.push(Arc::new(function));
        Ok(())
    }

    /// Add every function from a definitions file
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize, WxError> {
        let functions = export::load_file(path)?;
        let count = functions.len();
        for function in functions {
            self.insert(function)?;
        }
        info!(path = %path.display(), count, "added definitions");
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.iter().find(|f| f.name == name).cloned()
    }

    /// Like [`get`](Self::get) but an unknown name is an error
    pub fn require(&self, name: &str) -> Result<Arc<Function>, WxError> {
        self.get(name).ok_or_else(|| WxError::UnknownFunction {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter().map(|f| f.as_ref())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
