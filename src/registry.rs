//! Operator catalog. Operators are immutable singletons registered once at
//! startup; nodes hold shared handles into the registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::operator::{Operator, check_param_ids};
use crate::operators;

pub struct Registry {
    operators: BTreeMap<String, Arc<dyn Operator>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            operators: BTreeMap::new(),
        }
    }

    /// A registry populated with the built-in operator library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for op in operators::catalog() {
            registry.register(op);
        }
        registry
    }

    /// Install an operator under its id. Declaration mistakes (duplicate
    /// parameter ids, id collisions) are programmer errors and panic here
    /// rather than surfacing at build time.
    pub fn register(&mut self, op: Arc<dyn Operator>) {
        if let Err(err) = check_param_ids(op.id(), op.params()) {
            panic!("{err}");
        }
        let prior = self.operators.insert(op.id().to_string(), op);
        if let Some(prior) = prior {
            panic!("duplicate operator id registered: {}", prior.id());
        }
    }

    pub fn has(&self, id: &str) -> bool {
        self.operators.contains_key(id)
    }

    /// Look up an operator by id. Unknown ids are an error; document loading
    /// treats this as fatal.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Operator>> {
        self.operators
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow!("unknown operator id: {id}"))
    }

    /// All registered operators, ordered by id.
    pub fn list(&self) -> impl Iterator<Item = &Arc<dyn Operator>> {
        self.operators.values()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
