//! Signature registry.
//!
//! Maps function names to their prototypes for the whole compilation run.
//! Prototypes are registered before any body is lowered, which is what lets
//! calls refer to functions defined later or to each other.

use std::collections::HashMap;

use tracing::debug;

use crate::ast::statements::Prototype;

#[derive(Debug, Default, Clone)]
pub struct SignatureRegistry {
    prototypes: HashMap<String, Prototype>,
}

impl SignatureRegistry {
    pub fn new() -> Self {
        SignatureRegistry::default()
    }

    /// Registers `proto` under its name.
    ///
    /// There is no duplicate detection: the last registration wins and the
    /// displaced prototype is returned.
    pub fn register(&mut self, proto: Prototype) -> Option<Prototype> {
        let previous = self.prototypes.insert(proto.name.clone(), proto);

        if let Some(previous) = previous
            .as_ref()
            .filter(|previous| self.prototypes.get(&previous.name) != Some(*previous))
        {
            debug!(
                function = %previous.name,
                previous = %previous.type_as_string,
                "signature overwritten"
            );
        }

        previous
    }

    pub fn get(&self, name: &str) -> Option<&Prototype> {
        self.prototypes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.prototypes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.prototypes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
