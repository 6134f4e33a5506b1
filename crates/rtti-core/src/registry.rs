//! Process-wide identity table for nominal declarations.
//!
//! The first reflection of an interface or class records its token here so
//! that code holding only a [`TokenId`] (for example the metadata store) can
//! find the declaration again. Entries are never removed.

use crate::format::{Descriptor, TokenId};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::trace;

static GLOBAL: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Append-only `TokenId -> Descriptor` table.
///
/// Uses `DashMap` so descriptors can be reflected from several threads.
///
/// ```ignore
/// let iface = InterfaceBuilder::new("User").build();
/// reflect(&iface);
/// let found = lookup_nominal(iface.nominal_token().unwrap());
/// ```
pub struct TypeRegistry {
    entries: DashMap<TokenId, Descriptor>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// The table populated by [`crate::reflect::reflect`].
    pub fn global() -> &'static TypeRegistry {
        &GLOBAL
    }

    /// Record an interface or class declaration.
    ///
    /// Returns `true` when the token was not known before. Other kinds are
    /// ignored. A token keeps the first descriptor registered for it.
    pub fn register(&self, desc: &Descriptor) -> bool {
        let Some(token) = desc.nominal_token() else {
            return false;
        };
        if !desc.kind().is_declaration_with_members() {
            return false;
        }
        if self.entries.contains_key(&token) {
            return false;
        }
        trace!(token = %token, discriminant = %desc.discriminant(), "TypeRegistry::register");
        self.entries.entry(token).or_insert_with(|| desc.clone());
        true
    }

    pub fn get(&self, token: TokenId) -> Option<Descriptor> {
        self.entries.get(&token).map(|entry| entry.clone())
    }

    pub fn contains(&self, token: TokenId) -> bool {
        self.entries.contains_key(&token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find a reflected interface or class by its token in the global table.
pub fn lookup_nominal(token: TokenId) -> Option<Descriptor> {
    TypeRegistry::global().get(token)
}
