//! Metadata store boundary.
//!
//! Producers publish descriptors under a declaration token, optionally scoped
//! to one property of that declaration. The core only ever reads single keys
//! from the store and never enumerates it.

use crate::error::TypeError;
use crate::format::{Descriptor, Lazy, TokenId, TypeData};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// Address of one stored descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MetadataKey {
    pub target: TokenId,
    pub property: Option<Arc<str>>,
}

impl MetadataKey {
    /// The declaration itself.
    pub fn declaration(target: TokenId) -> Self {
        Self {
            target,
            property: None,
        }
    }

    /// One property of the declaration.
    pub fn property(target: TokenId, property: &str) -> Self {
        Self {
            target,
            property: Some(property.into()),
        }
    }
}

/// Keyed storage for lazily evaluated descriptors.
pub trait MetadataStore: Send + Sync {
    fn get(&self, key: &MetadataKey) -> Option<Lazy>;

    fn set(&self, key: MetadataKey, value: Lazy);

    /// Force the stored thunk, if any.
    fn get_descriptor(&self, key: &MetadataKey) -> Option<Result<Descriptor, TypeError>> {
        self.get(key).map(|lazy| lazy.force())
    }
}

/// `DashMap`-backed [`MetadataStore`].
#[derive(Default)]
pub struct InMemoryMetadataStore {
    entries: DashMap<MetadataKey, Lazy>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, key: &MetadataKey) -> Option<Lazy> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: MetadataKey, value: Lazy) {
        trace!(target_token = %key.target, property = ?key.property, "InMemoryMetadataStore::set");
        self.entries.insert(key, value);
    }
}

/// Publish a declaration and its members' types under the declaration's
/// token. Returns the token, or `None` for anonymous descriptors.
pub fn publish(store: &dyn MetadataStore, desc: &Descriptor) -> Option<TokenId> {
    let token = desc.nominal_token()?;
    store.set(MetadataKey::declaration(token), Lazy::resolved(desc.clone()));
    let members = match desc.data() {
        TypeData::Interface(iface) => iface.members.as_slice(),
        TypeData::Class(class) => class.members.as_slice(),
        _ => &[],
    };
    for member in members {
        store.set(MetadataKey::property(token, &member.name), member.ty.clone());
    }
    Some(token)
}
