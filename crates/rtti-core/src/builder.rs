//! Mutable builders that produce immutable descriptors.
//!
//! ```ignore
//! let mut point = InterfaceBuilder::new("Point");
//! point
//!     .add_property("x", Descriptor::number(), Flags::empty())
//!     .add_property("y", Descriptor::number(), Flags::empty());
//! let desc = point.build();
//! ```
//!
//! Member lists allow duplicate names; readers keep the last one, so a later
//! `add_property` or `extend` overrides an earlier member of the same name.

use crate::error::TypeError;
use crate::flags::Flags;
use crate::format::{
    AliasRef, ClassRef, Constructor, Descriptor, InterfaceRef, Lazy, Member, NominalToken,
    TupleElement, TypeData, TypeSlot,
};
use crate::reflect::{TypeKind, reflect};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::trace;

/// Free-form metadata attached to a declaration or member.
pub type MetadataMap = IndexMap<String, serde_json::Value>;

/// One entry of a plain property map passed to `extend`.
#[derive(Clone, Debug)]
pub enum PropertySpec {
    /// A required property of this type.
    Value(Descriptor),
    Typed { ty: Descriptor, flags: Flags },
}

impl From<Descriptor> for PropertySpec {
    fn from(ty: Descriptor) -> Self {
        Self::Value(ty)
    }
}

/// Plain values become literal types.
impl From<serde_json::Value> for PropertySpec {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(literal_from_json(&value))
    }
}

/// Where `extend` copies members from.
pub enum ExtendSource<'a> {
    Builder(&'a MemberList),
    Map(IndexMap<String, PropertySpec>),
    Type(&'a Descriptor),
}

/// The literal type of a plain JSON value.
///
/// Arrays become tuples and objects become object shapes of literals.
pub fn literal_from_json(value: &serde_json::Value) -> Descriptor {
    match value {
        serde_json::Value::Null => Descriptor::null(),
        serde_json::Value::Bool(true) => Descriptor::true_(),
        serde_json::Value::Bool(false) => Descriptor::false_(),
        serde_json::Value::Number(n) => Descriptor::literal_number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Descriptor::literal_str(s),
        serde_json::Value::Array(items) => Descriptor::tuple(
            items
                .iter()
                .map(|item| TupleElement::new(literal_from_json(item)))
                .collect(),
        ),
        serde_json::Value::Object(map) => Descriptor::object_shape(
            map.iter()
                .map(|(name, item)| Member::new(name.as_str(), literal_from_json(item), Flags::empty()))
                .collect(),
        ),
    }
}

// =============================================================================
// MemberList
// =============================================================================

/// Ordered member list shared by the object-like builders.
#[derive(Clone, Debug, Default)]
pub struct MemberList {
    members: Vec<Member>,
    metadata: IndexMap<Arc<str>, MetadataMap>,
}

impl MemberList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_property(&mut self, name: &str, ty: impl Into<Lazy>, flags: Flags) -> &mut Self {
        self.members.push(Member::new(name, ty, flags));
        self
    }

    /// Members in insertion order, duplicates included.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn set_member_metadata(&mut self, member: &str, key: &str, value: serde_json::Value) {
        self.metadata
            .entry(Arc::from(member))
            .or_default()
            .insert(key.to_owned(), value);
    }

    pub fn member_metadata(&self, member: &str) -> Option<&MetadataMap> {
        self.metadata.get(member)
    }

    fn extend_members(&mut self, members: &[Member]) {
        self.members.extend(members.iter().cloned());
    }

    /// Copy members from a builder or a plain map. Type sources are handled
    /// by the owning builder.
    fn extend_plain(&mut self, source: &ExtendSource<'_>) -> bool {
        match source {
            ExtendSource::Builder(other) => {
                self.extend_members(&other.members);
                for (member, meta) in &other.metadata {
                    let entry = self.metadata.entry(Arc::clone(member)).or_default();
                    entry.extend(meta.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
                true
            }
            ExtendSource::Map(map) => {
                for (name, spec) in map {
                    match spec {
                        PropertySpec::Value(ty) => {
                            self.add_property(name, ty.clone(), Flags::empty())
                        }
                        PropertySpec::Typed { ty, flags } => {
                            self.add_property(name, ty.clone(), *flags)
                        }
                    };
                }
                true
            }
            ExtendSource::Type(_) => false,
        }
    }
}

/// Resolve an `extend` type source, failing unless its kind is accepted.
fn extend_kind(
    target: &'static str,
    desc: &Descriptor,
    accepted: &[TypeKind],
) -> Result<(TypeKind, Descriptor), TypeError> {
    let resolved = reflect(desc).resolve_type()?;
    let kind = resolved.own_kind();
    if accepted.contains(&kind) {
        Ok((kind, resolved.into_descriptor()))
    } else {
        Err(TypeError::IncompatibleExtendKind { target, from: kind })
    }
}

fn own_members(desc: &Descriptor) -> &[Member] {
    match desc.data() {
        TypeData::Object(members) => members,
        TypeData::Interface(iface) => &iface.members,
        TypeData::Class(class) => &class.members,
        _ => &[],
    }
}

macro_rules! member_builder_methods {
    () => {
        pub fn add_property(&mut self, name: &str, ty: impl Into<Lazy>, flags: Flags) -> &mut Self {
            self.members.add_property(name, ty, flags);
            self
        }

        /// Add a method member with the given signature.
        pub fn add_method(
            &mut self,
            name: &str,
            params: Vec<Member>,
            returns: impl Into<Lazy>,
            flags: Flags,
        ) -> &mut Self {
            let signature = Descriptor::function(params, returns, flags - Flags::OPTIONAL);
            self.members.add_property(name, signature, flags | Flags::METHOD);
            self
        }

        pub fn member_list(&self) -> &MemberList {
            &self.members
        }

        pub fn set_metadata(&mut self, key: &str, value: serde_json::Value) -> &mut Self {
            self.metadata.insert(key.to_owned(), value);
            self
        }

        pub fn metadata(&self) -> &MetadataMap {
            &self.metadata
        }

        pub fn set_member_metadata(
            &mut self,
            member: &str,
            key: &str,
            value: serde_json::Value,
        ) -> &mut Self {
            self.members.set_member_metadata(member, key, value);
            self
        }

        pub fn member_metadata(&self, member: &str) -> Option<&MetadataMap> {
            self.members.member_metadata(member)
        }
    };
}

// =============================================================================
// ObjectBuilder
// =============================================================================

/// Builds anonymous object shapes.
#[derive(Clone, Debug, Default)]
pub struct ObjectBuilder {
    members: MemberList,
    metadata: MetadataMap,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    member_builder_methods!();

    /// Copy members from another builder, a plain map or an object type.
    pub fn extend(&mut self, source: ExtendSource<'_>) -> Result<&mut Self, TypeError> {
        if !self.members.extend_plain(&source) {
            if let ExtendSource::Type(desc) = source {
                let (_, resolved) = extend_kind("object", desc, &[TypeKind::Object])?;
                self.members.extend_members(own_members(&resolved));
            }
        }
        Ok(self)
    }

    pub fn build(&self) -> Descriptor {
        Descriptor::object_shape(self.members.members.clone())
    }
}

// =============================================================================
// InterfaceBuilder
// =============================================================================

/// Builds interface declarations. The token is fixed at construction, so
/// every `build()` yields the same nominal identity.
#[derive(Clone, Debug)]
pub struct InterfaceBuilder {
    token: NominalToken,
    type_params: Vec<Arc<str>>,
    members: MemberList,
    extends: Vec<Lazy>,
    metadata: MetadataMap,
}

impl InterfaceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            token: NominalToken::new(name),
            type_params: Vec::new(),
            members: MemberList::new(),
            extends: Vec::new(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn token(&self) -> &NominalToken {
        &self.token
    }

    member_builder_methods!();

    /// Declare a type parameter and return a reference to it.
    pub fn type_param(&mut self, name: &str) -> Descriptor {
        self.type_params.push(Arc::from(name));
        Descriptor::type_variable(name)
    }

    /// Add an inherited interface (`interface A extends B`).
    pub fn extends(&mut self, parent: impl Into<Lazy>) -> &mut Self {
        self.extends.push(parent.into());
        self
    }

    /// Copy members from a builder, a plain map or an object shape; an
    /// interface type source becomes an inherited interface.
    pub fn extend(&mut self, source: ExtendSource<'_>) -> Result<&mut Self, TypeError> {
        if !self.members.extend_plain(&source) {
            if let ExtendSource::Type(desc) = source {
                let (kind, resolved) =
                    extend_kind("interface", desc, &[TypeKind::Object, TypeKind::Interface])?;
                match kind {
                    TypeKind::Interface => self.extends.push(Lazy::resolved(desc.clone())),
                    _ => self.members.extend_members(own_members(&resolved)),
                }
            }
        }
        Ok(self)
    }

    pub fn build(&self) -> Descriptor {
        trace!(interface = self.token.name(), members = self.members.len(), "InterfaceBuilder::build");
        Descriptor::interface(InterfaceRef {
            token: self.token.clone(),
            type_params: self.type_params.clone(),
            members: self.members.members.clone(),
            extends: self.extends.clone(),
        })
    }
}

// =============================================================================
// ClassBuilder
// =============================================================================

/// Builds class declarations together with their runtime constructor.
#[derive(Clone, Debug)]
pub struct ClassBuilder {
    constructor: Constructor,
    type_params: Vec<Arc<str>>,
    members: MemberList,
    extends: Option<Lazy>,
    implements: Vec<Lazy>,
    flags: Flags,
    metadata: MetadataMap,
}

impl ClassBuilder {
    pub fn new(name: &str) -> Self {
        Self::with_constructor(Constructor::new(name), None)
    }

    /// A class deriving from `parent`, which must be a class type.
    pub fn subclass(name: &str, parent: &Descriptor) -> Result<Self, TypeError> {
        let resolved = reflect(parent).resolve_type()?;
        let TypeData::Class(parent_class) = resolved.descriptor().data() else {
            return Err(TypeError::IncompatibleExtendKind {
                target: "class",
                from: resolved.own_kind(),
            });
        };
        let constructor = Constructor::with_parent(name, &parent_class.constructor);
        Ok(Self::with_constructor(constructor, Some(Lazy::resolved(parent.clone()))))
    }

    fn with_constructor(constructor: Constructor, extends: Option<Lazy>) -> Self {
        Self {
            constructor,
            type_params: Vec::new(),
            members: MemberList::new(),
            extends,
            implements: Vec::new(),
            flags: Flags::empty(),
            metadata: MetadataMap::new(),
        }
    }

    /// Runtime constructor for creating instances of this class.
    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    member_builder_methods!();

    pub fn type_param(&mut self, name: &str) -> Descriptor {
        self.type_params.push(Arc::from(name));
        Descriptor::type_variable(name)
    }

    pub fn implements(&mut self, iface: impl Into<Lazy>) -> &mut Self {
        self.implements.push(iface.into());
        self
    }

    pub fn flags(&mut self, flags: Flags) -> &mut Self {
        self.flags |= flags;
        self
    }

    /// Copy members from a builder, a plain map, an object shape or an
    /// interface. Use [`ClassBuilder::subclass`] to derive from a class.
    pub fn extend(&mut self, source: ExtendSource<'_>) -> Result<&mut Self, TypeError> {
        if !self.members.extend_plain(&source) {
            if let ExtendSource::Type(desc) = source {
                let (_, resolved) =
                    extend_kind("class", desc, &[TypeKind::Object, TypeKind::Interface])?;
                let inherited = reflect(&resolved).all_members()?;
                self.members.extend_members(&inherited);
            }
        }
        Ok(self)
    }

    pub fn build(&self) -> Descriptor {
        trace!(class = self.constructor.name(), members = self.members.len(), "ClassBuilder::build");
        Descriptor::class(ClassRef {
            constructor: self.constructor.clone(),
            type_params: self.type_params.clone(),
            members: self.members.members.clone(),
            extends: self.extends.clone(),
            implements: self.implements.clone(),
            flags: self.flags,
        })
    }
}

// =============================================================================
// AliasBuilder
// =============================================================================

/// Builds a type alias whose target may refer back to the alias.
///
/// ```ignore
/// // type List<T> = { value: T; next?: List<T> }
/// let mut list = AliasBuilder::new("List");
/// let t = list.type_param("T");
/// let next = list.apply([t.clone()]);
/// let mut node = ObjectBuilder::new();
/// node.add_property("value", t, Flags::empty())
///     .add_property("next", next, Flags::OPTIONAL);
/// let list = list.build(node.build())?;
/// ```
pub struct AliasBuilder {
    token: NominalToken,
    params: Vec<Arc<str>>,
    slot: TypeSlot,
    metadata: MetadataMap,
}

impl AliasBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            token: NominalToken::new(name),
            params: Vec::new(),
            slot: TypeSlot::new(name),
            metadata: MetadataMap::new(),
        }
    }

    pub fn type_param(&mut self, name: &str) -> Descriptor {
        self.params.push(Arc::from(name));
        Descriptor::type_variable(name)
    }

    /// A forward reference to the alias under construction.
    pub fn reference(&self) -> Lazy {
        self.slot.lazy()
    }

    /// `Alias<args>` referring to the alias under construction.
    pub fn apply(&self, args: impl IntoIterator<Item = Descriptor>) -> Descriptor {
        Descriptor::generic(self.reference(), args)
    }

    pub fn set_metadata(&mut self, key: &str, value: serde_json::Value) -> &mut Self {
        self.metadata.insert(key.to_owned(), value);
        self
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    /// Finish the alias with its target and resolve forward references.
    pub fn build(self, target: impl Into<Lazy>) -> Result<Descriptor, TypeError> {
        let alias = Descriptor::alias(AliasRef {
            token: self.token,
            target: target.into(),
            params: self.params,
        });
        self.slot.set(alias.clone())?;
        Ok(alias)
    }
}

// =============================================================================
// TupleBuilder
// =============================================================================

#[derive(Clone, Debug, Default)]
pub struct TupleBuilder {
    elements: Vec<TupleElement>,
}

impl TupleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&mut self, ty: impl Into<Lazy>) -> &mut Self {
        self.elements.push(TupleElement::new(ty));
        self
    }

    pub fn named(&mut self, name: &str, ty: impl Into<Lazy>, flags: Flags) -> &mut Self {
        self.elements.push(TupleElement::named(name, ty, flags));
        self
    }

    pub fn optional(&mut self, ty: impl Into<Lazy>) -> &mut Self {
        self.elements.push(TupleElement::new(ty).with_flags(Flags::OPTIONAL));
        self
    }

    /// A rest element; `ty` is the array type of the remaining items.
    pub fn rest(&mut self, ty: impl Into<Lazy>) -> &mut Self {
        self.elements.push(TupleElement::new(ty).with_flags(Flags::REST));
        self
    }

    pub fn build(&self) -> Descriptor {
        Descriptor::tuple(self.elements.clone())
    }
}

#[cfg(test)]
#[path = "../tests/builder_tests.rs"]
mod tests;
