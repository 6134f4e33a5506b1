//! Resolution and navigation over descriptors.
//!
//! [`reflect`] wraps a descriptor in a [`ReflectedType`]. Aliases are
//! transparent: `kind()` and the kind predicates report the kind of the fully
//! resolved target, while `alias_name()`, `token()` and `type_parameters()`
//! still describe the alias itself. Generic applications of aliases and of
//! parameterized interfaces or classes are instantiated during resolution.

use crate::error::TypeError;
use crate::flags::Flags;
use crate::format::{
    Descriptor, IntrinsicClass, LiteralValue, Member, NominalToken, TupleElement, TypeData,
};
use crate::instantiate::{args_fingerprint, instantiate_application};
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::registry::TypeRegistry;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Kind of a descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Intrinsic,
    Void,
    Undefined,
    Null,
    Any,
    Unknown,
    Never,
    True,
    False,
    Literal,
    This,
    Union,
    Intersection,
    Tuple,
    Array,
    Object,
    Interface,
    Class,
    Alias,
    Generic,
    Enum,
    Mapped,
    TypeVariable,
    Function,
}

impl TypeKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Intrinsic => "intrinsic",
            Self::Void => "void",
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Any => "any",
            Self::Unknown => "unknown",
            Self::Never => "never",
            Self::True => "true",
            Self::False => "false",
            Self::Literal => "literal",
            Self::This => "this",
            Self::Union => "union",
            Self::Intersection => "intersection",
            Self::Tuple => "tuple",
            Self::Array => "array",
            Self::Object => "object",
            Self::Interface => "interface",
            Self::Class => "class",
            Self::Alias => "alias",
            Self::Generic => "generic",
            Self::Enum => "enum",
            Self::Mapped => "mapped",
            Self::TypeVariable => "type variable",
            Self::Function => "function",
        }
    }

    /// Interfaces and classes: nominal declarations that carry members.
    pub const fn is_declaration_with_members(self) -> bool {
        matches!(self, Self::Interface | Self::Class)
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wrap `desc` for inspection.
///
/// Reflecting an interface or class records its token in the global
/// [`TypeRegistry`].
pub fn reflect(desc: &Descriptor) -> ReflectedType {
    TypeRegistry::global().register(desc);
    ReflectedType { desc: desc.clone() }
}

/// A descriptor plus resolution-aware accessors.
#[derive(Clone)]
pub struct ReflectedType {
    desc: Descriptor,
}

impl From<Descriptor> for ReflectedType {
    fn from(desc: Descriptor) -> Self {
        reflect(&desc)
    }
}

impl ReflectedType {
    pub fn descriptor(&self) -> &Descriptor {
        &self.desc
    }

    pub fn into_descriptor(self) -> Descriptor {
        self.desc
    }

    /// The descriptor's own kind, without resolving aliases.
    pub fn own_kind(&self) -> TypeKind {
        self.desc.kind()
    }

    /// Kind of the resolved type.
    pub fn kind(&self) -> Result<TypeKind, TypeError> {
        Ok(self.resolve_type()?.own_kind())
    }

    /// Follow aliases, generic applications and bound type variables to the
    /// first structural descriptor.
    ///
    /// A cycle, or a chain longer than the resolution limit, resolves to
    /// `never`.
    pub fn resolve_type(&self) -> Result<ReflectedType, TypeError> {
        let mut guard = RecursionGuard::with_profile(RecursionProfile::TypeResolution);
        let mut entered = Vec::new();
        let result = resolve_with(&self.desc, &mut guard, &mut entered);
        for key in entered.into_iter().rev() {
            guard.leave(key);
        }
        // The result may be an instantiated copy sharing a declaration's
        // token, so it is not registered.
        Ok(ReflectedType { desc: result? })
    }

    /// View this type as `kind`.
    ///
    /// The descriptor's own kind is checked first, so an alias can be viewed
    /// as `Alias` and a generic application as `Generic`; otherwise the
    /// resolved type must have that kind.
    pub fn as_kind(&self, kind: TypeKind) -> Result<ReflectedType, TypeError> {
        if self.own_kind() == kind {
            return Ok(self.clone());
        }
        let resolved = self.resolve_type()?;
        let actual = resolved.own_kind();
        if actual == kind {
            Ok(resolved)
        } else {
            Err(TypeError::KindMismatch {
                expected: kind,
                actual,
            })
        }
    }

    fn is(&self, kind: TypeKind) -> bool {
        self.as_kind(kind).is_ok()
    }

    pub fn is_union(&self) -> bool {
        self.is(TypeKind::Union)
    }

    pub fn is_intersection(&self) -> bool {
        self.is(TypeKind::Intersection)
    }

    pub fn is_class(&self) -> bool {
        self.is(TypeKind::Class)
    }

    pub fn is_interface(&self) -> bool {
        self.is(TypeKind::Interface)
    }

    pub fn is_object(&self) -> bool {
        self.is(TypeKind::Object)
    }

    pub fn is_array(&self) -> bool {
        self.is(TypeKind::Array)
    }

    pub fn is_tuple(&self) -> bool {
        self.is(TypeKind::Tuple)
    }

    pub fn is_enum(&self) -> bool {
        self.is(TypeKind::Enum)
    }

    pub fn is_generic(&self) -> bool {
        self.is(TypeKind::Generic)
    }

    pub fn is_mapped(&self) -> bool {
        self.is(TypeKind::Mapped)
    }

    pub fn is_function(&self) -> bool {
        self.is(TypeKind::Function)
    }

    pub fn is_any(&self) -> bool {
        self.is(TypeKind::Any)
    }

    pub fn is_unknown(&self) -> bool {
        self.is(TypeKind::Unknown)
    }

    pub fn is_never(&self) -> bool {
        self.is(TypeKind::Never)
    }

    pub fn is_void(&self) -> bool {
        self.is(TypeKind::Void)
    }

    pub fn is_undefined(&self) -> bool {
        self.is(TypeKind::Undefined)
    }

    pub fn is_null(&self) -> bool {
        self.is(TypeKind::Null)
    }

    pub fn is_true(&self) -> bool {
        self.is(TypeKind::True)
    }

    pub fn is_false(&self) -> bool {
        self.is(TypeKind::False)
    }

    pub fn is_this(&self) -> bool {
        self.is(TypeKind::This)
    }

    pub fn is_type_variable(&self) -> bool {
        self.is(TypeKind::TypeVariable)
    }

    /// Whether the descriptor itself is an alias.
    pub fn is_aliased(&self) -> bool {
        self.own_kind() == TypeKind::Alias
    }

    pub fn is_builtin_class(&self, class: IntrinsicClass) -> bool {
        self.resolve_type()
            .is_ok_and(|r| matches!(r.desc.data(), TypeData::Intrinsic(c) if *c == class))
    }

    pub fn is_literal(&self, value: &LiteralValue) -> bool {
        self.resolve_type()
            .is_ok_and(|r| matches!(r.desc.data(), TypeData::Literal(v) if v == value))
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Members of a union or intersection.
    pub fn types(&self) -> Result<Vec<ReflectedType>, TypeError> {
        let resolved = self.resolve_type()?;
        match resolved.desc.data() {
            TypeData::Union(types) | TypeData::Intersection(types) => {
                Ok(types.iter().map(reflect).collect())
            }
            _ => Err(mismatch(TypeKind::Union, &resolved)),
        }
    }

    pub fn element_type(&self) -> Result<ReflectedType, TypeError> {
        let resolved = self.as_kind(TypeKind::Array)?;
        match resolved.desc.data() {
            TypeData::Array(element) => Ok(reflect(&element.force()?)),
            _ => Err(mismatch(TypeKind::Array, &resolved)),
        }
    }

    pub fn elements(&self) -> Result<Vec<TupleElement>, TypeError> {
        let resolved = self.as_kind(TypeKind::Tuple)?;
        match resolved.desc.data() {
            TypeData::Tuple(elements) => Ok(elements.clone()),
            _ => Err(mismatch(TypeKind::Tuple, &resolved)),
        }
    }

    /// Own members of an object shape, interface, class or mapped type.
    pub fn members(&self) -> Result<Vec<Member>, TypeError> {
        let resolved = self.resolve_type()?;
        match resolved.desc.data() {
            TypeData::Object(members) => Ok(members.clone()),
            TypeData::Interface(iface) => Ok(iface.members.clone()),
            TypeData::Class(class) => Ok(class.members.clone()),
            TypeData::Mapped(mapped) if !mapped.members.is_empty() => Ok(mapped.members.clone()),
            TypeData::Mapped(mapped) => {
                let applied = instantiate_application(&mapped.source.force()?, &mapped.args)?;
                reflect(&applied).members()
            }
            _ => Err(mismatch(TypeKind::Object, &resolved)),
        }
    }

    /// Own and inherited members, in declaration order with parents first.
    ///
    /// When a name occurs more than once the most derived declaration wins,
    /// and within one list the last entry wins.
    pub fn all_members(&self) -> Result<Vec<Member>, TypeError> {
        let mut guard = RecursionGuard::with_profile(RecursionProfile::Inheritance);
        let mut merged = IndexMap::new();
        collect_members(&self.resolve_type()?.desc, &mut guard, &mut merged)?;
        Ok(merged.into_values().collect())
    }

    /// Look up a member by name across [`all_members`](Self::all_members).
    pub fn member(&self, name: &str) -> Result<Option<Member>, TypeError> {
        Ok(self
            .all_members()?
            .into_iter()
            .find(|member| &*member.name == name))
    }

    pub fn type_arguments(&self) -> Result<Vec<ReflectedType>, TypeError> {
        let generic = self.as_kind(TypeKind::Generic)?;
        match generic.desc.data() {
            TypeData::Generic(g) => Ok(g.args.iter().map(reflect).collect()),
            _ => Err(mismatch(TypeKind::Generic, &generic)),
        }
    }

    /// The declaration a generic application applies.
    pub fn base_type(&self) -> Result<ReflectedType, TypeError> {
        let generic = self.as_kind(TypeKind::Generic)?;
        match generic.desc.data() {
            TypeData::Generic(g) => Ok(reflect(&g.base.force()?)),
            _ => Err(mismatch(TypeKind::Generic, &generic)),
        }
    }

    pub fn alias_name(&self) -> Result<&str, TypeError> {
        match self.desc.data() {
            TypeData::Alias(alias) => Ok(alias.name()),
            _ => Err(mismatch(TypeKind::Alias, self)),
        }
    }

    /// The alias's direct target, one hop.
    pub fn alias_target(&self) -> Result<ReflectedType, TypeError> {
        match self.desc.data() {
            TypeData::Alias(alias) => Ok(reflect(&alias.target.force()?)),
            _ => Err(mismatch(TypeKind::Alias, self)),
        }
    }

    /// Declared parameter names of an alias, interface or class.
    pub fn type_parameters(&self) -> Result<Vec<Arc<str>>, TypeError> {
        if let Some(params) = declared_params(&self.desc) {
            return Ok(params);
        }
        let resolved = self.resolve_type()?;
        declared_params(&resolved.desc).ok_or_else(|| mismatch(TypeKind::Alias, &resolved))
    }

    pub fn enum_entries(&self) -> Result<IndexMap<Arc<str>, LiteralValue>, TypeError> {
        let resolved = self.as_kind(TypeKind::Enum)?;
        match resolved.desc.data() {
            TypeData::Enum(e) => Ok(e.entries.clone()),
            _ => Err(mismatch(TypeKind::Enum, &resolved)),
        }
    }

    pub fn literal_value(&self) -> Result<LiteralValue, TypeError> {
        let resolved = self.as_kind(TypeKind::Literal)?;
        match resolved.desc.data() {
            TypeData::Literal(value) => Ok(value.clone()),
            _ => Err(mismatch(TypeKind::Literal, &resolved)),
        }
    }

    /// Nominal token of an alias, interface, class or enum.
    pub fn token(&self) -> Result<NominalToken, TypeError> {
        if let Some(token) = own_token(&self.desc) {
            return Ok(token);
        }
        let resolved = self.resolve_type()?;
        own_token(&resolved.desc).ok_or_else(|| mismatch(TypeKind::Class, &resolved))
    }

    /// Superclass of a class, if any.
    pub fn parent(&self) -> Result<Option<ReflectedType>, TypeError> {
        let class = self.as_kind(TypeKind::Class)?;
        match class.desc.data() {
            TypeData::Class(c) => match &c.extends {
                Some(parent) => Ok(Some(reflect(&parent.force()?))),
                None => Ok(None),
            },
            _ => Err(mismatch(TypeKind::Class, &class)),
        }
    }

    /// Interfaces a class implements.
    pub fn implements(&self) -> Result<Vec<ReflectedType>, TypeError> {
        let class = self.as_kind(TypeKind::Class)?;
        match class.desc.data() {
            TypeData::Class(c) => c
                .implements
                .iter()
                .map(|iface| Ok(reflect(&iface.force()?)))
                .collect(),
            _ => Err(mismatch(TypeKind::Class, &class)),
        }
    }

    /// Interfaces an interface extends.
    pub fn extends(&self) -> Result<Vec<ReflectedType>, TypeError> {
        let iface = self.as_kind(TypeKind::Interface)?;
        match iface.desc.data() {
            TypeData::Interface(i) => i
                .extends
                .iter()
                .map(|parent| Ok(reflect(&parent.force()?)))
                .collect(),
            _ => Err(mismatch(TypeKind::Interface, &iface)),
        }
    }

    pub fn parameters(&self) -> Result<Vec<Member>, TypeError> {
        let func = self.as_kind(TypeKind::Function)?;
        match func.desc.data() {
            TypeData::Function(f) => Ok(f.params.clone()),
            _ => Err(mismatch(TypeKind::Function, &func)),
        }
    }

    pub fn return_type(&self) -> Result<ReflectedType, TypeError> {
        let func = self.as_kind(TypeKind::Function)?;
        match func.desc.data() {
            TypeData::Function(f) => Ok(reflect(&f.returns.force()?)),
            _ => Err(mismatch(TypeKind::Function, &func)),
        }
    }

    pub fn flags(&self) -> Flags {
        match self.desc.data() {
            TypeData::Class(class) => class.flags,
            TypeData::Function(func) => func.flags,
            _ => Flags::empty(),
        }
    }

    // -------------------------------------------------------------------------
    // Binding and matching
    // -------------------------------------------------------------------------

    /// Apply an alias or parameterized interface or class to `args`.
    ///
    /// Returns a new `Generic` node; this type is unchanged.
    pub fn create_type(
        &self,
        args: impl IntoIterator<Item = Descriptor>,
    ) -> Result<ReflectedType, TypeError> {
        match self.desc.data() {
            TypeData::Alias(_) | TypeData::Interface(_) | TypeData::Class(_) => {
                Ok(reflect(&Descriptor::generic(self.desc.clone(), args)))
            }
            _ => Err(mismatch(TypeKind::Alias, self)),
        }
    }

    /// Structural membership test; see [`crate::matcher::matches_value`].
    pub fn matches_value(&self, value: &Value, errors: Option<&mut Vec<String>>) -> bool {
        crate::matcher::matches_value(self, value, errors)
    }
}

impl fmt::Display for ReflectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.desc, f)
    }
}

impl fmt::Debug for ReflectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReflectedType({:?})", self.desc)
    }
}

fn mismatch(expected: TypeKind, actual: &ReflectedType) -> TypeError {
    TypeError::KindMismatch {
        expected,
        actual: actual.own_kind(),
    }
}

fn declared_params(desc: &Descriptor) -> Option<Vec<Arc<str>>> {
    match desc.data() {
        TypeData::Alias(alias) => Some(alias.params.clone()),
        TypeData::Interface(iface) => Some(iface.type_params.clone()),
        TypeData::Class(class) => Some(class.type_params.clone()),
        _ => None,
    }
}

fn own_token(desc: &Descriptor) -> Option<NominalToken> {
    match desc.data() {
        TypeData::Alias(alias) => Some(alias.token.clone()),
        TypeData::Interface(iface) => Some(iface.token.clone()),
        TypeData::Class(class) => Some(class.token().clone()),
        TypeData::Enum(e) => Some(e.token.clone()),
        _ => None,
    }
}

type ResolveKey = (u64, u64);

/// One resolution hop, or `None` when `desc` is structural.
fn step(desc: &Descriptor) -> Result<Option<(ResolveKey, Descriptor)>, TypeError> {
    match desc.data() {
        TypeData::Alias(alias) => Ok(Some(((desc.identity(), 0), alias.target.force()?))),
        TypeData::Generic(generic) => {
            let base = generic.base.force()?;
            match base.data() {
                TypeData::Alias(_) | TypeData::Interface(_) | TypeData::Class(_) => {
                    let key = (base.identity(), args_fingerprint(&generic.args));
                    Ok(Some((key, instantiate_application(&base, &generic.args)?)))
                }
                _ if generic.args.is_empty() => Ok(Some(((base.identity(), 0), base))),
                _ => Ok(None),
            }
        }
        TypeData::TypeVariable(var) => match &var.declaration {
            Some(bound) => Ok(Some(((desc.identity(), 0), bound.force()?))),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

fn resolve_with(
    desc: &Descriptor,
    guard: &mut RecursionGuard<ResolveKey>,
    entered: &mut Vec<ResolveKey>,
) -> Result<Descriptor, TypeError> {
    let mut current = desc.clone();
    while let Some((key, next)) = step(&current)? {
        match guard.enter(key) {
            RecursionResult::Entered => entered.push(key),
            denied => {
                debug!(ty = %desc, reason = %denied, "resolve_type - resolving to never");
                return Ok(Descriptor::never());
            }
        }
        trace!(from = %current.discriminant(), to = %next.discriminant(), "resolve_type - hop");
        current = next;
    }
    Ok(current)
}

fn collect_members(
    desc: &Descriptor,
    guard: &mut RecursionGuard<u64>,
    merged: &mut IndexMap<Arc<str>, Member>,
) -> Result<(), TypeError> {
    let key = desc.identity();
    match guard.enter(key) {
        RecursionResult::Entered => {}
        denied => {
            debug!(ty = %desc, reason = %denied, "all_members - skipping inherited members");
            return Ok(());
        }
    }
    let result = collect_members_inner(desc, guard, merged);
    guard.leave(key);
    result
}

fn collect_members_inner(
    desc: &Descriptor,
    guard: &mut RecursionGuard<u64>,
    merged: &mut IndexMap<Arc<str>, Member>,
) -> Result<(), TypeError> {
    let own = match desc.data() {
        TypeData::Interface(iface) => {
            for parent in &iface.extends {
                let parent = reflect(&parent.force()?).resolve_type()?;
                collect_members(&parent.desc, guard, merged)?;
            }
            &iface.members
        }
        TypeData::Class(class) => {
            if let Some(parent) = &class.extends {
                let parent = reflect(&parent.force()?).resolve_type()?;
                collect_members(&parent.desc, guard, merged)?;
            }
            &class.members
        }
        TypeData::Intersection(types) => {
            for ty in types {
                let part = reflect(ty).resolve_type()?;
                collect_members(&part.desc, guard, merged)?;
            }
            return Ok(());
        }
        _ => {
            for member in reflect(desc).members()? {
                merged.insert(Arc::clone(&member.name), member);
            }
            return Ok(());
        }
    };
    for member in own {
        merged.insert(Arc::clone(&member.name), member.clone());
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/reflect_tests.rs"]
mod tests;
