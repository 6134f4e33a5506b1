//! Alias and generic parameter binding.
//!
//! A generic application `Base<Args>` is resolved one hop at a time by
//! [`instantiate_application`]: the base's parameter names are bound
//! positionally to the arguments ([`TypeSubstitution::from_args`]) and the
//! base's body is rewritten with [`instantiate_type`].
//!
//! Rewriting is lazy through `Lazy` edges, so recursive bodies such as
//! `type A<T> = { next?: A<T> }` are never expanded ahead of use. It stops
//! at declaration nodes (alias, interface, class, enum): each of those has
//! its own parameter scope, and references into them go through `Generic`
//! nodes whose arguments *are* rewritten.

use crate::error::TypeError;
use crate::format::{
    ClassRef, Descriptor, FunctionRef, GenericRef, InterfaceRef, Lazy, MappedRef, Member,
    TupleElement, TypeData,
};
use crate::registry::TypeRegistry;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

/// Parameter name to argument bindings.
///
/// Cloning is cheap; lazily rewritten children share one map.
#[derive(Clone, Default)]
pub struct TypeSubstitution {
    map: Arc<FxHashMap<Arc<str>, Descriptor>>,
}

impl TypeSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `params` to `args` by position.
    ///
    /// Parameters without an argument are bound to `never`; surplus
    /// arguments are ignored.
    pub fn from_args(params: &[Arc<str>], args: &[Descriptor]) -> Self {
        if args.len() != params.len() {
            trace!(
                params = params.len(),
                args = args.len(),
                "TypeSubstitution::from_args - arity mismatch"
            );
        }
        let map = params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let arg = args.get(i).cloned().unwrap_or_else(Descriptor::never);
                (Arc::clone(name), arg)
            })
            .collect();
        Self { map: Arc::new(map) }
    }

    pub fn insert(&mut self, name: impl Into<Arc<str>>, ty: Descriptor) {
        Arc::make_mut(&mut self.map).insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.map.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Stable fingerprint of a generic argument list.
///
/// Built from argument identities: substituting a variable reuses the
/// argument's node, so re-instantiating with the same arguments yields the
/// same fingerprint.
pub fn args_fingerprint(args: &[Descriptor]) -> u64 {
    let mut hasher = FxHasher::default();
    args.len().hash(&mut hasher);
    for arg in args {
        arg.identity().hash(&mut hasher);
    }
    hasher.finish()
}

/// Rewrite `desc` with `subst`.
///
/// Nodes that contain nothing to substitute are returned as-is.
pub fn instantiate_type(desc: &Descriptor, subst: &TypeSubstitution) -> Descriptor {
    if subst.is_empty() {
        return desc.clone();
    }
    match desc.data() {
        TypeData::TypeVariable(var) => match subst.get(&var.name) {
            Some(bound) => bound.clone(),
            None => desc.clone(),
        },
        TypeData::Intrinsic(_)
        | TypeData::Void
        | TypeData::Undefined
        | TypeData::Null
        | TypeData::Any
        | TypeData::Unknown
        | TypeData::Never
        | TypeData::True
        | TypeData::False
        | TypeData::Literal(_)
        | TypeData::This
        | TypeData::Alias(_)
        | TypeData::Interface(_)
        | TypeData::Class(_)
        | TypeData::Enum(_) => desc.clone(),
        TypeData::Union(members) => match instantiate_list(members, subst) {
            Some(members) => Descriptor::union(members),
            None => desc.clone(),
        },
        TypeData::Intersection(members) => match instantiate_list(members, subst) {
            Some(members) => Descriptor::intersection(members),
            None => desc.clone(),
        },
        TypeData::Tuple(elements) => Descriptor::tuple(
            elements
                .iter()
                .map(|element| TupleElement {
                    name: element.name.clone(),
                    ty: instantiate_lazy(&element.ty, subst),
                    flags: element.flags,
                })
                .collect(),
        ),
        TypeData::Array(element) => Descriptor::array(instantiate_lazy(element, subst)),
        TypeData::Object(members) => Descriptor::object_shape(instantiate_members(members, subst)),
        TypeData::Generic(generic) => {
            let args: Vec<Descriptor> = generic
                .args
                .iter()
                .map(|arg| instantiate_type(arg, subst))
                .collect();
            if args.iter().zip(&generic.args).all(|(a, b)| a.ptr_eq(b)) {
                return desc.clone();
            }
            Descriptor::new(TypeData::Generic(GenericRef {
                base: generic.base.clone(),
                args: args.into_iter().collect(),
            }))
        }
        TypeData::Mapped(mapped) => Descriptor::mapped(MappedRef {
            source: mapped.source.clone(),
            args: mapped
                .args
                .iter()
                .map(|arg| instantiate_type(arg, subst))
                .collect(),
            members: instantiate_members(&mapped.members, subst),
        }),
        TypeData::Function(func) => Descriptor::new(TypeData::Function(FunctionRef {
            params: instantiate_members(&func.params, subst),
            returns: instantiate_lazy(&func.returns, subst),
            flags: func.flags,
        })),
    }
}

fn instantiate_list(members: &[Descriptor], subst: &TypeSubstitution) -> Option<Vec<Descriptor>> {
    let rewritten: Vec<Descriptor> = members
        .iter()
        .map(|member| instantiate_type(member, subst))
        .collect();
    let changed = rewritten
        .iter()
        .zip(members)
        .any(|(new, old)| !new.ptr_eq(old));
    changed.then_some(rewritten)
}

fn instantiate_members(members: &[Member], subst: &TypeSubstitution) -> Vec<Member> {
    members
        .iter()
        .map(|member| Member {
            name: Arc::clone(&member.name),
            ty: instantiate_lazy(&member.ty, subst),
            flags: member.flags,
        })
        .collect()
}

fn instantiate_lazy(lazy: &Lazy, subst: &TypeSubstitution) -> Lazy {
    let lazy = lazy.clone();
    let subst = subst.clone();
    Lazy::try_new(move || Ok(instantiate_type(&lazy.force()?, &subst)))
}

/// Resolve one hop of the application `base<args>`.
///
/// - alias: its target with the parameters bound
/// - parameterized interface or class: the same declaration (same token) with
///   its members, heritage and implemented interfaces rewritten; the
///   declaration itself is registered first so the copy never takes its
///   token in the identity table
/// - anything else: `base` unchanged
pub fn instantiate_application(base: &Descriptor, args: &[Descriptor]) -> Result<Descriptor, TypeError> {
    match base.data() {
        TypeData::Alias(alias) => {
            let target = alias.target.force()?;
            let subst = TypeSubstitution::from_args(&alias.params, args);
            trace!(alias = alias.name(), args = args.len(), "instantiate_application - alias");
            Ok(instantiate_type(&target, &subst))
        }
        TypeData::Interface(iface) if !iface.type_params.is_empty() => {
            TypeRegistry::global().register(base);
            let subst = TypeSubstitution::from_args(&iface.type_params, args);
            trace!(interface = iface.token.name(), "instantiate_application - interface");
            Ok(Descriptor::interface(InterfaceRef {
                token: iface.token.clone(),
                type_params: vec![],
                members: instantiate_members(&iface.members, &subst),
                extends: iface
                    .extends
                    .iter()
                    .map(|parent| instantiate_lazy(parent, &subst))
                    .collect(),
            }))
        }
        TypeData::Class(class) if !class.type_params.is_empty() => {
            TypeRegistry::global().register(base);
            let subst = TypeSubstitution::from_args(&class.type_params, args);
            trace!(class = class.token().name(), "instantiate_application - class");
            Ok(Descriptor::class(ClassRef {
                constructor: class.constructor.clone(),
                type_params: vec![],
                members: instantiate_members(&class.members, &subst),
                extends: class
                    .extends
                    .as_ref()
                    .map(|parent| instantiate_lazy(parent, &subst)),
                implements: class
                    .implements
                    .iter()
                    .map(|iface| instantiate_lazy(iface, &subst))
                    .collect(),
                flags: class.flags,
            }))
        }
        _ => Ok(base.clone()),
    }
}

#[cfg(test)]
#[path = "../tests/instantiate_tests.rs"]
mod tests;
