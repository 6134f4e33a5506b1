//! Structural value matching.
//!
//! [`matches_value`] decides whether a runtime [`Value`] is a member of the
//! type a descriptor describes. Dispatch is on the descriptor's own variant;
//! aliases, generic applications, mapped types, bound type variables and
//! `this` are *hops* that re-dispatch on another descriptor without
//! consuming any of the value.
//!
//! ## Recursion
//!
//! Every hop enters the matcher's [`RecursionGuard`] with a [`MatchKey`]
//! made of the hop's type identity, its argument fingerprint and the address
//! of the value being matched. Finite data nested through a recursive type
//! reaches each hop with a different value, so it is never mistaken for a
//! cycle; a hop that comes back to the same type with the same value
//! (`type A = A`) is denied and that path fails. The depth limit bounds the
//! nesting of one path; the number of hops across a whole call is not
//! limited, since a wide value only ever spends depth one element at a time.
//!
//! ## Classes
//!
//! Class types are read structurally, like interfaces: any object whose
//! instance members match is accepted. [`MatchOptions::check_instances`]
//! additionally requires the value's constructor chain to contain the class.
//!
//! ## Diagnostics
//!
//! When the caller supplies an error sink, each failing check appends one
//! message prefixed with the location of the failing value (`$.a[0].b`).
//! Messages are suspended while union members are tried; a union that
//! matches no member reports one summary line instead.

use crate::error::TypeError;
use crate::flags::Flags;
use crate::format::{Descriptor, IntrinsicClass, LiteralValue, Member, TupleElement, TypeData};
use crate::instantiate::{args_fingerprint, instantiate_application};
use crate::recursion::{RecursionGuard, RecursionProfile, RecursionResult};
use crate::reflect::{ReflectedType, TypeKind, reflect};
use crate::value::Value;
use indexmap::IndexMap;
use rtti_common::limits::MAX_MATCH_DIAGNOSTICS;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Stand-in for properties and tuple slots that are absent.
static MISSING: Value = Value::Undefined;

/// Recursion guard key for one matching hop.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub type_identity: u64,
    pub args: u64,
    pub value: usize,
}

impl MatchKey {
    fn new(type_identity: u64, args: u64, value: &Value) -> Self {
        Self {
            type_identity,
            args,
            value: value.address(),
        }
    }
}

/// Per-call matcher settings.
pub struct MatchOptions<'e> {
    /// Receives human-readable diagnostics for failing checks.
    pub errors: Option<&'e mut Vec<String>>,
    pub profile: RecursionProfile,
    /// Messages beyond this count are summarized in one trailing line.
    pub max_diagnostics: usize,
    /// Also require class values to be constructed by the class or a
    /// subclass. Off by default: classes are matched by their members.
    pub check_instances: bool,
}

impl Default for MatchOptions<'_> {
    fn default() -> Self {
        Self {
            errors: None,
            profile: RecursionProfile::ValueMatch,
            max_diagnostics: MAX_MATCH_DIAGNOSTICS,
            check_instances: false,
        }
    }
}

impl<'e> MatchOptions<'e> {
    pub fn with_errors(errors: &'e mut Vec<String>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::default()
        }
    }

    /// Allow `max_depth` nested hops on one path, keeping the profile's
    /// iteration limit.
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.profile = RecursionProfile::Custom {
            max_depth,
            max_iterations: self.profile.max_iterations(),
        };
        self
    }

    pub fn with_instance_checks(mut self) -> Self {
        self.check_instances = true;
        self
    }
}

/// Whether `value` is a member of `ty`.
///
/// A malformed descriptor encountered on the way is logged and the match
/// fails; use [`try_matches_value`] to observe it.
pub fn matches_value(ty: &ReflectedType, value: &Value, errors: Option<&mut Vec<String>>) -> bool {
    let mut matcher = ValueMatcher::new(MatchOptions {
        errors,
        ..MatchOptions::default()
    });
    matcher.matches(ty, value)
}

/// Like [`matches_value`], but malformed descriptors are returned as errors.
pub fn try_matches_value(
    ty: &ReflectedType,
    value: &Value,
    errors: Option<&mut Vec<String>>,
) -> Result<bool, TypeError> {
    let mut matcher = ValueMatcher::new(MatchOptions {
        errors,
        ..MatchOptions::default()
    });
    matcher.check(ty, value)
}

/// Reusable matcher. Each [`check`](Self::check) starts with a fresh
/// recursion budget.
pub struct ValueMatcher<'e> {
    guard: RecursionGuard<MatchKey>,
    errors: Option<&'e mut Vec<String>>,
    max_diagnostics: usize,
    check_instances: bool,
    emitted: usize,
    dropped: usize,
    suspended: u32,
    path: Vec<PathSegment>,
    this_stack: Vec<Descriptor>,
}

enum PathSegment {
    Property(Arc<str>),
    Index(usize),
}

impl<'e> ValueMatcher<'e> {
    pub fn new(options: MatchOptions<'e>) -> Self {
        Self {
            guard: RecursionGuard::with_profile(options.profile),
            errors: options.errors,
            max_diagnostics: options.max_diagnostics,
            check_instances: options.check_instances,
            emitted: 0,
            dropped: 0,
            suspended: 0,
            path: Vec::new(),
            this_stack: Vec::new(),
        }
    }

    /// Match, treating malformed descriptors as a failed match.
    pub fn matches(&mut self, ty: &ReflectedType, value: &Value) -> bool {
        match self.check(ty, value) {
            Ok(matched) => matched,
            Err(err) => {
                warn!(ty = %ty, error = %err, "matches_value - malformed descriptor");
                self.report(format!("{err}"));
                false
            }
        }
    }

    pub fn check(&mut self, ty: &ReflectedType, value: &Value) -> Result<bool, TypeError> {
        self.guard.reset();
        self.path.clear();
        self.this_stack.clear();
        self.suspended = 0;
        self.emitted = 0;
        self.dropped = 0;

        let result = self.match_type(ty.descriptor(), value);

        if self.dropped > 0 {
            let dropped = self.dropped;
            if let Some(errors) = self.errors.as_deref_mut() {
                errors.push(format!("... and {dropped} more"));
            }
        }
        trace!(ty = %ty, value = %value, matched = ?result.as_ref().ok(), "matches_value");
        result
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    fn location(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            let _ = match segment {
                PathSegment::Property(name) => write!(out, ".{name}"),
                PathSegment::Index(i) => write!(out, "[{i}]"),
            };
        }
        out
    }

    fn report(&mut self, message: String) {
        if !self.collecting() {
            return;
        }
        if self.emitted >= self.max_diagnostics {
            self.dropped += 1;
            return;
        }
        let location = self.location();
        if let Some(errors) = self.errors.as_deref_mut() {
            errors.push(format!("{location}: {message}"));
            self.emitted += 1;
        }
    }

    /// Whether failures are being rendered, so checking continues past the
    /// first one.
    fn collecting(&self) -> bool {
        self.suspended == 0 && self.errors.is_some()
    }

    /// Record a failure and return `false`.
    fn fail(&mut self, message: impl FnOnce() -> String) -> bool {
        if self.collecting() {
            let message = message();
            self.report(message);
        }
        false
    }

    fn expected(&mut self, ty: &Descriptor, value: &Value) -> bool {
        self.fail(|| format!("expected {ty}, got {value}"))
    }

    fn at<T>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> T) -> T {
        self.path.push(segment);
        let result = f(self);
        self.path.pop();
        result
    }

    // -------------------------------------------------------------------------
    // Dispatch
    // -------------------------------------------------------------------------

    fn match_type(&mut self, ty: &Descriptor, value: &Value) -> Result<bool, TypeError> {
        let matched = match ty.data() {
            TypeData::Any | TypeData::Unknown => true,
            TypeData::Never => self.fail(|| format!("no value is assignable to never, got {value}")),
            TypeData::Intrinsic(class) => {
                intrinsic_matches(*class, value) || self.expected(ty, value)
            }
            TypeData::Void | TypeData::Undefined => value.is_undefined() || self.expected(ty, value),
            TypeData::Null => matches!(value, Value::Null) || self.expected(ty, value),
            TypeData::True => matches!(value, Value::Bool(true)) || self.expected(ty, value),
            TypeData::False => matches!(value, Value::Bool(false)) || self.expected(ty, value),
            TypeData::Literal(literal) => literal_matches(literal, value) || self.expected(ty, value),
            TypeData::Enum(e) => {
                e.entries.values().any(|entry| literal_matches(entry, value))
                    || self.fail(|| format!("expected a member of enum {}, got {value}", e.name()))
            }
            TypeData::Function(_) => {
                matches!(value, Value::Function(_)) || self.expected(ty, value)
            }
            TypeData::Union(members) => self.match_union(ty, members, value)?,
            TypeData::Intersection(members) => {
                for member in members {
                    if !self.match_type(member, value)? {
                        return Ok(false);
                    }
                }
                true
            }
            TypeData::Array(element) => {
                let Value::Array(items) = value else {
                    return Ok(self.expected(ty, value));
                };
                let element = element.force()?;
                self.match_items(&element, items, 0)?
            }
            TypeData::Tuple(elements) => self.match_tuple(ty, elements, value)?,
            TypeData::Object(members) => {
                if !matches!(value, Value::Object(_)) {
                    return Ok(self.expected(ty, value));
                }
                // Later members with the same name override earlier ones.
                let mut unique: IndexMap<&str, &Member> = IndexMap::with_capacity(members.len());
                for member in members {
                    unique.insert(&*member.name, member);
                }
                self.match_members(unique.into_values(), value)?
            }
            TypeData::Interface(_) => {
                if !matches!(value, Value::Object(_)) {
                    return Ok(self.expected(ty, value));
                }
                self.match_declaration(ty, value)?
            }
            TypeData::Class(class) => {
                let Value::Object(object) = value else {
                    return Ok(self.expected(ty, value));
                };
                if self.check_instances {
                    let token = class.token();
                    let is_instance = object
                        .constructor
                        .as_ref()
                        .is_some_and(|ctor| ctor.is_subclass_of(token.id()));
                    if !is_instance {
                        let name = token.name().to_owned();
                        return Ok(self.fail(|| format!("expected an instance of {name}, got {value}")));
                    }
                }
                self.match_declaration(ty, value)?
            }
            TypeData::This => match self.this_stack.last().cloned() {
                Some(enclosing) => {
                    let key = MatchKey::new(enclosing.identity(), 1, value);
                    self.guarded(key, ty, |m| m.match_type(&enclosing, value))?
                }
                None => {
                    matches!(value, Value::Object(_) | Value::Array(_) | Value::Function(_))
                        || self.expected(ty, value)
                }
            },
            TypeData::TypeVariable(var) => match &var.declaration {
                Some(bound) => {
                    let bound = bound.force()?;
                    let key = MatchKey::new(ty.identity(), 0, value);
                    self.guarded(key, ty, |m| m.match_type(&bound, value))?
                }
                None => {
                    let name = Arc::clone(&var.name);
                    self.fail(|| format!("unbound type parameter {name} matches no value"))
                }
            },
            TypeData::Alias(alias) => {
                let key = MatchKey::new(ty.identity(), 0, value);
                let target = alias.target.force()?;
                self.guarded(key, ty, |m| m.match_type(&target, value))?
            }
            TypeData::Generic(generic) => {
                let base = generic.base.force()?;
                if let (TypeData::Intrinsic(IntrinsicClass::Array), [element]) =
                    (base.data(), generic.args.as_slice())
                {
                    let Value::Array(items) = value else {
                        return Ok(self.expected(ty, value));
                    };
                    return self.match_items(element, items, 0);
                }
                let key = MatchKey::new(base.identity(), args_fingerprint(&generic.args), value);
                let instantiated = instantiate_application(&base, &generic.args)?;
                self.guarded(key, ty, |m| m.match_type(&instantiated, value))?
            }
            TypeData::Mapped(mapped) => {
                if !mapped.members.is_empty() {
                    if !matches!(value, Value::Object(_)) {
                        return Ok(self.expected(ty, value));
                    }
                    self.match_members(mapped.members.iter(), value)?
                } else {
                    let source = mapped.source.force()?;
                    let key = MatchKey::new(source.identity(), args_fingerprint(&mapped.args), value);
                    let applied = instantiate_application(&source, &mapped.args)?;
                    self.guarded(key, ty, |m| m.match_type(&applied, value))?
                }
            }
        };
        Ok(matched)
    }

    /// Run one hop under the recursion guard. A denied hop fails.
    fn guarded(
        &mut self,
        key: MatchKey,
        ty: &Descriptor,
        f: impl FnOnce(&mut Self) -> Result<bool, TypeError>,
    ) -> Result<bool, TypeError> {
        match self.guard.enter(key) {
            RecursionResult::Entered => {
                let result = f(self);
                self.guard.leave(key);
                result
            }
            denied => {
                debug!(ty = %ty, reason = ?denied, depth = self.guard.depth(), "matches_value - hop denied");
                Ok(self.fail(|| format!("{denied} at {ty}")))
            }
        }
    }

    fn match_union(
        &mut self,
        ty: &Descriptor,
        members: &[Descriptor],
        value: &Value,
    ) -> Result<bool, TypeError> {
        self.suspended += 1;
        let mut result = Ok(false);
        for member in members {
            match self.match_type(member, value) {
                Ok(false) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.suspended -= 1;
        match result {
            Ok(false) => Ok(self.expected(ty, value)),
            other => other,
        }
    }

    fn match_items(
        &mut self,
        element: &Descriptor,
        items: &[Value],
        offset: usize,
    ) -> Result<bool, TypeError> {
        let mut all = true;
        for (i, item) in items.iter().enumerate() {
            let matched = self.at(PathSegment::Index(offset + i), |m| m.match_type(element, item))?;
            if !matched {
                all = false;
                if !self.collecting() {
                    break;
                }
            }
        }
        Ok(all)
    }

    fn match_tuple(
        &mut self,
        ty: &Descriptor,
        elements: &[TupleElement],
        value: &Value,
    ) -> Result<bool, TypeError> {
        let Value::Array(items) = value else {
            return Ok(self.expected(ty, value));
        };
        let rest = elements.iter().position(|element| element.flags.is_rest());
        let (prefix, suffix) = match rest {
            Some(r) => (&elements[..r], &elements[r + 1..]),
            None => (elements, &[][..]),
        };
        let required = prefix
            .iter()
            .position(|element| element.flags.is_optional())
            .unwrap_or(prefix.len());

        let len = items.len();
        let in_range = match rest {
            Some(_) => len >= required + suffix.len(),
            None => len >= required && len <= prefix.len(),
        };
        if !in_range {
            return Ok(self.fail(|| {
                format!("expected {ty} with {} element(s), got an array of length {len}", prefix.len())
            }));
        }

        let fixed_prefix = match rest {
            Some(_) => prefix.len().min(len - suffix.len()),
            None => len,
        };
        for (i, element) in prefix.iter().enumerate() {
            let item = items.get(i).filter(|_| i < fixed_prefix);
            if !self.match_slot(element, item, i)? {
                return Ok(false);
            }
        }

        if let Some(r) = rest {
            let tail_start = len - suffix.len();
            let rest_type = elements[r].ty.force()?;
            let rest_items = &items[fixed_prefix..tail_start];
            let matched = match reflect(&rest_type).as_kind(TypeKind::Array) {
                Ok(array) => {
                    let element = array.element_type()?;
                    self.match_items(element.descriptor(), rest_items, fixed_prefix)?
                }
                Err(TypeError::KindMismatch { .. }) => {
                    self.match_items(&rest_type, rest_items, fixed_prefix)?
                }
                Err(err) => return Err(err),
            };
            if !matched {
                return Ok(false);
            }
            for (j, element) in suffix.iter().enumerate() {
                let index = tail_start + j;
                if !self.match_slot(element, items.get(index), index)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// One positional tuple slot. Absent or `undefined` optional slots pass.
    fn match_slot(
        &mut self,
        element: &TupleElement,
        item: Option<&Value>,
        index: usize,
    ) -> Result<bool, TypeError> {
        let item = match item {
            Some(Value::Undefined) | None if element.flags.is_optional() => return Ok(true),
            Some(item) => item,
            None => &MISSING,
        };
        let element_type = element.ty.force()?;
        self.at(PathSegment::Index(index), |m| m.match_type(&element_type, item))
    }

    /// Match an interface or class body with `this` bound to it.
    fn match_declaration(&mut self, ty: &Descriptor, value: &Value) -> Result<bool, TypeError> {
        let members = reflect(ty).all_members()?;
        self.this_stack.push(ty.clone());
        let result = self.match_members(members.iter(), value);
        self.this_stack.pop();
        result
    }

    fn match_members<'m>(
        &mut self,
        members: impl Iterator<Item = &'m Member>,
        value: &Value,
    ) -> Result<bool, TypeError> {
        let mut all = true;
        for member in members {
            if member.flags.is_static() {
                continue;
            }
            let property = value.property(&member.name);
            let present = property.filter(|v| !v.is_undefined());
            if present.is_none() && member.is_optional() {
                continue;
            }
            let matched = self.at(PathSegment::Property(Arc::clone(&member.name)), |m| {
                m.match_member(member, property.unwrap_or(&MISSING))
            })?;
            if !matched {
                all = false;
                if !self.collecting() {
                    break;
                }
            }
        }
        Ok(all)
    }

    fn match_member(&mut self, member: &Member, value: &Value) -> Result<bool, TypeError> {
        if member.flags.contains(Flags::METHOD) {
            let callable = matches!(value, Value::Function(_));
            return Ok(callable || self.fail(|| format!("expected method {}, got {value}", member.name)));
        }
        let ty = member.ty.force()?;
        self.match_type(&ty, value)
    }
}

fn intrinsic_matches(class: IntrinsicClass, value: &Value) -> bool {
    match class {
        IntrinsicClass::String => matches!(value, Value::String(_)),
        IntrinsicClass::Number => matches!(value, Value::Number(_)),
        IntrinsicClass::Boolean => matches!(value, Value::Bool(_)),
        IntrinsicClass::BigInt => matches!(value, Value::BigInt(_)),
        IntrinsicClass::Symbol => matches!(value, Value::Symbol(_)),
        IntrinsicClass::Function => matches!(value, Value::Function(_)),
        IntrinsicClass::Array => matches!(value, Value::Array(_)),
        IntrinsicClass::Object => {
            matches!(value, Value::Object(_) | Value::Array(_) | Value::Function(_))
        }
    }
}

/// Strict equality between a literal type's payload and a value.
fn literal_matches(literal: &LiteralValue, value: &Value) -> bool {
    match (literal, value) {
        (LiteralValue::Number(expected), Value::Number(actual)) => expected == actual,
        (LiteralValue::String(expected), Value::String(actual)) => expected == actual,
        (LiteralValue::BigInt(expected), Value::BigInt(actual)) => expected == actual,
        _ => false,
    }
}

#[cfg(test)]
#[path = "../tests/matcher_tests.rs"]
mod tests;
