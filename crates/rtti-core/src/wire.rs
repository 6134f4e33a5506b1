//! JSON wire format for descriptor modules.
//!
//! A module is a set of named declarations:
//!
//! ```json
//! { "declarations": {
//!     "Id":   { "k": "|", "types": [{ "k": "P", "class": "String" }, { "k": "P", "class": "Number" }] },
//!     "User": { "k": "I", "name": "User", "members": [
//!         { "name": "id",      "type": { "k": "@", "ref": "Id" } },
//!         { "name": "friends", "type": { "k": "[", "element": { "k": "@", "ref": "User" } }, "flags": "?" }
//!     ] }
//! } }
//! ```
//!
//! Every type object carries its discriminant in `"k"`; `{"k": "@", "ref":
//! "Name"}` refers to another declaration. References decode lazily, so
//! declarations may refer to themselves and to each other in any order. A
//! reference to an unknown name fails only when it is forced.
//!
//! Declarations that are not nominal (anything but alias, interface, class or
//! enum) are wrapped in an alias named after the declaration.

use crate::error::TypeError;
use crate::flags::Flags;
use crate::format::{
    AliasRef, ClassRef, Constructor, Descriptor, InterfaceRef, IntrinsicClass, Lazy,
    LiteralValue, MappedRef, Member, NominalToken, TupleElement, TypeData, TypeVariableRef,
};
use crate::reflect::reflect;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::{debug, trace};

// =============================================================================
// Wire types
// =============================================================================

/// A serialized descriptor module.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WireModule {
    pub declarations: IndexMap<String, WireType>,
}

/// One serialized type, tagged by its discriminant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "k")]
pub enum WireType {
    #[serde(rename = "P")]
    Intrinsic { class: IntrinsicClass },
    #[serde(rename = "V")]
    Void,
    #[serde(rename = "u")]
    Undefined,
    #[serde(rename = "n")]
    Null,
    #[serde(rename = "*")]
    Any,
    #[serde(rename = "U")]
    Unknown,
    #[serde(rename = "!")]
    Never,
    #[serde(rename = "1")]
    True,
    #[serde(rename = "0")]
    False,
    #[serde(rename = "L")]
    Literal { value: WireLiteral },
    #[serde(rename = "t")]
    This,
    #[serde(rename = "|")]
    Union { types: Vec<WireType> },
    #[serde(rename = "&")]
    Intersection { types: Vec<WireType> },
    #[serde(rename = "T")]
    Tuple { elements: Vec<WireElement> },
    #[serde(rename = "[")]
    Array { element: Box<WireType> },
    #[serde(rename = "O")]
    Object { members: Vec<WireMember> },
    #[serde(rename = "I")]
    Interface {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params: Vec<String>,
        members: Vec<WireMember>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        extends: Vec<WireType>,
    },
    #[serde(rename = "C")]
    Class {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params: Vec<String>,
        members: Vec<WireMember>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extends: Option<Box<WireType>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        implements: Vec<WireType>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        flags: String,
    },
    #[serde(rename = "a")]
    Alias {
        name: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        params: Vec<String>,
        target: Box<WireType>,
    },
    #[serde(rename = "g")]
    Generic {
        base: Box<WireType>,
        #[serde(default)]
        args: Vec<WireType>,
    },
    #[serde(rename = "e")]
    Enum {
        name: String,
        entries: IndexMap<String, WireLiteral>,
    },
    #[serde(rename = "m")]
    Mapped {
        source: Box<WireType>,
        #[serde(default)]
        args: Vec<WireType>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        members: Vec<WireMember>,
    },
    #[serde(rename = "v")]
    TypeVariable {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        declaration: Option<Box<WireType>>,
    },
    #[serde(rename = "F")]
    Function {
        #[serde(default)]
        params: Vec<WireMember>,
        returns: Box<WireType>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        flags: String,
    },
    #[serde(rename = "@")]
    Ref {
        #[serde(rename = "ref")]
        name: String,
    },
}

/// Literal payload: a number, a string, or `{"bigint": "123"}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireLiteral {
    Number(f64),
    String(String),
    BigInt { bigint: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireMember {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: WireType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flags: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub ty: WireType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub flags: String,
}

// =============================================================================
// DescriptorModule
// =============================================================================

/// A decoded module. Declarations are decoded on first use and memoized, so
/// nominal tokens are stable for the module's lifetime.
#[derive(Clone)]
pub struct DescriptorModule {
    inner: Arc<ModuleInner>,
}

struct ModuleInner {
    entries: IndexMap<String, Entry>,
}

struct Entry {
    wire: WireType,
    decoded: OnceCell<Descriptor>,
}

thread_local! {
    /// Declarations being decoded on this thread, by module address.
    static DECODING: RefCell<Vec<(usize, String)>> = const { RefCell::new(Vec::new()) };
}

impl DescriptorModule {
    pub fn from_json(text: &str) -> Result<Self, TypeError> {
        let module: WireModule = serde_json::from_str(text)?;
        Ok(Self::from_wire(module))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, TypeError> {
        let module: WireModule = serde_json::from_value(value)?;
        Ok(Self::from_wire(module))
    }

    pub fn from_wire(module: WireModule) -> Self {
        let entries = module
            .declarations
            .into_iter()
            .map(|(name, wire)| {
                (
                    name,
                    Entry {
                        wire,
                        decoded: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self {
            inner: Arc::new(ModuleInner { entries }),
        }
    }

    /// Declaration names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.entries.contains_key(name)
    }

    /// Decode (or return the memoized) declaration `name`.
    pub fn get(&self, name: &str) -> Result<Descriptor, TypeError> {
        ModuleInner::declaration(&self.inner, name)
    }

    /// Decode a free-standing wire type whose references point into this module.
    pub fn decode(&self, wire: &WireType) -> Result<Descriptor, TypeError> {
        ModuleInner::decode(&self.inner, wire)
    }
}

impl ModuleInner {
    fn declaration(this: &Arc<Self>, name: &str) -> Result<Descriptor, TypeError> {
        let entry = this
            .entries
            .get(name)
            .ok_or_else(|| TypeError::malformed(format!("reference to unknown declaration `{name}`")))?;
        if let Some(desc) = entry.decoded.get() {
            return Ok(desc.clone());
        }

        let key = (Arc::as_ptr(this) as usize, name.to_owned());
        let reentered = DECODING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                true
            } else {
                stack.push(key.clone());
                false
            }
        });
        if reentered {
            debug!(declaration = name, "DescriptorModule - eager cycle");
            return Err(TypeError::malformed(format!(
                "declaration `{name}` depends on itself through an eager position"
            )));
        }

        trace!(declaration = name, "DescriptorModule - decoding");
        let result = Self::decode_declaration(this, name, &entry.wire);
        DECODING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|k| *k == key) {
                stack.remove(pos);
            }
        });
        let desc = result?;
        Ok(entry.decoded.get_or_init(|| desc).clone())
    }

    fn decode_declaration(this: &Arc<Self>, name: &str, wire: &WireType) -> Result<Descriptor, TypeError> {
        match wire {
            WireType::Alias { .. }
            | WireType::Interface { .. }
            | WireType::Class { .. }
            | WireType::Enum { .. } => Self::decode(this, wire),
            _ => {
                let target = Self::decode(this, wire)?;
                Ok(Descriptor::alias(AliasRef::new(name, vec![], target)))
            }
        }
    }

    fn lazy(this: &Arc<Self>, wire: &WireType) -> Result<Lazy, TypeError> {
        match wire {
            WireType::Ref { name } => {
                let module = Arc::clone(this);
                let name = name.clone();
                Ok(Lazy::try_new(move || Self::declaration(&module, &name)))
            }
            _ => Ok(Lazy::resolved(Self::decode(this, wire)?)),
        }
    }

    fn decode_list(this: &Arc<Self>, wires: &[WireType]) -> Result<Vec<Descriptor>, TypeError> {
        wires.iter().map(|wire| Self::decode(this, wire)).collect()
    }

    fn decode_members(this: &Arc<Self>, members: &[WireMember]) -> Result<Vec<Member>, TypeError> {
        members
            .iter()
            .map(|member| {
                Ok(Member::new(
                    member.name.as_str(),
                    Self::lazy(this, &member.ty)?,
                    Flags::parse(&member.flags),
                ))
            })
            .collect()
    }

    fn decode(this: &Arc<Self>, wire: &WireType) -> Result<Descriptor, TypeError> {
        let desc = match wire {
            WireType::Intrinsic { class } => Descriptor::intrinsic(*class),
            WireType::Void => Descriptor::void(),
            WireType::Undefined => Descriptor::undefined(),
            WireType::Null => Descriptor::null(),
            WireType::Any => Descriptor::any(),
            WireType::Unknown => Descriptor::unknown(),
            WireType::Never => Descriptor::never(),
            WireType::True => Descriptor::true_(),
            WireType::False => Descriptor::false_(),
            WireType::This => Descriptor::this(),
            WireType::Literal { value } => Descriptor::literal(literal(value)?),
            WireType::Union { types } => Descriptor::union(Self::decode_list(this, types)?),
            WireType::Intersection { types } => {
                Descriptor::intersection(Self::decode_list(this, types)?)
            }
            WireType::Tuple { elements } => Descriptor::tuple(
                elements
                    .iter()
                    .map(|element| {
                        Ok(TupleElement {
                            name: element.name.as_deref().map(Arc::from),
                            ty: Self::lazy(this, &element.ty)?,
                            flags: Flags::parse(&element.flags),
                        })
                    })
                    .collect::<Result<_, TypeError>>()?,
            ),
            WireType::Array { element } => Descriptor::array(Self::lazy(this, element)?),
            WireType::Object { members } => {
                Descriptor::object_shape(Self::decode_members(this, members)?)
            }
            WireType::Interface {
                name,
                params,
                members,
                extends,
            } => Descriptor::interface(InterfaceRef {
                token: NominalToken::new(name.as_str()),
                type_params: params.iter().map(|p| Arc::from(p.as_str())).collect(),
                members: Self::decode_members(this, members)?,
                extends: extends
                    .iter()
                    .map(|parent| Self::lazy(this, parent))
                    .collect::<Result<_, _>>()?,
            }),
            WireType::Class {
                name,
                params,
                members,
                extends,
                implements,
                flags,
            } => {
                let parent = match extends {
                    Some(parent) => Some(Self::lazy(this, parent)?),
                    None => None,
                };
                let constructor = match &parent {
                    Some(parent) => {
                        let resolved = reflect(&parent.force()?).resolve_type()?;
                        match resolved.descriptor().data() {
                            TypeData::Class(class) => {
                                Constructor::with_parent(name.as_str(), &class.constructor)
                            }
                            _ => {
                                return Err(TypeError::malformed(format!(
                                    "class `{name}` extends a {}",
                                    resolved.own_kind()
                                )));
                            }
                        }
                    }
                    None => Constructor::new(name.as_str()),
                };
                Descriptor::class(ClassRef {
                    constructor,
                    type_params: params.iter().map(|p| Arc::from(p.as_str())).collect(),
                    members: Self::decode_members(this, members)?,
                    extends: parent,
                    implements: implements
                        .iter()
                        .map(|iface| Self::lazy(this, iface))
                        .collect::<Result<_, _>>()?,
                    flags: Flags::parse(flags),
                })
            }
            WireType::Alias {
                name,
                params,
                target,
            } => Descriptor::alias(AliasRef::new(
                name.as_str(),
                params.iter().map(|p| Arc::from(p.as_str())).collect(),
                Self::lazy(this, target)?,
            )),
            WireType::Generic { base, args } => {
                Descriptor::generic(Self::lazy(this, base)?, Self::decode_list(this, args)?)
            }
            WireType::Enum { name, entries } => Descriptor::enumeration(
                name.as_str(),
                entries
                    .iter()
                    .map(|(key, value)| Ok((Arc::from(key.as_str()), literal(value)?)))
                    .collect::<Result<_, TypeError>>()?,
            ),
            WireType::Mapped {
                source,
                args,
                members,
            } => Descriptor::mapped(MappedRef {
                source: Self::lazy(this, source)?,
                args: Self::decode_list(this, args)?,
                members: Self::decode_members(this, members)?,
            }),
            WireType::TypeVariable { name, declaration } => {
                Descriptor::new(TypeData::TypeVariable(TypeVariableRef {
                    name: Arc::from(name.as_str()),
                    declaration: match declaration {
                        Some(bound) => Some(Self::lazy(this, bound)?),
                        None => None,
                    },
                }))
            }
            WireType::Function {
                params,
                returns,
                flags,
            } => Descriptor::function(
                Self::decode_members(this, params)?,
                Self::lazy(this, returns)?,
                Flags::parse(flags),
            ),
            // A reference in a position that holds a descriptor directly:
            // a zero-argument application keeps it lazy.
            WireType::Ref { .. } => Descriptor::generic(Self::lazy(this, wire)?, Vec::<Descriptor>::new()),
        };
        Ok(desc)
    }
}

fn literal(value: &WireLiteral) -> Result<LiteralValue, TypeError> {
    match value {
        WireLiteral::Number(n) => Ok(LiteralValue::Number(*n)),
        WireLiteral::String(s) => Ok(LiteralValue::String(Arc::from(s.as_str()))),
        WireLiteral::BigInt { bigint } => bigint
            .trim_end_matches('n')
            .parse::<i128>()
            .map(LiteralValue::BigInt)
            .map_err(|err| TypeError::malformed(format!("invalid bigint literal `{bigint}`: {err}"))),
    }
}

#[cfg(test)]
#[path = "../tests/wire_tests.rs"]
mod tests;
