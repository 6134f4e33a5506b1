//! Type descriptor format.
//!
//! A [`Descriptor`] is an immutable, reference-counted node describing one
//! type. The node's payload is the closed [`TypeData`] enum; each variant has a
//! stable single-character discriminant (see [`TypeData::discriminant`]) that
//! is also used by the JSON wire format.
//!
//! ## Cycles
//!
//! Every field that can take part in a cycle (alias targets, generic bases,
//! element and member types, parents) is a [`Lazy`] thunk rather than a
//! direct child. Graphs can therefore be assembled before all of their
//! dependents exist:
//!
//! ```ignore
//! let slot = TypeSlot::new("List");
//! let list = Descriptor::alias(AliasRef::new(
//!     "List",
//!     vec![],
//!     Lazy::new(move || Descriptor::object_shape(vec![
//!         Member::new("next", slot_lazy.clone(), Flags::OPTIONAL),
//!     ])),
//! ));
//! slot.set(list.clone())?;
//! ```
//!
//! ## Identity
//!
//! [`Descriptor::identity`] is the key used by the matcher's recursion guard.
//! Declarations (aliases, interfaces, classes, enums) are identified by their
//! nominal token so that re-decoded or re-instantiated copies compare equal;
//! every other node is identified by its allocation.

use crate::error::TypeError;
use crate::flags::Flags;
use crate::reflect::TypeKind;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for nominal token identities.
static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(TokenId::FIRST_VALID);

// =============================================================================
// Nominal tokens
// =============================================================================

/// Process-unique identity of a nominal declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenId(pub u64);

impl TokenId {
    /// Sentinel value for "no token".
    pub const INVALID: Self = Self(0);

    /// First valid `TokenId`.
    pub const FIRST_VALID: u64 = 1;

    /// Allocate a fresh token identity.
    pub fn fresh() -> Self {
        Self(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn is_valid(self) -> bool {
        self.0 >= Self::FIRST_VALID
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A declaration name paired with an identity distinct from the name.
///
/// Two declarations named `User` in different modules get different tokens.
#[derive(Clone, Debug)]
pub struct NominalToken {
    id: TokenId,
    name: Arc<str>,
}

impl NominalToken {
    /// Create a token with a fresh identity.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: TokenId::fresh(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for NominalToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NominalToken {}

impl std::hash::Hash for NominalToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Runtime constructor of a class: its token plus the parent constructor.
///
/// Values created with [`crate::value::ObjectValue::instance_of`] carry a
/// constructor, and class descriptors are matched against the chain.
#[derive(Clone)]
pub struct Constructor(Arc<ConstructorInfo>);

struct ConstructorInfo {
    token: NominalToken,
    parent: Option<Constructor>,
}

impl Constructor {
    /// A root class constructor.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(ConstructorInfo {
            token: NominalToken::new(name),
            parent: None,
        }))
    }

    /// A constructor whose instances are also instances of `parent`.
    pub fn with_parent(name: impl Into<Arc<str>>, parent: &Constructor) -> Self {
        Self(Arc::new(ConstructorInfo {
            token: NominalToken::new(name),
            parent: Some(parent.clone()),
        }))
    }

    pub fn token(&self) -> &NominalToken {
        &self.0.token
    }

    pub fn name(&self) -> &str {
        self.0.token.name()
    }

    pub fn parent(&self) -> Option<&Constructor> {
        self.0.parent.as_ref()
    }

    /// Whether this constructor is `token` or derives from it.
    pub fn is_subclass_of(&self, token: TokenId) -> bool {
        let mut current = Some(self);
        while let Some(ctor) = current {
            if ctor.token().id() == token {
                return true;
            }
            current = ctor.parent();
        }
        false
    }
}

impl PartialEq for Constructor {
    fn eq(&self, other: &Self) -> bool {
        self.token() == other.token()
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("name", &self.name())
            .field("id", &self.token().id())
            .field("parent", &self.parent().map(Constructor::name))
            .finish()
    }
}

// =============================================================================
// Intrinsics and literals
// =============================================================================

/// Builtin classes with a fixed runtime membership test.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntrinsicClass {
    String,
    Number,
    Boolean,
    BigInt,
    Symbol,
    Object,
    Function,
    Array,
}

impl IntrinsicClass {
    pub const ALL: [IntrinsicClass; 8] = [
        Self::String,
        Self::Number,
        Self::Boolean,
        Self::BigInt,
        Self::Symbol,
        Self::Object,
        Self::Function,
        Self::Array,
    ];

    /// The lowercase spelling used in type annotations (`string`, `object`, ...).
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::BigInt => "bigint",
            Self::Symbol => "symbol",
            Self::Object => "object",
            Self::Function => "Function",
            Self::Array => "Array",
        }
    }

    /// Look up an intrinsic by keyword or constructor name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|class| {
            class.keyword() == name || format!("{class:?}") == name
        })
    }
}

/// Payload of a literal type.
#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    String(Arc<str>),
    BigInt(i128),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::BigInt(n) => write!(f, "{n}n"),
        }
    }
}

// =============================================================================
// Lazy thunks
// =============================================================================

type Thunk = dyn Fn() -> Result<Descriptor, TypeError> + Send + Sync;

/// A deferred descriptor, memoized after the first successful evaluation.
///
/// Failed evaluations are not cached, so a forward reference that was not yet
/// defined can succeed once it is.
#[derive(Clone)]
pub struct Lazy(Arc<LazyCell>);

struct LazyCell {
    thunk: Box<Thunk>,
    value: OnceCell<Descriptor>,
}

impl Lazy {
    /// Wrap an infallible producer.
    pub fn new(f: impl Fn() -> Descriptor + Send + Sync + 'static) -> Self {
        Self::try_new(move || Ok(f()))
    }

    /// Wrap a producer that may fail with a malformed-descriptor error.
    pub fn try_new(f: impl Fn() -> Result<Descriptor, TypeError> + Send + Sync + 'static) -> Self {
        Self(Arc::new(LazyCell {
            thunk: Box::new(f),
            value: OnceCell::new(),
        }))
    }

    /// An already-evaluated thunk.
    pub fn resolved(desc: Descriptor) -> Self {
        let value = OnceCell::with_value(desc.clone());
        Self(Arc::new(LazyCell {
            thunk: Box::new(move || Ok(desc.clone())),
            value,
        }))
    }

    /// Evaluate the thunk, returning the memoized descriptor when available.
    ///
    /// The producer runs outside the cell so a producer that reaches back into
    /// its own thunk recomputes instead of blocking. The first stored value wins,
    /// which keeps the returned identity stable.
    pub fn force(&self) -> Result<Descriptor, TypeError> {
        if let Some(desc) = self.0.value.get() {
            return Ok(desc.clone());
        }
        let desc = (self.0.thunk)()?;
        match self.0.value.try_insert(desc) {
            Ok(stored) | Err((stored, _)) => Ok(stored.clone()),
        }
    }

    pub fn is_forced(&self) -> bool {
        self.0.value.get().is_some()
    }
}

impl From<Descriptor> for Lazy {
    fn from(desc: Descriptor) -> Self {
        Self::resolved(desc)
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.value.get() {
            Some(desc) => write!(f, "Lazy({desc})"),
            None => f.write_str("Lazy(<pending>)"),
        }
    }
}

/// A forward-declared descriptor cell.
///
/// `lazy()` hands out thunks before the descriptor exists; forcing them before
/// [`TypeSlot::set`] fails with [`TypeError::MalformedDescriptor`].
#[derive(Clone)]
pub struct TypeSlot(Arc<SlotInner>);

struct SlotInner {
    name: Arc<str>,
    cell: OnceCell<Descriptor>,
}

impl TypeSlot {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(Arc::new(SlotInner {
            name: name.into(),
            cell: OnceCell::new(),
        }))
    }

    /// Define the slot. A slot can be defined once.
    pub fn set(&self, desc: Descriptor) -> Result<(), TypeError> {
        self.0.cell.set(desc).map_err(|_| {
            TypeError::MalformedDescriptor(format!("`{}` is defined more than once", self.0.name))
        })
    }

    pub fn get(&self) -> Option<Descriptor> {
        self.0.cell.get().cloned()
    }

    pub fn lazy(&self) -> Lazy {
        let inner = Arc::clone(&self.0);
        Lazy::try_new(move || {
            inner.cell.get().cloned().ok_or_else(|| {
                TypeError::MalformedDescriptor(format!(
                    "forward reference to `{}` used before it was defined",
                    inner.name
                ))
            })
        })
    }
}

// =============================================================================
// Variant payloads
// =============================================================================

/// A named member of an object shape, interface or class, or a function parameter.
#[derive(Clone, Debug)]
pub struct Member {
    pub name: Arc<str>,
    pub ty: Lazy,
    pub flags: Flags,
}

impl Member {
    pub fn new(name: impl Into<Arc<str>>, ty: impl Into<Lazy>, flags: Flags) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            flags,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.flags.contains(Flags::OPTIONAL)
    }
}

/// One positional tuple element.
#[derive(Clone, Debug)]
pub struct TupleElement {
    pub name: Option<Arc<str>>,
    pub ty: Lazy,
    pub flags: Flags,
}

impl TupleElement {
    pub fn new(ty: impl Into<Lazy>) -> Self {
        Self {
            name: None,
            ty: ty.into(),
            flags: Flags::empty(),
        }
    }

    pub fn named(name: impl Into<Arc<str>>, ty: impl Into<Lazy>, flags: Flags) -> Self {
        Self {
            name: Some(name.into()),
            ty: ty.into(),
            flags,
        }
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags |= flags;
        self
    }
}

/// Interface declaration.
#[derive(Clone, Debug)]
pub struct InterfaceRef {
    pub token: NominalToken,
    pub type_params: Vec<Arc<str>>,
    pub members: Vec<Member>,
    pub extends: Vec<Lazy>,
}

/// Class declaration. The class token is the constructor's token.
#[derive(Clone, Debug)]
pub struct ClassRef {
    pub constructor: Constructor,
    pub type_params: Vec<Arc<str>>,
    pub members: Vec<Member>,
    pub extends: Option<Lazy>,
    pub implements: Vec<Lazy>,
    pub flags: Flags,
}

impl ClassRef {
    pub fn token(&self) -> &NominalToken {
        self.constructor.token()
    }
}

/// Type alias declaration: `type Name<Params> = target`.
#[derive(Clone, Debug)]
pub struct AliasRef {
    pub token: NominalToken,
    pub target: Lazy,
    pub params: Vec<Arc<str>>,
}

impl AliasRef {
    pub fn new(name: impl Into<Arc<str>>, params: Vec<Arc<str>>, target: impl Into<Lazy>) -> Self {
        Self {
            token: NominalToken::new(name),
            target: target.into(),
            params,
        }
    }

    pub fn name(&self) -> &str {
        self.token.name()
    }
}

/// Generic application: `Base<Args>`.
#[derive(Clone, Debug)]
pub struct GenericRef {
    pub base: Lazy,
    pub args: SmallVec<[Descriptor; 2]>,
}

/// Enum declaration with its members in declaration order.
#[derive(Clone, Debug)]
pub struct EnumRef {
    pub token: NominalToken,
    pub entries: IndexMap<Arc<str>, LiteralValue>,
}

impl EnumRef {
    pub fn name(&self) -> &str {
        self.token.name()
    }
}

/// Mapped type such as `Partial<T>` applied to arguments.
///
/// `members` holds the producer's expansion when it computed one; an empty
/// list means the source must be applied to `args` on demand.
#[derive(Clone, Debug)]
pub struct MappedRef {
    pub source: Lazy,
    pub args: Vec<Descriptor>,
    pub members: Vec<Member>,
}

/// Reference to a type parameter.
#[derive(Clone, Debug)]
pub struct TypeVariableRef {
    pub name: Arc<str>,
    pub declaration: Option<Lazy>,
}

/// Function signature.
#[derive(Clone, Debug)]
pub struct FunctionRef {
    pub params: Vec<Member>,
    pub returns: Lazy,
    pub flags: Flags,
}

// =============================================================================
// TypeData
// =============================================================================

/// The closed set of descriptor variants.
#[derive(Clone, Debug)]
pub enum TypeData {
    Intrinsic(IntrinsicClass),
    Void,
    Undefined,
    Null,
    Any,
    Unknown,
    Never,
    True,
    False,
    Literal(LiteralValue),
    This,
    Union(Vec<Descriptor>),
    Intersection(Vec<Descriptor>),
    Tuple(Vec<TupleElement>),
    Array(Lazy),
    Object(Vec<Member>),
    Interface(InterfaceRef),
    Class(ClassRef),
    Alias(AliasRef),
    Generic(GenericRef),
    Enum(EnumRef),
    Mapped(MappedRef),
    TypeVariable(TypeVariableRef),
    Function(FunctionRef),
}

impl TypeData {
    /// Stable single-character discriminant of the variant.
    pub const fn discriminant(&self) -> char {
        match self {
            Self::Intrinsic(_) => 'P',
            Self::Void => 'V',
            Self::Undefined => 'u',
            Self::Null => 'n',
            Self::Any => '*',
            Self::Unknown => 'U',
            Self::Never => '!',
            Self::True => '1',
            Self::False => '0',
            Self::Literal(_) => 'L',
            Self::This => 't',
            Self::Union(_) => '|',
            Self::Intersection(_) => '&',
            Self::Tuple(_) => 'T',
            Self::Array(_) => '[',
            Self::Object(_) => 'O',
            Self::Interface(_) => 'I',
            Self::Class(_) => 'C',
            Self::Alias(_) => 'a',
            Self::Generic(_) => 'g',
            Self::Enum(_) => 'e',
            Self::Mapped(_) => 'm',
            Self::TypeVariable(_) => 'v',
            Self::Function(_) => 'F',
        }
    }

    /// The variant's own kind, without looking through aliases.
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Intrinsic(_) => TypeKind::Intrinsic,
            Self::Void => TypeKind::Void,
            Self::Undefined => TypeKind::Undefined,
            Self::Null => TypeKind::Null,
            Self::Any => TypeKind::Any,
            Self::Unknown => TypeKind::Unknown,
            Self::Never => TypeKind::Never,
            Self::True => TypeKind::True,
            Self::False => TypeKind::False,
            Self::Literal(_) => TypeKind::Literal,
            Self::This => TypeKind::This,
            Self::Union(_) => TypeKind::Union,
            Self::Intersection(_) => TypeKind::Intersection,
            Self::Tuple(_) => TypeKind::Tuple,
            Self::Array(_) => TypeKind::Array,
            Self::Object(_) => TypeKind::Object,
            Self::Interface(_) => TypeKind::Interface,
            Self::Class(_) => TypeKind::Class,
            Self::Alias(_) => TypeKind::Alias,
            Self::Generic(_) => TypeKind::Generic,
            Self::Enum(_) => TypeKind::Enum,
            Self::Mapped(_) => TypeKind::Mapped,
            Self::TypeVariable(_) => TypeKind::TypeVariable,
            Self::Function(_) => TypeKind::Function,
        }
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Shared immutable descriptor node.
#[derive(Clone)]
pub struct Descriptor(Arc<TypeData>);

/// Shared leaf nodes, so every `Descriptor::string()` has the same identity.
struct CommonDescriptors {
    intrinsics: [Descriptor; 8],
    void: Descriptor,
    undefined: Descriptor,
    null: Descriptor,
    any: Descriptor,
    unknown: Descriptor,
    never: Descriptor,
    true_: Descriptor,
    false_: Descriptor,
    this: Descriptor,
}

static COMMON: once_cell::sync::Lazy<CommonDescriptors> = once_cell::sync::Lazy::new(|| {
    CommonDescriptors {
        intrinsics: IntrinsicClass::ALL.map(|class| Descriptor::new(TypeData::Intrinsic(class))),
        void: Descriptor::new(TypeData::Void),
        undefined: Descriptor::new(TypeData::Undefined),
        null: Descriptor::new(TypeData::Null),
        any: Descriptor::new(TypeData::Any),
        unknown: Descriptor::new(TypeData::Unknown),
        never: Descriptor::new(TypeData::Never),
        true_: Descriptor::new(TypeData::True),
        false_: Descriptor::new(TypeData::False),
        this: Descriptor::new(TypeData::This),
    }
});

impl Descriptor {
    pub fn new(data: TypeData) -> Self {
        Self(Arc::new(data))
    }

    pub fn data(&self) -> &TypeData {
        &self.0
    }

    pub fn discriminant(&self) -> char {
        self.0.discriminant()
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind()
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Descriptor) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Recursion-guard identity.
    ///
    /// Declarations map to their (odd) tagged token id; anonymous nodes map to
    /// their (even, pointer-aligned) address.
    pub fn identity(&self) -> u64 {
        match self.nominal_token() {
            Some(token) => (token.0 << 1) | 1,
            None => Arc::as_ptr(&self.0) as usize as u64,
        }
    }

    /// Token of an alias, interface, class or enum declaration.
    pub fn nominal_token(&self) -> Option<TokenId> {
        match self.data() {
            TypeData::Alias(alias) => Some(alias.token.id()),
            TypeData::Interface(iface) => Some(iface.token.id()),
            TypeData::Class(class) => Some(class.token().id()),
            TypeData::Enum(e) => Some(e.token.id()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Leaves
    // -------------------------------------------------------------------------

    pub fn intrinsic(class: IntrinsicClass) -> Self {
        COMMON.intrinsics[class as usize].clone()
    }

    pub fn string() -> Self {
        Self::intrinsic(IntrinsicClass::String)
    }

    pub fn number() -> Self {
        Self::intrinsic(IntrinsicClass::Number)
    }

    pub fn boolean() -> Self {
        Self::intrinsic(IntrinsicClass::Boolean)
    }

    pub fn bigint() -> Self {
        Self::intrinsic(IntrinsicClass::BigInt)
    }

    pub fn void() -> Self {
        COMMON.void.clone()
    }

    pub fn undefined() -> Self {
        COMMON.undefined.clone()
    }

    pub fn null() -> Self {
        COMMON.null.clone()
    }

    pub fn any() -> Self {
        COMMON.any.clone()
    }

    pub fn unknown() -> Self {
        COMMON.unknown.clone()
    }

    pub fn never() -> Self {
        COMMON.never.clone()
    }

    pub fn true_() -> Self {
        COMMON.true_.clone()
    }

    pub fn false_() -> Self {
        COMMON.false_.clone()
    }

    pub fn this() -> Self {
        COMMON.this.clone()
    }

    pub fn literal(value: LiteralValue) -> Self {
        Self::new(TypeData::Literal(value))
    }

    pub fn literal_number(value: f64) -> Self {
        Self::literal(LiteralValue::Number(value))
    }

    pub fn literal_str(value: &str) -> Self {
        Self::literal(LiteralValue::String(value.into()))
    }

    pub fn literal_bigint(value: i128) -> Self {
        Self::literal(LiteralValue::BigInt(value))
    }

    // -------------------------------------------------------------------------
    // Composites
    // -------------------------------------------------------------------------

    pub fn union(members: Vec<Descriptor>) -> Self {
        Self::new(TypeData::Union(members))
    }

    pub fn intersection(members: Vec<Descriptor>) -> Self {
        Self::new(TypeData::Intersection(members))
    }

    pub fn tuple(elements: Vec<TupleElement>) -> Self {
        Self::new(TypeData::Tuple(elements))
    }

    pub fn array(element: impl Into<Lazy>) -> Self {
        Self::new(TypeData::Array(element.into()))
    }

    pub fn object_shape(members: Vec<Member>) -> Self {
        Self::new(TypeData::Object(members))
    }

    pub fn generic(base: impl Into<Lazy>, args: impl IntoIterator<Item = Descriptor>) -> Self {
        Self::new(TypeData::Generic(GenericRef {
            base: base.into(),
            args: args.into_iter().collect(),
        }))
    }

    pub fn type_variable(name: impl Into<Arc<str>>) -> Self {
        Self::new(TypeData::TypeVariable(TypeVariableRef {
            name: name.into(),
            declaration: None,
        }))
    }

    pub fn alias(alias: AliasRef) -> Self {
        Self::new(TypeData::Alias(alias))
    }

    pub fn interface(iface: InterfaceRef) -> Self {
        Self::new(TypeData::Interface(iface))
    }

    pub fn class(class: ClassRef) -> Self {
        Self::new(TypeData::Class(class))
    }

    pub fn enumeration(name: impl Into<Arc<str>>, entries: IndexMap<Arc<str>, LiteralValue>) -> Self {
        Self::new(TypeData::Enum(EnumRef {
            token: NominalToken::new(name),
            entries,
        }))
    }

    pub fn mapped(mapped: MappedRef) -> Self {
        Self::new(TypeData::Mapped(mapped))
    }

    pub fn function(params: Vec<Member>, returns: impl Into<Lazy>, flags: Flags) -> Self {
        Self::new(TypeData::Function(FunctionRef {
            params,
            returns: returns.into(),
            flags,
        }))
    }
}

impl AsRef<Descriptor> for Descriptor {
    fn as_ref(&self) -> &Descriptor {
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Descriptor({:?}, {self})", self.discriminant())
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::display::TypeFormatter::new().write(f, self)
    }
}

#[cfg(test)]
#[path = "../tests/format_tests.rs"]
mod tests;
