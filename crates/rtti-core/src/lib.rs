//! Runtime Type Descriptors
//!
//! Runtime representation of static type information plus a structural
//! matcher that decides whether a runtime value conforms to a described type.
//!
//! - **Descriptors** (`format`): immutable `Arc`-shared nodes over a closed
//!   `TypeData` enum, with `Lazy` edges so recursive graphs stay finite
//! - **Resolution** (`reflect`, `instantiate`): alias-transparent inspection
//!   and positional binding of generic parameters
//! - **Matching** (`matcher`): structural membership under a recursion guard
//! - **Producers** (`builder`, `wire`): fluent builders and a JSON decoder
pub mod builder;
mod display;
pub mod error;
pub mod flags;
pub mod format;
pub mod instantiate;
pub mod matcher;
pub mod metadata;
pub mod recursion;
pub mod reflect;
pub mod registry;
pub mod value;
pub mod wire;

pub use builder::{
    AliasBuilder, ClassBuilder, ExtendSource, InterfaceBuilder, MemberList, ObjectBuilder,
    PropertySpec, TupleBuilder, literal_from_json,
};
pub use display::TypeFormatter;
pub use error::TypeError;
pub use flags::{Flags, Visibility};
pub use format::{
    Constructor, Descriptor, IntrinsicClass, Lazy, LiteralValue, Member, NominalToken, TokenId,
    TupleElement, TypeData, TypeSlot,
};
pub use instantiate::{TypeSubstitution, instantiate_application, instantiate_type};
pub use matcher::{MatchOptions, ValueMatcher, matches_value, try_matches_value};
pub use metadata::{InMemoryMetadataStore, MetadataKey, MetadataStore};
pub use recursion::{RecursionGuard, RecursionProfile, RecursionResult};
pub use reflect::{ReflectedType, TypeKind, reflect};
pub use registry::{TypeRegistry, lookup_nominal};
pub use value::{FunctionValue, ObjectValue, SymbolValue, Value};
pub use wire::{DescriptorModule, WireModule, WireType};

// Test modules are loaded by their source files via #[path = "../tests/..."].
