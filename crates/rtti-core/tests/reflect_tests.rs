use super::*;
use crate::builder::{AliasBuilder, ClassBuilder, InterfaceBuilder, ObjectBuilder};
use crate::format::{AliasRef, Lazy, MappedRef, TypeVariableRef};

fn names(members: &[Member]) -> Vec<&str> {
    members.iter().map(|member| &*member.name).collect()
}

fn alias_of(name: &str, target: Descriptor) -> Descriptor {
    Descriptor::alias(AliasRef::new(name, vec![], target))
}

/// `interface Box<T> { value: T }`
fn boxed() -> Descriptor {
    let mut builder = InterfaceBuilder::new("Box");
    let t = builder.type_param("T");
    builder.add_property("value", t, Flags::empty());
    builder.build()
}

#[test]
fn test_aliases_are_transparent_to_kind() {
    let shape = ObjectBuilder::new().build();
    let outer = alias_of("Outer", alias_of("Inner", shape));
    let ty = reflect(&outer);

    assert_eq!(ty.own_kind(), TypeKind::Alias);
    assert_eq!(ty.kind().expect("resolves"), TypeKind::Object);
    assert!(ty.is_object());
    assert!(ty.is_aliased());
    assert!(!ty.is_union());
    assert_eq!(ty.alias_name().expect("alias"), "Outer");
    assert_eq!(ty.alias_target().expect("target").alias_name().expect("alias"), "Inner");

    // Viewing as the alias keeps the alias; viewing as the target resolves.
    assert!(ty.as_kind(TypeKind::Alias).expect("own kind").is_aliased());
    assert!(!ty.as_kind(TypeKind::Object).expect("resolved kind").is_aliased());
}

#[test]
fn test_kind_mismatch_reports_both_kinds() {
    let ty = reflect(&Descriptor::string());
    let err = ty.as_kind(TypeKind::Array).expect_err("string is not an array");
    assert!(matches!(
        err,
        TypeError::KindMismatch {
            expected: TypeKind::Array,
            actual: TypeKind::Intrinsic
        }
    ));
    assert!(ty.element_type().expect_err("not an array").is_kind_mismatch());
    assert!(ty.alias_name().expect_err("not an alias").is_kind_mismatch());
    assert!(ty.create_type([Descriptor::number()]).is_err());
    assert_eq!(
        err.to_string(),
        "expected a type of kind `array`, found `intrinsic`"
    );
}

#[test]
fn test_self_alias_resolves_to_never() {
    let alias = AliasBuilder::new("Loop");
    let target = alias.reference();
    let desc = alias.build(target).expect("built once");
    let ty = reflect(&desc);
    assert_eq!(ty.kind().expect("cycles are not errors"), TypeKind::Never);
    assert!(ty.is_never());
}

#[test]
fn test_mutual_aliases_resolve_to_never() {
    let a = AliasBuilder::new("A");
    let b = AliasBuilder::new("B");
    let a_ref = a.reference();
    let b_desc = b.build(a_ref).expect("built once");
    let a_desc = a.build(b_desc.clone()).expect("built once");
    assert!(reflect(&a_desc).is_never());
    assert!(reflect(&b_desc).is_never());
}

#[test]
fn test_ever_growing_application_resolves_to_never() {
    // type Grow<T> = Grow<T[]>
    let mut grow = AliasBuilder::new("Grow");
    let t = grow.type_param("T");
    let target = grow.apply([Descriptor::array(t)]);
    let desc = grow.build(target).expect("built once");
    let applied = reflect(&desc).create_type([Descriptor::string()]).expect("alias");
    assert_eq!(applied.kind().expect("resolves"), TypeKind::Never);
}

#[test]
fn test_generic_interface_is_instantiated() {
    let desc = boxed();
    let ty = reflect(&desc);
    assert_eq!(ty.type_parameters().expect("declaration").len(), 1);

    let applied = ty.create_type([Descriptor::string()]).expect("interface");
    assert_eq!(applied.own_kind(), TypeKind::Generic);
    assert_eq!(applied.kind().expect("resolves"), TypeKind::Interface);
    assert_eq!(applied.type_arguments().expect("generic").len(), 1);
    assert_eq!(
        applied.base_type().expect("generic").token().expect("declaration"),
        ty.token().expect("declaration")
    );
    assert_eq!(
        applied.token().expect("resolves to interface").id(),
        desc.nominal_token().expect("interface")
    );

    let members = applied.members().expect("interface");
    assert_eq!(names(&members), ["value"]);
    let value = reflect(&members[0].ty.force().expect("resolved"));
    assert!(value.is_builtin_class(IntrinsicClass::String));

    // The declaration itself is untouched.
    let original = reflect(&ty.members().expect("interface")[0].ty.force().expect("resolved"));
    assert!(original.is_type_variable());
}

#[test]
fn test_bound_type_variable_resolves_to_its_declaration() {
    let var = Descriptor::new(TypeData::TypeVariable(TypeVariableRef {
        name: "T".into(),
        declaration: Some(Lazy::resolved(Descriptor::number())),
    }));
    let ty = reflect(&var);
    assert_eq!(ty.own_kind(), TypeKind::TypeVariable);
    assert!(ty.is_builtin_class(IntrinsicClass::Number));

    let free = reflect(&Descriptor::type_variable("U"));
    assert_eq!(free.kind().expect("structural"), TypeKind::TypeVariable);
}

#[test]
fn test_all_members_merges_interfaces() {
    let mut base = InterfaceBuilder::new("Named");
    base.add_property("id", Descriptor::number(), Flags::empty())
        .add_property("name", Descriptor::string(), Flags::empty());
    let base = base.build();

    let mut derived = InterfaceBuilder::new("Person");
    derived
        .extends(base.clone())
        .add_property("name", Descriptor::literal_str("bob"), Flags::empty())
        .add_property("age", Descriptor::number(), Flags::OPTIONAL);
    let derived = reflect(&derived.build());

    assert_eq!(names(&derived.members().expect("own")), ["name", "age"]);
    let all = derived.all_members().expect("inherited");
    assert_eq!(names(&all), ["id", "name", "age"]);

    let name = derived.member("name").expect("lookup").expect("present");
    let name_ty = reflect(&name.ty.force().expect("resolved"));
    assert!(name_ty.is_literal(&LiteralValue::String("bob".into())));
    assert!(derived.member("missing").expect("lookup").is_none());
    assert_eq!(derived.extends().expect("interface").len(), 1);
}

#[test]
fn test_all_members_follows_class_chain() {
    let mut base = ClassBuilder::new("Animal");
    base.add_property("legs", Descriptor::number(), Flags::empty());
    let base = base.build();

    let mut dog = ClassBuilder::subclass("Dog", &base).expect("class parent");
    dog.add_property("bark", Descriptor::string(), Flags::empty())
        .implements(boxed());
    let dog = reflect(&dog.build());

    assert!(dog.is_class());
    assert_eq!(names(&dog.all_members().expect("inherited")), ["legs", "bark"]);
    let parent = dog.parent().expect("class").expect("has parent");
    assert_eq!(parent.token().expect("class").name(), "Animal");
    assert!(parent.parent().expect("class").is_none());
    assert_eq!(dog.implements().expect("class").len(), 1);
}

#[test]
fn test_all_members_of_intersection() {
    let mut left = ObjectBuilder::new();
    left.add_property("a", Descriptor::number(), Flags::empty());
    let mut right = ObjectBuilder::new();
    right.add_property("b", Descriptor::string(), Flags::empty());
    let both = Descriptor::intersection(vec![left.build(), right.build()]);
    let ty = reflect(&both);
    assert!(ty.is_intersection());
    assert_eq!(ty.types().expect("intersection").len(), 2);
    assert_eq!(names(&ty.all_members().expect("merged")), ["a", "b"]);
}

#[test]
fn test_self_extending_interface_terminates() {
    let slot = crate::format::TypeSlot::new("Selfish");
    let mut builder = InterfaceBuilder::new("Selfish");
    builder
        .extends(slot.lazy())
        .add_property("x", Descriptor::number(), Flags::empty());
    let desc = builder.build();
    slot.set(desc.clone()).expect("defined once");
    assert_eq!(names(&reflect(&desc).all_members().expect("guarded")), ["x"]);
}

#[test]
fn test_mapped_members() {
    // type Wrap<T> = { value: T }
    let mut wrap = AliasBuilder::new("Wrap");
    let t = wrap.type_param("T");
    let mut shape = ObjectBuilder::new();
    shape.add_property("value", t, Flags::empty());
    let wrap = wrap.build(shape.build()).expect("built once");

    let applied = reflect(&Descriptor::mapped(MappedRef {
        source: wrap.clone().into(),
        args: vec![Descriptor::boolean()],
        members: vec![],
    }));
    assert!(applied.is_mapped());
    let members = applied.members().expect("applied on demand");
    assert_eq!(names(&members), ["value"]);
    assert!(reflect(&members[0].ty.force().expect("resolved")).is_builtin_class(IntrinsicClass::Boolean));

    let expanded = reflect(&Descriptor::mapped(MappedRef {
        source: wrap.into(),
        args: vec![],
        members: vec![Member::new("ready", Descriptor::true_(), Flags::OPTIONAL)],
    }));
    assert_eq!(names(&expanded.members().expect("precomputed")), ["ready"]);
}

#[test]
fn test_tuple_array_function_and_enum_accessors() {
    let tuple = reflect(&Descriptor::tuple(vec![
        TupleElement::new(Descriptor::string()),
        TupleElement::named("n", Descriptor::number(), Flags::OPTIONAL),
    ]));
    let elements = tuple.elements().expect("tuple");
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[1].name.as_deref(), Some("n"));

    let array = reflect(&Descriptor::array(Descriptor::bigint()));
    assert!(array.element_type().expect("array").is_builtin_class(IntrinsicClass::BigInt));

    let func = reflect(&Descriptor::function(
        vec![Member::new("x", Descriptor::number(), Flags::empty())],
        Descriptor::void(),
        Flags::ASYNC,
    ));
    assert!(func.is_function());
    assert_eq!(names(&func.parameters().expect("function")), ["x"]);
    assert!(func.return_type().expect("function").is_void());
    assert!(func.flags().contains(Flags::ASYNC));

    let mut entries = IndexMap::new();
    entries.insert(Arc::from("Red"), LiteralValue::Number(0.0));
    entries.insert(Arc::from("Blue"), LiteralValue::String("blue".into()));
    let color = reflect(&Descriptor::enumeration("Color", entries));
    assert!(color.is_enum());
    let entries = color.enum_entries().expect("enum");
    assert_eq!(entries.keys().map(|k| &**k).collect::<Vec<_>>(), ["Red", "Blue"]);
    assert_eq!(color.token().expect("enum").name(), "Color");

    let literal = reflect(&Descriptor::literal_number(3.0));
    assert_eq!(literal.literal_value().expect("literal"), LiteralValue::Number(3.0));
}

#[test]
fn test_reflecting_registers_declarations() {
    let desc = boxed();
    let token = desc.nominal_token().expect("interface");
    let _ = reflect(&desc);
    assert!(TypeRegistry::global().contains(token));
    let found = crate::registry::lookup_nominal(token).expect("registered");
    assert!(found.ptr_eq(&desc));
}

#[test]
fn test_use_site_resolved_first_keeps_declaration_registered() {
    // `type Holder = Box<string>`, resolved before `Box` is ever reflected.
    let desc = boxed();
    let token = desc.nominal_token().expect("interface");
    let holder = alias_of("Holder", Descriptor::generic(desc.clone(), [Descriptor::string()]));

    let resolved = reflect(&holder).resolve_type().expect("resolves");
    assert_eq!(resolved.own_kind(), TypeKind::Interface);
    assert!(resolved.type_parameters().expect("interface").is_empty());
    assert_eq!(reflect(&holder).kind().expect("resolves"), TypeKind::Interface);

    let found = crate::registry::lookup_nominal(token).expect("registered");
    assert!(found.ptr_eq(&desc));
    assert_eq!(reflect(&found).type_parameters().expect("interface").len(), 1);
}

#[test]
fn test_generic_class_use_site_keeps_declaration_registered() {
    let mut builder = ClassBuilder::new("Cell");
    let t = builder.type_param("T");
    builder.add_property("item", t, Flags::empty());
    let desc = builder.build();
    let token = desc.nominal_token().expect("class");

    let applied = Descriptor::generic(desc.clone(), [Descriptor::number()]);
    let members = reflect(&applied).all_members().expect("class");
    assert_eq!(names(&members), ["item"]);

    let found = crate::registry::lookup_nominal(token).expect("registered");
    assert!(found.ptr_eq(&desc));
}

#[test]
fn test_display_uses_declaration_names() {
    let applied = reflect(&boxed()).create_type([Descriptor::number()]).expect("interface");
    assert_eq!(applied.to_string(), "Box<number>");
    assert_eq!(reflect(&Descriptor::array(Descriptor::string())).to_string(), "string[]");
}
