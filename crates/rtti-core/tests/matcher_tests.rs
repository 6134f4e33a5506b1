use super::*;
use crate::builder::{AliasBuilder, ClassBuilder, InterfaceBuilder, ObjectBuilder, TupleBuilder};
use crate::format::{AliasRef, MappedRef, TypeSlot};
use crate::value::{FunctionValue, ObjectValue, SymbolValue};
use serde_json::json;

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn check(ty: &Descriptor, value: &Value) -> bool {
    matches_value(&reflect(ty), value, None)
}

fn diagnostics(ty: &Descriptor, value: &Value) -> Vec<String> {
    let mut errors = Vec::new();
    let matched = matches_value(&reflect(ty), value, Some(&mut errors));
    assert!(!matched, "expected {value} not to match {ty}");
    errors
}

fn sample_values() -> Vec<Value> {
    vec![
        Value::Undefined,
        Value::Null,
        Value::Bool(true),
        Value::Number(0.0),
        Value::Number(f64::NAN),
        Value::BigInt(7),
        Value::string(""),
        Value::Symbol(SymbolValue::new(None)),
        v(json!([])),
        v(json!([1, "a"])),
        v(json!({})),
        v(json!({"a": {"a": null}})),
        Value::Function(FunctionValue::default()),
    ]
}

/// `type List = { value: number; next?: List }`
fn linked_list() -> Descriptor {
    let list = AliasBuilder::new("List");
    let mut node = ObjectBuilder::new();
    node.add_property("value", Descriptor::number(), Flags::empty())
        .add_property("next", list.reference(), Flags::OPTIONAL);
    list.build(node.build()).expect("alias is built once")
}

fn nested_list(depth: usize) -> Value {
    let mut value = json!({"value": depth});
    for i in (0..depth).rev() {
        value = json!({"value": i, "next": value});
    }
    v(value)
}

// =============================================================================
// Leaves
// =============================================================================

#[test]
fn test_intrinsics() {
    assert!(check(&Descriptor::string(), &Value::string("x")));
    assert!(!check(&Descriptor::string(), &Value::Number(1.0)));
    assert!(check(&Descriptor::number(), &Value::Number(f64::NAN)));
    assert!(check(&Descriptor::boolean(), &Value::Bool(false)));
    assert!(check(&Descriptor::bigint(), &Value::BigInt(-3)));
    assert!(!check(&Descriptor::bigint(), &Value::Number(3.0)));
    assert!(check(
        &Descriptor::intrinsic(IntrinsicClass::Symbol),
        &Value::Symbol(SymbolValue::new(Some("s")))
    ));
    assert!(check(
        &Descriptor::intrinsic(IntrinsicClass::Function),
        &Value::Function(FunctionValue::named("f"))
    ));
    assert!(check(&Descriptor::intrinsic(IntrinsicClass::Array), &v(json!([1, "x"]))));

    let object = Descriptor::intrinsic(IntrinsicClass::Object);
    assert!(check(&object, &v(json!({}))));
    assert!(check(&object, &v(json!([]))));
    assert!(check(&object, &Value::Function(FunctionValue::default())));
    assert!(!check(&object, &Value::Null));
    assert!(!check(&object, &Value::string("x")));
}

#[test]
fn test_top_and_bottom() {
    for value in sample_values() {
        assert!(check(&Descriptor::any(), &value));
        assert!(check(&Descriptor::unknown(), &value));
        assert!(!check(&Descriptor::never(), &value));
    }
}

#[test]
fn test_unit_types() {
    assert!(check(&Descriptor::undefined(), &Value::Undefined));
    assert!(check(&Descriptor::void(), &Value::Undefined));
    assert!(!check(&Descriptor::undefined(), &Value::Null));
    assert!(check(&Descriptor::null(), &Value::Null));
    assert!(!check(&Descriptor::null(), &Value::Undefined));
    assert!(check(&Descriptor::true_(), &Value::Bool(true)));
    assert!(!check(&Descriptor::true_(), &Value::Bool(false)));
    assert!(check(&Descriptor::false_(), &Value::Bool(false)));
}

#[test]
fn test_literals_use_strict_equality() {
    assert!(check(&Descriptor::literal_number(1.0), &Value::Number(1.0)));
    assert!(!check(&Descriptor::literal_number(1.0), &Value::string("1")));
    assert!(check(&Descriptor::literal_number(0.0), &Value::Number(-0.0)));
    assert!(!check(&Descriptor::literal_number(f64::NAN), &Value::Number(f64::NAN)));
    assert!(check(&Descriptor::literal_str("on"), &Value::string("on")));
    assert!(!check(&Descriptor::literal_str("on"), &Value::string("off")));
    assert!(check(&Descriptor::literal_bigint(10), &Value::BigInt(10)));
    assert!(!check(&Descriptor::literal_bigint(10), &Value::Number(10.0)));
}

#[test]
fn test_enum_members() {
    let mut entries = IndexMap::new();
    entries.insert(Arc::from("Red"), LiteralValue::Number(0.0));
    entries.insert(Arc::from("Blue"), LiteralValue::String("blue".into()));
    let color = Descriptor::enumeration("Color", entries);

    assert!(check(&color, &Value::Number(0.0)));
    assert!(check(&color, &Value::string("blue")));
    assert!(!check(&color, &Value::Number(1.0)));
    assert!(!check(&color, &Value::string("Blue")));
}

// =============================================================================
// Composites
// =============================================================================

#[test]
fn test_union_matches_iff_some_member_matches() {
    let members = vec![
        Descriptor::string(),
        Descriptor::literal_number(1.0),
        Descriptor::null(),
    ];
    let union = Descriptor::union(members.clone());
    for value in sample_values() {
        let expected = members.iter().any(|m| check(m, &value));
        assert_eq!(check(&union, &value), expected, "value {value}");
    }
    assert!(!check(&Descriptor::union(vec![]), &Value::Null));
}

#[test]
fn test_intersection_matches_iff_every_member_matches() {
    let mut a = ObjectBuilder::new();
    a.add_property("a", Descriptor::number(), Flags::empty());
    let mut b = ObjectBuilder::new();
    b.add_property("b", Descriptor::string(), Flags::empty());
    let members = vec![a.build(), b.build()];
    let intersection = Descriptor::intersection(members.clone());

    let values = [
        v(json!({"a": 1, "b": "x"})),
        v(json!({"a": 1})),
        v(json!({"b": "x"})),
        v(json!({"a": "1", "b": "x"})),
    ];
    for value in &values {
        let expected = members.iter().all(|m| check(m, value));
        assert_eq!(check(&intersection, value), expected, "value {value}");
    }
    assert!(check(&intersection, &values[0]));
    assert!(check(&Descriptor::intersection(vec![]), &Value::Null));
}

#[test]
fn test_arrays() {
    let numbers = Descriptor::array(Descriptor::number());
    assert!(check(&numbers, &v(json!([]))));
    assert!(check(&numbers, &v(json!([1, 2, 3]))));
    assert!(!check(&numbers, &v(json!([1, "2"]))));
    assert!(!check(&numbers, &v(json!({"0": 1}))));

    let generic = Descriptor::generic(
        Descriptor::intrinsic(IntrinsicClass::Array),
        [Descriptor::string()],
    );
    assert!(check(&generic, &v(json!(["a", "b"]))));
    assert!(!check(&generic, &v(json!([1]))));
}

#[test]
fn test_builder_tuple_number_string() {
    let mut tuple = TupleBuilder::new();
    tuple.element(Descriptor::number()).element(Descriptor::string());
    let tuple = tuple.build();

    assert!(check(&tuple, &v(json!([1, "a"]))));
    assert!(!check(&tuple, &v(json!(["a", 1]))));
    assert!(!check(&tuple, &v(json!([1]))));
    assert!(!check(&tuple, &v(json!([1, "a", 2]))));
    assert!(!check(&tuple, &v(json!({"0": 1, "1": "a"}))));
}

#[test]
fn test_tuple_optional_and_rest_elements() {
    let mut optional = TupleBuilder::new();
    optional
        .element(Descriptor::number())
        .optional(Descriptor::string());
    let optional = optional.build();
    assert!(check(&optional, &v(json!([1]))));
    assert!(check(&optional, &v(json!([1, "a"]))));
    assert!(check(&optional, &Value::Array(vec![Value::Number(1.0), Value::Undefined])));
    assert!(!check(&optional, &v(json!([1, 2]))));
    assert!(!check(&optional, &v(json!([]))));

    let mut rest = TupleBuilder::new();
    rest.element(Descriptor::string())
        .rest(Descriptor::array(Descriptor::number()))
        .element(Descriptor::boolean());
    let rest = rest.build();
    assert!(check(&rest, &v(json!(["a", true]))));
    assert!(check(&rest, &v(json!(["a", 1, 2, 3, false]))));
    assert!(!check(&rest, &v(json!(["a", 1, "2", false]))));
    assert!(!check(&rest, &v(json!(["a"]))));
}

#[test]
fn test_empty_tuple_matches_only_empty_array() {
    let empty = Descriptor::tuple(vec![]);
    assert!(check(&empty, &v(json!([]))));
    assert!(!check(&empty, &v(json!([1]))));
    assert!(!check(&empty, &v(json!({}))));
}

#[test]
fn test_object_shapes_are_permissive() {
    let mut shape = ObjectBuilder::new();
    shape
        .add_property("id", Descriptor::number(), Flags::empty())
        .add_property("label", Descriptor::string(), Flags::OPTIONAL)
        .add_property(
            "note",
            Descriptor::union(vec![Descriptor::string(), Descriptor::undefined()]),
            Flags::empty(),
        );
    let shape = shape.build();

    assert!(check(&shape, &v(json!({"id": 1}))));
    assert!(check(&shape, &v(json!({"id": 1, "extra": [1, 2], "label": "x"}))));
    assert!(check(
        &shape,
        &Value::from(ObjectValue::new().with("id", 1).with("label", Value::Undefined))
    ));
    assert!(!check(&shape, &v(json!({"id": 1, "label": 5}))));
    assert!(!check(&shape, &v(json!({"label": "x"}))));
    assert!(!check(&shape, &v(json!([]))));
    assert!(!check(&shape, &Value::Null));
}

#[test]
fn test_duplicate_members_last_declaration_wins() {
    let mut shape = ObjectBuilder::new();
    shape
        .add_property("a", Descriptor::string(), Flags::empty())
        .add_property("a", Descriptor::number(), Flags::empty());
    let shape = shape.build();
    assert!(check(&shape, &v(json!({"a": 1}))));
    assert!(!check(&shape, &v(json!({"a": "x"}))));

    // One check per name, in the position of the first declaration.
    let mut shape = ObjectBuilder::new();
    shape
        .add_property("a", Descriptor::string(), Flags::empty())
        .add_property("b", Descriptor::string(), Flags::empty())
        .add_property("a", Descriptor::number(), Flags::empty());
    let errors = diagnostics(&shape.build(), &v(json!({"a": "x", "b": 2})));
    assert_eq!(
        errors,
        vec![
            "$.a: expected number, got \"x\"".to_owned(),
            "$.b: expected string, got 2".to_owned(),
        ]
    );
}

#[test]
fn test_function_types() {
    let func = Descriptor::function(vec![], Descriptor::void(), Flags::empty());
    assert!(check(&func, &Value::Function(FunctionValue::named("run"))));
    assert!(!check(&func, &v(json!({}))));
}

// =============================================================================
// Declarations
// =============================================================================

#[test]
fn test_interface_includes_inherited_members_and_own_wins() {
    let mut named = InterfaceBuilder::new("Named");
    named
        .add_property("name", Descriptor::string(), Flags::empty())
        .add_property("id", Descriptor::string(), Flags::empty());
    let mut user = InterfaceBuilder::new("User");
    user.extends(named.build())
        .add_property("id", Descriptor::number(), Flags::empty());
    let user = user.build();

    assert!(check(&user, &v(json!({"id": 1, "name": "ada"}))));
    assert!(!check(&user, &v(json!({"id": 1}))));
    assert!(!check(&user, &v(json!({"id": "1", "name": "ada"}))));
}

#[test]
fn test_class_is_matched_by_members() {
    let mut animal = ClassBuilder::new("Animal");
    animal.add_property("name", Descriptor::string(), Flags::empty());
    let animal_desc = animal.build();

    let mut dog = ClassBuilder::subclass("Dog", &animal_desc).expect("Animal is a class");
    dog.add_method("bark", vec![], Descriptor::void(), Flags::empty())
        .add_property("count", Descriptor::number(), Flags::STATIC);
    let dog_desc = dog.build();

    let rex = Value::from(
        ObjectValue::instance_of(dog.constructor())
            .with("name", "Rex")
            .with("bark", FunctionValue::named("bark")),
    );
    assert!(check(&dog_desc, &rex));
    assert!(check(&animal_desc, &rex));

    let plain = v(json!({"name": "Rex"}));
    assert!(check(&animal_desc, &plain));
    assert!(!check(&animal_desc, &v(json!({"name": 1}))));
    assert!(!check(&animal_desc, &v(json!(["Rex"]))));
    assert!(!check(&animal_desc, &Value::Null));

    let generic_animal = Value::from(ObjectValue::instance_of(animal.constructor()).with("name", "Tom"));
    assert!(check(&animal_desc, &generic_animal));
    // Missing `bark`.
    assert!(!check(&dog_desc, &generic_animal));
    let barking_animal = Value::from(
        ObjectValue::instance_of(animal.constructor())
            .with("name", "Tom")
            .with("bark", FunctionValue::named("bark")),
    );
    assert!(check(&dog_desc, &barking_animal));

    let silent = Value::from(ObjectValue::instance_of(dog.constructor()).with("name", "Rex"));
    assert!(!check(&dog_desc, &silent));
    let not_callable = Value::from(
        ObjectValue::instance_of(dog.constructor())
            .with("name", "Rex")
            .with("bark", "woof"),
    );
    assert!(!check(&dog_desc, &not_callable));
}

#[test]
fn test_instance_checks_follow_constructor_chain() {
    let mut animal = ClassBuilder::new("Animal");
    animal.add_property("name", Descriptor::string(), Flags::empty());
    let animal_desc = reflect(&animal.build());
    let dog = ClassBuilder::subclass("Dog", animal_desc.descriptor()).expect("Animal is a class");
    let dog_desc = reflect(&dog.build());

    let rex = Value::from(ObjectValue::instance_of(dog.constructor()).with("name", "Rex"));
    let tom = Value::from(ObjectValue::instance_of(animal.constructor()).with("name", "Tom"));
    let plain = v(json!({"name": "Rex"}));

    let mut errors = Vec::new();
    {
        let mut matcher = ValueMatcher::new(MatchOptions::with_errors(&mut errors).with_instance_checks());
        assert!(matcher.matches(&animal_desc, &rex));
        assert!(matcher.matches(&animal_desc, &tom));
        assert!(matcher.matches(&dog_desc, &rex));
        assert!(!matcher.matches(&dog_desc, &tom));
        assert!(!matcher.matches(&animal_desc, &plain));
    }
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].starts_with("$: expected an instance of Dog"), "{errors:?}");
    assert!(errors[1].starts_with("$: expected an instance of Animal"), "{errors:?}");

    // Without instance checks the same values are read by their members.
    assert!(check(dog_desc.descriptor(), &tom));
    assert!(check(animal_desc.descriptor(), &plain));
}

#[test]
fn test_this_refers_to_enclosing_declaration() {
    let mut node = ClassBuilder::new("Node");
    node.add_property("value", Descriptor::number(), Flags::empty())
        .add_property("next", Descriptor::this(), Flags::OPTIONAL);
    let node_desc = node.build();

    let tail = ObjectValue::instance_of(node.constructor()).with("value", 2);
    let head = Value::from(
        ObjectValue::instance_of(node.constructor())
            .with("value", 1)
            .with("next", tail),
    );
    assert!(check(&node_desc, &head));

    let bad = Value::from(
        ObjectValue::instance_of(node.constructor())
            .with("value", 1)
            .with("next", v(json!({"value": "2"}))),
    );
    assert!(!check(&node_desc, &bad));
    let plain_tail = v(json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}}));
    assert!(check(&node_desc, &plain_tail));

    // Outside any declaration `this` accepts any object.
    assert!(check(&Descriptor::this(), &v(json!({}))));
    assert!(!check(&Descriptor::this(), &Value::Number(1.0)));
}

#[test]
fn test_unbound_type_variable_matches_nothing() {
    let t = Descriptor::type_variable("T");
    for value in sample_values() {
        assert!(!check(&t, &value));
    }
}

#[test]
fn test_mapped_types() {
    let mut partial = AliasBuilder::new("Partial");
    let t = partial.type_param("T");
    let mut shape = ObjectBuilder::new();
    shape.add_property("value", t, Flags::OPTIONAL);
    let partial = partial.build(shape.build()).expect("alias is built once");

    let applied = Descriptor::mapped(MappedRef {
        source: partial.clone().into(),
        args: vec![Descriptor::number()],
        members: vec![],
    });
    assert!(check(&applied, &v(json!({}))));
    assert!(check(&applied, &v(json!({"value": 1}))));
    assert!(!check(&applied, &v(json!({"value": "1"}))));

    let expanded = Descriptor::mapped(MappedRef {
        source: partial.into(),
        args: vec![Descriptor::number()],
        members: vec![Member::new("value", Descriptor::boolean(), Flags::empty())],
    });
    assert!(check(&expanded, &v(json!({"value": true}))));
    assert!(!check(&expanded, &v(json!({}))));
}

// =============================================================================
// Aliases, generics and recursion
// =============================================================================

#[test]
fn test_alias_is_transparent_for_matching() {
    let id = Descriptor::alias(AliasRef::new(
        "Id",
        vec![],
        Descriptor::union(vec![Descriptor::string(), Descriptor::number()]),
    ));
    let wrapped = Descriptor::alias(AliasRef::new("UserId", vec![], id.clone()));
    for value in sample_values() {
        let direct = check(&Descriptor::union(vec![Descriptor::string(), Descriptor::number()]), &value);
        assert_eq!(check(&id, &value), direct);
        assert_eq!(check(&wrapped, &value), direct);
    }
}

#[test]
fn test_self_alias_matches_no_value() {
    // type A = A
    let a = AliasBuilder::new("A");
    let target = a.reference();
    let a = a.build(target).expect("alias is built once");
    for value in sample_values() {
        assert!(!check(&a, &value), "value {value}");
    }
    let errors = diagnostics(&a, &Value::Null);
    assert!(errors.iter().any(|e| e.contains("revisited")), "{errors:?}");
}

#[test]
fn test_under_applied_identity_alias_matches_nothing() {
    // type K<T> = T; K<>
    let mut k = AliasBuilder::new("K");
    let t = k.type_param("T");
    let k = k.build(t).expect("alias is built once");
    let applied = reflect(&k).create_type(Vec::<Descriptor>::new()).expect("aliases can be applied");
    for value in sample_values() {
        assert!(!applied.matches_value(&value, None), "value {value}");
    }
    let applied = reflect(&k).create_type([Descriptor::string()]).expect("aliases can be applied");
    assert!(applied.matches_value(&Value::string("x"), None));
}

#[test]
fn test_recursive_alias_accepts_finite_nesting() {
    let list = linked_list();
    assert!(check(&list, &nested_list(0)));
    assert!(check(&list, &nested_list(20)));
    assert!(!check(&list, &v(json!({"value": 1, "next": {"value": "2"}}))));
    assert!(!check(&list, &v(json!({"value": 1, "next": {"next": null}}))));
}

#[test]
fn test_multi_hop_generic_recursion() {
    // type A<T> = B<T, number>
    // type B<T, K> = { a?: A<K> }
    let mut a = AliasBuilder::new("A");
    let a_t = a.type_param("T");
    let mut b = AliasBuilder::new("B");
    let _b_t = b.type_param("T");
    let b_k = b.type_param("K");

    let mut body = ObjectBuilder::new();
    body.add_property("a", Descriptor::generic(a.reference(), [b_k]), Flags::OPTIONAL);
    let b_ref = b.reference();
    b.build(body.build()).expect("alias is built once");
    let a = a
        .build(Descriptor::generic(b_ref, [a_t, Descriptor::number()]))
        .expect("alias is built once");

    let a_string = reflect(&a).create_type([Descriptor::string()]).expect("applies");
    assert!(a_string.matches_value(&v(json!({})), None));
    assert!(a_string.matches_value(&v(json!({"a": {"a": {"a": {}}}})), None));
    assert!(!a_string.matches_value(&v(json!({"a": {"a": 5}})), None));
    assert!(!a_string.matches_value(&v(json!({"a": "x"})), None));
    assert!(!a_string.matches_value(&Value::Null, None));
}

#[test]
fn test_wide_array_of_aliased_elements() {
    // type N = number; N[]
    let n = Descriptor::alias(AliasRef::new("N", vec![], Descriptor::number()));
    let numbers = reflect(&Descriptor::array(n));
    let wide = Value::Array((0..1_000_001).map(|i| Value::Number(f64::from(i))).collect());
    assert!(matches_value(&numbers, &wide, None));

    let mut errors = Vec::new();
    let mut items: Vec<Value> = (0..1_000_001).map(|i| Value::Number(f64::from(i))).collect();
    items.push(Value::string("last"));
    assert!(!matches_value(&numbers, &Value::Array(items), Some(&mut errors)));
    assert_eq!(errors, vec!["$[1000001]: expected number, got \"last\"".to_owned()]);
}

#[test]
fn test_max_depth_is_configurable_per_call() {
    // Deep values recurse deeply on the native stack.
    let results = std::thread::Builder::new()
        .stack_size(256 << 20)
        .spawn(|| {
            let list = reflect(&linked_list());
            let within_default = check(list.descriptor(), &nested_list(200));
            let past_default = check(list.descriptor(), &nested_list(300));

            let value = nested_list(1_000);
            let mut raised = ValueMatcher::new(MatchOptions::default().with_max_depth(2_000));
            let mut lowered = ValueMatcher::new(MatchOptions::default().with_max_depth(64));
            [
                within_default,
                past_default,
                raised.matches(&list, &value),
                lowered.matches(&list, &value),
            ]
        })
        .expect("spawn")
        .join()
        .expect("matcher thread");
    assert_eq!(results, [true, false, true, false]);
}

#[test]
fn test_depth_budget_rejects_deep_values() {
    let list = reflect(&linked_list());
    let mut errors = Vec::new();
    {
        let mut matcher = ValueMatcher::new(MatchOptions {
            errors: Some(&mut errors),
            profile: RecursionProfile::Custom {
                max_depth: 4,
                max_iterations: 1_000,
            },
            ..MatchOptions::default()
        });
        assert!(matcher.matches(&list, &nested_list(2)));
        assert!(!matcher.matches(&list, &nested_list(10)));
    }
    assert!(errors.iter().any(|e| e.contains("nesting limit")), "{errors:?}");
}

#[test]
fn test_parallel_matching_shares_descriptors() {
    use rayon::prelude::*;

    let list = reflect(&linked_list());
    let values: Vec<Value> = (0..64).map(nested_list).collect();
    assert!(values.par_iter().all(|value| matches_value(&list, value, None)));
    let broken: Vec<Value> = (0..64).map(|i| v(json!({"value": i, "next": 1}))).collect();
    assert!(broken.par_iter().all(|value| !matches_value(&list, value, None)));
}

// =============================================================================
// Diagnostics and errors
// =============================================================================

#[test]
fn test_diagnostics_carry_value_paths() {
    let mut item = ObjectBuilder::new();
    item.add_property("b", Descriptor::string(), Flags::empty());
    let mut outer = ObjectBuilder::new();
    outer.add_property("a", Descriptor::array(item.build()), Flags::empty());
    let outer = outer.build();

    let errors = diagnostics(&outer, &v(json!({"a": [{"b": 1}]})));
    assert_eq!(errors, vec!["$.a[0].b: expected string, got 1".to_owned()]);
}

#[test]
fn test_union_reports_one_summary() {
    let union = Descriptor::union(vec![Descriptor::string(), Descriptor::number()]);
    let errors = diagnostics(&union, &Value::Bool(true));
    assert_eq!(errors, vec!["$: expected string | number, got true".to_owned()]);
}

#[test]
fn test_diagnostics_are_capped() {
    let strings = reflect(&Descriptor::array(Descriptor::string()));
    let mut errors = Vec::new();
    {
        let mut matcher = ValueMatcher::new(MatchOptions {
            errors: Some(&mut errors),
            max_diagnostics: 2,
            ..MatchOptions::default()
        });
        assert!(!matcher.matches(&strings, &v(json!([1, 2, 3, 4, 5]))));
    }
    assert_eq!(errors.len(), 3);
    assert_eq!(errors[0], "$[0]: expected string, got 1");
    assert_eq!(errors[2], "... and 3 more");
}

#[test]
fn test_malformed_descriptor_is_an_error_only_when_asked() {
    let slot = TypeSlot::new("Missing");
    let broken = reflect(&Descriptor::array(slot.lazy()));
    let value = v(json!([1]));

    let err = try_matches_value(&broken, &value, None).expect_err("slot is unset");
    assert!(matches!(err, TypeError::MalformedDescriptor(_)));

    let mut errors = Vec::new();
    assert!(!matches_value(&broken, &value, Some(&mut errors)));
    assert!(errors[0].contains("Missing"), "{errors:?}");

    slot.set(Descriptor::number()).expect("slot is empty");
    assert_eq!(try_matches_value(&broken, &value, None).ok(), Some(true));
}

#[test]
fn test_guard_denials_under_a_trace_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();

    let alias = AliasBuilder::new("Again");
    let target = alias.reference();
    let again = alias.build(target).expect("built once");
    let ty = reflect(&again);
    assert!(ty.is_never());
    let mut errors = Vec::new();
    assert!(!matches_value(&ty, &Value::Null, Some(&mut errors)));
    assert!(errors.iter().any(|e| e.contains("revisited")));
}
