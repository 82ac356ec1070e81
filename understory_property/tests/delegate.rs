// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for delegates: forwarding reads, writes and deletes through
//! nested objects, and flattening of nested delegation.

use std::num::ParseIntError;

use understory_property::{
    Class, Delegate, ErasedValue, Hop, Hubs, Object, PropertyBuilder, PropertyError,
    ValidatedProperty,
};

struct Fixture {
    inner: Class,
    outer: Class,
    inner_x: ValidatedProperty,
    inner_y: ValidatedProperty,
    inner_prop: ValidatedProperty,
}

fn fixture() -> Fixture {
    let inner = Class::new("InnerObject");
    let inner_x = PropertyBuilder::new()
        .default_with(|_| ErasedValue::new(99_i64))
        .build();
    let inner_y = PropertyBuilder::new().build();
    inner.define("x", &inner_x).unwrap();
    inner.define("y", &inner_y).unwrap();

    let outer = Class::new("TestObject");
    let inner_prop = PropertyBuilder::new().instance_of(&inner).build();
    outer.define("inner", &inner_prop).unwrap();
    outer
        .define("x", inner_prop.delegates_to("x").unwrap())
        .unwrap();
    outer
        .define("y", inner_prop.delegates_to("y").unwrap())
        .unwrap();
    Fixture {
        inner,
        outer,
        inner_x,
        inner_y,
        inner_prop,
    }
}

#[test]
fn strict_delegates_forward_to_the_current_inner_object() {
    let f = fixture();
    let mut hubs = Hubs::new();
    let subject = f.outer.instantiate();

    assert!(subject.get("inner").unwrap_err().is_not_set());
    assert!(subject.get("y").unwrap_err().is_not_set());

    let inner1 = f.inner.instantiate();
    f.inner_prop
        .set(&subject, ErasedValue::new(inner1.clone()))
        .unwrap();
    assert_eq!(subject.get_as::<Object>("inner").unwrap(), inner1);
    assert_eq!(subject.get_as::<i64>("x").unwrap(), 99);

    f.inner_x.set(&inner1, ErasedValue::new(1_i64)).unwrap();
    assert_eq!(subject.get_as::<i64>("x").unwrap(), 1);
    assert_eq!(inner1.get_as::<i64>("x").unwrap(), 1);

    f.inner_x.delete(&inner1).unwrap();
    assert_eq!(subject.get_as::<i64>("x").unwrap(), 99);

    subject
        .set(&mut hubs, "y", ErasedValue::new(122_i64))
        .unwrap();
    assert_eq!(f.inner_y.get(&inner1).unwrap().downcast::<i64>(), Some(122));
    inner1.delete(&mut hubs, "y").unwrap();
    assert!(subject.get("y").unwrap_err().is_not_set());

    subject.set(&mut hubs, "x", ErasedValue::new(0_i64)).unwrap();
    let inner2 = f.inner.instantiate();
    f.inner_prop
        .set(&subject, ErasedValue::new(inner2.clone()))
        .unwrap();
    assert_eq!(subject.get_as::<Object>("inner").unwrap(), inner2);
    assert_eq!(subject.get_as::<i64>("x").unwrap(), 99);
    assert_eq!(inner1.get_as::<i64>("x").unwrap(), 0);
}

#[test]
fn named_delegates_walk_plain_attributes() {
    let del = Class::new("Del");
    let d = Delegate::named(["a", "b", "c", "d"]).unwrap();
    del.define("d", &d).unwrap();
    let plain = Class::new("Obj");

    let mut hubs = Hubs::new();
    let o = del.instantiate();
    assert!(o.get("d").unwrap_err().is_not_set());

    let a = plain.instantiate();
    let b = plain.instantiate();
    let c = plain.instantiate();
    let leaf = plain.instantiate();
    o.set(&mut hubs, "a", ErasedValue::new(a.clone())).unwrap();
    a.set(&mut hubs, "b", ErasedValue::new(b.clone())).unwrap();
    b.set(&mut hubs, "c", ErasedValue::new(c.clone())).unwrap();
    c.set(&mut hubs, "d", ErasedValue::new(leaf.clone())).unwrap();

    assert_eq!(o.get_as::<Object>("d").unwrap(), leaf);
    o.set(&mut hubs, "d", ErasedValue::new(1_u8)).unwrap();
    assert_eq!(o.get_as::<u8>("d").unwrap(), 1);

    o.delete(&mut hubs, "d").unwrap();
    assert!(o.get("d").unwrap_err().is_not_set());
    assert!(c.get("d").unwrap_err().is_not_set());
}

#[test]
fn nested_delegation_stays_flat() {
    let inner_inner = Class::new("InnerInner");
    let ii_x = PropertyBuilder::new().build();
    let ii_nx = PropertyBuilder::new()
        .instance_of_type::<i64>()
        .default_value(0_i64)
        .build();
    inner_inner.define("x", &ii_x).unwrap();
    inner_inner.define("nx", &ii_nx).unwrap();

    let inner = Class::new("Inner");
    let i_ii = PropertyBuilder::new().instance_of(&inner_inner).build();
    inner.define("ii", &i_ii).unwrap();
    inner.define("nx", i_ii.delegates_to("nx").unwrap()).unwrap();
    inner.define("x", i_ii.delegates_to("x").unwrap()).unwrap();

    let outer = Class::new("Outer");
    let o_i = PropertyBuilder::new().instance_of(&inner).build();
    outer.define("i", &o_i).unwrap();
    let y = o_i.delegates_to("ii").unwrap();
    outer.define("y", &y).unwrap();
    outer.define("nx", y.delegates_to("nx").unwrap()).unwrap();
    let x = o_i.delegates_to("ii").unwrap().extend("x").unwrap();
    outer.define("x", &x).unwrap();

    assert_eq!(
        x.flat(),
        &[Hop::from(&o_i), Hop::from(&i_ii), Hop::from(&ii_x)]
    );
    assert_eq!(
        x.target().unwrap(),
        understory_property::Target::from(["i", "ii", "x"])
    );

    let mut hubs = Hubs::new();
    let ii = inner_inner.instantiate();
    ii_x.set(&ii, ErasedValue::new(1_i64)).unwrap();
    let i = inner.instantiate();
    i_ii.set(&i, ErasedValue::new(ii.clone())).unwrap();
    let o = outer.instantiate();
    o_i.set(&o, ErasedValue::new(i.clone())).unwrap();

    assert_eq!(ii.get_as::<i64>("nx").unwrap(), 0);
    assert_eq!(i.get_as::<i64>("nx").unwrap(), 0);
    assert_eq!(o.get_as::<i64>("nx").unwrap(), 0);
    assert_eq!(o.get_as::<Object>("y").unwrap(), ii);

    o.set(&mut hubs, "x", ErasedValue::new("non")).unwrap();
    assert_eq!(o.get_as::<&str>("x").unwrap(), "non");

    let ii2 = inner_inner.instantiate();
    ii_x.set(&ii2, ErasedValue::new(1_i64)).unwrap();
    i_ii.set(&i, ErasedValue::new(ii2.clone())).unwrap();
    assert_eq!(o.get_as::<i64>("x").unwrap(), 1);

    o.set(&mut hubs, "x", ErasedValue::new("now")).unwrap();
    assert_eq!(o.get_as::<&str>("x").unwrap(), "now");
    assert_eq!(i.get_as::<&str>("x").unwrap(), "now");
    assert_eq!(ii2.get_as::<&str>("x").unwrap(), "now");
    assert_eq!(ii.get_as::<&str>("x").unwrap(), "non");
}

#[test]
fn typed_but_not_class_constrained_cannot_delegate() {
    let obj = Class::new("Obj");
    let p = PropertyBuilder::new().instance_of_type::<i64>().build();
    obj.define("p", &p).unwrap();
    assert!(matches!(
        p.delegates_to("x"),
        Err(PropertyError::Configuration(_))
    ));
}

#[test]
fn coercion_runs_through_a_delegate() {
    let inner = Class::new("Inner");
    let n = PropertyBuilder::new()
        .coerce(|_, value| match value.downcast_ref::<&str>() {
            Some(text) => text
                .parse::<i64>()
                .map(ErasedValue::new)
                .map_err(|e: ParseIntError| PropertyError::coercion("n", e)),
            None => Ok(value),
        })
        .build();
    inner.define("n", &n).unwrap();

    let outer = Class::new("Outer");
    let child = PropertyBuilder::new().instance_of(&inner).build();
    outer.define("child", &child).unwrap();
    outer.define("n", child.delegates_to("n").unwrap()).unwrap();

    let mut hubs = Hubs::new();
    let o = outer.instantiate();
    let i = inner.instantiate();
    child.set(&o, ErasedValue::new(i.clone())).unwrap();

    o.set(&mut hubs, "n", ErasedValue::new("1")).unwrap();
    assert_eq!(i.get_as::<i64>("n").unwrap(), 1);
    o.set(&mut hubs, "n", ErasedValue::new(1_i64)).unwrap();
    assert_eq!(i.get_as::<i64>("n").unwrap(), 1);
    assert_eq!(o.get_as::<i64>("n").unwrap(), 1);

    let err = o.set(&mut hubs, "n", ErasedValue::new("one")).unwrap_err();
    assert!(matches!(err, PropertyError::CoercionFailure { .. }));
    assert_eq!(i.get_as::<i64>("n").unwrap(), 1);
}
