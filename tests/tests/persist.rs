use confdal::{DalObject, Driver, Field, Policy, Value};
use pretty_assertions::assert_eq;
use tests::*;

fn related(obj: &DalObject, name: &str) -> Option<DalObject> {
    assert_ok!(obj.get(name)).as_object().cloned()
}

/// Three objects of increasingly derived classes, linked together.
fn graph(db: &confdal::Db) -> (DalObject, DalObject, DalObject) {
    let obj3 = object(db, "Dummy", "Test-3")
        .with("string_vector", vec!["test05", "test06"])
        .unwrap();
    let obj1 = object(db, "Second", "Test-1")
        .with("Dummy", vec![obj3.clone()])
        .unwrap()
        .with("string_vector", vec!["test30"])
        .unwrap();
    let obj2 = object(db, "Third", "Test-2")
        .with("string_vector", vec!["test10"])
        .unwrap()
        .with("Seconds", vec![obj1.clone()])
        .unwrap();
    (obj1, obj2, obj3)
}

#[test]
fn round_trip() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let (obj1, obj2, obj3) = graph(&db);

    assert_ok!(db.update(&obj2, true));
    assert_ok!(db.commit("round trip"));
    assert_eq!(fixture.store().comments(DATA).unwrap(), ["round trip"]);

    let db = fixture.open();
    let ret = assert_ok!(db.get("Third", "Test-2"));
    assert_eq!(ret, obj2);
    assert!(!ret.ptr_eq(&obj2));

    let seconds = assert_ok!(ret.get("Seconds")).objects();
    assert_eq!(seconds, [obj1]);
    let dummies = assert_ok!(seconds[0].get("Dummy")).objects();
    assert_eq!(dummies, [obj3]);
    assert_eq!(
        assert_ok!(dummies[0].get("string_vector")),
        Field::from(vec!["test05", "test06"])
    );
    assert_eq!(dummies[0].class_name(), "Dummy");
    assert_eq!(seconds[0].class_name(), "Second");
}

#[test]
fn every_attribute_type_survives_a_round_trip() {
    let fixture = Fixture::new();
    let db = fixture.create();

    let obj = object(&db, "Dummy", "Test-1");
    let fields: [(&str, Field); 12] = [
        ("bool", true.into()),
        ("sint8", (-5i8).into()),
        ("uint16", 0xabcdu16.into()),
        ("sint64", i64::MIN.into()),
        ("uint64", u64::MAX.into()),
        ("float", 0.5f32.into()),
        ("double", (-2.5f64).into()),
        ("string", "hello".into()),
        ("enum", "THIRD".into()),
        ("date", "31/12/73".into()),
        ("time", "2024-Feb-29 23:59:59".into()),
        ("classref", "Second".into()),
    ];
    for (name, value) in &fields {
        assert_ok!(obj.set(name, value.clone()), "{name}");
    }
    let expected: Vec<_> = fields
        .iter()
        .map(|(name, _)| assert_ok!(obj.get(name)))
        .collect();

    assert_ok!(db.update(&obj, false));

    let again = assert_ok!(fixture.open().get("Dummy", "Test-1"));
    let actual: Vec<_> = fields
        .iter()
        .map(|(name, _)| assert_ok!(again.get(name)))
        .collect();
    assert_eq!(actual, expected);

    // Initial values are written out too
    assert_eq!(assert_ok!(again.get("counter")), Field::from(7u32));
}

#[test]
fn search_through_base_classes() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let (_, obj2, _) = graph(&db);
    assert_ok!(db.update(&obj2, true));

    let db = fixture.open();
    let mut classes: Vec<_> = assert_ok!(db.get_all("Dummy"))
        .iter()
        .map(DalObject::class_name)
        .collect();
    classes.sort();
    assert_eq!(classes, ["Dummy", "Second", "Third"]);

    assert_eq!(assert_ok!(db.get_all("Second")).len(), 2);
    assert_eq!(assert_ok!(db.get_all("Third")).len(), 1);

    // A base class lookup finds the derived object
    let found = assert_ok!(db.get("Dummy", "Test-2"));
    assert_eq!(found.class_name(), "Third");
    assert!(found.ptr_eq(&assert_ok!(db.get("Third", "Test-2"))));
}

#[test]
fn big_database() {
    const SIZE: usize = 1000;

    let fixture = Fixture::new();
    let db = fixture.create();
    for i in 0..SIZE {
        let obj = object(&db, "Second", &format!("Object-{i}"));
        assert_ok!(db.update(&obj, true));
    }
    assert_ok!(db.commit("big"));

    let db = fixture.open();
    let objs = assert_ok!(db.get_all("Second"));
    assert_eq!(objs.len(), SIZE);
    assert_unique!(objs.iter().map(DalObject::full_name));
}

#[test]
fn deep_chain() {
    const DEPTH: usize = 10_000;

    let fixture = Fixture::new();
    let db = fixture.create();
    let head = chain(&db, DEPTH);
    assert_eq!(head.traverse_all().len(), DEPTH);
    assert_ok!(db.update(&head, true));
    db.reset_updated();

    let db = fixture.open();
    let top = assert_ok!(db.get("Second", &format!("Object-{}", DEPTH - 1)));
    assert_eq!(chain_len(&top), DEPTH);
    assert_eq!(db.cache().objects_of("Second").len(), DEPTH);
}

#[test]
fn relinking_a_chain() {
    const DEPTH: usize = 500;

    let fixture = Fixture::new();
    let db = fixture.create();
    assert_ok!(db.update(&chain(&db, DEPTH), true));

    let db = fixture.open();
    let mut all = vec![assert_ok!(db.get("Second", &format!("Object-{}", DEPTH - 1)))];
    while let Some(next) = related(all.last().unwrap(), "Another") {
        all.push(next);
    }
    assert_eq!(all.len(), DEPTH);

    // Reverse the links
    all.reverse();
    for (i, obj) in all.iter().enumerate() {
        let next = all.get(i + 1).cloned();
        assert_ok!(obj.set("Another", next));
    }
    assert_ok!(db.update(&all[0], true));

    let db = fixture.open();
    let top = assert_ok!(db.get("Second", "Object-0"));
    assert_eq!(chain_len(&top), DEPTH);
}

fn cycle(db: &confdal::Db, len: usize) -> Vec<DalObject> {
    let objs: Vec<_> = (1..=len)
        .map(|i| object(db, "Second", &format!("Obj-{i}")))
        .collect();
    for (i, obj) in objs.iter().enumerate() {
        assert_ok!(obj.set("Another", &objs[(i + 1) % len]));
    }
    objs
}

#[test]
fn two_node_cycle() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let objs = cycle(&db, 2);
    assert_ok!(db.update(&objs[0], true));

    let db = fixture.open();
    let obj1 = assert_ok!(db.get("Second", "Obj-1"));
    let obj2 = assert_ok!(db.get("Second", "Obj-2"));
    assert_eq!(related(&obj1, "Another").as_ref(), Some(&obj2));
    assert_eq!(related(&obj2, "Another").as_ref(), Some(&obj1));

    let back = related(&related(&obj1, "Another").unwrap(), "Another").unwrap();
    assert!(back.ptr_eq(&obj1));
}

#[test]
fn four_node_cycle() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let objs = cycle(&db, 4);
    assert_ok!(db.update(&objs[0], true));

    let db = fixture.open();
    let loaded: Vec<_> = (1..=4)
        .map(|i| assert_ok!(db.get("Second", &format!("Obj-{i}"))))
        .collect();
    for (i, obj) in loaded.iter().enumerate() {
        let next = related(obj, "Another").unwrap();
        assert!(next.ptr_eq(&loaded[(i + 1) % 4]));
    }
    assert_eq!(loaded[0].traverse_all().len(), 4);
}

#[test]
fn destroy() {
    let fixture = Fixture::new();
    let db = fixture.create();
    assert_ok!(db.update(&cycle(&db, 4)[0], true));

    let db = fixture.open();
    let obj2 = assert_ok!(db.get("Second", "Obj-2"));
    let obj3 = related(&obj2, "Another").unwrap();

    // Obj-2 still points to Obj-3 in the store
    assert!(assert_err!(db.destroy(&obj3)).is_constraint_violation());
    assert!(db.cache().contains("Second", "Obj-3"));

    assert_ok!(obj2.set("Another", Field::Unset));
    assert_ok!(db.update(&obj2, true));
    assert_ok!(db.destroy(&obj3));
    assert!(!db.cache().contains("Second", "Obj-3"));
    assert!(!db.cache().contains("Dummy", "Obj-3"));

    let db = fixture.open();
    for id in ["Obj-1", "Obj-2", "Obj-4"] {
        assert_ok!(db.get("Second", id));
    }
    assert!(assert_err!(db.get("Second", "Obj-3")).is_record_not_found());

    // Destroying an object the store never saw only drops it from the cache
    let detached = object(&db, "Second", "Nowhere");
    db.cache().insert(&detached);
    assert_ok!(db.destroy(&detached));
    assert!(!db.cache().contains("Second", "Nowhere"));
}

#[test]
fn destroy_a_renamed_object() {
    let fixture = Fixture::new();
    let db = fixture.create();
    assert_ok!(db.update(&object(&db, "Second", "Before"), false));

    let db = fixture.open();
    let obj = assert_ok!(db.get("Second", "Before"));
    obj.rename("After");

    // The record goes under the id the store knows
    assert_ok!(db.destroy(&obj));
    assert!(!db.test_record("Second", "Before"));
    assert!(!db.test_record("Second", "After"));
    assert!(!db.cache().contains("Second", "Before"));
    assert!(!db.cache().contains("Dummy", "Before"));
    assert_none!(obj.pending_rename());
    assert_eq!(fixture.store().renames(), 0);
}

#[test]
fn modify_non_recursively() {
    let fixture = Fixture::new();
    let db = fixture.create();
    assert_ok!(db.update(&cycle(&db, 4)[0], true));

    let db = fixture.open();
    let obj1 = assert_ok!(db.get("Second", "Obj-1"));
    let obj2 = assert_ok!(db.get("Second", "Obj-2"));
    assert_ok!(obj1.set("Another", Field::Unset));
    assert_ok!(obj2.set("string", "xyzabc"));
    assert_ok!(db.update(&obj1, false));

    let db = fixture.open();
    let obj1 = assert_ok!(db.get("Second", "Obj-1"));
    assert_none!(related(&obj1, "Another"));
    let obj2 = assert_ok!(db.get("Second", "Obj-2"));
    assert_eq!(assert_ok!(obj2.get("string")), Field::Unset);
}

#[test]
fn non_recursive_update_needs_reachable_targets() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let obj1 = object(&db, "Second", "Obj-1");
    assert_ok!(db.update(&obj1, false));

    // A record in a database the session cannot see yet
    let store = fixture.store();
    store.add_database("test2.data", &[SCHEMA]).unwrap();
    store.create_record("test2.data", "Second", "Obj-22").unwrap();

    let obj22 = object(&db, "Second", "Obj-22");
    assert_ok!(obj1.set("Another", &obj22));

    let err = assert_err!(db.update(&obj1, false));
    assert!(err.is_store_error());
    assert!(err.is_record_not_found());

    assert_ok!(db.add_include("test2.data", None));
    assert_eq!(db.includes(None).unwrap(), [SCHEMA, "test2.data"]);
    assert_ok!(db.update(&obj1, false));
    assert!(assert_ok!(db.materialize_all()).contains(&obj22));

    let proxy = assert_ok!(db.record("Second", "Obj-1"));
    let target = assert_ok!(proxy.relation("Another")).into_proxies();
    assert_eq!(target.len(), 1);
    assert_eq!(target[0].id(), "Obj-22");
}

#[test]
fn rename_is_deferred_until_persist() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let (_, obj2, _) = graph(&db);
    assert_ok!(db.update(&obj2, true));

    let db = fixture.open();
    let obj = assert_ok!(db.get("Dummy", "Test-3"));
    obj.rename("Test-4");
    assert_eq!(obj.id(), "Test-4");
    assert_eq!(obj.pending_rename().as_deref(), Some("Test-3"));

    // The store still knows the old id
    assert!(db.test_record("Dummy", "Test-3"));
    assert!(!db.test_record("Dummy", "Test-4"));
    assert_eq!(fixture.store().renames(), 0);

    assert_ok!(db.update(&obj, false));
    assert_eq!(fixture.store().renames(), 1);
    assert!(!db.test_record("Dummy", "Test-3"));
    assert!(db.test_record("Dummy", "Test-4"));
    assert_none!(obj.pending_rename());

    assert_ok!(db.update(&obj, false));
    assert_eq!(fixture.store().renames(), 1);

    assert!(assert_ok!(db.get("Dummy", "Test-4")).ptr_eq(&obj));
    assert!(!db.cache().contains("Dummy", "Test-3"));

    // References to the renamed record follow it
    let db = fixture.open();
    let second = assert_ok!(db.get("Second", "Test-1"));
    let dummies = assert_ok!(second.get("Dummy")).objects();
    assert_eq!(dummies.len(), 1);
    assert_eq!(dummies[0].id(), "Test-4");
}

#[test]
fn renaming_twice_issues_one_store_rename() {
    let fixture = Fixture::new();
    let db = fixture.create();
    let obj = object(&db, "Dummy", "A");
    assert_ok!(db.update(&obj, false));

    obj.rename("B");
    obj.rename("C");
    assert_eq!(obj.pending_rename().as_deref(), Some("A"));
    assert_ok!(db.update(&obj, false));

    assert_eq!(fixture.store().renames(), 1);
    assert!(db.test_record("Dummy", "C"));
    assert!(!db.test_record("Dummy", "B"));
}

#[test]
fn add_leaves_existing_records_alone() {
    let fixture = Fixture::new();
    let db = fixture.create();

    let target = object(&db, "Second", "Target");
    let obj = object(&db, "Second", "Test-1")
        .with("uint8", 1)
        .unwrap()
        .with("Another", &target)
        .unwrap();
    assert_ok!(db.add(&obj, true));
    assert!(db.test_record("Second", "Target"));

    assert_ok!(obj.set("uint8", 2));
    assert_ok!(db.add(&obj, false));
    let proxy = assert_ok!(db.record("Second", "Test-1"));
    assert_eq!(assert_ok!(proxy.attribute("uint8")), Value::U8(1));

    assert_ok!(db.update(&obj, false));
    assert_eq!(assert_ok!(proxy.attribute("uint8")), Value::U8(2));
}

/// A session over `test.data` that also sees the read-only `Frozen@Dummy`.
fn frozen(fixture: &Fixture, policy: Policy) -> (confdal::Db, DalObject) {
    let setup = fixture.create();

    let store = fixture.store();
    store.add_database("frozen.data", &[SCHEMA]).unwrap();
    store.create_record("frozen.data", "Dummy", "Frozen").unwrap();
    store.set_read_only("frozen.data", true).unwrap();
    assert_ok!(setup.add_include("frozen.data", None));

    let db = fixture.open_with(policy);
    let obj = assert_ok!(db.get("Dummy", "Frozen"));
    assert_ok!(obj.set("uint8", 12));
    (db, obj)
}

#[test]
fn pedantic_policy_stops_at_the_first_failed_write() {
    let fixture = Fixture::new();
    let (db, obj) = frozen(&fixture, Policy::Pedantic);
    assert_eq!(db.policy(), Policy::Pedantic);

    let err = assert_err!(db.update(&obj, false));
    assert!(err.is_constraint_violation());
    assert!(
        err.to_string().starts_with("cannot write `uint8` of Frozen@Dummy: "),
        "{err}"
    );
}

#[test]
fn permissive_policy_skips_failed_writes() {
    let fixture = Fixture::new();
    let (db, obj) = frozen(&fixture, Policy::Permissive);

    assert_ok!(db.update(&obj, false));
    let proxy = assert_ok!(db.record("Dummy", "Frozen"));
    assert_eq!(assert_ok!(proxy.attribute("uint8")), Value::Null);

    // The policy can be picked per call
    assert_err!(db.update_with(&obj, Policy::Pedantic, false));
}

#[test]
fn new_records_go_to_the_active_database() {
    let fixture = Fixture::new();
    let db = fixture.create();
    assert_ok!(db.create_db("other.data", &[SCHEMA]));
    assert_eq!(db.active().as_deref(), Some("other.data"));

    let obj = object(&db, "Dummy", "Elsewhere");
    assert_ok!(db.update(&obj, false));
    let record = fixture.store().get_record("Dummy", "Elsewhere").unwrap();
    assert_eq!(
        fixture.store().location(&record).as_deref(),
        Some("other.data")
    );

    assert_ok!(db.set_active(DATA));
    assert_err!(db.set_active("missing.data"));
    let proxy = assert_ok!(db.create_record("Dummy", "Here", None));
    assert_eq!(
        fixture.store().location(proxy.record()).as_deref(),
        Some(DATA)
    );
}
