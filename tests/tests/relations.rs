use confdal::{DalObject, Field, ValidationErrorKind, Value};
use pretty_assertions::assert_eq;
use regex::Regex;
use tests::*;

use std::collections::HashSet;

fn kind(result: confdal::Result<()>) -> ValidationErrorKind {
    let err = assert_err!(result);
    assert!(err.is_validation(), "{err}");
    err.validation_kind().unwrap().clone()
}

fn target(class: &str) -> ValidationErrorKind {
    ValidationErrorKind::Target {
        expected: class.into(),
    }
}

#[test]
fn single_relation_targets() {
    let db = Fixture::new().create();
    let obj = object(&db, "Second", "Test-1");
    let dummy = object(&db, "Dummy", "Test-2");
    let second = object(&db, "Second", "Test-3");
    let third = object(&db, "Third", "Test-4");

    assert_eq!(kind(obj.set("Another", &dummy)), target("Second"));
    assert_eq!(kind(obj.set("Another", "Test-3")), target("Second"));
    assert_eq!(
        kind(obj.set("Another", vec![second.clone()])),
        ValidationErrorKind::Cardinality { multivalue: false }
    );

    assert_ok!(obj.set("Another", &second));
    assert_eq!(assert_ok!(obj.get("Another")), Field::Object(second));

    // Subclasses are accepted
    assert_ok!(obj.set("Another", &third));
    assert_eq!(assert_ok!(obj.get("Another")), Field::Object(third));

    assert_ok!(obj.set("Another", Field::Unset));
    assert_eq!(assert_ok!(obj.get("Another")), Field::Unset);
}

#[test]
fn multivalue_relation_targets() {
    let db = Fixture::new().create();
    let obj = object(&db, "Third", "Test-1");
    let dummy = object(&db, "Dummy", "Test-2");
    let second = object(&db, "Second", "Test-3");

    // Unset multivalue relations read as empty
    assert_eq!(assert_ok!(obj.get("Seconds")), Field::Objects(vec![]));

    assert_eq!(
        kind(obj.set("Seconds", &second)),
        ValidationErrorKind::Cardinality { multivalue: true }
    );
    assert_eq!(
        kind(obj.set("Seconds", vec![second.clone(), dummy.clone()])),
        target("Second")
    );
    assert_eq!(kind(obj.set("Seconds", vec!["a", "b"])), target("Second"));

    assert_ok!(obj.set("Seconds", vec![second.clone(), obj.clone()]));
    assert_eq!(assert_ok!(obj.get("Seconds")).objects(), [second.clone(), obj.clone()]);

    // Every class derives from Dummy
    assert_ok!(obj.set("Dummy", vec![dummy.clone(), second, obj.clone()]));
    assert_eq!(assert_ok!(obj.get("Dummy")).objects().len(), 3);
    assert!(assert_err!(obj.set("Dummy", dummy)).is_cardinality());
}

#[test]
fn failed_writes_leave_the_field_alone() {
    let db = Fixture::new().create();
    let obj = object(&db, "Second", "Test-1");
    let second = object(&db, "Second", "Test-2");
    assert_ok!(obj.set("Another", &second));

    assert_err!(obj.set("Another", object(&db, "Dummy", "Test-3")));
    assert_eq!(assert_ok!(obj.get("Another")), Field::Object(second));
}

#[test]
fn relation_writes_are_tracked() {
    let db = Fixture::new().create();
    let obj = object(&db, "Third", "Test-1");
    let second = object(&db, "Second", "Test-2");
    assert_empty!(obj.touched());

    assert_ok!(obj.set("uint8", 1));
    assert_empty!(obj.touched());

    assert_ok!(obj.set("Single", &second));
    assert_ok!(obj.set("Seconds", vec![second.clone()]));
    assert_ok!(obj.set("Single", &second));
    assert_eq!(obj.touched(), ["Single", "Seconds"]);

    assert_ok!(db.update(&obj, true));
    assert_empty!(obj.touched());
}

#[test]
fn unknown_relation() {
    let db = Fixture::new().create();
    let obj = object(&db, "Second", "Test-1");
    let other = object(&db, "Second", "Test-2");

    let err = assert_err!(obj.set("Single", &other));
    assert!(err.is_unknown_field());
    assert!(assert_err!(obj.get("Seconds")).is_unknown_field());
}

#[test]
fn identity() {
    let db = Fixture::new().create();
    let obj1 = object(&db, "Dummy", "Test-1");
    let obj2 = object(&db, "Dummy", "Test-1");
    let obj3 = object(&db, "Dummy", "Test-2");
    let obj4 = object(&db, "Second", "Test-1");

    // Same class and id, distinct instances
    assert_eq!(obj1, obj2);
    assert!(!obj1.ptr_eq(&obj2));
    assert_ok!(obj1.set("uint8", 5));
    assert_eq!(obj1, obj2);

    assert_ne!(obj1, obj3);
    assert_ne!(obj1, obj4);

    let set: HashSet<_> = [&obj1, &obj2, &obj3, &obj4].into_iter().cloned().collect();
    assert_eq!(set.len(), 3);

    let mut sorted = vec![obj4.clone(), obj3.clone(), obj1.clone()];
    sorted.sort();
    assert_eq!(sorted, [obj1, obj3, obj4]);
}

#[test]
fn renaming_changes_identity() {
    let db = Fixture::new().create();
    let obj = object(&db, "Dummy", "Test-1");
    obj.rename("Test-2");
    assert_eq!(obj, object(&db, "Dummy", "Test-2"));
    assert_eq!(obj.full_name(), "Test-2@Dummy");

    // The id the store knows is kept until the object is persisted
    obj.rename("Test-1");
    assert_eq!(obj.pending_rename().as_deref(), Some("Test-1"));
}

#[test]
fn the_id_field() {
    let db = Fixture::new().create();
    let obj = object(&db, "Dummy", "Test-1");
    assert_eq!(assert_ok!(obj.get("id")), Field::from("Test-1"));

    assert_ok!(obj.set("id", "Test-9"));
    assert_eq!(obj.id(), "Test-9");
    assert_none!(obj.pending_rename());

    assert_eq!(
        kind(obj.set("id", 9)),
        ValidationErrorKind::Coercion { to: "string".into() }
    );
}

#[test]
fn build_in_one_expression() {
    let db = Fixture::new().create();
    let second = object(&db, "Second", "Test-2");
    let obj = object(&db, "Third", "Test-1")
        .with("uint8", 12)
        .unwrap()
        .with("string", "text")
        .unwrap()
        .with("Single", &second)
        .unwrap();

    assert_eq!(assert_ok!(obj.get("uint8")), Field::from(12u8));
    assert_eq!(assert_ok!(obj.get("string")), Field::from("text"));
    assert_eq!(assert_ok!(obj.get("Single")), Field::Object(second));

    let err = assert_err!(object(&db, "Third", "Test-3").with("uint8", 256));
    assert!(err.is_validation());
}

#[test]
fn class_queries() {
    let db = Fixture::new().create();
    let obj = object(&db, "Third", "Test-1");

    assert_eq!(obj.types(), ["Third", "Second", "Dummy"]);
    assert!(obj.is_a("Third"));
    assert!(obj.is_a("Dummy"));
    assert!(!object(&db, "Dummy", "Test-2").is_a("Second"));

    assert!(obj.is_a_pattern(&Regex::new("^Sec").unwrap()));
    assert!(obj.is_a_pattern(&Regex::new("Dum").unwrap()));
    assert!(!obj.is_a_pattern(&Regex::new("mm").unwrap()));
    assert!(!obj.is_a_pattern(&Regex::new("^Other$").unwrap()));
}

#[test]
fn copy_fields() {
    let db = Fixture::new().create();
    let second = object(&db, "Second", "Test-9");
    let src = object(&db, "Third", "Test-1")
        .with("uint8", 5)
        .unwrap()
        .with("string_vector", vec!["test01"])
        .unwrap()
        .with("Another", &second)
        .unwrap()
        .with("Single", &second)
        .unwrap();

    // Fields the target class lacks are skipped
    let dst = object(&db, "Second", "Test-2");
    assert_ok!(dst.copy(&src));
    assert_eq!(assert_ok!(dst.get("uint8")), Field::from(5u8));
    assert_eq!(assert_ok!(dst.get("string_vector")), Field::from(vec!["test01"]));
    assert_eq!(assert_ok!(dst.get("Another")), Field::Object(second));
    assert_eq!(dst.touched(), ["Another"]);

    let dummy = object(&db, "Dummy", "Test-3");
    assert_ok!(dummy.copy(&src));
    assert_eq!(assert_ok!(dummy.get("uint8")), Field::from(5u8));
    assert_eq!(dummy.id(), "Test-3");
}

#[test]
fn unchecked_writes() {
    let db = Fixture::new().create();
    let obj = object(&db, "Dummy", "Test-1");

    assert_ok!(obj.set_unchecked("uint8", 300));
    assert_eq!(assert_ok!(obj.get("uint8")), Field::Value(Value::I32(300)));
    assert!(assert_err!(obj.set_unchecked("nope", 1)).is_unknown_field());
}

#[test]
fn traversal_visits_each_object_once() {
    let db = Fixture::new().create();
    let a = object(&db, "Third", "A");
    let b = object(&db, "Second", "B");
    let c = object(&db, "Second", "C");
    assert_ok!(a.set("Single", &b));
    assert_ok!(a.set("Seconds", vec![b.clone(), c.clone()]));
    assert_ok!(b.set("Another", &c));
    assert_ok!(c.set("Another", &a));

    let all: Vec<String> = a.traverse_all().iter().map(DalObject::id).collect();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0], "A");
    assert_unique!(all);
}
