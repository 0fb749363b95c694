use confdal::{DalType, Registry};
use pretty_assertions::assert_eq;
use tests::*;

use std::rc::Rc;

/// A registry that has read the fixture schema but derived nothing.
fn schemas_only(fixture: &Fixture) -> Registry {
    drop(fixture.create());

    let registry = Registry::new();
    assert_ok!(registry.schemas().refresh(fixture.store()));
    assert_empty!(registry.types());
    registry
}

fn classes(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn names(types: &[DalType]) -> Vec<String> {
    types.iter().map(|ty| ty.name().to_string()).collect()
}

#[test]
fn derive_children_before_their_bases() {
    let fixture = Fixture::new();
    let registry = schemas_only(&fixture);

    let derived = assert_ok!(registry.derive(&classes(&["Third", "Second", "Dummy"])));
    assert_eq!(names(&derived), ["Third", "Second", "Dummy"]);
    assert!(Rc::ptr_eq(&derived[0].bases()[0], &derived[1]));
    assert!(Rc::ptr_eq(&derived[1].bases()[0], &derived[2]));
    assert_empty!(derived[2].bases());

    // Bases are always derived first
    assert_eq!(names(&registry.types()), ["Dummy", "Second", "Third"]);
}

#[test]
fn derive_stalls_without_a_base() {
    let fixture = Fixture::new();
    let registry = schemas_only(&fixture);

    let err = assert_err!(registry.derive(&classes(&["Third", "Second"])));
    assert!(err.is_invalid_schema(), "{err}");
    assert!(
        err.to_string().contains("cannot derive types for Second, Third"),
        "{err}"
    );
    assert_none!(registry.get("Second"));
    assert_none!(registry.get("Third"));
}

#[test]
fn registered_types_serve_as_bases() {
    let fixture = Fixture::new();
    let registry = schemas_only(&fixture);
    assert_err!(registry.derive(&classes(&["Second"])));

    let dummy = assert_ok!(registry.register("Dummy", &[]));
    assert!(registry.is_known("Dummy"));

    let derived = assert_ok!(registry.derive(&classes(&["Third", "Second"])));
    assert!(Rc::ptr_eq(&derived[1].bases()[0], &dummy));
    assert_eq!(derived[0].types(), ["Third", "Second", "Dummy"]);

    assert!(assert_err!(registry.register("Nope", &[])).is_invalid_schema());
}
