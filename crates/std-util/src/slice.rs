#[macro_export]
macro_rules! assert_empty {
    ($e:expr) => {
        match &$e {
            v if v.is_empty() => {}
            actual => panic!("expected empty; actual={:?}", actual),
        }
    };
}

/// Asserts no two items of the iterable compare equal.
#[macro_export]
macro_rules! assert_unique {
    ($e:expr) => {{
        let items: Vec<_> = $e.into_iter().collect();
        for (i, a) in items.iter().enumerate() {
            for b in &items[i + 1..] {
                assert!(a != b, "duplicate item {:?} in {:?}", a, items);
            }
        }
    }};
}
