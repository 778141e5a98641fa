//! Property-based tests for record laws using proptest.
//!
//! - Bounds: values below `min_value` are rejected, the bound itself is accepted
//! - Round-trip: serializing and reconstructing yields an equal record
//! - Idempotence: serializing twice yields identical mappings
//! - Required fields: omitting a required field always fails
//! - Alias/rename: alias input equals canonical input, output uses the rename
//! - Clone: exclude is the complement of include

use proptest::prelude::*;
use record_schemas::{map, CloneSpec, FieldSpec, Map, Schema, SchemaRegistry, TypeExpr, ValidationErrorKind, Value};

// ═══════════════════════════════════════════════════════════════════════════
// FIXTURES
// ═══════════════════════════════════════════════════════════════════════════

fn registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register(
            Schema::builder("Tag")
                .field("label", FieldSpec::builder(TypeExpr::string()).min_length(1).build().unwrap())
                .field_of("weight", TypeExpr::optional(TypeExpr::float()))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            Schema::builder("Entry")
                .field(
                    "title",
                    FieldSpec::builder(TypeExpr::string())
                        .alias("_title")
                        .rename("heading")
                        .build()
                        .unwrap(),
                )
                .field("count", FieldSpec::builder(TypeExpr::int()).min_value(0).build().unwrap())
                .field_of("tags", TypeExpr::list_of(TypeExpr::schema("Tag")))
                .field_of("extra", TypeExpr::map_of(TypeExpr::string(), TypeExpr::int()))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

// ═══════════════════════════════════════════════════════════════════════════
// GENERATORS
// ═══════════════════════════════════════════════════════════════════════════

fn tag() -> impl Strategy<Value = Value> {
    ("[a-z]{1,8}", proptest::option::of(-1.0e6f64..1.0e6)).prop_map(|(label, weight)| {
        let mut m = map! { "label" => label };
        if let Some(weight) = weight {
            m.insert("weight".into(), Value::Float(weight));
        }
        Value::Map(m)
    })
}

fn entry() -> impl Strategy<Value = Map> {
    (
        "[A-Za-z ]{0,16}",
        0i64..1_000_000,
        proptest::collection::vec(tag(), 0..4),
        proptest::collection::btree_map("[a-z]{1,4}", any::<i64>(), 0..4),
    )
        .prop_map(|(title, count, tags, extra)| {
            let extra: Map = extra.into_iter().map(|(k, v)| (k, Value::Int(v))).collect();
            map! { "title" => title, "count" => count, "tags" => tags, "extra" => extra }
        })
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn prop_bounds_law(bound in -1000i64..1000, offset in 1i64..1000) {
        let mut registry = SchemaRegistry::new();
        registry.register(
            Schema::builder("Bounded")
                .field("n", FieldSpec::builder(TypeExpr::int()).min_value(bound).build().unwrap())
                .build()
                .unwrap(),
        ).unwrap();

        prop_assert!(registry.construct("Bounded", map!("n" => bound)).is_ok());
        let err = registry.construct("Bounded", map! { "n" => bound - offset }).unwrap_err();
        let is_below = matches!(err.validation().map(|v| &v.kind), Some(ValidationErrorKind::BelowMinimum { .. }));
        prop_assert!(is_below);
    }

    #[test]
    fn prop_round_trip(input in entry()) {
        let registry = registry();
        let record = registry.construct("Entry", input).unwrap();

        let wire = record.serialize();
        prop_assert_eq!(&wire, &record.serialize());

        let again = registry.construct("Entry", wire).unwrap();
        prop_assert_eq!(record, again);
    }

    #[test]
    fn prop_required_fields(input in entry(), missing in prop::sample::select(vec!["title", "count", "tags", "extra"])) {
        let registry = registry();
        let mut input = input;
        input.remove(missing);

        let err = registry.construct("Entry", input).unwrap_err();
        let validation = err.validation().unwrap();
        prop_assert_eq!(&validation.kind, &ValidationErrorKind::Missing);
        prop_assert_eq!(validation.path.clone(), format!("Entry#{}", missing));
    }

    #[test]
    fn prop_alias_rename_law(input in entry()) {
        let registry = registry();
        let canonical = registry.construct("Entry", input.clone()).unwrap();

        let mut aliased = input;
        let title = aliased.remove("title").unwrap();
        aliased.insert("_title".into(), title.clone());
        let via_alias = registry.construct("Entry", aliased).unwrap();

        prop_assert_eq!(&canonical, &via_alias);
        let wire = via_alias.serialize();
        prop_assert_eq!(wire.get("heading"), Some(&title));
        prop_assert!(!wire.contains_key("title"));
    }

    #[test]
    fn prop_clone_exclude_complements_include(field in prop::sample::select(vec!["title", "count", "tags", "extra"])) {
        let registry = registry();
        let entry = registry.schema("Entry").unwrap();

        let excluded = entry.clone_with("Excluded", CloneSpec::exclude([field])).unwrap();
        let included = entry.clone_with("Included", CloneSpec::include([field])).unwrap();

        let mut union: Vec<&str> = excluded.field_names();
        union.extend(included.field_names());
        union.sort_unstable();
        let mut all = entry.field_names();
        all.sort_unstable();
        prop_assert_eq!(union, all);
        prop_assert_eq!(entry.len(), 4);
    }
}
