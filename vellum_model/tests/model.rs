// Copyright 2025 the Vellum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests for the `vellum_model` crate.
//!
//! Class names are registered process-wide, so every test declares classes
//! under its own names.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;
use serde_json::json;
use vellum_model::{
    ChangeHint, HasProps, Init, ModelClass, ModelError, PatchIndex, Patches, RecordingSink,
    Setter, ThemedValues,
};
use vellum_property::{
    ColumnData, DataSpec, Float, Int, List, Property, PropertyError, Str, Value, ValueMap, expr,
    field_with_transform, instance,
};

fn observed(class: &Arc<ModelClass>) -> (HasProps, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let mut obj = HasProps::new(class);
    obj.subscribe(sink.clone());
    (obj, sink)
}

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn mutable_defaults_are_per_instance() {
    let class = ModelClass::builder("TestListHolder")
        .property("items", Property::new(List::new(Int)))
        .build()
        .unwrap();
    let mut a = HasProps::new(&class);
    let mut b = HasProps::new(&class);

    a.list_mut("items").unwrap().push(1).unwrap();

    assert_eq!(a.get("items").unwrap(), Value::list([1]));
    assert_eq!(b.get("items").unwrap(), Value::list(Vec::<Value>::new()));
}

#[test]
fn generated_defaults_are_cached_per_instance() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let class = ModelClass::builder("TestGenerated")
        .property(
            "tags",
            Property::new(List::new(Str))
                .with_default_fn(|| {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    Value::list(["a"])
                })
                .unwrap(),
        )
        .build()
        .unwrap();

    let mut obj = HasProps::new(&class);
    let before = CALLS.load(Ordering::SeqCst);
    let first = obj.get("tags").unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), before + 1);
    let second = obj.get("tags").unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), before + 1, "cached default must be reused");
    assert_eq!(first, second);

    let mut other = HasProps::new(&class);
    other.get("tags").unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), before + 2);
}

#[test]
fn undefined_default_is_an_error_until_set() {
    let class = ModelClass::builder("TestUndefined")
        .property("target", Property::new(Int).undefined())
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    assert!(matches!(
        obj.get("target"),
        Err(ModelError::UnsetValue { .. })
    ));
    obj.set("target", 3).unwrap();
    assert_eq!(obj.get("target").unwrap(), Value::Int(3));

    obj.unset("target").unwrap();
    assert!(obj.resolve("target").is_err());
}

#[test]
fn overridden_defaults_apply_to_subclasses() {
    let base = ModelClass::builder("TestOverrideBase")
        .property("alpha", Property::new(Float).with_default(1.0).unwrap())
        .build()
        .unwrap();
    let derived = ModelClass::builder("TestOverrideDerived")
        .extends(&base)
        .override_default("alpha", 0.25)
        .build()
        .unwrap();

    let mut obj = HasProps::new(&derived);
    assert_eq!(obj.get("alpha").unwrap(), Value::Float(0.25));
    assert_eq!(HasProps::new(&base).get("alpha").unwrap(), Value::Float(1.0));
}

// =============================================================================
// Construction
// =============================================================================

#[test]
fn readonly_only_during_construction() {
    let class = ModelClass::builder("TestReadonly")
        .property("count", Property::new(Int).readonly())
        .build()
        .unwrap();

    let mut obj = HasProps::with_values(&class, [("count", Init::value(3))]).unwrap();
    assert_eq!(obj.get("count").unwrap(), Value::Int(3));

    let err = obj.set("count", 4).unwrap_err();
    assert_eq!(err.to_string(), "TestReadonly.count is a readonly property");

    obj.set_from_json("count", &json!(5), None, None).unwrap();
    assert_eq!(obj.get("count").unwrap(), Value::Int(5));
}

#[test]
fn intrinsic_init_keeps_default() {
    let class = ModelClass::builder("TestIntrinsic")
        .property("width", Property::new(Int).with_default(7).unwrap())
        .build()
        .unwrap();
    let mut obj = HasProps::with_values(&class, [("width", Init::Intrinsic)]).unwrap();
    assert_eq!(obj.get("width").unwrap(), Value::Int(7));
    assert!(obj.properties_with_values(false).unwrap().is_empty());
}

#[test]
fn allocated_instances_fail_until_initialized() {
    let class = ModelClass::builder("TestAllocated")
        .property("width", Property::new(Int))
        .build()
        .unwrap();
    let mut obj = HasProps::allocate(&class, "shell-1");
    assert_eq!(obj.id(), "shell-1");
    assert!(matches!(
        obj.get("width"),
        Err(ModelError::ConstructionOrder { .. })
    ));
    assert!(matches!(
        obj.set("width", 2),
        Err(ModelError::ConstructionOrder { .. })
    ));

    obj.initialize([("width", Init::value(2))]).unwrap();
    assert!(obj.is_initialized());
    assert_eq!(obj.get("width").unwrap(), Value::Int(2));
}

#[test]
fn duplicate_units_attribute_is_rejected() {
    let err = ModelClass::builder("TestDuplicateUnits")
        .property("x", Property::new(DataSpec::distance()))
        .property("x_units", Property::new(Str))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::DuplicateDescriptor {
            class: "TestDuplicateUnits".to_owned(),
            name: "x_units".to_owned(),
        }
    );
}

#[test]
fn unknown_attributes_suggest_names() {
    let class = ModelClass::builder("TestSuggest")
        .property("line_width", Property::new(Float))
        .property("line_color", Property::new(Str))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    match obj.set("line_widht", 1.0) {
        Err(ModelError::UnknownAttribute { similar, possible, .. }) => {
            assert!(similar, "a close match should be offered");
            assert_eq!(possible.first().map(String::as_str), Some("line_width"));
        }
        other => panic!("expected an unknown attribute error, got {other:?}"),
    }
}

// =============================================================================
// Change notification
// =============================================================================

#[test]
fn unchanged_sets_are_silent() {
    let class = ModelClass::builder("TestSilent")
        .property("alpha", Property::new(Float).with_default(1.0).unwrap())
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);

    obj.set("alpha", 1.0).unwrap();
    assert!(sink.is_empty(), "setting the default is not a change");

    obj.set("alpha", 0.5).unwrap();
    obj.set("alpha", 0.5).unwrap();
    let changes = sink.take();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].old, Some(Value::Float(1.0)));
    assert_eq!(changes[0].new, Value::Float(0.5));
    assert_eq!(&*changes[0].model, obj.id());
}

#[test]
fn column_data_sets_always_notify() {
    let class = ModelClass::builder("TestColumnSet")
        .property("data", Property::new(ColumnData::default()))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    let data = Value::dict([("x", Value::list([1, 2]))]);

    obj.set("data", data.clone()).unwrap();
    obj.set("data", data).unwrap();

    let changes = sink.take();
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|change| matches!(
        change.hint,
        Some(ChangeHint::ColumnDataChanged { cols: None })
    )));
}

#[test]
fn setter_is_reported() {
    let class = ModelClass::builder("TestSetter")
        .property("width", Property::new(Int))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    let setter = Setter::new("session-1");
    obj.set_with_setter("width", 3, &setter).unwrap();
    let changes = sink.take();
    assert_eq!(changes[0].setter.as_ref().map(Setter::as_str), Some("session-1"));
}

#[test]
fn unset_notifies_when_value_changes() {
    let class = ModelClass::builder("TestUnset")
        .property("width", Property::new(Int).with_default(1).unwrap())
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    obj.set("width", 5).unwrap();
    obj.unset("width").unwrap();
    assert_eq!(obj.get("width").unwrap(), Value::Int(1));
    let changes = sink.take();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[1].old, Some(Value::Int(5)));
    assert_eq!(changes[1].new, Value::Int(1));
}

// =============================================================================
// Data specs
// =============================================================================

#[test]
fn number_spec_values_and_fields() {
    let class = ModelClass::builder("TestNumberSpec")
        .property("size", Property::new(DataSpec::number()).with_default(4.0).unwrap())
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);

    obj.set("size", 10.0).unwrap();
    assert_eq!(
        obj.properties_with_values(false).unwrap()["size"],
        json!({"value": 10.0})
    );

    obj.set("size", "pressure").unwrap();
    assert_eq!(
        obj.properties_with_values(false).unwrap()["size"],
        json!({"field": "pressure"})
    );

    assert!(matches!(
        obj.set("size", Value::list([1])),
        Err(ModelError::Property(PropertyError::Validation { .. }))
    ));
}

#[test]
fn units_are_routed_to_sibling() {
    let class = ModelClass::builder("TestUnits")
        .property("radius", Property::new(DataSpec::distance()))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);

    let spec = Value::dict([
        ("value", Value::Float(2.0)),
        ("units", Value::from("screen")),
    ]);
    obj.set("radius", spec).unwrap();

    assert_eq!(sink.attrs(), ["radius_units", "radius"]);
    assert_eq!(obj.get("radius_units").unwrap(), Value::from("screen"));
    assert_eq!(
        obj.get("radius").unwrap(),
        Value::dict([("value", Value::Float(2.0))])
    );

    let attrs = obj.properties_with_values(false).unwrap();
    assert_eq!(attrs["radius"], json!({"value": 2.0, "units": "screen"}));
    assert!(!attrs.contains_key("radius_units"), "units are not serialized on their own");
}

#[test]
fn default_units_are_not_serialized() {
    let class = ModelClass::builder("TestDefaultUnits")
        .property("radius", Property::new(DataSpec::distance()))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    obj.set("radius", 3.0).unwrap();
    assert_eq!(
        obj.properties_with_values(false).unwrap()["radius"],
        json!({"value": 3.0})
    );
}

#[test]
fn color_spec_tuples_serialize_as_values() {
    let class = ModelClass::builder("TestColorSpecTuple")
        .property("fill_color", Property::new(DataSpec::color()))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);

    obj.set("fill_color", (255, 0, 0)).unwrap();
    assert_eq!(obj.get("fill_color").unwrap(), Value::from((255, 0, 0)));
    assert_eq!(
        obj.properties_with_values(false).unwrap()["fill_color"],
        json!({"value": "rgb(255, 0, 0)"})
    );

    obj.set("fill_color", (100.2, 57.3, 10.2)).unwrap();
    assert_eq!(
        obj.properties_with_values(false).unwrap()["fill_color"],
        json!({"value": "rgb(100, 57, 10)"})
    );

    obj.set("fill_color", (1, 2, 3, 0.5)).unwrap();
    assert_eq!(
        obj.properties_with_values(false).unwrap()["fill_color"],
        json!({"value": "rgba(1, 2, 3, 0.5)"})
    );
}

#[test]
fn color_spec_hex_values_and_field_names() {
    let class = ModelClass::builder("TestColorSpecHex")
        .property("line_color", Property::new(DataSpec::color()))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    let wire = |obj: &HasProps| obj.properties_with_values(false).unwrap()["line_color"].clone();

    obj.set("line_color", "#a240a2").unwrap();
    assert_eq!(wire(&obj), json!({"value": "#a240a2"}));

    obj.set("line_color", "firebrick").unwrap();
    assert_eq!(wire(&obj), json!({"value": "firebrick"}));

    obj.set("line_color", "colors").unwrap();
    assert_eq!(wire(&obj), json!({"field": "colors"}));

    obj.set("line_color", "#abc").unwrap();
    assert_eq!(wire(&obj), json!({"field": "#abc"}));
}

#[test]
fn spec_dicts_with_models_serialize_and_are_referenced() {
    let transform_class = ModelClass::builder("Transform").build().unwrap();
    let expression_class = ModelClass::builder("Expression").build().unwrap();
    let glyph_class = ModelClass::builder("TestSpecRefs")
        .property("x", Property::new(DataSpec::number()))
        .property("y", Property::new(DataSpec::number()))
        .build()
        .unwrap();
    let transform = HasProps::new(&transform_class);
    let expression = HasProps::new(&expression_class);
    let mut glyph = HasProps::new(&glyph_class);

    glyph
        .set("x", field_with_transform("col", transform.model_ref()))
        .unwrap();
    glyph.set("y", expr(expression.model_ref())).unwrap();

    let attrs = glyph.properties_with_values(false).unwrap();
    assert_eq!(
        attrs["x"],
        json!({"field": "col", "transform": {"id": transform.id()}})
    );
    assert_eq!(attrs["y"], json!({"expr": {"id": expression.id()}}));

    let refs = glyph.references().unwrap();
    let ids: Vec<&str> = refs.iter().map(|r| r.id()).collect();
    assert_eq!(ids, [transform.id(), expression.id()]);
}

#[test]
fn json_updates_keep_value_format() {
    let class = ModelClass::builder("TestFormat")
        .property("size", Property::new(DataSpec::number()))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);

    obj.set("size", 1.0).unwrap();
    obj.set_from_json("size", &json!({"value": 5.0}), None, None)
        .unwrap();
    assert_eq!(obj.get("size").unwrap(), Value::Float(5.0));

    obj.set("size", "a").unwrap();
    obj.set_from_json("size", &json!({"field": "b"}), None, None)
        .unwrap();
    assert_eq!(obj.get("size").unwrap(), Value::from("b"));
}

#[test]
fn json_units_are_routed_to_sibling() {
    let class = ModelClass::builder("TestJsonUnits")
        .property("angle", Property::new(DataSpec::angle()))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    obj.set_from_json("angle", &json!({"value": 90.0, "units": "deg"}), None, None)
        .unwrap();
    assert_eq!(obj.get("angle_units").unwrap(), Value::from("deg"));
    assert_eq!(
        obj.get("angle").unwrap(),
        Value::dict([("value", Value::Float(90.0))])
    );
}

#[test]
fn unknown_json_attributes_are_ignored() {
    let class = ModelClass::builder("TestJsonUnknown")
        .property("width", Property::new(Int))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    obj.set_from_json("client_only", &json!(1), None, None)
        .unwrap();
    assert!(sink.is_empty());

    let attrs = json!({"width": 4, "also_unknown": true});
    obj.update_from_json(attrs.as_object().unwrap(), None, None)
        .unwrap();
    assert_eq!(obj.get("width").unwrap(), Value::Int(4));
}

// =============================================================================
// Themes
// =============================================================================

#[test]
fn themes_notify_changed_names_only() {
    let class = ModelClass::builder("TestThemed")
        .property("width", Property::new(Int).with_default(1).unwrap())
        .property("alpha", Property::new(Float).with_default(1.0).unwrap())
        .property("title", Property::new(Str).with_default("t").unwrap())
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    obj.set("width", 10).unwrap();
    sink.take();

    let theme: ThemedValues = [
        ("width", Value::Int(5)),
        ("alpha", Value::Float(0.5)),
        ("title", Value::from("t")),
    ]
    .into_iter()
    .collect();
    obj.apply_theme(theme.clone()).unwrap();

    assert_eq!(sink.attrs(), ["alpha"]);
    assert_eq!(obj.get("width").unwrap(), Value::Int(10), "explicit values win");
    assert_eq!(obj.get("alpha").unwrap(), Value::Float(0.5));

    obj.apply_theme(theme).unwrap();
    assert_eq!(sink.len(), 1, "re-applying the same theme is a no-op");

    obj.unapply_theme().unwrap();
    assert_eq!(sink.attrs(), ["alpha", "alpha"]);
    assert_eq!(obj.get("alpha").unwrap(), Value::Float(1.0));
}

#[test]
fn themed_values_are_serialized() {
    let class = ModelClass::builder("TestThemedSerialized")
        .property("alpha", Property::new(Float).with_default(1.0).unwrap())
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    obj.apply_theme([("alpha", 0.5)].into_iter().collect())
        .unwrap();
    assert_eq!(
        obj.properties_with_values(false).unwrap()["alpha"],
        json!(0.5)
    );
}

// =============================================================================
// Container mutation
// =============================================================================

#[test]
fn list_mutations_notify() {
    let class = ModelClass::builder("TestListMutation")
        .property("items", Property::new(List::new(Int)))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    {
        let mut items = obj.list_mut("items").unwrap();
        items.extend([1, 2, 3]).unwrap();
        items.insert(0, 0).unwrap();
        assert_eq!(items.remove(1).unwrap(), Value::Int(1));
        assert_eq!(items.pop().unwrap(), Some(Value::Int(3)));
        assert_eq!(items.len(), 2);
    }
    assert_eq!(obj.get("items").unwrap(), Value::list([0, 2]));
    assert_eq!(sink.len(), 4);

    let changes = sink.take();
    assert_eq!(changes[0].old, Some(Value::list(Vec::<Value>::new())));
    assert_eq!(changes[0].new, Value::list([1, 2, 3]));
}

#[test]
fn invalid_mutations_roll_back() {
    let class = ModelClass::builder("TestRollback")
        .property("items", Property::new(List::new(Int)))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    obj.set("items", Value::list([1])).unwrap();
    sink.take();

    let err = obj.list_mut("items").unwrap().push("x").unwrap_err();
    assert!(matches!(err, ModelError::Property(_)), "got {err:?}");
    assert_eq!(obj.get("items").unwrap(), Value::list([1]));
    assert!(sink.is_empty());

    let err = obj.list_mut("items").unwrap().remove(5).unwrap_err();
    assert!(matches!(err, ModelError::InvalidMutation { .. }));
}

#[test]
fn container_views_check_shape() {
    let class = ModelClass::builder("TestNotAList")
        .property("width", Property::new(Int))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    assert!(matches!(
        obj.list_mut("width"),
        Err(ModelError::NotAContainer { expected: "list", .. })
    ));
}

#[test]
fn dict_mutations_notify() {
    let class = ModelClass::builder("TestDictMutation")
        .property("tags", Property::new(vellum_property::Dict::new(Str, Int)))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);
    {
        let mut tags = obj.dict_mut("tags").unwrap();
        tags.insert("a", 1).unwrap();
        tags.update([("b", 2), ("c", 3)]).unwrap();
        tags.remove("a").unwrap();
        assert_eq!(tags.get("b"), Some(&Value::Int(2)));
    }
    assert_eq!(
        obj.get("tags").unwrap(),
        Value::dict([("b", 2), ("c", 3)])
    );
    assert_eq!(sink.len(), 3);
}

fn column_source(name: &str) -> HasProps {
    let class = ModelClass::builder(name)
        .property("data", Property::new(ColumnData::default()))
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    obj.set(
        "data",
        Value::dict([("x", Value::list([1, 2])), ("y", Value::list([3, 4]))]),
    )
    .unwrap();
    obj
}

#[test]
fn stream_appends_with_rollover() {
    let mut obj = column_source("TestStream");
    let sink = Arc::new(RecordingSink::new());
    obj.subscribe(sink.clone());

    let rows: ValueMap = [
        ("x".to_owned(), Value::list([5, 6])),
        ("y".to_owned(), Value::list([7, 8])),
    ]
    .into_iter()
    .collect();
    obj.column_data_mut("data")
        .unwrap()
        .stream(rows, Some(3))
        .unwrap();

    let data = obj.get("data").unwrap();
    let data = data.as_dict().unwrap();
    assert_eq!(data["x"], Value::list([2, 5, 6]));
    assert_eq!(data["y"], Value::list([4, 7, 8]));

    let changes = sink.take();
    assert!(matches!(
        changes[0].hint,
        Some(ChangeHint::ColumnsStreamed { rollover: Some(3), .. })
    ));
}

#[test]
fn stream_with_zero_rollover_keeps_every_row() {
    let mut obj = column_source("TestStreamZeroRollover");
    let rows: ValueMap = [
        ("x".to_owned(), Value::list([5])),
        ("y".to_owned(), Value::list([7])),
    ]
    .into_iter()
    .collect();
    obj.column_data_mut("data")
        .unwrap()
        .stream(rows, Some(0))
        .unwrap();

    let data = obj.get("data").unwrap();
    assert_eq!(data.as_dict().unwrap()["x"], Value::list([1, 2, 5]));
}

#[test]
fn empty_mutations_leave_defaults_unset() {
    let class = ModelClass::builder("TestEmptyMutation")
        .property("items", Property::new(List::new(Int)))
        .build()
        .unwrap();
    let (mut obj, sink) = observed(&class);

    obj.list_mut("items").unwrap().extend(Vec::<Value>::new()).unwrap();

    assert!(sink.is_empty());
    assert!(!obj.properties_with_values(false).unwrap().contains_key("items"));
}

#[test]
fn stream_must_cover_existing_columns() {
    let mut obj = column_source("TestStreamMissing");
    let rows: ValueMap = [("x".to_owned(), Value::list([5]))].into_iter().collect();
    let err = obj
        .column_data_mut("data")
        .unwrap()
        .stream(rows, None)
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidMutation { .. }));
    assert_eq!(
        obj.get("data").unwrap().as_dict().unwrap()["x"],
        Value::list([1, 2])
    );
}

#[test]
fn patch_replaces_rows() {
    let mut obj = column_source("TestPatch");
    let sink = Arc::new(RecordingSink::new());
    obj.subscribe(sink.clone());

    let mut patches = Patches::new();
    patches.insert("x".to_owned(), vec![(PatchIndex::Index(0), Value::Int(10))]);
    patches.insert(
        "y".to_owned(),
        vec![(PatchIndex::Range { start: 0, end: 2 }, Value::list([30, 40]))],
    );
    obj.column_data_mut("data").unwrap().patch(patches).unwrap();

    let data = obj.get("data").unwrap();
    let data = data.as_dict().unwrap();
    assert_eq!(data["x"], Value::list([10, 2]));
    assert_eq!(data["y"], Value::list([30, 40]));
    assert!(matches!(
        sink.take()[0].hint,
        Some(ChangeHint::ColumnsPatched { .. })
    ));
}

#[test]
fn out_of_range_patch_changes_nothing() {
    let mut obj = column_source("TestPatchRange");
    let mut patches = Patches::new();
    patches.insert("x".to_owned(), vec![(PatchIndex::Index(0), Value::Int(10))]);
    patches.insert("y".to_owned(), vec![(PatchIndex::Index(9), Value::Int(1))]);

    let err = obj
        .column_data_mut("data")
        .unwrap()
        .patch(patches)
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidMutation { .. }));
    assert_eq!(
        obj.get("data").unwrap().as_dict().unwrap()["x"],
        Value::list([1, 2])
    );
}

// =============================================================================
// Serialization and identity
// =============================================================================

#[test]
fn object_representation() {
    let class = ModelClass::builder("TestSerializable")
        .property("width", Property::new(Int).with_default(1).unwrap())
        .build()
        .unwrap();
    let mut obj = HasProps::new(&class);
    assert_eq!(
        obj.to_serializable().unwrap(),
        json!({"type": "object", "name": "TestSerializable", "id": obj.id()})
    );

    obj.set("width", 2).unwrap();
    assert_eq!(
        obj.to_serializable().unwrap(),
        json!({
            "type": "object",
            "name": "TestSerializable",
            "id": obj.id(),
            "attributes": {"width": 2}
        })
    );

    let everything = obj.properties_with_values(true).unwrap();
    assert_eq!(everything.len(), 1);
}

#[test]
fn equality_and_duplication() {
    let class = ModelClass::builder("TestEquals")
        .property("width", Property::new(Int))
        .property("tags", Property::new(List::new(Str)))
        .build()
        .unwrap();
    let mut a = HasProps::new(&class);
    let b = HasProps::new(&class);
    assert!(a.equals(&b));

    a.set("width", 3).unwrap();
    assert!(!a.equals(&b));

    let copy = a.duplicate().unwrap();
    assert!(copy.equals(&a));
    assert_ne!(copy.id(), a.id());
}

#[test]
fn references_are_collected() {
    let target_class = ModelClass::builder("TestRefTarget").build().unwrap();
    let holder_class = ModelClass::builder("TestRefHolder")
        .property("target", instance("TestRefTarget"))
        .property("others", Property::new(List::new(instance("TestRefTarget"))))
        .build()
        .unwrap();
    let target = HasProps::new(&target_class);
    let mut holder = HasProps::new(&holder_class);

    holder.set("target", target.model_ref()).unwrap();
    holder
        .set("others", Value::list([target.model_ref()]))
        .unwrap();

    let refs = holder.references().unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].id(), target.id());

    let err = holder.set("target", 3).unwrap_err();
    assert!(matches!(err, ModelError::Property(_)));
}

proptest! {
    #[test]
    fn set_then_get_round_trips(values in prop::collection::vec(any::<i32>(), 0..16)) {
        let class = ModelClass::builder("TestPropRoundTrip")
            .property("items", Property::new(List::new(Int)))
            .build()
            .unwrap();
        let (mut obj, sink) = observed(&class);
        let list = Value::list(values.iter().copied());

        obj.set("items", list.clone()).unwrap();
        obj.set("items", list.clone()).unwrap();

        prop_assert_eq!(obj.get("items").unwrap(), list);
        prop_assert!(sink.len() <= 1, "repeated set must be silent");
    }

    #[test]
    fn stream_rollover_bounds_columns(
        batches in prop::collection::vec(1_usize..5, 1..6),
        keep in 1_usize..8,
    ) {
        let class = ModelClass::builder("TestPropStream")
            .property("data", Property::new(ColumnData::default()))
            .build()
            .unwrap();
        let mut obj = HasProps::new(&class);
        obj.set("data", Value::dict([("x", Value::list(Vec::<Value>::new()))]))
            .unwrap();

        let mut total = 0;
        for rows in batches {
            total += rows;
            let data: ValueMap = [("x".to_owned(), Value::list(vec![1; rows]))]
                .into_iter()
                .collect();
            obj.column_data_mut("data").unwrap().stream(data, Some(keep)).unwrap();
        }
        let data = obj.get("data").unwrap();
        let len = data.as_dict().unwrap()["x"].as_items().unwrap().len();
        prop_assert_eq!(len, total.min(keep));
    }
}
