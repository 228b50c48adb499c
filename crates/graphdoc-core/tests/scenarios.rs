//! # Serializer Scenarios
//!
//! End-to-end behaviour of flatten and update over a small people/pets
//! schema.

#![allow(clippy::panic)]

use graphdoc_core::{
    AttributeKind, Document, EntityDescriptor, Flattener, GraphStore, MemoryGraph, ObjectId,
    ObjectSerializer, Reconstructor, Schema, SerializationError, Timestamp, Value,
};
use serde_json::json;
use std::sync::Arc;

fn people_schema() -> Arc<Schema> {
    Arc::new(
        Schema::new()
            .with_entity(
                "Person",
                EntityDescriptor::new()
                    .attribute("name", AttributeKind::String)
                    .attribute("born", AttributeKind::Timestamp)
                    .to_one("bestFriend", Some("Person"))
                    .to_one("hometown", None)
                    .to_many("pets", Some("Pet"), true),
            )
            .with_entity(
                "Pet",
                EntityDescriptor::new().attribute("name", AttributeKind::String),
            ),
    )
}

fn friends_schema() -> Arc<Schema> {
    Arc::new(
        Schema::new().with_entity(
            "Person",
            EntityDescriptor::new()
                .attribute("name", AttributeKind::String)
                .to_one("bestFriend", Some("Person")),
        ),
    )
}

fn as_document(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn named(graph: &mut MemoryGraph, entity: &str, name: &str) -> ObjectId {
    let scope = graph.open_scope();
    let id = graph.create_object(entity, scope).expect("create");
    graph
        .set_attribute(id, "name", Some(Value::from(name)))
        .expect("name");
    id
}

// =============================================================================
// FLATTEN
// =============================================================================

mod flatten {
    use super::*;

    #[test]
    fn person_with_pet() {
        let schema = people_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let ann = named(&mut graph, "Person", "Ann");
        let rex = named(&mut graph, "Pet", "Rex");
        graph.add_to_many(ann, "pets", rex).expect("pets");

        let doc = Flattener::new(&*schema).flatten(&graph, ann).expect("flatten");
        assert_eq!(json!(doc), json!({"name": "Ann", "pets": [{"name": "Rex"}]}));
    }

    #[test]
    fn mutual_best_friends_cycle_is_cut() {
        let schema = friends_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let a = named(&mut graph, "Person", "A");
        let b = named(&mut graph, "Person", "B");
        graph.set_to_one(a, "bestFriend", Some(b)).expect("a -> b");
        graph.set_to_one(b, "bestFriend", Some(a)).expect("b -> a");

        let doc = Flattener::new(&*schema).flatten(&graph, a).expect("flatten");
        assert_eq!(json!(doc), json!({"name": "A", "bestFriend": {"name": "B"}}));
    }

    #[test]
    fn both_sides_flatten_independently() {
        // Pass state is per pass: flattening B after A sees a clean slate.
        let schema = people_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let a = named(&mut graph, "Person", "A");
        let b = named(&mut graph, "Person", "B");
        graph.set_to_one(a, "bestFriend", Some(b)).expect("a -> b");
        graph.set_to_one(b, "bestFriend", Some(a)).expect("b -> a");

        let flattener = Flattener::new(&*schema);
        let first = flattener.flatten(&graph, a).expect("flatten a");
        let second = flattener.flatten(&graph, b).expect("flatten b");

        assert_eq!(first["bestFriend"]["name"], json!("B"));
        assert_eq!(second["bestFriend"]["name"], json!("A"));
    }
}

// =============================================================================
// RECONSTRUCT
// =============================================================================

mod reconstruct {
    use super::*;

    #[test]
    fn fresh_person_gets_one_pet() {
        let schema = people_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let scope = graph.open_scope();
        let person = graph.create_object("Person", scope).expect("create");

        let doc = as_document(json!({"name": "Ann", "pets": [{"name": "Rex"}]}));
        Reconstructor::new(&*schema)
            .update(&mut graph, person, &doc)
            .expect("update");

        let pets = graph.to_many(person, "pets").expect("pets");
        assert_eq!(pets.len(), 1);
        assert_eq!(
            graph.attribute(pets[0], "name").expect("name"),
            Some(Value::from("Rex"))
        );
    }

    #[test]
    fn second_payload_wins() {
        let schema = people_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let ann = named(&mut graph, "Person", "Ann");
        let reconstructor = Reconstructor::new(&*schema);

        reconstructor
            .update(
                &mut graph,
                ann,
                &as_document(json!({"pets": [{"name": "Rex"}, {"name": "Tom"}]})),
            )
            .expect("first");
        reconstructor
            .update(
                &mut graph,
                ann,
                &as_document(json!({"pets": [{"name": "Kit"}, {"name": "Max"}]})),
            )
            .expect("second");

        let names: Vec<Option<Value>> = graph
            .to_many(ann, "pets")
            .expect("pets")
            .into_iter()
            .map(|pet| graph.attribute(pet, "name").expect("name"))
            .collect();
        assert_eq!(names, vec![Some(Value::from("Kit")), Some(Value::from("Max"))]);
    }

    #[test]
    fn timestamp_at_reference_epoch() {
        let schema = people_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let ann = named(&mut graph, "Person", "Ann");

        Reconstructor::new(&*schema)
            .update(&mut graph, ann, &as_document(json!({"born": 0})))
            .expect("update");

        let Some(Value::Timestamp(born)) = graph.attribute(ann, "born").expect("born") else {
            panic!("born should be a timestamp");
        };
        assert_eq!(born.unix_seconds(), 978_307_200.0);
        assert_eq!(born, Timestamp::from_unix_seconds(978_307_200.0));
    }

    #[test]
    fn unresolvable_target_leaves_field_untouched() {
        let schema = people_schema();
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let ann = named(&mut graph, "Person", "Ann");

        let report = Reconstructor::new(&*schema)
            .update(
                &mut graph,
                ann,
                &as_document(json!({"hometown": {"name": "Rome"}})),
            )
            .expect("no error");

        assert_eq!(graph.to_one(ann, "hometown").expect("hometown"), None);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn json_bytes_roundtrip() {
        let schema = people_schema();
        let serializer = ObjectSerializer::new(Arc::clone(&schema));
        let mut source = MemoryGraph::new(Arc::clone(&schema));
        let ann = named(&mut source, "Person", "Ann");
        let bo = named(&mut source, "Person", "Bo");
        source.set_to_one(ann, "bestFriend", Some(bo)).expect("link");

        let bytes = serializer.json_data(&source, ann).expect("encode");

        let mut target = MemoryGraph::new(Arc::clone(&schema));
        let scope = target.open_scope();
        let copy = target.create_object("Person", scope).expect("create");
        serializer
            .update_from_json(&mut target, copy, &bytes)
            .expect("decode");

        assert_eq!(
            serializer.dictionary(&target, copy).expect("flatten"),
            serializer.dictionary(&source, ann).expect("flatten")
        );
    }

    #[test]
    fn non_object_payload_rejected() {
        let schema = people_schema();
        let serializer = ObjectSerializer::new(Arc::clone(&schema));
        let mut graph = MemoryGraph::new(Arc::clone(&schema));
        let ann = named(&mut graph, "Person", "Ann");

        let result = serializer.update_from_json(&mut graph, ann, b"\"Ann\"");
        assert!(matches!(
            result,
            Err(SerializationError::InvalidDocument { .. })
        ));
    }
}
