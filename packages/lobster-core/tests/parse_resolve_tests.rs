//! End-to-end parse and resolve behavior on a synthetic dump

mod common;

use common::*;
use pretty_assertions::assert_eq;

use lobster_core::errors::ErrorKind;
use lobster_core::parser::{parse_buffer, ReadBuffer};
use lobster_core::snapshot::{RootKind, Snapshot, Value};

fn load() -> Snapshot {
    let mut snapshot = parse_buffer(ReadBuffer::from_vec(sample_dump())).unwrap();
    snapshot.resolve(true).unwrap();
    snapshot
}

#[test]
fn test_header_and_counts() {
    let snapshot = load();
    assert_eq!(snapshot.id_size(), ID_SIZE);
    assert!(snapshot.find_class("com.example.Node").is_some());
    assert!(snapshot.find_class("com.example.Missing").is_none());
    assert!(snapshot.find_thing(0).is_none());
}

#[test]
fn test_find_class_by_hex_id() {
    let snapshot = load();
    let by_name = snapshot.find_class("com.example.Node").unwrap();
    let by_id = snapshot.find_class("0x110").unwrap();
    assert_eq!(by_name, by_id);
    // hex ids of non-classes do not resolve as classes
    assert!(snapshot.find_class("0x200").is_none());
}

#[test]
fn test_superclass_chain_and_field_order() {
    let snapshot = load();
    let leaf_class = snapshot.find_class("com.example.Leaf").unwrap();
    let node_class = snapshot.find_class("com.example.Node").unwrap();

    let names: Vec<&str> = snapshot
        .fields_for_instance(leaf_class)
        .iter()
        .map(|(_, f)| f.name.as_str())
        .collect();
    // superclass fields come first
    assert_eq!(names, vec!["next", "id", "tag"]);

    assert!(snapshot.is_assignable_from(node_class, leaf_class));
    assert!(!snapshot.is_assignable_from(leaf_class, node_class));
}

#[test]
fn test_instance_field_decoding_reorders_superclass_fields() {
    let snapshot = load();
    let leaf = snapshot.find_thing(LEAF).unwrap();
    let node1 = snapshot.find_thing(NODE1).unwrap();

    // dump data is [tag][next][id]; decoded order is next, id, tag
    let values = snapshot.instance_fields(leaf).unwrap();
    assert_eq!(values, vec![Value::Ref(node1), Value::Int(42), Value::Byte(7)]);
}

#[test]
fn test_field_named() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();
    assert_eq!(
        snapshot.field_named(node1, "next").unwrap(),
        Some(Value::Ref(node2))
    );
    assert_eq!(snapshot.field_named(node1, "id").unwrap(), Some(Value::Int(1)));
    assert_eq!(snapshot.field_named(node1, "nope").unwrap(), None);
    assert_eq!(
        snapshot.field_named(node2, "next").unwrap(),
        Some(Value::Null)
    );
}

#[test]
fn test_string_decoding() {
    let snapshot = load();
    let s = snapshot.find_thing(STRING).unwrap();
    assert_eq!(snapshot.string_value(s), Some("hi".to_string()));
    assert_eq!(snapshot.describe(s), "\"hi\"");

    // non-strings have no string value
    let node1 = snapshot.find_thing(NODE1).unwrap();
    assert_eq!(snapshot.string_value(node1), None);
}

#[test]
fn test_array_elements() {
    let snapshot = load();
    let arr = snapshot.find_thing(NODE_ARRAY).unwrap();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();
    assert_eq!(
        snapshot.array_elements(arr).unwrap(),
        vec![Value::Ref(node1), Value::Ref(node2)]
    );

    let chars = snapshot.find_thing(CHARS).unwrap();
    assert_eq!(
        snapshot.array_elements(chars).unwrap(),
        vec![Value::Char('h' as u16), Value::Char('i' as u16)]
    );
}

#[test]
fn test_fake_class_for_missing_class_record() {
    let snapshot = load();
    let orphan = snapshot.find_thing(ORPHAN).unwrap();
    assert_eq!(snapshot.class_name_of(orphan), "unknown-class<@0x999>");
    let class = snapshot.thing(orphan).class_of().unwrap();
    assert!(snapshot.class(class).unwrap().synthetic);
    // filler fields cover the 4 data bytes
    assert_eq!(snapshot.instance_fields(orphan).unwrap(), vec![Value::Int(0)]);
}

#[test]
fn test_truncated_heap_segment_is_error() {
    let mut data = sample_dump();
    data.truncate(data.len() - 10);
    let err = parse_buffer(ReadBuffer::from_vec(data)).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Parse);
    assert!(err.offset.is_some());
    assert!(err.to_string().contains("truncated"));
}

#[test]
fn test_fabricated_well_known_classes() {
    let snapshot = load();
    // the dump has no java.lang.ClassLoader; resolve fabricates one
    let loader = snapshot.find_class("java.lang.ClassLoader").unwrap();
    assert!(snapshot.class(loader).unwrap().synthetic);
    // java.lang.Class came from the dump
    let jlc = snapshot.java_lang_class().unwrap();
    assert!(!snapshot.class(jlc).unwrap().synthetic);
}

#[test]
fn test_classes_are_instances_of_java_lang_class() {
    let snapshot = load();
    let jlc = snapshot.java_lang_class().unwrap();
    let node_class = snapshot.find_class("com.example.Node").unwrap();
    assert!(snapshot.instances_of(jlc, false).contains(&node_class));
}

#[test]
fn test_fabricated_classes_count_as_java_lang_class_instances() {
    let snapshot = load();
    let jlc = snapshot.java_lang_class().unwrap();
    let instances = snapshot.instances_of(jlc, false);
    // classes fabricated during resolve are classes like any other
    let loader = snapshot.find_class("java.lang.ClassLoader").unwrap();
    let orphan = snapshot.find_thing(ORPHAN).unwrap();
    let fake = snapshot.thing(orphan).class_of().unwrap();
    assert!(instances.contains(&loader));
    assert!(instances.contains(&fake));
}

#[test]
fn test_instance_registration() {
    let snapshot = load();
    let node_class = snapshot.find_class("com.example.Node").unwrap();
    // node1, node2, node3 directly; leaf only with subclasses
    assert_eq!(snapshot.instance_count(node_class, false), 3);
    assert_eq!(snapshot.instance_count(node_class, true), 4);
}

#[test]
fn test_sizes() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let arr = snapshot.find_thing(NODE_ARRAY).unwrap();
    let chars = snapshot.find_thing(CHARS).unwrap();
    let min = snapshot.min_object_size();
    assert_eq!(snapshot.size_of(node1), 12 + min);
    assert_eq!(snapshot.size_of(arr), 2 * 8 + min);
    assert_eq!(snapshot.size_of(chars), 2 * 2 + min);

    let node_class = snapshot.find_class("com.example.Node").unwrap();
    assert_eq!(snapshot.total_instance_size(node_class), 3 * (12 + min));
}

#[test]
fn test_roots_bound_to_targets() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node_class = snapshot.find_class("com.example.Node").unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();

    assert_eq!(snapshot.root_of(node1).unwrap().kind, RootKind::JniGlobal);
    assert_eq!(
        snapshot.root_of(node_class).unwrap().kind,
        RootKind::StickyClass
    );
    assert!(snapshot.root_of(node2).is_none());
}

#[test]
fn test_java_frame_root_names_its_thread() {
    let snapshot = load();
    let s = snapshot.find_thing(STRING).unwrap();
    let root = snapshot.root_of(s).unwrap();
    assert_eq!(root.kind, RootKind::JavaFrame);
    assert_eq!(root.thread_serial, 5);
    // thread object registered by the ROOT_THREAD_OBJECT record
    assert_eq!(root.referer_id, NODE3);
}

#[test]
fn test_stack_root_before_its_thread_object_still_resolves() {
    let mut b = DumpBuilder::new();
    b.load_class(CLASS_NODE, "com.example.Node");
    b.load_class(CLASS_OBJECT, "java.lang.Object");
    b.class_dump(CLASS_OBJECT, 0, 0, &[], &[]);
    b.class_dump(
        CLASS_NODE,
        CLASS_OBJECT,
        12,
        &[],
        &[("next", TYPE_OBJECT), ("id", TYPE_INT)],
    );
    let mut node1 = val_ref(0);
    node1.extend(val_int(1));
    b.instance_dump(NODE1, CLASS_NODE, &node1);
    let mut node3 = val_ref(0);
    node3.extend(val_int(3));
    b.instance_dump(NODE3, CLASS_NODE, &node3);
    // frame root first, its thread object only later in the segment
    b.root_java_frame(NODE1, 5, 0);
    b.root_thread_object(NODE3, 5);

    let mut snapshot = parse_buffer(ReadBuffer::from_vec(b.build())).unwrap();
    snapshot.resolve(true).unwrap();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let root = snapshot.root_of(node1).unwrap();
    assert_eq!(root.kind, RootKind::JavaFrame);
    assert_eq!(root.referer_id, NODE3);
}

#[test]
fn test_referrers() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();
    let arr = snapshot.find_thing(NODE_ARRAY).unwrap();
    let weak = snapshot.find_thing(WEAK).unwrap();

    let refs = snapshot.referrers(node2);
    assert!(refs.contains(&node1));
    assert!(refs.contains(&arr));
    assert!(refs.contains(&weak));
}

#[test]
fn test_describe_reference_to() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();
    let arr = snapshot.find_thing(NODE_ARRAY).unwrap();
    let node_class = snapshot.find_class("com.example.Node").unwrap();

    assert_eq!(snapshot.describe_reference_to(node1, node2), "field next");
    assert_eq!(snapshot.describe_reference_to(arr, node2), "element 1");
    assert_eq!(
        snapshot.describe_reference_to(node_class, node1),
        "static field FIRST"
    );
}

#[test]
fn test_refers_only_weakly_to() {
    let snapshot = load();
    let weak = snapshot.find_thing(WEAK).unwrap();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();

    assert!(snapshot.refers_only_weakly_to(weak, node2));
    assert!(!snapshot.refers_only_weakly_to(weak, node1));
    assert!(!snapshot.refers_only_weakly_to(node1, node2));
}

#[test]
fn test_rootset_chains() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();
    let node_class = snapshot.find_class("com.example.Node").unwrap();

    // excluding weak refs: node1 -> node2 and Node.FIRST -> node1 -> node2
    let chains = snapshot.rootset_references_to(node2, false);
    assert_eq!(chains.len(), 2);
    let rooted: Vec<_> = chains.iter().map(|c| c.obj()).collect();
    assert!(rooted.contains(&node1));
    assert!(rooted.contains(&node_class));
    for chain in &chains {
        assert_eq!(*chain.objs.last().unwrap(), node2);
    }

    // including weak refs adds the path through the weak reference
    let chains = snapshot.rootset_references_to(node2, true);
    assert_eq!(chains.len(), 3);
}

#[test]
fn test_rooted_target_chain_is_target_alone() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let chains = snapshot.rootset_references_to(node1, false);
    assert!(chains.iter().any(|c| c.objs == vec![node1]));
}

#[test]
fn test_reachables_from() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();

    let set = snapshot.reachables_from(node1);
    assert!(set.objs.contains(&node2));
    assert!(set.total_size >= snapshot.size_of(node1) + snapshot.size_of(node2));
}

#[test]
fn test_allocation_trace() {
    let snapshot = load();
    let node1 = snapshot.find_thing(NODE1).unwrap();
    let trace = snapshot.trace_of(node1).unwrap();
    assert_eq!(trace.thread_serial, 5);
    assert_eq!(trace.frames.len(), 1);
    let frame = &trace.frames[0];
    assert_eq!(frame.method_name, "alloc");
    assert_eq!(frame.class_name, "com.example.Node");
    assert_eq!(frame.line_string(), "line 42");
}

#[test]
fn test_baseline_diff() {
    let snapshot = load();

    // baseline: same heap minus node2
    let mut b = DumpBuilder::new();
    b.load_class(CLASS_NODE, "com.example.Node");
    b.load_class(CLASS_OBJECT, "java.lang.Object");
    b.class_dump(CLASS_OBJECT, 0, 0, &[], &[]);
    b.class_dump(
        CLASS_NODE,
        CLASS_OBJECT,
        12,
        &[],
        &[("next", TYPE_OBJECT), ("id", TYPE_INT)],
    );
    let mut node1 = val_ref(NODE2);
    node1.extend(val_int(1));
    b.instance_dump(NODE1, CLASS_NODE, &node1);
    let mut baseline = parse_buffer(ReadBuffer::from_vec(b.build())).unwrap();
    baseline.resolve(false).unwrap();

    let mut snapshot = snapshot;
    snapshot.mark_new_relative_to(&baseline);
    assert!(snapshot.has_new_set());

    let node1 = snapshot.find_thing(NODE1).unwrap();
    let node2 = snapshot.find_thing(NODE2).unwrap();
    assert!(!snapshot.is_new(node1));
    assert!(snapshot.is_new(node2));
}

#[test]
fn test_resolve_without_refs_skips_referrers() {
    let mut snapshot = parse_buffer(ReadBuffer::from_vec(sample_dump())).unwrap();
    snapshot.resolve(false).unwrap();
    assert!(!snapshot.has_referrers());
    let node2 = snapshot.find_thing(NODE2).unwrap();
    assert!(snapshot.referrers(node2).is_empty());
    // field decoding still works
    assert_eq!(snapshot.field_named(node2, "id").unwrap(), Some(Value::Int(2)));
}
