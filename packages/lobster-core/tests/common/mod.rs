//! Builder for small synthetic HPROF dumps
//!
//! Emits the exact binary layout the parser consumes: header, UTF8 string
//! table, LOAD_CLASS records, and one HEAP_DUMP record holding the heap
//! sub-records. Always 8-byte identifiers.

// not every test binary uses every helper
#![allow(dead_code)]

pub const ID_SIZE: usize = 8;

const TAG_UTF8: u8 = 0x01;
const TAG_LOAD_CLASS: u8 = 0x02;
const TAG_STACK_FRAME: u8 = 0x04;
const TAG_STACK_TRACE: u8 = 0x05;
const TAG_HEAP_DUMP: u8 = 0x0c;

pub const TYPE_OBJECT: u8 = 2;
pub const TYPE_CHAR: u8 = 5;
pub const TYPE_BYTE: u8 = 8;
pub const TYPE_INT: u8 = 10;

pub struct DumpBuilder {
    records: Vec<u8>,
    heap: Vec<u8>,
    next_name_id: u64,
    next_class_serial: u32,
}

/// Raw bytes of an object id value
pub fn val_ref(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

pub fn val_int(v: i32) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

pub fn val_byte(v: i8) -> Vec<u8> {
    v.to_be_bytes().to_vec()
}

impl DumpBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            heap: Vec::new(),
            next_name_id: 0x7000_0000,
            next_class_serial: 1,
        }
    }

    fn record(&mut self, tag: u8, body: &[u8]) {
        self.records.push(tag);
        self.records.extend_from_slice(&0u32.to_be_bytes());
        self.records
            .extend_from_slice(&(body.len() as u32).to_be_bytes());
        self.records.extend_from_slice(body);
    }

    fn name(&mut self, text: &str) -> u64 {
        let id = self.next_name_id;
        self.next_name_id += 1;
        let mut body = id.to_be_bytes().to_vec();
        body.extend_from_slice(text.as_bytes());
        self.record(TAG_UTF8, &body);
        id
    }

    /// Register a class name; required before its CLASS_DUMP
    pub fn load_class(&mut self, class_id: u64, name: &str) -> u32 {
        let serial = self.next_class_serial;
        self.next_class_serial += 1;
        // the dump stores slash-separated binary names
        let name_id = self.name(&name.replace('.', "/"));
        let mut body = serial.to_be_bytes().to_vec();
        body.extend_from_slice(&class_id.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&name_id.to_be_bytes());
        self.record(TAG_LOAD_CLASS, &body);
        serial
    }

    pub fn stack_frame(
        &mut self,
        frame_id: u64,
        method: &str,
        source: &str,
        class_serial: u32,
        line: i32,
    ) {
        let method_id = self.name(method);
        let sig_id = self.name("()V");
        let source_id = self.name(source);
        let mut body = frame_id.to_be_bytes().to_vec();
        body.extend_from_slice(&method_id.to_be_bytes());
        body.extend_from_slice(&sig_id.to_be_bytes());
        body.extend_from_slice(&source_id.to_be_bytes());
        body.extend_from_slice(&class_serial.to_be_bytes());
        body.extend_from_slice(&line.to_be_bytes());
        self.record(TAG_STACK_FRAME, &body);
    }

    pub fn stack_trace(&mut self, serial: u32, thread_serial: u32, frame_ids: &[u64]) {
        let mut body = serial.to_be_bytes().to_vec();
        body.extend_from_slice(&thread_serial.to_be_bytes());
        body.extend_from_slice(&(frame_ids.len() as u32).to_be_bytes());
        for id in frame_ids {
            body.extend_from_slice(&id.to_be_bytes());
        }
        self.record(TAG_STACK_TRACE, &body);
    }

    /// CLASS_DUMP heap sub-record
    ///
    /// `statics` entries are (name, type code, raw value bytes); `fields`
    /// entries are (name, type code) in declaration order.
    pub fn class_dump(
        &mut self,
        class_id: u64,
        super_id: u64,
        instance_size: u32,
        statics: &[(&str, u8, Vec<u8>)],
        fields: &[(&str, u8)],
    ) {
        let static_names: Vec<u64> = statics.iter().map(|(n, _, _)| self.name(n)).collect();
        let field_names: Vec<u64> = fields.iter().map(|(n, _)| self.name(n)).collect();

        self.heap.push(0x20);
        self.heap.extend_from_slice(&class_id.to_be_bytes());
        self.heap.extend_from_slice(&0u32.to_be_bytes()); // trace serial
        self.heap.extend_from_slice(&super_id.to_be_bytes());
        for _ in 0..5 {
            // loader, signers, protection domain, two reserved
            self.heap.extend_from_slice(&0u64.to_be_bytes());
        }
        self.heap.extend_from_slice(&instance_size.to_be_bytes());
        self.heap.extend_from_slice(&0u16.to_be_bytes()); // constant pool
        self.heap
            .extend_from_slice(&(statics.len() as u16).to_be_bytes());
        for ((_, ty, value), name_id) in statics.iter().zip(static_names) {
            self.heap.extend_from_slice(&name_id.to_be_bytes());
            self.heap.push(*ty);
            self.heap.extend_from_slice(value);
        }
        self.heap
            .extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for ((_, ty), name_id) in fields.iter().zip(field_names) {
            self.heap.extend_from_slice(&name_id.to_be_bytes());
            self.heap.push(*ty);
        }
    }

    /// INSTANCE_DUMP; `data` is raw field data, most-derived class first
    pub fn instance_dump(&mut self, id: u64, class_id: u64, data: &[u8]) {
        self.heap.push(0x21);
        self.heap.extend_from_slice(&id.to_be_bytes());
        self.heap.extend_from_slice(&1u32.to_be_bytes()); // trace serial
        self.heap.extend_from_slice(&class_id.to_be_bytes());
        self.heap
            .extend_from_slice(&(data.len() as u32).to_be_bytes());
        self.heap.extend_from_slice(data);
    }

    pub fn obj_array_dump(&mut self, id: u64, class_id: u64, elements: &[u64]) {
        self.heap.push(0x22);
        self.heap.extend_from_slice(&id.to_be_bytes());
        self.heap.extend_from_slice(&0u32.to_be_bytes());
        self.heap
            .extend_from_slice(&(elements.len() as u32).to_be_bytes());
        self.heap.extend_from_slice(&class_id.to_be_bytes());
        for e in elements {
            self.heap.extend_from_slice(&e.to_be_bytes());
        }
    }

    pub fn char_array_dump(&mut self, id: u64, text: &str) {
        let units: Vec<u16> = text.encode_utf16().collect();
        self.heap.push(0x23);
        self.heap.extend_from_slice(&id.to_be_bytes());
        self.heap.extend_from_slice(&0u32.to_be_bytes());
        self.heap
            .extend_from_slice(&(units.len() as u32).to_be_bytes());
        self.heap.push(TYPE_CHAR);
        for u in units {
            self.heap.extend_from_slice(&u.to_be_bytes());
        }
    }

    pub fn root_jni_global(&mut self, target: u64) {
        self.heap.push(0x01);
        self.heap.extend_from_slice(&target.to_be_bytes());
        self.heap.extend_from_slice(&0u64.to_be_bytes()); // JNI ref id
    }

    pub fn root_java_frame(&mut self, target: u64, thread_serial: u32, frame: i32) {
        self.heap.push(0x03);
        self.heap.extend_from_slice(&target.to_be_bytes());
        self.heap.extend_from_slice(&thread_serial.to_be_bytes());
        self.heap.extend_from_slice(&frame.to_be_bytes());
    }

    pub fn root_sticky_class(&mut self, target: u64) {
        self.heap.push(0x05);
        self.heap.extend_from_slice(&target.to_be_bytes());
    }

    pub fn root_thread_object(&mut self, target: u64, thread_serial: u32) {
        self.heap.push(0x08);
        self.heap.extend_from_slice(&target.to_be_bytes());
        self.heap.extend_from_slice(&thread_serial.to_be_bytes());
        self.heap.extend_from_slice(&0u32.to_be_bytes());
    }

    pub fn build(mut self) -> Vec<u8> {
        let heap = std::mem::take(&mut self.heap);
        if !heap.is_empty() {
            self.record(TAG_HEAP_DUMP, &heap);
        }
        let mut out = b"JAVA PROFILE 1.0.2\0".to_vec();
        out.extend_from_slice(&(ID_SIZE as u32).to_be_bytes());
        out.extend_from_slice(&0u64.to_be_bytes());
        out.extend_from_slice(&self.records);
        out
    }
}

impl Default for DumpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── shared fixture ────────────────────────────────────────────────────

pub const CLASS_JAVA_LANG_CLASS: u64 = 0x100;
pub const CLASS_STRING: u64 = 0x101;
pub const CLASS_OBJECT: u64 = 0x102;
pub const CLASS_NODE: u64 = 0x110;
pub const CLASS_LEAF: u64 = 0x111;
pub const CLASS_NODE_ARRAY: u64 = 0x112;
pub const CLASS_REFERENCE: u64 = 0x120;
pub const CLASS_WEAK_REFERENCE: u64 = 0x121;

pub const NODE1: u64 = 0x200;
pub const NODE2: u64 = 0x201;
pub const LEAF: u64 = 0x202;
pub const NODE3: u64 = 0x203;
pub const WEAK: u64 = 0x210;
pub const CHARS: u64 = 0x300;
pub const STRING: u64 = 0x301;
pub const NODE_ARRAY: u64 = 0x400;
pub const ORPHAN: u64 = 0x500;
pub const MISSING_CLASS: u64 = 0x999;

/// A small heap:
///
/// - three `com.example.Node` instances; node1 -> node2 via `next`,
///   node1 is a JNI global root, node3 is a thread object
/// - a `com.example.Leaf` (subclass of Node) whose `next` is node1
/// - a node array holding node1 and node2
/// - a weak reference whose referent is node2, itself a JNI global root
/// - the string "hi" (classic char[] layout), held by a Java frame root
/// - an instance of a class missing from the dump
/// - `com.example.Node` has a static `FIRST` pointing at node1 and is a
///   sticky class root
pub fn sample_dump() -> Vec<u8> {
    let mut b = DumpBuilder::new();

    b.load_class(CLASS_JAVA_LANG_CLASS, "java.lang.Class");
    b.load_class(CLASS_STRING, "java.lang.String");
    b.load_class(CLASS_OBJECT, "java.lang.Object");
    let node_serial = b.load_class(CLASS_NODE, "com.example.Node");
    b.load_class(CLASS_LEAF, "com.example.Leaf");
    b.load_class(CLASS_NODE_ARRAY, "[Lcom.example.Node;");
    b.load_class(CLASS_REFERENCE, "java.lang.ref.Reference");
    b.load_class(CLASS_WEAK_REFERENCE, "java.lang.ref.WeakReference");

    b.stack_frame(0x600, "alloc", "Node.java", node_serial, 42);
    b.stack_trace(1, 5, &[0x600]);

    b.class_dump(CLASS_JAVA_LANG_CLASS, CLASS_OBJECT, 0, &[], &[]);
    b.class_dump(CLASS_OBJECT, 0, 0, &[], &[]);
    b.class_dump(
        CLASS_STRING,
        CLASS_OBJECT,
        8,
        &[],
        &[("value", TYPE_OBJECT)],
    );
    b.class_dump(
        CLASS_NODE,
        CLASS_OBJECT,
        12,
        &[("FIRST", TYPE_OBJECT, val_ref(NODE1))],
        &[("next", TYPE_OBJECT), ("id", TYPE_INT)],
    );
    b.class_dump(CLASS_LEAF, CLASS_NODE, 13, &[], &[("tag", TYPE_BYTE)]);
    b.class_dump(CLASS_NODE_ARRAY, CLASS_OBJECT, 0, &[], &[]);
    b.class_dump(
        CLASS_REFERENCE,
        CLASS_OBJECT,
        8,
        &[],
        &[("referent", TYPE_OBJECT)],
    );
    b.class_dump(CLASS_WEAK_REFERENCE, CLASS_REFERENCE, 8, &[], &[]);

    // instance data is most-derived class first
    let mut node1 = val_ref(NODE2);
    node1.extend(val_int(1));
    b.instance_dump(NODE1, CLASS_NODE, &node1);

    let mut node2 = val_ref(0);
    node2.extend(val_int(2));
    b.instance_dump(NODE2, CLASS_NODE, &node2);

    let mut node3 = val_ref(0);
    node3.extend(val_int(3));
    b.instance_dump(NODE3, CLASS_NODE, &node3);

    let mut leaf = val_byte(7);
    leaf.extend(val_ref(NODE1));
    leaf.extend(val_int(42));
    b.instance_dump(LEAF, CLASS_LEAF, &leaf);

    b.instance_dump(WEAK, CLASS_WEAK_REFERENCE, &val_ref(NODE2));

    b.char_array_dump(CHARS, "hi");
    b.instance_dump(STRING, CLASS_STRING, &val_ref(CHARS));

    b.obj_array_dump(NODE_ARRAY, CLASS_NODE_ARRAY, &[NODE1, NODE2]);

    b.instance_dump(ORPHAN, MISSING_CLASS, &val_int(0));

    b.root_jni_global(NODE1);
    b.root_jni_global(WEAK);
    b.root_sticky_class(CLASS_NODE);
    b.root_thread_object(NODE3, 5);
    b.root_java_frame(STRING, 5, 0);

    b.build()
}
