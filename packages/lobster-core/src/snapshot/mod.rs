//! The heap snapshot model
//!
//! A `Snapshot` is the fully-parsed view of one dump: an arena of heap
//! things (classes, instances, arrays) indexed by `ObjId`, the GC root
//! table, allocation traces, and the dump buffer itself for lazy field
//! decoding. After `resolve` the snapshot is immutable and safe to share
//! behind an `Arc` across query handlers.

pub mod class;
pub mod diff;
pub mod excludes;
pub mod object;
pub mod reach;
pub mod resolve;
pub mod root;
pub mod stack;
pub mod value;

pub use class::{ClassObj, FieldDecl, StaticField};
pub use excludes::ReachableExcludes;
pub use object::{HeapThing, Instance, ObjArray, PrimArray, ThingKind};
pub use reach::{ReachableSet, ReferenceChain};
pub use root::{Root, RootKind};
pub use stack::{StackFrame, StackTrace};
pub use value::{ObjId, Signature, Value};

use once_cell::sync::OnceCell;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use tracing::warn;

use crate::errors::{LobsterError, Result};
use crate::parser::read_buffer::ReadBuffer;
use lobster_utils::bytes::BeReader;
use lobster_utils::{parse_hex, to_hex};

pub const JAVA_LANG_CLASS: &str = "java.lang.Class";
pub const JAVA_LANG_STRING: &str = "java.lang.String";
pub const JAVA_LANG_CLASS_LOADER: &str = "java.lang.ClassLoader";
pub const WEAK_REFERENCE_CLASS: &str = "java.lang.ref.Reference";
pub const FINALIZER_CLASS: &str = "java.lang.ref.Finalizer";

/// Snapshot of all objects in the VM at one instant
#[derive(Debug)]
pub struct Snapshot {
    id_size: usize,
    buf: ReadBuffer,

    things: Vec<HeapThing>,
    by_id: FxHashMap<u64, ObjId>,
    /// Name -> class, sorted so class listings come out ordered
    classes_by_name: BTreeMap<String, ObjId>,

    roots: Vec<Root>,
    /// Object -> index of its most interesting root, filled by resolve
    root_of: FxHashMap<ObjId, usize>,
    /// Inverted reference graph, filled by resolve when requested
    referrers: Vec<Vec<ObjId>>,

    /// Allocation traces by serial
    traces: FxHashMap<u32, StackTrace>,

    // Well-known classes, pinned during resolve
    java_lang_class: Option<ObjId>,
    java_lang_string: Option<ObjId>,
    java_lang_class_loader: Option<ObjId>,
    weak_ref_class: Option<ObjId>,
    referent_field_index: usize,

    excludes: Option<ReachableExcludes>,

    // Baseline diff state
    new_objects: FxHashSet<ObjId>,
    has_new_set: bool,

    finalizables: OnceCell<Vec<ObjId>>,

    resolved: bool,
}

impl Snapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id_size: usize,
        buf: ReadBuffer,
        things: Vec<HeapThing>,
        by_id: FxHashMap<u64, ObjId>,
        classes_by_name: BTreeMap<String, ObjId>,
        mut roots: Vec<Root>,
        traces: FxHashMap<u32, StackTrace>,
    ) -> Self {
        for (i, root) in roots.iter_mut().enumerate() {
            root.index = i;
        }
        Self {
            id_size,
            buf,
            things,
            by_id,
            classes_by_name,
            roots,
            root_of: FxHashMap::default(),
            referrers: Vec::new(),
            traces,
            java_lang_class: None,
            java_lang_string: None,
            java_lang_class_loader: None,
            weak_ref_class: None,
            referent_field_index: 0,
            excludes: None,
            new_objects: FxHashSet::default(),
            has_new_set: false,
            finalizables: OnceCell::new(),
            resolved: false,
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Basic accessors
    // ───────────────────────────────────────────────────────────────────

    pub fn id_size(&self) -> usize {
        self.id_size
    }

    /// VM object header overhead added to every shallow size
    pub fn min_object_size(&self) -> u64 {
        2 * self.id_size as u64
    }

    pub fn object_count(&self) -> usize {
        self.things.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn thing(&self, id: ObjId) -> &HeapThing {
        &self.things[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = ObjId> {
        (0..self.things.len() as u32).map(ObjId)
    }

    /// Look up a thing by its heap id; 0 is the null reference
    pub fn find_thing(&self, heap_id: u64) -> Option<ObjId> {
        if heap_id == 0 {
            return None;
        }
        self.by_id.get(&heap_id).copied()
    }

    /// Find a class by name, or by `0x`-prefixed heap id
    pub fn find_class(&self, query: &str) -> Option<ObjId> {
        if query.starts_with("0x") || query.starts_with("0X") {
            let id = parse_hex(query).ok()?;
            return self.find_thing(id).filter(|t| self.thing(*t).is_class());
        }
        self.classes_by_name.get(query).copied()
    }

    pub fn class(&self, id: ObjId) -> Option<&ClassObj> {
        self.thing(id).as_class()
    }

    /// All classes, sorted by name
    pub fn classes(&self) -> impl Iterator<Item = (&str, ObjId)> {
        self.classes_by_name.iter().map(|(n, id)| (n.as_str(), *id))
    }

    pub fn class_count(&self) -> usize {
        self.classes_by_name.len()
    }

    pub fn roots(&self) -> &[Root] {
        &self.roots
    }

    pub fn root_of(&self, id: ObjId) -> Option<&Root> {
        self.root_of.get(&id).map(|&i| &self.roots[i])
    }

    pub fn referrers(&self, id: ObjId) -> &[ObjId] {
        self.referrers.get(id.index()).map_or(&[], |v| v.as_slice())
    }

    pub fn has_referrers(&self) -> bool {
        !self.referrers.is_empty()
    }

    pub fn trace_of(&self, id: ObjId) -> Option<&StackTrace> {
        let serial = self.thing(id).trace_serial;
        if serial == 0 {
            return None;
        }
        self.traces.get(&serial)
    }

    pub fn java_lang_class(&self) -> Option<ObjId> {
        self.java_lang_class
    }

    pub fn java_lang_string(&self) -> Option<ObjId> {
        self.java_lang_string
    }

    pub fn java_lang_class_loader(&self) -> Option<ObjId> {
        self.java_lang_class_loader
    }

    pub fn weak_ref_class(&self) -> Option<ObjId> {
        self.weak_ref_class
    }

    pub fn referent_field_index(&self) -> usize {
        self.referent_field_index
    }

    pub fn set_excludes(&mut self, excludes: ReachableExcludes) {
        self.excludes = Some(excludes);
    }

    pub fn excludes(&self) -> Option<&ReachableExcludes> {
        self.excludes.as_ref()
    }

    pub(crate) fn buf(&self) -> &ReadBuffer {
        &self.buf
    }

    // ───────────────────────────────────────────────────────────────────
    // Names, sizes, display
    // ───────────────────────────────────────────────────────────────────

    /// Heap id rendered as hex
    pub fn id_string(&self, id: ObjId) -> String {
        to_hex(self.thing(id).heap_id)
    }

    /// Name of the class this thing is an instance of
    pub fn class_name_of(&self, id: ObjId) -> &str {
        match &self.thing(id).kind {
            ThingKind::Class(_) => JAVA_LANG_CLASS,
            _ => self
                .thing(id)
                .class_of()
                .and_then(|c| self.class(c))
                .map_or("<unknown>", |c| c.name.as_str()),
        }
    }

    /// Shallow size in bytes, including the VM object header
    pub fn size_of(&self, id: ObjId) -> u64 {
        match &self.thing(id).kind {
            ThingKind::Class(_) => {
                let class_size = self
                    .java_lang_class
                    .and_then(|c| self.class(c))
                    .map_or(0, |c| c.instance_size as u64);
                class_size + self.min_object_size()
            }
            ThingKind::Instance(i) => i.data_len as u64 + self.min_object_size(),
            ThingKind::ObjArray(a) => {
                a.length as u64 * self.id_size as u64 + self.min_object_size()
            }
            ThingKind::PrimArray(a) => {
                a.length as u64 * a.elem.size(self.id_size) as u64 + self.min_object_size()
            }
        }
    }

    /// Sum of shallow sizes of a class's instances
    pub fn total_instance_size(&self, class_id: ObjId) -> u64 {
        self.class(class_id).map_or(0, |c| {
            c.instances.iter().map(|&i| self.size_of(i)).sum()
        })
    }

    /// Display form: "class x.Y", string contents, or "x.Y@0x1234"
    pub fn describe(&self, id: ObjId) -> String {
        match &self.thing(id).kind {
            ThingKind::Class(c) => format!("class {}", c.name),
            _ => {
                if let Some(s) = self.string_value(id) {
                    return format!("\"{}\"", s);
                }
                format!("{}@{}", self.class_name_of(id), self.id_string(id))
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Class structure
    // ───────────────────────────────────────────────────────────────────

    /// Superclass chain starting at the class itself
    pub fn class_chain(&self, class_id: ObjId) -> Vec<ObjId> {
        let mut chain = Vec::new();
        let mut cur = Some(class_id);
        while let Some(c) = cur {
            if chain.contains(&c) {
                warn!(class = %self.id_string(c), "superclass cycle detected");
                break;
            }
            chain.push(c);
            cur = self.class(c).and_then(|cls| cls.superclass);
        }
        chain
    }

    /// All instance fields, superclass fields first, with declaring class
    pub fn fields_for_instance(&self, class_id: ObjId) -> Vec<(ObjId, &FieldDecl)> {
        let mut out = Vec::new();
        for c in self.class_chain(class_id).into_iter().rev() {
            if let Some(cls) = self.class(c) {
                out.extend(cls.fields.iter().map(|f| (c, f)));
            }
        }
        out
    }

    /// True iff a variable of type `sup` can hold an instance of `sub`
    pub fn is_assignable_from(&self, sup: ObjId, sub: ObjId) -> bool {
        self.class_chain(sub).contains(&sup)
    }

    /// Instances of a class, optionally including subclasses
    pub fn instances_of(&self, class_id: ObjId, include_subclasses: bool) -> Vec<ObjId> {
        let mut out = Vec::new();
        let mut stack = vec![class_id];
        while let Some(c) = stack.pop() {
            if let Some(cls) = self.class(c) {
                out.extend_from_slice(&cls.instances);
                if include_subclasses {
                    stack.extend_from_slice(&cls.subclasses);
                }
            }
        }
        out
    }

    pub fn instance_count(&self, class_id: ObjId, include_subclasses: bool) -> usize {
        let mut count = 0;
        let mut stack = vec![class_id];
        while let Some(c) = stack.pop() {
            if let Some(cls) = self.class(c) {
                count += cls.instances.len();
                if include_subclasses {
                    stack.extend_from_slice(&cls.subclasses);
                }
            }
        }
        count
    }

    // ───────────────────────────────────────────────────────────────────
    // Lazy field decoding
    // ───────────────────────────────────────────────────────────────────

    /// Decode all instance fields, superclass fields first
    ///
    /// The dump stores field data most-derived class first; this re-orders
    /// values into the same order as `fields_for_instance`.
    pub fn instance_fields(&self, id: ObjId) -> Result<Vec<Value>> {
        let inst = match &self.thing(id).kind {
            ThingKind::Instance(i) => i,
            _ => {
                return Err(LobsterError::internal(format!(
                    "instance_fields on non-instance {}",
                    self.id_string(id)
                )))
            }
        };
        let class_id = inst
            .class
            .ok_or_else(|| LobsterError::resolve("instance class not resolved"))?;
        let data = self.buf.slice(inst.data_offset, inst.data_len as usize)?;
        let mut reader = BeReader::new(data);

        let chain = self.class_chain(class_id);
        let total = self.class(class_id).map_or(0, |c| c.total_fields);
        let mut values = vec![Value::Null; total];
        let mut slot_base = total;
        for c in chain {
            let cls = match self.class(c) {
                Some(cls) => cls,
                None => continue,
            };
            slot_base = slot_base.checked_sub(cls.fields.len()).ok_or_else(|| {
                LobsterError::resolve(format!("field layout mismatch in {}", cls.name))
            })?;
            for (i, f) in cls.fields.iter().enumerate() {
                let mut v = Value::read_raw(&mut reader, f.signature, self.id_size)?;
                if let Value::Unresolved(raw) = v {
                    if let Some(t) = self.find_thing(raw) {
                        v = Value::Ref(t);
                    }
                }
                values[slot_base + i] = v;
            }
        }
        Ok(values)
    }

    /// Value of the named field, if the instance has one
    pub fn field_named(&self, id: ObjId, name: &str) -> Result<Option<Value>> {
        let class_id = match self.thing(id).class_of() {
            Some(c) => c,
            None => return Ok(None),
        };
        let fields = self.fields_for_instance(class_id);
        let values = self.instance_fields(id)?;
        for ((_, decl), value) in fields.iter().zip(values.iter()) {
            if decl.name == name {
                return Ok(Some(*value));
            }
        }
        Ok(None)
    }

    /// Elements of an object or primitive array
    pub fn array_elements(&self, id: ObjId) -> Result<Vec<Value>> {
        match &self.thing(id).kind {
            ThingKind::ObjArray(a) => {
                let len = a.length as usize;
                let data = self.buf.slice(a.data_offset, len * self.id_size)?;
                let mut reader = BeReader::new(data);
                let mut out = Vec::with_capacity(len);
                for _ in 0..len {
                    let raw = reader.id(self.id_size)?;
                    out.push(if raw == 0 {
                        Value::Null
                    } else if let Some(t) = self.find_thing(raw) {
                        Value::Ref(t)
                    } else {
                        Value::Unresolved(raw)
                    });
                }
                Ok(out)
            }
            ThingKind::PrimArray(a) => {
                let len = a.length as usize;
                let data = self
                    .buf
                    .slice(a.data_offset, len * a.elem.size(self.id_size))?;
                let mut reader = BeReader::new(data);
                let mut out = Vec::with_capacity(len);
                for _ in 0..len {
                    out.push(Value::read_raw(&mut reader, a.elem, self.id_size)?);
                }
                Ok(out)
            }
            _ => Err(LobsterError::internal(format!(
                "array_elements on non-array {}",
                self.id_string(id)
            ))),
        }
    }

    /// Decode a java.lang.String instance's contents
    ///
    /// Handles both the classic char[] layout and compact strings
    /// (byte[] plus a `coder` field, 0 = latin-1, 1 = utf-16).
    pub fn string_value(&self, id: ObjId) -> Option<String> {
        let string_class = self.java_lang_string?;
        let class_id = self.thing(id).class_of()?;
        if class_id != string_class {
            return None;
        }
        let value = self.field_named(id, "value").ok()??;
        let arr = value.as_obj()?;
        match &self.thing(arr).kind {
            ThingKind::PrimArray(p) if p.elem == Signature::Char => {
                let units: Vec<u16> = self
                    .array_elements(arr)
                    .ok()?
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Char(c) => Some(c),
                        _ => None,
                    })
                    .collect();
                Some(String::from_utf16_lossy(&units))
            }
            ThingKind::PrimArray(p) if p.elem == Signature::Byte => {
                let bytes: Vec<u8> = self
                    .array_elements(arr)
                    .ok()?
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::Byte(b) => Some(b as u8),
                        _ => None,
                    })
                    .collect();
                let utf16 = matches!(
                    self.field_named(id, "coder").ok()?,
                    Some(Value::Byte(1))
                );
                if utf16 {
                    let units: Vec<u16> = bytes
                        .chunks_exact(2)
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .collect();
                    Some(String::from_utf16_lossy(&units))
                } else {
                    // latin-1: every byte is the code point
                    Some(bytes.into_iter().map(|b| b as char).collect())
                }
            }
            _ => None,
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Reference structure
    // ───────────────────────────────────────────────────────────────────

    /// Objects this thing holds references to
    ///
    /// When `excludes` is given, instance fields and static fields on the
    /// exclude list are skipped.
    pub fn outgoing_refs(
        &self,
        id: ObjId,
        excludes: Option<&ReachableExcludes>,
    ) -> Result<Vec<ObjId>> {
        let mut out = Vec::new();
        match &self.thing(id).kind {
            ThingKind::Class(c) => {
                if let Some(sup) = c.superclass {
                    out.push(sup);
                }
                for v in [&c.loader, &c.signers, &c.protection_domain] {
                    if let Some(t) = v.as_obj() {
                        out.push(t);
                    }
                }
                for s in &c.statics {
                    if let Some(ex) = excludes {
                        if ex.is_excluded(&c.name, &s.field.name) {
                            continue;
                        }
                    }
                    if let Some(t) = s.value.as_obj() {
                        out.push(t);
                    }
                }
            }
            ThingKind::Instance(_) => {
                let class_id = self.thing(id).class_of();
                let fields = class_id.map_or_else(Vec::new, |c| self.fields_for_instance(c));
                let values = self.instance_fields(id)?;
                for ((decl_class, decl), value) in fields.iter().zip(values.iter()) {
                    if let Some(ex) = excludes {
                        let class_name =
                            self.class(*decl_class).map_or("", |c| c.name.as_str());
                        if ex.is_excluded(class_name, &decl.name) {
                            continue;
                        }
                    }
                    if let Some(t) = value.as_obj() {
                        out.push(t);
                    }
                }
            }
            ThingKind::ObjArray(_) => {
                for v in self.array_elements(id)? {
                    if let Some(t) = v.as_obj() {
                        out.push(t);
                    }
                }
            }
            ThingKind::PrimArray(_) => {}
        }
        Ok(out)
    }

    /// Describe the reference `from` holds to `target`
    pub fn describe_reference_to(&self, from: ObjId, target: ObjId) -> String {
        match &self.thing(from).kind {
            ThingKind::Class(c) => {
                for s in &c.statics {
                    if s.value.as_obj() == Some(target) {
                        return format!("static field {}", s.field.name);
                    }
                }
                if c.superclass == Some(target) {
                    return "superclass".to_string();
                }
                "??".to_string()
            }
            ThingKind::Instance(_) => {
                let class_id = match self.thing(from).class_of() {
                    Some(c) => c,
                    None => return "??".to_string(),
                };
                let fields = self.fields_for_instance(class_id);
                match self.instance_fields(from) {
                    Ok(values) => {
                        for ((_, decl), value) in fields.iter().zip(values.iter()) {
                            if value.as_obj() == Some(target) {
                                return format!("field {}", decl.name);
                            }
                        }
                        "??".to_string()
                    }
                    Err(_) => "??".to_string(),
                }
            }
            ThingKind::ObjArray(_) => match self.array_elements(from) {
                Ok(values) => {
                    for (i, value) in values.iter().enumerate() {
                        if value.as_obj() == Some(target) {
                            return format!("element {}", i);
                        }
                    }
                    "??".to_string()
                }
                Err(_) => "??".to_string(),
            },
            ThingKind::PrimArray(_) => "??".to_string(),
        }
    }

    // ───────────────────────────────────────────────────────────────────
    // Finalizables
    // ───────────────────────────────────────────────────────────────────

    /// Objects waiting on the finalizer queue
    ///
    /// Walks the `java.lang.ref.Finalizer` static `queue` list, collecting
    /// each entry's referent. Computed once, then cached.
    pub fn finalizer_objects(&self) -> &[ObjId] {
        self.finalizables
            .get_or_init(|| self.walk_finalizer_queue())
            .as_slice()
    }

    fn walk_finalizer_queue(&self) -> Vec<ObjId> {
        let mut out = Vec::new();
        let finalizer = match self.find_class(FINALIZER_CLASS) {
            Some(c) => c,
            None => return out,
        };
        let queue = self
            .class(finalizer)
            .and_then(|c| c.static_value("queue"))
            .and_then(|v| v.as_obj());
        let queue = match queue {
            Some(q) => q,
            None => return out,
        };
        let mut head = match self.field_named(queue, "head") {
            Ok(Some(v)) => v.as_obj(),
            _ => None,
        };
        let mut visited = FxHashSet::default();
        while let Some(node) = head {
            if !visited.insert(node) {
                warn!("cycle in finalizer queue, stopping walk");
                break;
            }
            if let Ok(Some(referent)) = self.field_named(node, "referent") {
                if let Some(r) = referent.as_obj() {
                    out.push(r);
                }
            }
            head = match self.field_named(node, "next") {
                Ok(Some(v)) => v.as_obj().filter(|n| *n != node),
                _ => None,
            };
        }
        out
    }
}
