//! Heap things: instances, object arrays, primitive arrays
//!
//! Instance and array payloads are not decoded at parse time. Each thing
//! records the offset and length of its data inside the dump buffer and the
//! snapshot reads values on demand, so a multi-gigabyte dump costs memory
//! proportional to its object count, not its byte size.

use super::class::ClassObj;
use super::value::{ObjId, Signature};

/// Plain object instance
#[derive(Debug, Clone)]
pub struct Instance {
    /// Raw class id from the dump record
    pub class_id: u64,
    /// Resolved class, set by Snapshot::resolve
    pub class: Option<ObjId>,
    /// Offset of the field data inside the dump buffer
    pub data_offset: u64,
    /// Field data length in bytes
    pub data_len: u32,
}

/// Array of object references
#[derive(Debug, Clone)]
pub struct ObjArray {
    /// Raw array class id from the dump record
    pub class_id: u64,
    pub class: Option<ObjId>,
    /// Element count
    pub length: u32,
    /// Offset of the element ids inside the dump buffer
    pub data_offset: u64,
}

/// Array of primitive values
#[derive(Debug, Clone)]
pub struct PrimArray {
    pub class: Option<ObjId>,
    pub elem: Signature,
    pub length: u32,
    pub data_offset: u64,
}

/// Payload of a heap thing
#[derive(Debug, Clone)]
pub enum ThingKind {
    Class(ClassObj),
    Instance(Instance),
    ObjArray(ObjArray),
    PrimArray(PrimArray),
}

/// One entry in the snapshot arena
#[derive(Debug, Clone)]
pub struct HeapThing {
    /// Heap id from the dump; 0 for synthesized classes
    pub heap_id: u64,
    /// Allocation trace serial, 0 when absent
    pub trace_serial: u32,
    pub kind: ThingKind,
}

impl HeapThing {
    pub fn class(heap_id: u64, trace_serial: u32, class: ClassObj) -> Self {
        Self {
            heap_id,
            trace_serial,
            kind: ThingKind::Class(class),
        }
    }

    pub fn as_class(&self) -> Option<&ClassObj> {
        match &self.kind {
            ThingKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassObj> {
        match &mut self.kind {
            ThingKind::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ThingKind::Class(_))
    }

    /// Arena index of this thing's class, once resolved
    pub fn class_of(&self) -> Option<ObjId> {
        match &self.kind {
            ThingKind::Class(_) => None, // the class of a class is java.lang.Class
            ThingKind::Instance(i) => i.class,
            ThingKind::ObjArray(a) => a.class,
            ThingKind::PrimArray(a) => a.class,
        }
    }
}
