//! HPROF binary dump parser
//!
//! Single forward pass over the dump: string table, class loads and stack
//! traces feed name resolution, the heap dump segments produce the thing
//! arena. Instance and array payloads are skipped here and only their
//! offsets recorded; the snapshot decodes them lazily.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::read_buffer::ReadBuffer;
use super::record::{heap, *};
use crate::errors::{LobsterError, Result};
use crate::snapshot::{
    ClassObj, FieldDecl, HeapThing, Instance, ObjArray, PrimArray, Root, RootKind, Signature,
    Snapshot, StackFrame, StackTrace, StaticField, ThingKind, Value,
};
use lobster_utils::bytes::BeReader;
use lobster_utils::to_hex;

/// Parse a dump file into an unresolved snapshot
pub fn parse_file(path: &Path) -> Result<Snapshot> {
    let buf = ReadBuffer::open(path)?;
    info!(path = %path.display(), bytes = buf.len(), "parsing dump");
    parse_buffer(buf)
}

/// Parse in-memory dump bytes into an unresolved snapshot
pub fn parse_buffer(buf: ReadBuffer) -> Result<Snapshot> {
    let started = Instant::now();
    let parts = {
        let mut parser = Parser::new(buf.as_slice())?;
        parser.run()?;
        parser.into_parts()
    };
    let snapshot = Snapshot::from_parts(
        parts.id_size,
        buf,
        parts.things,
        parts.by_id,
        parts.classes_by_name,
        parts.roots,
        parts.traces,
    );
    info!(
        things = snapshot.object_count(),
        classes = snapshot.class_count(),
        roots = snapshot.roots().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dump parsed"
    );
    Ok(snapshot)
}

struct Parts {
    id_size: usize,
    things: Vec<HeapThing>,
    by_id: FxHashMap<u64, crate::snapshot::ObjId>,
    classes_by_name: BTreeMap<String, crate::snapshot::ObjId>,
    roots: Vec<Root>,
    traces: FxHashMap<u32, StackTrace>,
}

struct RawFrame {
    method_name_id: u64,
    method_sig_id: u64,
    source_file_id: u64,
    class_serial: u32,
    line: i32,
}

struct RawTrace {
    serial: u32,
    thread_serial: u32,
    frame_ids: Vec<u64>,
}

struct Parser<'a> {
    reader: BeReader<'a>,
    id_size: usize,

    /// UTF8 string table, by string id
    names: FxHashMap<u64, String>,
    /// Dotted class name by class object id (LOAD_CLASS records)
    class_names: FxHashMap<u64, String>,
    /// Dotted class name by class serial (frames reference classes by serial)
    class_serials: FxHashMap<u32, String>,
    /// Thread object id by thread serial (stack roots name their thread)
    threads: FxHashMap<u32, u64>,

    raw_frames: FxHashMap<u64, RawFrame>,
    raw_traces: Vec<RawTrace>,

    things: Vec<HeapThing>,
    by_id: FxHashMap<u64, crate::snapshot::ObjId>,
    classes_by_name: BTreeMap<String, crate::snapshot::ObjId>,
    roots: Vec<Root>,
}

impl<'a> Parser<'a> {
    fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = BeReader::new(data);
        let id_size = read_header(&mut reader)?;
        Ok(Self {
            reader,
            id_size,
            names: FxHashMap::default(),
            class_names: FxHashMap::default(),
            class_serials: FxHashMap::default(),
            threads: FxHashMap::default(),
            raw_frames: FxHashMap::default(),
            raw_traces: Vec::new(),
            things: Vec::new(),
            by_id: FxHashMap::default(),
            classes_by_name: BTreeMap::new(),
            roots: Vec::new(),
        })
    }

    fn id(&mut self) -> Result<u64> {
        Ok(self.reader.id(self.id_size)?)
    }

    fn run(&mut self) -> Result<()> {
        // tag + time delta + length
        while self.reader.remaining() >= 9 {
            let record_start = self.reader.pos() as u64;
            let tag = self.reader.u8()?;
            let _time = self.reader.u32()?;
            let length = self.reader.u32()? as usize;
            if self.reader.remaining() < length {
                // a cut-off heap segment means lost objects, never silently usable
                if tag == TAG_HEAP_DUMP || tag == TAG_HEAP_DUMP_SEGMENT {
                    return Err(LobsterError::parse(format!(
                        "heap dump segment of {} bytes truncated, {} remain",
                        length,
                        self.reader.remaining()
                    ))
                    .with_offset(record_start));
                }
                warn!(
                    offset = record_start,
                    tag,
                    length,
                    "truncated record at end of dump, stopping"
                );
                break;
            }
            let body_start = self.reader.pos();
            let body_end = body_start + length;
            match tag {
                TAG_UTF8 => self.read_utf8(length)?,
                TAG_LOAD_CLASS => self.read_load_class()?,
                TAG_STACK_FRAME => self.read_stack_frame()?,
                TAG_STACK_TRACE => self.read_stack_trace()?,
                TAG_HEAP_DUMP | TAG_HEAP_DUMP_SEGMENT => self.read_heap_dump(body_end)?,
                TAG_HEAP_DUMP_END
                | TAG_UNLOAD_CLASS
                | TAG_ALLOC_SITES
                | TAG_HEAP_SUMMARY
                | TAG_START_THREAD
                | TAG_END_THREAD
                | TAG_CPU_SAMPLES
                | TAG_CONTROL_SETTINGS => {}
                other => {
                    warn!(offset = record_start, tag = other, "skipping unknown record");
                }
            }
            self.reader.seek(body_end);
        }
        Ok(())
    }

    fn read_utf8(&mut self, length: usize) -> Result<()> {
        let offset = self.reader.pos() as u64;
        let id = self.id()?;
        let len = length.checked_sub(self.id_size).ok_or_else(|| {
            LobsterError::parse("UTF8 record shorter than one id").with_offset(offset)
        })?;
        let bytes = self.reader.take(len)?;
        let text = String::from_utf8_lossy(bytes).into_owned();
        self.names.insert(id, text);
        Ok(())
    }

    fn read_load_class(&mut self) -> Result<()> {
        let serial = self.reader.u32()?;
        let class_id = self.id()?;
        let _trace_serial = self.reader.u32()?;
        let name_id = self.id()?;
        let name = self.name(name_id).replace('/', ".");
        self.class_serials.insert(serial, name.clone());
        self.class_names.insert(class_id, name);
        Ok(())
    }

    fn read_stack_frame(&mut self) -> Result<()> {
        let frame_id = self.id()?;
        let method_name_id = self.id()?;
        let method_sig_id = self.id()?;
        let source_file_id = self.id()?;
        let class_serial = self.reader.u32()?;
        let line = self.reader.i32()?;
        self.raw_frames.insert(
            frame_id,
            RawFrame {
                method_name_id,
                method_sig_id,
                source_file_id,
                class_serial,
                line,
            },
        );
        Ok(())
    }

    fn read_stack_trace(&mut self) -> Result<()> {
        let serial = self.reader.u32()?;
        let thread_serial = self.reader.u32()?;
        let count = self.reader.u32()? as usize;
        let mut frame_ids = Vec::with_capacity(count);
        for _ in 0..count {
            frame_ids.push(self.id()?);
        }
        self.raw_traces.push(RawTrace {
            serial,
            thread_serial,
            frame_ids,
        });
        Ok(())
    }

    fn read_heap_dump(&mut self, body_end: usize) -> Result<()> {
        while self.reader.pos() < body_end {
            let offset = self.reader.pos() as u64;
            let tag = self.reader.u8()?;
            match tag {
                heap::ROOT_UNKNOWN => {
                    let id = self.id()?;
                    self.roots.push(Root::new(id, 0, RootKind::Unknown));
                }
                heap::ROOT_JNI_GLOBAL => {
                    let id = self.id()?;
                    let _jni_ref = self.id()?;
                    self.roots.push(Root::new(id, 0, RootKind::JniGlobal));
                }
                heap::ROOT_JNI_LOCAL => {
                    let id = self.id()?;
                    let thread_serial = self.reader.u32()?;
                    let frame = self.reader.i32()?;
                    self.roots.push(
                        Root::new(id, 0, RootKind::JniLocal)
                            .with_thread(thread_serial)
                            .with_frame(frame),
                    );
                }
                heap::ROOT_JAVA_FRAME => {
                    let id = self.id()?;
                    let thread_serial = self.reader.u32()?;
                    let frame = self.reader.i32()?;
                    self.roots.push(
                        Root::new(id, 0, RootKind::JavaFrame)
                            .with_thread(thread_serial)
                            .with_frame(frame),
                    );
                }
                heap::ROOT_NATIVE_STACK => {
                    let id = self.id()?;
                    let thread_serial = self.reader.u32()?;
                    self.roots
                        .push(Root::new(id, 0, RootKind::NativeStack).with_thread(thread_serial));
                }
                heap::ROOT_STICKY_CLASS => {
                    let id = self.id()?;
                    self.roots.push(Root::new(id, 0, RootKind::StickyClass));
                }
                heap::ROOT_THREAD_BLOCK => {
                    let id = self.id()?;
                    let thread_serial = self.reader.u32()?;
                    self.roots
                        .push(Root::new(id, 0, RootKind::ThreadBlock).with_thread(thread_serial));
                }
                heap::ROOT_MONITOR_USED => {
                    let id = self.id()?;
                    self.roots.push(Root::new(id, 0, RootKind::MonitorUsed));
                }
                heap::ROOT_THREAD_OBJECT => {
                    let id = self.id()?;
                    let thread_serial = self.reader.u32()?;
                    let trace_serial = self.reader.u32()?;
                    self.threads.insert(thread_serial, id);
                    self.roots.push(
                        Root::new(id, 0, RootKind::ThreadObj)
                            .with_thread(thread_serial)
                            .with_trace(trace_serial),
                    );
                }
                heap::CLASS_DUMP => self.read_class_dump()?,
                heap::INSTANCE_DUMP => self.read_instance_dump()?,
                heap::OBJECT_ARRAY_DUMP => self.read_object_array_dump()?,
                heap::PRIMITIVE_ARRAY_DUMP => self.read_primitive_array_dump()?,
                other => {
                    return Err(LobsterError::parse(format!(
                        "unrecognized heap sub-record 0x{:02x}",
                        other
                    ))
                    .with_offset(offset));
                }
            }
        }
        Ok(())
    }

    fn read_class_dump(&mut self) -> Result<()> {
        let class_id = self.id()?;
        let trace_serial = self.reader.u32()?;
        let super_id = self.id()?;
        let loader_id = self.id()?;
        let signers_id = self.id()?;
        let protection_domain_id = self.id()?;
        let _reserved1 = self.id()?;
        let _reserved2 = self.id()?;
        let instance_size = self.reader.u32()?;

        // constant pool entries carry no useful object links, skip them
        let const_count = self.reader.u16()?;
        for _ in 0..const_count {
            let _index = self.reader.u16()?;
            let sig = self.signature()?;
            self.reader.skip(sig.size(self.id_size))?;
        }

        let static_count = self.reader.u16()?;
        let mut statics = Vec::with_capacity(static_count as usize);
        for _ in 0..static_count {
            let name_id = self.id()?;
            let sig = self.signature()?;
            let value = Value::read_raw(&mut self.reader, sig, self.id_size)?;
            statics.push(StaticField {
                field: FieldDecl::new(self.name(name_id), sig),
                value,
            });
        }

        let field_count = self.reader.u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            let name_id = self.id()?;
            let sig = self.signature()?;
            fields.push(FieldDecl::new(self.name(name_id), sig));
        }

        let name = match self.class_names.get(&class_id) {
            Some(n) => n.clone(),
            None => {
                warn!(class = %to_hex(class_id), "class dump without a class load record");
                format!("unknown-name@{}", to_hex(class_id))
            }
        };
        let class = ClassObj::new(
            name.clone(),
            super_id,
            loader_id,
            signers_id,
            protection_domain_id,
            fields,
            statics,
            instance_size,
        );
        if let Some(id) = self.push_thing(HeapThing::class(class_id, trace_serial, class)) {
            // several loaders may define the same name; keep every class findable
            let key = if self.classes_by_name.contains_key(&name) {
                format!("{}-{}", name, to_hex(class_id))
            } else {
                name
            };
            self.classes_by_name.insert(key, id);
        }
        Ok(())
    }

    fn read_instance_dump(&mut self) -> Result<()> {
        let id = self.id()?;
        let trace_serial = self.reader.u32()?;
        let class_id = self.id()?;
        let data_len = self.reader.u32()?;
        let data_offset = self.reader.pos() as u64;
        self.reader.skip(data_len as usize)?;
        self.push_thing(HeapThing {
            heap_id: id,
            trace_serial,
            kind: ThingKind::Instance(Instance {
                class_id,
                class: None,
                data_offset,
                data_len,
            }),
        });
        Ok(())
    }

    fn read_object_array_dump(&mut self) -> Result<()> {
        let id = self.id()?;
        let trace_serial = self.reader.u32()?;
        let length = self.reader.u32()?;
        let class_id = self.id()?;
        let data_offset = self.reader.pos() as u64;
        self.reader.skip(length as usize * self.id_size)?;
        self.push_thing(HeapThing {
            heap_id: id,
            trace_serial,
            kind: ThingKind::ObjArray(ObjArray {
                class_id,
                class: None,
                length,
                data_offset,
            }),
        });
        Ok(())
    }

    fn read_primitive_array_dump(&mut self) -> Result<()> {
        let id = self.id()?;
        let trace_serial = self.reader.u32()?;
        let length = self.reader.u32()?;
        let elem = self.signature()?;
        let data_offset = self.reader.pos() as u64;
        self.reader.skip(length as usize * elem.size(self.id_size))?;
        self.push_thing(HeapThing {
            heap_id: id,
            trace_serial,
            kind: ThingKind::PrimArray(PrimArray {
                class: None,
                elem,
                length,
                data_offset,
            }),
        });
        Ok(())
    }

    fn signature(&mut self) -> Result<Signature> {
        let offset = self.reader.pos() as u64;
        let code = self.reader.u8()?;
        Signature::from_type_code(code).ok_or_else(|| {
            LobsterError::parse(format!("invalid type code {}", code)).with_offset(offset)
        })
    }

    fn name(&self, name_id: u64) -> String {
        match self.names.get(&name_id) {
            Some(n) => n.clone(),
            None => format!("unresolved-name@{}", to_hex(name_id)),
        }
    }

    fn push_thing(&mut self, thing: HeapThing) -> Option<crate::snapshot::ObjId> {
        use crate::snapshot::ObjId;
        if self.by_id.contains_key(&thing.heap_id) {
            warn!(id = %to_hex(thing.heap_id), "duplicate heap id, keeping first");
            return None;
        }
        let id = ObjId(self.things.len() as u32);
        self.by_id.insert(thing.heap_id, id);
        self.things.push(thing);
        Some(id)
    }

    fn into_parts(mut self) -> Parts {
        // stack roots may precede their ROOT_THREAD_OBJECT, so the thread
        // table is only complete once the whole dump is read
        for root in &mut self.roots {
            if root.referer_id == 0 && root.thread_serial != 0 {
                if let Some(&thread) = self.threads.get(&root.thread_serial) {
                    if root.kind != RootKind::ThreadObj {
                        root.referer_id = thread;
                    }
                }
            }
        }
        let mut traces = FxHashMap::default();
        for raw in &self.raw_traces {
            let frames = raw
                .frame_ids
                .iter()
                .filter_map(|fid| self.raw_frames.get(fid))
                .map(|f| StackFrame {
                    method_name: self.name(f.method_name_id),
                    method_signature: self.name(f.method_sig_id),
                    class_name: self
                        .class_serials
                        .get(&f.class_serial)
                        .cloned()
                        .unwrap_or_else(|| "<unknown class>".to_string()),
                    source_file: self.name(f.source_file_id),
                    line: f.line,
                })
                .collect();
            traces.insert(
                raw.serial,
                StackTrace {
                    serial: raw.serial,
                    thread_serial: raw.thread_serial,
                    frames,
                },
            );
        }
        Parts {
            id_size: self.id_size,
            things: self.things,
            by_id: self.by_id,
            classes_by_name: self.classes_by_name,
            roots: self.roots,
            traces,
        }
    }
}

/// Validate the header, returning the identifier size
fn read_header(reader: &mut BeReader<'_>) -> Result<usize> {
    let mut version = Vec::new();
    loop {
        let b = reader.u8()?;
        if b == 0 {
            break;
        }
        if version.len() > 32 {
            return Err(LobsterError::parse("not an HPROF dump: unterminated header"));
        }
        version.push(b);
    }
    let version = String::from_utf8_lossy(&version).into_owned();
    if version != VERSION_101 && version != VERSION_102 {
        return Err(LobsterError::parse(format!(
            "unsupported dump version {:?}",
            version
        )));
    }
    let id_size = reader.u32()? as usize;
    if id_size != 4 && id_size != 8 {
        return Err(LobsterError::parse(format!(
            "unsupported identifier size {}",
            id_size
        )));
    }
    let _timestamp = reader.u64()?;
    debug!(version = %version, id_size, "dump header accepted");
    Ok(id_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_magic() {
        let data = b"NOT A DUMP\0\x00\x00\x00\x04\x00\x00\x00\x00\x00\x00\x00\x00".to_vec();
        let err = parse_buffer(ReadBuffer::from_vec(data)).unwrap_err();
        assert!(err.to_string().contains("unsupported dump version"));
    }

    #[test]
    fn test_rejects_bad_id_size() {
        let mut data = Vec::new();
        data.extend_from_slice(VERSION_102.as_bytes());
        data.push(0);
        data.extend_from_slice(&3u32.to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        let err = parse_buffer(ReadBuffer::from_vec(data)).unwrap_err();
        assert!(err.to_string().contains("identifier size"));
    }

    #[test]
    fn test_empty_dump_parses() {
        let mut data = Vec::new();
        data.extend_from_slice(VERSION_102.as_bytes());
        data.push(0);
        data.extend_from_slice(&8u32.to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        let snapshot = parse_buffer(ReadBuffer::from_vec(data)).unwrap();
        assert_eq!(snapshot.object_count(), 0);
        assert_eq!(snapshot.id_size(), 8);
    }
}
