//! Post-parse resolution
//!
//! Turns the raw heap ids the parser collected into arena links: superclass
//! chains, class membership, static values, and optionally the inverted
//! reference graph. Classes referenced but missing from the dump are
//! fabricated so every instance ends up with a class.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::class::{ClassObj, FieldDecl};
use super::object::{HeapThing, ThingKind};
use super::value::{ObjId, Signature, Value};
use super::{
    Snapshot, JAVA_LANG_CLASS, JAVA_LANG_CLASS_LOADER, JAVA_LANG_STRING, WEAK_REFERENCE_CLASS,
};
use crate::errors::Result;
use lobster_utils::to_hex;

impl Snapshot {
    /// Resolve all cross-references collected during parsing
    ///
    /// `calculate_refs` additionally inverts the reference graph and binds
    /// roots to their targets; skipping it makes queries that need
    /// referrers unavailable but speeds up load considerably.
    pub fn resolve(&mut self, calculate_refs: bool) -> Result<()> {
        info!(
            things = self.things.len(),
            classes = self.classes_by_name.len(),
            "resolving snapshot"
        );
        self.ensure_well_known_classes();
        self.resolve_classes();
        self.resolve_instances();
        self.register_class_instances();
        self.resolve_weak_references();
        if calculate_refs {
            self.calculate_referrers()?;
            self.bind_roots();
        }
        self.resolved = true;
        info!(things = self.things.len(), "snapshot resolved");
        Ok(())
    }

    // Classes every snapshot must have, fabricated if the dump lacks them
    fn ensure_well_known_classes(&mut self) {
        self.java_lang_class = self.well_known(JAVA_LANG_CLASS);
        self.java_lang_string = self.well_known(JAVA_LANG_STRING);
        self.java_lang_class_loader = self.well_known(JAVA_LANG_CLASS_LOADER);
    }

    fn well_known(&mut self, name: &str) -> Option<ObjId> {
        if let Some(id) = self.classes_by_name.get(name) {
            return Some(*id);
        }
        warn!(class = name, "dump has no such class, fabricating one");
        Some(self.add_synthetic_class(ClassObj::synthetic(name, Vec::new(), 0), 0))
    }

    /// Push a fabricated class into the arena
    fn add_synthetic_class(&mut self, class: ClassObj, heap_id: u64) -> ObjId {
        let id = ObjId(self.things.len() as u32);
        let name = class.name.clone();
        self.things.push(HeapThing::class(heap_id, 0, class));
        if heap_id != 0 {
            self.by_id.insert(heap_id, id);
        }
        // a real class may already own the name; keep both findable
        if self.classes_by_name.contains_key(&name) {
            self.classes_by_name.insert(format!("{}-{}", name, to_hex(heap_id)), id);
        } else {
            self.classes_by_name.insert(name, id);
        }
        id
    }

    fn class_ids(&self) -> Vec<ObjId> {
        self.ids().filter(|id| self.thing(*id).is_class()).collect()
    }

    fn resolve_classes(&mut self) {
        let class_ids = self.class_ids();

        // superclass links
        let mut supers = Vec::with_capacity(class_ids.len());
        for &id in &class_ids {
            let super_id = self.class(id).map_or(0, |c| c.super_id);
            let link = self
                .find_thing(super_id)
                .filter(|t| self.thing(*t).is_class());
            if super_id != 0 && link.is_none() {
                warn!(
                    class = self.class(id).map_or("?", |c| c.name.as_str()),
                    super_id = %to_hex(super_id),
                    "superclass not in dump"
                );
            }
            supers.push((id, link));
        }
        for (id, link) in supers {
            if let Some(c) = self.things[id.index()].as_class_mut() {
                c.superclass = link;
            }
        }

        // subclass lists and total field counts need the links in place
        let mut subs = Vec::new();
        let mut totals = Vec::with_capacity(class_ids.len());
        for &id in &class_ids {
            if let Some(sup) = self.class(id).and_then(|c| c.superclass) {
                subs.push((sup, id));
            }
            let total: usize = self
                .class_chain(id)
                .iter()
                .filter_map(|c| self.class(*c))
                .map(|c| c.fields.len())
                .sum();
            totals.push((id, total));
        }
        for (sup, sub) in subs {
            if let Some(c) = self.things[sup.index()].as_class_mut() {
                c.subclasses.push(sub);
            }
        }
        for (id, total) in totals {
            if let Some(c) = self.things[id.index()].as_class_mut() {
                c.total_fields = total;
            }
        }

        // loader/signers/protection-domain links and static values
        let mut resolved = Vec::with_capacity(class_ids.len());
        for &id in &class_ids {
            let class = match self.class(id) {
                Some(c) => c,
                None => continue,
            };
            let links = [
                self.link_value(class.loader_id),
                self.link_value(class.signers_id),
                self.link_value(class.protection_domain_id),
            ];
            let statics: Vec<Value> = class
                .statics
                .iter()
                .map(|s| match s.value {
                    Value::Unresolved(raw) => match self.find_thing(raw) {
                        Some(t) => Value::Ref(t),
                        None => Value::Unresolved(raw),
                    },
                    v => v,
                })
                .collect();
            resolved.push((id, links, statics));
        }
        for (id, [loader, signers, domain], statics) in resolved {
            if let Some(c) = self.things[id.index()].as_class_mut() {
                c.loader = loader;
                c.signers = signers;
                c.protection_domain = domain;
                for (s, v) in c.statics.iter_mut().zip(statics) {
                    s.value = v;
                }
            }
        }

    }

    /// Every class is an instance of java.lang.Class; runs after instance
    /// resolution so fabricated classes are counted too
    fn register_class_instances(&mut self) {
        if let Some(jlc) = self.java_lang_class {
            let all = self.class_ids();
            if let Some(c) = self.things[jlc.index()].as_class_mut() {
                c.instances = all;
            }
        }
    }

    fn link_value(&self, raw: u64) -> Value {
        if raw == 0 {
            Value::Null
        } else if let Some(t) = self.find_thing(raw) {
            Value::Ref(t)
        } else {
            Value::Unresolved(raw)
        }
    }

    /// Link every instance and array to its class, fabricating classes for
    /// ids the dump never defined
    fn resolve_instances(&mut self) {
        enum Need {
            Link(ObjId),
            FakeInstanceClass { class_id: u64, data_len: u32 },
            OtherArrayClass,
            PrimArrayClass(Signature),
        }

        let mut needs = Vec::new();
        for id in self.ids() {
            let need = match &self.thing(id).kind {
                ThingKind::Class(_) => continue,
                ThingKind::Instance(i) => match i
                    .class
                    .or_else(|| self.find_thing(i.class_id))
                    .filter(|t| self.thing(*t).is_class())
                {
                    Some(c) => Need::Link(c),
                    None => Need::FakeInstanceClass {
                        class_id: i.class_id,
                        data_len: i.data_len,
                    },
                },
                ThingKind::ObjArray(a) => match self
                    .find_thing(a.class_id)
                    .filter(|t| self.thing(*t).is_class())
                {
                    Some(c) => Need::Link(c),
                    None => Need::OtherArrayClass,
                },
                ThingKind::PrimArray(a) => Need::PrimArrayClass(a.elem),
            };
            needs.push((id, need));
        }

        let mut fakes: FxHashMap<u64, ObjId> = FxHashMap::default();
        let mut named: FxHashMap<String, ObjId> = FxHashMap::default();
        let mut links = Vec::with_capacity(needs.len());
        for (id, need) in needs {
            let class = match need {
                Need::Link(c) => c,
                Need::FakeInstanceClass { class_id, data_len } => {
                    match fakes.get(&class_id) {
                        Some(&c) => c,
                        None => {
                            let c = self.fake_instance_class(class_id, data_len);
                            fakes.insert(class_id, c);
                            c
                        }
                    }
                }
                Need::OtherArrayClass => self.named_synthetic_class("[<other>", &mut named),
                Need::PrimArrayClass(elem) => {
                    self.named_synthetic_class(elem.primitive_array_name(), &mut named)
                }
            };
            links.push((id, class));
        }

        for (id, class) in links {
            match &mut self.things[id.index()].kind {
                ThingKind::Instance(i) => i.class = Some(class),
                ThingKind::ObjArray(a) => a.class = Some(class),
                ThingKind::PrimArray(a) => a.class = Some(class),
                ThingKind::Class(_) => {}
            }
            if let Some(c) = self.things[class.index()].as_class_mut() {
                c.instances.push(id);
            }
        }
    }

    /// Class for instances whose class record is missing: filler int/byte
    /// fields sized to the instance data
    fn fake_instance_class(&mut self, class_id: u64, data_len: u32) -> ObjId {
        let name = format!("unknown-class<@{}>", to_hex(class_id));
        warn!(class = %name, "instance of a class not in dump, fabricating");
        let mut fields = Vec::new();
        let ints = data_len / 4;
        let bytes = data_len % 4;
        for i in 0..ints {
            fields.push(FieldDecl::new(format!("unknown${}", i), Signature::Int));
        }
        for i in 0..bytes {
            fields.push(FieldDecl::new(format!("unknown$b{}", i), Signature::Byte));
        }
        let mut class = ClassObj::synthetic(name, fields, data_len);
        class.total_fields = class.fields.len();
        self.add_synthetic_class(class, class_id)
    }

    fn named_synthetic_class(
        &mut self,
        name: &str,
        cache: &mut FxHashMap<String, ObjId>,
    ) -> ObjId {
        if let Some(&c) = cache.get(name) {
            return c;
        }
        let id = match self.classes_by_name.get(name) {
            Some(&existing) => existing,
            None => self.add_synthetic_class(ClassObj::synthetic(name, Vec::new(), 0), 0),
        };
        cache.insert(name.to_string(), id);
        id
    }

    /// Pin java.lang.ref.Reference and the index of its referent field
    fn resolve_weak_references(&mut self) {
        let weak = self
            .classes_by_name
            .get(WEAK_REFERENCE_CLASS)
            .or_else(|| self.classes_by_name.get("sun.misc.Ref"))
            .copied();
        self.weak_ref_class = weak;
        if let Some(w) = weak {
            let fields = self.fields_for_instance(w);
            self.referent_field_index = fields
                .iter()
                .position(|(_, f)| f.name == "referent")
                .unwrap_or(0);
            debug!(
                index = self.referent_field_index,
                "weak reference referent field located"
            );
        }
    }

    /// Invert the reference graph: referrers[target] = everyone pointing at it
    fn calculate_referrers(&mut self) -> Result<()> {
        let n = self.things.len();
        debug!(things = n, "computing referrers");
        let snap: &Snapshot = self;
        let outgoing: Vec<Vec<ObjId>> = (0..n as u32)
            .into_par_iter()
            .map(|i| {
                let id = ObjId(i);
                snap.outgoing_refs(id, None).unwrap_or_else(|e| {
                    warn!(obj = %snap.id_string(id), error = %e, "cannot decode references");
                    Vec::new()
                })
            })
            .collect();
        let mut referrers: Vec<Vec<ObjId>> = vec![Vec::new(); n];
        for (from, outs) in outgoing.into_iter().enumerate() {
            for to in outs {
                referrers[to.index()].push(ObjId(from as u32));
            }
        }
        for list in &mut referrers {
            list.sort_unstable();
            list.dedup();
        }
        self.referrers = referrers;
        Ok(())
    }

    /// Attach each root to its target, keeping the most interesting one
    fn bind_roots(&mut self) {
        let mut bound: FxHashMap<ObjId, usize> = FxHashMap::default();
        let mut dangling = 0usize;
        for (i, root) in self.roots.iter().enumerate() {
            match self.find_thing(root.target_id) {
                Some(target) => {
                    let entry = bound.entry(target).or_insert(i);
                    if self.roots[*entry].kind < root.kind {
                        *entry = i;
                    }
                }
                None => dangling += 1,
            }
        }
        if dangling > 0 {
            debug!(count = dangling, "roots pointing outside the dump");
        }
        self.root_of = bound;
    }
}
