//! Baseline comparison
//!
//! Marks objects "new" relative to a baseline snapshot of the same process
//! taken earlier: an object is new when the baseline has no object with
//! the same heap id, or has one of a different type. Ids are stable within
//! one VM run, so this isolates allocations made between the two dumps.

use tracing::info;

use super::object::ThingKind;
use super::value::ObjId;
use super::Snapshot;

impl Snapshot {
    /// Mark objects missing from (or retyped since) `baseline` as new
    pub fn mark_new_relative_to(&mut self, baseline: &Snapshot) {
        self.new_objects.clear();
        for id in self.ids() {
            let heap_id = self.thing(id).heap_id;
            if heap_id == 0 {
                continue; // synthesized, never "new"
            }
            let is_new = match baseline.find_thing(heap_id) {
                None => true,
                Some(base) => !self.same_type(id, baseline, base),
            };
            if is_new {
                self.new_objects.insert(id);
            }
        }
        self.has_new_set = true;
        info!(
            new = self.new_objects.len(),
            total = self.object_count(),
            "baseline comparison complete"
        );
    }

    pub fn has_new_set(&self) -> bool {
        self.has_new_set
    }

    pub fn is_new(&self, id: ObjId) -> bool {
        self.new_objects.contains(&id)
    }

    fn same_type(&self, id: ObjId, baseline: &Snapshot, base: ObjId) -> bool {
        match (&self.thing(id).kind, &baseline.thing(base).kind) {
            (ThingKind::Class(a), ThingKind::Class(b)) => a.name == b.name,
            (ThingKind::PrimArray(a), ThingKind::PrimArray(b)) => a.elem == b.elem,
            (ThingKind::Instance(_), ThingKind::Instance(_))
            | (ThingKind::ObjArray(_), ThingKind::ObjArray(_)) => {
                self.class_name_of(id) == baseline.class_name_of(base)
            }
            _ => false,
        }
    }
}
