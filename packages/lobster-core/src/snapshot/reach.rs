//! Reachability queries
//!
//! Walks the reference graph in both directions: `rootset_references_to`
//! climbs referrers to find how the GC keeps an object alive, and
//! `reachables_from` descends outgoing references to measure what an
//! object retains. Both require a snapshot resolved with referrers.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use super::value::ObjId;
use super::{Snapshot, ThingKind};

/// Path from a rooted object down to a query target
///
/// `objs[0]` is the rooted object, the last element is the target; each
/// object holds a reference to the next.
#[derive(Debug, Clone)]
pub struct ReferenceChain {
    pub objs: Vec<ObjId>,
}

impl ReferenceChain {
    /// The rooted end of the chain
    pub fn obj(&self) -> ObjId {
        self.objs[0]
    }

    /// Number of hops from root to target
    pub fn depth(&self) -> usize {
        self.objs.len() - 1
    }
}

/// Everything reachable from one object
#[derive(Debug)]
pub struct ReachableSet {
    /// Reachable objects sorted by shallow size, largest first
    pub objs: Vec<ObjId>,
    /// Sum of shallow sizes, the starting object included
    pub total_size: u64,
}

impl Snapshot {
    /// All paths from the root set to `target`, breadth-first
    ///
    /// Each rooted object appears in at most one chain, and chains come
    /// back shortest-first. When `include_weak` is false, paths that go
    /// through a weak reference's referent field are not followed.
    pub fn rootset_references_to(&self, target: ObjId, include_weak: bool) -> Vec<ReferenceChain> {
        // nodes form a tree growing from the target toward the roots;
        // each entry links one step closer to the target
        let mut nodes: Vec<(ObjId, Option<usize>)> = vec![(target, None)];
        let mut visited: FxHashSet<ObjId> = FxHashSet::default();
        visited.insert(target);
        let mut queue: VecDeque<usize> = VecDeque::new();
        queue.push_back(0);

        let mut chains = Vec::new();
        while let Some(node) = queue.pop_front() {
            let (obj, _) = nodes[node];
            if self.root_of(obj).is_some() {
                let mut objs = Vec::new();
                let mut cur = Some(node);
                while let Some(i) = cur {
                    objs.push(nodes[i].0);
                    cur = nodes[i].1;
                }
                chains.push(ReferenceChain { objs });
            }
            for &referrer in self.referrers(obj) {
                if visited.contains(&referrer) {
                    continue;
                }
                if !include_weak && self.refers_only_weakly_to(referrer, obj) {
                    continue;
                }
                visited.insert(referrer);
                nodes.push((referrer, Some(node)));
                queue.push_back(nodes.len() - 1);
            }
        }
        chains
    }

    /// True iff the only references `from` holds to `to` go through the
    /// referent field of a weak reference
    pub fn refers_only_weakly_to(&self, from: ObjId, to: ObjId) -> bool {
        let weak = match self.weak_ref_class {
            Some(w) => w,
            None => return false,
        };
        let class = match self.thing(from).class_of() {
            Some(c) => c,
            None => return false,
        };
        if !self.is_assignable_from(weak, class) {
            return false;
        }
        let values = match self.instance_fields(from) {
            Ok(v) => v,
            Err(_) => return false,
        };
        for (i, v) in values.iter().enumerate() {
            if i != self.referent_field_index && v.as_obj() == Some(to) {
                return false;
            }
        }
        values
            .get(self.referent_field_index)
            .and_then(|v| v.as_obj())
            == Some(to)
    }

    /// Transitive closure of outgoing references from `start`
    ///
    /// Fields on the snapshot's exclude list are not followed, and the
    /// walk never descends through java.lang.Class statics reached
    /// indirectly, matching what a retained-size estimate wants.
    pub fn reachables_from(&self, start: ObjId) -> ReachableSet {
        let mut visited: FxHashSet<ObjId> = FxHashSet::default();
        visited.insert(start);
        let mut queue: VecDeque<ObjId> = VecDeque::new();
        queue.push_back(start);
        let mut objs = Vec::new();
        let mut total_size = self.size_of(start);

        while let Some(obj) = queue.pop_front() {
            let outs = match self.outgoing_refs(obj, self.excludes()) {
                Ok(o) => o,
                Err(_) => continue,
            };
            for out in outs {
                if !visited.insert(out) {
                    continue;
                }
                // statics of a class reached via getClass-style edges
                // would pull in half the heap
                if obj != start && matches!(self.thing(out).kind, ThingKind::Class(_)) {
                    continue;
                }
                total_size += self.size_of(out);
                objs.push(out);
                queue.push_back(out);
            }
        }
        objs.sort_by(|a, b| {
            self.size_of(*b)
                .cmp(&self.size_of(*a))
                .then_with(|| self.thing(*a).heap_id.cmp(&self.thing(*b).heap_id))
        });
        ReachableSet { objs, total_size }
    }
}
