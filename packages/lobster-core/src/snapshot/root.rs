//! GC roots
//!
//! Each ROOT_* sub-record in the heap dump pins one object. When several
//! roots pin the same object the snapshot remembers the most interesting
//! one; `RootKind` variants are declared least-interesting first so the
//! derived `Ord` gives that ranking directly.

use lobster_utils::to_hex;

/// Why an object is a GC root, least interesting first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RootKind {
    Unknown,
    ThreadBlock,
    MonitorUsed,
    NativeStack,
    JniLocal,
    JavaFrame,
    ThreadObj,
    JniGlobal,
    StickyClass,
}

impl RootKind {
    pub fn name(&self) -> &'static str {
        match self {
            RootKind::Unknown => "Unknown",
            RootKind::ThreadBlock => "Thread block",
            RootKind::MonitorUsed => "Busy monitor",
            RootKind::NativeStack => "Native stack",
            RootKind::JniLocal => "JNI local",
            RootKind::JavaFrame => "Java local",
            RootKind::ThreadObj => "Thread object",
            RootKind::JniGlobal => "JNI global",
            RootKind::StickyClass => "System class",
        }
    }
}

/// One GC root entry
#[derive(Debug, Clone)]
pub struct Root {
    /// Heap id of the pinned object
    pub target_id: u64,
    /// Heap id of the referer (thread object for stack roots), 0 if none
    pub referer_id: u64,
    pub kind: RootKind,
    /// Position in the snapshot's root table, set when added
    pub index: usize,
    /// Thread serial for stack/local roots, 0 otherwise
    pub thread_serial: u32,
    /// Frame number for local roots, -1 when empty
    pub frame_number: i32,
    /// Allocation trace serial for thread object roots, 0 otherwise
    pub stack_trace_serial: u32,
}

impl Root {
    pub fn new(target_id: u64, referer_id: u64, kind: RootKind) -> Self {
        Self {
            target_id,
            referer_id,
            kind,
            index: 0,
            thread_serial: 0,
            frame_number: -1,
            stack_trace_serial: 0,
        }
    }

    pub fn with_thread(mut self, thread_serial: u32) -> Self {
        self.thread_serial = thread_serial;
        self
    }

    pub fn with_frame(mut self, frame_number: i32) -> Self {
        self.frame_number = frame_number;
        self
    }

    pub fn with_trace(mut self, stack_trace_serial: u32) -> Self {
        self.stack_trace_serial = stack_trace_serial;
        self
    }

    /// Human-readable description used on root pages
    pub fn description(&self) -> String {
        let mut out = format!("{} reference to {}", self.kind.name(), to_hex(self.target_id));
        if self.thread_serial != 0 {
            out.push_str(&format!(" (thread {}", self.thread_serial));
            if self.frame_number >= 0 {
                out.push_str(&format!(", frame {}", self.frame_number));
            }
            out.push(')');
        }
        out
    }

    /// Of two roots pinning the same object, keep the stronger claim
    pub fn most_interesting<'a>(&'a self, other: &'a Root) -> &'a Root {
        if other.kind > self.kind {
            other
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ordering() {
        assert!(RootKind::StickyClass > RootKind::JavaFrame);
        assert!(RootKind::JavaFrame > RootKind::Unknown);
        assert!(RootKind::JniGlobal > RootKind::JniLocal);
    }

    #[test]
    fn test_most_interesting_prefers_stronger_kind() {
        let weak = Root::new(0x10, 0, RootKind::ThreadBlock);
        let strong = Root::new(0x10, 0, RootKind::StickyClass);
        assert_eq!(weak.most_interesting(&strong).kind, RootKind::StickyClass);
        assert_eq!(strong.most_interesting(&weak).kind, RootKind::StickyClass);
    }

    #[test]
    fn test_description_mentions_thread() {
        let root = Root::new(0x10, 0x20, RootKind::JavaFrame)
            .with_thread(3)
            .with_frame(1);
        let desc = root.description();
        assert!(desc.contains("Java local"));
        assert!(desc.contains("thread 3"));
        assert!(desc.contains("frame 1"));
    }
}
