//! HPROF record tags
//!
//! Top-level records carry a tag byte, a microsecond timestamp delta and a
//! u32 body length. Heap dump bodies are a flat sequence of sub-records
//! identified by their own tag byte with no length prefix.

/// Top-level record tags
pub const TAG_UTF8: u8 = 0x01;
pub const TAG_LOAD_CLASS: u8 = 0x02;
pub const TAG_UNLOAD_CLASS: u8 = 0x03;
pub const TAG_STACK_FRAME: u8 = 0x04;
pub const TAG_STACK_TRACE: u8 = 0x05;
pub const TAG_ALLOC_SITES: u8 = 0x06;
pub const TAG_HEAP_SUMMARY: u8 = 0x07;
pub const TAG_START_THREAD: u8 = 0x0a;
pub const TAG_END_THREAD: u8 = 0x0b;
pub const TAG_HEAP_DUMP: u8 = 0x0c;
pub const TAG_CPU_SAMPLES: u8 = 0x0d;
pub const TAG_CONTROL_SETTINGS: u8 = 0x0e;
pub const TAG_HEAP_DUMP_SEGMENT: u8 = 0x1c;
pub const TAG_HEAP_DUMP_END: u8 = 0x2c;

/// Heap dump sub-record tags
pub mod heap {
    pub const ROOT_JNI_GLOBAL: u8 = 0x01;
    pub const ROOT_JNI_LOCAL: u8 = 0x02;
    pub const ROOT_JAVA_FRAME: u8 = 0x03;
    pub const ROOT_NATIVE_STACK: u8 = 0x04;
    pub const ROOT_STICKY_CLASS: u8 = 0x05;
    pub const ROOT_THREAD_BLOCK: u8 = 0x06;
    pub const ROOT_MONITOR_USED: u8 = 0x07;
    pub const ROOT_THREAD_OBJECT: u8 = 0x08;
    pub const CLASS_DUMP: u8 = 0x20;
    pub const INSTANCE_DUMP: u8 = 0x21;
    pub const OBJECT_ARRAY_DUMP: u8 = 0x22;
    pub const PRIMITIVE_ARRAY_DUMP: u8 = 0x23;
    pub const ROOT_UNKNOWN: u8 = 0xff;
}

/// Supported header version strings
pub const VERSION_101: &str = "JAVA PROFILE 1.0.1";
pub const VERSION_102: &str = "JAVA PROFILE 1.0.2";
