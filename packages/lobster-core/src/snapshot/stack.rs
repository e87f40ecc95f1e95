//! Allocation site stack traces

/// One frame of an allocation trace
#[derive(Debug, Clone)]
pub struct StackFrame {
    pub method_name: String,
    pub method_signature: String,
    pub class_name: String,
    pub source_file: String,
    /// Line number, or one of the negative markers below
    pub line: i32,
}

impl StackFrame {
    pub const LINE_UNKNOWN: i32 = -1;
    pub const LINE_COMPILED: i32 = -2;
    pub const LINE_NATIVE: i32 = -3;

    pub fn line_string(&self) -> String {
        match self.line {
            Self::LINE_COMPILED => "(compiled method)".to_string(),
            Self::LINE_NATIVE => "(native method)".to_string(),
            n if n > 0 => format!("line {}", n),
            _ => "(unknown)".to_string(),
        }
    }
}

/// Allocation trace: where an object was created
#[derive(Debug, Clone)]
pub struct StackTrace {
    pub serial: u32,
    pub thread_serial: u32,
    pub frames: Vec<StackFrame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(line: i32) -> StackFrame {
        StackFrame {
            method_name: "alloc".into(),
            method_signature: "()V".into(),
            class_name: "com.example.Node".into(),
            source_file: "Node.java".into(),
            line,
        }
    }

    #[test]
    fn test_line_string() {
        assert_eq!(frame(42).line_string(), "line 42");
        assert_eq!(frame(StackFrame::LINE_NATIVE).line_string(), "(native method)");
        assert_eq!(
            frame(StackFrame::LINE_COMPILED).line_string(),
            "(compiled method)"
        );
        assert_eq!(frame(StackFrame::LINE_UNKNOWN).line_string(), "(unknown)");
    }
}
