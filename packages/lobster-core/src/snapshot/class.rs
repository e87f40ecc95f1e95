//! Class objects
//!
//! A `ClassObj` is itself a heap thing (classes live on the heap too) and
//! additionally carries the field layout its instances are decoded with.
//! Links to other heap things (`superclass`, resolved static values) are
//! raw heap ids after parsing and become arena indices during
//! `Snapshot::resolve`.

use super::value::{ObjId, Signature, Value};

/// Declared (non-static) field
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub signature: Signature,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
        }
    }
}

/// Static field with its value (decoded eagerly from the class record)
#[derive(Debug, Clone)]
pub struct StaticField {
    pub field: FieldDecl,
    pub value: Value,
}

/// A class in the snapshot
#[derive(Debug, Clone)]
pub struct ClassObj {
    pub name: String,

    // Raw heap ids from the class record; 0 means none
    pub super_id: u64,
    pub loader_id: u64,
    pub signers_id: u64,
    pub protection_domain_id: u64,

    // Resolved links, set by Snapshot::resolve
    pub superclass: Option<ObjId>,
    pub loader: Value,
    pub signers: Value,
    pub protection_domain: Value,

    /// Fields declared by this class only
    pub fields: Vec<FieldDecl>,
    pub statics: Vec<StaticField>,

    /// Instance data size in bytes, excluding VM object header
    pub instance_size: u32,
    /// Total field count including superclasses, set on resolve
    pub total_fields: usize,

    pub subclasses: Vec<ObjId>,
    pub instances: Vec<ObjId>,

    /// True for classes fabricated during resolve (missing from the dump)
    pub synthetic: bool,
}

impl ClassObj {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        super_id: u64,
        loader_id: u64,
        signers_id: u64,
        protection_domain_id: u64,
        fields: Vec<FieldDecl>,
        statics: Vec<StaticField>,
        instance_size: u32,
    ) -> Self {
        Self {
            name: name.into(),
            super_id,
            loader_id,
            signers_id,
            protection_domain_id,
            superclass: None,
            loader: Value::Null,
            signers: Value::Null,
            protection_domain: Value::Null,
            fields,
            statics,
            instance_size,
            total_fields: 0,
            subclasses: Vec::new(),
            instances: Vec::new(),
            synthetic: false,
        }
    }

    /// Fabricate a class that was not present in the dump
    pub fn synthetic(name: impl Into<String>, fields: Vec<FieldDecl>, instance_size: u32) -> Self {
        let mut class = Self::new(name, 0, 0, 0, 0, fields, Vec::new(), instance_size);
        class.synthetic = true;
        class
    }

    pub fn is_array(&self) -> bool {
        self.name.contains('[')
    }

    /// Loaded by the bootstrap loader (no loader object)
    pub fn is_bootstrap(&self) -> bool {
        self.loader.is_null()
    }

    pub fn static_value(&self, name: &str) -> Option<&Value> {
        self.statics
            .iter()
            .find(|s| s.field.name == name)
            .map(|s| &s.value)
    }
}
