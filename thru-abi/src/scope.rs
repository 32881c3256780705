//! A per-struct scope chain (spec §3, §9: "Scope chain for field
//! references"). A scope is created when a struct begins decoding; fields
//! are appended to it as they decode, so later fields (and nested types)
//! may reference earlier siblings, and nested types may reach up through
//! `..` to an enclosing struct's already-decoded fields.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::DecodedValue;

pub type ScopeRef = Rc<ScopeNode>;

pub struct ScopeNode {
    parent: Option<ScopeRef>,
    fields: RefCell<Vec<(String, DecodedValue)>>,
}

impl ScopeNode {
    pub fn new(parent: Option<ScopeRef>) -> ScopeRef {
        Rc::new(ScopeNode {
            parent,
            fields: RefCell::new(Vec::new()),
        })
    }

    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    pub fn insert(&self, name: String, value: DecodedValue) {
        self.fields.borrow_mut().push((name, value));
    }

    /// Looks up a field declared directly in this scope (not ancestors).
    pub fn get(&self, name: &str) -> Option<DecodedValue> {
        self.fields
            .borrow()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}
