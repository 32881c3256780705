//! C2 — the type registry (spec §4.2).

use std::collections::HashMap;

use crate::document::{Document, TypeDef, TypeKind};
use crate::error::ValidationError;

/// An ABI document parsed into a name-indexed, reference-checked,
/// cycle-free registry.
#[derive(Debug)]
pub struct Registry {
    types: HashMap<String, TypeDef>,
}

impl Registry {
    /// Builds a registry from a document, validating every `type-ref` and
    /// rejecting reference cycles (spec §4.2).
    pub fn build(document: Document) -> Result<Self, ValidationError> {
        let types = document
            .types
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        let registry = Registry { types };
        registry.validate_references()?;
        registry.detect_cycles()?;
        Ok(registry)
    }

    /// Looks up a type by name, failing with a validation error when it is
    /// missing (spec §4.2: "The registry's get(name) operation fails with
    /// a validation error when the type is missing").
    pub fn get(&self, name: &str) -> Result<&TypeDef, ValidationError> {
        self.types
            .get(name)
            .ok_or_else(|| ValidationError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    fn validate_references(&self) -> Result<(), ValidationError> {
        for def in self.types.values() {
            self.walk_for_refs(&def.kind, &def.name)?;
        }
        Ok(())
    }

    fn walk_for_refs(&self, kind: &TypeKind, context: &str) -> Result<(), ValidationError> {
        match kind {
            TypeKind::Primitive(_) => Ok(()),
            TypeKind::TypeRef(name) => {
                if self.types.contains_key(name) {
                    Ok(())
                } else {
                    Err(ValidationError::UnknownTypeRef {
                        name: name.clone(),
                        context: context.to_string(),
                    })
                }
            }
            TypeKind::Array(array) => self.walk_for_refs(&array.element, context),
            TypeKind::Struct(s) => {
                for field in &s.fields {
                    self.walk_for_refs(&field.kind, context)?;
                }
                Ok(())
            }
            TypeKind::Enum(e) => {
                for variant in &e.variants {
                    self.walk_for_refs(&variant.kind, context)?;
                }
                Ok(())
            }
            TypeKind::Union(u) => {
                for variant in &u.variants {
                    self.walk_for_refs(&variant.kind, context)?;
                }
                Ok(())
            }
            TypeKind::SizeDiscriminatedUnion(s) => {
                for variant in &s.variants {
                    self.walk_for_refs(&variant.kind, context)?;
                }
                Ok(())
            }
        }
    }

    /// Direct `type-ref` edges reachable from `kind` (traversing through
    /// structs/arrays/enums/unions, but only `type-ref` targets count as
    /// graph edges for cycle detection — spec §4.2).
    fn direct_type_refs<'a>(&self, kind: &'a TypeKind, out: &mut Vec<&'a str>) {
        match kind {
            TypeKind::Primitive(_) => {}
            TypeKind::TypeRef(name) => out.push(name),
            TypeKind::Array(array) => self.direct_type_refs(&array.element, out),
            TypeKind::Struct(s) => {
                for field in &s.fields {
                    self.direct_type_refs(&field.kind, out);
                }
            }
            TypeKind::Enum(e) => {
                for variant in &e.variants {
                    self.direct_type_refs(&variant.kind, out);
                }
            }
            TypeKind::Union(u) => {
                for variant in &u.variants {
                    self.direct_type_refs(&variant.kind, out);
                }
            }
            TypeKind::SizeDiscriminatedUnion(s) => {
                for variant in &s.variants {
                    self.direct_type_refs(&variant.kind, out);
                }
            }
        }
    }

    fn detect_cycles(&self) -> Result<(), ValidationError> {
        let mut marks: HashMap<&str, MarkState> = HashMap::new();

        for name in self.types.keys() {
            if marks.contains_key(name.as_str()) {
                continue;
            }
            let mut stack = Vec::new();
            self.dfs(name, &mut marks, &mut stack)?;
        }

        Ok(())
    }

    fn dfs<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, MarkState>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), ValidationError> {
        marks.insert(name, MarkState::Visiting);
        stack.push(name);

        let def = self
            .types
            .get(name)
            .expect("reference validation already ensured this type exists");
        let mut edges = Vec::new();
        self.direct_type_refs(&def.kind, &mut edges);

        for edge in edges {
            match marks.get(edge) {
                Some(MarkState::Visiting) => {
                    let mut path: Vec<&str> = stack.clone();
                    path.push(edge);
                    return Err(ValidationError::Cycle {
                        path: path.join(" -> "),
                    });
                }
                Some(MarkState::Visited) => continue,
                None => self.dfs(edge, marks, stack)?,
            }
        }

        stack.pop();
        marks.insert(name, MarkState::Visited);
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum MarkState {
    Visiting,
    Visited,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::*;

    fn prim(p: Primitive) -> TypeKind {
        TypeKind::Primitive(p)
    }

    #[test]
    fn rejects_unknown_type_ref() {
        let doc = Document {
            types: vec![TypeDef {
                name: "A".into(),
                kind: TypeKind::TypeRef("Missing".into()),
            }],
        };
        let err = Registry::build(doc).unwrap_err();
        assert!(matches!(err, ValidationError::UnknownTypeRef { .. }));
    }

    #[test]
    fn detects_direct_cycle() {
        let doc = Document {
            types: vec![TypeDef {
                name: "Loop".into(),
                kind: TypeKind::Struct(StructDef {
                    fields: vec![FieldDef {
                        name: "next".into(),
                        kind: TypeKind::TypeRef("Loop".into()),
                    }],
                    attributes: Attributes::default(),
                }),
            }],
        };
        let err = Registry::build(doc).unwrap_err();
        assert!(matches!(err, ValidationError::Cycle { .. }));
    }

    #[test]
    fn accepts_acyclic_indirection() {
        let doc = Document {
            types: vec![
                TypeDef {
                    name: "A".into(),
                    kind: TypeKind::TypeRef("B".into()),
                },
                TypeDef {
                    name: "B".into(),
                    kind: prim(Primitive::U8),
                },
            ],
        };
        let registry = Registry::build(doc).unwrap();
        assert!(registry.contains("A"));
        assert!(registry.contains("B"));
    }

    #[test]
    fn get_missing_type_is_validation_error() {
        let doc = Document { types: vec![] };
        let registry = Registry::build(doc).unwrap();
        assert!(matches!(registry.get("Nope"), Err(ValidationError::UnknownType(_))));
    }
}
