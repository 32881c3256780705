//! C4 — the schema-driven decoder (spec §4.4).

use num_traits::ToPrimitive;
use thru_codec::read;

use crate::document::{ArrayDef, Primitive, StructDef, TypeKind};
use crate::error::DecodeError;
use crate::expr;
use crate::layout;
use crate::path::DecodePath;
use crate::registry::Registry;
use crate::scope::{ScopeNode, ScopeRef};
use crate::value::{DecodedKind, DecodedValue, PrimitiveValue, UnionAttempt};

/// Bounds on decode-time resource usage, separated from hard-coded magic
/// numbers so a caller can tune them for its own schemas.
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_array_length: usize,
    pub max_union_variants: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits {
            max_array_length: 16 * 1024 * 1024,
            max_union_variants: 256,
        }
    }
}

/// Entry point (spec §4.4): decode `type_name` out of `buffer` against
/// `registry`, requiring the whole buffer to be consumed.
pub fn decode(registry: &Registry, type_name: &str, buffer: &[u8]) -> Result<DecodedValue, DecodeError> {
    decode_with_limits(registry, type_name, buffer, DecodeLimits::default())
}

pub fn decode_with_limits(
    registry: &Registry,
    type_name: &str,
    buffer: &[u8],
    limits: DecodeLimits,
) -> Result<DecodedValue, DecodeError> {
    let def = registry.get(type_name)?;
    let mut state = Decoder {
        registry,
        buffer,
        offset: 0,
        window_end: None,
        scope: None,
        limits,
    };
    let path = DecodePath::root(type_name);
    let value = state.decode_kind(&def.kind, None, &path)?;
    let value = value.with_type_name(type_name);

    if state.offset != buffer.len() {
        return Err(DecodeError::TrailingBytes {
            path: path.to_string(),
            expected: buffer.len(),
            consumed: state.offset,
            remaining: buffer.len() - state.offset,
        });
    }

    Ok(value)
}

struct Decoder<'a> {
    registry: &'a Registry,
    buffer: &'a [u8],
    offset: usize,
    /// Hard ceiling (absolute offset) imposed while speculatively decoding
    /// a size-discriminated-union variant; `None` means "bounded only by
    /// the buffer itself".
    window_end: Option<usize>,
    scope: Option<ScopeRef>,
    limits: DecodeLimits,
}

impl<'a> Decoder<'a> {
    fn limit(&self) -> usize {
        self.window_end.unwrap_or(self.buffer.len())
    }

    fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.offset)
    }

    fn decode_kind(
        &mut self,
        kind: &TypeKind,
        budget: Option<usize>,
        path: &DecodePath,
    ) -> Result<DecodedValue, DecodeError> {
        match kind {
            TypeKind::Primitive(p) => self.decode_primitive(*p, path),
            TypeKind::TypeRef(name) => self.decode_type_ref(name, budget, path),
            TypeKind::Struct(s) => self.decode_struct(s, budget, path),
            TypeKind::Array(a) => self.decode_array(a, path),
            TypeKind::Enum(e) => self.decode_enum(e, budget, path),
            TypeKind::Union(u) => self.decode_union(&u.variants, path),
            TypeKind::SizeDiscriminatedUnion(s) => {
                self.decode_size_discriminated_union(&s.variants, budget, path)
            }
        }
    }

    fn decode_type_ref(
        &mut self,
        name: &str,
        budget: Option<usize>,
        path: &DecodePath,
    ) -> Result<DecodedValue, DecodeError> {
        let def = self.registry.get(name)?;
        let kind = def.kind.clone();
        let value = self.decode_kind(&kind, budget, path)?;
        Ok(value.with_type_name(name))
    }

    fn decode_primitive(&mut self, p: Primitive, path: &DecodePath) -> Result<DecodedValue, DecodeError> {
        let start = self.offset;
        let len = p.byte_len();
        if self.remaining() < len {
            return Err(DecodeError::InsufficientData {
                path: path.to_string(),
                requested: len,
                remaining: self.remaining(),
            });
        }

        let value = match p {
            Primitive::U8 => PrimitiveValue::U8(read::read_u8(self.buffer, start).unwrap() as u8),
            Primitive::I8 => PrimitiveValue::I8(read::read_i8(self.buffer, start).unwrap()),
            Primitive::U16 => PrimitiveValue::U16(read::read_u16(self.buffer, start).unwrap()),
            Primitive::I16 => PrimitiveValue::I16(read::read_i16(self.buffer, start).unwrap()),
            Primitive::U32 => PrimitiveValue::U32(read::read_u32(self.buffer, start).unwrap()),
            Primitive::I32 => PrimitiveValue::I32(read::read_i32(self.buffer, start).unwrap()),
            Primitive::U64 => {
                PrimitiveValue::U64(thru_codec::BigInt::from(read::read_u64(self.buffer, start).unwrap()))
            }
            Primitive::I64 => {
                PrimitiveValue::I64(thru_codec::BigInt::from(read::read_i64(self.buffer, start).unwrap()))
            }
            Primitive::F16 => PrimitiveValue::F16Bits(read::read_f16_bits(self.buffer, start).unwrap()),
            Primitive::F32 => PrimitiveValue::F32(read::read_f32(self.buffer, start).unwrap()),
            Primitive::F64 => PrimitiveValue::F64(read::read_f64(self.buffer, start).unwrap()),
        };

        self.offset += len;
        Ok(DecodedValue {
            offset: start,
            length: len,
            raw_hex: hex::encode(&self.buffer[start..start + len]),
            type_name: None,
            kind: DecodedKind::Primitive { primitive: p, value },
        })
    }

    fn decode_struct(
        &mut self,
        def: &StructDef,
        budget: Option<usize>,
        path: &DecodePath,
    ) -> Result<DecodedValue, DecodeError> {
        let start = self.offset;

        // Trailing constant sizes, precomputed once per struct entry (spec
        // §4.4, §9: "Trailing constant sizes").
        let n = def.fields.len();
        let mut suffix: Vec<Option<usize>> = vec![Some(0); n + 1];
        for i in (0..n).rev() {
            let field_size = layout::const_size(self.registry, &def.fields[i].kind)?;
            suffix[i] = match (field_size, suffix[i + 1]) {
                (Some(s), Some(t)) => Some(s + t),
                _ => None,
            };
        }

        let previous_scope = self.scope.clone();
        let scope = ScopeNode::new(previous_scope.clone());
        self.scope = Some(scope.clone());

        let result = (|| -> Result<Vec<(String, DecodedValue)>, DecodeError> {
            let mut fields = Vec::with_capacity(n);
            for (i, field) in def.fields.iter().enumerate() {
                if !def.attributes.packed {
                    let field_align = layout::align(self.registry, &field.kind)?;
                    self.align_offset(field_align);
                }

                let consumed = self.offset - start;
                let field_budget = match suffix[i + 1] {
                    Some(trailing) => {
                        let available = match budget {
                            Some(b) => b.saturating_sub(consumed),
                            None => self.remaining(),
                        };
                        Some(available.saturating_sub(trailing))
                    }
                    None => None,
                };

                let field_path = path.field(&field.name);
                let decoded = self.decode_kind(&field.kind, field_budget, &field_path)?;
                scope.insert(field.name.clone(), decoded.clone());
                fields.push((field.name.clone(), decoded));
            }
            Ok(fields)
        })();

        // Restore the previous scope on exit, including on failure.
        self.scope = previous_scope;
        let fields = result?;

        let end = self.offset;
        Ok(DecodedValue {
            offset: start,
            length: end - start,
            raw_hex: hex::encode(&self.buffer[start..end]),
            type_name: None,
            kind: DecodedKind::Struct { fields },
        })
    }

    fn align_offset(&mut self, alignment: usize) {
        if alignment <= 1 {
            return;
        }
        let rem = self.offset % alignment;
        if rem != 0 {
            self.offset += alignment - rem;
        }
    }

    fn decode_array(&mut self, def: &ArrayDef, path: &DecodePath) -> Result<DecodedValue, DecodeError> {
        let start = self.offset;
        let length_value = expr::evaluate_with_registry(&def.size, self.registry, self.scope.as_ref(), path.as_str())?;

        let length = length_value.to_usize().ok_or_else(|| DecodeError::ArrayLengthOutOfRange {
            path: path.to_string(),
            length: length_value.to_string(),
        })?;

        if length > self.limits.max_array_length {
            return Err(DecodeError::ArrayLengthOutOfRange {
                path: path.to_string(),
                length: length_value.to_string(),
            });
        }

        let mut elements = Vec::with_capacity(length.min(1024));
        for i in 0..length {
            let element_path = path.index(i);
            // No budget is passed to array elements (spec §4.4: "array").
            let element = self.decode_kind(&def.element, None, &element_path)?;
            elements.push(element);
        }

        let end = self.offset;
        Ok(DecodedValue {
            offset: start,
            length: end - start,
            raw_hex: hex::encode(&self.buffer[start..end]),
            type_name: None,
            kind: DecodedKind::Array { elements },
        })
    }

    fn decode_enum(
        &mut self,
        def: &crate::document::EnumDef,
        budget: Option<usize>,
        path: &DecodePath,
    ) -> Result<DecodedValue, DecodeError> {
        let tag_value = expr::evaluate_with_registry(&def.tag, self.registry, self.scope.as_ref(), path.as_str())?;

        let variant = def
            .variants
            .iter()
            .find(|v| v.tag_value == tag_value)
            .ok_or_else(|| DecodeError::ExpressionFailure {
                path: path.to_string(),
                message: format!("no enum variant with tag value {tag_value}"),
            })?;

        let variant_path = path.variant(&variant.name);
        let inner = self.decode_kind(&variant.kind, budget, &variant_path)?;

        Ok(DecodedValue {
            offset: inner.offset,
            length: inner.length,
            raw_hex: inner.raw_hex.clone(),
            type_name: None,
            kind: DecodedKind::Enum {
                tag_value,
                variant_name: variant.name.clone(),
                inner: Some(Box::new(inner)),
            },
        })
    }

    /// Plain unions are never handed a byte budget, even when embedded as
    /// a non-final struct field with a known trailing constant size (spec
    /// §9, open question — documented choice in DESIGN.md).
    fn decode_union(
        &mut self,
        variants: &[crate::document::UnionVariant],
        path: &DecodePath,
    ) -> Result<DecodedValue, DecodeError> {
        let start = self.offset;
        let saved_scope = self.scope.clone();

        let mut attempts = Vec::with_capacity(variants.len());
        let mut max_len = 0usize;

        for variant in variants {
            let snapshot_offset = self.offset;
            let snapshot_scope = self.scope.clone();
            let variant_path = path.variant(&variant.name);

            log::trace!("union speculative attempt: {} at {}", variant.name, variant_path);

            match self.decode_kind(&variant.kind, None, &variant_path) {
                Ok(value) => {
                    max_len = max_len.max(value.length);
                    attempts.push(UnionAttempt {
                        variant_name: variant.name.clone(),
                        value,
                    });
                }
                Err(err) => {
                    attempts.push(UnionAttempt {
                        variant_name: variant.name.clone(),
                        value: DecodedValue::opaque(snapshot_offset, err.describe()),
                    });
                }
            }

            // Speculative decode always rolls back; the caller advances
            // explicitly once every variant has been attempted.
            self.offset = snapshot_offset;
            self.scope = snapshot_scope;
        }

        self.offset = start + max_len;
        self.scope = saved_scope;

        Ok(DecodedValue {
            offset: start,
            length: max_len,
            raw_hex: hex::encode(&self.buffer[start..start + max_len]),
            type_name: None,
            kind: DecodedKind::Union {
                variants: attempts,
                note: "ambiguous: a plain union is not self-describing; every variant interpretation is returned".to_string(),
            },
        })
    }

    fn decode_size_discriminated_union(
        &mut self,
        variants: &[crate::document::SizeDiscriminatedVariant],
        budget: Option<usize>,
        path: &DecodePath,
    ) -> Result<DecodedValue, DecodeError> {
        let start = self.offset;
        let mut failures = Vec::new();
        let mut matches: Vec<(&crate::document::SizeDiscriminatedVariant, DecodedValue)> = Vec::new();

        for variant in variants {
            if let Some(b) = budget {
                if variant.expected_size > b {
                    failures.push((variant.name.clone(), "expected size exceeds available byte budget".to_string()));
                    continue;
                }
            }

            let window_end = start + variant.expected_size;
            if window_end > self.buffer.len() {
                failures.push((variant.name.clone(), "insufficient data for expected size".to_string()));
                continue;
            }

            let saved_window = self.window_end;
            let saved_scope = self.scope.clone();
            self.window_end = Some(window_end.min(self.limit()));

            let variant_path = path.variant(&variant.name);
            let outcome = self.decode_kind(&variant.kind, Some(variant.expected_size), &variant_path);
            let consumed = self.offset - start;

            self.offset = start;
            self.window_end = saved_window;
            self.scope = saved_scope;

            match outcome {
                Ok(value) if consumed == variant.expected_size => {
                    matches.push((variant, value));
                }
                Ok(_) => failures.push((
                    variant.name.clone(),
                    format!("consumed {consumed} bytes, expected exactly {}", variant.expected_size),
                )),
                Err(err) => failures.push((variant.name.clone(), err.describe())),
            }
        }

        let winner = match matches.len() {
            0 => {
                return Err(DecodeError::NoUnionMatch {
                    path: path.to_string(),
                    attempts: failures,
                })
            }
            1 => matches.into_iter().next().unwrap(),
            _ => {
                let winners: Vec<String> = matches.iter().map(|(v, _)| v.name.clone()).collect();
                // When no explicit budget was handed down (e.g. this union is
                // the root type), fall back to the bytes actually available
                // from `start` — the tie-break still picks the one variant
                // whose expected-size matches exactly (spec §8, scenario 4).
                let effective_budget = budget.unwrap_or_else(|| self.remaining());
                let exact: Vec<_> = matches
                    .into_iter()
                    .filter(|(v, _)| v.expected_size == effective_budget)
                    .collect();
                if exact.len() == 1 {
                    exact.into_iter().next().unwrap()
                } else {
                    return Err(DecodeError::MultipleUnionMatch {
                        path: path.to_string(),
                        winners,
                    });
                }
            }
        };

        let (variant, inner) = winner;
        self.offset = start + variant.expected_size;

        Ok(DecodedValue {
            offset: start,
            length: variant.expected_size,
            raw_hex: hex::encode(&self.buffer[start..start + variant.expected_size]),
            type_name: None,
            kind: DecodedKind::SizeDiscriminatedUnion {
                variant_name: variant.name.clone(),
                expected_size: variant.expected_size,
                inner: Box::new(inner),
            },
        })
    }
}
