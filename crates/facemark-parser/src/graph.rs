//! Entity graph construction and reference indexing.

use std::collections::HashMap;

use indexmap::IndexMap;
use smallvec::SmallVec;

use facemark_core::{EntityId, ParseError, Span};

use crate::lexer::RawRecord;
use crate::p21::{Field, InstancePart, ParsedRecord};

/// A STEP entity instance with its position in the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Type of the first (or only) instance part, upper-cased.
    pub type_name: String,
    /// Fields of the first instance part.
    pub fields: Vec<Field>,
    /// Every part of a complex instance; empty for simple instances.
    pub complex_parts: Vec<InstancePart>,
    /// From the leading `#` through the terminating `;`.
    pub span: Span,
    /// Whether the record has lines that begin with whitespace.
    pub continuation: bool,
    /// Offsets of the layout line breaks inside the record, outside string literals.
    pub line_breaks: Vec<usize>,
}

impl Entity {
    pub(crate) fn from_parsed(text: &str, record: &RawRecord, parsed: ParsedRecord) -> Self {
        let ParsedRecord {
            id,
            mut parts,
            complex,
        } = parsed;
        let (type_name, fields, complex_parts) = if complex {
            let first = parts
                .first()
                .map(|p| (p.type_name.clone(), p.fields.clone()))
                .unwrap_or_default();
            (first.0, first.1, parts)
        } else {
            let part = parts.pop().unwrap_or(InstancePart {
                type_name: String::new(),
                fields: Vec::new(),
            });
            (part.type_name, part.fields, Vec::new())
        };
        Self {
            id,
            type_name,
            fields,
            complex_parts,
            span: record.span,
            continuation: record.is_continued(text),
            line_breaks: record.line_breaks.clone(),
        }
    }

    pub fn is_complex(&self) -> bool {
        !self.complex_parts.is_empty()
    }

    /// Whether this entity is of `type_name`, including any complex part.
    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name.eq_ignore_ascii_case(type_name)
            || self
                .complex_parts
                .iter()
                .any(|p| p.type_name.eq_ignore_ascii_case(type_name))
    }

    /// The entity's name: its first field, when that field is a string.
    pub fn name(&self) -> Option<&str> {
        if self.is_complex() {
            return None;
        }
        self.fields.first().and_then(Field::as_str)
    }

    /// Span of the quoted name literal, quotes included.
    pub fn name_span(&self) -> Option<Span> {
        self.name().and(self.fields.first().map(|f| f.span))
    }

    /// Every reference in field order, with the span of each `#n` token.
    pub fn references(&self) -> Vec<(EntityId, Span)> {
        let mut out = Vec::new();
        if self.is_complex() {
            for part in &self.complex_parts {
                for field in &part.fields {
                    field.collect_references(&mut out);
                }
            }
        } else {
            for field in &self.fields {
                field.collect_references(&mut out);
            }
        }
        out
    }

    /// The record text with layout breaks collapsed to single spaces.
    /// Newlines inside string literals are kept.
    pub fn joined(&self, text: &str) -> String {
        let Some(raw) = self.span.slice(text) else {
            return String::new();
        };
        if self.line_breaks.is_empty() {
            return raw.to_string();
        }
        let mut out = String::with_capacity(raw.len());
        let mut cursor = self.span.start;
        for (n, &at) in self.line_breaks.iter().enumerate() {
            let line = &text[cursor..at];
            let line = if n == 0 { line } else { line.trim_start() };
            out.push_str(line.trim_end_matches('\r'));
            out.push(' ');
            cursor = at + 1;
        }
        out.push_str(text[cursor..self.span.end].trim_start());
        out
    }
}

/// Name literal span per entity id.
pub type NameSpans = IndexMap<EntityId, Span>;

/// All entities of a document, in document order, with reference indexes.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    entities: IndexMap<EntityId, Entity>,
    references: HashMap<EntityId, SmallVec<[EntityId; 4]>>,
    referrers: HashMap<EntityId, SmallVec<[EntityId; 4]>>,
}

impl EntityGraph {
    /// Build a graph, validating id uniqueness and referential closure.
    pub fn build(entities: Vec<Entity>) -> Result<Self, ParseError> {
        let mut by_id: IndexMap<EntityId, Entity> = IndexMap::with_capacity(entities.len());
        for entity in entities {
            if let Some(existing) = by_id.get(&entity.id) {
                return Err(ParseError::DuplicateId {
                    id: entity.id,
                    first: existing.span,
                    second: entity.span,
                });
            }
            by_id.insert(entity.id, entity);
        }

        let mut references: HashMap<EntityId, SmallVec<[EntityId; 4]>> = HashMap::new();
        let mut referrers: HashMap<EntityId, SmallVec<[EntityId; 4]>> = HashMap::new();
        for entity in by_id.values() {
            let mut targets: SmallVec<[EntityId; 4]> = SmallVec::new();
            for (target, span) in entity.references() {
                if !by_id.contains_key(&target) {
                    return Err(ParseError::UnresolvedReference {
                        from: entity.id,
                        to: target,
                        span,
                    });
                }
                if !targets.contains(&target) {
                    targets.push(target);
                    referrers.entry(target).or_default().push(entity.id);
                }
            }
            if !targets.is_empty() {
                references.insert(entity.id, targets);
            }
        }

        Ok(Self {
            entities: by_id,
            references,
            referrers,
        })
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities of a given type, in document order.
    pub fn find_by_type<'g>(&'g self, type_name: &'g str) -> impl Iterator<Item = &'g Entity> + 'g {
        self.entities.values().filter(move |e| e.is_a(type_name))
    }

    /// Ids this entity references, in first-occurrence order.
    pub fn references(&self, id: EntityId) -> &[EntityId] {
        self.references.get(&id).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Ids of the entities that reference this one, in document order.
    pub fn referrers(&self, id: EntityId) -> &[EntityId] {
        self.referrers.get(&id).map(|r| r.as_slice()).unwrap_or(&[])
    }

    /// Name literal spans of every entity that has one.
    pub fn name_spans(&self) -> NameSpans {
        self.entities
            .values()
            .filter_map(|e| e.name_span().map(|span| (e.id, span)))
            .collect()
    }
}
