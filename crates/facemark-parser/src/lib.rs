//! Entity graph parser for STEP (ISO 10303-21) text.
//!
//! The parser never rewrites the input. Records are located as byte spans,
//! tokenized with nom, and assembled into an [`EntityGraph`] whose every
//! field knows where it came from. Continuation lines are tokenized as part of
//! their record while their original line breaks stay recorded on the entity.
//!
//! # Example
//!
//! ```ignore
//! use facemark_parser::parse_document;
//!
//! let graph = parse_document(&text)?;
//! for shell in graph.find_by_type("CLOSED_SHELL") {
//!     println!("#{} has {} references", shell.id, graph.references(shell.id).len());
//! }
//! ```

mod graph;
mod lexer;
mod p21;

pub use graph::{Entity, EntityGraph, NameSpans};
pub use lexer::{split_records, RawRecord};
pub use p21::{decode_string, encode_string, Field, FieldKind, InstancePart};

use facemark_core::ParseError;
use rayon::prelude::*;

use p21::RecordParser;

/// Parse STEP text into a fully resolved entity graph.
///
/// Records are tokenized in parallel; the first failing record in document
/// order determines the error.
pub fn parse_document(text: &str) -> Result<EntityGraph, ParseError> {
    let records = split_records(text)?;
    tracing::debug!(records = records.len(), bytes = text.len(), "split DATA records");

    let parsed: Vec<_> = records
        .par_iter()
        .map(|record| {
            RecordParser::new(text, record)
                .parse()
                .map(|parsed| Entity::from_parsed(text, record, parsed))
        })
        .collect();

    let entities = parsed.into_iter().collect::<Result<Vec<_>, _>>()?;
    let graph = EntityGraph::build(entities)?;
    tracing::debug!(entities = graph.len(), "built entity graph");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_error_in_document_order() {
        let doc = "DATA;\n#1=A(1);\n#2=B(1 2);\n#3=C(3 4);\nENDSEC;\n";
        match parse_document(doc) {
            Err(ParseError::UnexpectedToken { offset, .. }) => {
                assert!(offset > 15 && offset < 25, "offset {offset} is not in #2");
            }
            other => panic!("expected a token error, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn name_literals_round_trip(name in "[ -~]{0,24}") {
            let literal = encode_string(&name);
            let doc = format!("DATA;\n#1=ADVANCED_FACE({literal},(),$,.T.);\nENDSEC;\n");
            let graph = parse_document(&doc).unwrap();
            let entity = graph.get(1).unwrap();
            prop_assert_eq!(entity.name(), Some(name.as_str()));
            prop_assert_eq!(entity.name_span().and_then(|s| s.slice(&doc)), Some(literal.as_str()));
        }
    }
}
