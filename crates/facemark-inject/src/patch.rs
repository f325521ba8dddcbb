//! Planning and applying name-literal patches.

use facemark_core::{EntityId, InjectionError, LabelAssignment, LabelPatch, Span};
use facemark_parser::{decode_string, encode_string, NameSpans};

/// Turn an assignment into patches sorted by position.
///
/// Every label must have a name span inside `raw`, and no two spans may
/// overlap. Labels equal to the literal already present produce no patch, so
/// re-labeling a labeled file leaves it byte-identical.
pub fn plan_patches(
    raw: &str,
    labels: &LabelAssignment,
    spans: &NameSpans,
) -> Result<Vec<LabelPatch>, InjectionError> {
    let mut patches = Vec::with_capacity(labels.len());
    for (entity_id, label) in labels.iter() {
        let span = *spans
            .get(&entity_id)
            .ok_or(InjectionError::MissingNameSpan { entity_id })?;
        let current = literal_body(raw, entity_id, span)?;
        if decode_string(current) == label {
            continue;
        }
        patches.push(LabelPatch {
            entity_id,
            span,
            new_label: label.to_string(),
        });
    }

    patches.sort_by_key(|p| p.span);
    for pair in patches.windows(2) {
        if pair[0].span.overlaps(&pair[1].span) {
            return Err(InjectionError::Overlap {
                first: pair[0].entity_id,
                first_span: pair[0].span,
                second: pair[1].entity_id,
                second_span: pair[1].span,
            });
        }
    }
    Ok(patches)
}

/// The text between the quotes of a name literal.
fn literal_body(raw: &str, entity_id: EntityId, span: Span) -> Result<&str, InjectionError> {
    let literal = span
        .slice(raw)
        .ok_or(InjectionError::SpanOutOfBounds { entity_id, span })?;
    literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .filter(|_| literal.len() >= 2)
        .ok_or(InjectionError::MissingNameSpan { entity_id })
}

/// Apply sorted, non-overlapping patches in one pass over `raw`.
///
/// Bytes outside the patched spans are copied unchanged. A patch that starts
/// before the previous one ends is reported as an overlap, and a span that
/// does not address `raw` as out of bounds; `raw` is never partially patched.
pub fn apply_patches(raw: &str, patches: &[LabelPatch]) -> Result<String, InjectionError> {
    let grow: usize = patches.iter().map(|p| p.new_label.len() + 2).sum();
    let mut out = String::with_capacity(raw.len() + grow);
    let mut cursor = 0;
    let mut previous: Option<&LabelPatch> = None;
    for patch in patches {
        if let Some(prev) = previous.filter(|prev| patch.span.start < prev.span.end) {
            return Err(InjectionError::Overlap {
                first: prev.entity_id,
                first_span: prev.span,
                second: patch.entity_id,
                second_span: patch.span,
            });
        }
        let (Some(before), Some(_)) = (raw.get(cursor..patch.span.start), patch.span.slice(raw))
        else {
            return Err(InjectionError::SpanOutOfBounds {
                entity_id: patch.entity_id,
                span: patch.span,
            });
        };
        out.push_str(before);
        out.push_str(&encode_string(&patch.new_label));
        cursor = patch.span.end;
        previous = Some(patch);
    }
    out.push_str(&raw[cursor..]);
    Ok(out)
}

/// Patch every assigned label into `raw`, all or nothing.
pub fn inject(
    raw: &str,
    labels: &LabelAssignment,
    spans: &NameSpans,
) -> Result<String, InjectionError> {
    let patches = plan_patches(raw, labels, spans)?;
    tracing::debug!(
        labels = labels.len(),
        patches = patches.len(),
        unchanged = labels.len() - patches.len(),
        "injecting labels"
    );
    apply_patches(raw, &patches)
}
