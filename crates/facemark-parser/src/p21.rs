//! Part 21 (ISO 10303-21) record grammar.
//!
//! Parses one `#id = TYPE(...);` record with nom combinators. Every field
//! carries the absolute byte span it was read from, so later stages can
//! address the original text without re-scanning it.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, digit1, multispace1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use facemark_core::{EntityId, ParseError, Span};

use crate::lexer::{snippet, RawRecord};

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Integer literal such as `42` or `-3`.
    Integer(i64),
    /// Real literal; Part 21 requires the decimal point (`1.`, `-2.5E-3`).
    Real(f64),
    /// Decoded string contents; the field span covers the quotes.
    String(String),
    /// Hex digits of a binary literal, without the quotes.
    Binary(String),
    /// Instance reference `#id`.
    Reference(EntityId),
    /// Enumeration value without the dots (`.T.` → `T`).
    Enum(String),
    /// Parenthesized aggregate; items keep their own spans.
    List(Vec<Field>),
    /// `$`
    Omitted,
    /// `*`
    Derived,
    /// `TYPE_NAME(...)` inside a parameter list.
    Typed { type_name: String, fields: Vec<Field> },
}

/// A parameter value together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub kind: FieldKind,
    pub span: Span,
}

impl Field {
    /// The decoded text of a string field.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// The target of a `#id` field.
    pub fn as_reference(&self) -> Option<EntityId> {
        match self.kind {
            FieldKind::Reference(id) => Some(id),
            _ => None,
        }
    }

    /// The items of an aggregate field.
    pub fn as_list(&self) -> Option<&[Field]> {
        match &self.kind {
            FieldKind::List(items) => Some(items),
            _ => None,
        }
    }

    /// A numeric field as `f64`; integers are widened.
    pub fn as_real(&self) -> Option<f64> {
        match self.kind {
            FieldKind::Real(v) => Some(v),
            FieldKind::Integer(v) => Some(v as f64),
            _ => None,
        }
    }

    /// Append every entity reference in this field, depth first.
    pub fn collect_references(&self, out: &mut Vec<(EntityId, Span)>) {
        match &self.kind {
            FieldKind::Reference(id) => out.push((*id, self.span)),
            FieldKind::List(items) | FieldKind::Typed { fields: items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            _ => {}
        }
    }
}

/// One `TYPE(fields)` part of an entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancePart {
    pub type_name: String,
    pub fields: Vec<Field>,
}

/// The tokenized form of one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    pub id: EntityId,
    /// One part for simple instances, several for `#id=(A(..)B(..));`.
    pub parts: Vec<InstancePart>,
    pub complex: bool,
}

/// Whitespace and comments.
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), tuple((tag("/*"), take_until("*/"), tag("*/")))),
        ))),
    )(input)
}

fn entity_id(input: &str) -> IResult<&str, EntityId> {
    preceded(char('#'), map_res(digit1, str::parse::<EntityId>))(input)
}

/// Entity or type keyword; `!` marks user-defined keywords.
fn keyword(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(char('!')),
        take_while1(|c: char| c.is_ascii_alphabetic()),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    )))(input)
}

fn enumeration(input: &str) -> IResult<&str, String> {
    delimited(
        char('.'),
        map(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            String::from,
        ),
        char('.'),
    )(input)
}

fn number(input: &str) -> IResult<&str, FieldKind> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), opt(digit1))),
        opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
    )))(input)?;
    let is_real = text.contains(['.', 'e', 'E']);
    let parsed = if is_real {
        text.parse::<f64>().ok().map(FieldKind::Real)
    } else {
        text.parse::<i64>().ok().map(FieldKind::Integer)
    };
    match parsed {
        Some(kind) => Ok((rest, kind)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        ))),
    }
}

fn binary(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(take_while(|c: char| c.is_ascii_hexdigit()), String::from),
        char('"'),
    )(input)
}

/// Recognize a quoted string literal, returning the raw text between quotes.
fn raw_string(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('\'')(input)?;
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Ok((&body[i + 1..], &body[..i]));
        }
        i += 1;
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

/// Parser for one record, producing spans relative to the whole document.
pub struct RecordParser<'a> {
    source: &'a str,
    base: usize,
}

impl<'a> RecordParser<'a> {
    pub fn new(text: &'a str, record: &RawRecord) -> Self {
        Self {
            source: &text[record.span.start..record.span.end],
            base: record.span.start,
        }
    }

    fn offset(&self, rest: &str) -> usize {
        self.base + (self.source.len() - rest.len())
    }

    fn field(&self, input: &'a str) -> IResult<&'a str, Field> {
        let (input, _) = ws(input)?;
        let start = self.offset(input);
        let (rest, kind) = alt((
            value(FieldKind::Omitted, char('$')),
            value(FieldKind::Derived, char('*')),
            map(entity_id, FieldKind::Reference),
            map(enumeration, FieldKind::Enum),
            map(raw_string, |raw| FieldKind::String(decode_string(raw))),
            map(binary, FieldKind::Binary),
            |i: &'a str| self.typed(i),
            number,
            map(|i: &'a str| self.list(i), FieldKind::List),
        ))(input)?;
        let span = Span::new(start, self.offset(rest));
        Ok((rest, Field { kind, span }))
    }

    fn typed(&self, input: &'a str) -> IResult<&'a str, FieldKind> {
        let (input, type_name) = keyword(input)?;
        let (input, _) = ws(input)?;
        let (input, fields) = self.list(input)?;
        Ok((
            input,
            FieldKind::Typed {
                type_name: type_name.to_ascii_uppercase(),
                fields,
            },
        ))
    }

    fn list(&self, input: &'a str) -> IResult<&'a str, Vec<Field>> {
        delimited(
            char('('),
            separated_list0(tuple((ws, char(','))), |i: &'a str| self.field(i)),
            pair(ws, char(')')),
        )(input)
    }

    fn part(&self, input: &'a str) -> IResult<&'a str, InstancePart> {
        let (input, _) = ws(input)?;
        let (input, type_name) = keyword(input)?;
        let (input, _) = ws(input)?;
        let (input, fields) = self.list(input)?;
        Ok((
            input,
            InstancePart {
                type_name: type_name.to_ascii_uppercase(),
                fields,
            },
        ))
    }

    fn instance(&self, input: &'a str) -> IResult<&'a str, ParsedRecord> {
        let (input, _) = ws(input)?;
        let (input, id) = entity_id(input)?;
        let (input, _) = tuple((ws, char('='), ws))(input)?;
        let (input, (parts, complex)) = alt((
            map(
                delimited(char('('), many1(|i: &'a str| self.part(i)), pair(ws, char(')'))),
                |parts| (parts, true),
            ),
            map(|i: &'a str| self.part(i), |part| (vec![part], false)),
        ))(input)?;
        let (input, _) = tuple((ws, char(';'), ws))(input)?;
        Ok((input, ParsedRecord { id, parts, complex }))
    }

    /// Parse the whole record, failing if anything is left over.
    pub fn parse(&self) -> Result<ParsedRecord, ParseError> {
        match self.instance(self.source) {
            Ok(("", record)) => Ok(record),
            Ok((rest, _)) => Err(self.unexpected(rest, "end of record")),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                Err(self.unexpected(e.input, e.code.description()))
            }
            Err(nom::Err::Incomplete(_)) => Err(self.unexpected("", "more input")),
        }
    }

    fn unexpected(&self, rest: &str, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            offset: self.offset(rest),
            expected: expected.to_string(),
            found: snippet(rest),
        }
    }
}

/// Decode a string literal body: `''`, `\\`, `\X\HH`, `\X2\...\X0\`, `\X4\...\X0\`.
///
/// Unknown or malformed escapes are kept verbatim.
pub fn decode_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(c) = rest.chars().next() {
        if c == '\'' && rest.starts_with("''") {
            out.push('\'');
            rest = &rest[2..];
        } else if c == '\\' {
            let (decoded, consumed) = decode_escape(rest);
            out.push_str(&decoded);
            rest = &rest[consumed..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

/// Decode one escape at the start of `s`; returns the text and bytes consumed.
fn decode_escape(s: &str) -> (String, usize) {
    if s.starts_with("\\\\") {
        return ("\\".to_string(), 2);
    }
    if let Some(hex) = s.strip_prefix("\\X\\") {
        if let Some(byte) = hex.get(..2).and_then(|h| u8::from_str_radix(h, 16).ok()) {
            return ((byte as char).to_string(), 5);
        }
    }
    for (prefix, width) in [("\\X2\\", 4), ("\\X4\\", 8)] {
        if let Some(body) = s.strip_prefix(prefix) {
            if let Some(end) = body.find("\\X0\\") {
                if let Some(text) = decode_wide(&body[..end], width) {
                    return (text, prefix.len() + end + 4);
                }
            }
        }
    }
    ("\\".to_string(), 1)
}

fn decode_wide(hex: &str, width: usize) -> Option<String> {
    if hex.len() % width != 0 || !hex.is_ascii() {
        return None;
    }
    let units: Option<Vec<u32>> = (0..hex.len())
        .step_by(width)
        .map(|i| u32::from_str_radix(&hex[i..i + width], 16).ok())
        .collect();
    let units = units?;
    if width == 4 {
        let utf16: Vec<u16> = units.into_iter().map(|u| u as u16).collect();
        String::from_utf16(&utf16).ok()
    } else {
        units.into_iter().map(char::from_u32).collect()
    }
}

/// Encode text as a quoted STEP string literal.
///
/// ASCII passes through (with `'` and `\` doubled); anything else is written
/// as a `\X2\...\X0\` run of UTF-16 code units.
pub fn encode_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    let mut wide: Vec<u16> = Vec::new();
    for c in text.chars() {
        if c.is_ascii() && !c.is_ascii_control() {
            flush_wide(&mut out, &mut wide);
            match c {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(c),
            }
        } else {
            let mut buf = [0u16; 2];
            wide.extend_from_slice(c.encode_utf16(&mut buf));
        }
    }
    flush_wide(&mut out, &mut wide);
    out.push('\'');
    out
}

fn flush_wide(out: &mut String, wide: &mut Vec<u16>) {
    if wide.is_empty() {
        return;
    }
    out.push_str("\\X2\\");
    for unit in wide.drain(..) {
        out.push_str(&format!("{unit:04X}"));
    }
    out.push_str("\\X0\\");
}
