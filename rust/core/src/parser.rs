// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization of entity instances and a fast scanner that finds
//! entity boundaries without tokenizing them.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{alpha1, char, digit1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal: 'text' (escapes left as written)
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Real: 3.14, 0., 1.E-5
    Float(f64),
    /// Enumeration: .MILLI., .T.
    Enum(&'a str),
    /// Aggregate: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCLENGTHMEASURE(0.3048)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Unset: $
    Null,
    /// Derived: *
    Derived,
}

/// Block comment: /* ... */
fn comment(input: &str) -> IResult<&str, &str> {
    delimited(tag("/*"), take_until("*/"), tag("*/"))(input)
}

/// Skip whitespace and comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((take_while1(|c: char| c.is_whitespace()), comment))),
    )(input)
}

/// Entity or type keyword: IFCWALL, IFCLENGTHMEASURE
fn keyword(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alpha1,
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn entity_id(input: &str) -> IResult<&str, u32> {
    preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>()))(input)
}

fn entity_ref(input: &str) -> IResult<&str, Token<'_>> {
    map(entity_id, Token::EntityRef)(input)
}

/// Body of a quoted string; a doubled quote is an escaped quote
fn quoted_body(input: &str, quote: char) -> IResult<&str, &str> {
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == quote {
            if matches!(chars.peek(), Some((_, next)) if *next == quote) {
                chars.next();
                continue;
            }
            return Ok((&input[i..], &input[..i]));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn string_literal(input: &str) -> IResult<&str, Token<'_>> {
    map(
        alt((
            delimited(char('\''), |i| quoted_body(i, '\''), char('\'')),
            delimited(char('"'), |i| quoted_body(i, '"'), char('"')),
        )),
        Token::String,
    )(input)
}

/// Real number; STEP allows a bare trailing point ("0.")
fn float(input: &str) -> IResult<&str, Token<'_>> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

fn integer(input: &str) -> IResult<&str, Token<'_>> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

fn enum_value(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn typed_value(input: &str) -> IResult<&str, Token<'_>> {
    map(pair(keyword, arguments), |(name, args)| {
        Token::TypedValue(name, args)
    })(input)
}

fn list(input: &str) -> IResult<&str, Token<'_>> {
    map(arguments, Token::List)(input)
}

/// Parenthesized, comma separated tokens
fn arguments(input: &str) -> IResult<&str, Vec<Token<'_>>> {
    delimited(
        pair(char('('), ws),
        separated_list0(char(','), token),
        pair(ws, char(')')),
    )(input)
}

/// A single token with surrounding whitespace
fn token(input: &str) -> IResult<&str, Token<'_>> {
    delimited(
        ws,
        alt((
            float, // before integer: both start with digits
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            value(Token::Null, char('$')),
            value(Token::Derived, char('*')),
        )),
        ws,
    )(input)
}

/// Parse a complete entity instance
///
/// `#123=IFCWALL('guid',#2,$,$,'name',$,$,$);` yields
/// `(123, "IFCWALL", [String, EntityRef, Null, ...])`.
pub fn parse_entity(input: &str) -> Result<(u32, &str, Vec<Token<'_>>)> {
    let parsed: IResult<&str, (u32, &str, Vec<Token<'_>>)> = tuple((
        delimited(ws, entity_id, ws),
        preceded(char('='), delimited(ws, keyword, ws)),
        terminated(arguments, pair(ws, char(';'))),
    ))(input);

    match parsed {
        Ok((_, entity)) => Ok(entity),
        Err(e) => Err(Error::parse(
            0,
            format!(
                "Failed to parse entity {:?}: {}",
                &input[..input.len().min(80)],
                e
            ),
        )),
    }
}

/// Location of one entity instance in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHeader<'a> {
    pub id: u32,
    /// Type keyword as written in the file (usually upper case)
    pub type_name: &'a str,
    /// Byte offset of the leading '#'
    pub start: usize,
    /// Byte offset one past the terminating ';'
    pub end: usize,
}

/// Fast entity scanner - finds entity boundaries without tokenizing
///
/// Semicolons inside string literals do not terminate an entity, and
/// instances inside `/* ... */` comments are not entities.
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a new scanner
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
        }
    }

    /// Scan for the next entity
    pub fn next_entity(&mut self) -> Option<EntityHeader<'a>> {
        let bytes = self.content.as_bytes();
        let len = bytes.len();

        loop {
            let start = next_hash(bytes, self.position)?;
            let mut pos = start + 1;

            let id_start = pos;
            while pos < len && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let id_end = pos;
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            // Not an instance definition ('#' inside a header string, say)
            if id_end == id_start || pos >= len || bytes[pos] != b'=' {
                self.position = start + 1;
                continue;
            }
            let id = match self.content[id_start..id_end].parse::<u32>() {
                Ok(id) => id,
                Err(_) => {
                    self.position = id_end;
                    continue;
                }
            };

            pos += 1;
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let type_start = pos;
            while pos < len && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let type_name = &self.content[type_start..pos];

            let end = find_terminator(bytes, pos)?;
            self.position = end;

            return Some(EntityHeader {
                id,
                type_name,
                start,
                end,
            });
        }
    }

    /// Find all entities of a specific type (case-insensitive)
    pub fn find_by_type(&mut self, target_type: &str) -> Vec<EntityHeader<'a>> {
        let mut results = Vec::new();
        while let Some(header) = self.next_entity() {
            if header.type_name.eq_ignore_ascii_case(target_type) {
                results.push(header);
            }
        }
        results
    }

    /// Count entities by type
    pub fn count_by_type(&mut self) -> rustc_hash::FxHashMap<&'a str, usize> {
        let mut counts = rustc_hash::FxHashMap::default();
        while let Some(header) = self.next_entity() {
            *counts.entry(header.type_name).or_insert(0) += 1;
        }
        counts
    }

    /// Reset scanner to beginning
    pub fn reset(&mut self) {
        self.position = 0;
    }
}

impl<'a> Iterator for EntityScanner<'a> {
    type Item = EntityHeader<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entity()
    }
}

/// Offset one past the `*/` closing a comment opened at `at`, if `at`
/// starts one
fn skip_comment(bytes: &[u8], at: usize) -> Option<Option<usize>> {
    if bytes.get(at + 1) != Some(&b'*') {
        return None;
    }
    Some(memchr::memmem::find(&bytes[at + 2..], b"*/").map(|offset| at + 2 + offset + 2))
}

/// Offset of the next '#' outside string literals and comments
fn next_hash(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    while let Some(offset) = memchr::memchr3(b'#', b'\'', b'/', &bytes[pos..]) {
        let at = pos + offset;
        pos = match bytes[at] {
            b'#' => return Some(at),
            // Doubled quotes read as two adjacent literals
            b'\'' => at + 1 + memchr::memchr(b'\'', &bytes[at + 1..])? + 1,
            _ => match skip_comment(bytes, at) {
                Some(end) => end?,
                None => at + 1,
            },
        };
    }
    None
}

/// Offset one past the first ';' outside string literals and comments
fn find_terminator(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    let mut in_string = false;
    while let Some(offset) = memchr::memchr3(b'\'', b';', b'/', &bytes[pos..]) {
        let at = pos + offset;
        match bytes[at] {
            // A doubled quote toggles twice, leaving the state unchanged
            b'\'' => in_string = !in_string,
            b';' if !in_string => return Some(at + 1),
            b'/' if !in_string => {
                if let Some(end) = skip_comment(bytes, at) {
                    pos = end?;
                    continue;
                }
            }
            _ => {}
        }
        pos = at + 1;
    }
    None
}
