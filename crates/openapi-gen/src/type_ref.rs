/*!
Type expressions.

Model fields, endpoint parameters and responses name their types with Rust
type syntax (`Vec<Option<app::model::User>>`, `HashMap<String, i64>`,
`Page<T>`). This module parses those strings into [`TypeRef`] trees; the
canonical `Display` form of a resolved tree is the type identity used for
caching and de-duplication.
*/

use crate::error::TypeSyntaxError;
use std::fmt;
use std::str::FromStr;

/// Parsed type expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// `a::b::Name<Args..>`
    Path { name: String, args: Vec<TypeRef> },
    /// `[T]`
    Slice(Box<TypeRef>),
    /// `(A, B)`; the empty tuple is the unit type
    Tuple(Vec<TypeRef>),
    /// `fn(..) -> R`, `Fn(..)`, `FnMut(..)`, `FnOnce(..)`
    Function(String),
}

const FUNCTION_KEYWORDS: &[&str] = &["fn", "Fn", "FnMut", "FnOnce"];

/// Deepest nesting of type arguments accepted by the parser and the generator
pub const MAX_TYPE_DEPTH: usize = 32;

impl TypeRef {
    /// Plain path without generic arguments
    pub fn named(name: &str) -> Self {
        Self::Path {
            name: name.to_string(),
            args: Vec::new(),
        }
    }


    /// Parse a type expression
    pub fn parse(input: &str) -> Result<Self, TypeSyntaxError> {
        let mut parser = Parser::new(input);
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }

    /// Last path segment (`User` for `app::model::User`)
    pub fn last_segment(&self) -> Option<&str> {
        match self {
            Self::Path { name, .. } => name.rsplit("::").next(),
            _ => None,
        }
    }

    /// Generic arguments of a path
    pub fn args(&self) -> &[TypeRef] {
        match self {
            Self::Path { args, .. } => args,
            _ => &[],
        }
    }

    /// `Option<T>`, matched on the last segment
    pub fn is_option(&self) -> bool {
        self.last_segment() == Some("Option") && self.args().len() == 1
    }

    /// `()`
    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Tuple(items) if items.is_empty())
    }

    /// Nesting depth; a type without arguments has depth 1
    pub fn depth(&self) -> usize {
        let children = match self {
            Self::Path { args, .. } => args.iter().map(TypeRef::depth).max(),
            Self::Slice(inner) => Some(inner.depth()),
            Self::Tuple(items) => items.iter().map(TypeRef::depth).max(),
            Self::Function(_) => None,
        };
        1 + children.unwrap_or(0)
    }

    /// Whether `other` occurs in this tree, this node included
    pub fn contains(&self, other: &TypeRef) -> bool {
        if self == other {
            return true;
        }
        match self {
            Self::Path { args, .. } => args.iter().any(|arg| arg.contains(other)),
            Self::Slice(inner) => inner.contains(other),
            Self::Tuple(items) => items.iter().any(|item| item.contains(other)),
            Self::Function(_) => false,
        }
    }

    /// Same path as `outer` with every argument of `outer` nested inside the
    /// matching argument here, and at least one of them wrapped further.
    pub fn wraps_arguments_of(&self, outer: &TypeRef) -> bool {
        match (self, outer) {
            (
                Self::Path { name, args },
                Self::Path {
                    name: outer_name,
                    args: outer_args,
                },
            ) => {
                name == outer_name
                    && !args.is_empty()
                    && args.len() == outer_args.len()
                    && self != outer
                    && args.iter().zip(outer_args).all(|(arg, outer)| arg.contains(outer))
            }
            _ => false,
        }
    }

    /// Replace bare single-segment paths found in `bindings` (generic
    /// parameters) by their bound type.
    pub fn substitute(&self, bindings: &[(String, TypeRef)]) -> TypeRef {
        match self {
            Self::Path { name, args } if args.is_empty() => bindings
                .iter()
                .find(|(param, _)| param == name)
                .map(|(_, bound)| bound.clone())
                .unwrap_or_else(|| self.clone()),
            Self::Path { name, args } => Self::Path {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Self::Slice(inner) => Self::Slice(Box::new(inner.substitute(bindings))),
            Self::Tuple(items) => Self::Tuple(items.iter().map(|i| i.substitute(bindings)).collect()),
            Self::Function(_) => self.clone(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Self::Slice(inner) => write!(f, "[{}]", inner),
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            Self::Function(signature) => f.write_str(signature),
        }
    }
}

impl FromStr for TypeRef {
    type Err = TypeSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: &str) -> TypeSyntaxError {
        TypeSyntaxError {
            input: self.src.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, expected: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(expected) {
            self.pos += expected.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let mut end = 0;
        for (i, c) in rest.char_indices() {
            let valid = if i == 0 {
                c.is_alphabetic() || c == '_'
            } else {
                c.is_alphanumeric() || c == '_'
            };
            if !valid {
                break;
            }
            end = i + c.len_utf8();
        }
        if end == 0 {
            return None;
        }
        self.pos += end;
        Some(&rest[..end])
    }

    fn lifetime(&mut self) -> Result<(), TypeSyntaxError> {
        // caller saw the leading quote
        self.pos += 1;
        self.ident()
            .map(|_| ())
            .ok_or_else(|| self.error("expected lifetime name"))
    }

    fn parse_type(&mut self) -> Result<TypeRef, TypeSyntaxError> {
        if self.depth >= MAX_TYPE_DEPTH {
            return Err(self.error(&format!(
                "type nesting exceeds {} levels",
                MAX_TYPE_DEPTH
            )));
        }
        self.depth += 1;
        let ty = self.parse_nested();
        self.depth -= 1;
        ty
    }

    fn parse_nested(&mut self) -> Result<TypeRef, TypeSyntaxError> {
        self.skip_ws();

        if self.eat('&') {
            self.skip_ws();
            if self.peek() == Some('\'') {
                self.lifetime()?;
            }
            let checkpoint = self.pos;
            if self.ident() != Some("mut") {
                self.pos = checkpoint;
            }
            return self.parse_type();
        }

        if self.eat('[') {
            let inner = self.parse_type()?;
            if !self.eat(']') {
                return Err(self.error("expected `]`"));
            }
            return Ok(TypeRef::Slice(Box::new(inner)));
        }

        if self.eat('(') {
            let mut items = Vec::new();
            loop {
                if self.eat(')') {
                    break;
                }
                items.push(self.parse_type()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat(')') {
                    break;
                }
                return Err(self.error("expected `,` or `)` in tuple"));
            }
            return Ok(TypeRef::Tuple(items));
        }

        let start = {
            self.skip_ws();
            self.pos
        };
        let first = self
            .ident()
            .ok_or_else(|| self.error("expected a type name"))?;

        if first == "dyn" || first == "impl" {
            return self.parse_type();
        }

        if FUNCTION_KEYWORDS.contains(&first) {
            self.skip_ws();
            if self.peek() == Some('(') {
                return self.parse_function(start);
            }
        }

        let mut name = first.to_string();
        loop {
            let checkpoint = self.pos;
            if self.eat_str("::") {
                if let Some(segment) = self.ident() {
                    name.push_str("::");
                    name.push_str(segment);
                    continue;
                }
                return Err(self.error("expected path segment after `::`"));
            }
            self.pos = checkpoint;
            break;
        }

        let mut args = Vec::new();
        if self.eat('<') {
            loop {
                self.skip_ws();
                if self.peek() == Some('\'') {
                    self.lifetime()?;
                } else {
                    args.push(self.parse_type()?);
                }
                if self.eat(',') {
                    if self.eat('>') {
                        break;
                    }
                    continue;
                }
                if self.eat('>') {
                    break;
                }
                return Err(self.error("expected `,` or `>` in generic arguments"));
            }
        }

        Ok(TypeRef::Path { name, args })
    }

    fn parse_function(&mut self, start: usize) -> Result<TypeRef, TypeSyntaxError> {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(self.error("unbalanced parentheses in function type"));
        }
        if self.eat_str("->") {
            self.parse_type()?;
        }
        let signature = self.src[start..self.pos]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Ok(TypeRef::Function(signature))
    }
}
