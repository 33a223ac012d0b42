//! Structured values exchanged with the peer.
//!
//! Requests and replies are tuples of atoms, integers, binaries and nested
//! terms. On the wire each term is one JSON value:
//!
//! ```json
//! ["write_byte", 1, 80, 16, {"binary": [1, 2, 3]}]
//! ["i2cbridge", ["ok", 3]]
//! ```
//!
//! Atoms are bare strings and tuples are arrays. Binaries, text and lists
//! are wrapped in a single-key object so they never collide with atoms or
//! tuples. Any other JSON value is kept as an opaque term: it decodes, but
//! matches no argument shape.

use serde::{Deserialize, Serialize};

/// A decoded request or reply value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireTerm", into = "WireTerm")]
pub enum Term {
    /// Symbolic constant such as `read_byte` or `ok`.
    Atom(String),
    /// Whole number.
    Integer(i64),
    /// Fractional number.
    Float(f64),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Human-readable text, used for OS error descriptions.
    String(String),
    /// Homogeneous sequence.
    List(Vec<Term>),
    /// Fixed-arity group; the first element of a request names the command.
    Tuple(Vec<Term>),
    /// JSON outside the shapes above, such as `true` or `{"binary": [300]}`.
    Opaque(serde_json::Value),
}

impl Term {
    /// Builds an atom.
    pub fn atom(name: impl Into<String>) -> Self {
        Self::Atom(name.into())
    }

    /// Builds a text term.
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    /// Builds an integer term from any unsigned bus quantity.
    pub fn unsigned(value: impl Into<u32>) -> Self {
        Self::Integer(i64::from(value.into()))
    }

    /// Builds a tuple.
    pub fn tuple(items: impl IntoIterator<Item = Term>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Builds `(ok, ...values)`.
    pub fn ok(values: impl IntoIterator<Item = Term>) -> Self {
        Self::tuple(std::iter::once(Self::atom("ok")).chain(values))
    }

    /// Builds `(tag, reason)` or `(tag, reason, detail)`.
    pub fn failure(tag: &str, reason: Term, detail: Option<Term>) -> Self {
        Self::tuple([Self::atom(tag), reason].into_iter().chain(detail))
    }

    /// Returns the atom name when this term is an atom.
    #[must_use]
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Atom(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireTerm {
    Atom(String),
    Integer(i64),
    Float(f64),
    Tuple(Vec<WireTerm>),
    Wrapped(WrappedTerm),
    Other(serde_json::Value),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WrappedTerm {
    Binary(Vec<u8>),
    String(String),
    List(Vec<WireTerm>),
}

impl From<WireTerm> for Term {
    fn from(wire: WireTerm) -> Self {
        match wire {
            WireTerm::Atom(name) => Self::Atom(name),
            WireTerm::Integer(value) => Self::Integer(value),
            WireTerm::Float(value) => Self::Float(value),
            WireTerm::Tuple(items) => Self::Tuple(items.into_iter().map(Self::from).collect()),
            WireTerm::Wrapped(WrappedTerm::Binary(bytes)) => Self::Binary(bytes),
            WireTerm::Wrapped(WrappedTerm::String(text)) => Self::String(text),
            WireTerm::Wrapped(WrappedTerm::List(items)) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            WireTerm::Other(value) => Self::Opaque(value),
        }
    }
}

impl From<Term> for WireTerm {
    fn from(term: Term) -> Self {
        match term {
            Term::Atom(name) => Self::Atom(name),
            Term::Integer(value) => Self::Integer(value),
            Term::Float(value) => Self::Float(value),
            Term::Binary(bytes) => Self::Wrapped(WrappedTerm::Binary(bytes)),
            Term::String(text) => Self::Wrapped(WrappedTerm::String(text)),
            Term::List(items) => {
                Self::Wrapped(WrappedTerm::List(items.into_iter().map(Self::from).collect()))
            }
            Term::Tuple(items) => Self::Tuple(items.into_iter().map(Self::from).collect()),
            Term::Opaque(value) => Self::Other(value),
        }
    }
}
