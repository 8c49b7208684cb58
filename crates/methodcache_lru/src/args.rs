use std::fmt;

use thiserror::Error;

/// Runtime type tag of an argument, used by typed cache keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    None,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    Tuple,
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::None => "none",
            ArgType::Bool => "bool",
            ArgType::Int => "int",
            ArgType::Float => "float",
            ArgType::Str => "str",
            ArgType::Bytes => "bytes",
            ArgType::Tuple => "tuple",
        };
        f.write_str(name)
    }
}

/// A single dynamically typed call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<ArgValue>),
}

impl ArgValue {
    pub fn arg_type(&self) -> ArgType {
        match self {
            ArgValue::None => ArgType::None,
            ArgValue::Bool(_) => ArgType::Bool,
            ArgValue::Int(_) => ArgType::Int,
            ArgValue::Float(_) => ArgType::Float,
            ArgValue::Str(_) => ArgType::Str,
            ArgValue::Bytes(_) => ArgType::Bytes,
            ArgValue::Tuple(_) => ArgType::Tuple,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view of the value. Booleans count as integers.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            ArgValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of the value. Integers and booleans are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Int(i) => Some(*i as f64),
            ArgValue::Bool(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ArgValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ArgValue::None)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::Int(i64::from(value))
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::Float(f64::from(value))
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Str(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Str(value)
    }
}

impl From<&[u8]> for ArgValue {
    fn from(value: &[u8]) -> Self {
        ArgValue::Bytes(value.to_vec())
    }
}

impl From<Vec<ArgValue>> for ArgValue {
    fn from(value: Vec<ArgValue>) -> Self {
        ArgValue::Tuple(value)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ArgValue::None, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("missing positional argument {index}")]
    MissingPositional { index: usize },
    #[error("missing keyword argument `{name}`")]
    MissingKeyword { name: String },
    #[error("argument {position} must be {expected}, found {found}")]
    WrongType {
        position: String,
        expected: ArgType,
        found: ArgType,
    },
}

/// Positional and keyword arguments of a single call.
///
/// Keyword order is preserved and is part of the cache key, so `f(a=1, b=2)`
/// and `f(b=2, a=1)` are cached separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    positional: Vec<ArgValue>,
    keywords: Vec<(String, ArgValue)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds a keyword argument, replacing an earlier one with the same name.
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.keywords.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.keywords.push((name, value)),
        }
        self
    }

    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    pub fn keywords(&self) -> &[(String, ArgValue)] {
        &self.keywords
    }

    pub fn get(&self, index: usize) -> Option<&ArgValue> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&ArgValue> {
        self.keywords
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub fn int(&self, index: usize) -> Result<i64, ArgError> {
        let value = self.require(index)?;
        value
            .as_int()
            .ok_or_else(|| wrong_type(index.to_string(), ArgType::Int, value))
    }

    pub fn float(&self, index: usize) -> Result<f64, ArgError> {
        let value = self.require(index)?;
        value
            .as_float()
            .ok_or_else(|| wrong_type(index.to_string(), ArgType::Float, value))
    }

    pub fn str(&self, index: usize) -> Result<&str, ArgError> {
        let value = self.require(index)?;
        value
            .as_str()
            .ok_or_else(|| wrong_type(index.to_string(), ArgType::Str, value))
    }

    pub fn int_kwarg(&self, name: &str) -> Result<i64, ArgError> {
        let value = self
            .keyword(name)
            .ok_or_else(|| ArgError::MissingKeyword {
                name: name.to_owned(),
            })?;
        value
            .as_int()
            .ok_or_else(|| wrong_type(format!("`{name}`"), ArgType::Int, value))
    }

    fn require(&self, index: usize) -> Result<&ArgValue, ArgError> {
        self.positional
            .get(index)
            .ok_or(ArgError::MissingPositional { index })
    }
}

fn wrong_type(position: String, expected: ArgType, found: &ArgValue) -> ArgError {
    ArgError::WrongType {
        position,
        expected,
        found: found.arg_type(),
    }
}

impl From<()> for CallArgs {
    fn from((): ()) -> Self {
        CallArgs::new()
    }
}

impl<V: Into<ArgValue>, const N: usize> From<[V; N]> for CallArgs {
    fn from(values: [V; N]) -> Self {
        values.into_iter().collect()
    }
}

impl From<Vec<ArgValue>> for CallArgs {
    fn from(positional: Vec<ArgValue>) -> Self {
        Self {
            positional,
            keywords: Vec::new(),
        }
    }
}

impl<V: Into<ArgValue>> FromIterator<V> for CallArgs {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        iter.into_iter().map(Into::into).collect::<Vec<_>>().into()
    }
}
