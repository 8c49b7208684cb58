use crate::args::{ArgType, ArgValue, CallArgs};

/// Hashable key built from the arguments of one call.
///
/// Untyped keys compare numbers by value, so `true`, `1` and `1.0` collapse
/// into the same key. Typed keys carry the [`ArgType`] of every value and keep
/// them apart. Tagging reaches into tuples as well, so `(1,)` and `(1.0,)` are
/// distinct typed keys even though `functools.lru_cache` would merge them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    positional: Vec<KeyAtom>,
    keywords: Vec<(String, KeyAtom)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyAtom {
    tag: Option<ArgType>,
    value: KeyValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyValue {
    None,
    Int(i64),
    Float(u64),
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<KeyAtom>),
}

const CANONICAL_NAN: u64 = 0x7ff8_0000_0000_0000;

impl CacheKey {
    pub fn new(args: &CallArgs, typed: bool) -> Self {
        Self {
            positional: args
                .positional()
                .iter()
                .map(|value| KeyAtom::new(value, typed))
                .collect(),
            keywords: args
                .keywords()
                .iter()
                .map(|(name, value)| (name.clone(), KeyAtom::new(value, typed)))
                .collect(),
        }
    }

    /// Number of argument slots (positional plus keyword) in the key.
    pub fn arity(&self) -> usize {
        self.positional.len() + self.keywords.len()
    }
}

impl KeyAtom {
    fn new(value: &ArgValue, typed: bool) -> Self {
        Self {
            tag: typed.then(|| value.arg_type()),
            value: KeyValue::normalise(value, typed),
        }
    }
}

impl KeyValue {
    fn normalise(value: &ArgValue, typed: bool) -> Self {
        match value {
            ArgValue::None => KeyValue::None,
            ArgValue::Bool(b) => KeyValue::Int(i64::from(*b)),
            ArgValue::Int(i) => KeyValue::Int(*i),
            ArgValue::Float(f) => float_key(*f),
            ArgValue::Str(s) => KeyValue::Str(s.clone()),
            ArgValue::Bytes(b) => KeyValue::Bytes(b.clone()),
            ArgValue::Tuple(items) => KeyValue::Tuple(
                items
                    .iter()
                    .map(|item| KeyAtom::new(item, typed))
                    .collect(),
            ),
        }
    }
}

/// Integral floats hash as integers so `1.0 == 1`; `-0.0` folds into `0`.
fn float_key(value: f64) -> KeyValue {
    if value.is_nan() {
        return KeyValue::Float(CANONICAL_NAN);
    }
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        return KeyValue::Int(value as i64);
    }
    KeyValue::Float(value.to_bits())
}
