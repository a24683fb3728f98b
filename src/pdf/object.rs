//! In-memory PDF object model
//!
//! Objects are plain immutable values. Indirection is kept as lookup keys
//! ([`ObjectRef`], [`FarRef`]) that only the repository can turn into objects.

use std::fmt;
use std::sync::Arc;

/// Indirect reference: object number plus generation number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub number: u32,
    pub generation: u16,
}

impl ObjectRef {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Reference into an object stream: container object number plus member index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FarRef {
    pub container: u32,
    pub index: u32,
}

impl FarRef {
    pub fn new(container: u32, index: u32) -> Self {
        Self { container, index }
    }
}

impl fmt::Display for FarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "objstm {}[{}]", self.container, self.index)
    }
}

/// Identity of anything the repository can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKey {
    Direct(ObjectRef),
    Far(FarRef),
}

impl fmt::Display for RefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKey::Direct(r) => r.fmt(f),
            RefKey::Far(r) => r.fmt(f),
        }
    }
}

impl From<ObjectRef> for RefKey {
    fn from(r: ObjectRef) -> Self {
        RefKey::Direct(r)
    }
}

impl From<FarRef> for RefKey {
    fn from(r: FarRef) -> Self {
        RefKey::Far(r)
    }
}

/// Length of a stream body as far as it can be known without decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLength {
    Known(u64),
    Unknown,
}

impl fmt::Display for StreamLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamLength::Known(n) => write!(f, "{}", n),
            StreamLength::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Ordered name/value pairs
///
/// Duplicate keys are kept for iteration. Lookups use the last matching
/// entry, which is also what lopdf keeps when it parses a duplicate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, Object)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, keeping any earlier entry with the same key
    pub fn push<K: Into<Vec<u8>>>(&mut self, key: K, value: Object) {
        self.entries.push((key.into(), value));
    }

    /// Builder-style [`Dictionary::push`]
    pub fn with<K: Into<Vec<u8>>>(mut self, key: K, value: Object) -> Self {
        self.push(key, value);
        self
    }

    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|(k, _)| k.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `/Type` is the given name
    pub fn type_is(&self, name: &[u8]) -> bool {
        matches!(self.get(b"Type"), Some(Object::Name(n)) if n.as_slice() == name)
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, Object)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Stream object: metadata dictionary plus the still-encoded body
///
/// The body is shared, so cloning a stream never copies its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    raw: Arc<[u8]>,
}

impl Stream {
    pub fn new(dict: Dictionary, raw: impl Into<Arc<[u8]>>) -> Self {
        Self { dict, raw: raw.into() }
    }

    /// Encoded body bytes exactly as stored in the file
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// `/Length` when it is a direct non-negative integer
    ///
    /// An indirect `/Length` needs the repository to resolve it and is
    /// reported as unknown here.
    pub fn declared_length(&self) -> StreamLength {
        match self.dict.get(b"Length") {
            Some(Object::Integer(n)) if *n >= 0 => StreamLength::Known(*n as u64),
            _ => StreamLength::Unknown,
        }
    }

    /// True when the body has to go through a filter before use
    pub fn is_filtered(&self) -> bool {
        self.dict.contains_key(b"Filter")
    }
}

/// Tag of an [`Object`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Null,
    Boolean,
    Integer,
    Real,
    String,
    Name,
    Operator,
    Array,
    Dictionary,
    Stream,
    Reference,
    FarReference,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Null => "Null",
            ObjectKind::Boolean => "Boolean",
            ObjectKind::Integer => "Integer",
            ObjectKind::Real => "Real",
            ObjectKind::String => "String",
            ObjectKind::Name => "Name",
            ObjectKind::Operator => "Operator",
            ObjectKind::Array => "Array",
            ObjectKind::Dictionary => "Dictionary",
            ObjectKind::Stream => "Stream",
            ObjectKind::Reference => "Reference",
            ObjectKind::FarReference => "FarReference",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any object a PDF document can contain
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Vec<u8>),
    Name(Vec<u8>),
    Operator(String),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectRef),
    FarReference(FarRef),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Null => ObjectKind::Null,
            Object::Boolean(_) => ObjectKind::Boolean,
            Object::Integer(_) => ObjectKind::Integer,
            Object::Real(_) => ObjectKind::Real,
            Object::String(_) => ObjectKind::String,
            Object::Name(_) => ObjectKind::Name,
            Object::Operator(_) => ObjectKind::Operator,
            Object::Array(_) => ObjectKind::Array,
            Object::Dictionary(_) => ObjectKind::Dictionary,
            Object::Stream(_) => ObjectKind::Stream,
            Object::Reference(_) => ObjectKind::Reference,
            Object::FarReference(_) => ObjectKind::FarReference,
        }
    }

    /// Resolution key if this object is a reference of either kind
    pub fn ref_key(&self) -> Option<RefKey> {
        match self {
            Object::Reference(r) => Some(RefKey::Direct(*r)),
            Object::FarReference(r) => Some(RefKey::Far(*r)),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        self.ref_key().is_some()
    }

    pub fn name<N: Into<Vec<u8>>>(name: N) -> Self {
        Object::Name(name.into())
    }

    pub fn string<S: Into<Vec<u8>>>(value: S) -> Self {
        Object::String(value.into())
    }

    pub fn reference(number: u32, generation: u16) -> Self {
        Object::Reference(ObjectRef::new(number, generation))
    }

    pub fn far_reference(container: u32, index: u32) -> Self {
        Object::FarReference(FarRef::new(container, index))
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Dictionary> for Object {
    fn from(d: Dictionary) -> Self {
        Object::Dictionary(d)
    }
}

impl From<Stream> for Object {
    fn from(s: Stream) -> Self {
        Object::Stream(s)
    }
}

impl From<Vec<Object>> for Object {
    fn from(items: Vec<Object>) -> Self {
        Object::Array(items)
    }
}

impl From<i64> for Object {
    fn from(n: i64) -> Self {
        Object::Integer(n)
    }
}

impl From<bool> for Object {
    fn from(b: bool) -> Self {
        Object::Boolean(b)
    }
}
