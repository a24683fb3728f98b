//! Object source held entirely in memory
//!
//! Useful for synthetic documents and for exercising the repository without
//! producing file bytes.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::pdf::object::{Dictionary, Object, ObjectRef, Stream};
use crate::pdf::source::{ObjectSource, RawLocation};

/// Arena of objects keyed by object number
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    trailer: Dictionary,
    objects: BTreeMap<u32, (u16, Object)>,
    compressed: BTreeMap<u32, (u32, u32)>,
    containers: HashMap<u32, Vec<Object>>,
}

impl MemorySource {
    pub fn builder() -> MemorySourceBuilder {
        MemorySourceBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len() + self.compressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectSource for MemorySource {
    fn trailer_entry(&self, key: &[u8]) -> Option<Object> {
        self.trailer.get(key).cloned()
    }

    fn lookup_direct(&self, number: u32) -> Option<RawLocation> {
        if let Some((generation, _)) = self.objects.get(&number) {
            return Some(RawLocation::Direct {
                number,
                generation: *generation,
            });
        }
        self.compressed
            .get(&number)
            .map(|&(container, index)| RawLocation::Compressed { container, index })
    }

    fn load(&self, location: &RawLocation) -> Result<Object> {
        match *location {
            RawLocation::Direct { number, generation } => match self.objects.get(&number) {
                Some((g, obj)) if *g == generation => Ok(obj.clone()),
                _ => Err(Error::UnresolvedReference(ObjectRef::new(number, generation))),
            },
            RawLocation::Compressed { container, .. } => Err(Error::InvalidContainer {
                container,
                reason: "compressed objects are read through their container".to_string(),
            }),
        }
    }

    fn decode_container(&self, number: u32, container: &Stream) -> Result<Vec<Object>> {
        if !container.dict.type_is(b"ObjStm") {
            return Err(Error::InvalidContainer {
                container: number,
                reason: "missing /Type /ObjStm".to_string(),
            });
        }
        self.containers
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::InvalidContainer {
                container: number,
                reason: "no members recorded".to_string(),
            })
    }

    fn read_body(&self, stream: &Stream) -> Result<Vec<u8>> {
        if stream.is_filtered() {
            return Err(Error::Codec(
                "filtered streams are not decoded by the in-memory source".to_string(),
            ));
        }
        Ok(stream.raw().to_vec())
    }
}

/// Builder for [`MemorySource`]
///
/// # Example
///
/// ```
/// use pdf_objwalk::pdf::{Dictionary, MemorySource, Object};
///
/// let source = MemorySource::builder()
///     .object(1, Dictionary::new().with("Type", Object::name("Catalog")))
///     .root(1)
///     .build();
/// assert_eq!(source.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySourceBuilder {
    source: MemorySource,
}

impl MemorySourceBuilder {
    /// Add an object with generation 0
    pub fn object(self, number: u32, object: impl Into<Object>) -> Self {
        self.object_with_generation(number, 0, object)
    }

    pub fn object_with_generation(mut self, number: u32, generation: u16, object: impl Into<Object>) -> Self {
        self.source.objects.insert(number, (generation, object.into()));
        self
    }

    /// Add an object stream with its already demarshalled members
    ///
    /// The container itself is stored as a direct stream object.
    pub fn container(mut self, number: u32, members: Vec<Object>) -> Self {
        let dict = Dictionary::new()
            .with("Type", Object::name("ObjStm"))
            .with("N", Object::Integer(members.len() as i64));
        self.source
            .objects
            .insert(number, (0, Object::Stream(Stream::new(dict, Vec::new()))));
        self.source.containers.insert(number, members);
        self
    }

    /// Record that object `number` is member `index` of `container`
    pub fn compressed(mut self, number: u32, container: u32, index: u32) -> Self {
        self.source.compressed.insert(number, (container, index));
        self
    }

    pub fn trailer<K: Into<Vec<u8>>>(mut self, key: K, value: Object) -> Self {
        self.source.trailer.push(key, value);
        self
    }

    /// Point `/Root` at object `number`, generation 0
    pub fn root(self, number: u32) -> Self {
        self.trailer("Root", Object::reference(number, 0))
    }

    pub fn build(self) -> MemorySource {
        self.source
    }
}
