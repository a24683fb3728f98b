//! Resolved-object repository
//!
//! The repository owns the cache from reference identity to resolved object.
//! Resolution is a bounded lookup in the source's index plus, for objects
//! packed in object streams, one level of container decoding. It never
//! follows references nested inside what it returns; that is the
//! traverser's job.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::OpenOptions;
use crate::pdf::object::{FarRef, Object, ObjectRef, RefKey, Stream, StreamLength};
use crate::pdf::source::{ObjectSource, RawLocation};

/// Resolved objects of one open document
pub struct Repository {
    source: Box<dyn ObjectSource>,
    options: OpenOptions,
    objects: RwLock<HashMap<RefKey, Arc<Object>>>,
    containers: RwLock<HashMap<u32, Arc<Vec<Object>>>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("options", &self.options)
            .field("cached_objects", &self.cached_len())
            .finish()
    }
}

impl Repository {
    pub fn new(source: impl ObjectSource + 'static, options: OpenOptions) -> Self {
        Self {
            source: Box::new(source),
            options,
            objects: RwLock::new(HashMap::new()),
            containers: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    /// The document's entry object (the catalog)
    ///
    /// Fails with [`Error::RootNotFound`] when the trailer has no entry or it
    /// points at nothing, and with [`Error::MalformedRoot`] when the entry is
    /// not a dictionary.
    pub fn fetch_root(&self) -> Result<Arc<Object>> {
        let entry = self
            .source
            .trailer_entry(self.options.root_key.as_bytes())
            .ok_or(Error::RootNotFound)?;

        let root = match entry.ref_key() {
            Some(key) => match self.resolve_key(&key) {
                Ok(obj) => obj,
                Err(Error::UnresolvedReference(_)) | Err(Error::ContainerNotFound(_)) => {
                    return Err(Error::RootNotFound)
                }
                Err(e) => return Err(e),
            },
            None => Arc::new(entry),
        };

        match root.as_ref() {
            Object::Dictionary(_) => Ok(root),
            other => Err(Error::MalformedRoot { kind: other.kind() }),
        }
    }

    /// Trailer value naming the catalog, checked by [`Repository::fetch_root`]
    ///
    /// Usually a reference. Walking from it keeps the catalog's own identity
    /// on the traversal path, so a subtree pointing back at the catalog is
    /// reported as a cycle.
    pub fn root_entry(&self) -> Result<Object> {
        self.fetch_root()?;
        self.source
            .trailer_entry(self.options.root_key.as_bytes())
            .ok_or(Error::RootNotFound)
    }

    /// Raw value of a catalog entry; it may still be a reference
    pub fn fetch_entry(&self, name: &str) -> Result<Object> {
        let root = self.fetch_root()?;
        root.as_dict()
            .and_then(|dict| dict.get(name.as_bytes()))
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(name.to_string()))
    }

    /// Resolve an indirect reference
    ///
    /// Resolving the same reference again returns the same cached instance.
    pub fn resolve(&self, reference: &ObjectRef) -> Result<Arc<Object>> {
        let key = RefKey::Direct(*reference);
        if let Some(hit) = self.cached(&key) {
            trace!(%reference, "cache hit");
            return Ok(hit);
        }

        let location = self
            .source
            .lookup_direct(reference.number)
            .ok_or(Error::UnresolvedReference(*reference))?;

        let object = match location {
            RawLocation::Direct { generation, .. } if generation != reference.generation => {
                return Err(Error::StaleReference {
                    reference: *reference,
                    found: generation,
                });
            }
            RawLocation::Direct { .. } => {
                debug!(%reference, "loading direct object");
                Arc::new(self.source.load(&location)?)
            }
            RawLocation::Compressed { container, index } => {
                // Objects inside object streams always have generation 0
                if reference.generation != 0 {
                    return Err(Error::StaleReference {
                        reference: *reference,
                        found: 0,
                    });
                }
                debug!(%reference, container, index, "loading compressed object");
                self.resolve_far(&FarRef::new(container, index))?
            }
        };

        Ok(self.insert(key, object))
    }

    /// Resolve a reference into an object stream
    pub fn resolve_far(&self, reference: &FarRef) -> Result<Arc<Object>> {
        let key = RefKey::Far(*reference);
        if let Some(hit) = self.cached(&key) {
            trace!(%reference, "cache hit");
            return Ok(hit);
        }

        let members = self.container_members(reference.container)?;
        let member = members
            .get(reference.index as usize)
            .cloned()
            .ok_or(Error::IndexOutOfRange {
                container: reference.container,
                index: reference.index,
                len: members.len(),
            })?;

        Ok(self.insert(key, Arc::new(member)))
    }

    pub fn resolve_key(&self, key: &RefKey) -> Result<Arc<Object>> {
        match key {
            RefKey::Direct(r) => self.resolve(r),
            RefKey::Far(r) => self.resolve_far(r),
        }
    }

    /// Length of a stream body without decoding it
    ///
    /// An indirect `/Length` that cannot be resolved gives
    /// [`StreamLength::Unknown`]; the stream itself is still valid.
    pub fn stream_length(&self, stream: &Stream) -> Result<StreamLength> {
        match stream.dict.get(b"Length") {
            Some(Object::Reference(r)) if self.options.resolve_indirect_lengths => {
                match self.resolve(r) {
                    Ok(length) => match length.as_ref() {
                        Object::Integer(n) if *n >= 0 => Ok(StreamLength::Known(*n as u64)),
                        _ => Ok(StreamLength::Unknown),
                    },
                    Err(e) if e.is_recoverable() => {
                        debug!(reference = %r, error = %e, "stream length not resolvable");
                        Ok(StreamLength::Unknown)
                    }
                    Err(e) => Err(e),
                }
            }
            _ => Ok(stream.declared_length()),
        }
    }

    /// Decoded body of a stream, read on demand and never cached
    pub fn read_stream_body(&self, stream: &Stream) -> Result<Vec<u8>> {
        self.source.read_body(stream)
    }

    /// Number of resolved objects held in the cache
    pub fn cached_len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn cached(&self, key: &RefKey) -> Option<Arc<Object>> {
        // Entries are immutable Arcs, so a poisoned lock still holds valid data
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// Keep the first object stored under `key` if another caller won the race
    fn insert(&self, key: RefKey, object: Arc<Object>) -> Arc<Object> {
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert(object)
            .clone()
    }

    fn container_members(&self, container: u32) -> Result<Arc<Vec<Object>>> {
        if let Some(members) = self
            .containers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&container)
        {
            return Ok(members.clone());
        }

        let location = self
            .source
            .lookup_container(container)
            .ok_or(Error::ContainerNotFound(container))?;
        let stream = match self.source.load(&location)? {
            Object::Stream(stream) => stream,
            other => {
                return Err(Error::InvalidContainer {
                    container,
                    reason: format!("expected a stream, found {}", other.kind()),
                })
            }
        };

        let members = Arc::new(self.source.decode_container(container, &stream)?);
        debug!(container, members = members.len(), "decoded object stream");

        Ok(self
            .containers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(container)
            .or_insert(members)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::memory::MemorySource;
    use crate::pdf::object::Dictionary;

    fn repo(source: MemorySource) -> Repository {
        Repository::new(source, OpenOptions::default())
    }

    #[test]
    fn test_resolve_is_idempotent_and_cached() {
        let repository = repo(
            MemorySource::builder()
                .object(5, Dictionary::new().with("Name", Object::string("Layer")))
                .build(),
        );
        let r = ObjectRef::new(5, 0);

        let first = repository.resolve(&r).unwrap();
        let second = repository.resolve(&r).unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repository.cached_len(), 1);
    }

    #[test]
    fn test_resolve_missing_object() {
        let repository = repo(MemorySource::default());
        let result = repository.resolve(&ObjectRef::new(42, 0));
        assert!(matches!(result, Err(Error::UnresolvedReference(r)) if r.number == 42));
        assert_eq!(repository.cached_len(), 0);
    }

    #[test]
    fn test_resolve_generation_mismatch_is_stale() {
        let repository = repo(
            MemorySource::builder()
                .object_with_generation(7, 1, Object::Integer(3))
                .build(),
        );

        let result = repository.resolve(&ObjectRef::new(7, 0));
        assert!(matches!(
            result,
            Err(Error::StaleReference { found: 1, .. })
        ));
        assert_eq!(*repository.resolve(&ObjectRef::new(7, 1)).unwrap(), Object::Integer(3));
    }

    #[test]
    fn test_resolve_does_not_follow_nested_references() {
        let repository = repo(
            MemorySource::builder()
                .object(1, Object::Array(vec![Object::reference(2, 0)]))
                .object(2, Object::Integer(9))
                .build(),
        );

        let resolved = repository.resolve(&ObjectRef::new(1, 0)).unwrap();
        assert_eq!(*resolved, Object::Array(vec![Object::reference(2, 0)]));
        assert_eq!(repository.cached_len(), 1);
    }

    #[test]
    fn test_far_reference_resolution() {
        let repository = repo(
            MemorySource::builder()
                .container(10, vec![Object::Integer(1), Object::name("Second")])
                .build(),
        );

        let member = repository.resolve_far(&FarRef::new(10, 1)).unwrap();
        assert_eq!(*member, Object::name("Second"));

        let again = repository.resolve_far(&FarRef::new(10, 1)).unwrap();
        assert!(Arc::ptr_eq(&member, &again));
    }

    #[test]
    fn test_far_reference_index_out_of_range() {
        let repository = repo(
            MemorySource::builder()
                .container(10, vec![Object::Integer(1), Object::Integer(2)])
                .build(),
        );

        let result = repository.resolve_far(&FarRef::new(10, 3));
        assert!(matches!(
            result,
            Err(Error::IndexOutOfRange {
                container: 10,
                index: 3,
                len: 2
            })
        ));
    }

    #[test]
    fn test_far_reference_missing_container() {
        let repository = repo(MemorySource::default());
        let result = repository.resolve_far(&FarRef::new(99, 0));
        assert!(matches!(result, Err(Error::ContainerNotFound(99))));
    }

    #[test]
    fn test_far_reference_container_not_a_stream() {
        let repository = repo(MemorySource::builder().object(10, Object::Integer(0)).build());
        let result = repository.resolve_far(&FarRef::new(10, 0));
        assert!(matches!(result, Err(Error::InvalidContainer { container: 10, .. })));
    }

    #[test]
    fn test_compressed_object_resolves_through_container() {
        let repository = repo(
            MemorySource::builder()
                .container(10, vec![Object::Integer(1), Object::Boolean(true)])
                .compressed(12, 10, 1)
                .build(),
        );

        let obj = repository.resolve(&ObjectRef::new(12, 0)).unwrap();
        assert_eq!(*obj, Object::Boolean(true));

        let far = repository.resolve_far(&FarRef::new(10, 1)).unwrap();
        assert!(Arc::ptr_eq(&obj, &far));

        assert!(matches!(
            repository.resolve(&ObjectRef::new(12, 1)),
            Err(Error::StaleReference { found: 0, .. })
        ));
    }

    #[test]
    fn test_fetch_root() {
        let repository = repo(
            MemorySource::builder()
                .object(1, Dictionary::new().with("Type", Object::name("Catalog")))
                .root(1)
                .build(),
        );
        let root = repository.fetch_root().unwrap();
        assert!(root.as_dict().unwrap().type_is(b"Catalog"));
    }

    #[test]
    fn test_fetch_root_missing() {
        let repository = repo(MemorySource::default());
        assert!(matches!(repository.fetch_root(), Err(Error::RootNotFound)));

        let dangling = repo(MemorySource::builder().root(3).build());
        assert!(matches!(dangling.fetch_root(), Err(Error::RootNotFound)));
    }

    #[test]
    fn test_fetch_root_not_a_dictionary() {
        let repository = repo(
            MemorySource::builder()
                .object(1, Object::Array(vec![]))
                .root(1)
                .build(),
        );
        assert!(matches!(
            repository.fetch_root(),
            Err(Error::MalformedRoot {
                kind: crate::pdf::object::ObjectKind::Array
            })
        ));
    }

    #[test]
    fn test_fetch_entry() {
        let repository = repo(
            MemorySource::builder()
                .object(1, Dictionary::new().with("OCProperties", Object::reference(5, 0)))
                .root(1)
                .build(),
        );

        assert_eq!(
            repository.fetch_entry("OCProperties").unwrap(),
            Object::reference(5, 0)
        );
        assert!(matches!(
            repository.fetch_entry("Missing"),
            Err(Error::EntryNotFound(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_custom_root_key() {
        let source = MemorySource::builder()
            .object(2, Dictionary::new().with("Kind", Object::name("Alt")))
            .trailer("Alt", Object::reference(2, 0))
            .build();
        let options = OpenOptions {
            root_key: "Alt".to_string(),
            ..OpenOptions::default()
        };
        let repository = Repository::new(source, options);
        assert!(repository.fetch_root().is_ok());
    }

    #[test]
    fn test_stream_length_resolves_indirect_length() {
        let repository = repo(MemorySource::builder().object(9, Object::Integer(128)).build());
        let stream = Stream::new(Dictionary::new().with("Length", Object::reference(9, 0)), Vec::new());

        assert_eq!(repository.stream_length(&stream).unwrap(), StreamLength::Known(128));

        let no_resolve = Repository::new(
            MemorySource::builder().object(9, Object::Integer(128)).build(),
            OpenOptions {
                resolve_indirect_lengths: false,
                ..OpenOptions::default()
            },
        );
        assert_eq!(no_resolve.stream_length(&stream).unwrap(), StreamLength::Unknown);
    }

    #[test]
    fn test_dangling_indirect_length_is_unknown() {
        let repository = repo(MemorySource::default());
        let stream = Stream::new(Dictionary::new().with("Length", Object::reference(50, 0)), b"abc".to_vec());

        assert_eq!(repository.stream_length(&stream).unwrap(), StreamLength::Unknown);
    }

    #[test]
    fn test_root_entry_is_the_trailer_reference() {
        let repository = repo(
            MemorySource::builder()
                .object(1, Dictionary::new().with("Type", Object::name("Catalog")))
                .root(1)
                .build(),
        );
        assert_eq!(repository.root_entry().unwrap(), Object::reference(1, 0));

        let malformed = repo(
            MemorySource::builder()
                .object(1, Object::Integer(3))
                .root(1)
                .build(),
        );
        assert!(matches!(malformed.root_entry(), Err(Error::MalformedRoot { .. })));
    }

    #[test]
    fn test_stream_length_unknown_is_not_zero() {
        let repository = repo(MemorySource::default());
        let stream = Stream::new(Dictionary::new(), b"q Q".to_vec());
        assert_eq!(repository.stream_length(&stream).unwrap(), StreamLength::Unknown);
    }

    #[test]
    fn test_concurrent_resolution_shares_one_instance() {
        let repository = Arc::new(repo(
            MemorySource::builder().object(3, Object::string("shared")).build(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repository = Arc::clone(&repository);
                std::thread::spawn(move || repository.resolve(&ObjectRef::new(3, 0)).unwrap())
            })
            .collect();
        let results: Vec<Arc<Object>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for r in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], r));
        }
        assert_eq!(repository.cached_len(), 1);
    }
}
