//! Object source backed by lopdf
//!
//! lopdf does the byte-level work: lexing, cross-reference tables and stream
//! filters. Its loaded object table becomes the index the repository
//! resolves against.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::ObjectId;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::options::OpenOptions;
use crate::pdf::object::{Dictionary, Object, ObjectRef, Stream};
use crate::pdf::repository::Repository;
use crate::pdf::source::{ObjectSource, RawLocation};

/// Open a PDF file and wrap it in a [`Repository`]
///
/// # Example
///
/// ```no_run
/// use pdf_objwalk::options::OpenOptions;
/// use pdf_objwalk::pdf::open_document;
/// use std::path::Path;
///
/// let repository = open_document(Path::new("layers.pdf"), &OpenOptions::default())
///     .expect("Failed to open");
/// let catalog = repository.fetch_root().expect("No catalog");
/// ```
pub fn open_document(path: &Path, options: &OpenOptions) -> Result<Repository> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    info!(path = %path.display(), "opening document");
    let doc = lopdf::Document::load(path)?;

    Ok(Repository::new(LopdfSource::new(doc), options.clone()))
}

/// Same as [`open_document`] for a document already in memory
pub fn open_document_mem(bytes: &[u8], options: &OpenOptions) -> Result<Repository> {
    let doc = lopdf::Document::load_mem(bytes)?;
    Ok(Repository::new(LopdfSource::new(doc), options.clone()))
}

/// Objects and trailer taken from a loaded lopdf document
pub struct LopdfSource {
    trailer: lopdf::Dictionary,
    objects: BTreeMap<ObjectId, lopdf::Object>,
}

impl LopdfSource {
    pub fn new(mut doc: lopdf::Document) -> Self {
        let objects = std::mem::take(&mut doc.objects);
        debug!(objects = objects.len(), version = %doc.version, "loaded object table");
        Self {
            trailer: doc.trailer.clone(),
            objects,
        }
    }

    fn member(&self, container: u32, number: u32) -> Result<Object> {
        // Members of an object stream always carry generation 0
        self.objects
            .get(&(number, 0))
            .map(convert)
            .ok_or_else(|| Error::InvalidContainer {
                container,
                reason: format!("member object {} was not loaded", number),
            })
    }
}

impl ObjectSource for LopdfSource {
    fn trailer_entry(&self, key: &[u8]) -> Option<Object> {
        self.trailer.get(key).ok().map(convert)
    }

    fn lookup_direct(&self, number: u32) -> Option<RawLocation> {
        // Several generations of one number: the newest is the live one
        self.objects
            .range((number, 0)..=(number, u16::MAX))
            .next_back()
            .map(|(&(number, generation), _)| RawLocation::Direct { number, generation })
    }

    fn load(&self, location: &RawLocation) -> Result<Object> {
        match *location {
            RawLocation::Direct { number, generation } => self
                .objects
                .get(&(number, generation))
                .map(convert)
                .ok_or(Error::UnresolvedReference(ObjectRef::new(number, generation))),
            RawLocation::Compressed { container, .. } => Err(Error::InvalidContainer {
                container,
                reason: "compressed objects are read through their container".to_string(),
            }),
        }
    }

    fn decode_container(&self, number: u32, container: &Stream) -> Result<Vec<Object>> {
        let invalid = |reason: &str| Error::InvalidContainer {
            container: number,
            reason: reason.to_string(),
        };

        if !container.dict.type_is(b"ObjStm") {
            return Err(invalid("missing /Type /ObjStm"));
        }
        let count = dict_usize(&container.dict, b"N").ok_or_else(|| invalid("missing /N"))?;
        let first = dict_usize(&container.dict, b"First").ok_or_else(|| invalid("missing /First"))?;

        let body = self.read_body(container)?;
        let header = body
            .get(..first)
            .ok_or_else(|| invalid("body shorter than /First"))?;
        let wanted = count
            .checked_mul(2)
            .ok_or_else(|| invalid("/N is too large"))?;
        let tokens = parse_header_tokens(header, wanted);
        if tokens.len() < wanted {
            return Err(invalid("header lists fewer objects than /N"));
        }

        // Header is `objnum offset` pairs; lopdf already parsed each member
        tokens
            .chunks_exact(2)
            .map(|pair| self.member(number, pair[0]))
            .collect()
    }

    fn read_body(&self, stream: &Stream) -> Result<Vec<u8>> {
        if !stream.is_filtered() {
            return Ok(stream.raw().to_vec());
        }

        let mut dict = lopdf::Dictionary::new();
        for key in [&b"Filter"[..], &b"DecodeParms"[..]] {
            if let Some(value) = stream.dict.get(key) {
                dict.set(key.to_vec(), to_lopdf(value));
            }
        }
        lopdf::Stream::new(dict, stream.raw().to_vec())
            .decompressed_content()
            .map_err(|e| Error::Codec(e.to_string()))
    }
}

/// Convert a lopdf object, keeping array and dictionary order
pub fn convert(object: &lopdf::Object) -> Object {
    match object {
        lopdf::Object::Null => Object::Null,
        lopdf::Object::Boolean(b) => Object::Boolean(*b),
        lopdf::Object::Integer(n) => Object::Integer(*n),
        lopdf::Object::Real(r) => Object::Real(f64::from(*r)),
        lopdf::Object::Name(name) => Object::Name(name.clone()),
        lopdf::Object::String(bytes, _) => Object::String(bytes.clone()),
        lopdf::Object::Array(items) => Object::Array(items.iter().map(convert).collect()),
        lopdf::Object::Dictionary(dict) => Object::Dictionary(convert_dict(dict)),
        lopdf::Object::Stream(stream) => {
            Object::Stream(Stream::new(convert_dict(&stream.dict), stream.content.clone()))
        }
        lopdf::Object::Reference((number, generation)) => {
            Object::Reference(ObjectRef::new(*number, *generation))
        }
    }
}

fn convert_dict(dict: &lopdf::Dictionary) -> Dictionary {
    dict.iter().map(|(key, value)| (key.clone(), convert(value))).collect()
}

/// Filter parameters handed back to lopdf for decoding
fn to_lopdf(object: &Object) -> lopdf::Object {
    match object {
        Object::Null | Object::FarReference(_) | Object::Stream(_) => lopdf::Object::Null,
        Object::Boolean(b) => lopdf::Object::Boolean(*b),
        Object::Integer(n) => lopdf::Object::Integer(*n),
        Object::Real(r) => lopdf::Object::from(*r),
        Object::String(bytes) => lopdf::Object::String(bytes.clone(), lopdf::StringFormat::Literal),
        Object::Name(name) => lopdf::Object::Name(name.clone()),
        Object::Operator(op) => lopdf::Object::Name(op.as_bytes().to_vec()),
        Object::Array(items) => lopdf::Object::Array(items.iter().map(to_lopdf).collect()),
        Object::Dictionary(dict) => {
            let mut out = lopdf::Dictionary::new();
            for (key, value) in dict.iter() {
                out.set(key.to_vec(), to_lopdf(value));
            }
            lopdf::Object::Dictionary(out)
        }
        Object::Reference(r) => lopdf::Object::Reference((r.number, r.generation)),
    }
}

fn dict_usize(dict: &Dictionary, key: &[u8]) -> Option<usize> {
    dict.get(key)
        .and_then(Object::as_i64)
        .and_then(|n| usize::try_from(n).ok())
}

/// Leading unsigned integers of an object stream header, at most `max`
fn parse_header_tokens(bytes: &[u8], max: usize) -> Vec<u32> {
    bytes
        .split(|b| b.is_ascii_whitespace())
        .filter(|token| !token.is_empty())
        .map_while(|token| std::str::from_utf8(token).ok()?.parse::<u32>().ok())
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn source_with(objects: Vec<(ObjectId, lopdf::Object)>) -> LopdfSource {
        let mut doc = lopdf::Document::with_version("1.5");
        for (id, object) in objects {
            doc.objects.insert(id, object);
        }
        LopdfSource::new(doc)
    }

    #[test]
    fn test_convert_keeps_dictionary_order() {
        let dict = dictionary! {
            "Zulu" => lopdf::Object::Integer(1),
            "Alpha" => lopdf::Object::Name(b"A".to_vec()),
            "Kids" => vec![lopdf::Object::Reference((4, 0)), lopdf::Object::Integer(2)],
        };

        let converted = convert(&lopdf::Object::Dictionary(dict));
        let dict = converted.as_dict().unwrap();
        let keys: Vec<&[u8]> = dict.keys().collect();

        assert_eq!(keys, vec![&b"Zulu"[..], &b"Alpha"[..], &b"Kids"[..]]);
        assert_eq!(
            dict.get(b"Kids"),
            Some(&Object::Array(vec![Object::reference(4, 0), Object::Integer(2)]))
        );
    }

    #[test]
    fn test_lookup_prefers_newest_generation() {
        let source = source_with(vec![
            ((3, 0), lopdf::Object::Integer(1)),
            ((3, 2), lopdf::Object::Integer(2)),
        ]);

        assert_eq!(
            source.lookup_direct(3),
            Some(RawLocation::Direct {
                number: 3,
                generation: 2
            })
        );
        assert_eq!(source.lookup_direct(4), None);
    }

    #[test]
    fn test_parse_header_tokens() {
        assert_eq!(parse_header_tokens(b"12 0 13 7 ", 4), vec![12, 0, 13, 7]);
        assert_eq!(parse_header_tokens(b"12 0\n13 7 14 20", 4), vec![12, 0, 13, 7]);
        assert_eq!(parse_header_tokens(b"12 x 13", 4), vec![12]);
    }

    #[test]
    fn test_decode_container_uses_loaded_members() {
        let source = source_with(vec![
            ((12, 0), lopdf::Object::Integer(42)),
            ((13, 0), lopdf::Object::Name(b"Layer".to_vec())),
        ]);
        let header = b"12 0 13 3 ";
        let mut body = header.to_vec();
        body.extend_from_slice(b"42 /Layer");
        let container = Stream::new(
            Dictionary::new()
                .with("Type", Object::name("ObjStm"))
                .with("N", Object::Integer(2))
                .with("First", Object::Integer(header.len() as i64)),
            body,
        );

        let members = source.decode_container(20, &container).unwrap();
        assert_eq!(members, vec![Object::Integer(42), Object::name("Layer")]);
    }

    #[test]
    fn test_decode_container_short_header() {
        let source = source_with(vec![]);
        let container = Stream::new(
            Dictionary::new()
                .with("Type", Object::name("ObjStm"))
                .with("N", Object::Integer(3))
                .with("First", Object::Integer(4)),
            b"12 0 ".to_vec(),
        );

        assert!(matches!(
            source.decode_container(20, &container),
            Err(Error::InvalidContainer { container: 20, .. })
        ));
    }

    #[test]
    fn test_decode_container_huge_count() {
        let source = source_with(vec![]);
        let container = Stream::new(
            Dictionary::new()
                .with("Type", Object::name("ObjStm"))
                .with("N", Object::Integer(i64::MAX))
                .with("First", Object::Integer(4)),
            b"12 0 ".to_vec(),
        );

        assert!(matches!(
            source.decode_container(20, &container),
            Err(Error::InvalidContainer { container: 20, .. })
        ));
    }

    #[test]
    fn test_read_body_unfiltered() {
        let source = source_with(vec![]);
        let stream = Stream::new(Dictionary::new(), b"0 0 m".to_vec());
        assert_eq!(source.read_body(&stream).unwrap(), b"0 0 m".to_vec());
    }
}
