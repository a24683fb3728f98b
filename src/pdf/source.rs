//! Interface to the layer that parses document bytes
//!
//! The repository never touches file bytes itself. It asks an
//! [`ObjectSource`] where an object lives and to load it from there.

use crate::error::Result;
use crate::pdf::object::{Object, Stream};

/// Where the cross-reference index says an object is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawLocation {
    /// Top-level indirect object, with the generation the index recorded
    Direct { number: u32, generation: u16 },
    /// Member of an object stream
    Compressed { container: u32, index: u32 },
}

/// Parsed document as seen by the repository
pub trait ObjectSource: Send + Sync {
    /// Value of a trailer entry such as `/Root`
    fn trailer_entry(&self, key: &[u8]) -> Option<Object>;

    /// Index entry for an object number, whatever its generation
    fn lookup_direct(&self, number: u32) -> Option<RawLocation>;

    /// Index entry for an object stream
    ///
    /// Containers must themselves be stored directly.
    fn lookup_container(&self, number: u32) -> Option<RawLocation> {
        match self.lookup_direct(number)? {
            loc @ RawLocation::Direct { .. } => Some(loc),
            RawLocation::Compressed { .. } => None,
        }
    }

    /// Read the object at a direct location
    fn load(&self, location: &RawLocation) -> Result<Object>;

    /// Demarshal the members of object stream `number`, in stream order
    fn decode_container(&self, number: u32, container: &Stream) -> Result<Vec<Object>>;

    /// Decoded body of a stream
    ///
    /// May decompress and may block; callers must not cache partial results.
    fn read_body(&self, stream: &Stream) -> Result<Vec<u8>>;
}
