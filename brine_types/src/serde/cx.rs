use crate::types::Proxy;
use derive_more::Deref;
use std::collections::HashMap;
use std::io::{self, Read};
use std::mem;

/// A per-call integer naming one distinct proxy identity within one
/// top-level encode or decode. `u32` on the wire.
#[derive(Deref, PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct Marker(u32);
impl Marker {
    pub fn deser(r: &mut impl Read) -> Result<(usize, Self), io::Error> {
        let mut buf = [0u8; mem::size_of::<u32>()];
        r.read_exact(&mut buf)?;
        let int = u32::from_le_bytes(buf);
        Ok((buf.len(), Self(int)))
    }
}

/// Encode-side walk state: scoped to one top-level call, threaded by
/// mutable reference through the whole recursion, never shared or reused.
pub struct EncodeCx {
    compat: bool,
    markers: HashMap<usize, Marker>,
}

impl EncodeCx {
    pub fn new(compat: bool) -> Self {
        Self {
            compat,
            markers: HashMap::new(),
        }
    }

    pub fn compat(&self) -> bool {
        self.compat
    }

    /// Marker for a proxy identity; second element is whether this is its
    /// first occurrence in the walk (body must follow on the wire).
    pub fn assign_marker(&mut self, handle_id: usize) -> (Marker, bool) {
        if let Some(marker) = self.markers.get(&handle_id) {
            (*marker, false)
        } else {
            let marker = Marker(self.markers.len() as u32);
            self.markers.insert(handle_id, marker);
            (marker, true)
        }
    }
}

/// Decode-side walk state, mirroring [`EncodeCx`].
pub struct DecodeCx {
    compat: bool,
    proxies: HashMap<Marker, Proxy>,
}

impl DecodeCx {
    pub fn new(compat: bool) -> Self {
        Self {
            compat,
            proxies: HashMap::new(),
        }
    }

    pub fn compat(&self) -> bool {
        self.compat
    }

    /// The already-reconstructed handle for `marker`, if its body was seen.
    /// Clones share the control block, so aliasing is preserved, not copied.
    pub fn lookup(&self, marker: Marker) -> Option<Proxy> {
        self.proxies.get(&marker).cloned()
    }

    pub fn record(&mut self, marker: Marker, proxy: Proxy) {
        self.proxies.insert(marker, proxy);
    }
}
