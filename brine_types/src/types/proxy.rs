use crate::serde::TypeTag;
use crate::types::{OrderedTable, PodArr, Table, Tuple, Value};
use anyhow::{Context, Result};
use brine_pool::StreamingPool;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::ptr::NonNull;
use std::sync::{Arc, Mutex, MutexGuard};

/// The container kinds a [`Proxy`] may wrap. Scalars and strings are
/// excluded by construction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ProxyBody {
    Tab(Table),
    OTab(OrderedTable),
    Tup(Tuple),
    Arr(Vec<Value>),
    Pod(PodArr),
}

impl ProxyBody {
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Tab(_) => TypeTag::Tab,
            Self::OTab(_) => TypeTag::OTab,
            Self::Tup(_) => TypeTag::Tup,
            Self::Arr(_) | Self::Pod(_) => TypeTag::Arr,
        }
    }

    /// Element subtype, for the kinds that carry one on the wire.
    pub fn subtype(&self) -> Option<TypeTag> {
        match self {
            Self::Tab(_) | Self::OTab(_) => None,
            Self::Tup(_) | Self::Arr(_) => Some(TypeTag::Empty),
            Self::Pod(arr) => Some(arr.subtype()),
        }
    }

    /// Bytes reserved in a pool for the shared-storage mode: a pod array's
    /// packed payload, or a per-entry accounting estimate for containers.
    fn reservation_bytes(&self) -> usize {
        const ENTRY_WORDS: usize = 2;
        let word = mem::size_of::<usize>();
        match self {
            Self::Pod(arr) => arr.payload_bytes().max(word),
            Self::Tab(t) => (1 + t.len() * ENTRY_WORDS) * word,
            Self::OTab(t) => (1 + t.len() * ENTRY_WORDS) * word,
            Self::Tup(t) => (1 + t.len()) * word,
            Self::Arr(a) => (1 + a.len()) * word,
        }
    }
}

struct ArenaBacking {
    pool: StreamingPool,
    block: NonNull<u8>,
}

unsafe impl Send for ArenaBacking {}
unsafe impl Sync for ArenaBacking {}

struct ProxyShared {
    adopt: bool,
    lock: bool,
    arena: Option<ArenaBacking>,
    body: Mutex<ProxyBody>,
}

impl Drop for ProxyShared {
    fn drop(&mut self) {
        if let Some(backing) = &self.arena {
            if self.adopt {
                // Failure here means the pool was corrupted or torn down
                // under us; there is nobody left to report to.
                unsafe { backing.pool.deallocate(backing.block).ok() };
            }
        }
    }
}

/// A shared-ownership handle to a container value.
///
/// Cloning a handle bumps a shared reference count; the underlying container
/// is released when the last clone drops. Mutation goes through
/// [`Proxy::body`], whose mutex makes it visible through every clone. Two
/// handles are equal iff they share the same control block. That identity,
/// never deep comparison, is what the codec's marker table keys on.
#[derive(Clone)]
pub struct Proxy {
    shared: Arc<ProxyShared>,
}

impl Proxy {
    fn new(body: ProxyBody, adopt: bool, lock: bool, arena: Option<ArenaBacking>) -> Self {
        Self {
            shared: Arc::new(ProxyShared {
                adopt,
                lock,
                arena,
                body: Mutex::new(body),
            }),
        }
    }

    /// Plain heap storage; the caller serializes access externally.
    pub fn new_private(body: ProxyBody) -> Self {
        Self::new(body, true, false, None)
    }

    /// Heap storage, safe for concurrent access within one process.
    pub fn new_locked(body: ProxyBody) -> Self {
        Self::new(body, true, true, None)
    }

    /// Storage drawn from `pool`. The backing block is returned to the pool
    /// when the last handle drops, provided the handle adopts it.
    pub fn new_shared(body: ProxyBody, pool: &StreamingPool) -> Result<Self> {
        let block = pool
            .allocate(body.reservation_bytes())
            .context("reserving proxy storage from pool")?;
        let backing = ArenaBacking {
            pool: pool.clone(),
            block,
        };
        Ok(Self::new(body, true, true, Some(backing)))
    }

    /// Reconstructs a handle with wire-specified flags (decoder entry point).
    pub fn with_flags(body: ProxyBody, adopt: bool, lock: bool) -> Self {
        Self::new(body, adopt, lock, None)
    }

    pub fn adopt(&self) -> bool {
        self.shared.adopt
    }

    pub fn lock_flag(&self) -> bool {
        self.shared.lock
    }

    pub fn pool(&self) -> Option<&StreamingPool> {
        self.shared.arena.as_ref().map(|backing| &backing.pool)
    }

    pub fn is_arena_backed(&self) -> bool {
        self.shared.arena.is_some()
    }

    /// Locks and returns the wrapped container.
    pub fn body(&self) -> MutexGuard<'_, ProxyBody> {
        match self.shared.body.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.body().tag()
    }

    pub fn subtype(&self) -> Option<TypeTag> {
        self.body().subtype()
    }

    /// Control-block identity: stable for the handle's lifetime, shared by
    /// all clones, distinct between distinct proxies.
    pub fn handle_id(&self) -> usize {
        Arc::as_ptr(&self.shared) as usize
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.shared)
    }
}

impl PartialEq for Proxy {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
impl Eq for Proxy {}

impl Hash for Proxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.handle_id());
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The body mutex may be held by the caller mid-walk; don't block.
        let tag = self.shared.body.try_lock().map(|body| body.tag());
        let mut dbg = f.debug_struct("Proxy");
        dbg.field("id", &format_args!("{:#x}", self.handle_id()))
            .field("adopt", &self.shared.adopt)
            .field("lock", &self.shared.lock);
        match tag {
            Ok(tag) => dbg.field("tag", &tag).finish(),
            Err(_) => dbg.finish_non_exhaustive(),
        }
    }
}
