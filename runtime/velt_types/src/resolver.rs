//! Layout resolution: pure decision function plus a global memo.
//!
//! [`resolve`] maps `(descriptor, placement, null policy, policy flags)` to
//! a concrete [`Layout`]. It is deterministic and has no side effects, so
//! the [`LayoutCache`] memoizes it racily: concurrent first resolutions may
//! both compute, but they compute the same answer and the first install
//! wins. Same double-checked pattern as the sharded type interner.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

use crate::descriptor::{DescriptorId, DescriptorTable};
use crate::layout::{Layout, LayoutKind, LayoutPolicy, NullPolicy, Placement, ATOMIC_UNIT_BYTES};

/// Resolve the layout for one value type in one placement context.
///
/// Resolution order:
///
/// 1. Empty types flatten unconditionally: there is nothing to tear. A
///    nullable empty slot still needs its marker byte, and a marker without
///    atomicity would violate the nullable-flat invariant, so it takes the
///    atomic path (or boxes when atomic flattening is disabled).
/// 2. If flattening is policy-disabled for the placement, or the type
///    opted out, the slot is boxed.
/// 3. A footprint within one atomic unit gets `FlatAtomic` for free.
///    Wider null-restricted slots prefer `FlatNonAtomic` when permitted,
///    falling back to the wide atomic path.
/// 4. Nullability always outranks a non-atomic flat layout: a nullable
///    slot is `FlatAtomic` or it is boxed.
///
/// Null-restricted violations are rejected at the storage layer, not here.
pub fn resolve(
    table: &DescriptorTable,
    id: DescriptorId,
    placement: Placement,
    null_policy: NullPolicy,
    policy: LayoutPolicy,
) -> Layout {
    let descriptor = table.get(id);

    if descriptor.is_empty() {
        return resolve_empty(id, placement, null_policy, policy);
    }

    if !policy.flattening_enabled(placement) || !descriptor.is_flattenable() {
        return Layout::boxed(id, null_policy);
    }

    let payload_bytes = descriptor.size_bytes();
    match null_policy {
        NullPolicy::Nullable => {
            if !policy.contains(LayoutPolicy::NULLABLE_FLATTENING)
                || !policy.contains(LayoutPolicy::ATOMIC_FLATTENING)
            {
                return Layout::boxed(id, null_policy);
            }
            let footprint = payload_bytes + 1;
            flat(id, LayoutKind::FlatAtomic, null_policy, footprint, Some(payload_bytes))
        }
        NullPolicy::NullRestricted => {
            let footprint = payload_bytes;
            if footprint <= ATOMIC_UNIT_BYTES && policy.contains(LayoutPolicy::ATOMIC_FLATTENING) {
                flat(id, LayoutKind::FlatAtomic, null_policy, footprint, None)
            } else if policy.contains(LayoutPolicy::NON_ATOMIC_FLATTENING) {
                flat(id, LayoutKind::FlatNonAtomic, null_policy, footprint, None)
            } else if policy.contains(LayoutPolicy::ATOMIC_FLATTENING) {
                flat(id, LayoutKind::FlatAtomic, null_policy, footprint, None)
            } else {
                Layout::boxed(id, null_policy)
            }
        }
    }
}

/// Empty types: footprint 0 when null-restricted, marker-only when nullable.
fn resolve_empty(
    id: DescriptorId,
    placement: Placement,
    null_policy: NullPolicy,
    policy: LayoutPolicy,
) -> Layout {
    match null_policy {
        NullPolicy::NullRestricted => Layout {
            descriptor: id,
            kind: LayoutKind::FlatNonAtomic,
            null_policy,
            footprint_bytes: 0,
            null_marker_offset: None,
            slot_words: 0,
        },
        NullPolicy::Nullable => {
            let flat_allowed = policy.flattening_enabled(placement)
                && policy.contains(LayoutPolicy::NULLABLE_FLATTENING)
                && policy.contains(LayoutPolicy::ATOMIC_FLATTENING);
            if flat_allowed {
                flat(id, LayoutKind::FlatAtomic, null_policy, 1, Some(0))
            } else {
                Layout::boxed(id, null_policy)
            }
        }
    }
}

fn flat(
    id: DescriptorId,
    kind: LayoutKind,
    null_policy: NullPolicy,
    footprint_bytes: u32,
    null_marker_offset: Option<u32>,
) -> Layout {
    let layout = Layout {
        descriptor: id,
        kind,
        null_policy,
        footprint_bytes,
        null_marker_offset,
        slot_words: footprint_bytes.div_ceil(ATOMIC_UNIT_BYTES),
    };
    layout.check_invariants();
    layout
}

/// Read-only collaborator query: the layout this type would get in this
/// placement under a null-restricted policy.
///
/// A Layout handed to a container never changes afterwards, so callers may
/// cache the answer alongside the container.
pub fn is_flattenable(
    cache: &LayoutCache,
    table: &DescriptorTable,
    id: DescriptorId,
    placement: Placement,
    policy: LayoutPolicy,
) -> Layout {
    cache.get_or_resolve(table, id, placement, NullPolicy::NullRestricted, policy)
}

/// Cache key: the full resolution context.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
struct ContextKey {
    descriptor: DescriptorId,
    placement: Placement,
    null_policy: NullPolicy,
    policy: LayoutPolicy,
}

/// Number of shards for the layout cache.
const NUM_SHARDS: usize = 16;

/// Global `(descriptor, context) -> Layout` memo.
///
/// # Thread Safety
///
/// Sharded `RwLock<FxHashMap>` with a double-checked install. `resolve` is
/// pure, so a lost race only wastes the duplicate computation; every caller
/// observes the same Layout for the same context.
pub struct LayoutCache {
    shards: [RwLock<FxHashMap<ContextKey, Layout>>; NUM_SHARDS],
}

impl LayoutCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            shards: std::array::from_fn(|_| RwLock::new(FxHashMap::default())),
        }
    }

    #[inline]
    fn shard_for(key: &ContextKey) -> usize {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    /// Look up the layout for a context, resolving and installing on miss.
    pub fn get_or_resolve(
        &self,
        table: &DescriptorTable,
        id: DescriptorId,
        placement: Placement,
        null_policy: NullPolicy,
        policy: LayoutPolicy,
    ) -> Layout {
        let key = ContextKey {
            descriptor: id,
            placement,
            null_policy,
            policy,
        };
        let shard = &self.shards[Self::shard_for(&key)];

        // Fast path: already resolved.
        {
            let guard = shard.read();
            if let Some(&layout) = guard.get(&key) {
                return layout;
            }
        }

        // Compute outside the lock; resolution is pure.
        let layout = resolve(table, id, placement, null_policy, policy);

        let mut guard = shard.write();
        // Double-check after acquiring the write lock: first install wins.
        if let Some(&existing) = guard.get(&key) {
            return existing;
        }
        tracing::debug!(
            descriptor = id.raw(),
            ?placement,
            ?null_policy,
            %layout,
            "resolved layout"
        );
        guard.insert(key, layout);
        layout
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// True if nothing has been resolved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}
