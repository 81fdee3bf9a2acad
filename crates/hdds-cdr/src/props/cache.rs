// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide cache of finished per-type property trees.
//!
//! Lookups after the first one are a single sharded read on a dashmap. Builds
//! are serialized by a reentrant lock: building a type recurses into the
//! builds of its member types on the same thread. A tree is published only
//! once it is finished, so concurrent readers never see a partial one.
//!
//! Self-recursive types (a struct holding an `External<Self>`) are not
//! supported: their build never terminates.

use dashmap::DashMap;
use parking_lot::{const_reentrant_mutex, ReentrantMutex};
use std::any::{type_name, TypeId};
use std::sync::{Arc, OnceLock};

use super::EntityProperties;
use crate::codec::CdrValue;

static TYPE_PROPS: OnceLock<DashMap<TypeId, Arc<EntityProperties>>> = OnceLock::new();
static BUILD_LOCK: ReentrantMutex<()> = const_reentrant_mutex(());

fn registry() -> &'static DashMap<TypeId, Arc<EntityProperties>> {
    TYPE_PROPS.get_or_init(DashMap::new)
}

fn lookup(id: &TypeId) -> Option<Arc<EntityProperties>> {
    registry().get(id).map(|entry| Arc::clone(entry.value()))
}

/// Finished property tree of `T`, built on first use.
pub fn get_type_props<T: CdrValue + 'static>() -> Arc<EntityProperties> {
    let id = TypeId::of::<T>();
    if let Some(props) = lookup(&id) {
        return props;
    }

    let _guard = BUILD_LOCK.lock();
    // Another thread may have published it while we waited.
    if let Some(props) = lookup(&id) {
        return props;
    }

    let mut props = T::type_props();
    props.finish(true);
    let props = Arc::new(props);
    registry().insert(id, Arc::clone(&props));
    log::debug!(
        "[cdr::props] built properties for {} ({} members, {} keys)",
        type_name::<T>(),
        props.members_by_seq().len().saturating_sub(1),
        props.keys_by_seq().len().saturating_sub(1)
    );
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_same_tree_returned() {
        let first = get_type_props::<u32>();
        let second = get_type_props::<u32>();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_primitive);
    }

    #[test]
    fn test_concurrent_first_use_publishes_once() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(get_type_props::<Vec<u16>>))
            .collect();
        let trees: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("builder thread panicked"))
            .collect();
        for tree in &trees[1..] {
            assert!(Arc::ptr_eq(&trees[0], tree));
        }
    }
}
