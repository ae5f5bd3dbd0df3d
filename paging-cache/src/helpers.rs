use crate::{Cache, CachePath};

/// Path segment that selects the last item of a level.
pub const LAST: usize = usize::MAX;

/// Where a flat index currently lands in the cache tree.
#[derive(Debug)]
pub struct FlatIndexInfo<'a, T> {
    /// The deepest cache the flat index falls into.
    pub cache: &'a Cache<T>,
    /// Path of `cache` from the root.
    pub path: CachePath,
    /// The loaded item, `None` while its page has not arrived.
    pub item: Option<&'a T>,
    /// Index inside `cache`.
    pub index: usize,
    pub page: usize,
    /// Tree depth of `cache` (root = 0).
    pub level: usize,
}

impl<T> FlatIndexInfo<'_, T> {
    /// Per-level indexes of the row, root first. Feeding this to [`flat_index_by_path`]
    /// yields the flat index back.
    pub fn item_path(&self) -> CachePath {
        self.path.child(self.index)
    }
}

enum Step<'a, T> {
    Descend {
        parent_index: usize,
        sub_cache: &'a Cache<T>,
        level_index: usize,
    },
    Stay(usize),
}

fn step<T>(cache: &Cache<T>, mut level_index: usize) -> Step<'_, T> {
    for (index, sub_cache) in cache.sub_caches() {
        if level_index <= index {
            break;
        }
        if level_index <= index.saturating_add(sub_cache.effective_size()) {
            return Step::Descend {
                parent_index: index,
                sub_cache,
                level_index: level_index - index - 1,
            };
        }
        level_index -= sub_cache.effective_size();
    }
    Step::Stay(level_index)
}

/// Resolves `flat_index` to the deepest cache and local index it falls into.
///
/// Descends through every sub-cache whose row range contains the target. Flat indexes past the
/// effective size resolve to an index past the end of the root level, with no item.
pub fn flat_index_info<T>(root: &Cache<T>, flat_index: usize) -> FlatIndexInfo<'_, T> {
    let mut cache = root;
    let mut path = CachePath::root();
    let mut level_index = flat_index;

    loop {
        match step(cache, level_index) {
            Step::Descend {
                parent_index,
                sub_cache,
                level_index: next,
            } => {
                path.push(parent_index);
                cache = sub_cache;
                level_index = next;
            }
            Step::Stay(index) => {
                level_index = index;
                break;
            }
        }
    }

    FlatIndexInfo {
        cache,
        item: cache.item(level_index),
        index: level_index,
        page: cache.page_of(level_index),
        level: path.level(),
        path,
    }
}

/// Converts per-level indexes into a flat index.
///
/// Each segment is clamped into the size of its level ([`LAST`] picks the last item). The walk
/// stops early when the selected item has no sub-cache or its subtree is collapsed; remaining
/// segments are ignored. An empty path resolves like `[0]`.
pub fn flat_index_by_path<T>(root: &Cache<T>, path: &[usize]) -> usize {
    let mut segments = path.iter().copied();
    let mut level_index = segments.next().unwrap_or(0);
    let mut cache = root;
    let mut offset = 0usize;

    loop {
        let clamped = level_index.min(cache.size().saturating_sub(1));
        let flat_on_level = cache.get_flat_index(clamped);
        let sub_cache = cache
            .get_sub_cache(clamped)
            .filter(|sub_cache| sub_cache.effective_size() > 0);

        match (sub_cache, segments.next()) {
            (Some(sub_cache), Some(next)) => {
                offset = offset.saturating_add(flat_on_level).saturating_add(1);
                cache = sub_cache;
                level_index = next;
            }
            _ => return offset.saturating_add(flat_on_level),
        }
    }
}
