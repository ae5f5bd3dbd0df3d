/// Identity of an item, used to remember expansion across reloads and reordering.
pub trait ItemKey: core::hash::Hash + Eq + Clone + Send + Sync + 'static {}
impl<T: core::hash::Hash + Eq + Clone + Send + Sync + 'static> ItemKey for T {}
