/// What a host should render for a flat index.
#[derive(Debug, PartialEq, Eq)]
pub enum RowState<'a, T> {
    Loaded { item: &'a T, level: usize },
    /// The page holding the row is requested but not yet delivered.
    Loading,
    /// The flat index is past the flattened size.
    OutOfRange,
}

impl<T> Clone for RowState<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RowState<'_, T> {}

impl<'a, T> RowState<'a, T> {
    pub fn item(&self) -> Option<&'a T> {
        match *self {
            Self::Loaded { item, .. } => Some(item),
            Self::Loading | Self::OutOfRange => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}
