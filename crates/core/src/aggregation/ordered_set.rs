use indexmap::IndexSet;

/// Insertion-ordered collection of distinct strings.
///
/// Iteration order is the order values were first inserted, so tables built
/// from it are reproducible run to run.
#[derive(Clone, Debug, Default)]
pub struct OrderedSet {
    items: IndexSet<String>,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`, returning `true` if it was not already present.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.items.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Value at insertion position `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.items.get_index(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.items.last().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.items.iter().cloned().collect()
    }
}

// `IndexSet` equality ignores order; two sequences are equal only when they
// were filled in the same order.
impl PartialEq for OrderedSet {
    fn eq(&self, other: &Self) -> bool {
        self.items.iter().eq(other.items.iter())
    }
}

impl Eq for OrderedSet {}

impl<S: Into<String>> Extend<S> for OrderedSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.items.extend(iter.into_iter().map(Into::into));
    }
}

impl<S: Into<String>> FromIterator<S> for OrderedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
