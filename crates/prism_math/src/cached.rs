/// A derived value paired with a dirty bit.
///
/// Writers call [`Cached::invalidate`]; readers call [`Cached::get_or_update`]
/// with the pure function that rebuilds the value. Rebuilding needs `&mut`,
/// so a `Cached` is never refreshed behind a shared reference.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    value: T,
    dirty: bool,
}

impl<T> Cached<T> {
    /// A cache that rebuilds on first read.
    pub fn dirty(placeholder: T) -> Self {
        Self {
            value: placeholder,
            dirty: true,
        }
    }

    /// A cache already holding an up-to-date value.
    pub fn clean(value: T) -> Self {
        Self { value, dirty: false }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Current value, rebuilt with `update` first if dirty.
    pub fn get_or_update(&mut self, update: impl FnOnce() -> T) -> &T {
        if self.dirty {
            self.value = update();
            self.dirty = false;
        }
        &self.value
    }

    /// Store a freshly computed value and mark the cache clean.
    pub fn set(&mut self, value: T) -> &T {
        self.value = value;
        self.dirty = false;
        &self.value
    }

    /// The cached value if it is up to date.
    pub fn peek(&self) -> Option<&T> {
        (!self.dirty).then_some(&self.value)
    }
}
