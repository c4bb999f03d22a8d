use std::collections::HashMap;
use std::num::NonZeroU32;

/// Interned string handle. Copyable, cheap to compare, resolvable back to
/// text through the [`Interner`] that produced it. The `NonZeroU32` payload
/// keeps `Option<Symbol>` the size of a `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Symbol(NonZeroU32);

impl Symbol {
    pub fn index(self) -> usize {
        self.0.get() as usize - 1
    }
}

/// Deduplicating string table. Source names and identifier text are
/// interned once and referenced by `Symbol` from tokens, AST nodes, and
/// diagnostics.
#[derive(Default)]
pub struct Interner {
    map: HashMap<String, Symbol>,
    entries: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Interner::default()
    }

    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.map.get(text) {
            return sym;
        }
        let id = NonZeroU32::new(self.entries.len() as u32 + 1).expect("interner overflow");
        let sym = Symbol(id);
        self.entries.push(text.to_string());
        self.map.insert(text.to_string(), sym);
        sym
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.entries[sym.index()]
    }

    /// Look up existing text without inserting.
    pub fn lookup(&self, text: &str) -> Option<Symbol> {
        self.map.get(text).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_twice_returns_same_symbol() {
        let mut interner = Interner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("alpha");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        let mut interner = Interner::new();
        let a = interner.intern("alpha");
        let b = interner.intern("beta");
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "alpha");
        assert_eq!(interner.resolve(b), "beta");
    }

    #[test]
    fn lookup_does_not_insert() {
        let mut interner = Interner::new();
        assert!(interner.lookup("gamma").is_none());
        let sym = interner.intern("gamma");
        assert_eq!(interner.lookup("gamma"), Some(sym));
    }

    #[test]
    fn option_symbol_is_word_sized() {
        assert_eq!(
            std::mem::size_of::<Option<Symbol>>(),
            std::mem::size_of::<u32>()
        );
    }
}
