use std::collections::HashMap;

#[derive(Clone, Debug)]
struct Scope<B> {
    bindings: HashMap<String, B>,
}

impl<B> Scope<B> {
    fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

/// Lexical scope stack shared by the interpreter (values) and the compiler
/// (storage slots). Index 0 is the outermost scope and is never popped.
#[derive(Clone, Debug)]
pub struct ScopeStack<B> {
    scopes: Vec<Scope<B>>,
}

impl<B> Default for ScopeStack<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> ScopeStack<B> {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
        if self.scopes.is_empty() {
            self.scopes.push(Scope::new());
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn innermost(&self) -> usize {
        self.scopes.len() - 1
    }

    pub fn lookup(&self, name: &str) -> Option<&B> {
        self.resolve(name).map(|(_, binding)| binding)
    }

    /// Like [`ScopeStack::lookup`], also returning the index of the owning scope.
    pub fn resolve(&self, name: &str) -> Option<(usize, &B)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, scope)| scope.bindings.get(name).map(|binding| (index, binding)))
    }

    /// Overwrites the binding in the nearest scope that already owns `name`,
    /// otherwise creates it in the innermost scope. Returns the scope index written.
    pub fn assign(&mut self, name: &str, binding: B) -> usize {
        let index = self
            .resolve(name)
            .map(|(index, _)| index)
            .unwrap_or_else(|| self.innermost());
        self.insert_at(index, name, binding);
        index
    }

    pub fn insert_at(&mut self, index: usize, name: &str, binding: B) {
        let index = index.min(self.innermost());
        self.scopes[index].bindings.insert(name.to_string(), binding);
    }

    pub fn get_at(&self, index: usize, name: &str) -> Option<&B> {
        self.scopes.get(index).and_then(|scope| scope.bindings.get(name))
    }

    pub fn contains_in_innermost(&self, name: &str) -> bool {
        self.get_at(self.innermost(), name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward_and_prefers_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.assign("x", 1);
        scopes.push_scope();
        assert_eq!(scopes.lookup("x"), Some(&1));
        scopes.insert_at(scopes.innermost(), "x", 2);
        assert_eq!(scopes.resolve("x"), Some((1, &2)));
        scopes.pop_scope();
        assert_eq!(scopes.lookup("x"), Some(&1));
    }

    #[test]
    fn assign_overwrites_owner_else_creates_innermost() {
        let mut scopes = ScopeStack::new();
        scopes.assign("outer", 1);
        scopes.push_scope();
        scopes.push_scope();
        assert_eq!(scopes.assign("outer", 5), 0);
        assert_eq!(scopes.assign("inner", 7), 2);
        scopes.pop_scope();
        assert_eq!(scopes.lookup("inner"), None);
        scopes.pop_scope();
        assert_eq!(scopes.lookup("outer"), Some(&5));
    }

    #[test]
    fn base_scope_survives_extra_pops() {
        let mut scopes: ScopeStack<i32> = ScopeStack::new();
        scopes.pop_scope();
        scopes.pop_scope();
        assert_eq!(scopes.depth(), 1);
        scopes.assign("x", 3);
        assert!(scopes.contains_in_innermost("x"));
    }
}
