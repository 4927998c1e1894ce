//! Scoped variable bindings forming a lexical lookup chain.
//!
//! Two edges in the chain are deliberately weak:
//! - a call environment refers to its lexical parent (the closure's captured
//!   environment) weakly, because the active frame already owns that closure;
//! - a named function is bound into its defining environment weakly, because
//!   the closure owns that environment.

use std::{collections::HashMap, rc::Rc};

use log::warn;

use crate::runtime::{
    closure::Closure,
    error::RuntimeError,
    handle::{Handle, WeakHandle},
    value::Value,
};

/// What a name is bound to inside one scope.
#[derive(Debug, Clone)]
pub enum Binding {
    Value(Value),
    /// A function bound into the environment it captures.
    WeakFunction(WeakHandle<Closure>),
}

impl Binding {
    /// Produces the owning value for this binding. A function that has
    /// already been reclaimed resolves to `Nothing`.
    pub fn resolve(&self) -> Value {
        match self {
            Binding::Value(value) => value.clone(),
            Binding::WeakFunction(weak) => weak.upgrade().map_or(Value::Nothing, Value::Function),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ParentLink {
    Owning(Handle<Environment>),
    Weak(WeakHandle<Environment>),
}

impl ParentLink {
    pub fn resolve(&self) -> Option<Handle<Environment>> {
        match self {
            ParentLink::Owning(env) => Some(env.clone()),
            ParentLink::Weak(weak) => weak.upgrade(),
        }
    }

    pub fn is_weak(&self) -> bool {
        matches!(self, ParentLink::Weak(_))
    }
}

#[derive(Debug, Default)]
pub struct Environment {
    bindings: HashMap<Rc<str>, Binding>,
    parent: Option<ParentLink>,
}

impl Environment {
    pub fn new(parent: Option<ParentLink>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent,
        }
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    /// Defines `name` in this scope, shadowing any outer binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.bindings.insert(Rc::from(name), Binding::Value(value));
    }

    pub fn bind_weak_function(&mut self, name: &str, function: WeakHandle<Closure>) {
        self.bindings
            .insert(Rc::from(name), Binding::WeakFunction(function));
    }

    /// Replaces the local binding for `name` and hands back what it displaced.
    ///
    /// Assigning a weakly bound function to its own name keeps the weak edge,
    /// so `f = f` does not make the scope own the closure that owns it.
    pub(crate) fn rebind(&mut self, name: &str, value: Value) -> Option<Binding> {
        if let Some(Binding::WeakFunction(weak)) = self.bindings.get(name) {
            if let Value::Function(closure) = &value {
                if weak.points_to(closure) {
                    return Some(Binding::Value(value));
                }
            }
        }
        self.bindings.insert(Rc::from(name), Binding::Value(value))
    }

    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn binding_names(&self) -> Vec<Rc<str>> {
        let mut names: Vec<Rc<str>> = self.bindings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    /// Moves every binding and the parent link out of this scope.
    pub(crate) fn take_contents(&mut self) -> (Vec<Binding>, Option<ParentLink>) {
        let bindings = self.bindings.drain().map(|(_, binding)| binding).collect();
        (bindings, self.parent.take())
    }
}

impl Handle<Environment> {
    pub fn define(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.borrow_mut()?.define(name, value);
        Ok(())
    }

    /// Looks `name` up along the parent chain.
    ///
    /// A weak parent that can no longer be upgraded ends the walk.
    pub fn get(&self, name: &str) -> Result<Option<Value>, RuntimeError> {
        let mut current = self.clone();
        loop {
            let next = {
                let scope = current.borrow()?;
                if let Some(binding) = scope.binding(name) {
                    return Ok(Some(binding.resolve()));
                }
                match scope.parent() {
                    None => return Ok(None),
                    Some(link) => link.resolve(),
                }
            };
            match next {
                Some(parent) => current = parent,
                None => {
                    warn!("parent scope of {} was reclaimed while resolving '{}'", current.id(), name);
                    return Ok(None);
                }
            }
        }
    }

    /// Rebinds the nearest existing `name` along the chain.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let mut current = self.clone();
        loop {
            let next = {
                let mut scope = current.borrow_mut()?;
                if scope.contains_local(name) {
                    let displaced = scope.rebind(name, value);
                    drop(scope);
                    drop(displaced);
                    return Ok(());
                }
                scope.parent().and_then(ParentLink::resolve)
            };
            match next {
                Some(parent) => current = parent,
                None => return Err(RuntimeError::NameNotFound(Rc::from(name))),
            }
        }
    }

    pub fn contains(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.get(name)?.is_some())
    }
}
