use crate::runtime::{
    closure::Closure,
    environment::{Binding, Environment, ParentLink},
    error::RuntimeError,
    gc::{ObjectId, telemetry::ObjectKind},
    handle::{Handle, WeakHandle},
    value::{List, Map, Value},
};

/// Objects that expose their owning edges to the collector.
pub(crate) trait Trace {
    /// Pushes the identity of every object this one owns.
    fn trace(&self, out: &mut Vec<ObjectId>);

    /// Moves every owning edge out into `graveyard`.
    fn release(&mut self, graveyard: &mut Graveyard);
}

impl Trace for List {
    fn trace(&self, out: &mut Vec<ObjectId>) {
        out.extend(self.iter().filter_map(Value::object_id));
    }

    fn release(&mut self, graveyard: &mut Graveyard) {
        graveyard.values.append(self);
    }
}

impl Trace for Map {
    fn trace(&self, out: &mut Vec<ObjectId>) {
        out.extend(self.values().filter_map(Value::object_id));
    }

    fn release(&mut self, graveyard: &mut Graveyard) {
        graveyard
            .values
            .extend(self.drain().map(|(_, value)| value));
    }
}

impl Trace for Closure {
    fn trace(&self, out: &mut Vec<ObjectId>) {
        out.push(self.env.id());
    }

    // The only owning edge leads to an environment, which is released on its
    // own if it is unreachable too.
    fn release(&mut self, _graveyard: &mut Graveyard) {}
}

impl Trace for Environment {
    fn trace(&self, out: &mut Vec<ObjectId>) {
        for binding in self.bindings() {
            if let Binding::Value(value) = binding {
                out.extend(value.object_id());
            }
        }
        if let Some(ParentLink::Owning(parent)) = self.parent() {
            out.push(parent.id());
        }
    }

    fn release(&mut self, graveyard: &mut Graveyard) {
        let (bindings, parent) = self.take_contents();
        graveyard.bindings.extend(bindings);
        graveyard.parents.extend(parent);
    }
}

/// Owning edges taken out of unreachable objects during a sweep.
///
/// Dropping the graveyard is what actually destroys the condemned objects.
#[derive(Default)]
pub(crate) struct Graveyard {
    values: Vec<Value>,
    bindings: Vec<Binding>,
    parents: Vec<ParentLink>,
}

impl Graveyard {
    pub(crate) fn len(&self) -> usize {
        self.values.len() + self.bindings.len() + self.parents.len()
    }
}

/// Registry entry: a weak view of one registered object.
pub(crate) enum TrackedObject {
    List(WeakHandle<List>),
    Map(WeakHandle<Map>),
    Closure(WeakHandle<Closure>),
    Environment(WeakHandle<Environment>),
}

/// Temporary owning view of a registry entry.
pub(crate) enum LiveObject {
    List(Handle<List>),
    Map(Handle<Map>),
    Closure(Handle<Closure>),
    Environment(Handle<Environment>),
}

fn trace_weak<T: Trace>(weak: &WeakHandle<T>, out: &mut Vec<ObjectId>) -> Result<(), RuntimeError> {
    if let Some(handle) = weak.upgrade() {
        let state = handle.borrow()?;
        state.trace(out);
    }
    Ok(())
}

fn release_handle<T: Trace>(handle: &Handle<T>, graveyard: &mut Graveyard) -> Result<(), RuntimeError> {
    let mut state = handle.borrow_mut()?;
    state.release(graveyard);
    Ok(())
}

impl TrackedObject {
    pub(crate) fn kind(&self) -> ObjectKind {
        match self {
            TrackedObject::List(_) => ObjectKind::List,
            TrackedObject::Map(_) => ObjectKind::Map,
            TrackedObject::Closure(_) => ObjectKind::Closure,
            TrackedObject::Environment(_) => ObjectKind::Environment,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            TrackedObject::List(weak) => !weak.is_dangling(),
            TrackedObject::Map(weak) => !weak.is_dangling(),
            TrackedObject::Closure(weak) => !weak.is_dangling(),
            TrackedObject::Environment(weak) => !weak.is_dangling(),
        }
    }

    /// Pushes the owning edges of the object, if it is still alive.
    ///
    /// Fails when the object's access token is held.
    pub(crate) fn trace(&self, out: &mut Vec<ObjectId>) -> Result<(), RuntimeError> {
        match self {
            TrackedObject::List(weak) => trace_weak(weak, out),
            TrackedObject::Map(weak) => trace_weak(weak, out),
            TrackedObject::Closure(weak) => trace_weak(weak, out),
            TrackedObject::Environment(weak) => trace_weak(weak, out),
        }
    }

    pub(crate) fn upgrade(&self) -> Option<LiveObject> {
        match self {
            TrackedObject::List(weak) => weak.upgrade().map(LiveObject::List),
            TrackedObject::Map(weak) => weak.upgrade().map(LiveObject::Map),
            TrackedObject::Closure(weak) => weak.upgrade().map(LiveObject::Closure),
            TrackedObject::Environment(weak) => weak.upgrade().map(LiveObject::Environment),
        }
    }
}

impl LiveObject {
    pub(crate) fn id(&self) -> ObjectId {
        match self {
            LiveObject::List(h) => h.id(),
            LiveObject::Map(h) => h.id(),
            LiveObject::Closure(h) => h.id(),
            LiveObject::Environment(h) => h.id(),
        }
    }

    pub(crate) fn size(&self) -> usize {
        match self {
            LiveObject::List(h) => h.size(),
            LiveObject::Map(h) => h.size(),
            LiveObject::Closure(h) => h.size(),
            LiveObject::Environment(h) => h.size(),
        }
    }

    /// Moves the object's owning edges into `graveyard`.
    pub(crate) fn release(&self, graveyard: &mut Graveyard) -> Result<(), RuntimeError> {
        match self {
            LiveObject::List(h) => release_handle(h, graveyard),
            LiveObject::Map(h) => release_handle(h, graveyard),
            LiveObject::Closure(h) => release_handle(h, graveyard),
            LiveObject::Environment(h) => release_handle(h, graveyard),
        }
    }
}
