use crate::runtime::{gc::ObjectId, handle::Handle, value::Value};

/// Identities the marking pass starts from.
///
/// Built fresh for every collection from the active call stack, the global
/// environment, rooted temporaries, and task results not yet consumed.
#[derive(Debug, Clone, Default)]
pub struct RootSet {
    ids: Vec<ObjectId>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roots the object behind `value`; scalars are ignored.
    pub fn add_value(&mut self, value: &Value) {
        self.ids.extend(value.object_id());
    }

    pub fn add_values<'a>(&mut self, values: impl IntoIterator<Item = &'a Value>) {
        for value in values {
            self.add_value(value);
        }
    }

    pub fn add<T>(&mut self, handle: &Handle<T>) {
        self.ids.push(handle.id());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn ids(&self) -> &[ObjectId] {
        &self.ids
    }
}
