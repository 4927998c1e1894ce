use std::{collections::HashMap, fmt, rc::Rc};

use crate::runtime::{
    builtin_function::BuiltinFunction, closure::Closure, gc::ObjectId, handle::Handle,
    task::TaskId,
};

/// Ordered, mutable, shared sequence.
pub type List = Vec<Value>;

/// Keyed, mutable, shared record.
pub type Map = HashMap<Rc<str>, Value>;

/// Runtime value handed between the dispatcher, environments, and natives.
///
/// ## Memory Management Model
///
/// Scalars and text are held inline (`Rc<str>` for text, which can never
/// form a cycle). Lists, maps and closures are reached only through owning
/// [`Handle`]s registered with the collector, so every composite has a stable
/// identity and can be traced.
///
/// A `Value` never carries a weak handle. Weak edges exist only inside
/// environments (see [`crate::runtime::environment::Binding`]) and are
/// resolved before a value is handed out, so natives only ever see owning
/// handles.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit floating point number.
    Number(f64),
    /// Immutable shared text.
    Text(Rc<str>),
    Boolean(bool),
    /// Absence of value.
    Nothing,
    List(Handle<List>),
    Map(Handle<Map>),
    /// User-defined function with its captured environment.
    Function(Handle<Closure>),
    /// Host-registered native callable.
    NativeFunction(BuiltinFunction),
    /// Handle to an asynchronous operation owned by the host.
    Task(TaskId),
}

impl Value {
    pub fn text(s: &str) -> Self {
        Value::Text(Rc::from(s))
    }

    /// Returns the canonical runtime type label used in diagnostics and builtins.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
            Value::Boolean(_) => "Boolean",
            Value::Nothing => "Nothing",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Function(_) => "Function",
            Value::NativeFunction(_) => "NativeFunction",
            Value::Task(_) => "Task",
        }
    }

    /// `Nothing`, `false`, zero, empty text and empty collections are falsy.
    ///
    /// A collection whose access token is currently held counts as truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Nothing => false,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(list) => list.borrow().map(|l| !l.is_empty()).unwrap_or(true),
            Value::Map(map) => map.borrow().map(|m| !m.is_empty()).unwrap_or(true),
            Value::Function(_) | Value::NativeFunction(_) | Value::Task(_) => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    /// Identity of the registered object this value refers to, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Value::List(h) => Some(h.id()),
            Value::Map(h) => Some(h.id()),
            Value::Function(h) => Some(h.id()),
            _ => None,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<ObjectId>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Value::Nothing => write!(f, "nothing"),
            Value::NativeFunction(native) => write!(f, "<native {}>", native.name),
            Value::Task(id) => write!(f, "<task {}>", id),
            Value::Function(closure) => match closure.borrow() {
                Ok(closure) => write!(f, "<action {}>", closure.function.display_name()),
                Err(_) => write!(f, "<action>"),
            },
            Value::List(list) => {
                if open.contains(&list.id()) {
                    return write!(f, "[...]");
                }
                let Ok(items) = list.borrow() else {
                    return write!(f, "[...]");
                };
                open.push(list.id());
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.render(f, open)?;
                }
                open.pop();
                write!(f, "]")
            }
            Value::Map(map) => {
                if open.contains(&map.id()) {
                    return write!(f, "{{...}}");
                }
                let Ok(entries) = map.borrow() else {
                    return write!(f, "{{...}}");
                };
                open.push(map.id());
                let mut keys: Vec<&Rc<str>> = entries.keys().collect();
                keys.sort();
                write!(f, "{{")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    entries[key].render(f, open)?;
                }
                open.pop();
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, &mut Vec::new())
    }
}

/// Scalars compare by value, composites by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Nothing, Value::Nothing) => true,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => a == b,
            (Value::Task(a), Value::Task(b)) => a == b,
            _ => false,
        }
    }
}
