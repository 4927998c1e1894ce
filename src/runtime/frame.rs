use std::rc::Rc;

use crate::runtime::{closure::Closure, environment::Environment, handle::Handle};

/// One active function call.
///
/// The frame owns the closure being executed, which keeps the closure's
/// captured environment alive for the call env's weak parent link. Closures
/// defined while the frame is active are retained here until it returns.
#[derive(Debug)]
pub struct Frame {
    pub closure: Handle<Closure>,
    pub env: Handle<Environment>,
    pub retained: Vec<Handle<Closure>>,
}

impl Frame {
    pub fn new(closure: Handle<Closure>, env: Handle<Environment>) -> Self {
        Self {
            closure,
            env,
            retained: Vec::new(),
        }
    }

    pub fn name(&self) -> Rc<str> {
        match self.closure.borrow() {
            Ok(closure) => Rc::from(closure.function.display_name()),
            Err(_) => Rc::from("<busy>"),
        }
    }

    pub fn retain(&mut self, closure: Handle<Closure>) {
        self.retained.push(closure);
    }
}
