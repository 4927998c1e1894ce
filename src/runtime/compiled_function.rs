use std::rc::Rc;

/// Code reference produced by the external compiler.
///
/// The memory core never inspects the code itself; `entry` is whatever the
/// dispatcher uses to locate the function body.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub name: Option<Rc<str>>,
    pub parameters: Vec<Rc<str>>,
    pub entry: usize,
}

impl CompiledFunction {
    pub fn new(name: Option<&str>, parameters: &[&str], entry: usize) -> Self {
        Self {
            name: name.map(Rc::from),
            parameters: parameters.iter().map(|p| Rc::from(*p)).collect(),
            entry,
        }
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters.len()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}
