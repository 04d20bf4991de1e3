//! Lexical scopes for variable bindings.
//!
//! Scopes form a stack linked from innermost to outermost. Each scope is
//! reference counted so interpreted functions can capture the chain that was
//! active when they were declared.
//!
//! Variables are shared slots. A slot either holds a value or has been moved
//! out of; reading a moved slot is an ownership error raised by the interpreter.
//!
//! Every scope carries a [`Liveness`] flag that is cleared when the scope is
//! exited. Ephemeral references keep a handle to the flag of the variable they
//! were created from and become invalid once it is cleared.

use crate::types::StaticType;
use crate::values::Value;
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;

/// Liveness flag of a scope.
#[derive(Debug, Clone)]
pub struct Liveness(Rc<Cell<bool>>);

impl Liveness {
    pub fn new() -> Self {
        Liveness(Rc::new(Cell::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    fn end(&self) {
        self.0.set(false);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Contents of a variable slot.
#[derive(Clone)]
pub enum Slot<'a> {
    Value(Value<'a>),
    Moved,
}

/// A named, mutable binding.
pub struct Variable<'a> {
    pub name: &'a str,
    pub is_constant: bool,
    /// Declared type, used to box assignments into optionals.
    pub ty: Option<StaticType<'a>>,
    /// Whether the binding owns its resource value. `self` does not.
    pub owns_value: bool,
    slot: RefCell<Slot<'a>>,
    liveness: Liveness,
}

impl<'a> Variable<'a> {
    pub fn slot(&self) -> Slot<'a> {
        self.slot.borrow().clone()
    }

    pub fn set(&self, value: Value<'a>) -> Slot<'a> {
        self.slot.replace(Slot::Value(value))
    }

    /// Take the value out, leaving the slot moved.
    pub fn take(&self) -> Slot<'a> {
        self.slot.replace(Slot::Moved)
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }
}

impl fmt::Debug for Variable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("is_constant", &self.is_constant)
            .field("moved", &matches!(*self.slot.borrow(), Slot::Moved))
            .finish()
    }
}

struct Frame<'a> {
    bindings: RefCell<HashMap<&'a str, Rc<Variable<'a>>>>,
    /// Declaration order, for deterministic exit checks.
    order: RefCell<Vec<Rc<Variable<'a>>>>,
    parent: Option<Scope<'a>>,
    liveness: Liveness,
}

/// Handle to the innermost scope of a chain.
#[derive(Clone)]
pub struct Scope<'a>(Rc<Frame<'a>>);

/// Options for a new binding.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub is_constant: bool,
    pub ty: Option<StaticType<'a>>,
    pub owns_value: bool,
}

impl Default for Binding<'_> {
    fn default() -> Self {
        Self {
            is_constant: true,
            ty: None,
            owns_value: true,
        }
    }
}

impl<'a> Scope<'a> {
    /// A scope with no parent.
    pub fn root() -> Self {
        Scope(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            parent: None,
            liveness: Liveness::new(),
        }))
    }

    /// A new innermost scope whose parent is `self`.
    pub fn push(&self) -> Self {
        Scope(Rc::new(Frame {
            bindings: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            parent: Some(self.clone()),
            liveness: Liveness::new(),
        }))
    }

    /// Look up a name, searching from innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<Rc<Variable<'a>>> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(variable) = current.0.bindings.borrow().get(name) {
                return Some(variable.clone());
            }
            scope = current.0.parent.as_ref();
        }
        None
    }

    /// Bind `name` in this scope, shadowing outer bindings.
    pub fn bind(&self, name: &'a str, value: Value<'a>, binding: Binding<'a>) -> Rc<Variable<'a>> {
        let variable = Rc::new(Variable {
            name,
            is_constant: binding.is_constant,
            ty: binding.ty,
            owns_value: binding.owns_value,
            slot: RefCell::new(Slot::Value(value)),
            liveness: self.0.liveness.clone(),
        });
        self.0.bindings.borrow_mut().insert(name, variable.clone());
        self.0.order.borrow_mut().push(variable.clone());
        variable
    }

    /// Variables bound directly in this scope, in declaration order.
    pub fn variables(&self) -> Vec<Rc<Variable<'a>>> {
        self.0.order.borrow().clone()
    }

    /// Mark the scope as exited, invalidating references into it.
    pub fn exit(&self) {
        self.0.liveness.end();
    }

    pub fn is_alive(&self) -> bool {
        self.0.liveness.is_alive()
    }
}
