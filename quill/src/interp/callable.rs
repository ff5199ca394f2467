//! Functions, classes and instances

use super::env::{child_env, EnvRef};
use super::error::InterpResult;
use super::eval::Interpreter;
use super::native::NativeCapability;
use super::Value;
use crate::ast::FunctionDecl;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Anything a call expression can invoke
#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Native(Rc<dyn NativeCapability>),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Function(f) => f.name(),
            Callable::Class(c) => &c.name,
            Callable::Native(n) => n.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(f) => f.arity(),
            Callable::Class(c) => c.arity(),
            Callable::Native(n) => n.arity(),
        }
    }

    /// Run the callable. The caller has already checked the arity and pushed
    /// the call's frame.
    pub fn invoke(
        &self,
        call_name: &str,
        interp: &mut Interpreter,
        args: Vec<Value>,
    ) -> InterpResult<Value> {
        match self {
            Callable::Function(f) => interp.call_function(f, args),
            Callable::Class(c) => c.instantiate(call_name, interp, args),
            Callable::Native(n) => interp.call_native(n.name(), &args),
        }
    }

    /// Identity comparison
    pub fn same_as(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(a), Callable::Function(b)) => Rc::ptr_eq(a, b),
            (Callable::Class(a), Callable::Class(b)) => Rc::ptr_eq(a, b),
            (Callable::Native(a), Callable::Native(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

/// User function closing over the environment it was declared in
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: EnvRef,
    /// `init` methods hand back the receiver instead of their return value
    pub is_initializer: bool,
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Function {
            decl,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name.node
    }

    pub fn arity(&self) -> usize {
        self.decl.arity()
    }

    /// Method bound to `receiver`: a fresh scope holding `this` between the
    /// method's closure and its parameters.
    pub fn bind(&self, receiver: Value) -> Function {
        let env = child_env(&self.closure);
        env.borrow_mut().define("this", receiver);
        Function::new(Rc::clone(&self.decl), env, self.is_initializer)
    }
}

/// User class with an optional single superclass
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    pub methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub const INITIALIZER: &'static str = "init";

    /// Method declared on this class or the nearest superclass declaring it
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        self.methods.get(name).cloned().or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }

    /// Constructor arity: the initializer's, or zero without one
    pub fn arity(&self) -> usize {
        self.find_method(Self::INITIALIZER)
            .map_or(0, |init| init.arity())
    }

    fn instantiate(
        self: &Rc<Self>,
        call_name: &str,
        interp: &mut Interpreter,
        args: Vec<Value>,
    ) -> InterpResult<Value> {
        let instance = Value::Instance(Rc::new(RefCell::new(Instance::new(Rc::clone(self)))));
        if let Some(init) = self.find_method(Self::INITIALIZER) {
            let bound = Rc::new(init.bind(instance.clone()));
            Callable::Function(bound).invoke(call_name, interp, args)?;
        }
        Ok(instance)
    }
}

/// Object created by calling a class
pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Instance {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Property lookup: fields shadow methods; methods come back bound
pub fn get_property(instance: &Rc<RefCell<Instance>>, name: &str) -> Option<Value> {
    if let Some(value) = instance.borrow().field(name) {
        return Some(value);
    }
    let method = instance.borrow().class.find_method(name)?;
    let bound = method.bind(Value::Instance(Rc::clone(instance)));
    Some(Value::Callable(Callable::Function(Rc::new(bound))))
}
