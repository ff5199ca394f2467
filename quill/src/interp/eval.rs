//! Statement execution and expression evaluation

use super::callable::{get_property, Callable, Class, Function};
use super::env::{child_env, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::frame::StackFrames;
use super::native::NativeRegistry;
use super::output::OutputSink;
use super::value::Value;
use crate::ast::{
    BinOp, ClassDecl, Expr, ExprId, Literal, LogicalOp, Program, Span, Spanned, Stmt, UnOp,
};
use crate::config::{BreakPolicy, NativeFaultPolicy, RuntimeConfig};
use crate::resolver::Resolution;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Stack growth parameters for deep recursion
const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Frame active while top-level code runs
const GLOBAL_FRAME: &str = "__global__";

/// Function or class the program starts from when declared
const ENTRY_POINT: &str = "main";

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fall through to the next statement
    Normal,
    /// Unwind to the nearest call boundary with a value
    Return(Value),
    /// Unwind to the innermost loop
    Break,
}

/// The interpreter
pub struct Interpreter {
    /// Global environment, created per interpreter
    globals: EnvRef,
    /// One frame per active call
    frames: StackFrames,
    /// Resolver distances keyed by node identity
    locals: HashMap<ExprId, usize>,
    /// Call nodes dispatched to natives by name
    native_calls: HashSet<ExprId>,
    natives: NativeRegistry,
    config: RuntimeConfig,
    output: OutputSink,
}

impl Interpreter {
    /// Interpreter with default settings, every native, writing to stdout
    pub fn new() -> Self {
        Self::with_config(
            RuntimeConfig::default(),
            NativeRegistry::with_defaults(),
            OutputSink::Stdout,
        )
    }

    pub fn with_config(config: RuntimeConfig, natives: NativeRegistry, output: OutputSink) -> Self {
        let globals = Environment::new().into_ref();
        for native in natives.iter() {
            globals.borrow_mut().define(
                native.name().to_string(),
                Value::Callable(Callable::Native(Rc::clone(native))),
            );
        }
        Interpreter {
            globals,
            frames: StackFrames::new(),
            locals: HashMap::new(),
            native_calls: HashSet::new(),
            natives,
            config,
            output,
        }
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Globals declared by scripts (natives excluded unless redefined)
    pub fn global_names(&self) -> Vec<String> {
        self.globals
            .borrow()
            .bindings()
            .iter()
            .filter(|(_, value)| !matches!(value, Value::Callable(Callable::Native(_))))
            .map(|(name, _)| name.clone())
            .collect()
    }

    // ============================================
    // Resolver contract
    // ============================================

    /// Record the scope distance of a variable or assignment node.
    /// The first record for a node wins.
    pub fn resolve(&mut self, id: ExprId, distance: usize) {
        self.locals.entry(id).or_insert(distance);
    }

    /// Mark a call node as a direct native dispatch
    pub fn mark_native_call(&mut self, id: ExprId) {
        self.native_calls.insert(id);
    }

    pub fn apply_resolution(&mut self, resolution: &Resolution) {
        for (&id, &distance) in &resolution.locals {
            self.resolve(id, distance);
        }
        for &id in &resolution.native_calls {
            self.mark_native_call(id);
        }
    }

    pub fn resolved_distance(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    // ============================================
    // Program entry
    // ============================================

    /// Run a program. With a zero-parameter `main` function (or a `main`
    /// class) only declarations are executed before calling it; otherwise
    /// every top-level statement runs in order.
    pub fn interpret(&mut self, program: &Program) -> InterpResult<()> {
        if program.stmts.iter().any(|stmt| is_entry_point(&stmt.node)) {
            self.with_global_frame(|interp| interp.run_entry_point(program))
        } else {
            self.execute(program)
        }
    }

    /// Run every top-level statement in order (script mode, REPL input)
    pub fn execute(&mut self, program: &Program) -> InterpResult<()> {
        self.with_global_frame(|interp| {
            let globals = Rc::clone(&interp.globals);
            for stmt in &program.stmts {
                if !matches!(interp.exec_stmt(stmt, &globals)?, Flow::Normal) {
                    tracing::debug!(span = %stmt.span, "top-level return ends the script");
                    break;
                }
            }
            Ok(())
        })
    }

    /// Evaluate a single expression against the globals (for the REPL)
    pub fn eval_expr(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        self.with_global_frame(|interp| {
            let globals = Rc::clone(&interp.globals);
            interp.eval(expr, &globals)
        })
    }

    fn with_global_frame<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> InterpResult<T>,
    ) -> InterpResult<T> {
        self.frames.clear();
        self.frames.push(GLOBAL_FRAME);
        let result = f(self);
        self.frames.clear();
        result
    }

    fn run_entry_point(&mut self, program: &Program) -> InterpResult<()> {
        let globals = Rc::clone(&self.globals);
        for stmt in &program.stmts {
            if stmt.node.is_declaration() {
                self.exec_stmt(stmt, &globals)?;
            } else {
                tracing::warn!(span = %stmt.span, "top-level statement ignored; execution starts at main()");
            }
        }
        let main = self.lookup_global(ENTRY_POINT, &globals)?;
        self.in_frame(ENTRY_POINT, |interp| {
            interp.invoke_value(ENTRY_POINT, main, Vec::new())
        })?;
        Ok(())
    }

    // ============================================
    // Statements
    // ============================================

    fn exec_stmt(&mut self, stmt: &Spanned<Stmt>, env: &EnvRef) -> InterpResult<Flow> {
        match &stmt.node {
            Stmt::Block(stmts) => {
                let block_env = child_env(env);
                self.exec_block(stmts, &block_env)
            }
            Stmt::Var { name, init } => {
                let value = match init {
                    Some(init) => self.eval(init, env)?,
                    None => Value::Nothing,
                };
                self.frames.add_variable(name.node.clone(), value.clone());
                env.borrow_mut().define(name.node.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(env), false);
                env.borrow_mut().define(
                    decl.name.node.clone(),
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }
            Stmt::Class(decl) => self.exec_class(decl, env),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env)?.is_truthy() {
                    self.exec_stmt(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Print(expr) => {
                self.print(expr.as_ref(), env, false)?;
                Ok(Flow::Normal)
            }
            Stmt::PrintLine(expr) => {
                self.print(expr.as_ref(), env, true)?;
                Ok(Flow::Normal)
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Nothing,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Break => Ok(self.break_flow()),
            Stmt::While { cond, body } => {
                while self.eval(cond, env)?.is_truthy() {
                    match self.exec_stmt(body, env)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Expression(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run statements in `env`, stopping at the first non-normal flow
    fn exec_block(&mut self, stmts: &[Spanned<Stmt>], env: &EnvRef) -> InterpResult<Flow> {
        for stmt in stmts {
            let flow = self.exec_stmt(stmt, env)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    /// What `break` does. This is the only place its reach is decided.
    pub fn break_flow(&self) -> Flow {
        match self.config.break_policy {
            BreakPolicy::Function => Flow::Return(Value::Nothing),
            BreakPolicy::Loop => Flow::Break,
        }
    }

    /// Only numbers, strings and booleans are written; anything else
    /// (including a missing operand) writes nothing.
    fn print(&mut self, expr: Option<&Spanned<Expr>>, env: &EnvRef, newline: bool) -> InterpResult<()> {
        let Some(expr) = expr else {
            return Ok(());
        };
        let value = self.eval(expr, env)?;
        if !value.is_printable() {
            tracing::debug!(kind = value.type_name(), "skipping non-printable value");
            return Ok(());
        }
        let text = value.to_string();
        if newline {
            self.output.write_line(&text);
        } else {
            self.output.write(&text);
        }
        Ok(())
    }

    fn exec_class(&mut self, decl: &ClassDecl, env: &EnvRef) -> InterpResult<Flow> {
        let superclass = match &decl.superclass {
            Some(expr) => match self.eval(expr, env)? {
                Value::Class(class) => Some(class),
                other => {
                    return Err(RuntimeError::type_error(format!(
                        "superclass of {} must be a class, got {}",
                        decl.name.node,
                        other.type_name()
                    ))
                    .at(expr.span));
                }
            },
            None => None,
        };

        let name = decl.name.node.clone();
        env.borrow_mut().define(name.clone(), Value::Nothing);

        let method_env = match &superclass {
            Some(superclass) => {
                let super_env = child_env(env);
                super_env
                    .borrow_mut()
                    .define("super", Value::Class(Rc::clone(superclass)));
                super_env
            }
            None => Rc::clone(env),
        };

        let methods = decl
            .methods
            .iter()
            .map(|method| {
                let is_initializer = method.name.node == Class::INITIALIZER;
                let function = Function::new(Rc::clone(method), Rc::clone(&method_env), is_initializer);
                (method.name.node.clone(), Rc::new(function))
            })
            .collect();

        let class = Value::Class(Rc::new(Class {
            name: name.clone(),
            superclass,
            methods,
        }));
        self.frames.add_variable(name.clone(), class.clone());
        env.borrow_mut().define(name, class);
        Ok(Flow::Normal)
    }

    // ============================================
    // Expressions
    // ============================================

    /// Evaluate an expression with automatic stack growth for deep recursion
    fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
            .map_err(|e| e.at(expr.span))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        match &expr.node {
            Expr::Literal(lit) => Ok(literal_value(lit)),
            Expr::Grouping(inner) => self.eval(inner, env),
            Expr::Variable { id, name } => self.lookup_variable(name, *id, env),
            Expr::Assign { id, name, value } => {
                let value = self.eval(value, env)?;
                self.assign_variable(name, *id, value.clone(), env)?;
                Ok(value)
            }
            Expr::Binary { left, op, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary_op(*op, &left, &right)
            }
            Expr::Logical { left, op, right } => {
                let left = self.eval(left, env)?;
                match op {
                    LogicalOp::Or if left.is_truthy() => Ok(left),
                    LogicalOp::And if !left.is_truthy() => Ok(left),
                    _ => self.eval(right, env),
                }
            }
            Expr::Unary { op, expr: operand } => {
                let value = self.eval(operand, env)?;
                match op {
                    UnOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(n.wrapping_neg())),
                        other => Err(RuntimeError::type_error(format!(
                            "cannot negate {}",
                            other.type_name()
                        ))),
                    },
                    UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            Expr::Call { id, callee, args } => self.eval_call(*id, callee, args, expr.span, env),
            Expr::Get { object, name } => {
                let object = self.eval(object, env)?;
                self.property(&object, &name.node)
            }
            Expr::Set {
                object,
                name,
                value,
            } => match self.eval(object, env)? {
                Value::Instance(instance) => {
                    let value = self.eval(value, env)?;
                    instance.borrow_mut().set_field(name.node.clone(), value.clone());
                    Ok(value)
                }
                other => Err(RuntimeError::type_error(format!(
                    "only instances have fields, got {}",
                    other.type_name()
                ))),
            },
            Expr::This => env
                .borrow()
                .get("this")
                .ok_or_else(|| RuntimeError::undefined_variable("this")),
            Expr::Super { method } => self.super_method(&method.node, env),
        }
    }

    /// Frame first, then the resolved distance, then the globals
    fn lookup_variable(&self, name: &str, id: ExprId, env: &EnvRef) -> InterpResult<Value> {
        if let Some(value) = self.frames.try_get(name) {
            return Ok(value);
        }
        match self.locals.get(&id) {
            Some(&distance) => env.borrow().get_at(distance, name),
            None => self.lookup_global(name, env),
        }
    }

    fn lookup_global(&self, name: &str, env: &EnvRef) -> InterpResult<Value> {
        if let Some(value) = self.globals.borrow().get(name) {
            return Ok(value);
        }
        let mut candidates = env.borrow().visible_names();
        candidates.extend(self.globals.borrow().bindings().keys().cloned());
        Err(RuntimeError::undefined_variable_near(
            name,
            candidates.iter().map(String::as_str),
        ))
    }

    /// Same precedence as reads. A frame hit also writes through to the
    /// lexical binding when one exists, so closures see the update.
    fn assign_variable(&mut self, name: &str, id: ExprId, value: Value, env: &EnvRef) -> InterpResult<()> {
        let in_frame = self.frames.update_variable(name, value.clone());
        let lexical = match self.locals.get(&id) {
            Some(&distance) => env.borrow_mut().assign_at(distance, name, value),
            None => {
                if self.globals.borrow_mut().assign(name, value) {
                    Ok(())
                } else {
                    self.lookup_global(name, env).map(|_| ())
                }
            }
        };
        match lexical {
            Err(_) if in_frame => Ok(()),
            other => other,
        }
    }

    fn property(&self, object: &Value, name: &str) -> InterpResult<Value> {
        match object {
            Value::Instance(instance) => {
                get_property(instance, name).ok_or_else(|| {
                    RuntimeError::undefined_property_near(name, instance.borrow().field_names())
                })
            }
            other => Err(RuntimeError::type_error(format!(
                "only instances have properties, got {}",
                other.type_name()
            ))),
        }
    }

    /// `super.method`, bound to the current receiver
    fn super_method(&self, method: &str, env: &EnvRef) -> InterpResult<Value> {
        let superclass = match env.borrow().get("super") {
            Some(Value::Class(class)) => class,
            _ => return Err(RuntimeError::undefined_variable("super")),
        };
        let receiver = env
            .borrow()
            .get("this")
            .ok_or_else(|| RuntimeError::undefined_variable("this"))?;
        let function = superclass
            .find_method(method)
            .ok_or_else(|| RuntimeError::undefined_property(method))?;
        Ok(Value::Callable(Callable::Function(Rc::new(
            function.bind(receiver),
        ))))
    }

    // ============================================
    // Calls
    // ============================================

    fn eval_call(
        &mut self,
        id: ExprId,
        callee: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        span: Span,
        env: &EnvRef,
    ) -> InterpResult<Value> {
        match &callee.node {
            Expr::Get { object, name } => {
                let receiver = self.eval(object, env)?;
                let method = self.property(&receiver, &name.node).map_err(|e| e.at(callee.span))?;
                self.in_frame(&name.node, |interp| {
                    let values = interp.eval_arguments(args, env)?;
                    interp.invoke_value(&name.node, method, values)
                })
                .map_err(|e| e.at(span))
            }
            Expr::Super { method } => {
                let function = self.super_method(&method.node, env).map_err(|e| e.at(callee.span))?;
                self.in_frame(&method.node, |interp| {
                    let values = interp.eval_arguments(args, env)?;
                    interp.invoke_value(&method.node, function, values)
                })
                .map_err(|e| e.at(span))
            }
            Expr::Variable { id: callee_id, name } => self
                .in_frame(name, |interp| {
                    let values = interp.eval_arguments(args, env)?;
                    if interp.native_calls.contains(&id) {
                        return interp.call_native(name, &values);
                    }
                    let callee = interp
                        .lookup_variable(name, *callee_id, env)
                        .map_err(|e| e.at(callee.span))?;
                    interp.invoke_value(name, callee, values)
                })
                .map_err(|e| e.at(span)),
            _ => Err(RuntimeError::type_error("only named functions and methods can be called")
                .at(callee.span)),
        }
    }

    /// Evaluate arguments left to right under the callee's (already pushed)
    /// frame, then bind each Variable argument in that frame under its own
    /// name.
    fn eval_arguments(&mut self, args: &[Spanned<Expr>], env: &EnvRef) -> InterpResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        let mut named = Vec::new();
        for arg in args {
            let value = self.eval(arg, env)?;
            if let Expr::Variable { name, .. } = &arg.node {
                named.push((name.clone(), value.clone()));
            }
            values.push(value);
        }
        self.frames.add_variables(named);
        Ok(values)
    }

    /// Arity-check and invoke `callee` under the current frame
    fn invoke_value(&mut self, call_name: &str, callee: Value, args: Vec<Value>) -> InterpResult<Value> {
        let callable = callee.as_callable().ok_or_else(|| {
            RuntimeError::type_error(format!(
                "{call_name} is not callable ({})",
                callee.type_name()
            ))
        })?;
        if args.len() != callable.arity() {
            return Err(RuntimeError::arity_mismatch(
                call_name,
                callable.arity(),
                args.len(),
            ));
        }
        callable.invoke(call_name, self, args)
    }

    /// Push a frame, run `f`, pop the frame on every exit path
    fn in_frame<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Self) -> InterpResult<T>,
    ) -> InterpResult<T> {
        let limit = self.config.max_call_depth;
        if self.frames.depth() > limit {
            return Err(RuntimeError::stack_overflow(limit));
        }
        self.frames.push(name);
        tracing::debug!(call = name, depth = self.frames.depth(), "enter");
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || f(self));
        self.frames.pop();
        tracing::debug!(call = name, ok = result.is_ok(), "exit");
        result
    }

    /// Run a user function's body in a fresh environment under its closure
    pub fn call_function(&mut self, function: &Function, args: Vec<Value>) -> InterpResult<Value> {
        let env = child_env(&function.closure);
        for (param, arg) in function.decl.params.iter().zip(args) {
            env.borrow_mut().define(param.node.clone(), arg);
        }

        let flow = self.exec_block(&function.decl.body, &env)?;

        if function.is_initializer {
            return function.closure.borrow().get_at(0, "this");
        }
        match flow {
            Flow::Return(value) => Ok(value),
            // a loop-scoped `break` outside any loop ends the call
            Flow::Normal | Flow::Break => Ok(Value::Nothing),
        }
    }

    /// Native dispatch by name. Faults become values or errors per config.
    pub fn call_native(&mut self, name: &str, args: &[Value]) -> InterpResult<Value> {
        match self.natives.dispatch(name, args) {
            Ok(value) => Ok(value),
            Err(fault) => match self.config.native_faults {
                NativeFaultPolicy::Value => {
                    tracing::warn!(native = name, %fault, "native fault returned as value");
                    Ok(Value::Fault(Rc::new(fault)))
                }
                NativeFaultPolicy::Error => Err(RuntimeError::native_fault(name, &fault.message)),
            },
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn is_entry_point(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Function(decl) => decl.name.node == ENTRY_POINT && decl.params.is_empty(),
        Stmt::Class(decl) => decl.name.node == ENTRY_POINT,
        _ => false,
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::string(s),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Nil => Value::Nothing,
    }
}

fn binary_op(op: BinOp, left: &Value, right: &Value) -> InterpResult<Value> {
    match op {
        BinOp::Add => left.add(right),
        BinOp::Sub => left.sub(right),
        BinOp::Mul => left.mul(right),
        BinOp::Div => left.div(right),
        BinOp::Eq => Ok(Value::Bool(equality(left, right)?)),
        BinOp::Ne => Ok(Value::Bool(!equality(left, right)?)),
        BinOp::Gt => Ok(Value::Bool(left.compare(right)? == Ordering::Greater)),
        BinOp::Ge => Ok(Value::Bool(left.compare(right)? != Ordering::Less)),
        BinOp::Lt => Ok(Value::Bool(left.compare(right)? == Ordering::Less)),
        BinOp::Le => Ok(Value::Bool(left.compare(right)? != Ordering::Greater)),
    }
}

/// `==` and `!=` accept numbers, strings, booleans and nothing
fn equality(left: &Value, right: &Value) -> InterpResult<bool> {
    for value in [left, right] {
        if !value.is_printable() && !matches!(value, Value::Nothing) {
            return Err(RuntimeError::type_error(format!(
                "cannot compare {} for equality",
                value.type_name()
            )));
        }
    }
    Ok(left.equals(right))
}
