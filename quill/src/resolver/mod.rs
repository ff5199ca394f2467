//! Static scope resolution
//!
//! Walks the AST with a stack of block scopes that mirrors exactly the
//! environments the interpreter creates at runtime, and records for every
//! variable read and assignment how many parent links separate the use from
//! its declaration. Names not found in any scope are globals and get no
//! entry. Calls to natives that no script binding shadows are marked so the
//! interpreter can dispatch them by name.

use std::collections::{HashMap, HashSet};

use crate::ast::{ClassDecl, Expr, ExprId, FunctionDecl, Program, Spanned, Stmt};
use crate::error::{CompileError, Result};
use crate::interp::NativeRegistry;

/// Output of a resolver pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Scope distance per `Variable` / `Assign` node
    pub locals: HashMap<ExprId, usize>,
    /// `Call` nodes dispatched straight to a native capability
    pub native_calls: HashSet<ExprId>,
}

/// Scope resolver over one program
#[derive(Debug)]
pub struct Resolver<'a> {
    /// Innermost scope last; empty at top level
    scopes: Vec<HashSet<String>>,
    /// Top-level names, which shadow natives
    globals: HashSet<String>,
    natives: &'a NativeRegistry,
    resolution: Resolution,
}

impl<'a> Resolver<'a> {
    pub fn new(natives: &'a NativeRegistry) -> Self {
        Self {
            scopes: Vec::new(),
            globals: HashSet::new(),
            natives,
            resolution: Resolution::default(),
        }
    }

    /// Treat `names` as already-declared globals (earlier REPL inputs)
    pub fn with_globals(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.globals.extend(names);
        self
    }

    /// Resolve a whole program
    pub fn resolve(mut self, program: &Program) -> Result<Resolution> {
        for stmt in &program.stmts {
            match &stmt.node {
                Stmt::Var { name, .. } => {
                    self.globals.insert(name.node.clone());
                }
                other => {
                    if let Some(name) = other.declared_name() {
                        self.globals.insert(name.to_string());
                    }
                }
            }
        }
        self.resolve_stmts(&program.stmts)?;
        Ok(self.resolution)
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str) {
        match self.scopes.last_mut() {
            Some(scope) => {
                scope.insert(name.to_string());
            }
            None => {
                self.globals.insert(name.to_string());
            }
        }
    }

    fn resolve_local(&mut self, id: ExprId, name: &str) {
        let found = self
            .scopes
            .iter()
            .rev()
            .position(|scope| scope.contains(name));
        match found {
            Some(distance) => {
                tracing::trace!(%id, name, distance, "resolved local");
                self.resolution.locals.insert(id, distance);
            }
            None => tracing::trace!(%id, name, "resolved as global"),
        }
    }

    fn is_native_call(&self, callee: &Expr) -> bool {
        match callee {
            Expr::Variable { name, .. } => {
                self.natives.contains(name)
                    && !self.globals.contains(name)
                    && !self.scopes.iter().any(|scope| scope.contains(name))
            }
            _ => false,
        }
    }

    fn resolve_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> Result<()> {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<()> {
        match &stmt.node {
            Stmt::Block(stmts) => {
                self.begin_scope();
                let result = self.resolve_stmts(stmts);
                self.end_scope();
                result
            }
            Stmt::Var { name, init } => {
                if let Some(init) = init {
                    self.resolve_expr(init)?;
                }
                self.declare(&name.node);
                Ok(())
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name.node);
                self.resolve_function(decl)
            }
            Stmt::Class(decl) => self.resolve_class(decl),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(cond)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
                Ok(())
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond)?;
                self.resolve_stmt(body)
            }
            Stmt::Print(expr) | Stmt::PrintLine(expr) | Stmt::Return(expr) => match expr {
                Some(expr) => self.resolve_expr(expr),
                None => Ok(()),
            },
            Stmt::Break => Ok(()),
            Stmt::Expression(expr) => self.resolve_expr(expr),
        }
    }

    /// Parameters and body statements share one scope
    fn resolve_function(&mut self, decl: &FunctionDecl) -> Result<()> {
        self.begin_scope();
        for param in &decl.params {
            self.declare(&param.node);
        }
        let result = self.resolve_stmts(&decl.body);
        self.end_scope();
        result
    }

    fn resolve_class(&mut self, decl: &ClassDecl) -> Result<()> {
        self.declare(&decl.name.node);

        if let Some(superclass) = &decl.superclass {
            if superclass.node.name() == Some(decl.name.node.as_str()) {
                return Err(CompileError::resolve(
                    format!("class {} can't inherit from itself", decl.name.node),
                    superclass.span,
                ));
            }
            self.resolve_expr(superclass)?;
            self.begin_scope();
            self.declare("super");
        }

        self.begin_scope();
        self.declare("this");
        let mut result = Ok(());
        for method in &decl.methods {
            result = self.resolve_function(method);
            if result.is_err() {
                break;
            }
        }
        self.end_scope();

        if decl.superclass.is_some() {
            self.end_scope();
        }
        result
    }

    fn resolve_expr(&mut self, expr: &Spanned<Expr>) -> Result<()> {
        match &expr.node {
            Expr::Assign { id, name, value } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
                Ok(())
            }
            Expr::Variable { id, name } => {
                self.resolve_local(*id, name);
                Ok(())
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)
            }
            Expr::Call { id, callee, args } => {
                if self.is_native_call(&callee.node) {
                    tracing::trace!(%id, callee = callee.node.name(), "native call");
                    self.resolution.native_calls.insert(*id);
                }
                self.resolve_expr(callee)?;
                for arg in args {
                    self.resolve_expr(arg)?;
                }
                Ok(())
            }
            Expr::Get { object, .. } => self.resolve_expr(object),
            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)
            }
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Unary { expr, .. } => self.resolve_expr(expr),
            // `this` and `super` are found by walking the environment chain
            Expr::Literal(_) | Expr::This | Expr::Super { .. } => Ok(()),
        }
    }
}

/// Resolve `program` against the natives in `natives`
pub fn resolve(program: &Program, natives: &NativeRegistry) -> Result<Resolution> {
    Resolver::new(natives).resolve(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ExprIds;

    fn resolve_source(source: &str) -> Result<(Program, Resolution)> {
        let tokens = crate::lexer::tokenize(source)?;
        let program = crate::parser::parse_with_ids(&ExprIds::new(), "test.ql", source, tokens)?;
        let resolution = resolve(&program, &NativeRegistry::with_defaults())?;
        Ok((program, resolution))
    }

    /// Distances recorded for every use of `name`, in source order
    fn distances(program: &Program, resolution: &Resolution, name: &str) -> Vec<Option<usize>> {
        let mut ids = Vec::new();
        for stmt in &program.stmts {
            collect_stmt(&stmt.node, name, &mut ids);
        }
        ids.sort();
        ids.into_iter()
            .map(|id| resolution.locals.get(&id).copied())
            .collect()
    }

    fn collect_stmt(stmt: &Stmt, name: &str, out: &mut Vec<ExprId>) {
        match stmt {
            Stmt::Block(stmts) => stmts.iter().for_each(|s| collect_stmt(&s.node, name, out)),
            Stmt::Function(f) => f.body.iter().for_each(|s| collect_stmt(&s.node, name, out)),
            Stmt::Class(c) => c
                .methods
                .iter()
                .flat_map(|m| m.body.iter())
                .for_each(|s| collect_stmt(&s.node, name, out)),
            Stmt::If { cond, then_branch, else_branch } => {
                collect_expr(&cond.node, name, out);
                collect_stmt(&then_branch.node, name, out);
                if let Some(e) = else_branch {
                    collect_stmt(&e.node, name, out);
                }
            }
            Stmt::While { cond, body } => {
                collect_expr(&cond.node, name, out);
                collect_stmt(&body.node, name, out);
            }
            Stmt::Print(Some(e)) | Stmt::PrintLine(Some(e)) | Stmt::Return(Some(e)) => {
                collect_expr(&e.node, name, out)
            }
            Stmt::Var { init: Some(e), .. } | Stmt::Expression(e) => collect_expr(&e.node, name, out),
            _ => {}
        }
    }

    fn collect_expr(expr: &Expr, name: &str, out: &mut Vec<ExprId>) {
        match expr {
            Expr::Variable { id, name: n } if n == name => out.push(*id),
            Expr::Assign { id, name: n, value } => {
                collect_expr(&value.node, name, out);
                if n == name {
                    out.push(*id);
                }
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                collect_expr(&left.node, name, out);
                collect_expr(&right.node, name, out);
            }
            Expr::Call { callee, args, .. } => {
                collect_expr(&callee.node, name, out);
                args.iter().for_each(|a| collect_expr(&a.node, name, out));
            }
            Expr::Grouping(e) | Expr::Unary { expr: e, .. } | Expr::Get { object: e, .. } => {
                collect_expr(&e.node, name, out)
            }
            _ => {}
        }
    }

    #[test]
    fn test_top_level_names_are_global() {
        let (program, resolution) = resolve_source("var x = 1; printLine(x);").unwrap();
        assert_eq!(distances(&program, &resolution, "x"), vec![None]);
    }

    #[test]
    fn test_parameter_and_local_distance_zero() {
        let (program, resolution) =
            resolve_source("func f(a) = { var b = a; printLine(b); }").unwrap();
        assert_eq!(distances(&program, &resolution, "a"), vec![Some(0)]);
        assert_eq!(distances(&program, &resolution, "b"), vec![Some(0)]);
    }

    #[test]
    fn test_block_adds_one_level() {
        let (program, resolution) =
            resolve_source("func f() = { var x = 1; { printLine(x); } }").unwrap();
        assert_eq!(distances(&program, &resolution, "x"), vec![Some(1)]);
    }

    #[test]
    fn test_closure_captures_outer_local() {
        let source = "func counter() = { var count = 0; func inc() = { count = count + 1; } return inc; }";
        let (program, resolution) = resolve_source(source).unwrap();
        // read then assignment, both one level out
        assert_eq!(distances(&program, &resolution, "count"), vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_shadowing_in_block() {
        let source = "func f() = { var x = 1; { var x = 2; printLine(x); } printLine(x); }";
        let (program, resolution) = resolve_source(source).unwrap();
        assert_eq!(distances(&program, &resolution, "x"), vec![Some(0), Some(0)]);
    }

    #[test]
    fn test_method_scopes_count_this_and_super() {
        let source = "var g = 1;
            class A = { func m() = { return 1; } }
            func outer() = {
                var v = 2;
                class B : A = { func m() = { printLine(v); } }
            }";
        let (program, resolution) = resolve_source(source).unwrap();
        // method params scope, `this` scope, `super` scope, then outer's scope
        assert_eq!(distances(&program, &resolution, "v"), vec![Some(3)]);
    }

    #[test]
    fn test_native_call_marked() {
        let (_, resolution) = resolve_source("var t = clock();").unwrap();
        assert_eq!(resolution.native_calls.len(), 1);
    }

    #[test]
    fn test_native_shadowed_by_local_not_marked() {
        let source = "func f() = { func clock() = { return 0; } clock(); }";
        let (_, resolution) = resolve_source(source).unwrap();
        assert!(resolution.native_calls.is_empty());
    }

    #[test]
    fn test_native_shadowed_by_later_global_not_marked() {
        let (_, resolution) =
            resolve_source("func main() = { clock(); } func clock() = { return 0; }").unwrap();
        assert!(resolution.native_calls.is_empty());
    }

    #[test]
    fn test_with_globals_shadows_natives() {
        let source = "clock();";
        let tokens = crate::lexer::tokenize(source).unwrap();
        let program = crate::parser::parse("t", source, tokens).unwrap();
        let natives = NativeRegistry::with_defaults();
        let resolution = Resolver::new(&natives)
            .with_globals(vec!["clock".to_string()])
            .resolve(&program)
            .unwrap();
        assert!(resolution.native_calls.is_empty());
    }

    #[test]
    fn test_class_inheriting_from_itself() {
        let err = resolve_source("class A : A = { }").unwrap_err();
        assert_eq!(err.kind(), "Resolve");
        assert!(err.message().contains("inherit from itself"));
    }
}
