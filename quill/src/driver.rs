//! Source-to-output pipeline
//!
//! lex → parse → resolve → interpret, shared by the CLI, the REPL and the
//! integration tests. A [`Session`] keeps one interpreter and one
//! expression-id generator alive so later inputs see earlier globals.

use crate::ast::{ExprIds, Program, Spanned, Stmt};
use crate::config::Config;
use crate::error::{CompileError, Result};
use crate::interp::{Interpreter, NativeRegistry, OutputSink, Value};
use crate::lexer::tokenize;
use crate::parser::parse_with_ids;
use crate::resolver::{Resolution, Resolver};

/// Interpreter state carried across inputs
pub struct Session {
    interpreter: Interpreter,
    ids: ExprIds,
}

impl Session {
    /// Session configured from `config`, writing program output to `output`
    pub fn new(config: &Config, output: OutputSink) -> Result<Self> {
        let natives = config.natives.registry()?;
        Ok(Session {
            interpreter: Interpreter::with_config(config.runtime.clone(), natives, output),
            ids: ExprIds::new(),
        })
    }

    /// Default configuration with output captured in memory
    pub fn buffered() -> Self {
        Session {
            interpreter: Interpreter::with_config(
                Default::default(),
                NativeRegistry::with_defaults(),
                OutputSink::buffer(),
            ),
            ids: ExprIds::new(),
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn output(&self) -> &OutputSink {
        self.interpreter.output()
    }

    /// Lex, parse and resolve without running anything
    pub fn prepare(&mut self, filename: &str, source: &str) -> Result<Program> {
        let tokens = tokenize(source)?;
        tracing::trace!(count = tokens.len(), "tokenized");
        let program = parse_with_ids(&self.ids, filename, source, tokens)?;
        tracing::debug!(file = filename, stmts = program.stmts.len(), "parsed");
        let resolution = Resolver::new(self.interpreter.natives())
            .with_globals(self.interpreter.global_names())
            .resolve(&program)?;
        self.record(&resolution);
        Ok(program)
    }

    fn record(&mut self, resolution: &Resolution) {
        tracing::debug!(
            locals = resolution.locals.len(),
            native_calls = resolution.native_calls.len(),
            "resolved"
        );
        self.interpreter.apply_resolution(resolution);
    }

    /// Run a whole program file, honouring a `main` entry point
    pub fn run(&mut self, filename: &str, source: &str) -> Result<()> {
        let program = self.prepare(filename, source)?;
        self.interpreter.interpret(&program)?;
        Ok(())
    }

    /// Run one REPL input. A lone expression statement yields its value.
    pub fn eval_line(&mut self, source: &str) -> Result<Option<Value>> {
        let program = self.prepare("<repl>", source)?;
        if let [Spanned {
            node: Stmt::Expression(expr),
            ..
        }] = program.stmts.as_slice()
        {
            return Ok(Some(self.interpreter.eval_expr(expr)?));
        }
        self.interpreter.execute(&program)?;
        Ok(None)
    }
}

/// Captured result of running a program in memory
#[derive(Debug)]
pub struct RunOutcome {
    /// Everything the program printed before finishing or failing
    pub output: String,
    pub error: Option<CompileError>,
}

impl RunOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run `source` under `config` with output captured
pub fn run_source(source: &str, config: &Config) -> RunOutcome {
    let mut session = match Session::new(config, OutputSink::buffer()) {
        Ok(session) => session,
        Err(error) => {
            return RunOutcome {
                output: String::new(),
                error: Some(error),
            };
        }
    };
    let error = session.run("<input>", source).err();
    RunOutcome {
        output: session.output().take(),
        error,
    }
}

/// Lex, parse and resolve `source` against `natives`
pub fn check_source(filename: &str, source: &str, natives: &NativeRegistry) -> Result<Program> {
    let tokens = tokenize(source)?;
    let program = crate::parser::parse(filename, source, tokens)?;
    crate::resolver::resolve(&program, natives)?;
    Ok(program)
}
