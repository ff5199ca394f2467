//! REPL (Read-Eval-Print Loop) for Quill

use crate::driver::Session;
use crate::error::report_error;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = "> ";
const HISTORY_FILE: &str = ".quill_history";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a new REPL around `session`
    pub fn new(session: Session) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run the REPL
    pub fn run(&mut self) -> RlResult<()> {
        println!("Quill REPL v{}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Goodbye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle REPL commands (starting with :). Returns true to quit.
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => {
                println!("Goodbye!");
                true
            }
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":globals" => {
                let mut names = self.session.interpreter().global_names();
                names.sort();
                println!("{}", names.join(" "));
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("Quill REPL Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :clear          Clear the screen");
        println!("  :globals        List names defined so far");
        println!();
        println!("You can enter:");
        println!("  - Statements: var x = 1;  printLine(x);");
        println!("  - Declarations: func add(a, b) = {{ return a + b; }}");
        println!("  - Expressions: add(1, 2);");
        println!();
        println!("Natives:");
        for name in self.session.interpreter().natives().names() {
            println!("  {name}");
        }
    }

    /// Evaluate one line; a bare expression echoes its printable value
    fn eval_input(&mut self, input: &str) {
        // a missing trailing semicolon is the usual REPL slip
        let source = if input.ends_with(';') || input.ends_with('}') {
            input.to_string()
        } else {
            format!("{input};")
        };

        match self.session.eval_line(&source) {
            Ok(Some(value)) if value.is_printable() => println!("{value}"),
            Ok(_) => {}
            Err(err) => {
                let _ = report_error("<repl>", &source, &err);
            }
        }
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repl() -> Repl {
        Repl::new(Session::buffered()).unwrap()
    }

    #[test]
    fn test_handle_command_quit() {
        let mut repl = repl();
        assert!(repl.handle_command(":quit"));
        assert!(repl.handle_command(":q"));
        assert!(repl.handle_command(":exit"));
    }

    #[test]
    fn test_handle_command_non_quit() {
        let mut repl = repl();
        assert!(!repl.handle_command(":help"));
        assert!(!repl.handle_command(":clear"));
        assert!(!repl.handle_command(":globals"));
        assert!(!repl.handle_command(":unknown"));
    }

    #[test]
    fn test_eval_input_adds_missing_semicolon() {
        let mut repl = repl();
        repl.eval_input("printLine(3)");
        assert_eq!(repl.session.output().contents(), "3\n");
    }

    #[test]
    fn test_definitions_persist_between_inputs() {
        let mut repl = repl();
        repl.eval_input("func square(n) = { return n * n; }");
        repl.eval_input("var five = 5;");
        repl.eval_input("printLine(square(five));");
        assert_eq!(repl.session.output().contents(), "25\n");
    }

    #[test]
    fn test_errors_do_not_panic() {
        let mut repl = repl();
        repl.eval_input("@#$%");
        repl.eval_input("func incomplete(");
        repl.eval_input("1 / 0");
        repl.eval_input("printLine(\"ok\")");
        assert_eq!(repl.session.output().contents(), "ok\n");
    }

    #[test]
    fn test_history_file_name() {
        let repl = repl();
        if let Some(path) = repl.history_path {
            assert!(path.to_string_lossy().ends_with(HISTORY_FILE));
        }
    }
}
