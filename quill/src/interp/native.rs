//! Host capabilities callable from scripts
//!
//! Natives are looked up by name. A failure on the host side is a
//! [`NativeFault`]; whether it becomes a value or an error is decided by the
//! interpreter at the call boundary.

use super::Value;
use crate::error::{CompileError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Failure raised by a native capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{capability}: {message}")]
pub struct NativeFault {
    pub capability: String,
    pub message: String,
}

impl NativeFault {
    pub fn new(capability: &str, message: impl Into<String>) -> Self {
        NativeFault {
            capability: capability.to_string(),
            message: message.into(),
        }
    }
}

/// A host-provided function
pub trait NativeCapability: fmt::Debug {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    fn invoke(&self, args: &[Value]) -> std::result::Result<Value, NativeFault>;
}

/// `clock()`: milliseconds since the Unix epoch
#[derive(Debug, Default)]
pub struct Clock;

impl NativeCapability for Clock {
    fn name(&self) -> &str {
        "clock"
    }

    fn arity(&self) -> usize {
        0
    }

    fn invoke(&self, _args: &[Value]) -> std::result::Result<Value, NativeFault> {
        Ok(Value::Number(chrono::Utc::now().timestamp_millis()))
    }
}

/// `fileOpen(path)`: the whole file as a string
#[derive(Debug, Default)]
pub struct FileOpen;

impl NativeCapability for FileOpen {
    fn name(&self) -> &str {
        "fileOpen"
    }

    fn arity(&self) -> usize {
        1
    }

    fn invoke(&self, args: &[Value]) -> std::result::Result<Value, NativeFault> {
        let path = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| NativeFault::new(self.name(), "expected a path string"))?;
        std::fs::read_to_string(path)
            .map(Value::string)
            .map_err(|e| NativeFault::new(self.name(), format!("{path}: {e}")))
    }
}

/// `getAvailableMemory()`: available system memory in bytes
#[derive(Debug, Default)]
pub struct AvailableMemory;

impl AvailableMemory {
    const MEMINFO: &'static str = "/proc/meminfo";

    /// Extract `MemAvailable` (reported in kB) from meminfo text
    fn parse_meminfo(text: &str) -> Option<i64> {
        text.lines()
            .find_map(|line| line.strip_prefix("MemAvailable:"))
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|kb| kb.parse::<i64>().ok())
            .map(|kb| kb.saturating_mul(1024))
    }
}

impl NativeCapability for AvailableMemory {
    fn name(&self) -> &str {
        "getAvailableMemory"
    }

    fn arity(&self) -> usize {
        0
    }

    fn invoke(&self, _args: &[Value]) -> std::result::Result<Value, NativeFault> {
        let text = std::fs::read_to_string(Self::MEMINFO).map_err(|e| {
            NativeFault::new(self.name(), format!("unsupported on this platform: {e}"))
        })?;
        Self::parse_meminfo(&text)
            .map(Value::Number)
            .ok_or_else(|| NativeFault::new(self.name(), "MemAvailable not reported"))
    }
}

/// Name-indexed set of enabled natives
#[derive(Debug, Clone, Default)]
pub struct NativeRegistry {
    natives: BTreeMap<String, Rc<dyn NativeCapability>>,
}

impl NativeRegistry {
    /// Names of every capability shipped with the interpreter
    pub const BUILTIN: [&'static str; 3] = ["clock", "fileOpen", "getAvailableMemory"];

    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in capability enabled
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Clock);
        registry.register(FileOpen);
        registry.register(AvailableMemory);
        registry
    }

    /// Registry restricted to `names`; unknown names are a config error
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut registry = Self::new();
        for name in names {
            match name.as_ref() {
                "clock" => registry.register(Clock),
                "fileOpen" => registry.register(FileOpen),
                "getAvailableMemory" => registry.register(AvailableMemory),
                other => {
                    return Err(CompileError::config(format!(
                        "unknown native capability `{other}` (available: {})",
                        Self::BUILTIN.join(", ")
                    )));
                }
            }
        }
        Ok(registry)
    }

    pub fn register(&mut self, native: impl NativeCapability + 'static) {
        self.natives.insert(native.name().to_string(), Rc::new(native));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn NativeCapability>> {
        self.natives.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.natives.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<dyn NativeCapability>> {
        self.natives.values()
    }

    /// Single entry point for native calls; argument counts are checked here
    pub fn dispatch(&self, name: &str, args: &[Value]) -> std::result::Result<Value, NativeFault> {
        let native = self
            .get(name)
            .ok_or_else(|| NativeFault::new(name, "no such native capability"))?;
        invoke_checked(native.as_ref(), args)
    }
}

/// Invoke `native` after checking the argument count
pub fn invoke_checked(
    native: &dyn NativeCapability,
    args: &[Value],
) -> std::result::Result<Value, NativeFault> {
    if args.len() != native.arity() {
        return Err(NativeFault::new(
            native.name(),
            format!(
                "expects {} argument(s), got {}",
                native.arity(),
                args.len()
            ),
        ));
    }
    native.invoke(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_clock_is_recent() {
        let now = Clock.invoke(&[]).unwrap().as_number().unwrap();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800_000);
    }

    #[test]
    fn test_file_open_reads_contents() {
        let path = std::env::temp_dir().join(format!("quill-native-{}.txt", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "hello").unwrap();

        let value = FileOpen
            .invoke(&[Value::string(path.to_string_lossy())])
            .unwrap();
        assert_eq!(value, Value::string("hello"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_file_open_missing_file_faults() {
        let fault = FileOpen
            .invoke(&[Value::string("/definitely/not/here.ql")])
            .unwrap_err();
        assert_eq!(fault.capability, "fileOpen");
    }

    #[test]
    fn test_file_open_rejects_non_string() {
        let fault = FileOpen.invoke(&[Value::Number(3)]).unwrap_err();
        assert_eq!(fault.message, "expected a path string");
    }

    #[test]
    fn test_parse_meminfo() {
        let text = "MemTotal:       16000000 kB\nMemFree:  100 kB\nMemAvailable:    2048 kB\n";
        assert_eq!(AvailableMemory::parse_meminfo(text), Some(2048 * 1024));
        assert_eq!(AvailableMemory::parse_meminfo("MemTotal: 1 kB"), None);
    }

    #[test]
    fn test_dispatch_checks_arity() {
        let registry = NativeRegistry::with_defaults();
        let fault = registry.dispatch("clock", &[Value::Number(1)]).unwrap_err();
        assert_eq!(fault.to_string(), "clock: expects 0 argument(s), got 1");
    }

    #[test]
    fn test_dispatch_unknown_name() {
        let registry = NativeRegistry::new();
        assert!(registry.dispatch("clock", &[]).is_err());
    }

    #[test]
    fn test_from_names() {
        let registry = NativeRegistry::from_names(&["clock"]).unwrap();
        assert!(registry.contains("clock"));
        assert!(!registry.contains("fileOpen"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["clock"]);

        let err = NativeRegistry::from_names(&["launchRockets"]).unwrap_err();
        assert!(err.message().contains("launchRockets"));
    }
}
