//! Text to binary conversion.
//!
//! The external assembler is modelled as a two-step capability: `parse`
//! yields a module handle, the handle yields the binary, and the handle is
//! destroyed right after. [`AssemblerAdapter`] enforces that every handle it
//! obtains is destroyed exactly once, whether encoding succeeded or not.

use log::{debug, trace};
use wasmparser::Validator;
use wast::Wat;
use wast::parser::{self, ParseBuffer};

use crate::diagnostic::Diagnostic;
use crate::error::CycleError;

/// Options handed to [`Assembler::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Run the binary validator after encoding
    pub validate: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { validate: true }
    }
}

/// Intermediate handle owned by the assembler until it is destroyed.
pub trait ModuleHandle {
    fn to_binary(&self) -> Result<Vec<u8>, Diagnostic>;

    /// Release resources held by the handle.
    fn destroy(self);
}

/// External text to binary converter.
pub trait Assembler {
    type Module: ModuleHandle;

    fn parse(
        &self,
        name: &str,
        text: &str,
        options: &ParseOptions,
    ) -> Result<Self::Module, Diagnostic>;
}

/// Assembled binary, exclusively owned by one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryModule {
    bytes: Vec<u8>,
}

impl BinaryModule {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Wraps an [`Assembler`] with the module name and options used for every cycle.
#[derive(Debug, Clone)]
pub struct AssemblerAdapter<A> {
    assembler: A,
    module_name: String,
    options: ParseOptions,
}

impl<A: Assembler> AssemblerAdapter<A> {
    pub fn new(assembler: A, module_name: impl Into<String>, options: ParseOptions) -> Self {
        Self {
            assembler,
            module_name: module_name.into(),
            options,
        }
    }

    pub fn assemble(&self, text: &str) -> Result<BinaryModule, CycleError> {
        let module = self
            .assembler
            .parse(&self.module_name, text, &self.options)
            .map_err(CycleError::Assembly)?;
        let binary = module.to_binary();
        module.destroy();
        let bytes = binary.map_err(CycleError::Assembly)?;
        debug!("Assembled {} bytes of source into {} bytes", text.len(), bytes.len());
        Ok(BinaryModule::new(bytes))
    }

    pub fn assembler(&self) -> &A {
        &self.assembler
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }
}

/// WebAssembly text assembler backed by `wast`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatAssembler;

/// Encoded module waiting to be extracted.
#[derive(Debug)]
pub struct WatModule {
    bytes: Vec<u8>,
}

impl ModuleHandle for WatModule {
    fn to_binary(&self) -> Result<Vec<u8>, Diagnostic> {
        Ok(self.bytes.clone())
    }

    fn destroy(self) {
        trace!("Released module handle ({} bytes)", self.bytes.len());
    }
}

impl Assembler for WatAssembler {
    type Module = WatModule;

    fn parse(
        &self,
        name: &str,
        text: &str,
        options: &ParseOptions,
    ) -> Result<WatModule, Diagnostic> {
        trace!("Parsing module '{name}' ({} bytes)", text.len());
        let wast_error = |error: wast::Error| Diagnostic::at(error.message(), text, error.span().offset());

        let buffer = ParseBuffer::new(text).map_err(wast_error)?;
        let mut wat = parser::parse::<Wat>(&buffer).map_err(wast_error)?;
        let bytes = wat.encode().map_err(wast_error)?;

        if options.validate {
            Validator::new().validate_all(&bytes).map_err(|error| {
                Diagnostic::new(format!(
                    "{} (at binary offset {:#x})",
                    error.message(),
                    error.offset()
                ))
            })?;
        }
        Ok(WatModule { bytes })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    const ANSWER: &str = r#"(module (func (export "main") (result i32) i32.const 42))"#;

    #[test]
    fn assembles_valid_text() {
        let adapter = AssemblerAdapter::new(WatAssembler, "", ParseOptions::default());
        let binary = adapter.assemble(ANSWER).unwrap();
        assert_eq!(&binary.as_bytes()[..4], b"\0asm");
    }

    #[test]
    fn syntax_error_has_location() {
        let adapter = AssemblerAdapter::new(WatAssembler, "", ParseOptions::default());
        let error = adapter.assemble("(module (func (export \"main\") (result i32) i32.const))").unwrap_err();
        let CycleError::Assembly(diagnostic) = error else {
            panic!("expected assembly error, got {error:?}");
        };
        assert!(diagnostic.location().is_some());
    }

    #[test]
    fn validation_is_optional() {
        let ill_typed = r#"(module (func (export "main") (result i32) i64.const 1))"#;

        let strict = AssemblerAdapter::new(WatAssembler, "", ParseOptions { validate: true });
        assert!(matches!(strict.assemble(ill_typed), Err(CycleError::Assembly(_))));

        let lenient = AssemblerAdapter::new(WatAssembler, "", ParseOptions { validate: false });
        assert!(lenient.assemble(ill_typed).is_ok());
    }

    struct CountingAssembler {
        created: Rc<Cell<usize>>,
        destroyed: Rc<Cell<usize>>,
    }

    struct CountingModule {
        encodable: bool,
        destroyed: Rc<Cell<usize>>,
    }

    impl ModuleHandle for CountingModule {
        fn to_binary(&self) -> Result<Vec<u8>, Diagnostic> {
            if self.encodable {
                Ok(vec![0, 1, 2])
            } else {
                Err(Diagnostic::new("cannot encode"))
            }
        }

        fn destroy(self) {
            self.destroyed.set(self.destroyed.get() + 1);
        }
    }

    impl Assembler for CountingAssembler {
        type Module = CountingModule;

        fn parse(&self, _name: &str, text: &str, _options: &ParseOptions) -> Result<CountingModule, Diagnostic> {
            if text == "bad" {
                return Err(Diagnostic::new("bad text"));
            }
            self.created.set(self.created.get() + 1);
            Ok(CountingModule {
                encodable: text != "unencodable",
                destroyed: self.destroyed.clone(),
            })
        }
    }

    #[test]
    fn handle_released_on_every_path() {
        let created = Rc::new(Cell::new(0));
        let destroyed = Rc::new(Cell::new(0));
        let adapter = AssemblerAdapter::new(
            CountingAssembler {
                created: created.clone(),
                destroyed: destroyed.clone(),
            },
            "",
            ParseOptions::default(),
        );

        assert!(adapter.assemble("good").is_ok());
        assert!(adapter.assemble("unencodable").is_err());
        assert!(adapter.assemble("bad").is_err());

        assert_eq!(created.get(), 2);
        assert_eq!(destroyed.get(), 2);
    }
}
