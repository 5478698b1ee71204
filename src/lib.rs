//! An assembler and disassembler between Java class files and a textual
//! assembly dialect, jbc.
//!
//! The two directions are exact mirrors:
//! - [`assemble`] parses jbc source into a [`ProgramClass`], building the
//!   constant pool and laying out method code as it goes;
//! - [`disassemble`] walks a [`ProgramClass`] and prints jbc source that
//!   parses back to the same class.
//!
//! The class model itself, including the binary class file format, lives in
//! the [`classfile`] crate; this crate owns the textual surface.
//!
//! ```
//! let source = r#"
//!     version 8;
//!     public class Adder {
//!         public static int add(int, int) {
//!             iload_0
//!             iload_1
//!             iadd
//!             ireturn
//!         }
//!     }
//! "#;
//!
//! let class = jbc::assemble(source)?;
//! assert_eq!(class.name()?, "Adder");
//!
//! let text = jbc::disassemble(&class)?;
//! assert!(text.contains("iadd"));
//! # Ok::<(), anyhow::Error>(())
//! ```

use classfile::tree::class::ProgramClass;

pub mod error;
pub mod io;
mod parse;
mod print;
mod token;
mod types;

pub use error::{ParseError, PrintError};

/// Parses jbc source text into a class.
pub fn assemble(source: &str) -> Result<ProgramClass, ParseError> {
	let mut parser = parse::Parser::new(source);
	let mut class = ProgramClass::default();
	parse::parse_class(&mut parser, &mut class)?;
	Ok(class)
}

/// Prints a class as jbc source text.
pub fn disassemble(class: &ProgramClass) -> Result<String, PrintError> {
	let mut out = Vec::new();
	print::print_class(&mut out, class)?;
	String::from_utf8(out).map_err(|_| PrintError::new("Printer produced invalid utf8."))
}

/// The seam through which stack map frames are attached to assembled
/// methods. Classes of version 1.6 and newer require a `StackMapTable` to
/// pass verification; computing one takes a full type analysis against the
/// runtime classes, which is out of scope here and delegated to
/// implementations of this trait.
pub trait Preverifier {
	fn preverify(&self, class: &mut ProgramClass) -> anyhow::Result<()>;
}

/// A preverifier that attaches nothing.
pub struct NoopPreverifier;

impl Preverifier for NoopPreverifier {
	fn preverify(&self, class: &mut ProgramClass) -> anyhow::Result<()> {
		log::debug!(
			"no preverifier available, not generating stack maps for {}",
			class.name().unwrap_or("<unnamed>"),
		);
		Ok(())
	}
}
