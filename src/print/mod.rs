//! Disassembling: a class model to jbc source text.
//!
//! The [`Printer`] is an indented textual emitter; the submodules walk the
//! class model and drive it, mirroring the parser structure on the way out.

use std::collections::HashMap;
use std::io::Write;
use classfile::constants::access;
use crate::error::{PrintError, PrintResult};
use crate::types;

mod constant;
mod labels;
mod class;
mod members;
mod attributes;
mod annotations;
mod instructions;

pub use class::print_class;

const INDENTATION: &str = "    ";

/// Formats a number the way the grammar reads them back: integral values
/// without a fractional part, everything in plain decimal notation (no
/// exponent), and with exactly the digits needed to reparse to the same
/// double.
pub fn format_number(value: f64) -> String {
	// The Display implementation for doubles already has both properties:
	// it never switches to scientific notation, and it emits the shortest
	// digit string that parses back to the same value.
	format!("{value}")
}

/// Adapts errors from the class model layer to print errors.
pub(crate) fn lift<T>(result: anyhow::Result<T>) -> PrintResult<T> {
	result.map_err(|error| PrintError::new(format!("{error:#}.")))
}

pub struct Printer<'a> {
	out: &'a mut dyn Write,
	indentation: usize,
	/// Bytecode offset to label name, for the code attribute currently
	/// being printed. Populated by the labels collector.
	pub labels: HashMap<u16, String>,
}

impl<'a> Printer<'a> {
	pub fn new(out: &'a mut dyn Write) -> Printer<'a> {
		Printer {
			out,
			indentation: 0,
			labels: HashMap::new(),
		}
	}

	pub fn indent(&mut self) {
		self.indentation += 1;
	}

	pub fn outdent(&mut self) {
		self.indentation -= 1;
	}

	pub fn println(&mut self) -> PrintResult<()> {
		self.out.write_all(b"\n")?;
		Ok(())
	}

	pub fn print_indent(&mut self) -> PrintResult<()> {
		for _ in 0..self.indentation {
			self.out.write_all(INDENTATION.as_bytes())?;
		}
		Ok(())
	}

	pub fn print(&mut self, c: char) -> PrintResult<()> {
		let mut buffer = [0; 4];
		self.out.write_all(c.encode_utf8(&mut buffer).as_bytes())?;
		Ok(())
	}

	pub fn print_space(&mut self) -> PrintResult<()> {
		self.print(' ')
	}

	pub fn print_word(&mut self, word: &str) -> PrintResult<()> {
		self.out.write_all(word.as_bytes())?;
		Ok(())
	}

	pub fn print_number(&mut self, number: f64) -> PrintResult<()> {
		self.print_word(&format_number(number))
	}

	/// Writes a string surrounded by double quotes, escaping characters
	/// outside the printable ascii range in octal.
	pub fn print_string(&mut self, string: &str) -> PrintResult<()> {
		self.print('"')?;
		for c in string.chars() {
			if c < ' ' || c > '~' {
				self.print_word(&format!("\\{:o}", c as u32))?;
			} else if c == '"' {
				self.print_word("\\\"")?;
			} else if c == '\\' {
				self.print_word("\\\\")?;
			} else {
				self.print(c)?;
			}
		}
		self.print('"')
	}

	/// Writes a char value surrounded by single quotes.
	pub fn print_quoted_char(&mut self, value: u32) -> PrintResult<()> {
		self.print('\'')?;
		match char::from_u32(value) {
			Some(c) if (' '..='~').contains(&c) => {
				if c == '\'' {
					self.print_word("\\'")?;
				} else if c == '\\' {
					self.print_word("\\\\")?;
				} else {
					self.print(c)?;
				}
			},
			_ => self.print_word(&format!("\\{value:o}"))?,
		}
		self.print('\'')
	}

	/// Writes an internal field type in its external form.
	pub fn print_type(&mut self, internal: &str) -> PrintResult<()> {
		self.print_word(&types::external_type(internal))
	}

	pub fn print_method_return_type(&mut self, descriptor: &str) -> PrintResult<()> {
		self.print_type(types::internal_method_return_type(descriptor))
	}

	pub fn print_method_arguments(&mut self, descriptor: &str) -> PrintResult<()> {
		self.print('(')?;
		self.print_word(&types::external_method_arguments(descriptor))?;
		self.print(')')
	}

	/// Writes MethodParameters, requires, exports and opens flags. Returns
	/// whether anything was written.
	pub fn print_access_flags(&mut self, access_flags: u16) -> PrintResult<bool> {
		if access_flags == 0 {
			return Ok(false);
		}

		let mut words = Vec::new();
		if access_flags & access::FINAL != 0 {
			words.push("final");
		}
		if access_flags & access::TRANSITIVE != 0 {
			words.push("transitive");
		}
		if access_flags & access::STATIC_PHASE != 0 {
			words.push("static_phase");
		}
		if access_flags & access::SYNTHETIC != 0 {
			words.push("synthetic");
		}
		if access_flags & access::MANDATED != 0 {
			words.push("mandated");
		}

		self.print_word(&words.join(" "))?;
		Ok(true)
	}

	/// Writes class access flags, ending in the class kind keyword carrying
	/// the implied flags. Always writes something.
	pub fn print_class_access_flags(&mut self, access_flags: u16) -> PrintResult<bool> {
		let mut words = Vec::new();
		if access_flags & access::PUBLIC != 0 {
			words.push("public");
		}
		if access_flags & access::PRIVATE != 0 {
			words.push("private");
		}
		if access_flags & access::PROTECTED != 0 {
			words.push("protected");
		}
		if access_flags & access::STATIC != 0 {
			words.push("static");
		}
		if access_flags & access::FINAL != 0 {
			words.push("final");
		}
		if access_flags & access::ABSTRACT != 0 {
			words.push("abstract");
		}
		if access_flags & access::SYNTHETIC != 0 {
			words.push("synthetic");
		}

		if access_flags & access::MODULE != 0 {
			words.push("module");
		} else if access_flags & access::ENUM != 0 {
			words.push("enum");
		} else if access_flags & access::ANNOTATION != 0 {
			words.push("@interface");
		} else if access_flags & access::INTERFACE != 0 {
			words.push("interface");
		} else {
			words.push("class");
		}

		self.print_word(&words.join(" "))?;
		Ok(true)
	}

	/// Writes a bytecode offset as its label name.
	pub fn print_offset(&mut self, offset: u16) -> PrintResult<()> {
		match self.labels.get(&offset) {
			Some(label) => {
				let label = label.clone();
				self.print_word(&label)
			},
			None => Err(PrintError::new(format!("Offset {offset} not found in labels."))),
		}
	}

	pub fn flush(&mut self) -> PrintResult<()> {
		self.out.flush()?;
		Ok(())
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use super::format_number;

	#[test]
	fn integral_values_have_no_fraction() {
		assert_eq!(format_number(8.0), "8");
		assert_eq!(format_number(-3.0), "-3");
		assert_eq!(format_number(0.0), "0");
	}

	#[test]
	fn fractions_keep_their_digits() {
		assert_eq!(format_number(3.5), "3.5");
		assert_eq!(format_number(-0.25), "-0.25");
	}

	#[test]
	fn no_scientific_notation() {
		assert_eq!(format_number(1e21), "1000000000000000000000");
		assert_eq!(format_number(1.5e-7), "0.00000015");
		assert_eq!(format_number(-2.5e20), "-250000000000000000000");
	}

	#[test]
	fn round_trip_is_exact() {
		for value in [0.1, 1.0 / 3.0, f64::MIN_POSITIVE, f64::MAX, 12345.6789e-30, -7.23e88] {
			let printed = format_number(value);
			assert!(!printed.contains('e'));
			assert_eq!(printed.parse::<f64>().unwrap(), value);
		}
	}
}
