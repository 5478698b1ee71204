//! Printing constant pool entries in their unambiguous textual form.

use classfile::constants::{element_value, method_handle};
use classfile::pool::Constant;
use classfile::tree::class::ProgramClass;
use crate::error::{PrintError, PrintResult};
use crate::print::{self, Printer};
use crate::types;

/// Prints the constant at `index`.
///
/// `int_type` is the expected primitive type of integer constants, as an
/// element value tag (0 for no expectation): it selects the `true`/`false`
/// and quoted char renderings and the `(type)` cast prefix. `full_type`
/// requests a cast prefix on the constant kinds whose inferred parse would
/// otherwise be wrong (method handles, method types, dynamic constants).
pub fn print_constant(p: &mut Printer, class: &ProgramClass, index: u16, int_type: u8, full_type: bool) -> PrintResult<()> {
	match *print::lift(class.pool.get(index))? {
		Constant::Integer(value) => {
			if int_type == element_value::BOOLEAN {
				if value == 1 {
					return p.print_word("true");
				}
				if value == 0 {
					return p.print_word("false");
				}
			}

			if int_type == element_value::CHAR {
				return p.print_quoted_char(value as u16 as u32);
			}

			if int_type != 0 && int_type != element_value::INT {
				p.print('(')?;
				p.print_type(&(int_type as char).to_string())?;
				p.print(')')?;
				p.print_space()?;
			}

			p.print_number(value as f64)
		},
		Constant::Long(value) => {
			p.print_word(&value.to_string())?;
			p.print_word("l")
		},
		Constant::Float(bits) => {
			p.print_number(f32::from_bits(bits) as f64)?;
			p.print_word("f")
		},
		Constant::Double(bits) => {
			p.print_number(f64::from_bits(bits))?;
			p.print_word("d")
		},
		Constant::String { string } => {
			let string = print::lift(class.pool.utf8(string))?.to_owned();
			p.print_string(&string)
		},
		Constant::Utf8(ref string) => {
			let string = string.clone();
			p.print_string(&string)
		},
		Constant::Class { name } => {
			let name = print::lift(class.pool.utf8(name))?;
			p.print_type(&types::internal_type_from_class_type(name))
		},
		Constant::MethodHandle { kind, reference } => {
			if full_type {
				p.print_word("(MethodHandle) ")?;
			}

			p.print_word(reference_kind_word(kind)?)?;
			p.print_space()?;
			print_constant(p, class, reference, 0, full_type)
		},
		Constant::MethodType { descriptor } => {
			if full_type {
				p.print_word("(MethodType) ")?;
			}

			let descriptor = print::lift(class.pool.utf8(descriptor))?.to_owned();
			p.print_method_return_type(&descriptor)?;
			p.print_space()?;
			p.print_method_arguments(&descriptor)
		},
		Constant::Dynamic { bootstrap_method, name_and_type } => {
			if full_type {
				p.print_word("(Dynamic) ")?;
			}

			let (name, descriptor) = print::lift(class.pool.name_and_type(name_and_type))?;
			let (name, descriptor) = (name.to_owned(), descriptor.to_owned());
			p.print_number(bootstrap_method as f64)?;
			p.print_space()?;
			p.print_type(&descriptor)?;
			p.print_space()?;
			p.print_word(&name)
		},
		Constant::InvokeDynamic { bootstrap_method, name_and_type } => {
			let (name, descriptor) = print::lift(class.pool.name_and_type(name_and_type))?;
			let (name, descriptor) = (name.to_owned(), descriptor.to_owned());
			p.print_number(bootstrap_method as f64)?;
			p.print_space()?;
			p.print_method_return_type(&descriptor)?;
			p.print_space()?;
			p.print_word(&name)?;
			p.print_method_arguments(&descriptor)
		},
		Constant::FieldRef { class: class_index, .. } => {
			let (_, name, descriptor) = print::lift(class.pool.member_ref(index))?;
			let (name, descriptor) = (name.to_owned(), descriptor.to_owned());
			if class_index != class.this_class {
				print_constant(p, class, class_index, 0, full_type)?;
			}
			p.print('#')?;
			p.print_type(&descriptor)?;
			p.print_space()?;
			p.print_word(&name)
		},
		Constant::MethodRef { class: class_index, .. }
		| Constant::InterfaceMethodRef { class: class_index, .. } => {
			let (_, name, descriptor) = print::lift(class.pool.member_ref(index))?;
			let (name, descriptor) = (name.to_owned(), descriptor.to_owned());
			if class_index != class.this_class {
				print_constant(p, class, class_index, 0, full_type)?;
			}
			p.print('#')?;
			p.print_method_return_type(&descriptor)?;
			p.print_space()?;
			p.print_word(&name)?;
			p.print_method_arguments(&descriptor)
		},
		ref entry => Err(PrintError::new(format!("Cannot print constant pool entry {entry:?}."))),
	}
}

fn reference_kind_word(kind: u8) -> PrintResult<&'static str> {
	Ok(match kind {
		method_handle::GET_FIELD => "getfield",
		method_handle::GET_STATIC => "getstatic",
		method_handle::PUT_FIELD => "putfield",
		method_handle::PUT_STATIC => "putstatic",
		method_handle::INVOKE_VIRTUAL => "invokevirtual",
		method_handle::INVOKE_STATIC => "invokestatic",
		method_handle::INVOKE_SPECIAL => "invokespecial",
		method_handle::NEW_INVOKE_SPECIAL => "newinvokespecial",
		method_handle::INVOKE_INTERFACE => "invokeinterface",
		_ => return Err(PrintError::new(format!("Unknown reference kind {kind}."))),
	})
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::element_value;
	use classfile::tree::class::ProgramClass;
	use crate::print::Printer;
	use super::print_constant;

	fn print(class: &ProgramClass, index: u16, int_type: u8, full_type: bool) -> String {
		let mut out = Vec::new();
		let mut printer = Printer::new(&mut out);
		print_constant(&mut printer, class, index, int_type, full_type).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn primitive_renderings() {
		let mut class = ProgramClass::default();
		let int = class.pool.add_integer(65).unwrap();
		let long = class.pool.add_long(-7).unwrap();
		let float = class.pool.add_float(1.5).unwrap();
		let double = class.pool.add_double(3.25).unwrap();

		assert_eq!(print(&class, int, 0, true), "65");
		assert_eq!(print(&class, int, element_value::CHAR, false), "'A'");
		assert_eq!(print(&class, int, element_value::BYTE, false), "(byte) 65");
		assert_eq!(print(&class, long, 0, true), "-7l");
		assert_eq!(print(&class, float, 0, true), "1.5f");
		assert_eq!(print(&class, double, 0, true), "3.25d");
	}

	#[test]
	fn booleans_print_as_keywords() {
		let mut class = ProgramClass::default();
		let one = class.pool.add_integer(1).unwrap();
		let zero = class.pool.add_integer(0).unwrap();

		assert_eq!(print(&class, one, element_value::BOOLEAN, false), "true");
		assert_eq!(print(&class, zero, element_value::BOOLEAN, false), "false");
	}

	#[test]
	fn member_references_elide_this_class() {
		let mut class = ProgramClass::default();
		class.this_class = class.pool.add_class("Example").unwrap();
		let own = class.pool.add_field_ref(class.this_class, "value", "I").unwrap();
		let other_class = class.pool.add_class("java/lang/System").unwrap();
		let other = class.pool.add_field_ref(other_class, "out", "Ljava/io/PrintStream;").unwrap();

		assert_eq!(print(&class, own, 0, true), "#int value");
		assert_eq!(print(&class, other, 0, true), "java.lang.System#java.io.PrintStream out");
	}

	#[test]
	fn method_handles_carry_a_cast_when_asked() {
		let mut class = ProgramClass::default();
		class.this_class = class.pool.add_class("Example").unwrap();
		let target = class.pool.add_class("java/lang/Math").unwrap();
		let reference = class.pool.add_method_ref(target, "sqrt", "(D)D").unwrap();
		let handle = class.pool.add_method_handle(6, reference).unwrap();

		assert_eq!(print(&class, handle, 0, true), "(MethodHandle) invokestatic java.lang.Math#double sqrt(double)");
		assert_eq!(print(&class, handle, 0, false), "invokestatic java.lang.Math#double sqrt(double)");
	}
}
