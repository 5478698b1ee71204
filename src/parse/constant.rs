//! Parsing constants into the constant pool.
//!
//! Each function reads one constant in its textual form, interns it through
//! the pool editor and returns the 1-based index.

use classfile::constants::method_handle;
use classfile::tree::class::ProgramClass;
use crate::error::ParseResult;
use crate::parse::Parser;
use crate::types;

pub fn parse_integer(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	if p.peek_is_char()? {
		let value = p.expect_char("char value")?;
		return p.lift(class.pool.add_integer(value as i32));
	}

	if let Some(number) = p.accept_number()? {
		return p.lift(class.pool.add_integer(number as i32));
	}

	let keyword = p.expect_keyword(&["true", "false"])?;
	let value = if keyword == "true" { 1 } else { 0 };
	p.lift(class.pool.add_integer(value))
}

/// Like [`parse_integer`], but numbers are clamped to the 0/1 encoding of
/// `false`/`true`.
pub fn parse_boolean(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	if let Some(number) = p.accept_number()? {
		let value = (number as i32).clamp(0, 1);
		return p.lift(class.pool.add_integer(value));
	}

	parse_integer(p, class)
}

pub fn parse_long(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let number = p.expect_number("long value")?;
	p.lift(class.pool.add_long(number as i64))
}

pub fn parse_float(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let number = p.expect_number("float value")?;
	p.lift(class.pool.add_float(number as f32))
}

pub fn parse_double(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let number = p.expect_number("double value")?;
	p.lift(class.pool.add_double(number))
}

pub fn parse_string(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let string = p.expect_string("string value")?;
	p.lift(class.pool.add_string(&string))
}

pub fn parse_utf8(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let string = p.expect_string("string value")?;
	p.lift(class.pool.add_utf8(&string))
}

pub fn parse_class(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let name = types::internal_class_type_from_type(&p.expect_type("class name")?);
	p.lift(class.pool.add_class(&name))
}

pub fn parse_module(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	// Module names are not encoded in internal form like class names.
	let name = p.expect_word("module name")?;
	p.lift(class.pool.add_module(&name))
}

pub fn parse_package(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let name = types::internal_class_name(&p.expect_word("package name")?);
	p.lift(class.pool.add_package(&name))
}

pub fn parse_method_type(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let return_type = p.expect_type("method return type")?;
	let arguments = p.expect_method_arguments("method arguments")?;
	p.lift(class.pool.add_method_type(&format!("{arguments}{return_type}")))
}

pub fn parse_dynamic(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let bootstrap_method = p.expect_number("dynamic bootstrap method index")? as u16;
	let descriptor = p.expect_type("dynamic type")?;
	let name = p.expect_word("dynamic name")?;
	p.lift(class.pool.add_dynamic(bootstrap_method, &name, &descriptor))
}

pub fn parse_invoke_dynamic(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let bootstrap_method = p.expect_number("invokedynamic bootstrap method index")? as u16;
	let return_type = p.expect_type("invokedynamic return type")?;
	let name = p.expect_method_name("invokedynamic name")?;
	let arguments = p.expect_method_arguments("invokedynamic arguments")?;
	p.lift(class.pool.add_invoke_dynamic(bootstrap_method, &name, &format!("{arguments}{return_type}")))
}

/// Parses the class part of a member reference: either a type followed by
/// `#`, or a bare `#` meaning the class being assembled.
fn parse_ref_class(p: &mut Parser, class: &mut ProgramClass, what: &str) -> ParseResult<u16> {
	if p.accept_punct('#')? {
		Ok(class.this_class)
	} else {
		let index = parse_class(p, class)?;
		p.expect_punct('#', what)?;
		Ok(index)
	}
}

pub fn parse_field_ref(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let class_index = parse_ref_class(p, class, "fieldref separator")?;
	let descriptor = p.expect_type("fieldref type")?;
	let name = p.expect_word("fieldref name")?;
	p.lift(class.pool.add_field_ref(class_index, &name, &descriptor))
}

pub fn parse_method_ref(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let class_index = parse_ref_class(p, class, "methodref separator")?;
	let return_type = p.expect_type("methodref return type")?;
	let name = p.expect_method_name("methodref name")?;
	let arguments = p.expect_method_arguments("methodref arguments")?;
	p.lift(class.pool.add_method_ref(class_index, &name, &format!("{arguments}{return_type}")))
}

pub fn parse_interface_method_ref(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let class_index = parse_ref_class(p, class, "interfacemethodref separator")?;
	let return_type = p.expect_type("interfacemethodref return type")?;
	let name = p.expect_method_name("interfacemethodref name")?;
	let arguments = p.expect_method_arguments("interfacemethodref arguments")?;
	p.lift(class.pool.add_interface_method_ref(class_index, &name, &format!("{arguments}{return_type}")))
}

pub fn parse_method_handle(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	let kind_word = p.expect_word("reference kind")?;
	let (kind, reference) = match kind_word.as_str() {
		"getfield" => (method_handle::GET_FIELD, parse_field_ref(p, class)?),
		"getstatic" => (method_handle::GET_STATIC, parse_field_ref(p, class)?),
		"putfield" => (method_handle::PUT_FIELD, parse_field_ref(p, class)?),
		"putstatic" => (method_handle::PUT_STATIC, parse_field_ref(p, class)?),
		"invokevirtual" => (method_handle::INVOKE_VIRTUAL, parse_method_ref(p, class)?),
		"invokestatic" => (method_handle::INVOKE_STATIC, parse_method_ref(p, class)?),
		"invokespecial" => (method_handle::INVOKE_SPECIAL, parse_method_ref(p, class)?),
		"newinvokespecial" => (method_handle::NEW_INVOKE_SPECIAL, parse_method_ref(p, class)?),
		"invokeinterface" => (method_handle::INVOKE_INTERFACE, parse_interface_method_ref(p, class)?),
		_ => return p.fail(format!("Unknown reference kind {kind_word}.")),
	};

	p.lift(class.pool.add_method_handle(kind, reference))
}

/// Parses a loadable constant: either the explicit `(Type) literal` cast
/// form, or a literal whose type is inferred from its shape.
pub fn parse_loadable(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<u16> {
	// Simple type detection: java cast format.
	if p.accept_punct('(')? {
		let cast = p.expect_word("loadable constant type")?;
		p.expect_punct(')', "loadable constant type close")?;
		return match cast.as_str() {
			"boolean" => parse_boolean(p, class),
			"byte" | "char" | "int" | "short" => parse_integer(p, class),
			"double" => parse_double(p, class),
			"float" => parse_float(p, class),
			"long" => parse_long(p, class),
			"String" => parse_string(p, class),
			"Class" => parse_class(p, class),
			"MethodHandle" => parse_method_handle(p, class),
			"MethodType" => parse_method_type(p, class),
			"Dynamic" => parse_dynamic(p, class),
			_ => p.fail(format!("Unknown loadable constant type {cast}.")),
		};
	}

	// Difficult type detection: inferring from format.
	if p.peek_is_char()? {
		return parse_integer(p, class);
	}

	if p.peek_is_string()? {
		return parse_string(p, class);
	}

	if let Some(number) = p.accept_number()? {
		if let Some(suffix) = p.accept_word()? {
			match suffix.to_uppercase().as_str() {
				"D" => return p.lift(class.pool.add_double(number)),
				"F" => return p.lift(class.pool.add_float(number as f32)),
				"L" => return p.lift(class.pool.add_long(number as i64)),
				_ => p.push_back(),
			}
		}

		return p.lift(class.pool.add_integer(number as i32));
	}

	if let Some(word) = p.accept_word()? {
		p.push_back();
		if word == "true" || word == "false" {
			return parse_integer(p, class);
		}

		return parse_class(p, class);
	}

	p.fail("Unknown loadable constant type.")
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::pool::Constant;
	use classfile::tree::class::ProgramClass;
	use crate::parse::Parser;
	use super::parse_loadable;

	fn parse(source: &str) -> (ProgramClass, u16) {
		let mut class = ProgramClass::default();
		class.this_class = class.pool.add_class("Example").unwrap();
		let index = parse_loadable(&mut Parser::new(source), &mut class).unwrap();
		(class, index)
	}

	#[test]
	fn inferred_forms() {
		let (class, index) = parse("42");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Integer(42));

		let (class, index) = parse("42l");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Long(42));

		let (class, index) = parse("2.5f");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Float(2.5f32.to_bits()));

		let (class, index) = parse("'A'");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Integer(65));

		let (class, index) = parse("\"hi\"");
		assert!(matches!(class.pool.get(index).unwrap(), Constant::String { .. }));

		let (class, index) = parse("java.lang.Thread");
		assert_eq!(class.pool.class_name(index).unwrap(), "java/lang/Thread");
	}

	#[test]
	fn booleans_encode_as_one_and_zero() {
		let (class, index) = parse("true");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Integer(1));

		let (class, index) = parse("false");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Integer(0));
	}

	#[test]
	fn cast_forms() {
		let (class, index) = parse("(long) 7");
		assert_eq!(class.pool.get(index).unwrap(), &Constant::Long(7));

		let (class, index) = parse("(Class) java.util.List");
		assert_eq!(class.pool.class_name(index).unwrap(), "java/util/List");

		let (class, index) = parse("(MethodHandle) invokestatic java.lang.Math#double sqrt(double)");
		assert!(matches!(class.pool.get(index).unwrap(), Constant::MethodHandle { kind: 6, .. }));
	}

	#[test]
	fn this_class_shorthand() {
		let (class, index) = parse("(MethodHandle) getfield #int value");
		let Constant::MethodHandle { reference, .. } = class.pool.get(index).unwrap() else {
			panic!("not a method handle");
		};
		let (field_class, name, descriptor) = class.pool.member_ref(*reference).unwrap();
		assert_eq!(field_class, class.this_class);
		assert_eq!(name, "value");
		assert_eq!(descriptor, "I");
	}

	#[test]
	fn unknown_cast_fails() {
		let mut class = ProgramClass::default();
		let error = parse_loadable(&mut Parser::new("(Widget) 3"), &mut class).unwrap_err();
		assert_eq!(error.to_string(), "Line 1: Unknown loadable constant type Widget.");
	}
}
