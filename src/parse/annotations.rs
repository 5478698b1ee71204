//! Parsing annotations, type annotations and element values.

use classfile::constants::{element_value, target_type, type_path};
use classfile::tree::annotation::{Annotation, ElementPair, ElementValue, LocalVariableTarget, TargetInfo, TypeAnnotation, TypePathEntry};
use classfile::tree::class::ProgramClass;
use crate::error::ParseResult;
use crate::parse::{constant, Parser};

pub fn parse_annotations(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Vec<Annotation>> {
	let mut annotations = Vec::new();

	p.expect_punct('{', "annotations open")?;
	while !p.accept_punct('}')? {
		annotations.push(parse_annotation(p, class)?);
	}

	Ok(annotations)
}

pub fn parse_parameter_annotations(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Vec<Vec<Annotation>>> {
	let mut parameters = Vec::new();

	p.expect_punct('{', "parameter annotations open")?;
	while !p.accept_punct('}')? {
		parameters.push(parse_annotations(p, class)?);
	}

	Ok(parameters)
}

pub fn parse_type_annotations(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Vec<TypeAnnotation>> {
	let mut annotations = Vec::new();

	p.expect_punct('{', "type annotations open")?;
	while !p.accept_punct('}')? {
		annotations.push(parse_type_annotation(p, class)?);
	}

	Ok(annotations)
}

pub fn parse_annotation(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Annotation> {
	let annotation_type = p.expect_type("annotation type")?;
	let mut annotation = Annotation {
		type_index: p.lift(class.pool.add_utf8(&annotation_type))?,
		elements: Vec::new(),
	};

	p.expect_punct('{', "annotation open")?;
	while !p.accept_punct('}')? {
		let element_name = p.expect_word("element name")?;
		p.expect_punct('=', "element value equals")?;
		let value = parse_element_value(p, class)?;
		annotation.elements.push(ElementPair {
			name: p.lift(class.pool.add_utf8(&element_name))?,
			value,
		});
	}

	Ok(annotation)
}

fn parse_type_annotation(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<TypeAnnotation> {
	let annotation = parse_annotation(p, class)?;
	let target_info = parse_target_info(p)?;

	let mut type_path = Vec::new();
	p.expect_punct('{', "type path open")?;
	while !p.accept_punct('}')? {
		type_path.push(parse_type_path_entry(p)?);
	}

	Ok(TypeAnnotation { target_info, type_path, annotation })
}

fn parse_target_info(p: &mut Parser) -> ParseResult<TargetInfo> {
	let keyword = p.expect_word("target info type")?;
	Ok(match keyword.as_str() {
		"parameter_generic_class" => TargetInfo::TypeParameter {
			target_type: target_type::PARAMETER_GENERIC_CLASS,
			index: p.expect_number("type parameter index")? as u8,
		},
		"parameter_generic_method" => TargetInfo::TypeParameter {
			target_type: target_type::PARAMETER_GENERIC_METHOD,
			index: p.expect_number("type parameter index")? as u8,
		},
		"extends" => TargetInfo::SuperType {
			index: p.expect_number("super type index")? as u16,
		},
		"bound_generic_class" => TargetInfo::TypeParameterBound {
			target_type: target_type::BOUND_GENERIC_CLASS,
			type_parameter: p.expect_number("type parameter index")? as u8,
			bound: p.expect_number("bound index")? as u8,
		},
		"bound_generic_method" => TargetInfo::TypeParameterBound {
			target_type: target_type::BOUND_GENERIC_METHOD,
			type_parameter: p.expect_number("type parameter index")? as u8,
			bound: p.expect_number("bound index")? as u8,
		},
		"field" => TargetInfo::Empty { target_type: target_type::FIELD },
		"return" => TargetInfo::Empty { target_type: target_type::RETURN },
		"receiver" => TargetInfo::Empty { target_type: target_type::RECEIVER },
		"parameter" => TargetInfo::FormalParameter {
			index: p.expect_number("formal parameter index")? as u8,
		},
		"throws" => TargetInfo::Throws {
			index: p.expect_number("exceptions index")? as u16,
		},
		"local_variable" => parse_local_variable_target(p, target_type::LOCAL_VARIABLE)?,
		"resource_variable" => parse_local_variable_target(p, target_type::RESOURCE_VARIABLE)?,
		"catch" => TargetInfo::Catch {
			exception_table_index: p.expect_number("exception table index")? as u16,
		},
		"instance_of" => TargetInfo::Offset { target_type: target_type::INSTANCE_OF, offset: p.expect_offset()? },
		"new" => TargetInfo::Offset { target_type: target_type::NEW, offset: p.expect_offset()? },
		"method_reference_new" => TargetInfo::Offset { target_type: target_type::METHOD_REFERENCE_NEW, offset: p.expect_offset()? },
		"method_reference" => TargetInfo::Offset { target_type: target_type::METHOD_REFERENCE, offset: p.expect_offset()? },
		"cast" => parse_type_argument_target(p, target_type::CAST)?,
		"argument_generic_method_new" => parse_type_argument_target(p, target_type::ARGUMENT_GENERIC_METHOD_NEW)?,
		"argument_generic_method" => parse_type_argument_target(p, target_type::ARGUMENT_GENERIC_METHOD)?,
		"argument_generic_method_reference_new" => parse_type_argument_target(p, target_type::ARGUMENT_GENERIC_METHOD_REFERENCE_NEW)?,
		"argument_generic_method_reference" => parse_type_argument_target(p, target_type::ARGUMENT_GENERIC_METHOD_REFERENCE)?,
		_ => return p.fail(format!("Unknown target info type {keyword}.")),
	})
}

fn parse_local_variable_target(p: &mut Parser, target_type: u8) -> ParseResult<TargetInfo> {
	let mut table = Vec::new();

	p.expect_punct('{', "local variable target open")?;
	while !p.accept_punct('}')? {
		let start_pc = p.expect_offset()?;
		let end_pc = p.expect_offset()?;
		let index = p.expect_number("local variable target element index")? as u16;
		p.expect_punct(';', "local variable target element end")?;

		// Both bounds stay symbolic; the composer rewrites the pair into a
		// physical start and length.
		table.push(LocalVariableTarget { start_pc, length: end_pc.wrapping_sub(start_pc), index });
	}

	Ok(TargetInfo::LocalVariable { target_type, table })
}

fn parse_type_argument_target(p: &mut Parser, target_type: u8) -> ParseResult<TargetInfo> {
	Ok(TargetInfo::TypeArgument {
		target_type,
		offset: p.expect_offset()?,
		index: p.expect_number("type argument index")? as u8,
	})
}

fn parse_type_path_entry(p: &mut Parser) -> ParseResult<TypePathEntry> {
	let keyword = p.expect_word("type path kind")?;
	let kind = match keyword.as_str() {
		"array" => type_path::ARRAY,
		"inner_type" => type_path::NESTED,
		"wildcard" => type_path::TYPE_ARGUMENT_BOUND,
		"type_argument" => type_path::TYPE_ARGUMENT,
		_ => return p.fail(format!("Unknown type path kind {keyword}.")),
	};

	// The type argument index is optional.
	let mut entry = TypePathEntry { kind, type_argument_index: 0 };
	if !p.accept_punct(';')? {
		entry.type_argument_index = p.expect_number("type argument index")? as u8;
		p.expect_punct(';', "type path info end")?;
	}

	Ok(entry)
}

/// Parses an element value: either the `(Type) value` cast form or a value
/// whose shape decides its type. Primitive and string values consume their
/// `;` terminator; annotation and array values end with their own `}`.
pub fn parse_element_value(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<ElementValue> {
	// Simple type detection: java cast format.
	if p.accept_punct('(')? {
		let cast = p.expect_word("element value type")?;
		p.expect_punct(')', "element value type close")?;
		return match cast.as_str() {
			"boolean" => parse_constant_value(p, class, element_value::BOOLEAN),
			"byte" => parse_constant_value(p, class, element_value::BYTE),
			"char" => parse_constant_value(p, class, element_value::CHAR),
			"double" => parse_constant_value(p, class, element_value::DOUBLE),
			"float" => parse_constant_value(p, class, element_value::FLOAT),
			"int" => parse_constant_value(p, class, element_value::INT),
			"long" => parse_constant_value(p, class, element_value::LONG),
			"short" => parse_constant_value(p, class, element_value::SHORT),
			"String" => parse_constant_value(p, class, element_value::STRING),
			"Class" => {
				let descriptor = p.expect_type("class type")?;
				let value = ElementValue::Class { descriptor: p.lift(class.pool.add_utf8(&descriptor))? };
				p.expect_punct(';', "class element value end")?;
				Ok(value)
			},
			"Annotation" => Ok(ElementValue::Annotation(parse_annotation(p, class)?)),
			"Enum" => parse_enum_constant(p, class),
			"Array" => parse_array(p, class),
			_ => p.fail(format!("Unknown element value type {cast}.")),
		};
	}

	// Difficult type detection: inferring from format.
	if p.accept_punct('@')? {
		return Ok(ElementValue::Annotation(parse_annotation(p, class)?));
	}

	if p.accept_punct('{')? {
		p.push_back();
		return parse_array(p, class);
	}

	if p.peek_is_char()? {
		return parse_constant_value(p, class, element_value::CHAR);
	}

	if p.peek_is_string()? {
		return parse_constant_value(p, class, element_value::STRING);
	}

	if let Some(number) = p.accept_number()? {
		let mut value = None;
		if let Some(suffix) = p.accept_word()? {
			match suffix.to_uppercase().as_str() {
				"D" => value = Some(ElementValue::Constant {
					tag: element_value::DOUBLE,
					value: p.lift(class.pool.add_double(number))?,
				}),
				"F" => value = Some(ElementValue::Constant {
					tag: element_value::FLOAT,
					value: p.lift(class.pool.add_float(number as f32))?,
				}),
				"L" => value = Some(ElementValue::Constant {
					tag: element_value::LONG,
					value: p.lift(class.pool.add_long(number as i64))?,
				}),
				_ => p.push_back(),
			}
		}

		let value = match value {
			Some(value) => value,
			None => ElementValue::Constant {
				tag: element_value::INT,
				value: p.lift(class.pool.add_integer(number as i32))?,
			},
		};

		p.expect_punct(';', "element value end")?;
		return Ok(value);
	}

	if let Some(word) = p.accept_word()? {
		p.push_back();
		if word == "true" || word == "false" {
			return parse_constant_value(p, class, element_value::BOOLEAN);
		}

		let class_type = p.expect_type("class type")?;
		let value = if p.accept_punct('#')? {
			ElementValue::EnumConstant {
				type_name: p.lift(class.pool.add_utf8(&class_type))?,
				constant_name: {
					let name = p.expect_word("enum constant")?;
					p.lift(class.pool.add_utf8(&name))?
				},
			}
		} else {
			ElementValue::Class { descriptor: p.lift(class.pool.add_utf8(&class_type))? }
		};

		p.expect_punct(';', "element value end")?;
		return Ok(value);
	}

	p.fail("Unknown element value type.")
}

fn parse_constant_value(p: &mut Parser, class: &mut ProgramClass, tag: u8) -> ParseResult<ElementValue> {
	let value = match tag {
		element_value::BOOLEAN => constant::parse_boolean(p, class)?,
		element_value::BYTE | element_value::CHAR | element_value::INT | element_value::SHORT =>
			constant::parse_integer(p, class)?,
		element_value::DOUBLE => constant::parse_double(p, class)?,
		element_value::FLOAT => constant::parse_float(p, class)?,
		element_value::LONG => constant::parse_long(p, class)?,
		element_value::STRING => constant::parse_utf8(p, class)?,
		_ => return p.fail(format!("Unknown element value type {}.", tag as char)),
	};

	p.expect_punct(';', "constant element value end")?;
	Ok(ElementValue::Constant { tag, value })
}

fn parse_enum_constant(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<ElementValue> {
	let type_name = p.expect_type("enum constant element value type")?;
	p.expect_punct('#', "enum constant element value separator")?;
	let constant_name = p.expect_word("enum constant element value constant")?;
	p.expect_punct(';', "enum constant element value end")?;

	Ok(ElementValue::EnumConstant {
		type_name: p.lift(class.pool.add_utf8(&type_name))?,
		constant_name: p.lift(class.pool.add_utf8(&constant_name))?,
	})
}

fn parse_array(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<ElementValue> {
	let mut values = Vec::new();

	p.expect_punct('{', "array element value open")?;
	while !p.accept_punct('}')? {
		values.push(parse_element_value(p, class)?);
	}

	Ok(ElementValue::Array(values))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::element_value;
	use classfile::tree::annotation::{ElementValue, TargetInfo};
	use classfile::tree::attribute::Attribute;
	use classfile::tree::class::ProgramClass;
	use crate::parse::Parser;
	use crate::parse::class::parse_class;

	fn parse(source: &str) -> ProgramClass {
		let mut class = ProgramClass::default();
		parse_class(&mut Parser::new(source), &mut class).unwrap();
		class
	}

	#[test]
	fn element_value_inference() {
		let class = parse(
			"class C [ RuntimeVisibleAnnotations { \
				Foo { x = 3.14d; y = \"s\"; z = (Array) { 1; 2; 3; }; } \
			} ];",
		);
		let Attribute::RuntimeVisibleAnnotations(annotations) = &class.attributes[0] else {
			panic!("expected an annotations attribute");
		};
		assert_eq!(class.pool.utf8(annotations[0].type_index).unwrap(), "LFoo;");

		let elements = &annotations[0].elements;
		assert!(matches!(elements[0].value, ElementValue::Constant { tag: element_value::DOUBLE, .. }));
		assert!(matches!(elements[1].value, ElementValue::Constant { tag: element_value::STRING, .. }));

		let ElementValue::Array(values) = &elements[2].value else {
			panic!("expected an array element value");
		};
		assert_eq!(values.len(), 3);
		for value in values {
			assert!(matches!(value, ElementValue::Constant { tag: element_value::INT, .. }));
		}
	}

	#[test]
	fn enum_and_class_values() {
		let class = parse(
			"class C [ RuntimeInvisibleAnnotations { \
				Retention { value = java.lang.annotation.RetentionPolicy#RUNTIME; other = java.lang.Thread; } \
			} ];",
		);
		let Attribute::RuntimeInvisibleAnnotations(annotations) = &class.attributes[0] else {
			panic!("expected an annotations attribute");
		};

		let ElementValue::EnumConstant { type_name, constant_name } = annotations[0].elements[0].value else {
			panic!("expected an enum constant");
		};
		assert_eq!(class.pool.utf8(type_name).unwrap(), "Ljava/lang/annotation/RetentionPolicy;");
		assert_eq!(class.pool.utf8(constant_name).unwrap(), "RUNTIME");

		assert!(matches!(annotations[0].elements[1].value, ElementValue::Class { .. }));
	}

	#[test]
	fn nested_annotation_values() {
		let class = parse(
			"class C [ RuntimeVisibleAnnotations { Outer { inner = @Inner { n = 1; }; } } ];",
		);
		let Attribute::RuntimeVisibleAnnotations(annotations) = &class.attributes[0] else {
			panic!("expected an annotations attribute");
		};
		let ElementValue::Annotation(inner) = &annotations[0].elements[0].value else {
			panic!("expected a nested annotation");
		};
		assert_eq!(class.pool.utf8(inner.type_index).unwrap(), "LInner;");
	}

	#[test]
	fn type_annotation_on_a_field() {
		let class = parse(
			"class C { int x [ RuntimeVisibleTypeAnnotations { NotNull {} field {} } ]; }",
		);
		let Attribute::RuntimeVisibleTypeAnnotations(annotations) = &class.fields[0].attributes[0] else {
			panic!("expected type annotations");
		};
		assert!(matches!(annotations[0].target_info, TargetInfo::Empty { .. }));
		assert!(annotations[0].type_path.is_empty());
	}
}
