//! Parsing the top level structure: imports, version, class declaration.

use classfile::constants::{access, class_names};
use classfile::tree::class::ProgramClass;
use crate::error::ParseResult;
use crate::parse::{attributes, members, Parser};
use crate::parse::attributes::AttributeTarget;
use crate::print::format_number;
use crate::types;

/// Parses a whole jbc source into the given (empty) class.
pub fn parse_class(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<()> {
	while let Some(keyword) = p.accept_word()? {
		match keyword.as_str() {
			"import" => {
				let class_name = p.expect_word("class name")?;
				p.expect_punct(';', "import end")?;
				if let Some((_, simple)) = class_name.rsplit_once('.') {
					p.imports.insert(simple.to_owned(), class_name.clone());
				}
			},
			"version" => {
				let number = p.expect_number("version number")?;
				let directive = format_number(number);
				class.version = match types::version_from_directive(&directive) {
					Some(version) => version,
					None => return p.fail(format!("Unknown class version {directive}.")),
				};
				p.expect_punct(';', "version end")?;
			},
			_ => {
				p.push_back();
				break;
			},
		}
	}

	class.access_flags = p.expect_class_access_flags()?;
	let this_name = types::internal_class_name(&p.expect_word("this class")?);
	class.this_class = p.lift(class.pool.add_class(&this_name))?;

	// Syntactic sugar: extends in interfaces defines bytecode interfaces.
	if class.access_flags & access::INTERFACE != 0 {
		if p.accept_keyword(&["extends"])?.is_some() {
			parse_interfaces(p, class)?;
		}
	} else {
		if let Some(word) = p.accept_word()? {
			if word == "extends" {
				let super_name = types::internal_class_name(&p.expect_word("super class")?);
				class.super_class = p.lift(class.pool.add_class(&super_name))?;
			} else {
				p.push_back();
			}
		}

		while p.accept_keyword(&["implements"])?.is_some() {
			parse_interfaces(p, class)?;
		}
	}

	// Syntactic sugar: default superclasses.
	if class.super_class == 0 {
		if class.access_flags & access::ENUM != 0 {
			class.super_class = p.lift(class.pool.add_class(class_names::JAVA_LANG_ENUM))?;
		} else if class.access_flags & access::MODULE == 0 && this_name != class_names::JAVA_LANG_OBJECT {
			class.super_class = p.lift(class.pool.add_class(class_names::JAVA_LANG_OBJECT))?;
		}
	}

	// Syntactic sugar: the default interface of annotations.
	if class.access_flags & access::ANNOTATION != 0 && !implements(class, class_names::JAVA_LANG_ANNOTATION_ANNOTATION) {
		let interface = p.lift(class.pool.add_class(class_names::JAVA_LANG_ANNOTATION_ANNOTATION))?;
		class.interfaces.push(interface);
	}

	if p.accept_punct('[')? {
		let mut class_attributes = Vec::new();
		attributes::parse_attributes(p, class, AttributeTarget::Class, &mut class_attributes)?;
		class.attributes = class_attributes;
	}

	if p.accept_punct('{')? {
		members::parse_members(p, class)?;
	} else {
		p.expect_punct(';', "class end")?;
	}

	Ok(())
}

fn parse_interfaces(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<()> {
	loop {
		let name = types::internal_class_name(&p.expect_word("interface class")?);
		let interface = p.lift(class.pool.add_class(&name))?;
		class.interfaces.push(interface);

		if !p.accept_punct(',')? {
			return Ok(());
		}
	}
}

fn implements(class: &ProgramClass, interface: &str) -> bool {
	class.interfaces.iter()
		.any(|&index| class.pool.class_name(index).is_ok_and(|name| name == interface))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::access;
	use classfile::tree::class::ProgramClass;
	use classfile::tree::version::Version;
	use crate::parse::Parser;
	use super::parse_class;

	fn parse(source: &str) -> ProgramClass {
		let mut class = ProgramClass::default();
		parse_class(&mut Parser::new(source), &mut class).unwrap();
		class
	}

	#[test]
	fn minimal_class() {
		let class = parse("version 8; public class Hello;");
		assert_eq!(class.version, Version::new(52, 0));
		assert_eq!(class.access_flags, access::PUBLIC | access::SUPER);
		assert_eq!(class.name().unwrap(), "Hello");
		assert_eq!(class.super_name().unwrap(), Some("java/lang/Object"));
	}

	#[test]
	fn imports_expand_in_member_types() {
		let class = parse("import java.lang.String; class C { String name; }");
		assert_eq!(class.fields[0].descriptor(&class.pool).unwrap(), "Ljava/lang/String;");
	}

	#[test]
	fn enums_default_to_java_lang_enum() {
		let class = parse("public enum E;");
		assert_eq!(class.access_flags, access::PUBLIC | access::SUPER | access::ENUM);
		assert_eq!(class.super_name().unwrap(), Some("java/lang/Enum"));
	}

	#[test]
	fn java_lang_object_has_no_super() {
		let class = parse("class java.lang.Object;");
		assert_eq!(class.super_class, 0);
	}

	#[test]
	fn annotations_get_the_annotation_interface() {
		let class = parse("public @interface Marker;");
		assert_eq!(class.interfaces.len(), 1);
		assert_eq!(class.pool.class_name(class.interfaces[0]).unwrap(), "java/lang/annotation/Annotation");
	}

	#[test]
	fn interface_extends_lists_interfaces() {
		let class = parse("interface I extends java.lang.Comparable, java.io.Serializable;");
		assert_eq!(class.interfaces.len(), 2);
		assert_eq!(class.super_name().unwrap(), Some("java/lang/Object"));
	}
}
