//! Parsing attribute blocks: `[` keyword-dispatched attributes `]`.

use classfile::tree::attribute::{Attribute, BootstrapMethod, InnerClass};
use classfile::tree::class::ProgramClass;
use classfile::tree::module::{ModuleExports, ModuleInfo, ModuleOpens, ModuleProvides, ModuleRequires};
use crate::error::ParseResult;
use crate::parse::{annotations, constant, instructions, Parser};

/// What the attribute block being parsed is attached to. The Code attribute
/// needs to know the enclosing method.
#[derive(Clone, Copy)]
pub enum AttributeTarget<'a> {
	Class,
	Field,
	Method { access_flags: u16, descriptor: &'a str },
}

pub fn parse_attributes(p: &mut Parser, class: &mut ProgramClass, target: AttributeTarget, attributes: &mut Vec<Attribute>) -> ParseResult<()> {
	while !p.accept_punct(']')? {
		attributes.push(parse_attribute(p, class, target)?);
	}

	Ok(())
}

pub fn parse_attribute(p: &mut Parser, class: &mut ProgramClass, target: AttributeTarget) -> ParseResult<Attribute> {
	let name = p.expect_word("attribute name")?;
	Ok(match name.as_str() {
		"BootstrapMethods" => parse_bootstrap_methods(p, class)?,
		"SourceFile" => {
			let string = p.expect_string("source file")?;
			let source_file = p.lift(class.pool.add_utf8(&string))?;
			p.expect_punct(';', "source file end")?;
			Attribute::SourceFile { source_file }
		},
		"SourceDir" => {
			let string = p.expect_string("source dir")?;
			let source_dir = p.lift(class.pool.add_utf8(&string))?;
			p.expect_punct(';', "source dir end")?;
			Attribute::SourceDir { source_dir }
		},
		"InnerClasses" => parse_inner_classes(p, class)?,
		"EnclosingMethod" => {
			let enclosing_class = constant::parse_class(p, class)?;
			// The enclosing method itself is optional.
			let name_and_type = if p.accept_punct('#')? {
				let return_type = p.expect_type("enclosing method return type")?;
				let method_name = p.expect_method_name("enclosing method name")?;
				let arguments = p.expect_method_arguments("enclosing method arguments")?;
				p.lift(class.pool.add_name_and_type(&method_name, &format!("{arguments}{return_type}")))?
			} else {
				0
			};
			p.expect_punct(';', "enclosing method end")?;
			Attribute::EnclosingMethod { class: enclosing_class, name_and_type }
		},
		"NestHost" => {
			let host_class = constant::parse_class(p, class)?;
			p.expect_punct(';', "nest host end")?;
			Attribute::NestHost { host_class }
		},
		"NestMembers" => {
			let mut classes = Vec::new();
			p.expect_punct('{', "nest members open")?;
			while !p.accept_punct('}')? {
				classes.push(constant::parse_class(p, class)?);
				p.expect_punct(';', "nest member end")?;
			}
			Attribute::NestMembers { classes }
		},
		"Deprecated" => {
			p.expect_punct(';', "deprecated end")?;
			Attribute::Deprecated
		},
		"Synthetic" => {
			p.expect_punct(';', "synthetic end")?;
			Attribute::Synthetic
		},
		"Signature" => {
			let string = p.expect_string("signature")?;
			let signature = p.lift(class.pool.add_utf8(&string))?;
			p.expect_punct(';', "signature end")?;
			Attribute::Signature { signature }
		},
		"Code" => match target {
			AttributeTarget::Method { access_flags, descriptor } =>
				instructions::parse_code_attribute(p, class, access_flags, descriptor, true)?,
			_ => return p.fail("The Code attribute only applies to methods."),
		},
		"RuntimeVisibleAnnotations" =>
			Attribute::RuntimeVisibleAnnotations(annotations::parse_annotations(p, class)?),
		"RuntimeInvisibleAnnotations" =>
			Attribute::RuntimeInvisibleAnnotations(annotations::parse_annotations(p, class)?),
		"RuntimeVisibleParameterAnnotations" =>
			Attribute::RuntimeVisibleParameterAnnotations(annotations::parse_parameter_annotations(p, class)?),
		"RuntimeInvisibleParameterAnnotations" =>
			Attribute::RuntimeInvisibleParameterAnnotations(annotations::parse_parameter_annotations(p, class)?),
		"RuntimeVisibleTypeAnnotations" =>
			Attribute::RuntimeVisibleTypeAnnotations(annotations::parse_type_annotations(p, class)?),
		"RuntimeInvisibleTypeAnnotations" =>
			Attribute::RuntimeInvisibleTypeAnnotations(annotations::parse_type_annotations(p, class)?),
		"AnnotationDefault" => Attribute::AnnotationDefault(annotations::parse_element_value(p, class)?),
		"Module" => parse_module(p, class)?,
		"ModuleMainClass" => {
			let main_class = constant::parse_class(p, class)?;
			p.expect_punct(';', "module main class end")?;
			Attribute::ModuleMainClass { main_class }
		},
		"ModulePackages" => {
			let mut packages = Vec::new();
			p.expect_punct('{', "module packages open")?;
			while !p.accept_punct('}')? {
				packages.push(constant::parse_package(p, class)?);
				p.expect_punct(';', "module package end")?;
			}
			Attribute::ModulePackages { packages }
		},
		_ => return p.fail(format!("Unknown attribute name {name}.")),
	})
}

fn parse_bootstrap_methods(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Attribute> {
	let mut methods = Vec::new();

	p.expect_punct('{', "bootstrap methods open")?;
	while !p.accept_punct('}')? {
		let method_handle = constant::parse_method_handle(p, class)?;

		let mut arguments = Vec::new();
		p.expect_punct('{', "bootstrap method arguments open")?;
		while !p.accept_punct('}')? {
			arguments.push(constant::parse_loadable(p, class)?);
			p.expect_punct(';', "bootstrap method argument end")?;
		}

		methods.push(BootstrapMethod { method_handle, arguments });
	}

	Ok(Attribute::BootstrapMethods(methods))
}

fn parse_inner_classes(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Attribute> {
	let mut classes = Vec::new();

	p.expect_punct('{', "inner classes open")?;
	while !p.accept_punct('}')? {
		let access_flags = p.expect_class_access_flags()?;
		let name = crate::types::internal_class_name(&p.expect_word("inner class")?);
		let mut inner = InnerClass {
			inner_class: p.lift(class.pool.add_class(&name))?,
			outer_class: 0,
			inner_name: 0,
			access_flags,
		};

		while let Some(keyword) = p.accept_keyword(&["as", "in"])? {
			if keyword == "as" {
				// The inner name is optional.
				let inner_name = p.expect_word("inner name")?;
				inner.inner_name = p.lift(class.pool.add_utf8(&inner_name))?;
			} else {
				// The outer class is optional.
				inner.outer_class = constant::parse_class(p, class)?;
			}
		}

		p.expect_punct(';', "inner class end")?;
		classes.push(inner);
	}

	Ok(Attribute::InnerClasses(classes))
}

/// Module version strings are often numeric (`9`, `1.0`), in which case
/// they lex as numbers rather than words.
fn accept_version_word(p: &mut Parser) -> ParseResult<Option<String>> {
	if let Some(number) = p.accept_number()? {
		return Ok(Some(crate::print::format_number(number)));
	}

	p.accept_word()
}

fn parse_module(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<Attribute> {
	let mut module = ModuleInfo {
		flags: p.expect_access_flags()?,
		name: constant::parse_module(p, class)?,
		..ModuleInfo::default()
	};

	// The module version is optional.
	if let Some(version) = accept_version_word(p)? {
		module.version = p.lift(class.pool.add_utf8(&version))?;
	}

	p.expect_punct('{', "module open")?;
	while !p.accept_punct('}')? {
		let directive = p.expect_word("module directive")?;
		match directive.as_str() {
			"requires" => {
				let mut requires = ModuleRequires {
					flags: p.expect_access_flags()?,
					module: constant::parse_module(p, class)?,
					version: 0,
				};
				// The required module version is optional.
				if !p.accept_punct(';')? {
					let version = match accept_version_word(p)? {
						Some(version) => version,
						None => p.expect_word("requires module version")?,
					};
					requires.version = p.lift(class.pool.add_utf8(&version))?;
					p.expect_punct(';', "requires end")?;
				}
				module.requires.push(requires);
			},
			"exports" => {
				let mut exports = ModuleExports {
					flags: p.expect_access_flags()?,
					package: constant::parse_package(p, class)?,
					to: Vec::new(),
				};
				if !p.accept_punct(';')? {
					p.expect_keyword(&["to"])?;
					loop {
						exports.to.push(constant::parse_module(p, class)?);
						if p.accept_punct(';')? {
							break;
						}
						p.expect_punct(',', "exports to separator")?;
					}
				}
				module.exports.push(exports);
			},
			"opens" => {
				let mut opens = ModuleOpens {
					flags: p.expect_access_flags()?,
					package: constant::parse_package(p, class)?,
					to: Vec::new(),
				};
				if !p.accept_punct(';')? {
					p.expect_keyword(&["to"])?;
					loop {
						opens.to.push(constant::parse_module(p, class)?);
						if p.accept_punct(';')? {
							break;
						}
						p.expect_punct(',', "opens to separator")?;
					}
				}
				module.opens.push(opens);
			},
			"uses" => {
				module.uses.push(constant::parse_class(p, class)?);
				p.expect_punct(';', "uses end")?;
			},
			"provides" => {
				let mut provides = ModuleProvides {
					service: constant::parse_class(p, class)?,
					with: Vec::new(),
				};
				if !p.accept_punct(';')? {
					p.expect_keyword(&["with"])?;
					loop {
						provides.with.push(constant::parse_class(p, class)?);
						if p.accept_punct(';')? {
							break;
						}
						p.expect_punct(',', "provides with separator")?;
					}
				}
				module.provides.push(provides);
			},
			_ => return p.keyword_error(&["requires", "exports", "opens", "uses", "provides"], &directive),
		}
	}

	Ok(Attribute::Module(module))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
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
	fn source_file_and_signature() {
		let class = parse("class C [ SourceFile \"C.java\"; Signature \"LC<TT;>;\"; ];");
		let Attribute::SourceFile { source_file } = class.attributes[0] else {
			panic!("expected a source file attribute");
		};
		assert_eq!(class.pool.utf8(source_file).unwrap(), "C.java");
		assert!(matches!(class.attributes[1], Attribute::Signature { .. }));
	}

	#[test]
	fn unknown_attribute_name_fails() {
		let mut class = ProgramClass::default();
		let error = parse_class(&mut Parser::new("class C [ Sparkles; ];"), &mut class).unwrap_err();
		assert_eq!(error.to_string(), "Line 1: Unknown attribute name Sparkles.");
	}

	#[test]
	fn inner_classes() {
		let class = parse("class C [ InnerClasses { public static class C$Inner as Inner in C; } ];");
		let Attribute::InnerClasses(classes) = &class.attributes[0] else {
			panic!("expected an inner classes attribute");
		};
		assert_eq!(class.pool.class_name(classes[0].inner_class).unwrap(), "C$Inner");
		assert_eq!(class.pool.utf8(classes[0].inner_name).unwrap(), "Inner");
		assert_eq!(class.pool.class_name(classes[0].outer_class).unwrap(), "C");
	}

	#[test]
	fn bootstrap_methods() {
		let class = parse(
			"class C [ BootstrapMethods { \
				invokestatic java.lang.invoke.LambdaMetafactory#java.lang.invoke.CallSite metafactory() { \"x\"; 7; } \
			} ];",
		);
		let Attribute::BootstrapMethods(methods) = &class.attributes[0] else {
			panic!("expected a bootstrap methods attribute");
		};
		assert_eq!(methods[0].arguments.len(), 2);
	}

	#[test]
	fn module_attribute() {
		let class = parse(
			"module m [ Module open m 1.0 { \
				requires transitive java.base 9; \
				exports com.example to other.module; \
				uses java.lang.Runnable; \
				provides java.lang.Runnable with com.example.Impl; \
			} ];",
		);
		let Attribute::Module(module) = &class.attributes[0] else {
			panic!("expected a module attribute");
		};
		assert_eq!(class.pool.module_name(module.name).unwrap(), "m");
		assert_eq!(module.requires.len(), 1);
		assert_eq!(module.exports[0].to.len(), 1);
		assert_eq!(class.pool.package_name(module.exports[0].package).unwrap(), "com/example");
		assert_eq!(module.provides[0].with.len(), 1);
	}
}
