//! Parsing field and method declarations.

use classfile::tree::attribute::{Attribute, MethodParameter};
use classfile::tree::class::{Member, ProgramClass};
use crate::error::ParseResult;
use crate::parse::{attributes, constant, instructions, Parser};
use crate::parse::attributes::AttributeTarget;
use crate::types;

/// Parses class member declarations up to the closing `}`.
pub fn parse_members(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<()> {
	while !p.accept_punct('}')? {
		// A fair amount of lookahead is needed before we know which kind of
		// member is being declared.
		let access_flags = p.expect_access_flags()?;

		if p.accept_punct('[')? || p.accept_punct('{')? {
			// Nothing between the access flags and an attribute block or
			// body: a <clinit> method.
			p.push_back();

			let mut method = Member {
				access_flags,
				name: p.lift(class.pool.add_utf8("<clinit>"))?,
				descriptor: p.lift(class.pool.add_utf8("()V"))?,
				attributes: Vec::new(),
			};
			parse_method_rest(p, class, &mut method, "()V")?;
			class.methods.push(method);
			continue;
		}

		let descriptor = p.expect_type("class member type")?;
		let name = p.expect_method_name("class member name")?;

		if p.accept_punct('(')? {
			let (arguments, parameters) = parse_method_parameters(p, class)?;
			let full_descriptor = format!("{arguments}{descriptor}");

			let mut method = Member {
				access_flags,
				name: p.lift(class.pool.add_utf8(&name))?,
				descriptor: p.lift(class.pool.add_utf8(&full_descriptor))?,
				attributes: Vec::new(),
			};
			parse_method_rest(p, class, &mut method, &full_descriptor)?;

			if !parameters.is_empty() {
				method.attributes.push(Attribute::MethodParameters(parameters));
			}

			class.methods.push(method);
		} else {
			let mut field = Member {
				access_flags,
				name: p.lift(class.pool.add_utf8(&name))?,
				descriptor: p.lift(class.pool.add_utf8(&descriptor))?,
				attributes: Vec::new(),
			};

			if p.accept_punct('=')? {
				let value = constant::parse_loadable(p, class)?;
				field.attributes.push(Attribute::ConstantValue { value });
			}

			if p.accept_punct('[')? {
				let mut field_attributes = std::mem::take(&mut field.attributes);
				attributes::parse_attributes(p, class, AttributeTarget::Field, &mut field_attributes)?;
				field.attributes = field_attributes;
			}

			p.expect_punct(';', "field end")?;
			class.fields.push(field);
		}
	}

	Ok(())
}

/// Parses everything of a method after its name and parameter list: a
/// `throws` clause, an attribute block, and either `;` or a code body.
fn parse_method_rest(p: &mut Parser, class: &mut ProgramClass, method: &mut Member, descriptor: &str) -> ParseResult<()> {
	if p.accept_keyword(&["throws"])?.is_some() {
		let mut exceptions = Vec::new();
		loop {
			let name = types::internal_class_name(&p.expect_word("exception class")?);
			exceptions.push(p.lift(class.pool.add_class(&name))?);
			if !p.accept_punct(',')? {
				break;
			}
		}
		method.attributes.push(Attribute::Exceptions { exceptions });
	}

	if p.accept_punct('[')? {
		let mut method_attributes = std::mem::take(&mut method.attributes);
		let target = AttributeTarget::Method { access_flags: method.access_flags, descriptor };
		attributes::parse_attributes(p, class, target, &mut method_attributes)?;
		method.attributes = method_attributes;
	}

	if p.accept_punct('{')? {
		let code = instructions::parse_code_attribute(p, class, method.access_flags, descriptor, false)?;
		method.attributes.push(code);
	} else {
		p.expect_punct(';', "method end")?;
	}

	Ok(())
}

/// Parses the parameter list of a method declaration. Each parameter may
/// carry access flags and a name, which populate the MethodParameters
/// attribute; the attribute entries are returned empty when no parameter
/// declared either.
fn parse_method_parameters(p: &mut Parser, class: &mut ProgramClass) -> ParseResult<(String, Vec<MethodParameter>)> {
	let mut arguments = String::from("(");
	let mut parameters = Vec::new();

	if p.accept_punct(')')? {
		arguments.push(')');
		return Ok((arguments, parameters));
	}

	loop {
		// Syntactic sugar: parameter access flags and names in the
		// descriptor position.
		let mut parameter = MethodParameter {
			access_flags: p.expect_access_flags()?,
			name: 0,
		};
		arguments.push_str(&p.expect_type("method parameter type")?);

		if let Some(name) = p.accept_word()? {
			parameter.name = p.lift(class.pool.add_utf8(&name))?;
		}

		parameters.push(parameter);

		if p.accept_punct(')')? {
			break;
		}
		p.expect_punct(',', "method arguments separator")?;
	}

	arguments.push(')');

	// Only keep the attribute when some parameter actually declared a name
	// or access flags.
	if parameters.iter().all(|parameter| parameter.access_flags == 0 && parameter.name == 0) {
		parameters.clear();
	}

	Ok((arguments, parameters))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use classfile::constants::access;
	use classfile::pool::Constant;
	use classfile::tree::attribute::{Attribute, MethodParameter};
	use classfile::tree::class::ProgramClass;
	use crate::parse::Parser;
	use crate::parse::class::parse_class;

	fn parse(source: &str) -> ProgramClass {
		let mut class = ProgramClass::default();
		parse_class(&mut Parser::new(source), &mut class).unwrap();
		class
	}

	#[test]
	fn field_with_constant_value() {
		let class = parse("class C { public static final int answer = 42; }");
		let field = &class.fields[0];
		assert_eq!(field.access_flags, access::PUBLIC | access::STATIC | access::FINAL);
		assert_eq!(field.name(&class.pool).unwrap(), "answer");

		let Attribute::ConstantValue { value } = field.attributes[0] else {
			panic!("expected a constant value attribute");
		};
		assert_eq!(class.pool.get(value).unwrap(), &Constant::Integer(42));
	}

	#[test]
	fn abstract_method_has_no_code() {
		let class = parse("abstract class C { public abstract int size(); }");
		let method = &class.methods[0];
		assert_eq!(method.descriptor(&class.pool).unwrap(), "()I");
		assert!(method.attributes.is_empty());
	}

	#[test]
	fn throws_clause_becomes_the_exceptions_attribute() {
		let class = parse("class C { void run() throws java.io.IOException, java.lang.Error; }");
		let Attribute::Exceptions { exceptions } = &class.methods[0].attributes[0] else {
			panic!("expected an exceptions attribute");
		};
		assert_eq!(exceptions.len(), 2);
		assert_eq!(class.pool.class_name(exceptions[0]).unwrap(), "java/io/IOException");
	}

	#[test]
	fn named_parameters_populate_method_parameters() {
		let class = parse("class C { void greet(java.lang.String name, final int count); }");
		let method = &class.methods[0];
		assert_eq!(method.descriptor(&class.pool).unwrap(), "(Ljava/lang/String;I)V");

		let Attribute::MethodParameters(parameters) = &method.attributes[0] else {
			panic!("expected a method parameters attribute");
		};
		assert_eq!(class.pool.utf8(parameters[0].name).unwrap(), "name");
		assert_eq!(parameters[1], MethodParameter { name: 0, access_flags: access::FINAL });
	}

	#[test]
	fn unnamed_parameters_elide_method_parameters() {
		let class = parse("class C { void take(int, int); }");
		assert!(class.methods[0].attributes.is_empty());
	}

	#[test]
	fn clinit_shorthand() {
		let class = parse("class C { static { return } }");
		let method = &class.methods[0];
		assert_eq!(method.name(&class.pool).unwrap(), "<clinit>");
		assert_eq!(method.descriptor(&class.pool).unwrap(), "()V");
		assert_eq!(method.access_flags, access::STATIC);
		assert!(matches!(method.attributes[0], Attribute::Code(..)));
	}
}
