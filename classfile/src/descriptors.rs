//! Walking internal field and method descriptors.
//!
//! The grammar, from the Java Virtual Machine Specification:
//!
//! ```txt,ignore
//! FieldDescriptor: FieldType
//! MethodDescriptor: "(" FieldType* ")" ( FieldType | "V" )
//! FieldType: "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z"
//!          | "L" ClassName ";" | "[" FieldType
//! ```

use anyhow::{anyhow, bail, Result};

/// Splits off the first field type of `descriptor`, returning it and the
/// rest.
fn split_field_type(descriptor: &str) -> Result<(&str, &str)> {
	let mut end = 0;
	let bytes = descriptor.as_bytes();

	while bytes.get(end) == Some(&b'[') {
		end += 1;
	}

	match bytes.get(end) {
		Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => Ok(descriptor.split_at(end + 1)),
		Some(b'L') => {
			let semicolon = descriptor[end..].find(';')
				.ok_or_else(|| anyhow!("unterminated class name in descriptor {descriptor:?}"))?;
			Ok(descriptor.split_at(end + semicolon + 1))
		},
		Some(x) => bail!("unexpected character {:?} in descriptor {descriptor:?}", *x as char),
		None => bail!("unexpected end of descriptor {descriptor:?}"),
	}
}

/// The parameter types of a method descriptor, as descriptor slices.
pub fn parameter_descriptors(descriptor: &str) -> Result<Vec<&str>> {
	let inner = descriptor.strip_prefix('(')
		.ok_or_else(|| anyhow!("method descriptor {descriptor:?} does not start with '('"))?;
	let end = inner.find(')')
		.ok_or_else(|| anyhow!("method descriptor {descriptor:?} has no ')'"))?;

	let mut parameters = Vec::new();
	let mut rest = &inner[..end];
	while !rest.is_empty() {
		let (parameter, tail) = split_field_type(rest)?;
		parameters.push(parameter);
		rest = tail;
	}

	Ok(parameters)
}

/// The return type of a method descriptor, as a descriptor slice (`"V"` for
/// void).
pub fn return_descriptor(descriptor: &str) -> Result<&str> {
	let end = descriptor.find(')')
		.ok_or_else(|| anyhow!("method descriptor {descriptor:?} has no ')'"))?;
	Ok(&descriptor[end + 1..])
}

/// The number of operand stack or local variable slots a value of the given
/// field type occupies; void occupies none.
pub fn field_type_size(descriptor: &str) -> u32 {
	match descriptor.as_bytes().first() {
		Some(b'J' | b'D') => 2,
		Some(b'V') => 0,
		_ => 1,
	}
}

/// The total slot count of a method's parameters, excluding the receiver.
pub fn method_parameter_size(descriptor: &str) -> Result<u32> {
	Ok(parameter_descriptors(descriptor)?
		.iter()
		.map(|parameter| field_type_size(parameter))
		.sum())
}

/// The slot count of a method's return value.
pub fn method_return_size(descriptor: &str) -> Result<u32> {
	Ok(field_type_size(return_descriptor(descriptor)?))
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use super::*;

	#[test]
	fn parameters() -> Result<()> {
		assert_eq!(parameter_descriptors("()V")?, Vec::<&str>::new());
		assert_eq!(parameter_descriptors("(I)V")?, vec!["I"]);
		assert_eq!(
			parameter_descriptors("(ILjava/lang/String;[[DJ)Ljava/lang/Object;")?,
			vec!["I", "Ljava/lang/String;", "[[D", "J"],
		);
		Ok(())
	}

	#[test]
	fn sizes() -> Result<()> {
		assert_eq!(method_parameter_size("(IJD)V")?, 5);
		assert_eq!(method_parameter_size("(Ljava/lang/String;)I")?, 1);
		assert_eq!(method_return_size("()J")?, 2);
		assert_eq!(method_return_size("()V")?, 0);
		Ok(())
	}

	#[test]
	fn malformed() {
		assert!(parameter_descriptors("I").is_err());
		assert!(parameter_descriptors("(L)V").is_err());
		assert!(parameter_descriptors("(Ljava/lang/String)V").is_err());
	}
}
