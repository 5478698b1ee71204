//! Conversions between external (dotted Java source) and internal (JVM
//! descriptor) type names, and the class version directive table.

use classfile::descriptors;
use classfile::tree::version::Version;

/// Converts an external type like `int[][]` or `java.lang.String` to its
/// internal descriptor form (`[[I`, `Ljava/lang/String;`).
pub fn internal_type(external: &str) -> String {
	let mut base = external;
	let mut dimensions = 0;
	while let Some(stripped) = base.strip_suffix("[]") {
		base = stripped;
		dimensions += 1;
	}

	let mut internal = "[".repeat(dimensions);
	match base {
		"boolean" => internal.push('Z'),
		"byte" => internal.push('B'),
		"char" => internal.push('C'),
		"short" => internal.push('S'),
		"int" => internal.push('I'),
		"long" => internal.push('J'),
		"float" => internal.push('F'),
		"double" => internal.push('D'),
		"void" => internal.push('V'),
		class => {
			internal.push('L');
			internal.push_str(&class.replace('.', "/"));
			internal.push(';');
		},
	}

	internal
}

/// Converts an internal descriptor to its external form; the inverse of
/// [`internal_type`].
pub fn external_type(internal: &str) -> String {
	let dimensions = internal.bytes().take_while(|&b| b == b'[').count();
	let base = &internal[dimensions..];

	let mut external = match base.as_bytes().first() {
		Some(b'Z') => "boolean".to_owned(),
		Some(b'B') => "byte".to_owned(),
		Some(b'C') => "char".to_owned(),
		Some(b'S') => "short".to_owned(),
		Some(b'I') => "int".to_owned(),
		Some(b'J') => "long".to_owned(),
		Some(b'F') => "float".to_owned(),
		Some(b'D') => "double".to_owned(),
		Some(b'V') => "void".to_owned(),
		Some(b'L') => base[1..].trim_end_matches(';').replace('/', "."),
		_ => base.replace('/', "."),
	};

	for _ in 0..dimensions {
		external.push_str("[]");
	}

	external
}

/// `java.lang.String` → `java/lang/String`.
pub fn internal_class_name(external: &str) -> String {
	external.replace('.', "/")
}

/// `java/lang/String` → `java.lang.String`.
pub fn external_class_name(internal: &str) -> String {
	internal.replace('/', ".")
}

/// The name a `Class` pool entry stores for a given internal type: plain
/// internal class names for object types, the full descriptor for arrays.
pub fn internal_class_type_from_type(internal: &str) -> String {
	internal.strip_prefix('L')
		.and_then(|stripped| stripped.strip_suffix(';'))
		.unwrap_or(internal)
		.to_owned()
}

/// The inverse of [`internal_class_type_from_type`].
pub fn internal_type_from_class_type(class_type: &str) -> String {
	if class_type.starts_with('[') {
		class_type.to_owned()
	} else {
		format!("L{class_type};")
	}
}

/// The return type part of a method descriptor.
pub fn internal_method_return_type(descriptor: &str) -> &str {
	descriptors::return_descriptor(descriptor).unwrap_or(descriptor)
}

/// The argument types of a method descriptor, externalized and joined with
/// commas: `(ILjava/lang/String;)V` → `int,java.lang.String`.
pub fn external_method_arguments(descriptor: &str) -> String {
	descriptors::parameter_descriptors(descriptor)
		.map(|parameters| {
			parameters.iter()
				.map(|parameter| external_type(parameter))
				.collect::<Vec<_>>()
				.join(",")
		})
		.unwrap_or_default()
}

/// Maps a `version` directive value to a class file version. Accepts
/// `1.0`…`1.9` (also as the bare `1` the number formatter produces for
/// `1.0`) and `5`…`13`.
pub fn version_from_directive(directive: &str) -> Option<Version> {
	Some(match directive {
		"1" | "1.0" | "1.1" => Version::new(45, 3),
		"1.2" => Version::new(46, 0),
		"1.3" => Version::new(47, 0),
		"1.4" => Version::new(48, 0),
		"1.5" | "5" => Version::new(49, 0),
		"1.6" | "6" => Version::new(50, 0),
		"1.7" | "7" => Version::new(51, 0),
		"1.8" | "8" => Version::new(52, 0),
		"1.9" | "9" => Version::new(53, 0),
		"10" => Version::new(54, 0),
		"11" => Version::new(55, 0),
		"12" => Version::new(56, 0),
		"13" => Version::new(57, 0),
		_ => return None,
	})
}

/// The `version` directive value for a class file version.
pub fn version_to_directive(version: Version) -> Option<&'static str> {
	Some(match version.major {
		45 => "1.0",
		46 => "1.2",
		47 => "1.3",
		48 => "1.4",
		49 => "1.5",
		50 => "1.6",
		51 => "1.7",
		52 => "1.8",
		53 => "9",
		54 => "10",
		55 => "11",
		56 => "12",
		57 => "13",
		_ => return None,
	})
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use super::*;

	#[test]
	fn internal_from_external() {
		assert_eq!(internal_type("int"), "I");
		assert_eq!(internal_type("void"), "V");
		assert_eq!(internal_type("java.lang.String"), "Ljava/lang/String;");
		assert_eq!(internal_type("int[][]"), "[[I");
		assert_eq!(internal_type("java.lang.String[]"), "[Ljava/lang/String;");
	}

	#[test]
	fn external_from_internal() {
		assert_eq!(external_type("I"), "int");
		assert_eq!(external_type("[[I"), "int[][]");
		assert_eq!(external_type("Ljava/lang/String;"), "java.lang.String");
		assert_eq!(external_type("[Ljava/lang/String;"), "java.lang.String[]");
	}

	#[test]
	fn class_types() {
		assert_eq!(internal_class_type_from_type("Ljava/lang/String;"), "java/lang/String");
		assert_eq!(internal_class_type_from_type("[[I"), "[[I");
		assert_eq!(internal_type_from_class_type("java/lang/String"), "Ljava/lang/String;");
		assert_eq!(internal_type_from_class_type("[[I"), "[[I");
	}

	#[test]
	fn method_arguments() {
		assert_eq!(external_method_arguments("(ILjava/lang/String;)V"), "int,java.lang.String");
		assert_eq!(external_method_arguments("()V"), "");
		assert_eq!(internal_method_return_type("(I)Ljava/lang/Object;"), "Ljava/lang/Object;");
	}

	#[test]
	fn version_directives() {
		assert_eq!(version_from_directive("8"), Some(Version::new(52, 0)));
		assert_eq!(version_from_directive("1.8"), Some(Version::new(52, 0)));
		assert_eq!(version_from_directive("13"), Some(Version::new(57, 0)));
		assert_eq!(version_from_directive("14"), None);
		assert_eq!(version_to_directive(Version::new(52, 0)), Some("1.8"));
	}
}
