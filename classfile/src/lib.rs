//! A constant-pool level model of Java class files.
//!
//! Unlike a resolved tree model, everything here speaks in pool indices:
//! classes, members and attributes store `u16` references into the
//! [`pool::ConstantPool`] the class owns, the same way the class file
//! format itself does. That makes the model a faithful round-trip carrier
//! for tools that read, edit and write class files.
//!
//! The pieces:
//! - [`pool`] — the deduplicating constant pool editor;
//! - [`tree`] — classes, members, attributes, annotations;
//! - [`insn`] — the instruction model and mnemonic table;
//! - [`composer`] — turns label-addressed instruction streams into laid
//!   out code arrays;
//! - [`read`]/[`write`] — the binary format.

pub mod constants;
pub mod descriptors;
pub mod mutf8;
pub mod pool;
pub mod tree;
pub mod insn;
pub mod composer;
mod read;
mod write;

pub use read::read;
pub use write::write;

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::constants::{access, opcode};
	use crate::tree::attribute::Attribute;
	use crate::tree::class::{Member, ProgramClass};
	use crate::tree::version::Version;

	/// Builds a minimal class by hand, writes it and reads it back.
	#[test]
	fn binary_round_trip() -> Result<()> {
		let mut class = ProgramClass {
			version: Version::V1_8,
			access_flags: access::PUBLIC | access::SUPER,
			..ProgramClass::default()
		};
		class.this_class = class.pool.add_class("Example")?;
		class.super_class = class.pool.add_class("java/lang/Object")?;

		let name = class.pool.add_utf8("answer")?;
		let descriptor = class.pool.add_utf8("I")?;
		let value = class.pool.add_integer(42)?;
		class.fields.push(Member {
			access_flags: access::PUBLIC | access::STATIC | access::FINAL,
			name,
			descriptor,
			attributes: vec![Attribute::ConstantValue { value }],
		});

		let bytes = crate::write(&mut class)?;
		assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
		assert_eq!(&bytes[4..8], &[0, 0, 0, 52]);

		let read_back = crate::read(&bytes)?;
		assert_eq!(read_back.version, Version::V1_8);
		assert_eq!(read_back.access_flags, access::PUBLIC | access::SUPER);
		assert_eq!(read_back.name()?, "Example");
		assert_eq!(read_back.super_name()?, Some("java/lang/Object"));
		assert_eq!(read_back.fields.len(), 1);
		assert_eq!(read_back.fields[0].name(&read_back.pool)?, "answer");
		assert_eq!(read_back.fields[0].attributes, vec![Attribute::ConstantValue { value }]);

		Ok(())
	}

	#[test]
	fn rejects_wrong_magic() {
		assert!(crate::read(&[0, 1, 2, 3, 4, 5, 6, 7]).is_err());
	}

	#[test]
	fn rejects_unsupported_version() -> Result<()> {
		let mut class = ProgramClass::default();
		class.this_class = class.pool.add_class("Example")?;

		// Major 58 is Java 14, one past what this crate supports.
		class.version = Version::new(58, 0);
		let bytes = crate::write(&mut class)?;
		assert!(crate::read(&bytes).is_err());

		Ok(())
	}

	#[test]
	fn code_attribute_round_trip() -> Result<()> {
		let mut class = ProgramClass::default();
		class.this_class = class.pool.add_class("Example")?;
		class.super_class = class.pool.add_class("java/lang/Object")?;

		let name = class.pool.add_utf8("nothing")?;
		let descriptor = class.pool.add_utf8("()V")?;
		class.methods.push(Member {
			access_flags: access::PUBLIC,
			name,
			descriptor,
			attributes: vec![Attribute::Code(crate::tree::attribute::CodeAttribute {
				max_stack: 0,
				max_locals: 1,
				code: vec![opcode::RETURN],
				exception_table: Vec::new(),
				attributes: Vec::new(),
			})],
		});

		let bytes = crate::write(&mut class)?;
		let read_back = crate::read(&bytes)?;
		assert_eq!(read_back.methods[0].attributes, class.methods[0].attributes);

		Ok(())
	}
}
