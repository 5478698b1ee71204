//! Printing the top level class structure.

use std::io::Write;
use classfile::constants::access;
use classfile::tree::class::ProgramClass;
use crate::error::{PrintError, PrintResult};
use crate::print::{self as print, attributes, members, Printer};
use crate::types;

/// Prints a whole class as jbc source.
pub fn print_class(out: &mut dyn Write, class: &ProgramClass) -> PrintResult<()> {
	let mut p = Printer::new(out);

	p.print_word("version")?;
	p.print_space()?;
	match types::version_to_directive(class.version) {
		Some(directive) => p.print_word(directive)?,
		None => return Err(PrintError::new(format!("Unknown class version {}.{}.", class.version.major, class.version.minor))),
	}
	p.print(';')?;
	p.println()?;

	if p.print_class_access_flags(class.access_flags)? {
		p.print_space()?;
	}

	p.print_word(&types::external_class_name(print::lift(class.name())?))?;

	// Syntactic sugar: extends in interfaces defines bytecode interfaces.
	if class.access_flags & access::INTERFACE != 0 {
		if !class.interfaces.is_empty() {
			p.print_space()?;
			p.print_word("extends")?;
			p.print_space()?;
			print_interfaces(&mut p, class)?;
		}
	} else {
		if let Some(super_name) = print::lift(class.super_name())? {
			let super_name = super_name.to_owned();
			p.print_space()?;
			p.print_word("extends")?;
			p.print_space()?;
			p.print_word(&types::external_class_name(&super_name))?;
		}

		if !class.interfaces.is_empty() {
			p.print_space()?;
			p.print_word("implements")?;
			p.print_space()?;
			print_interfaces(&mut p, class)?;
		}
	}

	attributes::print_class_attributes(&mut p, class)?;
	members::print_members(&mut p, class)?;

	p.println()?;
	p.flush()
}

fn print_interfaces(p: &mut Printer, class: &ProgramClass) -> PrintResult<()> {
	for (position, &interface) in class.interfaces.iter().enumerate() {
		let name = print::lift(class.pool.class_name(interface))?.to_owned();
		p.print_word(&types::external_class_name(&name))?;
		if position < class.interfaces.len() - 1 {
			p.print(',')?;
			p.print_space()?;
		}
	}

	Ok(())
}
