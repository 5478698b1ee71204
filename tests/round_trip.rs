use anyhow::Result;
use pretty_assertions::assert_eq;
use classfile::constants::{access, opcode};
use classfile::tree::attribute::Attribute;
use classfile::tree::class::ProgramClass;

fn code_of<'a>(class: &'a ProgramClass, method: usize) -> &'a classfile::tree::attribute::CodeAttribute {
	let Some(Attribute::Code(code)) = class.methods[method].find_attribute("Code") else {
		panic!("expected method {method} to have code");
	};
	code
}

#[test]
fn hello_world() -> Result<()> {
	let source = r#"
import java.lang.String;
import java.lang.System;
import java.io.PrintStream;
version 8;
public class Hello {
    public static void main(final String[] args) {
        getstatic System#PrintStream out
        ldc "Hello World!"
        invokevirtual PrintStream#void println(String)
        return
    }
}
"#;

	let mut class = jbc::assemble(source)?;
	assert_eq!(class.name()?, "Hello");
	assert_eq!(class.version.major, 52);
	assert_eq!(class.access_flags, access::PUBLIC | access::SUPER);

	let main = &class.methods[0];
	assert_eq!(main.name(&class.pool)?, "main");
	assert_eq!(main.descriptor(&class.pool)?, "([Ljava/lang/String;)V");

	let code = code_of(&class, 0);
	assert_eq!(code.code.len(), 9);
	assert_eq!(code.code[0], opcode::GETSTATIC);
	assert_eq!(code.code[3], opcode::LDC);
	assert_eq!(code.code[5], opcode::INVOKEVIRTUAL);
	assert_eq!(code.code[8], opcode::RETURN);
	assert_eq!(code.max_stack, 2);
	assert_eq!(code.max_locals, 1);

	// Write the binary class and read it back.
	let bytes = classfile::write(&mut class)?;
	assert_eq!(&bytes[..4], &[0xCA, 0xFE, 0xBA, 0xBE]);
	assert_eq!(&bytes[4..8], &[0, 0, 0, 52]);

	let read_back = classfile::read(&bytes)?;
	let text = jbc::disassemble(&read_back)?;
	assert!(text.contains("version 1.8;"));
	assert!(text.contains("public class Hello extends java.lang.Object"));
	assert!(text.contains("getstatic java.lang.System#java.io.PrintStream out"));
	assert!(text.contains("ldc \"Hello World!\""));
	assert!(text.contains("invokevirtual java.io.PrintStream#void println(java.lang.String)"));

	// The product of disassembly assembles to an equivalent class.
	let again = jbc::assemble(&text)?;
	assert_eq!(code_of(&again, 0).code, code_of(&class, 0).code);

	Ok(())
}

#[test]
fn branch_labels_are_renamed_canonically() -> Result<()> {
	let source = "
version 8;
class C {
    static int check(int) {
        iload_0
        ifeq skip
        iconst_1
        ireturn
    skip:
        iconst_0
        ireturn
    }
}
";

	let class = jbc::assemble(source)?;
	let text = jbc::disassemble(&class)?;

	let branch = text.find("ifeq label1").expect("the branch should reference label1");
	let definition = text.find("label1:").expect("label1 should be defined");
	let target = text.find("iconst_0").expect("the target instruction should be printed");
	assert!(branch < definition);
	assert!(definition < target);

	Ok(())
}

#[test]
fn disassembly_is_a_fixpoint() -> Result<()> {
	let source = r#"
version 8;
public class Fix extends java.lang.Thread implements java.lang.Runnable [
    SourceFile "Fix.java";
] {
    private static final long stamp = 7l;
    public volatile int state;

    public int bump(int) {
        iload_1
        iconst_1
        iadd
        ireturn
    }

    static void choose(int) {
        iload_0
        lookupswitch {
            case 1: one
            case 10: ten
            default: out
        }
    one:
        return
    ten:
        return
    out:
        return
    }
}
"#;

	let first = jbc::disassemble(&jbc::assemble(source)?)?;
	let second = jbc::disassemble(&jbc::assemble(&first)?)?;
	assert_eq!(first, second);

	Ok(())
}

#[test]
fn enums_default_their_super_class() -> Result<()> {
	let mut class = jbc::assemble("version 8; public enum E;")?;
	assert_eq!(class.access_flags, access::PUBLIC | access::SUPER | access::ENUM);
	assert_eq!(class.super_name()?, Some("java/lang/Enum"));

	let bytes = classfile::write(&mut class)?;
	let read_back = classfile::read(&bytes)?;
	assert_eq!(read_back.super_name()?, Some("java/lang/Enum"));
	assert_eq!(read_back.access_flags, access::PUBLIC | access::SUPER | access::ENUM);

	Ok(())
}

#[test]
fn constants_round_trip_through_text() -> Result<()> {
	let source = r#"
version 8;
class Constants {
    double pi = 3.141592653589793d;
    float half = 0.5f;
    long big = 4611686018427387904l;
    boolean flag = true;
    char letter = 'Q';
    java.lang.String text = "with \"escapes\" and \n breaks";
}
"#;

	let first = jbc::disassemble(&jbc::assemble(source)?)?;
	let second = jbc::disassemble(&jbc::assemble(&first)?)?;
	assert_eq!(first, second);
	assert!(first.contains("3.141592653589793d"));
	assert!(first.contains("0.5f"));
	assert!(first.contains("= true;") || first.contains("= 1;"));

	Ok(())
}

#[test]
fn exception_handlers_survive_the_round_trip() -> Result<()> {
	let source = "
version 8;
class Guarded {
    static void run() {
    try:
        nop
    done:
        return
        catch java.lang.Exception try done
        athrow
        catch any try done
        athrow
    }
}
";

	let class = jbc::assemble(source)?;
	let code = code_of(&class, 0);
	assert_eq!(code.exception_table.len(), 2);
	assert_eq!(code.exception_table[1].catch_type, 0);

	let text = jbc::disassemble(&class)?;
	assert!(text.contains("catch java.lang.Exception label1 label2"));
	assert!(text.contains("catch any label1 label2"));

	let again = jbc::assemble(&text)?;
	assert_eq!(code_of(&again, 0).exception_table, code.exception_table);

	Ok(())
}

#[test]
fn unknown_attributes_are_dropped_on_disassembly() -> Result<()> {
	let mut class = jbc::assemble("version 8; class Plain;")?;
	class.attributes.push(Attribute::Unknown {
		name: "MysteryMeat".to_owned(),
		data: vec![1, 2, 3],
	});

	let text = jbc::disassemble(&class)?;
	assert!(!text.contains("MysteryMeat"));

	Ok(())
}
