use pretty_assertions::assert_eq;

#[test]
fn lookupswitch_rejects_unsorted_cases() {
	let source = "version 8;
class C {
    static void pick(int) {
        iload_0
        lookupswitch {
            case 3: high
            case 1: low
            default: out
        }
    high:
        return
    low:
        return
    out:
        return
    }
}
";

	let error = jbc::assemble(source).unwrap_err();
	assert_eq!(error.line, 7);
	assert!(error.to_string().contains("strictly increasing"));
}

#[test]
fn unknown_opcodes_name_the_word_and_line() {
	let source = "version 8;
class C {
    static void run() {
        nop
        apples
        return
    }
}
";

	let error = jbc::assemble(source).unwrap_err();
	assert_eq!(error.to_string(), "Line 5: Unknown instruction apples.");
}

#[test]
fn unknown_attributes_are_a_parse_error() {
	let error = jbc::assemble("class C [ Glitter; ];").unwrap_err();
	assert_eq!(error.to_string(), "Line 1: Unknown attribute name Glitter.");
}

#[test]
fn unexpected_tokens_report_both_sides() {
	let error = jbc::assemble("version eight;").unwrap_err();
	assert_eq!(error.to_string(), "Line 1: Expected version number but got word.");
}

#[test]
fn missing_class_terminator() {
	let error = jbc::assemble("class C").unwrap_err();
	assert_eq!(error.to_string(), "Line 1: Expected class end ';' but got eof.");
}

#[test]
fn unknown_reference_kind() {
	let error = jbc::assemble(
		"class C [ BootstrapMethods { conjure java.lang.Math#double sqrt(double) {} } ];",
	).unwrap_err();
	assert_eq!(error.to_string(), "Line 1: Unknown reference kind conjure.");
}

#[test]
fn duplicate_labels_are_rejected() {
	let source = "class C {
    static void run() {
    again:
        nop
    again:
        return
    }
}
";

	let error = jbc::assemble(source).unwrap_err();
	assert!(error.to_string().contains("defined more than once"));
}

#[test]
fn branches_to_undefined_labels_are_rejected() {
	let source = "class C { static void run() { goto nowhere return } }";
	let error = jbc::assemble(source).unwrap_err();
	assert!(error.to_string().contains("undefined label") || error.to_string().contains("references undefined"));
}
