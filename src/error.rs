use thiserror::Error;

/// A syntactic or semantic error in jbc input.
///
/// Always carries the 1-based line number of the token that caused it; the
/// rendering is the single user-visible diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Line {line}: {message}")]
pub struct ParseError {
	pub line: usize,
	pub message: String,
}

impl ParseError {
	pub fn new(line: usize, message: impl Into<String>) -> ParseError {
		ParseError { line, message: message.into() }
	}
}

/// An impossibility while generating output: an offset missing from the
/// labels map, an unknown kind in the class model, or an I/O failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PrintError {
	pub message: String,
}

impl PrintError {
	pub fn new(message: impl Into<String>) -> PrintError {
		PrintError { message: message.into() }
	}
}

impl From<std::io::Error> for PrintError {
	fn from(error: std::io::Error) -> PrintError {
		PrintError::new(format!("An IO error occured while writing: {error}."))
	}
}

pub type ParseResult<T> = Result<T, ParseError>;
pub type PrintResult<T> = Result<T, PrintError>;
