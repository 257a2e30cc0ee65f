use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{} does not exist", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("{} is not valid{}", .path.display(), Error::detail(.msg))]
    FileNotValid { path: PathBuf, msg: Option<String> },

    #[error("{} failed running `{}`{}", .utility, .cmd, Error::detail(.msg))]
    UtilityExecutionError {
        utility: String,
        cmd: String,
        msg: Option<String>,
    },

    #[error("Cannot start {utility}; it must be installed and on $PATH")]
    UtilityNotExecutable { utility: String },

    #[error("Cannot parse {}{}", .context, Error::detail(.msg))]
    ParseError {
        context: String,
        msg: Option<String>,
    },

    #[error("{what} '{name}' was given more than once")]
    DuplicateInput { what: String, name: String },
}

impl Error {
    #[cold]
    pub fn file_not_found<P: AsRef<Path>>(path: P) -> Self {
        Error::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cold]
    pub fn file_not_valid<P: AsRef<Path>, M: Into<String>>(
        path: P,
        msg: Option<M>,
    ) -> Self {
        Error::FileNotValid {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn utility_execution_error<U: Into<String>, C: Into<String>, M: Into<String>>(
        utility: U,
        cmd: C,
        msg: Option<M>,
    ) -> Self {
        Error::UtilityExecutionError {
            utility: utility.into(),
            cmd: cmd.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn utility_not_executable<U: Into<String>>(utility: U) -> Self {
        Error::UtilityNotExecutable {
            utility: utility.into(),
        }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::ParseError {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn duplicate_input<W: Into<String>, N: Into<String>>(what: W, name: N) -> Self {
        Error::DuplicateInput {
            what: what.into(),
            name: name.into(),
        }
    }

    /// ": msg", or nothing
    fn detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(": {}", m),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_carries_detail() {
        let e = Error::parse_error("bowtie line 3", Some("expected 8 columns"));
        assert_eq!(e.to_string(), "Cannot parse bowtie line 3: expected 8 columns");
    }

    #[test]
    fn invalid_file_message_has_no_trailing_punctuation() {
        let e = Error::file_not_valid("in/s1.fastq", Some("expected '@' at record start"));
        assert_eq!(e.to_string(), "in/s1.fastq is not valid: expected '@' at record start");

        let e = Error::file_not_valid::<_, String>("in/s1.fastq", None);
        assert_eq!(e.to_string(), "in/s1.fastq is not valid");
    }

    #[test]
    fn duplicate_input_message() {
        let e = Error::duplicate_input("Sample", "liver1");
        assert_eq!(e.to_string(), "Sample 'liver1' was given more than once");
    }
}
