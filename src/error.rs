use std::{error::Error as StdError, fmt, io};

pub type Result<T> = ::std::result::Result<T, Error>;

pub enum Error {
    /// Bad command line or rc-file contents.
    Usage(String),
    /// Malformed NAME:FILTER:ARGS file-type specification.
    TypeSpec(String),
    /// The search pattern failed to compile.
    Pattern(regex::Error),
    Glob(globset::Error),
    Io(io::Error),
}

impl Error {
    /// Process exit status for this error, following the grep/ack convention:
    /// 255 for anything the user wrote wrong, 2 for operational failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Usage(_) | Error::TypeSpec(_) | Error::Pattern(_) | Error::Glob(_) => 255,
            Error::Io(_) => 2,
        }
    }
}

impl StdError for Error {
    fn description(&self) -> &str {
        // This method is soft-deprecated and shouldn't be used,
        // see Display for the actual description.
        "a ucgrep error"
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::Pattern(err)
    }
}

impl From<globset::Error> for Error {
    fn from(err: globset::Error) -> Self {
        Error::Glob(err)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (error_type, error) = match self {
            Error::Usage(msg) => ("Usage", msg.clone()),
            Error::TypeSpec(msg) => ("Type spec", msg.clone()),
            Error::Pattern(err) => ("Pattern", err.to_string()),
            Error::Glob(err) => ("Glob", err.to_string()),
            Error::Io(err) => ("I/O", err.to_string()),
        };

        write!(f, "{} error: {}", error_type, error)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
