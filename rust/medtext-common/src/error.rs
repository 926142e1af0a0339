use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_format(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidFormat {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    /// A document (or string, or position list) was appended with an index that
    /// does not follow the last one written to the same stream.
    pub fn out_of_order(stream: impl Into<String>, last: u32, attempted: u32) -> Error {
        Error(
            ErrorKind::OutOfOrder {
                stream: stream.into(),
                last,
                attempted,
            }
            .into(),
        )
    }

    pub fn corrupt_store(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::CorruptStore {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn other<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Other {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }

    /// Returns `true` if the error reports a damaged or truncated store.
    pub fn is_corrupt_store(&self) -> bool {
        matches!(self.kind(), ErrorKind::CorruptStore { .. })
    }

    /// Returns `true` if the error reports an ordering violation on append.
    pub fn is_out_of_order(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfOrder { .. })
    }

    /// Re-classifies decoding failures of a bit stream as store corruption.
    ///
    /// A coded stream that runs into its physical end, or yields a codeword
    /// that cannot be valid, is damaged rather than unreadable; every other
    /// I/O failure is kept as is.
    pub fn decode(element: impl Into<String>, source: std::io::Error) -> Error {
        match source.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData => {
                Error::corrupt_store(element, source.to_string())
            }
            _ => Error::io(element, source),
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("out of order append to '{stream}': index {attempted} after {last}")]
    OutOfOrder {
        stream: String,
        last: u32,
        attempted: u32,
    },

    #[error("invalid storage format for '{element}': {message}")]
    InvalidFormat { element: String, message: String },

    #[error("corrupt store '{element}': {message}")]
    CorruptStore { element: String, message: String },

    #[error("IO error for '{context}': {source}'")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Other {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
