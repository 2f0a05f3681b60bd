use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("unknown archive: {_0:?}")]
    UnknownArchive(#[error(not(source))] String),
    #[display("archive {_0:?} could not be opened")]
    Archive(#[error(not(source))] String),
    #[display("archive query failed")]
    Query,
    #[display("could not write output")]
    Output,
    #[display("HTTP server failed")]
    Server,
}
