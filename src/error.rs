use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Less(#[from] lcss::LessError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger already installed")]
    Logger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, Error>;
