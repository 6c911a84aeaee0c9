#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "Backend: {}", _0)]
    Backend(String),
    #[fail(display = "Executor has been terminated.")]
    ExecutorTerminated,
    #[fail(display = "Translate worker panicked: {}", _0)]
    TranslatePanic(String),
}

pub type Result<T> = ::std::result::Result<T, Error>;
