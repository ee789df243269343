use std::fmt;

use anyhow::anyhow;

use crate::presence::ConnectionId;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// The outbound channel of `connection` is gone, usually because the
    /// socket closed between lookup and push.
    pub fn delivery(connection: ConnectionId) -> Self {
        Self(anyhow!("connection {connection} is no longer accepting events"))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
