use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::runtime::error::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Resolves to the output of a submitted task.
///
/// Dropping the handle detaches the task; it still runs to completion.
pub struct TaskHandle<T> {
    id: Uuid,
    receiver: oneshot::Receiver<Result<T, Error>>,
}

// Works regardless of whether T implements Debug
impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(id: Uuid, receiver: oneshot::Receiver<Result<T, Error>>) -> Self {
        Self { id, receiver }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.map_err(Error::from).and_then(|output| output))
    }
}
