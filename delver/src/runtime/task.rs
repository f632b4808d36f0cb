// A unit of blocking work the scheduler can run off the async executor.
pub trait Task: Send {
    type Output: Send + 'static;

    fn call(self) -> Self::Output;
}

pub struct TaskWrapper<F> {
    pub func: F,
}

impl<F> TaskWrapper<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, T> Task for TaskWrapper<F>
where
    F: FnOnce() -> T + Send,
    T: Send + 'static,
{
    type Output = T;

    fn call(self) -> Self::Output {
        (self.func)()
    }
}

#[macro_export]
macro_rules! delver_task {
    ($func:expr) => {{ $crate::runtime::task::TaskWrapper::new($func) }};
}
