//! Blocking bridge for remote KMS calls.

use once_cell::sync::Lazy;
use tokio::runtime::{self, Handle, RuntimeFlavor};

static RUNTIME: Lazy<runtime::Runtime> = Lazy::new(|| {
    runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("crosscheck-kms-rt")
        .build()
        .expect("build crosscheck-kms runtime")
});

/// Run `fut` to completion from synchronous code without nesting runtimes.
///
/// On a multi-threaded runtime the current worker is handed over with
/// `block_in_place`. A current-thread runtime cannot block, so the future is
/// moved to the dedicated runtime on a helper thread.
pub fn block_on<F>(fut: F) -> F::Output
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(fut))
        }
        Ok(_) => std::thread::spawn(move || RUNTIME.block_on(fut))
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
        Err(_) => RUNTIME.block_on(fut),
    }
}
