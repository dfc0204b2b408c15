use futures::channel::oneshot::{channel as oneshot, Receiver};
use once_cell::sync::OnceCell;
use std::{
  future::Future,
  io,
  panic::{catch_unwind, AssertUnwindSafe},
};
use tracing::{error, Span};

struct Job {
  span: Span,
  run: Box<dyn FnOnce() + Send>,
}

type Dispatcher = crossbeam::channel::Sender<Job>;

/// Lower bound on the number of dispatch threads, so a slow job on a small
/// machine does not hold up every other volume.
const MIN_WORKERS: usize = 4;

// Filesystem calls block, so they run on dedicated threads instead of the
// executor that polls the provisioner's futures. Jobs for different volumes
// are independent; the workers share one queue and take jobs as they free up.
static DISPATCHER: OnceCell<Dispatcher> = OnceCell::new();

fn workers() -> usize {
  std::thread::available_parallelism()
    .map(|n| n.get())
    .unwrap_or(1)
    .max(MIN_WORKERS)
}

fn dispatcher() -> io::Result<&'static Dispatcher> {
  DISPATCHER.get_or_try_init(|| {
    let (sender, receiver) = crossbeam::channel::unbounded::<Job>();

    for id in 0..workers() {
      let receiver = receiver.clone();
      std::thread::Builder::new()
        .name(format!("hostpath:dispatch-{}", id))
        .spawn(move || {
          while let Ok(job) = receiver.recv() {
            let Job { span, run } = job;
            let _enter = span.enter();
            if let Err(e) = catch_unwind(AssertUnwindSafe(run)) {
              error!("Failed to run filesystem job in dispatcher: {:?}", e);
            }
          }
        })?;
    }

    Ok(sender)
  })
}

/// Runs `f` on one of the dispatch threads inside the caller's span.
///
/// A job that panics resolves to an [`io::ErrorKind::Other`] error rather
/// than taking the dispatcher down.
pub(crate) fn run<R, F>(f: F) -> impl Future<Output = io::Result<R>>
where
  F: FnOnce() -> io::Result<R> + Send + 'static,
  R: Send + 'static,
{
  let (sender, receiver) = oneshot();

  match dispatcher() {
    Ok(dispatch) => {
      let job = Job {
        span: Span::current(),
        run: Box::new(move || {
          let _ = sender.send(f());
        }),
      };

      // On a dead dispatcher the job, and with it the sender, is dropped
      // here, which resolves the receiver as cancelled.
      let _ = dispatch.send(job);
    }
    Err(e) => {
      let _ = sender.send(Err(e));
    }
  };

  read(receiver)
}

async fn read<R>(receiver: Receiver<io::Result<R>>) -> io::Result<R> {
  match receiver.await {
    Ok(r) => r,
    Err(_cancelled) => Err(io::Error::new(
      io::ErrorKind::Other,
      "filesystem job was cancelled (dispatcher panicked?)",
    )),
  }
}
