use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crate::slot::{SingleSlot, SlotClosed, SlotPush, SlotReceiver, SlotSender};

/// Task executed by the dedicated worker.
pub type Task = Box<dyn FnOnce(&WorkerContext) + Send + 'static>;

/// In-task view of the processor, for cooperative supersession checks.
pub struct WorkerContext {
	pending: SlotSender<Task>,
}

impl WorkerContext {
	/// True if a newer submission arrived since this task started.
	pub fn has_newer_pending(&self) -> bool {
		self.pending.has_pending()
	}
}

/// Dedicated sequential worker with a single latest-wins pending slot.
///
/// At most one task executes at a time and at most one task is pending. A
/// submission arriving while the worker is busy replaces the pending task,
/// which is dropped without ever running. After a task finishes the worker
/// immediately starts the latest pending task, or idles on the slot.
pub struct SingleSlotProcessor {
	tx: SlotSender<Task>,
	processing: Arc<AtomicBool>,
	worker: Option<JoinHandle<()>>,
}

impl SingleSlotProcessor {
	/// Spawns the dedicated named worker thread.
	pub fn new(name: impl Into<String>) -> io::Result<Self> {
		let slot = SingleSlot::new();
		let tx = slot.sender();
		let processing = Arc::new(AtomicBool::new(false));

		let rx = slot.receiver();
		let ctx = WorkerContext { pending: slot.sender() };
		let flag = Arc::clone(&processing);
		let worker = std::thread::Builder::new()
			.name(name.into())
			.spawn(move || worker_loop(&rx, &ctx, &flag))?;

		Ok(Self {
			tx,
			processing,
			worker: Some(worker),
		})
	}

	/// Non-blocking submit. Replaces any queued-but-not-started task.
	pub fn submit(&self, task: impl FnOnce(&WorkerContext) + Send + 'static) -> Result<SlotPush, SlotClosed> {
		let outcome = self.tx.offer(Box::new(task))?;
		if outcome == SlotPush::Replaced {
			tracing::trace!("pending task superseded before start");
		}
		Ok(outcome)
	}

	/// True while a task is executing.
	pub fn is_processing(&self) -> bool {
		self.processing.load(Ordering::Acquire)
	}

	/// Closes the submission slot. The running task (if any) finishes; a
	/// pending task is dropped unexecuted.
	pub fn close(&self) {
		self.tx.close();
	}

	/// Closes the slot and joins the worker thread.
	pub fn shutdown(&mut self) {
		self.tx.close();
		if let Some(worker) = self.worker.take() {
			let _ = worker.join();
		}
	}
}

impl Drop for SingleSlotProcessor {
	fn drop(&mut self) {
		self.shutdown();
	}
}

fn worker_loop(rx: &SlotReceiver<Task>, ctx: &WorkerContext, processing: &AtomicBool) {
	while let Some(task) = rx.recv() {
		processing.store(true, Ordering::Release);
		if panic::catch_unwind(AssertUnwindSafe(|| task(ctx))).is_err() {
			tracing::error!("worker task panicked; worker continues");
		}
		processing.store(false, Ordering::Release);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::mpsc;
	use std::time::{Duration, Instant};

	use super::*;

	fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
		let deadline = Instant::now() + Duration::from_secs(5);
		while !cond() {
			assert!(Instant::now() < deadline, "timed out waiting for {what}");
			std::thread::sleep(Duration::from_millis(2));
		}
	}

	#[test]
	fn runs_submitted_task() {
		let processor = SingleSlotProcessor::new("worker.test.run").unwrap();
		let (done_tx, done_rx) = mpsc::channel();

		processor
			.submit(move |_| {
				done_tx.send(7u32).unwrap();
			})
			.unwrap();

		assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(7));
	}

	#[test]
	fn only_latest_pending_task_runs() {
		let processor = SingleSlotProcessor::new("worker.test.latest").unwrap();
		let (started_tx, started_rx) = mpsc::channel();
		let (gate_tx, gate_rx) = mpsc::channel::<()>();
		let (done_tx, done_rx) = mpsc::channel();

		// Occupy the worker so subsequent submissions pile into the slot.
		let done = done_tx.clone();
		processor
			.submit(move |_| {
				started_tx.send(()).unwrap();
				gate_rx.recv().unwrap();
				done.send(0usize).unwrap();
			})
			.unwrap();
		started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

		for i in 1..=5usize {
			let done = done_tx.clone();
			processor
				.submit(move |_| {
					done.send(i).unwrap();
				})
				.unwrap();
		}

		gate_tx.send(()).unwrap();

		// Exactly the blocked task and the last submission run; 1..=4 never do.
		assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(0));
		assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(5));
		assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
	}

	#[test]
	fn has_newer_pending_is_visible_inside_running_task() {
		let processor = SingleSlotProcessor::new("worker.test.pending").unwrap();
		let (started_tx, started_rx) = mpsc::channel();
		let (gate_tx, gate_rx) = mpsc::channel::<()>();
		let (seen_tx, seen_rx) = mpsc::channel();

		processor
			.submit(move |ctx| {
				started_tx.send(ctx.has_newer_pending()).unwrap();
				gate_rx.recv().unwrap();
				seen_tx.send(ctx.has_newer_pending()).unwrap();
			})
			.unwrap();

		// No newer submission yet.
		assert_eq!(started_rx.recv_timeout(Duration::from_secs(1)), Ok(false));

		processor.submit(|_| {}).unwrap();
		gate_tx.send(()).unwrap();

		assert_eq!(seen_rx.recv_timeout(Duration::from_secs(1)), Ok(true));
	}

	#[test]
	fn is_processing_tracks_execution() {
		let processor = SingleSlotProcessor::new("worker.test.busy").unwrap();
		assert!(!processor.is_processing());

		let (started_tx, started_rx) = mpsc::channel();
		let (gate_tx, gate_rx) = mpsc::channel::<()>();
		processor
			.submit(move |_| {
				started_tx.send(()).unwrap();
				gate_rx.recv().unwrap();
			})
			.unwrap();

		started_rx.recv_timeout(Duration::from_secs(1)).unwrap();
		assert!(processor.is_processing());

		gate_tx.send(()).unwrap();
		wait_until("worker idle", || !processor.is_processing());
	}

	#[test]
	fn panicking_task_does_not_kill_worker() {
		let processor = SingleSlotProcessor::new("worker.test.panic").unwrap();
		let (done_tx, done_rx) = mpsc::channel();

		processor
			.submit(|_| {
				panic!("task blew up");
			})
			.unwrap();
		processor
			.submit(move |_| {
				done_tx.send(1u32).unwrap();
			})
			.unwrap();

		assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(1));
	}

	#[test]
	fn close_drops_pending_task() {
		let processor = SingleSlotProcessor::new("worker.test.close").unwrap();
		let (started_tx, started_rx) = mpsc::channel();
		let (gate_tx, gate_rx) = mpsc::channel::<()>();
		let (done_tx, done_rx) = mpsc::channel();

		let done = done_tx.clone();
		processor
			.submit(move |_| {
				started_tx.send(()).unwrap();
				gate_rx.recv().unwrap();
				done.send(0usize).unwrap();
			})
			.unwrap();
		started_rx.recv_timeout(Duration::from_secs(1)).unwrap();

		processor
			.submit(move |_| {
				done_tx.send(1usize).unwrap();
			})
			.unwrap();

		processor.close();
		gate_tx.send(()).unwrap();

		// The running task completes; the pending one never runs.
		assert_eq!(done_rx.recv_timeout(Duration::from_secs(1)), Ok(0));
		assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
	}
}
