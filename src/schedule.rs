use crate::event::Event;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, trace};

/// How the classification loop is driven while running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Schedule {
    /// Background ticker at a fixed interval.
    Interval(Duration),
    /// No ticker; the owner calls `SessionController::tick`.
    Manual,
}

impl Schedule {
    pub fn from_fps(fps: f32) -> Self {
        Schedule::Interval(Duration::from_secs_f64(1.0 / fps.max(1.0) as f64))
    }
}

/// Cancel handle for a running frame loop. Dropping it cancels the loop.
pub struct LoopHandle {
    cancelled: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl LoopHandle {
    /// Starts ticking for `generation`. At most one tick is outstanding: a new
    /// one is posted only after the controller has consumed the last.
    pub fn start(
        events: Sender<Event>,
        interval: Duration,
        generation: u64,
        pending: Arc<AtomicBool>,
    ) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let thread = std::thread::Builder::new()
            .name("stylemate-frame-loop".into())
            .spawn(move || {
                while !flag.load(Ordering::Relaxed) {
                    std::thread::sleep(interval);
                    if flag.load(Ordering::Relaxed) {
                        break;
                    }
                    if pending.swap(true, Ordering::AcqRel) {
                        trace!("tick coalesced");
                        continue;
                    }
                    if events.send(Event::Tick { generation }).is_err() {
                        break;
                    }
                }
            });
        let thread = match thread {
            Ok(t) => Some(t),
            Err(e) => {
                error!("failed to spawn frame loop: {e}");
                None
            }
        };
        Self { cancelled, thread }
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for LoopHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
