use crate::domain::ports::TaskScheduler;
use crate::domain::task::ScheduledTask;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

pub type TaskReceiver = mpsc::UnboundedReceiver<ScheduledTask>;

#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    Recurring {
        every: Duration,
        start_at: DateTime<Utc>,
    },
    Once {
        fire_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub task: ScheduledTask,
    pub schedule: Schedule,
}

struct Entry {
    generation: u64,
    registration: Registration,
    handle: JoinHandle<()>,
}

/// An in-process task queue.
///
/// Each registration gets a timer task; when it fires, the scheduled task is
/// pushed onto the channel returned by [`TokioTaskQueue::new`] for a worker
/// to run. Registering a name again replaces the previous timer. A timer
/// that has run to completion drops its own entry.
#[derive(Clone)]
pub struct TokioTaskQueue {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    generations: Arc<AtomicU64>,
    sender: mpsc::UnboundedSender<ScheduledTask>,
}

impl TokioTaskQueue {
    pub fn new() -> (Self, TaskReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue = Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
            sender,
        };
        (queue, receiver)
    }

    /// Whether the named task is still due to fire.
    pub async fn is_enabled(&self, name: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .get(name)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    pub async fn registration(&self, name: &str) -> Option<Registration> {
        let entries = self.entries.lock().await;
        entries.get(name).map(|entry| entry.registration.clone())
    }

    /// Spawns `timer` under `name`, replacing any previous registration.
    ///
    /// The registry lock is held until the entry is in place, so a timer that
    /// completes immediately still finds its own entry to remove.
    async fn insert<F>(&self, name: &str, registration: Registration, timer: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut entries = self.entries.lock().await;
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(&self.entries);
        let key = name.to_string();
        let handle = tokio::spawn(async move {
            timer.await;
            let mut entries = registry.lock().await;
            if entries
                .get(&key)
                .is_some_and(|entry| entry.generation == generation)
            {
                entries.remove(&key);
            }
        });

        let entry = Entry {
            generation,
            registration,
            handle,
        };
        if let Some(previous) = entries.insert(name.to_string(), entry) {
            previous.handle.abort();
        }
    }
}

fn instant_at(at: DateTime<Utc>) -> Instant {
    let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    Instant::now() + delay
}

#[async_trait]
impl TaskScheduler for TokioTaskQueue {
    async fn register_recurring(
        &self,
        name: &str,
        every: Duration,
        start_at: DateTime<Utc>,
        task: ScheduledTask,
    ) -> Result<()> {
        if every.is_zero() {
            return Err(ShopError::SchedulerError(format!(
                "Interval of '{name}' must be positive"
            )));
        }

        let start = instant_at(start_at);
        let sender = self.sender.clone();
        let payload = task.clone();
        let timer = async move {
            let mut ticker = tokio::time::interval_at(start, every);
            loop {
                ticker.tick().await;
                if sender.send(payload.clone()).is_err() {
                    break;
                }
            }
        };

        debug!(task = name, ?every, %start_at, "registered recurring task");
        let registration = Registration {
            task,
            schedule: Schedule::Recurring { every, start_at },
        };
        self.insert(name, registration, timer).await;
        Ok(())
    }

    async fn register_once(
        &self,
        name: &str,
        fire_at: DateTime<Utc>,
        task: ScheduledTask,
    ) -> Result<()> {
        let deadline = instant_at(fire_at);
        let sender = self.sender.clone();
        let payload = task.clone();
        let timer = async move {
            tokio::time::sleep_until(deadline).await;
            // A closed channel means the worker is gone; nothing left to notify.
            let _ = sender.send(payload);
        };

        debug!(task = name, %fire_at, "registered one-shot task");
        let registration = Registration {
            task,
            schedule: Schedule::Once { fire_at },
        };
        self.insert(name, registration, timer).await;
        Ok(())
    }

    async fn cancel(&self, name: &str) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        match entries.remove(name) {
            Some(entry) => {
                let was_active = !entry.handle.is_finished();
                entry.handle.abort();
                debug!(task = name, was_active, "cancelled task");
                Ok(was_active)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderId;

    fn check(order: u32) -> ScheduledTask {
        ScheduledTask::CheckPayment {
            order_id: OrderId(order),
            session_id: format!("cs_test_{order}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recurring_task_fires_every_interval() {
        let (queue, mut tasks) = TokioTaskQueue::new();
        queue
            .register_recurring("check", Duration::from_secs(120), Utc::now(), check(1))
            .await
            .unwrap();

        for _ in 0..3 {
            assert_eq!(tasks.recv().await, Some(check(1)));
        }
        assert!(queue.is_enabled("check").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_recurring_task() {
        let (queue, mut tasks) = TokioTaskQueue::new();
        queue
            .register_recurring("check", Duration::from_secs(120), Utc::now(), check(1))
            .await
            .unwrap();
        assert_eq!(tasks.recv().await, Some(check(1)));

        assert!(queue.cancel("check").await.unwrap());
        assert!(!queue.is_enabled("check").await);
        assert!(!queue.cancel("check").await.unwrap());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert!(tasks.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_task_fires_once() {
        let (queue, mut tasks) = TokioTaskQueue::new();
        let fire_at = Utc::now() + chrono::Duration::seconds(30);
        let disable = ScheduledTask::DisableCheck {
            order_id: OrderId(1),
        };
        queue
            .register_once("disable", fire_at, disable.clone())
            .await
            .unwrap();

        assert_eq!(
            queue.registration("disable").await.map(|r| r.schedule),
            Some(Schedule::Once { fire_at })
        );
        assert_eq!(tasks.recv().await, Some(disable));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(tasks.try_recv().is_err());
        assert!(!queue.is_enabled("disable").await);
        assert!(queue.registration("disable").await.is_none());
        assert!(!queue.cancel("disable").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fired_once_tasks_leave_no_entries() {
        let (queue, mut tasks) = TokioTaskQueue::new();
        for order in 1..=50 {
            let name = format!("disable {order}");
            let task = ScheduledTask::DisableCheck {
                order_id: OrderId(order),
            };
            queue.register_once(&name, Utc::now(), task).await.unwrap();
        }
        for _ in 1..=50 {
            assert!(tasks.recv().await.is_some());
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.entries.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_once_task_keeps_new_registration() {
        let (queue, mut tasks) = TokioTaskQueue::new();
        let soon = ScheduledTask::DisableCheck {
            order_id: OrderId(1),
        };
        let later = ScheduledTask::DisableCheck {
            order_id: OrderId(2),
        };
        queue
            .register_once("expiry", Utc::now() + chrono::Duration::seconds(10), soon)
            .await
            .unwrap();
        queue
            .register_once(
                "expiry",
                Utc::now() + chrono::Duration::seconds(60),
                later.clone(),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(tasks.try_recv().is_err());
        assert!(queue.is_enabled("expiry").await);

        assert_eq!(tasks.recv().await, Some(later));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.registration("expiry").await.is_none());
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let (queue, _tasks) = TokioTaskQueue::new();
        let result = queue
            .register_recurring("check", Duration::ZERO, Utc::now(), check(1))
            .await;
        assert!(matches!(result, Err(ShopError::SchedulerError(_))));
    }
}
