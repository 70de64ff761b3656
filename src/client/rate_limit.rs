use super::QuotaStatus;

use crate::{
    config::Quota,
    error::{Error, Result as CourtsideResult},
    hooks::Hooks,
};

#[cfg(target_family = "wasm")]
use super::gloo_rate_limit as timer;
#[cfg(not(target_family = "wasm"))]
use super::tokio_rate_limit as timer;

use futures::{
    channel::oneshot,
    future::{self, Either},
};

use parking_lot::Mutex;

use std::{collections::VecDeque, mem, sync::Arc, time::Duration};

use timer::Instant;

/// Outcome of offering a request to a [`Window`].
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Admission<T> {
    /// There was room left in the window; the request goes out right away.
    Dispatched(T),
    /// The quota is exhausted; the request waits for the next window. `first_overflow` is set on
    /// the request that exhausted the window.
    Queued { first_overflow: bool },
    /// The quota is exhausted and the queue is full.
    Rejected(T),
}

/// What happened when a window expired.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Reset<T> {
    /// The expired window had been paused.
    pub resumed: bool,
    /// Requests moved out of the queue into the new window, oldest first.
    pub drained: Vec<T>,
    /// The new window is exhausted by the drained requests alone and requests are still queued.
    pub paused: bool,
    /// Epoch of the window the drained requests were counted in.
    pub epoch: u64,
}

/// Fixed call window: at most `quota` dispatches between the first call and the deadline, the rest
/// queued in arrival order.
#[derive(Debug)]
pub(crate) struct Window<T> {
    quota: usize,
    period: Duration,
    max_queued: Option<usize>,

    deadline: Option<Instant>,
    epoch: u64,
    calls: usize,
    paused: bool,
    queue: VecDeque<T>,
}

impl<T> Window<T> {
    pub fn new(quota: &Quota) -> Self {
        Window {
            quota: quota.calls(),
            period: quota.window(),
            max_queued: quota.queue_limit(),

            deadline: None,
            epoch: 0,
            calls: 0,
            paused: false,
            queue: VecDeque::new(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Number of windows closed so far. A call slot is only good for the epoch it was counted in.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Offer a request, opening a window if none is running.
    pub fn admit(&mut self, now: Instant, item: T) -> Admission<T> {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.period);
        }

        if self.calls < self.quota {
            self.calls += 1;
            return Admission::Dispatched(item);
        }

        if let Some(max) = self.max_queued {
            if self.queue.len() >= max {
                return Admission::Rejected(item);
            }
        }

        self.queue.push_back(item);
        let first_overflow = !mem::replace(&mut self.paused, true);

        Admission::Queued { first_overflow }
    }

    /// Close the window if its deadline has passed and drain up to one quota worth of queued
    /// requests into a fresh window. Returns `None` while the window is still running.
    pub fn expire(&mut self, now: Instant) -> Option<Reset<T>> {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return None,
        }

        self.deadline = None;
        self.epoch += 1;
        self.calls = 0;
        let resumed = mem::replace(&mut self.paused, false);

        let count = self.quota.min(self.queue.len());
        let drained: Vec<T> = self.queue.drain(..count).collect();

        // draining counts as dispatching, which opens the next window
        if count > 0 {
            self.calls = count;
            self.deadline = Some(now + self.period);
        }

        self.paused = !self.queue.is_empty();

        Some(Reset {
            resumed,
            drained,
            paused: self.paused,
            epoch: self.epoch,
        })
    }
}

/// Client-side call quota. Cloning yields another handle to the same window.
#[derive(Debug, Clone)]
pub(crate) struct RateLimit {
    window: Arc<Mutex<Window<oneshot::Sender<u64>>>>,
    hooks: Hooks,
}

/// Admission ticket for one request.
#[derive(Debug)]
pub(crate) enum Permit {
    /// A call slot counted in the window of the given epoch.
    Ready { rate_limit: RateLimit, epoch: u64 },
    /// Waiting for a slot in a later window. The signal carries the epoch of that window.
    Queued {
        rate_limit: RateLimit,
        signal: oneshot::Receiver<u64>,
    },
}

impl RateLimit {
    pub fn new(quota: &Quota, hooks: Hooks) -> Self {
        RateLimit {
            window: Arc::new(Mutex::new(Window::new(quota))),
            hooks,
        }
    }

    /// Count a request against the quota, or queue it when the quota is exhausted. The decision is
    /// taken immediately; the returned permit resolves once the request may go out.
    pub fn admit(&self) -> CourtsideResult<Permit> {
        let (tx, rx) = oneshot::channel();
        let now = Instant::now();

        let (reset, admission, epoch, max_queued) = {
            let mut window = self.window.lock();
            let reset = window.expire(now);
            let admission = window.admit(now, tx);
            (reset, admission, window.epoch(), window.max_queued)
        };

        if let Some(reset) = reset {
            self.apply(reset);
        }

        match admission {
            Admission::Dispatched(_) => Ok(Permit::Ready {
                rate_limit: self.clone(),
                epoch,
            }),
            Admission::Queued { first_overflow } => {
                if first_overflow {
                    self.hooks.pause();
                }

                tracing::debug!("call quota exhausted, request queued");

                Ok(Permit::Queued {
                    rate_limit: self.clone(),
                    signal: rx,
                })
            }
            Admission::Rejected(_) => {
                let max = max_queued.unwrap_or_default();
                tracing::warn!(max, "request queue is full, rejecting request");
                Err(Error::QueueFull(max))
            }
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.window.lock().deadline()
    }

    fn tick(&self, now: Instant) {
        let reset = self.window.lock().expire(now);

        if let Some(reset) = reset {
            self.apply(reset);
        }
    }

    fn apply(&self, reset: Reset<oneshot::Sender<u64>>) {
        if reset.resumed {
            self.hooks.resume();
        }

        if reset.paused {
            self.hooks.pause();
        }

        if !reset.drained.is_empty() {
            tracing::debug!(count = reset.drained.len(), "draining queued requests");
        }

        for signal in reset.drained {
            // the waiter may have been dropped, its slot is spent either way
            let _ = signal.send(reset.epoch);
        }
    }

    /// Check that a slot counted in `epoch` is still usable. Once its window has closed the
    /// request is admitted again against the current one.
    fn revalidate(&self, epoch: u64) -> CourtsideResult<Option<Permit>> {
        let (reset, current) = {
            let mut window = self.window.lock();
            let reset = window.expire(Instant::now());
            (reset, window.epoch())
        };

        if let Some(reset) = reset {
            self.apply(reset);
        }

        if current == epoch {
            return Ok(None);
        }

        tracing::debug!(epoch, current, "call slot expired before use, admitting again");
        self.admit().map(Some)
    }

    /// Sleep until `signal` fires. Whichever waiter wakes first at the deadline closes the window
    /// and releases the next batch. Returns `None` if the signal was dropped.
    async fn wait(&self, mut signal: oneshot::Receiver<u64>) -> Option<u64> {
        loop {
            let deadline = match self.deadline() {
                Some(deadline) => deadline,
                None => return signal.await.ok(),
            };

            let sleep = timer::sleep_until(deadline);
            futures::pin_mut!(sleep);

            match future::select(&mut signal, sleep).await {
                Either::Left((epoch, _)) => return epoch.ok(),
                Either::Right(_) => self.tick(Instant::now()),
            }
        }
    }

    pub fn status(&self) -> QuotaStatus {
        let window = self.window.lock();

        QuotaStatus {
            calls: window.calls(),
            queued: window.queued(),
            paused: window.is_paused(),
        }
    }
}

impl Permit {
    /// Wait until the request is allowed out.
    ///
    /// A slot is only good for the window it was counted in: a permit used after its window
    /// closed goes through admission again, and may end up queued or rejected.
    pub async fn ready(self) -> CourtsideResult<()> {
        let mut permit = self;

        loop {
            permit = match permit {
                Permit::Ready { rate_limit, epoch } => match rate_limit.revalidate(epoch)? {
                    Some(permit) => permit,
                    None => return Ok(()),
                },
                Permit::Queued { rate_limit, signal } => match rate_limit.wait(signal).await {
                    Some(epoch) => Permit::Ready { rate_limit, epoch },
                    None => rate_limit.admit()?,
                },
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MINUTE: Duration = Duration::from_secs(60);

    fn urls(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
        range.map(|i| format!("u{}", i)).collect()
    }

    fn counter(count: &Arc<AtomicUsize>) -> Arc<dyn Fn() + Send + Sync> {
        let count = count.clone();
        Arc::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn sixty_five_calls_in_one_window() {
        let mut window = Window::new(&Quota::default());
        let start = Instant::now();

        let mut dispatched = Vec::new();
        let mut overflows = 0;

        for url in urls(1..=65) {
            match window.admit(start, url) {
                Admission::Dispatched(url) => dispatched.push(url),
                Admission::Queued { first_overflow } => overflows += first_overflow as usize,
                Admission::Rejected(url) => panic!("{} rejected", url),
            }
        }

        assert_eq!(dispatched, urls(1..=60));
        assert_eq!(window.queued(), 5);
        assert_eq!(overflows, 1);
        assert!(window.is_paused());

        assert_eq!(window.expire(start + MINUTE - Duration::from_millis(1)), None);

        let reset = window.expire(start + MINUTE).unwrap();
        assert_eq!(
            reset,
            Reset {
                resumed: true,
                drained: urls(61..=65),
                paused: false,
                epoch: 1,
            }
        );
        assert_eq!(window.calls(), 5);
        assert_eq!(window.queued(), 0);
        assert!(!window.is_paused());
        assert_eq!(window.deadline(), Some(start + MINUTE + MINUTE));
    }

    #[test]
    fn drain_is_capped_at_quota() {
        let mut window = Window::new(&Quota::default());
        let start = Instant::now();

        for url in urls(1..=130) {
            window.admit(start, url);
        }
        assert_eq!(window.queued(), 70);

        let first = window.expire(start + MINUTE).unwrap();
        assert!(first.resumed);
        assert!(first.paused);
        assert_eq!(first.epoch, 1);
        assert_eq!(first.drained, urls(61..=120));
        assert_eq!(window.calls(), 60);
        assert_eq!(window.queued(), 10);

        // the drained window is full, so new arrivals queue behind the leftovers
        assert_eq!(
            window.admit(start + MINUTE, String::from("late")),
            Admission::Queued {
                first_overflow: false
            }
        );

        let second = window.expire(start + MINUTE * 2).unwrap();
        assert!(second.resumed);
        assert!(!second.paused);
        assert_eq!(second.epoch, 2);

        let mut expected = urls(121..=130);
        expected.push(String::from("late"));
        assert_eq!(second.drained, expected);
        assert_eq!(window.calls(), 11);
    }

    #[test]
    fn pause_reported_once_per_window() {
        let mut window = Window::new(&Quota::new(1, MINUTE));
        let start = Instant::now();

        assert_eq!(window.admit(start, 1), Admission::Dispatched(1));
        assert_eq!(
            window.admit(start, 2),
            Admission::Queued {
                first_overflow: true
            }
        );
        assert_eq!(
            window.admit(start, 3),
            Admission::Queued {
                first_overflow: false
            }
        );

        window.expire(start + MINUTE).unwrap();
        assert_eq!(
            window.admit(start + MINUTE, 4),
            Admission::Queued {
                first_overflow: false
            }
        );
    }

    #[test]
    fn idle_window_closes_without_reopening() {
        let mut window = Window::new(&Quota::default());
        let start = Instant::now();

        assert_eq!(window.expire(start), None);

        window.admit(start, ());
        assert_eq!(window.deadline(), Some(start + MINUTE));

        assert_eq!(
            window.expire(start + MINUTE * 3),
            Some(Reset {
                resumed: false,
                drained: Vec::new(),
                paused: false,
                epoch: 1,
            })
        );
        assert_eq!(window.deadline(), None);
        assert_eq!(window.calls(), 0);

        // the next call opens a window of its own
        let later = start + MINUTE * 5;
        window.admit(later, ());
        assert_eq!(window.deadline(), Some(later + MINUTE));
    }

    #[test]
    fn full_queue_rejects() {
        let mut window = Window::new(&Quota::new(1, MINUTE).max_queued(1));
        let start = Instant::now();

        assert_eq!(window.admit(start, 'a'), Admission::Dispatched('a'));
        assert_eq!(
            window.admit(start, 'b'),
            Admission::Queued {
                first_overflow: true
            }
        );
        assert_eq!(window.admit(start, 'c'), Admission::Rejected('c'));
        assert_eq!(window.queued(), 1);
    }

    #[test]
    fn resume_fires_before_queue_is_released() {
        fn released(permit: &mut Permit) -> bool {
            match permit {
                Permit::Queued { signal, .. } => matches!(signal.try_recv(), Ok(Some(_))),
                Permit::Ready { .. } => false,
            }
        }

        let hooks = Hooks::default();
        let rate_limit = RateLimit::new(&Quota::new(1, MINUTE), hooks.clone());
        let start = Instant::now();

        rate_limit.admit().unwrap();
        let queued = Arc::new(Mutex::new(vec![
            rate_limit.admit().unwrap(),
            rate_limit.admit().unwrap(),
        ]));

        let log = Arc::new(Mutex::new(Vec::new()));
        let (waiting, entries) = (queued.clone(), log.clone());
        hooks.set_on_resume(Some(Arc::new(move || {
            let count = waiting.lock().iter_mut().map(released).filter(|r| *r).count();
            entries.lock().push(("resume", count));
        })));

        rate_limit.tick(start + MINUTE);

        let count = queued.lock().iter_mut().map(released).filter(|r| *r).count();
        log.lock().push(("reset", count));

        // nothing is released until the hook has returned, then one quota worth
        assert_eq!(*log.lock(), vec![("resume", 0), ("reset", 1)]);
    }

    #[test]
    fn huge_window_does_not_overflow() {
        let mut window = Window::new(&Quota::new(1, Duration::MAX));
        let start = Instant::now();

        assert_eq!(window.admit(start, 1), Admission::Dispatched(1));
        assert!(window.deadline().unwrap() > start);
        assert_eq!(window.expire(start + MINUTE), None);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_permit_waits_for_next_window() {
        let paused = Arc::new(AtomicUsize::new(0));
        let resumed = Arc::new(AtomicUsize::new(0));

        let hooks = Hooks::default();
        hooks.set_on_pause(Some(counter(&paused)));
        hooks.set_on_resume(Some(counter(&resumed)));

        let rate_limit = RateLimit::new(&Quota::new(2, MINUTE), hooks);
        let start = Instant::now();

        assert!(matches!(rate_limit.admit(), Ok(Permit::Ready { .. })));
        assert!(matches!(rate_limit.admit(), Ok(Permit::Ready { .. })));

        let queued = rate_limit.admit().unwrap();
        assert!(matches!(queued, Permit::Queued { .. }));
        assert_eq!(paused.load(Ordering::SeqCst), 1);
        assert_eq!(
            rate_limit.status(),
            QuotaStatus {
                calls: 2,
                queued: 1,
                paused: true,
            }
        );

        queued.ready().await.unwrap();

        assert!(Instant::now() >= start + MINUTE);
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        assert_eq!(paused.load(Ordering::SeqCst), 1);
        assert_eq!(
            rate_limit.status(),
            QuotaStatus {
                calls: 1,
                queued: 0,
                paused: false,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_permits_drain_in_order() {
        let paused = Arc::new(AtomicUsize::new(0));
        let hooks = Hooks::default();
        hooks.set_on_pause(Some(counter(&paused)));

        let rate_limit = RateLimit::new(&Quota::new(1, MINUTE), hooks);
        let start = Instant::now();
        let order = Arc::new(Mutex::new(Vec::new()));

        assert!(matches!(rate_limit.admit(), Ok(Permit::Ready { .. })));

        let waiters: Vec<_> = ["b", "c", "d"]
            .iter()
            .map(|name| {
                let permit = rate_limit.admit().unwrap();
                let order = order.clone();
                async move {
                    permit.ready().await.unwrap();
                    order.lock().push((*name, Instant::now() - start));
                }
            })
            .collect();

        // join polls the waiters back to front, the queue must not care
        future::join_all(waiters.into_iter().rev()).await;

        let order = order.lock();
        assert_eq!(
            order.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            vec!["b", "c", "d"]
        );
        for (windows, (_, elapsed)) in (1..).zip(order.iter()) {
            assert!(*elapsed >= MINUTE * windows);
            assert!(*elapsed < MINUTE * windows + Duration::from_secs(1));
        }
        // initial overflow, then once for each window the drain left exhausted
        assert_eq!(paused.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_window_resumes_on_next_admit() {
        let resumed = Arc::new(AtomicUsize::new(0));
        let hooks = Hooks::default();
        hooks.set_on_resume(Some(counter(&resumed)));

        let rate_limit = RateLimit::new(&Quota::new(1, MINUTE), hooks);

        rate_limit.admit().unwrap();
        // dropped before it ever waited
        drop(rate_limit.admit().unwrap());

        tokio::time::advance(MINUTE).await;

        let permit = rate_limit.admit().unwrap();
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
        // the dropped request still used up the drained slot
        assert!(matches!(permit, Permit::Queued { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_permit_is_admitted_again() {
        let rate_limit = RateLimit::new(&Quota::new(2, MINUTE), Hooks::default());
        let start = Instant::now();

        let early = [rate_limit.admit().unwrap(), rate_limit.admit().unwrap()];

        tokio::time::advance(MINUTE + Duration::from_secs(1)).await;
        let late_start = Instant::now();

        let late = [rate_limit.admit().unwrap(), rate_limit.admit().unwrap()];
        for permit in late {
            permit.ready().await.unwrap();
        }
        assert_eq!(Instant::now(), late_start);

        // the early slots belonged to a closed window, they may not go out on top of this one
        let [first, second] = early;
        future::try_join(first.ready(), second.ready()).await.unwrap();

        assert!(Instant::now() >= late_start + MINUTE);
        assert!(Instant::now() >= start + MINUTE * 2);
        assert_eq!(
            rate_limit.status(),
            QuotaStatus {
                calls: 2,
                queued: 0,
                paused: false,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn drained_slot_expires_if_unused() {
        let rate_limit = RateLimit::new(&Quota::new(1, MINUTE), Hooks::default());

        rate_limit.admit().unwrap().ready().await.unwrap();
        let queued = rate_limit.admit().unwrap();

        // nobody waits on the queued permit, so its drained slot goes stale as well
        tokio::time::advance(MINUTE).await;
        rate_limit.tick(Instant::now());
        tokio::time::advance(MINUTE).await;

        let late = rate_limit.admit().unwrap();
        assert!(matches!(late, Permit::Ready { .. }));
        late.ready().await.unwrap();

        let before = Instant::now();
        queued.ready().await.unwrap();
        assert!(Instant::now() >= before + MINUTE);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_past_queue_limit() {
        let rate_limit = RateLimit::new(&Quota::new(1, MINUTE).max_queued(0), Hooks::default());

        rate_limit.admit().unwrap();

        assert_eq!(rate_limit.admit().err(), Some(Error::QueueFull(0)));
    }
}
