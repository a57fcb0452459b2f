//! The instance handle tying transport, receiver and registry together.

use crate::config::{LpsConfig, ReleasePolicy};
use crate::error::{LpsError, Result};
use crate::pattern::Pattern;
use crate::receiver::ReceiverLoop;
use crate::stats::{LpsStats, StatsSnapshot};
use crate::subscriptions::{Release, SubscriptionHandle, SubscriptionRegistry};
use crate::transport::{MulticastTransport, Transport};
use crate::types::{DomainTag, Event, InstanceId, Sample};
use crate::wire::{encode_frame, FRAME_HEADER_LEN};
use crossbeam_channel::{bounded, Receiver, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Source of process-unique instance IDs.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// The running receiver thread.
struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// A publish/subscribe endpoint for one domain.
///
/// Provides:
/// - Publishing samples to the multicast group
/// - Pattern subscriptions with callbacks or bounded channels
/// - A background receiver that dispatches in arrival order
///
/// All methods take `&self` and may be called from any thread.
pub struct Lps {
    id: InstanceId,
    domain: DomainTag,
    config: LpsConfig,

    /// Shared with the receiver; `None` once stopped.
    transport: RwLock<Option<Arc<dyn Transport>>>,

    registry: Arc<SubscriptionRegistry>,
    stats: Arc<LpsStats>,

    /// Receiver thread, taken by `stop`.
    worker: Mutex<Option<Worker>>,
    receiver_thread: ThreadId,
}

impl Lps {
    /// Start an instance for `domain` with default settings.
    pub fn start(domain: &str) -> Result<Self> {
        Self::start_with_config(LpsConfig::with_domain(domain))
    }

    /// Start an instance on UDP multicast.
    pub fn start_with_config(config: LpsConfig) -> Result<Self> {
        config.validate()?;
        let transport = MulticastTransport::open(&config)?;
        Self::start_with_transport(config, transport)
    }

    /// Start an instance on an arbitrary transport.
    pub fn start_with_transport<T: Transport>(config: LpsConfig, transport: T) -> Result<Self> {
        let domain = config.validate()?;
        let id = InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed));

        let transport: Arc<dyn Transport> = Arc::new(transport);
        let registry = Arc::new(SubscriptionRegistry::new(id));
        let stats = Arc::new(LpsStats::new());
        let running = Arc::new(AtomicBool::new(true));

        let receiver = ReceiverLoop {
            transport: Arc::clone(&transport),
            domain,
            registry: Arc::clone(&registry),
            stats: Arc::clone(&stats),
            running: Arc::clone(&running),
            capacity: config.recv_buffer_size,
            poll_interval: config.poll_interval,
        };

        let handle = thread::Builder::new()
            .name(format!("lps-recv-{}", id.0))
            .spawn(move || receiver.run())?;
        let receiver_thread = handle.thread().id();

        tracing::info!(instance = %id, %domain, "instance started");

        Ok(Self {
            id,
            domain,
            config,
            transport: RwLock::new(Some(transport)),
            registry,
            stats,
            worker: Mutex::new(Some(Worker { running, handle })),
            receiver_thread,
        })
    }

    /// Stop the receiver and release the transport.
    ///
    /// When this returns no further callback of this instance will begin.
    /// Calling it again is a no-op. Calling it from one of this instance's
    /// callbacks returns [`LpsError::StopFromReceiver`].
    pub fn stop(&self) -> Result<()> {
        if thread::current().id() == self.receiver_thread {
            return Err(LpsError::StopFromReceiver);
        }

        let mut worker = self.worker.lock();
        let Some(Worker { running, handle }) = worker.take() else {
            return Ok(());
        };

        running.store(false, Ordering::Release);
        if handle.join().is_err() {
            tracing::error!(instance = %self.id, "receiver thread panicked");
        }

        self.transport.write().take();

        let drain = self.config.release_policy == ReleasePolicy::AutoRelease;
        let released = self.registry.close(drain);
        if drain {
            tracing::debug!(instance = %self.id, released, "released subscriptions on stop");
        }

        tracing::info!(instance = %self.id, domain = %self.domain, "instance stopped");
        Ok(())
    }

    /// Whether `stop` has not yet been called.
    pub fn is_running(&self) -> bool {
        self.transport.read().is_some()
    }

    // --- Subscriptions ---

    /// Call `callback` for every received frame whose topic matches `pattern`.
    ///
    /// The callback runs on the receiver thread, outside any lock. Fails
    /// with [`LpsError::Stopped`] once `stop` has closed the registry, even
    /// when the two calls race.
    pub fn subscribe<F>(
        &self,
        pattern: impl Into<Pattern>,
        callback: F,
    ) -> Result<SubscriptionHandle>
    where
        F: Fn(&str, Sample) + Send + Sync + 'static,
    {
        self.registry.insert(pattern.into(), callback)
    }

    /// Deliver matching frames to a bounded channel.
    ///
    /// A full channel drops the event.
    pub fn subscribe_channel(
        &self,
        pattern: impl Into<Pattern>,
        capacity: usize,
    ) -> Result<(SubscriptionHandle, Receiver<Event>)> {
        let (sender, receiver) = bounded(capacity);
        let instance = self.id;

        let handle = self.subscribe(pattern, move |topic, sample| {
            let event = Event {
                topic: topic.to_string(),
                sample,
            };
            match sender.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%instance, topic, "subscriber channel full, dropping event");
                }
            }
        })?;

        Ok((handle, receiver))
    }

    /// Remove a subscription.
    ///
    /// Returns [`Release::Deferred`] when a callback for it is still
    /// running; it is freed as soon as that callback returns, and no new
    /// dispatch will select it.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> Result<Release> {
        self.registry.remove(handle)
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.registry.len()
    }

    // --- Publishing ---

    /// Send one sample to every instance of this domain on the segment.
    ///
    /// Best effort: the datagram may be lost, duplicated or reordered.
    /// Topics over 255 bytes or containing a NUL byte are rejected and
    /// nothing is sent.
    pub fn publish(&self, topic: &str, sample: Sample) -> Result<()> {
        let transport = self.transport.read().clone().ok_or(LpsError::Stopped)?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + topic.len());
        if let Err(e) = encode_frame(&self.domain, topic, sample, &mut frame) {
            self.stats.record_rejected();
            tracing::debug!(instance = %self.id, "publish rejected: {}", e);
            return Err(e);
        }

        transport.send(&frame)?;
        self.stats.record_published();
        Ok(())
    }

    // --- Accessors ---

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn domain(&self) -> DomainTag {
        self.domain
    }

    pub fn config(&self) -> &LpsConfig {
        &self.config
    }

    /// Current traffic counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for Lps {
    fn drop(&mut self) {
        if thread::current().id() == self.receiver_thread {
            // Last owner was one of our callbacks: signal and detach.
            if let Some(worker) = self.worker.get_mut().take() {
                worker.running.store(false, Ordering::Release);
            }
            return;
        }

        if let Err(e) = self.stop() {
            tracing::warn!(instance = %self.id, "stop on drop failed: {}", e);
        }
    }
}

impl std::fmt::Debug for Lps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lps")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .field("running", &self.is_running())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}
