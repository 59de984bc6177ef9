/*!
    Thread-safe provider handle.
*/

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::oneshot;

use media_effects::{EffectChain, EffectDefinition};
use media_types::{Error, Result};

use crate::{OutputSample, ProviderState, SampleProvider};

type Pull = Result<Option<OutputSample>>;

// Results of async pulls whose caller went away before receiving them.
// Always locked after the provider, never before.
type Unclaimed = Arc<Mutex<VecDeque<Pull>>>;

/**
    A [`SampleProvider`] behind a lock, for use from several threads.

    Every call takes the lock for its whole duration, so a pull and a
    chain swap never interleave, and [`SharedSampleProvider::close`] waits
    for a pull in flight to finish. Clones share the same provider.

    An async pull that is cancelled (for example by a timeout) after its
    sample was decoded does not lose that sample: it is handed to the
    next call to [`SharedSampleProvider::get_next_sample`] or
    [`SharedSampleProvider::next_sample_async`].
*/
#[derive(Clone)]
pub struct SharedSampleProvider {
    inner: Arc<Mutex<SampleProvider>>,
    unclaimed: Unclaimed,
}

fn pull(provider: &mut SampleProvider, unclaimed: &Mutex<VecDeque<Pull>>) -> Pull {
    let kept = unclaimed.lock().pop_front();
    match kept {
        Some(pull) => pull,
        None => provider.get_next_sample(),
    }
}

impl SharedSampleProvider {
    pub fn new(provider: SampleProvider) -> Self {
        Self {
            inner: Arc::new(Mutex::new(provider)),
            unclaimed: Unclaimed::default(),
        }
    }

    /**
        Lock the provider for a sequence of calls.

        Pulls made through the guard skip samples kept from cancelled
        async pulls.
    */
    pub fn lock(&self) -> MutexGuard<'_, SampleProvider> {
        self.inner.lock()
    }

    pub fn allocate(&self) -> Result<()> {
        self.inner.lock().allocate()
    }

    /**
        Pull the next sample on the calling thread. This blocks while the
        frame is decoded and converted.
    */
    pub fn get_next_sample(&self) -> Result<Option<OutputSample>> {
        pull(&mut self.inner.lock(), &self.unclaimed)
    }

    /**
        Pull the next sample on tokio's blocking thread pool.

        Must be called from within a tokio runtime. Dropping the returned
        future before it completes keeps the pulled sample for the next
        pull.
    */
    pub async fn next_sample_async(&self) -> Result<Option<OutputSample>> {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let unclaimed = Arc::clone(&self.unclaimed);
        tokio::task::spawn_blocking(move || {
            let mut provider = inner.lock();
            let result = pull(&mut provider, &unclaimed);
            if let Err(result) = tx.send(result) {
                unclaimed.lock().push_back(result);
            }
        });

        let mut receiver = Receiver {
            rx,
            unclaimed: Arc::clone(&self.unclaimed),
            received: false,
        };
        let result = (&mut receiver.rx)
            .await
            .map_err(|_| Error::invalid_state("sample pull did not complete"))?;
        receiver.received = true;
        result
    }

    pub fn set_effect_chain(&self, chain: Option<EffectChain>) -> Result<()> {
        self.inner.lock().set_effect_chain(chain)
    }

    pub fn set_effects(&self, definitions: &[EffectDefinition]) -> Result<()> {
        self.inner.lock().set_effects(definitions)
    }

    pub fn disable_effects(&self) {
        self.inner.lock().disable_effects();
    }

    /**
        Flush the provider, discarding samples kept from cancelled pulls.
    */
    pub fn flush(&self) {
        let mut provider = self.inner.lock();
        self.unclaimed.lock().clear();
        provider.flush();
    }

    pub fn close(&self) {
        let mut provider = self.inner.lock();
        self.unclaimed.lock().clear();
        provider.close();
    }

    pub fn state(&self) -> ProviderState {
        self.inner.lock().state()
    }
}

/**
    Receiving end of an async pull. A result that already arrived when
    this is dropped unreceived goes back to the front of the queue.
*/
struct Receiver {
    rx: oneshot::Receiver<Pull>,
    unclaimed: Unclaimed,
    received: bool,
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if self.received {
            return;
        }
        self.rx.close();
        if let Ok(result) = self.rx.try_recv() {
            self.unclaimed.lock().push_front(result);
        }
    }
}

impl From<SampleProvider> for SharedSampleProvider {
    fn from(provider: SampleProvider) -> Self {
        Self::new(provider)
    }
}

impl std::fmt::Debug for SharedSampleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(provider) => f.debug_tuple("SharedSampleProvider").field(&*provider).finish(),
            None => f.debug_struct("SharedSampleProvider").finish_non_exhaustive(),
        }
    }
}

static_assertions::assert_impl_all!(SharedSampleProvider: Send, Sync, Clone);
