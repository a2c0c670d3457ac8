//! Shot commentary.
//!
//! A [`CommentaryProvider`] receives the finished [`ShotResult`] together with
//! a one-shot [`CommentaryReply`]. It may answer immediately or from another
//! thread; the game polls the pending request each tick. Missing providers,
//! failures, dropped replies and timeouts all resolve to the configured
//! fallback text.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::CommentaryConfig;
use crate::shot::ShotResult;

/// Why commentary fell back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentaryError {
    #[error("no commentary provider configured")]
    Unavailable,

    #[error("commentary provider failed: {0}")]
    Failed(String),

    #[error("commentary timed out after {0} ms")]
    TimedOut(u64),
}

/// Handle a provider uses to answer exactly once.
#[derive(Debug)]
pub struct CommentaryReply {
    tx: Sender<Result<String, CommentaryError>>,
}

impl CommentaryReply {
    pub fn send(self, text: impl Into<String>) {
        // Receiver gone means the request was cancelled or timed out.
        let _ = self.tx.send(Ok(text.into()));
    }

    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(CommentaryError::Failed(reason.into())));
    }
}

/// Source of commentary text.
pub trait CommentaryProvider {
    /// Start generating commentary for `result`. Must not block.
    fn request(&mut self, result: &ShotResult, reply: CommentaryReply);
}

/// Provider that always answers with the same text.
#[derive(Debug, Clone)]
pub struct StaticCommentary(pub String);

impl CommentaryProvider for StaticCommentary {
    fn request(&mut self, _result: &ShotResult, reply: CommentaryReply) {
        reply.send(self.0.clone());
    }
}

#[derive(Debug)]
struct Pending {
    rx: Receiver<Result<String, CommentaryError>>,
    deadline_ms: u64,
}

/// Owns the provider and at most one in-flight request.
pub struct Commentator {
    config: CommentaryConfig,
    provider: Option<Box<dyn CommentaryProvider>>,
    pending: Option<Pending>,
}

impl Commentator {
    pub fn new(config: CommentaryConfig) -> Self {
        Self { config, provider: None, pending: None }
    }

    /// Install a provider, replacing any previous one.
    pub fn set_provider(&mut self, provider: impl CommentaryProvider + 'static) {
        self.provider = Some(Box::new(provider));
    }

    /// Ask for commentary on `result`. Replaces any pending request.
    ///
    /// Returns text right away when it is already known: the fallback when
    /// no provider is installed, or a reply the provider gave synchronously.
    pub fn request(&mut self, result: &ShotResult, now_ms: u64) -> Option<String> {
        self.pending = None;
        let Some(provider) = self.provider.as_mut() else {
            debug!("{}", CommentaryError::Unavailable);
            return Some(self.config.fallback.clone());
        };
        let (tx, rx) = mpsc::channel();
        provider.request(result, CommentaryReply { tx });
        self.pending = Some(Pending { rx, deadline_ms: now_ms + self.config.timeout_ms });
        self.poll(now_ms)
    }

    /// Check the pending request. Returns the text once it is resolved.
    pub fn poll(&mut self, now_ms: u64) -> Option<String> {
        let pending = self.pending.as_ref()?;
        let outcome = match pending.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) if now_ms < pending.deadline_ms => return None,
            Err(TryRecvError::Empty) => Err(CommentaryError::TimedOut(self.config.timeout_ms)),
            Err(TryRecvError::Disconnected) => {
                Err(CommentaryError::Failed("reply dropped".into()))
            }
        };
        self.pending = None;
        match outcome {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("{e}; using fallback commentary");
                Some(self.config.fallback.clone())
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending request; a late answer is discarded.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

impl std::fmt::Debug for Commentator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commentator")
            .field("config", &self.config)
            .field("has_provider", &self.provider.is_some())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::shot::Terrain;

    fn result() -> ShotResult {
        ShotResult {
            distance: 200.0,
            carry: 200.0,
            deviation: 3.0,
            terrain: Terrain::Fairway,
            strokes: 1,
            power: 0.0,
            accuracy: 0.0,
        }
    }

    /// Holds replies until the test answers them.
    #[derive(Clone, Default)]
    struct Deferred(Rc<RefCell<Vec<CommentaryReply>>>);

    impl CommentaryProvider for Deferred {
        fn request(&mut self, _result: &ShotResult, reply: CommentaryReply) {
            self.0.borrow_mut().push(reply);
        }
    }

    struct Broken;

    impl CommentaryProvider for Broken {
        fn request(&mut self, _result: &ShotResult, reply: CommentaryReply) {
            reply.fail("missing credentials");
        }
    }

    #[test]
    fn no_provider_falls_back_immediately() {
        let mut c = Commentator::new(CommentaryConfig::default());
        assert_eq!(c.request(&result(), 0).as_deref(), Some("Nice shot! Keep it up."));
        assert!(!c.is_pending());
    }

    #[test]
    fn synchronous_provider_answers_in_request() {
        let mut c = Commentator::new(CommentaryConfig::default());
        c.set_provider(StaticCommentary("Right down the middle.".into()));
        assert_eq!(c.request(&result(), 0).as_deref(), Some("Right down the middle."));
    }

    #[test]
    fn provider_failure_falls_back() {
        let mut c = Commentator::new(CommentaryConfig::default());
        c.set_provider(Broken);
        assert_eq!(c.request(&result(), 0).as_deref(), Some("Nice shot! Keep it up."));
    }

    #[test]
    fn deferred_reply_arrives_on_poll() {
        let provider = Deferred::default();
        let mut c = Commentator::new(CommentaryConfig::default());
        c.set_provider(provider.clone());
        assert_eq!(c.request(&result(), 0), None);
        assert_eq!(c.poll(100), None);
        let reply = provider.0.borrow_mut().pop().unwrap();
        reply.send("Long and straight.");
        assert_eq!(c.poll(200).as_deref(), Some("Long and straight."));
        assert_eq!(c.poll(300), None);
    }

    #[test]
    fn timeout_falls_back() {
        let provider = Deferred::default();
        let config = CommentaryConfig { timeout_ms: 500, ..CommentaryConfig::default() };
        let mut c = Commentator::new(config);
        c.set_provider(provider.clone());
        c.request(&result(), 1000);
        assert_eq!(c.poll(1499), None);
        assert_eq!(c.poll(1500).as_deref(), Some("Nice shot! Keep it up."));
        provider.0.borrow_mut().pop().unwrap().send("too late");
        assert_eq!(c.poll(1600), None);
    }

    #[test]
    fn dropped_reply_falls_back() {
        let provider = Deferred::default();
        let mut c = Commentator::new(CommentaryConfig::default());
        c.set_provider(provider.clone());
        c.request(&result(), 0);
        provider.0.borrow_mut().clear();
        assert_eq!(c.poll(1).as_deref(), Some("Nice shot! Keep it up."));
    }

    #[test]
    fn reply_from_another_thread() {
        struct Threaded;
        impl CommentaryProvider for Threaded {
            fn request(&mut self, result: &ShotResult, reply: CommentaryReply) {
                let distance = result.distance;
                std::thread::spawn(move || reply.send(format!("{distance:.0} m")));
            }
        }
        let mut c = Commentator::new(CommentaryConfig::default());
        c.set_provider(Threaded);
        let mut text = c.request(&result(), 0);
        let mut now = 0;
        while text.is_none() && now < 7000 {
            std::thread::sleep(std::time::Duration::from_millis(1));
            now += 1;
            text = c.poll(now);
        }
        assert_eq!(text.as_deref(), Some("200 m"));
    }
}
