//! Glue between the session registry and the now-playing selector.
//!
//! [`NowPlayingTracker`] is the one place where notification events mutate
//! state. It is not synchronised itself; the service actor owns it.

use crate::models::{EmitDecision, NotificationKey, SkipReason, SourceIcon, TrackSnapshot};
use crate::registry::SessionRegistry;
use crate::selector::{NowPlayingSelector, SelectorState};
use crate::traits::{ActiveNotification, ArtworkEncoder, SessionQuery};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

pub struct NowPlayingTracker<H> {
    registry: SessionRegistry<H>,
    selector: NowPlayingSelector,
    query: Arc<dyn SessionQuery<Handle = H>>,
    encoder: Arc<dyn ArtworkEncoder>,
}

impl<H> NowPlayingTracker<H>
where
    H: Clone + Debug + PartialEq + Send + Sync + 'static,
{
    pub fn new(
        query: Arc<dyn SessionQuery<Handle = H>>,
        encoder: Arc<dyn ArtworkEncoder>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(),
            selector: NowPlayingSelector::new(placeholder),
            query,
            encoder,
        }
    }

    /// The listener (re)connected; `active` is every notification currently shown
    pub fn on_listener_connected(&mut self, active: &[ActiveNotification<H>]) -> EmitDecision {
        let Some(handle) = self.registry.resolve(active, self.query.as_ref()) else {
            debug!("No playing or paused session among {} notifications", active.len());
            return EmitDecision::Nothing(SkipReason::NoSessionHandle);
        };

        let icon = self.registry.icon_for(&handle).cloned();
        self.selector.on_session_event(
            self.query.as_ref(),
            self.encoder.as_ref(),
            &handle,
            icon.as_ref(),
        )
    }

    pub fn on_posted(
        &mut self,
        key: NotificationKey,
        handle: Option<H>,
        icon: Option<SourceIcon>,
    ) -> EmitDecision {
        let Some(handle) = handle else {
            return EmitDecision::Nothing(SkipReason::NoSessionHandle);
        };

        let decision = self.selector.on_session_event(
            self.query.as_ref(),
            self.encoder.as_ref(),
            &handle,
            icon.as_ref(),
        );
        self.registry.on_posted(key, handle, icon);
        decision
    }

    pub fn on_removed(&mut self, key: &NotificationKey) -> EmitDecision {
        match self.registry.on_removed(key) {
            Some(handle) => {
                let decision = self.selector.on_session_removed(self.query.as_ref(), &handle);
                if !self.registry.holds(&handle) {
                    self.query.release(&handle);
                }
                decision
            }
            None => {
                debug!("Removal of untracked notification {}", key);
                EmitDecision::Nothing(SkipReason::UntrackedKey)
            }
        }
    }

    pub fn current(&self) -> Option<&TrackSnapshot> {
        self.selector.current()
    }

    pub fn state(&self) -> SelectorState {
        self.selector.state()
    }

    pub fn registry(&self) -> &SessionRegistry<H> {
        &self.registry
    }
}
