//! Session registry: which active notification carries which media session.
//!
//! Pure bookkeeping. Entries appear on posted events, are replaced by repeated
//! posts for the same key, and disappear only through [`SessionRegistry::on_removed`]
//! or a reconnect that no longer lists them.

use crate::models::{NotificationKey, SourceIcon};
use crate::selector::select_initial;
use crate::traits::{ActiveNotification, SessionQuery};
use tracing::debug;

#[derive(Clone, Debug)]
struct Entry<H> {
    key: NotificationKey,
    handle: H,
    icon: Option<SourceIcon>,
}

/// Mapping from notification key to session handle, in first-posted order
#[derive(Clone, Debug)]
pub struct SessionRegistry<H> {
    entries: Vec<Entry<H>>,
}

impl<H> Default for SessionRegistry<H> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<H: Clone + PartialEq> SessionRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the handle for `key`
    pub fn on_posted(&mut self, key: NotificationKey, handle: H, icon: Option<SourceIcon>) {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => {
                entry.handle = handle;
                entry.icon = icon;
            }
            None => self.entries.push(Entry { key, handle, icon }),
        }
    }

    /// Drop the mapping for `key`, returning the handle it held.
    ///
    /// Unknown keys are expected (listener reconnects race the notification
    /// lifecycle) and simply yield `None`.
    pub fn on_removed(&mut self, key: &NotificationKey) -> Option<H> {
        let idx = self.entries.iter().position(|e| &e.key == key)?;
        Some(self.entries.remove(idx).handle)
    }

    /// Rebuild the registry from the full list of active notifications and
    /// pick the session to start from.
    ///
    /// Keys no longer active are pruned, every candidate carrying a handle is
    /// (re)registered, and the best candidate according to
    /// [`select_initial`] is returned.
    ///
    /// The pruning is the one removal path besides [`Self::on_removed`]: a
    /// reconnect is authoritative, so a key missing from `active` (or listed
    /// without a handle) had its removal lost while disconnected.
    pub fn resolve<Q>(
        &mut self,
        active: &[ActiveNotification<H>],
        query: &Q,
    ) -> Option<H>
    where
        Q: SessionQuery<Handle = H> + ?Sized,
    {
        self.entries
            .retain(|e| active.iter().any(|n| n.key == e.key && n.handle.is_some()));

        for notification in active {
            if let Some(handle) = &notification.handle {
                self.on_posted(
                    notification.key.clone(),
                    handle.clone(),
                    notification.icon.clone(),
                );
            }
        }

        let chosen = select_initial(active, query)?;
        debug!("Resolved starting session from notification {}", chosen.key);
        chosen.handle.clone()
    }

    pub fn get(&self, key: &NotificationKey) -> Option<&H> {
        self.entries.iter().find(|e| &e.key == key).map(|e| &e.handle)
    }

    /// Icon posted alongside the first entry holding `handle`
    pub fn icon_for(&self, handle: &H) -> Option<&SourceIcon> {
        self.entries
            .iter()
            .find(|e| &e.handle == handle)
            .and_then(|e| e.icon.as_ref())
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.get(key).is_some()
    }

    /// Whether any key still maps to `handle`
    pub fn holds(&self, handle: &H) -> bool {
        self.entries.iter().any(|e| &e.handle == handle)
    }

    pub fn keys(&self) -> impl Iterator<Item = &NotificationKey> {
        self.entries.iter().map(|e| &e.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
