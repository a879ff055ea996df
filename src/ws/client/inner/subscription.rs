use std::collections::BTreeSet;

use crate::ws::message::Directive;

/// Vehicles the server has been told to push updates for, on the current transport.
///
/// The server keeps no subscription state across reconnects, so the set is cleared
/// whenever the transport leaves the connected state.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionTracker {
    subscribed: BTreeSet<String>,
}

impl SubscriptionTracker {
    /// Directives for every roster entry not subscribed yet, in roster order.
    ///
    /// Each returned id is recorded as subscribed, so calling this again for the
    /// same connected session yields nothing for already-sent ids.
    pub fn subscribe_missing<'a, I>(&mut self, roster: I) -> Vec<Directive>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut directives = Vec::new();
        for id in roster {
            if self.subscribed.insert(id.clone()) {
                log::trace!("Subscribe vehicle {}", id);
                directives.push(Directive::subscribe(id.as_str()));
            }
        }
        directives
    }

    /// Called once per successful transition to connected.
    pub fn on_connected<'a, I>(&mut self, roster: I) -> Vec<Directive>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let directives = self.subscribe_missing(roster);
        log::debug!(
            "Connected, {} subscribe directive(s) to send",
            directives.len()
        );
        directives
    }

    /// Called when the caller's roster changes. Nothing is sent while not connected,
    /// the next connect subscribes the whole roster.
    pub fn on_entities_changed<'a, I>(&mut self, roster: I, connected: bool) -> Vec<Directive>
    where
        I: IntoIterator<Item = &'a String>,
    {
        if !connected {
            log::trace!("Roster changed while not connected, defer subscriptions");
            return Vec::new();
        }
        self.subscribe_missing(roster)
    }

    /// Unsubscribe directives for every tracked vehicle, leaving the set empty.
    pub fn drain_unsubscribes(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.subscribed)
            .into_iter()
            .map(Directive::unsubscribe)
            .collect()
    }

    pub fn clear(&mut self) {
        if !self.subscribed.is_empty() {
            log::debug!("Forget {} subscription(s)", self.subscribed.len());
        }
        self.subscribed.clear();
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.subscribed.contains(id)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.subscribed.iter().cloned().collect()
    }
}
