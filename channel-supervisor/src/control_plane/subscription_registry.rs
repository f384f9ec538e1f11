//! Registry data model: channel → (subscriber uid → live subscription).

use crate::backend::BackendSubscription;
use crate::channel::ChannelReference;
use crate::subscription::{SubscriberUid, SubscriptionReference};
use std::collections::HashMap;
use std::sync::Arc;

/// One live subscription owned by the registry: the reference it was created
/// from and the backend handle whose durable name equals
/// `reference.durable_name()`.
pub(crate) struct SubscriptionEntry {
    pub(crate) reference: SubscriptionReference,
    pub(crate) handle: Arc<dyn BackendSubscription>,
}

type ChannelSubscriptions = HashMap<SubscriberUid, SubscriptionEntry>;

/// Sole owner of backend subscription handles.
///
/// Inner maps are never left empty across reconcile calls: the last removal
/// for a channel is followed by [`SubscriptionRegistry::prune_channel_if_empty`]
/// or [`SubscriptionRegistry::remove_channel`].
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    channels: HashMap<ChannelReference, ChannelSubscriptions>,
}

impl SubscriptionRegistry {
    pub(crate) fn contains(&self, channel: &ChannelReference, uid: &SubscriberUid) -> bool {
        self.channels
            .get(channel)
            .is_some_and(|subscriptions| subscriptions.contains_key(uid))
    }

    pub(crate) fn has_channel(&self, channel: &ChannelReference) -> bool {
        self.channels.contains_key(channel)
    }

    pub(crate) fn insert(&mut self, channel: &ChannelReference, entry: SubscriptionEntry) {
        self.channels
            .entry(channel.clone())
            .or_default()
            .insert(entry.reference.uid.clone(), entry);
    }

    /// Uids currently registered for a channel, or empty when the channel has
    /// no entry.
    pub(crate) fn subscription_uids(&self, channel: &ChannelReference) -> Vec<SubscriberUid> {
        self.channels
            .get(channel)
            .map(|subscriptions| subscriptions.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn remove_subscription(
        &mut self,
        channel: &ChannelReference,
        uid: &SubscriberUid,
    ) -> Option<SubscriptionEntry> {
        self.channels
            .get_mut(channel)
            .and_then(|subscriptions| subscriptions.remove(uid))
    }

    pub(crate) fn remove_channel(&mut self, channel: &ChannelReference) {
        self.channels.remove(channel);
    }

    pub(crate) fn prune_channel_if_empty(&mut self, channel: &ChannelReference) {
        if self
            .channels
            .get(channel)
            .is_some_and(ChannelSubscriptions::is_empty)
        {
            self.channels.remove(channel);
        }
    }

    /// Ensures a (possibly empty) inner map exists for the duration of one
    /// reconcile pass. Callers prune before releasing the registry.
    pub(crate) fn ensure_channel(&mut self, channel: &ChannelReference) {
        self.channels.entry(channel.clone()).or_default();
    }

    #[cfg(test)]
    pub(crate) fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{SubscriptionEntry, SubscriptionRegistry};
    use crate::backend::{BackendError, BackendSubscription};
    use crate::channel::ChannelReference;
    use crate::subscription::{SubscriberSpec, SubscriptionReference};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoopSubscription;

    #[async_trait]
    impl BackendSubscription for NoopSubscription {
        async fn unsubscribe(&self) -> Result<(), BackendError> {
            Ok(())
        }
    }

    fn entry(uid: &str) -> SubscriptionEntry {
        SubscriptionEntry {
            reference: SubscriptionReference::from(&SubscriberSpec::new(uid, None)),
            handle: Arc::new(NoopSubscription),
        }
    }

    #[test]
    fn insert_and_lookup_by_uid() {
        let channel = ChannelReference::new("n1", "c1");
        let mut registry = SubscriptionRegistry::default();

        registry.insert(&channel, entry("u1"));

        assert!(registry.contains(&channel, &"u1".into()));
        assert!(!registry.contains(&channel, &"u2".into()));
        assert_eq!(registry.subscription_uids(&channel), vec!["u1".into()]);
    }

    #[test]
    fn removing_the_last_subscription_then_pruning_drops_the_channel() {
        let channel = ChannelReference::new("n1", "c1");
        let mut registry = SubscriptionRegistry::default();
        registry.insert(&channel, entry("u1"));

        let removed = registry.remove_subscription(&channel, &"u1".into());
        assert!(removed.is_some());

        // The inner map is empty until pruned, and absent afterwards.
        assert!(registry.has_channel(&channel));
        registry.prune_channel_if_empty(&channel);
        assert!(!registry.has_channel(&channel));
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn prune_keeps_non_empty_channels() {
        let channel = ChannelReference::new("n1", "c1");
        let mut registry = SubscriptionRegistry::default();
        registry.insert(&channel, entry("u1"));
        registry.insert(&channel, entry("u2"));

        registry.remove_subscription(&channel, &"u1".into());
        registry.prune_channel_if_empty(&channel);

        assert!(registry.has_channel(&channel));
        assert_eq!(registry.subscription_uids(&channel).len(), 1);
    }

    #[test]
    fn remove_channel_releases_every_uid() {
        let channel = ChannelReference::new("n1", "c1");
        let mut registry = SubscriptionRegistry::default();
        registry.insert(&channel, entry("u1"));
        registry.insert(&channel, entry("u2"));

        registry.remove_channel(&channel);

        assert!(!registry.has_channel(&channel));
        assert!(registry.subscription_uids(&channel).is_empty());
    }
}
