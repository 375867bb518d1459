//! Timer-driven lifecycle engine shared by every dashboard collection.
//!
//! An engine owns one ordered collection. Writes replace the whole collection
//! behind a single writer lock, so a [`Snapshot`] handed out earlier never
//! changes underneath its holder. Stages returned by
//! [`LifecycleResource::schedule`] are spawned as independent timers at
//! creation and resolved by id against the collection current at fire time.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use opsdash_contract::ValidationError;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::LifecycleError;

/// Immutable view of a collection. Unchanged entries are shared between
/// successive snapshots.
pub type Snapshot<R> = Arc<Vec<Arc<R>>>;

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    NewestFirst,
    OldestFirst,
}

pub trait LifecycleResource: Clone + Send + Sync + 'static {
    type Request: Send;
    type Draft: Send;
    type Settings: Send + Sync + 'static;
    type Stage: Copy + fmt::Debug + Send + 'static;
    type Status: Copy + fmt::Display;

    /// Short name used in logs, errors and event names.
    const KIND: &'static str;
    const PLACEMENT: Placement;

    fn id(&self) -> &str;

    fn status(&self) -> Self::Status;

    fn validate(request: Self::Request) -> Result<Self::Draft, ValidationError>;

    /// Id minted for the `sequence`-th resource of the collection.
    fn sequence_id(sequence: usize, now: DateTime<Utc>) -> String;

    /// `sequence` is the collection length plus one, moved past any id a
    /// seeded resource already holds.
    fn build(
        sequence: usize,
        draft: Self::Draft,
        settings: &Self::Settings,
        now: DateTime<Utc>,
    ) -> Self;

    /// Delays are measured from creation, never from a previous stage.
    fn schedule(settings: &Self::Settings) -> Vec<(Duration, Self::Stage)>;

    /// Next value for `stage`, or `None` when the current status is not the
    /// one the stage moves forward from.
    fn advance(&self, stage: Self::Stage, settings: &Self::Settings, now: DateTime<Utc>)
        -> Option<Self>;
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    StatusChanged,
    Updated,
}

impl ChangeKind {
    pub fn event_suffix(self) -> &'static str {
        match self {
            ChangeKind::Created => "created",
            ChangeKind::StatusChanged => "status.changed",
            ChangeKind::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LifecycleEvent<R> {
    pub event_id: Uuid,
    pub change: ChangeKind,
    pub resource: Arc<R>,
    /// Whole collection right after the change.
    pub collection: Snapshot<R>,
    pub at: DateTime<Utc>,
}

/// Stops change delivery when unsubscribed or dropped.
#[must_use = "dropping a subscription stops change delivery"]
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct LifecycleEngine<R: LifecycleResource> {
    inner: Arc<EngineInner<R>>,
}

struct EngineInner<R: LifecycleResource> {
    settings: R::Settings,
    collection: RwLock<Snapshot<R>>,
    events: broadcast::Sender<LifecycleEvent<R>>,
}

impl<R: LifecycleResource> Clone for LifecycleEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: LifecycleResource> LifecycleEngine<R> {
    pub fn new(settings: R::Settings) -> Self {
        Self::with_resources(settings, Vec::new())
    }

    /// Starts from existing resources, kept in the given order. No stages are
    /// scheduled for them.
    pub fn with_resources(settings: R::Settings, resources: Vec<R>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let collection = resources.into_iter().map(Arc::new).collect::<Vec<_>>();
        let next_id = R::sequence_id(collection.len() + 1, Utc::now());
        if collection.iter().any(|resource| resource.id() == next_id) {
            warn!(
                kind = R::KIND,
                id = %next_id,
                "seeded id collides with the next generated id; new ids will skip ahead"
            );
        }
        Self {
            inner: Arc::new(EngineInner {
                settings,
                collection: RwLock::new(Arc::new(collection)),
                events,
            }),
        }
    }

    pub fn settings(&self) -> &R::Settings {
        &self.inner.settings
    }

    pub fn snapshot(&self) -> Snapshot<R> {
        Arc::clone(&*self.read())
    }

    pub fn get(&self, id: &str) -> Option<Arc<R>> {
        self.read().iter().find(|resource| resource.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn events(&self) -> broadcast::Receiver<LifecycleEvent<R>> {
        self.inner.events.subscribe()
    }

    /// Validates, inserts and schedules. Returns without waiting on any stage;
    /// an invalid request leaves the collection untouched.
    pub fn create(&self, request: R::Request) -> Result<Arc<R>, LifecycleError> {
        let draft = R::validate(request)?;
        let runtime = Handle::try_current().map_err(|_| LifecycleError::RuntimeUnavailable)?;
        let now = Utc::now();

        let resource = {
            let mut collection = self.write();
            let resource = Arc::new(R::build(
                next_sequence(collection.as_slice(), now),
                draft,
                &self.inner.settings,
                now,
            ));

            let mut next = Vec::with_capacity(collection.len() + 1);
            match R::PLACEMENT {
                Placement::NewestFirst => {
                    next.push(Arc::clone(&resource));
                    next.extend(collection.iter().cloned());
                }
                Placement::OldestFirst => {
                    next.extend(collection.iter().cloned());
                    next.push(Arc::clone(&resource));
                }
            }
            *collection = Arc::new(next);
            self.emit(ChangeKind::Created, &resource, &collection, now);
            resource
        };

        info!(
            kind = R::KIND,
            id = %resource.id(),
            status = %resource.status(),
            "resource created"
        );

        for (delay, stage) in R::schedule(&self.inner.settings) {
            let engine = self.clone();
            let id = resource.id().to_string();
            runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                engine.fire(&id, stage);
            });
        }

        Ok(resource)
    }

    /// Calls `on_change` with the collection after every mutation, in order.
    pub fn subscribe<F>(&self, mut on_change: F) -> Result<Subscription, LifecycleError>
    where
        F: FnMut(&Snapshot<R>) + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| LifecycleError::RuntimeUnavailable)?;
        let mut receiver = self.events();
        let task = runtime.spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => on_change(&event.collection),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(kind = R::KIND, skipped, "subscriber lagged behind lifecycle events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription { task })
    }

    fn fire(&self, id: &str, stage: R::Stage) {
        let settings = &self.inner.settings;
        let outcome = self.replace(id, ChangeKind::StatusChanged, |current, now| {
            current.advance(stage, settings, now)
        });

        match outcome {
            Ok(Some(resource)) => info!(
                kind = R::KIND,
                id = %id,
                stage = ?stage,
                status = %resource.status(),
                "scheduled transition applied"
            ),
            Ok(None) => debug!(
                kind = R::KIND,
                id = %id,
                stage = ?stage,
                "scheduled transition no longer applies"
            ),
            Err(error) => debug!(
                kind = R::KIND,
                id = %id,
                stage = ?stage,
                error = %error,
                "scheduled transition dropped"
            ),
        }
    }

    pub(crate) fn replace<F>(
        &self,
        id: &str,
        change: ChangeKind,
        update: F,
    ) -> Result<Option<Arc<R>>, LifecycleError>
    where
        F: FnOnce(&R, DateTime<Utc>) -> Option<R>,
    {
        let now = Utc::now();
        let mut collection = self.write();
        let Some((next, updated)) =
            replace_by_id(collection.as_slice(), id, |current| update(current, now))?
        else {
            return Ok(None);
        };

        *collection = next;
        self.emit(change, &updated, &collection, now);
        Ok(Some(updated))
    }

    fn emit(&self, change: ChangeKind, resource: &Arc<R>, collection: &Snapshot<R>, at: DateTime<Utc>) {
        // No receivers is not an error.
        let _ = self.inner.events.send(LifecycleEvent {
            event_id: Uuid::now_v7(),
            change,
            resource: Arc::clone(resource),
            collection: Arc::clone(collection),
            at,
        });
    }

    fn read(&self) -> RwLockReadGuard<'_, Snapshot<R>> {
        self.inner
            .collection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot<R>> {
        self.inner
            .collection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// First sequence from `len + 1` up whose id is not taken yet.
fn next_sequence<R: LifecycleResource>(collection: &[Arc<R>], now: DateTime<Utc>) -> usize {
    let mut sequence = collection.len() + 1;
    while collection
        .iter()
        .any(|resource| resource.id() == R::sequence_id(sequence, now))
    {
        sequence += 1;
    }
    sequence
}

/// Functional update of one entry by id. Every other entry keeps its `Arc`.
///
/// Returns `Ok(None)` when `update` declines, and `NotFound` when no entry has
/// that id.
pub fn replace_by_id<R, F>(
    collection: &[Arc<R>],
    id: &str,
    update: F,
) -> Result<Option<(Snapshot<R>, Arc<R>)>, LifecycleError>
where
    R: LifecycleResource,
    F: FnOnce(&R) -> Option<R>,
{
    let position = collection
        .iter()
        .position(|resource| resource.id() == id)
        .ok_or_else(|| LifecycleError::NotFound {
            kind: R::KIND,
            id: id.to_string(),
        })?;

    let Some(updated) = update(&collection[position]) else {
        return Ok(None);
    };

    let updated = Arc::new(updated);
    let mut next = collection.to_vec();
    next[position] = Arc::clone(&updated);
    Ok(Some((Arc::new(next), updated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Ticket {
        id: String,
        step: u8,
    }

    #[derive(Debug, Clone, Copy)]
    struct Step(u8);

    impl LifecycleResource for Ticket {
        type Request = Option<&'static str>;
        type Draft = ();
        type Settings = Vec<Duration>;
        type Stage = Step;
        type Status = u8;

        const KIND: &'static str = "ticket";
        const PLACEMENT: Placement = Placement::NewestFirst;

        fn id(&self) -> &str {
            &self.id
        }

        fn status(&self) -> u8 {
            self.step
        }

        fn validate(request: Self::Request) -> Result<(), ValidationError> {
            request.map(|_| ()).ok_or(ValidationError::MissingField("title"))
        }

        fn sequence_id(sequence: usize, _now: DateTime<Utc>) -> String {
            format!("T{sequence}")
        }

        fn build(sequence: usize, _draft: (), _settings: &Vec<Duration>, now: DateTime<Utc>) -> Self {
            Ticket {
                id: Self::sequence_id(sequence, now),
                step: 0,
            }
        }

        fn schedule(settings: &Vec<Duration>) -> Vec<(Duration, Step)> {
            settings
                .iter()
                .enumerate()
                .map(|(index, delay)| (*delay, Step(index as u8 + 1)))
                .collect()
        }

        fn advance(&self, stage: Step, _settings: &Vec<Duration>, _now: DateTime<Utc>) -> Option<Self> {
            (self.step + 1 == stage.0).then(|| Ticket {
                step: stage.0,
                ..self.clone()
            })
        }
    }

    fn ticket(id: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            step: 0,
        }
    }

    #[test]
    fn replace_keeps_identity_of_untouched_entries() {
        let collection = vec![Arc::new(ticket("T2")), Arc::new(ticket("T1"))];
        let (next, updated) = replace_by_id(&collection, "T1", |t| t.advance(Step(1), &Vec::new(), Utc::now()))
            .expect("present")
            .expect("applies");

        assert_eq!(updated.step, 1);
        assert!(Arc::ptr_eq(&next[0], &collection[0]));
        assert!(Arc::ptr_eq(&next[1], &updated));
        assert_eq!(collection[1].step, 0);
    }

    #[test]
    fn replace_of_missing_id_is_not_found() {
        let collection = vec![Arc::new(ticket("T1"))];
        let error = replace_by_id(&collection, "T9", |t| Some(t.clone())).unwrap_err();
        assert_eq!(
            error,
            LifecycleError::NotFound {
                kind: "ticket",
                id: "T9".to_string()
            }
        );
    }

    #[test]
    fn create_outside_runtime_is_rejected_without_mutation() {
        let engine = LifecycleEngine::<Ticket>::new(Vec::new());
        assert_eq!(
            engine.create(Some("x")).unwrap_err(),
            LifecycleError::RuntimeUnavailable
        );
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn invalid_request_never_touches_collection() {
        let engine = LifecycleEngine::<Ticket>::new(Vec::new());
        let mut events = engine.events();

        let error = engine.create(None).unwrap_err();
        assert_eq!(error, LifecycleError::Validation(ValidationError::MissingField("title")));
        assert!(engine.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn ids_follow_collection_size() {
        let engine = LifecycleEngine::<Ticket>::new(Vec::new());
        engine.create(Some("a")).expect("create");
        let second = engine.create(Some("b")).expect("create");

        assert_eq!(second.id, "T2");
        let ids: Vec<_> = engine.snapshot().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["T2", "T1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stages_are_timed_from_creation() {
        let engine = LifecycleEngine::<Ticket>::new(vec![
            Duration::from_secs(3),
            Duration::from_secs(4),
        ]);
        engine.create(Some("a")).expect("create");

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(engine.get("T1").expect("present").step, 1);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(engine.get("T1").expect("present").step, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn old_snapshots_do_not_change() {
        let engine = LifecycleEngine::<Ticket>::new(vec![Duration::from_secs(1)]);
        engine.create(Some("a")).expect("create");
        let before = engine.snapshot();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(before[0].step, 0);
        assert_eq!(engine.snapshot()[0].step, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_stops_delivery() {
        let engine = LifecycleEngine::<Ticket>::new(vec![Duration::from_secs(1)]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = engine
            .subscribe(move |collection| {
                sink.lock().unwrap().push(collection.len());
            })
            .expect("subscribe");

        engine.create(Some("a")).expect("create");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);

        subscription.unsubscribe();
        engine.create(Some("b")).expect("create");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_stage_leaves_collection_and_events_alone() {
        // Step 2 fires first while the ticket is still at step 0.
        let engine = LifecycleEngine::<Ticket>::new(vec![
            Duration::from_secs(2),
            Duration::from_secs(1),
        ]);
        engine.create(Some("a")).expect("create");
        let mut events = engine.events();
        let before = engine.snapshot();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(Arc::ptr_eq(&before, &engine.snapshot()));
        assert_eq!(engine.get("T1").expect("present").step, 0);
        assert!(events.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(engine.get("T1").expect("present").step, 1);
        assert_eq!(events.try_recv().expect("event").change, ChangeKind::StatusChanged);
    }

    #[tokio::test(start_paused = true)]
    async fn stage_for_vanished_target_is_dropped() {
        let engine = LifecycleEngine::<Ticket>::new(vec![Duration::from_secs(1)]);
        engine.create(Some("a")).expect("create");
        *engine.write() = Arc::new(Vec::new());
        let mut events = engine.events();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(engine.is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn seeded_ids_are_never_minted_twice() {
        let engine = LifecycleEngine::<Ticket>::with_resources(
            Vec::new(),
            vec![ticket("T3"), ticket("T2")],
        );
        let created = engine.create(Some("a")).expect("create");

        assert_eq!(created.id, "T4");
        let ids: Vec<_> = engine.snapshot().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["T4", "T3", "T2"]);
    }
}
