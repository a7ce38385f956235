//! The event driver.
//!
//! Runs events through their handler's four phases against a consistent
//! read, submits the staged result as one Change-To-Apply and retries from
//! scratch when the commit conflicts.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use terra_acl::AccessChecker;
use terra_core::{Change, ChangeToApply, EngineConfig, EntityId};
use terra_event::{
    DynHandler, Event, EventContext, EventError, HandlerRegistry, IdPool, PrepareContext,
    ResolvedEntities, WorkingSet,
};
use terra_query::{
    count_new_ids, determine_ids_used, index_keys, IndexSnapshot, InvolvedSpec, Query,
};
use tracing::{debug, error, warn};

use crate::backend::Backend;
use crate::backoff::Backoff;
use crate::error::{TransactionError, TransactionResult};
use crate::outcome::{AttemptState, EventOutcome};

/// One member of a coalesced group.
type Member<'e, E> = (&'e E, Arc<dyn DynHandler<E>>);

/// Dispatches events to handlers and commits their changes.
pub struct EventDriver<E: Event> {
    registry: HandlerRegistry<E>,
    backend: Backend,
    services: PrepareContext,
    config: EngineConfig,
    backoff: Backoff,
}

impl<E: Event> EventDriver<E> {
    pub fn new(registry: HandlerRegistry<E>, backend: Backend, config: EngineConfig) -> Self {
        let backoff = Backoff::from_config(&config);
        Self {
            registry,
            backend,
            services: PrepareContext::new(),
            config,
            backoff,
        }
    }

    /// Read-only services handed to every `prepare`.
    pub fn with_services(mut self, services: PrepareContext) -> Self {
        self.services = services;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Process one event in its own transaction.
    pub async fn process(&self, event: &E) -> EventOutcome {
        self.process_batch(std::slice::from_ref(event))
            .await
            .into_iter()
            .next()
            .unwrap_or_else(unprocessed)
    }

    /// Process a batch of events, one outcome per event in input order.
    ///
    /// Events whose handlers report the same merge key are coalesced into a
    /// single transaction and applied in input order over a shared working
    /// set. A rollback in one of them discards only its own changes.
    pub async fn process_batch(&self, events: &[E]) -> Vec<EventOutcome> {
        let mut outcomes: Vec<Option<EventOutcome>> = events.iter().map(|_| None).collect();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut handlers: HashMap<usize, Arc<dyn DynHandler<E>>> = HashMap::new();
        let mut by_key: HashMap<(&'static str, String), usize> = HashMap::new();

        for (index, event) in events.iter().enumerate() {
            let handler = match self.registry.for_event(event) {
                Ok(handler) => handler,
                Err(e) => {
                    error!(kind = event.kind(), error = %e, "event dropped");
                    outcomes[index] = Some(failed(e.into()));
                    continue;
                }
            };
            match handler.merge_key(event) {
                Some(key) => {
                    let slot = *by_key.entry((handler.kind(), key)).or_insert_with(|| {
                        groups.push(Vec::new());
                        groups.len() - 1
                    });
                    groups[slot].push(index);
                }
                None => groups.push(vec![index]),
            }
            handlers.insert(index, handler);
        }

        for group in groups {
            let members: Vec<Member<'_, E>> = group
                .iter()
                .filter_map(|i| handlers.get(i).map(|h| (&events[*i], h.clone())))
                .collect();
            let results = self.run_group(&members).await;
            for (index, outcome) in group.into_iter().zip(results) {
                outcomes[index] = Some(outcome);
            }
        }

        outcomes
            .into_iter()
            .map(|o| o.unwrap_or_else(unprocessed))
            .collect()
    }

    /// Run every phase for one event and return the Change-To-Apply it would
    /// submit, without committing.
    pub async fn plan(&self, event: &E) -> TransactionResult<ChangeToApply> {
        let handler = self.registry.for_event(event)?;
        let mut working = WorkingSet::new();
        let mut guarded = BTreeSet::new();
        self.stage(handler.as_ref(), event, &mut working, &mut guarded, 1)
            .await?;
        Ok(working.build(&guarded))
    }

    async fn run_group(&self, members: &[Member<'_, E>]) -> Vec<EventOutcome> {
        let Some((_, first)) = members.first() else {
            return Vec::new();
        };
        let kind = first.kind();
        let max_attempts = self.config.max_attempts().max(1);
        debug!(kind, size = members.len(), state = %AttemptState::Queued, "queued");
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(members, attempt).await {
                Ok(outcomes) => return outcomes,
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff.delay(attempt);
                    debug!(
                        kind,
                        attempt,
                        error = %e,
                        ?delay,
                        state = %AttemptState::Conflicted,
                        "retrying from a fresh read"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let e = if e.is_transient() {
                        TransactionError::exhausted(attempt, e)
                    } else {
                        e
                    };
                    error!(
                        kind,
                        attempt,
                        error = %e,
                        state = %AttemptState::FatalError,
                        "transaction failed"
                    );
                    let shared = Arc::new(e);
                    return members
                        .iter()
                        .map(|_| EventOutcome::Failed {
                            error: shared.clone(),
                        })
                        .collect();
                }
            }
        }
    }

    /// One attempt over a group: stage every member, then commit once.
    async fn attempt(
        &self,
        members: &[Member<'_, E>],
        attempt: u32,
    ) -> TransactionResult<Vec<EventOutcome>> {
        let mut working = WorkingSet::new();
        let mut guarded = BTreeSet::new();
        let mut settled: Vec<Option<EventOutcome>> = Vec::with_capacity(members.len());

        for (event, handler) in members {
            let savepoint = working.savepoint();
            let guarded_before = guarded.clone();
            match self
                .stage(handler.as_ref(), event, &mut working, &mut guarded, attempt)
                .await
            {
                Ok(()) => settled.push(None),
                Err(e) if e.is_attempt_wide() => return Err(e),
                Err(e) => {
                    working.restore(savepoint);
                    guarded = guarded_before;
                    settled.push(Some(settle(handler.kind(), attempt, e)));
                }
            }
        }

        if settled.iter().all(Option::is_some) {
            return Ok(settled.into_iter().flatten().collect());
        }

        let unit = working.build(&guarded);
        let events = unit.events.clone();
        let result = self.backend.store.apply(vec![unit]).await?;
        if !result.all_succeeded() {
            return Err(TransactionError::Conflict);
        }

        let tick = result.changes.first().map(Change::tick);
        debug!(
            kind = members[0].1.kind(),
            attempt,
            ?tick,
            changes = result.changes.len(),
            state = %AttemptState::Committed,
            "committed"
        );
        if !events.is_empty() {
            if let Err(e) = self.backend.firehose.publish(events).await {
                warn!(error = %e, "firehose delivery failed");
            }
        }

        Ok(settled
            .into_iter()
            .map(|s| {
                s.unwrap_or_else(|| EventOutcome::Committed {
                    tick,
                    changes: result.changes.clone(),
                    attempts: attempt,
                })
            })
            .collect())
    }

    /// Run the four phases of one event into `working`.
    async fn stage(
        &self,
        handler: &dyn DynHandler<E>,
        event: &E,
        working: &mut WorkingSet,
        guarded: &mut BTreeSet<EntityId>,
        attempt: u32,
    ) -> TransactionResult<()> {
        let kind = handler.kind();
        let phase = |state: AttemptState| debug!(kind, attempt, %state, "phase");

        phase(AttemptState::ReadFirstPass);
        let first_pass = handler.prepare_involves(event)?;
        let first_queries: Vec<Query> = first_pass.iter().map(|(_, q)| q.clone()).collect();
        let first_index = self.lookup(&first_queries).await?;
        let first_ids = determine_ids_used(&first_queries, &first_index);
        self.fetch(working, &first_ids).await?;
        let prepared = ResolvedEntities::resolve_prepare(
            &first_pass,
            &working.view(&first_ids),
            &first_index,
        )?;
        let derived = handler.prepare(&prepared, event, &self.services)?;

        phase(AttemptState::Derived);
        let spec = handler.involves(event, derived.as_ref())?;
        let new_ids = count_new_ids(&spec, self.config.max_new_ids())?;

        phase(AttemptState::FinalSpecResolved);
        let queries: Vec<Query> = spec.queries().map(|(_, q)| q).collect();
        let index = self.lookup(&queries).await?;
        let ids = determine_ids_used(&queries, &index);
        let mut pool = IdPool::new(if new_ids > 0 {
            self.backend.ids.allocate(new_ids).await?
        } else {
            Vec::new()
        });
        self.fetch(working, &ids).await?;
        let checkers = self.build_checkers(&spec, working).await?;

        phase(AttemptState::SnapshotFetched);
        debug!(kind, attempt, ?ids, new_ids, "snapshot");
        let mut involved = ResolvedEntities::resolve_involved(
            &spec,
            &working.view(&ids),
            &index,
            &mut pool,
            &checkers,
        )?;
        let reserved = involved.reserved_ids();
        let involved_ids: BTreeSet<EntityId> = ids.iter().copied().collect();
        {
            let mut ctx =
                EventContext::new(event.target(), &reserved, &involved_ids, working.staged_mut());
            handler.apply(&mut involved, event, &mut ctx)?;
        }
        for patch in involved.into_patches() {
            working.staged_mut().stage_patch(patch);
        }
        guarded.extend(involved_ids);
        Ok(())
    }

    async fn lookup(&self, queries: &[Query]) -> TransactionResult<IndexSnapshot> {
        let keys = index_keys(queries);
        if keys.is_empty() {
            return Ok(IndexSnapshot::new());
        }
        let answers = self.backend.index.lookup_index(&keys).await?;
        Ok(IndexSnapshot::from_lookup(&keys, &answers))
    }

    /// Read `ids` not yet in the working set.
    async fn fetch(&self, working: &mut WorkingSet, ids: &[EntityId]) -> TransactionResult<()> {
        let missing: Vec<EntityId> = ids
            .iter()
            .copied()
            .filter(|id| !working.has_read(*id) && !working.staged().id_used(*id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        let reads = self.backend.store.get_with_version(&missing).await?;
        working.record_reads(&missing, reads);
        Ok(())
    }

    /// Fresh checkers for every access check in `spec`.
    async fn build_checkers(
        &self,
        spec: &InvolvedSpec,
        working: &WorkingSet,
    ) -> TransactionResult<HashMap<String, AccessChecker>> {
        let mut checkers = HashMap::new();
        for (name, request) in spec.acl_checks() {
            let protections = self.backend.protections.acl_entities(&request.domain).await?;
            let actor = if working.has_read(request.user_id) {
                working.current(request.user_id)
            } else {
                self.backend
                    .store
                    .get_with_version(&[request.user_id])
                    .await?
                    .into_iter()
                    .next()
                    .and_then(|read| read.entity)
            };
            let checker = AccessChecker::build(request, actor.as_ref(), &protections)?;
            checkers.insert(name.to_string(), checker);
        }
        Ok(checkers)
    }
}

impl<E: Event> std::fmt::Debug for EventDriver<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDriver")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The outcome of an event that failed on its own, without sinking the
/// rest of its group.
fn settle(kind: &str, attempt: u32, error: TransactionError) -> EventOutcome {
    match error {
        TransactionError::Event(EventError::Rollback { reason }) => {
            warn!(kind, attempt, %reason, state = %AttemptState::RolledBack, "handler rolled back");
            EventOutcome::RolledBack { reason }
        }
        TransactionError::Event(EventError::Denied { reason }) => {
            warn!(
                kind,
                attempt,
                %reason,
                state = %AttemptState::RolledBack,
                "handler denied actor"
            );
            EventOutcome::RolledBack { reason }
        }
        TransactionError::Event(EventError::Unsatisfied { name, query }) => {
            warn!(kind, attempt, %name, %query, "could not satisfy query");
            EventOutcome::Unsatisfied { name }
        }
        error => {
            error!(kind, attempt, %error, state = %AttemptState::FatalError, "event failed");
            failed(error)
        }
    }
}

fn failed(error: TransactionError) -> EventOutcome {
    EventOutcome::Failed {
        error: Arc::new(error),
    }
}

fn unprocessed() -> EventOutcome {
    failed(EventError::invariant("event was never processed").into())
}
