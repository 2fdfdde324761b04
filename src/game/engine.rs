use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::connection::ConnectionRegistry;
use crate::eligibility::EligibilityGate;
use crate::queue::{JoinOutcome, LocationQueues};
use crate::websockets::WebSocketMessage;

use super::models::{Decision, EngineConfig, MatchRecord, Participant};
use super::outcome;

/// The match-lifecycle core: pairing orchestration, the timed decision
/// state machine, and disconnect-driven recovery.
///
/// The engine owns the live match table exclusively. Every operation takes
/// the table lock once, mutates, and collects outbound notifications to
/// deliver after the lock is released, so no transport push ever happens
/// inside the mutual-exclusion scope.
pub struct MatchEngine {
    // match_id -> live match record
    matches: Mutex<HashMap<String, MatchRecord>>,
    queues: Arc<LocationQueues>,
    registry: Arc<dyn ConnectionRegistry>,
    gate: Arc<dyn EligibilityGate>,
    config: EngineConfig,
}

impl MatchEngine {
    pub fn new(
        queues: Arc<LocationQueues>,
        registry: Arc<dyn ConnectionRegistry>,
        gate: Arc<dyn EligibilityGate>,
        config: EngineConfig,
    ) -> Self {
        Self {
            matches: Mutex::new(HashMap::new()),
            queues,
            registry,
            gate,
            config,
        }
    }

    /// Handles a join request: records the connection's attributes, then
    /// either pairs it with a waiting peer or queues it at the location.
    pub async fn join_location(
        self: &Arc<Self>,
        connection_id: &str,
        location_id: &str,
        display_name: &str,
    ) {
        match self.gate.may_play_today(connection_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(connection_id = %connection_id, "Join refused, already played today");
                self.registry
                    .deliver(
                        connection_id,
                        &WebSocketMessage::error("Already played today".to_string()),
                    )
                    .await;
                return;
            }
            Err(e) => {
                // The gate going down must never block play.
                warn!(connection_id = %connection_id, error = %e, "Eligibility check unavailable, allowing join");
            }
        }

        self.registry
            .set_attributes(connection_id, location_id, display_name)
            .await;

        match self.queues.join_or_pair(connection_id, location_id).await {
            JoinOutcome::Queued { position } => {
                info!(
                    connection_id = %connection_id,
                    location_id = %location_id,
                    position,
                    "Queued at location"
                );
                self.registry
                    .deliver(connection_id, &WebSocketMessage::queued(position))
                    .await;
            }
            JoinOutcome::Paired { partner_id } => {
                // The partner queued first and becomes side A. Its display
                // name is read back from the registry.
                let Some(partner) = self.registry.attributes(&partner_id).await else {
                    // Partner vanished between the liveness check and now;
                    // recover the requester into the queue, same as a
                    // stale head. Never surfaced as an error.
                    debug!(partner_id = %partner_id, "Partner gone before match creation, requeueing requester");
                    let position = self.queues.requeue(location_id, connection_id).await;
                    self.registry
                        .deliver(connection_id, &WebSocketMessage::queued(position))
                        .await;
                    return;
                };

                self.create_match(
                    location_id,
                    Participant::new(partner_id, partner.display_name),
                    Participant::new(connection_id.to_string(), display_name.to_string()),
                )
                .await;
            }
        }
    }

    /// Creates a match for a freshly paired couple, arms the finalize
    /// timer, and notifies both sides.
    async fn create_match(self: &Arc<Self>, location_id: &str, side_a: Participant, side_b: Participant) {
        let match_id = Uuid::new_v4().to_string();
        let deadline =
            Utc::now() + chrono::Duration::milliseconds(self.config.decision_window.as_millis() as i64);

        let found_for_a = WebSocketMessage::match_found(
            &match_id,
            &side_b.connection_id,
            &side_b.display_name,
            deadline,
        );
        let found_for_b = WebSocketMessage::match_found(
            &match_id,
            &side_a.connection_id,
            &side_a.display_name,
            deadline,
        );
        let (id_a, id_b) = (side_a.connection_id.clone(), side_b.connection_id.clone());

        let record = MatchRecord {
            id: match_id.clone(),
            location_id: location_id.to_string(),
            participants: [side_a, side_b],
            deadline,
            finished: false,
            timer: None,
        };
        self.matches.lock().await.insert(match_id.clone(), record);

        // Force-resolves timeouts even if no further submission arrives.
        let engine = Arc::clone(self);
        let timer_match_id = match_id.clone();
        let delay = self.config.decision_window + self.config.grace_period;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.finalize_check(&timer_match_id).await;
        });

        {
            let mut matches = self.matches.lock().await;
            match matches.get_mut(&match_id) {
                Some(record) => record.timer = Some(timer.abort_handle()),
                // Cancelled in the window between insert and now
                None => timer.abort(),
            }
        }

        info!(
            match_id = %match_id,
            location_id = %location_id,
            side_a = %id_a,
            side_b = %id_b,
            deadline = %deadline,
            "Match created"
        );

        self.registry.deliver(&id_a, &found_for_a).await;
        self.registry.deliver(&id_b, &found_for_b).await;
    }

    /// Records a participant's decision.
    ///
    /// An unknown match or a sender that is not one of the two participants
    /// gets an error event; neither disturbs the match for anyone else.
    /// Resubmission is allowed until finalization; the last write wins.
    pub async fn submit_choice(&self, connection_id: &str, match_id: &str, decision: Decision) {
        let reply = {
            let mut matches = self.matches.lock().await;
            match matches.get_mut(match_id) {
                None => WebSocketMessage::error(format!("Unknown match: {match_id}")),
                Some(record) => match record.side_of(connection_id) {
                    None => {
                        WebSocketMessage::error("Not a participant in this match".to_string())
                    }
                    Some(side) => {
                        record.participant_mut(side).decision = Some(decision);
                        debug!(
                            match_id = %match_id,
                            connection_id = %connection_id,
                            side = ?side,
                            decision = ?decision,
                            "Decision recorded"
                        );
                        WebSocketMessage::choice_recorded(match_id)
                    }
                },
            }
        };

        self.registry.deliver(connection_id, &reply).await;
        self.finalize_check(match_id).await;
    }

    /// Attempts to finalize the match. Idempotent and safe to call from a
    /// submission and the deadline timer alike: a missing or finished
    /// match is a silent no-op.
    ///
    /// Each side independently uses its recorded decision, or defaults to
    /// steal once the deadline has passed. With one side still undecided
    /// inside the window, the match keeps waiting.
    pub async fn finalize_check(&self, match_id: &str) {
        let (record, decision_a, decision_b) = {
            let mut matches = self.matches.lock().await;
            let Some(record) = matches.get_mut(match_id) else {
                return;
            };
            if record.finished {
                return;
            }

            let default = if Utc::now() > record.deadline {
                Some(Decision::Steal)
            } else {
                None
            };
            let decided = (
                record.participants[0].decision.or(default),
                record.participants[1].decision.or(default),
            );
            let (Some(decision_a), Some(decision_b)) = decided else {
                return; // wait for the next submission or the timer
            };

            record.finished = true;
            if let Some(timer) = record.timer.take() {
                timer.abort();
            }

            let record = matches
                .remove(match_id)
                .expect("record is present under the same lock");
            (record, decision_a, decision_b)
        };

        let outcome = outcome::resolve(decision_a, decision_b);
        info!(
            match_id = %match_id,
            category = ?outcome.category,
            "Match finalized"
        );

        let [side_a, side_b] = &record.participants;
        self.registry
            .deliver(
                &side_a.connection_id,
                &WebSocketMessage::result(match_id, decision_a, decision_b, outcome.prize_a),
            )
            .await;
        self.registry
            .deliver(
                &side_b.connection_id,
                &WebSocketMessage::result(match_id, decision_b, decision_a, outcome.prize_b),
            )
            .await;

        // Best-effort: the daily-play ledger must never undo a round that
        // already produced a valid result.
        for participant in &record.participants {
            if let Err(e) = self.gate.record_played(&participant.connection_id).await {
                warn!(
                    connection_id = %participant.connection_id,
                    error = %e,
                    "Failed to record play for today"
                );
            }
        }
    }

    /// Handles an abrupt transport loss: sweeps the connection out of every
    /// queue, and cancels its active match (a connection participates in at
    /// most one). The survivor is notified and re-admitted to its
    /// location's queue; no outcome is computed.
    pub async fn handle_disconnect(&self, connection_id: &str) {
        self.queues.remove_everywhere(connection_id).await;

        let cancelled = {
            let mut matches = self.matches.lock().await;
            let match_id = matches.iter().find_map(|(id, record)| {
                (!record.finished && record.side_of(connection_id).is_some())
                    .then(|| id.clone())
            });
            match_id.map(|id| {
                let mut record = matches
                    .remove(&id)
                    .expect("record is present under the same lock");
                if let Some(timer) = record.timer.take() {
                    timer.abort();
                }
                record
            })
        };

        let Some(record) = cancelled else {
            return;
        };
        info!(
            match_id = %record.id,
            connection_id = %connection_id,
            "Match cancelled, participant disconnected"
        );

        let side = record
            .side_of(connection_id)
            .expect("record was selected on this participant");
        let survivor = record.participant(side.other());

        // A survivor that dropped in the same instant is skipped; its own
        // disconnect already swept the queues.
        if self.registry.is_live(&survivor.connection_id).await {
            self.registry
                .deliver(
                    &survivor.connection_id,
                    &WebSocketMessage::requeue("Opponent disconnected"),
                )
                .await;
            let position = self
                .queues
                .requeue(&record.location_id, &survivor.connection_id)
                .await;
            debug!(
                connection_id = %survivor.connection_id,
                position,
                "Survivor re-admitted to queue"
            );
        }
    }

    /// Ids of the matches currently in the live set.
    pub async fn active_match_ids(&self) -> Vec<String> {
        self.matches.lock().await.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::InMemoryConnectionRegistry;
    use crate::eligibility::InMemoryEligibilityGate;
    use crate::websockets::messages::ResultPayload;
    use crate::websockets::MessageType;
    use tokio::sync::mpsc;

    struct Harness {
        registry: Arc<InMemoryConnectionRegistry>,
        engine: Arc<MatchEngine>,
        inboxes: HashMap<String, mpsc::UnboundedReceiver<String>>,
    }

    impl Harness {
        fn new() -> Self {
            let registry = Arc::new(InMemoryConnectionRegistry::new());
            let queues = Arc::new(LocationQueues::new(registry.clone()));
            let gate = Arc::new(InMemoryEligibilityGate::new());
            let engine = Arc::new(MatchEngine::new(
                queues,
                registry.clone(),
                gate,
                EngineConfig::default(),
            ));
            Self {
                registry,
                engine,
                inboxes: HashMap::new(),
            }
        }

        async fn connect(&mut self, connection_id: &str) {
            let (tx, rx) = mpsc::unbounded_channel();
            self.registry.register(connection_id.to_string(), tx).await;
            self.inboxes.insert(connection_id.to_string(), rx);
        }

        fn drain(&mut self, connection_id: &str) -> Vec<WebSocketMessage> {
            let rx = self.inboxes.get_mut(connection_id).expect("connected");
            let mut messages = Vec::new();
            while let Ok(raw) = rx.try_recv() {
                messages.push(serde_json::from_str(&raw).expect("valid outbound JSON"));
            }
            messages
        }

        /// Pairs x and y at L1 and returns the match id.
        async fn paired_match(&mut self) -> String {
            self.connect("x").await;
            self.connect("y").await;
            self.engine.join_location("x", "L1", "X").await;
            self.engine.join_location("y", "L1", "Y").await;
            self.drain("y");
            let messages = self.drain("x");
            let found = messages
                .iter()
                .find(|m| m.message_type == MessageType::MatchFound)
                .expect("x got match_found");
            found.payload["matchId"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_submit_to_unknown_match_reports_error_to_sender_only() {
        let mut harness = Harness::new();
        harness.connect("x").await;

        harness
            .engine
            .submit_choice("x", "no-such-match", Decision::Share)
            .await;

        let messages = harness.drain("x");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::Error);
    }

    #[tokio::test]
    async fn test_submit_from_non_participant_reports_error() {
        let mut harness = Harness::new();
        let match_id = harness.paired_match().await;
        harness.connect("z").await;

        harness
            .engine
            .submit_choice("z", &match_id, Decision::Steal)
            .await;

        let messages = harness.drain("z");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message_type, MessageType::Error);
        // The match is untouched
        assert_eq!(harness.engine.active_match_ids().await, vec![match_id]);
    }

    #[tokio::test]
    async fn test_one_decision_does_not_finalize() {
        let mut harness = Harness::new();
        let match_id = harness.paired_match().await;

        harness
            .engine
            .submit_choice("x", &match_id, Decision::Share)
            .await;

        let messages = harness.drain("x");
        assert!(messages
            .iter()
            .any(|m| m.message_type == MessageType::ChoiceRecorded));
        assert!(!messages.iter().any(|m| m.message_type == MessageType::Result));
        assert_eq!(harness.engine.active_match_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_overwrites_until_finalization() {
        let mut harness = Harness::new();
        let match_id = harness.paired_match().await;

        harness
            .engine
            .submit_choice("x", &match_id, Decision::Share)
            .await;
        harness
            .engine
            .submit_choice("x", &match_id, Decision::Steal)
            .await;
        harness
            .engine
            .submit_choice("y", &match_id, Decision::Steal)
            .await;

        let messages = harness.drain("x");
        let result = messages
            .iter()
            .find(|m| m.message_type == MessageType::Result)
            .expect("finalized");
        let payload: ResultPayload = serde_json::from_value(result.payload.clone()).unwrap();
        assert_eq!(payload.your_choice, Decision::Steal);
        assert_eq!(payload.their_choice, Decision::Steal);
        assert_eq!(payload.your_prize_code, None);
        assert!(harness.engine.active_match_ids().await.is_empty());
    }
}
