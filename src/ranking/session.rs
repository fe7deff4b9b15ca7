use chrono::Utc;
use rand::Rng;

use crate::ranking::cycle::{self, CycleEvaluation, CycleInput};
use crate::ranking::eligibility::resolve_eligible_items;
use crate::ranking::error::RankingError;
use crate::ranking::pair_selector::PairSelector;
use crate::ranking::settings::StudySettings;
use crate::ranking::types::{
    unordered, ComparisonId, CycleStatus, DecisionPayload, DecisionState, ItemId, ParticipantId,
    PresentRequest, PresentedPair, Presentation, PriorDecision, SessionState, Submission,
    ThankYouStatus, UiFlags,
};
use crate::ranking::weighting::item_weights;
use crate::store::operations::comparisons::{Comparison, ComparisonState, ComparisonUpdate};
use crate::store::operations::study::Item;
use crate::store::Store;

/// Drives one participant through a study: what to show next and how a
/// submitted judgment is stored.
pub struct RankingSession<'a, R: Rng> {
    store: &'a Store,
    settings: &'a StudySettings,
    rng: &'a mut R,
}

impl<'a, R: Rng> RankingSession<'a, R> {
    pub fn new(store: &'a Store, settings: &'a StudySettings, rng: &'a mut R) -> Self {
        Self {
            store,
            settings,
            rng,
        }
    }

    pub fn present(
        &mut self,
        session: &SessionState,
        request: PresentRequest,
    ) -> Result<Presentation, RankingError> {
        let participant_id = session.participant_id;
        let ui_flags = self.ui_flags(session);

        // Replays of stored judgments are always allowed.
        if let Some(comparison_id) = request.comparison_id {
            let comparison = self.owned_comparison(participant_id, comparison_id)?;
            return self.replay(comparison, ui_flags);
        }

        let eligible = resolve_eligible_items(
            self.store,
            participant_id,
            session.weight_conf,
            self.settings,
        )?;

        let evaluation = self.apply_pending_cycle(participant_id)?;
        if evaluation.status != CycleStatus::Continue {
            tracing::info!(
                participant_id,
                status = ?evaluation.status,
                completed_cycles = evaluation.completed_cycles,
                "No further pair offered"
            );
            return Ok(Presentation {
                status: evaluation.status,
                pair: None,
                comparison_id: None,
                prior_decision: None,
                ui_flags,
            });
        }

        if let Some(comparison_id) = session.previous_comparison_id {
            let comparison = self.owned_comparison(participant_id, comparison_id)?;
            return self.replay(comparison, ui_flags);
        }

        let weights = item_weights(session.weight_conf, &eligible, self.settings)?;
        let history = self.store.list_participant_comparisons(participant_id)?;
        let pair = PairSelector::new(&mut *self.rng).next_pair(
            &eligible,
            &weights,
            &history,
            self.settings,
        )?;

        let (Some(item_1), Some(item_2)) = (
            eligible.get(pair.item_1_id).cloned(),
            eligible.get(pair.item_2_id).cloned(),
        ) else {
            return Err(RankingError::NotFound {
                entity: "item",
                id: pair.item_1_id,
            });
        };

        Ok(Presentation {
            status: CycleStatus::Continue,
            pair: Some(PresentedPair { item_1, item_2 }),
            comparison_id: None,
            prior_decision: None,
            ui_flags,
        })
    }

    pub fn submit(
        &mut self,
        mut session: SessionState,
        payload: DecisionPayload,
    ) -> Result<Submission, RankingError> {
        let participant_id = session.participant_id;

        if payload.state == DecisionState::Rejudged && payload.selected_item_id.is_none() {
            let Some(comparison_id) = payload.comparison_id else {
                return Err(RankingError::InvalidDecision(
                    "a rejudge needs a comparison id".to_string(),
                ));
            };
            self.owned_comparison(participant_id, comparison_id)?;
            let (evaluation, _) = self.cycle_evaluation(participant_id)?;
            return Ok(Submission {
                session,
                status: evaluation.status,
                comparison_id: None,
                redirect_comparison_id: Some(comparison_id),
            });
        }

        if let Some(comparison_id) = payload.comparison_id {
            return self.rejudge(session, comparison_id, &payload);
        }

        if payload.state == DecisionState::Rejudged {
            return Err(RankingError::InvalidDecision(
                "a rejudge needs a comparison id".to_string(),
            ));
        }

        let (Some(item_1_id), Some(item_2_id)) = (payload.item_1_id, payload.item_2_id) else {
            return Err(RankingError::InvalidDecision(
                "both item ids are required".to_string(),
            ));
        };
        if item_1_id == item_2_id {
            return Err(RankingError::InvalidDecision(
                "a pair needs two different items".to_string(),
            ));
        }
        let eligible = resolve_eligible_items(
            self.store,
            participant_id,
            session.weight_conf,
            self.settings,
        )?;
        if let Some(outsider) = [item_1_id, item_2_id]
            .into_iter()
            .find(|item_id| !eligible.contains(*item_id))
        {
            return Err(RankingError::InvalidDecision(format!(
                "item {} is not eligible for this participant",
                outsider
            )));
        }
        let update = self.decision_update(&payload, (item_1_id, item_2_id))?;

        let (before, stored) = self.cycle_evaluation(participant_id)?;
        if before.status != CycleStatus::Continue {
            tracing::info!(
                participant_id,
                status = ?before.status,
                "Judgment refused outside an open cycle"
            );
            return Ok(Submission {
                session,
                status: before.status,
                comparison_id: None,
                redirect_comparison_id: None,
            });
        }

        let total = self.store.count_participant_comparisons(participant_id)?;
        let after = cycle::evaluate(self.cycle_input(total + 1, before.completed_cycles));
        let completed_cycles = after.advances(stored).then_some(after.completed_cycles);

        let now = Utc::now();
        let comparison = Comparison {
            id: self.store.next_id()?,
            participant_id,
            item_1_id,
            item_2_id,
            selected_item_id: update.selected_item_id,
            state: update.state,
            created_at: now,
            updated_at: now,
        };
        self.store.record_new_comparison(&comparison, completed_cycles)?;

        session.comparison_ids.push(comparison.id);
        session.previous_comparison_id = None;

        tracing::info!(
            participant_id,
            comparison_id = comparison.id,
            state = ?comparison.state,
            status = ?after.status,
            completed_cycles = after.completed_cycles,
            "Comparison recorded"
        );

        Ok(Submission {
            session,
            status: after.status,
            comparison_id: Some(comparison.id),
            redirect_comparison_id: None,
        })
    }

    /// Steps one comparison back along the session trail. At the start of the
    /// trail the session is returned unchanged.
    pub fn navigate_back(&self, mut session: SessionState) -> Result<SessionState, RankingError> {
        if !self.settings.allow_back {
            return Err(RankingError::InvalidDecision(
                "going back is disabled for this study".to_string(),
            ));
        }
        if let Some(target) = back_target(&session) {
            session.previous_comparison_id = Some(target);
        }
        Ok(session)
    }

    /// Escape-route continue: leaves a pending boundary by completing the cycle.
    pub fn continue_cycle(
        &self,
        participant_id: ParticipantId,
    ) -> Result<CycleStatus, RankingError> {
        let (evaluation, stored) = self.cycle_evaluation(participant_id)?;
        let next = cycle::continue_after_boundary(evaluation);
        if next.advances(stored) {
            self.store
                .advance_completed_cycles(participant_id, next.completed_cycles)?;
            tracing::info!(
                participant_id,
                completed_cycles = next.completed_cycles,
                "Participant continued into next cycle"
            );
        }
        Ok(next.status)
    }

    pub fn thank_you_status(
        &self,
        participant_id: ParticipantId,
    ) -> Result<ThankYouStatus, RankingError> {
        let (evaluation, _) = self.cycle_evaluation(participant_id)?;
        let max_cycles = self.settings.max_cycles;
        Ok(ThankYouStatus {
            status: evaluation.status,
            completed_cycles: evaluation.completed_cycles,
            max_cycles,
            can_continue: max_cycles == 0 || evaluation.completed_cycles < max_cycles,
        })
    }

    fn rejudge(
        &self,
        mut session: SessionState,
        comparison_id: ComparisonId,
        payload: &DecisionPayload,
    ) -> Result<Submission, RankingError> {
        let participant_id = session.participant_id;
        let existing = self.owned_comparison(participant_id, comparison_id)?;

        let mismatched = match (payload.item_1_id, payload.item_2_id) {
            (Some(item_1_id), Some(item_2_id)) => unordered(item_1_id, item_2_id) != existing.pair(),
            (Some(item_id), None) | (None, Some(item_id)) => {
                let (low, high) = existing.pair();
                item_id != low && item_id != high
            }
            (None, None) => false,
        };
        if mismatched {
            return Err(RankingError::InvalidDecision(format!(
                "items do not match comparison {}",
                comparison_id
            )));
        }
        let update = self.decision_update(payload, existing.pair())?;
        let updated =
            self.store
                .rejudge_comparison(participant_id, comparison_id, update, None)?;
        session.previous_comparison_id = None;

        let (evaluation, _) = self.cycle_evaluation(participant_id)?;
        tracing::info!(
            participant_id,
            comparison_id,
            state = ?updated.state,
            "Comparison rejudged"
        );

        Ok(Submission {
            session,
            status: evaluation.status,
            comparison_id: Some(updated.id),
            redirect_comparison_id: None,
        })
    }

    fn decision_update(
        &self,
        payload: &DecisionPayload,
        pair: (ItemId, ItemId),
    ) -> Result<ComparisonUpdate, RankingError> {
        match payload.state {
            DecisionState::Confirmed | DecisionState::Rejudged => {
                let Some(selected) = payload.selected_item_id else {
                    return Err(RankingError::InvalidDecision(
                        "a confirmed judgment needs a selected item".to_string(),
                    ));
                };
                if selected != pair.0 && selected != pair.1 {
                    return Err(RankingError::InvalidDecision(format!(
                        "selected item {} is not part of the pair",
                        selected
                    )));
                }
                Ok(ComparisonUpdate {
                    selected_item_id: Some(selected),
                    state: ComparisonState::Selected,
                })
            }
            DecisionState::Skipped if self.settings.allow_skip => Ok(ComparisonUpdate {
                selected_item_id: None,
                state: ComparisonState::Skipped,
            }),
            DecisionState::Skipped => Err(RankingError::InvalidDecision(
                "skipping is disabled for this study".to_string(),
            )),
            DecisionState::Tied if self.settings.allow_ties => Ok(ComparisonUpdate {
                selected_item_id: None,
                state: ComparisonState::Tied,
            }),
            DecisionState::Tied => Err(RankingError::InvalidDecision(
                "ties are disabled for this study".to_string(),
            )),
        }
    }

    fn replay(
        &self,
        comparison: Comparison,
        ui_flags: UiFlags,
    ) -> Result<Presentation, RankingError> {
        let item_1 = self.require_item(comparison.item_1_id)?;
        let item_2 = self.require_item(comparison.item_2_id)?;
        Ok(Presentation {
            status: CycleStatus::Continue,
            pair: Some(PresentedPair { item_1, item_2 }),
            comparison_id: Some(comparison.id),
            prior_decision: Some(PriorDecision {
                selected_item_id: comparison.selected_item_id,
                state: comparison.state,
            }),
            ui_flags,
        })
    }

    fn owned_comparison(
        &self,
        participant_id: ParticipantId,
        comparison_id: ComparisonId,
    ) -> Result<Comparison, RankingError> {
        match self.store.get_comparison(comparison_id)? {
            Some(comparison) if comparison.participant_id == participant_id => Ok(comparison),
            Some(_) => {
                tracing::warn!(
                    participant_id,
                    comparison_id,
                    "Comparison requested by another participant"
                );
                Err(RankingError::NotFound {
                    entity: "comparison",
                    id: comparison_id,
                })
            }
            None => Err(RankingError::NotFound {
                entity: "comparison",
                id: comparison_id,
            }),
        }
    }

    fn require_item(&self, item_id: ItemId) -> Result<Item, RankingError> {
        self.store
            .get_item(item_id)?
            .ok_or(RankingError::NotFound {
                entity: "item",
                id: item_id,
            })
    }

    fn cycle_input(&self, total_comparisons: u64, completed_cycles: u32) -> CycleInput {
        CycleInput {
            total_comparisons,
            completed_cycles,
            cycle_length: self.settings.cycle_length,
            max_cycles: self.settings.max_cycles,
            offer_escape_route: self.settings.offer_escape_route,
        }
    }

    /// Current cycle position without side effects, plus the stored count.
    fn cycle_evaluation(
        &self,
        participant_id: ParticipantId,
    ) -> Result<(CycleEvaluation, u32), RankingError> {
        let participant =
            self.store
                .get_participant(participant_id)?
                .ok_or(RankingError::NotFound {
                    entity: "participant",
                    id: participant_id,
                })?;
        let total = self.store.count_participant_comparisons(participant_id)?;
        let evaluation = cycle::evaluate(self.cycle_input(total, participant.completed_cycles));
        Ok((evaluation, participant.completed_cycles))
    }

    fn apply_pending_cycle(
        &self,
        participant_id: ParticipantId,
    ) -> Result<CycleEvaluation, RankingError> {
        let (evaluation, stored) = self.cycle_evaluation(participant_id)?;
        if evaluation.advances(stored) {
            self.store
                .advance_completed_cycles(participant_id, evaluation.completed_cycles)?;
        }
        Ok(evaluation)
    }

    fn ui_flags(&self, session: &SessionState) -> UiFlags {
        UiFlags {
            allow_skip: self.settings.allow_skip,
            allow_ties: self.settings.allow_ties,
            allow_back: self.settings.allow_back,
            can_go_back: self.settings.allow_back && back_target(session).is_some(),
        }
    }
}

/// Comparison a "previous" request moves to: the one before the replay in
/// progress, or the latest judgment when nothing is being replayed.
fn back_target(session: &SessionState) -> Option<ComparisonId> {
    let trail = &session.comparison_ids;
    match session.previous_comparison_id {
        Some(current) => match trail.iter().position(|id| *id == current) {
            Some(0) => None,
            Some(index) => Some(trail[index - 1]),
            None => trail.last().copied(),
        },
        None => trail.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    use super::*;
    use crate::ranking::eligibility::test_support::{seed_participant, seed_study};
    use crate::ranking::types::WeightConfiguration;

    fn open(name: &str) -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join(name).to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn settings() -> StudySettings {
        StudySettings {
            cycle_length: 5,
            max_cycles: 2,
            offer_escape_route: true,
            render_item_preference_page: false,
            ..StudySettings::default()
        }
    }

    fn setup(name: &str, settings: &StudySettings) -> (tempfile::TempDir, Store, SessionState) {
        let (dir, store) = open(name);
        seed_study(
            &store,
            settings.clone(),
            &[(1, &[1]), (2, &[1]), (3, &[1]), (4, &[2])],
        );
        seed_participant(&store, 1, &[1]);
        (dir, store, SessionState::new(1, vec![1], WeightConfiguration::Equal))
    }

    fn choose_first(
        ranking: &mut RankingSession<'_, StdRng>,
        session: SessionState,
    ) -> Submission {
        let presentation = ranking
            .present(&session, PresentRequest::default())
            .unwrap();
        let pair = presentation.pair.expect("pair offered");
        ranking
            .submit(
                session,
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: Some(pair.item_1.id),
                    item_2_id: Some(pair.item_2.id),
                    selected_item_id: Some(pair.item_1.id),
                    comparison_id: None,
                },
            )
            .unwrap()
    }

    #[test]
    fn offers_a_pair_of_eligible_items() {
        let settings = settings();
        let (_dir, store, session) = setup("s1", &settings);
        let mut rng = StdRng::seed_from_u64(1);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let presentation = ranking
            .present(&session, PresentRequest::default())
            .unwrap();
        assert_eq!(presentation.status, CycleStatus::Continue);
        let pair = presentation.pair.unwrap();
        assert_ne!(pair.item_1.id, pair.item_2.id);
        assert!(pair.item_1.id <= 3 && pair.item_2.id <= 3);
        assert!(!presentation.ui_flags.can_go_back);
    }

    #[test]
    fn cycles_with_escape_route_until_hard_stop() {
        let settings = settings();
        let (_dir, store, mut session) = setup("s2", &settings);
        let mut rng = StdRng::seed_from_u64(2);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        for expected in 1..=5u64 {
            let submission = choose_first(&mut ranking, session);
            session = submission.session;
            let status = if expected == 5 {
                CycleStatus::CycleBoundary
            } else {
                CycleStatus::Continue
            };
            assert_eq!(submission.status, status);
        }
        assert_eq!(store.require_participant(1).unwrap().completed_cycles, 0);

        let presentation = ranking
            .present(&session, PresentRequest::default())
            .unwrap();
        assert_eq!(presentation.status, CycleStatus::CycleBoundary);
        assert!(presentation.pair.is_none());

        // A new judgment at the boundary is refused and nothing is written.
        let refused = ranking
            .submit(
                session.clone(),
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: Some(1),
                    item_2_id: Some(2),
                    selected_item_id: Some(1),
                    comparison_id: None,
                },
            )
            .unwrap();
        assert_eq!(refused.status, CycleStatus::CycleBoundary);
        assert!(refused.comparison_id.is_none());
        assert_eq!(store.count_participant_comparisons(1).unwrap(), 5);

        let thank_you = ranking.thank_you_status(1).unwrap();
        assert!(thank_you.can_continue);

        assert_eq!(ranking.continue_cycle(1).unwrap(), CycleStatus::Continue);
        assert_eq!(store.require_participant(1).unwrap().completed_cycles, 1);

        for expected in 6..=10u64 {
            let submission = choose_first(&mut ranking, session);
            session = submission.session;
            if expected == 10 {
                assert_eq!(submission.status, CycleStatus::HardStop);
            }
        }
        assert_eq!(store.require_participant(1).unwrap().completed_cycles, 2);
        assert_eq!(session.comparison_ids.len(), 10);

        let presentation = ranking
            .present(&session, PresentRequest::default())
            .unwrap();
        assert_eq!(presentation.status, CycleStatus::HardStop);
        let thank_you = ranking.thank_you_status(1).unwrap();
        assert!(!thank_you.can_continue);
        assert_eq!(thank_you.completed_cycles, 2);
    }

    #[test]
    fn rejudge_updates_without_new_rows() {
        let settings = settings();
        let (_dir, store, session) = setup("s3", &settings);
        let mut rng = StdRng::seed_from_u64(3);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let first = choose_first(&mut ranking, session);
        let comparison_id = first.comparison_id.unwrap();
        let stored = store.get_comparison(comparison_id).unwrap().unwrap();
        let other = if stored.selected_item_id == Some(stored.item_1_id) {
            stored.item_2_id
        } else {
            stored.item_1_id
        };

        let payload = DecisionPayload {
            state: DecisionState::Confirmed,
            item_1_id: Some(stored.item_2_id),
            item_2_id: Some(stored.item_1_id),
            selected_item_id: Some(other),
            comparison_id: Some(comparison_id),
        };
        let mut session = first.session;
        for _ in 0..2 {
            session = ranking.submit(session, payload.clone()).unwrap().session;
        }

        let all = store.list_participant_comparisons(1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].selected_item_id, Some(other));
        assert_eq!(all[0].pair(), stored.pair());
        assert_eq!(session.comparison_ids, vec![comparison_id]);
    }

    #[test]
    fn foreign_comparison_is_not_found() {
        let settings = settings();
        let (_dir, store, session) = setup("s4", &settings);
        seed_participant(&store, 2, &[1]);
        let mut rng = StdRng::seed_from_u64(4);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let theirs = choose_first(
            &mut ranking,
            SessionState::new(2, vec![1], WeightConfiguration::Equal),
        );
        let comparison_id = theirs.comparison_id.unwrap();
        let before = store.get_comparison(comparison_id).unwrap().unwrap();

        let err = ranking
            .submit(
                session.clone(),
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: None,
                    item_2_id: None,
                    selected_item_id: Some(before.item_2_id),
                    comparison_id: Some(comparison_id),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RankingError::NotFound { entity: "comparison", .. }));

        let err = ranking
            .present(
                &session,
                PresentRequest {
                    comparison_id: Some(comparison_id),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RankingError::NotFound { .. }));
        assert_eq!(store.get_comparison(comparison_id).unwrap().unwrap(), before);
    }

    #[test]
    fn single_eligible_item_is_insufficient() {
        let settings = settings();
        let (_dir, store) = open("s5");
        seed_study(&store, settings.clone(), &[(1, &[1]), (2, &[2])]);
        seed_participant(&store, 1, &[1]);
        let mut rng = StdRng::seed_from_u64(5);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let err = ranking
            .present(
                &SessionState::new(1, vec![1], WeightConfiguration::Equal),
                PresentRequest::default(),
            )
            .unwrap_err();
        assert!(matches!(err, RankingError::InsufficientItems { available: 1 }));
    }

    #[test]
    fn rejudged_without_selection_only_redirects() {
        let settings = settings();
        let (_dir, store, session) = setup("s6", &settings);
        let mut rng = StdRng::seed_from_u64(6);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let first = choose_first(&mut ranking, session);
        let comparison_id = first.comparison_id.unwrap();
        let before = store.get_comparison(comparison_id).unwrap().unwrap();

        let submission = ranking
            .submit(
                first.session,
                DecisionPayload {
                    state: DecisionState::Rejudged,
                    item_1_id: None,
                    item_2_id: None,
                    selected_item_id: None,
                    comparison_id: Some(comparison_id),
                },
            )
            .unwrap();
        assert_eq!(submission.redirect_comparison_id, Some(comparison_id));
        assert!(submission.comparison_id.is_none());
        assert_eq!(store.get_comparison(comparison_id).unwrap().unwrap(), before);
    }

    #[test]
    fn rejudge_with_other_items_is_rejected() {
        let settings = settings();
        let (_dir, store, session) = setup("s7", &settings);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let first = choose_first(&mut ranking, session);
        let comparison_id = first.comparison_id.unwrap();
        let stored = store.get_comparison(comparison_id).unwrap().unwrap();
        let outsider = (1..=3)
            .find(|id| *id != stored.item_1_id && *id != stored.item_2_id)
            .unwrap();

        let err = ranking
            .submit(
                first.session,
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: Some(stored.item_1_id),
                    item_2_id: Some(outsider),
                    selected_item_id: Some(stored.item_1_id),
                    comparison_id: Some(comparison_id),
                },
            )
            .unwrap_err();
        assert!(matches!(err, RankingError::InvalidDecision(_)));
    }

    #[test]
    fn rejudge_with_a_single_outside_item_is_rejected() {
        let settings = settings();
        let (_dir, store, session) = setup("s7b", &settings);
        let mut rng = StdRng::seed_from_u64(7);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let first = choose_first(&mut ranking, session);
        let comparison_id = first.comparison_id.unwrap();
        let stored = store.get_comparison(comparison_id).unwrap().unwrap();
        let outsider = (1..=3)
            .find(|id| *id != stored.item_1_id && *id != stored.item_2_id)
            .unwrap();

        for (item_1_id, item_2_id) in [(Some(outsider), None), (None, Some(outsider))] {
            let err = ranking
                .submit(
                    first.session.clone(),
                    DecisionPayload {
                        state: DecisionState::Confirmed,
                        item_1_id,
                        item_2_id,
                        selected_item_id: Some(stored.item_1_id),
                        comparison_id: Some(comparison_id),
                    },
                )
                .unwrap_err();
            assert!(matches!(err, RankingError::InvalidDecision(_)));
        }
        assert_eq!(store.get_comparison(comparison_id).unwrap().unwrap(), stored);

        // One id from the stored pair is enough.
        let accepted = ranking
            .submit(
                first.session,
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: Some(stored.item_2_id),
                    item_2_id: None,
                    selected_item_id: Some(stored.item_2_id),
                    comparison_id: Some(comparison_id),
                },
            )
            .unwrap();
        assert_eq!(accepted.comparison_id, Some(comparison_id));
        assert_eq!(
            store.get_comparison(comparison_id).unwrap().unwrap().selected_item_id,
            Some(stored.item_2_id)
        );
    }

    #[test]
    fn disabled_skip_and_ties_are_rejected() {
        let settings = StudySettings {
            allow_skip: false,
            allow_ties: false,
            ..settings()
        };
        let (_dir, store, session) = setup("s8", &settings);
        let mut rng = StdRng::seed_from_u64(8);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        for state in [DecisionState::Skipped, DecisionState::Tied] {
            let err = ranking
                .submit(
                    session.clone(),
                    DecisionPayload {
                        state,
                        item_1_id: Some(1),
                        item_2_id: Some(2),
                        selected_item_id: None,
                        comparison_id: None,
                    },
                )
                .unwrap_err();
            assert!(matches!(err, RankingError::InvalidDecision(_)));
        }
        assert_eq!(store.count_participant_comparisons(1).unwrap(), 0);
    }

    #[test]
    fn skipped_and_tied_judgments_count_toward_the_cycle() {
        let settings = StudySettings {
            allow_ties: true,
            cycle_length: 2,
            max_cycles: 0,
            offer_escape_route: false,
            ..settings()
        };
        let (_dir, store, session) = setup("s9", &settings);
        let mut rng = StdRng::seed_from_u64(9);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let skipped = ranking
            .submit(
                session,
                DecisionPayload {
                    state: DecisionState::Skipped,
                    item_1_id: Some(1),
                    item_2_id: Some(2),
                    selected_item_id: None,
                    comparison_id: None,
                },
            )
            .unwrap();
        let tied = ranking
            .submit(
                skipped.session,
                DecisionPayload {
                    state: DecisionState::Tied,
                    item_1_id: Some(2),
                    item_2_id: Some(3),
                    selected_item_id: None,
                    comparison_id: None,
                },
            )
            .unwrap();

        assert_eq!(tied.status, CycleStatus::Continue);
        assert_eq!(store.require_participant(1).unwrap().completed_cycles, 1);
        let stored = store
            .get_comparison(tied.comparison_id.unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.state, ComparisonState::Tied);
        assert!(stored.selected_item_id.is_none());
    }

    #[test]
    fn ineligible_items_are_rejected_on_insert() {
        let settings = settings();
        let (_dir, store, session) = setup("s10", &settings);
        let mut rng = StdRng::seed_from_u64(10);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        let err = ranking
            .submit(
                session,
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: Some(1),
                    item_2_id: Some(4),
                    selected_item_id: Some(4),
                    comparison_id: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, RankingError::InvalidDecision(_)));
    }

    #[test]
    fn back_navigation_replays_earlier_judgments() {
        let settings = settings();
        let (_dir, store, mut session) = setup("s11", &settings);
        let mut rng = StdRng::seed_from_u64(11);
        let mut ranking = RankingSession::new(&store, &settings, &mut rng);

        for _ in 0..3 {
            session = choose_first(&mut ranking, session).session;
        }
        let trail = session.comparison_ids.clone();

        session = ranking.navigate_back(session).unwrap();
        assert_eq!(session.previous_comparison_id, Some(trail[2]));
        session = ranking.navigate_back(session).unwrap();
        assert_eq!(session.previous_comparison_id, Some(trail[1]));

        let presentation = ranking
            .present(&session, PresentRequest::default())
            .unwrap();
        assert_eq!(presentation.comparison_id, Some(trail[1]));
        assert!(presentation.prior_decision.is_some());
        assert!(presentation.ui_flags.can_go_back);

        session = ranking.navigate_back(session).unwrap();
        session = ranking.navigate_back(session).unwrap();
        assert_eq!(session.previous_comparison_id, Some(trail[0]));

        let stored = store.get_comparison(trail[0]).unwrap().unwrap();
        let submission = ranking
            .submit(
                session,
                DecisionPayload {
                    state: DecisionState::Confirmed,
                    item_1_id: Some(stored.item_1_id),
                    item_2_id: Some(stored.item_2_id),
                    selected_item_id: Some(stored.item_2_id),
                    comparison_id: Some(trail[0]),
                },
            )
            .unwrap();
        assert!(submission.session.previous_comparison_id.is_none());
        assert_eq!(store.count_participant_comparisons(1).unwrap(), 3);
    }

    #[test]
    fn back_navigation_can_be_disabled() {
        let settings = StudySettings {
            allow_back: false,
            ..settings()
        };
        let (_dir, store, session) = setup("s12", &settings);
        let mut rng = StdRng::seed_from_u64(12);
        let ranking = RankingSession::new(&store, &settings, &mut rng);

        let err = ranking.navigate_back(session).unwrap_err();
        assert!(matches!(err, RankingError::InvalidDecision(_)));
    }
}
