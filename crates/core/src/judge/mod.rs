//! Real-time judgment of lane presses against a chart.
//!
//! The engine is driven from a single timeline: [`JudgeEngine::tick`] once
//! per frame, and [`JudgeEngine::press`] for every lane press at the clock
//! time the press is applied. Neither call ever fails; presses with nothing
//! to hit are no-ops.

use serde::{Deserialize, Serialize};

use crate::{Chart, HitKind, JudgeConfig, Note, ScoreState, LANE_COUNT, TIME_EPSILON};

/// Outcome of a press that landed inside the hit window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgement {
    pub note_id: usize,
    pub lane: usize,
    pub kind: HitKind,
    /// `press_time - note.time`; negative means early.
    pub offset: f64,
    pub points: u64,
    /// Combo after this hit.
    pub combo: u32,
}

impl Judgement {
    pub fn is_early(&self) -> bool {
        self.offset < 0.0
    }
}

/// What a single tick changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Notes that entered the active set.
    pub activated: usize,
    /// Ids of notes that expired unhit during this tick.
    pub missed: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct JudgeEngine {
    config: JudgeConfig,
    notes: Vec<Note>,
    /// Next chart index not yet moved into `active`.
    next_activation: usize,
    /// Indices into `notes`, kept in chart order.
    active: Vec<usize>,
    resolved: usize,
    score: ScoreState,
}

impl JudgeEngine {
    /// Takes a private copy of the chart with every note pending again;
    /// judgment never touches the caller's chart.
    pub fn new(chart: &Chart, config: JudgeConfig) -> Self {
        let notes = chart
            .notes()
            .iter()
            .map(|note| Note::new(note.id, note.time, note.lane))
            .collect();
        Self {
            config,
            notes,
            next_activation: 0,
            active: Vec::new(),
            resolved: 0,
            score: ScoreState::new(),
        }
    }

    /// Activation followed by miss detection at `now`.
    pub fn tick(&mut self, now: f64) -> TickReport {
        let activated = self.activate(now);
        let missed = self.expire(now);
        TickReport { activated, missed }
    }

    /// Judges a press in `lane` at `now` against the earliest pending active
    /// note in that lane.
    ///
    /// Activation and expiry are settled at `now` first, so the outcome only
    /// depends on the press time and never on when the last tick ran.
    pub fn press(&mut self, lane: usize, now: f64) -> Option<Judgement> {
        if lane >= LANE_COUNT {
            tracing::trace!(lane, "ignoring press on unknown lane");
            return None;
        }
        self.activate(now);
        self.expire(now);

        let position = self.active.iter().position(|&index| {
            let note = &self.notes[index];
            note.lane == lane && note.is_pending()
        })?;
        let index = self.active[position];

        let offset = now - self.notes[index].time;
        let kind = self.classify(offset.abs())?;
        let base_points = match kind {
            HitKind::Perfect => self.config.perfect_points,
            HitKind::Good => self.config.good_points,
        };

        let note = &mut self.notes[index];
        note.hit = true;
        let note_id = note.id;
        self.active.remove(position);
        self.resolved += 1;
        let points = self.score.register_hit(kind, base_points);

        Some(Judgement {
            note_id,
            lane,
            kind,
            offset,
            points,
            combo: self.score.combo,
        })
    }

    fn classify(&self, delta: f64) -> Option<HitKind> {
        if delta <= self.config.perfect_window + TIME_EPSILON {
            Some(HitKind::Perfect)
        } else if delta <= self.config.good_window + TIME_EPSILON {
            Some(HitKind::Good)
        } else {
            None
        }
    }

    fn activate(&mut self, now: f64) -> usize {
        let start = self.next_activation;
        while let Some(note) = self.notes.get(self.next_activation) {
            if note.time - now >= self.config.lookahead {
                break;
            }
            self.active.push(self.next_activation);
            self.next_activation += 1;
        }
        self.next_activation - start
    }

    fn expire(&mut self, now: f64) -> Vec<usize> {
        let mut missed = Vec::new();
        for &index in &self.active {
            let note = &mut self.notes[index];
            if note.is_pending() && now - note.time > self.config.good_window + TIME_EPSILON {
                note.missed = true;
                missed.push(note.id);
                self.score.register_miss();
                self.resolved += 1;
            }
        }

        let retention = self.config.retention();
        let notes = &self.notes;
        self.active.retain(|&index| {
            let note = &notes[index];
            !note.hit && !(note.missed && now - note.time > retention)
        });
        missed
    }

    /// Active notes in time order, including recently missed ones still
    /// kept for drawing.
    pub fn active_notes(&self) -> impl Iterator<Item = &Note> + '_ {
        self.active.iter().map(|&index| &self.notes[index])
    }

    /// The engine's working copy of the chart with current hit/miss flags.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Every note is either hit or missed.
    pub fn is_complete(&self) -> bool {
        self.resolved == self.notes.len()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn chart(notes: &[(f64, usize)]) -> Chart {
        let notes = notes
            .iter()
            .enumerate()
            .map(|(id, &(time, lane))| Note::new(id, time, lane))
            .collect();
        Chart::new(notes, 60.0).unwrap()
    }

    fn engine(notes: &[(f64, usize)]) -> JudgeEngine {
        JudgeEngine::new(&chart(notes), JudgeConfig::default())
    }

    #[test]
    fn activation_respects_lookahead() {
        let mut engine = engine(&[(1.0, 0), (2.5, 1), (4.0, 2)]);

        assert_eq!(engine.tick(0.0).activated, 1);
        assert_eq!(engine.tick(0.6).activated, 1);
        assert_eq!(engine.active_notes().count(), 2);
        assert_eq!(engine.tick(2.0).activated, 0);
        assert_eq!(engine.tick(2.01).activated, 1);
    }

    #[test]
    fn press_classifies_by_distance() {
        for (press, expected) in [
            (10.04, Some(HitKind::Perfect)),
            (9.96, Some(HitKind::Perfect)),
            (10.10, Some(HitKind::Good)),
            (9.90, Some(HitKind::Good)),
            (10.20, None),
            (9.80, None),
        ] {
            let mut engine = engine(&[(10.0, 2)]);
            engine.tick(9.0);
            let judged = engine.press(2, press).map(|j| j.kind);
            assert_eq!(judged, expected, "press at {press}");
        }
    }

    #[test]
    fn window_edges_are_inclusive() {
        for (press, expected) in [
            (1.05, HitKind::Perfect),
            (0.95, HitKind::Perfect),
            (1.12, HitKind::Good),
            (0.88, HitKind::Good),
        ] {
            let mut engine = engine(&[(1.0, 0)]);
            engine.tick(press);
            assert!(engine.notes()[0].is_pending(), "expired at {press}");
            let judged = engine.press(0, press).map(|j| j.kind);
            assert_eq!(judged, Some(expected), "press at {press}");
        }
    }

    #[test]
    fn note_is_not_missed_on_the_good_window_edge() {
        let mut engine = engine(&[(1.0, 0)]);
        assert!(engine.tick(1.12).missed.is_empty());
        assert_eq!(engine.tick(1.13).missed, vec![0]);
    }

    #[test]
    fn resolved_flags_in_loaded_chart_are_reset() {
        let chart = Chart::from_json(
            r#"{
                "notes": [
                    { "id": 0, "time": 1.0, "lane": 0, "hit": true },
                    { "id": 1, "time": 2.0, "lane": 1, "missed": true }
                ],
                "duration": 3.0
            }"#,
        )
        .unwrap();
        let mut engine = JudgeEngine::new(&chart, JudgeConfig::default());
        assert!(engine.notes().iter().all(Note::is_pending));

        assert!(engine.press(0, 1.0).is_some());
        engine.tick(5.0);
        assert_eq!(engine.score().judged(), 2);
        assert_eq!(engine.score().miss, 1);
        assert!(engine.is_complete());
        assert!(chart.notes()[0].hit);
    }

    #[test]
    fn press_outside_window_leaves_note_to_expire() {
        let mut engine = engine(&[(10.0, 2)]);
        engine.tick(9.0);
        assert!(engine.press(2, 9.8).is_none());
        assert!(engine.notes()[0].is_pending());

        assert!(engine.tick(10.1).missed.is_empty());
        assert_eq!(engine.tick(10.121).missed, vec![0]);
        assert!(engine.notes()[0].missed);
        assert_eq!(engine.score().miss, 1);
        assert!(engine.is_complete());

        // Late press on an already missed note does nothing.
        assert!(engine.press(2, 10.13).is_none());
    }

    #[test]
    fn later_press_can_still_hit_after_early_whiff() {
        let mut engine = engine(&[(5.0, 1)]);
        engine.tick(4.0);
        assert!(engine.press(1, 4.7).is_none());
        let judgement = engine.press(1, 5.01).unwrap();
        assert_eq!(judgement.kind, HitKind::Perfect);
        assert!(!judgement.is_early());
    }

    #[test]
    fn lanes_are_judged_independently() {
        let mut engine = engine(&[(1.0, 0), (1.0, 3)]);
        engine.tick(0.5);

        assert!(engine.press(1, 1.0).is_none());
        let hit = engine.press(3, 1.0).unwrap();
        assert_eq!(hit.note_id, 1);
        assert!(engine.notes()[0].is_pending());
        assert!(engine.notes()[1].hit);
    }

    #[test]
    fn earliest_pending_note_in_lane_is_judged_first() {
        let mut engine = engine(&[(1.0, 0), (1.2, 0)]);
        engine.tick(0.0);
        let first = engine.press(0, 1.1).unwrap();
        assert_eq!(first.note_id, 0);
        assert_eq!(first.kind, HitKind::Good);
        let second = engine.press(0, 1.2).unwrap();
        assert_eq!(second.note_id, 1);
        assert_eq!(second.kind, HitKind::Perfect);
    }

    #[test]
    fn press_before_first_tick_is_judged() {
        let mut engine = engine(&[(0.5, 0)]);
        assert_eq!(engine.press(0, 0.5).map(|j| j.kind), Some(HitKind::Perfect));
    }

    #[test]
    fn overdue_note_is_missed_before_next_note_is_judged() {
        let notes = [(1.0, 0), (1.2, 0)];

        let mut late_tick = engine(&notes);
        late_tick.tick(1.1);
        let hit = late_tick.press(0, 1.13).unwrap();
        assert_eq!(hit.note_id, 1);
        assert_eq!(hit.combo, 1);

        let mut exact_tick = engine(&notes);
        exact_tick.tick(1.13);
        exact_tick.press(0, 1.13).unwrap();

        assert_eq!(late_tick.score(), exact_tick.score());
        assert_eq!(late_tick.score().miss, 1);
    }

    #[test]
    fn unknown_lane_is_ignored() {
        let mut engine = engine(&[(0.5, 0)]);
        assert!(engine.press(4, 0.5).is_none());
        assert!(engine.press(usize::MAX, 0.5).is_none());
        assert_eq!(engine.score(), &ScoreState::new());
    }

    #[test]
    fn hit_notes_leave_active_set_and_missed_linger() {
        let mut engine = engine(&[(1.0, 0), (1.0, 1)]);
        engine.tick(0.5);
        engine.press(0, 1.0).unwrap();
        assert_eq!(engine.active_notes().count(), 1);

        engine.tick(1.2);
        assert_eq!(engine.active_notes().count(), 1);
        assert!(engine.active_notes().all(|note| note.missed));

        engine.tick(1.3);
        assert_eq!(engine.active_notes().count(), 0);
    }

    #[test]
    fn combo_counts_consecutive_hits_and_resets_on_miss() {
        let notes: Vec<(f64, usize)> = (0..12).map(|i| (1.0 + i as f64 * 0.5, i % 4)).collect();
        let mut engine = engine(&notes);

        for (time, lane) in notes.iter().take(11).copied() {
            engine.tick(time - 0.01);
            engine.press(lane, time).unwrap();
        }
        assert_eq!(engine.score().combo, 11);
        assert_eq!(engine.score().max_combo, 11);
        assert_eq!(engine.score().score, 10 * 100 + 200);

        engine.tick(7.0);
        assert_eq!(engine.score().combo, 0);
        assert_eq!(engine.score().max_combo, 11);
        assert_eq!(engine.score().miss, 1);
    }

    proptest! {
        #[test]
        fn identical_input_yields_identical_score(
            presses in proptest::collection::vec((0.0_f64..20.0, 0usize..5), 0..60),
        ) {
            let notes: Vec<(f64, usize)> = (0..40).map(|i| (0.5 * i as f64, (i * 7) % 4)).collect();
            let mut presses = presses;
            presses.sort_by(|a, b| a.0.total_cmp(&b.0));

            let run = || {
                let mut engine = engine(&notes);
                for &(time, lane) in &presses {
                    engine.tick(time);
                    engine.press(lane, time);
                }
                engine.tick(25.0);
                engine.score().clone()
            };

            let first = run();
            prop_assert_eq!(&first, &run());
            prop_assert_eq!(first.judged() as usize, notes.len());
        }
    }
}
