use anyhow::Result;
use qbank_core::config::EngineSettings;
use qbank_core::traits::SubmitSink;
use qbank_core::{Aggregate, Error, FetchError, FilterChain, Identifier, Item, Page, SavedSelection, SelectionSnapshot};
use qbank_engine::{EngineState, Outcome, SelectionEngine, SubmitIssue};

fn q(id: &str, marks: f64) -> Item { Item::new(id).with_weight(marks) }

fn ids(items: &[&Item]) -> Vec<Identifier> { items.iter().map(|i| i.id.clone()).collect() }

fn engine() -> SelectionEngine { SelectionEngine::new(FilterChain::exam_subject_topic(), 2) }

#[derive(Default)]
struct RecordingSink(Vec<SelectionSnapshot>);

impl SubmitSink for RecordingSink {
    fn submit(&mut self, snapshot: &SelectionSnapshot) -> Result<()> {
        self.0.push(snapshot.clone());
        Ok(())
    }
}

#[test]
fn scenario_filter_load_toggle_more_and_reset() {
    let mut e = engine();
    assert!(e.set_filter(0, Some("E1".into())).expect("exam").is_none());
    assert!(e.set_filter(1, Some("S1".into())).expect("subject").is_none());
    assert!(!e.chain().is_resolved());
    assert_eq!(e.state(), &EngineState::Idle);

    let t1 = e.set_filter(2, Some("T1".into())).expect("topic").expect("page 1 ticket");
    assert_eq!(t1.page, 1);
    assert_eq!(e.state(), &EngineState::Loading { page: 1 });
    let (q1, q2, q3) = (q("q1", 2.0), q("q2", 3.0), q("q3", 4.0));
    assert_eq!(e.apply(&t1, Ok(Page::new(vec![q1.clone(), q2.clone()], 1, 2))), Outcome::Applied { added: 2 });
    assert_eq!(ids(&e.bank()), vec![Identifier::from("q1"), Identifier::from("q2")]);

    e.toggle(q1.clone()).expect("toggle q1");
    assert_eq!(e.aggregate(), Aggregate { count: 1, total_weight: 2.0 });

    let t2 = e.load_more().expect("page 2 ticket");
    assert_eq!(t2.page, 2);
    assert_eq!(e.apply(&t2, Ok(Page::new(vec![q2, q3], 2, 2))), Outcome::Applied { added: 1 });
    let pool: Vec<Identifier> = e.pool().items().map(|i| i.id.clone()).collect();
    assert_eq!(pool, vec![Identifier::from("q1"), Identifier::from("q2"), Identifier::from("q3")]);
    assert!(!e.has_more());
    assert!(e.load_more().is_none());

    let t3 = e.set_filter(1, Some("S2".into())).expect("subject change");
    assert!(t3.is_none(), "topic was cleared, chain unresolved");
    assert!(e.pool().is_empty());
    assert_eq!(e.aggregate(), Aggregate { count: 0, total_weight: 0.0 });
    assert_eq!(e.state(), &EngineState::Idle);
}

#[test]
fn stale_response_does_not_touch_state() {
    let mut e = engine();
    let old = e.seed(SavedSelection { filter_values: vec!["E1".into(), "SA".into(), "T1".into()], items: vec![] })
        .expect("seed")
        .expect("ticket A");
    assert!(e.set_filter(1, Some("SB".into())).expect("subject").is_none());
    let new = e.set_filter(2, Some("T1".into())).expect("topic").expect("ticket B");
    assert_ne!(old.signature, new.signature);

    assert_eq!(e.apply(&old, Ok(Page::new(vec![q("a1", 1.0)], 1, 1))), Outcome::Discarded);
    assert!(e.pool().is_empty());
    assert_eq!(e.state(), &EngineState::Loading { page: 1 });

    assert_eq!(e.apply(&old, Err(FetchError::Network("late".into()))), Outcome::Discarded);
    assert_eq!(e.state(), &EngineState::Loading { page: 1 });

    assert_eq!(e.apply(&new, Ok(Page::new(vec![q("b1", 1.0)], 1, 1))), Outcome::Applied { added: 1 });
    assert_eq!(ids(&e.bank()), vec![Identifier::from("b1")]);
    // The same ticket cannot be applied twice.
    assert_eq!(e.apply(&new, Ok(Page::new(vec![q("b2", 1.0)], 1, 1))), Outcome::Discarded);
}

#[test]
fn filter_change_during_load_more_drops_the_late_page() {
    let mut e = engine();
    let t1 = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T1".into()], items: vec![] })
        .expect("seed")
        .expect("ticket");
    e.apply(&t1, Ok(Page::new(vec![q("a", 1.0)], 1, 3)));
    let t2 = e.load_more().expect("page 2");
    assert_eq!(e.state(), &EngineState::LoadingMore { page: 2 });

    let fresh = e.set_filter(2, Some("T2".into())).expect("topic").expect("page 1 ticket");
    assert_eq!(e.apply(&t2, Ok(Page::new(vec![q("b", 1.0)], 2, 3))), Outcome::Discarded);
    assert!(e.pool().is_empty());
    assert_eq!(e.state(), &EngineState::Loading { page: 1 });
    assert_eq!(e.in_flight(), Some(&fresh));
}

#[test]
fn misnumbered_pages_fail_instead_of_applying() {
    let mut e = engine();
    let t1 = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![] })
        .expect("seed")
        .expect("ticket");
    let outcome = e.apply(&t1, Ok(Page::new(vec![q("a", 1.0)], 0, 0)));
    assert!(matches!(outcome, Outcome::Failed(FetchError::Malformed(_))));
    assert!(matches!(e.state(), EngineState::Error { reason: FetchError::Malformed(_) }));
    assert!(e.pool().is_empty());

    let again = e.retry().expect("retry page 1");
    assert_eq!(e.apply(&again, Ok(Page::new(vec![q("a", 1.0)], 1, 3))), Outcome::Applied { added: 1 });

    // Answering the page 2 ticket with page 1 must not rewind the cursor.
    let t2 = e.load_more().expect("page 2");
    let outcome = e.apply(&t2, Ok(Page::new(vec![q("b", 1.0)], 1, 3)));
    assert!(matches!(outcome, Outcome::Failed(FetchError::Malformed(_))));
    assert_eq!(e.pool().len(), 1);
    assert_eq!(e.pool().last_page(), 1);
    assert_eq!(e.retry().expect("retry page 2").page, 2);
}

#[test]
fn selection_survives_pages_that_omit_it() {
    let mut e = engine();
    let t1 = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![] })
        .expect("seed")
        .expect("ticket");
    e.apply(&t1, Ok(Page::new(vec![q("x", 5.0), q("y", 1.0)], 1, 3)));
    e.toggle_id(&Identifier::from("x")).expect("select x");

    let t2 = e.load_more().expect("page 2");
    e.apply(&t2, Ok(Page::new(vec![q("z", 1.0)], 2, 3)));
    assert!(e.selection().contains(&Identifier::from("x")));
    assert!(e.bank().iter().any(|i| i.id == Identifier::from("x")));
    assert_eq!(e.aggregate(), Aggregate { count: 1, total_weight: 5.0 });
}

#[test]
fn any_filter_change_resets_selection_and_pool() {
    for level in 0..3 {
        let mut e = engine();
        let t = e
            .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![q("s", 2.0)] })
            .expect("seed")
            .expect("ticket");
        e.apply(&t, Ok(Page::new(vec![q("p", 1.0)], 1, 1)));
        e.toggle_id(&Identifier::from("p")).expect("select p");
        assert_eq!(e.aggregate().count, 2);

        e.set_filter(level, Some("other".into())).expect("change");
        assert_eq!(e.aggregate().count, 0, "level {level}");
        assert!(e.pool().is_empty(), "level {level}");
        assert!(e.bank().is_empty(), "level {level}");
    }
}

#[test]
fn unchanged_filter_keeps_everything() {
    let mut e = engine();
    let t = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![q("s", 2.0)] })
        .expect("seed")
        .expect("ticket");
    e.apply(&t, Ok(Page::new(vec![q("p", 1.0)], 1, 1)));
    assert!(e.set_filter(2, Some("T".into())).expect("same").is_none());
    assert_eq!(e.aggregate().count, 1);
    assert_eq!(e.pool().len(), 1);
    assert_eq!(e.state(), &EngineState::Ready);
}

#[test]
fn edit_mode_shows_saved_items_before_first_page() {
    let mut e = engine();
    let saved = SavedSelection {
        filter_values: vec![Identifier::Int(1), "phy".into(), "kin".into()],
        items: vec![q("old", 3.0), q("shared", 2.0)],
    };
    let ticket = e.seed(saved).expect("seed").expect("ticket");
    assert_eq!(ids(&e.bank()), vec![Identifier::from("old"), Identifier::from("shared")]);
    assert_eq!(e.aggregate(), Aggregate { count: 2, total_weight: 5.0 });

    e.apply(&ticket, Ok(Page::new(vec![q("shared", 2.0), q("new", 1.0)], 1, 1)));
    assert_eq!(
        ids(&e.bank()),
        vec![Identifier::from("shared"), Identifier::from("new"), Identifier::from("old")]
    );
    let flags: Vec<bool> = e.entries().iter().map(|entry| entry.selected).collect();
    assert_eq!(flags, vec![true, false, true]);
}

#[test]
fn failure_then_retry_reissues_same_page() {
    let mut e = engine();
    let t1 = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![] })
        .expect("seed")
        .expect("ticket");
    e.apply(&t1, Ok(Page::new(vec![q("a", 1.0)], 1, 2)));
    let t2 = e.load_more().expect("page 2");
    assert_eq!(e.apply(&t2, Err(FetchError::Timeout)), Outcome::Failed(FetchError::Timeout));
    assert_eq!(e.state(), &EngineState::Error { reason: FetchError::Timeout });
    assert!(e.load_more().is_none());
    assert_eq!(e.pool().len(), 1, "earlier pages stay");

    let again = e.retry().expect("retry ticket");
    assert_eq!(again.page, 2);
    assert_eq!(again.signature, t2.signature);
    assert_eq!(e.state(), &EngineState::LoadingMore { page: 2 });
    assert!(e.retry().is_none());
    assert_eq!(e.apply(&again, Ok(Page::new(vec![q("b", 1.0)], 2, 2))), Outcome::Applied { added: 1 });
    assert_eq!(e.state(), &EngineState::Ready);
}

#[test]
fn filter_change_leaves_error_state() {
    let mut e = engine();
    let t = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![] })
        .expect("seed")
        .expect("ticket");
    e.apply(&t, Err(FetchError::Server("500".into())));
    let fresh = e.set_filter(2, Some("T2".into())).expect("change").expect("ticket");
    assert_eq!(e.state(), &EngineState::Loading { page: 1 });
    assert!(e.retry().is_none());
    assert_eq!(e.apply(&fresh, Ok(Page::new(vec![], 1, 1))), Outcome::Applied { added: 0 });
}

#[test]
fn only_one_fetch_in_flight_per_signature() {
    let mut e = engine();
    let t1 = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![] })
        .expect("seed")
        .expect("ticket");
    e.apply(&t1, Ok(Page::new(vec![q("a", 1.0)], 1, 3)));
    let t2 = e.load_more().expect("page 2");
    assert!(e.load_more().is_none());
    assert_eq!(e.in_flight(), Some(&t2));
}

#[test]
fn bare_id_toggle_is_rejected_when_unknown() {
    let mut e = engine();
    assert!(matches!(e.toggle(Identifier::from("ghost")), Err(Error::UnknownSelection(_))));
    assert!(matches!(e.toggle_id(&Identifier::from("ghost")), Err(Error::UnknownSelection(_))));
    assert!(matches!(e.set_filter(7, None), Err(Error::InvalidLevel { .. })));
    assert!(matches!(e.set_filter_by_key("chapter", None), Err(Error::InvalidLevel { .. })));
}

#[test]
fn submission_reports_user_facing_issues() {
    let mut e = engine();
    let issues = e.submission().expect_err("nothing chosen");
    assert_eq!(issues, vec![SubmitIssue::NoFilterResolved, SubmitIssue::EmptySelection]);
    assert_eq!(issues[1].to_string(), "Select at least one question.");

    let t = e
        .seed(SavedSelection { filter_values: vec!["E".into(), "S".into(), "T".into()], items: vec![q("s", 4.0)] })
        .expect("seed")
        .expect("ticket");
    assert_eq!(e.submission().expect_err("loading"), vec![SubmitIssue::FetchPending]);
    e.apply(&t, Ok(Page::new(vec![], 1, 1)));

    let mut sink = RecordingSink::default();
    let snapshot = e.submit(&mut sink).expect("sink").expect("submittable");
    assert_eq!(snapshot.selected_ids, vec![Identifier::from("s")]);
    assert!((snapshot.total_weight - 4.0).abs() < f64::EPSILON);
    assert_eq!(sink.0.len(), 1);

    e.clear_selection();
    assert!(e.submit(&mut sink).expect("sink").is_err());
    assert_eq!(sink.0.len(), 1);
}

#[test]
fn engine_without_required_levels_is_refused() {
    let settings = EngineSettings { required_levels: Some(0), ..EngineSettings::default() };
    assert!(matches!(SelectionEngine::from_settings(&settings), Err(Error::InvalidConfig(_))));
}
