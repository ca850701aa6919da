//! CompletionStore merging arrivals the way a load delivers them.

use chrono::Utc;

use coursetrack_core::{CompletionStore, EngineConfig, Generation, Origin, StoreError};
use coursetrack_models::{
    Completion, ContentProgress, ContentRecord, CourseId, FlagSource, ModuleId, ModuleRecord,
    ModuleSnapshot, QuizRecord, QuizSubmission, VideoProgress, VideoRecord,
};

fn m1() -> ModuleId {
    ModuleId::from("m1")
}

fn open(records: &[ModuleRecord]) -> (CompletionStore, Generation) {
    let mut store = CompletionStore::new(&EngineConfig::default());
    let generation = store.open(CourseId::from("course-1"));
    store.track_modules(generation, records).unwrap();
    (store, generation)
}

#[derive(Clone, Copy)]
enum Arrival {
    Contents,
    Videos,
    Quizzes,
    ContentProgress,
    VideoProgress,
    QuizSubmission,
}

fn deliver(store: &mut CompletionStore, generation: Generation, arrival: Arrival) {
    let m1 = m1();
    match arrival {
        Arrival::Contents => {
            store
                .apply_contents(
                    generation,
                    &m1,
                    &[ContentRecord::new("c1").completed(true), ContentRecord::new("c2")],
                )
                .unwrap();
        }
        Arrival::Videos => {
            store
                .apply_videos(generation, &m1, &[VideoRecord::new("v1")])
                .unwrap();
        }
        Arrival::Quizzes => {
            store
                .apply_quizzes(generation, &m1, &[QuizRecord::new("q1")])
                .unwrap();
        }
        Arrival::ContentProgress => {
            store
                .apply_content_progress(
                    generation,
                    &"c2".into(),
                    &ContentProgress {
                        viewed: false,
                        viewed_at: None,
                    },
                )
                .unwrap();
        }
        Arrival::VideoProgress => {
            store
                .apply_video_progress(
                    generation,
                    &"v1".into(),
                    &VideoProgress {
                        completed: false,
                        watched_percentage: 50.0,
                    },
                )
                .unwrap();
        }
        Arrival::QuizSubmission => {
            store
                .apply_quiz_submission(generation, &"q1".into(), &QuizSubmission::default(), Origin::Fetch)
                .unwrap();
        }
    }
}

#[test]
fn test_arrival_order_does_not_matter() {
    let orders = [
        [
            Arrival::Contents,
            Arrival::Videos,
            Arrival::Quizzes,
            Arrival::ContentProgress,
            Arrival::VideoProgress,
            Arrival::QuizSubmission,
        ],
        [
            Arrival::Quizzes,
            Arrival::QuizSubmission,
            Arrival::Videos,
            Arrival::Contents,
            Arrival::VideoProgress,
            Arrival::ContentProgress,
        ],
        [
            Arrival::Videos,
            Arrival::VideoProgress,
            Arrival::Contents,
            Arrival::Quizzes,
            Arrival::ContentProgress,
            Arrival::QuizSubmission,
        ],
    ];

    let mut results = Vec::new();
    for order in orders {
        let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
        for arrival in order {
            deliver(&mut store, generation, arrival);
        }
        results.push(store.summaries());
    }

    let first = &results[0][0];
    assert_eq!(first.completion_percentage, Some(25));
    assert_eq!(first.module_completed, Completion::INCOMPLETE);
    assert!(results.iter().all(|summaries| summaries == &results[0]));
}

#[test]
fn test_module_unknown_while_any_category_unresolved() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    for arrival in [Arrival::Contents, Arrival::Videos, Arrival::Quizzes, Arrival::ContentProgress] {
        deliver(&mut store, generation, arrival);
    }

    let module = store.module(&m1()).unwrap();
    assert_eq!(module.content_completed.value, Completion::INCOMPLETE);
    assert_eq!(module.video_completed.value, Completion::Unknown);
    assert_eq!(module.module_completed.value, Completion::Unknown);
    // Lower bound from what has reported so far.
    assert_eq!(module.completion_percentage.value, Some(25));
}

#[test]
fn test_reapplying_is_a_noop() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    let contents = [ContentRecord::new("c1").completed(false)];

    assert!(store.apply_contents(generation, &m1(), &contents).unwrap().changed);
    assert!(!store.apply_contents(generation, &m1(), &contents).unwrap().changed);

    let snapshot = ModuleSnapshot {
        video_completed: Completion::COMPLETE,
        ..ModuleSnapshot::default()
    };
    store.refresh_module(generation, &m1(), &snapshot).unwrap();
    let before = store.summaries();
    assert!(!store.refresh_module(generation, &m1(), &snapshot).unwrap().changed);
    assert_eq!(store.summaries(), before);
}

#[test]
fn test_empty_categories_are_complete() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    store.apply_contents(generation, &m1(), &[]).unwrap();
    store.apply_videos(generation, &m1(), &[]).unwrap();
    store.apply_quizzes(generation, &m1(), &[]).unwrap();

    let module = store.module(&m1()).unwrap();
    assert_eq!(module.content_completed.value, Completion::COMPLETE);
    assert_eq!(module.video_completed.value, Completion::COMPLETE);
    assert_eq!(module.test_completed.value, Completion::COMPLETE);
    assert_eq!(module.module_completed.value, Completion::COMPLETE);
    assert_eq!(module.completion_percentage.value, Some(0));
}

#[test]
fn test_video_threshold_boundary() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    store
        .apply_videos(
            generation,
            &m1(),
            &[VideoRecord::new("v1").watched(0.0), VideoRecord::new("v2").watched(0.0)],
        )
        .unwrap();

    store.observe_video(generation, &"v1".into(), 89.99).unwrap();
    store.observe_video(generation, &"v2".into(), 90.0).unwrap();

    assert!(!store.video(&"v1".into()).unwrap().is_completed);
    assert!(store.video(&"v2".into()).unwrap().is_completed);
}

#[test]
fn test_asserted_category_ignores_item_facts() {
    let record = ModuleRecord::builder("m1")
        .content_completed(Completion::COMPLETE)
        .build();
    let (mut store, generation) = open(&[record]);
    store
        .apply_contents(generation, &m1(), &[ContentRecord::new("c1").completed(false)])
        .unwrap();
    assert!(store.content(&"c1".into()).unwrap().is_completed);

    store
        .apply_content_progress(
            generation,
            &"c1".into(),
            &ContentProgress {
                viewed: false,
                viewed_at: None,
            },
        )
        .unwrap();
    assert!(store.content(&"c1".into()).unwrap().is_completed);
    let module = store.module(&m1()).unwrap();
    assert_eq!(module.content_completed.source, FlagSource::Backend);
    assert!(store.pending_progress(&m1()).is_empty());
}

#[test]
fn test_learner_action_promotes_flags_locally() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    store
        .apply_contents(generation, &m1(), &[ContentRecord::new("c1").completed(false)])
        .unwrap();
    store.apply_videos(generation, &m1(), &[]).unwrap();
    store.apply_quizzes(generation, &m1(), &[]).unwrap();
    assert!(!store.module(&m1()).unwrap().is_module_completed());

    store
        .mark_content_viewed(generation, &"c1".into(), Utc::now())
        .unwrap();

    let module = store.module(&m1()).unwrap();
    assert_eq!(module.content_completed.value, Completion::COMPLETE);
    assert_eq!(module.content_completed.source, FlagSource::Local);
    assert!(module.is_module_completed());
    assert_eq!(module.completion_percentage.value, Some(100));
}

#[test]
fn test_arrivals_for_closed_view_are_rejected() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    store.close();

    let err = store.apply_contents(generation, &m1(), &[]).unwrap_err();
    assert!(matches!(err, StoreError::StaleGeneration { .. }));
    assert!(store.is_empty());
}

#[test]
fn test_arrivals_for_untracked_module_are_rejected() {
    let (mut store, generation) = open(&[ModuleRecord::builder("m1").build()]);
    let err = store
        .apply_videos(generation, &ModuleId::from("m9"), &[])
        .unwrap_err();
    assert!(matches!(err, StoreError::ModuleNotTracked(_)));
}

#[test]
fn test_lone_module_flag_yields_to_categories() {
    let record = ModuleRecord::builder("m1").module_completed(false).build();
    let (mut store, generation) = open(&[record]);
    store
        .apply_contents(generation, &m1(), &[ContentRecord::new("c1").completed(true)])
        .unwrap();
    store.apply_videos(generation, &m1(), &[]).unwrap();
    store.apply_quizzes(generation, &m1(), &[]).unwrap();

    let summaries = store.summaries();
    assert_eq!(summaries[0].module_completed, Completion::COMPLETE);
}
