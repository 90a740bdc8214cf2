use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use url::Url;

use timetable_client::api::{HttpTimetableApi, TimetableApi};
use timetable_client::clock::ManualClock;
use timetable_client::controller::{GenerationController, RetentionPolicy};
use timetable_client::driver::spawn_driver;
use timetable_client::error::{ApiError, GenerationError};
use timetable_client::estimate::estimated_duration_seconds;
use timetable_client::settings::{
    ClassEntry, Constraints, LessonRequirement, SettingsSnapshot, SubjectEntry, TeacherEntry,
};
use timetable_client::storage::MemoryStore;
use timetable_client::{AppState, Day, Phase};
use timetable_server::app;
use timetable_server::state::AppState as ServerState;

async fn serve() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ServerState::new(Duration::ZERO, Duration::from_secs(600));
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });
    Url::parse(&format!("http://{addr}/")).unwrap()
}

fn client(base: Url) -> HttpTimetableApi {
    HttpTimetableApi::new(base, Some("test-session"), Duration::from_secs(5)).unwrap()
}

fn school() -> SettingsSnapshot {
    let lesson = |subject: &str, teacher: &str, hours| LessonRequirement {
        subject: subject.into(),
        teacher: teacher.into(),
        hours_per_week: hours,
    };
    SettingsSnapshot {
        classes: vec![
            ClassEntry {
                name: "1A".into(),
                lessons: vec![lesson("Math", "Smith", 4), lesson("Art", "Lee", 2)],
            },
            ClassEntry {
                name: "1B".into(),
                lessons: vec![lesson("Math", "Smith", 4)],
            },
        ],
        teachers: vec![TeacherEntry { name: "Smith".into() }, TeacherEntry { name: "Lee".into() }],
        subjects: vec![SubjectEntry { name: "Math".into() }, SubjectEntry { name: "Art".into() }],
        constraints: Constraints { periods_per_day: 3 },
    }
}

/// Polls the backend directly so the single controller fetch sees a final answer.
async fn wait_for_backend(api: &dyn TimetableApi, job_id: &str) {
    for _ in 0..200 {
        if api.job_status(job_id).await.unwrap().is_finished() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("backend never finished job {job_id}");
}

fn deadline_secs(class_count: u32) -> i64 {
    estimated_duration_seconds(class_count) as i64 + 3
}

#[tokio::test]
async fn controller_generates_against_real_backend() {
    let api = client(serve().await);
    let settings = school();
    api.save_settings(&settings).await.unwrap();

    let clock = ManualClock::new(1_000);
    let store = MemoryStore::new();
    let state = AppState {
        settings: settings.clone(),
        ..Default::default()
    };
    let mut controller = GenerationController::new(state, store.clone(), clock.clone(), RetentionPolicy::default());

    controller.start_generation(&api, settings.class_count()).await.unwrap();
    let job_id = controller.job().job_id.clone().unwrap();
    assert_eq!(controller.phase(), Phase::Generating);

    wait_for_backend(&api, &job_id).await;
    // Nothing is fetched while the countdown runs.
    assert!(!controller.fetch_result(&api).await.unwrap());

    clock.advance_secs(deadline_secs(2));
    controller.tick().unwrap();
    assert!(controller.fetch_result(&api).await.unwrap());

    let job = controller.job();
    assert_eq!(controller.phase(), Phase::Succeeded);
    assert_eq!(job.class_names, ["1A", "1B"]);
    assert_eq!(job.teacher_names, ["Lee", "Smith"]);
    assert_eq!(job.num_periods, 3);
    assert_eq!(job.lessons_for_class("1A").count(), 6);
    assert_eq!(job.lessons_for_teacher("Smith").count(), 8);

    // 1B's week starts after 1A's 15 slots.
    let first_1b = job.lessons_for_class("1B").next().unwrap();
    assert!(first_1b.id > 15);
    assert_eq!(first_1b.day, Day::Monday);

    // The persisted blob carries the decoded result.
    let stored: AppState = serde_json::from_str(&store.raw().unwrap()).unwrap();
    assert_eq!(stored.timetable, *job);
}

#[tokio::test]
async fn infeasible_school_ends_rejected() {
    let api = client(serve().await);
    let mut settings = school();
    settings.constraints.periods_per_day = 1;
    settings.classes[0].lessons = vec![LessonRequirement {
        subject: "Math".into(),
        teacher: "Smith".into(),
        hours_per_week: 3,
    }];
    settings.classes[1].lessons[0].hours_per_week = 3;
    api.save_settings(&settings).await.unwrap();

    let clock = ManualClock::new(0);
    let mut controller = GenerationController::new(
        AppState::default(),
        MemoryStore::new(),
        clock.clone(),
        RetentionPolicy::default(),
    );
    controller.start_generation(&api, 2).await.unwrap();
    wait_for_backend(&api, controller.job().job_id.as_deref().unwrap()).await;

    clock.advance_secs(deadline_secs(2));
    controller.tick().unwrap();
    let err = controller.fetch_result(&api).await.unwrap_err();
    assert!(matches!(err, GenerationError::GenerationRejected { ref status } if status == "error"));
    assert_eq!(controller.phase(), Phase::Failed);
    assert!(controller.job().lessons.is_empty());
}

#[tokio::test]
async fn start_without_saved_settings_fails() {
    let api = client(serve().await);
    let mut controller = GenerationController::new(
        AppState::default(),
        MemoryStore::new(),
        ManualClock::new(0),
        RetentionPolicy::default(),
    );

    let err = controller.start_generation(&api, 1).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::StartFailed(ApiError::Status { status: 409, .. })
    ));
    assert_eq!(controller.phase(), Phase::Failed);
    assert!(!controller.job().is_generating);
}

#[tokio::test]
async fn driver_follows_job_to_completion() {
    let api = Arc::new(client(serve().await));
    let settings = school();
    api.save_settings(&settings).await.unwrap();

    let clock = ManualClock::new(0);
    let controller = GenerationController::new(
        AppState::default(),
        MemoryStore::new(),
        clock.clone(),
        RetentionPolicy::default(),
    );
    let handle = spawn_driver(controller, api.clone(), Duration::from_millis(10));
    let epoch = handle.start(settings.class_count()).await.unwrap();

    let mut view_rx = handle.subscribe();
    let job_id = tokio::time::timeout(Duration::from_secs(5), view_rx.wait_for(|v| v.job_id.is_some()))
        .await
        .unwrap()
        .unwrap()
        .job_id
        .clone()
        .unwrap();
    wait_for_backend(api.as_ref(), &job_id).await;

    clock.advance_secs(deadline_secs(2));
    let view = tokio::time::timeout(Duration::from_secs(5), handle.wait_settled(epoch))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.phase, Phase::Succeeded);
    assert_eq!(view.lesson_count, 10);
}
