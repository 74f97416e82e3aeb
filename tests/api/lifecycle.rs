use std::collections::HashSet;

use campus_support::core::AppErrorType;
use campus_support::models::profiles::Category;
use campus_support::models::requests::{
    CreateRequestPayload, Decision, RequestStatus, SessionDetailsPayload, SessionReportPayload,
};
use chrono::Duration;
use claim::{assert_none, assert_ok, assert_some, assert_some_eq};

use crate::helpers::spawn_app;

#[tokio::test]
async fn new_requests_are_pending_and_notify_the_provider() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&["ECO101"]).await;

    let request = app.pending_request(&student, &tutor).await;

    assert_eq!(request.status, RequestStatus::Pending);
    assert_none!(request.reviewed_at);
    assert_some_eq!(request.created_at, app.clock_now());
    assert_eq!(request.student_name, student.name);
    assert_eq!(request.provider_name, tutor.name);
    assert_eq!(request.category, Category::Academic);
    assert!(request.id.starts_with("req-"));

    let titles = app.notification_titles(&tutor.id).await;
    assert_eq!(titles.len(), 1);
    assert!(titles[0].contains(&student.name));
    assert!(app.notification_titles(&student.id).await.is_empty());
}

#[tokio::test]
async fn declining_sets_reason_and_notifies_the_student_once() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;

    app.clock.advance(Duration::hours(3));
    let declined = app
        .support
        .lifecycle
        .decide(
            &request.id,
            &tutor.id,
            Decision::Decline {
                reason: Some("busy".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(declined.status, RequestStatus::Declined);
    assert_eq!(declined.rejection_reason.as_deref(), Some("busy"));
    assert_some_eq!(declined.reviewed_at, app.clock_now());
    assert_eq!(declined.reviewed_by.as_deref(), Some(tutor.id.as_str()));

    let titles = app.notification_titles(&student.id).await;
    assert_eq!(titles.len(), 1);
    assert!(titles[0].contains("declined"));
}

#[tokio::test]
async fn declining_twice_is_an_illegal_transition() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    lifecycle
        .decide(
            &request.id,
            &tutor.id,
            Decision::Decline {
                reason: Some("busy".to_string()),
            },
        )
        .await
        .unwrap();
    let err = lifecycle
        .decide(
            &request.id,
            &tutor.id,
            Decision::Decline {
                reason: Some("changed my mind".to_string()),
            },
        )
        .await
        .unwrap_err();

    assert!(err.is(AppErrorType::IllegalTransition));
    let stored = lifecycle.find_request(&request.id).await.unwrap();
    assert_eq!(stored.rejection_reason.as_deref(), Some("busy"));
}

#[tokio::test]
async fn decline_without_reason_uses_the_default() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;

    let declined = app
        .support
        .lifecycle
        .decide(&request.id, &tutor.id, Decision::Decline { reason: None })
        .await
        .unwrap();
    assert_eq!(declined.rejection_reason.as_deref(), Some("No reason provided"));
}

#[tokio::test]
async fn approve_complete_rate_and_rate_again() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    lifecycle
        .decide(&request.id, &tutor.id, Decision::Approve)
        .await
        .unwrap();
    app.clock.advance(Duration::days(2));
    let completed = lifecycle
        .complete(&request.id, &tutor.id, SessionReportPayload::summary("covered X"))
        .await
        .unwrap();
    assert_eq!(completed.status, RequestStatus::Completed);
    assert_some_eq!(completed.completed_at, app.clock_now());

    let rated = lifecycle
        .rate(&request.id, 5, Some("great".to_string()))
        .await
        .unwrap();
    assert_eq!(rated.rating, Some(5));
    assert_eq!(rated.comment.as_deref(), Some("great"));

    let err = lifecycle.rate(&request.id, 3, None).await.unwrap_err();
    assert!(err.is(AppErrorType::AlreadyRated));
    let stored = lifecycle.find_request(&request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Completed);
    assert_eq!(stored.rating, Some(5));
    assert_eq!(stored.comment.as_deref(), Some("great"));

    let report = lifecycle.report_for_request(&request.id).await.unwrap().unwrap();
    assert_eq!(report.summary, "covered X");
    assert_eq!(report.author_id, tutor.id);
    assert_eq!(lifecycle.session_notes(&tutor.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn ratings_outside_one_to_five_are_validation_errors() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    for rating in [0, 6] {
        let err = lifecycle.rate(&request.id, rating, None).await.unwrap_err();
        assert!(err.is(AppErrorType::PayloadValidationError));
    }

    let err = lifecycle.rate(&request.id, 5, None).await.unwrap_err();
    assert!(err.is(AppErrorType::IllegalTransition));
}

#[tokio::test]
async fn pending_cannot_jump_to_completed() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;

    let err = app
        .support
        .lifecycle
        .complete(&request.id, &tutor.id, SessionReportPayload::summary("x"))
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::IllegalTransition));
    assert_none!(app
        .support
        .lifecycle
        .report_for_request(&request.id)
        .await
        .unwrap());
}

#[tokio::test]
async fn deciding_an_approved_request_again_is_illegal() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    lifecycle
        .decide(&request.id, &tutor.id, Decision::Approve)
        .await
        .unwrap();
    let err = lifecycle
        .decide(&request.id, &tutor.id, Decision::Decline { reason: None })
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::IllegalTransition));
}

#[tokio::test]
async fn suggestion_can_be_reproposed_and_accepted_by_the_student() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    app.clock.advance(Duration::hours(1));
    let first_review = app.clock_now();
    let first_time = first_review + Duration::days(3);
    let suggested = lifecycle
        .decide(
            &request.id,
            &tutor.id,
            Decision::Suggest {
                suggested_time: first_time,
            },
        )
        .await
        .unwrap();
    assert_eq!(suggested.status, RequestStatus::Suggested);
    assert_some_eq!(suggested.reviewed_at, first_review);

    app.clock.advance(Duration::hours(1));
    let second_time = first_time + Duration::days(1);
    let resuggested = lifecycle
        .decide(
            &request.id,
            &tutor.id,
            Decision::Suggest {
                suggested_time: second_time,
            },
        )
        .await
        .unwrap();
    assert_eq!(resuggested.suggested_time, Some(second_time));
    // reviewedAt is stamped once, by the first decision.
    assert_some_eq!(resuggested.reviewed_at, first_review);

    let accepted = lifecycle
        .decide(&request.id, &student.id, Decision::Approve)
        .await
        .unwrap();
    assert_eq!(accepted.status, RequestStatus::Approved);
    assert_eq!(accepted.datetime, Some(second_time));
    assert_some_eq!(accepted.reviewed_at, first_review);

    let provider_titles = app.notification_titles(&tutor.id).await;
    assert!(provider_titles[0].contains("accepted"));
}

#[tokio::test]
async fn students_can_only_answer_suggestions() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    let err = lifecycle
        .decide(&request.id, &student.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::ForbiddenError));

    lifecycle
        .decide(
            &request.id,
            &tutor.id,
            Decision::Suggest {
                suggested_time: app.clock_now() + Duration::days(1),
            },
        )
        .await
        .unwrap();
    let err = lifecycle
        .decide(
            &request.id,
            &student.id,
            Decision::Suggest {
                suggested_time: app.clock_now(),
            },
        )
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::ForbiddenError));

    let declined = lifecycle
        .decide(&request.id, &student.id, Decision::Decline { reason: None })
        .await
        .unwrap();
    assert_eq!(declined.status, RequestStatus::Declined);
}

#[tokio::test]
async fn strangers_cannot_decide_but_admins_can() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let other_tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    let err = lifecycle
        .decide(&request.id, &other_tutor.id, Decision::Approve)
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::ForbiddenError));

    let approved = lifecycle
        .decide(&request.id, "admin", Decision::Approve)
        .await
        .unwrap();
    assert_eq!(approved.reviewed_by.as_deref(), Some("admin"));
}

#[tokio::test]
async fn creation_requires_known_participants_and_a_time() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let lifecycle = &app.support.lifecycle;

    let err = lifecycle
        .request_session("stu-missing", &tutor.id, app.scheduled())
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::PayloadValidationError));

    let err = lifecycle
        .request_session(&student.id, "tutor-missing", app.scheduled())
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::PayloadValidationError));

    let err = lifecycle
        .request_session(&student.id, &student.id, app.scheduled())
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::PayloadValidationError));

    let err = lifecycle
        .request_session(&student.id, &tutor.id, CreateRequestPayload::default())
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::PayloadValidationError));

    let urgent = lifecycle
        .request_session(
            &student.id,
            &tutor.id,
            CreateRequestPayload {
                urgent: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(urgent.urgent);
    assert_none!(urgent.datetime);
}

#[tokio::test]
async fn unknown_request_ids_are_not_found() {
    let app = spawn_app();
    let lifecycle = &app.support.lifecycle;

    let err = lifecycle
        .decide("req-missing", "admin", Decision::Approve)
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::NotFoundError));

    let err = lifecycle.rate("req-missing", 4, None).await.unwrap_err();
    assert!(err.is(AppErrorType::NotFoundError));

    let err = lifecycle.delete("req-missing", "admin").await.unwrap_err();
    assert!(err.is(AppErrorType::NotFoundError));
}

#[tokio::test]
async fn delete_is_admin_only_and_silent() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;
    let before = app.support.notifications.list_all().await.unwrap().len();

    let err = lifecycle.delete(&request.id, &tutor.id).await.unwrap_err();
    assert!(err.is(AppErrorType::ForbiddenError));

    assert_ok!(lifecycle.delete(&request.id, "admin").await);
    assert!(lifecycle
        .find_request(&request.id)
        .await
        .unwrap_err()
        .is(AppErrorType::NotFoundError));
    assert_eq!(app.support.notifications.list_all().await.unwrap().len(), before);
}

#[tokio::test]
async fn session_details_need_an_approved_session() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;
    let details = SessionDetailsPayload {
        meeting_link: Some("https://meet.example.com/abc".to_string()),
        location: None,
    };

    let err = lifecycle
        .set_session_details(&request.id, &tutor.id, details.clone())
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::IllegalTransition));

    lifecycle
        .decide(&request.id, &tutor.id, Decision::Approve)
        .await
        .unwrap();
    let updated = lifecycle
        .set_session_details(&request.id, &tutor.id, details)
        .await
        .unwrap();
    assert_eq!(updated.status, RequestStatus::Approved);
    assert_some!(updated.meeting_link);
    assert_eq!(lifecycle.active_sessions(&tutor.id).await.unwrap().len(), 1);

    let titles = app.notification_titles(&student.id).await;
    assert!(titles[0].contains("Session details"));
}

#[tokio::test]
async fn retried_completion_keeps_a_single_report() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;
    lifecycle
        .decide(&request.id, &tutor.id, Decision::Approve)
        .await
        .unwrap();

    lifecycle
        .complete(&request.id, &tutor.id, SessionReportPayload::summary("first"))
        .await
        .unwrap();
    let err = lifecycle
        .complete(&request.id, &tutor.id, SessionReportPayload::summary("second"))
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::IllegalTransition));

    let notes = lifecycle.session_notes(&tutor.id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].summary, "first");
}

#[tokio::test]
async fn history_holds_terminal_requests() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let lifecycle = &app.support.lifecycle;

    let declined = app.pending_request(&student, &tutor).await;
    let _pending = app.pending_request(&student, &tutor).await;
    lifecycle
        .decide(&declined.id, &tutor.id, Decision::Decline { reason: None })
        .await
        .unwrap();

    let history = lifecycle.history(&student.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, declined.id);
    assert_eq!(
        lifecycle
            .requests_by_status(RequestStatus::Pending)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn created_requests_have_distinct_resolvable_ids() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;

    for _ in 0..25 {
        app.pending_request(&student, &tutor).await;
    }

    let requests = app.support.lifecycle.list_requests().await.unwrap();
    let ids: HashSet<&str> = requests.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(requests.len(), 25);
    assert_eq!(ids.len(), 25);
    for id in ids {
        assert_ok!(app.support.lifecycle.find_request(id).await);
    }
    assert_eq!(
        app.support
            .lifecycle
            .requests_for_student(&student.id)
            .await
            .unwrap()
            .len(),
        25
    );
}

#[tokio::test]
async fn review_time_never_precedes_creation() {
    let app = spawn_app();
    let student = app.student().await;
    let counsellor = app.counsellor(Category::Mental).await;
    let request = app.pending_request(&student, &counsellor).await;
    assert_eq!(request.category, Category::Mental);

    // Clock skew between writers.
    app.clock.advance(-Duration::minutes(5));
    let approved = app
        .support
        .lifecycle
        .decide(&request.id, &counsellor.id, Decision::Approve)
        .await
        .unwrap();
    assert!(approved.reviewed_at.unwrap() >= approved.created_at.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlapping_completions_store_only_the_winning_report() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let lifecycle = &app.support.lifecycle;

    for _ in 0..10 {
        let request = app.pending_request(&student, &tutor).await;
        lifecycle
            .decide(&request.id, &tutor.id, Decision::Approve)
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            lifecycle.complete(&request.id, &tutor.id, SessionReportPayload::summary("A")),
            lifecycle.complete(&request.id, &tutor.id, SessionReportPayload::summary("B")),
        );
        let winner = match (&a, &b) {
            (Ok(_), Err(e)) if e.is(AppErrorType::IllegalTransition) => "A",
            (Err(e), Ok(_)) if e.is(AppErrorType::IllegalTransition) => "B",
            other => panic!("expected exactly one completion, got {:?}", other),
        };

        let report = lifecycle
            .report_for_request(&request.id)
            .await
            .unwrap()
            .expect("the winning completion stores a report");
        assert_eq!(report.summary, winner);
    }
    assert_eq!(lifecycle.session_notes(&tutor.id).await.unwrap().len(), 10);
}

#[tokio::test]
async fn refused_completion_stores_no_report() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let request = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    let err = lifecycle
        .complete(&request.id, &tutor.id, SessionReportPayload::summary("too early"))
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::IllegalTransition));

    assert_none!(lifecycle.report_for_request(&request.id).await.unwrap());
    assert_eq!(
        lifecycle.find_request(&request.id).await.unwrap().status,
        RequestStatus::Pending
    );
}

#[tokio::test]
async fn deleting_a_completed_request_removes_its_report() {
    let app = spawn_app();
    let student = app.student().await;
    let tutor = app.tutor(&[]).await;
    let kept = app.pending_request(&student, &tutor).await;
    let doomed = app.pending_request(&student, &tutor).await;
    let lifecycle = &app.support.lifecycle;

    for request in [&kept, &doomed] {
        lifecycle
            .decide(&request.id, &tutor.id, Decision::Approve)
            .await
            .unwrap();
        lifecycle
            .complete(&request.id, &tutor.id, SessionReportPayload::summary("done"))
            .await
            .unwrap();
    }

    lifecycle.delete(&doomed.id, "admin").await.unwrap();

    assert_none!(lifecycle.report_for_request(&doomed.id).await.unwrap());
    assert_some!(lifecycle.report_for_request(&kept.id).await.unwrap());
    let notes = lifecycle.session_notes(&tutor.id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].request_id, kept.id);
}
