use campus_support::core::AppErrorType;
use campus_support::models::profiles::{Category, Schedule, WeeklyBlock};
use campus_support::models::reporting::ProviderQuery;
use campus_support::models::requests::{Decision, SessionReportPayload};
use chrono::{NaiveTime, Weekday};

use crate::helpers::spawn_app;

#[tokio::test]
async fn available_providers_rank_first_then_by_rating() {
    let app = spawn_app();
    let student = app.student().await;
    let unrated = app.tutor(&["ECO101"]).await;
    let well_rated = app.tutor(&["ECO101"]).await;
    let available = app.tutor(&["ECO101"]).await;
    let lifecycle = &app.support.lifecycle;

    let request = app.pending_request(&student, &well_rated).await;
    lifecycle
        .decide(&request.id, &well_rated.id, Decision::Approve)
        .await
        .unwrap();
    lifecycle
        .complete(&request.id, &well_rated.id, SessionReportPayload::summary("done"))
        .await
        .unwrap();
    lifecycle.rate(&request.id, 5, None).await.unwrap();

    app.support
        .availability
        .set_availability(&available.id, true)
        .await
        .unwrap();

    let ids: Vec<String> = app
        .support
        .availability
        .search_providers(&ProviderQuery {
            module: Some("eco101".to_string()),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.profile.id)
        .collect();
    assert_eq!(ids, vec![available.id, well_rated.id, unrated.id]);
}

#[tokio::test]
async fn search_filters_and_hides_suspended_providers() {
    let app = spawn_app();
    let tutor = app.tutor(&["ACC102"]).await;
    let suspended = app.tutor(&["ACC102"]).await;
    let counsellor = app.counsellor(Category::Financial).await;
    app.support
        .profiles
        .set_suspended("admin", &suspended.id, true)
        .await
        .unwrap();

    let availability = &app.support.availability;
    let by_module = availability
        .search_providers(&ProviderQuery {
            module: Some("ACC102".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_module.len(), 1);
    assert_eq!(by_module[0].profile.id, tutor.id);

    let financial = availability
        .search_providers(&ProviderQuery {
            category: Some(Category::Financial),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(financial.len(), 1);
    assert_eq!(financial[0].profile.id, counsellor.id);

    let first_name = counsellor.name.split(' ').next().unwrap().to_uppercase();
    let by_name = availability
        .search_providers(&ProviderQuery {
            name: Some(first_name),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(by_name.iter().any(|l| l.profile.id == counsellor.id));
}

#[tokio::test]
async fn need_help_now_falls_back_to_everyone() {
    let app = spawn_app();
    let first = app.tutor(&[]).await;
    let second = app.tutor(&[]).await;
    let availability = &app.support.availability;

    let everyone = availability
        .need_help_now(&ProviderQuery::default())
        .await
        .unwrap();
    assert_eq!(everyone.len(), 2);

    availability.set_availability(&second.id, true).await.unwrap();
    let now = availability
        .need_help_now(&ProviderQuery::default())
        .await
        .unwrap();
    assert_eq!(now.len(), 1);
    assert_eq!(now[0].profile.id, second.id);
    assert_ne!(now[0].profile.id, first.id);
}

#[tokio::test]
async fn schedules_are_validated_and_stored() {
    let app = spawn_app();
    let tutor = app.tutor(&[]).await;
    let student = app.student().await;
    let availability = &app.support.availability;
    let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();

    let err = availability
        .set_schedule(
            &tutor.id,
            Schedule::Weekly(vec![WeeklyBlock {
                day: Weekday::Mon,
                start: noon,
                end: nine,
            }]),
        )
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::PayloadValidationError));

    let schedule = Schedule::Weekly(vec![WeeklyBlock {
        day: Weekday::Mon,
        start: nine,
        end: noon,
    }]);
    let updated = availability
        .set_schedule(&tutor.id, schedule.clone())
        .await
        .unwrap();
    assert_eq!(updated.schedule, Some(schedule));

    let err = availability
        .set_availability(&student.id, true)
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::PayloadValidationError));
    let err = availability
        .set_schedule("tutor-missing", Schedule::Text("Fridays".to_string()))
        .await
        .unwrap_err();
    assert!(err.is(AppErrorType::NotFoundError));
}
