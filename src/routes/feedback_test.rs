use super::*;
use crate::state::test_helpers;

fn body(rating: i32) -> CreateFeedbackBody {
    CreateFeedbackBody { id: None, rating, comment: None, created_at: None }
}

#[test]
fn feedback_error_to_status_maps_variants() {
    assert_eq!(feedback_error_to_status(FeedbackError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND);
    assert_eq!(feedback_error_to_status(FeedbackError::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        feedback_error_to_status(FeedbackError::Database(sqlx::Error::RowNotFound)),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn into_record_fills_missing_fields() {
    let record = body(4).into_record();
    assert_eq!(record.rating, 4);
    assert_eq!(record.comment, "");
    assert!(record.created_at_time().is_some());
    assert!(!record.id.is_nil());
}

#[test]
fn into_record_keeps_client_fields() {
    let id = Uuid::new_v4();
    let record = CreateFeedbackBody {
        id: Some(id),
        rating: 2,
        comment: Some("meh".to_owned()),
        created_at: Some("2024-05-01T12:30:00Z".to_owned()),
    }
    .into_record();
    assert_eq!(record.id, id);
    assert_eq!(record.comment, "meh");
    assert_eq!(record.created_at, "2024-05-01T12:30:00Z");
}

#[test]
fn into_record_replaces_blank_timestamp() {
    let mut b = body(3);
    b.created_at = Some("  ".to_owned());
    assert!(b.into_record().created_at_time().is_some());
}

#[test]
fn body_decodes_camel_case_and_requires_rating() {
    let parsed: CreateFeedbackBody =
        serde_json::from_str(r#"{"rating":5,"comment":"hi","createdAt":"2024-05-01T12:30:00Z"}"#).unwrap();
    assert_eq!(parsed.created_at.as_deref(), Some("2024-05-01T12:30:00Z"));

    assert!(serde_json::from_str::<CreateFeedbackBody>(r#"{"comment":"no rating"}"#).is_err());
}

#[test]
fn rating_is_not_range_checked() {
    let parsed: CreateFeedbackBody = serde_json::from_str(r#"{"rating":11}"#).unwrap();
    assert_eq!(parsed.into_record().rating, 11);
}

#[tokio::test]
async fn create_then_list_and_get() {
    let state = test_helpers::test_app_state();

    let (status, Json(created)) = create_feedback(State(state.clone()), Json(body(5))).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);

    let Json(listed) = list_feedback(State(state.clone())).await.unwrap();
    assert_eq!(listed, vec![created.clone()]);

    let Json(fetched) = get_feedback(State(state), Path(created.id)).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let state = test_helpers::test_app_state();
    let (_, Json(created)) = create_feedback(State(state.clone()), Json(body(1))).await.unwrap();

    let status = delete_feedback(State(state.clone()), Path(created.id)).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert_eq!(get_feedback(State(state.clone()), Path(created.id)).await.unwrap_err(), StatusCode::NOT_FOUND);
    assert_eq!(delete_feedback(State(state), Path(created.id)).await.unwrap_err(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn offline_backend_answers_service_unavailable() {
    let state = test_helpers::offline_app_state();
    assert_eq!(
        create_feedback(State(state.clone()), Json(body(5))).await.unwrap_err(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(list_feedback(State(state)).await.unwrap_err(), StatusCode::SERVICE_UNAVAILABLE);
}
