use crate::domain::Source;
use crate::errors::ServerError;
use crate::handle;
use crate::tests::utils::{body_string, get, post_form, Launched, TestApp};

#[test]
fn start_passes_form_options_to_the_run() {
    let t = TestApp::new();

    let resp = handle(
        post_form("/checker/start", "source=redfin&include_failed=true&limit=50"),
        &t.app,
    )
    .unwrap();
    assert_eq!(resp.status(), 302);

    match &t.launched()[0] {
        Launched::Verification(options) => {
            assert_eq!(options.source, Some(Source::Redfin));
            assert!(options.include_soft_failed);
            assert!(!options.api_error_only);
            assert_eq!(options.limit, Some(50));
            assert_eq!(options.breaker_threshold, 20);
            assert_eq!(options.status_batch_size, 100);
        }
        other => panic!("unexpected launch: {other:?}"),
    }
}

#[test]
fn only_one_verification_run_at_a_time() {
    let t = TestApp::new();
    handle(post_form("/checker/start", ""), &t.app).unwrap();

    let err = handle(post_form("/checker/start", ""), &t.app).unwrap_err();
    assert!(matches!(err, ServerError::Conflict(_)));
}

#[test]
fn bad_source_is_rejected_before_launch() {
    let t = TestApp::new();
    let err = handle(post_form("/checker/start", "source=mls"), &t.app).unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));
    assert!(t.launched().is_empty());

    // The slot was never claimed.
    handle(post_form("/checker/start", ""), &t.app).unwrap();
}

#[test]
fn status_is_json_with_counts() {
    let t = TestApp::new();

    let resp = handle(get("/checker/status"), &t.app).unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(resp)).unwrap();
    assert_eq!(json["running"], false);
    assert_eq!(json["processed"], 0);

    handle(post_form("/checker/start", ""), &t.app).unwrap();
    let resp = handle(get("/checker/status"), &t.app).unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_string(resp)).unwrap();
    assert_eq!(json["running"], true);
}

#[test]
fn stop_cancels_and_redirects() {
    let t = TestApp::new();
    handle(post_form("/checker/start", ""), &t.app).unwrap();

    let resp = handle(post_form("/checker/stop", ""), &t.app).unwrap();
    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("Location").unwrap(), "/");
}

#[test]
fn empty_form_keeps_api_errors_eligible() {
    use crate::db::{PropertyStore, SelectionQuery, SqliteStore};
    use crate::domain::{FailureReason, PropertyRecord, VerificationOutcome};

    let t = TestApp::new();
    let store = SqliteStore::new(t.app.db.clone());
    store
        .insert_batch(&[PropertyRecord::new("soft", Source::Zillow)])
        .unwrap();
    store
        .update_status_batch(&[VerificationOutcome::failed("soft", FailureReason::ApiError)])
        .unwrap();

    handle(post_form("/checker/start", ""), &t.app).unwrap();

    let options = match &t.launched()[0] {
        Launched::Verification(options) => options.clone(),
        other => panic!("unexpected launch: {other:?}"),
    };
    assert!(options.include_soft_failed);

    let selected = store
        .select_unverified(&SelectionQuery {
            batch_size: options.batch_size,
            source: options.source,
            include_soft_failed: options.include_soft_failed,
            api_error_only: options.api_error_only,
            after: None,
        })
        .unwrap();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].record.property_id, "soft");
}
