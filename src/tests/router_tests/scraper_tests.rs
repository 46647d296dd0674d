use crate::domain::Source;
use crate::errors::ServerError;
use crate::handle;
use crate::sources::regions::all_state_names;
use crate::tests::utils::{body_string, get, post_form, Launched, TestApp};

#[test]
fn start_redirects_and_launches_with_selected_states() {
    let t = TestApp::new();

    let resp = handle(
        post_form("/scraper/start", "source=zillow&states=Ohio&states=north%20carolina"),
        &t.app,
    )
    .unwrap();

    assert_eq!(resp.status(), 302);
    assert_eq!(resp.headers().get("Location").unwrap(), "/");
    assert_eq!(
        t.launched(),
        vec![Launched::Ingest {
            source: Source::Zillow,
            states: vec!["Ohio".to_string(), "North Carolina".to_string()],
        }]
    );
}

#[test]
fn no_states_means_every_supported_state() {
    let t = TestApp::new();
    handle(post_form("/scraper/start", "source=realtor"), &t.app).unwrap();

    match &t.launched()[0] {
        Launched::Ingest { states, .. } => assert_eq!(states, &all_state_names()),
        other => panic!("unexpected launch: {other:?}"),
    }
}

#[test]
fn unknown_source_is_bad_request() {
    let t = TestApp::new();
    let err = handle(post_form("/scraper/start", "source=craigslist"), &t.app).unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));

    let err = handle(post_form("/scraper/start", "states=Ohio"), &t.app).unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));
    assert!(t.launched().is_empty());
}

#[test]
fn second_run_of_same_source_conflicts() {
    let t = TestApp::new();
    handle(post_form("/scraper/start", "source=zillow"), &t.app).unwrap();

    let err = handle(post_form("/scraper/start", "source=zillow"), &t.app).unwrap_err();
    assert!(matches!(err, ServerError::Conflict(_)));

    // Other sources are independent.
    handle(post_form("/scraper/start", "source=redfin"), &t.app).unwrap();
    assert_eq!(t.launched().len(), 2);
}

#[test]
fn status_reports_running_sources_as_json() {
    let t = TestApp::new();
    handle(post_form("/scraper/start", "source=redfin"), &t.app).unwrap();

    let resp = handle(get("/scraper/status"), &t.app).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/json");

    let json: serde_json::Value = serde_json::from_str(&body_string(resp)).unwrap();
    assert_eq!(json["redfin"]["running"], true);
    assert_eq!(json["redfin"]["source"], "redfin");
}

#[test]
fn stop_cancels_the_running_scrape() {
    let t = TestApp::new();
    handle(post_form("/scraper/start", "source=zillow"), &t.app).unwrap();

    let resp = handle(post_form("/scraper/stop", "source=zillow"), &t.app).unwrap();
    assert_eq!(resp.status(), 302);

    // Slot is released by the run itself, not by the stop request.
    assert!(!t.app.status.cancel_ingest(Source::Redfin));
    assert!(t.app.status.cancel_ingest(Source::Zillow));
}

#[test]
fn unsupported_state_is_bad_request() {
    let t = TestApp::new();
    let err = handle(post_form("/scraper/start", "source=zillow&states=Atlantis"), &t.app).unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));
    assert!(t.launched().is_empty());
}
