use crate::db::{PropertyStore, SqliteStore};
use crate::domain::{PropertyRecord, Source, VerificationOutcome};
use crate::handle;
use crate::tests::utils::{body_string, get, TestApp};

#[test]
fn home_page_shows_counts() {
    let t = TestApp::new();
    let store = SqliteStore::new(t.app.db.clone());

    let mut a = PropertyRecord::new("z-1", Source::Zillow);
    a.state = "Texas".into();
    let mut b = PropertyRecord::new("r-1", Source::Realtor);
    b.state = "Texas".into();
    store.insert_batch(&[a, b]).unwrap();

    let resp = handle(get("/"), &t.app).unwrap();
    assert_eq!(resp.status(), 200);

    let body = body_string(resp);
    assert!(body.contains("Dashboard"));
    assert!(body.contains("<strong>2</strong> properties"));
    assert!(body.contains("Texas"));
}

#[test]
fn unknown_route_is_not_found() {
    let t = TestApp::new();
    let err = handle(get("/nope"), &t.app).unwrap_err();
    assert!(matches!(err, crate::errors::ServerError::NotFound));
}

#[test]
fn download_returns_verified_properties_as_xlsx() {
    let t = TestApp::new();
    let store = SqliteStore::new(t.app.db.clone());
    store
        .insert_batch(&[
            PropertyRecord::new("z-1", Source::Zillow),
            PropertyRecord::new("z-2", Source::Zillow),
        ])
        .unwrap();
    store
        .update_status_batch(&[VerificationOutcome::verified("z-1")])
        .unwrap();
    assert_eq!(store.verified_properties().unwrap().len(), 1);

    let resp = handle(get("/checker/download"), &t.app).unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = resp.headers().get("Content-Disposition").unwrap().to_str().unwrap();
    assert!(disposition.contains("verified_properties_"));
}
