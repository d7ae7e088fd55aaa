use galfitm_feedme::adapters::{SplusClient, SplusConfig};
use galfitm_feedme::domain::model::ObjectTarget;
use galfitm_feedme::domain::ports::{CutoutService, SurveyCatalog};
use galfitm_feedme::utils::fits;
use galfitm_feedme::GalfitError;
use httpmock::prelude::*;
use tempfile::TempDir;

fn target() -> ObjectTarget {
    ObjectTarget {
        name: "NGC1399".to_string(),
        ra: 54.6212,
        dec: -35.4507,
    }
}

fn client(server: &MockServer, user: Option<&str>) -> SplusClient {
    SplusClient::new(SplusConfig {
        tap_endpoint: server.url("/tap/sync"),
        cutout_endpoint: server.url("/get_cut"),
        user: user.map(str::to_string),
        password: user.map(|_| "secret".to_string()),
        timeout_seconds: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_photometry_per_band() {
    let server = MockServer::start();

    let r_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/tap/sync")
            .query_param("REQUEST", "doQuery")
            .query_param("LANG", "ADQL")
            .query_param("FORMAT", "csv")
            .query_param_exists("QUERY")
            .header("authorization", "Basic YXN0cm86c2VjcmV0");
        then.status(200).body(
            "ID,RA_r,DEC_r,A_r,B_r,FLUX_RADIUS_50_r,THETA_r,r_auto\n\
             iDR4_3_SPLUS-s28s33_0012345,54.6212,-35.4507,8.0,6.0,12.5,33.1,10.42\n",
        );
    });

    let client = client(&server, Some("astro"));
    let photometry = client
        .photometry(&target(), &["r".to_string()])
        .await
        .unwrap();

    r_mock.assert();
    assert_eq!(photometry.len(), 1);
    assert_eq!(photometry[0].band, "r");
    assert_eq!(photometry[0].axis_ratio, 0.75);
    assert_eq!(photometry[0].effective_radius, 12.5);
    assert_eq!(photometry[0].position_angle, 33.1);
    assert_eq!(photometry[0].magnitude, 10.42);
}

#[tokio::test]
async fn test_photometry_without_match() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/tap/sync");
        then.status(200)
            .body("ID,A_g,B_g,FLUX_RADIUS_50_g,THETA_g,g_auto\n");
    });

    let err = client(&server, None)
        .photometry(&target(), &["g".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, GalfitError::QueryError { .. }));
}

#[tokio::test]
async fn test_tap_error_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/tap/sync");
        then.status(401).body("Unauthorized\nlogin required");
    });

    match client(&server, None)
        .photometry(&target(), &["g".to_string()])
        .await
    {
        Err(GalfitError::QueryError { message }) => {
            assert!(message.contains("401"));
            assert!(message.contains("Unauthorized"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_cutout_is_saved_with_header_metadata() {
    let scratch = TempDir::new().unwrap();
    let source = scratch.path().join("source.fits");
    fits::write_image_f64(
        &source,
        2,
        2,
        &[0.0, 1.0, 2.0, 3.0],
        &[
            ("OBJECT", "SPLUS-s28s33".into()),
            ("FWHMMEAN", 1.31.into()),
            ("FWHMBETA", 2.7.into()),
        ],
    )
    .unwrap();
    let bytes = std::fs::read(&source).unwrap();

    let server = MockServer::start();
    let cut_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/get_cut")
            .query_param("size", "200")
            .query_param("band", "J0660");
        then.status(200).body(bytes.clone());
    });

    let dest = scratch.path().join("data/NGC1399/NGC1399_J0660.fits");
    let info = client(&server, None)
        .fetch_cutout(&target(), "J0660", 200, &dest)
        .await
        .unwrap();

    cut_mock.assert();
    assert_eq!(std::fs::read(&dest).unwrap(), bytes);
    assert_eq!(info.band, "J0660");
    assert_eq!(info.field.as_deref(), Some("SPLUS-s28s33"));
    assert_eq!(info.fwhm_mean, Some(1.31));
    assert_eq!(info.fwhm_beta, Some(2.7));
}

#[tokio::test]
async fn test_cutout_that_is_not_fits() {
    let scratch = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/get_cut");
        then.status(200).body("<html>maintenance</html>");
    });

    let dest = scratch.path().join("cut.fits");
    let err = client(&server, None)
        .fetch_cutout(&target(), "r", 100, &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, GalfitError::FitsError { .. }));
    assert!(!dest.exists());
}
