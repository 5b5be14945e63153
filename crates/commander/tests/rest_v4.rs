//! Integrationstests der /v4-REST-API gegen die Speicher-Engine

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use klangwerk_commander::{router, CommanderState};
use klangwerk_engine::{AudioTrackInfo, SpeicherEngine};
use klangwerk_observability::SystemMonitor;
use klangwerk_plugin::PluginRegistry;
use klangwerk_signaling::{RegistryKonfig, SessionRegistry};
use klangwerk_voice::LokaleFabrik;
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

const PASSWORT: &str = "youshallnotpass";

fn test_app() -> (Router, SessionRegistry) {
    let engine = SpeicherEngine::neu();
    engine.track_eintragen(AudioTrackInfo {
        titel: "Song A".into(),
        autor: "Band A".into(),
        laenge_ms: 180_000,
        identifier: "track:123".into(),
        ist_stream: false,
        uri: Some("https://example.org/track/123".into()),
        artwork_url: None,
        isrc: None,
    });
    let registry = SessionRegistry::neu(
        Arc::new(engine),
        Arc::new(PluginRegistry::neu()),
        Arc::new(LokaleFabrik),
        RegistryKonfig {
            filter_deaktiviert: vec!["karaoke".into()],
            ..RegistryKonfig::default()
        },
    );
    let (_tx, rx) = watch::channel(false);
    let state = CommanderState::neu(
        registry.clone(),
        Arc::new(SystemMonitor::neu()),
        PASSWORT,
        rx,
    );
    (router(state), registry)
}

async fn anfrage(
    app: &Router,
    methode: &str,
    pfad: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(methode)
        .uri(pfad)
        .header("authorization", PASSWORT);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let antwort = app.clone().oneshot(request).await.unwrap();
    let status = antwort.status();
    let bytes = to_bytes(antwort.into_body(), usize::MAX).await.unwrap();
    let wert = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, wert)
}

fn url_kodieren(text: &str) -> String {
    text.replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D")
}

// ---------------------------------------------------------------------------
// Autorisierung
// ---------------------------------------------------------------------------

#[tokio::test]
async fn falsches_passwort_ergibt_401_mit_pfad() {
    let (app, _) = test_app();
    let antwort = app
        .oneshot(
            Request::get("/v4/info")
                .header("authorization", "falsch")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::UNAUTHORIZED);

    let bytes = to_bytes(antwort.into_body(), usize::MAX).await.unwrap();
    let fehler: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(fehler["status"], 401);
    assert_eq!(fehler["error"], "Unauthorized");
    assert_eq!(fehler["path"], "/v4/info");
}

#[tokio::test]
async fn version_verlangt_passwort() {
    let (app, _) = test_app();
    let ohne = app
        .clone()
        .oneshot(Request::get("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(ohne.status(), StatusCode::UNAUTHORIZED);

    let (status, text) = anfrage(&app, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, Value::String(env!("CARGO_PKG_VERSION").to_string()));
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn loadtracks_liefert_katalogtrack() {
    let (app, _) = test_app();
    let (status, ergebnis) = anfrage(&app, "GET", "/v4/loadtracks?identifier=track:123", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ergebnis["loadType"], "track");
    assert_eq!(ergebnis["data"]["info"]["title"], "Song A");
    assert_eq!(ergebnis["data"]["info"]["length"], 180_000);
    assert!(ergebnis["data"]["encoded"].as_str().is_some());
}

#[tokio::test]
async fn loadtracks_unbekannt_ist_leer() {
    let (app, _) = test_app();
    let (status, ergebnis) = anfrage(&app, "GET", "/v4/loadtracks?identifier=gibtsnicht", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ergebnis["loadType"], "empty");
}

#[tokio::test]
async fn loadtracks_ohne_identifier_ist_400() {
    let (app, _) = test_app();
    let (status, fehler) = anfrage(&app, "GET", "/v4/loadtracks", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fehler["path"], "/v4/loadtracks");
}

#[tokio::test]
async fn decodetrack_nach_laden() {
    let (app, _) = test_app();
    let (_, geladen) = anfrage(&app, "GET", "/v4/loadtracks?identifier=track:123", None).await;
    let kodiert = geladen["data"]["encoded"].as_str().unwrap().to_string();

    let pfad = format!("/v4/decodetrack?encodedTrack={}", url_kodieren(&kodiert));
    let (status, track) = anfrage(&app, "GET", &pfad, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(track["encoded"], kodiert.as_str());
    assert_eq!(track["info"]["identifier"], "track:123");

    let (status, tracks) = anfrage(&app, "POST", "/v4/decodetracks", Some(json!([kodiert, kodiert]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tracks.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn decodetrack_mit_muell_ist_400() {
    let (app, _) = test_app();
    let (status, _) = anfrage(&app, "GET", "/v4/decodetrack?encodedTrack=kaputt", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn decodetracks_leer_ist_400() {
    let (app, _) = test_app();
    let (status, _) = anfrage(&app, "POST", "/v4/decodetracks", Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Sessions und Player
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unbekannte_session_ist_404() {
    let (app, _) = test_app();
    let (status, fehler) = anfrage(&app, "GET", "/v4/sessions/unbekannt/players", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(fehler["status"], 404);
    assert_eq!(fehler["path"], "/v4/sessions/unbekannt/players");
}

#[tokio::test]
async fn player_wird_per_patch_angelegt() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/42", session.id().as_str());

    let (status, player) = anfrage(
        &app,
        "PATCH",
        &pfad,
        Some(json!({ "track": { "identifier": "stille:60000", "userData": { "anfrage": 7 } }, "volume": 80 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["guildId"], "42");
    assert_eq!(player["track"]["info"]["identifier"], "stille:60000");
    assert_eq!(player["track"]["userData"]["anfrage"], 7);
    assert_eq!(player["volume"], 80);
    assert_eq!(player["paused"], false);

    let pfad_liste = format!("/v4/sessions/{}/players", session.id().as_str());
    let (status, liste) = anfrage(&app, "GET", &pfad_liste, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(liste.as_array().unwrap().len(), 1);

    session.zerstoeren();
}

#[tokio::test]
async fn no_replace_behaelt_laufenden_track() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/7", session.id().as_str());

    let (status, _) = anfrage(&app, "PATCH", &pfad, Some(json!({ "identifier": "track:123" }))).await;
    assert_eq!(status, StatusCode::OK);

    let mit_no_replace = format!("{pfad}?noReplace=true");
    let (status, player) = anfrage(
        &app,
        "PATCH",
        &mit_no_replace,
        Some(json!({ "track": { "identifier": "stille:1000" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(player["track"]["info"]["title"], "Song A");

    session.zerstoeren();
}

#[tokio::test]
async fn encoded_null_stoppt_wiedergabe() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/7", session.id().as_str());

    anfrage(&app, "PATCH", &pfad, Some(json!({ "identifier": "stille:60000" }))).await;
    let (status, player) = anfrage(&app, "PATCH", &pfad, Some(json!({ "track": { "encoded": null } }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(player["track"].is_null());

    session.zerstoeren();
}

#[tokio::test]
async fn widerspruechliche_trackangabe_ist_400() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/7", session.id().as_str());

    let (status, _) = anfrage(
        &app,
        "PATCH",
        &pfad,
        Some(json!({ "track": { "identifier": "track:123" }, "encodedTrack": null })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Vor der Pruefung wird kein Player angelegt
    assert_eq!(session.anzahl_player(), 0);

    session.zerstoeren();
}

#[tokio::test]
async fn identifier_ohne_einzeltrack_ist_400() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/7", session.id().as_str());

    let (status, _) = anfrage(&app, "PATCH", &pfad, Some(json!({ "identifier": "gibtsnicht" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(session.anzahl_player(), 0);

    session.zerstoeren();
}

#[tokio::test]
async fn deaktivierter_filter_ist_400() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/7", session.id().as_str());

    let (status, _) = anfrage(
        &app,
        "PATCH",
        &pfad,
        Some(json!({ "filters": { "karaoke": { "level": 1.0 } } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    session.zerstoeren();
}

#[tokio::test]
async fn player_loeschen_ist_idempotent() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/7", session.id().as_str());

    anfrage(&app, "PATCH", &pfad, Some(json!({ "volume": 50 }))).await;
    assert_eq!(session.anzahl_player(), 1);

    let (status, _) = anfrage(&app, "DELETE", &pfad, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = anfrage(&app, "DELETE", &pfad, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(session.anzahl_player(), 0);

    let (status, _) = anfrage(&app, "GET", &pfad, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    session.zerstoeren();
}

#[tokio::test]
async fn ungueltige_guild_id_ist_400() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}/players/abc", session.id().as_str());

    let (status, _) = anfrage(&app, "GET", &pfad, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    session.zerstoeren();
}

#[tokio::test]
async fn session_resume_wird_aktualisiert() {
    let (app, registry) = test_app();
    let session = registry.erstellen(1, "test-bot").unwrap();
    let pfad = format!("/v4/sessions/{}", session.id().as_str());

    let (status, konfig) = anfrage(&app, "PATCH", &pfad, Some(json!({ "resuming": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(konfig, json!({ "resuming": true, "timeout": 60 }));

    let (_, konfig) = anfrage(&app, "PATCH", &pfad, Some(json!({ "timeout": 120 }))).await;
    assert_eq!(konfig, json!({ "resuming": true, "timeout": 120 }));

    session.zerstoeren();
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[tokio::test]
async fn info_nennt_quellen_und_filter() {
    let (app, _) = test_app();
    let (status, info) = anfrage(&app, "GET", "/v4/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["version"]["semver"], env!("CARGO_PKG_VERSION"));

    let quellen: Vec<&str> = info["sourceManagers"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(quellen.contains(&"speicher"));

    let filter: Vec<&str> = info["filters"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(filter.contains(&"volume"));
    assert!(!filter.contains(&"karaoke"));
}

#[tokio::test]
async fn stats_ohne_frame_stats() {
    let (app, _) = test_app();
    let (status, stats) = anfrage(&app, "GET", "/v4/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["players"], 0);
    assert_eq!(stats["playingPlayers"], 0);
    assert!(stats.get("frameStats").is_none());
    assert!(stats["cpu"]["cores"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn websocket_ohne_upgrade_ist_400() {
    let (app, _) = test_app();
    let (status, _) = anfrage(&app, "GET", "/v4/websocket", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
