use std::io::Cursor;
use std::time::Duration;

use httpmock::prelude::*;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use pixchat_contracts::conversation::Turn;
use pixchat_contracts::events::EventWriter;
use pixchat_contracts::settings::{Dimension, ModelKind};
use pixchat_engine::{EndpointConfig, SessionController, SessionPhase, TurnOutcome};
use serde_json::{json, Value};

fn png_bytes(width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
    let image = RgbaImage::from_pixel(width, height, Rgba([20, 120, 220, 255]));
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(image).write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
    Ok(out)
}

#[test]
fn photorealistic_prompt_round_trip_over_http() -> anyhow::Result<()> {
    let base = MockServer::start();
    let tuned = MockServer::start();
    let png = png_bytes(16, 16)?;

    let probe = base.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).body("{\"status\":\"ok\"}");
    });
    let generate = base.mock(|when, then| {
        when.method(POST).path("/generate-image/").json_body(json!({
            "prompt": "a red fox in snow",
            "negative_prompt": "blurry, low quality, distorted, deformed",
            "num_inference_steps": 70,
            "guidance_scale": 8.5,
            "width": 768,
            "height": 512,
            "model": "Base"
        }));
        then.status(200).header("content-type", "image/png").body(&png);
    });
    let tuned_hits = tuned.mock(|when, then| {
        when.any_request();
        then.status(500);
    });

    let temp = tempfile::tempdir()?;
    let events_path = temp.path().join("events.jsonl");
    let mut controller =
        SessionController::over_http(EndpointConfig::new(base.base_url(), tuned.base_url()))?
            .with_events(EventWriter::new(&events_path, "session-http"));
    controller.select_preset("photorealistic");
    controller.state_mut().width = Dimension::new(768)?;

    let mut phases = Vec::new();
    let outcome =
        controller.submit_with_progress("a red fox in snow", &mut |phase| phases.push(phase))?;

    probe.assert();
    generate.assert();
    tuned_hits.assert_hits(0);
    assert!(matches!(outcome, TurnOutcome::Succeeded { .. }));
    assert_eq!(phases.last(), Some(&SessionPhase::Idle));

    let store = controller.state().store();
    assert_eq!(store.success_count(), 1);
    let result = store.latest_result().expect("result turn");
    assert_eq!(result.image_bytes, png);
    assert_eq!(result.settings_used.size_label(), "768×512");
    assert_eq!(result.settings_used.model, ModelKind::Base);

    let artifact = result.download();
    assert_eq!(
        artifact.file_name,
        format!("generated_image_{}.png", result.timestamp)
    );
    let saved = artifact.save_in(temp.path())?;
    assert_eq!(std::fs::read(saved)?, png);

    let raw = std::fs::read_to_string(&events_path)?;
    let types: Vec<String> = raw
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|row| row.get("type").and_then(Value::as_str).map(str::to_string))
        .collect();
    assert_eq!(
        types,
        vec!["turn_submitted", "api_status", "generation_succeeded"]
    );
    Ok(())
}

#[test]
fn failing_probe_leaves_error_turn_without_generate_call() -> anyhow::Result<()> {
    let base = MockServer::start();
    let probe = base.mock(|when, then| {
        when.method(GET).path("/");
        then.status(502);
    });
    let generate = base.mock(|when, then| {
        when.method(POST).path("/generate-image/");
        then.status(200);
    });

    let mut controller = SessionController::over_http(
        EndpointConfig::new(base.base_url(), base.base_url())
            .with_probe_timeout(Duration::from_millis(500)),
    )?;
    let outcome = controller.submit("harbor at dusk")?;

    probe.assert();
    generate.assert_hits(0);
    assert!(matches!(outcome, TurnOutcome::Unreachable(_)));
    let turns = controller.state().store().all();
    assert_eq!(
        turns,
        &[
            Turn::User {
                text: "harbor at dusk".to_string()
            },
            Turn::AssistantError {
                text: "API Not Responding Correctly (502)".to_string()
            }
        ]
    );
    Ok(())
}

#[test]
fn service_error_body_is_shown_to_the_user() -> anyhow::Result<()> {
    let base = MockServer::start();
    base.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200);
    });
    base.mock(|when, then| {
        when.method(POST).path("/generate-image/");
        then.status(500).body("CUDA out of memory");
    });

    let mut controller =
        SessionController::over_http(EndpointConfig::new(base.base_url(), base.base_url()))?;
    controller.submit("harbor at dusk")?;

    let turns = controller.state().store().all();
    assert_eq!(turns[1].text(), "API Error: 500 - CUDA out of memory");
    assert_eq!(controller.state().store().success_count(), 0);
    Ok(())
}
