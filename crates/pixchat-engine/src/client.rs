use std::error::Error as StdError;
use std::io::Cursor;

use anyhow::{Context, Result};
use image::ImageFormat;
use pixchat_contracts::generation::{GenerationError, GenerationRequest, GENERATE_PATH};
use pixchat_contracts::settings::{GenerationSettings, ModelKind};
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::config::EndpointConfig;

const ERROR_BODY_MAX_CHARS: usize = 512;

/// PNG bytes of a generated image plus its decoded size.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One generation attempt. No retries; the caller decides whether to
/// resubmit.
pub trait ImageGenerator {
    fn generate(&self, settings: &GenerationSettings) -> Result<GeneratedImage, GenerationError>;
}

pub struct HttpGenerationClient {
    endpoints: EndpointConfig,
    http: HttpClient,
}

impl HttpGenerationClient {
    pub fn new(endpoints: EndpointConfig) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(endpoints.generation_timeout)
            .build()
            .context("failed to build generation HTTP client")?;
        Ok(Self { endpoints, http })
    }

    pub fn generate_url(&self, model: ModelKind) -> String {
        format!("{}{}", self.endpoints.endpoint_for(model), GENERATE_PATH)
    }
}

impl ImageGenerator for HttpGenerationClient {
    fn generate(&self, settings: &GenerationSettings) -> Result<GeneratedImage, GenerationError> {
        let url = self.generate_url(settings.model);
        let body = GenerationRequest::from(settings);
        info!(
            %url,
            model = %settings.model,
            steps = body.num_inference_steps,
            guidance_scale = body.guidance_scale,
            width = body.width,
            height = body.height,
            "requesting image generation"
        );

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .map_err(|err| classify_transport_error(&url, err))?;
        let status = response.status();
        if status != StatusCode::OK {
            let text = response
                .text()
                .map_err(|err| classify_transport_error(&url, err))?;
            warn!(%url, status = status.as_u16(), "generation service returned an error");
            return Err(GenerationError::ServiceError {
                status_code: status.as_u16(),
                body: truncate_text(&text, ERROR_BODY_MAX_CHARS),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|err| classify_transport_error(&url, err))?;
        normalize_image(&bytes)
    }
}

fn classify_transport_error(url: &str, err: reqwest::Error) -> GenerationError {
    let classified = if err.is_timeout() {
        GenerationError::Timeout
    } else if err.is_connect() {
        GenerationError::Unreachable
    } else {
        GenerationError::Unknown {
            message: error_chain_text(&err, ERROR_BODY_MAX_CHARS),
        }
    };
    warn!(%url, error = %err, kind = classified.kind_label(), "generation request failed");
    classified
}

/// Validates the body as an image and hands back PNG bytes. PNG input is
/// passed through untouched; other formats are re-encoded.
fn normalize_image(bytes: &[u8]) -> Result<GeneratedImage, GenerationError> {
    let format = image::guess_format(bytes).map_err(|err| GenerationError::InvalidResponse {
        detail: err.to_string(),
    })?;
    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|err| {
        GenerationError::InvalidResponse {
            detail: err.to_string(),
        }
    })?;
    let (width, height) = (decoded.width(), decoded.height());
    if format == ImageFormat::Png {
        return Ok(GeneratedImage {
            bytes: bytes.to_vec(),
            width,
            height,
        });
    }

    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| GenerationError::Unknown {
            message: format!("failed to re-encode image as PNG: {err}"),
        })?;
    Ok(GeneratedImage {
        bytes: png,
        width,
        height,
    })
}

fn error_chain_text(err: &(dyn StdError + 'static), max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current = Some(err);
    while let Some(cause) = current {
        let text = cause.to_string();
        let trimmed = text.trim();
        if !trimmed.is_empty()
            && !parts
                .last()
                .map(|existing| existing == trimmed)
                .unwrap_or(false)
        {
            parts.push(trimmed.to_string());
        }
        current = cause.source();
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use httpmock::prelude::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use pixchat_contracts::generation::{GenerationError, GenerationErrorKind};
    use pixchat_contracts::settings::{
        Dimension, GenerationSettings, GuidanceScale, ModelKind, Steps,
    };
    use serde_json::json;

    use super::{truncate_text, HttpGenerationClient, ImageGenerator};
    use crate::config::EndpointConfig;

    fn encoded(format: ImageFormat) -> anyhow::Result<Vec<u8>> {
        let image = RgbImage::from_pixel(8, 6, Rgb([200, 40, 40]));
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut out), format)?;
        Ok(out)
    }

    fn settings(model: ModelKind) -> anyhow::Result<GenerationSettings> {
        Ok(GenerationSettings {
            model,
            prompt: "a red fox in snow".to_string(),
            negative_prompt: "blurry".to_string(),
            steps: Steps::new(70)?,
            guidance_scale: GuidanceScale::new(8.5)?,
            width: Dimension::new(512)?,
            height: Dimension::new(768)?,
        })
    }

    fn client_for(
        base: &str,
        finetuned: &str,
        timeout: Duration,
    ) -> anyhow::Result<HttpGenerationClient> {
        HttpGenerationClient::new(
            EndpointConfig::new(base, finetuned).with_generation_timeout(timeout),
        )
    }

    #[test]
    fn png_response_is_returned_as_is() -> anyhow::Result<()> {
        let base = MockServer::start();
        let tuned = MockServer::start();
        let png = encoded(ImageFormat::Png)?;
        let base_mock = base.mock(|when, then| {
            when.method(POST).path("/generate-image/").json_body(json!({
                "prompt": "a red fox in snow",
                "negative_prompt": "blurry",
                "num_inference_steps": 70,
                "guidance_scale": 8.5,
                "width": 512,
                "height": 768,
                "model": "Base",
            }));
            then.status(200).header("content-type", "image/png").body(&png);
        });
        let tuned_mock = tuned.mock(|when, then| {
            when.any_request();
            then.status(200).body(&png);
        });

        let client = client_for(&base.base_url(), &tuned.base_url(), Duration::from_secs(5))?;
        let image = client.generate(&settings(ModelKind::Base)?)?;

        base_mock.assert();
        tuned_mock.assert_hits(0);
        assert_eq!(image.bytes, png);
        assert_eq!((image.width, image.height), (8, 6));
        Ok(())
    }

    #[test]
    fn fine_tuned_model_targets_its_own_endpoint() -> anyhow::Result<()> {
        let base = MockServer::start();
        let tuned = MockServer::start();
        let png = encoded(ImageFormat::Png)?;
        let tuned_mock = tuned.mock(|when, then| {
            when.method(POST)
                .path("/generate-image/")
                .body_contains("\"model\":\"Fine-tuned\"");
            then.status(200).body(&png);
        });

        let client = client_for(&base.base_url(), &tuned.base_url(), Duration::from_secs(5))?;
        assert_eq!(
            client.generate_url(ModelKind::FineTuned),
            format!("{}/generate-image/", tuned.base_url())
        );
        client.generate(&settings(ModelKind::FineTuned)?)?;

        tuned_mock.assert();
        Ok(())
    }

    #[test]
    fn non_png_images_are_re_encoded_as_png() -> anyhow::Result<()> {
        let server = MockServer::start();
        let jpeg = encoded(ImageFormat::Jpeg)?;
        server.mock(|when, then| {
            when.method(POST).path("/generate-image/");
            then.status(200).header("content-type", "image/jpeg").body(&jpeg);
        });

        let client = client_for(&server.base_url(), &server.base_url(), Duration::from_secs(5))?;
        let image = client.generate(&settings(ModelKind::Base)?)?;

        assert_eq!(image::guess_format(&image.bytes)?, ImageFormat::Png);
        assert_eq!((image.width, image.height), (8, 6));
        Ok(())
    }

    #[test]
    fn non_image_body_is_invalid_response() -> anyhow::Result<()> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/generate-image/");
            then.status(200)
                .header("content-type", "application/json")
                .body("{\"detail\":\"queued\"}");
        });

        let client = client_for(&server.base_url(), &server.base_url(), Duration::from_secs(5))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(
            err.as_ref().map(GenerationError::kind),
            Some(GenerationErrorKind::InvalidResponse)
        );
        Ok(())
    }

    #[test]
    fn truncated_png_is_invalid_response() -> anyhow::Result<()> {
        let server = MockServer::start();
        let png = encoded(ImageFormat::Png)?;
        let truncated = png[..png.len() / 2].to_vec();
        server.mock(|when, then| {
            when.method(POST).path("/generate-image/");
            then.status(200).body(&truncated);
        });

        let client = client_for(&server.base_url(), &server.base_url(), Duration::from_secs(5))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(
            err.as_ref().map(GenerationError::kind),
            Some(GenerationErrorKind::InvalidResponse)
        );
        Ok(())
    }

    #[test]
    fn error_status_carries_code_and_body() -> anyhow::Result<()> {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/generate-image/");
            then.status(500).body("CUDA out of memory");
        });

        let client = client_for(&server.base_url(), &server.base_url(), Duration::from_secs(5))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(
            err,
            Some(GenerationError::ServiceError {
                status_code: 500,
                body: "CUDA out of memory".to_string()
            })
        );
        Ok(())
    }

    #[test]
    fn slow_service_times_out() -> anyhow::Result<()> {
        let server = MockServer::start();
        let png = encoded(ImageFormat::Png)?;
        server.mock(|when, then| {
            when.method(POST).path("/generate-image/");
            then.status(200).body(&png).delay(Duration::from_secs(3));
        });

        let client = client_for(&server.base_url(), &server.base_url(), Duration::from_millis(300))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(err, Some(GenerationError::Timeout));
        Ok(())
    }

    #[test]
    fn stalled_error_body_times_out() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let endpoint = format!("http://{}", listener.local_addr()?);
        let server = thread::spawn(move || -> std::io::Result<()> {
            let (mut stream, _) = listener.accept()?;
            let mut request = [0u8; 4096];
            let _ = stream.read(&mut request)?;
            stream.write_all(
                b"HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\nContent-Length: 100\r\n\r\nbusy",
            )?;
            stream.flush()?;
            thread::sleep(Duration::from_secs(2));
            Ok(())
        });

        let client = client_for(&endpoint, &endpoint, Duration::from_millis(300))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(err, Some(GenerationError::Timeout));
        let _ = server.join();
        Ok(())
    }

    #[test]
    fn refused_connection_is_unreachable() -> anyhow::Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let endpoint = format!("http://{}", listener.local_addr()?);
        drop(listener);

        let client = client_for(&endpoint, &endpoint, Duration::from_secs(5))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(err, Some(GenerationError::Unreachable));
        Ok(())
    }

    #[test]
    fn malformed_endpoint_is_unknown_not_a_panic() -> anyhow::Result<()> {
        let client = client_for("not a url", "not a url", Duration::from_secs(1))?;
        let err = client.generate(&settings(ModelKind::Base)?).err();

        assert_eq!(
            err.as_ref().map(GenerationError::kind),
            Some(GenerationErrorKind::Unknown)
        );
        Ok(())
    }

    #[test]
    fn truncate_text_marks_cut_bodies() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc…");
    }
}
