//! Render bridge via headless Chromium.
//!
//! Rasterizes an HTML/SVG fragment through headless Chrome and returns the
//! raster plus the dimensions the page measured, ready for
//! [`crate::placement::adapt`]. The bridge is a single-shot request: retry
//! and timeout policy belong to the caller.

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde::Deserialize;

use crate::image::ImageDimensions;
use crate::placement::RenderOutput;

/// Configuration for fragment rasterization.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Viewport width in pixels (default: 800).
    pub viewport_width: u32,
    /// Viewport height in pixels (default: 600).
    pub viewport_height: u32,
    /// Capture the full page height instead of just the viewport
    /// (default: true).
    pub full_page: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            full_page: true,
        }
    }
}

/// Errors that can occur while driving the browser.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Failed to launch headless Chrome.
    #[error("Chrome launch failed: {0}")]
    ChromeLaunch(String),

    /// Failed to load the fragment into a page.
    #[error("Page load failed: {0}")]
    PageLoad(String),

    /// Failed to capture the rendered raster.
    #[error("Capture failed: {0}")]
    Capture(String),
}

#[derive(Debug, Deserialize)]
struct MeasuredSize {
    width: u32,
    height: u32,
}

/// Rasterize an HTML fragment to PNG bytes using headless Chromium.
///
/// The fragment is wrapped in a minimal page with zero margins so the raster
/// contains only the fragment's own box. The returned [`RenderOutput`]
/// carries the content dimensions measured inside the page; callers feed it
/// to [`crate::placement::adapt`] for sniffing and fitting.
///
/// # Errors
///
/// Returns [`BridgeError`] if Chrome cannot be launched, the page fails to
/// load, or the capture fails.
pub async fn render_fragment(
    fragment: &str,
    config: &BridgeConfig,
) -> Result<RenderOutput, BridgeError> {
    let html = wrap_fragment(fragment);

    let browser_config = BrowserConfig::builder()
        .no_sandbox()
        .window_size(config.viewport_width, config.viewport_height)
        .build()
        .map_err(|e| BridgeError::ChromeLaunch(e.to_string()))?;

    let (mut browser, mut handler) = Browser::launch(browser_config)
        .await
        .map_err(|e| BridgeError::ChromeLaunch(e.to_string()))?;

    // Drive the handler on a background task
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    let result = capture(&browser, &html, config).await;

    // Clean up
    let _ = browser.close().await;
    let _ = handler_task.await;

    result
}

async fn capture(
    browser: &Browser,
    html: &str,
    config: &BridgeConfig,
) -> Result<RenderOutput, BridgeError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| BridgeError::PageLoad(e.to_string()))?;

    page.set_content(html)
        .await
        .map_err(|e| BridgeError::PageLoad(e.to_string()))?;

    let measured: Option<MeasuredSize> = page
        .evaluate(
            "({width: document.body.scrollWidth, height: document.body.scrollHeight})",
        )
        .await
        .ok()
        .and_then(|value| value.into_value().ok());

    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(config.full_page)
        .build();

    let bytes = page
        .screenshot(params)
        .await
        .map_err(|e| BridgeError::Capture(e.to_string()))?;

    Ok(RenderOutput {
        bytes,
        reported: measured.map(|m| ImageDimensions::new(m.width, m.height)),
        content_type: Some("image/png".to_string()),
    })
}

/// Wrap a bare fragment in a minimal page shell with zero margins.
fn wrap_fragment(fragment: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>html, body {{ margin: 0; padding: 0; background: #fff; }}</style>\n\
         </head>\n<body>{fragment}</body>\n</html>"
    )
}
