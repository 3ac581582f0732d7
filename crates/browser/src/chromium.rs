//! Default [`BrowserDriver`]/[`DriverProcess`]/[`DriverPage`] implementation
//! backed by `chromiumoxide`. This is the one place in the crate that
//! imports `chromiumoxide` types directly; everything above the driver
//! trait boundary is driver-agnostic (spec §1).

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chromiumoxide::{
    Browser, BrowserConfig as CdpBrowserConfig, Page,
    cdp::browser_protocol::{
        input::{
            DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
            DispatchMouseEventType, MouseButton,
        },
        network::{CookieParam, DeleteCookiesParams},
        page::{CaptureScreenshotFormat, PrintToPdfParams},
    },
};
use futures::StreamExt;
use serde_json::Value;
use tokio::time::{Duration, timeout};
use tracing::warn;

use crate::{
    driver::{BrowserDriver, DriverPage, DriverProcess},
    error::BrowserError,
    types::{HealthSample, LaunchOptions, PageOptions, Viewport},
};

/// The production driver: launches a real Chrome/Chromium process per
/// [`BrowserDriver::launch`] call.
pub struct ChromiumDriver;

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn launch(
        &self,
        options: &LaunchOptions,
    ) -> Result<Box<dyn DriverProcess>, BrowserError> {
        let mut builder = CdpBrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable_path {
            builder = builder.chrome_executable(path);
        }
        for arg in &options.args {
            builder = builder.arg(arg.clone());
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        // chromiumoxide requires its event handler be polled continuously.
        tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Box::new(ChromiumProcess { browser }))
    }
}

struct ChromiumProcess {
    browser: Browser,
}

#[async_trait]
impl DriverProcess for ChromiumProcess {
    async fn new_page(&self, options: &PageOptions) -> Result<Box<dyn DriverPage>, BrowserError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;

        if let Some(viewport) = options.viewport {
            let _ = set_viewport(&page, viewport).await;
        }
        if let Some(ua) = &options.user_agent {
            let _ = page.set_user_agent(ua).await;
        }

        Ok(Box::new(ChromiumPage { page }))
    }

    async fn health_check(&self) -> Result<HealthSample, BrowserError> {
        match timeout(Duration::from_secs(2), self.browser.version()).await {
            Ok(Ok(_)) => Ok(HealthSample {
                reachable: true,
                consecutive_failures: 0,
                memory_bytes: None,
                cpu_percent: None,
            }),
            _ => Ok(HealthSample {
                reachable: false,
                consecutive_failures: 1,
                memory_bytes: None,
                cpu_percent: None,
            }),
        }
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut browser = self.browser.clone();
        browser
            .close()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }
}

struct ChromiumPage {
    page: Page,
}

async fn set_viewport(page: &Page, viewport: Viewport) -> Result<(), BrowserError> {
    page.set_viewport(chromiumoxide::handler::viewport::Viewport {
        width: viewport.width,
        height: viewport.height,
        device_scale_factor: viewport.device_scale_factor,
        ..Default::default()
    })
    .await
    .map_err(|e| BrowserError::Cdp(e.to_string()))?;
    Ok(())
}

#[async_trait]
impl DriverPage for ChromiumPage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?
            .unwrap_or_default())
    }

    async fn title(&self) -> Result<String, BrowserError> {
        Ok(self
            .page
            .get_title()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?
            .unwrap_or_default())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .click()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        for c in text.chars() {
            let key_down = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyDown)
                .text(c.to_string())
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(key_down)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            let key_up = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::KeyUp)
                .text(c.to_string())
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(key_up)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        }
        Ok(())
    }

    async fn select(&self, selector: &str, values: &[String]) -> Result<(), BrowserError> {
        let js = format!(
            "(() => {{ const el = document.querySelector({selector:?}); if (!el) return false; \
             const values = {values:?}; for (const o of el.options) {{ o.selected = values.includes(o.value); }} \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); return true; }})()",
        );
        self.page
            .evaluate(js.as_str())
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), BrowserError> {
        let key_down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key)
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        self.page
            .execute(key_down)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        let key_up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        self.page
            .execute(key_up)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }

    async fn mouse_move_and_click(&self, x: f64, y: f64, click: bool) -> Result<(), BrowserError> {
        if click {
            let press = DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MousePressed)
                .x(x)
                .y(y)
                .button(MouseButton::Left)
                .click_count(1)
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(press)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            let release = DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MouseReleased)
                .x(x)
                .y(y)
                .button(MouseButton::Left)
                .click_count(1)
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(release)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        } else {
            let mv = DispatchMouseEventParams::builder()
                .r#type(DispatchMouseEventType::MouseMoved)
                .x(x)
                .y(y)
                .build()
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
            self.page
                .execute(mv)
                .await
                .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        }
        Ok(())
    }

    async fn scroll(&self, selector: Option<&str>, x: f64, y: f64) -> Result<(), BrowserError> {
        let js = match selector {
            Some(sel) => format!(
                "(() => {{ const el = document.querySelector({sel:?}); if (el) el.scrollBy({x}, {y}); return !!el; }})()"
            ),
            None => format!("window.scrollBy({x}, {y}); true"),
        };
        self.page
            .evaluate(js.as_str())
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
        Ok(())
    }

    async fn screenshot(
        &self,
        full_page: bool,
        selector: Option<&str>,
    ) -> Result<Vec<u8>, BrowserError> {
        if let Some(sel) = selector {
            let element = self
                .page
                .find_element(sel)
                .await
                .map_err(|_| BrowserError::ElementNotFound(sel.to_string()))?;
            return element
                .screenshot(CaptureScreenshotFormat::Png)
                .await
                .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()));
        }
        self.page
            .screenshot(
                chromiumoxide::page::ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(full_page)
                    .build(),
            )
            .await
            .map_err(|e| BrowserError::ScreenshotFailed(e.to_string()))
    }

    async fn pdf(&self, landscape: bool) -> Result<Vec<u8>, BrowserError> {
        let params = PrintToPdfParams::builder().landscape(landscape).build();
        self.page
            .pdf(params)
            .await
            .map_err(|e| BrowserError::Other {
                source: Box::new(e),
            })
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        timeout(
            Duration::from_millis(timeout_ms),
            self.page.find_element(selector),
        )
        .await
        .map_err(|_| BrowserError::Timeout(format!("waiting for {selector}")))?
        .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        Ok(())
    }

    async fn wait_for_navigation(&self, timeout_ms: u64) -> Result<(), BrowserError> {
        timeout(
            Duration::from_millis(timeout_ms),
            self.page.wait_for_navigation(),
        )
        .await
        .map_err(|_| BrowserError::Timeout("waiting for navigation".into()))?
        .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn wait_for_function(&self, function: &str, timeout_ms: u64) -> Result<(), BrowserError> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let result: Result<Value, _> = self.page.evaluate(function).await.map(|r| {
                r.into_value().unwrap_or(Value::Null)
            });
            if matches!(result, Ok(Value::Bool(true))) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!("waiting for {function}")));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))
    }

    async fn inject_script(&self, script: &str) -> Result<(), BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
        Ok(())
    }

    async fn inject_css(&self, css: &str) -> Result<(), BrowserError> {
        let escaped = css.replace('`', "\\`");
        let js = format!(
            "(() => {{ const s = document.createElement('style'); s.textContent = `{escaped}`; \
             document.head.appendChild(s); return true; }})()"
        );
        self.page
            .evaluate(js.as_str())
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?;
        Ok(())
    }

    async fn upload_files(&self, selector: &str, paths: &[String]) -> Result<(), BrowserError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .set_input_files(paths.to_vec())
            .await
            .map_err(|e| BrowserError::Other {
                source: Box::new(e),
            })?;
        Ok(())
    }

    async fn set_cookie(
        &self,
        name: &str,
        value: &str,
        domain: Option<&str>,
        path: Option<&str>,
    ) -> Result<(), BrowserError> {
        let mut builder = CookieParam::builder().name(name).value(value);
        if let Some(d) = domain {
            builder = builder.domain(d);
        }
        if let Some(p) = path {
            builder = builder.path(p);
        }
        let param = builder
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        self.page
            .set_cookie(param)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }

    async fn get_cookies(&self, name: Option<&str>) -> Result<Value, BrowserError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        let filtered: Vec<_> = cookies
            .into_iter()
            .filter(|c| name.is_none_or(|n| c.name == n))
            .collect();
        serde_json::to_value(filtered).map_err(|e| BrowserError::other(e))
    }

    async fn delete_cookie(&self, name: &str) -> Result<(), BrowserError> {
        let params = DeleteCookiesParams::builder()
            .name(name)
            .build()
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        self.page
            .execute(params)
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), BrowserError> {
        self.page
            .delete_cookies()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }

    async fn go_back(&self) -> Result<(), BrowserError> {
        self.page
            .go_back()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn go_forward(&self) -> Result<(), BrowserError> {
        self.page
            .go_forward()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn refresh(&self) -> Result<(), BrowserError> {
        self.page
            .reload()
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), BrowserError> {
        set_viewport(&self.page, viewport).await
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.page
            .close()
            .await
            .map_err(|e| BrowserError::Cdp(e.to_string()))?;
        Ok(())
    }
}

#[allow(dead_code)]
fn encode_png(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(bytes))
}
