//! Canonical per-action-type handlers (spec §3 "Action" variants). Each
//! handler is `(action, pageHandle) -> ActionResult`, registered into the
//! dispatcher under its type tag (spec §4.4 "Dispatch registry").

use std::time::Instant;

use navigant_protocol::{ActionKind, ActionResult, CookieOp, WaitCondition};

use crate::{
    dispatcher::ActionDispatcher,
    error::ActionError,
};

macro_rules! register_handler {
    ($dispatcher:expr, $tag:expr, |$action:ident, $page:ident| $body:expr) => {
        $dispatcher.register(
            $tag,
            Box::new(move |$action, $page| Box::pin(async move { $body })),
        );
    };
}

pub fn register_defaults(dispatcher: &mut ActionDispatcher) {
    register_handler!(dispatcher, "navigate", |action, page| {
        let start = Instant::now();
        let ActionKind::Navigate { url, .. } = &action.kind else {
            return Err(ActionError::UnsupportedAction("navigate".into()));
        };
        page.handle.navigate(url).await.map_err(ActionError::from)?;
        let url = page.handle.current_url().await.unwrap_or_else(|_| url.clone());
        Ok(ActionResult::ok(
            "navigate",
            serde_json::json!({ "url": url }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "click", |action, page| {
        let start = Instant::now();
        let ActionKind::Click { selector, .. } = &action.kind else {
            return Err(ActionError::UnsupportedAction("click".into()));
        };
        page.handle.click(selector).await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "click",
            serde_json::json!({ "selector": selector }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "type", |action, page| {
        let start = Instant::now();
        let ActionKind::Type { selector, text, .. } = &action.kind else {
            return Err(ActionError::UnsupportedAction("type".into()));
        };
        page.handle
            .type_text(selector, text)
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "type",
            serde_json::json!({ "selector": selector }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "select", |action, page| {
        let start = Instant::now();
        let ActionKind::Select { selector, values } = &action.kind else {
            return Err(ActionError::UnsupportedAction("select".into()));
        };
        page.handle
            .select(selector, values)
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "select",
            serde_json::json!({ "selector": selector, "values": values }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "keyboard", |action, page| {
        let start = Instant::now();
        let ActionKind::Keyboard { key, .. } = &action.kind else {
            return Err(ActionError::UnsupportedAction("keyboard".into()));
        };
        page.handle.press_key(key).await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "keyboard",
            serde_json::json!({ "key": key }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "mouse", |action, page| {
        let start = Instant::now();
        let ActionKind::Mouse { x, y, action: mouse_action } = &action.kind else {
            return Err(ActionError::UnsupportedAction("mouse".into()));
        };
        let click = mouse_action.as_deref() == Some("click");
        page.handle
            .mouse_move_and_click(*x, *y, click)
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "mouse",
            serde_json::json!({ "x": x, "y": y }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "screenshot", |action, page| {
        let start = Instant::now();
        let ActionKind::Screenshot { full_page, selector } = &action.kind else {
            return Err(ActionError::UnsupportedAction("screenshot".into()));
        };
        let bytes = page
            .handle
            .screenshot(*full_page, selector.as_deref())
            .await
            .map_err(ActionError::from)?;
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
        Ok(ActionResult::ok(
            "screenshot",
            serde_json::json!({ "data": encoded, "encoding": "base64" }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "pdf", |action, page| {
        let start = Instant::now();
        let ActionKind::Pdf { landscape } = &action.kind else {
            return Err(ActionError::UnsupportedAction("pdf".into()));
        };
        let bytes = page.handle.pdf(*landscape).await.map_err(ActionError::from)?;
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
        Ok(ActionResult::ok(
            "pdf",
            serde_json::json!({ "data": encoded, "encoding": "base64" }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "wait", |action, page| {
        let start = Instant::now();
        let ActionKind::Wait { condition } = &action.kind else {
            return Err(ActionError::UnsupportedAction("wait".into()));
        };
        let timeout_ms = action.timeout_ms.unwrap_or(30_000);
        match condition {
            WaitCondition::Selector { selector } => {
                page.handle
                    .wait_for_selector(selector, timeout_ms)
                    .await
                    .map_err(ActionError::from)?;
            },
            WaitCondition::Navigation {} => {
                page.handle
                    .wait_for_navigation(timeout_ms)
                    .await
                    .map_err(ActionError::from)?;
            },
            WaitCondition::Timeout { duration_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(*duration_ms)).await;
            },
            WaitCondition::Function { function } => {
                page.handle
                    .wait_for_function(function, timeout_ms)
                    .await
                    .map_err(ActionError::from)?;
            },
        }
        Ok(ActionResult::ok(
            "wait",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "scroll", |action, page| {
        let start = Instant::now();
        let ActionKind::Scroll { selector, x, y } = &action.kind else {
            return Err(ActionError::UnsupportedAction("scroll".into()));
        };
        page.handle
            .scroll(selector.as_deref(), *x, *y)
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "scroll",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "evaluate", |action, page| {
        let start = Instant::now();
        let ActionKind::Evaluate { script } = &action.kind else {
            return Err(ActionError::UnsupportedAction("evaluate".into()));
        };
        let value = page.handle.evaluate(script).await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "evaluate",
            serde_json::json!({ "result": value }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "injectScript", |action, page| {
        let start = Instant::now();
        let ActionKind::InjectScript { script } = &action.kind else {
            return Err(ActionError::UnsupportedAction("injectScript".into()));
        };
        page.handle
            .inject_script(script)
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "injectScript",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "injectCSS", |action, page| {
        let start = Instant::now();
        let ActionKind::InjectCss { css } = &action.kind else {
            return Err(ActionError::UnsupportedAction("injectCSS".into()));
        };
        page.handle.inject_css(css).await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "injectCSS",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "upload", |action, page| {
        let start = Instant::now();
        let ActionKind::Upload { selector, file_paths } = &action.kind else {
            return Err(ActionError::UnsupportedAction("upload".into()));
        };
        page.handle
            .upload_files(selector, file_paths)
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "upload",
            serde_json::json!({ "files": file_paths.len() }),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "cookie", |action, page| {
        let start = Instant::now();
        let ActionKind::Cookie { op } = &action.kind else {
            return Err(ActionError::UnsupportedAction("cookie".into()));
        };
        let data = match op {
            CookieOp::Set { name, value, domain, path } => {
                page.handle
                    .set_cookie(name, value, domain.as_deref(), path.as_deref())
                    .await
                    .map_err(ActionError::from)?;
                serde_json::json!({})
            },
            CookieOp::Get { name } => page
                .handle
                .get_cookies(name.as_deref())
                .await
                .map_err(ActionError::from)?,
            CookieOp::Delete { name } => {
                page.handle.delete_cookie(name).await.map_err(ActionError::from)?;
                serde_json::json!({})
            },
            CookieOp::Clear {} => {
                page.handle.clear_cookies().await.map_err(ActionError::from)?;
                serde_json::json!({})
            },
        };
        Ok(ActionResult::ok(
            "cookie",
            data,
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "goBack", |_action, page| {
        let start = Instant::now();
        page.handle.go_back().await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "goBack",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "goForward", |_action, page| {
        let start = Instant::now();
        page.handle.go_forward().await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "goForward",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "refresh", |_action, page| {
        let start = Instant::now();
        page.handle.refresh().await.map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "refresh",
            serde_json::json!({}),
            start.elapsed().as_millis() as u64,
        ))
    });

    register_handler!(dispatcher, "setViewport", |action, page| {
        let start = Instant::now();
        let ActionKind::SetViewport { width, height, device_scale_factor } = &action.kind else {
            return Err(ActionError::UnsupportedAction("setViewport".into()));
        };
        page.handle
            .set_viewport(navigant_browser::Viewport {
                width: *width,
                height: *height,
                device_scale_factor: *device_scale_factor,
            })
            .await
            .map_err(ActionError::from)?;
        Ok(ActionResult::ok(
            "setViewport",
            serde_json::json!({ "width": width, "height": height }),
            start.elapsed().as_millis() as u64,
        ))
    });
}
