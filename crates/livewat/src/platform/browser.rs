//! Browser bindings: DOM surfaces, `requestAnimationFrame` and `WebAssembly.instantiate`.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use js_sys::{Function, Object, Reflect, WebAssembly};
use log::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{HtmlElement, Window};

use crate::assembler::WatAssembler;
use crate::config::HostConfig;
use crate::cycle::{CycleId, LiveHost};
use crate::diagnostic::Diagnostic;
use crate::error::Outcome;
use crate::execution::{ENTRY_POINT, EntryPoint, Sandbox};
use crate::output::{OutputSink, render};
use crate::scheduler::{FrameCallback, FrameScheduler, FrameSource, Spawner};
use crate::source::SourceSurface;
use crate::value::Value;

/// Element whose rendered text is the program.
pub struct ElementSource {
    element: HtmlElement,
}

impl ElementSource {
    pub fn new(element: HtmlElement) -> Self {
        Self { element }
    }
}

impl SourceSurface for ElementSource {
    fn read(&self) -> Option<String> {
        Some(self.element.inner_text())
    }
}

/// Element receiving the outcome.
///
/// Sets `data-status` to `ok` or `error` so failures can be styled apart.
pub struct ElementSink {
    element: HtmlElement,
    error_prefix: String,
}

impl ElementSink {
    pub fn new(element: HtmlElement, error_prefix: impl Into<String>) -> Self {
        Self {
            element,
            error_prefix: error_prefix.into(),
        }
    }
}

impl OutputSink for ElementSink {
    fn report(&self, _cycle: CycleId, outcome: &Outcome) {
        let rendered = render(outcome, &self.error_prefix);
        self.element.set_inner_text(&rendered.text);
        let status = if rendered.is_error { "error" } else { "ok" };
        if let Err(error) = self.element.set_attribute("data-status", status) {
            warn!("Failed to set output status: {error:?}");
        }
    }
}

pub struct AnimationFrames {
    window: Window,
}

impl AnimationFrames {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl FrameSource for AnimationFrames {
    fn request_frame(&self, callback: FrameCallback) {
        let closure = Closure::once_into_js(move || callback());
        if let Err(error) = self.window.request_animation_frame(closure.unchecked_ref()) {
            warn!("requestAnimationFrame failed: {error:?}");
        }
    }
}

/// Spawns cycles as microtasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTasks;

impl Spawner for LocalTasks {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        wasm_bindgen_futures::spawn_local(task);
    }
}

/// The page's own `WebAssembly` engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebAssemblySandbox;

pub struct BrowserInstance {
    main: Function,
}

impl Sandbox for WebAssemblySandbox {
    type Instance = BrowserInstance;

    async fn instantiate(&self, bytes: Vec<u8>) -> Result<BrowserInstance, Diagnostic> {
        let promise = WebAssembly::instantiate_buffer(&bytes, &Object::new());
        let source = JsFuture::from(promise).await.map_err(describe_js_error)?;
        let instance = property(&source, "instance")?;
        let exports = property(&instance, "exports")?;
        let main = property(&exports, ENTRY_POINT)?;
        if main.is_undefined() {
            return Err(Diagnostic::new(format!(
                "module does not export a `{ENTRY_POINT}` function"
            )));
        }
        let main = main
            .dyn_into::<Function>()
            .map_err(|_| Diagnostic::new(format!("export `{ENTRY_POINT}` is not a function")))?;
        Ok(BrowserInstance { main })
    }
}

impl EntryPoint for BrowserInstance {
    async fn call_main(&mut self) -> Result<Value, Diagnostic> {
        let result = self
            .main
            .call0(&JsValue::UNDEFINED)
            .map_err(describe_js_error)?;
        Ok(to_value(result))
    }
}

fn property(target: &JsValue, key: &str) -> Result<JsValue, Diagnostic> {
    Reflect::get(target, &JsValue::from_str(key)).map_err(describe_js_error)
}

fn to_value(result: JsValue) -> Value {
    if result.is_undefined() {
        return Value::Void;
    }
    if let Some(number) = result.as_f64() {
        return Value::F64(number);
    }
    if result.is_bigint() {
        if let Ok(number) = i64::try_from(result.clone()) {
            return Value::I64(number);
        }
    }
    if let Some(values) = result.dyn_ref::<js_sys::Array>() {
        return Value::Multiple(values.iter().map(to_value).collect());
    }
    Value::Reference(result.as_string().unwrap_or_else(|| format!("{result:?}")))
}

fn describe_js_error(error: JsValue) -> Diagnostic {
    match error.dyn_ref::<js_sys::Error>() {
        Some(error) => Diagnostic::new(String::from(error.to_string())),
        None => Diagnostic::new(error.as_string().unwrap_or_else(|| format!("{error:?}"))),
    }
}

fn element_by_id(window: &Window, id: &str) -> Result<HtmlElement, JsValue> {
    window
        .document()
        .ok_or_else(|| JsValue::from_str("window has no document"))?
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id `{id}`")))?
        .dyn_into::<HtmlElement>()
        .map_err(|_| JsValue::from_str(&format!("element `{id}` is not an HTML element")))
}

/// Watch the text of `#source_id` and write outcomes into `#output_id`.
#[wasm_bindgen]
pub fn start(source_id: &str, output_id: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let config = HostConfig::default();
    let host = Rc::new(LiveHost::new(
        ElementSource::new(element_by_id(&window, source_id)?),
        WatAssembler,
        WebAssemblySandbox,
        ElementSink::new(element_by_id(&window, output_id)?, config.error_prefix.clone()),
        &config,
    ));
    FrameScheduler::new(host, AnimationFrames::new(window), LocalTasks).start();
    Ok(())
}
