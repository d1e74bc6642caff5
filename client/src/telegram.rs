use js_sys::{Array, Function, Reflect};
use ludic_shared::{Host, HostError, HostUser};
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;

/// `window.Telegram.WebApp`, or nothing when the page runs outside Telegram.
#[derive(Clone)]
pub struct TelegramHost {
    web_app: Option<JsValue>,
}

impl TelegramHost {
    pub fn from_window() -> Self {
        let web_app = web_sys::window()
            .and_then(|window| property(window.as_ref(), "Telegram"))
            .and_then(|telegram| property(&telegram, "WebApp"));
        Self { web_app }
    }

    fn web_app(&self, capability: &'static str) -> Result<&JsValue, HostError> {
        self.web_app
            .as_ref()
            .ok_or(HostError::Unavailable(capability))
    }
}

/// Defined, non-null property of a JS object.
fn property(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

fn invoke(
    target: &JsValue,
    method: &str,
    capability: &'static str,
    args: &Array,
) -> Result<JsValue, HostError> {
    let function = property(target, method)
        .and_then(|value| value.dyn_into::<Function>().ok())
        .ok_or(HostError::Unavailable(capability))?;
    function
        .apply(target, args)
        .map_err(|err| HostError::Failed {
            capability,
            message: err
                .as_string()
                .or_else(|| property(&err, "message").and_then(|m| m.as_string()))
                .unwrap_or_else(|| "unknown error".to_owned()),
        })
}

impl Host for TelegramHost {
    fn expand(&self) -> Result<(), HostError> {
        invoke(self.web_app("expand")?, "expand", "expand", &Array::new()).map(|_| ())
    }

    fn close(&self) -> Result<(), HostError> {
        invoke(self.web_app("close")?, "close", "close", &Array::new()).map(|_| ())
    }

    fn init_data(&self) -> Option<String> {
        self.web_app
            .as_ref()
            .and_then(|web_app| property(web_app, "initData"))
            .and_then(|value| value.as_string())
    }

    fn user(&self) -> Option<HostUser> {
        let user = self
            .web_app
            .as_ref()
            .and_then(|web_app| property(web_app, "initDataUnsafe"))
            .and_then(|unsafe_data| property(&unsafe_data, "user"))?;
        serde_wasm_bindgen::from_value(user).ok()
    }

    fn show_back_button(&self, on_click: Box<dyn Fn()>) -> Result<(), HostError> {
        let back_button = property(self.web_app("BackButton")?, "BackButton")
            .ok_or(HostError::Unavailable("BackButton"))?;
        invoke(&back_button, "show", "BackButton.show", &Array::new())?;

        let handler = Closure::wrap(on_click);
        let args = Array::of1(handler.as_ref());
        invoke(&back_button, "onClick", "BackButton.onClick", &args)?;
        // Registered for the lifetime of the page.
        handler.forget();
        Ok(())
    }
}
