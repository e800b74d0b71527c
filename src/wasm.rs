#![cfg(target_arch = "wasm32")]

use crate::algorithms::obstacles::ObstacleSpec;
use crate::config::WorldConfig;
use crate::engine::{Engine, SceneInfo, scene_catalog};
use wasm_bindgen::prelude::*;

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub fn scenes() -> js_sys::Array {
    let out = js_sys::Array::new();
    for info in scene_catalog() {
        out.push(&scene_info_to_js(info));
    }
    out
}

#[wasm_bindgen(js_name = "worldDefaults")]
pub fn world_defaults() -> JsValue {
    serde_wasm_bindgen::to_value(&WorldConfig::default()).unwrap_or(JsValue::NULL)
}

fn scene_info_to_js(info: &SceneInfo) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("id"), &JsValue::from_str(info.id));
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("name"), &JsValue::from_str(info.name));
    let _ = js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("description"),
        &JsValue::from_str(info.description),
    );
    JsValue::from(obj)
}

/// Flock handle for a canvas front-end. The front-end only reads the buffers returned here;
/// it never writes boid state directly.
#[wasm_bindgen]
pub struct WasmFlock {
    engine: Engine,
}

#[wasm_bindgen]
impl WasmFlock {
    /// Build from a `WorldConfig`-shaped object; missing keys take their defaults.
    #[wasm_bindgen(js_name = "newFromConfig")]
    pub fn new_from_config(config: JsValue) -> Result<WasmFlock, JsValue> {
        let cfg: WorldConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("invalid config: {}", e)))?;
        let engine = Engine::new(cfg).map_err(to_js)?;
        Ok(WasmFlock { engine })
    }

    #[wasm_bindgen(js_name = "newScene")]
    pub fn new_scene(scene_id: &str, seed: Option<u64>) -> Result<WasmFlock, JsValue> {
        let engine = Engine::new_scene(scene_id, seed).map_err(to_js)?;
        Ok(WasmFlock { engine })
    }

    pub fn len(&self) -> usize { self.engine.len() }

    pub fn tick(&mut self) -> Result<(), JsValue> { self.engine.tick().map_err(to_js) }

    pub fn run(&mut self, ticks: u32) -> Result<(), JsValue> {
        self.engine.run(u64::from(ticks)).map_err(to_js)
    }

    /// `{x, y, w, h, force?}` for a rectangle or `{x, y, r, force?}` for a circle.
    #[wasm_bindgen(js_name = "placeObstacle")]
    pub fn place_obstacle(&mut self, spec: JsValue) -> Result<usize, JsValue> {
        let spec: ObstacleSpec = serde_wasm_bindgen::from_value(spec)
            .map_err(|e| JsValue::from_str(&format!("invalid obstacle: {}", e)))?;
        self.engine.place_obstacle(spec).map_err(to_js)
    }

    pub fn spawn(&mut self, x: f64, y: f64) -> Result<(), JsValue> {
        self.engine.spawn(x, y).map(|_| ()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = "setPointer")]
    pub fn set_pointer(&mut self, x: f64, y: f64) { self.engine.set_pointer(Some((x, y))); }

    #[wasm_bindgen(js_name = "clearPointer")]
    pub fn clear_pointer(&mut self) { self.engine.set_pointer(None); }

    pub fn positions(&self) -> Vec<f32> { self.engine.positions_flat() }

    pub fn states(&self) -> Vec<f32> { self.engine.states_flat() }

    pub fn overlapping(&self) -> Vec<u8> { self.engine.overlapping_flags() }

    pub fn obstacles(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.engine.simulator().obstacles()).unwrap_or(JsValue::NULL)
    }

    pub fn seed(&self) -> u64 { self.engine.seed() }
}
