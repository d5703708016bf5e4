//! WASM bridge for FTA Annotate: exposes the annotation engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Every method takes and
//! returns plain strings, numbers or booleans; structured results are JSON.

use fta_core::annotation::AnnotationExtra;
use fta_core::config::EngineConfig;
use fta_core::dsl::DslTree;
use fta_core::id::NodeId;
use fta_core::snapshot::AnnotationSnapshot;
use fta_editor::commands::CommandStack;
use fta_editor::engine::AnnotationEngine;
use fta_editor::moves::DropPosition;
use fta_editor::selection::{MultiSelectMode, SelectionItem, SelectionKind};
use fta_editor::store::{AnnotationUpdate, DeleteOptions};
use serde::Serialize;
use wasm_bindgen::prelude::*;

const NOT_LOADED: &str = r#"{"ok":false,"error":"No DSL document loaded"}"#;

/// The JS-facing annotation workspace.
///
/// Holds the engine for the current DSL document plus the undo history.
#[wasm_bindgen]
pub struct AnnotationWorkspace {
    engine: Option<AnnotationEngine>,
    commands: CommandStack,
    config: EngineConfig,
}

impl Default for AnnotationWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl AnnotationWorkspace {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_error_panic_hook_setup();
        Self {
            engine: None,
            commands: CommandStack::new(200),
            config: EngineConfig::default(),
        }
    }

    /// Replace the engine config. Applies to the next `load_dsl`.
    /// Returns `false` on invalid JSON.
    pub fn set_config(&mut self, json: &str) -> bool {
        match EngineConfig::from_json(json) {
            Ok(config) => {
                self.config = config;
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Load a DSL document and start a fresh annotation tree.
    /// Returns `false` on parse error, keeping the previous document.
    pub fn load_dsl(&mut self, json: &str) -> bool {
        let dsl = match DslTree::from_json(json) {
            Ok(dsl) => dsl,
            Err(e) => {
                log::warn!("{e}");
                return false;
            }
        };
        match self.engine.as_mut() {
            Some(engine) => {
                engine.config = self.config.clone();
                engine.initialize(dsl);
            }
            None => self.engine = Some(AnnotationEngine::new(dsl, self.config.clone())),
        }
        self.commands.clear();
        true
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn root_json(&self) -> String {
        match &self.engine {
            Some(engine) => to_json(engine.root()),
            None => NOT_LOADED.to_string(),
        }
    }

    /// Flattened pre-order list `[{..annotation, parentId, depth}]`.
    pub fn flattened_json(&self) -> String {
        match &self.engine {
            Some(engine) => to_json(engine.flattened().entries()),
            None => "[]".to_string(),
        }
    }

    pub fn revision(&self) -> f64 {
        self.engine.as_ref().map_or(0.0, |e| e.revision() as f64)
    }

    /// Annotation by id as JSON, `{}` if not found.
    pub fn find_annotation(&self, id: &str) -> String {
        self.engine
            .as_ref()
            .and_then(|e| e.find_by_id(NodeId::intern(id)))
            .map_or_else(|| "{}".to_string(), to_json)
    }

    pub fn find_by_dsl_node_id(&self, dsl_id: &str) -> String {
        self.engine
            .as_ref()
            .and_then(|e| e.find_by_dsl_node_id(NodeId::intern(dsl_id)))
            .map_or_else(|| "{}".to_string(), to_json)
    }

    /// `{"x":..,"y":..}`; the origin for unknown ids.
    pub fn absolute_position(&self, dsl_id: &str) -> String {
        match &self.engine {
            Some(engine) => to_json(&engine.absolute_position(NodeId::intern(dsl_id))),
            None => NOT_LOADED.to_string(),
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Returns the outcome as JSON (`{"status":"applied"}`, a no-op reason,
    /// or a pending confirmation token).
    pub fn create_annotation(&mut self, dsl_id: &str, component: &str, extra_json: &str) -> String {
        let Some(extra) = parse_or_default::<AnnotationExtra>(extra_json) else {
            return r#"{"ok":false,"error":"Invalid extra fields"}"#.to_string();
        };
        self.mutate("create annotation", |e| {
            to_json(&e.create_annotation(NodeId::intern(dsl_id), component, extra))
        })
        .unwrap_or_else(|| NOT_LOADED.to_string())
    }

    /// Create, resolving any destructive confirmation synchronously through
    /// `confirm(reason) -> boolean`. Returns `true` if the tree changed.
    pub fn create_annotation_with(
        &mut self,
        dsl_id: &str,
        component: &str,
        extra_json: &str,
        confirm: &js_sys::Function,
    ) -> bool {
        let Some(extra) = parse_or_default::<AnnotationExtra>(extra_json) else {
            return false;
        };
        let mut prompt = |reason: &str| js_confirm(confirm, reason);
        self.mutate("create annotation", |e| {
            e.create_annotation_confirmed(NodeId::intern(dsl_id), component, extra, &mut prompt)
                .is_applied()
        })
        .unwrap_or(false)
    }

    pub fn update_annotation(&mut self, id: &str, updates_json: &str) -> String {
        let Some(updates) = parse_or_default::<AnnotationUpdate>(updates_json) else {
            return r#"{"ok":false,"error":"Invalid updates"}"#.to_string();
        };
        self.mutate("update annotation", |e| {
            to_json(&e.update_annotation(NodeId::intern(id), updates))
        })
        .unwrap_or_else(|| NOT_LOADED.to_string())
    }

    pub fn update_annotation_with(
        &mut self,
        id: &str,
        updates_json: &str,
        confirm: &js_sys::Function,
    ) -> bool {
        let Some(updates) = parse_or_default::<AnnotationUpdate>(updates_json) else {
            return false;
        };
        let mut prompt = |reason: &str| js_confirm(confirm, reason);
        self.mutate("update annotation", |e| {
            e.update_annotation_confirmed(NodeId::intern(id), updates, &mut prompt)
                .is_applied()
        })
        .unwrap_or(false)
    }

    /// Commit a pending destructive operation by token.
    pub fn confirm_pending(&mut self, token: f64) -> String {
        self.mutate("confirm", |e| to_json(&e.confirm_pending(token as u64)))
            .unwrap_or_else(|| NOT_LOADED.to_string())
    }

    pub fn cancel_pending(&mut self, token: f64) -> bool {
        self.engine
            .as_mut()
            .is_some_and(|e| e.cancel_pending(token as u64))
    }

    pub fn delete_annotation(&mut self, id: &str, delete_children: bool) -> bool {
        let options = DeleteOptions { delete_children };
        self.mutate("delete annotation", |e| {
            e.delete_annotation(NodeId::intern(id), options).is_applied()
        })
        .unwrap_or(false)
    }

    pub fn ungroup(&mut self, id: &str) -> bool {
        self.mutate("ungroup", |e| e.ungroup(NodeId::intern(id)).is_applied())
            .unwrap_or(false)
    }

    pub fn combine_selected(&mut self, component: &str) -> bool {
        self.mutate("combine", |e| e.combine_selected(component))
            .unwrap_or(false)
    }

    /// `{"valid":bool,"reason"?:string}`.
    pub fn validate_move(&self, source: &str, target: &str, position: &str) -> String {
        let Some(position) = parse_position(position) else {
            return r#"{"valid":false,"reason":"Unknown drop position"}"#.to_string();
        };
        match &self.engine {
            Some(e) => to_json(&e.validate_move(NodeId::intern(source), NodeId::intern(target), position)),
            None => NOT_LOADED.to_string(),
        }
    }

    /// `{"success":bool,"error"?:string}`.
    pub fn move_annotation(&mut self, source: &str, target: &str, position: &str) -> String {
        let Some(position) = parse_position(position) else {
            return r#"{"success":false,"error":"Unknown drop position"}"#.to_string();
        };
        self.mutate("move annotation", |e| {
            to_json(&e.move_annotation(NodeId::intern(source), NodeId::intern(target), position))
        })
        .unwrap_or_else(|| NOT_LOADED.to_string())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Single-select. `kind` is `"ANNOTATION"` or `"DSL"`.
    pub fn select(&mut self, id: &str, kind: &str) -> bool {
        let (Some(engine), Some(item)) = (self.engine.as_mut(), parse_item(id, kind)) else {
            return false;
        };
        engine.select(item);
        true
    }

    /// Multi-select toggle. Returns `"added"`, `"removed"` or `"refused"`.
    pub fn toggle_select(&mut self, id: &str, kind: &str, select_parent: bool) -> String {
        let (Some(engine), Some(item)) = (self.engine.as_mut(), parse_item(id, kind)) else {
            return "refused".to_string();
        };
        let mode = if select_parent {
            MultiSelectMode::SelectParent
        } else {
            MultiSelectMode::Toggle
        };
        serde_json::to_value(engine.toggle_select(item, mode))
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "refused".to_string())
    }

    pub fn clear_selection(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.clear_selection();
        }
    }

    pub fn selection_json(&self) -> String {
        match &self.engine {
            Some(engine) => to_json(engine.selection.items()),
            None => "[]".to_string(),
        }
    }

    // ─── Undo / redo ─────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        match self.engine.as_mut() {
            Some(engine) => self.commands.undo(engine).is_some(),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.engine.as_mut() {
            Some(engine) => self.commands.redo(engine).is_some(),
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    /// Start a drag gesture; everything until `end_batch` undoes as one step.
    pub fn begin_batch(&mut self) {
        if let Some(engine) = &self.engine {
            self.commands.begin_batch(engine);
        }
    }

    pub fn end_batch(&mut self, description: &str) {
        if let Some(engine) = &self.engine {
            self.commands.end_batch(engine, description);
        }
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    /// `{rootAnnotation, savedAt, version}` for the host to persist.
    pub fn snapshot_json(&self) -> String {
        match &self.engine {
            Some(engine) => engine.snapshot().to_json().unwrap_or_else(|e| {
                log::warn!("{e}");
                NOT_LOADED.to_string()
            }),
            None => NOT_LOADED.to_string(),
        }
    }

    /// Replace the tree from a persisted snapshot. Clears undo history.
    pub fn load_snapshot_json(&mut self, json: &str) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };
        match AnnotationSnapshot::from_json(json) {
            Ok(snapshot) => {
                engine.load_snapshot(snapshot);
                self.commands.clear();
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }
}

impl AnnotationWorkspace {
    /// Run `op` through the command stack so it lands in undo history.
    fn mutate<R>(&mut self, description: &str, op: impl FnOnce(&mut AnnotationEngine) -> R) -> Option<R> {
        let engine = self.engine.as_mut()?;
        Some(self.commands.execute(engine, description, op))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        let escaped = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
        format!(r#"{{"ok":false,"error":"{escaped}"}}"#)
    })
}

/// Empty input means "all defaults"; malformed JSON is `None`.
fn parse_or_default<T: serde::de::DeserializeOwned + Default>(json: &str) -> Option<T> {
    if json.trim().is_empty() {
        return Some(T::default());
    }
    serde_json::from_str(json)
        .map_err(|e| log::warn!("rejected JSON argument: {e}"))
        .ok()
}

fn parse_position(position: &str) -> Option<DropPosition> {
    match position {
        "before" => Some(DropPosition::Before),
        "inside" => Some(DropPosition::Inside),
        "after" => Some(DropPosition::After),
        _ => None,
    }
}

fn parse_item(id: &str, kind: &str) -> Option<SelectionItem> {
    let kind = match kind.to_ascii_uppercase().as_str() {
        "ANNOTATION" => SelectionKind::Annotation,
        "DSL" => SelectionKind::Dsl,
        _ => return None,
    };
    Some(SelectionItem {
        id: NodeId::intern(id),
        kind,
    })
}

/// Call the host prompt; anything but a literal `true` declines.
fn js_confirm(confirm: &js_sys::Function, reason: &str) -> bool {
    confirm
        .call1(&JsValue::NULL, &JsValue::from_str(reason))
        .ok()
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

// ─── Panic hook for WASM debugging ───────────────────────────────────────

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    fn console_error(message: &str);
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                console_error(&format!("FTA WASM panic: {info}"));
            }));
        });
    }
}

// ─── Standalone validation (no workspace needed) ─────────────────────────

/// Validate a DSL document. Returns `{"ok":true,"nodes":N}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_dsl(json: &str) -> String {
    match DslTree::from_json(json) {
        Ok(tree) => format!(r#"{{"ok":true,"nodes":{}}}"#, tree.len()),
        Err(e) => {
            let escaped = e.replace('\\', "\\\\").replace('"', "\\\"");
            format!(r#"{{"ok":false,"error":"{escaped}"}}"#)
        }
    }
}
