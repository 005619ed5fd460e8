use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notebook::{ops, DirId, DirectoryModel};
use crate::tree::sync::TreeSyncEngine;
use crate::tree::TreeEvent;

/// `type` value of a folder copy payload.
pub const CLIPBOARD_TYPE_COPY_DIR: u32 = 1;

/// Shared text clipboard.
pub trait Clipboard {
    fn set_text(&mut self, text: String);
    fn text(&self) -> Option<String>;
    fn clear(&mut self);
}

/// Clipboard that lives inside the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) {
        self.text = Some(text);
    }

    fn text(&self) -> Option<String> {
        self.text.clone()
    }

    fn clear(&mut self) {
        self.text = None;
    }
}

/// The type of clipboard operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardOp {
    Copy,
    Cut,
}

impl ClipboardOp {
    fn past_tense(self) -> &'static str {
        match self {
            ClipboardOp::Copy => "copied",
            ClipboardOp::Cut => "cut",
        }
    }
}

/// Decoded clipboard content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub token: u32,
    pub op: ClipboardOp,
    pub source_paths: Vec<PathBuf>,
}

/// JSON layout written to the clipboard.
#[derive(Debug, Serialize, Deserialize)]
struct WirePayload {
    magic: u32,
    #[serde(rename = "type")]
    kind: u32,
    #[serde(rename = "isCut")]
    is_cut: bool,
    dirs: Vec<String>,
}

/// Outcome of a paste.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasteReport {
    pub pasted: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn folder_count(n: usize) -> String {
    if n == 1 {
        "1 folder".to_string()
    } else {
        format!("{} folders", n)
    }
}

/// Copy, cut and paste of folders through a text clipboard.
///
/// Payloads carry a session token. Only the most recent copy made by this
/// controller can be pasted, and the token changes after every paste.
#[derive(Debug, Clone)]
pub struct ClipboardOpController {
    token: u32,
}

impl Default for ClipboardOpController {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardOpController {
    pub fn new() -> Self {
        Self::with_token(rand::random())
    }

    pub fn with_token(token: u32) -> Self {
        Self { token }
    }

    pub fn token(&self) -> u32 {
        self.token
    }

    fn rotate_token(&mut self) -> u32 {
        loop {
            let next: u32 = rand::random();
            if next != self.token {
                self.token = next;
                return next;
            }
        }
    }

    /// Serialize `paths` with the current token.
    pub fn encode(&self, op: ClipboardOp, paths: &[PathBuf]) -> Result<String> {
        let wire = WirePayload {
            magic: self.token,
            kind: CLIPBOARD_TYPE_COPY_DIR,
            is_cut: op == ClipboardOp::Cut,
            dirs: paths
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
        };
        Ok(serde_json::to_string(&wire)?)
    }

    /// Parse clipboard text. Anything that is not a folder payload is `None`.
    pub fn decode(text: &str) -> Option<ClipboardPayload> {
        let wire: WirePayload = match serde_json::from_str(text) {
            Ok(w) => w,
            Err(e) => {
                log::debug!("Clipboard does not hold a folder payload: {}", e);
                return None;
            }
        };
        if wire.kind != CLIPBOARD_TYPE_COPY_DIR {
            return None;
        }
        Some(ClipboardPayload {
            token: wire.magic,
            op: if wire.is_cut {
                ClipboardOp::Cut
            } else {
                ClipboardOp::Copy
            },
            source_paths: wire.dirs.into_iter().map(PathBuf::from).collect(),
        })
    }

    /// A payload this controller would paste right now.
    fn accept(&self, text: &str) -> Option<ClipboardPayload> {
        Self::decode(text).filter(|p| p.token == self.token && !p.source_paths.is_empty())
    }

    /// Whether the clipboard holds a current payload from this controller.
    pub fn paste_available(&self, clipboard: &dyn Clipboard) -> bool {
        clipboard
            .text()
            .and_then(|text| self.accept(&text))
            .is_some()
    }

    /// Put `dirs` on the clipboard. Returns how many folders were written.
    pub fn copy(
        &mut self,
        engine: &mut TreeSyncEngine,
        model: &dyn DirectoryModel,
        clipboard: &mut dyn Clipboard,
        dirs: &[DirId],
        op: ClipboardOp,
    ) -> usize {
        let paths: Vec<PathBuf> = dirs.iter().filter_map(|d| model.path(*d)).collect();
        if paths.is_empty() {
            return 0;
        }

        self.rotate_token();
        let text = match self.encode(op, &paths) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Failed to encode clipboard payload: {}", e);
                return 0;
            }
        };
        log::debug!("Clipboard payload {}", text);
        clipboard.set_text(text);
        engine.status(format!("{} {}", folder_count(paths.len()), op.past_tense()));
        paths.len()
    }

    /// Copy or move every folder of `payload` into `dest`.
    ///
    /// Each source is handled on its own: one failure never stops the batch.
    pub fn paste(
        &mut self,
        engine: &mut TreeSyncEngine,
        model: &mut dyn DirectoryModel,
        dest: DirId,
        payload: &ClipboardPayload,
    ) -> PasteReport {
        let is_cut = payload.op == ClipboardOp::Cut;
        let mut report = PasteReport::default();
        let mut source_parents = Vec::new();

        for path in &payload.source_paths {
            let Some(src) = model.find_directory(path) else {
                engine.warn(
                    format!("Failed to paste folder {}.", path.display()),
                    "The folder could not be found in any notebook.",
                );
                report.failed += 1;
                continue;
            };
            if src == dest {
                report.skipped += 1;
                continue;
            }
            let parent = model.parent(src);
            if is_cut && parent == Some(dest) {
                report.skipped += 1;
                continue;
            }

            let (Some(dest_path), Some(name)) = (model.path(dest), model.name(src)) else {
                report.failed += 1;
                continue;
            };
            let new_name = ops::resolve_copy_name(&dest_path, name);
            match model.copy_directory(dest, &new_name, src, is_cut) {
                Ok(pasted) => {
                    report.pasted += 1;
                    if let Some(parent) = parent.filter(|_| is_cut) {
                        if !source_parents.contains(&parent) {
                            source_parents.push(parent);
                        }
                    }
                    engine.notify(TreeEvent::DirectoryUpdated(pasted));
                }
                Err(e) => {
                    engine.warn(format!("Failed to copy folder {}.", path.display()), e.to_string());
                    report.failed += 1;
                }
            }
        }

        if report.pasted > 0 {
            engine.reconcile_directory(model, dest);
            for parent in source_parents {
                engine.reconcile_directory(model, parent);
            }
            engine.status(format!("{} pasted", folder_count(report.pasted)));
        }
        log::debug!("Paste finished: {:?}", report);
        self.rotate_token();
        report
    }

    /// Paste the clipboard into the selected folder (or the notebook root)
    /// and clear it.
    pub fn paste_from_clipboard(
        &mut self,
        engine: &mut TreeSyncEngine,
        model: &mut dyn DirectoryModel,
        clipboard: &mut dyn Clipboard,
    ) -> Option<PasteReport> {
        let payload = clipboard.text().and_then(|text| self.accept(&text))?;
        let dest = engine
            .current_dir()
            .or_else(|| engine.notebook().and_then(|nb| model.root_dir(nb)))?;
        let report = self.paste(engine, model, dest, &payload);
        clipboard.clear();
        Some(report)
    }
}
