//! Mark & Cursor model, View, split-tree geometry, and the process-wide
//! `Editor` container — spec §3 and §4.6.
//!
//! Ownership shape (spec §9 "pervasive raw pointers forming cycles"): the
//! donor's C-style `view_t*`/`cursor_t*` back-pointers become index handles
//! (`ViewId`, `BufferId`) into `Editor`-owned collections. Splits are
//! modeled as parent-held child ownership (`View::split_child`); a child
//! looks its parent up via `Editor::split_parent_of`, never a raw pointer.

pub mod layout;

use core_events::Chord;
use core_keymap::KeymapRegistry;
use core_state::{CrashDumpFlag, LoopContextStack, MacroRecorder, MacroRegistry, MacroReplay, PromptKind};
use core_text::{Buffer, MarkId, Position, StyleRuleId};
use layout::{Layout, LayoutRegion, Orientation};
use std::collections::HashMap;
use thiserror::Error;

// ---------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

// ---------------------------------------------------------------------
// Cursor (spec §3)
// ---------------------------------------------------------------------

/// Owns exactly one insertion mark; optionally a selection-bound mark (plus
/// its highlighting rule); a cut buffer; and a sleep flag.
#[derive(Debug, Clone)]
pub struct Cursor {
    pub mark: MarkId,
    pub sel_bound: Option<MarkId>,
    pub sel_rule: Option<StyleRuleId>,
    pub cut_buffer: String,
    pub is_asleep: bool,
    /// Implementation-defined sticky column (spec §9 Open Questions): set
    /// on horizontal motion/insert, consulted (not overwritten) on
    /// vertical motion, cleared on horizontal motion.
    pub sticky_col: Option<usize>,
}

impl Cursor {
    pub fn new(mark: MarkId) -> Self {
        Self {
            mark,
            sel_bound: None,
            sel_rule: None,
            cut_buffer: String::new(),
            is_asleep: false,
            sticky_col: None,
        }
    }

    /// Invariant check (spec §8 property 2): `sel_bound.is_some() ==
    /// sel_rule.is_some()`.
    pub fn selection_consistent(&self) -> bool {
        self.sel_bound.is_some() == self.sel_rule.is_some()
    }
}

// ---------------------------------------------------------------------
// View (spec §3)
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewType {
    Edit,
    Status,
    Prompt,
    Popup,
}

#[derive(Debug, Clone, Default)]
pub struct SplitInfo {
    pub child: Option<ViewId>,
    pub factor: f32,
    pub orientation: Option<Orientation>,
}

#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    pub buffer: BufferId,
    pub region: LayoutRegion,
    /// Viewport origin (top-left line/col currently scrolled to).
    pub viewport_line: usize,
    pub viewport_col: usize,
    pub line_number_width: u16,
    pub split: SplitInfo,
    pub split_parent: Option<ViewId>,
    /// Ordered keymap names; the last entry is the top of the stack.
    pub kmap_stack: Vec<String>,
    pub cursors: Vec<Cursor>,
    pub active_cursor: usize,
    pub last_search: Option<String>,
    pub view_type: ViewType,
    pub tab_to_space: bool,
    pub tab_width: usize,
}

impl View {
    pub fn active_cursor(&self) -> &Cursor {
        &self.cursors[self.active_cursor]
    }

    pub fn active_cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursors[self.active_cursor]
    }

    pub fn push_kmap(&mut self, name: impl Into<String>) {
        self.kmap_stack.push(name.into());
    }

    pub fn pop_kmap(&mut self) -> Option<String> {
        self.kmap_stack.pop()
    }

    /// Iterate cursor indices on a snapshot, per spec §4.2 "Cursors are
    /// iterated on a snapshot (safe against self-removal)".
    pub fn cursor_indices_snapshot(&self) -> Vec<usize> {
        (0..self.cursors.len()).collect()
    }

    /// Remove a cursor by index, promoting the active cursor per spec §8
    /// property 1 ("removing the active cursor promotes its previous
    /// sibling, or next if none, to active").
    pub fn remove_cursor(&mut self, idx: usize) {
        if self.cursors.len() <= 1 || idx >= self.cursors.len() {
            return;
        }
        self.cursors.remove(idx);
        if self.active_cursor == idx {
            self.active_cursor = idx.saturating_sub(1).min(self.cursors.len() - 1);
        } else if self.active_cursor > idx {
            self.active_cursor -= 1;
        }
    }

    /// Scroll the viewport by the minimum amount needed to keep
    /// `(line, col)` visible (spec §4.2 "Always rectify the viewport
    /// afterward").
    pub fn rectify_viewport(&mut self, line: usize, col: usize) {
        let height = self.region.height.max(1) as usize;
        if line < self.viewport_line {
            self.viewport_line = line;
        } else if line >= self.viewport_line + height {
            self.viewport_line = line + 1 - height;
        }
        let width = self.region.width.saturating_sub(self.line_number_width).max(1) as usize;
        if col < self.viewport_col {
            self.viewport_col = col;
        } else if col >= self.viewport_col + width {
            self.viewport_col = col + 1 - width;
        }
    }

    /// Re-anchor the viewport so `line` becomes its top row (page up/down).
    pub fn anchor_viewport_top(&mut self, line: usize) {
        self.viewport_line = line;
    }

    /// Center the viewport vertically on `line` (move_to_line).
    pub fn center_viewport(&mut self, line: usize) {
        let height = self.region.height.max(1) as usize;
        self.viewport_line = line.saturating_sub(height / 2);
    }
}

// ---------------------------------------------------------------------
// Command registry (spec §4.1 "resolved lazily by name")
// ---------------------------------------------------------------------

/// Narrow seam a command uses to synchronously run a nested prompt (spec
/// §4.4, §9 "expose a narrow ... interface"). Only the binary's top-level
/// event loop owns the TTY and the multiplexer, so it alone can actually
/// recurse into `run_inner`; commands reach it through this trait object
/// instead of depending on `core-input`/`ox-bin` directly, which would
/// create a cycle back down to this crate.
pub trait PromptHost {
    /// Run a prompt of `kind` over `editor`, returning the submitted answer
    /// (`None` on cancel). `invoker` is the view the prompt answer is routed
    /// back to once the nested loop exits.
    fn run_prompt(&mut self, editor: &mut Editor, invoker: ViewId, kind: PromptKind) -> Option<String>;
}

/// Context handed to a command function: everything it needs to mutate
/// editor state, plus the loop-context stack for prompt/exit requests.
pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
    pub view: ViewId,
    /// `None` for commands that apply to every non-sleeping cursor (the
    /// caller iterates and sets this per call); `Some(idx)` otherwise.
    pub cursor_index: usize,
    pub chord: Chord,
    pub param: Option<String>,
    pub prompt_host: &'a mut dyn PromptHost,
}

pub type CommandFn = fn(&mut CommandContext) -> core_state::CommandOutcome;

#[derive(Default)]
pub struct CommandRegistry {
    fns: HashMap<String, CommandFn>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: CommandFn) {
        self.fns.insert(name.into(), f);
    }

    pub fn get(&self, name: &str) -> Option<CommandFn> {
        self.fns.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }
}

// ---------------------------------------------------------------------
// Editor (spec §3)
// ---------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown view {0:?}")]
    UnknownView(ViewId),
    #[error("unknown buffer {0:?}")]
    UnknownBuffer(BufferId),
    #[error("view {0:?} already has a split child")]
    AlreadySplit(ViewId),
}

pub struct Editor {
    buffers: HashMap<BufferId, Buffer>,
    next_buffer_id: u64,
    views: HashMap<ViewId, View>,
    /// Circular order used by next/prev view navigation (spec §4.2).
    view_order: Vec<ViewId>,
    next_view_id: u64,

    pub active_view: ViewId,
    pub active_edit: Option<ViewId>,
    pub active_edit_root: Option<ViewId>,
    pub prompt_view: Option<ViewId>,

    pub keymaps: KeymapRegistry,
    pub commands: CommandRegistry,
    pub macros: MacroRegistry,
    pub macro_recorder: MacroRecorder,
    pub macro_replay: Option<MacroReplay>,
    pub macro_toggle_key: Chord,

    pub loop_stack: LoopContextStack,
    pub loop_depth: usize,
    pub exit_requested: bool,
    pub crash_dump: CrashDumpFlag,

    pub screen_width: u16,
    pub screen_height: u16,
}

impl Editor {
    /// Construct an editor with a single edit view over `buffer`.
    pub fn new(buffer: Buffer, screen_width: u16, screen_height: u16) -> Self {
        let mut editor = Self {
            buffers: HashMap::new(),
            next_buffer_id: 0,
            views: HashMap::new(),
            view_order: Vec::new(),
            next_view_id: 0,
            active_view: ViewId(0),
            active_edit: None,
            active_edit_root: None,
            prompt_view: None,
            keymaps: KeymapRegistry::new(),
            commands: CommandRegistry::new(),
            macros: MacroRegistry::new(),
            macro_recorder: MacroRecorder::default(),
            macro_replay: None,
            macro_toggle_key: core_events::Chord::alt(core_events::KeyToken::Char('r')),
            loop_stack: LoopContextStack::new(),
            loop_depth: 0,
            exit_requested: false,
            crash_dump: CrashDumpFlag::new(),
            screen_width,
            screen_height,
        };
        let buffer_id = editor.add_buffer(buffer);
        let region = LayoutRegion::new(0, 0, screen_width, screen_height.saturating_sub(1));
        let view_id = editor.new_view(buffer_id, region, ViewType::Edit);
        editor.active_view = view_id;
        editor.active_edit = Some(view_id);
        editor.active_edit_root = Some(view_id);
        editor
    }

    // -- buffers ---------------------------------------------------

    pub fn add_buffer(&mut self, buffer: Buffer) -> BufferId {
        let id = BufferId(self.next_buffer_id);
        self.next_buffer_id += 1;
        self.buffers.insert(id, buffer);
        id
    }

    pub fn buffer(&self, id: BufferId) -> Option<&Buffer> {
        self.buffers.get(&id)
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> Option<&mut Buffer> {
        self.buffers.get_mut(&id)
    }

    fn bind_view_to_buffer(&mut self, id: BufferId) {
        if let Some(b) = self.buffers.get_mut(&id) {
            b.ref_count += 1;
        }
    }

    /// Decrement a buffer's ref-count; destroy it once it reaches zero
    /// (spec §5 "Shared resources").
    fn unbind_view_from_buffer(&mut self, id: BufferId) {
        if let Some(b) = self.buffers.get_mut(&id) {
            b.ref_count = b.ref_count.saturating_sub(1);
            if b.ref_count == 0 {
                self.buffers.remove(&id);
            }
        }
    }

    // -- views -------------------------------------------------------

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    /// Borrow a view and its buffer simultaneously. Sound because `views`
    /// and `buffers` are disjoint fields of `Editor`; commands need both at
    /// once to move marks while inspecting/mutating cursor state.
    pub fn buffer_and_view_mut(&mut self, id: ViewId) -> Option<(&mut Buffer, &mut View)> {
        let view = self.views.get_mut(&id)?;
        let buffer = self.buffers.get_mut(&view.buffer)?;
        Some((buffer, view))
    }

    pub fn active_view(&self) -> &View {
        self.views.get(&self.active_view).expect("active view always exists")
    }

    pub fn active_view_mut(&mut self) -> &mut View {
        self.views
            .get_mut(&self.active_view)
            .expect("active view always exists")
    }

    pub fn views(&self) -> impl Iterator<Item = &View> {
        self.view_order.iter().filter_map(move |id| self.views.get(id))
    }

    /// Every live buffer, keyed by id (spec §5: crash dump walks all open
    /// buffers, not just the ones currently shown in a view).
    pub fn buffers(&self) -> impl Iterator<Item = (&BufferId, &Buffer)> {
        self.buffers.iter()
    }

    /// Create a new view over `buffer`, with a fresh insertion mark and a
    /// default keymap stack entry of `"edit"`. Increments the buffer's
    /// ref-count.
    pub fn new_view(&mut self, buffer: BufferId, region: LayoutRegion, view_type: ViewType) -> ViewId {
        let id = ViewId(self.next_view_id);
        self.next_view_id += 1;
        self.bind_view_to_buffer(buffer);
        let mark = self
            .buffers
            .get_mut(&buffer)
            .map(|b| b.add_mark(Position::origin()))
            .unwrap_or(MarkId(0));
        let view = View {
            id,
            buffer,
            region,
            viewport_line: 0,
            viewport_col: 0,
            line_number_width: 0,
            split: SplitInfo::default(),
            split_parent: None,
            kmap_stack: vec!["edit".to_string()],
            cursors: vec![Cursor::new(mark)],
            active_cursor: 0,
            last_search: None,
            view_type,
            tab_to_space: true,
            tab_width: 4,
        };
        self.views.insert(id, view);
        self.view_order.push(id);
        id
    }

    /// Destroy a mark-owning cursor's marks/rules before dropping it.
    fn destroy_cursor_marks(&mut self, buffer: BufferId, cursor: &Cursor) {
        if let Some(b) = self.buffers.get_mut(&buffer) {
            b.destroy_mark(cursor.mark);
            if let Some(sel) = cursor.sel_bound {
                b.destroy_mark(sel);
            }
            if let Some(rule) = cursor.sel_rule {
                b.remove_styling_rule(rule);
            }
        }
    }

    /// Close a view and cascade-close its split descendants (spec §4.6:
    /// "Closing a parent cascades and closes all descendants").
    pub fn close_view(&mut self, id: ViewId) -> Result<(), ModelError> {
        let view = self.views.get(&id).ok_or(ModelError::UnknownView(id))?;
        let buffer = view.buffer;
        let child = view.split.child;
        let cursors = view.cursors.clone();
        for c in &cursors {
            self.destroy_cursor_marks(buffer, c);
        }
        self.unbind_view_from_buffer(buffer);
        self.views.remove(&id);
        self.view_order.retain(|v| *v != id);
        if let Some(child) = child {
            self.close_view(child)?;
        }
        if self.active_view == id {
            if let Some(next) = self.view_order.first().copied() {
                self.active_view = next;
            }
        }
        Ok(())
    }

    /// Split `id`, creating a child view sharing the same buffer per spec
    /// §4.6. Returns the new child's id.
    pub fn split(&mut self, id: ViewId, orientation: Orientation, factor: f32) -> Result<ViewId, ModelError> {
        let view = self.views.get(&id).ok_or(ModelError::UnknownView(id))?;
        if view.split.child.is_some() {
            return Err(ModelError::AlreadySplit(id));
        }
        let buffer = view.buffer;
        let original_region = view.region;
        let (_, child_region) = original_region.split(orientation, factor);
        let child_id = self.new_view(buffer, child_region, ViewType::Edit);
        let parent = self.views.get_mut(&id).unwrap();
        parent.split = SplitInfo {
            child: Some(child_id),
            factor,
            orientation: Some(orientation),
        };
        let child = self.views.get_mut(&child_id).unwrap();
        child.split_parent = Some(id);
        self.resize_subtree(id, original_region);
        Ok(child_id)
    }

    /// Recompute `id`'s region (and its split descendants') after a resize
    /// or a split, per spec §4.6's recursive resize.
    pub fn resize_subtree(&mut self, id: ViewId, region: LayoutRegion) {
        let (child, orientation, factor) = match self.views.get(&id) {
            Some(v) => (v.split.child, v.split.orientation, v.split.factor),
            None => return,
        };
        match (child, orientation) {
            (Some(child_id), Some(orientation)) => {
                let (parent_region, child_region) = region.split(orientation, factor);
                if let Some(v) = self.views.get_mut(&id) {
                    v.region = parent_region;
                }
                self.resize_subtree(child_id, child_region);
            }
            _ => {
                if let Some(v) = self.views.get_mut(&id) {
                    v.region = region;
                }
            }
        }
    }

    /// Resize the whole screen, recomputing every split-root subtree.
    pub fn resize_screen(&mut self, width: u16, height: u16) {
        self.screen_width = width;
        self.screen_height = height;
        let roots: Vec<ViewId> = self
            .view_order
            .iter()
            .copied()
            .filter(|id| self.views.get(id).map(|v| v.split_parent.is_none()).unwrap_or(false))
            .collect();
        let region = LayoutRegion::new(0, 0, width, height.saturating_sub(1));
        for root in roots {
            self.resize_subtree(root, region);
        }
    }

    /// Walk the circular view list to the nearest edit-type view, per spec
    /// §4.2 "Next/prev view".
    pub fn adjacent_edit_view(&self, from: ViewId, forward: bool) -> Option<ViewId> {
        let order = &self.view_order;
        let pos = order.iter().position(|v| *v == from)?;
        let n = order.len();
        if n == 0 {
            return None;
        }
        for step in 1..=n {
            let idx = if forward {
                (pos + step) % n
            } else {
                (pos + n - step) % n
            };
            let candidate = order[idx];
            if let Some(v) = self.views.get(&candidate) {
                if v.view_type == ViewType::Edit {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Replace a buffer's contents wholesale (spec §4.2 "reload"), resetting
    /// every bound view to a single fresh cursor at the origin. Reload
    /// discards any in-progress selection/cut-buffer/sleeping-cursor state
    /// for that buffer, the same way reopening the file fresh would.
    pub fn replace_buffer_contents(&mut self, buffer_id: BufferId, mut fresh: Buffer) {
        let ref_count = self.buffers.get(&buffer_id).map(|b| b.ref_count).unwrap_or(0);
        fresh.ref_count = ref_count;
        let view_ids: Vec<ViewId> = self
            .view_order
            .iter()
            .copied()
            .filter(|id| self.views.get(id).map(|v| v.buffer == buffer_id).unwrap_or(false))
            .collect();
        let marks: Vec<MarkId> = view_ids.iter().map(|_| fresh.add_mark(Position::origin())).collect();
        self.buffers.insert(buffer_id, fresh);
        for (id, mark) in view_ids.into_iter().zip(marks) {
            if let Some(v) = self.views.get_mut(&id) {
                v.cursors = vec![Cursor::new(mark)];
                v.active_cursor = 0;
                v.viewport_line = 0;
                v.viewport_col = 0;
            }
        }
    }

    pub fn set_active(&mut self, id: ViewId) {
        self.active_view = id;
        if let Some(v) = self.views.get(&id) {
            if v.view_type == ViewType::Edit {
                self.active_edit = Some(id);
                let mut root = id;
                while let Some(v) = self.views.get(&root) {
                    match v.split_parent {
                        Some(p) => root = p,
                        None => break,
                    }
                }
                self.active_edit_root = Some(root);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::Buffer;

    fn editor() -> Editor {
        let buf = Buffer::from_str("t", "hello\nworld\n").unwrap();
        Editor::new(buf, 80, 24)
    }

    #[test]
    fn new_editor_has_one_edit_view_with_one_cursor() {
        let ed = editor();
        let v = ed.active_view();
        assert_eq!(v.cursors.len(), 1);
        assert_eq!(v.view_type, ViewType::Edit);
        assert_eq!(v.kmap_stack, vec!["edit".to_string()]);
    }

    #[test]
    fn split_then_close_restores_single_view() {
        let mut ed = editor();
        let root = ed.active_view;
        let child = ed.split(root, Orientation::Vertical, 0.5).unwrap();
        assert_eq!(ed.views().count(), 2);
        ed.close_view(child).unwrap();
        assert_eq!(ed.views().count(), 1);
        let v = ed.view(root).unwrap();
        assert_eq!(v.region.width, 80);
    }

    #[test]
    fn closing_parent_cascades_to_children() {
        let mut ed = editor();
        let root = ed.active_view;
        let child = ed.split(root, Orientation::Vertical, 0.5).unwrap();
        let _grandchild = ed.split(child, Orientation::Horizontal, 0.5).unwrap();
        assert_eq!(ed.views().count(), 3);
        ed.close_view(root).unwrap();
        assert_eq!(ed.views().count(), 0);
    }

    #[test]
    fn buffer_ref_count_tracks_bound_views() {
        let mut ed = editor();
        let root = ed.active_view;
        let buffer_id = ed.view(root).unwrap().buffer;
        assert_eq!(ed.buffer(buffer_id).unwrap().ref_count, 1);
        let child = ed.split(root, Orientation::Vertical, 0.5).unwrap();
        assert_eq!(ed.buffer(buffer_id).unwrap().ref_count, 2);
        ed.close_view(child).unwrap();
        assert_eq!(ed.buffer(buffer_id).unwrap().ref_count, 1);
    }

    #[test]
    fn adjacent_edit_view_wraps_circularly() {
        let mut ed = editor();
        let root = ed.active_view;
        let child = ed.split(root, Orientation::Vertical, 0.5).unwrap();
        let next = ed.adjacent_edit_view(root, true).unwrap();
        assert_eq!(next, child);
        let back = ed.adjacent_edit_view(child, true).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn remove_cursor_promotes_previous_sibling() {
        let mut ed = editor();
        let root = ed.active_view;
        let buffer_id = ed.view(root).unwrap().buffer;
        let mark = ed.buffer_mut(buffer_id).unwrap().add_mark(Position::origin());
        let view = ed.view_mut(root).unwrap();
        view.cursors.push(Cursor::new(mark));
        view.active_cursor = 1;
        view.remove_cursor(1);
        assert_eq!(view.active_cursor, 0);
    }
}
