//! Cell grid and the terminal collaborator surface of spec §6: "Poll event
//! ...; clear cell grid, write cell (x,y,ch,fg,bg), present, query
//! width/height, init/shutdown." The renderer draws into a [`CellGrid`] as
//! a plain data buffer; [`present`] is the only place that talks to the
//! real terminal, and only emits the cells that actually changed since the
//! previous present.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
};
pub use crossterm::style::Color;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Color,
    pub bg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Reset,
            bg: Color::Reset,
        }
    }
}

/// A width×height matrix of [`Cell`]s the renderer draws into. Holds no
/// terminal state of its own; [`present`] diffs two grids to decide what to
/// actually write.
#[derive(Debug, Clone)]
pub struct CellGrid {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(width: u16, height: u16) -> Self {
        let len = usize::from(width) * usize::from(height);
        Self {
            width,
            height,
            cells: vec![Cell::default(); len],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Resize, discarding prior contents (the renderer redraws everything
    /// after a resize, per spec §4.6).
    pub fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height);
    }

    /// Reset every cell to blank/default-colored.
    pub fn clear(&mut self) {
        for c in &mut self.cells {
            *c = Cell::default();
        }
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    /// Write a single cell; silently clipped if `(x, y)` is outside the
    /// grid, since callers compute column/row offsets from view geometry
    /// and an off-by-one at a boundary should not panic the editor.
    pub fn write_cell(&mut self, x: u16, y: u16, ch: char, fg: Color, bg: Color) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = Cell { ch, fg, bg };
        }
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }
}

/// Diff `next` against `prev` and write only the changed cells to `out`,
/// then flush. `prev` is updated to `next`'s contents on return. Cursor
/// positioning between runs of changed cells uses `MoveTo`; color state is
/// only emitted when it differs from the previous cell written.
pub fn present(out: &mut impl Write, prev: &mut CellGrid, next: &CellGrid) -> Result<()> {
    if prev.width != next.width || prev.height != next.height {
        *prev = CellGrid::new(next.width, next.height);
    }
    let mut last_colors: Option<(Color, Color)> = None;
    for y in 0..next.height {
        let mut x = 0u16;
        while x < next.width {
            let cell = next.get(x, y).unwrap_or_default();
            if prev.get(x, y) == Some(cell) {
                x += 1;
                continue;
            }
            queue!(out, MoveTo(x, y))?;
            if last_colors != Some((cell.fg, cell.bg)) {
                queue!(out, SetForegroundColor(cell.fg), SetBackgroundColor(cell.bg))?;
                last_colors = Some((cell.fg, cell.bg));
            }
            queue!(out, Print(cell.ch))?;
            prev.write_cell(x, y, cell.ch, cell.fg, cell.bg);
            x += 1;
        }
    }
    queue!(out, ResetColor)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_blank() {
        let g = CellGrid::new(4, 2);
        assert_eq!(g.get(0, 0), Some(Cell::default()));
        assert_eq!(g.get(4, 0), None);
    }

    #[test]
    fn write_cell_is_clipped_out_of_bounds() {
        let mut g = CellGrid::new(2, 2);
        g.write_cell(5, 5, 'x', Color::Reset, Color::Reset);
        assert_eq!(g.get(0, 0), Some(Cell::default()));
    }

    #[test]
    fn present_only_emits_changed_cells() {
        let mut prev = CellGrid::new(3, 1);
        let mut next = CellGrid::new(3, 1);
        next.write_cell(1, 0, 'a', Color::Reset, Color::Reset);
        let mut buf = Vec::new();
        present(&mut buf, &mut prev, &next).unwrap();
        assert_eq!(prev.get(1, 0).unwrap().ch, 'a');
        let out = String::from_utf8_lossy(&buf);
        assert!(out.contains('a'));
    }

    #[test]
    fn present_repeated_with_no_changes_writes_nothing_new() {
        let mut prev = CellGrid::new(2, 1);
        let mut next = CellGrid::new(2, 1);
        next.write_cell(0, 0, 'z', Color::Reset, Color::Reset);
        let mut buf = Vec::new();
        present(&mut buf, &mut prev, &next).unwrap();
        buf.clear();
        present(&mut buf, &mut prev, &next).unwrap();
        assert!(!buf.iter().any(|&b| b == b'z'));
    }
}
