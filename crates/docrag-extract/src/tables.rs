//! Table detection over a page's text layer.
//!
//! Two strategies: `RuledTableDetector` finds bordered grids (cells split by
//! vertical bars, optional ruling lines), `AlignedTableDetector` finds columns
//! separated by runs of whitespace. The extractor runs the ruled detector
//! first and falls back to the aligned one when it finds nothing.

use docrag_core::config::TableSettings;
use docrag_core::error::PageError;

pub type Grid = Vec<Vec<String>>;

pub trait TableDetector: Send + Sync {
    fn name(&self) -> &'static str;
    fn detect(&self, page: usize, text: &str) -> Result<Vec<Grid>, PageError>;
}

const CELL_BORDERS: &[char] = &['|', '│', '┃', '║'];
const RULING_STROKES: &[char] = &['-', '=', '─', '━', '═'];
const RULING_CHARS: &[char] = &[
    '-', '=', '+', ':', '|', '─', '━', '═', '│', '┃', '║', '┼', '╋', '╬', '┌', '┐', '└', '┘', '├', '┤', '┬', '┴', '╔', '╗',
    '╚', '╝', '╠', '╣', '╦', '╩',
];

fn is_ruling(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty()
        && t.chars().any(|c| RULING_STROKES.contains(&c))
        && t.chars().all(|c| c.is_whitespace() || RULING_CHARS.contains(&c))
}

fn bordered_cells(line: &str) -> Option<Vec<String>> {
    let t = line.trim();
    if !t.contains(CELL_BORDERS) {
        return None;
    }
    let t = t.strip_prefix(CELL_BORDERS).unwrap_or(t);
    let t = t.strip_suffix(CELL_BORDERS).unwrap_or(t);
    let cells: Vec<String> = t.split(CELL_BORDERS).map(|c| c.trim().to_string()).collect();
    if cells.iter().all(String::is_empty) {
        return None;
    }
    Some(cells)
}

pub struct RuledTableDetector {
    settings: TableSettings,
}

impl RuledTableDetector {
    pub fn new(settings: TableSettings) -> Self {
        Self { settings }
    }

    fn finish_block(&self, page: usize, block: &mut Grid, out: &mut Vec<Grid>) -> Result<(), PageError> {
        let rows = std::mem::take(block);
        if rows.len() < self.settings.min_rows {
            return Ok(());
        }
        let Some(width) = rows.first().map(Vec::len) else {
            return Ok(());
        };
        if width < self.settings.min_columns {
            return Ok(());
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(PageError::Tables {
                page,
                strategy: self.name(),
                reason: format!("bordered row {} has {} cells, expected {}", bad + 1, rows[bad].len(), width),
            });
        }
        out.push(rows);
        Ok(())
    }
}

impl TableDetector for RuledTableDetector {
    fn name(&self) -> &'static str {
        "ruled"
    }

    fn detect(&self, page: usize, text: &str) -> Result<Vec<Grid>, PageError> {
        let mut tables = Vec::new();
        let mut block: Grid = Vec::new();
        for line in text.lines() {
            if is_ruling(line) {
                continue;
            }
            match bordered_cells(line) {
                Some(cells) => block.push(cells),
                None => self.finish_block(page, &mut block, &mut tables)?,
            }
        }
        self.finish_block(page, &mut block, &mut tables)?;
        Ok(tables)
    }
}

/// Columns of a run may drift this many characters and still line up.
const ALIGN_TOLERANCE: usize = 1;

/// A cell of a whitespace-aligned line with its character span.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell {
    start: usize,
    end: usize,
    text: String,
}

/// Split a line on tabs or runs of two or more spaces.
///
/// Returns the cells and whether any separator was a tab.
fn aligned_cells(line: &str) -> (Vec<Cell>, bool) {
    let mut cells = Vec::new();
    let mut tabbed = false;
    let mut current = String::new();
    let (mut start, mut end) = (0, 0);
    let (mut gap, mut gap_tab) = (0usize, false);
    for (col, c) in line.chars().enumerate() {
        if c.is_whitespace() {
            gap += 1;
            gap_tab |= c == '\t';
            continue;
        }
        if !current.is_empty() && gap > 0 {
            if gap_tab || gap >= 2 {
                tabbed |= gap_tab;
                cells.push(Cell { start, end, text: std::mem::take(&mut current) });
            } else {
                current.push(' ');
            }
        }
        if current.is_empty() {
            start = col;
        }
        gap = 0;
        gap_tab = false;
        current.push(c);
        end = col + 1;
    }
    if !current.is_empty() {
        cells.push(Cell { start, end, text: current });
    }
    (cells, tabbed)
}

fn near(a: usize, b: usize) -> bool {
    a.abs_diff(b) <= ALIGN_TOLERANCE
}

fn is_numeric(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit())
        && text.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+' | '%' | 'e' | 'E'))
}

/// Whether `row` continues the column layout of `first`: same cell count and,
/// past the first column, each cell starts where `first`'s does. Numeric
/// cells may instead share the right edge. Tab-separated rows are taken as
/// aligned.
fn lines_up(first: &(Vec<Cell>, bool), row: &(Vec<Cell>, bool)) -> bool {
    if first.0.len() != row.0.len() {
        return false;
    }
    if first.1 && row.1 {
        return true;
    }
    first.0.iter().zip(&row.0).skip(1).all(|(a, b)| {
        near(a.start, b.start) || (near(a.end, b.end) && (is_numeric(&a.text) || is_numeric(&b.text)))
    })
}

pub struct AlignedTableDetector {
    settings: TableSettings,
}

impl AlignedTableDetector {
    pub fn new(settings: TableSettings) -> Self {
        Self { settings }
    }

    fn flush(&self, run: &mut Vec<(Vec<Cell>, bool)>, out: &mut Vec<Grid>) {
        let rows = std::mem::take(run);
        if rows.len() >= self.settings.min_rows {
            out.push(rows.into_iter().map(|(cells, _)| cells.into_iter().map(|c| c.text).collect()).collect());
        }
    }
}

impl TableDetector for AlignedTableDetector {
    fn name(&self) -> &'static str {
        "aligned"
    }

    fn detect(&self, _page: usize, text: &str) -> Result<Vec<Grid>, PageError> {
        let mut tables = Vec::new();
        let mut run = Vec::new();
        for line in text.lines() {
            let row = aligned_cells(line);
            if row.0.len() < self.settings.min_columns {
                self.flush(&mut run, &mut tables);
                continue;
            }
            if run.first().is_some_and(|first| !lines_up(first, &row)) {
                self.flush(&mut run, &mut tables);
            }
            run.push(row);
        }
        self.flush(&mut run, &mut tables);
        Ok(tables)
    }
}
