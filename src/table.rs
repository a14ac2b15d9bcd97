//! Column-resize controller for data tables.
//!
//! One [`ResizableTable`] is attached per table. It is a pointer-driven state
//! machine: idle, hovering a header's trailing edge, or dragging. While
//! dragging it owns a [`DragSession`], which holds the document-wide side
//! effects (resize cursor, text-selection suppression, document listeners)
//! for exactly as long as the session lives. Ending the drag, a window blur,
//! or dropping the table all drop the session, and the session's `Drop`
//! releases those effects.
//!
//! Column widths have no shared layout model: a width is written to the
//! header cell and to the cell at the same index in every body row, and is
//! written again whenever the body is re-rendered.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::config::TableConfig;

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    ColResize,
}

/// Document-level events a table may listen to during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentEvent {
    PointerMove,
    PointerUp,
    Blur,
}

/// Page-global presentation state shared by every table on the page.
#[derive(Debug, Default)]
pub struct Document {
    cursor: Option<Cursor>,
    user_select_suppressed: bool,
    listeners: BTreeSet<(u64, DocumentEvent)>,
    /// Tables with a drag in progress. Cursor and selection suppression are
    /// held while this is non-empty.
    dragging: BTreeSet<u64>,
}

pub type SharedDocument = Rc<RefCell<Document>>;

impl Document {
    pub fn shared() -> SharedDocument {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn user_select_suppressed(&self) -> bool {
        self.user_select_suppressed
    }

    /// Whether `table` wants document-level `event`s routed to it.
    pub fn listens(&self, table: u64, event: DocumentEvent) -> bool {
        self.listeners.contains(&(table, event))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn active_drags(&self) -> usize {
        self.dragging.len()
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Rendered geometry of one table: header cell widths and the explicit width
/// (if any) of every body cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    left: f64,
    headers: Vec<f64>,
    rows: Vec<Vec<Option<f64>>>,
}

impl TableLayout {
    /// A table whose left edge is at `left` with the given header widths and
    /// an empty body.
    pub fn new(left: f64, headers: Vec<f64>) -> Self {
        Self {
            left,
            headers,
            rows: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn header_width(&self, column: usize) -> Option<f64> {
        self.headers.get(column).copied()
    }

    pub fn cell_width(&self, row: usize, column: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(column)).copied().flatten()
    }

    /// Right edge of a header cell.
    pub fn header_right(&self, column: usize) -> Option<f64> {
        if column >= self.headers.len() {
            return None;
        }
        Some(self.left + self.headers[..=column].iter().sum::<f64>())
    }

    /// Header cell containing horizontal position `x`.
    fn header_at(&self, x: f64) -> Option<usize> {
        let mut edge = self.left;
        for (i, width) in self.headers.iter().enumerate() {
            let right = edge + width;
            if x >= edge && x <= right {
                return Some(i);
            }
            edge = right;
        }
        None
    }

    /// Replace the body with freshly rendered rows of `cells` unstyled cells each.
    fn replace_rows(&mut self, rows: &[usize]) {
        self.rows = rows.iter().map(|cells| vec![None; *cells]).collect();
    }

    fn apply_width(&mut self, column: usize, width: f64) {
        if let Some(header) = self.headers.get_mut(column) {
            *header = width;
        }
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(column) {
                *cell = Some(width);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pointer input
// ---------------------------------------------------------------------------

/// What the pointer is over when an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Header(usize),
    Body,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub x: f64,
    pub target: PointerTarget,
}

impl Pointer {
    pub fn header(x: f64, column: usize) -> Self {
        Self {
            x,
            target: PointerTarget::Header(column),
        }
    }

    /// A pointer on the header row at `x`, hit-tested against `layout`.
    pub fn on_header_row(layout: &TableLayout, x: f64) -> Self {
        match layout.header_at(x) {
            Some(column) => Self::header(x, column),
            None => Self::outside(x),
        }
    }

    pub fn outside(x: f64) -> Self {
        Self {
            x,
            target: PointerTarget::Outside,
        }
    }
}

// ---------------------------------------------------------------------------
// Drag session
// ---------------------------------------------------------------------------

/// Document-wide effects held for the duration of a drag.
/// Sessions on different tables may overlap and end in any order; the
/// document-wide cursor and suppression are released with the last one.
struct GlobalEffects {
    document: SharedDocument,
    table: u64,
}

impl GlobalEffects {
    fn acquire(document: &SharedDocument, table: u64) -> Self {
        let mut doc = document.borrow_mut();
        doc.dragging.insert(table);
        doc.cursor = Some(Cursor::ColResize);
        doc.user_select_suppressed = true;
        for event in [DocumentEvent::PointerMove, DocumentEvent::PointerUp, DocumentEvent::Blur] {
            doc.listeners.insert((table, event));
        }
        Self {
            document: Rc::clone(document),
            table,
        }
    }
}

impl Drop for GlobalEffects {
    fn drop(&mut self) {
        let mut doc = self.document.borrow_mut();
        let table = self.table;
        doc.dragging.remove(&table);
        doc.listeners.retain(|(owner, _)| *owner != table);
        if doc.dragging.is_empty() {
            doc.cursor = None;
            doc.user_select_suppressed = false;
        }
    }
}

/// An in-progress column drag.
pub struct DragSession {
    column: usize,
    start_x: f64,
    start_width: f64,
    width: f64,
    _effects: GlobalEffects,
}

impl DragSession {
    pub fn column(&self) -> usize {
        self.column
    }

    pub fn width(&self) -> f64 {
        self.width
    }
}

// ---------------------------------------------------------------------------
// ResizableTable
// ---------------------------------------------------------------------------

/// Observable phase of the resize state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePhase {
    Idle,
    HoveringEdge { column: usize },
    Dragging { column: usize },
}

enum State {
    Idle,
    Hovering { column: usize },
    Dragging(DragSession),
}

pub struct ResizableTable {
    id: u64,
    document: SharedDocument,
    layout: TableLayout,
    config: TableConfig,
    state: State,
    table_cursor: Option<Cursor>,
    /// Widths applied by completed or ongoing drags, re-applied to new rows.
    resized: BTreeMap<usize, f64>,
}

impl ResizableTable {
    pub fn attach(document: SharedDocument, layout: TableLayout, config: TableConfig) -> Self {
        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            document,
            layout,
            config,
            state: State::Idle,
            table_cursor: None,
            resized: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    /// Cursor shown over the table itself (the resize affordance).
    pub fn table_cursor(&self) -> Option<Cursor> {
        self.table_cursor
    }

    pub fn phase(&self) -> ResizePhase {
        match &self.state {
            State::Idle => ResizePhase::Idle,
            State::Hovering { column } => ResizePhase::HoveringEdge { column: *column },
            State::Dragging(session) => ResizePhase::Dragging {
                column: session.column,
            },
        }
    }

    pub fn drag(&self) -> Option<&DragSession> {
        match &self.state {
            State::Dragging(session) => Some(session),
            _ => None,
        }
    }

    /// The header column whose trailing-edge handle is under the pointer.
    fn edge_under(&self, pointer: Pointer) -> Option<usize> {
        let PointerTarget::Header(column) = pointer.target else {
            return None;
        };
        let right = self.layout.header_right(column)?;
        (pointer.x > right - self.config.edge_threshold).then_some(column)
    }

    pub fn pointer_move(&mut self, pointer: Pointer) {
        if let State::Dragging(session) = &mut self.state {
            let width = (session.start_width + (pointer.x - session.start_x))
                .max(self.config.min_column_width);
            session.width = width;
            let column = session.column;
            self.layout.apply_width(column, width);
            self.resized.insert(column, width);
            return;
        }

        match self.edge_under(pointer) {
            Some(column) => {
                self.state = State::Hovering { column };
                self.table_cursor = Some(Cursor::ColResize);
            }
            None => {
                self.state = State::Idle;
                self.table_cursor = None;
            }
        }
    }

    /// Returns true when the event starts a drag (and its default action,
    /// text selection, should be prevented).
    pub fn pointer_down(&mut self, pointer: Pointer) -> bool {
        if matches!(self.state, State::Dragging(_)) {
            return false;
        }
        let Some(column) = self.edge_under(pointer) else {
            return false;
        };
        let Some(start_width) = self.layout.header_width(column) else {
            return false;
        };

        debug!(table = self.id, column, start_width, "column drag started");
        self.state = State::Dragging(DragSession {
            column,
            start_x: pointer.x,
            start_width,
            width: start_width,
            _effects: GlobalEffects::acquire(&self.document, self.id),
        });
        true
    }

    /// Pointer released anywhere in the document.
    pub fn pointer_up(&mut self) {
        self.end_drag();
    }

    /// Window lost focus; a drag cannot continue without pointer events.
    pub fn blur(&mut self) {
        self.end_drag();
    }

    fn end_drag(&mut self) {
        if let State::Dragging(session) = &self.state {
            debug!(table = self.id, column = session.column, width = session.width, "column drag ended");
        }
        self.state = State::Idle;
        self.table_cursor = None;
    }

    /// The body was re-rendered with `rows[i]` cells in row `i`. Every width
    /// set by a drag, including the one in progress, is written to the new cells.
    pub fn render_rows(&mut self, rows: &[usize]) {
        self.layout.replace_rows(rows);
        for (column, width) in &self.resized {
            self.layout.apply_width(*column, *width);
        }
    }
}
