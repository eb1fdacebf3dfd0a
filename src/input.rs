//! Terminal events mapped to viewer actions

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

/// Things the user can ask the viewer to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    ResetCamera,
    ToggleDebug,
    OrbitLeft,
    OrbitRight,
    OrbitUp,
    OrbitDown,
    ZoomIn,
    ZoomOut,
    /// Pointer moved without a button held
    PointerMove { col: u16, row: u16 },
    /// Left or right button pressed
    PointerDown { col: u16, row: u16 },
    /// Pointer moved with the left button held
    Drag { col: u16, row: u16 },
    /// Pointer moved with the right button held
    PanDrag { col: u16, row: u16 },
    PointerUp,
    /// Pointer left the viewport
    PointerLeave,
    Resize { cols: u16, rows: u16 },
}

/// Parse terminal input into actions
pub fn parse_event(event: Event) -> Action {
    match event {
        Event::Key(key) => parse_key_event(key),
        Event::Mouse(mouse) => parse_mouse_event(mouse),
        Event::Resize(cols, rows) => Action::Resize { cols, rows },
        Event::FocusLost => Action::PointerLeave,
        _ => Action::None,
    }
}

/// Parse keyboard input into actions
pub fn parse_key_event(event: KeyEvent) -> Action {
    if event.kind == KeyEventKind::Release {
        return Action::None;
    }
    match event.code {
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r') => Action::ResetCamera,
        KeyCode::Char('d') => Action::ToggleDebug,
        KeyCode::Left => Action::OrbitLeft,
        KeyCode::Right => Action::OrbitRight,
        KeyCode::Up => Action::OrbitUp,
        KeyCode::Down => Action::OrbitDown,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::ZoomIn,
        KeyCode::Char('-') => Action::ZoomOut,
        _ => Action::None,
    }
}

fn parse_mouse_event(event: MouseEvent) -> Action {
    let (col, row) = (event.column, event.row);
    match event.kind {
        MouseEventKind::Moved => Action::PointerMove { col, row },
        MouseEventKind::Down(MouseButton::Left | MouseButton::Right) => {
            Action::PointerDown { col, row }
        }
        MouseEventKind::Drag(MouseButton::Left) => Action::Drag { col, row },
        MouseEventKind::Drag(MouseButton::Right) => Action::PanDrag { col, row },
        MouseEventKind::Up(_) => Action::PointerUp,
        MouseEventKind::ScrollUp => Action::ZoomIn,
        MouseEventKind::ScrollDown => Action::ZoomOut,
        _ => Action::None,
    }
}
