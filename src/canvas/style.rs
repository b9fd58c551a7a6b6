//! Colors and stroke widths of the overlay.

use crate::model::{AnnotationBox, EditorState};
use crate::render::Color;

/// Visual state of a box, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxVisualState {
    Selected,
    Hovered,
    New,
    Modified,
    Default,
}

impl BoxVisualState {
    /// Highest-precedence state that applies: selected > hovered > new > modified > default.
    pub fn of(b: &AnnotationBox, state: &EditorState) -> Self {
        if state.selected_box_id == Some(b.id) {
            BoxVisualState::Selected
        } else if state.hovered_box_id == Some(b.id) {
            BoxVisualState::Hovered
        } else if b.is_new {
            BoxVisualState::New
        } else if b.is_modified {
            BoxVisualState::Modified
        } else {
            BoxVisualState::Default
        }
    }

    /// Selected and hovered boxes show handles and a glow.
    pub fn is_active(&self) -> bool {
        matches!(self, BoxVisualState::Selected | BoxVisualState::Hovered)
    }
}

/// Stroke of one box state. Widths are screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStyle {
    pub color: Color,
    pub width: f32,
    /// Glow blur in screen pixels
    pub glow: Option<f32>,
}

/// Overlay palette.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasStyle {
    pub selected: BoxStyle,
    pub hovered: BoxStyle,
    pub new: BoxStyle,
    pub modified: BoxStyle,
    pub default: BoxStyle,
    pub frame_color: Color,
    pub frame_width: f32,
    pub handle_fill: Color,
    pub handle_hovered_fill: Color,
    pub handle_stroke: Color,
    pub preview_color: Color,
    /// Dash on/off lengths of the drawing preview, screen pixels
    pub preview_dash: [f32; 2],
    pub unavailable_message: String,
}

impl CanvasStyle {
    pub fn for_state(&self, state: BoxVisualState) -> &BoxStyle {
        match state {
            BoxVisualState::Selected => &self.selected,
            BoxVisualState::Hovered => &self.hovered,
            BoxVisualState::New => &self.new,
            BoxVisualState::Modified => &self.modified,
            BoxVisualState::Default => &self.default,
        }
    }
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            selected: BoxStyle {
                color: Color::rgb(0.2, 0.65, 1.0),
                width: 2.5,
                glow: Some(8.0),
            },
            hovered: BoxStyle {
                color: Color::rgb(0.45, 0.8, 1.0),
                width: 2.0,
                glow: Some(4.0),
            },
            new: BoxStyle {
                color: Color::rgb(0.3, 0.85, 0.4),
                width: 2.0,
                glow: None,
            },
            modified: BoxStyle {
                color: Color::rgb(1.0, 0.7, 0.2),
                width: 2.0,
                glow: None,
            },
            default: BoxStyle {
                color: Color::rgb(0.95, 0.3, 0.3),
                width: 1.5,
                glow: None,
            },
            frame_color: Color::rgb(0.4, 0.4, 0.4),
            frame_width: 1.0,
            handle_fill: Color::WHITE,
            handle_hovered_fill: Color::rgb(0.2, 0.65, 1.0),
            handle_stroke: Color::rgb(0.2, 0.65, 1.0),
            preview_color: Color::new(1.0, 1.0, 1.0, 0.9),
            preview_dash: [6.0, 4.0],
            unavailable_message: "Failed to load image".to_string(),
        }
    }
}
