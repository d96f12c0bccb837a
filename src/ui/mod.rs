pub mod chat_view;
pub mod input_area;
pub mod message_widget;
pub mod sidebar;

/// Application stylesheet, installed once at startup.
pub const STYLE: &str = include_str!("style.css");
