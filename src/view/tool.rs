use crate::engine::InputTool;
use crate::view::events::PointingDevice;

/// Tool applied to pointer input of one view.
///
/// Only proximity events change it; strokes read it. A stylus flipped to its
/// eraser end keeps erasing until the next proximity event reports otherwise.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ToolState {
    tool: InputTool,
}

impl ToolState {
    /// Maps a proximity device to a tool. Anything that is not an eraser draws.
    pub fn classify(device: Option<PointingDevice>) -> InputTool {
        match device {
            Some(PointingDevice::Eraser) => InputTool::Eraser,
            _ => InputTool::Pen,
        }
    }

    pub fn on_proximity(&mut self, device: Option<PointingDevice>) -> InputTool {
        let tool = Self::classify(device);
        if tool != self.tool {
            log::debug!("tool {} -> {tool}", self.tool);
            self.tool = tool;
        }
        tool
    }

    #[inline]
    pub fn current(&self) -> InputTool {
        self.tool
    }
}
