use crate::error::DisplayError;

/// Message shown on the display right before a reset.
pub const FAULT_MESSAGE: &str = "Error :(";

/// The local status display.
///
/// Implementations own all pixel level rendering. While auto refresh is
/// suspended, updates are collected and shown together when it is resumed.
pub trait StatusDisplay {
    fn set_auto_refresh(&mut self, enabled: bool) -> Result<(), DisplayError>;

    /// Replace the status line, e.g. `CO2: 412 PPM`.
    fn show_status(&mut self, text: &str) -> Result<(), DisplayError>;

    /// Replace the plotted series, oldest value first.
    fn show_trend(&mut self, series: &[u32]) -> Result<(), DisplayError>;

    /// Show a short fault indicator, replacing whatever is on screen.
    fn show_fault(&mut self, text: &str) -> Result<(), DisplayError>;
}

/// A display that may be missing, e.g. when it failed to initialize. Without
/// a display every update succeeds and shows nothing.
impl<D: StatusDisplay> StatusDisplay for Option<D> {
    fn set_auto_refresh(&mut self, enabled: bool) -> Result<(), DisplayError> {
        match self {
            Some(display) => display.set_auto_refresh(enabled),
            None => Ok(()),
        }
    }

    fn show_status(&mut self, text: &str) -> Result<(), DisplayError> {
        match self {
            Some(display) => display.show_status(text),
            None => Ok(()),
        }
    }

    fn show_trend(&mut self, series: &[u32]) -> Result<(), DisplayError> {
        match self {
            Some(display) => display.show_trend(series),
            None => Ok(()),
        }
    }

    fn show_fault(&mut self, text: &str) -> Result<(), DisplayError> {
        match self {
            Some(display) => display.show_fault(text),
            None => Ok(()),
        }
    }
}
