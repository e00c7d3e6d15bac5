use std::fmt::Write;

use co2_pico_common::{DisplayError, StatusDisplay};
use co2_pico_model::normalize;

use crate::AppWindow;

/// Changes not yet handed to the UI thread.
#[derive(Default)]
struct Pending {
    status: Option<String>,
    trend: Option<String>,
    fault: Option<String>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.status.is_none() && self.trend.is_none() && self.fault.is_none()
    }
}

/// [`StatusDisplay`] drawing into the [`AppWindow`] from the agent thread.
///
/// Updates are forwarded to the event loop. While auto refresh is off they
/// are collected and sent as one batch when it is turned back on.
pub struct SlintDisplay {
    window: slint::Weak<AppWindow>,
    auto_refresh: bool,
    pending: Pending,
}

impl SlintDisplay {
    pub fn new(window: slint::Weak<AppWindow>) -> Self {
        Self {
            window,
            auto_refresh: true,
            pending: Pending::default(),
        }
    }

    fn update(&mut self) -> Result<(), DisplayError> {
        if !self.auto_refresh || self.pending.is_empty() {
            return Ok(());
        }

        let Pending {
            status,
            trend,
            fault,
        } = std::mem::take(&mut self.pending);

        self.window
            .upgrade_in_event_loop(move |ui| {
                if let Some(status) = status {
                    ui.set_status_text(status.into());
                    ui.set_fault_text("".into());
                }
                if let Some(trend) = trend {
                    ui.set_trend_commands(trend.into());
                }
                if let Some(fault) = fault {
                    ui.set_fault_text(fault.into());
                }
            })
            .map_err(|e| DisplayError(e.to_string()))
    }
}

impl StatusDisplay for SlintDisplay {
    fn set_auto_refresh(&mut self, enabled: bool) -> Result<(), DisplayError> {
        self.auto_refresh = enabled;
        self.update()
    }

    fn show_status(&mut self, text: &str) -> Result<(), DisplayError> {
        self.pending.status = Some(text.to_string());
        self.update()
    }

    fn show_trend(&mut self, series: &[u32]) -> Result<(), DisplayError> {
        self.pending.trend = Some(trend_path(series));
        self.update()
    }

    fn show_fault(&mut self, text: &str) -> Result<(), DisplayError> {
        self.pending.fault = Some(text.to_string());
        // a fault is shown right away
        self.auto_refresh = true;
        self.update()
    }
}

/// Path commands plotting `series` over a 100 x 100 viewbox, oldest value on
/// the left and the largest value at the top.
pub fn trend_path(series: &[u32]) -> String {
    let points = normalize(series);
    let mut commands = String::new();

    match points.as_slice() {
        [] => {}
        [single] => {
            let y = 100.0 * (1.0 - single);
            let _ = write!(commands, "M 0 {y:.1} L 100 {y:.1}");
        }
        _ => {
            let step = 100.0 / (points.len() - 1) as f32;
            for (i, value) in points.iter().enumerate() {
                let verb = if i == 0 { 'M' } else { 'L' };
                let x = step * i as f32;
                let y = 100.0 * (1.0 - value);
                if i > 0 {
                    commands.push(' ');
                }
                let _ = write!(commands, "{verb} {x:.1} {y:.1}");
            }
        }
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_draws_nothing() {
        assert_eq!(trend_path(&[]), "");
    }

    #[test]
    fn single_value_is_a_flat_line() {
        assert_eq!(trend_path(&[412]), "M 0 50.0 L 100 50.0");
    }

    #[test]
    fn min_at_the_bottom_max_at_the_top() {
        assert_eq!(
            trend_path(&[400, 600, 500]),
            "M 0.0 100.0 L 50.0 0.0 L 100.0 50.0"
        );
    }
}
