use co2_pico_common::{DisplayError, StatusDisplay};
use co2_pico_model::normalize;
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Polyline, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text};
use embedded_hal::i2c::I2c;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

const WIDTH: i32 = 128;
const HEIGHT: i32 = 64;
/// Rows above the plot, used by the status line.
const PLOT_TOP: i32 = 14;

type Oled<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

fn oled_error(e: impl core::fmt::Debug) -> DisplayError {
    DisplayError(format!("{e:?}"))
}

/// 128x64 SSD1306 OLED on the shared I2C bus: status line on top, CO2
/// trend below.
pub struct OledDisplay<I2C> {
    oled: Oled<I2C>,
    auto_refresh: bool,
    status: String,
    trend: Vec<u32>,
    fault: Option<String>,
}

impl<I2C: I2c> OledDisplay<I2C> {
    pub fn new(i2c: I2C) -> Result<Self, DisplayError> {
        let mut oled = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();
        oled.init().map_err(oled_error)?;

        Ok(Self {
            oled,
            auto_refresh: true,
            status: String::new(),
            trend: Vec::new(),
            fault: None,
        })
    }

    fn refresh(&mut self) -> Result<(), DisplayError> {
        if !self.auto_refresh {
            return Ok(());
        }

        self.oled.clear_buffer();
        match self.fault.clone() {
            Some(fault) => self.draw_fault(&fault)?,
            None => {
                self.draw_status()?;
                self.draw_trend()?;
            }
        }
        self.oled.flush().map_err(oled_error)
    }

    fn draw_status(&mut self) -> Result<(), DisplayError> {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        Text::with_baseline(&self.status, Point::zero(), style, Baseline::Top)
            .draw(&mut self.oled)
            .map_err(oled_error)?;
        Ok(())
    }

    fn draw_trend(&mut self) -> Result<(), DisplayError> {
        let plot_height = (HEIGHT - PLOT_TOP - 1) as f32;
        let points: Vec<Point> = match normalize(&self.trend).as_slice() {
            [] => return Ok(()),
            [single] => {
                let y = PLOT_TOP + (plot_height * (1.0 - single)) as i32;
                vec![Point::new(0, y), Point::new(WIDTH - 1, y)]
            }
            values => {
                let step = (WIDTH - 1) as f32 / (values.len() - 1) as f32;
                values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        Point::new(
                            (step * i as f32) as i32,
                            PLOT_TOP + (plot_height * (1.0 - value)) as i32,
                        )
                    })
                    .collect()
            }
        };

        Polyline::new(&points)
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut self.oled)
            .map_err(oled_error)
    }

    fn draw_fault(&mut self, fault: &str) -> Result<(), DisplayError> {
        Rectangle::new(Point::zero(), Size::new(WIDTH as u32, HEIGHT as u32))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut self.oled)
            .map_err(oled_error)?;

        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        Text::with_alignment(fault, Point::new(WIDTH / 2, HEIGHT / 2 + 6), style, Alignment::Center)
            .draw(&mut self.oled)
            .map_err(oled_error)?;
        Ok(())
    }
}

impl<I2C: I2c> StatusDisplay for OledDisplay<I2C> {
    fn set_auto_refresh(&mut self, enabled: bool) -> Result<(), DisplayError> {
        self.auto_refresh = enabled;
        self.refresh()
    }

    fn show_status(&mut self, text: &str) -> Result<(), DisplayError> {
        self.status = text.to_string();
        self.fault = None;
        self.refresh()
    }

    fn show_trend(&mut self, series: &[u32]) -> Result<(), DisplayError> {
        self.trend = series.to_vec();
        self.refresh()
    }

    fn show_fault(&mut self, text: &str) -> Result<(), DisplayError> {
        self.fault = Some(text.to_string());
        self.auto_refresh = true;
        self.refresh()
    }
}
