//! Tracks the colour, opacity and graphics states last sent to the engine.
//!
//! Colours and opacity are global, mutable state in the engine. The tracker remembers
//! what was last applied so repeated requests for the same colour cost nothing, and
//! deduplicates named graphics states by their canonical option string so a document
//! only ever holds one state per distinct combination of values.

use crate::colour::Paint;
use crate::engine::{
    BlendMode, ColourTarget, Engine, EngineError, GStateHandle, GStateOptions, LineCap, LineJoin,
};
use std::collections::HashMap;

/// Engines reject zero-length dash segments; they are replaced with this
pub const DASH_EPSILON: f32 = 1.5e-5;

/// How lines are stroked
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    /// Alternating on/off lengths; empty for a solid line
    pub dash: Vec<f32>,
}

impl Default for LineStyle {
    fn default() -> Self {
        LineStyle::new(1.0)
    }
}

impl LineStyle {
    /// A solid line of the given width with butt caps and mitered joins
    pub fn new(width: f32) -> LineStyle {
        LineStyle {
            width,
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            dash: Vec::new(),
        }
    }

    pub fn cap(mut self, cap: LineCap) -> Self {
        self.cap = cap;
        self
    }

    pub fn join(mut self, join: LineJoin) -> Self {
        self.join = join;
        self
    }

    pub fn dash<I: IntoIterator<Item = f32>>(mut self, dash: I) -> Self {
        self.dash = dash.into_iter().collect();
        self
    }
}

/// Make a dash pattern acceptable to an engine: non-positive segments become
/// [DASH_EPSILON] and a single segment is doubled into an on/off pair.
pub fn normalize_dash(pattern: &[f32]) -> Vec<f32> {
    let mut dash: Vec<f32> = pattern.iter().map(|&s| s.max(DASH_EPSILON)).collect();
    if let [only] = dash[..] {
        dash.push(only);
    }
    dash
}

/// The graphics state the canvas believes the engine's open context is in.
///
/// `None` means unknown: the next request is always sent.
#[derive(Debug, Default)]
pub struct GraphicsState {
    fill: Option<Paint>,
    stroke: Option<Paint>,
    fill_alpha: Option<f32>,
    stroke_alpha: Option<f32>,
    /// Baseline set by `set_opacity`; colour alphas are multiplied by it
    opacity: Option<f32>,
    gstates: HashMap<String, GStateHandle>,
}

impl GraphicsState {
    pub fn new() -> GraphicsState {
        GraphicsState::default()
    }

    fn baseline(&self) -> f32 {
        self.opacity.unwrap_or(1.0)
    }

    /// Forget what was applied. Called whenever the open context changes or a saved
    /// state is restored, since the engine's state then no longer matches.
    pub fn invalidate(&mut self) {
        self.fill = None;
        self.stroke = None;
        self.fill_alpha = None;
        self.stroke_alpha = None;
    }

    /// Find or create the graphics state for these options
    pub fn gstate<E: Engine>(
        &mut self,
        engine: &mut E,
        options: &GStateOptions,
    ) -> Result<GStateHandle, EngineError> {
        let key = options.to_string();
        if let Some(&handle) = self.gstates.get(&key) {
            return Ok(handle);
        }
        log::trace!("new graphics state '{key}'");
        let handle = engine.create_gstate(options)?;
        self.gstates.insert(key, handle);
        Ok(handle)
    }

    /// Number of distinct graphics states created so far
    pub fn gstate_count(&self) -> usize {
        self.gstates.len()
    }

    fn apply<E: Engine>(&mut self, engine: &mut E, options: GStateOptions) -> Result<(), EngineError> {
        let handle = self.gstate(engine, &options)?;
        engine.set_gstate(handle)?;
        if let Some(alpha) = options.fill_opacity {
            self.fill_alpha = Some(alpha);
        }
        if let Some(alpha) = options.stroke_opacity {
            self.stroke_alpha = Some(alpha);
        }
        Ok(())
    }

    pub fn set_fill<E: Engine>(&mut self, engine: &mut E, paint: Paint) -> Result<(), EngineError> {
        if self.fill == Some(paint) {
            return Ok(());
        }
        let alpha = paint.alpha() * self.baseline();
        if self.fill_alpha != Some(alpha) {
            self.apply(engine, GStateOptions::fill_opacity(alpha))?;
        }
        engine.set_colour(ColourTarget::Fill, paint.colour)?;
        self.fill = Some(paint);
        Ok(())
    }

    pub fn set_stroke<E: Engine>(&mut self, engine: &mut E, paint: Paint) -> Result<(), EngineError> {
        if self.stroke == Some(paint) {
            return Ok(());
        }
        let alpha = paint.alpha() * self.baseline();
        if self.stroke_alpha != Some(alpha) {
            self.apply(engine, GStateOptions::stroke_opacity(alpha))?;
        }
        engine.set_colour(ColourTarget::Stroke, paint.colour)?;
        self.stroke = Some(paint);
        Ok(())
    }

    /// Set the opacity baseline for both fill and stroke with a single graphics state
    pub fn set_opacity<E: Engine>(
        &mut self,
        engine: &mut E,
        opacity: f32,
        mode: BlendMode,
    ) -> Result<(), EngineError> {
        let options = GStateOptions {
            blend_mode: mode,
            ..GStateOptions::opacity(opacity)
        };
        self.apply(engine, options)?;
        if self.opacity != Some(opacity) {
            // cached colours were applied against the old baseline
            self.fill = None;
            self.stroke = None;
        }
        self.opacity = Some(opacity);
        Ok(())
    }

    /// Undo any per-colour alpha after a primitive, going back to the baseline. A colour
    /// whose alpha was undone has to be sent again next time.
    pub fn restore_opacity<E: Engine>(&mut self, engine: &mut E) -> Result<(), EngineError> {
        let baseline = self.baseline();
        let fill_off = self.fill_alpha.is_some_and(|a| a != baseline);
        let stroke_off = self.stroke_alpha.is_some_and(|a| a != baseline);
        if !fill_off && !stroke_off {
            return Ok(());
        }
        self.apply(engine, GStateOptions::opacity(baseline))?;
        if fill_off {
            self.fill = None;
        }
        if stroke_off {
            self.stroke = None;
        }
        Ok(())
    }

    /// Width, cap, join and dash are always sent together
    pub fn set_line_style<E: Engine>(&mut self, engine: &mut E, style: &LineStyle) -> Result<(), EngineError> {
        engine.set_line_width(style.width)?;
        engine.set_line_cap(style.cap)?;
        engine.set_line_join(style.join)?;
        engine.set_dash(&normalize_dash(&style.dash), 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dashes_are_clamped_and_doubled() {
        assert_eq!(normalize_dash(&[0.0]), vec![DASH_EPSILON, DASH_EPSILON]);
        assert_eq!(normalize_dash(&[3.0]), vec![3.0, 3.0]);
        assert_eq!(normalize_dash(&[2.0, 0.0, 1.0]), vec![2.0, DASH_EPSILON, 1.0]);
        assert!(normalize_dash(&[]).is_empty());
    }

    #[test]
    fn line_style_builder() {
        let style = LineStyle::new(2.0).cap(LineCap::Round).dash([4.0, 2.0]);
        assert_eq!(style.width, 2.0);
        assert_eq!(style.cap, LineCap::Round);
        assert_eq!(style.join, LineJoin::Miter);
        assert_eq!(style.dash, vec![4.0, 2.0]);
    }
}
