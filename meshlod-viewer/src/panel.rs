//! Simplification parameter panel

use meshlod_simplification::SimplificationParameters;

/// Floating egui window with the three simplification controls.
///
/// Hidden in plain display, shown while a model is under simplification.
#[derive(Debug, Clone)]
pub struct ParameterPanel {
    visible: bool,
    title: String,
}

impl Default for ParameterPanel {
    fn default() -> Self {
        Self {
            visible: false,
            title: "Simplification".to_string(),
        }
    }
}

impl ParameterPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Draw the controls into `ui`. Returns true when any value changed.
    pub fn ui(&mut self, ui: &mut egui::Ui, params: &mut SimplificationParameters) -> bool {
        let (ratio_min, ratio_max) = SimplificationParameters::RATIO_RANGE;
        let (error_min, error_max) = SimplificationParameters::ERROR_RANGE;

        let mut changed = ui
            .add(
                egui::Slider::new(&mut params.ratio, ratio_min..=ratio_max)
                    .step_by(SimplificationParameters::RATIO_STEP as f64)
                    .text("ratio"),
            )
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut params.error, error_min..=error_max)
                    .step_by(SimplificationParameters::ERROR_STEP as f64)
                    .max_decimals(4)
                    .text("error"),
            )
            .changed();
        changed |= ui.checkbox(&mut params.lock_border, "lockBorder").changed();

        if changed {
            *params = params.clamped();
        }
        changed
    }

    /// Show the panel window in the top-right corner when visible
    pub fn show(&mut self, ctx: &egui::Context, params: &mut SimplificationParameters) -> bool {
        if !self.visible {
            return false;
        }
        let mut changed = false;
        egui::Window::new(self.title.clone())
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(0.0, 0.0))
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                changed = self.ui(ui, params);
            });
        changed
    }
}
