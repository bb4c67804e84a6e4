use postfx_core::{PassId, Pipeline, Preset, UniformValue};

/// One change requested through the panel. Collected while the UI is being
/// built and applied afterwards, so the UI only ever reads the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelEdit {
    Enable(PassId, bool),
    Parameter(PassId, &'static str, UniformValue),
    GoWild(bool),
    Preset(Preset),
}

/// Draw the control panel: one section per pass with its enable checkbox and
/// a slider for each ranged uniform.
pub fn show(ctx: &egui::Context, pipeline: &Pipeline, active: Preset) -> Vec<PanelEdit> {
    let mut edits = Vec::new();

    egui::Window::new("postfx").default_width(260.0).show(ctx, |ui| {
        egui::ComboBox::from_label("preset")
            .selected_text(active.name())
            .show_ui(ui, |ui| {
                for preset in Preset::ALL {
                    if ui.selectable_label(preset == active, preset.name()).clicked() && preset != active {
                        edits.push(PanelEdit::Preset(preset));
                    }
                }
            });
        ui.separator();

        for (n, (id, pass)) in pipeline.composer.passes().enumerate() {
            let mut enabled = pass.enabled();
            let label = format!("{} {}", n + 1, pass.name());
            if ui.checkbox(&mut enabled, label).changed() {
                edits.push(PanelEdit::Enable(id, enabled));
            }

            ui.indent(id.raw(), |ui| {
                for uniform in pass.shader().uniforms().iter() {
                    let Some((lo, hi)) = uniform.range else { continue };
                    if let Some(value) = slider(ui, uniform.name, uniform.value, lo..=hi) {
                        edits.push(PanelEdit::Parameter(id, uniform.name, value));
                    }
                }
                if id == pipeline.ids.glitch {
                    let mut wild = pipeline.go_wild();
                    if ui.checkbox(&mut wild, "go wild").changed() {
                        edits.push(PanelEdit::GoWild(wild));
                    }
                }
            });
        }
    });

    edits
}

/// Vectors get one slider per component.
fn slider(
    ui: &mut egui::Ui,
    name: &str,
    value: UniformValue,
    range: std::ops::RangeInclusive<f32>,
) -> Option<UniformValue> {
    let mut changed = false;
    let mut component = |ui: &mut egui::Ui, x: &mut f32, label: String| {
        changed |= ui
            .add(egui::Slider::new(x, range.clone()).text(label))
            .changed();
    };
    let edited = match value {
        UniformValue::Float(mut x) => {
            component(ui, &mut x, name.to_string());
            UniformValue::Float(x)
        }
        UniformValue::Vec2(mut v) => {
            component(ui, &mut v.x, format!("{name}.x"));
            component(ui, &mut v.y, format!("{name}.y"));
            UniformValue::Vec2(v)
        }
        UniformValue::Vec3(mut v) => {
            component(ui, &mut v.x, format!("{name}.x"));
            component(ui, &mut v.y, format!("{name}.y"));
            component(ui, &mut v.z, format!("{name}.z"));
            UniformValue::Vec3(v)
        }
    };
    changed.then_some(edited)
}

/// Apply one edit. A preset change needs a rebuild, which the caller owns,
/// so it is handed back instead of applied.
pub fn apply(pipeline: &mut Pipeline, edit: PanelEdit) -> postfx_core::Result<Option<Preset>> {
    match edit {
        PanelEdit::Enable(id, enabled) => pipeline.composer.set_enabled(id, enabled)?,
        PanelEdit::Parameter(id, name, value) => pipeline.composer.set_parameter(id, name, value)?,
        PanelEdit::GoWild(wild) => pipeline.set_go_wild(wild),
        PanelEdit::Preset(preset) => return Ok(Some(preset)),
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use postfx_core::Clock;

    use super::*;

    fn pipeline() -> Pipeline {
        let mut config = Preset::Original.config();
        config.viewport.width = 8;
        config.viewport.height = 8;
        config.normal_map.size = 8;
        config.build(Clock::fixed(0.1)).unwrap()
    }

    #[test]
    fn enable_edit_flips_pass() {
        let mut p = pipeline();
        let id = p.ids.bloom;
        assert_eq!(apply(&mut p, PanelEdit::Enable(id, true)).unwrap(), None);
        assert!(p.composer.pass(id).unwrap().enabled());
    }

    #[test]
    fn parameter_edit_is_clamped_by_range() {
        let mut p = pipeline();
        let id = p.ids.tint;
        apply(&mut p, PanelEdit::Parameter(id, "tint", [5.0f32, 0.0, 0.0].into())).unwrap();
        let tint = p.composer.pass(id).unwrap().shader().uniforms().vec3("tint");
        assert!(tint.x <= 1.0);
    }

    #[test]
    fn unknown_parameter_is_an_error() {
        let mut p = pipeline();
        let id = p.ids.tint;
        assert!(apply(&mut p, PanelEdit::Parameter(id, "nope", 1.0f32.into())).is_err());
    }

    #[test]
    fn go_wild_edit() {
        let mut p = pipeline();
        apply(&mut p, PanelEdit::GoWild(true)).unwrap();
        assert!(p.go_wild());
    }

    #[test]
    fn preset_edit_is_handed_back() {
        let mut p = pipeline();
        assert_eq!(
            apply(&mut p, PanelEdit::Preset(Preset::Clean)).unwrap(),
            Some(Preset::Clean)
        );
    }
}
