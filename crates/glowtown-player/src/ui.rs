//! egui parameter windows

use crate::clock::FrameClock;
use glowtown_core::{
    EffectSelector, FirstPersonCamera, ObjectTransform, PolygonMode, PostProcessSettings,
    ProgramState, Vec3, MAX_BLUR_ITERATIONS, MAX_TURBINES,
};

/// Draw every parameter window. Edits land directly in `state`.
pub fn draw_ui(
    ctx: &egui::Context,
    state: &mut ProgramState,
    camera: &FirstPersonCamera,
    clock: &FrameClock,
) {
    egui::Window::new("Scene")
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| scene_window(ui, state));

    egui::Window::new("Post processing")
        .default_pos([10.0, 380.0])
        .show(ctx, |ui| post_window(ui, &mut state.post));

    egui::Window::new("Camera info")
        .default_pos([10.0, 620.0])
        .show(ctx, |ui| camera_window(ui, state, camera, clock));
}

fn scene_window(ui: &mut egui::Ui, state: &mut ProgramState) {
    let mut clear = state.clear_color.to_array();
    ui.horizontal(|ui| {
        ui.label("Clear colour");
        ui.color_edit_button_rgb(&mut clear);
    });
    state.clear_color = Vec3::from_array(clear);

    ui.separator();
    transform_row(ui, "City", &mut state.scene.city);
    transform_row(ui, "Tree 1", &mut state.scene.tree_one);
    transform_row(ui, "Tree 2", &mut state.scene.tree_two);

    ui.separator();
    ui.label("Turbines");
    ui.horizontal(|ui| {
        ui.label("count");
        ui.add(egui::DragValue::new(&mut state.scene.turbines.count).range(0..=MAX_TURBINES));
        ui.label("seed");
        ui.add(egui::DragValue::new(&mut state.scene.turbines.seed));
    });

    ui.separator();
    let lights = &mut state.lights;
    ui.checkbox(&mut lights.directional_enabled, "Directional light");
    ui.checkbox(&mut lights.orbit.enabled, "Orbit point light");
    ui.checkbox(&mut lights.flashlight_enabled, "Flashlight");

    let attenuation = &mut lights.point.attenuation;
    ui.label("Point light attenuation");
    ui.add(egui::Slider::new(&mut attenuation.constant, 0.0..=2.0).text("constant"));
    ui.add(
        egui::Slider::new(&mut attenuation.linear, 0.0..=1.0)
            .text("linear")
            .logarithmic(true),
    );
    ui.add(
        egui::Slider::new(&mut attenuation.quadratic, 0.0..=1.0)
            .text("quadratic")
            .logarithmic(true),
    );
}

fn transform_row(ui: &mut egui::Ui, label: &str, transform: &mut ObjectTransform) {
    ui.horizontal(|ui| {
        ui.label(label);
        vec3_drag(ui, &mut transform.position, 0.1);
        ui.label("scale");
        ui.add(
            egui::DragValue::new(&mut transform.scale)
                .speed(0.01)
                .range(0.0..=100.0),
        );
    });
}

fn vec3_drag(ui: &mut egui::Ui, value: &mut Vec3, speed: f64) {
    ui.add(egui::DragValue::new(&mut value.x).speed(speed).prefix("x "));
    ui.add(egui::DragValue::new(&mut value.y).speed(speed).prefix("y "));
    ui.add(egui::DragValue::new(&mut value.z).speed(speed).prefix("z "));
}

fn post_window(ui: &mut egui::Ui, post: &mut PostProcessSettings) {
    ui.checkbox(&mut post.hdr_enabled, "HDR (H)");
    ui.add_enabled(
        post.hdr_enabled,
        egui::Slider::new(&mut post.exposure, 0.01..=10.0)
            .text("exposure (Q/E)")
            .logarithmic(true),
    );
    ui.add(egui::Slider::new(&mut post.gamma, 0.5..=4.0).text("gamma"));

    ui.separator();
    ui.checkbox(&mut post.bloom_enabled, "Bloom (B)");
    ui.add(egui::Slider::new(&mut post.bloom_threshold, 0.0..=10.0).text("threshold"));
    ui.add(
        egui::Slider::new(&mut post.blur_iterations, 1..=MAX_BLUR_ITERATIONS).text("blur passes"),
    );

    ui.separator();
    egui::ComboBox::from_label("Effect (1/2/3)")
        .selected_text(post.effect.label())
        .show_ui(ui, |ui| {
            for effect in EffectSelector::ALL {
                ui.selectable_value(&mut post.effect, effect, effect.label());
            }
        });

    let mut wireframe = post.polygon_mode == PolygonMode::Line;
    if ui.checkbox(&mut wireframe, "Wireframe (F2)").changed() {
        post.polygon_mode = post.polygon_mode.toggled();
    }
}

fn camera_window(
    ui: &mut egui::Ui,
    state: &mut ProgramState,
    camera: &FirstPersonCamera,
    clock: &FrameClock,
) {
    ui.label(format!(
        "{:.2} ms/frame ({:.0} fps)",
        clock.frame_time_ms(),
        clock.fps()
    ));
    ui.separator();

    let p = camera.position;
    let f = camera.front;
    ui.label(format!("position  {:.2} {:.2} {:.2}", p.x, p.y, p.z));
    ui.label(format!("front     {:.2} {:.2} {:.2}", f.x, f.y, f.z));
    ui.label(format!("yaw {:.1}  pitch {:.1}", camera.yaw, camera.pitch));
    ui.label(format!("fov {:.1}", camera.zoom));

    ui.checkbox(&mut state.mouse_look, "Mouse look");
}
