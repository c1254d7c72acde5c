use driftfield::window::App;
use driftfield::FieldConfig;
use winit::event_loop::{ControlFlow, EventLoop};

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(FieldConfig::default());
    event_loop.run_app(&mut app).unwrap();
}
