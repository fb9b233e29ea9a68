//! Terminal output for jobwatch: the cyclic spinner and the polling status renderer.

mod renderer;
mod spinner;

pub use renderer::{
    DEFAULT_TICK, FAILURE_NOTICE, Outcome, RenderError, SUCCESS_NOTICE, StatusRenderer,
    TERMINATED_NOTICE, terminal_width,
};
pub use spinner::{Spinner, SpinnerKind};
