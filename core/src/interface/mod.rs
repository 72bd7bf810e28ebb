pub mod mode;
pub mod record;

pub use mode::{BeamformerMethod, DoaMethod};
pub use record::{to_json_line, BeamformRecord, DoaRecord};
